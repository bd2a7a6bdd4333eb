mod force;
mod lanes;
pub(crate) mod types;

pub use force::{ForceSimulation, SimNode};
pub use types::*;

use force::compute_force_layout;
use lanes::compute_lane_layout;

use crate::config::LayoutConfig;
use crate::model::SystemArchitecture;

/// The two interchangeable layout strategies: an annealed physics
/// simulation for the exploratory all-resources view, and a
/// deterministic lane layout for the grouped structural view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    Force,
    Lanes,
}

pub fn compute_layout(
    arch: &SystemArchitecture,
    strategy: LayoutStrategy,
    config: &LayoutConfig,
) -> SceneLayout {
    match strategy {
        LayoutStrategy::Force => compute_force_layout(arch, config),
        LayoutStrategy::Lanes => compute_lane_layout(arch, config),
    }
}
