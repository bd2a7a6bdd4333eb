use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layout tuning knobs. Config files are JSON5 so hand-maintained files
/// may carry comments and trailing commas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub force: ForceConfig,
    pub lanes: LaneConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1200.0,
            canvas_height: 800.0,
            force: ForceConfig::default(),
            lanes: LaneConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceConfig {
    /// Fixed iteration budget; the simulator always terminates here.
    pub max_ticks: u32,
    /// Pairs closer than this receive a separating force.
    pub min_distance: f32,
    /// Spring rest length for linked pairs.
    pub link_distance: f32,
    pub gravity: f32,
    pub repulsion: f32,
    pub spring: f32,
    pub damping: f32,
    pub margin: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            max_ticks: 300,
            min_distance: 80.0,
            link_distance: 150.0,
            gravity: 0.04,
            repulsion: 900.0,
            spring: 0.015,
            damping: 0.9,
            margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaneConfig {
    pub lane_gap: f32,
    pub node_gap: f32,
    pub node_width: f32,
    pub node_height: f32,
    pub margin: f32,
    pub container_pad_x: f32,
    pub container_pad_top: f32,
    pub container_pad_bottom: f32,
    pub container_gap_y: f32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            lane_gap: 160.0,
            node_gap: 48.0,
            node_width: 132.0,
            node_height: 56.0,
            margin: 24.0,
            container_pad_x: 28.0,
            container_pad_top: 32.0,
            container_pad_bottom: 44.0,
            container_gap_y: 48.0,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let parsed: LayoutConfig = json5::from_str(&contents)?;
    Ok(parsed)
}
