pub mod chains;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diff;
pub mod dump;
pub mod ident;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod raw;
pub mod traffic;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, load_config};
pub use diff::{ArchitectureDiff, diff};
pub use layout::{LayoutStrategy, SceneLayout, compute_layout};
pub use model::SystemArchitecture;
