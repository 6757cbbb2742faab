//! Configuration: TOML-backed settings and load/save management.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EncodeSettings, Settings, ToolSettings};
