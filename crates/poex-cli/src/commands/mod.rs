//! CLI subcommands.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod process;

use std::path::Path;

use poex_core::PoexConfig;

/// Load configuration from the given path, falling back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PoexConfig> {
    match config_path {
        Some(path) => Ok(PoexConfig::from_file(Path::new(path))?),
        None => Ok(PoexConfig::default()),
    }
}
