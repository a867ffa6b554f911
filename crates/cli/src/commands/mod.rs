pub mod catalog;
pub mod config_cmd;
pub mod history;
pub mod init;
pub mod reset;
pub mod run;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use volition_config::AppConfig;
use volition_core::store::StateStore;
use volition_store::{FileStore, MemoryStore};

/// The config file in use: `--config`, or the default location.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config from `--config`, or from the default location with
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// Open the configured state store.
pub fn open_store(config: &AppConfig) -> Arc<dyn StateStore> {
    match config.storage.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(FileStore::new(config.state_dir())),
    }
}
