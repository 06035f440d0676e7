//! Configuration loading from `~/.edgecall/agent.toml` with defaults.
//!
//! A relative `key_file` is resolved against the directory of the config
//! file, so a config and its key can be moved together.

use edgecall_types::AgentConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default config location: `~/.edgecall/agent.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".edgecall")
        .join("agent.toml")
}

/// Load agent configuration from a TOML file, with defaults.
///
/// A missing, unreadable or invalid file is logged and yields the default
/// configuration.
pub fn load_config(path: Option<&Path>) -> AgentConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return AgentConfig::default();
    }

    let contents = match std::fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config file, using defaults"
            );
            return AgentConfig::default();
        }
    };

    match toml::from_str::<AgentConfig>(&contents) {
        Ok(mut config) => {
            if let Some(key_file) = config.key_file.take() {
                let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
                config.key_file = Some(resolve_relative(config_dir, key_file));
            }
            info!(path = %config_path.display(), "Loaded configuration");
            config
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to parse config, using defaults"
            );
            AgentConfig::default()
        }
    }
}

fn resolve_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
