pub mod defaults;
pub mod error;
pub mod store;

pub use defaults::DefaultsDocument;
pub use error::*;
pub use store::{ConfigStore, DEFAULT_BINDING, InstanceTypeSpec, RegionBinding};

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ec2_driver.conf";
pub const DEFAULTS_FILE: &str = "ec2_driver.default";

const CONFIG_PATH_ENV: &str = "VMFLOW_CONFIG_PATH";
const DEFAULTS_PATH_ENV: &str = "VMFLOW_DEFAULTS_PATH";
const SYSTEM_CONFIG_DIR: &str = "/etc/vmflow";

/// Locate the driver configuration file.
///
/// Search order:
/// 1. `VMFLOW_CONFIG_PATH` (direct path)
/// 2. `~/.config/vmflow/ec2_driver.conf`
/// 3. `/etc/vmflow/ec2_driver.conf`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("vmflow").join(CONFIG_FILE);
        if user_config.exists() {
            return Ok(user_config);
        }
    }

    let system_config = Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE);
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Path of the defaults document: `VMFLOW_DEFAULTS_PATH`, else beside the config file
pub fn defaults_path_for(config_file: &Path) -> PathBuf {
    if let Ok(path) = std::env::var(DEFAULTS_PATH_ENV) {
        return PathBuf::from(path);
    }

    config_file
        .parent()
        .map(|dir| dir.join(DEFAULTS_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULTS_FILE))
}

/// Stringify a YAML scalar, trimmed. Empty strings, nulls and collections yield `None`.
pub fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    let s = match value {
        serde_yaml::Value::String(s) => s.trim().to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    if s.is_empty() { None } else { Some(s) }
}
