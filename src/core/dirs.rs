use crate::core::error::{DeployerError, Result};
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "repo-deployer";

/// Platform base directory, honouring the XDG variable on every platform
fn base_directory(xdg_var: &str, platform_default: fn() -> Option<PathBuf>) -> Option<PathBuf> {
    match std::env::var(xdg_var) {
        Ok(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => match std::env::consts::OS {
            "linux" | "freebsd" | "netbsd" | "openbsd" => {
                let hidden = if xdg_var == "XDG_CACHE_HOME" { ".cache" } else { ".config" };
                dirs::home_dir().map(|home| home.join(hidden))
            }
            _ => platform_default(),
        },
    }
}

pub fn get_config_directory() -> Result<PathBuf> {
    base_directory("XDG_CONFIG_HOME", dirs::config_dir)
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| DeployerError::config_error("Could not determine the configuration directory"))
}

/// Holds the session file and, by default, the repository cache
pub fn get_cache_directory() -> Result<PathBuf> {
    base_directory("XDG_CACHE_HOME", dirs::cache_dir)
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or(DeployerError::CacheDirectoryNotFound)
}

pub fn default_repository_cache_directory() -> Result<PathBuf> {
    Ok(get_cache_directory()?.join("repositories"))
}

/// Where caller-owned copies of downloaded trees are placed
pub fn scratch_directory() -> PathBuf {
    std::env::temp_dir().join(APP_DIR_NAME)
}
