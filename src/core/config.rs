use crate::core::build::DEFAULT_TOOLKIT_VERSION;
use crate::core::dirs::{default_repository_cache_directory, get_config_directory};
use crate::core::discovery::DEFAULT_ENVIRONMENT;
use crate::core::error::Result;
use crate::core::retriever::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKEN_ENV_VAR: &str = "REPO_DEPLOYER_GITHUB_TOKEN";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DeployerConfig {
    pub api_base_url: String,
    pub github_token: Option<String>,
    /// Overrides the platform cache location for downloaded repositories
    pub cache_dir: Option<PathBuf>,
    pub default_environment: String,
    pub min_request_interval_ms: u64,
    pub toolkit_version: String,
    pub last_used: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            github_token: None,
            cache_dir: None,
            default_environment: DEFAULT_ENVIRONMENT.to_string(),
            min_request_interval_ms: 1000,
            toolkit_version: DEFAULT_TOOLKIT_VERSION.to_string(),
            last_used: None,
        }
    }
}

impl DeployerConfig {
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_in(&get_config_directory()?)
    }

    pub fn load_or_create_in(config_dir: &Path) -> Result<Self> {
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_in(config_dir)?;
            log::debug!("Created default configuration at {}", config_file.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_in(&get_config_directory()?)
    }

    pub fn save_in(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Token from the environment, falling back to the stored one
    pub fn github_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.github_token.clone())
    }

    pub fn repository_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_repository_cache_directory(),
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn mark_used(&mut self) {
        self.last_used = Some(chrono::Utc::now());
    }
}
