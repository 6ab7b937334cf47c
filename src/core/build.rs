//! Toolkit-style build of one environment configuration.
//!
//! A build copies the modules named in the configuration's `environment.selected`
//! list from `<project>/modules` into a fresh `<project>/build` directory, next to a
//! copy of the config file and a `build_info.yaml` metadata file. Builds are never
//! incremental: the previous build directory is removed first.

use crate::core::clock::Clock;
use crate::core::discovery::ConfigDescriptor;
use crate::core::error::{DeployerError, Result};
use crate::core::fs_util::{copy_dir_recursive, list_files, remove_dir_if_exists, safe_join};
use crate::core::report::boxed;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_TOOLKIT_VERSION: &str = "0.5.74";
pub const BUILD_DIR_NAME: &str = "build";
pub const MODULES_DIR_NAME: &str = "modules";
pub const BUILD_INFO_FILE: &str = "build_info.yaml";

const MODULE_PREFIX: &str = "modules/";
const DEFAULT_VALIDATION_TYPE: &str = "dev";

/// Contents of `build_info.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub toolkit_version: String,
    #[serde(rename = "environment")]
    pub environment_name: String,
    #[serde(rename = "config_file")]
    pub config_file_name: String,
    pub modules: Vec<String>,
    #[serde(rename = "build_timestamp")]
    pub timestamp_epoch: i64,
    pub project_path: PathBuf,
}

impl BuildMetadata {
    /// Read the metadata of an existing build directory, if it has any
    pub fn read(build_dir: &Path) -> Result<Option<Self>> {
        let path = build_dir.join(BUILD_INFO_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&content)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub build_dir: PathBuf,
    pub copied_modules: Vec<String>,
    /// Selected modules that were not found and skipped
    pub missing_modules: Vec<String>,
    pub config_file_copy: PathBuf,
    pub metadata: BuildMetadata,
    /// Console output in the toolkit's format
    pub log: Vec<String>,
}

impl BuildArtifact {
    /// Sorted relative paths of every file in the build directory
    pub fn files(&self) -> Result<Vec<String>> {
        list_files(&self.build_dir)
    }
}

/// Module selection declared by a config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSelection {
    pub modules: Vec<String>,
    pub validation_type: String,
}

impl ModuleSelection {
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(content)?;
        let environment = value.get("environment");

        let modules = environment
            .and_then(|env| env.get("selected"))
            .and_then(Value::as_sequence)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match entry.as_str() {
                        Some(module) => Some(strip_module_prefix(module).to_string()),
                        None => {
                            log::warn!("Ignoring non-string module selection entry: {entry:?}");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let validation_type = environment
            .and_then(|env| env.get("validation-type"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VALIDATION_TYPE)
            .to_string();

        Ok(Self {
            modules,
            validation_type,
        })
    }
}

fn strip_module_prefix(module: &str) -> &str {
    module.strip_prefix(MODULE_PREFIX).unwrap_or(module)
}

pub struct BuildSimulator {
    clock: Arc<dyn Clock>,
    toolkit_version: String,
}

impl BuildSimulator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            toolkit_version: DEFAULT_TOOLKIT_VERSION.to_string(),
        }
    }

    pub fn with_toolkit_version(mut self, version: impl Into<String>) -> Self {
        self.toolkit_version = version.into();
        self
    }

    pub fn build(
        &self,
        repo_root: &Path,
        config: &ConfigDescriptor,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<BuildArtifact> {
        let project_dir = config.project_dir(repo_root);
        let config_file_name = config.config_file_name();
        let config_path = project_dir.join(&config_file_name);
        log::debug!(
            "Building {} in {} with {} environment variables",
            config.environment_name,
            project_dir.display(),
            env_vars.len()
        );

        if !config_path.is_file() {
            log::error!("Config file not found: {}", config_path.display());
            return Err(DeployerError::config_file_not_found(&config_path));
        }

        let content = fs::read_to_string(&config_path)?;
        let selection = ModuleSelection::parse(&content)
            .map_err(|e| DeployerError::config_parse_failed(&config_path, e))?;
        if selection.modules.is_empty() {
            log::debug!("No modules selected in {config_file_name}");
        }

        let modules_dir = project_dir.join(MODULES_DIR_NAME);
        let mut log_lines: Vec<String> = boxed(&[
            format!("Building project '{}':", project_dir.display()),
            format!("  - Toolkit Version '{}'", self.toolkit_version),
            format!(
                "  - Environment name '{}', validation-type '{}'.",
                config.environment_name, selection.validation_type
            ),
            format!("  - Config '{}'", config_path.display()),
            format!("  - Module directory '{}'", modules_dir.display()),
        ]);

        if !modules_dir.is_dir() {
            log::error!("Modules directory not found: {}", modules_dir.display());
            return Err(DeployerError::modules_directory_not_found(&modules_dir));
        }

        let build_dir = project_dir.join(BUILD_DIR_NAME);
        let cleaned = remove_dir_if_exists(&build_dir)?;
        let build_modules_dir = build_dir.join(MODULES_DIR_NAME);
        fs::create_dir_all(&build_modules_dir)?;

        let mut copied_modules = Vec::new();
        let mut missing_modules = Vec::new();
        for module in &selection.modules {
            let source = safe_join(&modules_dir, module).filter(|p| p.exists());
            let destination = safe_join(&build_modules_dir, module);
            match (source, destination) {
                (Some(source), Some(destination)) => {
                    copy_module(&source, &destination)?;
                    log_lines.push(format!("Copied module: {module}"));
                    copied_modules.push(module.clone());
                }
                _ => {
                    log::warn!("Module not found: {module}");
                    log_lines.push(format!("WARNING: Module not found: {module}"));
                    missing_modules.push(module.clone());
                }
            }
        }

        let config_file_copy = build_dir.join(&config_file_name);
        fs::copy(&config_path, &config_file_copy)?;

        let metadata = BuildMetadata {
            toolkit_version: self.toolkit_version.clone(),
            environment_name: config.environment_name.clone(),
            config_file_name,
            modules: selection.modules.clone(),
            timestamp_epoch: self.clock.now().timestamp(),
            project_path: project_dir.clone(),
        };
        fs::write(build_dir.join(BUILD_INFO_FILE), serde_yaml::to_string(&metadata)?)?;

        if cleaned {
            log_lines.push(format!("INFO: Cleaned existing build directory {BUILD_DIR_NAME}."));
        }
        log_lines.push(format!(
            "INFO: Build complete. Files are located in {BUILD_DIR_NAME}/"
        ));
        log::info!(
            "Built {} with {} of {} selected modules",
            metadata.environment_name,
            copied_modules.len(),
            selection.modules.len()
        );

        Ok(BuildArtifact {
            build_dir,
            copied_modules,
            missing_modules,
            config_file_copy,
            metadata,
            log: log_lines,
        })
    }
}

fn copy_module(source: &Path, destination: &Path) -> Result<()> {
    if source.is_dir() {
        copy_dir_recursive(source, destination)?;
    } else {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, destination)?;
    }
    Ok(())
}
