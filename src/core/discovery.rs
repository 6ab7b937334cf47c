//! Discovery of environment configuration files inside a repository tree.
//!
//! A configuration is any file named `config.<env>.yaml`. Each one may be paired with a
//! `README.<env>.md` (any casing) found elsewhere in the same tree.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const DEFAULT_ENVIRONMENT: &str = "weather";

const CONFIG_PREFIX: &str = "config.";
const CONFIG_SUFFIX: &str = ".yaml";

/// Directories never searched: build output and VCS metadata
const SKIPPED_DIRECTORIES: &[&str] = &["build", ".git"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    /// Name of the directory holding the config file
    pub package_name: String,
    pub environment_name: String,
    /// Path of the config file relative to the repository root
    pub config_file_path: PathBuf,
    pub readme_content: Option<String>,
}

impl ConfigDescriptor {
    pub fn config_file_name(&self) -> String {
        self.config_file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory the build runs in: the config file's directory under `repo_root`
    pub fn project_dir(&self, repo_root: &Path) -> PathBuf {
        match self.config_file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => repo_root.join(parent),
            _ => repo_root.to_path_buf(),
        }
    }

    pub fn absolute_config_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.config_file_path)
    }
}

/// Environment name encoded in a `config.<env>.yaml` file name
pub fn environment_from_file_name(file_name: &str) -> Option<&str> {
    let env = file_name
        .strip_prefix(CONFIG_PREFIX)?
        .strip_suffix(CONFIG_SUFFIX)?;
    (!env.is_empty()).then_some(env)
}

pub fn discover(root: &Path) -> Vec<ConfigDescriptor> {
    discover_with_default(root, DEFAULT_ENVIRONMENT)
}

/// Find every configuration below `root`, `default_env` first, then by file name
pub fn discover_with_default(root: &Path, default_env: &str) -> Vec<ConfigDescriptor> {
    let mut configs: Vec<ConfigDescriptor> = walk_files(root)
        .into_iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?;
            let env = environment_from_file_name(file_name)?.to_string();
            let relative = path.strip_prefix(root).ok()?.to_path_buf();
            let package_name = relative
                .parent()
                .and_then(|p| p.file_name())
                .or_else(|| root.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let readme_content = find_readme(root, &env);
            Some(ConfigDescriptor {
                package_name,
                environment_name: env,
                config_file_path: relative,
                readme_content,
            })
        })
        .collect();

    configs.sort_by(|a, b| {
        let a_default = a.environment_name != default_env;
        let b_default = b.environment_name != default_env;
        a_default
            .cmp(&b_default)
            .then_with(|| a.config_file_name().cmp(&b.config_file_name()))
            .then_with(|| a.config_file_path.cmp(&b.config_file_path))
    });

    log::debug!("Discovered {} configuration files under {}", configs.len(), root.display());
    configs
}

/// Text of the first `readme.<env>.md` (case-insensitive), checking the root before the rest of the tree
pub fn find_readme(root: &Path, env: &str) -> Option<String> {
    let wanted = format!("readme.{env}.md").to_lowercase();
    let matches = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_lowercase() == wanted)
            .unwrap_or(false)
    };

    let in_root = fs::read_dir(root).ok().and_then(|entries| {
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && matches(p))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    });

    let found = in_root.or_else(|| walk_files(root).into_iter().find(|p| matches(p)))?;
    match fs::read(&found) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log::warn!("Could not read {}: {e}", found.display());
            None
        }
    }
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry during discovery: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRECTORIES.contains(&name))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_environment_from_file_name() {
        assert_eq!(environment_from_file_name("config.weather.yaml"), Some("weather"));
        assert_eq!(environment_from_file_name("config.a.b.yaml"), Some("a.b"));
        assert_eq!(environment_from_file_name("config..yaml"), None);
        assert_eq!(environment_from_file_name("Config.dev.yaml"), None);
        assert_eq!(environment_from_file_name("config.dev.yml"), None);
    }

    #[test]
    fn test_pairs_config_with_readme() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pkg/config.weather.yaml", "environment: {}\n");
        write(temp.path(), "pkg/readme.weather.md", "# Weather\n");

        let configs = discover(temp.path());
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].package_name, "pkg");
        assert_eq!(configs[0].environment_name, "weather");
        assert_eq!(configs[0].config_file_path, PathBuf::from("pkg/config.weather.yaml"));
        assert_eq!(configs[0].readme_content.as_deref(), Some("# Weather\n"));
    }

    #[test]
    fn test_readme_match_is_case_insensitive_and_prefers_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/README.Dev.md", "nested");
        write(temp.path(), "README.dev.md", "root");
        assert_eq!(find_readme(temp.path(), "dev").as_deref(), Some("root"));
        assert_eq!(find_readme(temp.path(), "prod"), None);
    }

    #[test]
    fn test_default_environment_sorts_first() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "x/config.alpha.yaml", "");
        write(temp.path(), "y/config.weather.yaml", "");
        write(temp.path(), "z/config.beta.yaml", "");

        let envs: Vec<_> = discover(temp.path())
            .into_iter()
            .map(|c| c.environment_name)
            .collect();
        assert_eq!(envs, vec!["weather", "alpha", "beta"]);
    }

    #[test]
    fn test_empty_tree_and_build_output_ignored() {
        let temp = TempDir::new().unwrap();
        assert!(discover(temp.path()).is_empty());
        assert!(discover(&temp.path().join("missing")).is_empty());

        write(temp.path(), "pkg/build/config.weather.yaml", "");
        write(temp.path(), "pkg/notes.yaml", "");
        assert!(discover(temp.path()).is_empty());
    }
}
