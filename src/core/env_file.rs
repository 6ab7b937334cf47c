//! `.env` style environment files: `KEY=VALUE` lines, `#` comments.

use crate::core::error::{DeployerError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const REQUIRED_VARIABLES: &[&str] = &["CDF_PROJECT", "CDF_CLUSTER"];

const SENSITIVE_MARKERS: &[&str] = &["secret", "password", "token"];
const HIDDEN_VALUE: &str = "***hidden***";

pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content =
        fs::read_to_string(path).map_err(|e| DeployerError::env_file_read_failed(path, e))?;
    let variables = parse_env(&content);
    log::debug!("Loaded {} variables from {}", variables.len(), path.display());
    Ok(variables)
}

/// Required variables that are absent or empty
pub fn missing_required(variables: &BTreeMap<String, String>) -> Vec<&'static str> {
    REQUIRED_VARIABLES
        .iter()
        .copied()
        .filter(|name| variables.get(*name).map_or(true, |v| v.is_empty()))
        .collect()
}

pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// `(key, value)` pairs safe to display
pub fn preview(variables: &BTreeMap<String, String>) -> Vec<(String, String)> {
    variables
        .iter()
        .map(|(key, value)| {
            let shown = if is_sensitive(key) {
                HIDDEN_VALUE.to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_splits_on_first_equals() {
        let vars = parse_env(
            "# credentials\n\nCDF_PROJECT = my-project\nIDP_SCOPES=https://x/.default?a=b\nnot a pair\n",
        );
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["CDF_PROJECT"], "my-project");
        assert_eq!(vars["IDP_SCOPES"], "https://x/.default?a=b");
    }

    #[test]
    fn test_missing_required_treats_empty_as_missing() {
        let vars = parse_env("CDF_PROJECT=\n");
        assert_eq!(missing_required(&vars), vec!["CDF_PROJECT", "CDF_CLUSTER"]);
        let vars = parse_env("CDF_PROJECT=p\nCDF_CLUSTER=westeurope-1\n");
        assert!(missing_required(&vars).is_empty());
    }

    #[test]
    fn test_preview_hides_sensitive_values() {
        let vars = parse_env("IDP_CLIENT_SECRET=s3cr3t\nGITHUB_TOKEN=t\nDB_Password=p\nCDF_PROJECT=p\n");
        let shown: BTreeMap<_, _> = preview(&vars).into_iter().collect();
        assert_eq!(shown["IDP_CLIENT_SECRET"], "***hidden***");
        assert_eq!(shown["GITHUB_TOKEN"], "***hidden***");
        assert_eq!(shown["DB_Password"], "***hidden***");
        assert_eq!(shown["CDF_PROJECT"], "p");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_env_file(Path::new("/no/such/.env")).unwrap_err();
        assert!(matches!(err, DeployerError::EnvFileReadFailed { .. }));
    }
}
