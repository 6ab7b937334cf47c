//! Repository trees, scripted GitHub responses and isolated CLI environments

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use repo_deployer::core::{
    CacheKey, HttpResponse, RateLimitedFetcher, RepositoryCache, RepositoryRetriever,
    ScriptedTransport, SystemClock, VirtualClock,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const API_BASE: &str = "https://github.test";

pub const WEATHER_CONFIG: &str = "\
environment:
  name: weather
  project: weather-dev
  validation-type: dev
  selected:
    - modules/weather-pipeline
";

pub const TRANSFORMATION: &str = "externalId: tr_weather\nname: Weather transformation\n";

/// Files of the demo repository: one environment selecting one module
pub fn demo_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("config.weather.yaml", WEATHER_CONFIG),
        ("README.weather.md", "# Weather pipeline\n"),
        (
            "modules/weather-pipeline/transformations/weather.Transformation.yaml",
            TRANSFORMATION,
        ),
    ]
}

pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> Result<()> {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

pub fn demo_tree() -> Result<TempDir> {
    let dir = TempDir::new()?;
    write_tree(dir.path(), &demo_files())?;
    Ok(dir)
}

/// Transport answering the tree and contents endpoints for `files`
pub fn scripted_github(key: &CacheKey, files: &[(&str, &str)]) -> Arc<ScriptedTransport> {
    let transport = ScriptedTransport::new();
    let tree: Vec<serde_json::Value> = files
        .iter()
        .map(|(path, _)| serde_json::json!({ "path": path, "type": "blob" }))
        .collect();
    transport.respond(
        format!(
            "{API_BASE}/repos/{}/{}/git/trees/{}?recursive=1",
            key.owner, key.repo, key.branch
        ),
        HttpResponse::new(200, serde_json::json!({ "tree": tree, "truncated": false }).to_string()),
    );
    for (path, content) in files {
        transport.respond(
            format!(
                "{API_BASE}/repos/{}/{}/contents/{path}?ref={}",
                key.owner, key.repo, key.branch
            ),
            HttpResponse::new(
                200,
                serde_json::json!({ "type": "file", "content": STANDARD.encode(content) }).to_string(),
            ),
        );
    }
    Arc::new(transport)
}

/// Retriever over a scripted transport and a virtual clock, caching under `workspace`
pub fn scripted_retriever(workspace: &Path, transport: Arc<ScriptedTransport>) -> Result<RepositoryRetriever> {
    let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
    let fetcher = RateLimitedFetcher::new(transport, clock.clone()).with_min_interval(Duration::ZERO);
    let cache = RepositoryCache::open(workspace.join("cache"), clock)?;
    Ok(RepositoryRetriever::new(fetcher, cache)
        .with_api_base(API_BASE)
        .with_scratch_root(workspace.join("scratch")))
}

/// Isolated home for the CLI: config, cache and scratch directories all live in one tempdir
pub struct CliEnv {
    pub home: TempDir,
}

impl CliEnv {
    pub fn new() -> Result<Self> {
        Ok(Self { home: TempDir::new()? })
    }

    pub fn config_home(&self) -> PathBuf {
        self.home.path().join("config")
    }

    pub fn cache_home(&self) -> PathBuf {
        self.home.path().join("cache")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.home.path().join("tmp")
    }

    pub fn command(&self) -> Result<Command> {
        fs::create_dir_all(self.tmp_dir())?;
        let mut cmd = Command::cargo_bin("repo-deployer")?;
        cmd.env("XDG_CONFIG_HOME", self.config_home())
            .env("XDG_CACHE_HOME", self.cache_home())
            .env("TMPDIR", self.tmp_dir())
            .env("NO_COLOR", "1")
            .env_remove("REPO_DEPLOYER_GITHUB_TOKEN");
        Ok(cmd)
    }

    /// Put `files` in the repository cache the CLI will open, as owner/repo@branch
    pub fn seed_cache(&self, key: &CacheKey, files: &[(&str, &str)]) -> Result<()> {
        let source = TempDir::new()?;
        write_tree(source.path(), files)?;
        let root = self.cache_home().join("repo-deployer").join("repositories");
        let mut cache = RepositoryCache::open(root, Arc::new(SystemClock))?;
        cache.store(key, source.path())?;
        Ok(())
    }

    pub fn write_env_file(&self, content: &str) -> Result<PathBuf> {
        let path = self.home.path().join(".env");
        fs::write(&path, content)?;
        Ok(path)
    }
}
