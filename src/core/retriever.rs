//! Repository retrieval: cache first, GitHub content API second.
//!
//! [`RepositoryRetriever`] combines the [`RateLimitedFetcher`] with the
//! [`RepositoryCache`] to materialize an (owner, repo, branch) snapshot as a local
//! directory. Callers always receive a fresh scratch copy, never the cache's own
//! directory, so later build steps cannot corrupt the cache.
//!
//! # Download Strategy
//! 1. **Tree**: One recursive tree request; failure aborts the retrieval
//! 2. **Blobs**: One content request per blob, decoded from base64 and written in place
//! 3. **Best effort**: A failing file is logged and recorded as skipped
//! 4. **Populate**: The finished scratch tree is stored in the cache

use crate::core::cache::{CacheKey, RepositoryCache};
use crate::core::error::{DeployerError, Result};
use crate::core::fetcher::{RateLimitedFetcher, CONTENT_TIMEOUT, TREE_TIMEOUT};
use crate::core::fs_util::{copy_dir_recursive, remove_dir_if_exists, safe_join};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FileOutcome {
    Written { bytes: u64 },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub path: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalSummary {
    pub from_cache: bool,
    pub files: Vec<FileResult>,
}

impl RetrievalSummary {
    pub fn written_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Written { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Skipped { reason } => Some((f.path.as_str(), reason.as_str())),
            FileOutcome::Written { .. } => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub key: CacheKey,
    /// Scratch directory owned by the caller
    pub path: PathBuf,
    pub summary: RetrievalSummary,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct BranchItem {
    name: String,
}

/// Core API quota as reported by `/rate_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,
    #[serde(rename = "reset")]
    pub reset_epoch: i64,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimitStatus,
}

pub struct RepositoryRetriever {
    fetcher: RateLimitedFetcher,
    cache: RepositoryCache,
    api_base: String,
    scratch_root: PathBuf,
}

impl RepositoryRetriever {
    pub fn new(fetcher: RateLimitedFetcher, cache: RepositoryCache) -> Self {
        Self {
            fetcher,
            cache,
            api_base: DEFAULT_API_BASE.to_string(),
            scratch_root: std::env::temp_dir(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Directory under which scratch copies are created
    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = scratch_root.into();
        self
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut RepositoryCache {
        &mut self.cache
    }

    pub fn fetcher(&self) -> &RateLimitedFetcher {
        &self.fetcher
    }

    pub fn tree_url(&self, key: &CacheKey) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base,
            key.owner,
            key.repo,
            urlencoding::encode(&key.branch)
        )
    }

    pub fn content_url(&self, key: &CacheKey, path: &str) -> String {
        let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base,
            key.owner,
            key.repo,
            encoded.join("/"),
            urlencoding::encode(&key.branch)
        )
    }

    /// Produce a local copy of (owner, repo, branch), from cache when possible
    pub fn retrieve(&mut self, owner: &str, repo: &str, branch: &str) -> Result<Retrieval> {
        let key = CacheKey::new(owner, repo, branch);

        if let Some(cached) = self.cache.retrieve(&key) {
            log::info!("Using cached repository {key}");
            let scratch = self.new_scratch_dir(&key)?;
            copy_dir_recursive(&cached, &scratch)?;
            return Ok(Retrieval {
                key,
                path: scratch,
                summary: RetrievalSummary {
                    from_cache: true,
                    files: Vec::new(),
                },
            });
        }

        let scratch = self.new_scratch_dir(&key)?;
        let summary = match self.download_into(&key, &scratch) {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_exists(&scratch) {
                    log::warn!("Failed to clean scratch directory {}: {cleanup}", scratch.display());
                }
                return Err(e);
            }
        };

        if let Err(e) = self.cache.store(&key, &scratch) {
            log::warn!("Caching {key} failed (download result is still usable): {e}");
        }

        // The scratch tree, not the cached snapshot: callers may modify what they get
        Ok(Retrieval {
            key,
            path: scratch,
            summary,
        })
    }

    /// Drop any cached snapshot and download again
    pub fn retrieve_fresh(&mut self, owner: &str, repo: &str, branch: &str) -> Result<Retrieval> {
        self.cache.evict(&CacheKey::new(owner, repo, branch));
        self.retrieve(owner, repo, branch)
    }

    /// Branch names of a repository, falling back to `main` when they cannot be listed
    pub fn list_branches(&self, owner: &str, repo: &str) -> Vec<String> {
        let url = format!("{}/repos/{owner}/{repo}/branches", self.api_base);
        let fallback = || vec!["main".to_string()];

        match self.fetcher.fetch(&url, &accept_json(), TREE_TIMEOUT) {
            Ok(response) if response.is_success() => {
                match serde_json::from_str::<Vec<BranchItem>>(&response.body) {
                    Ok(branches) if !branches.is_empty() => {
                        branches.into_iter().map(|b| b.name).collect()
                    }
                    Ok(_) => fallback(),
                    Err(e) => {
                        log::warn!("Could not parse branch list: {e}");
                        fallback()
                    }
                }
            }
            Ok(response) => {
                log::warn!("Could not load branches: {}", response.status);
                fallback()
            }
            Err(e) => {
                log::warn!("Could not load branches: {e}");
                fallback()
            }
        }
    }

    /// Current core quota, or `None` when it cannot be read
    pub fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        let url = format!("{}/rate_limit", self.api_base);
        let response = match self.fetcher.fetch(&url, &accept_json(), TREE_TIMEOUT) {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                log::warn!("Could not read rate limit status: {}", response.status);
                return None;
            }
            Err(e) => {
                log::warn!("Could not read rate limit status: {e}");
                return None;
            }
        };

        match serde_json::from_str::<RateLimitResponse>(&response.body) {
            Ok(parsed) => Some(parsed.resources.core),
            Err(e) => {
                log::warn!("Malformed rate limit response: {e}");
                None
            }
        }
    }

    fn new_scratch_dir(&self, key: &CacheKey) -> Result<PathBuf> {
        fs::create_dir_all(&self.scratch_root)?;
        let prefix = format!("{}-{}-", key.repo, key.branch.replace('/', "_"));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.scratch_root)?;
        Ok(dir.into_path())
    }

    fn download_into(&self, key: &CacheKey, destination: &Path) -> Result<RetrievalSummary> {
        let tree = self.fetch_tree(key)?;
        let blobs: Vec<&TreeItem> = tree.tree.iter().filter(|item| item.kind == "blob").collect();
        log::info!("Downloading {} files from {key}", blobs.len());

        let mut summary = RetrievalSummary::default();
        for (i, item) in blobs.iter().enumerate() {
            log::debug!("Downloading file {}/{}: {}", i + 1, blobs.len(), item.path);
            let outcome = self.download_file(key, &item.path, destination);
            if let FileOutcome::Skipped { reason } = &outcome {
                log::warn!("Skipping {}: {reason}", item.path);
            }
            summary.files.push(FileResult {
                path: item.path.clone(),
                outcome,
            });
        }

        log::info!(
            "Downloaded {} of {} files successfully",
            summary.written_count(),
            blobs.len()
        );
        Ok(summary)
    }

    fn fetch_tree(&self, key: &CacheKey) -> Result<TreeResponse> {
        let url = self.tree_url(key);
        let response = self
            .fetcher
            .fetch(&url, &accept_json(), TREE_TIMEOUT)
            .map_err(|e| {
                log::error!("Failed to get repository tree: {e}");
                DeployerError::tree_request_failed(key.to_string(), e)
            })?;

        if !response.is_success() {
            log::error!("Failed to get repository tree: {}", response.status);
            return Err(DeployerError::tree_fetch_failed(
                key.to_string(),
                format!("HTTP {}", response.status),
            ));
        }

        let tree: TreeResponse = serde_json::from_str(&response.body).map_err(|e| {
            DeployerError::tree_fetch_failed(key.to_string(), format!("malformed tree response: {e}"))
        })?;
        if tree.truncated {
            log::warn!("Tree listing for {key} was truncated by the API; some files will be missing");
        }
        Ok(tree)
    }

    fn download_file(&self, key: &CacheKey, path: &str, destination: &Path) -> FileOutcome {
        let skipped = |reason: String| FileOutcome::Skipped { reason };

        let Some(target) = safe_join(destination, path) else {
            return skipped("path escapes the repository root".to_string());
        };

        let response = match self
            .fetcher
            .fetch(&self.content_url(key, path), &accept_json(), CONTENT_TIMEOUT)
        {
            Ok(response) => response,
            Err(e) => return skipped(e.to_string()),
        };
        if !response.is_success() {
            return skipped(format!("HTTP {}", response.status));
        }

        let content: ContentResponse = match serde_json::from_str(&response.body) {
            Ok(content) => content,
            Err(e) => return skipped(format!("malformed content response: {e}")),
        };
        if content.kind != "file" {
            return skipped(format!("not a file ({})", content.kind));
        }

        let encoded: String = content.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = match STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => return skipped(format!("invalid base64 content: {e}")),
        };

        let written = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&target, &bytes));
        match written {
            Ok(()) => FileOutcome::Written {
                bytes: bytes.len() as u64,
            },
            Err(e) => skipped(format!("write failed: {e}")),
        }
    }
}

fn accept_json() -> Vec<(String, String)> {
    vec![(
        "Accept".to_string(),
        "application/vnd.github+json".to_string(),
    )]
}
