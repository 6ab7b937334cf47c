//! On-disk cache of downloaded repository trees.
//!
//! Each (owner, repository, branch) snapshot lives in its own directory under the cache
//! root, named by the md5 hash of `owner/repo@branch`. A single JSON metadata index
//! (`cache_metadata.json`) records when each snapshot was stored and how large it is.
//!
//! # Public API
//! - [`CacheKey`]: Identifies one cached snapshot
//! - [`CacheEntry`]: Metadata index record for one snapshot
//! - [`CacheStats`]: Aggregate occupancy, counting only entries still present on disk
//! - [`RepositoryCache`]: The cache itself
//!
//! # Cache Strategy
//! - **TTL**: Entries older than 24 hours are evicted on the next lookup
//! - **Self-healing**: Entries whose directory disappeared are pruned on lookup
//! - **Best effort index**: An unreadable or corrupt index is treated as empty, and a
//!   failed index write is logged without failing the operation
//!
//! The index is not locked. Two processes writing the same cache root race, and the
//! last writer's index wins.

use crate::core::clock::Clock;
use crate::core::error::{DeployerError, Result};
use crate::core::fs_util::{copy_dir_recursive, directory_size, remove_dir_if_exists};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const METADATA_FILE: &str = "cache_metadata.json";
pub const CACHE_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl CacheKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// Stable directory name for this key
    pub fn hash(&self) -> String {
        format!("{:x}", md5::compute(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    pub cache_path: PathBuf,
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.owner, &self.repo, &self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_size_bytes: u64,
    pub cache_directory: PathBuf,
}

impl CacheStats {
    pub fn total_size_mb(&self) -> f64 {
        (self.total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

pub struct RepositoryCache {
    root: PathBuf,
    metadata: BTreeMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl RepositoryCache {
    /// Open (creating if needed) the cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root) {
            log::error!("Failed to create cache directory '{}': {}", root.display(), e);
            return Err(DeployerError::cache_directory_creation_failed(&root, e));
        }

        let metadata = load_metadata(&root.join(METADATA_FILE));
        log::debug!(
            "Opened repository cache at {} with {} entries",
            root.display(),
            metadata.len()
        );

        Ok(Self {
            root,
            metadata,
            clock,
            ttl: chrono::Duration::seconds(CACHE_TTL_SECONDS),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.hash())
    }

    /// Whether a fresh snapshot exists for `key`. Prunes missing and expired entries.
    pub fn is_cached(&mut self, key: &CacheKey) -> bool {
        let hash = key.hash();
        let Some(entry) = self.metadata.get(&hash) else {
            return false;
        };
        let created_at = entry.created_at;

        if !self.entry_path(key).exists() {
            log::debug!("Cache directory for {key} disappeared, pruning entry");
            self.metadata.remove(&hash);
            self.persist();
            return false;
        }

        if self.clock.now() - created_at > self.ttl {
            log::debug!("Cache entry for {key} expired (stored {created_at})");
            self.evict(key);
            return false;
        }

        true
    }

    /// Copy `source` into the cache for `key`, replacing any previous snapshot
    pub fn store(&mut self, key: &CacheKey, source: &Path) -> Result<PathBuf> {
        let path = self.entry_path(key);
        let had_entry = self.metadata.remove(&key.hash()).is_some();

        let copied = remove_dir_if_exists(&path).and_then(|_| copy_dir_recursive(source, &path));
        if let Err(e) = copied {
            log::error!("Failed to copy {} into cache: {e}", source.display());
            if let Err(cleanup) = remove_dir_if_exists(&path) {
                log::warn!("Failed to remove partial cache directory {}: {cleanup}", path.display());
            }
            if had_entry {
                self.persist();
            }
            return Err(DeployerError::cache_copy_failed(source, &path, e));
        }

        let size_bytes = directory_size(&path);
        self.metadata.insert(
            key.hash(),
            CacheEntry {
                owner: key.owner.clone(),
                repo: key.repo.clone(),
                branch: key.branch.clone(),
                created_at: self.clock.now(),
                cache_path: path.clone(),
                size_bytes,
            },
        );
        self.persist();

        log::debug!("Cached {key} at {} ({size_bytes} bytes)", path.display());
        Ok(path)
    }

    pub fn retrieve(&mut self, key: &CacheKey) -> Option<PathBuf> {
        if self.is_cached(key) {
            Some(self.entry_path(key))
        } else {
            None
        }
    }

    /// Remove the snapshot for `key`. Returns whether a directory or index entry was removed.
    pub fn evict(&mut self, key: &CacheKey) -> bool {
        let removed_dir = match remove_dir_if_exists(&self.entry_path(key)) {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Failed to remove cache directory for {key}: {e}");
                false
            }
        };

        let removed_entry = self.metadata.remove(&key.hash()).is_some();
        if removed_entry {
            self.persist();
        }

        removed_dir || removed_entry
    }

    /// Remove every snapshot and reset the index
    pub fn clear_all(&mut self) -> Result<()> {
        remove_dir_if_exists(&self.root)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| DeployerError::cache_directory_creation_failed(&self.root, e))?;

        self.metadata.clear();
        self.save_metadata()
    }

    pub fn stats(&self) -> CacheStats {
        let mut count = 0;
        let mut total_size_bytes = 0;

        for (hash, entry) in &self.metadata {
            if self.root.join(hash).exists() {
                count += 1;
                total_size_bytes += entry.size_bytes;
            }
        }

        CacheStats {
            count,
            total_size_bytes,
            cache_directory: self.root.clone(),
        }
    }

    pub fn info(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.metadata.get(&key.hash())
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.metadata.values()
    }

    fn save_metadata(&self) -> Result<()> {
        let path = self.root.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&self.metadata)
            .map_err(DeployerError::cache_serialization_failed)?;
        fs::write(&path, json).map_err(|e| DeployerError::cache_write_failed(&path, e))
    }

    fn persist(&self) {
        if let Err(e) = self.save_metadata() {
            log::warn!("Cache index save failed (continuing): {e}");
        }
    }
}

fn load_metadata(path: &Path) -> BTreeMap<String, CacheEntry> {
    if !path.exists() {
        return BTreeMap::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Cache index '{}' unreadable, starting empty: {e}", path.display());
            return BTreeMap::new();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("Cache index '{}' corrupt, starting empty: {e}", path.display());
        BTreeMap::new()
    })
}
