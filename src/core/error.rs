//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`DeployerError`] which covers every step-fatal failure of the
//! download, build and deploy workflow. It uses `thiserror` for ergonomic error
//! definitions and includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`DeployerError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, DeployerError>`
//!
//! # Error Categories
//! - **Network**: Retries exhausted, permanent request failures, tree fetch failures
//! - **Cache**: Directory creation, serialization and write failures
//! - **Workflow**: Refused transitions and missing session data
//! - **Build / deploy**: Missing config file, missing modules directory, missing credentials
//!
//! Conditions that are recoverable inside one component (a single skipped file, a
//! missing module, an unreadable cache index) never become a `DeployerError`; they are
//! logged and reported through the component's own result types.

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for repo-deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    // Network errors
    #[error("Request to {url} failed after all retries ({attempts} attempts): {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: usize,
        last_error: String,
    },

    #[error("Request to {url} failed permanently: {reason}")]
    PermanentRequestFailure { url: String, reason: String },

    #[error("Failed to get repository tree for {repository}: {reason}")]
    TreeFetchFailed {
        repository: String,
        reason: String,
        #[source]
        source: Option<Box<DeployerError>>,
    },

    #[error("Invalid repository reference '{input}'. Use owner/repo or a GitHub URL")]
    InvalidRepositoryReference { input: String },

    // File operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    // Cache errors
    #[error("Could not find cache directory")]
    CacheDirectoryNotFound,

    #[error("Failed to create cache directory '{path}': {source}")]
    CacheDirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' into cache at '{to}': {source}")]
    CacheCopyFailed {
        from: PathBuf,
        to: PathBuf,
        source: Box<DeployerError>,
    },

    #[error("Failed to serialize cache data: {source}")]
    CacheSerializationFailed { source: serde_json::Error },

    #[error("Failed to write cache file '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    // Workflow errors
    #[error("Cannot advance to step {target}: {reason}")]
    PreconditionViolation { target: u8, reason: String },

    #[error("No repository downloaded. Run 'repo-deployer download <owner/repo>' first.")]
    NoRepositoryDownloaded,

    #[error("No configuration selected. Run 'repo-deployer select <environment>' first.")]
    NoConfigSelected,

    #[error("No configuration named '{name}' was discovered. Run 'repo-deployer configs' to list them.")]
    UnknownEnvironment { name: String },

    // Build errors
    #[error("Config file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Modules directory not found: {path}")]
    ModulesDirectoryNotFound { path: PathBuf },

    // Deploy errors
    #[error("Build directory not found. Run build first.")]
    BuildDirectoryNotFound,

    #[error("Missing required credentials for deployment: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<String> },

    // Environment file errors
    #[error("Failed to read environment file '{path}': {source}")]
    EnvFileReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience type alias for Results using DeployerError
pub type Result<T> = std::result::Result<T, DeployerError>;

impl DeployerError {
    /// Create a retries exhausted error for a URL
    pub fn retries_exhausted(
        url: impl Into<String>,
        attempts: usize,
        last_error: impl Into<String>,
    ) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Create a permanent request failure error
    pub fn permanent_request_failure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermanentRequestFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a tree fetch failure error
    pub fn tree_fetch_failed(repository: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TreeFetchFailed {
            repository: repository.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Tree fetch failure caused by a failed request, keeping the request error
    pub fn tree_request_failed(repository: impl Into<String>, source: DeployerError) -> Self {
        Self::TreeFetchFailed {
            repository: repository.into(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_repository_reference(input: impl Into<String>) -> Self {
        Self::InvalidRepositoryReference {
            input: input.into(),
        }
    }

    /// Create a cache directory creation failed error
    pub fn cache_directory_creation_failed(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CacheDirectoryCreationFailed {
            path: path.into(),
            source,
        }
    }

    pub fn cache_copy_failed(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: DeployerError,
    ) -> Self {
        Self::CacheCopyFailed {
            from: from.into(),
            to: to.into(),
            source: Box::new(source),
        }
    }

    /// Create a cache serialization failed error
    pub fn cache_serialization_failed(source: serde_json::Error) -> Self {
        Self::CacheSerializationFailed { source }
    }

    /// Create a cache write failed error
    pub fn cache_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a precondition violation for a refused step transition
    pub fn precondition_violation(target: u8, reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            target,
            reason: reason.into(),
        }
    }

    pub fn unknown_environment(name: impl Into<String>) -> Self {
        Self::UnknownEnvironment { name: name.into() }
    }

    /// Create a config file not found error
    pub fn config_file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigFileNotFound { path: path.into() }
    }

    pub fn config_parse_failed(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::ConfigParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a modules directory not found error
    pub fn modules_directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ModulesDirectoryNotFound { path: path.into() }
    }

    /// Create a missing credentials error listing every absent field
    pub fn missing_credentials<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingCredentials {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    pub fn env_file_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::EnvFileReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error belongs to the retry-eligible network category
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => true,
            Self::TreeFetchFailed {
                source: Some(inner),
                ..
            } => inner.is_transient(),
            _ => false,
        }
    }
}
