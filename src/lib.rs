//! repo-deployer - download a configuration repository from GitHub, build one of its
//! environments and deploy it, one validated step at a time.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - Rate-limited, cached repository retrieval
//! - Discovery of `config.<env>.yaml` environment configurations
//! - The five-step workflow state machine
//! - Build and deploy simulation with toolkit-compatible report output
//! - Error handling and result types

pub mod commands;
pub mod core;

pub use core::{
    discover,
    BuildArtifact,
    BuildSimulator,
    CacheKey,
    ConfigDescriptor,
    DeployMode,
    DeployReport,
    DeploySimulator,
    // Error handling
    DeployerError,
    RateLimitedFetcher,
    RepositoryCache,
    RepositoryRetriever,
    Result,
    Step,
    Transition,
    WorkflowState,
    WorkflowStateMachine,
};
