//! Core functionality for repo-deployer.
//!
//! This module provides the building blocks of the deploy workflow: rate-limited
//! fetching, the repository cache, configuration discovery, the workflow state
//! machine and the build/deploy simulators.

pub mod build;
pub mod cache;
pub mod clock;
pub mod command_init;
pub mod config;
pub mod deploy;
pub mod dirs;
pub mod discovery;
pub mod env_file;
pub mod error;
pub mod fetcher;
pub mod fs_util;
pub mod output;
pub mod repo_ref;
pub mod report;
pub mod retriever;
pub mod state;
pub mod transport;
pub mod workflow;

// === Error handling ===
pub use error::{DeployerError, Result};

// === Network ===
// Injectable transport and clock, wrapped by the spacing/backoff fetcher
pub use clock::{Clock, SystemClock, VirtualClock};
pub use fetcher::{RateLimitedFetcher, RetryPolicy};
pub use transport::{HttpResponse, HttpTransport, ScriptedTransport, TransportError, UreqTransport};

// === Repository acquisition ===
pub use cache::{CacheEntry, CacheKey, CacheStats, RepositoryCache};
pub use repo_ref::RepoRef;
pub use retriever::{FileOutcome, RateLimitStatus, Retrieval, RetrievalSummary, RepositoryRetriever};

// === Workflow ===
pub use discovery::{discover, ConfigDescriptor};
pub use state::SessionStore;
pub use workflow::{Step, StepStatus, Transition, WorkflowState, WorkflowStateMachine, WorkflowSummary};

// === Build and deploy ===
pub use build::{BuildArtifact, BuildMetadata, BuildSimulator};
pub use deploy::{DeployMode, DeployReport, DeploySimulator, DeployTarget, ResourceKindCount};
pub use report::ReportTable;

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success, print_warning};
