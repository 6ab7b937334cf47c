//! Shared setup for CLI commands.
//!
//! Every command runs inside a [`SessionContext`]: the user configuration, the
//! persisted workflow session and, on demand, a [`RepositoryRetriever`] wired to the
//! GitHub API. Commands mutate the workflow through the context and call
//! [`SessionContext::save`] once they succeed.
//!
//! # Initialization Steps
//! 1. **Configuration**: Load `config.json`, creating it with defaults if missing
//! 2. **Session**: Resume the workflow saved by the previous command
//! 3. **Debug flag**: Record whether `--debug` was given for this invocation

use crate::core::{
    cache::RepositoryCache,
    clock::{Clock, SystemClock},
    config::DeployerConfig,
    dirs::{get_config_directory, scratch_directory},
    discovery::ConfigDescriptor,
    error::{DeployerError, Result},
    fetcher::RateLimitedFetcher,
    retriever::RepositoryRetriever,
    state::SessionStore,
    transport::UreqTransport,
    workflow::WorkflowStateMachine,
};
use std::path::PathBuf;
use std::sync::Arc;

pub struct SessionContext {
    pub config: DeployerConfig,
    pub machine: WorkflowStateMachine,
    config_dir: PathBuf,
    store: SessionStore,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    pub fn initialize(debug: bool) -> Result<Self> {
        let config_dir = get_config_directory()?;
        let config = DeployerConfig::load_or_create_in(&config_dir)?;
        let store = SessionStore::default_location()?;
        let mut machine = store.load();
        machine.set_debug_mode(debug);

        log::debug!(
            "Session at {} is on step {}",
            store.path().display(),
            machine.current_step().number()
        );

        Ok(Self {
            config,
            machine,
            config_dir,
            store,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn open_cache(&self) -> Result<RepositoryCache> {
        RepositoryCache::open(self.config.repository_cache_dir()?, self.clock())
    }

    pub fn retriever(&self) -> Result<RepositoryRetriever> {
        let token = self.config.github_token();
        let fetcher = RateLimitedFetcher::new(Arc::new(UreqTransport::new()), self.clock())
            .with_min_interval(self.config.min_request_interval())
            .with_token(token.as_deref());

        Ok(RepositoryRetriever::new(fetcher, self.open_cache()?)
            .with_api_base(self.config.api_base_url.clone())
            .with_scratch_root(scratch_directory()))
    }

    pub fn require_tree_root(&self) -> Result<PathBuf> {
        self.machine
            .state()
            .repository_tree_root()
            .map(PathBuf::from)
            .ok_or(DeployerError::NoRepositoryDownloaded)
    }

    pub fn require_selected_config(&self) -> Result<ConfigDescriptor> {
        self.machine
            .state()
            .selected_config()
            .cloned()
            .ok_or(DeployerError::NoConfigSelected)
    }

    /// Persist the session and stamp the configuration as used
    pub fn save(&mut self) -> Result<()> {
        self.config.mark_used();
        if let Err(e) = self.config.save_in(&self.config_dir) {
            log::warn!("Failed to update configuration file: {e}");
        }
        self.store.save(&self.machine)
    }
}
