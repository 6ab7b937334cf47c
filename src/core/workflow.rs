//! The operator's five-step workflow and its transition rules.
//!
//! [`WorkflowState`] is a plain serializable value owned by one session. It is only
//! changed through [`WorkflowStateMachine`], which enforces the prerequisites of each
//! forward transition:
//!
//! | Target | Allowed when                                            |
//! |--------|---------------------------------------------------------|
//! | 2      | a repository tree has been downloaded                   |
//! | 3      | a tree is present and a configuration is selected       |
//! | 4      | the selected configuration has a successful build       |
//! | 5      | that build has been deployed (a dry run is not enough)  |
//!
//! Moving back to an earlier or the current step is always allowed. A refused
//! transition is reported as a [`Transition::Refused`] value, never as a panic.

use crate::core::build::BuildArtifact;
use crate::core::deploy::{DeployMode, DeployReport};
use crate::core::discovery::ConfigDescriptor;
use crate::core::error::{DeployerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    #[default]
    DownloadAndEnv = 1,
    SelectConfig = 2,
    Build = 3,
    Deploy = 4,
    Verify = 5,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::DownloadAndEnv,
        Step::SelectConfig,
        Step::Build,
        Step::Deploy,
        Step::Verify,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == number)
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::DownloadAndEnv => "Download & Environment",
            Step::SelectConfig => "Select Configuration",
            Step::Build => "Build",
            Step::Deploy => "Deploy",
            Step::Verify => "Verify",
        }
    }

    pub fn requirements(self) -> &'static [&'static str] {
        match self {
            Step::DownloadAndEnv => &["Repository URL", "Environment variables"],
            Step::SelectConfig => &["Extracted repository", "Config files discovered"],
            Step::Build => &["Selected configuration", "Environment variables"],
            Step::Deploy => &["Successful build of the selected configuration"],
            Step::Verify => &["Successful deploy"],
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Step::from_number(value).ok_or_else(|| format!("invalid workflow step {value}"))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Current,
    Future,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Completed => "completed",
            StepStatus::Current => "current",
            StepStatus::Future => "future",
        };
        f.write_str(label)
    }
}

/// Where the downloaded tree came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySource {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub environment_name: String,
    pub config_file_name: String,
    pub build_dir: PathBuf,
    pub copied_modules: Vec<String>,
    pub timestamp_epoch: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub mode: DeployMode,
    pub build_dir: PathBuf,
    pub resource_kinds: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    step: Step,
    repository: Option<RepositorySource>,
    repository_tree_root: Option<PathBuf>,
    #[serde(default)]
    discovered_configs: Vec<ConfigDescriptor>,
    selected_config: Option<ConfigDescriptor>,
    #[serde(default)]
    environment_variables: BTreeMap<String, String>,
    #[serde(default)]
    debug_mode: bool,
    last_build: Option<BuildRecord>,
    last_deploy: Option<DeployRecord>,
}

impl WorkflowState {
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn repository(&self) -> Option<&RepositorySource> {
        self.repository.as_ref()
    }

    pub fn repository_tree_root(&self) -> Option<&Path> {
        self.repository_tree_root.as_deref()
    }

    pub fn discovered_configs(&self) -> &[ConfigDescriptor] {
        &self.discovered_configs
    }

    pub fn selected_config(&self) -> Option<&ConfigDescriptor> {
        self.selected_config.as_ref()
    }

    pub fn environment_variables(&self) -> &BTreeMap<String, String> {
        &self.environment_variables
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn last_build(&self) -> Option<&BuildRecord> {
        self.last_build.as_ref()
    }

    pub fn last_deploy(&self) -> Option<&DeployRecord> {
        self.last_deploy.as_ref()
    }

    /// Check the step/data invariants
    pub fn validate(&self) -> Result<()> {
        let step = self.step().number();
        if step >= 2 && self.repository_tree_root.is_none() {
            return Err(DeployerError::precondition_violation(
                step,
                "no repository has been downloaded",
            ));
        }
        if step >= 3 && self.selected_config.is_none() {
            return Err(DeployerError::precondition_violation(
                step,
                "no configuration is selected",
            ));
        }
        Ok(())
    }

    fn has_build_for_selection(&self) -> bool {
        match (&self.selected_config, &self.last_build) {
            (Some(config), Some(build)) => {
                build.environment_name == config.environment_name
                    && build.config_file_name == config.config_file_name()
            }
            _ => false,
        }
    }

    fn has_successful_deploy(&self) -> bool {
        self.has_build_for_selection()
            && self
                .last_deploy
                .as_ref()
                .is_some_and(|deploy| deploy.mode == DeployMode::Deploy)
    }
}

/// Result of a requested step change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Step, to: Step },
    Refused { target: u8, reason: String },
}

impl Transition {
    pub fn is_moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }

    /// User-facing warning for a refused transition
    pub fn warning(&self) -> Option<String> {
        match self {
            Transition::Moved { .. } => None,
            Transition::Refused { target, reason } => Some(format!(
                "Cannot advance to step {target}. Prerequisites not met: {reason}"
            )),
        }
    }

    pub fn into_result(self) -> Result<Step> {
        match self {
            Transition::Moved { to, .. } => Ok(to),
            Transition::Refused { target, reason } => {
                Err(DeployerError::precondition_violation(target, reason))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub number: u8,
    pub name: &'static str,
    pub status: StepStatus,
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub current_step: u8,
    pub step_name: &'static str,
    pub repository: Option<String>,
    pub repository_tree_root: Option<PathBuf>,
    pub config_files: Vec<String>,
    pub selected_config: Option<String>,
    pub environment_variable_count: usize,
    pub steps: Vec<StepSummary>,
    pub next_step: Option<u8>,
    pub is_complete: bool,
}

#[derive(Debug, Default)]
pub struct WorkflowStateMachine {
    state: WorkflowState,
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a previously saved state. An inconsistent state starts over at step 1.
    pub fn from_state(state: WorkflowState) -> Self {
        match state.validate() {
            Ok(()) => Self { state },
            Err(e) => {
                log::warn!("Discarding inconsistent workflow state: {e}");
                Self::default()
            }
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    pub fn current_step(&self) -> Step {
        self.state.step()
    }

    /// `None` when `target` is reachable, otherwise the unmet prerequisite
    pub fn unmet_precondition(&self, target: u8) -> Option<String> {
        let Some(step) = Step::from_number(target) else {
            return Some(format!("step {target} does not exist"));
        };
        if step <= self.current_step() {
            return None;
        }

        let state = &self.state;
        match step {
            Step::DownloadAndEnv => None,
            Step::SelectConfig if state.repository_tree_root.is_none() => {
                Some("no repository has been downloaded".to_string())
            }
            Step::Build if state.repository_tree_root.is_none() => {
                Some("no repository has been downloaded".to_string())
            }
            Step::Build if state.selected_config.is_none() => {
                Some("no configuration is selected".to_string())
            }
            Step::Deploy if !state.has_build_for_selection() => {
                Some("the selected configuration has not been built".to_string())
            }
            Step::Verify if !state.has_successful_deploy() => {
                Some("the build has not been deployed".to_string())
            }
            _ => None,
        }
    }

    pub fn can_advance(&self, target: u8) -> bool {
        self.unmet_precondition(target).is_none()
    }

    pub fn advance(&mut self, target: u8) -> Transition {
        if let Some(reason) = self.unmet_precondition(target) {
            log::warn!("Cannot advance to step {target}: {reason}");
            return Transition::Refused { target, reason };
        }

        let from = self.current_step();
        // unmet_precondition returned None, so the step exists
        let to = Step::from_number(target).unwrap_or(from);
        self.state.step = to;
        log::debug!("Workflow moved from step {} to {}", from.number(), to.number());
        Transition::Moved { from, to }
    }

    pub fn reset(&mut self) {
        self.state = WorkflowState::default();
    }

    /// Record a downloaded tree. Anything derived from a previous tree is dropped.
    pub fn set_repository(
        &mut self,
        source: RepositorySource,
        tree_root: PathBuf,
        discovered_configs: Vec<ConfigDescriptor>,
    ) {
        self.state.repository = Some(source);
        self.state.repository_tree_root = Some(tree_root);
        self.state.discovered_configs = discovered_configs;
        self.state.selected_config = None;
        self.state.last_build = None;
        self.state.last_deploy = None;
        self.clamp_step(Step::SelectConfig);
    }

    pub fn set_environment_variables(&mut self, variables: BTreeMap<String, String>) {
        self.state.environment_variables = variables;
    }

    pub fn set_debug_mode(&mut self, debug: bool) {
        self.state.debug_mode = debug;
    }

    /// Select the discovered configuration for `environment`
    pub fn select_config(&mut self, environment: &str) -> Result<&ConfigDescriptor> {
        let config = self
            .state
            .discovered_configs
            .iter()
            .find(|c| c.environment_name == environment)
            .cloned()
            .ok_or_else(|| DeployerError::unknown_environment(environment))?;

        if self.state.selected_config.as_ref() != Some(&config) {
            self.state.last_build = None;
            self.state.last_deploy = None;
            self.clamp_step(Step::Build);
        }
        let selected: &ConfigDescriptor = self.state.selected_config.insert(config);
        Ok(selected)
    }

    /// Record a build. Returns false when it is not for the selected configuration.
    pub fn record_build(&mut self, artifact: &BuildArtifact) -> bool {
        let matches_selection = self.state.selected_config.as_ref().is_some_and(|config| {
            config.environment_name == artifact.metadata.environment_name
                && config.config_file_name() == artifact.metadata.config_file_name
        });
        if !matches_selection {
            log::warn!(
                "Ignoring build of '{}': it is not the selected configuration",
                artifact.metadata.config_file_name
            );
            return false;
        }

        self.state.last_build = Some(BuildRecord {
            environment_name: artifact.metadata.environment_name.clone(),
            config_file_name: artifact.metadata.config_file_name.clone(),
            build_dir: artifact.build_dir.clone(),
            copied_modules: artifact.copied_modules.clone(),
            timestamp_epoch: artifact.metadata.timestamp_epoch,
        });
        self.state.last_deploy = None;
        self.clamp_step(Step::Deploy);
        true
    }

    /// Record a dry run or deploy of the current build
    pub fn record_deploy(&mut self, report: &DeployReport) -> bool {
        let Some(build) = &self.state.last_build else {
            return false;
        };
        if !self.state.has_build_for_selection() || build.build_dir != report.build_dir {
            log::warn!("Ignoring deploy of {}: it is not the current build", report.build_dir.display());
            return false;
        }

        self.state.last_deploy = Some(DeployRecord {
            mode: report.mode,
            build_dir: report.build_dir.clone(),
            resource_kinds: report.rows.len(),
        });
        true
    }

    pub fn step_status(&self, step: Step) -> StepStatus {
        match step.cmp(&self.current_step()) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Future,
        }
    }

    pub fn next_step(&self) -> Option<Step> {
        self.current_step().next()
    }

    pub fn is_complete(&self) -> bool {
        self.current_step() == Step::Verify && self.state.has_successful_deploy()
    }

    pub fn validate(&self) -> Result<()> {
        self.state.validate()
    }

    pub fn summary(&self) -> WorkflowSummary {
        let current = self.current_step();
        WorkflowSummary {
            current_step: current.number(),
            step_name: current.name(),
            repository: self.state.repository.as_ref().map(|r| r.to_string()),
            repository_tree_root: self.state.repository_tree_root.clone(),
            config_files: self
                .state
                .discovered_configs
                .iter()
                .map(|c| c.config_file_name())
                .collect(),
            selected_config: self.state.selected_config.as_ref().map(|c| c.config_file_name()),
            environment_variable_count: self.state.environment_variables.len(),
            steps: Step::ALL
                .into_iter()
                .map(|step| StepSummary {
                    number: step.number(),
                    name: step.name(),
                    status: self.step_status(step),
                })
                .collect(),
            next_step: self.next_step().map(Step::number),
            is_complete: self.is_complete(),
        }
    }

    fn clamp_step(&mut self, highest: Step) {
        if self.current_step() > highest {
            log::debug!("Workflow step lowered to {}", highest.number());
            self.state.step = highest;
        }
    }
}
