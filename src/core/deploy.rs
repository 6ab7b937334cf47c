//! Dry-run and deploy of a build directory.
//!
//! Resource declarations are recognised by file name suffix. The status each kind is
//! reported with comes from a [`ResourceKind`] table rather than a comparison against
//! the deploy target, and the table is rendered exactly as the deployment toolkit
//! prints its "Summary of Resources Deploy operation".
//!
//! The actual hand-off to the platform sits behind [`DeployTarget`]. The bundled
//! [`SimulatedTarget`] answers with the table's counts.

use crate::core::error::{DeployerError, Result};
use crate::core::fs_util::list_files;
use crate::core::report::{boxed, ReportTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const REPORT_TITLE: &str = "Summary of Resources Deploy operation:";

const DRY_RUN_HEADERS: [&str; 6] = [
    "Resource",
    "Would have Created",
    "Would have Deleted",
    "Would have Changed",
    "Untouched",
    "Total",
];
const DEPLOY_HEADERS: [&str; 6] = ["Resource", "Created", "Deleted", "Changed", "Unchanged", "Total"];

/// Variables a real deploy cannot start without
pub const REQUIRED_CREDENTIALS: &[&str] = &["IDP_CLIENT_ID", "IDP_CLIENT_SECRET", "IDP_TOKEN_URL", "CDF_PROJECT"];

const PREVIEW_VARIABLES: &[&str] = &["CDF_PROJECT", "CDF_CLUSTER", "CDF_URL", "IDP_TENANT_ID", "IDP_CLIENT_ID"];
const CLIENT_ID_PREVIEW_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    DryRun,
    Deploy,
}

impl DeployMode {
    fn headers(self) -> &'static [&'static str; 6] {
        match self {
            DeployMode::DryRun => &DRY_RUN_HEADERS,
            DeployMode::Deploy => &DEPLOY_HEADERS,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            DeployMode::DryRun => "Would deploy",
            DeployMode::Deploy => "Deploying",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedStatus {
    Created,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    pub suffix: &'static str,
    /// Name shown in the report, e.g. `transformations`
    pub name: &'static str,
    pub status: SimulatedStatus,
    /// Label of the "always redeployed" warning printed before this kind
    pub redeploy_warning: Option<&'static str>,
}

/// Kinds in the order the toolkit deploys them
pub const DEFAULT_RESOURCE_KINDS: &[ResourceKind] = &[
    ResourceKind {
        suffix: ".Source.yaml",
        name: "hosted extractor sources",
        status: SimulatedStatus::Changed,
        redeploy_warning: Some("Sources"),
    },
    ResourceKind {
        suffix: ".Mapping.yaml",
        name: "hosted extractor mappings",
        status: SimulatedStatus::Unchanged,
        redeploy_warning: None,
    },
    ResourceKind {
        suffix: ".Destination.yaml",
        name: "hosted extractor destinations",
        status: SimulatedStatus::Changed,
        redeploy_warning: Some("Destinations"),
    },
    ResourceKind {
        suffix: ".Transformation.yaml",
        name: "transformations",
        status: SimulatedStatus::Unchanged,
        redeploy_warning: None,
    },
    ResourceKind {
        suffix: ".Job.yaml",
        name: "hosted extractor jobs",
        status: SimulatedStatus::Unchanged,
        redeploy_warning: None,
    },
    ResourceKind {
        suffix: ".Workflow.yaml",
        name: "workflows",
        status: SimulatedStatus::Unchanged,
        redeploy_warning: None,
    },
    ResourceKind {
        suffix: ".WorkflowVersion.yaml",
        name: "workflow versions",
        status: SimulatedStatus::Changed,
        redeploy_warning: None,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKindCount {
    pub kind: String,
    pub created: u32,
    pub deleted: u32,
    pub changed: u32,
    pub unchanged: u32,
}

impl ResourceKindCount {
    pub fn simulated(kind: &ResourceKind) -> Self {
        let mut count = Self {
            kind: kind.name.to_string(),
            created: 0,
            deleted: 0,
            changed: 0,
            unchanged: 0,
        };
        match kind.status {
            SimulatedStatus::Created => count.created = 1,
            SimulatedStatus::Changed => count.changed = 1,
            SimulatedStatus::Unchanged => count.unchanged = 1,
        }
        count
    }

    pub fn total(&self) -> u32 {
        self.created + self.deleted + self.changed + self.unchanged
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.kind.clone(),
            self.created.to_string(),
            self.deleted.to_string(),
            self.changed.to_string(),
            self.unchanged.to_string(),
            self.total().to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub mode: DeployMode,
    pub build_dir: PathBuf,
    /// One row per kind present, sorted by kind name
    pub rows: Vec<ResourceKindCount>,
    /// Full console output, ending with the table
    pub log: Vec<String>,
    pub table: String,
}

impl DeployReport {
    pub fn row(&self, kind: &str) -> Option<&ResourceKindCount> {
        self.rows.iter().find(|r| r.kind == kind)
    }
}

/// The platform a build is deployed to
pub trait DeployTarget {
    /// Deploy the classified resources of `build_dir` and report what changed
    fn deploy(
        &self,
        build_dir: &Path,
        env_vars: &BTreeMap<String, String>,
        planned: &[ResourceKindCount],
    ) -> Result<Vec<ResourceKindCount>>;
}

/// Reports the planned counts as the outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedTarget;

impl DeployTarget for SimulatedTarget {
    fn deploy(
        &self,
        build_dir: &Path,
        _env_vars: &BTreeMap<String, String>,
        planned: &[ResourceKindCount],
    ) -> Result<Vec<ResourceKindCount>> {
        log::debug!("Simulated deploy of {} kinds from {}", planned.len(), build_dir.display());
        Ok(planned.to_vec())
    }
}

/// Required credentials that are missing or empty
pub fn missing_credentials(env_vars: &BTreeMap<String, String>) -> Vec<String> {
    let present = |name: &str| env_vars.get(name).is_some_and(|v| !v.is_empty());
    let mut missing: Vec<String> = REQUIRED_CREDENTIALS
        .iter()
        .filter(|name| !present(**name))
        .map(|name| name.to_string())
        .collect();
    if !present("CDF_CLUSTER") && !present("CDF_URL") {
        missing.push("CDF_CLUSTER".to_string());
    }
    missing
}

/// Connection variables safe to echo, with the client id shortened
pub fn credential_preview(env_vars: &BTreeMap<String, String>) -> Vec<(String, String)> {
    PREVIEW_VARIABLES
        .iter()
        .filter_map(|&name| {
            let value = env_vars.get(name)?;
            let shown = if name == "IDP_CLIENT_ID" && !value.is_empty() {
                let prefix: String = value.chars().take(CLIENT_ID_PREVIEW_CHARS).collect();
                format!("{prefix}...")
            } else {
                value.clone()
            };
            Some((name.to_string(), shown))
        })
        .collect()
}

pub struct DeploySimulator {
    kinds: Vec<ResourceKind>,
    target: Box<dyn DeployTarget>,
}

impl Default for DeploySimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploySimulator {
    pub fn new() -> Self {
        Self {
            kinds: DEFAULT_RESOURCE_KINDS.to_vec(),
            target: Box::new(SimulatedTarget),
        }
    }

    pub fn with_kinds(mut self, kinds: Vec<ResourceKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_target(mut self, target: Box<dyn DeployTarget>) -> Self {
        self.target = target;
        self
    }

    /// Kinds present among `files`, in deploy order
    pub fn present_kinds(&self, files: &[String]) -> Vec<ResourceKind> {
        self.kinds
            .iter()
            .filter(|kind| files.iter().any(|file| file_name(file).ends_with(kind.suffix)))
            .copied()
            .collect()
    }

    pub fn classify(&self, files: &[String]) -> Vec<ResourceKindCount> {
        let mut rows: Vec<ResourceKindCount> = self
            .present_kinds(files)
            .iter()
            .map(ResourceKindCount::simulated)
            .collect();
        rows.sort_by(|a, b| a.kind.cmp(&b.kind));
        rows
    }

    pub fn dry_run(&self, build_dir: &Path) -> Result<DeployReport> {
        let files = build_files(build_dir)?;
        let kinds = self.present_kinds(&files);
        let rows = self.classify(&files);

        let mut log = progress_lines(&kinds, DeployMode::DryRun);
        let table = render_table(DeployMode::DryRun, &rows);
        log.push(String::new());
        log.extend(table.lines().map(str::to_string));

        Ok(DeployReport {
            mode: DeployMode::DryRun,
            build_dir: build_dir.to_path_buf(),
            rows,
            log,
            table,
        })
    }

    pub fn deploy(&self, build_dir: &Path, env_vars: &BTreeMap<String, String>) -> Result<DeployReport> {
        let missing = missing_credentials(env_vars);
        if !missing.is_empty() {
            log::error!("Missing required credentials for deployment: {}", missing.join(", "));
            return Err(DeployerError::missing_credentials(missing));
        }

        let files = build_files(build_dir)?;
        let kinds = self.present_kinds(&files);
        let planned = self.classify(&files);
        let mut rows = self.target.deploy(build_dir, env_vars, &planned)?;
        rows.sort_by(|a, b| a.kind.cmp(&b.kind));

        let value = |name: &str| env_vars.get(name).map(String::as_str).unwrap_or("unknown");
        let mut log = vec!["WARNING: Overriding environment variables with values from .env file...".to_string()];
        log.extend(boxed(&[
            "Deploying resource files from build directory.".to_string(),
            String::new(),
            format!(
                "Connected to CDF Project '{}' in cluster '{}':",
                value("CDF_PROJECT"),
                value("CDF_CLUSTER")
            ),
            format!("CDF_URL={}", value("CDF_URL")),
        ]));
        log.push(String::new());
        log.extend(progress_lines(&kinds, DeployMode::Deploy));

        let table = render_table(DeployMode::Deploy, &rows);
        log.push(String::new());
        log.extend(table.lines().map(str::to_string));

        log::info!("Deployed {} resource kinds from {}", rows.len(), build_dir.display());
        Ok(DeployReport {
            mode: DeployMode::Deploy,
            build_dir: build_dir.to_path_buf(),
            rows,
            log,
            table,
        })
    }
}

fn build_files(build_dir: &Path) -> Result<Vec<String>> {
    if !build_dir.is_dir() {
        log::error!("Build directory not found: {}", build_dir.display());
        return Err(DeployerError::BuildDirectoryNotFound);
    }
    list_files(build_dir)
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn progress_lines(kinds: &[ResourceKind], mode: DeployMode) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for kind in kinds {
        if let Some(label) = kind.redeploy_warning {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!(
                "WARNING [HIGH]: {label} will always be considered different, and thus will always be redeployed."
            ));
        }
        lines.push(format!("{} 1 {} to CDF...", mode.verb(), kind.name));
    }
    lines
}

pub fn render_table(mode: DeployMode, rows: &[ResourceKindCount]) -> String {
    let mut table = ReportTable::new(REPORT_TITLE, mode.headers());
    for row in rows {
        table.push_row(row.cells());
    }
    table.render()
}
