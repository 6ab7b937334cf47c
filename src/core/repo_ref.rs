//! Parsing of repository references given on the command line.
//!
//! Accepts `owner/repo`, `https://github.com/owner/repo`, `github.com/owner/repo` and
//! `git@github.com:owner/repo`, each optionally ending in `.git` or a trailing path.

use crate::core::error::{DeployerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let path = ["https://github.com/", "http://github.com/", "git@github.com:", "github.com/"]
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);

        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let owner = parts.next();
        let name = parts.next().map(|n| n.trim_end_matches(".git"));

        match (owner, name) {
            (Some(owner), Some(name)) if is_valid_segment(owner) && is_valid_segment(name) => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(DeployerError::invalid_repository_reference(input)),
        }
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
