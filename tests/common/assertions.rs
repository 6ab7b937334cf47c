//! Predicates for validating repo-deployer command output

#![allow(dead_code)]

use predicates::prelude::*;

/// Warning printed when a step change is refused
pub fn step_refused(target: u8) -> impl Predicate<str> {
    predicates::str::contains(format!("Cannot advance to step {target}"))
}

pub fn no_repository_downloaded() -> impl Predicate<str> {
    predicates::str::contains("No repository downloaded")
}

pub fn invalid_reference() -> impl Predicate<str> {
    predicates::str::contains("Invalid repository reference")
}

/// Header row of the deploy summary table
pub fn has_report_header() -> impl Predicate<str> {
    predicates::str::contains("Summary of Resources Deploy operation:")
        .and(predicates::str::contains("Resource"))
        .and(predicates::str::contains("Would have Created"))
}

pub fn current_step(number: u8, name: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("▶ {number}. {name}"))
}
