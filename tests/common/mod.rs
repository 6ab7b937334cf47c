//! Shared utilities for repo-deployer integration tests
//!
//! Tests run against throwaway repository trees and an isolated set of
//! configuration, cache and scratch directories, so no network or user state is touched.

pub mod assertions;
pub mod fixtures;
