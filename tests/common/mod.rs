//! Consolidated test utilities for clearcase-navigator
//!
//! Integration tests run against a fake `cleartool` shell script that keeps its
//! state (checkouts, listings) in files inside a temporary view.

pub mod assertions;
pub mod fixtures;
pub mod host;
pub mod view;
