//! # av-cli — Operator Toolchain
//!
//! Offline management commands for the compliance engine: dataset-wide
//! status recomputation and evidence-rule linting. Everything here runs
//! against a dataset file with an in-memory service, never against a live
//! API.

pub mod dataset;
pub mod lint;
pub mod recompute;
