//! dbtgate checks - governance rules over a resolved dbt project
//!
//! This crate implements:
//! - One pure evaluator per rule (exposure, source, macro and model checks)
//! - Subject-level deduplication of violations
//! - The per-check driver that loads documents and renders diagnostics

pub mod collect;
pub mod exposure;
pub mod source;
pub mod macros;
pub mod model;
pub mod runner;

pub use collect::{dedup_by_subject, ViolationSet};
pub use runner::{run, run_check, Check, Outcome};
