//! dbtgate Core
//!
//! Core domain model with stable, versioned types.
//! Never rename check codes - they are part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{CheckCode, Violation, Status};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, AllowlistRules, DEFAULT_CONFIG_FILE, DEFAULT_MANIFEST_PATH};
