//! Machine-readable check report (report.json)
//!
//! One report per check run. The layout is versioned; fields are only ever
//! added within a major version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::diagnostic::{CheckCode, Status, Violation};

/// Report layout version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReportVersion {
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: Option<Status>,

    /// Violations after deduplication and allowlisting
    pub violations: usize,

    /// Entities the rule evaluated (models, macros, exposures, files...)
    pub entities_checked: usize,

    /// Violation count per check code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_code: BTreeMap<String, usize>,
}

impl ReportSummary {
    fn record(&mut self, violation: &Violation) {
        self.violations += 1;
        *self.by_code.entry(violation.code.as_str().to_string()).or_default() += 1;
        self.status = Some(Status::Failed);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub version: ReportVersion,

    /// RFC 3339 generation time
    pub generated_at: String,

    /// Hook name, e.g. `check-macros-are-referenced`
    pub check: String,

    pub summary: ReportSummary,

    pub violations: Vec<Violation>,

    /// Why the check could not evaluate anything, if it could not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Clean report with nothing evaluated yet
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            generated_at: chrono::Utc::now().to_rfc3339(),
            check: check.into(),
            summary: ReportSummary {
                status: Some(Status::Clean),
                ..ReportSummary::default()
            },
            violations: Vec::new(),
            load_error: None,
            metadata: None,
        }
    }

    pub fn from_violations(
        check: impl Into<String>,
        violations: Vec<Violation>,
        entities_checked: usize,
    ) -> Self {
        let mut report = Self::new(check);
        report.summary.entities_checked = entities_checked;
        for violation in violations {
            report.add_violation(violation);
        }
        report
    }

    /// Report for a run that stopped before evaluating, e.g. on a bad manifest
    pub fn from_load_error(check: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new(check);
        report.summary.status = Some(Status::Failed);
        report.summary.by_code.insert(CheckCode::DocumentLoad.as_str().to_string(), 1);
        report.load_error = Some(message.into());
        report
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.record(&violation);
        self.violations.push(violation);
    }

    pub fn status(&self) -> Status {
        if self.load_error.is_some() {
            Status::Failed
        } else {
            Status::from_violations(&self.violations)
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON, creating parent directories as needed
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json + "\n")
    }
}
