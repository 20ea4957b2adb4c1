//! Check codes, violations and run status
//!
//! IMPORTANT: Check codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Check code registry (v1)
///
/// Each code names one governance question asked of a dbt project.
/// These codes are STABLE and VERSIONED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckCode {
    // Exposure checks
    /// Exposure owner mapping has no `name`
    ExposureMissingOwnerName,

    /// Exposure declares no `depends_on` entries
    ExposureMissingDependencies,

    /// Exposure declared outside the required folder
    ExposureMisplaced,

    // Source checks
    /// Source declared inside a forbidden folder
    SourceMisplaced,

    /// Source table has fewer tests than required
    SourceMissingTests,

    // Macro checks
    /// Changed macro is not referenced by any node
    MacroUnreferenced,

    // Model checks
    /// Model has fewer tests than required
    ModelMissingTests,

    /// Model has no description in the manifest or any schema file
    ModelMissingDescription,

    // Document loading
    /// Manifest or schema document could not be loaded
    DocumentLoad,
}

impl CheckCode {
    /// Get the check code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExposureMissingOwnerName => "EXPOSURE_MISSING_OWNER_NAME",
            Self::ExposureMissingDependencies => "EXPOSURE_MISSING_DEPENDENCIES",
            Self::ExposureMisplaced => "EXPOSURE_MISPLACED",
            Self::SourceMisplaced => "SOURCE_MISPLACED",
            Self::SourceMissingTests => "SOURCE_MISSING_TESTS",
            Self::MacroUnreferenced => "MACRO_UNREFERENCED",
            Self::ModelMissingTests => "MODEL_MISSING_TESTS",
            Self::ModelMissingDescription => "MODEL_MISSING_DESCRIPTION",
            Self::DocumentLoad => "DOCUMENT_LOAD",
        }
    }
}

impl std::fmt::Display for CheckCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single rule failure for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable check code
    pub code: CheckCode,

    /// The offending entity (exposure name, macro name, file path, ...)
    pub subject: String,

    /// Human-readable reason
    pub message: String,

    /// File the entity was declared in (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Violation {
    /// Create a new violation without a location
    pub fn new(code: CheckCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Renders the diagnostic line `<subject>: <message>`
impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Overall result of one check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No violations
    Clean,

    /// One or more violations, or a document failed to load
    Failed,
}

impl Status {
    /// Process exit code for this status
    pub fn code(&self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Failed => 1,
        }
    }

    /// Status implied by a set of violations
    pub fn from_violations(violations: &[Violation]) -> Self {
        if violations.is_empty() {
            Self::Clean
        } else {
            Self::Failed
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
