//! Per-check driver
//!
//! Loads the documents a check needs, resolves the entities it evaluates and
//! turns the result into a status plus one diagnostic line per violation.

use dbtgate_core::{AllowlistRules, Report, Status, Violation};
use dbtgate_dbt::{
    expand_directories, extract_exposure_paths, extract_exposure_schemas, extract_macros,
    extract_model_schemas, extract_models, extract_source_paths, extract_source_schemas,
    filter_by_extension, load_schema_documents, CandidatePaths, DocumentLoadError, Manifest,
    SchemaDocument, Scope, SCHEMA_EXTENSIONS, SQL_EXTENSIONS,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{exposure, macros, model, source};

/// A governance check and its options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Every exposure owner declares a `name`
    ExposureHasOwner,

    /// Every exposure declares a non-empty `depends_on`
    ExposureHasDependencies,

    /// Exposure files live under `required`
    ExposureFolder { required: String },

    /// Source files do not live under `forbidden`
    SourceFolder { forbidden: String },

    /// Every changed macro is used by some node
    MacrosAreReferenced,

    /// Every changed model has at least `min_tests` tests
    ModelHasTests { min_tests: usize },

    /// Every declared source table has at least `min_tests` tests
    SourceHasTests { min_tests: usize },

    /// Every changed model has a description; with `all_schemas` every model
    /// declared in the given YAML files is checked instead
    ModelHasDescription { all_schemas: bool },
}

impl Check {
    /// Stable hook name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExposureHasOwner => "check-exposure-has-owner",
            Self::ExposureHasDependencies => "check-exposure-has-dependencies",
            Self::ExposureFolder { .. } => "check-exposure-folder-constraint",
            Self::SourceFolder { .. } => "check-source-folder-constraint",
            Self::MacrosAreReferenced => "check-macros-are-referenced",
            Self::ModelHasTests { .. } => "check-model-has-tests",
            Self::SourceHasTests { .. } => "check-source-has-tests",
            Self::ModelHasDescription { .. } => "check-model-has-description",
        }
    }

    /// Whether the check reads manifest.json
    pub fn uses_manifest(&self) -> bool {
        match self {
            Self::MacrosAreReferenced | Self::ModelHasTests { .. } | Self::SourceHasTests { .. } => true,
            Self::ModelHasDescription { all_schemas } => !all_schemas,
            Self::ExposureHasOwner
            | Self::ExposureHasDependencies
            | Self::ExposureFolder { .. }
            | Self::SourceFolder { .. } => false,
        }
    }
}

/// Result of running one check
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub check: &'static str,

    /// Violations in reporting order
    pub violations: Vec<Violation>,

    /// Set when a document failed to load; no rule was evaluated
    pub load_error: Option<String>,

    /// Number of entities the rule looked at
    pub entities_checked: usize,
}

impl Outcome {
    fn load_failure(check: &Check, message: String) -> Self {
        Self {
            check: check.name(),
            violations: Vec::new(),
            load_error: Some(message),
            entities_checked: 0,
        }
    }

    pub fn status(&self) -> Status {
        if self.load_error.is_some() {
            Status::Failed
        } else {
            Status::from_violations(&self.violations)
        }
    }

    /// Diagnostic lines: the load error alone, or one line per violation
    pub fn lines(&self) -> Vec<String> {
        match &self.load_error {
            Some(message) => vec![message.clone()],
            None => self.violations.iter().map(ToString::to_string).collect(),
        }
    }

    /// Drop violations whose subject is allowlisted
    pub fn apply_allowlist(&mut self, rules: &AllowlistRules) {
        let before = self.violations.len();
        self.violations.retain(|violation| !rules.is_skipped(&violation.subject));
        let skipped = before - self.violations.len();
        if skipped > 0 {
            debug!(check = self.check, skipped, "allowlisted violations dropped");
        }
    }

    /// Build a JSON report for this outcome
    pub fn to_report(&self) -> Report {
        let mut report = match &self.load_error {
            Some(message) => Report::from_load_error(self.check, message.clone()),
            None => Report::from_violations(self.check, self.violations.clone(), self.entities_checked),
        };
        report.metadata = Some(serde_json::json!({ "dbtgate_version": env!("CARGO_PKG_VERSION") }));
        report
    }
}

struct Evaluation {
    violations: Vec<Violation>,
    entities_checked: usize,
}

/// Run a check over candidate paths
///
/// Directories among `paths` are expanded to the files below them. A
/// manifest that fails to load short-circuits with a single diagnostic.
pub fn run_check<P: AsRef<Path>>(check: &Check, paths: &[P], manifest_path: &Path) -> Outcome {
    let paths = expand_directories(paths);
    info!(check = check.name(), candidates = paths.len(), "running check");

    let manifest = if check.uses_manifest() {
        match Manifest::from_file(manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(check = check.name(), error = %e, "manifest failed to load");
                return Outcome::load_failure(check, format!("Unable to load manifest file ({})", e));
            }
        }
    } else {
        None
    };

    match evaluate(check, manifest.as_ref(), &paths) {
        Ok(evaluation) => {
            info!(
                check = check.name(),
                entities = evaluation.entities_checked,
                violations = evaluation.violations.len(),
                "check finished"
            );
            Outcome {
                check: check.name(),
                violations: evaluation.violations,
                load_error: None,
                entities_checked: evaluation.entities_checked,
            }
        }
        Err(e) => {
            warn!(check = check.name(), error = %e, "schema file failed to load");
            Outcome::load_failure(check, format!("Unable to load schema file ({})", e))
        }
    }
}

/// Run a check and write its diagnostic lines, returning the exit status
pub fn run<P: AsRef<Path>, W: Write>(
    check: &Check,
    paths: &[P],
    manifest_path: &Path,
    out: &mut W,
) -> std::io::Result<i32> {
    let outcome = run_check(check, paths, manifest_path);
    for line in outcome.lines() {
        writeln!(out, "{}", line)?;
    }
    Ok(outcome.status().code())
}

fn evaluate(
    check: &Check,
    manifest: Option<&Manifest>,
    paths: &[PathBuf],
) -> Result<Evaluation, DocumentLoadError> {
    let empty = Manifest::default();
    let manifest = manifest.unwrap_or(&empty);

    let evaluation = match check {
        Check::ExposureHasOwner => {
            let docs = load_schemas(paths)?;
            let exposures = extract_exposure_schemas(&docs);
            Evaluation {
                violations: exposure::missing_owner_name(&exposures),
                entities_checked: exposures.len(),
            }
        }
        Check::ExposureHasDependencies => {
            let docs = load_schemas(paths)?;
            let exposures = extract_exposure_schemas(&docs);
            Evaluation {
                violations: exposure::missing_dependencies(&exposures),
                entities_checked: exposures.len(),
            }
        }
        Check::ExposureFolder { required } => {
            let docs = load_schemas(paths)?;
            let files = extract_exposure_paths(&docs);
            Evaluation {
                violations: exposure::misplaced_files(&files, required),
                entities_checked: files.len(),
            }
        }
        Check::SourceFolder { forbidden } => {
            let docs = load_schemas(paths)?;
            let files = extract_source_paths(&docs);
            Evaluation {
                violations: source::misplaced_files(&files, forbidden),
                entities_checked: files.len(),
            }
        }
        Check::MacrosAreReferenced => {
            let candidates = CandidatePaths::reconcile(paths, Some(SQL_EXTENSIONS));
            let changed = extract_macros(manifest, &candidates);
            debug!(sql_files = candidates.len(), macros = changed.len(), "matched changed macros");
            Evaluation {
                violations: macros::unreferenced(manifest, &changed),
                entities_checked: changed.len(),
            }
        }
        Check::ModelHasTests { min_tests } => {
            let candidates = CandidatePaths::reconcile(paths, Some(SQL_EXTENSIONS));
            let models = extract_models(manifest, Scope::Candidates(&candidates));
            Evaluation {
                violations: model::missing_tests(manifest, &models, *min_tests),
                entities_checked: models.len(),
            }
        }
        Check::SourceHasTests { min_tests } => {
            let docs = load_schemas(paths)?;
            let sources = extract_source_schemas(&docs);
            Evaluation {
                violations: source::missing_tests(manifest, &sources, *min_tests),
                entities_checked: sources.len(),
            }
        }
        Check::ModelHasDescription { all_schemas: true } => {
            let docs = load_schemas(paths)?;
            let schemas = extract_model_schemas(&docs, Scope::All);
            Evaluation {
                violations: model::schemas_missing_description(&schemas),
                entities_checked: schemas.len(),
            }
        }
        Check::ModelHasDescription { all_schemas: false } => {
            let candidates = CandidatePaths::reconcile(paths, Some(SQL_EXTENSIONS));
            let docs = load_schemas(paths)?;
            let models = extract_models(manifest, Scope::Candidates(&candidates));
            let schemas = extract_model_schemas(&docs, Scope::Candidates(&candidates));
            Evaluation {
                violations: model::missing_description(&models, &schemas),
                entities_checked: models.len(),
            }
        }
    };

    Ok(evaluation)
}

fn load_schemas(paths: &[PathBuf]) -> Result<Vec<SchemaDocument>, DocumentLoadError> {
    let files = filter_by_extension(paths, SCHEMA_EXTENSIONS);
    debug!(schema_files = files.len(), "loading schema documents");
    load_schema_documents(&files)
}
