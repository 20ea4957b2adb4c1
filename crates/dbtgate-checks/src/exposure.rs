//! Exposure checks
//!
//! Owner, dependency and folder-placement rules for `exposures:` entries.

use dbtgate_core::{CheckCode, Violation};
use dbtgate_dbt::ExposureSchema;
use std::path::Path;

use crate::collect::dedup_by_subject;

/// Exposures whose owner mapping has no `name`
pub fn missing_owner_name(exposures: &[ExposureSchema<'_>]) -> Vec<Violation> {
    dedup_by_subject(
        exposures
            .iter()
            .filter(|exposure| !exposure.decl.has_owner_name())
            .map(|exposure| {
                Violation::new(
                    CheckCode::ExposureMissingOwnerName,
                    subject(exposure),
                    "does not have defined owner",
                )
                .with_location(exposure.file.display().to_string())
            }),
    )
}

/// Exposures with an absent, null or empty `depends_on`
pub fn missing_dependencies(exposures: &[ExposureSchema<'_>]) -> Vec<Violation> {
    dedup_by_subject(
        exposures
            .iter()
            .filter(|exposure| !exposure.decl.has_dependencies())
            .map(|exposure| {
                Violation::new(
                    CheckCode::ExposureMissingDependencies,
                    subject(exposure),
                    "does not depend on any model or source",
                )
                .with_location(exposure.file.display().to_string())
            }),
    )
}

/// Exposure files whose path does not contain `required_folder`
pub fn misplaced_files(exposure_paths: &[&Path], required_folder: &str) -> Vec<Violation> {
    dedup_by_subject(
        exposure_paths
            .iter()
            .filter(|path| !path.to_string_lossy().contains(required_folder))
            .map(|path| {
                Violation::new(
                    CheckCode::ExposureMisplaced,
                    path.display().to_string(),
                    format!("is not in the exposure directory {}", required_folder),
                )
            }),
    )
}

/// Exposure name, or its file when the declaration has none
fn subject(exposure: &ExposureSchema<'_>) -> String {
    exposure
        .name
        .map(str::to_string)
        .unwrap_or_else(|| format!("<unnamed exposure in {}>", exposure.file.display()))
}
