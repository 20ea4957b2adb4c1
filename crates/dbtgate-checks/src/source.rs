//! Source checks

use dbtgate_core::{CheckCode, Violation};
use dbtgate_dbt::{tests_for_entity, EntityRef, Manifest, SourceTableSchema};
use std::path::Path;

use crate::collect::ViolationSet;

/// Source files whose path contains `forbidden_folder`
///
/// Inverse polarity to the exposure folder rule: sources must stay *out* of
/// the configured folder.
pub fn misplaced_files(source_paths: &[&Path], forbidden_folder: &str) -> Vec<Violation> {
    source_paths
        .iter()
        .filter(|path| path.to_string_lossy().contains(forbidden_folder))
        .map(|path| {
            Violation::new(
                CheckCode::SourceMisplaced,
                path.display().to_string(),
                format!("is in the forbidden source directory {}", forbidden_folder),
            )
        })
        .collect::<ViolationSet>()
        .into_vec()
}

/// Source tables with fewer than `min_tests` tests in the child map
pub fn missing_tests(
    manifest: &Manifest,
    sources: &[SourceTableSchema<'_>],
    min_tests: usize,
) -> Vec<Violation> {
    let mut violations = ViolationSet::new();

    for source in sources {
        let found = tests_for_entity(manifest, &EntityRef::SourceTable(*source)).len();
        if found < min_tests {
            violations.insert(
                Violation::new(
                    CheckCode::SourceMissingTests,
                    source.label(),
                    format!("has {} tests, but {} are required", found, min_tests),
                )
                .with_location(source.file.display().to_string()),
            );
        }
    }

    violations.into_vec()
}
