//! Macro reference check

use dbtgate_core::{CheckCode, Violation};
use dbtgate_dbt::{macros_referenced_by_models, unreferenced_macros, MacroRecord, Manifest};
use tracing::debug;

use crate::collect::ViolationSet;

/// Changed macros that no node depends on
///
/// Every candidate is evaluated; an empty candidate list is simply clean.
pub fn unreferenced(manifest: &Manifest, candidates: &[MacroRecord]) -> Vec<Violation> {
    let referenced = macros_referenced_by_models(manifest);
    debug!(
        candidates = candidates.len(),
        referenced = referenced.len(),
        "resolved macro references"
    );

    unreferenced_macros(candidates, &referenced)
        .into_iter()
        .map(|record| {
            Violation::new(
                CheckCode::MacroUnreferenced,
                record.macro_name.clone(),
                "is not referenced in any model",
            )
            .with_location(record.source_file.display().to_string())
        })
        .collect::<ViolationSet>()
        .into_vec()
}
