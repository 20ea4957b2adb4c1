//! Model checks

use dbtgate_core::{CheckCode, Violation};
use dbtgate_dbt::{tests_for_entity, EntityRef, Manifest, ModelRecord, ModelSchema};
use std::collections::HashSet;

use crate::collect::ViolationSet;

/// Models with fewer than `min_tests` tests in the child map
pub fn missing_tests(manifest: &Manifest, models: &[ModelRecord<'_>], min_tests: usize) -> Vec<Violation> {
    let mut violations = ViolationSet::new();

    for model in models {
        let found = tests_for_entity(manifest, &EntityRef::from(*model)).len();
        if found < min_tests {
            violations.insert(with_node_location(
                Violation::new(
                    CheckCode::ModelMissingTests,
                    model.name,
                    format!("has {} tests, but {} are required", found, min_tests),
                ),
                model,
            ));
        }
    }

    violations.into_vec()
}

/// Models described neither in the manifest nor in any schema declaration
pub fn missing_description(models: &[ModelRecord<'_>], schemas: &[ModelSchema<'_>]) -> Vec<Violation> {
    let described = described_names(schemas);

    models
        .iter()
        .filter(|model| model.node.description().is_none() && !described.contains(model.name))
        .map(|model| {
            with_node_location(
                Violation::new(
                    CheckCode::ModelMissingDescription,
                    model.name,
                    "does not have defined description",
                ),
                model,
            )
        })
        .collect::<ViolationSet>()
        .into_vec()
}

/// Declared models with no description in any of their declarations
///
/// A model split across several files counts as described if any fragment
/// carries a description.
pub fn schemas_missing_description(schemas: &[ModelSchema<'_>]) -> Vec<Violation> {
    let described = described_names(schemas);

    schemas
        .iter()
        .filter(|schema| schema.name.map_or(true, |name| !described.contains(name)))
        .map(|schema| {
            let subject = schema
                .name
                .map(str::to_string)
                .unwrap_or_else(|| format!("<unnamed model in {}>", schema.file.display()));
            Violation::new(
                CheckCode::ModelMissingDescription,
                subject,
                "does not have defined description",
            )
            .with_location(schema.file.display().to_string())
        })
        .collect::<ViolationSet>()
        .into_vec()
}

fn described_names<'a>(schemas: &[ModelSchema<'a>]) -> HashSet<&'a str> {
    schemas
        .iter()
        .filter(|schema| schema.decl.description().is_some())
        .filter_map(|schema| schema.name)
        .collect()
}

fn with_node_location(violation: Violation, model: &ModelRecord<'_>) -> Violation {
    match model.node.original_file_path.as_deref() {
        Some(path) => violation.with_location(path),
        None => violation,
    }
}
