//! Integration tests running every check against on-disk projects

use dbtgate_checks::{run, run_check, Check};
use dbtgate_core::Status;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/jaffle-shop")
}

fn fixture(relative: &str) -> PathBuf {
    fixture_root().join(relative)
}

fn fixture_manifest() -> PathBuf {
    fixture("target/manifest.json")
}

fn write(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn run_to_string(check: &Check, paths: &[PathBuf], manifest: &Path) -> (i32, String) {
    let mut out = Vec::new();
    let status = run(check, paths, manifest, &mut out).unwrap();
    (status, String::from_utf8(out).unwrap())
}

#[test]
fn test_referenced_macro_passes() {
    let paths = vec![fixture("macros/aa/with_referencing.sql")];
    let (status, output) = run_to_string(&Check::MacrosAreReferenced, &paths, &fixture_manifest());

    assert_eq!(status, 0);
    assert_eq!(output, "");
}

#[test]
fn test_unreferenced_macro_fails() {
    let paths = vec![fixture("macros/aa/without_referencing.sql")];
    let (status, output) = run_to_string(&Check::MacrosAreReferenced, &paths, &fixture_manifest());

    assert_eq!(status, 1);
    assert_eq!(output, "without_referencing: is not referenced in any model\n");
}

#[test]
fn test_macro_directory_is_expanded() {
    let paths = vec![fixture("macros")];
    let outcome = run_check(&Check::MacrosAreReferenced, &paths, &fixture_manifest());

    assert_eq!(outcome.entities_checked, 3);
    assert_eq!(
        outcome.lines(),
        vec!["without_referencing: is not referenced in any model"]
    );
}

#[test]
fn test_missing_manifest_fails_with_single_line() {
    let dir = TempDir::new().unwrap();
    let paths = vec![fixture("macros/aa/with_referencing.sql")];
    let (status, output) = run_to_string(
        &Check::MacrosAreReferenced,
        &paths,
        &dir.path().join("target/manifest.json"),
    );

    assert_eq!(status, 1);
    assert_eq!(output.lines().count(), 1);
    assert!(output.starts_with("Unable to load manifest file ("));
}

#[test]
fn test_malformed_manifest_fails_with_single_line() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "target/manifest.json", "{ not json");
    let paths = vec![fixture("models/orders.sql")];

    for check in [
        Check::MacrosAreReferenced,
        Check::ModelHasTests { min_tests: 1 },
        Check::SourceHasTests { min_tests: 1 },
        Check::ModelHasDescription { all_schemas: false },
    ] {
        let (status, output) = run_to_string(&check, &paths, &manifest);
        assert_eq!(status, 1, "{}", check.name());
        assert_eq!(output.lines().count(), 1, "{}", check.name());
        assert!(output.starts_with("Unable to load manifest file ("), "{}", check.name());
    }
}

#[test]
fn test_removing_macro_edge_reports_macro() {
    let dir = TempDir::new().unwrap();
    let referenced = r#"{
        "nodes": {
            "model.jaffle_shop.orders": {
                "resource_type": "model",
                "depends_on": {"macros": ["macro.jaffle_shop.cents_to_dollars"], "nodes": []}
            }
        },
        "macros": {"macro.jaffle_shop.cents_to_dollars": {"name": "cents_to_dollars"}},
        "child_map": {}
    }"#;
    let manifest = write(dir.path(), "target/manifest.json", referenced);
    let paths = vec![dir.path().join("macros/cents_to_dollars.sql")];

    let (status, output) = run_to_string(&Check::MacrosAreReferenced, &paths, &manifest);
    assert_eq!(status, 0);
    assert_eq!(output, "");

    write(
        dir.path(),
        "target/manifest.json",
        &referenced.replace(r#""macro.jaffle_shop.cents_to_dollars"], "nodes""#, r#"], "nodes""#),
    );
    let (status, output) = run_to_string(&Check::MacrosAreReferenced, &paths, &manifest);
    assert_eq!(status, 1);
    assert_eq!(output, "cents_to_dollars: is not referenced in any model\n");
}

#[test]
fn test_fixture_exposures_are_valid() {
    let paths = vec![fixture("models/exposures/exposures.yml")];
    let manifest = fixture_manifest();

    for check in [
        Check::ExposureHasOwner,
        Check::ExposureHasDependencies,
        Check::ExposureFolder { required: "exposures".into() },
    ] {
        let (status, output) = run_to_string(&check, &paths, &manifest);
        assert_eq!(status, 0, "{}", check.name());
        assert_eq!(output, "", "{}", check.name());
    }
}

#[test]
fn test_exposure_owner_reported_once_across_files() {
    let dir = TempDir::new().unwrap();
    let body = "exposures:\n  - name: weekly_kpis\n    owner:\n      email: data@jaffleshop.com\n";
    let paths = vec![
        write(dir.path(), "models/exposures/a.yml", body),
        write(dir.path(), "models/exposures/b.yml", body),
    ];

    let (status, output) = run_to_string(&Check::ExposureHasOwner, &paths, Path::new("unused"));

    assert_eq!(status, 1);
    assert_eq!(output, "weekly_kpis: does not have defined owner\n");
}

#[test]
fn test_exposure_dependencies_absent_null_or_empty() {
    let dir = TempDir::new().unwrap();
    let paths = vec![write(
        dir.path(),
        "models/exposures.yml",
        r#"
exposures:
  - name: absent
  - name: nulled
    depends_on:
  - name: empty
    depends_on: []
  - name: present
    depends_on:
      - ref('orders')
"#,
    )];

    let outcome = run_check(&Check::ExposureHasDependencies, &paths, Path::new("unused"));

    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(
        outcome.lines(),
        vec![
            "absent: does not depend on any model or source",
            "nulled: does not depend on any model or source",
            "empty: does not depend on any model or source",
        ]
    );
    assert_eq!(outcome.entities_checked, 4);
}

#[test]
fn test_exposure_folder_requires_containment() {
    let dir = TempDir::new().unwrap();
    let body = "exposures:\n  - name: weekly_kpis\n";
    let inside = write(dir.path(), "models/exposures.yml", body);
    let outside = write(dir.path(), "sources/exposures.yml", body);

    let check = Check::ExposureFolder { required: "models".into() };

    let (status, _) = run_to_string(&check, &[inside], Path::new("unused"));
    assert_eq!(status, 0);

    let (status, output) = run_to_string(&check, &[outside.clone()], Path::new("unused"));
    assert_eq!(status, 1);
    assert_eq!(
        output,
        format!("{}: is not in the exposure directory models\n", outside.display())
    );
}

#[test]
fn test_source_folder_forbids_containment() {
    let dir = TempDir::new().unwrap();
    let sources = write(
        dir.path(),
        "models/sources.yml",
        "sources:\n  - name: jaffle_shop\n    tables:\n      - name: orders\n",
    );
    let paths = vec![sources.clone()];

    let (status, output) = run_to_string(
        &Check::SourceFolder { forbidden: "models".into() },
        &paths,
        Path::new("unused"),
    );
    assert_eq!(status, 1);
    assert_eq!(
        output,
        format!("{}: is in the forbidden source directory models\n", sources.display())
    );

    let (status, output) = run_to_string(
        &Check::SourceFolder { forbidden: "staging".into() },
        &paths,
        Path::new("unused"),
    );
    assert_eq!(status, 0);
    assert_eq!(output, "");
}

#[test]
fn test_source_folder_ignores_files_without_sources() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(dir.path(), "models/schema.yml", "models:\n  - name: orders\n"),
        write(dir.path(), "models/empty.yml", "sources: []\n"),
        write(dir.path(), "models/orders.sql", "select 1"),
    ];

    let (status, output) = run_to_string(
        &Check::SourceFolder { forbidden: "models".into() },
        &paths,
        Path::new("unused"),
    );

    assert_eq!(status, 0);
    assert_eq!(output, "");
}

#[test]
fn test_fixture_source_folder() {
    let paths = vec![fixture("models")];
    let manifest = fixture_manifest();

    let outcome = run_check(&Check::SourceFolder { forbidden: "staging".into() }, &paths, &manifest);
    assert_eq!(outcome.violations.len(), 1);
    assert!(outcome.violations[0].subject.ends_with("sources.yml"));

    let outcome = run_check(&Check::SourceFolder { forbidden: "marts".into() }, &paths, &manifest);
    assert_eq!(outcome.status(), Status::Clean);
}

#[test]
fn test_project_file_among_candidates_does_not_block_checks() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(
            dir.path(),
            "dbt_project.yml",
            "name: jaffle_shop\nmodels:\n  jaffle_shop:\n    +materialized: view\n",
        ),
        write(
            dir.path(),
            "models/exposures/exposures.yml",
            "exposures:\n  - name: weekly_kpis\n    depends_on:\n      - ref('orders')\n    owner:\n      name: Claire\n",
        ),
    ];

    for check in [
        Check::ExposureHasOwner,
        Check::ExposureHasDependencies,
        Check::ExposureFolder { required: "exposures".into() },
        Check::SourceFolder { forbidden: "models".into() },
        Check::ModelHasDescription { all_schemas: true },
    ] {
        let outcome = run_check(&check, &paths, Path::new("unused"));
        assert_eq!(outcome.load_error, None, "{}", check.name());
        assert_eq!(outcome.status(), Status::Clean, "{}", check.name());
    }
}

#[test]
fn test_scalar_depends_on_is_a_dependency() {
    let dir = TempDir::new().unwrap();
    let paths = vec![write(
        dir.path(),
        "models/exposures.yml",
        "exposures:\n  - name: weekly_kpis\n    depends_on: ref('orders')\n",
    )];

    let (status, output) = run_to_string(&Check::ExposureHasDependencies, &paths, Path::new("unused"));

    assert_eq!(status, 0);
    assert_eq!(output, "");
}

#[test]
fn test_numeric_exposure_name_is_evaluated() {
    let dir = TempDir::new().unwrap();
    let paths = vec![write(
        dir.path(),
        "models/exposures.yml",
        "exposures:\n  - name: 2020\n    owner:\n      email: data@jaffleshop.com\n",
    )];

    let (status, output) = run_to_string(&Check::ExposureHasOwner, &paths, Path::new("unused"));

    assert_eq!(status, 1);
    assert_eq!(output, "2020: does not have defined owner\n");
}

#[test]
fn test_malformed_schema_fails_with_single_line() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(dir.path(), "models/good.yml", "exposures:\n  - name: a\n"),
        write(dir.path(), "models/bad.yml", "exposures: [unclosed\n"),
    ];

    let (status, output) = run_to_string(&Check::ExposureHasOwner, &paths, Path::new("unused"));

    assert_eq!(status, 1);
    assert_eq!(output.lines().count(), 1);
    assert!(output.starts_with("Unable to load schema file ("));
}

#[test]
fn test_model_has_tests() {
    let paths = vec![fixture("models")];
    let outcome = run_check(&Check::ModelHasTests { min_tests: 1 }, &paths, &fixture_manifest());

    assert_eq!(outcome.entities_checked, 3);
    assert_eq!(
        outcome.lines(),
        vec!["stg_customers: has 0 tests, but 1 are required"]
    );

    let outcome = run_check(&Check::ModelHasTests { min_tests: 2 }, &paths, &fixture_manifest());
    assert_eq!(outcome.violations.len(), 3);
}

#[test]
fn test_source_has_tests() {
    let paths = vec![fixture("models/staging/sources.yml")];
    let (status, output) = run_to_string(
        &Check::SourceHasTests { min_tests: 1 },
        &paths,
        &fixture_manifest(),
    );

    assert_eq!(status, 1);
    assert_eq!(output, "jaffle_shop.customers: has 0 tests, but 1 are required\n");
}

#[test]
fn test_model_description_for_changed_models() {
    let paths = vec![fixture("models")];
    let outcome = run_check(
        &Check::ModelHasDescription { all_schemas: false },
        &paths,
        &fixture_manifest(),
    );

    assert_eq!(
        outcome.lines(),
        vec![
            "orders: does not have defined description",
            "stg_customers: does not have defined description",
        ]
    );
}

#[test]
fn test_model_description_for_all_declared_models() {
    let paths = vec![fixture("models/staging/schema.yml")];
    let (status, output) = run_to_string(
        &Check::ModelHasDescription { all_schemas: true },
        &paths,
        Path::new("does/not/exist/manifest.json"),
    );

    assert_eq!(status, 1);
    assert_eq!(output, "stg_customers: does not have defined description\n");
}

#[test]
fn test_repeated_runs_are_identical() {
    let paths = vec![fixture("macros"), fixture("models")];
    let manifest = fixture_manifest();

    for check in [
        Check::MacrosAreReferenced,
        Check::ModelHasTests { min_tests: 1 },
        Check::SourceHasTests { min_tests: 1 },
        Check::ModelHasDescription { all_schemas: false },
    ] {
        let first = run_check(&check, &paths, &manifest);
        let second = run_check(&check, &paths, &manifest);
        assert_eq!(first, second, "{}", check.name());
    }
}

#[test]
fn test_report_from_outcome() {
    let dir = TempDir::new().unwrap();
    let paths = vec![fixture("macros/aa/without_referencing.sql")];
    let outcome = run_check(&Check::MacrosAreReferenced, &paths, &fixture_manifest());

    let report_path = dir.path().join("report.json");
    outcome.to_report().save_to_file(&report_path).unwrap();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(saved["check"], "check-macros-are-referenced");
    assert_eq!(saved["violations"][0]["subject"], "without_referencing");
}
