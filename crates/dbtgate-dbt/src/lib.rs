//! dbt artifact loading and entity resolution
//!
//! This crate handles:
//! - Parsing manifest.json and schema YAML files
//! - Reconciling changed file paths with dbt entity names
//! - Extracting models, macros, sources and exposures
//! - Resolving macro references and the tests attached to an entity
//!
//! It has no logging and performs no I/O beyond reading the documents it is
//! asked to load.

pub mod error;
pub mod manifest;
pub mod schema;
pub mod paths;
pub mod extract;
pub mod relations;

pub use error::DocumentLoadError;
pub use manifest::{Manifest, ManifestNode, ManifestMacro, ManifestMetadata, DependsOn, TestMetadata, UniqueId};
pub use schema::{SchemaDocument, SchemaBody, ModelDecl, SourceDecl, TableDecl, ColumnDecl, ExposureDecl, load_schema_documents};
pub use paths::{CandidatePaths, expand_directories, filter_by_extension, SCHEMA_EXTENSIONS, SQL_EXTENSIONS};
pub use extract::{
    Scope, ModelRecord, MacroRecord, ModelSchema, SourceTableSchema, ExposureSchema,
    extract_models, extract_macros, extract_model_schemas, extract_source_schemas,
    extract_exposure_schemas, extract_source_paths, extract_exposure_paths,
};
pub use relations::{
    NodeId, NodeDependencies, ChildKey, EntityRef, TestType, TestRecord,
    node_dependencies, macros_referenced_by_models, unreferenced_macros, tests_for_entity,
};
