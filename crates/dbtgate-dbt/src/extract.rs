//! Entity extraction from the manifest and schema documents
//!
//! Every extractor borrows its input and returns projections over it. Nothing
//! here mutates a decoded document, so one loaded manifest or schema set can
//! be shared by several checks.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::manifest::{Manifest, ManifestNode, UniqueId};
use crate::paths::CandidatePaths;
use crate::schema::{ExposureDecl, ModelDecl, SchemaDocument, SourceDecl, TableDecl};

/// Which entities an extractor should yield
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Only entities whose name matches a candidate file stem
    Candidates(&'a CandidatePaths),

    /// Every entity, regardless of what changed
    All,
}

impl Scope<'_> {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::Candidates(candidates) => candidates.contains(name),
            Self::All => true,
        }
    }
}

/// A model node from the manifest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRecord<'a> {
    pub unique_id: &'a str,
    /// `name` from the node, or the trailing id segment when missing
    pub name: &'a str,
    /// Trailing id segment (matches the model's file stem)
    pub stem: &'a str,
    pub node: &'a ManifestNode,
}

/// A macro whose source file is among the candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRecord {
    pub unique_id: String,
    pub macro_name: String,
    pub source_file: PathBuf,
}

/// A model declaration with the file it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSchema<'a> {
    pub name: Option<&'a str>,
    pub file: &'a Path,
    pub decl: &'a ModelDecl,
}

/// One (source, table) pair from a source declaration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceTableSchema<'a> {
    pub source_name: Option<&'a str>,
    pub table_name: Option<&'a str>,
    pub file: &'a Path,
    pub source: &'a SourceDecl,
    pub table: &'a TableDecl,
}

impl SourceTableSchema<'_> {
    /// `source.table` label used in diagnostics
    pub fn label(&self) -> String {
        format!(
            "{}.{}",
            self.source_name.unwrap_or("<unnamed>"),
            self.table_name.unwrap_or("<unnamed>")
        )
    }
}

/// An exposure declaration with the file it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSchema<'a> {
    pub name: Option<&'a str>,
    pub file: &'a Path,
    pub decl: &'a ExposureDecl,
}

/// Model nodes whose trailing id segment is in scope
pub fn extract_models<'a>(manifest: &'a Manifest, scope: Scope<'_>) -> Vec<ModelRecord<'a>> {
    manifest
        .nodes_of_type("model")
        .filter_map(|(id, node)| {
            let stem = UniqueId::new(id).name();
            scope.includes(stem).then(|| ModelRecord {
                unique_id: id.as_str(),
                name: node.name.as_deref().unwrap_or(stem),
                stem,
                node,
            })
        })
        .collect()
}

/// Macros defined in one of the candidate files
///
/// Looks at the manifest `macros` registry and at any `macro.`-typed node.
/// A macro matches when the trailing segment of its id equals a candidate
/// stem.
pub fn extract_macros(manifest: &Manifest, candidates: &CandidatePaths) -> Vec<MacroRecord> {
    let mut seen = HashSet::new();

    manifest
        .macros
        .keys()
        .chain(manifest.nodes_of_type("macro").map(|(id, _)| id))
        .filter_map(|id| {
            let unique_id = UniqueId::new(id);
            if unique_id.resource_type() != "macro" || !seen.insert(id.as_str()) {
                return None;
            }

            let name = unique_id.name();
            candidates.get(name).map(|file| MacroRecord {
                unique_id: id.clone(),
                macro_name: name.to_string(),
                source_file: file.to_path_buf(),
            })
        })
        .collect()
}

/// Model declarations in scope, in document order
pub fn extract_model_schemas<'a>(
    docs: &'a [SchemaDocument],
    scope: Scope<'_>,
) -> Vec<ModelSchema<'a>> {
    docs.iter()
        .flat_map(|doc| {
            doc.body.models.iter().map(move |decl| ModelSchema {
                name: decl.name.as_deref(),
                file: doc.path.as_path(),
                decl,
            })
        })
        .filter(|model| match scope {
            Scope::All => true,
            Scope::Candidates(_) => model.name.map_or(false, |name| scope.includes(name)),
        })
        .collect()
}

/// One record per (source, table) pair
///
/// The source declaration is left untouched; each record borrows it.
pub fn extract_source_schemas(docs: &[SchemaDocument]) -> Vec<SourceTableSchema<'_>> {
    docs.iter()
        .flat_map(|doc| {
            doc.body.sources.iter().flat_map(move |source| {
                source.tables.iter().map(move |table| SourceTableSchema {
                    source_name: source.name.as_deref(),
                    table_name: table.name.as_deref(),
                    file: doc.path.as_path(),
                    source,
                    table,
                })
            })
        })
        .collect()
}

/// Every exposure declaration
pub fn extract_exposure_schemas(docs: &[SchemaDocument]) -> Vec<ExposureSchema<'_>> {
    docs.iter()
        .flat_map(|doc| {
            doc.body.exposures.iter().map(move |decl| ExposureSchema {
                name: decl.name.as_deref(),
                file: doc.path.as_path(),
                decl,
            })
        })
        .collect()
}

/// Files that declare at least one source
pub fn extract_source_paths(docs: &[SchemaDocument]) -> Vec<&Path> {
    paths_where(docs, |doc| !doc.body.sources.is_empty())
}

/// Files that declare at least one exposure
pub fn extract_exposure_paths(docs: &[SchemaDocument]) -> Vec<&Path> {
    paths_where(docs, |doc| !doc.body.exposures.is_empty())
}

fn paths_where(docs: &[SchemaDocument], keep: impl Fn(&SchemaDocument) -> bool) -> Vec<&Path> {
    let mut seen = HashSet::new();
    docs.iter()
        .filter(|&doc| keep(doc))
        .map(|doc| doc.path.as_path())
        .filter(|path| seen.insert(*path))
        .collect()
}
