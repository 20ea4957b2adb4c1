//! Candidate path reconciliation
//!
//! Maps the file paths a caller believes are changed onto the names dbt knows
//! them by (the file stem). Paths whose stem matches nothing in the manifest
//! or schema set are simply never looked up; that is not an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of dbt property files
pub const SCHEMA_EXTENSIONS: &[&str] = &[".yml", ".yaml"];

/// Extensions of model and macro files
pub const SQL_EXTENSIONS: &[&str] = &[".sql"];

/// Candidate files keyed by file stem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePaths {
    by_stem: BTreeMap<String, PathBuf>,
}

impl CandidatePaths {
    /// Reconcile raw paths into a stem -> path mapping
    ///
    /// When `extensions` is given (e.g. `[".yml"]`) only paths with one of
    /// those suffixes are kept. Two paths with the same stem: the later one
    /// wins.
    pub fn reconcile<I, P>(paths: I, extensions: Option<&[&str]>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut by_stem = BTreeMap::new();

        for path in paths {
            let path = path.as_ref();
            if !has_extension(path, extensions) {
                continue;
            }

            let Some(stem) = path.file_stem() else {
                continue;
            };
            by_stem.insert(stem.to_string_lossy().into_owned(), path.to_path_buf());
        }

        Self { by_stem }
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.by_stem.contains_key(stem)
    }

    pub fn get(&self, stem: &str) -> Option<&Path> {
        self.by_stem.get(stem).map(PathBuf::as_path)
    }

    pub fn stems(&self) -> impl Iterator<Item = &str> {
        self.by_stem.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

/// Replace every directory in `paths` with the files below it
///
/// Files are kept in place; directory contents are appended in sorted order
/// at the directory's position. Unreadable entries are skipped.
pub fn expand_directories<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            expanded.push(path.to_path_buf());
            continue;
        }

        expanded.extend(
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path()),
        );
    }

    expanded
}

/// Every path with one of `extensions`, duplicates dropped, order kept
///
/// Unlike [`CandidatePaths::reconcile`] two files sharing a stem (every
/// `schema.yml` in a project) are both kept.
pub fn filter_by_extension<P: AsRef<Path>>(paths: &[P], extensions: &[&str]) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if has_extension(path, Some(extensions)) && !kept.iter().any(|p| p == path) {
            kept.push(path.to_path_buf());
        }
    }
    kept
}

fn has_extension(path: &Path, extensions: Option<&[&str]>) -> bool {
    match extensions {
        Some(extensions) => extensions.contains(&suffix(path).as_str()),
        None => true,
    }
}

/// `.yml` style suffix, empty when the path has no extension
fn suffix(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
