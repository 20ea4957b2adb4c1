//! dbt schema YAML parsing
//!
//! Decodes `models:`, `sources:` and `exposures:` declarations from property
//! files. Declarations are lenient: any missing field is `None` or empty and
//! the rule that cares about it decides what that means.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use crate::error::DocumentLoadError;

/// One decoded schema file
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Path the document was loaded from
    pub path: PathBuf,

    /// Decoded contents
    pub body: SchemaBody,
}

impl SchemaDocument {
    /// Load a schema document from file
    pub fn from_file(path: &Path) -> Result<Self, DocumentLoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DocumentLoadError::Io(path.display().to_string(), e.to_string()))?;

        Self::from_str(path, &contents)
    }

    /// Parse a schema document from a YAML string
    ///
    /// Only invalid YAML is an error. A document that is not a mapping (or is
    /// empty) decodes to an empty body, and sections or fields of an
    /// unexpected shape are dropped, so `dbt_project.yml` and friends can sit
    /// in the candidate list.
    pub fn from_str(path: impl Into<PathBuf>, yaml: &str) -> Result<Self, DocumentLoadError> {
        let path = path.into();
        let yaml_err = |e: serde_yaml::Error| DocumentLoadError::Yaml(path.display().to_string(), e.to_string());

        let value: Value = serde_yaml::from_str(yaml).map_err(yaml_err)?;
        let body = match value {
            Value::Mapping(_) => serde_yaml::from_value(value).map_err(yaml_err)?,
            _ => SchemaBody::default(),
        };

        Ok(Self { path, body })
    }
}

/// Load every schema document, stopping at the first one that fails
pub fn load_schema_documents<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<SchemaDocument>, DocumentLoadError> {
    paths
        .iter()
        .map(|path| SchemaDocument::from_file(path.as_ref()))
        .collect()
}

/// Top-level keys of a schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBody {
    #[serde(default)]
    pub version: Option<Value>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub models: Vec<ModelDecl>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub sources: Vec<SourceDecl>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub exposures: Vec<ExposureDecl>,
}

/// A `models:` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDecl {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub columns: Vec<ColumnDecl>,
}

impl ModelDecl {
    /// Description, if present and non-blank
    pub fn description(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }
}

/// A `sources:` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDecl {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub schema: Option<String>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub tables: Vec<TableDecl>,
}

/// A table nested under a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDecl {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub columns: Vec<ColumnDecl>,
}

/// A column under a model or source table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecl {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub data_type: Option<String>,
}

/// An `exposures:` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureDecl {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub exposure_type: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub maturity: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    /// Usually a list of `ref(...)` / `source(...)` expressions, kept raw
    #[serde(default)]
    pub depends_on: Option<Value>,

    /// Kept raw: owners are usually mappings but nothing forces that
    #[serde(default)]
    pub owner: Option<Value>,
}

impl ExposureDecl {
    /// Whether the owner is a mapping with a `name` key
    pub fn has_owner_name(&self) -> bool {
        self.owner
            .as_ref()
            .and_then(Value::as_mapping)
            .map(|owner| owner.contains_key("name"))
            .unwrap_or(false)
    }

    /// Whether `depends_on` is present and non-empty
    ///
    /// A bare `ref('orders')` string counts as a dependency.
    pub fn has_dependencies(&self) -> bool {
        self.depends_on.as_ref().map_or(false, is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Entries of a sequence that decode as `T`; any other shape is empty
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| serde_yaml::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Scalar rendered as text (`name: 2020` is "2020"); mappings and lists are `None`
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
