//! dbt manifest.json parsing
//!
//! Parses dbt-generated manifest.json into the node graph, the macro registry
//! and the child-dependency index. Every field is optional: a manifest missing
//! `nodes` or `child_map` decodes to empty maps.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DocumentLoadError;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: Option<ManifestMetadata>,

    /// Model, test, seed and snapshot nodes keyed by unique_id
    #[serde(default, deserialize_with = "nullable")]
    pub nodes: BTreeMap<String, ManifestNode>,

    /// Macro definitions keyed by unique_id
    #[serde(default, deserialize_with = "nullable")]
    pub macros: BTreeMap<String, ManifestMacro>,

    /// Child map (entity key -> ids of nodes that depend on it)
    #[serde(default, deserialize_with = "nullable")]
    pub child_map: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, DocumentLoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DocumentLoadError::Io(path.display().to_string(), e.to_string()))?;

        serde_json::from_str(&contents)
            .map_err(|e| DocumentLoadError::Json(path.display().to_string(), e.to_string()))
    }

    /// Parse manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, DocumentLoadError> {
        serde_json::from_str(json)
            .map_err(|e| DocumentLoadError::Json("<memory>".to_string(), e.to_string()))
    }

    /// Get a specific node by unique_id
    pub fn get_node(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.nodes.get(unique_id)
    }

    /// All nodes whose unique_id carries the given resource type
    pub fn nodes_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a ManifestNode)> + 'a {
        self.nodes
            .iter()
            .filter(move |(id, _)| UniqueId::new(id).resource_type() == resource_type)
    }
}

/// Borrowed view over a dotted unique_id (`<type>.<project>.<name>`)
///
/// The first segment is the resource type, the last one is the name users
/// see. Anything in between (project, source name, package) is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueId<'a>(&'a str);

impl<'a> UniqueId<'a> {
    pub fn new(id: &'a str) -> Self {
        Self(id)
    }

    /// Leading segment (`model`, `test`, `macro`, `source`, ...)
    pub fn resource_type(&self) -> &'a str {
        self.0.split('.').next().unwrap_or(self.0)
    }

    /// Trailing segment, the human-facing name
    pub fn name(&self) -> &'a str {
        self.0.rsplit('.').next().unwrap_or(self.0)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl std::fmt::Display for UniqueId<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Manifest metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}

/// A node in the manifest (model, test, snapshot, etc.)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.jaffle_shop.orders")
    #[serde(default)]
    pub unique_id: Option<String>,

    /// Node name (e.g., "orders")
    #[serde(default)]
    pub name: Option<String>,

    /// Resource type (model, test, snapshot, etc.)
    #[serde(default)]
    pub resource_type: Option<String>,

    /// Original file path
    #[serde(default)]
    pub original_file_path: Option<String>,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Dependencies
    #[serde(default, deserialize_with = "nullable")]
    pub depends_on: DependsOn,

    /// Tags
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,

    /// Generic test metadata (absent for singular/data tests)
    #[serde(default)]
    pub test_metadata: Option<TestMetadata>,
}

impl ManifestNode {
    /// Description, if present and non-blank
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Macro unique_ids this node calls
    #[serde(default, deserialize_with = "nullable")]
    pub macros: Vec<String>,

    /// Node unique_ids this node depends on
    #[serde(default, deserialize_with = "nullable")]
    pub nodes: Vec<String>,
}

/// Test metadata for generic tests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Generic test name (e.g., "unique", "not_null")
    #[serde(default)]
    pub name: Option<String>,
}

/// A macro in the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMacro {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub package_name: Option<String>,

    #[serde(default)]
    pub original_file_path: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub depends_on: DependsOn,
}

/// Treat an explicit `null` like a missing field
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "metadata": {"dbt_version": "1.7.0", "project_name": "jaffle_shop"},
        "nodes": {
            "model.jaffle_shop.orders": {
                "unique_id": "model.jaffle_shop.orders",
                "name": "orders",
                "resource_type": "model",
                "description": "One row per order",
                "depends_on": {"macros": ["macro.jaffle_shop.cents_to_dollars"], "nodes": []},
                "tags": null
            },
            "test.jaffle_shop.unique_orders_order_id.fed79b3a58": {
                "name": "unique_orders_order_id",
                "resource_type": "test",
                "test_metadata": {"name": "unique"}
            }
        },
        "child_map": {
            "model.jaffle_shop.orders": ["test.jaffle_shop.unique_orders_order_id.fed79b3a58"]
        }
    }"#;

    #[test]
    fn parse_manifest() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();

        assert_eq!(manifest.nodes.len(), 2);
        assert_eq!(
            manifest.metadata.as_ref().and_then(|m| m.dbt_version.as_deref()),
            Some("1.7.0")
        );

        let orders = manifest.get_node("model.jaffle_shop.orders").unwrap();
        assert_eq!(orders.name.as_deref(), Some("orders"));
        assert_eq!(orders.depends_on.macros, vec!["macro.jaffle_shop.cents_to_dollars"]);
        assert!(orders.tags.is_empty());
        assert_eq!(orders.description(), Some("One row per order"));
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let manifest = Manifest::from_str("{}").unwrap();
        assert!(manifest.nodes.is_empty());
        assert!(manifest.child_map.is_empty());
        assert!(manifest.macros.is_empty());
    }

    #[test]
    fn invalid_json_is_load_error() {
        let err = Manifest::from_str("{ not json").unwrap_err();
        assert!(matches!(err, DocumentLoadError::Json(_, _)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Manifest::from_file(Path::new("does/not/exist/manifest.json")).unwrap_err();
        assert!(matches!(err, DocumentLoadError::Io(_, _)));
        assert!(err.to_string().contains("does/not/exist/manifest.json"));
    }

    #[test]
    fn unique_id_segments() {
        let id = UniqueId::new("test.jaffle_shop.unique_orders_order_id.fed79b3a58");
        assert_eq!(id.resource_type(), "test");
        assert_eq!(id.name(), "fed79b3a58");

        let id = UniqueId::new("macro.jaffle_shop.cents_to_dollars");
        assert_eq!(id.resource_type(), "macro");
        assert_eq!(id.name(), "cents_to_dollars");

        let bare = UniqueId::new("orders");
        assert_eq!(bare.resource_type(), "orders");
        assert_eq!(bare.name(), "orders");
    }

    #[test]
    fn nodes_of_type_filters_on_id_prefix() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let tests: Vec<_> = manifest.nodes_of_type("test").map(|(id, _)| id.as_str()).collect();
        assert_eq!(tests, vec!["test.jaffle_shop.unique_orders_order_id.fed79b3a58"]);
    }

    #[test]
    fn blank_description_is_absent() {
        let node = ManifestNode {
            description: Some("   ".to_string()),
            ..ManifestNode::default()
        };
        assert_eq!(node.description(), None);
    }
}
