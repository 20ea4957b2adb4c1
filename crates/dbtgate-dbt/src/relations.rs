//! Relationships between manifest entities
//!
//! Upstream edges come from each node's `depends_on`; downstream edges come
//! from the manifest `child_map`, whose keys are dotted composite ids.

use std::collections::{BTreeSet, HashSet};

use crate::extract::{MacroRecord, ModelRecord, ModelSchema, SourceTableSchema};
use crate::manifest::{Manifest, UniqueId};

/// Node identifier (unique_id from manifest)
pub type NodeId = String;

/// Parents of one node, split by resource type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDependencies<'a> {
    /// Macro names (trailing id segment)
    pub macros: Vec<&'a str>,
    pub models: Vec<&'a str>,
    pub sources: Vec<&'a str>,
    /// Seeds, snapshots and anything else
    pub other: Vec<&'a str>,
}

/// Classified `depends_on` of a node, `None` if the node is unknown
pub fn node_dependencies<'a>(manifest: &'a Manifest, node_id: &str) -> Option<NodeDependencies<'a>> {
    let node = manifest.get_node(node_id)?;
    let mut deps = NodeDependencies {
        macros: node
            .depends_on
            .macros
            .iter()
            .map(|id| UniqueId::new(id).name())
            .collect(),
        ..NodeDependencies::default()
    };

    for parent in &node.depends_on.nodes {
        let bucket = match UniqueId::new(parent).resource_type() {
            "model" => &mut deps.models,
            "source" => &mut deps.sources,
            _ => &mut deps.other,
        };
        bucket.push(parent.as_str());
    }

    Some(deps)
}

/// Names of every macro some node depends on
///
/// Every node counts, not only models: a macro used only by a test or a
/// snapshot is still referenced.
pub fn macros_referenced_by_models(manifest: &Manifest) -> BTreeSet<String> {
    manifest
        .nodes
        .values()
        .flat_map(|node| node.depends_on.macros.iter())
        .map(|id| UniqueId::new(id).name().to_string())
        .collect()
}

/// Candidates whose name is not in `referenced`, in candidate order
pub fn unreferenced_macros<'a>(
    candidates: &'a [MacroRecord],
    referenced: &BTreeSet<String>,
) -> Vec<&'a MacroRecord> {
    candidates
        .iter()
        .filter(|candidate| !referenced.contains(&candidate.macro_name))
        .collect()
}

/// A `child_map` key split into its dot-separated tokens
#[derive(Debug, Clone)]
pub struct ChildKey<'a> {
    raw: &'a str,
    tokens: HashSet<&'a str>,
}

impl<'a> ChildKey<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            tokens: raw.split('.').collect(),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Whether every given token appears in the key, in any order
    pub fn contains_all(&self, tokens: &[&str]) -> bool {
        tokens.iter().all(|token| self.tokens.contains(token))
    }
}

/// Something that can own entries in the child map
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    /// Model declared in a schema file: `{model, <name>}`
    ModelSchema(ModelSchema<'a>),

    /// Source table declared in a schema file: `{source, <source>, <table>}`
    SourceTable(SourceTableSchema<'a>),

    /// Raw manifest unique_id, matched exactly
    Node(&'a str),
}

impl EntityRef<'_> {
    /// Whether this entity is the subject of a child map key
    pub fn matches(&self, key: &ChildKey<'_>) -> bool {
        match self {
            Self::ModelSchema(model) => model
                .name
                .map_or(false, |name| key.contains_all(&["model", name])),
            Self::SourceTable(source) => match (source.source_name, source.table_name) {
                (Some(source_name), Some(table_name)) => {
                    key.contains_all(&["source", source_name, table_name])
                }
                _ => false,
            },
            Self::Node(id) => key.raw() == *id,
        }
    }
}

impl<'a> From<ModelRecord<'a>> for EntityRef<'a> {
    fn from(model: ModelRecord<'a>) -> Self {
        Self::Node(model.unique_id)
    }
}

impl<'a> From<ModelSchema<'a>> for EntityRef<'a> {
    fn from(model: ModelSchema<'a>) -> Self {
        Self::ModelSchema(model)
    }
}

impl<'a> From<SourceTableSchema<'a>> for EntityRef<'a> {
    fn from(source: SourceTableSchema<'a>) -> Self {
        Self::SourceTable(source)
    }
}

/// Singular (data) tests vs. generic (schema) tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestType {
    Data,
    Schema,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Schema => "schema",
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A test attached to some entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub test_id: NodeId,
    pub test_type: TestType,
    /// Generic test name (`unique`, `not_null`, ...) or `data`
    pub test_name: String,
}

impl TestRecord {
    /// Materialize a test from its node, falling back when the node is missing
    pub fn from_manifest(manifest: &Manifest, test_id: &str) -> Self {
        let node = manifest.get_node(test_id);

        let test_type = if node.map_or(false, |n| n.has_tag("data")) {
            TestType::Data
        } else {
            TestType::Schema
        };

        let test_name = node
            .and_then(|n| n.test_metadata.as_ref())
            .and_then(|m| m.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or("data")
            .to_string();

        Self {
            test_id: test_id.to_string(),
            test_type,
            test_name,
        }
    }
}

/// Tests that depend on an entity, via the child map
///
/// Each test id is reported once even if it sits under several matching keys.
pub fn tests_for_entity(manifest: &Manifest, entity: &EntityRef<'_>) -> Vec<TestRecord> {
    let mut seen = HashSet::new();
    let mut tests = Vec::new();

    for (key, children) in &manifest.child_map {
        if !entity.matches(&ChildKey::parse(key)) {
            continue;
        }

        for child in children {
            if UniqueId::new(child).resource_type() == "test" && seen.insert(child.as_str()) {
                tests.push(TestRecord::from_manifest(manifest, child));
            }
        }
    }

    tests
}
