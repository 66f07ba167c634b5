//! Schema registry consumed by the nested resolver.
//!
//! The compiler only needs three things from a schema: look up a dotted field
//! path, ask whether the node is a nested collection, and obtain the
//! [`BitFilter`] that selects the node's member documents. [`SchemaRegistry`]
//! captures exactly that. [`Mapping`] is a static in-memory registry built from
//! a JSON mapping document.

use std::{collections::HashMap, fmt, str::FromStr};

use serde_json::Value as JsonValue;

use crate::error::QueryError;

/// Opaque document-membership predicate.
///
/// The compiler passes these through untouched; only the indexing layer
/// knows how to evaluate them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitFilter(FilterRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FilterRepr {
    NonNested,
    Nested(String),
}

impl BitFilter {
    /// Matches root documents, i.e. documents that are not part of any
    /// nested collection.
    pub fn non_nested() -> Self {
        BitFilter(FilterRepr::NonNested)
    }

    /// Matches member documents of the nested collection at `path`.
    pub fn nested(path: impl Into<String>) -> Self {
        BitFilter(FilterRepr::Nested(path.into()))
    }
}

impl fmt::Display for BitFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FilterRepr::NonNested => write!(f, "non_nested"),
            FilterRepr::Nested(path) => write!(f, "nested:{}", path),
        }
    }
}

/// What kind of field a schema node describes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain object; its fields are flattened into the enclosing document
    Object,
    /// One-to-many collection indexed as separate, independently filterable documents
    Nested,
    /// Leaf field carrying the declared type name (`keyword`, `long`, ...)
    Leaf(String),
}

/// Schema entry for one dotted field path.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    path: String,
    kind: NodeKind,
}

impl SchemaNode {
    pub fn new(path: impl Into<String>, kind: NodeKind) -> Self {
        SchemaNode {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_nested(&self) -> bool {
        self.kind == NodeKind::Nested
    }

    /// Filter selecting this node's member documents.
    ///
    /// Only meaningful for nested nodes; any other node's fields live inside
    /// the root document, so the root filter is returned.
    pub fn member_filter(&self) -> BitFilter {
        match self.kind {
            NodeKind::Nested => BitFilter::nested(self.path.as_str()),
            _ => BitFilter::non_nested(),
        }
    }
}

/// Lookup of schema nodes by dotted path.
pub trait SchemaRegistry {
    fn lookup(&self, path: &str) -> Option<&SchemaNode>;
}

/// In-memory registry built from a JSON mapping.
///
/// ```
/// use clove_nested::schema::{Mapping, SchemaRegistry};
///
/// let mapping = Mapping::from_json(&serde_json::json!({
///     "properties": {
///         "comments": {
///             "type": "nested",
///             "properties": { "author": { "type": "keyword" } }
///         }
///     }
/// }))
/// .unwrap();
///
/// assert!(mapping.lookup("comments").unwrap().is_nested());
/// assert!(!mapping.lookup("comments.author").unwrap().is_nested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    nodes: HashMap<String, SchemaNode>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `{"properties": {...}}` mapping, optionally wrapped in
    /// `{"mappings": ...}`.
    pub fn from_json(json: &JsonValue) -> Result<Self, QueryError> {
        let root = json.get("mappings").unwrap_or(json);
        let root = root
            .as_object()
            .ok_or_else(|| QueryError::InvalidMapping("mapping must be an object".to_string()))?;

        let mut mapping = Mapping::new();
        if let Some(properties) = root.get("properties") {
            mapping.add_properties("", properties)?;
        }
        Ok(mapping)
    }

    /// Registers a node, replacing any previous node at the same path.
    pub fn insert(&mut self, node: SchemaNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    /// Nested collection paths, sorted.
    pub fn nested_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| n.is_nested())
            .map(|n| n.path())
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add_properties(&mut self, prefix: &str, properties: &JsonValue) -> Result<(), QueryError> {
        let properties = properties.as_object().ok_or_else(|| {
            QueryError::InvalidMapping(format!("properties of [{}] must be an object", prefix))
        })?;

        for (name, definition) in properties {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };

            let definition = definition.as_object().ok_or_else(|| {
                QueryError::InvalidMapping(format!("definition of [{}] must be an object", path))
            })?;

            let kind = match definition.get("type") {
                None if definition.contains_key("properties") => NodeKind::Object,
                None => {
                    return Err(QueryError::InvalidMapping(format!(
                        "field [{}] declares neither a type nor properties",
                        path
                    )));
                }
                Some(JsonValue::String(t)) => match t.as_str() {
                    "nested" => NodeKind::Nested,
                    "object" => NodeKind::Object,
                    leaf => NodeKind::Leaf(leaf.to_string()),
                },
                Some(_) => {
                    return Err(QueryError::InvalidMapping(format!(
                        "type of [{}] must be a string",
                        path
                    )));
                }
            };

            if let Some(children) = definition.get("properties") {
                if matches!(kind, NodeKind::Leaf(_)) {
                    return Err(QueryError::InvalidMapping(format!(
                        "leaf field [{}] cannot declare properties",
                        path
                    )));
                }
                self.add_properties(&path, children)?;
            }

            self.insert(SchemaNode::new(path, kind));
        }
        Ok(())
    }
}

impl FromStr for Mapping {
    type Err = QueryError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let json: JsonValue = serde_json::from_str(source)
            .map_err(|e| QueryError::InvalidMapping(e.to_string()))?;
        Self::from_json(&json)
    }
}

impl SchemaRegistry for Mapping {
    fn lookup(&self, path: &str) -> Option<&SchemaNode> {
        self.nodes.get(path)
    }
}
