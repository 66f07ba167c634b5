use crate::{
    error::QueryError,
    schema::{SchemaNode, SchemaRegistry},
};

/// A `path` that has been checked against the schema and found to name a
/// nested collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PathBinding {
    path: String,
    descriptor: SchemaNode,
}

impl PathBinding {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Schema node of the nested collection.
    pub fn descriptor(&self) -> &SchemaNode {
        &self.descriptor
    }
}

/// Resolves `path` to a [`PathBinding`].
///
/// Fails with [`QueryError::UnknownNestedPath`] when the registry has no entry
/// and with [`QueryError::NotNestedType`] when the entry is not nested.
pub fn bind(registry: &dyn SchemaRegistry, path: &str) -> Result<PathBinding, QueryError> {
    let node = registry
        .lookup(path)
        .ok_or_else(|| QueryError::UnknownNestedPath {
            path: path.to_string(),
        })?;

    if !node.is_nested() {
        return Err(QueryError::NotNestedType {
            path: path.to_string(),
        });
    }

    Ok(PathBinding {
        path: path.to_string(),
        descriptor: node.clone(),
    })
}
