use crate::lexer::{LexError, Position};

/// Errors raised while compiling a query source.
///
/// Every variant is terminal for the clause that raised it. Messages name the
/// offending clause in brackets so the enclosing compiler can surface them to
/// users as-is.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The `path` of a nested clause has no schema entry.
    #[error("[nested] failed to find nested object under path [{path}]")]
    UnknownNestedPath { path: String },

    /// The `path` of a nested clause exists but is not a nested collection.
    #[error("[nested] nested object under path [{path}] is not of nested type")]
    NotNestedType { path: String },

    /// Nested content was supplied but no path was ever declared.
    #[error("[nested] requires 'path' field")]
    MissingPath,

    /// A path was declared but neither a query nor a filter body.
    #[error("[nested] requires either 'query' or 'filter' field")]
    MissingContent,

    /// The token stream is structurally broken.
    #[error("malformed content at {position}: {message}")]
    MalformedContent { position: Position, message: String },

    /// A clause name that no parser is registered for.
    #[error("no query registered for [{name}] at {position}")]
    UnknownQuery { name: String, position: Position },

    /// Well-formed JSON that does not fit the clause grammar.
    #[error("[{clause}] {message} at {position}")]
    Syntax {
        clause: &'static str,
        message: String,
        position: Position,
    },

    #[error("[regexp] invalid pattern for field [{field}]: {source}")]
    InvalidRegex {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("[nested] nesting depth exceeds the limit of {limit}")]
    NestingTooDeep { limit: usize },

    #[error("[query] clause nesting depth exceeds the limit of {limit}")]
    ClauseTooDeep { limit: usize },

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),
}

impl QueryError {
    pub(crate) fn syntax(
        clause: &'static str,
        message: impl Into<String>,
        position: Position,
    ) -> Self {
        QueryError::Syntax {
            clause,
            message: message.into(),
            position,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>, position: Position) -> Self {
        QueryError::MalformedContent {
            position,
            message: message.into(),
        }
    }
}

impl From<LexError> for QueryError {
    fn from(e: LexError) -> Self {
        QueryError::MalformedContent {
            position: e.position(),
            message: e.to_string(),
        }
    }
}
