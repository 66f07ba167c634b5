use std::{fmt, rc::Rc};

use crate::{schema::BitFilter, value::Value};

/// Compiled query tree.
///
/// This is the output of the compiler. It carries everything an executor
/// needs, including the scope filters resolved for every `nested` clause,
/// but it is never evaluated by this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document
    MatchAll { boost: Option<f64> },

    /// Exact value match
    ///
    /// # Example
    /// ```text
    /// {"term": {"status": "open"}}
    /// ```
    Term {
        field: String,
        value: Value,
        boost: Option<f64>,
    },

    /// Match any of several exact values
    Terms {
        field: String,
        values: Vec<Value>,
        boost: Option<f64>,
    },

    Range(RangeQuery),

    /// Field has at least one value
    Exists { field: String },

    Prefix {
        field: String,
        prefix: String,
        boost: Option<f64>,
    },

    /// Regular expression match; the pattern has already been validated
    Regexp {
        field: String,
        pattern: String,
        boost: Option<f64>,
    },

    Bool(BoolQuery),

    /// Wraps a filter so every match gets the same score
    ConstantScore {
        filter: Box<Query>,
        boost: Option<f64>,
    },

    Nested(NestedQuery),
}

impl Query {
    /// Clause name as written in the source.
    pub fn name(&self) -> &'static str {
        match self {
            Query::MatchAll { .. } => "match_all",
            Query::Term { .. } => "term",
            Query::Terms { .. } => "terms",
            Query::Range(_) => "range",
            Query::Exists { .. } => "exists",
            Query::Prefix { .. } => "prefix",
            Query::Regexp { .. } => "regexp",
            Query::Bool(_) => "bool",
            Query::ConstantScore { .. } => "constant_score",
            Query::Nested(_) => "nested",
        }
    }
}

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<i64>,
    pub boost: Option<f64>,
}

/// How child scores are folded into the parent document's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    #[default]
    Avg,
    Max,
    Min,
    Sum,
    None,
}

impl ScoreMode {
    /// Parses a `score_mode` value; `total` is accepted as an alias of `sum`.
    pub fn parse(s: &str) -> Option<ScoreMode> {
        match s {
            "avg" => Some(ScoreMode::Avg),
            "max" => Some(ScoreMode::Max),
            "min" => Some(ScoreMode::Min),
            "sum" | "total" => Some(ScoreMode::Sum),
            "none" => Some(ScoreMode::None),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::Sum => "sum",
            ScoreMode::None => "none",
        };
        f.write_str(s)
    }
}

/// A query evaluated against the members of a nested collection and joined
/// back to their parent documents.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedQuery {
    pub path: String,
    /// Inner query, shared with the clause resolver that produced it
    pub query: Rc<Query>,
    pub score_mode: ScoreMode,
    pub boost: Option<f64>,
    pub name: Option<String>,
    /// Documents that make up the enclosing level
    pub parent_filter: BitFilter,
    /// Member documents of `path`
    pub child_filter: BitFilter,
}
