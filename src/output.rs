//! JSON rendering of compiled queries.
//!
//! The rendered form mirrors the source DSL, with the scope filters of every
//! `nested` clause made explicit. It is meant for inspection and for handing
//! the plan to an executor written in another process; it is not parsed back.
//!
//! # Examples
//!
//! ```
//! use clove_nested::ast::Query;
//! use clove_nested::output::{to_json, to_json_string};
//!
//! let query = Query::Exists { field: "title".to_string() };
//! assert_eq!(to_json(&query), serde_json::json!({"exists": {"field": "title"}}));
//! assert_eq!(to_json_string(&query, false), r#"{"exists":{"field":"title"}}"#);
//! ```

use serde_json::{Map, Value as JsonValue, json};

use crate::{
    ast::{Bound, Query},
    value::Value,
};

/// Converts a compiled query to a JSON value.
pub fn to_json(query: &Query) -> JsonValue {
    match query {
        Query::MatchAll { boost } => {
            let mut body = Map::new();
            insert_boost(&mut body, *boost);
            json!({ "match_all": body })
        }
        Query::Term {
            field,
            value,
            boost,
        } => json!({ "term": { field: field_body(value_to_json(value), *boost) } }),
        Query::Terms {
            field,
            values,
            boost,
        } => {
            let mut body = Map::new();
            body.insert(
                field.clone(),
                JsonValue::Array(values.iter().map(value_to_json).collect()),
            );
            insert_boost(&mut body, *boost);
            json!({ "terms": body })
        }
        Query::Range(range) => {
            let mut bounds = Map::new();
            if let Some(Bound { value, inclusive }) = &range.lower {
                let key = if *inclusive { "gte" } else { "gt" };
                bounds.insert(key.to_string(), value_to_json(value));
            }
            if let Some(Bound { value, inclusive }) = &range.upper {
                let key = if *inclusive { "lte" } else { "lt" };
                bounds.insert(key.to_string(), value_to_json(value));
            }
            insert_boost(&mut bounds, range.boost);
            json!({ "range": { range.field.clone(): bounds } })
        }
        Query::Exists { field } => json!({ "exists": { "field": field } }),
        Query::Prefix {
            field,
            prefix,
            boost,
        } => json!({ "prefix": { field: field_body(json!(prefix), *boost) } }),
        Query::Regexp {
            field,
            pattern,
            boost,
        } => json!({ "regexp": { field: field_body(json!(pattern), *boost) } }),
        Query::Bool(b) => {
            let mut body = Map::new();
            for (key, clauses) in [
                ("must", &b.must),
                ("should", &b.should),
                ("must_not", &b.must_not),
                ("filter", &b.filter),
            ] {
                if !clauses.is_empty() {
                    body.insert(
                        key.to_string(),
                        JsonValue::Array(clauses.iter().map(to_json).collect()),
                    );
                }
            }
            if let Some(n) = b.minimum_should_match {
                body.insert("minimum_should_match".to_string(), json!(n));
            }
            insert_boost(&mut body, b.boost);
            json!({ "bool": body })
        }
        Query::ConstantScore { filter, boost } => {
            let mut body = Map::new();
            body.insert("filter".to_string(), to_json(filter));
            insert_boost(&mut body, *boost);
            json!({ "constant_score": body })
        }
        Query::Nested(nested) => {
            let mut body = Map::new();
            body.insert("path".to_string(), json!(nested.path));
            body.insert("query".to_string(), to_json(&nested.query));
            body.insert("score_mode".to_string(), json!(nested.score_mode.to_string()));
            body.insert(
                "parent_filter".to_string(),
                json!(nested.parent_filter.to_string()),
            );
            body.insert(
                "child_filter".to_string(),
                json!(nested.child_filter.to_string()),
            );
            insert_boost(&mut body, nested.boost);
            if let Some(name) = &nested.name {
                body.insert("_name".to_string(), json!(name));
            }
            json!({ "nested": body })
        }
    }
}

/// Renders a compiled query as compact or pretty-printed JSON text.
pub fn to_json_string(query: &Query, pretty: bool) -> String {
    let json = to_json(query);
    if pretty {
        format!("{:#}", json)
    } else {
        json.to_string()
    }
}

/// Converts a literal operand to JSON.
///
/// Numbers that fit an `i64` or `f64` become JSON numbers; anything else is
/// rendered as its decimal string so no digits are lost.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Number(n) => {
            let text = n.normalize().to_string();
            serde_json::from_str::<serde_json::Number>(&text)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::String(text))
        }
    }
}

fn field_body(value: JsonValue, boost: Option<f64>) -> JsonValue {
    match boost {
        None => value,
        Some(boost) => json!({ "value": value, "boost": boost }),
    }
}

fn insert_boost(body: &mut Map<String, JsonValue>, boost: Option<f64>) {
    if let Some(boost) = boost {
        body.insert("boost".to_string(), json!(boost));
    }
}
