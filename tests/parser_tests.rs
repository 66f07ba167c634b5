// tests/parser_tests.rs

use clove_nested::ast::{BoolQuery, Bound, Query, RangeQuery};
use clove_nested::schema::Mapping;
use clove_nested::{CompileOptions, QueryError, QueryParser, Value, compile};
use indoc::indoc;
use rust_decimal::Decimal;
use serde_json::json;

fn mapping() -> Mapping {
    Mapping::from_json(&json!({
        "properties": { "tags": { "type": "nested" } }
    }))
    .unwrap()
}

fn parse(source: &str) -> Result<Query, QueryError> {
    compile(source, &mapping())
}

/// `levels` bool clauses, each holding the next under `must`.
fn bool_chain(levels: usize) -> String {
    format!(
        "{}{}{}",
        r#"{"bool": {"must": "#.repeat(levels),
        r#"{"match_all": {}}"#,
        "}}".repeat(levels)
    )
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn number(n: i64) -> Value {
    Value::Number(Decimal::from(n))
}

fn syntax_clause(err: &QueryError) -> Option<&'static str> {
    match err {
        QueryError::Syntax { clause, .. } => Some(*clause),
        _ => None,
    }
}

// ============================================================================
// Leaf clauses
// ============================================================================

#[test]
fn test_match_all() {
    assert_eq!(
        parse(r#"{"match_all": {}}"#).unwrap(),
        Query::MatchAll { boost: None }
    );
    assert_eq!(
        parse(r#"{"match_all": {"boost": 2}}"#).unwrap(),
        Query::MatchAll { boost: Some(2.0) }
    );
}

#[test]
fn test_term_shorthand() {
    assert_eq!(
        parse(r#"{"term": {"status": "open"}}"#).unwrap(),
        Query::Term {
            field: "status".to_string(),
            value: string("open"),
            boost: None,
        }
    );
}

#[test]
fn test_term_with_boost() {
    assert_eq!(
        parse(r#"{"term": {"age": {"value": 30, "boost": 1.5}}}"#).unwrap(),
        Query::Term {
            field: "age".to_string(),
            value: number(30),
            boost: Some(1.5),
        }
    );
}

#[test]
fn test_term_rejects_null() {
    let err = parse(r#"{"term": {"status": null}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("term"));
}

#[test]
fn test_term_rejects_second_field() {
    let err = parse(r#"{"term": {"a": 1, "b": 2}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("term"));
}

#[test]
fn test_terms() {
    assert_eq!(
        parse(r#"{"terms": {"tag": ["rust", 7, true]}}"#).unwrap(),
        Query::Terms {
            field: "tag".to_string(),
            values: vec![string("rust"), number(7), Value::Boolean(true)],
            boost: None,
        }
    );

    let err = parse(r#"{"terms": {"tag": "rust"}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("terms"));
}

#[test]
fn test_range() {
    assert_eq!(
        parse(r#"{"range": {"price": {"gte": 10, "lt": 20.5}}}"#).unwrap(),
        Query::Range(RangeQuery {
            field: "price".to_string(),
            lower: Some(Bound {
                value: number(10),
                inclusive: true,
            }),
            upper: Some(Bound {
                value: Value::Number(Decimal::new(205, 1)),
                inclusive: false,
            }),
            boost: None,
        })
    );
}

#[test]
fn test_range_later_bound_wins() {
    let query = parse(r#"{"range": {"n": {"gt": 1, "gte": 2}}}"#).unwrap();
    let Query::Range(range) = query else {
        panic!("Expected range");
    };
    assert_eq!(
        range.lower,
        Some(Bound {
            value: number(2),
            inclusive: true,
        })
    );
    assert_eq!(range.upper, None);
}

#[test]
fn test_range_unknown_operator() {
    let err = parse(r#"{"range": {"n": {"from": 1}}}"#).unwrap_err();
    assert_eq!(
        err.to_string(),
        "[range] query does not support [from] at line 1, column 18"
    );
}

#[test]
fn test_exists() {
    assert_eq!(
        parse(r#"{"exists": {"field": "title"}}"#).unwrap(),
        Query::Exists {
            field: "title".to_string()
        }
    );

    let err = parse(r#"{"exists": {}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("exists"));
}

#[test]
fn test_prefix_requires_string() {
    assert_eq!(
        parse(r#"{"prefix": {"user": "ki"}}"#).unwrap(),
        Query::Prefix {
            field: "user".to_string(),
            prefix: "ki".to_string(),
            boost: None,
        }
    );

    let err = parse(r#"{"prefix": {"user": 12}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("prefix"));
}

#[test]
fn test_regexp() {
    assert_eq!(
        parse(r#"{"regexp": {"user": "k.*y"}}"#).unwrap(),
        Query::Regexp {
            field: "user".to_string(),
            pattern: "k.*y".to_string(),
            boost: None,
        }
    );
}

#[test]
fn test_regexp_invalid_pattern() {
    let err = parse(r#"{"regexp": {"user": "k(y"}}"#).unwrap_err();
    assert!(matches!(err, QueryError::InvalidRegex { ref field, .. } if field == "user"));
}

// ============================================================================
// Compound clauses
// ============================================================================

#[test]
fn test_bool() {
    let source = indoc! {r#"
        {
          "bool": {
            "must": [
              {"term": {"status": "open"}},
              {"exists": {"field": "owner"}}
            ],
            "filter": {"range": {"age": {"lte": 40}}},
            "should": {"prefix": {"name": "jo"}},
            "minimum_should_match": "1",
            "boost": 3
          }
        }
    "#};

    let Query::Bool(bool_query) = parse(source).unwrap() else {
        panic!("Expected bool");
    };
    assert_eq!(bool_query.must.len(), 2);
    assert_eq!(bool_query.filter.len(), 1);
    assert_eq!(bool_query.should.len(), 1);
    assert!(bool_query.must_not.is_empty());
    assert_eq!(bool_query.minimum_should_match, Some(1));
    assert_eq!(bool_query.boost, Some(3.0));
}

#[test]
fn test_empty_bool() {
    assert_eq!(
        parse(r#"{"bool": {}}"#).unwrap(),
        Query::Bool(BoolQuery::default())
    );
}

#[test]
fn test_constant_score() {
    assert_eq!(
        parse(r#"{"constant_score": {"filter": {"exists": {"field": "a"}}, "boost": 1.2}}"#).unwrap(),
        Query::ConstantScore {
            filter: Box::new(Query::Exists {
                field: "a".to_string()
            }),
            boost: Some(1.2),
        }
    );

    let err = parse(r#"{"constant_score": {"boost": 1.2}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("constant_score"));
}

// ============================================================================
// Filter context
// ============================================================================

#[test]
fn test_filter_rejects_boost() {
    let inputs = vec![
        (r#"{"bool": {"filter": {"match_all": {"boost": 2}}}}"#, "match_all"),
        (
            r#"{"bool": {"must_not": {"term": {"a": {"value": 1, "boost": 2}}}}}"#,
            "term",
        ),
        (
            r#"{"constant_score": {"filter": {"bool": {"boost": 2}}}}"#,
            "bool",
        ),
        // must inherits the enclosing filter context
        (
            r#"{"bool": {"filter": {"bool": {"must": {"range": {"a": {"boost": 2}}}}}}}"#,
            "range",
        ),
        // so does the query body of a nested clause, parsed or buffered
        (
            r#"{"bool": {"filter": {"nested": {"path": "tags", "query": {"match_all": {"boost": 2}}}}}}"#,
            "match_all",
        ),
        (
            r#"{"bool": {"must_not": {"nested": {"query": {"match_all": {"boost": 2}}, "path": "tags"}}}}"#,
            "match_all",
        ),
        (
            r#"{"constant_score": {"filter": {"nested": {"query": {"term": {"a": {"value": 1, "boost": 2}}}, "path": "tags"}}}}"#,
            "term",
        ),
    ];

    for (input, clause) in inputs {
        let err = parse(input).unwrap_err();
        assert_eq!(syntax_clause(&err), Some(clause), "input: {}", input);
        assert!(err.to_string().contains("filter does not support [boost]"));
    }
}

#[test]
fn test_nested_query_keeps_scoring_context() {
    let sources = vec![
        r#"{"nested": {"path": "tags", "query": {"match_all": {"boost": 2}}}}"#,
        r#"{"bool": {"must": {"nested": {"query": {"match_all": {"boost": 2}}, "path": "tags"}}}}"#,
    ];

    for source in sources {
        assert!(parse(source).is_ok(), "source: {}", source);
    }
}

#[test]
fn test_filter_context_is_restored() {
    let mapping = mapping();
    let mut parser = QueryParser::new(&mapping);
    let source = r#"{"bool": {"filter": {"match_all": {}}, "must": {"match_all": {"boost": 2}}}}"#;
    parser.parse(source).unwrap();
    assert!(!parser.context().is_filter_context());
}

// ============================================================================
// Clause depth
// ============================================================================

#[test]
fn test_clause_depth_limit() {
    let mapping = mapping();
    let options = CompileOptions {
        max_clause_depth: 4,
        ..CompileOptions::default()
    };

    // three bool levels plus the match_all leaf
    let mut parser = QueryParser::with_options(&mapping, options.clone());
    assert!(parser.parse(&bool_chain(3)).is_ok());
    assert_eq!(parser.context().clause_depth(), 0);

    let mut parser = QueryParser::with_options(&mapping, options);
    let err = parser.parse(&bool_chain(4)).unwrap_err();
    assert!(matches!(err, QueryError::ClauseTooDeep { limit: 4 }));
    assert_eq!(parser.context().clause_depth(), 0);
}

#[test]
fn test_deep_bool_chain_fails_without_overflow() {
    let err = parse(&bool_chain(10_000)).unwrap_err();
    assert!(matches!(err, QueryError::ClauseTooDeep { limit: 64 }));
    assert_eq!(
        err.to_string(),
        "[query] clause nesting depth exceeds the limit of 64"
    );

    let source = format!(
        "{}{}{}",
        r#"{"constant_score": {"filter": "#.repeat(10_000),
        r#"{"exists": {"field": "a"}}"#,
        "}}".repeat(10_000)
    );
    assert!(matches!(
        parse(&source).unwrap_err(),
        QueryError::ClauseTooDeep { .. }
    ));
}

#[test]
fn test_clause_depth_counts_nested_bodies() {
    let mapping = mapping();
    let options = CompileOptions {
        max_clause_depth: 2,
        ..CompileOptions::default()
    };
    let source = r#"{"nested": {"query": {"bool": {"must": {"match_all": {}}}}, "path": "tags"}}"#;

    let mut parser = QueryParser::with_options(&mapping, options);
    let err = parser.parse(source).unwrap_err();
    assert!(matches!(err, QueryError::ClauseTooDeep { limit: 2 }));
    assert!(parser.context().scopes().is_empty());
}

// ============================================================================
// Query object errors
// ============================================================================

#[test]
fn test_unknown_query() {
    let err = parse(r#"{"fuzzy": {"a": "b"}}"#).unwrap_err();
    assert!(matches!(err, QueryError::UnknownQuery { ref name, .. } if name == "fuzzy"));
    assert_eq!(
        err.to_string(),
        "no query registered for [fuzzy] at line 1, column 2"
    );
}

#[test]
fn test_empty_query_object() {
    let err = parse("{}").unwrap_err();
    assert_eq!(syntax_clause(&err), Some("query"));
}

#[test]
fn test_multiple_clauses() {
    let err = parse(r#"{"match_all": {}, "exists": {"field": "a"}}"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("query"));
}

#[test]
fn test_query_must_be_object() {
    let err = parse(r#"["match_all"]"#).unwrap_err();
    assert_eq!(syntax_clause(&err), Some("query"));
}

#[test]
fn test_trailing_content() {
    let err = parse(r#"{"match_all": {}} {"match_all": {}}"#).unwrap_err();
    assert!(matches!(err, QueryError::MalformedContent { .. }));
}

#[test]
fn test_malformed_json() {
    let err = parse(r#"{"term": {"a" 1}}"#).unwrap_err();
    assert!(matches!(err, QueryError::MalformedContent { .. }));

    let err = parse(r#"{"term": {"a": tru}}"#).unwrap_err();
    assert!(matches!(err, QueryError::MalformedContent { .. }));
}
