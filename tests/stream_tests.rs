// tests/stream_tests.rs

use clove_nested::buffer::{self, ContentKind};
use clove_nested::lexer::Position;
use clove_nested::parser::parse_inner_query;
use clove_nested::schema::Mapping;
use clove_nested::stream::{Event, JsonStream, TokenStream};
use clove_nested::{QueryContext, QueryError};

fn drain(stream: &mut dyn TokenStream) -> Vec<Event> {
    let mut out = vec![];
    while !stream.check(&Event::Eof) {
        out.push(stream.current().clone());
        stream.advance().unwrap();
    }
    out
}

/// Stream over `source`, positioned on the value of its first member.
fn at_first_value(source: &str) -> JsonStream {
    let mut stream = JsonStream::new(source).unwrap();
    stream.expect(&Event::StartObject, "test").unwrap();
    stream.advance().unwrap();
    stream
}

// ============================================================================
// JsonStream
// ============================================================================

#[test]
fn test_scalars_and_empty_containers() {
    let mut stream = JsonStream::new(r#"[null, false, "x", -3, 1.5, {}, []]"#).unwrap();
    assert_eq!(
        drain(&mut stream),
        vec![
            Event::StartArray,
            Event::Null,
            Event::Boolean(false),
            Event::String("x".to_string()),
            Event::Integer(-3),
            Event::Float(1.5),
            Event::StartObject,
            Event::EndObject,
            Event::StartArray,
            Event::EndArray,
            Event::EndArray,
        ]
    );
}

#[test]
fn test_eof_is_sticky() {
    let mut stream = JsonStream::new("{}").unwrap();
    stream.advance().unwrap();
    stream.advance().unwrap();
    assert!(stream.check(&Event::Eof));
    stream.advance().unwrap();
    assert!(stream.check(&Event::Eof));
}

#[test]
fn test_structural_errors() {
    let inputs = vec![
        r#"{"a" 1}"#,
        r#"{"a": 1,}"#,
        r#"{1: 2}"#,
        r#"[1 2]"#,
        r#"{"a": 1]"#,
        r#"{} {}"#,
        r#"{"a": "#,
    ];

    for input in inputs {
        let result = JsonStream::new(input).and_then(|mut stream| {
            while !stream.check(&Event::Eof) {
                stream.advance()?;
            }
            Ok(())
        });
        assert!(
            matches!(result, Err(QueryError::MalformedContent { .. })),
            "Expected malformed content for: {}",
            input
        );
    }
}

#[test]
fn test_expect_reports_clause() {
    let mut stream = JsonStream::new("[]").unwrap();
    let err = stream.expect(&Event::StartObject, "nested").unwrap_err();
    assert_eq!(
        err.to_string(),
        "[nested] expected start of object, got start of array at line 1, column 1"
    );
}

#[test]
fn test_messages_escape_quoted_text() {
    let mut stream = JsonStream::new(r#"{"a\"b\nc": 1}"#).unwrap();
    stream.advance().unwrap();
    let err = stream.expect(&Event::StartObject, "nested").unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"[nested] expected start of object, got field [a\"b\nc] at line 1, column 2"#
    );

    let mut stream = JsonStream::new(r#"["say \"hi\"\n"]"#).unwrap();
    stream.advance().unwrap();
    let err = stream.expect(&Event::StartObject, "nested").unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"[nested] expected start of object, got string "say \"hi\"\n" at line 1, column 2"#
    );
    assert!(!err.to_string().contains('\n'));
}

// ============================================================================
// Capture and replay
// ============================================================================

#[test]
fn test_capture_stops_after_object() {
    let mut stream = at_first_value(r#"{"query": {"term": {"a": [1, 2]}}, "path": "tags"}"#);
    let content = buffer::capture(&mut stream, ContentKind::Query).unwrap();

    assert_eq!(content.kind(), ContentKind::Query);
    assert_eq!(stream.field_name(), Some("path"));

    let events: Vec<Event> = content.events().iter().map(|e| e.event.clone()).collect();
    assert_eq!(
        events,
        vec![
            Event::StartObject,
            Event::FieldName("term".to_string()),
            Event::StartObject,
            Event::FieldName("a".to_string()),
            Event::StartArray,
            Event::Integer(1),
            Event::Integer(2),
            Event::EndArray,
            Event::EndObject,
            Event::EndObject,
            Event::Eof,
        ]
    );
}

#[test]
fn test_replay_matches_original() {
    let source = r#"{"bool": {"must": [{"term": {"a": 1}}], "filter": {"exists": {"field": "b"}}}}"#;

    let direct = drain(&mut JsonStream::new(source).unwrap());

    let mut stream = JsonStream::new(source).unwrap();
    let content = buffer::capture(&mut stream, ContentKind::Filter).unwrap();
    assert!(stream.check(&Event::Eof));

    assert_eq!(drain(&mut content.replay()), direct);
    // Every replay starts from the beginning
    assert_eq!(drain(&mut content.replay()), direct);
}

#[test]
fn test_replay_keeps_source_positions() {
    let mut stream = at_first_value("{\"query\": {\n  \"match_all\": {}}}");
    let content = buffer::capture(&mut stream, ContentKind::Query).unwrap();

    let mut replay = content.replay();
    assert_eq!(replay.position(), Position::new(1, 11));
    replay.advance().unwrap();
    assert_eq!(replay.position(), Position::new(2, 3));
}

#[test]
fn test_replay_parses_like_original() {
    let mapping = Mapping::new();
    let source = r#"{"range": {"price": {"gte": 10, "lt": 20.5}}}"#;

    let mut ctx = QueryContext::new(&mapping);
    let direct = parse_inner_query(&mut ctx, &mut JsonStream::new(source).unwrap()).unwrap();

    let mut stream = JsonStream::new(source).unwrap();
    let content = buffer::capture(&mut stream, ContentKind::Query).unwrap();
    let replayed = parse_inner_query(&mut ctx, &mut content.replay()).unwrap();

    assert_eq!(replayed, direct);
}

#[test]
fn test_capture_requires_object() {
    let mut stream = at_first_value(r#"{"query": [1], "path": "tags"}"#);
    let err = buffer::capture(&mut stream, ContentKind::Query).unwrap_err();
    assert!(matches!(err, QueryError::MalformedContent { .. }));
}

#[test]
fn test_capture_of_truncated_content() {
    let mut stream = at_first_value(r#"{"filter": {"term": {"a": 1}"#);
    let err = buffer::capture(&mut stream, ContentKind::Filter).unwrap_err();
    assert!(matches!(err, QueryError::MalformedContent { .. }));
}
