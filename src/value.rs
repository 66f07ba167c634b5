use std::fmt;

use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::stream::Event;

/// A literal operand of a leaf query (`term`, `range`, ...).
///
/// Numbers are held as [`Decimal`] so that bounds like `0.1` survive
/// compilation exactly, and integers and fractions compare consistently.
///
/// # Examples
///
/// ```
/// use clove_nested::Value;
/// use rust_decimal::Decimal;
///
/// let n = Value::Number(Decimal::new(25, 1));
/// assert_eq!(n.to_string(), "2.5");
/// assert_eq!(Value::String("open".to_string()).to_string(), "open");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
}

impl Value {
    /// Converts a scalar event, `None` for structural events and for floats
    /// that have no decimal representation (NaN, infinities, out of range).
    pub fn from_event(event: &Event) -> Option<Value> {
        match event {
            Event::Null => Some(Value::Null),
            Event::Boolean(b) => Some(Value::Boolean(*b)),
            Event::Integer(n) => Some(Value::Number(Decimal::from(*n))),
            Event::Float(n) => Decimal::from_f64(*n).map(|d| Value::Number(d.normalize())),
            Event::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
