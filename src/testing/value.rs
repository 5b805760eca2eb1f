//! Loosely-typed property values
//!
//! Values cross a serialization boundary between capture and replay, where the
//! original numeric width is lost. Every number is carried as `f64`.

use bevy::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A captured or live property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Vector2 { x: f32, y: f32 },
}

/// Type tag of a [`Value`], stored alongside expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Vector2,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "Null",
            ValueKind::Bool => "Bool",
            ValueKind::Number => "Number",
            ValueKind::String => "String",
            ValueKind::Vector2 => "Vector2",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Vector2 { .. } => ValueKind::Vector2,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Value::Vector2 { x, y } => Some(Vec2::new(*x, *y)),
            _ => None,
        }
    }

    /// Convert a generic JSON value into a plain [`Value`].
    ///
    /// Numbers of any width become `Number`; a two-number array or an object
    /// with numeric `x`/`y` keys becomes `Vector2`; any other compound value is
    /// kept as its JSON text.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match raw {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => match items.as_slice() {
                [Json::Number(x), Json::Number(y)] => match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => Value::Vector2 {
                        x: x as f32,
                        y: y as f32,
                    },
                    _ => Value::String(raw.to_string()),
                },
                _ => Value::String(raw.to_string()),
            },
            Json::Object(map) => {
                let axis = |lower: &str, upper: &str| {
                    map.get(lower)
                        .or_else(|| map.get(upper))
                        .and_then(|v| v.as_f64())
                };
                match (axis("x", "X"), axis("y", "Y")) {
                    (Some(x), Some(y)) if map.len() == 2 => Value::Vector2 {
                        x: x as f32,
                        y: y as f32,
                    },
                    _ => Value::String(raw.to_string()),
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&raw))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Vector2 { x, y } => write!(f, "({}, {})", x, y),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vector2 { x: v.x, y: v.y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_collapses_numbers() {
        assert_eq!(Value::from_json(&json!(3)), Value::Number(3.0));
        assert_eq!(Value::from_json(&json!(-7)), Value::Number(-7.0));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Number(2.5));
    }

    #[test]
    fn test_from_json_vectors() {
        assert_eq!(
            Value::from_json(&json!({"x": 1, "y": 2.5})),
            Value::Vector2 { x: 1.0, y: 2.5 }
        );
        assert_eq!(
            Value::from_json(&json!({"X": 1.0, "Y": 2.0})),
            Value::Vector2 { x: 1.0, y: 2.0 }
        );
        assert_eq!(
            Value::from_json(&json!([4.0, -1.0])),
            Value::Vector2 { x: 4.0, y: -1.0 }
        );
    }

    #[test]
    fn test_from_json_other_compounds_become_text() {
        assert_eq!(
            Value::from_json(&json!([1, 2, 3])),
            Value::String("[1,2,3]".to_string())
        );
        assert!(matches!(
            Value::from_json(&json!({"x": 1, "y": 2, "z": 3})),
            Value::String(_)
        ));
    }

    #[test]
    fn test_deserialize_through_json_boundary() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[null, true, 10, 10.5, "Idle", {"x": 1.0, "y": 2.0}]"#)
                .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(10.0),
                Value::Number(10.5),
                Value::from("Idle"),
                Value::from(Vec2::new(1.0, 2.0)),
            ]
        );
        assert_eq!(values[5].kind(), ValueKind::Vector2);
    }

    #[test]
    fn test_vector_serializes_as_object() {
        let text = serde_json::to_string(&Value::from(Vec2::new(1.5, -2.0))).unwrap();
        assert_eq!(text, r#"{"x":1.5,"y":-2.0}"#);
    }
}
