//! The JSON tree type and its (de)serialization.

use crate::ParseError;
use std::fmt::Write as _;
use tracing::warn;

/// Serializer recursion cap. Deeper subtrees are emitted as `null` instead
/// of being descended into. A safety valve against malformed
/// cyclic-looking input, not a true cycle detector.
const MAX_DEPTH: usize = 100;

const INFINITY: &str = "INFINITY";
const NEG_INFINITY: &str = "NEGINFINITY";
const NAN: &str = "NaN";

/// A dynamically-typed JSON tree.
///
/// Objects keep their fields in insertion order. `Baked` holds a
/// pre-serialized fragment that is emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    /// Numbers are single-precision; the wire format never carried more
    /// and existing data depends on the narrowing.
    Number(f32),
    Str(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
    Baked(String),
}

impl JsonValue {
    /// Creates an empty object.
    #[must_use]
    pub const fn object() -> Self {
        JsonValue::Object(Vec::new())
    }

    /// Creates an empty array.
    #[must_use]
    pub const fn array() -> Self {
        JsonValue::Array(Vec::new())
    }

    /// Parses leniently: malformed input yields `Null` with a logged
    /// warning. Existing persisted data relies on this never failing.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return JsonValue::Null;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => Self::from_serde(value),
            Err(e) => {
                warn!("improper JSON formatting, parsing as null: {e}");
                JsonValue::Null
            }
        }
    }

    /// Parses strictly: the document must be an object or array, and any
    /// syntax error is surfaced as a typed [`ParseError`].
    pub fn parse_strict(text: &str) -> Result<Self, ParseError> {
        let trimmed = text.trim();
        let first = trimmed.chars().next().ok_or(ParseError::Empty)?;
        if first != '{' && first != '[' {
            return Err(ParseError::UnexpectedRoot(first));
        }
        serde_json::from_str::<serde_json::Value>(trimmed)
            .map(Self::from_serde)
            .map_err(|e| ParseError::Malformed(e.to_string()))
    }

    fn from_serde(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n.as_f64().unwrap_or(f64::NAN) as f32),
            // The sentinels decode back to numbers, exactly as they were
            // written. A user string that happens to collide is absorbed;
            // that lossiness is part of the stored format.
            serde_json::Value::String(s) => match s.as_str() {
                INFINITY => JsonValue::Number(f32::INFINITY),
                NEG_INFINITY => JsonValue::Number(f32::NEG_INFINITY),
                NAN => JsonValue::Number(f32::NAN),
                _ => JsonValue::Str(s),
            },
            serde_json::Value::Array(items) => {
                JsonValue::Array(items.into_iter().map(Self::from_serde).collect())
            }
            serde_json::Value::Object(fields) => JsonValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_serde(v)))
                    .collect(),
            ),
        }
    }

    /// Appends a field to an object. Later reads of a duplicated key see
    /// the first occurrence.
    pub fn add_field(&mut self, key: impl Into<String>, value: JsonValue) -> &mut Self {
        if let JsonValue::Object(fields) = self {
            fields.push((key.into(), value));
        } else {
            debug_assert!(false, "add_field on non-object JsonValue");
        }
        self
    }

    /// Removes the named field from an object. Returns whether anything
    /// was removed.
    pub fn remove_field(&mut self, key: &str) -> bool {
        if let JsonValue::Object(fields) = self {
            let before = fields.len();
            fields.retain(|(k, _)| k != key);
            before != fields.len()
        } else {
            false
        }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns whether the object has the named field.
    #[must_use]
    pub fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Appends an element to an array.
    pub fn push(&mut self, value: JsonValue) -> &mut Self {
        if let JsonValue::Array(items) = self {
            items.push(value);
        } else {
            debug_assert!(false, "push on non-array JsonValue");
        }
        self
    }

    /// Indexes into an array.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&JsonValue> {
        match self {
            JsonValue::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of fields or elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            JsonValue::Array(items) => items.len(),
            JsonValue::Object(fields) => fields.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reads a wire code that may be stored as a number (newer snapshots)
    /// or a numeric string.
    #[must_use]
    pub fn as_code(&self) -> Option<i64> {
        match self {
            JsonValue::Number(n) => Some(*n as i64),
            JsonValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Serializes compactly.
    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0, false);
        out
    }

    /// Serializes with tab indentation.
    #[must_use]
    pub fn stringify_pretty(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0, true);
        out
    }

    fn write(&self, out: &mut String, depth: usize, pretty: bool) {
        if depth > MAX_DEPTH {
            out.push_str("null");
            return;
        }
        match self {
            JsonValue::Null => out.push_str("null"),
            JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            JsonValue::Number(n) => write_number(out, *n),
            JsonValue::Str(s) => write_escaped(out, s),
            JsonValue::Baked(fragment) => out.push_str(fragment),
            JsonValue::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if pretty {
                        newline_indent(out, depth + 1);
                    }
                    item.write(out, depth + 1, pretty);
                }
                if pretty && !items.is_empty() {
                    newline_indent(out, depth);
                }
                out.push(']');
            }
            JsonValue::Object(fields) => {
                out.push('{');
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if pretty {
                        newline_indent(out, depth + 1);
                    }
                    write_escaped(out, key);
                    out.push(':');
                    value.write(out, depth + 1, pretty);
                }
                if pretty && !fields.is_empty() {
                    newline_indent(out, depth);
                }
                out.push('}');
            }
        }
    }
}

fn newline_indent(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_number(out: &mut String, n: f32) {
    if n == f32::INFINITY {
        write_escaped(out, INFINITY);
    } else if n == f32::NEG_INFINITY {
        write_escaped(out, NEG_INFINITY);
    } else if n.is_nan() {
        write_escaped(out, NAN);
    } else {
        let _ = write!(out, "{n}");
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse_of_garbage_is_null() {
        assert!(JsonValue::parse("{not json").is_null());
        assert!(JsonValue::parse("").is_null());
    }

    #[test]
    fn strict_parse_rejects_bare_values() {
        assert!(matches!(
            JsonValue::parse_strict("42"),
            Err(ParseError::UnexpectedRoot('4'))
        ));
        assert!(JsonValue::parse_strict("{\"a\":1}").is_ok());
    }

    #[test]
    fn field_order_is_insertion_order() {
        let mut obj = JsonValue::object();
        obj.add_field("z", JsonValue::Number(1.0));
        obj.add_field("a", JsonValue::Number(2.0));
        assert_eq!(obj.stringify(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn depth_cap_emits_null() {
        let mut value = JsonValue::Number(1.0);
        for _ in 0..200 {
            let mut arr = JsonValue::array();
            arr.push(value);
            value = arr;
        }
        let text = text_without_whitespace(&value.stringify());
        assert!(text.contains("null"));
        assert!(!text.contains('1'));
    }

    fn text_without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }
}
