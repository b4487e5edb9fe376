//! JSON value model for Skysave's wire format.
//!
//! Persisted snapshots were written by a hand-rolled serializer with a few
//! quirks that must keep round-tripping:
//! - numbers are single-precision floats
//! - non-finite numbers are encoded as the string sentinels `"INFINITY"`,
//!   `"NEGINFINITY"`, and `"NaN"`
//! - object field order is insertion order
//! - malformed input parses to `Null` instead of failing (lenient mode)
//!
//! [`JsonValue`] reproduces that contract on top of `serde_json`'s parser.
//! A strict parse mode is also exposed for callers that want a typed
//! [`ParseError`] instead of the lenient `Null`.
//!
//! The [`JsonCodec`] trait is the compile-time registry for wire types:
//! each serializable type implements `to_json`/`from_json` explicitly, and
//! [`field_alias`] resolves current-vs-legacy field names on read.

mod codec;
mod value;

pub use codec::{field_alias, map_from_json, map_to_json, JsonCodec};
pub use value::JsonValue;

/// Errors surfaced by the strict parse mode.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("document must start with '{{' or '[', found {0:?}")]
    UnexpectedRoot(char),

    #[error("empty document")]
    Empty,
}

/// Errors surfaced when reconstructing a typed object from JSON.
///
/// Distinct from a parse failure: the tree was valid JSON but did not have
/// the shape the target type requires. Never swallowed: a silently zeroed
/// object would corrupt later merges.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("missing fields, cannot deserialize to {type_name} (expected one of {aliases:?})")]
    MissingField {
        type_name: &'static str,
        aliases: Vec<String>,
    },

    #[error("cannot deserialize to {type_name}: {detail}")]
    Invalid {
        type_name: &'static str,
        detail: String,
    },
}
