//! Explicit JSON codec trait for wire types.
//!
//! Each type that appears in a snapshot implements [`JsonCodec`] directly;
//! maps of codec types go through [`map_to_json`]/[`map_from_json`]. The
//! trait is the whole registry; there is no runtime reflection.

use crate::{CodecError, JsonValue};
use std::collections::HashMap;

/// Conversion between a wire type and the JSON tree.
pub trait JsonCodec: Sized {
    /// The type name reported in deserialization errors.
    const TYPE_NAME: &'static str;

    fn to_json(&self) -> JsonValue;

    fn from_json(value: &JsonValue) -> Result<Self, CodecError>;
}

/// Resolves which of several field-name aliases a snapshot used.
///
/// Serialization field names have been shortened over time; old snapshots
/// must keep deserializing, so readers probe the current name first and
/// fall back to the legacy ones. Missing all aliases is a typed error.
pub fn field_alias<'a>(
    type_name: &'static str,
    value: &JsonValue,
    aliases: &[&'a str],
) -> Result<&'a str, CodecError> {
    aliases
        .iter()
        .find(|alias| value.has_field(alias))
        .copied()
        .ok_or_else(|| CodecError::MissingField {
            type_name,
            aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
        })
}

/// Serializes a keyed map of codec types, with keys sorted for
/// deterministic output.
pub fn map_to_json<T: JsonCodec>(map: &HashMap<String, T>) -> JsonValue {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let mut obj = JsonValue::object();
    for key in keys {
        obj.add_field(key.clone(), map[key].to_json());
    }
    obj
}

/// Deserializes a keyed map of codec types.
///
/// A `Null` input yields an empty map (snapshots written before a
/// collection existed simply lack the field); any other non-object shape
/// is an error.
pub fn map_from_json<T: JsonCodec>(value: &JsonValue) -> Result<HashMap<String, T>, CodecError> {
    match value {
        JsonValue::Null => Ok(HashMap::new()),
        JsonValue::Object(fields) => fields
            .iter()
            .map(|(key, item)| Ok((key.clone(), T::from_json(item)?)))
            .collect(),
        other => Err(CodecError::Invalid {
            type_name: T::TYPE_NAME,
            detail: format!("expected an object map, found {other:?}"),
        }),
    }
}
