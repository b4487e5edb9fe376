//! Core type definitions for Skysave.
//!
//! This crate defines the fundamental, provider-agnostic types used
//! throughout the sync engine:
//! - Device identifiers (random UUID v4, cached per install)
//! - Tick-based timestamps with .NET `DateTime.ToBinary` wire encoding
//! - The data-kind and sync-policy enums carried by every synced item
//! - [`TypedValue`], the tagged union the conflict resolver compares
//!
//! Everything provider-specific (cloud blob stores, prefs storage) belongs
//! in `skysave-engine`, not here.

mod ids;
mod timestamp;
mod value;

pub use ids::DeviceId;
pub use timestamp::{TimeKind, Timestamp};
pub use value::{DataKind, SyncPolicy, TypedValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid data kind code: {0}")]
    InvalidKindCode(i64),

    #[error("invalid data kind name: {0}")]
    InvalidKindName(String),

    #[error("invalid sync policy code: {0}")]
    InvalidPolicyCode(i64),

    #[error("invalid sync policy name: {0}")]
    InvalidPolicyName(String),

    #[error("cannot parse {raw:?} as {kind:?}")]
    ValueParse { kind: DataKind, raw: String },

    #[error("timestamp out of range: {0} ticks")]
    TimestampRange(i64),
}
