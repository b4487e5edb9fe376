//! Syncable data model and conflict resolution for Skysave.
//!
//! This crate provides the units of cloud-synchronizable state and the
//! merge machinery that reconciles two independently-evolved copies:
//!
//! - [`SyncedItem`] / [`ItemMeta`] — one typed value plus the metadata
//!   that lets it resolve conflicts on its own
//! - [`LedgerEntry`] / [`CurrencyLedger`] — a per-device earn/spend ledger
//!   for currencies modified concurrently on multiple devices
//! - [`resolve`] — picks a winner between two versions of an item based on
//!   its declared [`SyncPolicy`](skysave_types::SyncPolicy)
//! - [`SaveData`] — the aggregate root holding all items and currencies,
//!   with serialize/deserialize/merge operations
//!
//! The currency merge satisfies the usual convergence properties:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Idempotent**: merging the same data twice changes nothing
//! - **Monotonic**: per-device additions never decrease, subtractions
//!   never increase
//!
//! These properties ensure every device converges on the same balance no
//! matter the order in which snapshots are exchanged.

mod currency;
mod item;
mod resolver;
mod save_data;

pub use currency::{CurrencyLedger, LedgerEntry};
pub use item::{ItemMeta, SyncedItem};
pub use resolver::{resolve, Resolution};
pub use save_data::SaveData;

/// Result type alias using the crate's error type.
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Errors that can occur in data-model operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Malformed JSON or missing required fields while reconstructing a
    /// typed object. Surfaced, never swallowed: a silently zeroed object
    /// would corrupt subsequent merges.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] skysave_json::CodecError),

    /// A stored value string failed to parse as its declared kind.
    #[error("value error: {0}")]
    Value(#[from] skysave_types::Error),

    /// Two different currencies were handed to the same merge.
    #[error("cannot merge currency {remote:?} into {local:?}")]
    CurrencyMismatch { local: String, remote: String },
}
