//! Error types for the engine layer.

use skysave_types::DataKind;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
///
/// `KeyNotFound`, `TypeMismatch`, and `CategoryMismatch` indicate the
/// calling application misused the API; they are never retried and must
/// be fixed at the call site.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested key was never declared locally.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key's declared data kind disagrees with the operation.
    #[error("type mismatch for key {key:?}: expected {expected}, found {actual}")]
    TypeMismatch {
        key: String,
        expected: DataKind,
        actual: DataKind,
    },

    /// The key is declared as an item but used as a currency, or the
    /// other way around.
    #[error("key {key:?} is declared as {found}, not {expected}")]
    CategoryMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Error from the data model (deserialization, value parsing,
    /// currency mismatch).
    #[error(transparent)]
    Data(#[from] skysave_data::DataError),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The prefs file could not be written.
    #[error("prefs serialization error: {0}")]
    PrefsFormat(#[from] serde_json::Error),
}
