//! The cloud blob-store boundary.

use std::collections::VecDeque;

/// An opaque cloud save slot: the engine's only external interface.
///
/// Implementations wrap whatever provider the platform offers. They own
/// retries, timeouts, and authentication; the engine only consumes the
/// final outcome.
pub trait CloudStorage {
    /// Returns the previously saved snapshot, or `None` if none exists.
    fn load(&self) -> Option<String>;

    /// Persists the given snapshot. Returns whether the save succeeded.
    fn save(&mut self, data: &str) -> bool;
}

/// In-memory provider used in tests and local development.
///
/// Can be scripted to fail upcoming saves, to exercise the
/// dirty-flag-survives-failed-upload path.
#[derive(Debug, Default)]
pub struct InMemoryCloud {
    blob: Option<String>,
    failures: VecDeque<()>,
}

impl InMemoryCloud {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an existing stored snapshot.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            failures: VecDeque::new(),
        }
    }

    /// Makes the next `n` saves report failure.
    pub fn fail_next_saves(&mut self, n: usize) {
        self.failures = std::iter::repeat_n((), n).collect();
    }

    /// The currently stored snapshot.
    #[must_use]
    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl CloudStorage for InMemoryCloud {
    fn load(&self) -> Option<String> {
        self.blob.clone()
    }

    fn save(&mut self, data: &str) -> bool {
        if self.failures.pop_front().is_some() {
            return false;
        }
        self.blob = Some(data.to_owned());
        true
    }
}
