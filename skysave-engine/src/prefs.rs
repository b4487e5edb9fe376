//! Minimal local prefs storage.
//!
//! Stands in for the platform player-prefs store: a flat string key-value
//! map persisted as one JSON file. Writes go through a temp file and an
//! atomic rename so a crash mid-flush never corrupts the previous state.

use crate::EngineResult;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const PREFS_FILE: &str = "prefs.json";

/// File-backed string key-value store.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FilePrefs {
    /// Opens (or creates) the prefs store inside `dir`.
    ///
    /// An unreadable or corrupt prefs file is logged and treated as
    /// empty; prefs hold only ambient state (device id, cached blobs)
    /// that can be regenerated.
    pub fn open(dir: &Path) -> EngineResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(PREFS_FILE);
        let values = if path.exists() {
            let text = fs::read_to_string(&path)?;
            match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("prefs file is corrupt, starting empty: {e}");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        Ok(Self { path, values })
    }

    /// Reads a stored value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stores a value. Not persisted until [`flush`](Self::flush).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Removes a value. Not persisted until [`flush`](Self::flush).
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Writes the store to disk atomically.
    pub fn flush(&self) -> EngineResult<()> {
        let text = serde_json::to_string(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = FilePrefs::open(dir.path()).unwrap();
        prefs.set("alpha", "1");
        prefs.set("beta", "two");
        prefs.flush().unwrap();

        let reopened = FilePrefs::open(dir.path()).unwrap();
        assert_eq!(reopened.get("alpha"), Some("1"));
        assert_eq!(reopened.get("beta"), Some("two"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PREFS_FILE), "{{{{").unwrap();
        let prefs = FilePrefs::open(dir.path()).unwrap();
        assert_eq!(prefs.get("anything"), None);
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = FilePrefs::open(dir.path()).unwrap();
        prefs.set("gone", "soon");
        assert!(prefs.remove("gone"));
        assert!(!prefs.remove("gone"));
    }
}
