//! The per-session save context.

use crate::{CloudStorage, EngineError, EngineResult, FilePrefs};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use skysave_data::{CurrencyLedger, ItemMeta, LedgerEntry, SaveData, SyncedItem};
use skysave_types::{DataKind, DeviceId, SyncPolicy, Timestamp, TypedValue};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

// Well-known prefs keys.
const SAVE_BLOB_KEY: &str = "save_data";
const DEVICE_ID_KEY: &str = "device_id";

/// Configuration for a [`SaveContext`].
#[derive(Debug, Clone)]
pub struct SaveConfig {
    /// Directory holding the prefs file (device identity and the local
    /// snapshot cache).
    pub data_dir: PathBuf,
}

/// What the application declared a key to be. Used to route typed access
/// and to recognize stowaway keys left over from older schemas.
#[derive(Debug, Clone)]
enum Declared {
    Item {
        kind: DataKind,
        initial: String,
    },
    Currency {
        default_value: f32,
        allow_negative: bool,
    },
}

impl Declared {
    const fn category(&self) -> &'static str {
        match self {
            Declared::Item { .. } => "an item",
            Declared::Currency { .. } => "a currency",
        }
    }
}

/// Typed access to synced state, backed by one [`SaveData`] per session,
/// with disk and cloud persistence orchestration.
///
/// Constructed once per session via [`open`](Self::open); all consumers
/// share it by reference. The explicit lifecycle replaces any notion of a
/// process-wide singleton.
#[derive(Debug)]
pub struct SaveContext {
    prefs: FilePrefs,
    device_id: DeviceId,
    data: SaveData,
    registry: HashMap<String, Declared>,
}

impl SaveContext {
    /// Opens a session: loads (or creates) prefs storage, the device
    /// identity, and any previously persisted local snapshot.
    pub fn open(config: SaveConfig) -> EngineResult<Self> {
        let mut prefs = FilePrefs::open(&config.data_dir)?;

        let device_id = match prefs.get(DEVICE_ID_KEY) {
            Some(id) => DeviceId::new(id),
            None => {
                let id = DeviceId::generate();
                prefs.set(DEVICE_ID_KEY, id.as_str());
                prefs.flush()?;
                id
            }
        };

        let data = match prefs.get(SAVE_BLOB_KEY) {
            Some(stored) => match decode_snapshot(stored) {
                Some(serialized) => SaveData::from_serialized(&serialized)?,
                None => SaveData::new(),
            },
            None => SaveData::new(),
        };

        debug!(device = %device_id, "save context opened");
        Ok(Self {
            prefs,
            device_id,
            data,
            registry: HashMap::new(),
        })
    }

    /// Ends the session, flushing local state to disk.
    pub fn close(mut self) -> EngineResult<()> {
        self.save_to_disk()
    }

    /// This install's identity in currency ledgers.
    #[must_use]
    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Whether local data changed since the last confirmed cloud save.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.data.is_dirty()
    }

    // ── typed declaration ────────────────────────────────────────────

    pub fn initialize_bool(&mut self, key: &str, policy: SyncPolicy, value: bool) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Bool(value))
    }

    pub fn initialize_int(&mut self, key: &str, policy: SyncPolicy, value: i32) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Int(value))
    }

    pub fn initialize_uint(&mut self, key: &str, policy: SyncPolicy, value: u32) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::UInt(value))
    }

    pub fn initialize_float(&mut self, key: &str, policy: SyncPolicy, value: f32) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Float(value))
    }

    pub fn initialize_double(&mut self, key: &str, policy: SyncPolicy, value: f64) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Double(value))
    }

    pub fn initialize_string(
        &mut self,
        key: &str,
        policy: SyncPolicy,
        value: impl Into<String>,
    ) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Str(value.into()))
    }

    pub fn initialize_long(&mut self, key: &str, policy: SyncPolicy, value: i64) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Long(value))
    }

    pub fn initialize_date_time(
        &mut self,
        key: &str,
        policy: SyncPolicy,
        value: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Long(Timestamp::from_datetime(value).to_binary()))
    }

    pub fn initialize_decimal(
        &mut self,
        key: &str,
        policy: SyncPolicy,
        value: Decimal,
    ) -> EngineResult<()> {
        self.declare(key, policy, TypedValue::Decimal(value))
    }

    /// Declares a currency. Idempotent like the item declarations.
    pub fn initialize_currency(
        &mut self,
        key: &str,
        default_value: f32,
        allow_negative: bool,
    ) -> EngineResult<()> {
        if let Some(Declared::Item { .. }) = self.registry.get(key) {
            return Err(EngineError::CategoryMismatch {
                key: key.to_owned(),
                expected: "a currency",
                found: "an item",
            });
        }
        self.registry.insert(
            key.to_owned(),
            Declared::Currency {
                default_value,
                allow_negative,
            },
        );
        if self.data.currency(key).is_none() {
            self.data.insert_currency(key, CurrencyLedger::new(key));
            self.data.set_dirty(true);
        }
        Ok(())
    }

    /// Shared declaration path: registers the key and, if the store has
    /// never seen it, installs the initial value. Re-declaring an
    /// existing key is a no-op (first writer wins); later writes go
    /// through the setters.
    fn declare(&mut self, key: &str, policy: SyncPolicy, initial: TypedValue) -> EngineResult<()> {
        let kind = initial.kind();
        if let Some(item) = self.data.item(key) {
            if item.meta().kind() != kind {
                return Err(EngineError::TypeMismatch {
                    key: key.to_owned(),
                    expected: kind,
                    actual: item.meta().kind(),
                });
            }
        }
        if let Some(Declared::Currency { .. }) = self.registry.get(key) {
            return Err(EngineError::CategoryMismatch {
                key: key.to_owned(),
                expected: "an item",
                found: "a currency",
            });
        }

        let canonical = initial.canonical();
        self.registry.insert(
            key.to_owned(),
            Declared::Item {
                kind,
                initial: canonical.clone(),
            },
        );
        if self.data.item(key).is_none() {
            self.data
                .insert_item(key, SyncedItem::new(canonical, ItemMeta::new(kind, policy)));
            self.data.set_dirty(true);
        }
        Ok(())
    }

    // ── typed setters ────────────────────────────────────────────────

    pub fn set_bool(&mut self, key: &str, value: bool) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Bool(value))
    }

    pub fn set_int(&mut self, key: &str, value: i32) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Int(value))
    }

    pub fn set_uint(&mut self, key: &str, value: u32) -> EngineResult<()> {
        self.set_typed(key, TypedValue::UInt(value))
    }

    pub fn set_float(&mut self, key: &str, value: f32) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Float(value))
    }

    pub fn set_double(&mut self, key: &str, value: f64) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Double(value))
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Str(value.into()))
    }

    pub fn set_long(&mut self, key: &str, value: i64) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Long(value))
    }

    pub fn set_date_time(&mut self, key: &str, value: DateTime<Utc>) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Long(Timestamp::from_datetime(value).to_binary()))
    }

    pub fn set_decimal(&mut self, key: &str, value: Decimal) -> EngineResult<()> {
        self.set_typed(key, TypedValue::Decimal(value))
    }

    fn set_typed(&mut self, key: &str, value: TypedValue) -> EngineResult<()> {
        let kind = value.kind();
        let item = self
            .data
            .item_mut(key)
            .ok_or_else(|| EngineError::KeyNotFound(key.to_owned()))?;
        if item.meta().kind() != kind {
            return Err(EngineError::TypeMismatch {
                key: key.to_owned(),
                expected: kind,
                actual: item.meta().kind(),
            });
        }
        item.set_value(value.canonical());
        self.data.set_dirty(true);
        Ok(())
    }

    // ── typed getters ────────────────────────────────────────────────

    pub fn get_bool(&self, key: &str) -> EngineResult<bool> {
        match self.get_typed(key, DataKind::Bool)? {
            TypedValue::Bool(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Bool, &other)),
        }
    }

    pub fn get_int(&self, key: &str) -> EngineResult<i32> {
        match self.get_typed(key, DataKind::Int)? {
            TypedValue::Int(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Int, &other)),
        }
    }

    pub fn get_uint(&self, key: &str) -> EngineResult<u32> {
        match self.get_typed(key, DataKind::UInt)? {
            TypedValue::UInt(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::UInt, &other)),
        }
    }

    pub fn get_float(&self, key: &str) -> EngineResult<f32> {
        match self.get_typed(key, DataKind::Float)? {
            TypedValue::Float(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Float, &other)),
        }
    }

    pub fn get_double(&self, key: &str) -> EngineResult<f64> {
        match self.get_typed(key, DataKind::Double)? {
            TypedValue::Double(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Double, &other)),
        }
    }

    pub fn get_string(&self, key: &str) -> EngineResult<String> {
        match self.get_typed(key, DataKind::String)? {
            TypedValue::Str(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::String, &other)),
        }
    }

    pub fn get_long(&self, key: &str) -> EngineResult<i64> {
        match self.get_typed(key, DataKind::Long)? {
            TypedValue::Long(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Long, &other)),
        }
    }

    pub fn get_date_time(&self, key: &str) -> EngineResult<DateTime<Utc>> {
        let binary = self.get_long(key)?;
        Timestamp::from_binary(binary)
            .to_datetime()
            .map_err(|e| EngineError::Data(e.into()))
    }

    pub fn get_decimal(&self, key: &str) -> EngineResult<Decimal> {
        match self.get_typed(key, DataKind::Decimal)? {
            TypedValue::Decimal(v) => Ok(v),
            other => Err(self.mismatch(key, DataKind::Decimal, &other)),
        }
    }

    fn get_typed(&self, key: &str, kind: DataKind) -> EngineResult<TypedValue> {
        let item = self
            .data
            .item(key)
            .ok_or_else(|| EngineError::KeyNotFound(key.to_owned()))?;
        if item.meta().kind() != kind {
            return Err(EngineError::TypeMismatch {
                key: key.to_owned(),
                expected: kind,
                actual: item.meta().kind(),
            });
        }
        item.typed().map_err(|e| EngineError::Data(e.into()))
    }

    fn mismatch(&self, key: &str, expected: DataKind, found: &TypedValue) -> EngineError {
        EngineError::TypeMismatch {
            key: key.to_owned(),
            expected,
            actual: found.kind(),
        }
    }

    // ── currencies ───────────────────────────────────────────────────

    /// Replaces a currency's whole per-device map (the flush path from a
    /// typed currency wrapper). Creates the currency if needed.
    pub fn set_currency_values(
        &mut self,
        key: &str,
        values: HashMap<String, LedgerEntry>,
    ) -> EngineResult<()> {
        if self.data.currency(key).is_none() {
            self.data.insert_currency(key, CurrencyLedger::new(key));
        }
        if let Some(ledger) = self.data.currency_mut(key) {
            ledger.set_device_values(values);
        }
        self.data.set_dirty(true);
        Ok(())
    }

    /// Returns a currency's per-device ledger map.
    pub fn get_currency_values(&self, key: &str) -> EngineResult<&HashMap<String, LedgerEntry>> {
        self.data
            .currency(key)
            .map(CurrencyLedger::device_values)
            .ok_or_else(|| EngineError::KeyNotFound(key.to_owned()))
    }

    /// The currency's aggregate balance: default value plus every
    /// device's contribution.
    ///
    /// A pure query: when negatives are disallowed a negative computed
    /// balance reads as zero, but nothing is written. Use
    /// [`normalize_currency`](Self::normalize_currency) to persist the
    /// clamp.
    pub fn currency_balance(&self, key: &str) -> EngineResult<f32> {
        let (default_value, allow_negative) = self.currency_config(key)?;
        let raw = default_value
            + self
                .data
                .currency(key)
                .map(CurrencyLedger::total_value)
                .unwrap_or(0.0);
        if !allow_negative && raw < 0.0 {
            Ok(0.0)
        } else {
            Ok(raw)
        }
    }

    /// Moves the aggregate balance to `value` by adjusting this device's
    /// ledger entry. Values below zero clamp to zero when negatives are
    /// disallowed.
    pub fn set_currency_balance(&mut self, key: &str, value: f32) -> EngineResult<()> {
        let (default_value, allow_negative) = self.currency_config(key)?;
        let target = if allow_negative || value >= 0.0 {
            value
        } else {
            0.0
        };

        let device_id = self.device_id.as_str().to_owned();
        let ledger = self
            .data
            .currency_mut(key)
            .ok_or_else(|| EngineError::KeyNotFound(key.to_owned()))?;
        let other_devices: f32 = ledger
            .device_values()
            .iter()
            .filter(|(id, _)| id.as_str() != device_id)
            .map(|(_, entry)| entry.value())
            .sum();
        ledger
            .device_entry_mut(&device_id)
            .set_value(target - other_devices - default_value);
        self.data.set_dirty(true);
        Ok(())
    }

    /// Persists the zero-clamp of a negative balance into this device's
    /// ledger. Returns whether anything changed.
    pub fn normalize_currency(&mut self, key: &str) -> EngineResult<bool> {
        let (default_value, allow_negative) = self.currency_config(key)?;
        let raw = default_value
            + self
                .data
                .currency(key)
                .map(CurrencyLedger::total_value)
                .unwrap_or(0.0);
        if allow_negative || raw >= 0.0 {
            return Ok(false);
        }
        self.set_currency_balance(key, 0.0)?;
        Ok(true)
    }

    /// Completely resets a currency: every device's totals are zeroed.
    pub fn reset_currency(&mut self, key: &str) -> EngineResult<()> {
        if let Some(ledger) = self.data.currency_mut(key) {
            ledger.reset();
        } else {
            self.data.insert_currency(key, CurrencyLedger::new(key));
        }
        self.data.set_dirty(true);
        Ok(())
    }

    fn currency_config(&self, key: &str) -> EngineResult<(f32, bool)> {
        match self.registry.get(key) {
            Some(Declared::Currency {
                default_value,
                allow_negative,
            }) => Ok((*default_value, *allow_negative)),
            Some(declared) => Err(EngineError::CategoryMismatch {
                key: key.to_owned(),
                expected: "a currency",
                found: declared.category(),
            }),
            None => Err(EngineError::KeyNotFound(key.to_owned())),
        }
    }

    // ── merge & housekeeping ─────────────────────────────────────────

    /// Merges a snapshot downloaded from the cloud into local state and
    /// returns the keys whose value actually changed. Persists to disk
    /// when anything changed. Safe to call twice with identical data;
    /// the second call reports an empty diff.
    pub fn merge_remote(&mut self, serialized: &str) -> EngineResult<Vec<String>> {
        let other = SaveData::from_serialized(serialized)?;
        let changed = self.data.merge_with(other)?;
        if !changed.is_empty() {
            self.save_to_disk()?;
        }
        Ok(changed)
    }

    /// Replaces local state wholesale. Only for account switches, where
    /// merging two players' data would corrupt both. Returns every key
    /// in the new state.
    pub fn replace_local_with(&mut self, serialized: &str) -> EngineResult<Vec<String>> {
        self.data = SaveData::from_serialized(serialized)?;
        self.data.set_dirty(true);
        self.save_to_disk()?;
        Ok(self.data.all_keys())
    }

    /// Serializes local state for upload.
    #[must_use]
    pub fn serialize_local(&self) -> String {
        self.data.serialize()
    }

    /// Removes keys present in loaded data but no longer declared by the
    /// running application. Only deletes, never adds. Returns exactly the
    /// removed keys.
    pub fn clear_stowaways(&mut self) -> Vec<String> {
        let stray_items: Vec<String> = self
            .data
            .item_keys()
            .filter(|key| !self.registry.contains_key(*key))
            .cloned()
            .collect();
        let stray_currencies: Vec<String> = self
            .data
            .currency_keys()
            .filter(|key| !self.registry.contains_key(*key))
            .cloned()
            .collect();

        let mut removed = stray_items;
        for key in &removed {
            self.data.remove_item(key);
        }
        for key in &stray_currencies {
            self.data.remove_currency(key);
        }
        removed.extend(stray_currencies);
        if !removed.is_empty() {
            debug!("cleared {} stowaway key(s)", removed.len());
        }
        removed
    }

    /// Deletes one key from local state, item or currency. Returns
    /// whether the key existed.
    pub fn delete_key(&mut self, key: &str) -> bool {
        self.data.remove_item(key) || self.data.remove_currency(key)
    }

    /// Development helper: resets every declared key to its declaration
    /// default (items) or to zero (currencies) and returns all keys.
    /// Nothing is saved automatically afterwards.
    pub fn reset_all(&mut self) -> Vec<String> {
        let declarations: Vec<(String, Declared)> = self
            .registry
            .iter()
            .map(|(k, d)| (k.clone(), d.clone()))
            .collect();
        for (key, declared) in declarations {
            match declared {
                Declared::Item { initial, .. } => {
                    if let Some(item) = self.data.item_mut(&key) {
                        item.set_value(initial);
                    }
                }
                Declared::Currency { .. } => {
                    if let Some(ledger) = self.data.currency_mut(&key) {
                        ledger.reset();
                    }
                }
            }
        }
        warn!("all synced values have been reset");
        self.data.all_keys()
    }

    // ── disk persistence ─────────────────────────────────────────────

    /// Writes the local snapshot to prefs storage, base64-wrapped under a
    /// single well-known key. Skipped when nothing is dirty. The dirty
    /// flag survives; it is cleared only by a confirmed cloud save.
    pub fn save_to_disk(&mut self) -> EngineResult<()> {
        if !self.data.is_dirty() {
            return Ok(());
        }
        let blob = BASE64.encode(self.data.serialize());
        self.prefs.set(SAVE_BLOB_KEY, blob);
        self.prefs.flush()?;
        debug!("local snapshot saved to disk");
        Ok(())
    }

    /// Re-reads the on-disk snapshot and merges it into the running
    /// state, returning the changed keys. The initial load happens in
    /// [`open`](Self::open); this entry point exists for callers that
    /// share prefs storage with another process.
    pub fn load_from_disk(&mut self) -> EngineResult<Vec<String>> {
        let Some(stored) = self.prefs.get(SAVE_BLOB_KEY) else {
            return Ok(Vec::new());
        };
        match decode_snapshot(stored) {
            Some(serialized) => self.merge_remote(&serialized),
            None => Ok(Vec::new()),
        }
    }

    // ── cloud orchestration ──────────────────────────────────────────

    /// Uploads the local snapshot if anything is dirty. Returns whether
    /// an upload happened and succeeded; the dirty flag is cleared only
    /// on confirmed success.
    pub fn save_to_cloud(&mut self, cloud: &mut dyn CloudStorage) -> EngineResult<bool> {
        if !self.data.is_dirty() {
            debug!("cloud save skipped, local data unchanged");
            return Ok(false);
        }
        self.save_to_disk()?;
        if cloud.save(&self.data.serialize()) {
            self.data.set_dirty(false);
            Ok(true)
        } else {
            warn!("cloud save failed, local data stays dirty");
            Ok(false)
        }
    }

    /// Downloads and merges the cloud snapshot, returning the changed
    /// keys. A missing or empty cloud slot changes nothing.
    pub fn load_from_cloud(&mut self, cloud: &dyn CloudStorage) -> EngineResult<Vec<String>> {
        match cloud.load() {
            Some(blob) if !blob.trim().is_empty() => self.merge_remote(&blob),
            _ => Ok(Vec::new()),
        }
    }
}

/// Recognizes the stored snapshot format: raw JSON (newer) or
/// base64-wrapped JSON (legacy). An undecodable blob is logged and
/// treated as absent.
fn decode_snapshot(stored: &str) -> Option<String> {
    if is_json(stored) {
        return Some(stored.to_owned());
    }
    match BASE64.decode(stored.trim()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("stored snapshot is not UTF-8: {e}");
                None
            }
        },
        Err(e) => {
            warn!("unable to decode stored snapshot: {e}");
            None
        }
    }
}

/// First-character test distinguishing raw JSON from the base64 wrapper.
fn is_json(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_json_checks_first_character() {
        assert!(is_json("  {\"a\":1}"));
        assert!(is_json("[1,2]"));
        assert!(!is_json("eyJhIjoxfQ=="));
    }

    #[test]
    fn decode_snapshot_accepts_both_formats() {
        let raw = r#"{"i":{},"c":{}}"#;
        assert_eq!(decode_snapshot(raw).as_deref(), Some(raw));

        let wrapped = BASE64.encode(raw);
        assert_eq!(decode_snapshot(&wrapped).as_deref(), Some(raw));
    }

    #[test]
    fn undecodable_snapshot_is_treated_as_absent() {
        assert_eq!(decode_snapshot("!!! not base64 !!!"), None);
    }
}
