//! The aggregate root for all synced state.

use crate::{resolve, CurrencyLedger, DataError, DataResult, Resolution, SyncedItem};
use skysave_json::{field_alias, map_from_json, map_to_json, JsonValue};
use std::collections::HashMap;
use tracing::{debug, warn};

const ITEMS_KEY: &str = "i";
const CURRENCIES_KEY: &str = "c";
const OLD_ITEMS_KEY: &str = "SIs";
const OLD_CURRENCIES_KEY: &str = "SCs";

/// Container for every synced item and currency, plus the dirty flag that
/// gates cloud uploads.
///
/// Constructed empty or deserialized from a snapshot string; mutated
/// through the engine façade; merged with another instance representing
/// cloud state; serialized back for persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveData {
    items: HashMap<String, SyncedItem>,
    currencies: HashMap<String, CurrencyLedger>,
    dirty: bool,
}

impl SaveData {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs a store from a serialized snapshot.
    ///
    /// An empty string yields an empty store (nothing was ever saved).
    /// A non-empty snapshot that is malformed or missing its collections
    /// is a deserialization error, never a silently empty store.
    pub fn from_serialized(serialized: &str) -> DataResult<Self> {
        if serialized.trim().is_empty() {
            return Ok(Self::new());
        }

        let root = JsonValue::parse(serialized);
        let items_alias = field_alias("SaveData", &root, &[ITEMS_KEY, OLD_ITEMS_KEY])?;
        let currencies_alias =
            field_alias("SaveData", &root, &[CURRENCIES_KEY, OLD_CURRENCIES_KEY])?;

        let items = root
            .field(items_alias)
            .map(map_from_json)
            .transpose()?
            .unwrap_or_default();
        let currencies = root
            .field(currencies_alias)
            .map(map_from_json)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            items,
            currencies,
            dirty: false,
        })
    }

    /// Serializes the store to its snapshot string.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut root = JsonValue::object();
        root.add_field(ITEMS_KEY, map_to_json(&self.items));
        root.add_field(CURRENCIES_KEY, map_to_json(&self.currencies));
        root.stringify()
    }

    /// Merges another store into this one.
    ///
    /// Shared items go through the conflict resolver; shared currencies
    /// take the ledger merge; keys known only to `other` are adopted.
    /// Returns the keys whose value actually changed (empty when merging
    /// identical data; the merge is idempotent).
    pub fn merge_with(&mut self, other: SaveData) -> DataResult<Vec<String>> {
        let mut changed_keys = Vec::new();

        for (key, other_item) in other.items {
            match self.items.get(&key) {
                Some(local_item) => {
                    if resolve(local_item, &other_item)? == Resolution::Remote
                        && *local_item != other_item
                    {
                        self.items.insert(key.clone(), other_item);
                        changed_keys.push(key);
                    }
                }
                None => {
                    self.items.insert(key.clone(), other_item);
                    changed_keys.push(key);
                }
            }
        }

        for (key, other_currency) in other.currencies {
            match self.currencies.get_mut(&key) {
                Some(local_currency) => match local_currency.merge_with(&other_currency) {
                    Ok(true) => changed_keys.push(key),
                    Ok(false) => {}
                    // Different currency ids under one key is caller
                    // misuse; skip the key, keep the rest of the merge.
                    Err(DataError::CurrencyMismatch { local, remote }) => {
                        warn!("refusing to merge currency {remote:?} into {local:?} at key {key:?}");
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    self.currencies.insert(key.clone(), other_currency);
                    changed_keys.push(key);
                }
            }
        }

        if !changed_keys.is_empty() {
            self.dirty = true;
            debug!("merge changed {} key(s)", changed_keys.len());
        }
        Ok(changed_keys)
    }

    /// Every key in the store, items then currencies.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.keys().cloned().collect();
        keys.extend(self.currencies.keys().cloned());
        keys
    }

    #[must_use]
    pub fn item(&self, key: &str) -> Option<&SyncedItem> {
        self.items.get(key)
    }

    pub fn item_mut(&mut self, key: &str) -> Option<&mut SyncedItem> {
        self.items.get_mut(key)
    }

    pub fn insert_item(&mut self, key: impl Into<String>, item: SyncedItem) {
        self.items.insert(key.into(), item);
    }

    pub fn remove_item(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    #[must_use]
    pub fn currency(&self, key: &str) -> Option<&CurrencyLedger> {
        self.currencies.get(key)
    }

    pub fn currency_mut(&mut self, key: &str) -> Option<&mut CurrencyLedger> {
        self.currencies.get_mut(key)
    }

    pub fn insert_currency(&mut self, key: impl Into<String>, currency: CurrencyLedger) {
        self.currencies.insert(key.into(), currency);
    }

    pub fn remove_currency(&mut self, key: &str) -> bool {
        self.currencies.remove(key).is_some()
    }

    /// Whether any contained value changed since the last confirmed save.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Item keys, for stowaway accounting.
    pub fn item_keys(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Currency keys, for stowaway accounting.
    pub fn currency_keys(&self) -> impl Iterator<Item = &String> {
        self.currencies.keys()
    }
}
