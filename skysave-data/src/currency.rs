//! Multi-device currency ledgers.
//!
//! A currency keeps one [`LedgerEntry`] per device: the running total ever
//! earned (`additions`, non-negative) and ever spent (`subtractions`,
//! non-positive) on that device. The balance is the sum over all devices.
//! Because each device only ever grows its own totals, two ledgers merge
//! with a per-device field-wise `max`/`min` reduction. The reduction is
//! commutative, idempotent, and monotonic, so devices converge no matter
//! the order in which snapshots are exchanged.

use crate::{DataError, DataResult};
use skysave_json::{field_alias, map_from_json, map_to_json, CodecError, JsonCodec, JsonValue};
use std::collections::HashMap;
use tracing::debug;

const ALIAS_ADDITIONS: &str = "a";
const ALIAS_SUBTRACTIONS: &str = "s";
const OLD_ALIAS_ADDITIONS: &str = "cdAdd";
const OLD_ALIAS_SUBTRACTIONS: &str = "cdSub";

const ALIAS_CURRENCY_ID: &str = "i";
const ALIAS_CURRENCY_DATA: &str = "d";
const OLD_ALIAS_CURRENCY_ID: &str = "cID";
const OLD_ALIAS_CURRENCY_DATA: &str = "cData";

/// One device's ledger for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerEntry {
    additions: f32,
    subtractions: f32,
}

impl LedgerEntry {
    /// Creates an entry from raw totals. `subtractions` is non-positive.
    #[must_use]
    pub const fn new(additions: f32, subtractions: f32) -> Self {
        Self {
            additions,
            subtractions,
        }
    }

    /// Total ever earned on this device.
    #[must_use]
    pub const fn additions(&self) -> f32 {
        self.additions
    }

    /// Total ever spent on this device, as a non-positive number.
    #[must_use]
    pub const fn subtractions(&self) -> f32 {
        self.subtractions
    }

    /// This device's contribution to the balance.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.additions + self.subtractions
    }

    /// Moves the entry's value to `value` by routing the delta into the
    /// earned or spent total, so both stay monotonic and merges stay safe.
    pub fn set_value(&mut self, value: f32) {
        let delta = value - self.value();
        if delta > 0.0 {
            self.additions += delta;
        } else {
            self.subtractions += delta;
        }
    }

    /// Field-wise reduction with another record of the same device's
    /// entry. Returns whether either total advanced.
    fn absorb(&mut self, other: &LedgerEntry) -> bool {
        let mut advanced = false;
        if other.additions > self.additions {
            self.additions = other.additions;
            advanced = true;
        }
        if other.subtractions < self.subtractions {
            self.subtractions = other.subtractions;
            advanced = true;
        }
        advanced
    }
}

impl JsonCodec for LedgerEntry {
    const TYPE_NAME: &'static str = "LedgerEntry";

    fn to_json(&self) -> JsonValue {
        let mut obj = JsonValue::object();
        obj.add_field(ALIAS_ADDITIONS, JsonValue::Number(self.additions));
        obj.add_field(ALIAS_SUBTRACTIONS, JsonValue::Number(self.subtractions));
        obj
    }

    fn from_json(value: &JsonValue) -> Result<Self, CodecError> {
        let add_alias =
            field_alias(Self::TYPE_NAME, value, &[ALIAS_ADDITIONS, OLD_ALIAS_ADDITIONS])?;
        let sub_alias = field_alias(
            Self::TYPE_NAME,
            value,
            &[ALIAS_SUBTRACTIONS, OLD_ALIAS_SUBTRACTIONS],
        )?;

        let number = |alias: &str| {
            value
                .field(alias)
                .and_then(JsonValue::as_f32)
                .ok_or_else(|| CodecError::Invalid {
                    type_name: Self::TYPE_NAME,
                    detail: format!("field {alias:?} is not a number"),
                })
        };

        Ok(Self {
            additions: number(add_alias)?,
            subtractions: number(sub_alias)?,
        })
    }
}

/// A currency's full multi-device ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyLedger {
    currency_id: String,
    device_values: HashMap<String, LedgerEntry>,
}

impl CurrencyLedger {
    /// Creates an empty ledger for the given currency.
    #[must_use]
    pub fn new(currency_id: impl Into<String>) -> Self {
        Self {
            currency_id: currency_id.into(),
            device_values: HashMap::new(),
        }
    }

    /// Unique identifier for this currency.
    #[must_use]
    pub fn currency_id(&self) -> &str {
        &self.currency_id
    }

    /// Per-device ledger entries, keyed by device id.
    #[must_use]
    pub const fn device_values(&self) -> &HashMap<String, LedgerEntry> {
        &self.device_values
    }

    /// Replaces the whole per-device map (the flush path from a typed
    /// currency wrapper).
    pub fn set_device_values(&mut self, device_values: HashMap<String, LedgerEntry>) {
        self.device_values = device_values;
    }

    /// Looks up one device's entry.
    #[must_use]
    pub fn device_entry(&self, device_id: &str) -> Option<&LedgerEntry> {
        self.device_values.get(device_id)
    }

    /// Inserts or replaces one device's entry.
    pub fn upsert_device(&mut self, device_id: impl Into<String>, entry: LedgerEntry) {
        self.device_values.insert(device_id.into(), entry);
    }

    /// Mutable access to one device's entry, creating it if absent.
    pub fn device_entry_mut(&mut self, device_id: &str) -> &mut LedgerEntry {
        self.device_values
            .entry(device_id.to_owned())
            .or_default()
    }

    /// Sum of every device's contribution.
    #[must_use]
    pub fn total_value(&self) -> f32 {
        self.device_values.values().map(LedgerEntry::value).sum()
    }

    /// Merges another record of the same currency into this one.
    ///
    /// Devices known only to `other` are adopted wholesale; devices known
    /// to both take `max(additions)` and `min(subtractions)` field-wise;
    /// devices known only to `self` are untouched. Returns whether any
    /// entry changed.
    ///
    /// Merging a different currency is a caller error: the merge is
    /// aborted with no partial change.
    pub fn merge_with(&mut self, other: &CurrencyLedger) -> DataResult<bool> {
        if other.currency_id != self.currency_id {
            return Err(DataError::CurrencyMismatch {
                local: self.currency_id.clone(),
                remote: other.currency_id.clone(),
            });
        }

        let mut changed = false;
        for (device_id, other_entry) in &other.device_values {
            match self.device_values.get_mut(device_id) {
                Some(local_entry) => {
                    if local_entry.absorb(other_entry) {
                        changed = true;
                    }
                }
                None => {
                    self.device_values.insert(device_id.clone(), *other_entry);
                    changed = true;
                }
            }
        }

        if changed {
            debug!(currency = %self.currency_id, "currency ledger advanced during merge");
        }
        Ok(changed)
    }

    /// Zeroes every device's totals. All history is lost; only an explicit
    /// reset may rewrite entries wholesale.
    pub fn reset(&mut self) {
        for entry in self.device_values.values_mut() {
            *entry = LedgerEntry::default();
        }
    }
}

impl JsonCodec for CurrencyLedger {
    const TYPE_NAME: &'static str = "CurrencyLedger";

    fn to_json(&self) -> JsonValue {
        let mut obj = JsonValue::object();
        obj.add_field(ALIAS_CURRENCY_ID, JsonValue::Str(self.currency_id.clone()));
        obj.add_field(ALIAS_CURRENCY_DATA, map_to_json(&self.device_values));
        obj
    }

    fn from_json(value: &JsonValue) -> Result<Self, CodecError> {
        let id_alias = field_alias(
            Self::TYPE_NAME,
            value,
            &[ALIAS_CURRENCY_ID, OLD_ALIAS_CURRENCY_ID],
        )?;
        let data_alias = field_alias(
            Self::TYPE_NAME,
            value,
            &[ALIAS_CURRENCY_DATA, OLD_ALIAS_CURRENCY_DATA],
        )?;

        let currency_id = value
            .field(id_alias)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| CodecError::Invalid {
                type_name: Self::TYPE_NAME,
                detail: "currency id is not a string".into(),
            })?;
        let device_values = value
            .field(data_alias)
            .map(map_from_json)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            currency_id: currency_id.to_owned(),
            device_values,
        })
    }
}
