//! Synced items and their conflict-resolution metadata.

use skysave_json::{field_alias, CodecError, JsonCodec, JsonValue};
use skysave_types::{DataKind, SyncPolicy, TimeKind, Timestamp, TypedValue};

// Serialization field names, current and legacy.
const ALIAS_KIND: &str = "d";
const ALIAS_POLICY: &str = "p";
const ALIAS_STAMP: &str = "t";
const OLD_ALIAS_KIND: &str = "dT";
const OLD_ALIAS_POLICY: &str = "pT";
const OLD_ALIAS_STAMP: &str = "tS";

const ALIAS_VALUE: &str = "v";
const ALIAS_META: &str = "m";
const OLD_ALIAS_VALUE: &str = "_vs";
const OLD_ALIAS_META: &str = "_md";

/// Fixed instant assigned to newly declared Latest items, chosen so any
/// real write outranks the declaration default.
const CREATION_STAMP_TICKS: i64 = 635_396_832_000_000_000; // 2014-06-30T00:00:00

/// Metadata carried by every [`SyncedItem`]: its declared kind, its
/// conflict-resolution policy, and (for Latest items only) the instant of
/// the last write. Kind and policy are immutable after creation.
#[derive(Debug, Clone)]
pub struct ItemMeta {
    kind: DataKind,
    policy: SyncPolicy,
    stamp: Option<Timestamp>,
}

impl ItemMeta {
    /// Creates metadata for a newly declared item.
    #[must_use]
    pub fn new(kind: DataKind, policy: SyncPolicy) -> Self {
        let stamp = (policy == SyncPolicy::Latest)
            .then(|| Timestamp::from_ticks(CREATION_STAMP_TICKS, TimeKind::Unspecified));
        Self {
            kind,
            policy,
            stamp,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DataKind {
        self.kind
    }

    #[must_use]
    pub const fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// The instant of the last write. Populated only for Latest items.
    #[must_use]
    pub const fn stamp(&self) -> Option<Timestamp> {
        self.stamp
    }

    /// The stamp used for ordering; items that never carried one rank
    /// below everything.
    #[must_use]
    pub fn stamp_or_min(&self) -> Timestamp {
        self.stamp
            .unwrap_or_else(|| Timestamp::from_ticks(0, TimeKind::Unspecified))
    }

    /// Refreshes the stamp to the current UTC instant. No-op unless the
    /// policy is Latest.
    pub(crate) fn touch(&mut self) {
        if self.policy == SyncPolicy::Latest {
            self.stamp = Some(Timestamp::now());
        }
    }
}

impl PartialEq for ItemMeta {
    fn eq(&self, other: &Self) -> bool {
        let same = self.kind == other.kind && self.policy == other.policy;
        if self.policy == SyncPolicy::Latest {
            same && self.stamp == other.stamp
        } else {
            same
        }
    }
}

impl JsonCodec for ItemMeta {
    const TYPE_NAME: &'static str = "ItemMeta";

    fn to_json(&self) -> JsonValue {
        let mut obj = JsonValue::object();
        obj.add_field(ALIAS_KIND, JsonValue::Number(self.kind.code() as f32));
        obj.add_field(ALIAS_POLICY, JsonValue::Number(self.policy.code() as f32));
        if self.policy == SyncPolicy::Latest {
            if let Some(stamp) = self.stamp {
                obj.add_field(ALIAS_STAMP, JsonValue::Str(stamp.to_binary().to_string()));
            }
        }
        obj
    }

    fn from_json(value: &JsonValue) -> Result<Self, CodecError> {
        let kind_alias = field_alias(Self::TYPE_NAME, value, &[ALIAS_KIND, OLD_ALIAS_KIND])?;
        let policy_alias =
            field_alias(Self::TYPE_NAME, value, &[ALIAS_POLICY, OLD_ALIAS_POLICY])?;

        let kind_field = value
            .field(kind_alias)
            .ok_or_else(|| invalid::<Self>("kind field missing".into()))?;
        let kind = match kind_field {
            JsonValue::Str(name) => name.parse::<DataKind>(),
            field => field
                .as_code()
                .ok_or_else(|| skysave_types::Error::InvalidKindCode(-1))
                .and_then(DataKind::from_code),
        }
        .map_err(|e| invalid::<Self>(e.to_string()))?;

        let policy_field = value
            .field(policy_alias)
            .ok_or_else(|| invalid::<Self>("policy field missing".into()))?;
        let policy = match policy_field {
            JsonValue::Str(name) => name.parse::<SyncPolicy>(),
            field => field
                .as_code()
                .ok_or_else(|| skysave_types::Error::InvalidPolicyCode(-1))
                .and_then(SyncPolicy::from_code),
        }
        .map_err(|e| invalid::<Self>(e.to_string()))?;

        let stamp_field = value.field(ALIAS_STAMP).or_else(|| value.field(OLD_ALIAS_STAMP));
        let stamp = match stamp_field {
            Some(field) => {
                let binary = field
                    .as_str()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| invalid::<Self>("timestamp is not a tick string".into()))?;
                Some(Timestamp::from_binary(binary))
            }
            None => None,
        };

        Ok(Self {
            kind,
            policy,
            stamp,
        })
    }
}

fn invalid<T: JsonCodec>(detail: String) -> CodecError {
    CodecError::Invalid {
        type_name: T::TYPE_NAME,
        detail,
    }
}

/// The serializable unit wrapping one synced value: its canonical string
/// form plus the metadata used for serialization and conflict resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedItem {
    value: String,
    meta: ItemMeta,
}

impl SyncedItem {
    /// Creates an item from a canonical value string and its metadata.
    #[must_use]
    pub fn new(value: impl Into<String>, meta: ItemMeta) -> Self {
        Self {
            value: value.into(),
            meta,
        }
    }

    /// The canonical string form of the value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    /// Replaces the value. Refreshes the write stamp when the item's
    /// policy is Latest.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.meta.touch();
    }

    /// Parses the stored string as its declared kind.
    pub fn typed(&self) -> Result<TypedValue, skysave_types::Error> {
        TypedValue::parse(self.meta.kind(), &self.value)
    }
}

impl JsonCodec for SyncedItem {
    const TYPE_NAME: &'static str = "SyncedItem";

    fn to_json(&self) -> JsonValue {
        let mut obj = JsonValue::object();
        obj.add_field(ALIAS_VALUE, JsonValue::Str(self.value.clone()));
        obj.add_field(ALIAS_META, self.meta.to_json());
        obj
    }

    fn from_json(value: &JsonValue) -> Result<Self, CodecError> {
        let value_alias = field_alias(Self::TYPE_NAME, value, &[ALIAS_VALUE, OLD_ALIAS_VALUE])?;
        let meta_alias = field_alias(Self::TYPE_NAME, value, &[ALIAS_META, OLD_ALIAS_META])?;

        let raw = value
            .field(value_alias)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid::<Self>("value is not a string".into()))?;
        let meta = value
            .field(meta_alias)
            .map(ItemMeta::from_json)
            .transpose()?
            .ok_or_else(|| invalid::<Self>("metadata missing".into()))?;

        Ok(Self {
            value: raw.to_owned(),
            meta,
        })
    }
}
