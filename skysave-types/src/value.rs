//! Data kinds, sync policies, and the typed value union.
//!
//! Synced values travel as canonical culture-invariant strings tagged with
//! a [`DataKind`]. The conflict resolver never compares the raw strings;
//! it parses both sides into [`TypedValue`] and dispatches on the kind, so
//! ranking is explicit per kind instead of a chain of runtime type tests.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The declared type of a synced item. Immutable after declaration.
///
/// The discriminants are wire codes; stored snapshots contain them as
/// numbers (newer) or enum-name strings (legacy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Bool = 0,
    Double = 1,
    Float = 2,
    Int = 3,
    String = 4,
    UInt = 5,
    Long = 6,
    Decimal = 7,
}

impl DataKind {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Resolves a wire code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(DataKind::Bool),
            1 => Ok(DataKind::Double),
            2 => Ok(DataKind::Float),
            3 => Ok(DataKind::Int),
            4 => Ok(DataKind::String),
            5 => Ok(DataKind::UInt),
            6 => Ok(DataKind::Long),
            7 => Ok(DataKind::Decimal),
            other => Err(Error::InvalidKindCode(other)),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Bool => "Bool",
            DataKind::Double => "Double",
            DataKind::Float => "Float",
            DataKind::Int => "Int",
            DataKind::String => "String",
            DataKind::UInt => "UInt",
            DataKind::Long => "Long",
            DataKind::Decimal => "Decimal",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DataKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Bool" => Ok(DataKind::Bool),
            "Double" => Ok(DataKind::Double),
            "Float" => Ok(DataKind::Float),
            "Int" => Ok(DataKind::Int),
            "String" => Ok(DataKind::String),
            "UInt" => Ok(DataKind::UInt),
            "Long" => Ok(DataKind::Long),
            "Decimal" => Ok(DataKind::Decimal),
            other => Err(Error::InvalidKindName(other.to_owned())),
        }
    }
}

/// The conflict-resolution policy attached to an item at declaration time.
/// Immutable after declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPolicy {
    /// The most recently written value wins.
    Latest = 0,
    /// The highest-ranking value wins.
    Highest = 1,
    /// The lowest-ranking value wins.
    Lowest = 2,
}

impl SyncPolicy {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Resolves a wire code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(SyncPolicy::Latest),
            1 => Ok(SyncPolicy::Highest),
            2 => Ok(SyncPolicy::Lowest),
            other => Err(Error::InvalidPolicyCode(other)),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPolicy::Latest => "Latest",
            SyncPolicy::Highest => "Highest",
            SyncPolicy::Lowest => "Lowest",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SyncPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Latest" => Ok(SyncPolicy::Latest),
            "Highest" => Ok(SyncPolicy::Highest),
            "Lowest" => Ok(SyncPolicy::Lowest),
            other => Err(Error::InvalidPolicyName(other.to_owned())),
        }
    }
}

/// A synced value parsed out of its canonical string form.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Double(f64),
    Float(f32),
    Int(i32),
    Str(String),
    UInt(u32),
    Long(i64),
    Decimal(Decimal),
}

impl TypedValue {
    /// Parses a canonical value string for the given kind.
    ///
    /// `Long` and `Decimal` get dedicated high-precision parsing; nothing
    /// falls back to a double. Unparseable input is a typed error, never a
    /// zeroed value.
    pub fn parse(kind: DataKind, raw: &str) -> Result<Self> {
        let err = || Error::ValueParse {
            kind,
            raw: raw.to_owned(),
        };
        match kind {
            DataKind::Bool => parse_bool(raw).ok_or_else(err).map(TypedValue::Bool),
            DataKind::Double => raw.parse().map_err(|_| err()).map(TypedValue::Double),
            DataKind::Float => raw.parse().map_err(|_| err()).map(TypedValue::Float),
            DataKind::Int => raw.parse().map_err(|_| err()).map(TypedValue::Int),
            DataKind::String => Ok(TypedValue::Str(raw.to_owned())),
            DataKind::UInt => raw.parse().map_err(|_| err()).map(TypedValue::UInt),
            DataKind::Long => raw.parse().map_err(|_| err()).map(TypedValue::Long),
            DataKind::Decimal => Decimal::from_str(raw).map_err(|_| err()).map(TypedValue::Decimal),
        }
    }

    /// Returns the kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            TypedValue::Bool(_) => DataKind::Bool,
            TypedValue::Double(_) => DataKind::Double,
            TypedValue::Float(_) => DataKind::Float,
            TypedValue::Int(_) => DataKind::Int,
            TypedValue::Str(_) => DataKind::String,
            TypedValue::UInt(_) => DataKind::UInt,
            TypedValue::Long(_) => DataKind::Long,
            TypedValue::Decimal(_) => DataKind::Decimal,
        }
    }

    /// Renders the canonical culture-invariant string form.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            TypedValue::Bool(b) => if *b { "1" } else { "0" }.to_owned(),
            TypedValue::Double(v) => v.to_string(),
            TypedValue::Float(v) => v.to_string(),
            TypedValue::Int(v) => v.to_string(),
            TypedValue::Str(s) => s.clone(),
            TypedValue::UInt(v) => v.to_string(),
            TypedValue::Long(v) => v.to_string(),
            TypedValue::Decimal(v) => v.to_string(),
        }
    }

    /// Ranks two values of the same kind for the Highest/Lowest policies.
    ///
    /// Numeric kinds rank numerically, `Bool` ranks `true` above `false`,
    /// and `Str` ranks by length (a longer string is "higher"). Values of
    /// mismatched kinds, and incomparable floats (NaN), rank as equal so
    /// the caller keeps the local side.
    #[must_use]
    pub fn policy_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TypedValue::Bool(a), TypedValue::Bool(b)) => a.cmp(b),
            (TypedValue::Double(a), TypedValue::Double(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (TypedValue::Float(a), TypedValue::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (TypedValue::Int(a), TypedValue::Int(b)) => a.cmp(b),
            (TypedValue::Str(a), TypedValue::Str(b)) => a.len().cmp(&b.len()),
            (TypedValue::UInt(a), TypedValue::UInt(b)) => a.cmp(b),
            (TypedValue::Long(a), TypedValue::Long(b)) => a.cmp(b),
            (TypedValue::Decimal(a), TypedValue::Decimal(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Accepts both canonical `1`/`0` and the legacy `True`/`False` spellings.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" => Some(true),
        "0" => Some(false),
        _ if raw.eq_ignore_ascii_case("true") => Some(true),
        _ if raw.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_round_trip() {
        for code in 0..8 {
            let kind = DataKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(DataKind::from_code(8).is_err());
    }

    #[test]
    fn kind_names_round_trip() {
        for code in 0..8 {
            let kind = DataKind::from_code(code).unwrap();
            assert_eq!(kind.to_string().parse::<DataKind>().unwrap(), kind);
        }
    }

    #[test]
    fn policy_codes_round_trip() {
        for code in 0..3 {
            let policy = SyncPolicy::from_code(code).unwrap();
            assert_eq!(policy.code(), code);
            assert_eq!(policy.to_string().parse::<SyncPolicy>().unwrap(), policy);
        }
        assert!(SyncPolicy::from_code(3).is_err());
    }

    #[test]
    fn bool_accepts_legacy_spellings() {
        assert_eq!(
            TypedValue::parse(DataKind::Bool, "True").unwrap(),
            TypedValue::Bool(true)
        );
        assert_eq!(
            TypedValue::parse(DataKind::Bool, "0").unwrap(),
            TypedValue::Bool(false)
        );
        assert_eq!(TypedValue::Bool(true).canonical(), "1");
    }

    #[test]
    fn long_and_decimal_keep_precision() {
        let big = "9007199254740993"; // not representable as f64
        assert_eq!(
            TypedValue::parse(DataKind::Long, big).unwrap(),
            TypedValue::Long(9_007_199_254_740_993)
        );
        let precise = "79228162514264337593543950334";
        let parsed = TypedValue::parse(DataKind::Decimal, precise).unwrap();
        assert_eq!(parsed.canonical(), precise);
    }

    #[test]
    fn unparseable_value_is_an_error() {
        assert!(TypedValue::parse(DataKind::Int, "twelve").is_err());
    }

    #[test]
    fn string_ranks_by_length() {
        let a = TypedValue::Str("abc".into());
        let b = TypedValue::Str("de".into());
        assert_eq!(a.policy_cmp(&b), Ordering::Greater);
    }

    #[test]
    fn bool_true_beats_false() {
        let t = TypedValue::Bool(true);
        let f = TypedValue::Bool(false);
        assert_eq!(t.policy_cmp(&f), Ordering::Greater);
    }

    #[test]
    fn nan_ranks_equal() {
        let a = TypedValue::Float(f32::NAN);
        let b = TypedValue::Float(1.0);
        assert_eq!(a.policy_cmp(&b), Ordering::Equal);
    }
}
