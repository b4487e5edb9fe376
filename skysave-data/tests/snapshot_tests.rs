//! Snapshot serialization and merge behavior across the full store.

use pretty_assertions::assert_eq;
use skysave_data::{CurrencyLedger, ItemMeta, LedgerEntry, SaveData, SyncedItem};
use skysave_types::{DataKind, SyncPolicy};

/// A store holding at least one of every supported kind plus a
/// multi-device currency.
fn full_store() -> SaveData {
    let mut data = SaveData::new();
    let declare = |kind, policy, value: &str| SyncedItem::new(value, ItemMeta::new(kind, policy));

    data.insert_item("muted", declare(DataKind::Bool, SyncPolicy::Latest, "1"));
    data.insert_item("best_lap", declare(DataKind::Double, SyncPolicy::Lowest, "58.73"));
    data.insert_item("volume", declare(DataKind::Float, SyncPolicy::Latest, "0.8"));
    data.insert_item("high_score", declare(DataKind::Int, SyncPolicy::Highest, "1200"));
    data.insert_item("player_name", declare(DataKind::String, SyncPolicy::Latest, "Ada"));
    data.insert_item("launch_count", declare(DataKind::UInt, SyncPolicy::Highest, "17"));
    data.insert_item(
        "last_played",
        declare(DataKind::Long, SyncPolicy::Latest, "5247082850427387904"),
    );
    data.insert_item(
        "lifetime_earnings",
        declare(DataKind::Decimal, SyncPolicy::Highest, "12345.678901234567890"),
    );

    let mut gold = CurrencyLedger::new("gold");
    gold.upsert_device("device-one", LedgerEntry::new(100.0, -30.0));
    gold.upsert_device("device-two", LedgerEntry::new(55.5, 0.0));
    data.insert_currency("gold", gold);

    data
}

#[test]
fn round_trip_preserves_every_kind_and_the_currency() {
    let data = full_store();
    let serialized = data.serialize();
    let back = SaveData::from_serialized(&serialized).unwrap();
    assert_eq!(back, data);
}

#[test]
fn double_round_trip_is_stable() {
    let data = full_store();
    let once = data.serialize();
    let twice = SaveData::from_serialized(&once).unwrap().serialize();
    assert_eq!(twice, once);
}

#[test]
fn legacy_top_level_aliases_are_accepted() {
    let data = full_store();
    let legacy = data
        .serialize()
        .replacen("\"i\":", "\"SIs\":", 1)
        .replacen("\"c\":", "\"SCs\":", 1);
    let back = SaveData::from_serialized(&legacy).unwrap();
    assert_eq!(back, data);
}

#[test]
fn policy_table_examples() {
    // Highest with ints: local 5, remote 10 -> merged 10.
    let mut local = SaveData::new();
    local.insert_item(
        "score",
        SyncedItem::new("5", ItemMeta::new(DataKind::Int, SyncPolicy::Highest)),
    );
    let mut remote = SaveData::new();
    remote.insert_item(
        "score",
        SyncedItem::new("10", ItemMeta::new(DataKind::Int, SyncPolicy::Highest)),
    );
    let changed = local.merge_with(remote).unwrap();
    assert_eq!(changed, vec!["score".to_owned()]);
    assert_eq!(local.item("score").unwrap().value(), "10");

    // Highest with strings: the longer string wins.
    let mut local = SaveData::new();
    local.insert_item(
        "title",
        SyncedItem::new("abc", ItemMeta::new(DataKind::String, SyncPolicy::Highest)),
    );
    let mut remote = SaveData::new();
    remote.insert_item(
        "title",
        SyncedItem::new("de", ItemMeta::new(DataKind::String, SyncPolicy::Highest)),
    );
    let changed = local.merge_with(remote).unwrap();
    assert!(changed.is_empty());
    assert_eq!(local.item("title").unwrap().value(), "abc");

    // Lowest with bools: false wins.
    let mut local = SaveData::new();
    local.insert_item(
        "hardcore",
        SyncedItem::new("1", ItemMeta::new(DataKind::Bool, SyncPolicy::Lowest)),
    );
    let mut remote = SaveData::new();
    remote.insert_item(
        "hardcore",
        SyncedItem::new("0", ItemMeta::new(DataKind::Bool, SyncPolicy::Lowest)),
    );
    let changed = local.merge_with(remote).unwrap();
    assert_eq!(changed, vec!["hardcore".to_owned()]);
    assert_eq!(local.item("hardcore").unwrap().value(), "0");
}

#[test]
fn chronological_ranking_of_binary_encoded_instants() {
    use skysave_types::{TimeKind, Timestamp};

    // Two Utc instants a year apart, stored as Long binary strings.
    let early = Timestamp::from_ticks(635_396_832_000_000_000, TimeKind::Utc);
    let late = Timestamp::from_ticks(635_712_416_000_000_000, TimeKind::Utc);

    let mut local = SaveData::new();
    local.insert_item(
        "first_cleared",
        SyncedItem::new(
            late.to_binary().to_string(),
            ItemMeta::new(DataKind::Long, SyncPolicy::Lowest),
        ),
    );
    let mut remote = SaveData::new();
    remote.insert_item(
        "first_cleared",
        SyncedItem::new(
            early.to_binary().to_string(),
            ItemMeta::new(DataKind::Long, SyncPolicy::Lowest),
        ),
    );

    // Lowest keeps the chronologically earliest instant.
    local.merge_with(remote).unwrap();
    assert_eq!(
        local.item("first_cleared").unwrap().value(),
        early.to_binary().to_string()
    );
}

#[test]
fn currency_conservation_through_the_store_merge() {
    let mut local = SaveData::new();
    let mut gold = CurrencyLedger::new("gold");
    gold.upsert_device("device-one", LedgerEntry::new(100.0, -30.0));
    local.insert_currency("gold", gold);

    let mut remote = SaveData::new();
    let mut stale = CurrencyLedger::new("gold");
    stale.upsert_device("device-one", LedgerEntry::new(80.0, -50.0));
    remote.insert_currency("gold", stale);

    let changed = local.merge_with(remote).unwrap();
    assert_eq!(changed, vec!["gold".to_owned()]);

    let entry = local.currency("gold").unwrap().device_entry("device-one").unwrap();
    assert_eq!(entry.additions(), 100.0);
    assert_eq!(entry.subtractions(), -50.0);
    assert_eq!(entry.value(), 50.0);
}
