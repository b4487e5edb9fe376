//! Conflict resolution between two versions of a synced item.

use crate::{DataResult, SyncedItem};
use skysave_types::SyncPolicy;
use std::cmp::Ordering;
use tracing::warn;

/// Which side of a conflict survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Local,
    Remote,
}

/// Picks a winner between the local and remote version of the same key,
/// based solely on the declared sync policy. Ties always keep local, so
/// resolving twice against the same remote is a no-op.
///
/// The two sides are expected to agree on policy and kind; if they do not,
/// the caller misdeclared the key somewhere and local wins under a logged
/// warning rather than guessing at a merge.
///
/// Values are compared in typed form, never as raw strings; a stored
/// string that fails to parse as its declared kind is surfaced as an
/// error instead of silently losing the conflict.
pub fn resolve(local: &SyncedItem, remote: &SyncedItem) -> DataResult<Resolution> {
    if local.meta().policy() != remote.meta().policy() {
        warn!(
            "conflicting items declare different sync policies ({} vs {}), keeping local",
            local.meta().policy(),
            remote.meta().policy()
        );
        return Ok(Resolution::Local);
    }
    if local.meta().kind() != remote.meta().kind() {
        warn!(
            "conflicting items declare different data kinds ({} vs {}), keeping local",
            local.meta().kind(),
            remote.meta().kind()
        );
        return Ok(Resolution::Local);
    }

    match local.meta().policy() {
        SyncPolicy::Latest => {
            if remote.meta().stamp_or_min() > local.meta().stamp_or_min() {
                Ok(Resolution::Remote)
            } else {
                Ok(Resolution::Local)
            }
        }
        SyncPolicy::Highest => rank(local, remote, Ordering::Greater),
        SyncPolicy::Lowest => rank(local, remote, Ordering::Less),
    }
}

fn rank(local: &SyncedItem, remote: &SyncedItem, remote_wins_on: Ordering) -> DataResult<Resolution> {
    let local_value = local.typed()?;
    let remote_value = remote.typed()?;
    if remote_value.policy_cmp(&local_value) == remote_wins_on {
        Ok(Resolution::Remote)
    } else {
        Ok(Resolution::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemMeta;
    use skysave_types::DataKind;

    fn item(kind: DataKind, policy: SyncPolicy, value: &str) -> SyncedItem {
        SyncedItem::new(value, ItemMeta::new(kind, policy))
    }

    #[test]
    fn highest_picks_larger_number() {
        let local = item(DataKind::Int, SyncPolicy::Highest, "5");
        let remote = item(DataKind::Int, SyncPolicy::Highest, "10");
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Remote);
    }

    #[test]
    fn highest_keeps_local_on_tie() {
        let local = item(DataKind::Int, SyncPolicy::Highest, "7");
        let remote = item(DataKind::Int, SyncPolicy::Highest, "7");
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Local);
    }

    #[test]
    fn lowest_picks_smaller_number() {
        let local = item(DataKind::Double, SyncPolicy::Lowest, "2.5");
        let remote = item(DataKind::Double, SyncPolicy::Lowest, "1.5");
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Remote);
    }

    #[test]
    fn latest_picks_newer_stamp_and_ties_keep_local() {
        let mut local = item(DataKind::String, SyncPolicy::Latest, "old");
        let mut remote = item(DataKind::String, SyncPolicy::Latest, "new");
        remote.set_value("new"); // refreshes the stamp past the sentinel
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Remote);

        local.set_value("newer");
        let tied = local.clone();
        assert_eq!(resolve(&local, &tied).unwrap(), Resolution::Local);
    }

    #[test]
    fn mismatched_policy_keeps_local() {
        let local = item(DataKind::Int, SyncPolicy::Highest, "1");
        let remote = item(DataKind::Int, SyncPolicy::Lowest, "0");
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Local);
    }

    #[test]
    fn mismatched_kind_keeps_local() {
        let local = item(DataKind::Int, SyncPolicy::Highest, "1");
        let remote = item(DataKind::Long, SyncPolicy::Highest, "2");
        assert_eq!(resolve(&local, &remote).unwrap(), Resolution::Local);
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let local = item(DataKind::Int, SyncPolicy::Highest, "not a number");
        let remote = item(DataKind::Int, SyncPolicy::Highest, "2");
        assert!(resolve(&local, &remote).is_err());
    }
}
