//! Pending queue entries and synchronization reports.

use crate::{
    record::{ID_FIELD, MISSION_ID_FIELD},
    Collection, EntityIdType, OperationId, SyncAction, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A mutation applied locally while the remote was unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: OperationId,
    pub collection: Collection,
    pub action: SyncAction,
    pub record_id: Uuid,
    /// Full record for creates, patch object for updates, null for deletes.
    #[serde(default)]
    pub payload: Value,
    pub queued_at: Timestamp,
}

impl QueuedOperation {
    pub fn new(
        collection: Collection,
        action: SyncAction,
        record_id: Uuid,
        payload: Value,
        queued_at: Timestamp,
    ) -> Self {
        Self {
            id: OperationId::now_v7(),
            collection,
            action,
            record_id,
            payload,
            queued_at,
        }
    }

    /// Whether this operation targets `record_id`, directly or as its mission.
    pub fn touches(&self, record_id: Uuid) -> bool {
        self.record_id == record_id || self.payload_mission_id() == Some(record_id)
    }

    fn payload_mission_id(&self) -> Option<Uuid> {
        self.payload
            .get(MISSION_ID_FIELD)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Rewrite every reference to `from` with `to`. Returns whether anything changed.
    pub fn remap_id(&mut self, from: Uuid, to: Uuid) -> bool {
        let mut changed = false;
        if self.record_id == from {
            self.record_id = to;
            changed = true;
        }
        if let Value::Object(map) = &mut self.payload {
            for field in [ID_FIELD, MISSION_ID_FIELD] {
                let matches = map
                    .get(field)
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                    == Some(from);
                if matches {
                    map.insert(field.to_string(), Value::String(to.to_string()));
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Outcome of one queue drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Entries replayed successfully and removed.
    pub replayed: usize,
    /// Entries the remote refused, moved to the rejected list.
    pub rejected: usize,
    /// Entries still waiting after the drain.
    pub remaining: usize,
    /// Another drain was already running; nothing was done.
    pub coalesced: bool,
}

impl DrainReport {
    pub fn coalesced(remaining: usize) -> Self {
        Self {
            remaining,
            coalesced: true,
            ..Self::default()
        }
    }

    /// Whether the queue is empty after this drain.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// A queue entry the remote refused during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOperation {
    pub operation: QueuedOperation,
    pub reason: String,
    pub rejected_at: Timestamp,
}

/// Per-collection comparison of the two stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub local: BTreeMap<Collection, u64>,
    /// Zero everywhere when the remote was unreachable.
    pub remote: BTreeMap<Collection, u64>,
    /// `local - remote` per collection, zero when the remote was unreachable.
    pub differences: BTreeMap<Collection, i64>,
    pub remote_reachable: bool,
    pub pending_operations: usize,
    pub checked_at: Timestamp,
}

impl IntegrityReport {
    /// Build a report from per-collection counts.
    pub fn from_counts(
        local: BTreeMap<Collection, u64>,
        remote: Option<BTreeMap<Collection, u64>>,
        pending_operations: usize,
        checked_at: Timestamp,
    ) -> Self {
        let remote_reachable = remote.is_some();
        let remote = remote.unwrap_or_else(|| Collection::ALL.iter().map(|c| (*c, 0)).collect());
        let differences = Collection::ALL
            .iter()
            .map(|c| {
                let diff = if remote_reachable {
                    local.get(c).copied().unwrap_or(0) as i64
                        - remote.get(c).copied().unwrap_or(0) as i64
                } else {
                    0
                };
                (*c, diff)
            })
            .collect();
        Self {
            local,
            remote,
            differences,
            remote_reachable,
            pending_operations,
            checked_at,
        }
    }

    /// True iff the remote was checked and every collection matches.
    pub fn is_consistent(&self) -> bool {
        self.remote_reachable && self.differences.values().all(|d| *d == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;

    fn counts(values: [u64; 5]) -> BTreeMap<Collection, u64> {
        Collection::ALL.iter().copied().zip(values).collect()
    }

    #[test]
    fn test_equal_counts_are_consistent() {
        let report = IntegrityReport::from_counts(
            counts([3, 2, 1, 0, 4]),
            Some(counts([3, 2, 1, 0, 4])),
            0,
            Utc::now(),
        );
        assert!(report.is_consistent());
        assert!(report.differences.values().all(|d| *d == 0));
    }

    #[test]
    fn test_unreachable_remote_is_unknown() {
        let report = IntegrityReport::from_counts(counts([3, 0, 0, 0, 0]), None, 2, Utc::now());
        assert!(!report.remote_reachable);
        assert!(!report.is_consistent());
        assert_eq!(report.remote[&Collection::Missions], 0);
        assert_eq!(report.differences[&Collection::Missions], 0);
    }

    #[test]
    fn test_differences_are_signed() {
        let report = IntegrityReport::from_counts(
            counts([1, 0, 0, 0, 0]),
            Some(counts([3, 0, 0, 0, 0])),
            0,
            Utc::now(),
        );
        assert_eq!(report.differences[&Collection::Missions], -2);
    }

    #[test]
    fn test_remap_rewrites_record_and_parent_ids() {
        let old = Uuid::now_v7();
        let new = Uuid::now_v7();
        let mut op = QueuedOperation::new(
            Collection::Findings,
            SyncAction::Create,
            Uuid::now_v7(),
            json!({"mission_id": old.to_string(), "description": "x"}),
            Utc::now(),
        );
        assert!(op.touches(old));
        assert!(op.remap_id(old, new));
        assert_eq!(op.payload["mission_id"], new.to_string());
        assert!(!op.remap_id(old, new));
    }

    fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<u128>().prop_map(Uuid::from_u128)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_remap_moves_every_reference(
            record_id in arb_uuid(),
            mission_id in arb_uuid(),
            from in arb_uuid(),
            to in arb_uuid(),
        ) {
            prop_assume!(from != to);
            let mut op = QueuedOperation::new(
                Collection::Remarks,
                SyncAction::Create,
                record_id,
                json!({"id": record_id.to_string(), "mission_id": mission_id.to_string()}),
                Utc::now(),
            );
            let touched = op.touches(from);
            prop_assert_eq!(op.remap_id(from, to), touched);
            prop_assert!(!op.touches(from));
            if touched {
                prop_assert!(op.touches(to));
            }
        }

        #[test]
        fn prop_differences_are_local_minus_remote(
            local in proptest::array::uniform5(0u64..1_000),
            remote in proptest::array::uniform5(0u64..1_000),
        ) {
            let report =
                IntegrityReport::from_counts(counts(local), Some(counts(remote)), 0, Utc::now());
            for (i, collection) in Collection::ALL.iter().enumerate() {
                prop_assert_eq!(report.differences[collection], local[i] as i64 - remote[i] as i64);
            }
            prop_assert_eq!(report.is_consistent(), local == remote);
        }
    }
}
