//! Pending operation queue, persisted to the local store after every change.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use inspecta_core::{
    InspectaResult, QueuedOperation, RejectedOperation, StorageError, SyncAction,
};
use inspecta_storage::LocalStore;
use uuid::Uuid;

/// FIFO of mutations awaiting replay, plus the operations the remote refused.
pub struct PendingQueue {
    store: Arc<dyn LocalStore>,
    pending: Mutex<VecDeque<QueuedOperation>>,
    rejected: Mutex<Vec<RejectedOperation>>,
}

impl PendingQueue {
    /// Reload both lists from the local store.
    pub fn load(store: Arc<dyn LocalStore>) -> InspectaResult<Self> {
        let pending: VecDeque<QueuedOperation> = store.load_queue()?.into();
        let rejected = store.load_rejected()?;
        if !pending.is_empty() {
            tracing::info!(pending = pending.len(), "Restored pending sync queue");
        }
        Ok(Self {
            store,
            pending: Mutex::new(pending),
            rejected: Mutex::new(rejected),
        })
    }

    fn pending(&self) -> InspectaResult<MutexGuard<'_, VecDeque<QueuedOperation>>> {
        self.pending
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn rejected(&self) -> InspectaResult<MutexGuard<'_, Vec<RejectedOperation>>> {
        self.rejected
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn persist(&self, pending: &VecDeque<QueuedOperation>) -> InspectaResult<()> {
        let (front, back) = pending.as_slices();
        if back.is_empty() {
            self.store.save_queue(front)
        } else {
            let all: Vec<QueuedOperation> = pending.iter().cloned().collect();
            self.store.save_queue(&all)
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        self.pending
            .lock()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn push(&self, op: QueuedOperation) -> InspectaResult<()> {
        let mut pending = self.pending()?;
        tracing::debug!(
            collection = %op.collection,
            action = %op.action,
            record_id = %op.record_id,
            pending = pending.len() + 1,
            "Queued operation for replay"
        );
        pending.push_back(op);
        self.persist(&pending)
    }

    pub fn front(&self) -> InspectaResult<Option<QueuedOperation>> {
        Ok(self.pending()?.front().cloned())
    }

    /// Remove the head if it is still `id`.
    pub fn pop_front(&self, id: inspecta_core::OperationId) -> InspectaResult<()> {
        let mut pending = self.pending()?;
        if pending.front().map(|op| op.id) == Some(id) {
            pending.pop_front();
            self.persist(&pending)?;
        }
        Ok(())
    }

    /// Whether any queued operation after the head touches `record_id`.
    pub fn touched_later(&self, record_id: Uuid) -> bool {
        self.pending
            .lock()
            .map(|p| p.iter().skip(1).any(|op| op.touches(record_id)))
            .unwrap_or(true)
    }

    /// Rewrite `from` to `to` in every queued operation.
    pub fn remap(&self, from: Uuid, to: Uuid) -> InspectaResult<usize> {
        let mut pending = self.pending()?;
        let changed = pending
            .iter_mut()
            .map(|op| op.remap_id(from, to))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            self.persist(&pending)?;
        }
        Ok(changed)
    }

    /// Drop every queued operation for a record whose create never reached
    /// the remote, including operations on nested records created under it.
    ///
    /// Returns true if such a create was queued.
    pub fn discard_unsynced(&self, record_id: Uuid) -> InspectaResult<bool> {
        let mut pending = self.pending()?;
        let created_offline = pending
            .iter()
            .any(|op| op.action == SyncAction::Create && op.record_id == record_id);
        if !created_offline {
            return Ok(false);
        }
        let mut doomed: HashSet<Uuid> = HashSet::from([record_id]);
        for op in pending.iter() {
            if op.action == SyncAction::Create && op.touches(record_id) {
                doomed.insert(op.record_id);
            }
        }
        let before = pending.len();
        pending.retain(|op| !doomed.contains(&op.record_id) && !op.touches(record_id));
        tracing::debug!(
            record_id = %record_id,
            discarded = before - pending.len(),
            "Discarded unsynced operations"
        );
        self.persist(&pending)?;
        Ok(true)
    }

    /// Drop queued creates of records nested under `mission_id`, and every
    /// later operation on those records. Returns how many were dropped.
    pub fn discard_children(&self, mission_id: Uuid) -> InspectaResult<usize> {
        let mut pending = self.pending()?;
        let doomed: HashSet<Uuid> = pending
            .iter()
            .filter(|op| {
                op.action == SyncAction::Create
                    && op.record_id != mission_id
                    && op.touches(mission_id)
            })
            .map(|op| op.record_id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let before = pending.len();
        pending.retain(|op| !doomed.contains(&op.record_id));
        let discarded = before - pending.len();
        tracing::debug!(
            mission_id = %mission_id,
            discarded,
            "Discarded unsynced nested operations"
        );
        self.persist(&pending)?;
        Ok(discarded)
    }

    /// Move an operation to the rejected list.
    pub fn reject(&self, operation: QueuedOperation, reason: String) -> InspectaResult<()> {
        let mut rejected = self.rejected()?;
        rejected.push(RejectedOperation {
            operation,
            reason,
            rejected_at: Utc::now(),
        });
        self.store.save_rejected(&rejected)
    }

    pub fn rejected_snapshot(&self) -> Vec<RejectedOperation> {
        self.rejected
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Empty the rejected list, returning what it held.
    pub fn take_rejected(&self) -> InspectaResult<Vec<RejectedOperation>> {
        let mut rejected = self.rejected()?;
        let taken = std::mem::take(&mut *rejected);
        self.store.save_rejected(&rejected)?;
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecta_core::Collection;
    use inspecta_storage::MemoryLocalStore;
    use proptest::prelude::*;
    use serde_json::json;

    fn op(
        collection: Collection,
        action: SyncAction,
        record_id: Uuid,
        payload: serde_json::Value,
    ) -> QueuedOperation {
        QueuedOperation::new(collection, action, record_id, payload, Utc::now())
    }

    #[test]
    fn test_queue_survives_reload() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::in_memory());
        let queue = PendingQueue::load(store.clone()).expect("load should succeed");
        let id = Uuid::now_v7();
        queue
            .push(op(Collection::Missions, SyncAction::Create, id, json!({})))
            .expect("push should succeed");

        let reloaded = PendingQueue::load(store).expect("reload should succeed");
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.snapshot()[0].record_id, id);
    }

    #[test]
    fn test_pop_front_checks_identity() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::in_memory());
        let queue = PendingQueue::load(store).expect("load should succeed");
        let first = op(Collection::Missions, SyncAction::Create, Uuid::now_v7(), json!({}));
        let second = op(Collection::Missions, SyncAction::Create, Uuid::now_v7(), json!({}));
        let second_id = second.id;
        queue.push(first).expect("push should succeed");
        queue.push(second).expect("push should succeed");

        queue.pop_front(second_id).expect("pop should succeed");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_discard_unsynced_mission_drops_children() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::in_memory());
        let queue = PendingQueue::load(store).expect("load should succeed");
        let mission = Uuid::now_v7();
        let finding = Uuid::now_v7();
        let other = Uuid::now_v7();
        queue
            .push(op(Collection::Missions, SyncAction::Create, mission, json!({})))
            .expect("push should succeed");
        queue
            .push(op(
                Collection::Findings,
                SyncAction::Create,
                finding,
                json!({"mission_id": mission.to_string()}),
            ))
            .expect("push should succeed");
        queue
            .push(op(
                Collection::Findings,
                SyncAction::Update,
                finding,
                json!({"description": "y"}),
            ))
            .expect("push should succeed");
        queue
            .push(op(Collection::Missions, SyncAction::Update, other, json!({})))
            .expect("push should succeed");

        assert!(queue.discard_unsynced(mission).expect("discard should succeed"));
        let left = queue.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].record_id, other);
        assert!(!queue.discard_unsynced(other).expect("discard should succeed"));
    }

    #[test]
    fn test_discard_children_keeps_mission_operations() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::in_memory());
        let queue = PendingQueue::load(store).expect("load should succeed");
        let mission = Uuid::now_v7();
        let remark = Uuid::now_v7();
        let elsewhere = Uuid::now_v7();
        queue
            .push(op(Collection::Missions, SyncAction::Update, mission, json!({})))
            .expect("push should succeed");
        queue
            .push(op(
                Collection::Remarks,
                SyncAction::Create,
                remark,
                json!({"mission_id": mission.to_string()}),
            ))
            .expect("push should succeed");
        queue
            .push(op(Collection::Remarks, SyncAction::Update, remark, json!({"content": "z"})))
            .expect("push should succeed");
        queue
            .push(op(
                Collection::Remarks,
                SyncAction::Create,
                elsewhere,
                json!({"mission_id": Uuid::now_v7().to_string()}),
            ))
            .expect("push should succeed");

        assert_eq!(queue.discard_children(mission).expect("discard should succeed"), 2);
        let left: Vec<Uuid> = queue.snapshot().iter().map(|op| op.record_id).collect();
        assert_eq!(left, vec![mission, elsewhere]);
        assert_eq!(queue.discard_children(mission).expect("discard should succeed"), 0);
    }

    fn arb_op() -> impl Strategy<Value = QueuedOperation> {
        let collection = prop::sample::select(Collection::ALL.to_vec());
        let action = prop::sample::select(vec![
            SyncAction::Create,
            SyncAction::Update,
            SyncAction::Delete,
        ]);
        (collection, action, any::<u128>()).prop_map(|(collection, action, raw)| {
            op(collection, action, Uuid::from_u128(raw), json!({}))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_reloaded_queue_pops_in_push_order(ops in prop::collection::vec(arb_op(), 0..20)) {
            let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::in_memory());
            let queue = PendingQueue::load(store.clone()).expect("load should succeed");
            let pushed: Vec<_> = ops.iter().map(|op| op.id).collect();
            for op in ops {
                queue.push(op).expect("push should succeed");
            }

            let reloaded = PendingQueue::load(store).expect("reload should succeed");
            let mut popped = Vec::new();
            while let Some(head) = reloaded.front().expect("front should succeed") {
                reloaded.pop_front(head.id).expect("pop should succeed");
                popped.push(head.id);
            }
            prop_assert_eq!(popped, pushed);
            prop_assert!(reloaded.is_empty());
        }
    }
}
