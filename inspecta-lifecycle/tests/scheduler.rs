//! Scheduler behavior over a sync engine backed by the mock remote.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use inspecta_core::{Collection, EntityIdType, LifecyclePolicy, MissionStatus, SyncConfig};
use inspecta_lifecycle::{
    lifecycle_scan_task, LifecycleScanConfig, LifecycleScheduler, UpcomingChanges,
};
use inspecta_storage::MemoryLocalStore;
use inspecta_sync::SyncEngine;
use inspecta_test_utils::{fixtures, MockRemoteService};
use tokio::sync::watch;

struct Harness {
    engine: Arc<SyncEngine>,
    remote: Arc<MockRemoteService>,
    scheduler: Arc<LifecycleScheduler>,
}

fn harness() -> Harness {
    let local = Arc::new(MemoryLocalStore::in_memory());
    let remote = Arc::new(MockRemoteService::new());
    let engine = Arc::new(
        SyncEngine::new(local, Some(remote.clone()), SyncConfig::default())
            .expect("engine should build"),
    );
    let scheduler = Arc::new(LifecycleScheduler::new(
        engine.clone(),
        LifecyclePolicy::default(),
    ));
    Harness {
        engine,
        remote,
        scheduler,
    }
}

#[tokio::test]
async fn test_approving_a_starting_mission() {
    let h = harness();
    let soon = h
        .engine
        .create_mission(fixtures::planned_soon())
        .await
        .expect("create should succeed");
    h.engine
        .create_mission(fixtures::planned_later())
        .await
        .expect("create should succeed");

    let changes = h
        .scheduler
        .check_upcoming_status_changes()
        .await
        .expect("check should succeed");
    assert_eq!(changes.starting_soon.len(), 1);
    let alert = &changes.starting_soon[0];
    assert_eq!(alert.mission.id, soon.id);
    assert_eq!(alert.proposed_status, MissionStatus::Ongoing);
    assert!(!alert.due);

    let approved = h
        .scheduler
        .approve_transition(soon.id)
        .await
        .expect("approve should succeed")
        .expect("mission should exist");
    assert_eq!(approved.status, MissionStatus::Ongoing);

    let after = h
        .scheduler
        .check_upcoming_status_changes()
        .await
        .expect("check should succeed");
    assert!(after.starting_soon.iter().all(|a| a.mission.id != soon.id));
    assert_eq!(
        h.remote
            .row(Collection::Missions, soon.id.as_uuid())
            .expect("remote row")["status"],
        "ONGOING"
    );
}

#[tokio::test]
async fn test_rejecting_opts_out_of_alerts() {
    let h = harness();
    let soon = h
        .engine
        .create_mission(fixtures::planned_soon())
        .await
        .expect("create should succeed");

    let rejected = h
        .scheduler
        .reject_transition(soon.id)
        .await
        .expect("reject should succeed")
        .expect("mission should exist");
    assert!(rejected.ignore_auto_status_change);
    assert_eq!(rejected.status, MissionStatus::Planned);

    let changes = h
        .scheduler
        .check_upcoming_status_changes()
        .await
        .expect("check should succeed");
    assert!(changes.is_empty());

    let summary = h
        .scheduler
        .update_mission_statuses_at(Utc::now() + Duration::days(1))
        .await
        .expect("update should succeed");
    assert_eq!(summary.updated, 0);
}

#[tokio::test]
async fn test_editing_dates_keeps_status() {
    let h = harness();
    let soon = h
        .engine
        .create_mission(fixtures::planned_soon())
        .await
        .expect("create should succeed");
    let start = Utc::now() + Duration::days(10);
    let end = start + Duration::days(2);

    let edited = h
        .scheduler
        .edit_mission_dates(soon.id, start, end)
        .await
        .expect("edit should succeed")
        .expect("mission should exist");
    assert_eq!(edited.status, MissionStatus::Planned);
    assert_eq!(edited.start_date, start);
    assert_eq!(edited.end_date, end);

    let changes = h
        .scheduler
        .check_upcoming_status_changes()
        .await
        .expect("check should succeed");
    assert!(changes.starting_soon.is_empty());

    let invalid = h.scheduler.edit_mission_dates(soon.id, end, start).await;
    inspecta_test_utils::assertions::assert_validation_error(&invalid);
}

#[tokio::test]
async fn test_editing_dates_accepts_single_instant() {
    let h = harness();
    let soon = h
        .engine
        .create_mission(fixtures::planned_soon())
        .await
        .expect("create should succeed");
    let instant = Utc::now() + Duration::days(3);

    let edited = h
        .scheduler
        .edit_mission_dates(soon.id, instant, instant)
        .await
        .expect("edit should succeed")
        .expect("mission should exist");
    assert_eq!(edited.start_date, instant);
    assert_eq!(edited.end_date, instant);
}

#[tokio::test]
async fn test_ending_missions_are_reported() {
    let h = harness();
    let ongoing = h
        .engine
        .create_mission(fixtures::ongoing())
        .await
        .expect("create should succeed");

    let changes = h
        .scheduler
        .check_upcoming_status_changes()
        .await
        .expect("check should succeed");
    assert_eq!(changes.ending_soon.len(), 1);
    assert_eq!(changes.ending_soon[0].mission.id, ongoing.id);
    assert_eq!(changes.ending_soon[0].proposed_status, MissionStatus::Completed);

    let later = h
        .scheduler
        .check_upcoming_status_changes_at(Utc::now() + Duration::days(5))
        .await
        .expect("check should succeed");
    assert!(later.ending_soon[0].due);
}

#[tokio::test]
async fn test_update_statuses_applies_due_transitions() {
    let h = harness();
    let started = h
        .engine
        .create_mission(fixtures::mission_input(Duration::hours(-2), Duration::days(1)))
        .await
        .expect("create should succeed");
    let finished = h
        .engine
        .create_mission(
            fixtures::mission_input(Duration::days(-5), Duration::days(2))
                .with_status(MissionStatus::Ongoing),
        )
        .await
        .expect("create should succeed");
    let cancelled = h
        .engine
        .create_mission(
            fixtures::mission_input(Duration::days(-5), Duration::days(2))
                .with_status(MissionStatus::Cancelled),
        )
        .await
        .expect("create should succeed");

    let summary = h
        .scheduler
        .update_mission_statuses()
        .await
        .expect("update should succeed");
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.started, 1);
    assert_eq!(summary.completed, 1);

    let status_of = |id| {
        let engine = h.engine.clone();
        async move {
            engine
                .get_mission(id)
                .await
                .expect("read should succeed")
                .expect("mission should exist")
                .status
        }
    };
    assert_eq!(status_of(started.id).await, MissionStatus::Ongoing);
    assert_eq!(status_of(finished.id).await, MissionStatus::Completed);
    assert_eq!(status_of(cancelled.id).await, MissionStatus::Cancelled);

    let again = h
        .scheduler
        .update_mission_statuses()
        .await
        .expect("update should succeed");
    assert_eq!(again.updated, 0);
}

#[tokio::test]
async fn test_incoherent_missions_are_listed() {
    let h = harness();
    let stale = h
        .engine
        .create_mission(fixtures::mission_input(Duration::days(-1), Duration::days(2)))
        .await
        .expect("create should succeed");
    h.engine
        .create_mission(fixtures::planned_later())
        .await
        .expect("create should succeed");

    let now = Utc::now();
    let incoherent = h
        .scheduler
        .find_incoherent_missions_at(now)
        .await
        .expect("scan should succeed");

    assert_eq!(incoherent.len(), 1);
    assert_eq!(incoherent[0].mission.id, stale.id);
    assert_eq!(incoherent[0].check.suggested_start, Some(now + Duration::days(7)));
}

#[tokio::test]
async fn test_approve_rejects_terminal_status() {
    let h = harness();
    let done = h
        .engine
        .create_mission(
            fixtures::mission_input(Duration::days(-5), Duration::days(2))
                .with_status(MissionStatus::Completed),
        )
        .await
        .expect("create should succeed");

    let result = h.scheduler.approve_transition(done.id).await;
    inspecta_test_utils::assertions::assert_validation_error(&result);
}

#[tokio::test]
async fn test_scan_task_publishes_alerts() {
    let h = harness();
    h.engine
        .create_mission(fixtures::planned_soon())
        .await
        .expect("create should succeed");
    let (alerts_tx, mut alerts_rx) = watch::channel(UpcomingChanges::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let config = LifecycleScanConfig {
        scan_interval: StdDuration::from_millis(20),
        auto_advance: false,
    };

    let handle = tokio::spawn(lifecycle_scan_task(
        h.scheduler.clone(),
        config,
        alerts_tx,
        shutdown_rx,
    ));
    alerts_rx.changed().await.expect("alerts should be published");
    assert_eq!(alerts_rx.borrow().starting_soon.len(), 1);

    shutdown_tx.send(true).expect("shutdown should send");
    let metrics = handle.await.expect("task should join").snapshot();
    assert!(metrics.scans >= 1);
    assert_eq!(metrics.scan_errors, 0);
}
