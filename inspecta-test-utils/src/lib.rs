//! INSPECTA Test Utilities
//!
//! Centralized test infrastructure for the INSPECTA workspace:
//! - Mock remote data service with failure injection
//! - Proptest generators for missions and lifecycle inputs
//! - Test fixtures for common scenarios
//! - Assertions for INSPECTA error variants

pub mod mock;

pub use mock::MockRemoteService;

// Re-export core types for convenience
pub use inspecta_core::{
    Collection, ControlMotive, EntityIdType, InspectaError, InspectaResult, Mission, MissionId,
    MissionStatus, MissionType, NewMission, RemoteError, Timestamp, ValidationError,
};
pub use inspecta_storage::MemoryLocalStore;

use chrono::{Duration, Utc};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating INSPECTA inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Generate a random MissionId.
    pub fn arb_mission_id() -> impl Strategy<Value = MissionId> {
        arb_uuid_v7().prop_map(MissionId::new)
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    /// Generate an offset in minutes within roughly ±60 days.
    pub fn arb_offset() -> impl Strategy<Value = Duration> {
        (-86_400i64..86_400i64).prop_map(Duration::minutes)
    }

    /// Generate a MissionStatus variant.
    pub fn arb_mission_status() -> impl Strategy<Value = MissionStatus> {
        prop_oneof![
            Just(MissionStatus::Planned),
            Just(MissionStatus::Ongoing),
            Just(MissionStatus::Completed),
            Just(MissionStatus::Cancelled),
            Just(MissionStatus::AwaitingResponse),
        ]
    }

    /// Generate a MissionType variant.
    pub fn arb_mission_type() -> impl Strategy<Value = MissionType> {
        prop_oneof![
            Just(MissionType::OnSite),
            Just(MissionType::Desk),
            Just(MissionType::Online),
        ]
    }

    /// Generate `(now, start, end)` with arbitrary, possibly unordered dates.
    pub fn arb_lifecycle_dates() -> impl Strategy<Value = (Timestamp, Timestamp, Timestamp)> {
        (arb_timestamp(), arb_offset(), arb_offset())
            .prop_map(|(now, start, end)| (now, now + start, now + end))
    }

    /// Generate a mission input with a non-empty title and ordered dates.
    pub fn arb_new_mission() -> impl Strategy<Value = NewMission> {
        (
            "[A-Za-z][A-Za-z ]{0,30}",
            "[A-Z][A-Za-z]{1,20}",
            arb_offset(),
            1i64..(60 * 24 * 30),
            arb_mission_type(),
        )
            .prop_map(|(title, organization, start, length, mission_type)| {
                let start = Utc::now() + start;
                NewMission::new(title, organization, start, start + Duration::minutes(length))
                    .with_mission_type(mission_type)
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built inputs for common scenarios.

    use super::*;

    /// Mission input starting `starts_in` from now and lasting `length`.
    pub fn mission_input(starts_in: Duration, length: Duration) -> NewMission {
        let start = Utc::now() + starts_in;
        NewMission::new("Controle sur place", "ACME SAS", start, start + length)
    }

    /// PLANNED mission input starting in one hour and lasting two days.
    pub fn planned_soon() -> NewMission {
        mission_input(Duration::hours(1), Duration::days(2))
    }

    /// ONGOING mission input that started yesterday and ends in three days.
    pub fn ongoing() -> NewMission {
        mission_input(Duration::days(-1), Duration::days(4)).with_status(MissionStatus::Ongoing)
    }

    /// PLANNED mission input starting next month.
    pub fn planned_later() -> NewMission {
        mission_input(Duration::days(30), Duration::days(3))
    }

    /// Canonical mission record with explicit status and dates.
    pub fn mission(status: MissionStatus, start: Timestamp, end: Timestamp) -> Mission {
        let now = Utc::now();
        let id = MissionId::now_v7();
        NewMission::new("Controle", "ACME SAS", start, end)
            .with_status(status)
            .into_mission(id, None, now)
            .unwrap_or_else(|e| panic!("fixture mission should build: {e}"))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for INSPECTA error variants.

    use super::*;

    /// Assert that a result is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &InspectaResult<T>) {
        match result {
            Err(InspectaError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a result is an UnknownMission validation error.
    #[track_caller]
    pub fn assert_unknown_mission<T: std::fmt::Debug>(result: &InspectaResult<T>) {
        match result {
            Err(InspectaError::Validation(ValidationError::UnknownMission { .. })) => {}
            other => panic!("Expected UnknownMission error, got: {:?}", other),
        }
    }

    /// Assert that a result is a remote rejection.
    #[track_caller]
    pub fn assert_rejected<T: std::fmt::Debug>(result: &InspectaResult<T>) {
        match result {
            Err(InspectaError::Remote(RemoteError::Rejected { .. })) => {}
            other => panic!("Expected Rejected error, got: {:?}", other),
        }
    }

    /// Assert that a result is a transport-class remote error.
    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &InspectaResult<T>) {
        match result {
            Err(e) if e.is_transport() => {}
            other => panic!("Expected transport error, got: {:?}", other),
        }
    }
}
