//! Runtime configuration types shared by the engine and the scheduler.

use crate::ConfigError;
use std::time::Duration;

/// Synchronization engine behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Apply mutations locally and queue them when the remote is unreachable.
    /// When false, transport errors surface to the caller.
    pub local_fallback: bool,
    /// Minimum delay between two reachability probes while degraded.
    pub probe_interval: Duration,
    /// Upper bound on a single remote call.
    pub remote_timeout: Duration,
    /// Refresh the local cache from successful remote reads.
    pub mirror_reads: bool,
    /// Period of the background queue drain.
    pub drain_interval: Duration,
    /// Period of the background integrity verification.
    pub integrity_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_fallback: true,
            probe_interval: Duration::from_secs(15),
            remote_timeout: Duration::from_secs(10),
            mirror_reads: true,
            drain_interval: Duration::from_secs(30),
            integrity_interval: Duration::from_secs(300),
        }
    }
}

impl SyncConfig {
    pub fn with_local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = enabled;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_mirror_reads(mut self, enabled: bool) -> Self {
        self.mirror_reads = enabled;
        self
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn with_integrity_interval(mut self, interval: Duration) -> Self {
        self.integrity_interval = interval;
        self
    }

    /// Validate that all intervals are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("sync.remote_timeout_ms", self.remote_timeout)?;
        require_positive("sync.drain_interval_ms", self.drain_interval)?;
        require_positive("sync.integrity_interval_ms", self.integrity_interval)?;
        Ok(())
    }
}

/// Offsets and alert windows used by the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Suggested start for an incoherent PLANNED mission, from now.
    pub planned_start_offset: chrono::Duration,
    /// Suggested end for an incoherent PLANNED mission, from now.
    pub planned_end_offset: chrono::Duration,
    /// Shift applied to an incoherent ONGOING mission's start (backwards) or end (forwards).
    pub ongoing_shift: chrono::Duration,
    /// How far before now a finished mission's end is suggested.
    pub completed_end_offset: chrono::Duration,
    /// PLANNED missions starting within this window are reported.
    pub starting_window: chrono::Duration,
    /// ONGOING missions ending within this window are reported.
    pub ending_window: chrono::Duration,
}

/// Upper bound for every lifecycle offset and window.
pub const MAX_LIFECYCLE_SPAN_DAYS: i64 = 36_500;

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            planned_start_offset: chrono::Duration::days(7),
            planned_end_offset: chrono::Duration::days(14),
            ongoing_shift: chrono::Duration::days(7),
            completed_end_offset: chrono::Duration::days(1),
            starting_window: chrono::Duration::hours(24),
            ending_window: chrono::Duration::days(7),
        }
    }
}

impl LifecyclePolicy {
    pub fn with_starting_window(mut self, window: chrono::Duration) -> Self {
        self.starting_window = window;
        self
    }

    pub fn with_ending_window(mut self, window: chrono::Duration) -> Self {
        self.ending_window = window;
        self
    }

    /// Validate offsets. Suggested PLANNED dates must stay ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = chrono::Duration::zero();
        let fields = [
            ("lifecycle.planned_start_offset_hours", self.planned_start_offset),
            ("lifecycle.planned_end_offset_hours", self.planned_end_offset),
            ("lifecycle.ongoing_shift_hours", self.ongoing_shift),
            ("lifecycle.completed_end_offset_hours", self.completed_end_offset),
            ("lifecycle.starting_window_hours", self.starting_window),
            ("lifecycle.ending_window_hours", self.ending_window),
        ];
        let max = chrono::Duration::days(MAX_LIFECYCLE_SPAN_DAYS);
        for (field, value) in fields {
            if value <= zero {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.num_hours().to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            if value > max {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.num_hours().to_string(),
                    reason: format!("must not exceed {} days", MAX_LIFECYCLE_SPAN_DAYS),
                });
            }
        }
        if self.planned_end_offset <= self.planned_start_offset {
            return Err(ConfigError::InvalidValue {
                field: "lifecycle.planned_end_offset_hours".to_string(),
                value: self.planned_end_offset.num_hours().to_string(),
                reason: "must be greater than planned_start_offset_hours".to_string(),
            });
        }
        Ok(())
    }
}

fn require_positive(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SyncConfig::default().validate().is_ok());
        assert!(LifecyclePolicy::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SyncConfig::default().with_remote_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "sync.remote_timeout_ms"
        ));
    }

    #[test]
    fn test_planned_offsets_must_be_ordered() {
        let policy = LifecyclePolicy {
            planned_end_offset: chrono::Duration::days(3),
            ..LifecyclePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let policy = LifecyclePolicy::default()
            .with_ending_window(chrono::Duration::days(MAX_LIFECYCLE_SPAN_DAYS + 1));
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "lifecycle.ending_window_hours"
        ));
    }
}
