//! Remote reachability state.
//!
//! Connected moves to Degraded only on a transport failure. Degraded moves
//! back to Connected only through a successful probe, and probes are
//! rate-limited by the configured probe interval.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Believed reachability of the remote data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Degraded,
}

#[derive(Debug)]
struct LinkInner {
    state: LinkState,
    last_probe: Option<Instant>,
}

/// Thread-safe holder of the [`LinkState`].
#[derive(Debug)]
pub struct Link {
    inner: Mutex<LinkInner>,
}

impl Link {
    pub fn new(initial: LinkState) -> Self {
        Self {
            inner: Mutex::new(LinkInner {
                state: initial,
                last_probe: None,
            }),
        }
    }

    pub fn state(&self) -> LinkState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(LinkState::Degraded)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Record a transport failure.
    pub fn mark_degraded(&self, reason: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.state == LinkState::Connected {
                tracing::warn!(reason = reason, "Remote unreachable, switching to local fallback");
            }
            inner.state = LinkState::Degraded;
        }
    }

    /// Record a successful probe.
    pub fn mark_connected(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.state == LinkState::Degraded {
                tracing::info!("Remote reachable again");
            }
            inner.state = LinkState::Connected;
        }
    }

    /// Claim the right to probe. Returns false if the last probe is more recent
    /// than `interval`.
    pub fn claim_probe(&self, interval: Duration) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        let now = Instant::now();
        let due = inner
            .last_probe
            .map(|last| now.duration_since(last) >= interval)
            .unwrap_or(true);
        if due {
            inner.last_probe = Some(now);
        }
        due
    }
}
