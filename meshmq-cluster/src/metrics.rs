use std::sync::atomic::{AtomicU64, Ordering};

/// Relay traffic counters shared by the client and server halves.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    relays: AtomicU64,
    relay_failures: AtomicU64,
    inbound_messages: AtomicU64,
}

impl RelayMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_relay(&self) {
        self.relays.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_relay_failure(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inbound(&self) {
        self.inbound_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            relays_total: self.relays.load(Ordering::Relaxed),
            relay_failures_total: self.relay_failures.load(Ordering::Relaxed),
            inbound_messages_total: self.inbound_messages.load(Ordering::Relaxed),
        }
    }
}

/// Counter snapshot exposed to the host's diagnostics surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayMetricsSnapshot {
    /// Outbound relay calls attempted since startup.
    pub relays_total: u64,
    /// Outbound relay calls that failed after retries.
    pub relay_failures_total: u64,
    /// Messages lifted onto the local channel by the server.
    pub inbound_messages_total: u64,
}
