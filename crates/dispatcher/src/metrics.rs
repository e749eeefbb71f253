//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters of one dispatcher instance.
///
/// Shared through an `Arc` so an exporter can read while the owner polls.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Outstanding entries after the last update
    queue_len: AtomicUsize,
    /// Inbound packets taken from the backend
    packets_received: AtomicU64,
    /// Packets handed to the backend, acknowledges excluded
    packets_sent: AtomicU64,
    /// Acknowledges handed to the backend
    acks_sent: AtomicU64,
    /// Retransmissions after an expired acknowledge wait
    retransmissions: AtomicU64,
    /// Entries given up with a synthesized timeout
    timeouts: AtomicU64,
    /// Responses handed to a callback
    responses_delivered: AtomicU64,
    /// Inbound acknowledges/responses nobody waited for
    unmatched: AtomicU64,
    /// Local deliveries the postman rejected
    delivery_failures: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn inc_packets_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn inc_packets_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn acks_sent(&self) -> u64 {
        self.acks_sent.load(Ordering::Relaxed)
    }

    pub fn inc_acks_sent(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retransmissions(&self) -> u64 {
        self.retransmissions.load(Ordering::Relaxed)
    }

    pub fn inc_retransmissions(&self) {
        self.retransmissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn responses_delivered(&self) -> u64 {
        self.responses_delivered.load(Ordering::Relaxed)
    }

    pub fn inc_responses_delivered(&self) {
        self.responses_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unmatched(&self) -> u64 {
        self.unmatched.load(Ordering::Relaxed)
    }

    pub fn inc_unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    pub fn inc_delivery_failures(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            packets_received: self.packets_received(),
            packets_sent: self.packets_sent(),
            acks_sent: self.acks_sent(),
            retransmissions: self.retransmissions(),
            timeouts: self.timeouts(),
            responses_delivered: self.responses_delivered(),
            unmatched: self.unmatched(),
            delivery_failures: self.delivery_failures(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub acks_sent: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub responses_delivered: u64,
    pub unmatched: u64,
    pub delivery_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = DispatcherMetrics::new();
        metrics.set_queue_len(3);
        metrics.inc_packets_sent();
        metrics.inc_packets_sent();
        metrics.inc_timeouts();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queue_len, 3);
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.acks_sent, 0);
    }
}
