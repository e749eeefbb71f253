//! Simulation statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::RequestStatsAggregator;

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Number of update() rounds
    pub ticks: u64,

    /// Stopped by the timeout before every request had an outcome
    pub timed_out: bool,

    /// Events observed by the local components
    pub events_received: u64,

    /// Packets swallowed by the simulated link, both directions
    pub packets_lost: u64,

    /// Local dispatcher counters
    pub local: MetricsSnapshot,

    /// Remote dispatcher counters
    pub remote: MetricsSnapshot,

    /// Request outcomes and round trip times
    pub requests: RequestStatsAggregator,
}

impl SimulationStats {
    /// Completed requests per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.requests.completed() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self, node: &str, remote: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Simulation Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Throughput: {:.2} req/s", self.throughput());
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Packets lost: {}", self.packets_lost);
        println!(
            "   └─ Finished: {}",
            if self.timed_out { "no (timeout)" } else { "yes" }
        );

        let summary = self.requests.summary();
        println!("\n📨 Requests");
        println!("   ├─ Issued: {}", summary.requests);
        println!("   ├─ Responses: {}", summary.responses);
        println!("   ├─ Negative responses: {}", summary.negative_responses);
        println!(
            "   ├─ Timeouts: {} ({:.2}%)",
            summary.timeouts, summary.timeout_rate
        );
        if summary.outstanding > 0 {
            println!("   ├─ Outstanding: {}", summary.outstanding);
        }
        println!("   └─ Round trip (ms): {}", summary.round_trip_ms);

        print_snapshot(node, &self.local);
        print_snapshot(remote, &self.remote);

        println!();
    }
}

fn print_snapshot(node: &str, snapshot: &MetricsSnapshot) {
    println!("\n📈 Dispatcher '{}'", node);
    println!("   ├─ Packets sent: {}", snapshot.packets_sent);
    println!("   ├─ Packets received: {}", snapshot.packets_received);
    println!("   ├─ Acks sent: {}", snapshot.acks_sent);
    println!("   ├─ Retransmissions: {}", snapshot.retransmissions);
    println!("   ├─ Timeouts: {}", snapshot.timeouts);
    println!("   ├─ Unmatched packets: {}", snapshot.unmatched);
    println!("   ├─ Delivery failures: {}", snapshot.delivery_failures);
    println!("   └─ Queue length: {}", snapshot.queue_len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PacketType;

    #[test]
    fn test_throughput() {
        let mut requests = RequestStatsAggregator::new();
        for _ in 0..4 {
            requests.request_sent();
            requests.update(PacketType::Response, 2.0);
        }
        let stats = SimulationStats {
            duration: Duration::from_secs(2),
            requests,
            ..SimulationStats::default()
        };

        assert!((stats.throughput() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_throughput_without_duration() {
        assert_eq!(SimulationStats::default().throughput(), 0.0);
    }
}
