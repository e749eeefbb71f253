//! Dispatcher 指标收集模块
//!
//! 将 `MetricsSnapshot` 发布到 `metrics` facade，并在内存中聚合请求结果。

use contracts::PacketType;
use dispatcher::MetricsSnapshot;
use metrics::{counter, gauge, histogram};

/// 发布一次 dispatcher 快照
///
/// 快照中的计数是累计值，因此使用 `absolute` 而不是 `increment`。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatcher_snapshot;
///
/// dispatcher.update();
/// record_dispatcher_snapshot("board-a", &dispatcher.snapshot());
/// ```
pub fn record_dispatcher_snapshot(node: &str, snapshot: &MetricsSnapshot) {
    let node = node.to_string();

    gauge!("xpcc_dispatcher_queue_len", "node" => node.clone()).set(snapshot.queue_len as f64);

    let counters = [
        ("xpcc_dispatcher_packets_received_total", snapshot.packets_received),
        ("xpcc_dispatcher_packets_sent_total", snapshot.packets_sent),
        ("xpcc_dispatcher_acks_sent_total", snapshot.acks_sent),
        ("xpcc_dispatcher_retransmissions_total", snapshot.retransmissions),
        ("xpcc_dispatcher_timeouts_total", snapshot.timeouts),
        ("xpcc_dispatcher_responses_delivered_total", snapshot.responses_delivered),
        ("xpcc_dispatcher_unmatched_total", snapshot.unmatched),
        ("xpcc_dispatcher_delivery_failures_total", snapshot.delivery_failures),
    ];
    for (name, value) in counters {
        counter!(name, "node" => node.clone()).absolute(value);
    }
}

/// 记录请求的最终结果 (response / negative_response / timeout)
pub fn record_request_outcome(node: &str, outcome: PacketType) {
    counter!(
        "xpcc_dispatcher_request_outcomes_total",
        "node" => node.to_string(),
        "outcome" => outcome_label(outcome)
    )
    .increment(1);
}

/// 记录请求往返时间 (从入队到回调)
pub fn record_round_trip_ms(node: &str, latency_ms: f64) {
    histogram!("xpcc_dispatcher_round_trip_ms", "node" => node.to_string()).record(latency_ms);
}

fn outcome_label(outcome: PacketType) -> &'static str {
    match outcome {
        PacketType::Response => "response",
        PacketType::NegativeResponse => "negative_response",
        PacketType::Timeout => "timeout",
        PacketType::Request => "request",
    }
}

/// 请求结果聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RequestStatsAggregator {
    /// 已发出的请求数
    pub requests: u64,

    /// 收到 Response 的请求数
    pub responses: u64,

    /// 收到 NegativeResponse 的请求数
    pub negative_responses: u64,

    /// 超时的请求数
    pub timeouts: u64,

    /// 往返时间统计 (毫秒)
    pub round_trip_stats: RunningStats,
}

impl RequestStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次发出的请求
    pub fn request_sent(&mut self) {
        self.requests += 1;
    }

    /// 记录一次回调
    pub fn update(&mut self, outcome: PacketType, round_trip_ms: f64) {
        match outcome {
            PacketType::Response => self.responses += 1,
            PacketType::NegativeResponse => self.negative_responses += 1,
            PacketType::Timeout => {
                self.timeouts += 1;
                return;
            }
            PacketType::Request => return,
        }
        self.round_trip_stats.push(round_trip_ms);
    }

    /// 已有结果的请求数
    pub fn completed(&self) -> u64 {
        self.responses + self.negative_responses + self.timeouts
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            requests: self.requests,
            responses: self.responses,
            negative_responses: self.negative_responses,
            timeouts: self.timeouts,
            outstanding: self.requests.saturating_sub(self.completed()),
            timeout_rate: if self.requests > 0 {
                self.timeouts as f64 / self.requests as f64 * 100.0
            } else {
                0.0
            },
            round_trip_ms: StatsSummary::from(&self.round_trip_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 请求结果摘要
#[derive(Debug, Clone, Default)]
pub struct RequestSummary {
    pub requests: u64,
    pub responses: u64,
    pub negative_responses: u64,
    pub timeouts: u64,
    pub outstanding: u64,
    pub timeout_rate: f64,
    pub round_trip_ms: StatsSummary,
}

impl std::fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Request Summary ===")?;
        writeln!(f, "Requests: {}", self.requests)?;
        writeln!(f, "Responses: {}", self.responses)?;
        writeln!(f, "Negative responses: {}", self.negative_responses)?;
        writeln!(
            f,
            "Timeouts: {} ({:.2}%)",
            self.timeouts, self.timeout_rate
        )?;
        if self.outstanding > 0 {
            writeln!(f, "Outstanding: {}", self.outstanding)?;
        }
        writeln!(f, "Round trip (ms): {}", self.round_trip_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = RequestStatsAggregator::new();
        for _ in 0..4 {
            aggregator.request_sent();
        }
        aggregator.update(PacketType::Response, 12.0);
        aggregator.update(PacketType::NegativeResponse, 8.0);
        aggregator.update(PacketType::Timeout, 300.0);

        assert_eq!(aggregator.completed(), 3);
        assert_eq!(aggregator.round_trip_stats.count(), 2);

        let summary = aggregator.summary();
        assert_eq!(summary.outstanding, 1);
        assert!((summary.timeout_rate - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = RequestSummary {
            requests: 100,
            responses: 95,
            negative_responses: 0,
            timeouts: 5,
            outstanding: 0,
            timeout_rate: 5.0,
            round_trip_ms: StatsSummary {
                count: 95,
                min: 1.0,
                max: 30.0,
                mean: 10.0,
                std_dev: 4.0,
            },
        };

        let output = format!("{}", summary);
        assert!(output.contains("Requests: 100"));
        assert!(output.contains("5.00%"));
        assert!(!output.contains("Outstanding"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let snapshot = MetricsSnapshot {
            queue_len: 2,
            packets_sent: 10,
            ..MetricsSnapshot::default()
        };
        record_dispatcher_snapshot("board-a", &snapshot);
        record_request_outcome("board-a", PacketType::Timeout);
        record_round_trip_ms("board-a", 1.5);
    }
}
