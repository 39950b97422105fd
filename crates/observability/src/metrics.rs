//! 转发指标收集模块
//!
//! 基于 DispatchOutcome 收集和统计转发引擎的运行指标。

use std::collections::BTreeMap;

use contracts::DispatchOutcome;
use metrics::{counter, histogram};

/// 记录收到的消息
pub fn record_message_received(channel: &str) {
    counter!(
        "queue_bridge_messages_received_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录无映射的消息
pub fn record_unmapped_message(channel: &str) {
    counter!(
        "queue_bridge_unmapped_messages_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录单次队列写入结果
pub fn record_queue_append(queue: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "queue_bridge_queue_appends_total",
        "queue" => queue.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一条消息完整 fan-out 的耗时
pub fn record_fanout_latency_ms(latency_ms: f64) {
    histogram!("queue_bridge_fanout_latency_ms").record(latency_ms);
}

/// 记录一条消息的全部写入结果
///
/// # Example
///
/// ```ignore
/// let outcomes = dispatcher.forward(&message).await;
/// record_fanout(&outcomes, started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_fanout(outcomes: &[DispatchOutcome], latency_ms: f64) {
    for outcome in outcomes {
        record_queue_append(&outcome.queue, outcome.is_success());
    }
    record_fanout_latency_ms(latency_ms);
}

/// 单个队列的写入计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub succeeded: u64,
    pub failed: u64,
}

/// Fan-out 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FanoutAggregator {
    /// 完成 fan-out 的消息数
    pub fanned_out: u64,

    /// 无映射的消息数
    pub unmapped: u64,

    /// 各 channel 无映射次数
    pub unmapped_channels: BTreeMap<String, u64>,

    /// 各队列写入计数
    pub queue_counts: BTreeMap<String, QueueCounts>,

    /// fan-out 耗时统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl FanoutAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完整 fan-out
    pub fn update(&mut self, outcomes: &[DispatchOutcome], latency_ms: f64) {
        self.fanned_out += 1;
        for outcome in outcomes {
            let counts = self.queue_counts.entry(outcome.queue.clone()).or_default();
            if outcome.is_success() {
                counts.succeeded += 1;
            } else {
                counts.failed += 1;
            }
        }
        self.latency_stats.push(latency_ms);
    }

    /// 记录一次无映射消息
    pub fn update_unmapped(&mut self, channel: &str) {
        self.unmapped += 1;
        *self.unmapped_channels.entry(channel.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> FanoutSummary {
        let appends_succeeded: u64 = self.queue_counts.values().map(|c| c.succeeded).sum();
        let appends_failed: u64 = self.queue_counts.values().map(|c| c.failed).sum();
        let total_appends = appends_succeeded + appends_failed;

        FanoutSummary {
            messages: self.fanned_out + self.unmapped,
            fanned_out: self.fanned_out,
            unmapped: self.unmapped,
            appends_succeeded,
            appends_failed,
            failure_rate: if total_appends > 0 {
                appends_failed as f64 / total_appends as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            queue_counts: self.queue_counts.clone(),
            unmapped_channels: self.unmapped_channels.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct FanoutSummary {
    pub messages: u64,
    pub fanned_out: u64,
    pub unmapped: u64,
    pub appends_succeeded: u64,
    pub appends_failed: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub queue_counts: BTreeMap<String, QueueCounts>,
    pub unmapped_channels: BTreeMap<String, u64>,
}

impl std::fmt::Display for FanoutSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fan-out Summary ===")?;
        writeln!(f, "Messages received: {}", self.messages)?;
        writeln!(f, "Unmapped messages: {}", self.unmapped)?;
        writeln!(
            f,
            "Queue appends: {} ok, {} failed ({:.2}%)",
            self.appends_succeeded, self.appends_failed, self.failure_rate
        )?;
        writeln!(f, "Fan-out latency (ms): {}", self.latency_ms)?;

        if !self.queue_counts.is_empty() {
            writeln!(f, "Per-queue appends:")?;
            for (queue, counts) in &self.queue_counts {
                writeln!(f, "  {}: {} ok, {} failed", queue, counts.succeeded, counts.failed)?;
            }
        }

        if !self.unmapped_channels.is_empty() {
            writeln!(f, "Unmapped channels:")?;
            for (channel, count) in &self.unmapped_channels {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

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
