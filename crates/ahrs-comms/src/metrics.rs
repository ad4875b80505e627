//! 链路指标
//!
//! 原子计数器，链路线程写，任意线程读。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路运行指标
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// resync 尝试次数（含失败）
    pub resync_attempts: AtomicU64,
    /// 进入 Steady 的次数
    pub sessions_established: AtomicU64,
    /// 成功完成的稳态周期数
    pub periods_completed: AtomicU64,
    /// 周期超时（Overrun）次数
    pub period_overruns: AtomicU64,
    /// 导致会话失效的步骤失败次数
    pub step_failures: AtomicU64,
    /// 因订阅通道满而丢弃的事件数
    pub events_dropped: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkMetricsSnapshot {
        LinkMetricsSnapshot {
            resync_attempts: self.resync_attempts.load(Ordering::Relaxed),
            sessions_established: self.sessions_established.load(Ordering::Relaxed),
            periods_completed: self.periods_completed.load(Ordering::Relaxed),
            period_overruns: self.period_overruns.load(Ordering::Relaxed),
            step_failures: self.step_failures.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct LinkMetricsSnapshot {
    pub resync_attempts: u64,
    pub sessions_established: u64,
    pub periods_completed: u64,
    pub period_overruns: u64,
    pub step_failures: u64,
    pub events_dropped: u64,
}

impl LinkMetricsSnapshot {
    /// 周期超时率（百分比），无周期时为 0
    pub fn overrun_rate(&self) -> f64 {
        if self.periods_completed == 0 {
            return 0.0;
        }
        (self.period_overruns as f64 / self.periods_completed as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        assert_eq!(LinkMetrics::new().snapshot(), LinkMetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_increment() {
        let metrics = Arc::new(LinkMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        LinkMetrics::incr(&metrics.periods_completed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().periods_completed, 400);
    }

    #[test]
    fn test_overrun_rate() {
        let snapshot = LinkMetricsSnapshot {
            periods_completed: 200,
            period_overruns: 5,
            ..Default::default()
        };
        assert!((snapshot.overrun_rate() - 2.5).abs() < 1e-9);
        assert_eq!(LinkMetricsSnapshot::default().overrun_rate(), 0.0);
    }
}
