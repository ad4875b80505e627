//! 绝对时间锚点的周期定时器
//!
//! 每周期 `next_deadline += period`，睡眠到锚点，自动扣除本周期的耗时，不累积漂移。
//! 超时（Overrun）时不睡眠，锚点重置到当前时间。

use std::time::{Duration, Instant};
use tracing::warn;

/// 周期最短 1ms
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 按时睡眠到了锚点
    OnTime,
    /// 本周期耗时超过周期长度
    Overrun,
}

#[derive(Debug, Clone)]
pub struct PeriodTimer {
    next_deadline: Instant,
}

impl PeriodTimer {
    /// 以当前时间为锚点
    pub fn anchored_now() -> Self {
        Self {
            next_deadline: Instant::now(),
        }
    }

    /// 重新锚定到当前时间（进入 Steady 时调用）
    pub fn reanchor(&mut self) {
        self.next_deadline = Instant::now();
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// 设定本周期的截止时间
    pub fn advance(&mut self, period: Duration) {
        self.next_deadline += period.max(MIN_PERIOD);
    }

    /// 睡眠到截止时间
    pub fn wait(&mut self, period: Duration) -> TickOutcome {
        let now = Instant::now();
        if self.next_deadline > now {
            spin_sleep::sleep(self.next_deadline - now);
            TickOutcome::OnTime
        } else {
            warn!(
                "AHRS link period overrun: {:?} behind deadline (period {:?})",
                now.duration_since(self.next_deadline),
                period
            );
            self.next_deadline = now;
            TickOutcome::Overrun
        }
    }
}

impl Default for PeriodTimer {
    fn default() -> Self {
        Self::anchored_now()
    }
}

/// 毫秒周期 → `Duration`（不小于 [`MIN_PERIOD`]）
pub fn period_from_ms(ms: u32) -> Duration {
    Duration::from_millis(ms as u64).max(MIN_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_minimum() {
        assert_eq!(period_from_ms(0), MIN_PERIOD);
        assert_eq!(period_from_ms(20), Duration::from_millis(20));
    }

    #[test]
    fn test_absolute_deadlines_do_not_drift() {
        let period = Duration::from_millis(10);
        let mut timer = PeriodTimer::anchored_now();
        let start = timer.next_deadline();

        for _ in 0..10 {
            timer.advance(period);
            assert_eq!(timer.wait(period), TickOutcome::OnTime);
        }
        assert_eq!(timer.next_deadline(), start + period * 10);
        assert!(Instant::now() >= start + period * 10);
    }

    #[test]
    fn test_overrun_reanchors() {
        let period = Duration::from_millis(2);
        let mut timer = PeriodTimer::anchored_now();
        timer.advance(period);
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(timer.wait(period), TickOutcome::Overrun);
        let after = timer.next_deadline();
        assert!(after.elapsed() < Duration::from_millis(50));

        // 下一周期从新锚点计
        timer.advance(period);
        assert_eq!(timer.next_deadline(), after + period);
    }
}
