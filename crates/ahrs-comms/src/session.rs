//! 链路会话状态
//!
//! 会话由链路任务独占持有，生命周期与任务相同。
//! 跨线程只暴露状态枚举（[`AtomicLinkState`]）。

use ahrs_store::CommErrorKind;
use opahrs_protocol::SERIAL_LEN;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 链路状态
///
/// `Unsynced → Identifying → Steady → (failure) → Unsynced`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkState {
    /// 未同步：不做任何配置或数据交换
    #[default]
    Unsynced = 0,
    /// 已 resync，正在读取设备身份
    Identifying = 1,
    /// 稳态周期交换
    Steady = 2,
}

impl LinkState {
    /// 从 u8 转换（无效值视为 `Unsynced`）
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Identifying,
            2 => Self::Steady,
            _ => Self::Unsynced,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 链路状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicLinkState {
    inner: AtomicU8,
}

impl AtomicLinkState {
    pub fn new(state: LinkState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> LinkState {
        LinkState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: LinkState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }
}

/// 设备侧性能统计（来自融合更新应答）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DevicePerformance {
    pub cpu_load: u8,
    pub idle_time: u16,
    pub run_time: u16,
    pub dropped_updates: u16,
}

/// 链路会话
#[derive(Debug, Clone, Default)]
pub struct LinkSession {
    pub state: LinkState,
    pub home_set: bool,
    pub calibration_set: bool,
    pub algorithm_set: bool,
    /// 连续可用 GPS 定位计数，上限为迟滞门限
    pub good_gps_streak: u32,
    /// 按 [`CommErrorKind`] 下标，饱和递增，从不清零
    pub error_counters: [u32; CommErrorKind::COUNT],
    /// 最近一次身份握手得到的序列号
    pub serial: Option<[u8; SERIAL_LEN]>,
    pub performance: DevicePerformance,
}

impl LinkSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// resync 时清除所有协商标志
    pub fn reset_negotiated(&mut self) {
        self.home_set = false;
        self.calibration_set = false;
        self.algorithm_set = false;
    }

    /// 三项配置是否都已下发
    pub fn fully_negotiated(&self) -> bool {
        self.home_set && self.calibration_set && self.algorithm_set
    }

    pub fn record_error(&mut self, kind: CommErrorKind) {
        let counter = &mut self.error_counters[kind.index()];
        *counter = counter.saturating_add(1);
    }

    pub fn error_count(&self, kind: CommErrorKind) -> u32 {
        self.error_counters[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_roundtrip_and_invalid() {
        for state in [LinkState::Unsynced, LinkState::Identifying, LinkState::Steady] {
            assert_eq!(LinkState::from_u8(state.as_u8()), state);
        }
        assert_eq!(LinkState::from_u8(0xFF), LinkState::Unsynced);
    }

    #[test]
    fn test_atomic_link_state() {
        let state = AtomicLinkState::new(LinkState::Unsynced);
        state.set(LinkState::Steady, Ordering::Relaxed);
        assert_eq!(state.get(Ordering::Relaxed), LinkState::Steady);
    }

    #[test]
    fn test_reset_negotiated() {
        let mut session = LinkSession {
            home_set: true,
            calibration_set: true,
            algorithm_set: true,
            ..Default::default()
        };
        assert!(session.fully_negotiated());
        session.reset_negotiated();
        assert!(!session.home_set && !session.calibration_set && !session.algorithm_set);
    }

    #[test]
    fn test_error_counter_saturates() {
        let mut session = LinkSession::new();
        session.error_counters[CommErrorKind::Update.index()] = u32::MAX - 1;
        session.record_error(CommErrorKind::Update);
        session.record_error(CommErrorKind::Update);
        assert_eq!(session.error_count(CommErrorKind::Update), u32::MAX);
        assert_eq!(session.error_count(CommErrorKind::Algorithm), 0);
    }
}
