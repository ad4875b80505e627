//! 外部对象变更跟踪
//!
//! 存储回调在写入者线程上运行，只置原子位。链路任务在读取对象快照**之前**用
//! [`PendingChanges::take`] 原子地取走标志，推送失败时再 `mark()` 放回；
//! 推送过程中到达的新变更会重新置位，留给下一个周期。
//!
//! 标定对象比较特殊：链路任务自己也会写它（回写设备测得的方差），
//! 这次写入不能再触发一次标定推送。[`SelfEchoSuppressor`] 是一次性的令牌：
//! 写入前 `arm()`，回调 `consume()` 掉它，写入后 `disarm()`。
//! 若令牌被并发的外部写入取走，自写入会置位，最多多推送一次，不会丢失外部变更。

use ahrs_store::{
    AhrsCalibration, AhrsSettings, BaroAltitude, GpsPosition, HomeLocation, ObjectCallback,
    ObjectId, ObjectStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tracing::trace;

/// 被跟踪的输入对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChangeFlag {
    Settings = 1 << 0,
    Baro = 1 << 1,
    Gps = 1 << 2,
    HomeLocation = 1 << 3,
    Calibration = 1 << 4,
}

impl ChangeFlag {
    pub const ALL: [ChangeFlag; 5] = [
        ChangeFlag::Settings,
        ChangeFlag::Baro,
        ChangeFlag::Gps,
        ChangeFlag::HomeLocation,
        ChangeFlag::Calibration,
    ];

    pub fn from_object(id: ObjectId) -> Option<Self> {
        match id {
            ObjectId::AhrsSettings => Some(ChangeFlag::Settings),
            ObjectId::BaroAltitude => Some(ChangeFlag::Baro),
            ObjectId::GpsPosition => Some(ChangeFlag::Gps),
            ObjectId::HomeLocation => Some(ChangeFlag::HomeLocation),
            ObjectId::AhrsCalibration => Some(ChangeFlag::Calibration),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        self as u8
    }
}

/// 待处理变更位集
#[derive(Debug, Default)]
pub struct PendingChanges {
    bits: AtomicU8,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, flag: ChangeFlag) {
        self.bits.fetch_or(flag.bit(), Ordering::AcqRel);
    }

    pub fn is_pending(&self, flag: ChangeFlag) -> bool {
        self.bits.load(Ordering::Acquire) & flag.bit() != 0
    }

    /// 原子地清除标志，返回清除前是否置位
    pub fn take(&self, flag: ChangeFlag) -> bool {
        self.bits.fetch_and(!flag.bit(), Ordering::AcqRel) & flag.bit() != 0
    }

    /// 所有待处理标志
    pub fn pending(&self) -> Vec<ChangeFlag> {
        let bits = self.bits.load(Ordering::Acquire);
        ChangeFlag::ALL.into_iter().filter(|f| bits & f.bit() != 0).collect()
    }
}

/// 标定对象自写入的一次性抑制令牌
#[derive(Debug, Default)]
pub struct SelfEchoSuppressor {
    armed: AtomicBool,
}

impl SelfEchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// 取走令牌；返回 `true` 表示本次通知来自自写入
    pub fn consume(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

/// 挂在存储上的变更回调
pub struct ChangeTracker {
    pending: Arc<PendingChanges>,
    echo: Arc<SelfEchoSuppressor>,
}

impl ChangeTracker {
    pub fn new(pending: Arc<PendingChanges>, echo: Arc<SelfEchoSuppressor>) -> Self {
        Self { pending, echo }
    }

    /// 订阅五个输入对象
    pub fn connect(self, store: &ObjectStore) {
        let callback: Arc<dyn ObjectCallback> = Arc::new(self);
        store.connect::<AhrsSettings>(callback.clone());
        store.connect::<BaroAltitude>(callback.clone());
        store.connect::<GpsPosition>(callback.clone());
        store.connect::<HomeLocation>(callback.clone());
        store.connect::<AhrsCalibration>(callback);
    }
}

impl ObjectCallback for ChangeTracker {
    fn on_object_updated(&self, id: ObjectId) {
        let Some(flag) = ChangeFlag::from_object(id) else {
            return;
        };
        if flag == ChangeFlag::Calibration && self.echo.consume() {
            trace!("calibration self-write suppressed");
            return;
        }
        self.pending.mark(flag);
    }
}
