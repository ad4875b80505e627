//! 对象存储

use crate::alarms::{AlarmId, AlarmSeverity, SystemAlarms};
use crate::object::{ObjectCallback, ObjectCell, UavObject};
use crate::objects::*;
use std::sync::Arc;
use tracing::{trace, warn};

/// 进程内对象存储
///
/// 所有方法都可以跨线程并发调用（`ObjectStore` 通常放在 `Arc` 里共享）。
#[derive(Debug, Default)]
pub struct ObjectStore {
    pub(crate) ahrs_settings: ObjectCell<AhrsSettings>,
    pub(crate) home_location: ObjectCell<HomeLocation>,
    pub(crate) ahrs_calibration: ObjectCell<AhrsCalibration>,
    pub(crate) baro_altitude: ObjectCell<BaroAltitude>,
    pub(crate) gps_position: ObjectCell<GpsPosition>,
    pub(crate) attitude_settings: ObjectCell<AttitudeSettings>,
    pub(crate) attitude_actual: ObjectCell<AttitudeActual>,
    pub(crate) attitude_raw: ObjectCell<AttitudeRaw>,
    pub(crate) position_actual: ObjectCell<PositionActual>,
    pub(crate) ahrs_status: ObjectCell<AhrsStatus>,
    pub(crate) system_alarms: ObjectCell<SystemAlarms>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前值的副本
    pub fn get<T: UavObject>(&self) -> T {
        T::clone(&T::cell(self).load())
    }

    /// 当前快照（不复制）
    pub fn snapshot<T: UavObject>(&self) -> Arc<T> {
        T::cell(self).load()
    }

    /// 写入并同步通知订阅者
    pub fn set<T: UavObject>(&self, value: T) {
        trace!("store: set {}", T::ID);
        T::cell(self).store(value);
    }

    /// 读-改-写
    pub fn update<T, F>(&self, f: F)
    where
        T: UavObject,
        F: FnMut(&mut T),
    {
        trace!("store: update {}", T::ID);
        T::cell(self).rcu(f);
    }

    /// 订阅对象变更
    pub fn connect<T: UavObject>(&self, callback: Arc<dyn ObjectCallback>) {
        T::cell(self).subscribe(callback);
    }

    /// 设置告警等级（等级未变化时不通知）
    pub fn raise_alarm(&self, id: AlarmId, severity: AlarmSeverity) {
        if self.system_alarms.load().get(id) == severity {
            return;
        }
        if severity >= AlarmSeverity::Error {
            warn!("alarm {:?} raised: {:?}", id, severity);
        }
        self.update::<SystemAlarms, _>(|alarms| alarms.set(id, severity));
    }

    /// 告警恢复为 `Ok`
    pub fn clear_alarm(&self, id: AlarmId) {
        self.raise_alarm(id, AlarmSeverity::Ok);
    }

    pub fn alarm(&self, id: AlarmId) -> AlarmSeverity {
        self.system_alarms.load().get(id)
    }
}
