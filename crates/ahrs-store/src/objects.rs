//! 对象定义
//!
//! 字段单位与飞控侧一致：角度为度，位置/速度为米、米每秒，
//! GPS 经纬度为 1e-7 度的整数。

use crate::alarms::SystemAlarms;
use crate::object::{ObjectCell, ObjectId, UavObject};
use crate::store::ObjectStore;

/// 协处理器运行的估计算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AhrsAlgorithm {
    #[default]
    InsGps,
    Simple,
}

/// AHRS 链路设置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AhrsSettings {
    pub algorithm: AhrsAlgorithm,
    /// 交换周期（毫秒）
    pub update_period_ms: u32,
    /// 每周期拉取原始采样
    pub update_raw: bool,
    /// 每周期交换融合姿态
    pub update_filtered: bool,
}

impl Default for AhrsSettings {
    fn default() -> Self {
        Self {
            algorithm: AhrsAlgorithm::InsGps,
            update_period_ms: 20,
            update_raw: false,
            update_filtered: true,
        }
    }
}

/// Home 点
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HomeLocation {
    /// 当地地磁场向量（任意单位）
    pub be: [f32; 3],
    pub set: bool,
    pub indoor: bool,
    /// Home 的 ECEF 坐标（厘米）
    pub ecef_cm: [i32; 3],
    /// ECEF → NED 旋转矩阵
    pub rne: [[f32; 3]; 3],
}

impl Default for HomeLocation {
    fn default() -> Self {
        Self {
            be: [0.0; 3],
            set: false,
            indoor: false,
            ecef_cm: [0; 3],
            rne: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

/// 标定方差的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationMeasureVar {
    /// 下发存储中的方差
    #[default]
    Set,
    /// 由设备测量方差并回写
    Measure,
    /// 只读回设备当前方差，不回写
    Echo,
}

/// 传感器标定
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AhrsCalibration {
    pub measure_var: CalibrationMeasureVar,
    pub accel_bias: [f32; 3],
    pub accel_scale: [f32; 3],
    pub accel_var: [f32; 3],
    pub gyro_bias: [f32; 3],
    pub gyro_scale: [f32; 3],
    pub gyro_var: [f32; 3],
    pub mag_bias: [f32; 3],
    pub mag_scale: [f32; 3],
    pub mag_var: [f32; 3],
}

impl Default for AhrsCalibration {
    fn default() -> Self {
        Self {
            measure_var: CalibrationMeasureVar::Set,
            accel_bias: [0.0; 3],
            accel_scale: [1.0; 3],
            accel_var: [1e-3; 3],
            gyro_bias: [0.0; 3],
            gyro_scale: [1.0; 3],
            gyro_var: [1e-4; 3],
            mag_bias: [0.0; 3],
            mag_scale: [1.0; 3],
            mag_var: [1e-2; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaroAltitude {
    /// 气压高度（米）
    pub altitude: f32,
}

/// GPS 定位
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPosition {
    /// 纬度（1e-7 度）
    pub latitude: i32,
    /// 经度（1e-7 度）
    pub longitude: i32,
    /// 海拔（米，相对大地水准面）
    pub altitude: f32,
    /// 大地水准面高（米）
    pub geoid_separation: f32,
    pub groundspeed: f32,
    /// 航迹角（度）
    pub heading: f32,
    pub satellites: i8,
    pub pdop: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeSettings {
    pub roll_bias: f32,
    pub pitch_bias: f32,
}

/// 融合姿态
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeActual {
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
    pub q4: f32,
    pub roll: f32,
    pub pitch: f32,
    /// [0, 360)
    pub yaw: f32,
}

impl Default for AttitudeActual {
    fn default() -> Self {
        Self {
            q1: 1.0,
            q2: 0.0,
            q3: 0.0,
            q4: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// 原始传感器采样
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeRaw {
    pub magnetometers: [f32; 3],
    pub gyros: [f32; 3],
    pub gyros_filtered: [f32; 3],
    pub gyro_temp: [f32; 2],
    pub accels: [f32; 3],
    pub accels_filtered: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionActual {
    pub ned: [f32; 3],
    pub vel: [f32; 3],
}

/// 通信错误分类（`AhrsStatus::comm_errors` 的下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommErrorKind {
    Update = 0,
    Attitude = 1,
    HomeLocation = 2,
    Calibration = 3,
    Algorithm = 4,
}

impl CommErrorKind {
    pub const COUNT: usize = 5;

    pub const ALL: [CommErrorKind; Self::COUNT] = [
        CommErrorKind::Update,
        CommErrorKind::Attitude,
        CommErrorKind::HomeLocation,
        CommErrorKind::Calibration,
        CommErrorKind::Algorithm,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 链路状态
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AhrsStatus {
    /// 设备序列号（BCD）
    pub serial_number: [u8; 25],
    /// 按 [`CommErrorKind`] 下标的错误计数
    pub comm_errors: [u32; CommErrorKind::COUNT],
    pub cpu_load: u8,
    pub idle_time_per_cycle: u16,
    pub running_time_per_cycle: u16,
    pub dropped_updates: u16,
    pub home_set: bool,
    pub calibration_set: bool,
    pub algorithm_set: bool,
}

impl AhrsStatus {
    pub fn comm_error(&self, kind: CommErrorKind) -> u32 {
        self.comm_errors[kind.index()]
    }
}

macro_rules! uav_object {
    ($($ty:ident => $field:ident),* $(,)?) => {
        $(
            impl UavObject for $ty {
                const ID: ObjectId = ObjectId::$ty;

                fn cell(store: &ObjectStore) -> &ObjectCell<Self> {
                    &store.$field
                }
            }
        )*
    };
}

uav_object! {
    AhrsSettings => ahrs_settings,
    HomeLocation => home_location,
    AhrsCalibration => ahrs_calibration,
    BaroAltitude => baro_altitude,
    GpsPosition => gps_position,
    AttitudeSettings => attitude_settings,
    AttitudeActual => attitude_actual,
    AttitudeRaw => attitude_raw,
    PositionActual => position_actual,
    AhrsStatus => ahrs_status,
    SystemAlarms => system_alarms,
}
