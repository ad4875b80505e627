//! 请求/应答负载定义
//!
//! 每种消息是一个带标签的变体，而不是复用同一块联合体内存。
//! 可选字段（气压、GPS）用 `Option` 表示"本周期未更新"，设备沿用上一次的值。

use crate::constants::SERIAL_LEN;
use crate::ids::MessageKind;
use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 三维向量（协议中统一使用 f32）
pub type Vec3 = [f32; 3];

// ============================================================================
// 枚举字段
// ============================================================================

/// 标定模式
///
/// - `Set`: 由飞控下发方差，设备直接采用
/// - `Measure`: 设备自行测量方差并回报，飞控写回存储
/// - `Echo`: 设备回报当前值但不采用，飞控不写回
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CalibrationMode {
    Set = 0,
    Measure = 1,
    Echo = 2,
}

// num_enum 会把 `#[default]` 当作兜底变体，这里手写 Default
impl Default for CalibrationMode {
    fn default() -> Self {
        Self::Set
    }
}

impl CalibrationMode {
    /// 应答是否应写回存储
    pub fn writes_back(self) -> bool {
        !matches!(self, Self::Echo)
    }
}

/// 设备端姿态解算算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AlgorithmId {
    /// 惯导 + GPS 融合
    InsGps = 0,
    /// 简化互补滤波
    Simple = 1,
}

impl Default for AlgorithmId {
    fn default() -> Self {
        Self::InsGps
    }
}

/// GPS 定位质量
///
/// `Indoor` 是哨兵值：设备将该次更新视为高方差观测，只做一致性检查，忽略幅值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum GpsQuality {
    Indoor = -1,
    /// 低置信度，不含位置
    Provisional = 0,
    /// 完整的位置/速度/航向
    Good = 1,
}

impl Default for GpsQuality {
    fn default() -> Self {
        Self::Provisional
    }
}

impl GpsQuality {
    /// 从原始字节解析
    pub fn from_raw(raw: i8) -> Result<Self, ProtocolError> {
        Self::try_from(raw).map_err(|_| ProtocolError::InvalidValue {
            field: "gps.quality",
            value: raw as i32,
        })
    }
}

// ============================================================================
// 负载
// ============================================================================

/// 设备身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// BCD 编码序列号
    pub serial_bcd: [u8; SERIAL_LEN],
}

impl Identity {
    pub fn new(serial_bcd: [u8; SERIAL_LEN]) -> Self {
        Self { serial_bcd }
    }
}

/// 磁北参考向量（单位向量）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HomeReferenceRequest {
    pub be: Vec3,
}

/// 标定参数下发
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationRequest {
    pub mode: CalibrationMode,
    pub accel_bias: Vec3,
    pub accel_scale: Vec3,
    pub accel_var: Vec3,
    pub gyro_bias: Vec3,
    pub gyro_scale: Vec3,
    pub gyro_var: Vec3,
    pub mag_bias: Vec3,
    pub mag_scale: Vec3,
    pub mag_var: Vec3,
}

/// 标定回读（设备当前使用的方差）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationResponse {
    /// 设备确认的标定模式
    pub mode: CalibrationMode,
    pub accel_var: Vec3,
    pub gyro_var: Vec3,
    pub mag_var: Vec3,
}

/// 原始（未融合）传感器采样
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawAttitudeResponse {
    pub mags: Vec3,
    pub gyros: Vec3,
    pub gyros_filtered: Vec3,
    /// 陀螺温度 [XY, Z]
    pub gyro_temp: [f32; 2],
    pub accels: Vec3,
    pub accels_filtered: Vec3,
}

/// 气压高度采样
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaroSample {
    /// 高度（米）
    pub altitude: f32,
}

/// GPS 观测
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsSample {
    pub quality: GpsQuality,
    /// 相对 Home 的 NED 位置（米），仅 `Good` 时有效
    pub ned: Vec3,
    /// 地速（m/s）
    pub groundspeed: f32,
    /// 航向（度）
    pub heading: f32,
}

impl GpsSample {
    /// 零位置占位观测
    pub fn placeholder(quality: GpsQuality) -> Self {
        Self {
            quality,
            ..Default::default()
        }
    }
}

/// 融合更新请求
///
/// `None` 表示该字段本周期未更新，设备沿用上一次的值。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusedUpdateRequest {
    pub barometer: Option<BaroSample>,
    pub gps: Option<GpsSample>,
}

/// 融合更新应答
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusedUpdateResponse {
    /// 姿态四元数 [q1(w), q2(x), q3(y), q4(z)]
    pub quaternion: [f32; 4],
    /// NED 位置（米）
    pub ned: Vec3,
    /// NED 速度（m/s）
    pub vel: Vec3,
    /// 设备 CPU 负载（%）
    pub load: u8,
    /// 每周期空闲时间（设备 tick）
    pub idle_time: u16,
    /// 每周期运行时间（设备 tick）
    pub run_time: u16,
    /// 设备丢弃的更新次数
    pub dropped_updates: u16,
}

// ============================================================================
// 带标签的请求/应答
// ============================================================================

/// 请求
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    Identity,
    HomeReference(HomeReferenceRequest),
    Calibration(CalibrationRequest),
    Algorithm(AlgorithmId),
    RawAttitude,
    FusedUpdate(FusedUpdateRequest),
}

impl Request {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Identity => MessageKind::IdentityRequest,
            Self::HomeReference(_) => MessageKind::HomeReferenceRequest,
            Self::Calibration(_) => MessageKind::CalibrationRequest,
            Self::Algorithm(_) => MessageKind::AlgorithmRequest,
            Self::RawAttitude => MessageKind::RawAttitudeRequest,
            Self::FusedUpdate(_) => MessageKind::FusedUpdateRequest,
        }
    }
}

/// 应答
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    Identity(Identity),
    Ack,
    Calibration(CalibrationResponse),
    RawAttitude(RawAttitudeResponse),
    FusedUpdate(FusedUpdateResponse),
}

impl Response {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Identity(_) => MessageKind::IdentityResponse,
            Self::Ack => MessageKind::Ack,
            Self::Calibration(_) => MessageKind::CalibrationResponse,
            Self::RawAttitude(_) => MessageKind::RawAttitudeResponse,
            Self::FusedUpdate(_) => MessageKind::FusedUpdateResponse,
        }
    }

    /// 是否为 `request` 的合法应答
    pub fn answers(&self, request: &Request) -> bool {
        request.kind().expected_response() == Some(self.kind())
    }
}
