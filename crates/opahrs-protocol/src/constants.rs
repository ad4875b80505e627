//! 协议常量定义

/// 设备序列号长度（BCD 编码字节数）
pub const SERIAL_LEN: usize = 25;

/// 磁场参考向量全零时的默认值（正北单位向量）
///
/// 全零向量无法归一化，会导致设备姿态解算出现 NaN。
pub const DEFAULT_MAG_NORTH: [f32; 3] = [1.0, 0.0, 0.0];

/// GPS 经纬度定点缩放（协议单位：1e-7 度）
pub const GPS_DEGREE_SCALE: f64 = 1e7;

/// HomeLocation 中 ECEF 原点的存储单位（厘米）
pub const ECEF_CM_PER_M: f64 = 100.0;
