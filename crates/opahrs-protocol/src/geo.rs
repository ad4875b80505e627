//! 大地坐标换算（WGS-84）
//!
//! GPS 定位 → ECEF → 以 Home 为原点的 NED 局部切平面。

use crate::constants::DEFAULT_MAG_NORTH;
use nalgebra::{Matrix3, Vector3};

/// WGS-84 长半轴（米）
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 第一偏心率
pub const WGS84_E: f64 = 8.181_919_084_262_2e-2;

/// 大地坐标
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lla {
    /// 纬度（度）
    pub lat_deg: f64,
    /// 经度（度）
    pub lon_deg: f64,
    /// 椭球高（米）
    pub alt_m: f64,
}

/// 大地坐标 → ECEF（米）
pub fn lla_to_ecef(lla: Lla) -> [f64; 3] {
    let (sin_lat, cos_lat) = lla.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lla.lon_deg.to_radians().sin_cos();
    let e2 = WGS84_E * WGS84_E;
    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    [
        (n + lla.alt_m) * cos_lat * cos_lon,
        (n + lla.alt_m) * cos_lat * sin_lon,
        ((1.0 - e2) * n + lla.alt_m) * sin_lat,
    ]
}

/// ECEF → NED 旋转矩阵（行优先，`ned = rne * (ecef - origin)`）
pub fn rne_from_lla(lat_deg: f64, lon_deg: f64) -> [[f32; 3]; 3] {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();

    [
        [
            (-sin_lat * cos_lon) as f32,
            (-sin_lat * sin_lon) as f32,
            cos_lat as f32,
        ],
        [-sin_lon as f32, cos_lon as f32, 0.0],
        [
            (-cos_lat * cos_lon) as f32,
            (-cos_lat * sin_lon) as f32,
            -sin_lat as f32,
        ],
    ]
}

/// 大地坐标 → 以 `origin_ecef` 为原点的 NED（米）
///
/// # 参数
/// - `lla`: 待转换的定位
/// - `origin_ecef`: Home 的 ECEF 坐标（米）
/// - `rne`: Home 处的 ECEF → NED 旋转矩阵
pub fn lla_to_ned(lla: Lla, origin_ecef: [f64; 3], rne: &[[f32; 3]; 3]) -> [f32; 3] {
    let ecef = Vector3::from(lla_to_ecef(lla));
    let delta = ecef - Vector3::from(origin_ecef);
    let rotation = Matrix3::from_fn(|r, c| rne[r][c] as f64);
    let ned = rotation * delta;

    [ned.x as f32, ned.y as f32, ned.z as f32]
}

/// 归一化磁场参考向量
///
/// 全零（或含非有限分量）的向量返回默认正北 `(1, 0, 0)`，其余返回同方向单位向量。
pub fn unit_or_default(v: [f32; 3]) -> [f32; 3] {
    let vec = Vector3::from(v);
    if !vec.iter().all(|c| c.is_finite()) {
        return DEFAULT_MAG_NORTH;
    }
    let scale = vec.amax();
    if scale == 0.0 {
        return DEFAULT_MAG_NORTH;
    }
    // 先按最大分量缩放，范数落在 [1, √3]，不会上溢或下溢
    match (vec / scale).try_normalize(f32::EPSILON) {
        Some(unit) => [unit.x, unit.y, unit.z],
        None => DEFAULT_MAG_NORTH,
    }
}
