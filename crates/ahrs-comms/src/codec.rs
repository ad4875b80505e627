//! 消息编解码
//!
//! 存储对象 ↔ 协议载荷之间的纯转换，不触碰链路，可以脱离传输单独测试。

use crate::session::DevicePerformance;
use ahrs_store::{
    AhrsAlgorithm, AhrsCalibration, AttitudeActual, AttitudeRaw, AttitudeSettings, BaroAltitude,
    CalibrationMeasureVar, GpsPosition, HomeLocation, PositionActual,
};
use opahrs_protocol::{
    AlgorithmId, BaroSample, CalibrationMode, CalibrationRequest, CalibrationResponse,
    ECEF_CM_PER_M, FusedUpdateResponse, GPS_DEGREE_SCALE, HomeReferenceRequest, Lla,
    RawAttitudeResponse, lla_to_ecef, lla_to_ned, quaternion_to_rpy, rne_from_lla,
    unit_or_default, wrap_yaw,
};

/// Home 参考：磁场向量归一化（全零时取正北）
pub fn home_reference_request(home: &HomeLocation) -> HomeReferenceRequest {
    HomeReferenceRequest {
        be: unit_or_default(home.be),
    }
}

pub fn calibration_mode(measure_var: CalibrationMeasureVar) -> CalibrationMode {
    match measure_var {
        CalibrationMeasureVar::Set => CalibrationMode::Set,
        CalibrationMeasureVar::Measure => CalibrationMode::Measure,
        CalibrationMeasureVar::Echo => CalibrationMode::Echo,
    }
}

pub fn calibration_request(cal: &AhrsCalibration) -> CalibrationRequest {
    CalibrationRequest {
        mode: calibration_mode(cal.measure_var),
        accel_bias: cal.accel_bias,
        accel_scale: cal.accel_scale,
        accel_var: cal.accel_var,
        gyro_bias: cal.gyro_bias,
        gyro_scale: cal.gyro_scale,
        gyro_var: cal.gyro_var,
        mag_bias: cal.mag_bias,
        mag_scale: cal.mag_scale,
        mag_var: cal.mag_var,
    }
}

/// 设备回报的方差写入标定对象
pub fn apply_calibration_response(cal: &mut AhrsCalibration, rsp: &CalibrationResponse) {
    cal.accel_var = rsp.accel_var;
    cal.gyro_var = rsp.gyro_var;
    cal.mag_var = rsp.mag_var;
}

pub fn algorithm_id(algorithm: AhrsAlgorithm) -> AlgorithmId {
    match algorithm {
        AhrsAlgorithm::InsGps => AlgorithmId::InsGps,
        AhrsAlgorithm::Simple => AlgorithmId::Simple,
    }
}

pub fn baro_sample(baro: &BaroAltitude) -> BaroSample {
    BaroSample {
        altitude: baro.altitude,
    }
}

pub fn attitude_raw(raw: &RawAttitudeResponse) -> AttitudeRaw {
    AttitudeRaw {
        magnetometers: raw.mags,
        gyros: raw.gyros,
        gyros_filtered: raw.gyros_filtered,
        gyro_temp: raw.gyro_temp,
        accels: raw.accels,
        accels_filtered: raw.accels_filtered,
    }
}

/// 融合更新应答解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct FusedOutputs {
    pub attitude: AttitudeActual,
    pub position: PositionActual,
    pub performance: DevicePerformance,
}

/// 解码融合更新应答
///
/// 姿态扣除 roll/pitch 安装偏置，航向折叠到 [0, 360)。
pub fn decode_fused_update(rsp: &FusedUpdateResponse, bias: &AttitudeSettings) -> FusedOutputs {
    let [q1, q2, q3, q4] = rsp.quaternion;
    let rpy = quaternion_to_rpy(rsp.quaternion);

    FusedOutputs {
        attitude: AttitudeActual {
            q1,
            q2,
            q3,
            q4,
            roll: rpy.roll - bias.roll_bias,
            pitch: rpy.pitch - bias.pitch_bias,
            yaw: wrap_yaw(rpy.yaw),
        },
        position: PositionActual {
            ned: rsp.ned,
            vel: rsp.vel,
        },
        performance: DevicePerformance {
            cpu_load: rsp.load,
            idle_time: rsp.idle_time,
            run_time: rsp.run_time,
            dropped_updates: rsp.dropped_updates,
        },
    }
}

/// GPS 定位的大地坐标（椭球高 = 海拔 + 大地水准面高）
pub fn gps_lla(gps: &GpsPosition) -> Lla {
    Lla {
        lat_deg: gps.latitude as f64 / GPS_DEGREE_SCALE,
        lon_deg: gps.longitude as f64 / GPS_DEGREE_SCALE,
        alt_m: (gps.altitude + gps.geoid_separation) as f64,
    }
}

/// Home 的 ECEF 原点（米）
pub fn home_ecef(home: &HomeLocation) -> [f64; 3] {
    home.ecef_cm.map(|cm| cm as f64 / ECEF_CM_PER_M)
}

/// GPS 定位 → 以 Home 为原点的 NED（米）
pub fn gps_ned(gps: &GpsPosition, home: &HomeLocation) -> [f32; 3] {
    lla_to_ned(gps_lla(gps), home_ecef(home), &home.rne)
}

/// 以给定大地坐标建立 Home 点
pub fn home_location_at(lla: Lla, be: [f32; 3]) -> HomeLocation {
    let ecef = lla_to_ecef(lla);
    HomeLocation {
        be,
        set: true,
        indoor: false,
        ecef_cm: ecef.map(|m| (m * ECEF_CM_PER_M).round() as i32),
        rne: rne_from_lla(lla.lat_deg, lla.lon_deg),
    }
}
