//! 协处理器行为仿真
//!
//! 模拟一个 AHRS 协处理器：缓慢旋转的航向、带噪声的原始采样、
//! `Measure` 模式下的方差测量，以及可配置概率的随机链路故障。
//! 故障发生后设备失去同步，直到下一次 resync 前所有请求都返回 `NotSynced`。
//!
//! 产出的数据只是"看起来合理"，不是姿态解算。

use crate::{AhrsTransport, LinkError};
use opahrs_protocol::{
    AlgorithmId, CalibrationMode, CalibrationResponse, FusedUpdateRequest, FusedUpdateResponse,
    GpsQuality, Identity, RawAttitudeResponse, Request, Response, SERIAL_LEN, Vec3,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, trace};

/// 仿真配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 每个请求的随机故障概率 [0, 1]
    pub failure_rate: f64,
    /// 随机种子（`None` 使用系统熵）
    pub seed: Option<u64>,
    /// 航向旋转速度（度/秒）
    pub yaw_rate_deg_s: f32,
    /// `Measure` 模式下测得的方差基准
    pub measured_variance: f32,
    /// 设备序列号
    pub serial_bcd: [u8; SERIAL_LEN],
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut serial_bcd = [0u8; SERIAL_LEN];
        serial_bcd[..8].copy_from_slice(&[0x20, 0x10, 0x07, 0x15, 0x00, 0x00, 0x42, 0x01]);
        Self {
            failure_rate: 0.0,
            seed: None,
            yaw_rate_deg_s: 10.0,
            measured_variance: 1e-3,
            serial_bcd,
        }
    }
}

/// 设备侧当前采用的标定方差
#[derive(Debug, Clone, Copy, Default)]
struct DeviceVariances {
    accel: Vec3,
    gyro: Vec3,
    mag: Vec3,
}

/// 仿真协处理器
pub struct SimTransport {
    config: SimConfig,
    rng: StdRng,
    synced: bool,
    started: Instant,
    mag_north: Vec3,
    algorithm: Option<AlgorithmId>,
    variances: DeviceVariances,
    ned: Vec3,
    vel: Vec3,
    updates: u64,
    dropped_updates: u16,
}

impl SimTransport {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            synced: false,
            started: Instant::now(),
            mag_north: [1.0, 0.0, 0.0],
            algorithm: None,
            variances: DeviceVariances::default(),
            ned: [0.0; 3],
            vel: [0.0; 3],
            updates: 0,
            dropped_updates: 0,
        }
    }

    /// 设备当前选择的算法
    pub fn algorithm(&self) -> Option<AlgorithmId> {
        self.algorithm
    }

    fn noise(&mut self, amplitude: f32) -> f32 {
        self.rng.gen_range(-amplitude..=amplitude)
    }

    fn noisy(&mut self, base: Vec3, amplitude: f32) -> Vec3 {
        [
            base[0] + self.noise(amplitude),
            base[1] + self.noise(amplitude),
            base[2] + self.noise(amplitude),
        ]
    }

    fn calibrate(
        &mut self,
        mode: CalibrationMode,
        accel: Vec3,
        gyro: Vec3,
        mag: Vec3,
    ) -> CalibrationResponse {
        match mode {
            CalibrationMode::Set => {
                self.variances = DeviceVariances { accel, gyro, mag };
            },
            CalibrationMode::Measure => {
                let base = self.config.measured_variance;
                let measured = |rng: &mut StdRng| -> Vec3 {
                    [
                        base * rng.gen_range(0.5..1.5),
                        base * rng.gen_range(0.5..1.5),
                        base * rng.gen_range(0.5..1.5),
                    ]
                };
                self.variances = DeviceVariances {
                    accel: measured(&mut self.rng),
                    gyro: measured(&mut self.rng),
                    mag: measured(&mut self.rng),
                };
            },
            // 只回报，不采用
            CalibrationMode::Echo => {},
        }
        CalibrationResponse {
            mode,
            accel_var: self.variances.accel,
            gyro_var: self.variances.gyro,
            mag_var: self.variances.mag,
        }
    }

    fn raw_attitude(&mut self) -> RawAttitudeResponse {
        let mag = self.mag_north;
        let gyros = self.noisy([0.0; 3], 0.02);
        let accels = self.noisy([0.0, 0.0, -9.81], 0.05);
        RawAttitudeResponse {
            mags: self.noisy(mag, 0.01),
            gyros,
            gyros_filtered: [gyros[0] * 0.5, gyros[1] * 0.5, gyros[2] * 0.5],
            gyro_temp: [25.0 + self.noise(0.2), 25.5 + self.noise(0.2)],
            accels,
            accels_filtered: [accels[0] * 0.5, accels[1] * 0.5, -9.81],
        }
    }

    fn fused_update(&mut self, req: FusedUpdateRequest) -> FusedUpdateResponse {
        self.updates += 1;

        if let Some(gps) = req.gps
            && gps.quality == GpsQuality::Good
        {
            let (sin_h, cos_h) = gps.heading.to_radians().sin_cos();
            self.vel = [gps.groundspeed * cos_h, gps.groundspeed * sin_h, 0.0];
            self.ned[0] = gps.ned[0];
            self.ned[1] = gps.ned[1];
        }
        if let Some(baro) = req.barometer {
            self.ned[2] = -baro.altitude;
        }

        // 偶尔丢一次内部更新
        if self.rng.gen_bool(0.01) {
            self.dropped_updates = self.dropped_updates.wrapping_add(1);
        }

        let yaw = (self.started.elapsed().as_secs_f32() * self.config.yaw_rate_deg_s)
            .to_radians()
            .rem_euclid(std::f32::consts::TAU);
        let (sin_half, cos_half) = (yaw / 2.0).sin_cos();
        let load = self.rng.gen_range(20..40);
        let run_time = self.rng.gen_range(300..600);

        FusedUpdateResponse {
            quaternion: [cos_half, 0.0, 0.0, sin_half],
            ned: self.ned,
            vel: self.vel,
            load,
            idle_time: 1000 - run_time,
            run_time,
            dropped_updates: self.dropped_updates,
        }
    }
}

impl AhrsTransport for SimTransport {
    fn resync(&mut self) -> Result<(), LinkError> {
        if self.config.failure_rate > 0.0 && self.rng.gen_bool(self.config.failure_rate) {
            trace!("sim: resync dropped");
            return Err(LinkError::NotSynced);
        }
        self.synced = true;
        Ok(())
    }

    fn transact(&mut self, request: Request) -> Result<Response, LinkError> {
        if !self.synced {
            return Err(LinkError::NotSynced);
        }
        if self.config.failure_rate > 0.0 && self.rng.gen_bool(self.config.failure_rate) {
            debug!("sim: injected link failure on {}", request.kind());
            self.synced = false;
            return Err(LinkError::Timeout);
        }

        let response = match request {
            Request::Identity => Response::Identity(Identity::new(self.config.serial_bcd)),
            Request::HomeReference(req) => {
                self.mag_north = req.be;
                Response::Ack
            },
            Request::Calibration(req) => Response::Calibration(self.calibrate(
                req.mode,
                req.accel_var,
                req.gyro_var,
                req.mag_var,
            )),
            Request::Algorithm(id) => {
                self.algorithm = Some(id);
                Response::Ack
            },
            Request::RawAttitude => Response::RawAttitude(self.raw_attitude()),
            Request::FusedUpdate(req) => Response::FusedUpdate(self.fused_update(req)),
        };
        Ok(response)
    }
}
