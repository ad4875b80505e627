//! GPS 质量门
//!
//! 决定本周期下发给协处理器的 GPS 观测：
//!
//! | 条件 | 质量 | 位置 |
//! |------|------|------|
//! | 无 Home 或室内 | `Indoor` | 零（设备只做一致性检查） |
//! | 定位不达标 | `Provisional` | 零，连续计数清零 |
//! | 达标但连续次数 < 门限 | `Provisional` | 零 |
//! | 达标且连续次数达到门限 | `Good` | 相对 Home 的 NED |

use crate::codec::gps_ned;
use crate::config::GpsGateConfig;
use ahrs_store::{GpsPosition, HomeLocation};
use opahrs_protocol::{GpsQuality, GpsSample};

#[derive(Debug, Clone)]
pub struct GpsGate {
    config: GpsGateConfig,
}

impl GpsGate {
    pub fn new(config: GpsGateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GpsGateConfig {
        &self.config
    }

    /// 单次定位是否达标
    pub fn fix_is_usable(&self, gps: &GpsPosition) -> bool {
        gps.satellites >= self.config.min_satellites && gps.pdop < self.config.max_pdop
    }

    /// 评估一次定位
    ///
    /// # 参数
    /// - `streak`: 会话中的连续达标计数，会被更新
    pub fn evaluate(&self, streak: &mut u32, gps: &GpsPosition, home: &HomeLocation) -> GpsSample {
        if !home.set || home.indoor {
            return GpsSample::placeholder(GpsQuality::Indoor);
        }

        if !self.fix_is_usable(gps) {
            *streak = 0;
            return GpsSample::placeholder(GpsQuality::Provisional);
        }

        *streak = (*streak + 1).min(self.config.hysteresis_limit);
        if *streak < self.config.hysteresis_limit {
            return GpsSample::placeholder(GpsQuality::Provisional);
        }

        GpsSample {
            quality: GpsQuality::Good,
            ned: gps_ned(gps, home),
            groundspeed: gps.groundspeed,
            heading: gps.heading,
        }
    }
}

impl Default for GpsGate {
    fn default() -> Self {
        Self::new(GpsGateConfig::default())
    }
}
