//! 集成测试公共设施

#![allow(dead_code)]

use ahrs_comms::{LinkConfig, LinkManager, LinkManagerBuilder, LinkState, codec};
use ahrs_store::{AhrsSettings, GpsPosition, HomeLocation, ObjectStore};
use opahrs_link::{MockHandle, MockTransport};
use opahrs_protocol::Lla;
use std::sync::Arc;

pub const HOME: Lla = Lla {
    lat_deg: 47.3977,
    lon_deg: 8.5456,
    alt_m: 488.0,
};

pub struct Harness {
    pub manager: LinkManager<MockTransport>,
    pub device: MockHandle,
    pub store: Arc<ObjectStore>,
}

impl Harness {
    pub fn new(settings: AhrsSettings) -> Self {
        let link = MockTransport::new();
        let device = link.handle();
        let store = Arc::new(ObjectStore::new());
        store.set(settings);
        let manager = LinkManagerBuilder::new(link)
            .store(store.clone())
            .config(LinkConfig {
                resync_retry_interval_ms: 1,
                ..Default::default()
            })
            .build()
            .expect("valid config");
        Self {
            manager,
            device,
            store,
        }
    }

    /// 步进直到 Steady（最多 10 步）
    pub fn reach_steady(&mut self) {
        for _ in 0..10 {
            if self.manager.step() == LinkState::Steady {
                return;
            }
        }
        panic!("link did not reach Steady");
    }

    /// 跑 `n` 个完整稳态周期
    pub fn periods(&mut self, n: usize) {
        for _ in 0..n {
            assert_eq!(self.manager.step(), LinkState::Steady);
        }
    }
}

/// 1ms 周期，只做融合交换
pub fn fast_filtered() -> AhrsSettings {
    AhrsSettings {
        update_period_ms: 1,
        update_raw: false,
        update_filtered: true,
        ..Default::default()
    }
}

pub fn home() -> HomeLocation {
    codec::home_location_at(HOME, [21_000.0, 1_200.0, 43_000.0])
}

/// 约在 Home 以北 111m 的可用定位
pub fn good_fix() -> GpsPosition {
    GpsPosition {
        latitude: ((HOME.lat_deg + 0.001) * 1e7).round() as i32,
        longitude: (HOME.lon_deg * 1e7).round() as i32,
        altitude: HOME.alt_m as f32,
        geoid_separation: 0.0,
        groundspeed: 5.0,
        heading: 45.0,
        satellites: 9,
        pdop: 1.5,
    }
}
