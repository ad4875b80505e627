//! 周期数据交换
//!
//! - 原始模式：拉取原始传感器采样，原样写入 `AttitudeRaw`
//! - 融合模式：下发气压/GPS 观测（仅在有新数据时），取回融合姿态和位置
//!
//! 两者可在同一周期运行，原始模式在前。

use crate::changes::ChangeFlag;
use crate::codec;
use crate::error::{CommsError, LinkStep};
use crate::manager::LinkManager;
use ahrs_store::{AttitudeSettings, BaroAltitude, GpsPosition, HomeLocation};
use opahrs_link::AhrsTransport;
use opahrs_protocol::FusedUpdateRequest;
use tracing::trace;

impl<T: AhrsTransport> LinkManager<T> {
    pub(crate) fn exchange_raw(&mut self) -> Result<(), CommsError> {
        let raw = match self.link.get_raw_attitude() {
            Ok(raw) => raw,
            Err(source) => return Err(self.link_failure(LinkStep::RawAttitude, source)),
        };
        self.store.set(codec::attitude_raw(&raw));
        Ok(())
    }

    pub(crate) fn exchange_fused(&mut self) -> Result<(), CommsError> {
        let baro_pending = self.changes.take(ChangeFlag::Baro);
        let gps_pending = self.changes.take(ChangeFlag::Gps);

        let barometer =
            baro_pending.then(|| codec::baro_sample(&self.store.snapshot::<BaroAltitude>()));
        let gps = if gps_pending {
            let fix = self.store.snapshot::<GpsPosition>();
            let home = self.store.snapshot::<HomeLocation>();
            Some(
                self.gps_gate
                    .evaluate(&mut self.session.good_gps_streak, &fix, &home),
            )
        } else {
            None
        };
        trace!(
            "fused update: baro {:?}, gps {:?}",
            barometer,
            gps.map(|g| g.quality)
        );

        let rsp = match self
            .link
            .set_get_fused_update(FusedUpdateRequest { barometer, gps })
        {
            Ok(rsp) => rsp,
            Err(source) => {
                self.restore(ChangeFlag::Baro, baro_pending);
                self.restore(ChangeFlag::Gps, gps_pending);
                return Err(self.link_failure(LinkStep::FusedUpdate, source));
            },
        };

        let bias = self.store.snapshot::<AttitudeSettings>();
        let out = codec::decode_fused_update(&rsp, &bias);
        self.store.set(out.attitude);
        self.store.set(out.position);
        self.session.performance = out.performance;
        Ok(())
    }
}
