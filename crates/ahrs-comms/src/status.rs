//! 状态发布

use crate::events::LinkEvent;
use crate::manager::LinkManager;
use ahrs_store::AhrsStatus;
use opahrs_link::AhrsTransport;
use opahrs_protocol::SERIAL_LEN;
use tracing::info;

impl<T: AhrsTransport> LinkManager<T> {
    /// 错误计数、协商标志和设备性能写入 `AhrsStatus`
    pub(crate) fn publish_status(&self) {
        let session = &self.session;
        self.store.update::<AhrsStatus, _>(|status| {
            status.comm_errors = session.error_counters;
            status.home_set = session.home_set;
            status.calibration_set = session.calibration_set;
            status.algorithm_set = session.algorithm_set;
            status.cpu_load = session.performance.cpu_load;
            status.idle_time_per_cycle = session.performance.idle_time;
            status.running_time_per_cycle = session.performance.run_time;
            status.dropped_updates = session.performance.dropped_updates;
        });
    }

    /// 身份握手成功后发布序列号
    pub(crate) fn publish_identity(&mut self, serial: [u8; SERIAL_LEN]) {
        info!("AHRS coprocessor identified, serial {}", hex::encode(serial));
        self.session.serial = Some(serial);
        self.store
            .update::<AhrsStatus, _>(|status| status.serial_number = serial);
        self.events
            .emit(LinkEvent::Identified { serial }, &self.metrics);
    }
}
