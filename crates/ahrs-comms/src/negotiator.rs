//! 配置协商
//!
//! 三项配置各自独立：对应输入对象有待处理变更，或本会话尚未成功下发过，就（重新）下发。
//! 变更标志在读取快照前取走；失败时放回标志、对应错误计数加一、协商标志清零，并中止本周期。

use crate::changes::ChangeFlag;
use crate::codec;
use crate::error::{CommsError, LinkStep};
use crate::manager::LinkManager;
use ahrs_store::{AhrsCalibration, AhrsSettings, HomeLocation};
use opahrs_link::AhrsTransport;
use tracing::debug;

impl<T: AhrsTransport> LinkManager<T> {
    /// 下发 Home 磁场参考
    pub(crate) fn ensure_home_reference(&mut self) -> Result<(), CommsError> {
        let changed = self.changes.take(ChangeFlag::HomeLocation);
        if self.session.home_set && !changed {
            return Ok(());
        }

        let home = self.store.snapshot::<HomeLocation>();
        let req = codec::home_reference_request(&home);
        debug!("pushing home reference Be = {:?}", req.be);

        match self.link.set_home_reference(req) {
            Ok(()) => {
                self.session.home_set = true;
                Ok(())
            },
            Err(source) => {
                self.restore(ChangeFlag::HomeLocation, changed);
                self.session.home_set = false;
                Err(self.link_failure(LinkStep::HomeReference, source))
            },
        }
    }

    /// 下发标定；设备应答不是 `Echo` 时把回报的方差写回存储
    pub(crate) fn ensure_calibration(&mut self) -> Result<(), CommsError> {
        let changed = self.changes.take(ChangeFlag::Calibration);
        if self.session.calibration_set && !changed {
            return Ok(());
        }

        let cal = self.store.snapshot::<AhrsCalibration>();
        let req = codec::calibration_request(&cal);
        debug!("pushing calibration (mode {:?})", req.mode);

        let rsp = match self.link.set_get_calibration(req) {
            Ok(rsp) => rsp,
            Err(source) => {
                self.restore(ChangeFlag::Calibration, changed);
                self.session.calibration_set = false;
                return Err(self.link_failure(LinkStep::Calibration, source));
            },
        };

        if rsp.mode.writes_back() {
            // 自写入不能再次触发标定推送
            self.echo.arm();
            self.store
                .update::<AhrsCalibration, _>(|cal| codec::apply_calibration_response(cal, &rsp));
            self.echo.disarm();
            self.session.calibration_set = true;
        } else if req.mode.writes_back() {
            debug!("device echoed calibration requested as {:?}", req.mode);
        }
        Ok(())
    }

    /// 选择设备算法
    ///
    /// 设置标志由周期入口在读取 `settings` 前取走，这里只接收结果。
    pub(crate) fn ensure_algorithm(
        &mut self,
        settings: &AhrsSettings,
        changed: bool,
    ) -> Result<(), CommsError> {
        if self.session.algorithm_set && !changed {
            return Ok(());
        }

        let id = codec::algorithm_id(settings.algorithm);
        debug!("selecting algorithm {:?}", id);

        match self.link.set_algorithm(id) {
            Ok(()) => {
                self.session.algorithm_set = true;
                Ok(())
            },
            Err(source) => {
                self.session.algorithm_set = false;
                Err(self.link_failure(LinkStep::Algorithm, source))
            },
        }
    }

    /// 失败时放回已取走的标志
    pub(crate) fn restore(&self, flag: ChangeFlag, taken: bool) {
        if taken {
            self.changes.mark(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::LinkManagerBuilder;
    use crate::changes::ChangeFlag;
    use crate::session::LinkState;
    use crate::LinkManager;
    use ahrs_store::{
        AhrsAlgorithm, AhrsCalibration, AhrsSettings, CalibrationMeasureVar, CommErrorKind,
        HomeLocation, ObjectStore,
    };
    use opahrs_link::{MockHandle, MockTransport};
    use opahrs_protocol::{AlgorithmId, CalibrationMode, CalibrationResponse, MessageKind, Request};
    use std::sync::Arc;

    /// 已进入 Steady、尚未跑过周期的管理器
    fn steady() -> (LinkManager<MockTransport>, MockHandle) {
        let link = MockTransport::new();
        let handle = link.handle();
        let store = Arc::new(ObjectStore::new());
        store.set(AhrsSettings {
            update_period_ms: 1,
            update_filtered: false,
            ..Default::default()
        });
        let mut manager = LinkManagerBuilder::new(link).store(store).build().unwrap();
        manager.step();
        assert_eq!(manager.step(), LinkState::Steady);
        handle.clear_requests();
        (manager, handle)
    }

    #[test]
    fn test_home_pushed_once_without_changes() {
        let (mut manager, handle) = steady();
        manager.run_period().unwrap();
        manager.run_period().unwrap();
        assert_eq!(handle.count(MessageKind::HomeReferenceRequest), 1);
        assert!(manager.session().home_set);
    }

    #[test]
    fn test_home_change_repushes_normalized_vector() {
        let (mut manager, handle) = steady();
        manager.run_period().unwrap();

        manager.store().set(HomeLocation {
            be: [0.0, 0.0, 2.0],
            ..Default::default()
        });
        assert!(manager.changes.is_pending(ChangeFlag::HomeLocation));
        manager.run_period().unwrap();

        assert_eq!(handle.count(MessageKind::HomeReferenceRequest), 2);
        assert_eq!(handle.last_home_reference().unwrap().be, [0.0, 0.0, 1.0]);
        assert!(!manager.changes.is_pending(ChangeFlag::HomeLocation));
    }

    #[test]
    fn test_home_failure_aborts_period_and_keeps_flag() {
        let (mut manager, handle) = steady();
        manager.store().set(HomeLocation::default());
        handle.fail_next(MessageKind::HomeReferenceRequest, 1);

        assert!(manager.run_period().is_err());
        assert!(!manager.session().home_set);
        assert!(manager.changes.is_pending(ChangeFlag::HomeLocation));
        assert_eq!(manager.session().error_count(CommErrorKind::HomeLocation), 1);
        // 后续步骤未执行
        assert_eq!(handle.request_kinds(), vec![MessageKind::HomeReferenceRequest]);
    }

    #[test]
    fn test_calibration_measure_writes_back_without_self_trigger() {
        let (mut manager, handle) = steady();
        manager.store().set(AhrsCalibration {
            measure_var: CalibrationMeasureVar::Measure,
            ..Default::default()
        });
        handle.set_calibration_response(CalibrationResponse {
            mode: CalibrationMode::Measure,
            accel_var: [0.11, 0.12, 0.13],
            gyro_var: [0.21, 0.22, 0.23],
            mag_var: [0.31, 0.32, 0.33],
        });

        manager.run_period().unwrap();

        let cal = manager.store().get::<AhrsCalibration>();
        assert_eq!(cal.accel_var, [0.11, 0.12, 0.13]);
        assert_eq!(cal.gyro_var, [0.21, 0.22, 0.23]);
        assert_eq!(cal.mag_var, [0.31, 0.32, 0.33]);
        assert!(manager.session().calibration_set);
        assert!(!manager.changes.is_pending(ChangeFlag::Calibration));
        assert!(!manager.echo.is_armed());

        manager.run_period().unwrap();
        assert_eq!(handle.count(MessageKind::CalibrationRequest), 1);
    }

    #[test]
    fn test_calibration_echo_does_not_write_back() {
        let (mut manager, handle) = steady();
        let original = AhrsCalibration {
            measure_var: CalibrationMeasureVar::Echo,
            ..Default::default()
        };
        manager.store().set(original.clone());
        handle.set_calibration_response(CalibrationResponse {
            mode: CalibrationMode::Echo,
            accel_var: [9.0; 3],
            gyro_var: [9.0; 3],
            mag_var: [9.0; 3],
        });

        manager.run_period().unwrap();

        assert_eq!(manager.store().get::<AhrsCalibration>(), original);
        assert!(!manager.session().calibration_set);
        assert!(!manager.changes.is_pending(ChangeFlag::Calibration));

        // calibration_set 仍为 false，下个周期再次下发
        manager.run_period().unwrap();
        assert_eq!(handle.count(MessageKind::CalibrationRequest), 2);
    }

    #[test]
    fn test_calibration_write_back_follows_device_mode() {
        let (mut manager, handle) = steady();
        let requested = AhrsCalibration {
            measure_var: CalibrationMeasureVar::Measure,
            ..Default::default()
        };
        manager.store().set(requested.clone());
        // 设备没有测量，只回显
        handle.set_calibration_response(CalibrationResponse {
            mode: CalibrationMode::Echo,
            accel_var: [9.0; 3],
            gyro_var: [9.0; 3],
            mag_var: [9.0; 3],
        });

        manager.run_period().unwrap();

        assert_eq!(handle.last_calibration().unwrap().mode, CalibrationMode::Measure);
        assert_eq!(manager.store().get::<AhrsCalibration>(), requested);
        assert!(!manager.session().calibration_set);
    }

    #[test]
    fn test_external_calibration_change_after_self_write_is_seen() {
        let (mut manager, handle) = steady();
        manager.run_period().unwrap();

        manager.store().update::<AhrsCalibration, _>(|c| c.gyro_bias = [0.5; 3]);
        manager.run_period().unwrap();

        assert_eq!(handle.count(MessageKind::CalibrationRequest), 2);
        assert_eq!(handle.last_calibration().unwrap().gyro_bias, [0.5; 3]);
    }

    #[test]
    fn test_calibration_failure() {
        let (mut manager, handle) = steady();
        handle.fail_next(MessageKind::CalibrationRequest, 1);

        assert!(manager.run_period().is_err());
        assert!(manager.session().home_set);
        assert!(!manager.session().calibration_set);
        assert!(!manager.session().algorithm_set);
        assert_eq!(manager.session().error_count(CommErrorKind::Calibration), 1);
        assert_eq!(handle.count(MessageKind::AlgorithmRequest), 0);
    }

    #[test]
    fn test_algorithm_follows_settings() {
        let (mut manager, handle) = steady();
        manager.run_period().unwrap();

        manager.store().update::<AhrsSettings, _>(|s| s.algorithm = AhrsAlgorithm::Simple);
        assert!(manager.changes.is_pending(ChangeFlag::Settings));
        manager.run_period().unwrap();

        let algorithms: Vec<_> = handle
            .requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Algorithm(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(algorithms, vec![AlgorithmId::InsGps, AlgorithmId::Simple]);
        assert!(!manager.changes.is_pending(ChangeFlag::Settings));

        // 设置未再变化，不再下发
        manager.run_period().unwrap();
        assert_eq!(handle.count(MessageKind::AlgorithmRequest), 2);
    }

    #[test]
    fn test_algorithm_failure_keeps_settings_flag() {
        let (mut manager, handle) = steady();
        manager.store().set(AhrsSettings {
            update_period_ms: 1,
            update_filtered: false,
            ..Default::default()
        });
        handle.fail_next(MessageKind::AlgorithmRequest, 1);

        assert!(manager.run_period().is_err());
        assert!(!manager.session().algorithm_set);
        assert!(manager.changes.is_pending(ChangeFlag::Settings));
        assert_eq!(manager.session().error_count(CommErrorKind::Algorithm), 1);
    }
}
