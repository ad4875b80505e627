//! 链路同步状态机
//!
//! ```text
//!            resync ok              identity ok
//! Unsynced ────────────► Identifying ──────────► Steady ──┐
//!    ▲ ▲                      │                     │      │ period ok
//!    │ └──────────────────────┘ identity failed     │  ◄───┘
//!    └──────────────────────────────────────────────┘ any failure
//! ```
//!
//! 每次进入 `Unsynced`（包括启动时）都会拉起严重告警、清除三个协商标志并发布状态，
//! 没有任何路径能绕过这一步。

use crate::changes::ChangeFlag;
use crate::error::{CommsError, LinkStep};
use crate::events::LinkEvent;
use crate::manager::LinkManager;
use crate::metrics::LinkMetrics;
use crate::session::LinkState;
use crate::timer::{TickOutcome, period_from_ms};
use ahrs_store::{AhrsSettings, AlarmId, AlarmSeverity};
use opahrs_link::AhrsTransport;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace};

impl<T: AhrsTransport> LinkManager<T> {
    /// 推进状态机一步，返回新的状态
    ///
    /// - `Unsynced`: 一次 resync 尝试，失败则睡眠重试间隔
    /// - `Identifying`: 一次身份握手
    /// - `Steady`: 一个完整周期（含睡眠到下一个截止时间）
    pub fn step(&mut self) -> LinkState {
        let next = match self.session.state {
            LinkState::Unsynced => self.step_unsynced(),
            LinkState::Identifying => self.step_identifying(),
            LinkState::Steady => self.step_steady(),
        };
        self.transition(next);
        self.session.state
    }

    fn step_unsynced(&mut self) -> LinkState {
        LinkMetrics::incr(&self.metrics.resync_attempts);
        match self.link.resync() {
            Ok(()) => {
                debug!("AHRS link resynchronized");
                LinkState::Identifying
            },
            Err(e) => {
                trace!("AHRS resync failed: {}", e);
                spin_sleep::sleep(self.config.resync_retry_interval());
                LinkState::Unsynced
            },
        }
    }

    fn step_identifying(&mut self) -> LinkState {
        match self.link.get_identity() {
            Ok(identity) => {
                self.publish_identity(identity.serial_bcd);
                self.store.clear_alarm(AlarmId::AhrsComms);
                LinkState::Steady
            },
            Err(source) => {
                let err = self.link_failure(LinkStep::Identity, source);
                self.report_failure(&err);
                LinkState::Unsynced
            },
        }
    }

    fn step_steady(&mut self) -> LinkState {
        let settings_changed = self.changes.take(ChangeFlag::Settings);
        let settings = self.store.get::<AhrsSettings>();
        let period = period_from_ms(settings.update_period_ms);
        self.timer.advance(period);

        let result = self.run_period_with(&settings, settings_changed);
        self.publish_status();

        match result {
            Ok(()) => {
                LinkMetrics::incr(&self.metrics.periods_completed);
                if self.timer.wait(period) == TickOutcome::Overrun {
                    LinkMetrics::incr(&self.metrics.period_overruns);
                }
                LinkState::Steady
            },
            Err(err) => {
                self.report_failure(&err);
                LinkState::Unsynced
            },
        }
    }

    /// 执行一个稳态周期（不睡眠）
    ///
    /// 顺序固定：home → calibration → algorithm → raw → fused；任何一步失败即中止本周期。
    pub fn run_period(&mut self) -> Result<(), CommsError> {
        let settings_changed = self.changes.take(ChangeFlag::Settings);
        let settings = self.store.get::<AhrsSettings>();
        let result = self.run_period_with(&settings, settings_changed);
        self.publish_status();
        result
    }

    /// `settings_changed` 是读取 `settings` 之前取走的设置标志；周期失败时放回
    fn run_period_with(
        &mut self,
        settings: &AhrsSettings,
        settings_changed: bool,
    ) -> Result<(), CommsError> {
        let result = self.run_steps(settings, settings_changed);
        if result.is_err() {
            self.restore(ChangeFlag::Settings, settings_changed);
        }
        result
    }

    fn run_steps(
        &mut self,
        settings: &AhrsSettings,
        settings_changed: bool,
    ) -> Result<(), CommsError> {
        self.ensure_home_reference()?;
        self.ensure_calibration()?;
        self.ensure_algorithm(settings, settings_changed)?;

        if settings.update_raw {
            self.exchange_raw()?;
        }
        if settings.update_filtered {
            self.exchange_fused()?;
        }
        Ok(())
    }

    fn transition(&mut self, next: LinkState) {
        let prev = self.session.state;
        if prev == next {
            return;
        }

        self.session.state = next;
        self.shared_state.set(next, Ordering::Release);
        info!("AHRS link state {} -> {}", prev, next);
        self.events
            .emit(LinkEvent::StateChanged { from: prev, to: next }, &self.metrics);

        match next {
            LinkState::Unsynced => self.enter_unsynced(),
            LinkState::Identifying => {},
            LinkState::Steady => {
                LinkMetrics::incr(&self.metrics.sessions_established);
                self.timer.reanchor();
            },
        }
    }

    /// 进入 `Unsynced` 的动作
    pub(crate) fn enter_unsynced(&mut self) {
        self.store.raise_alarm(AlarmId::AhrsComms, AlarmSeverity::Critical);
        self.session.reset_negotiated();
        self.publish_status();
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::LinkManagerBuilder;
    use crate::config::LinkConfig;
    use crate::events::LinkEvent;
    use crate::session::LinkState;
    use ahrs_store::{AhrsSettings, AhrsStatus, AlarmId, AlarmSeverity, ObjectStore};
    use opahrs_link::{MockHandle, MockTransport};
    use opahrs_protocol::MessageKind;
    use std::sync::Arc;

    fn manager() -> (crate::LinkManager<MockTransport>, MockHandle) {
        let link = MockTransport::new();
        let handle = link.handle();
        let store = Arc::new(ObjectStore::new());
        store.set(AhrsSettings {
            update_period_ms: 1,
            ..Default::default()
        });
        let config = LinkConfig {
            resync_retry_interval_ms: 1,
            ..Default::default()
        };
        let manager = LinkManagerBuilder::new(link)
            .store(store)
            .config(config)
            .build()
            .unwrap();
        (manager, handle)
    }

    #[test]
    fn test_startup_raises_alarm() {
        let (manager, _handle) = manager();
        assert_eq!(manager.state(), LinkState::Unsynced);
        assert_eq!(
            manager.store().alarm(AlarmId::AhrsComms),
            AlarmSeverity::Critical
        );
    }

    #[test]
    fn test_happy_path_reaches_steady() {
        let (mut manager, handle) = manager();
        assert_eq!(manager.step(), LinkState::Identifying);
        assert_eq!(manager.step(), LinkState::Steady);
        assert_eq!(manager.store().alarm(AlarmId::AhrsComms), AlarmSeverity::Ok);

        let status = manager.store().get::<AhrsStatus>();
        assert_eq!(status.serial_number[..4], [0, 1, 2, 3]);

        assert_eq!(manager.step(), LinkState::Steady);
        assert!(manager.session().fully_negotiated());
        assert_eq!(handle.count(MessageKind::IdentityRequest), 1);
        assert_eq!(manager.metrics().sessions_established, 1);
        assert_eq!(manager.metrics().periods_completed, 1);
    }

    #[test]
    fn test_resync_failure_stays_unsynced() {
        let (mut manager, handle) = manager();
        handle.fail_resync(3);
        for _ in 0..3 {
            assert_eq!(manager.step(), LinkState::Unsynced);
        }
        assert_eq!(manager.step(), LinkState::Identifying);
        assert_eq!(handle.resync_calls(), 4);
        assert_eq!(manager.metrics().resync_attempts, 4);
    }

    #[test]
    fn test_identity_failure_returns_to_unsynced() {
        let (mut manager, handle) = manager();
        handle.fail_next(MessageKind::IdentityRequest, 1);
        manager.step();
        assert_eq!(manager.step(), LinkState::Unsynced);
        assert_eq!(
            manager.store().alarm(AlarmId::AhrsComms),
            AlarmSeverity::Critical
        );
        // 握手失败不计入五类错误计数
        assert_eq!(manager.session().error_counters, [0; 5]);
    }

    #[test]
    fn test_events_follow_transitions() {
        let (mut manager, handle) = manager();
        let events = manager.subscribe();

        manager.step();
        manager.step();
        handle.fail_always(MessageKind::HomeReferenceRequest);
        manager.step();

        let received: Vec<_> = events.try_iter().collect();
        assert!(matches!(
            received[0],
            LinkEvent::StateChanged {
                from: LinkState::Unsynced,
                to: LinkState::Identifying
            }
        ));
        assert!(matches!(received[1], LinkEvent::Identified { .. }));
        assert!(matches!(
            received[2],
            LinkEvent::StateChanged {
                from: LinkState::Identifying,
                to: LinkState::Steady
            }
        ));
        assert!(matches!(
            received[3],
            LinkEvent::StepFailed {
                step: crate::LinkStep::HomeReference,
                ..
            }
        ));
        assert!(matches!(
            received[4],
            LinkEvent::StateChanged {
                from: LinkState::Steady,
                to: LinkState::Unsynced
            }
        ));
    }
}
