//! 链路管理器
//!
//! `LinkManager` 持有传输和会话，由单个线程驱动。状态机见 `sync` 模块，
//! 配置下发见 `negotiator`，周期数据交换见 `exchanger`，状态发布见 `status`。
//!
//! 两种驱动方式：
//! - 手动：反复调用 [`LinkManager::step`]（测试用）
//! - 线程：[`LinkManagerBuilder::spawn`](crate::LinkManagerBuilder::spawn) 得到 [`LinkTask`](crate::LinkTask)

use crate::changes::{ChangeFlag, PendingChanges, SelfEchoSuppressor};
use crate::config::LinkConfig;
use crate::error::{CommsError, LinkStep};
use crate::events::{self, EventBus, LinkEvent};
use crate::gps_gate::GpsGate;
use crate::metrics::{LinkMetrics, LinkMetricsSnapshot};
use crate::session::{AtomicLinkState, LinkSession, LinkState};
use crate::timer::PeriodTimer;
use ahrs_store::ObjectStore;
use crossbeam_channel::{Receiver, Sender};
use opahrs_link::{AhrsTransport, LinkError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// AHRS 链路管理器
pub struct LinkManager<T> {
    pub(crate) link: T,
    pub(crate) store: Arc<ObjectStore>,
    pub(crate) config: LinkConfig,
    pub(crate) session: LinkSession,
    pub(crate) changes: Arc<PendingChanges>,
    pub(crate) echo: Arc<SelfEchoSuppressor>,
    pub(crate) gps_gate: GpsGate,
    pub(crate) timer: PeriodTimer,
    pub(crate) metrics: Arc<LinkMetrics>,
    pub(crate) events: EventBus,
    pub(crate) shared_state: Arc<AtomicLinkState>,
}

impl<T: AhrsTransport> LinkManager<T> {
    /// 由 Builder 调用；执行一次进入 `Unsynced` 的动作（告警 + 清协商标志）
    pub(crate) fn new(
        link: T,
        store: Arc<ObjectStore>,
        config: LinkConfig,
        changes: Arc<PendingChanges>,
        echo: Arc<SelfEchoSuppressor>,
        events: EventBus,
    ) -> Self {
        let gps_gate = GpsGate::new(config.gps.clone());
        let mut manager = Self {
            link,
            store,
            config,
            session: LinkSession::new(),
            changes,
            echo,
            gps_gate,
            timer: PeriodTimer::anchored_now(),
            metrics: Arc::new(LinkMetrics::new()),
            events,
            shared_state: Arc::new(AtomicLinkState::new(LinkState::Unsynced)),
        };
        manager.enter_unsynced();
        manager
    }

    /// 一直推进状态机，直到 `is_running` 被置为 false
    ///
    /// 停止标志在两步之间检查；一步最长为一个周期或一次重试间隔。
    pub fn run(&mut self, is_running: &AtomicBool) {
        info!("AHRS link manager started");
        while is_running.load(Ordering::Acquire) {
            self.step();
        }
        info!("AHRS link manager stopped in state {}", self.session.state);
    }

    /// 链路失败：计入对应错误计数，包装成 `CommsError`
    pub(crate) fn link_failure(&mut self, step: LinkStep, source: LinkError) -> CommsError {
        if let Some(kind) = step.error_kind() {
            self.session.record_error(kind);
        }
        CommsError::Step { step, source }
    }

    /// 会话失效前的日志、指标和事件
    pub(crate) fn report_failure(&mut self, err: &CommsError) {
        warn!("AHRS link failure: {}", err);
        LinkMetrics::incr(&self.metrics.step_failures);
        if let Some(step) = err.failed_step() {
            self.events.emit(
                LinkEvent::StepFailed {
                    step,
                    error: err.to_string(),
                },
                &self.metrics,
            );
        }
    }
}

impl<T> LinkManager<T> {
    pub fn state(&self) -> LinkState {
        self.session.state
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.link
    }

    pub fn metrics(&self) -> LinkMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 某个输入对象是否有尚未消费的变更
    pub fn changes_pending(&self, flag: ChangeFlag) -> bool {
        self.changes.is_pending(flag)
    }

    pub(crate) fn metrics_handle(&self) -> Arc<LinkMetrics> {
        self.metrics.clone()
    }

    pub(crate) fn shared_state(&self) -> Arc<AtomicLinkState> {
        self.shared_state.clone()
    }

    /// 新增一个事件订阅（容量取自配置）
    pub fn subscribe(&mut self) -> Receiver<LinkEvent> {
        let (tx, rx) = events::channel(self.config.event_capacity);
        self.events.add(tx);
        rx
    }

    pub fn add_event_sender(&mut self, sender: Sender<LinkEvent>) {
        self.events.add(sender);
    }
}
