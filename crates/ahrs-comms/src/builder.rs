//! Builder 模式实现
//!
//! 把传输、存储、配置和事件订阅装配成 [`LinkManager`]，或直接在独立线程上运行。

use crate::changes::{ChangeTracker, PendingChanges, SelfEchoSuppressor};
use crate::config::LinkConfig;
use crate::error::CommsError;
use crate::events::{EventBus, LinkEvent};
use crate::manager::LinkManager;
use crate::task::LinkTask;
use ahrs_store::ObjectStore;
use crossbeam_channel::Sender;
use opahrs_link::AhrsTransport;
use std::sync::Arc;
use tracing::debug;

/// LinkManager Builder（链式构造）
///
/// # Example
///
/// ```rust
/// use ahrs_comms::{LinkConfig, LinkManagerBuilder, LinkState};
/// use ahrs_store::ObjectStore;
/// use opahrs_link::MockTransport;
/// use std::sync::Arc;
///
/// let store = Arc::new(ObjectStore::new());
/// let mut manager = LinkManagerBuilder::new(MockTransport::new())
///     .store(store.clone())
///     .config(LinkConfig::default())
///     .build()
///     .unwrap();
///
/// assert_eq!(manager.step(), LinkState::Identifying);
/// assert_eq!(manager.step(), LinkState::Steady);
/// ```
pub struct LinkManagerBuilder<T> {
    transport: T,
    store: Option<Arc<ObjectStore>>,
    config: LinkConfig,
    event_senders: Vec<Sender<LinkEvent>>,
}

impl<T: AhrsTransport> LinkManagerBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            store: None,
            config: LinkConfig::default(),
            event_senders: Vec::new(),
        }
    }

    /// 共享对象存储（可选，默认新建一个）
    pub fn store(mut self, store: Arc<ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// 追加一个事件订阅者
    ///
    /// 线程模式下只能在这里订阅，通道用 [`events::channel`](crate::events::channel) 创建。
    pub fn event_sender(mut self, sender: Sender<LinkEvent>) -> Self {
        self.event_senders.push(sender);
        self
    }

    /// 构建管理器（手动步进）
    ///
    /// # Errors
    /// - `CommsError::InvalidConfig`: 配置校验失败
    pub fn build(self) -> Result<LinkManager<T>, CommsError> {
        self.config.validate()?;

        let store = self.store.unwrap_or_default();
        let changes = Arc::new(PendingChanges::new());
        let echo = Arc::new(SelfEchoSuppressor::new());
        ChangeTracker::new(changes.clone(), echo.clone()).connect(&store);

        let mut events = EventBus::default();
        for sender in self.event_senders {
            events.add(sender);
        }
        debug!("link manager built with {} event subscribers", events.len());

        Ok(LinkManager::new(
            self.transport,
            store,
            self.config,
            changes,
            echo,
            events,
        ))
    }
}

impl<T: AhrsTransport + Send + 'static> LinkManagerBuilder<T> {
    /// 构建并在名为 `ahrs-comms` 的线程上运行
    ///
    /// # Errors
    /// - `CommsError::InvalidConfig`: 配置校验失败
    /// - `CommsError::Io`: 线程创建失败
    pub fn spawn(self) -> Result<LinkTask, CommsError> {
        LinkTask::spawn(self.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GpsGateConfig;
    use crate::events;
    use crate::session::LinkState;
    use ahrs_store::{AlarmId, AlarmSeverity, BaroAltitude};
    use opahrs_link::MockTransport;

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = LinkConfig {
            gps: GpsGateConfig {
                hysteresis_limit: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = LinkManagerBuilder::new(MockTransport::new()).config(config).build();
        assert!(matches!(result, Err(CommsError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_subscribes_to_store() {
        let store = Arc::new(ObjectStore::new());
        let manager = LinkManagerBuilder::new(MockTransport::new())
            .store(store.clone())
            .build()
            .unwrap();
        store.set(BaroAltitude { altitude: 1.0 });
        assert!(manager.changes.is_pending(crate::changes::ChangeFlag::Baro));
        assert_eq!(store.alarm(AlarmId::AhrsComms), AlarmSeverity::Critical);
    }

    #[test]
    fn test_event_sender_receives_transitions() {
        let (tx, rx) = events::channel(8);
        let mut manager = LinkManagerBuilder::new(MockTransport::new())
            .event_sender(tx)
            .build()
            .unwrap();
        manager.step();
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::StateChanged {
                from: LinkState::Unsynced,
                to: LinkState::Identifying
            }
        );
    }
}
