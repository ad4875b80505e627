//! 链路事件流
//!
//! 状态转换和步骤失败以事件形式推送给订阅者。
//! 发送一律使用 `try_send`：订阅者处理慢时丢事件，绝不阻塞链路线程。

use crate::error::LinkStep;
use crate::metrics::LinkMetrics;
use crate::session::LinkState;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use opahrs_protocol::SERIAL_LEN;

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    StateChanged { from: LinkState, to: LinkState },
    /// 身份握手成功
    Identified { serial: [u8; SERIAL_LEN] },
    StepFailed { step: LinkStep, error: String },
}

/// 创建一个事件订阅通道
pub fn channel(capacity: usize) -> (Sender<LinkEvent>, Receiver<LinkEvent>) {
    bounded(capacity.max(1))
}

#[derive(Debug, Default)]
pub(crate) struct EventBus {
    senders: Vec<Sender<LinkEvent>>,
}

impl EventBus {
    pub(crate) fn add(&mut self, sender: Sender<LinkEvent>) {
        self.senders.push(sender);
    }

    pub(crate) fn emit(&mut self, event: LinkEvent, metrics: &LinkMetrics) {
        self.senders.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                LinkMetrics::incr(&metrics.events_dropped);
                true
            },
            // 订阅者已离开
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
