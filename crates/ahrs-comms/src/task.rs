//! 链路线程
//!
//! `LinkTask` 拥有运行 [`LinkManager`] 的线程。Drop 时置停止标志并带超时 join。

use crate::error::CommsError;
use crate::manager::LinkManager;
use crate::metrics::{LinkMetrics, LinkMetricsSnapshot};
use crate::session::{AtomicLinkState, LinkState};
use ahrs_store::ObjectStore;
use opahrs_link::AhrsTransport;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::error;

const THREAD_NAME: &str = "ahrs-comms";
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 在独立线程上运行的链路管理器
pub struct LinkTask {
    handle: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    state: Arc<AtomicLinkState>,
    metrics: Arc<LinkMetrics>,
    store: Arc<ObjectStore>,
}

impl LinkTask {
    pub(crate) fn spawn<T>(mut manager: LinkManager<T>) -> Result<Self, CommsError>
    where
        T: AhrsTransport + Send + 'static,
    {
        let is_running = Arc::new(AtomicBool::new(true));
        let state = manager.shared_state();
        let metrics = manager.metrics_handle();
        let store = manager.store().clone();
        let realtime = manager.config().realtime_priority;

        let running = is_running.clone();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                if realtime {
                    raise_thread_priority();
                }
                manager.run(&running);
            })?;

        Ok(Self {
            handle: Some(handle),
            is_running,
            state,
            metrics,
            store,
        })
    }

    pub fn state(&self) -> LinkState {
        self.state.get(Ordering::Acquire)
    }

    pub fn metrics(&self) -> LinkMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// 线程是否仍在运行
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 停止线程并等待退出
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "AHRS link thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }
    }
}

impl Drop for LinkTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(feature = "realtime")]
fn raise_thread_priority() {
    use thread_priority::*;
    use tracing::{info, warn};

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("AHRS link thread priority set to MAX (realtime)"),
        Err(e) => warn!(
            "Failed to set AHRS link thread priority: {:?}. \
             On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            e
        ),
    }
}

#[cfg(not(feature = "realtime"))]
fn raise_thread_priority() {
    tracing::warn!("realtime_priority requested but the `realtime` feature is disabled");
}
