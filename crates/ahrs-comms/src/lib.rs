//! # AHRS Link Manager
//!
//! 让飞控与 AHRS 协处理器保持同步的周期性实时任务：
//!
//! 1. **同步**：resync → 身份握手 → 稳态循环；任何链路故障回到起点，永远重试
//! 2. **配置协商**：Home 磁场参考、传感器标定、算法选择，各自可独立重新下发
//! 3. **周期交换**：原始采样和/或融合姿态、位置，含 GPS 质量门
//! 4. **状态发布**：五类错误计数、协商标志、设备性能统计
//!
//! # 线程模型
//!
//! - 一个专用线程（`ahrs-comms`）运行状态机，传输调用同步阻塞，同一时刻最多一个请求在途
//! - 存储回调在写入者线程上运行，只置原子位，不阻塞、不触碰传输
//! - 稳态周期使用绝对截止时间（`spin_sleep`），超时记警告并重新锚定
//!
//! # 使用示例
//!
//! ```rust
//! use ahrs_comms::{LinkManagerBuilder, LinkState};
//! use ahrs_store::{AhrsSettings, AhrsStatus, ObjectStore};
//! use opahrs_link::MockTransport;
//! use std::sync::Arc;
//!
//! let store = Arc::new(ObjectStore::new());
//! store.set(AhrsSettings { update_period_ms: 1, ..Default::default() });
//!
//! let mut manager = LinkManagerBuilder::new(MockTransport::new())
//!     .store(store.clone())
//!     .build()
//!     .unwrap();
//!
//! while manager.step() != LinkState::Steady {}
//! manager.step();
//!
//! let status = store.get::<AhrsStatus>();
//! assert!(status.home_set && status.calibration_set && status.algorithm_set);
//! ```

mod builder;
pub mod changes;
pub mod codec;
mod config;
mod error;
pub mod events;
mod exchanger;
mod gps_gate;
mod manager;
mod metrics;
mod negotiator;
mod session;
mod status;
mod sync;
mod task;
mod timer;

pub use builder::LinkManagerBuilder;
pub use changes::{ChangeFlag, PendingChanges, SelfEchoSuppressor};
pub use config::{GpsGateConfig, LinkConfig};
pub use error::{CommsError, LinkStep};
pub use events::LinkEvent;
pub use gps_gate::GpsGate;
pub use manager::LinkManager;
pub use metrics::{LinkMetrics, LinkMetricsSnapshot};
pub use session::{AtomicLinkState, DevicePerformance, LinkSession, LinkState};
pub use task::LinkTask;
pub use timer::{MIN_PERIOD, PeriodTimer, TickOutcome};

pub use opahrs_link::{AhrsTransport, LinkError};
