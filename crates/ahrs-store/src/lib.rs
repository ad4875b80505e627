//! # AHRS Object Store
//!
//! 飞控共享状态存储的进程内实现：带类型的对象、get/set、变更通知订阅，
//! 以及系统告警对象。
//!
//! # 同步机制
//!
//! - 每个对象是一个 `ArcSwap<T>`：读取无锁，写入整体替换，读者永远看到完整快照
//! - `set()` 替换后在**写入者线程**上同步调用该对象的所有订阅回调
//! - 回调列表由 `parking_lot::RwLock` 保护，只在 `connect()` 时写
//!
//! # 使用示例
//!
//! ```rust
//! use ahrs_store::{BaroAltitude, ObjectId, ObjectStore};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let store = ObjectStore::new();
//! let changed = Arc::new(AtomicBool::new(false));
//!
//! let flag = changed.clone();
//! store.connect::<BaroAltitude>(Arc::new(move |_id: ObjectId| {
//!     flag.store(true, Ordering::Release);
//! }));
//!
//! store.set(BaroAltitude { altitude: 120.0 });
//! assert!(changed.load(Ordering::Acquire));
//! assert_eq!(store.get::<BaroAltitude>().altitude, 120.0);
//! ```

mod alarms;
mod object;
mod objects;
mod store;

pub use alarms::{AlarmId, AlarmSeverity, SystemAlarms};
pub use object::{ObjectCallback, ObjectCell, ObjectId, UavObject};
pub use objects::*;
pub use store::ObjectStore;
