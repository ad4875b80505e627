//! 对象单元与订阅回调

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// 对象标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectId {
    AhrsSettings,
    HomeLocation,
    AhrsCalibration,
    BaroAltitude,
    GpsPosition,
    AttitudeSettings,
    AttitudeActual,
    AttitudeRaw,
    PositionActual,
    AhrsStatus,
    SystemAlarms,
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 对象变更回调
///
/// 在写入者线程上同步调用，实现必须非阻塞。
/// 回调内不要对同一对象调用 `connect()`（回调列表读锁仍被持有）。
pub trait ObjectCallback: Send + Sync {
    fn on_object_updated(&self, id: ObjectId);
}

impl<F> ObjectCallback for F
where
    F: Fn(ObjectId) + Send + Sync,
{
    fn on_object_updated(&self, id: ObjectId) {
        self(id)
    }
}

/// 可存入 [`ObjectStore`](crate::ObjectStore) 的对象类型
pub trait UavObject: Clone + Default + Send + Sync + 'static {
    const ID: ObjectId;

    /// 该类型在存储中的单元
    fn cell(store: &crate::ObjectStore) -> &ObjectCell<Self>;
}

/// 单个对象的存储单元：当前快照 + 订阅者
pub struct ObjectCell<T> {
    value: ArcSwap<T>,
    callbacks: RwLock<Vec<Arc<dyn ObjectCallback>>>,
}

impl<T: UavObject> Default for ObjectCell<T> {
    fn default() -> Self {
        Self {
            value: ArcSwap::from_pointee(T::default()),
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl<T: UavObject> ObjectCell<T> {
    /// 当前快照（无锁）
    pub fn load(&self) -> Arc<T> {
        self.value.load_full()
    }

    /// 整体替换并通知订阅者
    pub fn store(&self, value: T) {
        self.value.store(Arc::new(value));
        self.notify();
    }

    /// 读-改-写（与其他写入者竞争时自动重试 `f`）
    pub fn rcu<F>(&self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        self.value.rcu(|current| {
            let mut next = T::clone(current);
            f(&mut next);
            next
        });
        self.notify();
    }

    pub fn subscribe(&self, callback: Arc<dyn ObjectCallback>) {
        self.callbacks.write().push(callback);
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.read().len()
    }

    fn notify(&self) {
        for callback in self.callbacks.read().iter() {
            callback.on_object_updated(T::ID);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCell")
            .field("value", &self.value.load_full())
            .field("subscribers", &self.callbacks.read().len())
            .finish()
    }
}
