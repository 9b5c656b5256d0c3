//! # 指标计数器
//!
//! 从指标路径到计数的内存映射。处理器同步递增，
//! 健康上报周期整体取走并清零，不跨周期持久化。

use std::collections::HashMap;
use std::sync::Mutex;

/// 常用计数路径
pub mod paths {
    pub const HEALTH_TASKS: &str = "health.tasks";
    pub const HEALTH_INSTANCES: &str = "health.instances";
    pub const AUTH_LOGIN: &str = "auth.login";
}

/// 写多读少的计数器存储
///
/// 多条队列的处理器可能并发递增，drain相对递增是原子的：
/// 取走和清零在同一把锁内完成，不会丢计数。
#[derive(Debug, Default)]
pub struct CounterStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 路径不存在时以1创建，否则加1
    pub fn increment(&self, path: &str) {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *counts.entry(path.to_string()).or_insert(0) += 1;
    }

    /// 原子地取走当前全部计数并清零
    pub fn drain(&self) -> HashMap<String, u64> {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_and_drain() {
        let store = CounterStore::new();
        store.increment("health.tasks");
        store.increment("health.tasks");
        store.increment("task.user.12.finished");

        let counts = store.drain();
        assert_eq!(counts.get("health.tasks"), Some(&2));
        assert_eq!(counts.get("task.user.12.finished"), Some(&1));
    }

    #[test]
    fn test_drain_twice_yields_empty() {
        let store = CounterStore::new();
        store.increment("health.tasks");
        assert!(!store.drain().is_empty());
        assert!(store.drain().is_empty());
    }

    #[tokio::test]
    async fn test_no_increment_lost_across_drains() {
        let store = Arc::new(CounterStore::new());
        let total_increments = 1000u64;

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..total_increments {
                    store.increment("health.tasks");
                    tokio::task::yield_now().await;
                }
            })
        };

        // drain repeatedly while the writer is running
        let mut drained = 0u64;
        while !writer.is_finished() {
            drained += store.drain().get("health.tasks").copied().unwrap_or(0);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        drained += store.drain().get("health.tasks").copied().unwrap_or(0);

        // the sum over all drains equals the number of increments
        assert_eq!(drained, total_increments);
    }
}
