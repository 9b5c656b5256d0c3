//! # 防抖引擎
//!
//! 按键合并高频触发：冷键立即执行，热键最多排队一次延迟执行，
//! 保证事件风暴下重算开销有界，同时保证最终会再跑一次。
//!
//! 每个键的`last_run`/`pending`都在同一把锁内评估和更新，
//! 延迟执行和新触发并发到达也不会重复排队或丢触发。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use warehouse_core::WarehouseResult;

/// 单个键的防抖状态
///
/// 不变式：任一时刻每个键至多一个排队中的延迟执行；`last_run`单调不减。
#[derive(Debug)]
struct DebounceEntry {
    /// None表示冷键（从未执行过）
    last_run: Option<Instant>,
    pending: bool,
}

enum Decision {
    RunNow,
    Coalesced,
    Defer { wait: Duration, fire_at: Instant },
}

/// 键空间以活跃实体数为界，条目懒创建、进程生命周期内不回收
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    entries: Arc<Mutex<HashMap<String, DebounceEntry>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 调度一次动作
    ///
    /// 动作必须幂等。冷却窗口之外立即执行；窗口之内若尚无排队执行
    /// 则安排在`last_run + delay`时刻执行，否则本次触发被合并。
    ///
    /// 动作失败只记日志，不重试，也不回退`last_run`——防抖动作
    /// 重读当前状态而不是消息载荷，下一次触发自然会补上。
    pub async fn schedule<F, Fut>(&self, key: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = WarehouseResult<()>> + Send + 'static,
    {
        let now = Instant::now();
        let decision = {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(key.to_string()).or_insert(DebounceEntry {
                last_run: None,
                pending: false,
            });
            match entry.last_run {
                // 冷却窗口内
                Some(last_run) if last_run + delay > now => {
                    if entry.pending {
                        Decision::Coalesced
                    } else {
                        let fire_at = last_run + delay;
                        entry.pending = true;
                        Decision::Defer {
                            wait: fire_at - now,
                            fire_at,
                        }
                    }
                }
                // 冷键，或者窗口已过
                _ => {
                    entry.last_run = Some(now);
                    Decision::RunNow
                }
            }
        };

        match decision {
            Decision::RunNow => {
                if let Err(e) = action().await {
                    warn!("防抖动作 {} 执行失败: {}", key, e);
                }
            }
            Decision::Coalesced => {
                debug!("防抖动作 {} 已在排队，合并本次触发", key);
            }
            Decision::Defer { wait, fire_at } => {
                let entries = Arc::clone(&self.entries);
                let key = key.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    {
                        let mut entries = entries.lock().await;
                        if let Some(entry) = entries.get_mut(&key) {
                            entry.pending = false;
                            // 记成计划触发时刻而不是实际执行时刻
                            entry.last_run = Some(fire_at);
                        }
                    }
                    if let Err(e) = action().await {
                        warn!("防抖动作 {} 延迟执行失败: {}", key, e);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warehouse_core::WarehouseError;

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> futures::future::Ready<WarehouseResult<()>> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_key_runs_immediately() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));

        debouncer
            .schedule("k", Duration::from_secs(1), counting_action(&runs))
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // nothing else fires later
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_in_window_runs_exactly_twice() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(1);

        // first trigger runs immediately, the rest coalesce into one deferred run
        for _ in 0..10 {
            debouncer.schedule("k", delay, counting_action(&runs)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_cooldown_runs_immediately_once() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(1);

        debouncer.schedule("k", delay, counting_action(&runs)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        debouncer.schedule("k", delay, counting_action(&runs)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new();
        let runs_a = Arc::new(AtomicUsize::new(0));
        let runs_b = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(1);

        debouncer.schedule("a", delay, counting_action(&runs_a)).await;
        debouncer.schedule("b", delay, counting_action(&runs_b)).await;

        // both keys are cold, both run immediately
        assert_eq!(runs_a.load(Ordering::SeqCst), 1);
        assert_eq!(runs_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_run_advances_last_run_to_fire_time() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(10);

        debouncer.schedule("k", delay, counting_action(&runs)).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        // deferred run scheduled for t=10
        debouncer.schedule("k", delay, counting_action(&runs)).await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // t=11: within the new cool-down window (until t=20), so this defers
        debouncer.schedule("k", delay, counting_action(&runs)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_does_not_block_future_scheduling() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(1);

        let failing = {
            let runs = Arc::clone(&runs);
            move || {
                runs.fetch_add(1, Ordering::SeqCst);
                futures::future::ready(Err(WarehouseError::Internal("boom".to_string())))
            }
        };
        debouncer.schedule("k", delay, failing).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        debouncer.schedule("k", delay, counting_action(&runs)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
