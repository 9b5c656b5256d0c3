//! # 健康上报周期
//!
//! 固定周期取走计数器快照：先把每条计数以graphite平面格式写给指标
//! 输出方，再根据任务事件计数推导健康结论，发布到外部KV store。
//! 消费管线停摆的信号是一个周期内任务事件计数恰好为零。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use warehouse_config::{HealthConfig, MetricsConfig};
use warehouse_core::WarehouseResult;
use warehouse_domain::{HealthCounts, HealthReport, HealthStatus, HealthStore, MetricsSink};

use crate::counters::{paths, CounterStore};

pub struct HealthReporter {
    counters: Arc<CounterStore>,
    health_store: Arc<dyn HealthStore>,
    metrics_sink: Arc<dyn MetricsSink>,
    prefix: String,
    health_key: String,
    interval: Duration,
    maxage: Duration,
}

impl HealthReporter {
    pub fn new(
        counters: Arc<CounterStore>,
        health_store: Arc<dyn HealthStore>,
        metrics_sink: Arc<dyn MetricsSink>,
        metrics: &MetricsConfig,
        health: &HealthConfig,
        instance: &str,
    ) -> Self {
        Self {
            counters,
            health_store,
            metrics_sink,
            prefix: metrics.prefix.clone(),
            health_key: format!("health.warehouse.event.{instance}"),
            interval: Duration::from_secs(metrics.interval_seconds),
            maxage: Duration::from_secs(health.maxage_seconds),
        }
    }

    pub fn health_key(&self) -> &str {
        &self.health_key
    }

    /// 周期运行直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval的第一个tick立即返回，跳过以免启动即报failed
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.emit_once().await {
                        error!("健康上报失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("健康上报循环退出");
                    break;
                }
            }
        }
    }

    /// 执行一个完整的上报周期
    ///
    /// 指标输出失败不拦截健康发布：计数已经取走，健康键不更新
    /// 会让监控端把仍在消费的进程判死。先发布报告，再上抛输出错误。
    pub async fn emit_once(&self) -> WarehouseResult<()> {
        let counts = self.counters.drain();
        let now = Utc::now();

        let batch = format_batch(&self.prefix, &counts, now.timestamp());
        let sink_result = self.metrics_sink.write_batch(&batch).await;
        if let Err(e) = &sink_result {
            error!("写入指标批次失败: {}", e);
        }

        let report = self.build_report(&counts, now);
        if report.status == HealthStatus::Failed {
            debug!("本周期没有任务事件，健康状态降级为failed");
        }
        self.health_store.publish(&self.health_key, &report).await?;
        sink_result
    }

    fn build_report(&self, counts: &HashMap<String, u64>, date: DateTime<Utc>) -> HealthReport {
        let tasks = counts.get(paths::HEALTH_TASKS).copied().unwrap_or(0);
        let instances = counts.get(paths::HEALTH_INSTANCES).copied().unwrap_or(0);

        let mut report = HealthReport {
            status: HealthStatus::Ok,
            messages: Vec::new(),
            date,
            counts: HealthCounts { tasks, instances },
            // 至少是检查周期的两倍，监控端才能区分"慢"和"死"
            maxage: self.maxage.as_millis() as u64,
        };
        if tasks == 0 {
            report.status = HealthStatus::Failed;
            report.messages.push("task event counts is low".to_string());
        }
        report
    }
}

/// 拼一批graphite平面文本行，键排序保证输出稳定
fn format_batch(prefix: &str, counts: &HashMap<String, u64>, unix_seconds: i64) -> String {
    let mut keys: Vec<&String> = counts.keys().collect();
    keys.sort();

    let mut out = String::new();
    for key in keys {
        out.push_str(&format!("{prefix}.{key} {} {unix_seconds}\n", counts[key]));
    }
    out
}
