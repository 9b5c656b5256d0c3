//! # 队列订阅框架
//!
//! 在代理上声明五条持久化队列并绑定到各事件交换机，每条队列
//! 一个独立的消费任务，按序逐条处理。消息严格在处理器交还完成
//! 令牌之后才确认——处理失败也确认（记日志，不重试），宁可丢一个
//! 副作用也不让整条队列停摆；进程在ack前崩溃则消息会被重投，
//! 交付语义是at-least-once。

use std::sync::Arc;

use futures::StreamExt;
use lapin::options::BasicAckOptions;
use lapin::Consumer;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::{AuthEvent, DatasetEvent, InstanceEvent, TaskEvent};
use warehouse_infrastructure::RabbitMq;

use crate::completion::Completion;
use crate::context::EventContext;
use crate::handlers;

/// 逻辑事件流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Instance,
    Task,
    Dataset,
    Rule,
    Auth,
}

/// 一条队列的声明参数
#[derive(Debug)]
pub struct QueueSpec {
    pub queue: &'static str,
    pub exchange: &'static str,
    pub patterns: &'static [&'static str],
    pub stream: StreamKind,
}

/// 五条事件流的队列拓扑，全部持久化、不自动删除
pub const TOPOLOGY: &[QueueSpec] = &[
    QueueSpec {
        queue: "warehouse.instance",
        exchange: "wf.instance",
        patterns: &["#"],
        stream: StreamKind::Instance,
    },
    QueueSpec {
        queue: "warehouse.task",
        exchange: "wf.task",
        patterns: &["#"],
        stream: StreamKind::Task,
    },
    QueueSpec {
        queue: "warehouse.dataset",
        exchange: "warehouse.dataset",
        patterns: &["#"],
        stream: StreamKind::Dataset,
    },
    QueueSpec {
        queue: "warehouse.rule",
        exchange: "warehouse",
        patterns: &["rule.update.#"],
        stream: StreamKind::Rule,
    },
    QueueSpec {
        queue: "auth",
        exchange: "auth",
        patterns: &["user.create.*", "user.login.*"],
        stream: StreamKind::Auth,
    },
];

/// 按事件流解码消息并分发给对应的处理器
///
/// 解码失败和处理失败一样产出failed令牌，消息照常确认。
pub async fn dispatch(
    ctx: &EventContext,
    stream: StreamKind,
    routing_key: &str,
    payload: &[u8],
) -> Completion {
    match stream {
        StreamKind::Task => match decode::<TaskEvent>("任务", payload) {
            Ok(task) => handlers::task::handle_task(ctx, &task).await,
            Err(e) => Completion::failed(e),
        },
        StreamKind::Instance => match decode::<InstanceEvent>("实例", payload) {
            Ok(instance) => handlers::instance::handle_instance(ctx, &instance).await,
            Err(e) => Completion::failed(e),
        },
        StreamKind::Dataset => match decode::<DatasetEvent>("数据集", payload) {
            Ok(dataset) => handlers::dataset::handle_dataset(ctx, &dataset).await,
            Err(e) => Completion::failed(e),
        },
        StreamKind::Rule => handlers::rule::handle_rule_update(ctx, routing_key).await,
        StreamKind::Auth => match decode::<AuthEvent>("认证", payload) {
            Ok(event) => handlers::auth::handle_auth(ctx, routing_key, &event).await,
            Err(e) => Completion::failed(e),
        },
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, payload: &[u8]) -> WarehouseResult<T> {
    serde_json::from_slice(payload)
        .map_err(|e| WarehouseError::invalid_message(format!("{kind}事件解析失败: {e}")))
}

/// 事件订阅器
pub struct EventSubscriber {
    broker: Arc<RabbitMq>,
    ctx: Arc<EventContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl EventSubscriber {
    pub fn new(broker: Arc<RabbitMq>, ctx: Arc<EventContext>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            broker,
            ctx,
            shutdown_tx,
        }
    }

    /// 声明全部队列拓扑并启动各自的消费循环
    ///
    /// 启动阶段的代理错误是致命的，向上传播；进入消费循环之后
    /// 的错误只记日志。
    pub async fn start(&self) -> WarehouseResult<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(TOPOLOGY.len());
        for spec in TOPOLOGY {
            debug!("订阅事件流: {}", spec.queue);
            self.broker
                .declare_bound_queue(spec.queue, spec.exchange, spec.patterns)
                .await?;
            let consumer = self
                .broker
                .consumer(spec.queue, &format!("warehouse.event.{}", spec.queue))
                .await?;

            let ctx = Arc::clone(&self.ctx);
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(consume_loop(consumer, ctx, spec, shutdown_rx)));
        }
        info!("完成所有队列订阅");
        Ok(handles)
    }

    /// 通知全部消费循环退出
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// 单条队列的消费循环，消息逐条处理、处理完成后确认
async fn consume_loop(
    mut consumer: Consumer,
    ctx: Arc<EventContext>,
    spec: &'static QueueSpec,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("队列 {} 消费循环退出", spec.queue);
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    None => {
                        warn!("队列 {} 的消费者流已关闭", spec.queue);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("队列 {} 接收消息失败: {}", spec.queue, e);
                    }
                    Some(Ok(delivery)) => {
                        let routing_key = delivery.routing_key.as_str().to_string();
                        let completion =
                            dispatch(&ctx, spec.stream, &routing_key, &delivery.data).await;
                        if let Some(err) = completion.error() {
                            // 没有死信队列，失败也确认，避免堵住后续事件
                            error!("队列 {} 消息处理失败: {}", spec.queue, err);
                        }
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            error!("队列 {} 确认消息失败: {}", spec.queue, e);
                        }
                    }
                }
            }
        }
    }
}
