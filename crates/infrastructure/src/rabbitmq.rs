//! # RabbitMQ连接管理
//!
//! 建立到消息代理的连接，声明持久化队列并绑定到事件交换机，
//! 创建手动确认模式的消费者。队列和绑定的重复声明是幂等的。

use std::time::Duration;

use lapin::{
    options::{
        BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use tracing::{debug, info};
use warehouse_config::AmqpConfig;
use warehouse_core::{WarehouseError, WarehouseResult};

/// RabbitMQ连接包装
pub struct RabbitMq {
    connection: Connection,
    channel: Channel,
}

impl RabbitMq {
    /// 建立连接并打开通道
    ///
    /// 启动阶段的连接失败是致命的，直接向上传播。
    pub async fn connect(config: &AmqpConfig) -> WarehouseResult<Self> {
        let connect = Connection::connect(&config.url, ConnectionProperties::default());
        let connection = tokio::time::timeout(
            Duration::from_secs(config.connection_timeout_seconds),
            connect,
        )
        .await
        .map_err(|_| {
            WarehouseError::message_queue(format!(
                "连接RabbitMQ超时 ({}秒)",
                config.connection_timeout_seconds
            ))
        })?
        .map_err(|e| WarehouseError::message_queue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| WarehouseError::message_queue(format!("创建通道失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", config.url);

        Ok(Self {
            connection,
            channel,
        })
    }

    /// 声明持久化队列并绑定到topic交换机
    ///
    /// 队列不随消费者下线删除，事件处理进程重启期间的消息会保留在队列里。
    pub async fn declare_bound_queue(
        &self,
        queue: &str,
        exchange: &str,
        patterns: &[&str],
    ) -> WarehouseResult<()> {
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                WarehouseError::message_queue(format!("声明交换机 {exchange} 失败: {e}"))
            })?;

        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| WarehouseError::message_queue(format!("声明队列 {queue} 失败: {e}")))?;

        for pattern in patterns {
            self.channel
                .queue_bind(
                    queue,
                    exchange,
                    pattern,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    WarehouseError::message_queue(format!(
                        "绑定队列 {queue} 到 {exchange}/{pattern} 失败: {e}"
                    ))
                })?;
        }

        debug!("队列 {} 已绑定到交换机 {}", queue, exchange);
        Ok(())
    }

    /// 创建手动确认模式的消费者
    ///
    /// `BasicConsumeOptions`默认`no_ack: false`，消息在消费者显式ack之前
    /// 不会从队列游标上移除。
    pub async fn consumer(&self, queue: &str, consumer_tag: &str) -> WarehouseResult<Consumer> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| WarehouseError::message_queue(format!("创建消费者失败: {e}")))?;

        debug!("为队列 {} 创建消费者: {}", queue, consumer_tag);
        Ok(consumer)
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭连接
    pub async fn close(&self) -> WarehouseResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| WarehouseError::message_queue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}
