//! # Redis健康状态存储
//!
//! 健康报告以JSON写入外部KV store，监控端按键读取。

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::debug;
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::{HealthReport, HealthStore};

pub struct RedisHealthStore {
    manager: ConnectionManager,
}

impl RedisHealthStore {
    pub async fn new(url: &str) -> WarehouseResult<Self> {
        let client = Client::open(url)
            .map_err(|e| WarehouseError::HealthStore(format!("创建Redis客户端失败: {e}")))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| WarehouseError::HealthStore(format!("连接Redis失败: {e}")))?;

        debug!("成功连接到Redis: {}", url);
        Ok(Self { manager })
    }
}

#[async_trait]
impl HealthStore for RedisHealthStore {
    async fn publish(&self, key: &str, report: &HealthReport) -> WarehouseResult<()> {
        let payload = serde_json::to_string(report)?;
        let mut conn = self.manager.clone();
        let _: () = conn
            .set(key, payload)
            .await
            .map_err(|e| WarehouseError::HealthStore(format!("写入健康报告 {key} 失败: {e}")))?;
        debug!("健康报告已发布: {}", key);
        Ok(())
    }
}
