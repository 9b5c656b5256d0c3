//! # graphite平面文件指标输出
//!
//! 每个输出周期把整批`<prefix>.<path> <count> <unix_seconds>`文本行
//! 写入文件，整体替换上一批，由外部采集器拉走。

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::MetricsSink;

pub struct GraphiteFileSink {
    path: PathBuf,
}

impl GraphiteFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsSink for GraphiteFileSink {
    async fn write_batch(&self, batch: &str) -> WarehouseResult<()> {
        tokio::fs::write(&self.path, batch).await.map_err(|e| {
            WarehouseError::MetricsSink(format!("写入指标文件 {} 失败: {e}", self.path.display()))
        })?;
        debug!("指标批次已写入: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_batch_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.out");
        let sink = GraphiteFileSink::new(&path);

        sink.write_batch("warehouse.event.health.tasks 5 1700000000\n")
            .await
            .unwrap();
        sink.write_batch("warehouse.event.health.tasks 2 1700000060\n")
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        // the second batch fully replaces the first
        assert_eq!(content, "warehouse.event.health.tasks 2 1700000060\n");
    }
}
