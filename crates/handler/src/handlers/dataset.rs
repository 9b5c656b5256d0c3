//! # 数据集创建事件处理

use std::time::Duration;

use tracing::debug;
use warehouse_domain::DatasetEvent;

use crate::completion::Completion;
use crate::context::EventContext;

/// 数据集统计要按datatype分组计数，开销更大，防抖窗口给长一些
const DATASET_STATS_DEBOUNCE: Duration = Duration::from_secs(10);

pub async fn handle_dataset(ctx: &EventContext, dataset: &DatasetEvent) -> Completion {
    debug!("dataset:{}", dataset.id);

    let project_id = dataset.project.id().to_string();
    let data = ctx.data.clone();
    let project = project_id.clone();
    ctx.debounce
        .schedule(
            &format!("update_dataset_stats.{project_id}"),
            DATASET_STATS_DEBOUNCE,
            move || async move { data.update_dataset_stats(&project).await },
        )
        .await;

    Completion::handled()
}
