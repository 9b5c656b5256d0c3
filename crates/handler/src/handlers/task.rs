//! # 任务事件处理
//!
//! 计数、规则统计防抖重算，以及一条有序的副作用管道：
//! 验证器提交 → 归档提交 → 归档状态回传 → 规则唤醒。
//! 管道任一步失败带着步骤标签短路，错误由订阅循环记日志，
//! 消息仍然会被确认。

use std::time::Duration;

use tracing::{debug, info};
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::entities::ValidatorSubmission;
use warehouse_domain::events::task_status;
use warehouse_domain::{DatasetPatch, TaskEvent, TaskOutput};

use crate::completion::Completion;
use crate::context::EventContext;
use crate::counters::paths;

/// 规则统计重算的防抖窗口
const RULE_STATS_DEBOUNCE: Duration = Duration::from_secs(1);

pub async fn handle_task(ctx: &EventContext, task: &TaskEvent) -> Completion {
    debug!(
        "{} task:{} {} {} {}",
        if task.status_changed { "+++" } else { "---" },
        task.id,
        task.service,
        task.status,
        task.status_msg.as_deref().unwrap_or(""),
    );

    ctx.counters.increment(paths::HEALTH_TASKS);

    // 这些计数在graphite侧聚合成各维度的柱状图
    if task.status_changed {
        ctx.counters
            .increment(&format!("task.user.{}.{}", task.user_id, task.status));
        if let Some(app) = &task.config.app {
            ctx.counters
                .increment(&format!("task.app.{}.{}", app, task.status));
        }
        if let Some(resource_id) = &task.resource_id {
            ctx.counters
                .increment(&format!("task.resource.{}.{}", resource_id, task.status));
        }
        if let Some(group_id) = &task.group_id {
            ctx.counters
                .increment(&format!("task.group.{}.{}", group_id, task.status));
        }

        if let Some(rule) = &task.config.rule {
            debug!("规则提交的任务状态发生变化");
            let data = ctx.data.clone();
            let rule_id = rule.id.clone();
            ctx.debounce
                .schedule(
                    &format!("update_rule_stats.{}", rule.id),
                    RULE_STATS_DEBOUNCE,
                    move || async move { data.update_rule_stats(&rule_id).await },
                )
                .await;
        }
    }

    Completion::from_result(run_pipeline(ctx, task).await)
}

/// 有序的副作用管道，每一步的失败带步骤标签短路后续步骤
async fn run_pipeline(ctx: &EventContext, task: &TaskEvent) -> WarehouseResult<()> {
    submit_validators(ctx, task)
        .await
        .map_err(|e| WarehouseError::handler_step("submit_validators", e))?;
    submit_archivers(ctx, task)
        .await
        .map_err(|e| WarehouseError::handler_step("submit_archivers", e))?;
    propagate_archive_status(ctx, task)
        .await
        .map_err(|e| WarehouseError::handler_step("propagate_archive_status", e))?;
    poke_rule(ctx, task)
        .await
        .map_err(|e| WarehouseError::handler_step("poke_rule", e))?;
    Ok(())
}

/// 对完成任务中允许列表内的输出提交数据类型验证器
async fn submit_validators(ctx: &EventContext, task: &TaskEvent) -> WarehouseResult<()> {
    if !ctx.settings.validators_enabled {
        return Ok(());
    }
    if task.status != task_status::FINISHED || task.config.outputs.is_empty() {
        return Ok(());
    }
    // 不对验证器自己的输出再跑验证器
    if task.service.contains("/validator-") {
        return Ok(());
    }

    info!("处理任务输出 - 验证器");
    for output in &task.config.outputs {
        let Some(service) = ctx.settings.validator_datatypes.get(&output.datatype) else {
            continue;
        };
        let submission = ValidatorSubmission::new(
            task,
            output,
            service,
            &ctx.settings.validator_branch,
        );

        // 同一output+task+instance组合只提交一次
        if let Some(existing) = ctx.tasks.find_validator_task(&submission.query).await? {
            debug!("验证器已提交过: {}", existing);
            continue;
        }

        let user_jwt = ctx.tasks.issue_archiver_jwt(&task.user_id).await?;
        ctx.tasks.submit_validator(&submission, &user_jwt).await?;
    }
    Ok(())
}

/// 只对尚未归档的输出提交归档，避免重复归档
async fn submit_archivers(ctx: &EventContext, task: &TaskEvent) -> WarehouseResult<()> {
    if task.status != task_status::FINISHED || task.config.outputs.is_empty() {
        return Ok(());
    }

    info!("处理任务输出 - 归档");
    let mut unarchived: Vec<TaskOutput> = Vec::new();
    for output in &task.config.outputs {
        match ctx.data.find_archived_dataset(&task.id, &output.id).await? {
            Some(dataset_id) => info!(
                "已归档或被用户删除，跳过 output_id:{} dataset_id:{}",
                output.id, dataset_id
            ),
            None => unarchived.push(output.clone()),
        }
    }

    if unarchived.is_empty() {
        debug!("任务 {} 没有待归档的输出", task.id);
        return Ok(());
    }
    ctx.tasks.archive_outputs(task, &unarchived).await
}

/// 归档服务任务的状态转移回传到每个引用的数据集记录
async fn propagate_archive_status(ctx: &EventContext, task: &TaskEvent) -> WarehouseResult<()> {
    if task.service != ctx.settings.archive_service {
        return Ok(());
    }

    info!("处理归档服务事件");
    for dataset_config in &task.config.datasets {
        let mut patch = DatasetPatch {
            status_msg: task.status_msg.clone(),
            ..Default::default()
        };
        match task.status.as_str() {
            task_status::REQUESTED => {
                patch.archive_task_id = Some(task.id.clone());
            }
            task_status::FINISHED => {
                patch.status = Some(task_status::STORED.to_string());
                patch.storage = dataset_config.storage.clone();
                patch.storage_config = dataset_config.storage_config.clone();
                // 早期的归档服务不产出product，没有就不回传大小
                patch.size = task
                    .product
                    .as_ref()
                    .and_then(|product| product.get(dataset_config.dataset.id.as_str()))
                    .and_then(|dataset_product| dataset_product.get("size"))
                    .and_then(|size| size.as_i64());
            }
            task_status::FAILED => {
                patch.status = Some(task_status::FAILED.to_string());
            }
            _ => {}
        }
        ctx.data
            .patch_dataset(&dataset_config.dataset.id, &patch)
            .await?;
    }
    Ok(())
}

/// 规则提交的任务被删除时更新规则的update_date，触发重新评估
async fn poke_rule(ctx: &EventContext, task: &TaskEvent) -> WarehouseResult<()> {
    if task.status != task_status::REMOVED {
        return Ok(());
    }
    let Some(rule) = &task.config.rule else {
        return Ok(());
    };
    info!("规则提交的任务已删除，更新update_date: {}", rule.id);
    ctx.data.touch_rule(&rule.id).await
}
