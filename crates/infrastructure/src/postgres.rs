//! # Postgres持久化适配
//!
//! 实现`DataService`端口，只触碰核心读写的那几个字段。
//! 统计重算全部基于COUNT聚合重读当前状态，而不是事件载荷，
//! 因此防抖合并掉中间事件不会丢失信息。

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::{DataService, DatasetPatch};

pub struct PostgresDataService {
    pool: PgPool,
}

impl PostgresDataService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataService for PostgresDataService {
    async fn find_archived_dataset(
        &self,
        task_id: &str,
        output_id: &str,
    ) -> WarehouseResult<Option<String>> {
        // removed=false: 已归档
        // removed=true 且状态不在 storing/failed: 用户有理由删除过，不再重新归档
        let dataset_id = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id FROM datasets
            WHERE prov_task_id = $1 AND prov_output_id = $2
              AND (removed = FALSE
                   OR (removed = TRUE AND status NOT IN ('storing', 'failed')))
            LIMIT 1
            "#,
        )
        .bind(task_id)
        .bind(output_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WarehouseError::database(format!("查询归档数据集失败: {e}")))?;

        Ok(dataset_id)
    }

    async fn patch_dataset(&self, dataset_id: &str, patch: &DatasetPatch) -> WarehouseResult<()> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE datasets SET update_date = NOW()");

        if let Some(status) = &patch.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(status_msg) = &patch.status_msg {
            builder.push(", status_msg = ").push_bind(status_msg);
        }
        if let Some(archive_task_id) = &patch.archive_task_id {
            builder.push(", archive_task_id = ").push_bind(archive_task_id);
        }
        if let Some(storage) = &patch.storage {
            builder.push(", storage = ").push_bind(storage);
        }
        if let Some(storage_config) = &patch.storage_config {
            builder
                .push(", storage_config = ")
                .push_bind(sqlx::types::Json(storage_config.clone()));
        }
        if let Some(size) = patch.size {
            builder.push(", size = ").push_bind(size);
        }

        builder.push(" WHERE id = ").push_bind(dataset_id);
        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| WarehouseError::database(format!("更新数据集 {dataset_id} 失败: {e}")))?;

        debug!("数据集 {} 已更新", dataset_id);
        Ok(())
    }

    async fn touch_rule(&self, rule_id: &str) -> WarehouseResult<()> {
        sqlx::query("UPDATE rules SET update_date = NOW() WHERE id = $1")
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                WarehouseError::database(format!("更新规则 {rule_id} update_date失败: {e}"))
            })?;
        Ok(())
    }

    async fn update_rule_stats(&self, rule_id: &str) -> WarehouseResult<()> {
        sqlx::query(
            r#"
            UPDATE rules SET
                stats = jsonb_build_object(
                    'datasets',
                    (SELECT COUNT(*) FROM datasets
                     WHERE rule_id = $1 AND removed = FALSE)
                ),
                stats_update_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(rule_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WarehouseError::database(format!("重算规则 {rule_id} 统计失败: {e}")))?;

        debug!("规则 {} 统计已重算", rule_id);
        Ok(())
    }

    async fn update_project_stats(&self, project_id: &str) -> WarehouseResult<()> {
        sqlx::query(
            r#"
            UPDATE projects SET
                stats = jsonb_build_object(
                    'rules',
                    (SELECT COUNT(*) FROM rules
                     WHERE project_id = $1 AND removed = FALSE),
                    'datasets',
                    (SELECT COUNT(*) FROM datasets
                     WHERE project_id = $1 AND removed = FALSE)
                ),
                stats_update_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WarehouseError::database(format!("重算项目 {project_id} 统计失败: {e}")))?;

        debug!("项目 {} 统计已重算", project_id);
        Ok(())
    }

    async fn update_project_stats_by_group(&self, group_id: &str) -> WarehouseResult<()> {
        let project_id = sqlx::query_scalar::<_, String>(
            "SELECT id FROM projects WHERE group_id = $1 LIMIT 1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WarehouseError::database(format!("按group查找项目失败: {e}")))?;

        match project_id {
            Some(project_id) => self.update_project_stats(&project_id).await,
            None => {
                warn!("group {} 没有对应的项目，跳过统计重算", group_id);
                Ok(())
            }
        }
    }

    async fn update_dataset_stats(&self, project_id: &str) -> WarehouseResult<()> {
        // 按datatype分组计数，开销比项目统计大，调用方用更长的防抖窗口
        sqlx::query(
            r#"
            UPDATE projects SET
                dataset_stats = (
                    SELECT COALESCE(jsonb_object_agg(datatype, cnt), '{}'::jsonb)
                    FROM (
                        SELECT datatype, COUNT(*) AS cnt FROM datasets
                        WHERE project_id = $1 AND removed = FALSE
                        GROUP BY datatype
                    ) AS counts
                ),
                dataset_stats_update_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            WarehouseError::database(format!("重算项目 {project_id} 数据集统计失败: {e}"))
        })?;

        debug!("项目 {} 数据集统计已重算", project_id);
        Ok(())
    }
}
