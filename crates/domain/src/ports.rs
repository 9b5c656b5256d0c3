//! # 外部协作方端口
//!
//! 核心只通过这些trait和外部系统交互：持久化、任务API、Slack、
//! 健康状态存储和指标输出。实现位于infrastructure crate，
//! 测试用的内存mock位于testing-utils crate。

use async_trait::async_trait;
use warehouse_core::WarehouseResult;

use crate::entities::{DatasetPatch, HealthReport, ValidatorQuery, ValidatorSubmission};
use crate::events::{TaskEvent, TaskOutput};

/// 持久化协作方
///
/// 只读写核心关心的字段，统计重算基于当前状态而不是消息载荷。
#[async_trait]
pub trait DataService: Send + Sync {
    /// 查找某个task输出对应的已归档（或被用户主动删除的）数据集，
    /// 返回数据集id。找不到说明该输出还需要归档。
    ///
    /// 匹配条件：`prov.task_id`/`prov.output_id`一致，且
    /// 未删除，或已删除但状态不在 storing/failed 之列
    /// （用户有理由删除的不再重新归档）。
    async fn find_archived_dataset(
        &self,
        task_id: &str,
        output_id: &str,
    ) -> WarehouseResult<Option<String>>;

    /// 字段级更新数据集记录
    async fn patch_dataset(&self, dataset_id: &str, patch: &DatasetPatch) -> WarehouseResult<()>;

    /// 更新规则的update_date，促使规则引擎重新评估
    async fn touch_rule(&self, rule_id: &str) -> WarehouseResult<()>;

    /// 重算规则统计
    async fn update_rule_stats(&self, rule_id: &str) -> WarehouseResult<()>;

    /// 重算项目统计
    async fn update_project_stats(&self, project_id: &str) -> WarehouseResult<()>;

    /// 按实例的group id重算项目统计
    async fn update_project_stats_by_group(&self, group_id: &str) -> WarehouseResult<()>;

    /// 重算项目的数据集统计（开销较大，调用方应加长防抖窗口）
    async fn update_dataset_stats(&self, project_id: &str) -> WarehouseResult<()>;
}

/// 任务执行API（amaretti）协作方
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// 查找是否已为该output+task+instance组合提交过验证器任务
    async fn find_validator_task(
        &self,
        query: &ValidatorQuery,
    ) -> WarehouseResult<Option<String>>;

    /// 用范围JWT提交验证器任务
    async fn submit_validator(
        &self,
        submission: &ValidatorSubmission,
        user_jwt: &str,
    ) -> WarehouseResult<()>;

    /// 给用户签发临时的archiver范围JWT
    async fn issue_archiver_jwt(&self, user_id: &str) -> WarehouseResult<String>;

    /// 为尚未归档的输出提交归档任务
    async fn archive_outputs(
        &self,
        task: &TaskEvent,
        outputs: &[TaskOutput],
    ) -> WarehouseResult<()>;
}

/// 邀请协作方（Slack）
///
/// 尽力而为：失败只记日志，不影响触发它的事件流。
/// 跨进程重放没有幂等保证，依赖下游API自身的resend语义。
#[async_trait]
pub trait InviteService: Send + Sync {
    async fn invite(&self, email: &str, real_name: &str) -> WarehouseResult<()>;
}

/// 健康状态存储协作方（外部KV store）
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn publish(&self, key: &str, report: &HealthReport) -> WarehouseResult<()>;
}

/// 指标输出协作方
///
/// 每个输出周期接收一整批graphite格式的文本行，整体替换上一批。
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write_batch(&self, batch: &str) -> WarehouseResult<()>;
}
