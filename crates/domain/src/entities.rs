//! # 核心实体
//!
//! 健康报告和对外部协作方的读写载体。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{TaskEvent, TaskOutput};

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCounts {
    pub tasks: u64,
    pub instances: u64,
}

/// 健康报告，每个输出周期重建并整体覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub messages: Vec<String>,
    pub date: DateTime<Utc>,
    pub counts: HealthCounts,
    /// 有效期（毫秒）
    pub maxage: u64,
}

/// 数据集记录的字段级更新
///
/// 只包含归档状态回传涉及的字段，`None`的字段不更新。
#[derive(Debug, Clone, Default)]
pub struct DatasetPatch {
    pub status: Option<String>,
    pub status_msg: Option<String>,
    pub archive_task_id: Option<String>,
    pub storage: Option<String>,
    pub storage_config: Option<serde_json::Value>,
    pub size: Option<i64>,
}

/// 验证器任务的查找条件
///
/// 同一output+task+instance组合最多提交一次验证器。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorQuery {
    pub task_id: String,
    pub output_id: String,
    pub instance_id: String,
    pub service: String,
    pub service_branch: String,
}

/// 验证器任务提交
#[derive(Debug, Clone)]
pub struct ValidatorSubmission {
    pub query: ValidatorQuery,
    pub output: TaskOutput,
    pub subdirs: Option<Vec<String>>,
    pub max_runtime_ms: u64,
    pub remove_date: DateTime<Utc>,
}

impl ValidatorSubmission {
    /// 按固定策略构造：1小时运行上限，7天后自动清理
    pub fn new(task: &TaskEvent, output: &TaskOutput, service: &str, branch: &str) -> Self {
        Self {
            query: ValidatorQuery {
                task_id: task.id.clone(),
                output_id: output.id.clone(),
                instance_id: task.instance_id.clone(),
                service: service.to_string(),
                service_branch: branch.to_string(),
            },
            output: output.clone(),
            subdirs: output.subdir.clone().map(|subdir| vec![subdir]),
            max_runtime_ms: 1000 * 3600,
            remove_date: Utc::now() + chrono::Duration::days(7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_report_serializes_lowercase_status() {
        let report = HealthReport {
            status: HealthStatus::Failed,
            messages: vec!["task event counts is low".to_string()],
            date: Utc::now(),
            counts: HealthCounts {
                tasks: 0,
                instances: 3,
            },
            maxage: 1_200_000,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["counts"]["instances"], 3);
        assert_eq!(value["maxage"], 1_200_000);
    }

    #[test]
    fn test_validator_submission_policy() {
        let task: TaskEvent = serde_json::from_value(serde_json::json!({
            "_id": "t1",
            "instance_id": "i1",
            "service": "brainlife/app-x",
            "status": "finished",
            "user_id": "7"
        }))
        .unwrap();
        let output = TaskOutput {
            id: "out1".to_string(),
            datatype: "58c33bcee13a50849b25879a".to_string(),
            subdir: Some("anat".to_string()),
        };
        let submission =
            ValidatorSubmission::new(&task, &output, "brain-life/validator-neuro-anat", "master");
        assert_eq!(submission.max_runtime_ms, 3_600_000);
        assert_eq!(submission.subdirs.as_deref(), Some(&["anat".to_string()][..]));
        let days = (submission.remove_date - Utc::now()).num_days();
        assert!((6..=7).contains(&days));
    }
}
