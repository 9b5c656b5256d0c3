//! # 事件消息实体
//!
//! 上游各交换机投递的事件消息的线格式，字段名和原始消息保持一致
//! （mongo风格的`_id`、消息自带的`_status_changed`标记等）。
//! 核心只读取这里列出的字段，未知字段一律忽略。

use serde::{Deserialize, Serialize};
use warehouse_core::{WarehouseError, WarehouseResult};

/// 任务状态常量
///
/// 状态值由上游任务平台定义，这里只列出处理逻辑关心的几个。
pub mod task_status {
    pub const REQUESTED: &str = "requested";
    pub const FINISHED: &str = "finished";
    pub const FAILED: &str = "failed";
    pub const REMOVED: &str = "removed";
    pub const STORING: &str = "storing";
    pub const STORED: &str = "stored";
}

/// 任务事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub instance_id: String,
    pub service: String,
    pub status: String,
    #[serde(default)]
    pub status_msg: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default, rename = "_group_id")]
    pub group_id: Option<String>,
    /// 状态是否真的发生了变化，以消息携带的标记为准，不在本地推导
    #[serde(default, rename = "_status_changed")]
    pub status_changed: bool,
    #[serde(default)]
    pub config: TaskEventConfig,
    /// 任务产物，归档服务用它回报每个数据集的大小
    #[serde(default)]
    pub product: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskEventConfig {
    #[serde(default, rename = "_app")]
    pub app: Option<String>,
    #[serde(default, rename = "_rule")]
    pub rule: Option<RuleRef>,
    #[serde(default, rename = "_outputs")]
    pub outputs: Vec<TaskOutput>,
    /// 归档服务任务的数据集清单
    #[serde(default)]
    pub datasets: Vec<ArchiveDatasetConfig>,
}

/// 提交该任务的规则引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRef {
    pub id: String,
}

/// 任务声明的输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub id: String,
    pub datatype: String,
    #[serde(default)]
    pub subdir: Option<String>,
}

/// 归档服务任务config.datasets中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDatasetConfig {
    pub dataset: DatasetRef,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub storage_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRef {
    #[serde(rename = "_id")]
    pub id: String,
}

/// 实例事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default, rename = "_status_changed")]
    pub status_changed: bool,
}

/// 数据集创建事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: ProjectField,
}

/// project字段可能是裸id，也可能是已填充的project对象
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectField {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl ProjectField {
    pub fn id(&self) -> &str {
        match self {
            ProjectField::Id(id) => id,
            ProjectField::Populated { id } => id,
        }
    }
}

/// 认证事件（user.create.* / user.login.*）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// 规则更新事件的路由键解析结果
///
/// 路由键形如`rule.update.<project_id>.<rule_id>`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRouting {
    pub project_id: String,
    pub rule_id: String,
}

impl RuleRouting {
    pub fn parse(routing_key: &str) -> WarehouseResult<Self> {
        let keys: Vec<&str> = routing_key.split('.').collect();
        if keys.len() < 4 || keys[0] != "rule" || keys[1] != "update" {
            return Err(WarehouseError::InvalidRoutingKey(routing_key.to_string()));
        }
        Ok(Self {
            project_id: keys[2].to_string(),
            rule_id: keys[3].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_event_deserializes_wire_fields() {
        let raw = serde_json::json!({
            "_id": "5f1",
            "instance_id": "ins1",
            "service": "brainlife/app-freesurfer",
            "status": "finished",
            "status_msg": "done",
            "user_id": "12",
            "resource_id": "res1",
            "_group_id": "33",
            "_status_changed": true,
            "config": {
                "_app": "app1",
                "_rule": { "id": "rule1" },
                "_outputs": [
                    { "id": "out1", "datatype": "58c33bcee13a50849b25879a", "subdir": "output" }
                ]
            },
            "unknown_field": 42
        });
        let task: TaskEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(task.id, "5f1");
        assert!(task.status_changed);
        assert_eq!(task.config.rule.as_ref().unwrap().id, "rule1");
        assert_eq!(task.config.outputs.len(), 1);
        assert_eq!(task.config.outputs[0].subdir.as_deref(), Some("output"));
    }

    #[test]
    fn test_task_event_defaults_optional_fields() {
        let raw = serde_json::json!({
            "_id": "5f2",
            "service": "brainlife/app-x",
            "status": "running"
        });
        let task: TaskEvent = serde_json::from_value(raw).unwrap();
        assert!(!task.status_changed);
        assert!(task.config.outputs.is_empty());
        assert!(task.group_id.is_none());
    }

    #[test]
    fn test_dataset_event_unpopulates_project() {
        let plain: DatasetEvent =
            serde_json::from_value(serde_json::json!({ "_id": "d1", "project": "p1" })).unwrap();
        assert_eq!(plain.project.id(), "p1");

        let populated: DatasetEvent = serde_json::from_value(
            serde_json::json!({ "_id": "d2", "project": { "_id": "p2", "name": "proj" } }),
        )
        .unwrap();
        assert_eq!(populated.project.id(), "p2");
    }

    #[test]
    fn test_rule_routing_parse() {
        let routing = RuleRouting::parse("rule.update.proj1.rule9").unwrap();
        assert_eq!(
            routing,
            RuleRouting {
                project_id: "proj1".to_string(),
                rule_id: "rule9".to_string(),
            }
        );

        assert!(RuleRouting::parse("rule.update.proj1").is_err());
        assert!(RuleRouting::parse("user.create.123").is_err());
    }
}
