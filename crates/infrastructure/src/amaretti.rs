//! # 任务执行API客户端
//!
//! 对amaretti任务API的HTTP适配：验证器任务查重与提交、归档任务提交、
//! archiver范围JWT签发。所有请求带Bearer凭证和有界超时。

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use warehouse_config::AmarettiConfig;
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::entities::{ValidatorQuery, ValidatorSubmission};
use warehouse_domain::{TaskApi, TaskEvent, TaskOutput};

pub struct AmarettiClient {
    http: reqwest::Client,
    api: String,
    auth_api: String,
    jwt: String,
    archive_group_id: i64,
    archive_service: String,
}

impl AmarettiClient {
    pub fn new(config: &AmarettiConfig, archive_service: &str) -> WarehouseResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| WarehouseError::task_api(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            http,
            api: config.api.clone(),
            auth_api: config.auth_api.clone(),
            jwt: config.jwt.clone(),
            archive_group_id: config.archive_group_id,
            archive_service: archive_service.to_string(),
        })
    }

    fn validator_find(query: &ValidatorQuery) -> serde_json::Value {
        serde_json::json!({
            "name": "__dtv",
            "deps_config.task": query.task_id,
            "config.output.id": query.output_id,
            "instance_id": query.instance_id,
            "service": query.service,
            "service_branch": query.service_branch,
        })
    }
}

#[async_trait]
impl TaskApi for AmarettiClient {
    async fn find_validator_task(&self, query: &ValidatorQuery) -> WarehouseResult<Option<String>> {
        let find = Self::validator_find(query);
        let response = self
            .http
            .get(format!("{}/task", self.api))
            .query(&[("find", find.to_string()), ("limit", "1".to_string())])
            .bearer_auth(&self.jwt)
            .send()
            .await
            .map_err(|e| WarehouseError::task_api(format!("查询验证器任务失败: {e}")))?
            .error_for_status()
            .map_err(|e| WarehouseError::task_api(format!("查询验证器任务失败: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WarehouseError::task_api(format!("解析任务查询响应失败: {e}")))?;

        let existing = body["tasks"]
            .as_array()
            .and_then(|tasks| tasks.first())
            .and_then(|task| task["_id"].as_str())
            .map(String::from);
        Ok(existing)
    }

    async fn submit_validator(
        &self,
        submission: &ValidatorSubmission,
        user_jwt: &str,
    ) -> WarehouseResult<()> {
        let mut body = Self::validator_find(&submission.query);
        body["deps_config"] = serde_json::json!([{
            "task": submission.query.task_id,
            "subdirs": submission.subdirs,
        }]);
        body["config"] = serde_json::json!({ "output": submission.output });
        body["max_runtime"] = serde_json::json!(submission.max_runtime_ms);
        body["remove_date"] = serde_json::json!(submission.remove_date);

        self.http
            .post(format!("{}/task", self.api))
            .bearer_auth(user_jwt)
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::task_api(format!("提交验证器任务失败: {e}")))?
            .error_for_status()
            .map_err(|e| WarehouseError::task_api(format!("提交验证器任务失败: {e}")))?;

        info!(
            "已提交验证器任务 task:{} output:{}",
            submission.query.task_id, submission.query.output_id
        );
        Ok(())
    }

    async fn issue_archiver_jwt(&self, user_id: &str) -> WarehouseResult<String> {
        // 只有archiver组的用户能提交归档/验证任务，签发时临时附加组权限
        let response = self
            .http
            .post(format!("{}/jwt/{}", self.auth_api, user_id))
            .bearer_auth(&self.jwt)
            .json(&serde_json::json!({
                "claim": { "gids": [self.archive_group_id] },
            }))
            .send()
            .await
            .map_err(|e| WarehouseError::task_api(format!("签发archiver JWT失败: {e}")))?
            .error_for_status()
            .map_err(|e| WarehouseError::task_api(format!("签发archiver JWT失败: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WarehouseError::task_api(format!("解析JWT响应失败: {e}")))?;

        body["jwt"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| WarehouseError::task_api("JWT响应缺少jwt字段"))
    }

    async fn archive_outputs(
        &self,
        task: &TaskEvent,
        outputs: &[TaskOutput],
    ) -> WarehouseResult<()> {
        let user_jwt = self.issue_archiver_jwt(&task.user_id).await?;

        let body = serde_json::json!({
            "name": "__archive",
            "instance_id": task.instance_id,
            "service": self.archive_service,
            "config": {
                "task": task.id,
                "outputs": outputs,
            },
        });

        self.http
            .post(format!("{}/task", self.api))
            .bearer_auth(&user_jwt)
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::task_api(format!("提交归档任务失败: {e}")))?
            .error_for_status()
            .map_err(|e| WarehouseError::task_api(format!("提交归档任务失败: {e}")))?;

        debug!("已提交归档任务 task:{} 输出数:{}", task.id, outputs.len());
        Ok(())
    }
}
