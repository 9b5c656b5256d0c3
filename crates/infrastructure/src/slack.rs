//! # Slack邀请客户端
//!
//! 对users.admin.invite的fire-and-forget适配，带`resend: true`，
//! 已邀请过的地址由Slack侧按重发处理。

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use warehouse_config::SlackConfig;
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::InviteService;

pub struct SlackClient {
    http: reqwest::Client,
    invite_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> WarehouseResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| WarehouseError::Invite(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            http,
            invite_url: config.invite_url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl InviteService for SlackClient {
    async fn invite(&self, email: &str, real_name: &str) -> WarehouseResult<()> {
        debug!("发送slack邀请: {}", email);
        let response = self
            .http
            .post(&self.invite_url)
            .form(&[
                ("token", self.token.as_str()),
                ("email", email),
                ("real_name", real_name),
                ("resend", "true"),
            ])
            .send()
            .await
            .map_err(|e| WarehouseError::Invite(format!("slack邀请请求失败: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WarehouseError::Invite(format!("解析slack响应失败: {e}")))?;

        if body["ok"].as_bool() != Some(true) {
            let reason = body["error"].as_str().unwrap_or("unknown");
            return Err(WarehouseError::Invite(format!("slack邀请被拒绝: {reason}")));
        }
        Ok(())
    }
}
