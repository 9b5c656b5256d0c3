use thiserror::Error;


#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("数据库操作错误: {0}")]
    Database(String),
    #[error("任务API错误: {0}")]
    TaskApi(String),
    #[error("健康状态发布错误: {0}")]
    HealthStore(String),
    #[error("指标输出错误: {0}")]
    MetricsSink(String),
    #[error("邀请服务错误: {0}")]
    Invite(String),
    #[error("无效的消息: {0}")]
    InvalidMessage(String),
    #[error("无效的路由键: {0}")]
    InvalidRoutingKey(String),
    #[error("事件处理步骤 {step} 失败: {message}")]
    HandlerStep { step: &'static str, message: String },
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type WarehouseResult<T> = Result<T, WarehouseError>;

impl WarehouseError {
    pub fn message_queue<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }
    pub fn task_api<S: Into<String>>(msg: S) -> Self {
        Self::TaskApi(msg.into())
    }
    pub fn invalid_message<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// 给处理管道中某个步骤的错误打上步骤标签
    pub fn handler_step(step: &'static str, err: impl std::fmt::Display) -> Self {
        Self::HandlerStep {
            step,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
