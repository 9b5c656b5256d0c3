//! # 处理完成令牌
//!
//! 每条消息的状态机是 received → dispatched → (handled | handler_error)
//! → acknowledged。处理器的每条代码路径都必须产出一个`Completion`，
//! 订阅循环拿到令牌后才确认消息——忘记确认因此成为编译期错误
//! 而不是运行时的队列停摆。

use warehouse_core::{WarehouseError, WarehouseResult};

/// 只能通过`handled()`/`failed()`构造
#[derive(Debug)]
#[must_use = "完成令牌必须交还给订阅循环用于消息确认"]
pub struct Completion {
    outcome: Outcome,
}

#[derive(Debug)]
enum Outcome {
    Handled,
    Failed(WarehouseError),
}

impl Completion {
    pub fn handled() -> Self {
        Self {
            outcome: Outcome::Handled,
        }
    }

    pub fn failed(error: WarehouseError) -> Self {
        Self {
            outcome: Outcome::Failed(error),
        }
    }

    pub fn from_result(result: WarehouseResult<()>) -> Self {
        match result {
            Ok(()) => Self::handled(),
            Err(error) => Self::failed(error),
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self.outcome, Outcome::Handled)
    }

    /// 处理失败时的错误，成功路径返回None
    pub fn error(&self) -> Option<&WarehouseError> {
        match &self.outcome {
            Outcome::Handled => None,
            Outcome::Failed(error) => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_paths() {
        let ok = Completion::handled();
        assert!(ok.is_handled());
        assert!(ok.error().is_none());

        let failed = Completion::failed(WarehouseError::Internal("x".to_string()));
        assert!(!failed.is_handled());
        assert!(failed.error().is_some());

        let from_ok = Completion::from_result(Ok(()));
        assert!(from_ok.is_handled());
    }
}
