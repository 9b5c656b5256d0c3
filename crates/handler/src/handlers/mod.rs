//! # 各事件流的业务处理器
//!
//! 处理器同步更新计数器，重算类工作交给防抖引擎，重活
//! （归档提交、验证器提交）走外部端口。每个处理器的所有
//! 代码路径都返回完成令牌，订阅循环据此确认消息。

pub mod auth;
pub mod dataset;
pub mod instance;
pub mod rule;
pub mod task;
