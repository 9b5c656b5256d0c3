//! # 处理上下文
//!
//! 计数器、防抖引擎和外部协作方端口都由显式的上下文对象持有并
//! 传入处理器，没有全局可变状态，测试可以彼此隔离。

use std::collections::HashMap;
use std::sync::Arc;

use warehouse_config::{SlackConfig, WarehouseConfig};
use warehouse_domain::{DataService, InviteService, TaskApi};

use crate::counters::CounterStore;
use crate::debounce::Debouncer;

/// 处理器用到的业务配置快照
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// 归档服务名，该服务的任务事件触发归档状态回传
    pub archive_service: String,
    pub validators_enabled: bool,
    /// datatype id -> 验证器服务名
    pub validator_datatypes: HashMap<String, String>,
    pub validator_branch: String,
    pub slack_enabled: bool,
}

impl HandlerSettings {
    pub fn from_config(warehouse: &WarehouseConfig, slack: &SlackConfig) -> Self {
        Self {
            archive_service: warehouse.archive_service.clone(),
            validators_enabled: warehouse.validators.enabled,
            validator_datatypes: warehouse.validators.datatypes.clone(),
            validator_branch: warehouse.validators.service_branch.clone(),
            slack_enabled: slack.enabled,
        }
    }
}

/// 事件处理上下文
pub struct EventContext {
    pub counters: Arc<CounterStore>,
    pub debounce: Debouncer,
    pub data: Arc<dyn DataService>,
    pub tasks: Arc<dyn TaskApi>,
    pub invites: Arc<dyn InviteService>,
    pub settings: HandlerSettings,
}

impl EventContext {
    pub fn new(
        counters: Arc<CounterStore>,
        data: Arc<dyn DataService>,
        tasks: Arc<dyn TaskApi>,
        invites: Arc<dyn InviteService>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            counters,
            debounce: Debouncer::new(),
            data,
            tasks,
            invites,
            settings,
        }
    }
}
