//! # 规则更新事件处理
//!
//! 规则更新消息没有业务载荷，项目id和规则id编码在路由键里。

use std::time::Duration;

use tracing::debug;
use warehouse_domain::RuleRouting;

use crate::completion::Completion;
use crate::context::EventContext;

const PROJECT_STATS_DEBOUNCE: Duration = Duration::from_secs(1);

pub async fn handle_rule_update(ctx: &EventContext, routing_key: &str) -> Completion {
    let routing = match RuleRouting::parse(routing_key) {
        Ok(routing) => routing,
        Err(e) => return Completion::failed(e),
    };
    debug!(
        "rule update project:{} rule:{}",
        routing.project_id, routing.rule_id
    );

    // 键带p_前缀，和实例流按group防抖的项目统计重算区分开
    let data = ctx.data.clone();
    let project_id = routing.project_id.clone();
    ctx.debounce
        .schedule(
            &format!("update_project_stats.p_{}", routing.project_id),
            PROJECT_STATS_DEBOUNCE,
            move || async move { data.update_project_stats(&project_id).await },
        )
        .await;

    Completion::handled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HandlerSettings;
    use crate::counters::CounterStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use warehouse_testing_utils::{MockDataService, MockInviteService, MockTaskApi};

    fn ctx_with(data: Arc<MockDataService>) -> EventContext {
        EventContext::new(
            Arc::new(CounterStore::new()),
            data as Arc<dyn warehouse_domain::DataService>,
            Arc::new(MockTaskApi::new()) as Arc<dyn warehouse_domain::TaskApi>,
            Arc::new(MockInviteService::new()) as Arc<dyn warehouse_domain::InviteService>,
            HandlerSettings {
                archive_service: "brainlife/app-archive".to_string(),
                validators_enabled: false,
                validator_datatypes: HashMap::new(),
                validator_branch: "master".to_string(),
                slack_enabled: false,
            },
        )
    }

    #[tokio::test]
    async fn test_rule_update_recomputes_project_stats() {
        let data = Arc::new(MockDataService::new());
        let ctx = ctx_with(Arc::clone(&data));

        let completion = handle_rule_update(&ctx, "rule.update.p1.r1").await;
        assert!(completion.is_handled());
        assert_eq!(data.project_stats_updates(), vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_routing_key_fails() {
        let data = Arc::new(MockDataService::new());
        let ctx = ctx_with(Arc::clone(&data));

        let completion = handle_rule_update(&ctx, "rule.created.p1.r1").await;
        assert!(completion.error().is_some());
        assert!(data.project_stats_updates().is_empty());
    }
}
