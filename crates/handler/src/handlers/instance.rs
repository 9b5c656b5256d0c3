//! # 实例事件处理

use std::time::Duration;

use tracing::debug;
use warehouse_domain::InstanceEvent;

use crate::completion::Completion;
use crate::context::EventContext;
use crate::counters::paths;

/// 项目统计重算的防抖窗口
const PROJECT_STATS_DEBOUNCE: Duration = Duration::from_secs(1);

pub async fn handle_instance(ctx: &EventContext, instance: &InstanceEvent) -> Completion {
    debug!(
        "{} instance:{} {}",
        if instance.status_changed { "+++" } else { "---" },
        instance.id,
        instance.status,
    );

    ctx.counters.increment(paths::HEALTH_INSTANCES);

    if instance.status_changed {
        ctx.counters.increment(&format!(
            "instance.user.{}.{}",
            instance.user_id, instance.status
        ));
        if let Some(group_id) = &instance.group_id {
            ctx.counters
                .increment(&format!("instance.group.{}.{}", group_id, instance.status));

            // 防抖键按动作类型+实体id命名，避免跨实体的合并冲突
            let data = ctx.data.clone();
            let group = group_id.clone();
            ctx.debounce
                .schedule(
                    &format!("update_project_stats.{group_id}"),
                    PROJECT_STATS_DEBOUNCE,
                    move || async move { data.update_project_stats_by_group(&group).await },
                )
                .await;
        }
    }

    Completion::handled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HandlerSettings;
    use crate::counters::CounterStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use warehouse_testing_utils::{
        InstanceEventBuilder, MockDataService, MockInviteService, MockTaskApi,
    };

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
    async fn test_counts_health_regardless_of_change_flag() {
        let ctx = ctx_with(Arc::new(MockDataService::new()));

        let unchanged = InstanceEventBuilder::new().build();
        let _ = handle_instance(&ctx, &unchanged).await;
        let counts = ctx.counters.drain();
        assert_eq!(counts.get(paths::HEALTH_INSTANCES), Some(&1));
        assert!(counts.get("instance.user.1.running").is_none());
    }

    #[tokio::test]
    async fn test_status_change_counts_and_recomputes_project_stats() {
        let data = Arc::new(MockDataService::new());
        let ctx = ctx_with(Arc::clone(&data));

        let event = InstanceEventBuilder::new()
            .with_status("finished")
            .with_user("9")
            .with_group("g3")
            .status_changed()
            .build();
        let _ = handle_instance(&ctx, &event).await;

        let counts = ctx.counters.drain();
        assert_eq!(counts.get("instance.user.9.finished"), Some(&1));
        assert_eq!(counts.get("instance.group.g3.finished"), Some(&1));
        assert_eq!(data.project_stats_by_group(), vec!["g3".to_string()]);
    }

    #[tokio::test]
    async fn test_status_change_without_group_skips_recompute() {
        let data = Arc::new(MockDataService::new());
        let ctx = ctx_with(Arc::clone(&data));

        let event = InstanceEventBuilder::new().status_changed().build();
        let _ = handle_instance(&ctx, &event).await;
        assert!(data.project_stats_by_group().is_empty());
    }
}
