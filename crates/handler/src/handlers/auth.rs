//! # 认证事件处理
//!
//! 用户创建时尽力而为地发出Slack邀请：失败只记日志，
//! 不影响消息确认，也不重试。

use tracing::{debug, warn};
use warehouse_domain::AuthEvent;

use crate::completion::Completion;
use crate::context::EventContext;
use crate::counters::paths;

pub async fn handle_auth(ctx: &EventContext, routing_key: &str, event: &AuthEvent) -> Completion {
    debug!("auth event: {}", routing_key);

    if routing_key.starts_with("user.login.") {
        ctx.counters.increment(paths::AUTH_LOGIN);
        return Completion::handled();
    }
    if !routing_key.starts_with("user.create.") {
        return Completion::handled();
    }

    if !ctx.settings.slack_enabled {
        return Completion::handled();
    }
    let (Some(email), Some(fullname)) = (&event.email, &event.fullname) else {
        debug!("用户创建事件缺少email或fullname，跳过邀请");
        return Completion::handled();
    };

    if let Err(e) = ctx.invites.invite(email, fullname).await {
        warn!("slack邀请失败（忽略）: {}", e);
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
    use warehouse_testing_utils::{MockDataService, MockInviteService, MockTaskApi};

    fn ctx_with(invites: Arc<MockInviteService>, slack_enabled: bool) -> EventContext {
        EventContext::new(
            Arc::new(CounterStore::new()),
            Arc::new(MockDataService::new()) as Arc<dyn warehouse_domain::DataService>,
            Arc::new(MockTaskApi::new()) as Arc<dyn warehouse_domain::TaskApi>,
            invites as Arc<dyn warehouse_domain::InviteService>,
            HandlerSettings {
                archive_service: "brainlife/app-archive".to_string(),
                validators_enabled: false,
                validator_datatypes: HashMap::new(),
                validator_branch: "master".to_string(),
                slack_enabled,
            },
        )
    }

    fn event(email: Option<&str>, fullname: Option<&str>) -> AuthEvent {
        AuthEvent {
            email: email.map(str::to_string),
            fullname: fullname.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_login_increments_counter_without_invite() {
        let invites = Arc::new(MockInviteService::new());
        let ctx = ctx_with(Arc::clone(&invites), true);

        let completion = handle_auth(&ctx, "user.login.12", &event(None, None)).await;
        assert!(completion.is_handled());
        assert_eq!(ctx.counters.drain().get(paths::AUTH_LOGIN), Some(&1));
        assert!(invites.invited().is_empty());
    }

    #[tokio::test]
    async fn test_create_skips_invite_when_slack_disabled() {
        let invites = Arc::new(MockInviteService::new());
        let ctx = ctx_with(Arc::clone(&invites), false);

        let _ = handle_auth(&ctx, "user.create.12", &event(Some("a@b.c"), Some("A B"))).await;
        assert!(invites.invited().is_empty());
    }

    #[tokio::test]
    async fn test_invite_failure_still_completes() {
        let invites = Arc::new(MockInviteService::new());
        invites.set_fail(true);
        let ctx = ctx_with(Arc::clone(&invites), true);

        let completion =
            handle_auth(&ctx, "user.create.12", &event(Some("a@b.c"), Some("A B"))).await;
        assert!(completion.is_handled());
    }

    #[tokio::test]
    async fn test_create_without_email_skips_invite() {
        let invites = Arc::new(MockInviteService::new());
        let ctx = ctx_with(Arc::clone(&invites), true);

        let _ = handle_auth(&ctx, "user.create.12", &event(None, Some("A B"))).await;
        assert!(invites.invited().is_empty());
    }
}
