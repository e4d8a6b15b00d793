use async_trait::async_trait;
use boxer_agent::MentionRouter;
use boxer_core::domain::mention::{InboundMention, Reply};
use boxer_slack::{EventContext, EventHandlerError, MentionService};
use tracing::debug;

/// Hands Slack mentions to the router; routing itself never fails.
pub struct MentionBridge {
    router: MentionRouter,
}

impl MentionBridge {
    pub fn new(router: MentionRouter) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MentionService for MentionBridge {
    async fn handle_mention(
        &self,
        mention: &InboundMention,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError> {
        debug!(correlation_id = %ctx.correlation_id, thread_ts = %mention.thread_ts, "routing mention");
        Ok(self.router.route(mention).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boxer_core::config::AppConfig;
    use boxer_core::domain::mention::InboundMention;
    use boxer_core::domain::thread::NoopThreadHistory;
    use boxer_slack::{EventContext, MentionService};

    use super::MentionBridge;
    use crate::bootstrap::build_router;

    #[tokio::test]
    async fn pings_are_answered_in_thread() {
        let router = build_router(&AppConfig::default(), Arc::new(NoopThreadHistory))
            .expect("router should build");
        let bridge = MentionBridge::new(router);
        let mention = InboundMention::new(
            "<@UBOT> ping",
            Some("U1".to_owned()),
            "C1",
            "1730000000.2000",
            Some("1730000000.1000".to_owned()),
        );

        let reply = bridge
            .handle_mention(&mention, &EventContext::default())
            .await
            .expect("bridge never fails");

        assert_eq!(reply.text, "<@U1> pong-ec2");
        assert_eq!(reply.thread_ts, "1730000000.1000");
        assert_eq!(reply.channel_id, "C1");
    }

    #[tokio::test]
    async fn questions_without_a_provider_get_the_fallback() {
        let router = build_router(&AppConfig::default(), Arc::new(NoopThreadHistory))
            .expect("router should build");
        let mention =
            InboundMention::new("<@UBOT> 오늘 날씨 어때?", Some("U1".to_owned()), "C1", "1.0", None);

        let reply = MentionBridge::new(router)
            .handle_mention(&mention, &EventContext::default())
            .await
            .expect("bridge never fails");

        assert_eq!(reply.text, "<@U1> 현재는 ping 또는 LLM 질문에 응답해");
        assert_eq!(reply.thread_ts, "1.0");
    }
}
