use std::sync::Arc;

use boxer_agent::{
    AccessPolicy, AnthropicClient, ContextLimits, HttpAppUserDirectory, LlmError, LlmRoute,
    LookupError, MentionRouter, OllamaClient, ThreadContextLoader,
};
use boxer_core::config::{AppConfig, LlmProvider};
use boxer_core::domain::thread::ThreadHistory;
use boxer_db::{GatewayLimits, MySqlQueryExecutor, ReadOnlyQueryGateway};
use boxer_slack::{
    EventDispatcher, ReconnectPolicy, SlackApiClient, SlackApiError, SocketModeRunner,
    WebSocketTransport,
};
use thiserror::Error;
use tracing::info;

use crate::bridge::MentionBridge;
use crate::health::HealthState;

pub struct Application {
    pub config: AppConfig,
    pub health: HealthState,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("slack client setup failed: {0}")]
    Slack(#[from] SlackApiError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("app-user client setup failed: {0}")]
    Lookup(#[from] LookupError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        llm_provider = config.llm.provider.map(|provider| provider.as_str()).unwrap_or("disabled"),
        db_query_enabled = config.db_query.enabled,
        "starting application bootstrap"
    );

    let slack = Arc::new(SlackApiClient::new(config.slack.bot_token.clone())?);
    let router = build_router(&config, slack.clone())?;
    let transport = Arc::new(WebSocketTransport::new(slack.clone(), config.slack.app_token.clone()));
    let slack_runner = SocketModeRunner::new(
        transport,
        EventDispatcher::for_mentions(MentionBridge::new(router)),
        slack,
        ReconnectPolicy::default(),
    );

    info!(event_name = "system.bootstrap.wired", "mention router and socket mode runner wired");

    Ok(Application { health: HealthState::from(&config), config, slack_runner })
}

/// Everything behind the Slack edge, with thread history injected.
pub fn build_router(
    config: &AppConfig,
    history: Arc<dyn ThreadHistory>,
) -> Result<MentionRouter, BootstrapError> {
    let llm = match config.llm.provider {
        Some(provider @ LlmProvider::Claude) => Some(LlmRoute {
            provider,
            client: Arc::new(AnthropicClient::new(&config.llm.anthropic)?),
        }),
        Some(provider @ LlmProvider::Ollama) => Some(LlmRoute {
            provider,
            client: Arc::new(OllamaClient::new(&config.llm.ollama)?),
        }),
        None => None,
    };

    let context = ThreadContextLoader::new(history, ContextLimits::from(&config.thread_context));

    let db = config.db_query.enabled.then(|| {
        ReadOnlyQueryGateway::new(
            Arc::new(MySqlQueryExecutor::new(config.db_query.clone())),
            GatewayLimits::from(&config.db_query),
        )
    });

    let directory = Arc::new(HttpAppUserDirectory::new(&config.app_user_api)?);

    Ok(MentionRouter::new(AccessPolicy::new(config.access.clone()), llm, context, db, directory))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boxer_core::config::{AppConfig, LlmProvider};
    use boxer_core::domain::thread::NoopThreadHistory;

    use super::{bootstrap_with_config, build_router, BootstrapError};
    use crate::health::HealthState;

    #[test]
    fn bootstrap_wires_without_touching_the_network() {
        let mut config = AppConfig::default();
        config.slack.app_token = "xapp-test".to_owned().into();
        config.slack.bot_token = "xoxb-test".to_owned().into();
        config.server.health_check_port = 18080;

        let app = bootstrap_with_config(config).expect("bootstrap should succeed");

        assert_eq!(app.config.server.health_check_port, 18080);
        assert_eq!(app.health, HealthState::from(&AppConfig::default()));
    }

    #[test]
    fn claude_without_api_key_is_a_setup_error() {
        let mut config = AppConfig::default();
        config.llm.provider = Some(LlmProvider::Claude);

        let result = build_router(&config, Arc::new(NoopThreadHistory));

        assert!(matches!(result, Err(BootstrapError::Llm(_))));
    }

    #[test]
    fn ollama_and_db_wiring_builds_without_network() {
        let mut config = AppConfig::default();
        config.llm.provider = Some(LlmProvider::Ollama);
        config.db_query.enabled = true;
        config.db_query.host = "127.0.0.1".to_owned();

        assert!(build_router(&config, Arc::new(NoopThreadHistory)).is_ok());
    }
}
