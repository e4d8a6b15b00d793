use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use boxer_core::config::AppConfig;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthState {
    llm_provider: &'static str,
    db_query_enabled: bool,
}

impl From<&AppConfig> for HealthState {
    fn from(config: &AppConfig) -> Self {
        Self {
            llm_provider: config.llm.provider.map(|provider| provider.as_str()).unwrap_or("disabled"),
            db_query_enabled: config.db_query.enabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub llm_provider: &'static str,
    pub db_query_enabled: bool,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(event_name = "system.health.start", bind_address = %address, "health endpoint started");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ok",
        service: HealthCheck { status: "ready", detail: "boxer-server runtime initialized".to_owned() },
        llm_provider: state.llm_provider,
        db_query_enabled: state.db_query_enabled,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
