use std::time::Duration;

use boxer_core::config::DbQueryConfig;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::ConnectOptions;

/// Upper bound applied to the connect step and to the statement itself.
pub fn query_timeout(config: &DbQueryConfig) -> Duration {
    Duration::from_secs(config.timeout_secs.max(1))
}

pub fn connect_options(config: &DbQueryConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(config.password.expose_secret())
        .database(&config.database)
        .charset("utf8mb4")
}

/// Opens a dedicated connection; callers close it after a single query.
pub async fn connect(config: &DbQueryConfig) -> Result<MySqlConnection, sqlx::Error> {
    connect_options(config).connect().await
}
