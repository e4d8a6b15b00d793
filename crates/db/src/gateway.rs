use std::sync::Arc;

use boxer_core::config::DbQueryConfig;
use thiserror::Error;
use tracing::info;

use crate::executor::{clamp_max_rows, DbError, QueryExecutor};
use crate::report::format_query_report;
use crate::sql_guard::{validate_readonly_sql, SqlGuardError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Rejected(#[from] SqlGuardError),
    #[error(transparent)]
    Execution(#[from] DbError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayLimits {
    pub max_sql_chars: usize,
    pub max_rows: usize,
    pub max_result_chars: usize,
}

impl From<&DbQueryConfig> for GatewayLimits {
    fn from(config: &DbQueryConfig) -> Self {
        Self {
            max_sql_chars: config.max_sql_chars,
            max_rows: config.max_rows,
            max_result_chars: config.max_result_chars,
        }
    }
}

/// Validates, executes and renders one read-only statement.
#[derive(Clone)]
pub struct ReadOnlyQueryGateway {
    executor: Arc<dyn QueryExecutor>,
    limits: GatewayLimits,
}

impl ReadOnlyQueryGateway {
    pub fn new(executor: Arc<dyn QueryExecutor>, limits: GatewayLimits) -> Self {
        Self { executor, limits }
    }

    pub async fn run(&self, raw_sql: &str) -> Result<String, GatewayError> {
        let sql = validate_readonly_sql(raw_sql, self.limits.max_sql_chars)?;
        info!(event_name = "db.query.accepted", sql_chars = sql.chars().count(), "running read-only query");

        let rows = self.executor.fetch(&sql, clamp_max_rows(self.limits.max_rows)).await?;
        Ok(format_query_report(&rows, self.limits.max_result_chars))
    }
}
