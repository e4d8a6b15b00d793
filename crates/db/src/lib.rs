pub mod connection;
pub mod executor;
pub mod gateway;
pub mod report;
pub mod sql_guard;

pub use connection::{connect, connect_options, query_timeout};
pub use executor::{DbError, JsonRow, MySqlQueryExecutor, QueryExecutor, QueryRows};
pub use gateway::{GatewayError, GatewayLimits, ReadOnlyQueryGateway};
pub use report::format_query_report;
pub use sql_guard::{validate_readonly_sql, SqlGuardError, DEFAULT_DB_QUERY};
