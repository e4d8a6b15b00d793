pub mod config;
pub mod domain;
pub mod errors;
pub mod text;

pub use config::{
    AccessConfig, AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
};
pub use domain::mention::{InboundMention, Reply};
pub use domain::thread::{HistoryMessage, NoopThreadHistory, ThreadHistory, ThreadHistoryError};
pub use errors::{ApplicationError, Service};
