use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use boxer_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{redact_token, CommandResult};

struct Field {
    key_path: &'static str,
    env_key: &'static str,
    value: String,
}

impl Field {
    fn new(key_path: &'static str, env_key: &'static str, value: impl Into<String>) -> Self {
        Self { key_path, env_key, value: value.into() }
    }
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields(&config).into_iter().map(|field| {
        let source = field_source(
            field.key_path,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        format!("- {} = {} (source: {source})", field.key_path, field.value)
    }));

    CommandResult::output(0, lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm = &config.llm;
    let db = &config.db_query;
    let access = &config.access;

    vec![
        Field::new("slack.app_token", "SLACK_APP_TOKEN", redact_token(config.slack.app_token.expose_secret())),
        Field::new("slack.bot_token", "SLACK_BOT_TOKEN", redact_token(config.slack.bot_token.expose_secret())),
        Field::new(
            "llm.provider",
            "LLM_PROVIDER",
            llm.provider.map(|provider| provider.as_str()).unwrap_or("<unset>"),
        ),
        Field::new(
            "llm.anthropic.api_key",
            "ANTHROPIC_API_KEY",
            if llm.anthropic.api_key.is_some() { "<redacted>" } else { "<unset>" },
        ),
        Field::new("llm.anthropic.model", "ANTHROPIC_MODEL", llm.anthropic.model.as_str()),
        Field::new("llm.anthropic.base_url", "ANTHROPIC_BASE_URL", llm.anthropic.base_url.as_str()),
        Field::new("llm.anthropic.max_tokens", "ANTHROPIC_MAX_TOKENS", llm.anthropic.max_tokens.to_string()),
        Field::new("llm.anthropic.timeout_secs", "ANTHROPIC_TIMEOUT_SEC", llm.anthropic.timeout_secs.to_string()),
        Field::new("llm.ollama.base_url", "OLLAMA_BASE_URL", llm.ollama.base_url.as_str()),
        Field::new("llm.ollama.model", "OLLAMA_MODEL", llm.ollama.model.as_str()),
        Field::new("llm.ollama.timeout_secs", "OLLAMA_TIMEOUT_SEC", llm.ollama.timeout_secs.to_string()),
        Field::new("llm.ollama.temperature", "OLLAMA_TEMPERATURE", llm.ollama.temperature.to_string()),
        Field::new(
            "thread_context.fetch_limit",
            "THREAD_CONTEXT_FETCH_LIMIT",
            config.thread_context.fetch_limit.to_string(),
        ),
        Field::new(
            "thread_context.max_messages",
            "THREAD_CONTEXT_MAX_MESSAGES",
            config.thread_context.max_messages.to_string(),
        ),
        Field::new(
            "thread_context.max_chars",
            "THREAD_CONTEXT_MAX_CHARS",
            config.thread_context.max_chars.to_string(),
        ),
        Field::new("db_query.enabled", "DB_QUERY_ENABLED", db.enabled.to_string()),
        Field::new("db_query.host", "BOX_DB_HOST", or_unset(&db.host)),
        Field::new("db_query.port", "BOX_DB_PORT", db.port.to_string()),
        Field::new("db_query.username", "BOX_DB_USERNAME", or_unset(&db.username)),
        Field::new(
            "db_query.password",
            "BOX_DB_PASSWORD",
            if db.password.expose_secret().is_empty() { "<unset>" } else { "<redacted>" },
        ),
        Field::new("db_query.database", "BOX_DB_DATABASE", or_unset(&db.database)),
        Field::new("db_query.timeout_secs", "DB_QUERY_TIMEOUT_SEC", db.timeout_secs.to_string()),
        Field::new("db_query.max_rows", "DB_QUERY_MAX_ROWS", db.max_rows.to_string()),
        Field::new("db_query.max_sql_chars", "DB_QUERY_MAX_SQL_CHARS", db.max_sql_chars.to_string()),
        Field::new(
            "db_query.max_result_chars",
            "DB_QUERY_MAX_RESULT_CHARS",
            db.max_result_chars.to_string(),
        ),
        Field::new("app_user_api.url", "APP_USER_API_URL", or_unset(&config.app_user_api.url)),
        Field::new(
            "app_user_api.timeout_secs",
            "APP_USER_API_TIMEOUT_SEC",
            config.app_user_api.timeout_secs.to_string(),
        ),
        Field::new(
            "access.model_owner_user_ids",
            "BOXER_MODEL_OWNER_USER_IDS",
            id_list(access.model_owner_user_ids.iter()),
        ),
        Field::new(
            "access.app_user_lookup_allowed_user_ids",
            "BOXER_APP_USER_LOOKUP_ALLOWED_USER_IDS",
            id_list(access.app_user_lookup_allowed_user_ids.iter()),
        ),
        Field::new(
            "access.security_approver_user_id",
            "BOXER_SECURITY_APPROVER_USER_ID",
            access.security_approver_user_id.as_deref().unwrap_or("<unset>"),
        ),
        Field::new("server.bind_address", "BOXER_SERVER_BIND_ADDRESS", config.server.bind_address.as_str()),
        Field::new(
            "server.health_check_port",
            "BOXER_SERVER_HEALTH_CHECK_PORT",
            config.server.health_check_port.to_string(),
        ),
        Field::new("logging.level", "BOXER_LOG_LEVEL", config.logging.level.as_str()),
        Field::new("logging.format", "BOXER_LOG_FORMAT", format!("{:?}", config.logging.format).to_lowercase()),
    ]
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

fn id_list<'a>(ids: impl Iterator<Item = &'a String>) -> String {
    let joined = ids.map(String::as_str).collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        "<empty>".to_string()
    } else {
        joined
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("boxer.toml"), PathBuf::from("config/boxer.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
