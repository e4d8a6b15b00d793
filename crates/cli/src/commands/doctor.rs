use boxer_core::config::{AppConfig, LlmProvider, LoadOptions};
use boxer_db::{MySqlQueryExecutor, QueryExecutor};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{escape_json, redact_token, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CHECKS_AFTER_CONFIG: [&str; 4] =
    ["slack_token_readiness", "llm_provider", "app_user_api", "database_connectivity"];

pub fn run(json_output: bool, options: LoadOptions) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::output(exit_code, output);
    }

    CommandResult::output(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_llm_provider(&config));
            checks.push(check_app_user_api(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(CHECKS_AFTER_CONFIG.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "slack_token_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "app token {} and bot token {} have the expected prefixes",
            redact_token(config.slack.app_token.expose_secret()),
            redact_token(config.slack.bot_token.expose_secret())
        ),
    }
}

fn check_llm_provider(config: &AppConfig) -> DoctorCheck {
    let (status, details) = match config.llm.provider {
        Some(LlmProvider::Claude) => (
            CheckStatus::Pass,
            format!(
                "claude model `{}` via {}",
                config.llm.anthropic.model, config.llm.anthropic.base_url
            ),
        ),
        Some(LlmProvider::Ollama) => (
            CheckStatus::Pass,
            format!("ollama model `{}` via {}", config.llm.ollama.model, config.llm.ollama.base_url),
        ),
        None => (
            CheckStatus::Skipped,
            "LLM_PROVIDER is unset; questions get the fallback reply".to_string(),
        ),
    };
    DoctorCheck { name: "llm_provider", status, details }
}

fn check_app_user_api(config: &AppConfig) -> DoctorCheck {
    if config.app_user_api.url.trim().is_empty() {
        return DoctorCheck {
            name: "app_user_api",
            status: CheckStatus::Skipped,
            details: "APP_USER_API_URL is empty; barcode lookups will fail".to_string(),
        };
    }
    DoctorCheck {
        name: "app_user_api",
        status: CheckStatus::Pass,
        details: format!("lookups go to {}", config.app_user_api.url),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    if !config.db_query.enabled {
        return DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Skipped,
            details: "DB_QUERY_ENABLED is false".to_string(),
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let executor = MySqlQueryExecutor::new(config.db_query.clone());
    let target = format!(
        "{}@{}:{}/{}",
        config.db_query.username, config.db_query.host, config.db_query.port, config.db_query.database
    );

    match runtime.block_on(executor.fetch("SELECT 1", 1)) {
        Ok(_) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected to `{target}`"),
        },
        Err(error) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details: format!("`{target}`: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
