pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use boxer_core::config::LoadOptions;
use clap::{Parser, Subcommand};

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "boxer",
    about = "Boxer operator CLI",
    long_about = "Check Boxer readiness and inspect its effective configuration.",
    after_help = "Examples:\n  boxer doctor --json\n  boxer config\n  boxer --config-file config/boxer.toml doctor"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read this TOML file instead of boxer.toml / config/boxer.toml")]
    config_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack tokens, LLM provider, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Doctor { .. } => "doctor",
        }
    }
}

/// A missing `.env` is fine; an unreadable or malformed one fails the command.
pub fn env_file_failure<T>(
    command: &str,
    loaded: Result<T, dotenvy::Error>,
) -> Option<CommandResult> {
    match loaded {
        Err(error) if !error.not_found() => Some(CommandResult::failure(
            command,
            "env_file",
            format!(".env could not be loaded: {error}"),
            2,
        )),
        _ => None,
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Some(failure) = env_file_failure(cli.command.name(), dotenvy::dotenv()) {
        println!("{}", failure.output);
        return ExitCode::from(failure.exit_code);
    }

    let options = LoadOptions { config_path: cli.config_file, ..LoadOptions::default() };
    let result = match cli.command {
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(json, options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
