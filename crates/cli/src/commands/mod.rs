pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;
pub mod validate;

use buyline_core::config::{AppConfig, LoadOptions};
use buyline_db::{connect_with_settings, DbPool};
use serde::Serialize;

/// Error class, operator-facing message, exit code.
pub(crate) type CommandFailure = (&'static str, String, u8);

pub(crate) struct CommandEnv {
    pub config: AppConfig,
    pub runtime: tokio::runtime::Runtime,
}

/// Loads config and builds the single-threaded runtime every command runs on.
pub(crate) fn prepare(command: &str) -> Result<CommandEnv, Box<CommandResult>> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        Box::new(CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        ))
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            Box::new(CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            ))
        })?;

    Ok(CommandEnv { config, runtime })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))
}

/// Exit code plus the single JSON line every command prints.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'a str,
    error_class: Option<&'a str>,
    message: &'a str,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::render(command, "ok", None, &message.into(), 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::render(command, "error", Some(error_class), &message.into(), exit_code)
    }

    fn render(
        command: &str,
        status: &str,
        error_class: Option<&str>,
        message: &str,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome { command, status, error_class, message };
        let output = serde_json::to_string(&payload).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        Self { exit_code, output }
    }
}
