pub mod config;
pub mod doctor;
pub mod forecast;
pub mod forecasts;
pub mod migrate;
pub mod requirements;
pub mod seed;

use std::future::Future;

use bakeplan_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use bakeplan_core::errors::ApplicationError;
use bakeplan_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    /// Input the failure is pinned to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            field: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_on_field(command, error_class, None, message, exit_code)
    }

    pub fn failure_on_field(
        command: &str,
        error_class: &str,
        field: Option<&str>,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            field: field.map(str::to_string),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// A classified command failure with its process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    class: &'static str,
    field: Option<&'static str>,
    message: String,
    exit_code: u8,
}

impl Failure {
    pub(crate) fn connectivity(error: impl std::fmt::Display) -> Self {
        Self { class: "db_connectivity", field: None, message: error.to_string(), exit_code: 4 }
    }

    pub(crate) fn migration(error: impl std::fmt::Display) -> Self {
        Self { class: "migration", field: None, message: error.to_string(), exit_code: 5 }
    }

    pub(crate) fn seed(class: &'static str, message: impl Into<String>) -> Self {
        Self { class, field: None, message: message.into(), exit_code: 6 }
    }

    pub(crate) fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure_on_field(
            command,
            self.class,
            self.field,
            self.message,
            self.exit_code,
        )
    }
}

/// Loaded configuration, a current-thread runtime and a correlation id for one command.
pub(crate) struct Invocation {
    pub(crate) command: &'static str,
    pub(crate) config: AppConfig,
    pub(crate) correlation_id: String,
    runtime: Runtime,
}

impl Invocation {
    pub(crate) fn start(
        command: &'static str,
        overrides: &ConfigOverrides,
    ) -> Result<Self, CommandResult> {
        let config = AppConfig::load(LoadOptions {
            overrides: overrides.clone(),
            ..LoadOptions::default()
        })
        .map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            )
        })?;

        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
                CommandResult::failure(
                    command,
                    "runtime_init",
                    format!("failed to initialize async runtime: {error}"),
                    3,
                )
            })?;

        Ok(Self { command, config, correlation_id: Uuid::new_v4().to_string(), runtime })
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        let span = tracing::info_span!(
            "command",
            command = self.command,
            correlation_id = %self.correlation_id
        );
        self.runtime.block_on(future.instrument(span))
    }

    /// Maps a pipeline error onto the interface taxonomy, keeping the correlation id.
    pub(crate) fn application_failure(&self, error: ApplicationError) -> Failure {
        let class = error.kind();
        let field = error.field();
        let detail = error.to_string();
        let interface = error.into_interface(self.correlation_id.clone());
        tracing::warn!(
            event_name = "cli.command.failed",
            error_class = class,
            field = field.unwrap_or_default(),
            correlation_id = interface.correlation_id(),
            "{detail}"
        );
        Failure {
            class,
            field,
            message: format!(
                "{} {detail} (correlation_id: {})",
                interface.user_message(),
                interface.correlation_id()
            ),
            exit_code: 6,
        }
    }

    pub(crate) fn finish(self, result: Result<CommandResult, Failure>) -> CommandResult {
        result.unwrap_or_else(|failure| failure.into_result(self.command))
    }
}

/// Connects and applies pending migrations so every data command sees the current schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database).await.map_err(Failure::connectivity)?;
    migrations::run_pending(&pool).await.map_err(Failure::migration)?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use bakeplan_core::errors::{ApplicationError, DomainError};
    use bakeplan_core::config::ConfigOverrides;
    use serde_json::{json, Value};

    use super::{CommandResult, Invocation};

    #[test]
    fn success_payload_includes_data_only_when_present() {
        let plain: Value =
            serde_json::from_str(&CommandResult::success("migrate", "done").output).expect("json");
        assert!(plain.get("data").is_none());

        let with_data: Value = serde_json::from_str(
            &CommandResult::success_with_data("forecast", "done", Some(json!({"total": 3})))
                .output,
        )
        .expect("json");
        assert_eq!(with_data["data"]["total"], 3);
        assert_eq!(with_data["status"], "ok");
        assert!(with_data.get("field").is_none());
    }

    #[test]
    fn application_failures_carry_kind_and_correlation_id() {
        let invocation = match Invocation::start("forecast", &ConfigOverrides {
            database_url: Some("sqlite::memory:".to_string()),
            ..ConfigOverrides::default()
        }) {
            Ok(invocation) => invocation,
            Err(result) => panic!("invocation should start: {}", result.output),
        };
        let failure = invocation.application_failure(ApplicationError::from(
            DomainError::InsufficientData { required: 14, available: 5 },
        ));
        let result = failure.into_result("forecast");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 6);
        assert_eq!(payload["error_class"], "insufficient_data");
        assert_eq!(payload["field"], "history");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains(&invocation.correlation_id));
        assert!(message.contains("Not enough sales history"));
    }
}
