use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bakeplan_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
}

const DATABASE_URL: Field =
    Field { key_path: "database.url", env_keys: &["BAKEPLAN_DATABASE_URL"] };
const LOG_LEVEL: Field = Field {
    key_path: "logging.level",
    env_keys: &["BAKEPLAN_LOGGING_LEVEL", "BAKEPLAN_LOG_LEVEL"],
};
const LOG_FORMAT: Field = Field {
    key_path: "logging.format",
    env_keys: &["BAKEPLAN_LOGGING_FORMAT", "BAKEPLAN_LOG_FORMAT"],
};

pub fn run(overrides: &ConfigOverrides) -> String {
    let config = match AppConfig::load(LoadOptions {
        overrides: overrides.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |field: &Field, overridden: bool| {
        if overridden {
            return "flag".to_string();
        }
        field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        )
    };
    let plain = |key_path: &'static str, env_key: &'static str| {
        field_source(key_path, &[env_key], config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        DATABASE_URL.key_path,
        &config.database.url,
        source(&DATABASE_URL, overrides.database_url.is_some()),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        plain("database.max_connections", "BAKEPLAN_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        plain("database.timeout_secs", "BAKEPLAN_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "forecast.history_days",
        &config.forecast.history_days.to_string(),
        plain("forecast.history_days", "BAKEPLAN_FORECAST_HISTORY_DAYS"),
    ));
    lines.push(render_line(
        "forecast.forecast_days",
        &config.forecast.forecast_days.to_string(),
        plain("forecast.forecast_days", "BAKEPLAN_FORECAST_DAYS"),
    ));
    lines.push(render_line(
        "forecast.window_size",
        &config.forecast.window_size.to_string(),
        plain("forecast.window_size", "BAKEPLAN_FORECAST_WINDOW_SIZE"),
    ));
    lines.push(render_line(
        "forecast.training_epochs",
        &config.forecast.training_epochs.to_string(),
        plain("forecast.training_epochs", "BAKEPLAN_FORECAST_TRAINING_EPOCHS"),
    ));
    lines.push(render_line(
        "forecast.learning_rate",
        &config.forecast.learning_rate.to_string(),
        plain("forecast.learning_rate", "BAKEPLAN_FORECAST_LEARNING_RATE"),
    ));

    lines.push(render_line(
        LOG_LEVEL.key_path,
        &config.logging.level,
        source(&LOG_LEVEL, overrides.log_level.is_some()),
    ));
    lines.push(render_line(
        LOG_FORMAT.key_path,
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        source(&LOG_FORMAT, overrides.log_format.is_some()),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("bakeplan.toml"), PathBuf::from("config/bakeplan.toml")]
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
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
