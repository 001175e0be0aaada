use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::forecast::{
    ForecastParams, FORECAST_DAYS_RANGE, HISTORY_DAYS_RANGE, WINDOW_SIZE_RANGE,
};
use crate::forecast::TrainingConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ForecastConfig {
    pub history_days: u32,
    pub forecast_days: usize,
    pub window_size: usize,
    pub training_epochs: usize,
    pub learning_rate: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let params = ForecastParams::default();
        let training = TrainingConfig::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://bakeplan.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            forecast: ForecastConfig {
                history_days: params.history_days,
                forecast_days: params.forecast_days,
                window_size: params.window_size,
                training_epochs: training.epochs,
                learning_rate: training.learning_rate,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ForecastConfig {
    pub fn params(&self) -> ForecastParams {
        ForecastParams {
            history_days: self.history_days,
            forecast_days: self.forecast_days,
            window_size: self.window_size,
        }
    }

    pub fn training(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.training_epochs,
            learning_rate: self.learning_rate,
            ..TrainingConfig::default()
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bakeplan.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(forecast) = patch.forecast {
            if let Some(history_days) = forecast.history_days {
                self.forecast.history_days = history_days;
            }
            if let Some(forecast_days) = forecast.forecast_days {
                self.forecast.forecast_days = forecast_days;
            }
            if let Some(window_size) = forecast.window_size {
                self.forecast.window_size = window_size;
            }
            if let Some(training_epochs) = forecast.training_epochs {
                self.forecast.training_epochs = training_epochs;
            }
            if let Some(learning_rate) = forecast.learning_rate {
                self.forecast.learning_rate = learning_rate;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BAKEPLAN_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BAKEPLAN_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("BAKEPLAN_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BAKEPLAN_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("BAKEPLAN_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BAKEPLAN_FORECAST_HISTORY_DAYS") {
            self.forecast.history_days = parse_env("BAKEPLAN_FORECAST_HISTORY_DAYS", &value)?;
        }
        if let Some(value) = read_env("BAKEPLAN_FORECAST_DAYS") {
            self.forecast.forecast_days = parse_env("BAKEPLAN_FORECAST_DAYS", &value)?;
        }
        if let Some(value) = read_env("BAKEPLAN_FORECAST_WINDOW_SIZE") {
            self.forecast.window_size = parse_env("BAKEPLAN_FORECAST_WINDOW_SIZE", &value)?;
        }
        if let Some(value) = read_env("BAKEPLAN_FORECAST_TRAINING_EPOCHS") {
            self.forecast.training_epochs =
                parse_env("BAKEPLAN_FORECAST_TRAINING_EPOCHS", &value)?;
        }
        if let Some(value) = read_env("BAKEPLAN_FORECAST_LEARNING_RATE") {
            self.forecast.learning_rate = parse_env("BAKEPLAN_FORECAST_LEARNING_RATE", &value)?;
        }

        let log_level =
            read_env("BAKEPLAN_LOGGING_LEVEL").or_else(|| read_env("BAKEPLAN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BAKEPLAN_LOGGING_FORMAT").or_else(|| read_env("BAKEPLAN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_forecast(&self.forecast)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bakeplan.toml"), PathBuf::from("config/bakeplan.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_forecast(forecast: &ForecastConfig) -> Result<(), ConfigError> {
    if !HISTORY_DAYS_RANGE.contains(&forecast.history_days) {
        return Err(ConfigError::Validation(format!(
            "forecast.history_days must be in range {}..={}",
            HISTORY_DAYS_RANGE.start(),
            HISTORY_DAYS_RANGE.end()
        )));
    }
    if !FORECAST_DAYS_RANGE.contains(&forecast.forecast_days) {
        return Err(ConfigError::Validation(format!(
            "forecast.forecast_days must be in range {}..={}",
            FORECAST_DAYS_RANGE.start(),
            FORECAST_DAYS_RANGE.end()
        )));
    }
    if !WINDOW_SIZE_RANGE.contains(&forecast.window_size) {
        return Err(ConfigError::Validation(format!(
            "forecast.window_size must be in range {}..={}",
            WINDOW_SIZE_RANGE.start(),
            WINDOW_SIZE_RANGE.end()
        )));
    }
    if forecast.training_epochs == 0 || forecast.training_epochs > 100_000 {
        return Err(ConfigError::Validation(
            "forecast.training_epochs must be in range 1..=100000".to_string(),
        ));
    }
    let rate = forecast.learning_rate;
    if !rate.is_finite() || rate <= 0.0 || rate > 2.0 {
        return Err(ConfigError::Validation(
            "forecast.learning_rate must be greater than 0 and at most 2".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    forecast: Option<ForecastPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    history_days: Option<u32>,
    forecast_days: Option<usize>,
    window_size: Option<usize>,
    training_epochs: Option<usize>,
    learning_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
