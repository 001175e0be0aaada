pub mod commands;

use std::process::ExitCode;

use anyhow::anyhow;
use bakeplan_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use commands::forecast::ForecastArgs;
use commands::requirements::{QuantitySource, RequirementsArgs};

#[derive(Debug, Parser)]
#[command(
    name = "bakeplan",
    about = "Bakery demand forecasting and ingredient planning",
    long_about = "Forecast daily recipe demand from sales history and turn quantities into ingredient requirements and shortages.",
    after_help = "Examples:\n  bakeplan seed\n  bakeplan forecast --recipe 1 --save\n  bakeplan requirements --recipe 1 --quantity 60"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Override the configured database URL")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_log_format, help = "compact, pretty or json")]
    log_format: Option<LogFormat>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database_url: self.database_url.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Migrate and load the deterministic demo bakery")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Forecast daily demand for one recipe")]
    Forecast {
        #[arg(long, help = "Recipe id")]
        recipe: String,
        #[arg(long = "days", help = "Days of sales history to train on")]
        history_days: Option<u32>,
        #[arg(long, help = "Number of days to forecast")]
        forecast_days: Option<usize>,
        #[arg(long, help = "Lag window length in days")]
        window_size: Option<usize>,
        #[arg(long, help = "Persist the forecast")]
        save: bool,
        #[arg(long, help = "Select history up to the end of this day (YYYY-MM-DD)")]
        as_of: Option<NaiveDate>,
    },
    #[command(about = "List saved forecasts, most recent first")]
    Forecasts {
        #[arg(long, help = "Only forecasts for this recipe id")]
        recipe: Option<String>,
    },
    #[command(about = "Ingredient requirements and shortages for a production quantity")]
    Requirements {
        #[arg(long, help = "Recipe id")]
        recipe: String,
        #[arg(long, required_unless_present = "forecast", conflicts_with = "forecast")]
        quantity: Option<f64>,
        #[arg(long, help = "Use the total of a saved forecast as the quantity")]
        forecast: Option<String>,
        #[arg(long, help = "Extra fraction of each requirement to keep on hand, e.g. 0.1")]
        safety_margin: Option<Decimal>,
    },
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse::<LogFormat>().map_err(|error| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let overrides = cli.global.overrides();

    if let Err(error) = init_logging(&overrides) {
        eprintln!("logging disabled: {error}");
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&overrides),
        Command::Seed => commands::seed::run(&overrides),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&overrides) }
        }
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(&overrides, json),
        },
        Command::Forecast { recipe, history_days, forecast_days, window_size, save, as_of } => {
            commands::forecast::run(
                &overrides,
                &ForecastArgs { recipe, history_days, forecast_days, window_size, save, as_of },
            )
        }
        Command::Forecasts { recipe } => commands::forecasts::run(&overrides, recipe.as_deref()),
        Command::Requirements { recipe, quantity, forecast, safety_margin } => {
            let quantity = match (quantity, forecast) {
                (_, Some(forecast_id)) => QuantitySource::SavedForecast(forecast_id),
                (Some(quantity), None) => QuantitySource::Explicit(quantity),
                (None, None) => QuantitySource::Explicit(f64::NAN),
            };
            commands::requirements::run(
                &overrides,
                &RequirementsArgs { recipe, quantity, safety_margin },
            )
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the stderr subscriber. A config that fails to load is reported by the command itself.
fn init_logging(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let Ok(config) =
        AppConfig::load(LoadOptions { overrides: overrides.clone(), ..LoadOptions::default() })
    else {
        return Ok(());
    };

    let filter = EnvFilter::try_new(&config.logging.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!("{error}"))
}
