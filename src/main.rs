//! TourGuide - resilient in-page product tours
//!
//! Command line entry point: inspect how tours resolve against captured page
//! snapshots and simulate the orchestrator offline.

mod cli;
mod cmd_inspect;
mod cmd_simulate;
mod page;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tourguide_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use tourguide_core::ManagerConfig;

use crate::cli::{Cli, Commands, ConfigAction};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize tracing on stderr, plus daily-rotated files when configured.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = fmt::layer().with_writer(std::io::stderr).with_target(true);
    layers.push(if logging.is_json() {
        console.json().boxed()
    } else {
        console.with_ansi(true).boxed()
    });

    let mut guard = None;
    if let Some(dir) = &logging.file {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("tourguide")
            .filename_suffix("log")
            .max_log_files(14)
            .build(dir)?;
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(worker);
        layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("invalid log level '{}'", logging.level))?;

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;
    Ok(guard)
}

fn manager_config(config: &Config) -> ManagerConfig {
    ManagerConfig {
        poll: config.poll.clone(),
        default_precision: config.resolver.default_precision,
        key_prefix: config.storage.key_prefix.clone(),
        telemetry_enabled: config.telemetry.enabled,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    let _guard = init_tracing(&config.logging)?;
    debug!("TourGuide v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Validate { page, tour, format } => cmd_inspect::validate(
            &page,
            tour.as_deref(),
            config.resolver.default_precision,
            format,
        ),
        Commands::Resolve {
            page,
            tour,
            step,
            precision,
        } => {
            let precision = precision.unwrap_or(config.resolver.default_precision);
            cmd_inspect::resolve(&page, &tour, step, precision)
        }
        Commands::Simulate {
            page,
            store,
            flags,
            ticks,
            complete,
            format,
        } => {
            let options = cmd_simulate::SimulateOptions {
                store,
                flags,
                ticks,
                complete,
                format,
            };
            cmd_simulate::run(&page, options, manager_config(&config)).await
        }
        Commands::Config { action } => config_command(action, &config),
    }
}

fn config_command(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Check => {
            let result = ConfigValidator::validate(config)?;
            for warning in &result.warnings {
                println!("warning: {}: {}", warning.path, warning.message);
            }
            for error in &result.errors {
                println!("error: {}: {}", error.path, error.message);
            }
            result.into_error()?;
            println!("Configuration OK");
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}
