//! # diskwatch
//!
//! Polls a set of Yandex.Disk folders and posts one Telegram message per
//! newly added file.
//!
//! ## Overview
//!
//! - **Startup**: configuration is loaded once, both API clients are built and
//!   the Yandex.Disk token is verified before anything is polled
//! - **Monitoring**: an initial scan seeds every folder silently, then each
//!   cycle announces files that were not there before
//! - **Shutdown**: Ctrl-C or SIGTERM stops the loop at its next wait
//!
//! `diskwatch check` verifies both tokens and every folder, then exits.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use diskwatch_config::{ConfigLoad, ConfigLoader};
use diskwatch_core::StorageBackend;
use diskwatch_server::{
    DEFAULT_LOG_FILTER,
    startup::{self, Services},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "diskwatch", version)]
#[command(about = "Announce new Yandex.Disk files in a Telegram chat")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, env = "DISKWATCH_ENV_FILE", global = true)]
    env_file: Option<PathBuf>,

    /// Path to a TOML configuration file (overrides DISKWATCH_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seconds between checks (overrides CHECK_INTERVAL_SECONDS)
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Run the initial scan and a single check cycle, then exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify both tokens and every configured folder, then exit
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ConfigLoad {
        mut config,
        warnings,
    } = load_config(&cli.serve)?;

    if let Some(path) = &config.metadata.env_file {
        info!(path = %path.display(), "loaded env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded configuration file");
    }
    for warning in &warnings {
        warn!("{warning}");
    }
    if let Some(seconds) = cli.serve.interval {
        config.check_interval = Duration::from_secs(seconds);
    }

    let services = Services::build(&config)?;

    match cli.command {
        Some(Command::Check) => run_check(&config, &services).await,
        None => run_monitor(&cli.serve, &config, &services).await,
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ConfigLoad> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    loader.load().context("failed to load configuration")
}

async fn run_monitor(
    args: &ServeArgs,
    config: &diskwatch_config::Config,
    services: &Services,
) -> anyhow::Result<()> {
    startup::verify_storage_access(services.storage.as_ref()).await?;

    info!(
        folders = %config.folders.join(", "),
        interval_secs = config.check_interval.as_secs(),
        "Starting Yandex.Disk monitor"
    );
    let mut monitor = services.monitor(config);

    if args.once {
        let report = monitor
            .run_once()
            .await
            .context("check cycle failed")?;
        info!(
            notified = report.notified(),
            failed_notifications = report.failed_notifications(),
            fetch_failures = report.fetch_failures(),
            "Single check complete"
        );
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));
    monitor.run(shutdown).await;
    info!("Monitor stopped");
    Ok(())
}

async fn run_check(
    config: &diskwatch_config::Config,
    services: &Services,
) -> anyhow::Result<()> {
    startup::verify_storage_access(services.storage.as_ref()).await?;
    startup::verify_bot(&services.sink).await?;

    let mut unreadable = Vec::new();
    for folder in &config.folders {
        match services.storage.list_names(folder).await {
            Ok(names) => {
                info!(folder = %folder, entries = names.len(), "folder is readable");
            }
            Err(err) => {
                warn!(folder = %folder, error = %err, "folder cannot be listed");
                unreadable.push(folder.as_str());
            }
        }
    }

    if !unreadable.is_empty() {
        anyhow::bail!("unreadable folders: {}", unreadable.join(", "));
    }
    info!("All checks passed");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
