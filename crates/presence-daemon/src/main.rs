mod cli;
mod discord;

use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use presence_api::{GoogleImageSearch, ImageSearchError, MusicBrainzClient, MusicBrainzError};
use presence_core::config::{AppConfig, SourceSpec};
use presence_core::cover_art::CoverArtResolver;
use presence_core::error::PresenceError;
use presence_core::orchestrator::PresenceEngine;
use presence_core::presence::PresenceSettings;
use presence_detect::{DetectError, VlcHttpSource};
use presence_runtime::Runtime;

use cli::Cli;
use discord::DiscordSink;

/// Crates whose logs are shown by default.
const LOG_TARGETS: [&str; 6] = [
    "vlc_presence",
    "presence_detect",
    "presence_parse",
    "presence_api",
    "presence_core",
    "presence_runtime",
];

#[derive(Debug, thiserror::Error)]
enum DaemonError {
    #[error(transparent)]
    Presence(#[from] PresenceError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("MusicBrainz client: {0}")]
    MusicBrainz(#[from] MusicBrainzError),
    #[error("image search client: {0}")]
    ImageSearch(#[from] ImageSearchError),
    #[error("could not start the Discord thread: {0}")]
    Discord(#[from] std::io::Error),
    #[error("{0}")]
    Check(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "vlc-presence failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to the terminal and to a daily file in the platform data directory.
///
/// `RUST_LOG` wins over the defaults unless `--verbose` is given.
fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { "info" };
    let defaults = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    let filter = if verbose {
        EnvFilter::new(&defaults)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&defaults))
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("vlc-presence")
        .filename_suffix("log")
        .build(AppConfig::log_dir());
    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("file logging disabled: {e}");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

async fn run(cli: Cli) -> Result<(), DaemonError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    cli.apply(&mut config);

    if cli.write_config {
        let path = match &cli.config {
            Some(path) => {
                config.save_to(path)?;
                path.clone()
            }
            None => config.save()?,
        };
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    let spec = config.resolve_source()?;
    if cli.check {
        return check(&spec).await;
    }
    tracing::info!(source = %spec, "Using status source");
    let source = spec.build()?;

    let resolver = if config.cover_art.enabled {
        let images = if config.cover_art.image_search {
            Some(GoogleImageSearch::new()?)
        } else {
            None
        };
        Some(CoverArtResolver::new(
            MusicBrainzClient::new()?,
            images,
            config.cache_ttl(),
        ))
    } else {
        tracing::info!("Cover art disabled");
        None
    };

    let sink = DiscordSink::start(config.discord.client_id.clone())?;
    let engine = PresenceEngine::new(
        resolver,
        sink,
        PresenceSettings::from_config(&config),
        config.general.status_timeout_secs,
    );
    let runtime = Runtime::from_config(source, engine, &config);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutting down");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                stop_tx.closed().await;
            }
        }
    });

    runtime.run(stop_rx).await;
    Ok(())
}

/// `--check`: report whether the configured source is usable.
async fn check(spec: &SourceSpec) -> Result<(), DaemonError> {
    match spec {
        SourceSpec::Http { port, password } => {
            let source = VlcHttpSource::new(*port, password.clone())?;
            let (running, message) = source.check_status().await;
            if running {
                println!("{message}");
                Ok(())
            } else {
                Err(DaemonError::Check(message))
            }
        }
        SourceSpec::File(path) if path.is_file() => {
            println!("Reading VLC status from {}", path.display());
            Ok(())
        }
        SourceSpec::File(path) => Err(DaemonError::Check(format!(
            "status file {} does not exist",
            path.display()
        ))),
    }
}
