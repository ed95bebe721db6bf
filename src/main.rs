//! Geopothole CLI entry point.
//!
//! Provides `serve` for running the marker service, and `report` /
//! `simulate` for pushing detections into a running service.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use geopothole::config::GeopotholeConfig;
use geopothole::reporter::DetectionReporter;
use geopothole::server::{self, AppState};
use geopothole::session::SessionRegistry;

/// How often expired login sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Geopothole: pothole marker store and ingestion service.
#[derive(Parser)]
#[command(name = "geopothole", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,
    /// Submit one detection through the automated-detection ingress.
    Report {
        /// Base URL of a running service.
        #[arg(long, default_value = "http://localhost:5000")]
        api_url: String,
        /// Latitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Detector confidence score.
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Submit simulated detections jittered around a base position.
    Simulate {
        /// Base URL of a running service.
        #[arg(long, default_value = "http://localhost:5000")]
        api_url: String,
        /// Base latitude in degrees.
        #[arg(long, default_value_t = 12.9716, allow_hyphen_values = true)]
        lat: f64,
        /// Base longitude in degrees.
        #[arg(long, default_value_t = 77.5946, allow_hyphen_values = true)]
        lng: f64,
        /// Number of detections to send.
        #[arg(long, default_value_t = 5)]
        count: u32,
        /// Seconds between detections.
        #[arg(long, default_value_t = 3)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => handle_serve().await,
        Command::Report {
            api_url,
            lat,
            lng,
            confidence,
        } => handle_report(&api_url, lat, lng, confidence).await,
        Command::Simulate {
            api_url,
            lat,
            lng,
            count,
            interval_secs,
        } => handle_simulate(&api_url, lat, lng, count, interval_secs).await,
    }
}

/// Run the marker service until Ctrl-C or SIGTERM.
async fn handle_serve() -> anyhow::Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let config =
        geopothole::logging::with_startup_logging("info", std::io::stderr, GeopotholeConfig::load)
            .context("failed to load configuration")?;
    let _logging_guard =
        geopothole::logging::init_production(&config.logs_dir(), &config.server.log_level)?;
    if dotenv_loaded {
        debug!("loaded .env from working directory");
    }

    let state = AppState::from_config(&config).await?;
    spawn_session_sweeper(Arc::clone(&state.sessions));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(version = env!("CARGO_PKG_VERSION"), %addr, "geopothole starting");
    server::serve(listener, state, shutdown_signal()).await?;
    info!("geopothole stopped");
    Ok(())
}

async fn handle_report(
    api_url: &str,
    lat: f64,
    lng: f64,
    confidence: Option<f64>,
) -> anyhow::Result<()> {
    geopothole::logging::init_cli("info");
    let reporter = DetectionReporter::new(api_url)?;
    let marker = reporter
        .report(lat, lng, confidence)
        .await
        .with_context(|| format!("failed to report to {}", reporter.endpoint()))?;
    println!("{}", serde_json::to_string_pretty(&marker)?);
    Ok(())
}

async fn handle_simulate(
    api_url: &str,
    lat: f64,
    lng: f64,
    count: u32,
    interval_secs: u64,
) -> anyhow::Result<()> {
    geopothole::logging::init_cli("info");
    let reporter = DetectionReporter::new(api_url)?;
    info!(count, endpoint = reporter.endpoint(), "simulating detections");
    let accepted = reporter
        .simulate(lat, lng, count, Duration::from_secs(interval_secs))
        .await;
    info!(accepted, count, "simulation finished");
    anyhow::ensure!(accepted == count, "{accepted} of {count} detections accepted");
    Ok(())
}

fn spawn_session_sweeper(sessions: Arc<SessionRegistry>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                debug!(purged, "expired sessions swept");
            }
        }
    });
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
