//! Application entry point for the `airwatch-nowcast` monitor.
//!
//! This binary orchestrates the full monitoring run:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the configured sensor sources (refusing to start with none)
//! - Building the monitoring session shared by all tasks
//! - Starting the persistence writer when InfluxDB is configured
//! - Starting the AQI updater and the acquisition thread
//! - Serving the status routes until Ctrl-C
//!
//! # Environment Variables
//! - `SENSOR_SOURCES` (**required**) – comma-separated sensor sources
//! - `INFLUXDB_TOKEN` (optional) – enables persistence
//! - `AQI_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `AQI_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the complete list.
use std::{env, sync::Arc, thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing::Instrument;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use airwatch::persistence::{self, InfluxWriter};
use airwatch::{acquisition, config, routes, sensor, updater, Session, StopSignal};

/// Queue depth between the monitoring loops and the persistence writer.
const PERSIST_QUEUE_LEN: usize = 1024;

/// How long shutdown waits for queued points to be written.
const PERSIST_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    // `.env` first so it can set the logging variables
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let mut sources = sensor::open_sources(&cfg.sensor_sources, cfg.sim_interval)
        .context("Refusing to start without a working sensor")?;
    if sources.len() < cfg.sensor_sources.len() {
        tracing::warn!(
            "Starting with {} of {} configured sensor(s)",
            sources.len(),
            cfg.sensor_sources.len()
        );
    }

    let session = Arc::new(Session::new(cfg.session_config(sources.len())));
    let span = tracing::info_span!("session", id = %session.id());
    tracing::info!(parent: &span, "Monitoring session started with {} sensor(s)", sources.len());

    let stop = StopSignal::new();

    // Persistence is optional; without it the senders are simply absent
    let (persist_tx, writer) = match cfg.influx.clone() {
        Some(influx) => {
            let (tx, rx) = persistence::channel(PERSIST_QUEUE_LEN);
            let writer = tokio::spawn(
                persistence::run_writer(InfluxWriter::new(influx), rx).instrument(span.clone()),
            );
            (Some(tx), Some(writer))
        }
        None => (None, None),
    };

    let updater = updater::spawn(
        session.clone(),
        cfg.update_interval,
        persist_tx.clone(),
        stop.subscribe(),
    );

    // Sensor reads block, so acquisition gets its own OS thread
    let acquisition = {
        let session = session.clone();
        let listener = stop.subscribe();
        let span = span.clone();
        thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || {
                let _entered = span.enter();
                acquisition::run(&session, &mut sources, persist_tx.as_ref(), &listener)
            })
            .context("Failed to spawn acquisition thread")?
    };

    let app: Router = routes::router(session.clone());
    let listener = tokio::net::TcpListener::bind(cfg.status_addr)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", cfg.status_addr, e))?;
    tracing::info!("Listening on {}", cfg.status_addr);

    let mut server_stop = stop.subscribe();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_stop.stopped().await })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!(parent: &span, "Real-time data sampling stopped.");
    stop.stop();

    let published_ticks = updater.await?;
    server.await??;

    // A source blocked in `read` can outlive shutdown; don't wait for it
    if acquisition.is_finished() {
        match acquisition.join() {
            Ok(summary) => tracing::info!(parent: &span, ?summary, "Acquisition finished"),
            Err(_) => tracing::error!(parent: &span, "Acquisition thread panicked"),
        }
    } else {
        tracing::warn!(parent: &span, "Acquisition still blocked on a sensor read, exiting anyway");
    }

    if let Some(writer) = writer {
        match tokio::time::timeout(PERSIST_FLUSH_TIMEOUT, writer).await {
            Ok(Ok(stats)) => tracing::info!(parent: &span, ?stats, "Persistence flushed"),
            Ok(Err(e)) => tracing::error!(parent: &span, "Persistence writer failed: {}", e),
            Err(_) => tracing::warn!(parent: &span, "Timed out flushing persistence queue"),
        }
    }

    tracing::info!(
        parent: &span,
        published_ticks,
        samples = session.sample_count(),
        "Monitoring session ended"
    );
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AQI_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, falling back to `AQI_LOG_LEVEL`
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AQI_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AQI_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AQI_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
