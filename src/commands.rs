//! Subcommand handlers for the pelorus binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info};

use pelorus::sinks::{LatestFixTracker, TrackLogWriter};
use pelorus::source::{FileReplaySource, UdpSource};
use pelorus::{Pipeline, telemetry};

/// Interval between position summaries logged from the latest-fix state.
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Ingest live sentences from one or more UDP sources until interrupted.
pub async fn handle_run(
    mut udp_ports: Vec<u16>,
    track_log: Option<PathBuf>,
    metrics_port: Option<u16>,
) -> Result<()> {
    if udp_ports.is_empty() {
        info!(
            "No sources specified, listening on default port {}",
            UdpSource::DEFAULT_PORT
        );
        udp_ports.push(UdpSource::DEFAULT_PORT);
    }

    if let Some(port) = metrics_port {
        telemetry::install_metrics_exporter(port)?;
    }

    let mut pipeline = Pipeline::new();
    for port in udp_ports {
        pipeline = pipeline.with_source(format!("udp:{port}"), Box::new(UdpSource::on_port(port)));
    }

    let tracker = Arc::new(LatestFixTracker::new());
    pipeline = pipeline.with_observer(tracker.clone());
    pipeline = attach_track_log(pipeline, track_log)?;

    let token = pipeline.shutdown_token();
    spawn_signal_handler(token.clone());
    spawn_status_task(tracker, token);

    pipeline.run().await
}

/// Replay a recorded sentence log through the pipeline.
pub async fn handle_replay(file: PathBuf, track_log: Option<PathBuf>) -> Result<()> {
    let source_id = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "replay".to_string());

    let tracker = Arc::new(LatestFixTracker::new());
    let mut pipeline = Pipeline::new()
        .with_source(source_id, Box::new(FileReplaySource::new(&file)))
        .with_observer(tracker.clone());
    pipeline = attach_track_log(pipeline, track_log)?;

    spawn_signal_handler(pipeline.shutdown_token());
    pipeline.run().await?;

    for fix in tracker.snapshot() {
        info!(
            source = %fix.source_id,
            lat = fix.latitude,
            lon = fix.longitude,
            "final position"
        );
    }
    Ok(())
}

fn attach_track_log(pipeline: Pipeline, path: Option<PathBuf>) -> Result<Pipeline> {
    match path {
        Some(path) => Ok(pipeline.with_observer(Arc::new(TrackLogWriter::create(path)?))),
        None => Ok(pipeline),
    }
}

/// Translate SIGINT/SIGTERM into a cancellation so the pipeline drains
/// instead of dying mid-queue.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to register SIGTERM handler");
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to register SIGINT handler");
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, draining pipeline..."),
                _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), draining pipeline..."),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "unable to listen for shutdown signal");
                return;
            }
            info!("Received Ctrl+C, draining pipeline...");
        }

        token.cancel();
    });
}

/// Periodically log the latest position per source; this is the live
/// display surface when no richer frontend is attached.
fn spawn_status_task(tracker: Arc<LatestFixTracker>, token: CancellationToken) {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(STATUS_INTERVAL);
            // The immediate first tick would log an empty map.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                for fix in tracker.snapshot() {
                    info!(
                        source = %fix.source_id,
                        kind = %fix.sentence_type,
                        lat = fix.latitude,
                        lon = fix.longitude,
                        sats = fix.satellite_count,
                        speed_kts = fix.speed_knots,
                        "position"
                    );
                }
            }
        }
        .instrument(tracing::info_span!("status")),
    );
}
