//! # Touch Replay
//!
//! Feeds recorded blob detections through the touch tracking engine and
//! prints every published event as a JSON line. Useful for tuning thresholds
//! against captured sessions without a camera attached.

mod config;
mod record;

use crate::config::ReplayConfig;
use crate::record::FrameRecord;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use touch_telemetry::{MetricsCollector, MetricsListener};
use touch_tracker::{BroadcastListener, TouchEngine};

#[derive(Parser, Debug)]
#[command(name = "touch-replay", about = "Replay recorded blob detections through the touch tracker")]
struct Cli {
    /// JSON-lines recording, one frame per line; reads stdin when omitted
    input: Option<PathBuf>,
    /// Configuration file, extension optional
    #[arg(long, default_value = "touch-replay")]
    config: String,
    /// Publish raw events as if a calibration session were active
    #[arg(long)]
    calibrating: bool,
    /// Print the Prometheus export after the replay
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = ReplayConfig::load(&cli.config)?;
    config.calibrating |= cli.calibrating;
    config.metrics |= cli.metrics;

    info!("Starting touch replay v{}", env!("CARGO_PKG_VERSION"));
    info!("   Frame: {}x{}", config.tracker.frame.width(), config.tracker.frame.height());
    info!("   Calibrating: {}", config.calibrating);
    info!("   Metrics: {}", config.metrics);

    let mut engine = TouchEngine::with_config(config.tracker.clone())?;
    engine.set_calibrating(config.calibrating);

    let metrics = Arc::new(MetricsCollector::new()?);
    if config.metrics {
        engine.subscribe(Arc::new(MetricsListener::new(metrics.clone())));
    }

    let bridge = if config.raw_events {
        BroadcastListener::new(config.channel_capacity).with_raw()
    } else {
        BroadcastListener::new(config.channel_capacity)
    };
    let bridge = Arc::new(bridge);
    let printer = tokio::spawn(print_events(bridge.subscribe()));
    let bridge_id = engine.subscribe(bridge.clone());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            info!("Replaying {}", path.display());
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Replaying from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };

    tokio::select! {
        result = replay(reader, &mut engine, &metrics) => result?,
        _ = signal::ctrl_c() => info!("Received Ctrl+C, stopping replay"),
    }

    // Closing the channel lets the printer drain and exit
    engine.unsubscribe(bridge_id);
    drop(bridge);
    if let Err(e) = printer.await {
        warn!("Event printer stopped abnormally: {}", e);
    }

    let stats = engine.stats();
    info!("Replay complete: {}", stats);
    metrics.log_stats(&stats);

    if config.metrics {
        print!("{}", metrics.export()?);
    }

    Ok(())
}

/// Initialize logging with tracing; logs go to stderr so stdout stays JSON
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,touch_tracker=info,touch_replay=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Read frames line by line and feed them to the engine
async fn replay<R>(reader: R, engine: &mut TouchEngine, metrics: &MetricsCollector) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut skipped = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;

        let record = match FrameRecord::parse_line(&line) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                skipped += 1;
                continue;
            }
        };

        let (mut frame, objects) = record.into_frames();
        let detections = frame.len() as u64;

        let started = Instant::now();
        let events = engine.process_frame(&mut frame);
        engine.process_objects(&objects);
        metrics.record_frame(started.elapsed().as_secs_f64(), detections);
        metrics.sync_engine(engine);

        debug!("Line {}: {} detections, {} events", line_no, detections, events.len());

        // Give the printer a chance to keep up with the channel
        tokio::task::yield_now().await;
    }

    if skipped > 0 {
        warn!("Skipped {} malformed lines", skipped);
    }
    Ok(())
}

/// Print each event as one JSON line until the channel closes
async fn print_events(mut rx: tokio::sync::broadcast::Receiver<touch_core::TouchEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Failed to serialize event {}: {}", event.id, e),
            },
            Err(RecvError::Lagged(missed)) => {
                warn!("Printer lagged, {} events dropped", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
