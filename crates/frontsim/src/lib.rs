//! # frontsim - Detector Front-End Emulator
//!
//! Launcher around [`frontsim_core`]: resolves configuration, binds the TCP
//! listener, serves one consumer and reports on stdout.
//!
//! Usage:
//!   frontsim --port 9001 --channels 8 --rate-hz 500 --burst-mode on
//!   frontsim --config detector.json --seed 42 --max-events 10000

pub mod cli;
pub mod config;
pub mod output;
pub mod server;

pub use cli::{BurstMode, Cli};
pub use config::{FileConfig, Settings};
pub use server::TransportError;

use frontsim_core::{DeliveryPipeline, EventGenerator, STATS_HEADER, SessionSummary, run_session};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

/// Install the stderr diagnostics subscriber.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// Wait for one consumer and stream to it until the session ends.
///
/// Returns `Ok(None)` when shutdown was requested before anyone connected.
pub async fn serve(
    listener: &TcpListener,
    generator: &mut EventGenerator,
    settings: &Settings,
    token: &CancellationToken,
) -> Result<Option<SessionSummary>, TransportError> {
    let Some((stream, peer)) = server::accept_one(listener, token).await? else {
        info!("Shutdown before any client connected");
        return Ok(None);
    };
    println!("Client connected: {}", peer);
    info!(%peer, "Streaming started");

    let mut pipeline = DeliveryPipeline::new(stream, settings.drop_rate);
    println!("{}", STATS_HEADER);
    let summary = run_session(generator, &mut pipeline, &settings.session, token, |report| {
        println!("{}", report)
    })
    .await;
    info!(
        reason = ?summary.reason,
        ticks = summary.ticks,
        bytes = pipeline.bytes_written(),
        "Session ended"
    );

    let mut stream = pipeline.into_inner();
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "Client socket shutdown failed");
    }
    for line in output::summary(&summary) {
        println!("{}", line);
    }
    Ok(Some(summary))
}
