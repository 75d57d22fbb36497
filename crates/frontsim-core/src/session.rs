//! Generation loop
//!
//! Drives one connected peer: per tick it advances the burst schedule,
//! synthesizes a sample, offers it to the delivery pipeline, updates the
//! stats and sleeps for the inter-event interval. The cancellation token is
//! checked once per tick; the pacing sleep itself is not interrupted.
//!
//! Bursts follow the synthetic tick timeline (the same clock as `t_us`), so
//! where a burst begins in the sample sequence does not depend on scheduling
//! jitter. Stats windows use the measured clock.

use crate::delivery::DeliveryPipeline;
use crate::generator::{DEFAULT_RATE_HZ, EventGenerator, clamp_rate_hz};
use crate::stats::{StatsAggregator, StatsReport};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Loop parameters that are not part of sample synthesis.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub rate_hz: f64,
    pub stats_interval: Duration,
    /// Stop after this many ticks; unbounded when `None`
    pub max_events: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rate_hz: DEFAULT_RATE_HZ,
            stats_interval: Duration::from_secs(5),
            max_events: None,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / clamp_rate_hz(self.rate_hz))
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The shutdown token fired
    Cancelled,
    /// A write or flush to the peer failed
    TransportClosed,
    /// The configured tick limit was reached
    Completed,
}

/// Totals reported once the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub sent_total: u64,
    pub dropped_total: u64,
    pub ticks: u64,
    pub reason: EndReason,
}

/// Run the generation loop until cancellation, transport failure or the tick
/// limit. Every closed stats window is handed to `on_report` before the
/// pipeline is flushed.
pub async fn run_session<W, F>(
    generator: &mut EventGenerator,
    pipeline: &mut DeliveryPipeline<W>,
    config: &SessionConfig,
    token: &CancellationToken,
    mut on_report: F,
) -> SessionSummary
where
    W: AsyncWrite + Unpin,
    F: FnMut(&StatsReport),
{
    let start = Instant::now();
    let interval = config.tick_interval();
    let mut stats = StatsAggregator::new(
        generator.weights().len(),
        config.stats_interval,
        Duration::ZERO,
    );
    let mut ticks: u64 = 0;

    let reason = loop {
        if token.is_cancelled() {
            info!(ticks, "Shutdown requested");
            break EndReason::Cancelled;
        }
        if config.max_events.is_some_and(|max| ticks >= max) {
            break EndReason::Completed;
        }

        generator.update_burst(generator.session_time());
        let sample = generator.next_sample();
        let outcome = match pipeline.emit(&sample, generator.rng()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, ticks, "Send failed, ending session");
                break EndReason::TransportClosed;
            }
        };
        stats.record(outcome, sample.channel);
        ticks += 1;

        if let Some(report) = stats.poll(start.elapsed()) {
            on_report(&report);
            if let Err(e) = pipeline.flush().await {
                error!(error = %e, ticks, "Flush failed, ending session");
                break EndReason::TransportClosed;
            }
        }

        sleep(interval).await;
    };

    if let Err(e) = pipeline.flush().await {
        warn!(error = %e, "Final flush failed");
    }

    SessionSummary {
        sent_total: stats.sent_total(),
        dropped_total: stats.dropped_total(),
        ticks,
        reason,
    }
}
