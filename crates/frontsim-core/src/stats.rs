//! Stats Aggregator
//!
//! Lifetime sent/dropped totals plus per-window counters that reset at each
//! report boundary.

use crate::delivery::EmitOutcome;
use std::fmt;
use std::time::Duration;

/// Column legend printed once before the first report.
pub const STATS_HEADER: &str = "Stats: elapsed_s sent_rate_hz sent dropped per_channel_counts";

/// Summary of one reporting window.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    /// Measured window length, not the nominal interval
    pub elapsed: Duration,
    pub sent: u64,
    pub dropped: u64,
    pub per_channel: Vec<u64>,
}

impl StatsReport {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn sent_rate_hz(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.sent as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats: {:.2} {:.2} {} {}",
            self.elapsed_secs(),
            self.sent_rate_hz(),
            self.sent,
            self.dropped
        )?;
        for (ch, count) in self.per_channel.iter().enumerate() {
            write!(f, " ch{}={}", ch, count)?;
        }
        Ok(())
    }
}

/// Running counters for the generation loop.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    interval: Duration,
    last_report: Duration,
    sent_total: u64,
    dropped_total: u64,
    sent_interval: u64,
    dropped_interval: u64,
    per_channel: Vec<u64>,
}

impl StatsAggregator {
    /// `start` is the clock reading the first window is measured from.
    pub fn new(channels: usize, interval: Duration, start: Duration) -> Self {
        Self {
            interval,
            last_report: start,
            sent_total: 0,
            dropped_total: 0,
            sent_interval: 0,
            dropped_interval: 0,
            per_channel: vec![0; channels],
        }
    }

    pub fn record(&mut self, outcome: EmitOutcome, channel: usize) {
        match outcome {
            EmitOutcome::Sent => self.record_sent(channel),
            EmitOutcome::Dropped => self.record_dropped(),
        }
    }

    pub fn record_sent(&mut self, channel: usize) {
        self.sent_total += 1;
        self.sent_interval += 1;
        if let Some(count) = self.per_channel.get_mut(channel) {
            *count += 1;
        }
    }

    pub fn record_dropped(&mut self) {
        self.dropped_total += 1;
        self.dropped_interval += 1;
    }

    pub fn sent_total(&self) -> u64 {
        self.sent_total
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    /// Close the window if `now` is at least one interval past the last report.
    pub fn poll(&mut self, now: Duration) -> Option<StatsReport> {
        let elapsed = now.checked_sub(self.last_report)?;
        if elapsed < self.interval {
            return None;
        }
        let report = StatsReport {
            elapsed,
            sent: self.sent_interval,
            dropped: self.dropped_interval,
            per_channel: self.per_channel.clone(),
        };
        self.last_report = now;
        self.sent_interval = 0;
        self.dropped_interval = 0;
        self.per_channel.fill(0);
        Some(report)
    }
}
