//! Command-line options.
//!
//! Options that may also come from the config file are `Option`s here so an
//! explicit flag can be told apart from its default.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "frontsim")]
#[command(about = "Multi-channel detector front-end emulator streaming JSON lines over TCP")]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 9001)]
    pub port: u16,

    /// Number of channels, 1..=64 [default: 4]
    #[arg(short, long, allow_negative_numbers = true)]
    pub channels: Option<i64>,

    /// Mark a channel as dead (repeatable)
    #[arg(long = "dead-channel", value_name = "IDX", allow_negative_numbers = true)]
    pub dead_channels: Vec<i64>,

    /// Aggregate event rate in Hz [default: 200]
    #[arg(short, long, allow_negative_numbers = true)]
    pub rate_hz: Option<f64>,

    /// Seed for a reproducible stream
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Periodic channel bursts [default: off]
    #[arg(long, value_enum)]
    pub burst_mode: Option<BurstMode>,

    /// Seconds between bursts [default: 12]
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub burst_interval: Option<i64>,

    /// Seconds a burst lasts [default: 3]
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub burst_duration: Option<i64>,

    /// Probability of dropping each sample, 0..=1
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub drop_rate: f64,

    /// Seconds between stats lines
    #[arg(long, value_name = "SECS", default_value_t = 5, allow_negative_numbers = true)]
    pub stats_interval: i64,

    /// Stop after this many events
    #[arg(long, value_name = "N")]
    pub max_events: Option<u64>,

    /// Debug-level diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BurstMode {
    On,
    Off,
}

impl BurstMode {
    pub fn enabled(self) -> bool {
        self == BurstMode::On
    }
}
