//! Configuration loading and resolution.
//!
//! Effective settings are layered: built-in defaults, then the JSON config
//! file, then explicit command-line flags. Numeric values are clamped into
//! range instead of rejected.

use crate::cli::Cli;
use frontsim_core::burst::{BurstConfig, DEFAULT_BURST_DURATION, DEFAULT_BURST_INTERVAL};
use frontsim_core::generator::{DEFAULT_RATE_HZ, clamp_rate_hz};
use frontsim_core::{ConfigError, DistributionConfig, GeneratorConfig, MAX_CHANNELS, SessionConfig};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CHANNELS: usize = 4;

/// Keys accepted in the config file. All optional; unknown keys are ignored.
///
/// Counts and indices are read as numbers and truncated toward zero, so
/// `4.0` and `4` mean the same channel count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub channels: Option<f64>,
    pub rate_hz: Option<f64>,
    pub dead_channels: Option<Vec<f64>>,
    /// Index-aligned to channel id; missing trailing entries default to 1.0
    pub rate_multipliers: Option<Vec<f64>>,
    pub distribution: Option<DistributionConfig>,
    pub burst_mode: Option<bool>,
    pub burst_interval_s: Option<f64>,
    pub burst_duration_s: Option<f64>,
}

impl FileConfig {
    /// Read and parse a config file, validating distribution probabilities.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FileConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(dist) = &config.distribution {
            dist.validate()?;
        }
        Ok(config)
    }
}

/// Fully resolved startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub config_path: Option<PathBuf>,
    pub generator: GeneratorConfig,
    pub session: SessionConfig,
    pub drop_rate: f64,
}

impl Settings {
    /// Load the config file named on the command line (if any) and resolve.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file))
    }

    /// Merge defaults, file values and CLI flags, clamping as needed.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let channels = clamp_channels(cli.channels.or(file.channels.map(truncate)));
        let rate_hz = cli
            .rate_hz
            .or(file.rate_hz)
            .map_or(DEFAULT_RATE_HZ, clamp_rate_hz);

        let requested_dead = file
            .dead_channels
            .iter()
            .flatten()
            .map(|&idx| truncate(idx))
            .chain(cli.dead_channels.iter().copied());
        let mut dead_channels = BTreeSet::new();
        for idx in requested_dead {
            match usize::try_from(idx) {
                Ok(ch) if ch < channels => {
                    dead_channels.insert(ch);
                }
                _ => warn!(channel = idx, channels, "Ignoring out-of-range dead channel"),
            }
        }

        let rate_multipliers = file.rate_multipliers.map(|m| sanitize_multipliers(m, channels));

        let burst = BurstConfig {
            enabled: cli
                .burst_mode
                .map(|mode| mode.enabled())
                .or(file.burst_mode)
                .unwrap_or(false),
            interval: cli
                .burst_interval
                .map(|s| s as f64)
                .or(file.burst_interval_s)
                .map_or(DEFAULT_BURST_INTERVAL, clamp_secs),
            duration: cli
                .burst_duration
                .map(|s| s as f64)
                .or(file.burst_duration_s)
                .map_or(DEFAULT_BURST_DURATION, clamp_secs),
        };

        let drop_rate = if cli.drop_rate.is_nan() {
            0.0
        } else {
            cli.drop_rate.clamp(0.0, 1.0)
        };

        Self {
            host: cli.host.clone(),
            port: cli.port,
            config_path: cli.config.clone(),
            generator: GeneratorConfig {
                channels,
                dead_channels,
                rate_multipliers,
                rate_hz,
                seed: cli.seed,
                burst,
                distribution: file.distribution.unwrap_or_default(),
            },
            session: SessionConfig {
                rate_hz,
                stats_interval: Duration::from_secs(cli.stats_interval.max(1) as u64),
                max_events: cli.max_events.filter(|&n| n > 0),
            },
            drop_rate,
        }
    }
}

fn clamp_channels(requested: Option<i64>) -> usize {
    match requested {
        Some(n) => n.clamp(1, MAX_CHANNELS as i64) as usize,
        None => DEFAULT_CHANNELS,
    }
}

/// Toward zero, saturating; NaN becomes 0.
fn truncate(value: f64) -> i64 {
    value as i64
}

/// Whole seconds, at least one.
fn clamp_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs < 1.0 {
        Duration::from_secs(1)
    } else {
        Duration::from_secs(secs.min(u32::MAX as f64) as u64)
    }
}

fn sanitize_multipliers(mut multipliers: Vec<f64>, channels: usize) -> Vec<f64> {
    if multipliers.len() > channels {
        warn!(
            given = multipliers.len(),
            channels, "Ignoring rate multipliers beyond the channel count"
        );
        multipliers.truncate(channels);
    }
    for (channel, m) in multipliers.iter_mut().enumerate() {
        if m.is_nan() || *m < 0.0 {
            warn!(channel, multiplier = *m, "Negative rate multiplier clamped to 0");
            *m = 0.0;
        }
    }
    multipliers
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["frontsim"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::resolve(&cli(&[]), FileConfig::default());
        assert_eq!(settings.generator.channels, 4);
        assert_eq!(settings.generator.rate_hz, 200.0);
        assert!(settings.generator.dead_channels.is_empty());
        assert!(settings.generator.rate_multipliers.is_none());
        assert!(!settings.generator.burst.enabled);
        assert_eq!(settings.generator.burst.interval, Duration::from_secs(12));
        assert_eq!(settings.generator.burst.duration, Duration::from_secs(3));
        assert_eq!(settings.session.stats_interval, Duration::from_secs(5));
        assert_eq!(settings.drop_rate, 0.0);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"{
                "channels": 3,
                "rate_hz": 50.0,
                "dead_channels": [0],
                "rate_multipliers": [0.0, 1.0, 3.0],
                "burst_mode": true,
                "burst_interval_s": 20,
                "distribution": {"g_mean": 2000.0, "no_data_prob": 0.5},
                "comment": "unknown keys are ignored"
            }"#,
        );
        let args = cli(&["--config", file.path().to_str().unwrap()]);
        let settings = Settings::load(&args).unwrap();
        let generator = &settings.generator;
        assert_eq!(generator.channels, 3);
        assert_eq!(generator.rate_hz, 50.0);
        assert_eq!(settings.session.rate_hz, 50.0);
        assert!(generator.dead_channels.contains(&0));
        assert_eq!(generator.rate_multipliers.as_deref(), Some(&[0.0, 1.0, 3.0][..]));
        assert!(generator.burst.enabled);
        assert_eq!(generator.burst.interval, Duration::from_secs(20));
        assert_eq!(generator.distribution.g_mean, 2000.0);
        assert_eq!(generator.distribution.no_data_prob, 0.5);
        assert_eq!(generator.distribution.x_mean, 1800.0);
        assert_eq!(settings.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            channels: Some(8.0),
            rate_hz: Some(10.0),
            burst_mode: Some(true),
            dead_channels: Some(vec![1.0]),
            ..Default::default()
        };
        let args = cli(&[
            "--channels",
            "6",
            "--rate-hz",
            "500",
            "--burst-mode",
            "off",
            "--dead-channel",
            "2",
        ]);
        let settings = Settings::resolve(&args, file);
        assert_eq!(settings.generator.channels, 6);
        assert_eq!(settings.generator.rate_hz, 500.0);
        assert!(!settings.generator.burst.enabled);
        assert_eq!(
            settings.generator.dead_channels.iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_numeric_options_are_clamped() {
        let args = cli(&[
            "--channels",
            "500",
            "--rate-hz",
            "-3",
            "--drop-rate",
            "1.7",
            "--stats-interval",
            "0",
            "--burst-interval",
            "-4",
            "--burst-duration",
            "0",
        ]);
        let settings = Settings::resolve(&args, FileConfig::default());
        assert_eq!(settings.generator.channels, 64);
        assert_eq!(settings.generator.rate_hz, 0.01);
        assert_eq!(settings.drop_rate, 1.0);
        assert_eq!(settings.session.stats_interval, Duration::from_secs(1));
        assert_eq!(settings.generator.burst.interval, Duration::from_secs(1));
        assert_eq!(settings.generator.burst.duration, Duration::from_secs(1));

        let settings = Settings::resolve(&cli(&["--channels", "-2"]), FileConfig::default());
        assert_eq!(settings.generator.channels, 1);
    }

    #[test]
    fn test_out_of_range_dead_channels_ignored() {
        let file = FileConfig {
            dead_channels: Some(vec![-1.0, 9.0, 3.0]),
            ..Default::default()
        };
        let settings = Settings::resolve(&cli(&["--dead-channel", "4"]), file);
        assert_eq!(
            settings.generator.dead_channels.iter().copied().collect::<Vec<_>>(),
            vec![3]
        );
    }

    #[test]
    fn test_multipliers_sanitized() {
        let file = FileConfig {
            channels: Some(2.0),
            rate_multipliers: Some(vec![-1.0, 2.0, 5.0]),
            ..Default::default()
        };
        let settings = Settings::resolve(&cli(&[]), file);
        assert_eq!(settings.generator.rate_multipliers, Some(vec![0.0, 2.0]));
    }

    #[test]
    fn test_max_events_zero_is_unbounded() {
        let settings = Settings::resolve(&cli(&["--max-events", "0"]), FileConfig::default());
        assert_eq!(settings.session.max_events, None);
        let settings = Settings::resolve(&cli(&["--max-events", "10"]), FileConfig::default());
        assert_eq!(settings.session.max_events, Some(10));
    }

    #[test]
    fn test_fractional_counts_are_truncated() {
        let file = write_config(r#"{"channels": 4.0, "dead_channels": [1.9, 3]}"#);
        let loaded = FileConfig::load(file.path()).unwrap();
        let settings = Settings::resolve(&cli(&[]), loaded);
        assert_eq!(settings.generator.channels, 4);
        assert_eq!(
            settings.generator.dead_channels.iter().copied().collect::<Vec<_>>(),
            vec![1, 3]
        );

        let file = write_config(r#"{"channels": 6.7}"#);
        let settings = Settings::resolve(&cli(&[]), FileConfig::load(file.path()).unwrap());
        assert_eq!(settings.generator.channels, 6);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let file = write_config(r#"{"channels": 4,"#);
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let file = write_config(r#"{"channels": "four"}"#);
        assert!(matches!(
            FileConfig::load(file.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let file = write_config(r#"{"distribution": {"trg_x_prob": 2.0}}"#);
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
