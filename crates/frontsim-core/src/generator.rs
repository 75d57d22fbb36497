//! Event Generator
//!
//! Owns the session's random stream and turns the current effective weights
//! into one [`Sample`] per tick.
//!
//! Draw order per tick (a seed reproduces it call-for-call):
//!
//! 1. channel pick (1 uniform)
//! 2. gamma/x classification (1 uniform)
//! 3. primary, top and bottom Gaussians (2 uniforms each)
//! 4. three low-signal checks, each followed by a Gaussian only when it fires
//! 5. no-data check
//! 6. `trg_x`, then `trg_g`

use crate::burst::{BurstConfig, BurstScheduler, BurstState, BurstTransition};
use crate::distribution::{BoxMuller, DistributionConfig, chance, clamp_adc};
use crate::sample::Sample;
use crate::weights::ChannelWeights;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

/// Aggregate rate used when none (or NaN) is given.
pub const DEFAULT_RATE_HZ: f64 = 200.0;
pub const MIN_RATE_HZ: f64 = 0.01;
pub const MAX_RATE_HZ: f64 = 1_000_000.0;

/// Low-signal baseline shift for the top companion value (mean, std).
const LOW_GTOP_DELTA: (f64, f64) = (50.0, 10.0);
/// Low-signal baseline shift for the bottom companion value (mean, std).
const LOW_GBOT_DELTA: (f64, f64) = (-20.0, -10.0);

/// Everything needed to build an [`EventGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub channels: usize,
    pub dead_channels: BTreeSet<usize>,
    /// Explicit per-channel weights; random weights when `None`
    pub rate_multipliers: Option<Vec<f64>>,
    pub rate_hz: f64,
    pub seed: Option<u64>,
    pub burst: BurstConfig,
    pub distribution: DistributionConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            dead_channels: BTreeSet::new(),
            rate_multipliers: None,
            rate_hz: DEFAULT_RATE_HZ,
            seed: None,
            burst: BurstConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

/// Weighted channel scheduler plus sample synthesizer.
pub struct EventGenerator {
    rng: StdRng,
    dist: DistributionConfig,
    weights: ChannelWeights,
    burst: BurstScheduler,
    total_weight: f64,
    interval_us: i64,
    tick: u64,
}

impl EventGenerator {
    /// Seed the random stream and draw the startup weights from it.
    pub fn new(config: &GeneratorConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let weights = ChannelWeights::initialize(
            config.channels,
            &config.dead_channels,
            config.rate_multipliers.as_deref(),
            &mut rng,
        );
        Self::with_weights(
            weights,
            config.distribution.clone(),
            config.burst,
            config.rate_hz,
            rng,
        )
    }

    /// Build around precomputed weights and an existing random stream.
    pub fn with_weights(
        weights: ChannelWeights,
        dist: DistributionConfig,
        burst: BurstConfig,
        rate_hz: f64,
        rng: StdRng,
    ) -> Self {
        let burst = BurstScheduler::new(burst, weights.len(), Duration::ZERO);
        let total_weight = weights.total_weight(burst.state());
        Self {
            rng,
            dist,
            weights,
            burst,
            total_weight,
            interval_us: (1.0 / clamp_rate_hz(rate_hz) * 1_000_000.0) as i64,
            tick: 0,
        }
    }

    pub fn weights(&self) -> &ChannelWeights {
        &self.weights
    }

    pub fn burst_state(&self) -> &BurstState {
        self.burst.state()
    }

    /// Effective total weight, burst multiplier included.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Ticks generated so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Session-relative time of the next tick on the synthetic timeline.
    pub fn session_time(&self) -> Duration {
        Duration::from_micros(self.tick.saturating_mul(self.interval_us as u64))
    }

    /// The session's random stream, shared with the delivery drop decision.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Advance the burst state machine; recomputes the total on a transition.
    pub fn update_burst(&mut self, now: Duration) -> Option<BurstTransition> {
        let transition = self.burst.update(now, &mut self.rng)?;
        self.total_weight = self.weights.total_weight(self.burst.state());
        match &transition {
            BurstTransition::Started { channels, until } => {
                debug!(
                    ?channels,
                    until_ms = until.as_millis() as u64,
                    total_weight = self.total_weight,
                    "Burst started"
                );
            }
            BurstTransition::Ended { next } => {
                debug!(
                    next_ms = next.as_millis() as u64,
                    total_weight = self.total_weight,
                    "Burst ended"
                );
            }
        }
        Some(transition)
    }

    /// Weighted channel pick (one uniform draw).
    pub fn pick_channel(&mut self) -> usize {
        let r = self.rng.random::<f64>() * self.total_weight;
        select_channel(&self.weights, self.burst.state(), r)
    }

    /// Synthesize the next sample.
    pub fn next_sample(&mut self) -> Sample {
        let channel = self.pick_channel();

        let rng = &mut self.rng;
        let dist = &self.dist;

        let is_g_event = chance(rng, dist.g_event_prob);
        let (mean, std) = dist.base(is_g_event);

        let mut x = BoxMuller::new(mean, std).sample(rng);
        let mut gtop =
            BoxMuller::new(mean + dist.gtop_offset, std + dist.gtop_std_offset).sample(rng);
        let mut gbot =
            BoxMuller::new(mean + dist.gbot_offset, std + dist.gbot_std_offset).sample(rng);

        if chance(rng, dist.low_prob) {
            x = BoxMuller::new(dist.low_mean, dist.low_std).sample(rng);
        }
        if chance(rng, dist.low_prob) {
            let (dm, ds) = LOW_GTOP_DELTA;
            gtop = BoxMuller::new(dist.low_mean + dm, dist.low_std + ds).sample(rng);
        }
        if chance(rng, dist.low_prob) {
            let (dm, ds) = LOW_GBOT_DELTA;
            gbot = BoxMuller::new(dist.low_mean + dm, dist.low_std + ds).sample(rng);
        }

        let mut adc_x = clamp_adc(x);
        let mut adc_gtop = clamp_adc(gtop);
        let mut adc_gbot = clamp_adc(gbot);

        let no_data = chance(rng, dist.no_data_prob);
        if no_data {
            adc_x = 0;
            adc_gtop = 0;
            adc_gbot = 0;
        }

        let trg_x = chance(rng, dist.trg_x_prob);
        let trg_g = chance(rng, dist.trg_g_prob);

        let timestamp_us = (self.tick as i64).saturating_mul(self.interval_us);
        self.tick += 1;

        Sample {
            timestamp_us,
            channel,
            adc_x,
            adc_gtop,
            adc_gbot,
            trg_x,
            trg_g,
            no_data,
            is_g_event,
        }
    }
}

/// Clamp an aggregate rate into [`MIN_RATE_HZ`, `MAX_RATE_HZ`]; NaN maps to the default.
pub fn clamp_rate_hz(rate_hz: f64) -> f64 {
    if rate_hz.is_nan() {
        DEFAULT_RATE_HZ
    } else {
        rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
    }
}

/// Walk channels in id order accumulating effective weight and return the
/// first live channel whose cumulative weight reaches `r`.
///
/// Zero-weight channels are never returned by the walk. When rounding leaves
/// `r` above the final sum, the last channel is returned.
pub fn select_channel(weights: &ChannelWeights, burst: &BurstState, r: f64) -> usize {
    let mut accum = 0.0;
    for w in weights.iter() {
        let weight = weights.effective(w.channel, burst);
        accum += weight;
        if weight > 0.0 && accum >= r {
            return w.channel;
        }
    }
    weights.len().saturating_sub(1)
}
