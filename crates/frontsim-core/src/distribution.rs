//! Distribution Model
//!
//! Statistical parameters governing sample synthesis, plus the Box–Muller
//! Gaussian sampler the event generator draws ADC values from.

use crate::error::ConfigError;
use rand::Rng;
use rand_distr::Distribution;
use serde::Deserialize;

/// Largest value a 12-bit ADC can report.
pub const ADC_MAX: u16 = 4095;

/// Guards `ln(0)` in the Box–Muller magnitude term.
const BOX_MULLER_EPSILON: f64 = 1e-9;

/// Parameters for the gamma/x event distributions.
///
/// Every field is optional in the config file; missing ones keep the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub g_mean: f64,
    pub g_std: f64,
    pub x_mean: f64,
    pub x_std: f64,
    /// Mean offset of the top detector half relative to the base mean
    pub gtop_offset: f64,
    /// Mean offset of the bottom detector half relative to the base mean
    pub gbot_offset: f64,
    pub gtop_std_offset: f64,
    pub gbot_std_offset: f64,
    /// Per-value probability of a low-signal excursion
    pub low_prob: f64,
    pub low_mean: f64,
    pub low_std: f64,
    pub no_data_prob: f64,
    pub trg_x_prob: f64,
    pub trg_g_prob: f64,
    /// Probability a sample is a gamma-type event (otherwise x-type)
    pub g_event_prob: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            g_mean: 2400.0,
            g_std: 250.0,
            x_mean: 1800.0,
            x_std: 180.0,
            gtop_offset: 120.0,
            gbot_offset: -120.0,
            gtop_std_offset: 20.0,
            gbot_std_offset: 25.0,
            low_prob: 0.08,
            low_mean: 300.0,
            low_std: 120.0,
            no_data_prob: 0.005,
            trg_x_prob: 0.2,
            trg_g_prob: 0.15,
            g_event_prob: 0.35,
        }
    }
}

impl DistributionConfig {
    /// Reject probabilities outside [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("low_prob", self.low_prob),
            ("no_data_prob", self.no_data_prob),
            ("trg_x_prob", self.trg_x_prob),
            ("trg_g_prob", self.trg_g_prob),
            ("g_event_prob", self.g_event_prob),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "distribution.{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }

    /// Base (mean, std) for the event class.
    pub fn base(&self, is_g_event: bool) -> (f64, f64) {
        if is_g_event {
            (self.g_mean, self.g_std)
        } else {
            (self.x_mean, self.x_std)
        }
    }
}

/// Gaussian sampler using the cosine branch of the Box–Muller transform.
///
/// Consumes exactly two uniform draws per sample; the sine branch is
/// discarded so the draw count stays fixed.
#[derive(Debug, Clone, Copy)]
pub struct BoxMuller {
    mean: f64,
    std: f64,
}

impl BoxMuller {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }
}

impl Distribution<f64> for BoxMuller {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u1: f64 = rng.random();
        let u2: f64 = rng.random();
        let mag = (-2.0 * (u1 + BOX_MULLER_EPSILON).ln()).sqrt();
        self.mean + self.std * mag * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// One uniform draw compared against `p`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}

/// Round to the nearest integer and clamp into the ADC range.
pub fn clamp_adc(value: f64) -> u16 {
    let rounded = value.round();
    if rounded.is_nan() || rounded <= 0.0 {
        0
    } else if rounded >= ADC_MAX as f64 {
        ADC_MAX
    } else {
        rounded as u16
    }
}
