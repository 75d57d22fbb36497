//! Channel Weight Model
//!
//! Each channel carries a relative emission weight fixed at startup. A
//! weight of zero marks a dead sensor that never fires.

use crate::burst::BurstState;
use rand::Rng;
use std::collections::BTreeSet;

/// Hard upper bound on the channel count.
pub const MAX_CHANNELS: usize = 64;

/// Weight multiplier applied to channels selected for a burst.
pub const BURST_MULTIPLIER: f64 = 3.5;

/// Emission weight of a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelWeight {
    pub channel: usize,
    pub weight: f64,
}

/// Per-channel weights, indexed by channel id.
#[derive(Debug, Clone)]
pub struct ChannelWeights {
    weights: Vec<ChannelWeight>,
}

impl ChannelWeights {
    /// Assign startup weights.
    ///
    /// Dead channels are forced to zero. Otherwise explicit weights are used
    /// verbatim (missing trailing entries default to 1.0), and without them
    /// each live channel draws a uniform weight in [0.5, 1.5).
    pub fn initialize<R: Rng + ?Sized>(
        channel_count: usize,
        dead: &BTreeSet<usize>,
        explicit: Option<&[f64]>,
        rng: &mut R,
    ) -> Self {
        let channel_count = channel_count.clamp(1, MAX_CHANNELS);
        let weights = (0..channel_count)
            .map(|channel| {
                let weight = if dead.contains(&channel) {
                    0.0
                } else if let Some(explicit) = explicit {
                    explicit.get(channel).copied().unwrap_or(1.0).max(0.0)
                } else {
                    0.5 + rng.random::<f64>()
                };
                ChannelWeight { channel, weight }
            })
            .collect();
        Self { weights }
    }

    /// Build from known weights; negative entries are treated as zero.
    pub fn from_weights(weights: &[f64]) -> Self {
        Self {
            weights: weights
                .iter()
                .take(MAX_CHANNELS)
                .enumerate()
                .map(|(channel, &w)| ChannelWeight {
                    channel,
                    weight: w.max(0.0),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelWeight> {
        self.weights.iter()
    }

    /// Base weight of a channel, ignoring bursts.
    pub fn weight(&self, channel: usize) -> f64 {
        self.weights.get(channel).map_or(0.0, |w| w.weight)
    }

    /// Weight including the burst multiplier when the channel is bursting.
    pub fn effective(&self, channel: usize, burst: &BurstState) -> f64 {
        let weight = self.weight(channel);
        if burst.is_bursting(channel) {
            weight * BURST_MULTIPLIER
        } else {
            weight
        }
    }

    /// Sum of effective weights.
    pub fn total_weight(&self, burst: &BurstState) -> f64 {
        self.weights
            .iter()
            .map(|w| self.effective(w.channel, burst))
            .sum()
    }

    /// Expected per-channel rate in Hz when no burst is active.
    pub fn nominal_rates(&self, rate_hz: f64) -> Vec<f64> {
        let total: f64 = self.weights.iter().map(|w| w.weight).sum();
        self.weights
            .iter()
            .map(|w| {
                if total > 0.0 {
                    w.weight / total * rate_hz
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// True when every channel is disabled.
    pub fn all_dead(&self) -> bool {
        self.weights.iter().all(|w| w.weight <= 0.0)
    }
}
