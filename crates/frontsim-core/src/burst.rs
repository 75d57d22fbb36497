//! Burst Scheduler
//!
//! A two-state timer (INACTIVE/ACTIVE) that periodically elevates the weight
//! of a random subset of channels to emulate correlated activity.
//!
//! ```text
//!   INACTIVE ──(enabled && now >= next_burst)──▶ ACTIVE
//!      ▲                                           │
//!      └──────────(now >= burst_end)───────────────┘
//!             next_burst = now + interval
//! ```

use rand::Rng;
use std::time::Duration;

/// Default period between the end of one burst and the start of the next.
pub const DEFAULT_BURST_INTERVAL: Duration = Duration::from_secs(12);
/// Default length of the active window.
pub const DEFAULT_BURST_DURATION: Duration = Duration::from_secs(3);
/// Share of channels picked for each burst (at least one pick).
pub const BURST_CHANNEL_FRACTION: f64 = 0.25;

/// Burst timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub duration: Duration,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_BURST_INTERVAL,
            duration: DEFAULT_BURST_DURATION,
        }
    }
}

/// Observable burst state; times are offsets from session start.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstState {
    active: bool,
    selected: Vec<bool>,
    burst_end: Duration,
    next_burst: Duration,
}

impl BurstState {
    /// Inactive state with an empty selection.
    pub fn new(channels: usize) -> Self {
        Self {
            active: false,
            selected: vec![false; channels],
            burst_end: Duration::ZERO,
            next_burst: Duration::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when the channel's weight is currently multiplied.
    pub fn is_bursting(&self, channel: usize) -> bool {
        self.active && self.selected.get(channel).copied().unwrap_or(false)
    }

    /// Distinct channels in the current selection.
    pub fn selected_channels(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(ch, &on)| on.then_some(ch))
            .collect()
    }

    pub fn burst_end(&self) -> Duration {
        self.burst_end
    }

    pub fn next_burst(&self) -> Duration {
        self.next_burst
    }

    pub(crate) fn set_selection(&mut self, picks: &[usize]) {
        self.selected.fill(false);
        for &ch in picks {
            if let Some(slot) = self.selected.get_mut(ch) {
                *slot = true;
            }
        }
        self.active = true;
    }

    fn clear_selection(&mut self) {
        self.selected.fill(false);
        self.active = false;
    }
}

/// State change reported by [`BurstScheduler::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum BurstTransition {
    Started {
        channels: Vec<usize>,
        until: Duration,
    },
    Ended {
        next: Duration,
    },
}

/// Drives [`BurstState`] from a monotonic session clock.
#[derive(Debug, Clone)]
pub struct BurstScheduler {
    config: BurstConfig,
    state: BurstState,
}

impl BurstScheduler {
    /// The first burst is due one interval after `start`.
    pub fn new(config: BurstConfig, channels: usize, start: Duration) -> Self {
        let mut state = BurstState::new(channels);
        state.next_burst = start + config.interval;
        Self { config, state }
    }

    pub fn state(&self) -> &BurstState {
        &self.state
    }

    /// Advance the state machine to `now`.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        now: Duration,
        rng: &mut R,
    ) -> Option<BurstTransition> {
        if self.config.enabled && !self.state.active && now >= self.state.next_burst {
            let picks = choose_burst_channels(self.state.selected.len(), rng);
            self.state.set_selection(&picks);
            self.state.burst_end = now + self.config.duration;
            return Some(BurstTransition::Started {
                channels: self.state.selected_channels(),
                until: self.state.burst_end,
            });
        }
        if self.state.active && now >= self.state.burst_end {
            self.state.clear_selection();
            self.state.next_burst = now + self.config.interval;
            return Some(BurstTransition::Ended {
                next: self.state.next_burst,
            });
        }
        None
    }
}

/// Pick `ceil(channels * fraction)` channels uniformly, duplicates allowed.
///
/// A repeated pick leaves fewer distinct bursting channels than the nominal
/// count; the selection is not deduplicated or topped up.
pub fn choose_burst_channels<R: Rng + ?Sized>(channels: usize, rng: &mut R) -> Vec<usize> {
    if channels == 0 {
        return Vec::new();
    }
    let count = ((channels as f64 * BURST_CHANNEL_FRACTION).ceil() as usize).max(1);
    (0..count).map(|_| rng.random_range(0..channels)).collect()
}
