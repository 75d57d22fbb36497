//! # frontsim-core - Detector Front-End Emulation Engine
//!
//! Synthesizes ADC readings for a configurable set of detector channels and
//! streams them to a single consumer as newline-delimited JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       run_session                            │
//! │                                                              │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────┐  │
//! │  │BurstScheduler│──▶│ EventGenerator │──▶│DeliveryPipeline│──┼─▶ peer
//! │  └──────────────┘   │ (weights, rng) │   │ (drop, buffer) │  │
//! │                     └────────────────┘   └────────────────┘  │
//! │                              │                    │          │
//! │                              └──────┬─────────────┘          │
//! │                                     ▼                        │
//! │                              StatsAggregator                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **One owner** - weights, burst state, buffer and counters are owned by
//!    the generation loop; nothing is shared or locked.
//! 2. **Reproducible** - one seeded random stream, consumed in a fixed order
//!    per tick, reproduces the output byte-for-byte.
//! 3. **Whole records** - a record is never split across transport writes.
//!
//! ## Usage
//!
//! ```ignore
//! use frontsim_core::{DeliveryPipeline, EventGenerator, GeneratorConfig, SessionConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut generator = EventGenerator::new(&GeneratorConfig::default());
//! let mut pipeline = DeliveryPipeline::new(stream, 0.0);
//! let summary = frontsim_core::run_session(
//!     &mut generator,
//!     &mut pipeline,
//!     &SessionConfig::default(),
//!     &CancellationToken::new(),
//!     |report| println!("{}", report),
//! )
//! .await;
//! ```

pub mod burst;
pub mod delivery;
pub mod distribution;
pub mod error;
pub mod generator;
pub mod sample;
pub mod session;
pub mod stats;
pub mod weights;

pub use burst::{BurstConfig, BurstScheduler, BurstState, BurstTransition};
pub use delivery::{DeliveryPipeline, EmitOutcome, OUT_BUFFER_SIZE, OutputBuffer};
pub use distribution::{ADC_MAX, BoxMuller, DistributionConfig};
pub use error::{ConfigError, DeliveryError};
pub use generator::{EventGenerator, GeneratorConfig};
pub use sample::Sample;
pub use session::{EndReason, SessionConfig, SessionSummary, run_session};
pub use stats::{STATS_HEADER, StatsAggregator, StatsReport};
pub use weights::{BURST_MULTIPLIER, ChannelWeight, ChannelWeights, MAX_CHANNELS};
