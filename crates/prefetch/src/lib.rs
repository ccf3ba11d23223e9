//! Hardware prefetcher model library.
//!
//! This crate implements three swappable prefetch policies for a
//! cycle-driven cache simulator:
//! 1. **EPI:** an entangling instruction prefetcher pairing trigger blocks
//!    with distant future blocks discovered from a latency-sized history
//!    window.
//! 2. **MANA:** a temporal instruction prefetcher recording spatial regions
//!    into successor-linked tables and replaying them through stream
//!    address buffers.
//! 3. **Scooby:** a reinforcement-learning data prefetcher choosing stride
//!    offsets from Q-values trained by timeliness and accuracy feedback.
//!
//! The embedding cache simulator drives a policy through
//! [`driver::CachePrefetcher`] and supplies the issue path through
//! [`driver::PrefetchQueue`]; all policy state is per CPU and the current
//! cycle is a parameter on every call.

/// Shared primitives (addresses, bit fields, saturating counters).
pub mod common;

/// Configuration structures, defaults, and validation.
pub mod config;

/// The cache-facing trait and event types.
pub mod driver;

/// Entangling instruction prefetcher.
pub mod epi;

/// Temporal-stream instruction prefetcher.
pub mod mana;

/// Reinforcement-learning data prefetcher.
pub mod scooby;

/// Table primitives (set-associative storage, rings, regions).
pub mod tables;

pub use crate::config::{Config, ConfigError, PrefetcherKind};
pub use crate::driver::{AccessEvent, CachePrefetcher, FillEvent, PrefetchQueue};
pub use crate::epi::EpiPrefetcher;
pub use crate::mana::ManaPrefetcher;
pub use crate::scooby::ScoobyPrefetcher;

/// Builds the configured policy for one CPU.
///
/// Validates the configuration, constructs the selected policy, and runs
/// its `initialize` hook with the owning CPU id.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the configuration violates a structural
/// invariant (non-power-of-two table, inconsistent degree tables, ...).
pub fn build_prefetcher(
    cpu: u32,
    config: &Config,
) -> Result<Box<dyn CachePrefetcher>, ConfigError> {
    config.validate()?;
    let mut prefetcher: Box<dyn CachePrefetcher> = match config.kind {
        PrefetcherKind::Epi => Box::new(EpiPrefetcher::new(&config.epi)),
        PrefetcherKind::Mana => Box::new(ManaPrefetcher::new(&config.mana)),
        PrefetcherKind::Scooby => Box::new(ScoobyPrefetcher::new(&config.scooby)),
    };
    prefetcher.initialize(cpu);
    Ok(prefetcher)
}
