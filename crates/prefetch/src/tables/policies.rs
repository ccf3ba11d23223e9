//! Table Replacement Policies.
//!
//! Implements the victim-selection algorithms used by the set-associative
//! tables in this crate.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used.
//! - `Fifo`: First-In, First-Out (round-robin pointer per set).

use serde::Deserialize;

/// Selects which replacement algorithm a table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Replacement {
    /// Least Recently Used replacement.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// First In First Out replacement (round-robin).
    #[serde(alias = "Fifo")]
    Fifo,
}

/// Trait for table replacement policies.
///
/// Defines the interface for updating usage state and selecting victim ways.
pub trait ReplacementPolicy: Send + Sync {
    /// Updates the policy state when a way is accessed or filled.
    fn update(&mut self, set: usize, way: usize);

    /// Selects a victim way to evict from a specific set.
    fn victim(&mut self, set: usize) -> usize;
}

/// LRU policy state.
///
/// Maintains a usage stack per set: index 0 is MRU, the last index is LRU.
pub struct LruPolicy {
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates a new LRU policy instance for `sets` × `ways`.
    pub fn new(sets: usize, ways: usize) -> Self {
        let mut usage = Vec::with_capacity(sets);
        for _ in 0..sets {
            usage.push((0..ways).collect());
        }
        Self { usage }
    }
}

impl ReplacementPolicy for LruPolicy {
    /// Moves the accessed `way` to the front of the usage stack (MRU).
    fn update(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&x| x == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Returns the way at the bottom of the usage stack (LRU).
    fn victim(&mut self, set: usize) -> usize {
        self.usage[set].last().copied().unwrap_or(0)
    }
}

/// FIFO policy state.
///
/// Operates as a round-robin pointer per set. When a replacement is needed
/// the pointer identifies the oldest way; filling that way advances it.
pub struct FifoPolicy {
    next_way: Vec<usize>,
    ways: usize,
}

impl FifoPolicy {
    /// Creates a new FIFO policy instance for `sets` × `ways`.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            next_way: vec![0; sets],
            ways,
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    /// Advances the pointer when the filled way matches it, maintaining the
    /// first-in order as ways are (re)filled.
    fn update(&mut self, set: usize, way: usize) {
        if self.next_way[set] == way {
            self.next_way[set] = (self.next_way[set] + 1) % self.ways;
        }
    }

    /// Returns the current round-robin pointer for the set.
    fn victim(&mut self, set: usize) -> usize {
        self.next_way[set]
    }
}

/// Constructs a boxed policy of the requested kind.
pub fn build(kind: Replacement, sets: usize, ways: usize) -> Box<dyn ReplacementPolicy> {
    match kind {
        Replacement::Lru => Box::new(LruPolicy::new(sets, ways)),
        Replacement::Fifo => Box::new(FifoPolicy::new(sets, ways)),
    }
}
