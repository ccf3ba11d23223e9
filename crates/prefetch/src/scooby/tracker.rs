//! Prefetch Tracker.
//!
//! A FIFO of in-flight prefetch records, each carrying the state and action
//! that issued it and a reward slot. A record collects its reward either
//! from a demand access (correct, timely or not) or at eviction (incorrect,
//! or "no prefetch" for the dummy address). Evicting the oldest record pairs
//! it with the previously evicted one to form a SARSA sample: the previous
//! eviction contributes `(s, a, r)` and the current one `(s', a')`.

use std::collections::VecDeque;

use super::State;

/// Placeholder address carried by no-prefetch, out-of-page, and
/// duplicate-issue records.
pub const DUMMY_ADDR: u64 = 0xdead_beef;

/// Why a record was rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    /// Prefetch was filled before its demand access arrived.
    CorrectTimely,
    /// Demand access arrived while the prefetch was still in flight.
    CorrectUntimely,
    /// Prefetch was evicted from the tracker without a demand access.
    Incorrect,
    /// The policy chose not to prefetch.
    NoPrefetch,
    /// The predicted offset fell outside the page.
    OutOfPage,
    /// The predicted address was already being tracked.
    TrackerHit,
}

/// One in-flight prefetch record.
#[derive(Debug, Clone)]
pub struct PtEntry {
    /// Issued block-aligned address, or [`DUMMY_ADDR`].
    pub address: u64,
    /// State vector captured when the action was chosen.
    pub state: State,
    /// Index of the chosen action.
    pub action_index: usize,
    /// Set when the cache reported the fill.
    pub is_filled: bool,
    /// Set when a demand access hit the prefetched line in the cache.
    pub pf_cache_hit: bool,
    /// Whether a reward has been assigned.
    pub has_reward: bool,
    /// Assigned reward value.
    pub reward: i32,
    /// Assigned reward cause.
    pub reward_kind: Option<RewardKind>,
    /// Per-feature agreement with the chosen action (featurewise engine).
    pub consensus: Vec<bool>,
}

impl PtEntry {
    /// Creates an unrewarded record.
    pub fn new(address: u64, state: State, action_index: usize) -> Self {
        Self {
            address,
            state,
            action_index,
            is_filled: false,
            pf_cache_hit: false,
            has_reward: false,
            reward: 0,
            reward_kind: None,
            consensus: Vec::new(),
        }
    }
}

/// The bounded FIFO of in-flight prefetch records.
#[derive(Debug)]
pub struct PrefetchTracker {
    fifo: VecDeque<PtEntry>,
    capacity: usize,
    last_evicted: Option<PtEntry>,
}

impl PrefetchTracker {
    /// Creates a tracker of at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            fifo: VecDeque::with_capacity(capacity),
            capacity,
            last_evicted: None,
        }
    }

    /// Number of records currently tracked.
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    /// Whether no records are tracked.
    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// Whether the tracker is at capacity.
    pub fn is_full(&self) -> bool {
        self.fifo.len() >= self.capacity
    }

    /// Whether any record carries `address`.
    pub fn is_tracked(&self, address: u64) -> bool {
        self.fifo.iter().any(|e| e.address == address)
    }

    /// Applies `apply` to records matching `address` — the oldest match
    /// only, or every match when `all` is set. Returns how many records
    /// `apply` was called on; `apply` returning `false` stops the walk.
    pub fn for_each_matching(
        &mut self,
        address: u64,
        all: bool,
        mut apply: impl FnMut(&mut PtEntry) -> bool,
    ) -> usize {
        let mut touched = 0;
        for entry in self.fifo.iter_mut().filter(|e| e.address == address) {
            touched += 1;
            if !apply(entry) || !all {
                break;
            }
        }
        touched
    }

    /// Pops the oldest record to make room; the caller trains on the pair
    /// `(previous eviction, this eviction)` before storing the new one with
    /// [`PrefetchTracker::set_last_evicted`].
    pub fn pop_oldest(&mut self) -> Option<PtEntry> {
        self.fifo.pop_front()
    }

    /// Takes the previously evicted record for training.
    pub fn take_last_evicted(&mut self) -> Option<PtEntry> {
        self.last_evicted.take()
    }

    /// Stores the record evicted by the current insertion.
    pub fn set_last_evicted(&mut self, entry: PtEntry) {
        self.last_evicted = Some(entry);
    }

    /// Appends a new record.
    pub fn push(&mut self, entry: PtEntry) {
        debug_assert!(self.fifo.len() < self.capacity);
        self.fifo.push_back(entry);
    }

    /// Exclusive access to the newest record.
    pub fn newest_mut(&mut self) -> Option<&mut PtEntry> {
        self.fifo.back_mut()
    }
}
