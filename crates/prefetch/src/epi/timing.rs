//! Timing Shadow Tables.
//!
//! The prefetcher cannot see the real MSHR or tag array, so it keeps
//! approximations of both: a flat pool standing in for the MSHR and a
//! set/way mirror of the cache geometry. A record enters the MSHR shadow
//! when a request is issued, moves to the cache shadow on fill, and leaves
//! on eviction. Each record remembers which entangled-table slot issued the
//! prefetch (`source`) and whether a demand access touched the line — the
//! eviction feedback that drives confidence updates.

use crate::common::bits::{mask, wrapped_diff};

/// Capacity of the shadow MSHR pool.
pub const SHADOW_MSHR_SIZE: usize = 1120;

/// Sets of the shadow cache, mirroring the real geometry.
pub const SHADOW_SETS: usize = 64;

/// Ways of the shadow cache, mirroring the real geometry.
pub const SHADOW_WAYS: usize = 8;

/// Width of a shadow-MSHR tag.
const MSHR_TAG_BITS: u32 = 42;

/// Width of a shadow-cache tag (set bits removed).
const CACHE_TAG_BITS: u32 = 36;

/// Width of the issue cycle stamp.
const TIME_BITS: u32 = 12;

const SET_BITS: u32 = 6;

/// The entangled-table slot that issued a prefetch, when known.
pub type Source = Option<(u32, u32)>;

#[derive(Clone, Copy, Default)]
struct MshrEntry {
    valid: bool,
    tag: u64, // MSHR_TAG_BITS
    source: Source,
    timestamp: u64, // TIME_BITS
    accessed: bool,
    pos_hist: Option<usize>,
}

#[derive(Clone, Copy, Default)]
struct CacheEntry {
    valid: bool,
    tag: u64, // CACHE_TAG_BITS
    source: Source,
    accessed: bool,
}

/// Shadow MSHR + shadow cache pair.
pub struct TimingShadow {
    mshr: Vec<MshrEntry>,
    cache: Vec<CacheEntry>,
}

impl TimingShadow {
    /// Creates empty shadow tables.
    pub fn new() -> Self {
        Self {
            mshr: vec![MshrEntry::default(); SHADOW_MSHR_SIZE],
            cache: vec![CacheEntry::default(); SHADOW_SETS * SHADOW_WAYS],
        }
    }

    #[inline]
    fn mshr_tag(block: u64) -> u64 {
        block & mask(MSHR_TAG_BITS)
    }

    #[inline]
    fn cache_set(block: u64) -> usize {
        (block as usize) % SHADOW_SETS
    }

    #[inline]
    fn cache_tag(block: u64) -> u64 {
        (block >> SET_BITS) & mask(CACHE_TAG_BITS)
    }

    fn find_mshr(&self, block: u64) -> Option<usize> {
        let tag = Self::mshr_tag(block);
        self.mshr.iter().position(|e| e.valid && e.tag == tag)
    }

    fn find_cache(&self, block: u64) -> Option<usize> {
        let set = Self::cache_set(block);
        let tag = Self::cache_tag(block);
        (0..SHADOW_WAYS)
            .map(|way| set * SHADOW_WAYS + way)
            .find(|&index| self.cache[index].valid && self.cache[index].tag == tag)
    }

    fn free_cache_way(&self, block: u64) -> Option<usize> {
        let set = Self::cache_set(block);
        (0..SHADOW_WAYS)
            .map(|way| set * SHADOW_WAYS + way)
            .find(|&index| !self.cache[index].valid)
    }

    /// Records an issued request, coalescing against both shadows.
    ///
    /// # Panics
    ///
    /// Panics if the pool is exhausted; the pool is sized past the sum of
    /// the read and prefetch queues, so a full pool means the shadow has
    /// diverged from the cache and the simulation is buggy.
    pub fn add(&mut self, block: u64, source: Source, now: u64) {
        if self.find_mshr(block).is_some() || self.find_cache(block).is_some() {
            return;
        }
        let Some(slot) = self.mshr.iter().position(|e| !e.valid) else {
            panic!("shadow MSHR pool exhausted");
        };
        self.mshr[slot] = MshrEntry {
            valid: true,
            tag: Self::mshr_tag(block),
            source,
            timestamp: now & mask(TIME_BITS),
            accessed: false,
            pos_hist: None,
        };
    }

    /// Marks the in-flight or resident record for `block` as demand-accessed.
    ///
    /// The first demand access to an in-flight line also records where the
    /// line sits in the history window; later accesses do not overwrite it.
    pub fn mark_accessed(&mut self, block: u64, pos_hist: Option<usize>) {
        if let Some(index) = self.find_mshr(block) {
            if !self.mshr[index].accessed {
                self.mshr[index].accessed = true;
                self.mshr[index].pos_hist = pos_hist;
            }
            return;
        }
        if let Some(index) = self.find_cache(block) {
            self.cache[index].accessed = true;
        }
    }

    /// Whether any shadow record for `block` is marked accessed.
    pub fn is_accessed(&self, block: u64) -> bool {
        if let Some(index) = self.find_mshr(block) {
            return self.mshr[index].accessed;
        }
        if let Some(index) = self.find_cache(block) {
            return self.cache[index].accessed;
        }
        false
    }

    /// Whether a request for `block` is still in flight.
    pub fn ongoing(&self, block: u64) -> bool {
        self.find_mshr(block).is_some()
    }

    /// Whether an in-flight request for `block` has seen a demand access.
    pub fn ongoing_accessed(&self, block: u64) -> bool {
        self.find_mshr(block)
            .is_some_and(|index| self.mshr[index].accessed)
    }

    /// Whether `block` has completed into the cache shadow.
    pub fn completed(&self, block: u64) -> bool {
        self.find_cache(block).is_some()
    }

    /// Returns the wrapped miss latency and history position for `block`.
    ///
    /// Only meaningful while the request is in flight and demand-accessed;
    /// returns latency 0 otherwise.
    pub fn latency_of(&self, block: u64, now: u64) -> (u64, Option<usize>) {
        match self.find_mshr(block) {
            Some(index) if self.mshr[index].accessed => (
                wrapped_diff(now, self.mshr[index].timestamp, TIME_BITS),
                self.mshr[index].pos_hist,
            ),
            _ => (0, None),
        }
    }

    /// Moves the record for `block` from the MSHR shadow into the cache
    /// shadow, carrying source and accessed state.
    ///
    /// A fill with no in-flight record installs an already-accessed,
    /// sourceless entry (the request predated the shadow's visibility).
    /// When the mirrored set is full the fill is dropped; the eviction that
    /// must have happened will be observed on its own fill event.
    pub fn move_to_cache(&mut self, block: u64) {
        let mshr_index = self.find_mshr(block);
        let Some(way) = self.free_cache_way(block) else {
            return;
        };
        match mshr_index {
            Some(index) => {
                let entry = self.mshr[index];
                self.cache[way] = CacheEntry {
                    valid: true,
                    tag: Self::cache_tag(block),
                    source: entry.source,
                    accessed: entry.accessed,
                };
                self.mshr[index].valid = false;
            }
            None => {
                self.cache[way] = CacheEntry {
                    valid: true,
                    tag: Self::cache_tag(block),
                    source: None,
                    accessed: true,
                };
            }
        }
    }

    /// Invalidates the cache-shadow record for an evicted block.
    ///
    /// Returns the accessed bit and the entangled-table source that issued
    /// the line, the feedback used to update confidence. `None` when the
    /// block was not resident in the shadow.
    pub fn invalidate_cache(&mut self, block: u64) -> Option<(bool, Source)> {
        let index = self.find_cache(block)?;
        self.cache[index].valid = false;
        Some((self.cache[index].accessed, self.cache[index].source))
    }
}

impl Default for TimingShadow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimingShadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingShadow").finish_non_exhaustive()
    }
}
