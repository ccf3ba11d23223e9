//! Observed-Access History Window.
//!
//! A fixed ring of the most recent non-consecutive blocks the core touched,
//! ordered newest at `head - 1`. Each cell stores the block tag, the cycle
//! gap to the entry inserted after it, and the basic-block size learned for
//! it. An absolute `head_time` tracks the cycle of the head so gaps stay in
//! their 20-bit field: when the window has been idle long enough to overflow
//! a gap, zero-tag filler entries absorb the elapsed time.
//!
//! The window answers two questions for the entangling logic:
//! - did the current block fall inside an earlier, still-growing basic block
//!   (`find_bb_merge`), and
//! - which earlier block is far enough in the past that prefetching from it
//!   would have hidden an observed miss latency (`bere`).

use crate::common::bits::mask;

/// Number of entries in the history window.
pub const HIST_ENTRIES: usize = 32;

/// Entries scanned backwards when probing for a basic-block merge.
pub const BB_MERGE_SCAN: usize = 6;

/// Width of a history tag.
const TAG_BITS: u32 = 58;

/// Width of a stored time gap.
const TIME_DIFF_BITS: u32 = 20;

/// Width of a basic-block size.
const BB_SIZE_BITS: u32 = 6;

#[derive(Clone, Copy, Default)]
struct HistEntry {
    tag: u64,       // TAG_BITS
    time_diff: u64, // TIME_DIFF_BITS
    bb_size: u32,   // BB_SIZE_BITS
}

/// The history window ring.
pub struct HistoryWindow {
    entries: [HistEntry; HIST_ENTRIES],
    head: usize,
    head_time: u64,
}

impl HistoryWindow {
    /// Creates an empty window; `now` seeds the head time.
    pub fn new(now: u64) -> Self {
        Self {
            entries: [HistEntry::default(); HIST_ENTRIES],
            head: 0,
            head_time: now,
        }
    }

    #[inline]
    fn prev(index: usize) -> usize {
        (index + HIST_ENTRIES - 1) % HIST_ENTRIES
    }

    /// Records `block` at the head and returns its position.
    ///
    /// Gaps of `2^20` cycles or more are first absorbed by zero-tag filler
    /// entries so that no stored time difference overflows its field.
    pub fn add(&mut self, block: u64, now: u64) -> usize {
        while now - self.head_time >= 1 << TIME_DIFF_BITS {
            self.entries[self.head] = HistEntry {
                tag: 0,
                time_diff: mask(TIME_DIFF_BITS),
                bb_size: 0,
            };
            self.head = (self.head + 1) % HIST_ENTRIES;
            self.head_time += mask(TIME_DIFF_BITS);
        }

        self.entries[self.head] = HistEntry {
            tag: block & mask(TAG_BITS),
            time_diff: (now - self.head_time) & mask(TIME_DIFF_BITS),
            bb_size: 0,
        };
        let pos = self.head;
        self.head = (self.head + 1) % HIST_ENTRIES;
        self.head_time = now;
        pos
    }

    /// Finds the most recent entry holding `block`.
    ///
    /// Duplicates can exist when a line was evicted and refetched; the scan
    /// runs newest to oldest so the live occurrence wins.
    pub fn find(&self, block: u64) -> Option<usize> {
        let tag = block & mask(TAG_BITS);
        let mut i = Self::prev(self.head);
        for _ in 0..HIST_ENTRIES {
            if self.entries[i].tag == tag {
                return Some(i);
            }
            i = Self::prev(i);
        }
        None
    }

    /// Updates the recorded basic-block size of `block`, if present.
    pub fn set_bb_size(&mut self, block: u64, bb_size: u32) {
        if let Some(index) = self.find(block) {
            self.entries[index].bb_size = bb_size & mask(BB_SIZE_BITS) as u32;
        }
    }

    /// Probes whether `block` extends an earlier basic block.
    ///
    /// Scans backwards over at most [`BB_MERGE_SCAN`] entries for an earlier
    /// block whose recorded size reaches the query; returns the gap to that
    /// block, or 0 when no merge applies.
    pub fn find_bb_merge(&self, block: u64) -> u32 {
        let tag = block & mask(TAG_BITS);
        let mut i = Self::prev(self.head);
        for _ in 0..BB_MERGE_SCAN.min(HIST_ENTRIES) {
            let entry = &self.entries[i];
            if tag > entry.tag && tag - entry.tag <= entry.bb_size as u64 {
                return (tag - entry.tag) as u32;
            }
            i = Self::prev(i);
        }
        0
    }

    /// Returns the k-th "best request" candidate for an entangled pair.
    ///
    /// Starting at the predecessor of `pos_hist`, walks backwards while
    /// accumulating time gaps; an earlier entry qualifies once the
    /// accumulated distance from `block` reaches `latency` (prefetching at
    /// that entry would have hidden the miss). `skip` selects the k-th
    /// qualifying candidate. Returns `None` when the recorded position no
    /// longer holds `block`, when the same tag reappears before a candidate
    /// is found (the line was evicted in between), or when the scan reaches
    /// the oldest entry.
    pub fn bere(&self, block: u64, pos_hist: usize, latency: u64, skip: u32) -> Option<u64> {
        debug_assert!(pos_hist < HIST_ENTRIES);
        let tag = block & mask(TAG_BITS);
        if tag == 0 || self.entries[pos_hist].tag != tag {
            return None;
        }

        let first = Self::prev(self.head);
        let mut time_from_query = self.entries[pos_hist].time_diff;
        let mut skipped = 0;
        let mut i = Self::prev(pos_hist);
        while i != first {
            let entry = &self.entries[i];
            if entry.tag == tag {
                return None;
            }
            if entry.tag != 0 && time_from_query >= latency {
                if skipped == skip {
                    return Some(entry.tag);
                }
                skipped += 1;
            }
            time_from_query += entry.time_diff;
            i = Self::prev(i);
        }
        None
    }
}

impl std::fmt::Debug for HistoryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryWindow")
            .field("head", &self.head)
            .field("head_time", &self.head_time)
            .finish_non_exhaustive()
    }
}
