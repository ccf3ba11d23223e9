//! Per-Page Signature Table.
//!
//! A bounded recency list of the pages recently touched by demand accesses.
//! Each entry keeps short sliding histories of the PCs, block offsets, and
//! offset deltas seen on the page, from which it derives the rolling
//! XOR-shift signatures that feed the learning engine's state vector. An
//! entry also carries a small action-confidence tracker counting how often
//! each stride was issued from the page, which drives dynamic prefetch
//! degree selection.

use std::collections::VecDeque;

/// Signatures are folded into this many bits.
const SIG_BITS: u32 = 12;

const SIG_MASK: u32 = (1 << SIG_BITS) - 1;

/// Values folded into each signature.
const SIG_DEPTH: usize = 4;

/// One page's tracked state.
#[derive(Debug, Clone)]
pub struct StEntry {
    /// The page this entry describes.
    pub page: u64,
    pcs: VecDeque<u64>,
    offsets: VecDeque<u32>,
    deltas: VecDeque<i32>,
    action_tracker: VecDeque<(i32, i32)>,
    tracker_capacity: usize,
}

impl StEntry {
    fn new(page: u64, pc: u64, offset: u32, tracker_capacity: usize) -> Self {
        let mut entry = Self {
            page,
            pcs: VecDeque::new(),
            offsets: VecDeque::new(),
            deltas: VecDeque::new(),
            action_tracker: VecDeque::new(),
            tracker_capacity,
        };
        entry.pcs.push_back(pc);
        entry.offsets.push_back(offset);
        entry
    }

    fn update(&mut self, pc: u64, offset: u32, depth: usize) {
        if let Some(&last) = self.offsets.back() {
            let delta = offset as i32 - last as i32;
            if delta != 0 {
                if self.deltas.len() >= depth {
                    let _ = self.deltas.pop_front();
                }
                self.deltas.push_back(delta);
            }
        }
        if self.pcs.len() >= depth {
            let _ = self.pcs.pop_front();
        }
        self.pcs.push_back(pc);
        if self.offsets.len() >= depth {
            let _ = self.offsets.pop_front();
        }
        self.offsets.push_back(offset);
    }

    /// The most recent nonzero offset delta, or 0 before any.
    pub fn last_delta(&self) -> i32 {
        self.deltas.back().copied().unwrap_or(0)
    }

    fn fold<T: Copy, F: Fn(T) -> u32>(values: &VecDeque<T>, shift: u32, map: F) -> u32 {
        let start = values.len().saturating_sub(SIG_DEPTH);
        values
            .iter()
            .skip(start)
            .fold(0u32, |sig, &v| ((sig << shift) ^ map(v)) & SIG_MASK)
    }

    /// Rolling signature of the recent deltas.
    pub fn delta_sig(&self) -> u32 {
        Self::fold(&self.deltas, 3, |d| (d as u32) & 0x7F)
    }

    /// A second, differently mixed delta signature.
    pub fn delta_sig2(&self) -> u32 {
        Self::fold(&self.deltas, 2, |d| ((d as u32) ^ ((d as u32) >> 3)) & 0x7F)
    }

    /// Rolling signature of the recent PCs.
    pub fn pc_sig(&self) -> u32 {
        Self::fold(&self.pcs, 5, |pc| (pc as u32) & 0xFFF)
    }

    /// Rolling signature of the recent offsets.
    pub fn offset_sig(&self) -> u32 {
        Self::fold(&self.offsets, 4, |o| o & 0x3F)
    }

    /// Bumps the confidence of `action` in the page's action tracker.
    pub fn track_prefetch(&mut self, action: i32) {
        if let Some(pos) = self.action_tracker.iter().position(|&(a, _)| a == action) {
            let (action, conf) = self.action_tracker[pos];
            let _ = self.action_tracker.remove(pos);
            self.action_tracker.push_back((action, conf + 1));
            return;
        }
        if self.action_tracker.len() >= self.tracker_capacity {
            let _ = self.action_tracker.pop_front();
        }
        self.action_tracker.push_back((action, 0));
    }

    /// The tracked confidence of `action`, when present.
    pub fn action_confidence(&self, action: i32) -> Option<i32> {
        self.action_tracker
            .iter()
            .find(|&&(a, _)| a == action)
            .map(|&(_, conf)| conf)
    }

    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            last_delta: self.last_delta(),
            delta_sig: self.delta_sig(),
            delta_sig2: self.delta_sig2(),
            pc_sig: self.pc_sig(),
            offset_sig: self.offset_sig(),
        }
    }
}

/// The per-page features captured into a state vector at access time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageSnapshot {
    /// Most recent nonzero offset delta on the page.
    pub last_delta: i32,
    /// Rolling delta signature.
    pub delta_sig: u32,
    /// Second delta signature.
    pub delta_sig2: u32,
    /// Rolling PC signature.
    pub pc_sig: u32,
    /// Rolling offset signature.
    pub offset_sig: u32,
}

/// The bounded page-recency list, MRU at the back.
#[derive(Debug)]
pub struct SignatureTable {
    entries: VecDeque<StEntry>,
    capacity: usize,
    history_depth: usize,
    action_tracker_size: usize,
    /// Lookups served.
    pub lookups: u64,
    /// Lookups that hit an existing page.
    pub hits: u64,
    /// Pages evicted to make room.
    pub evictions: u64,
}

impl SignatureTable {
    /// Creates a table of at most `capacity` pages.
    pub fn new(capacity: usize, history_depth: usize, action_tracker_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            history_depth,
            action_tracker_size,
            lookups: 0,
            hits: 0,
            evictions: 0,
        }
    }

    /// Folds an access into the page's entry, allocating (and evicting the
    /// LRU page) when absent. Returns the page's feature snapshot.
    pub fn update(&mut self, page: u64, pc: u64, offset: u32) -> PageSnapshot {
        self.lookups += 1;
        if let Some(pos) = self.entries.iter().position(|e| e.page == page) {
            self.hits += 1;
            if let Some(mut entry) = self.entries.remove(pos) {
                entry.update(pc, offset, self.history_depth);
                self.entries.push_back(entry);
            }
        } else {
            if self.entries.len() >= self.capacity {
                self.evictions += 1;
                let _ = self.entries.pop_front();
            }
            self.entries
                .push_back(StEntry::new(page, pc, offset, self.action_tracker_size));
        }
        self.entries.back().map(StEntry::snapshot).unwrap_or_default()
    }

    /// Shared access to a page's entry.
    pub fn get(&self, page: u64) -> Option<&StEntry> {
        self.entries.iter().find(|e| e.page == page)
    }

    /// Bumps the action tracker of `page`, when tracked.
    pub fn track_prefetch(&mut self, page: u64, action: i32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.page == page) {
            entry.track_prefetch(action);
        }
    }
}
