//! Entangling Instruction Prefetcher (EPI).
//!
//! EPI couples two mechanisms:
//! 1. **Basic-block prefetching:** runs of consecutively fetched blocks are
//!    coalesced into a single entangled-table row keyed by the first block;
//!    re-encountering the head prefetches the whole run.
//! 2. **Entangled pairs:** when a miss fills, the history window is searched
//!    for an earlier block far enough in the past that a prefetch issued
//!    there would have hidden the observed latency. That earlier block
//!    becomes the trigger of an entangled pair whose confidence is trained
//!    by eviction feedback from the timing shadow.
//!
//! The state machine reacts to demand accesses (predict + issue) and fills
//! (train + discover); cycle ticks only account idle time.

/// Entangled table with per-row compressed successor storage.
pub mod entangled;

/// Observed-access history window.
pub mod history;

/// Shadow MSHR and shadow cache timing tables.
pub mod timing;

use tracing::info;

use crate::common::addr::{block_of, block_to_addr};
use crate::config::EpiConfig;
use crate::driver::{AccessEvent, CachePrefetcher, FillEvent, PrefetchQueue};
use entangled::{EntangledTable, NUM_FORMATS};
use history::HistoryWindow;
use timing::TimingShadow;

/// In-place candidates tried before allocating an entangled row.
const TRIES_AVAIL: u32 = 2;

/// Allocating candidates tried before the unconditional fallback.
const TRIES_AVAIL_NOT_PRESENT: u32 = 1;

/// Aggregate counters reported by `final_stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpiStats {
    /// Demand accesses processed.
    pub accesses: u64,
    /// Demand misses processed.
    pub misses: u64,
    /// Demand hits on prefetched lines.
    pub hits: u64,
    /// Misses that found their line already in flight.
    pub late: u64,
    /// Prefetched lines evicted without a demand access.
    pub wrong: u64,
    /// Cycle ticks observed.
    pub cycles_operated: u64,
    /// Cycles between ticks the prefetcher was not invoked.
    pub cycles_idle: u64,
}

/// The per-CPU EPI policy object.
#[derive(Debug)]
pub struct EpiPrefetcher {
    cpu: u32,
    hist: HistoryWindow,
    timing: TimingShadow,
    table: EntangledTable,
    last_basic_block: u64,
    consecutive_count: u32,
    basic_block_merge_diff: u32,
    last_cycle_operate: u64,
    stats: EpiStats,
}

impl EpiPrefetcher {
    /// Creates an EPI policy from its configuration.
    pub fn new(config: &EpiConfig) -> Self {
        Self {
            cpu: 0,
            hist: HistoryWindow::new(0),
            timing: TimingShadow::new(),
            table: EntangledTable::new(config.table_sets, config.table_ways),
            last_basic_block: 0,
            consecutive_count: 0,
            basic_block_merge_diff: 0,
            last_cycle_operate: 0,
            stats: EpiStats::default(),
        }
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> &EpiStats {
        &self.stats
    }

    /// Issues the prefetches a demand access to `line` predicts: the rest of
    /// the line's basic block, then every live entangled successor together
    /// with its own basic block.
    fn issue_predictions(&mut self, queue: &mut dyn PrefetchQueue, cycle: u64, line: u64) {
        let bb_size = self.table.bb_size_of(line);
        for i in 1..=bb_size as u64 {
            let pf_line = line + i;
            if !self.timing.ongoing(pf_line)
                && queue.prefetch_line(block_to_addr(pf_line), true, 0)
            {
                self.timing.add(pf_line, None, cycle);
            }
        }

        for k in 0..NUM_FORMATS as usize {
            let Some((entangled, (src_set, src_way))) = self.table.entangled_at(line, k) else {
                continue;
            };
            if entangled == line {
                continue;
            }
            let ent_bb_size = self.table.bb_size_of(entangled);
            for i in 0..=ent_bb_size as u64 {
                let pf_line = entangled + i;
                if !self.timing.ongoing(pf_line)
                    && queue.prefetch_line(block_to_addr(pf_line), true, 0)
                {
                    // Only the trigger line of the burst carries the slot
                    // that predicted it; the basic-block extension does not.
                    let source = (i == 0).then_some((src_set as u32, src_way as u32));
                    self.timing.add(pf_line, source, cycle);
                }
            }
        }
    }

    /// Closes the previous basic block when a non-consecutive access ends it,
    /// recording its size in the entangled table and the history window.
    fn record_basic_block(&mut self) {
        if self.consecutive_count == 0 {
            // Single blocks carry no size and are not recorded.
            return;
        }
        if self.basic_block_merge_diff > 0 {
            let head = self.last_basic_block - self.basic_block_merge_diff as u64;
            let size = self.consecutive_count + self.basic_block_merge_diff;
            self.table.add_bb_size(head, size);
            self.hist.set_bb_size(head, size);
        } else {
            let max_bb_size = self.table.bb_size_of(self.last_basic_block);
            let size = max_bb_size.max(self.consecutive_count);
            self.table.add_bb_size(self.last_basic_block, size);
            self.hist.set_bb_size(self.last_basic_block, size);
        }
    }

    /// Tries to discover an entangled pair for a filled miss.
    ///
    /// Preference order: a trigger whose row can take the pair without any
    /// eviction, then one that fits by allocating a row, then the first
    /// candidate unconditionally.
    fn discover_entangled(&mut self, line: u64, pos_hist: usize, latency: u64) {
        for skip in 0..TRIES_AVAIL {
            if let Some(bere) = self.hist.bere(line, pos_hist, latency, skip) {
                if bere != line && self.table.avail(bere, line, false) {
                    self.table.add_entangled(bere, line);
                    return;
                }
            }
        }
        for skip in 0..TRIES_AVAIL_NOT_PRESENT {
            if let Some(bere) = self.hist.bere(line, pos_hist, latency, skip) {
                if bere != line && self.table.avail(bere, line, true) {
                    self.table.add_entangled(bere, line);
                    return;
                }
            }
        }
        if let Some(bere) = self.hist.bere(line, pos_hist, latency, 0) {
            if bere != line {
                self.table.add_entangled(bere, line);
            }
        }
    }
}

impl CachePrefetcher for EpiPrefetcher {
    fn initialize(&mut self, cpu: u32) {
        self.cpu = cpu;
        info!(cpu, "EPI prefetcher");
    }

    fn cache_operate(
        &mut self,
        queue: &mut dyn PrefetchQueue,
        cycle: u64,
        access: &AccessEvent,
    ) -> u32 {
        let line = block_of(access.addr);

        // Misses already covered by an in-flight request are absorbed by the
        // shadow MSHR; hits with no shadow record mean the shadow diverged.
        if !access.cache_hit {
            if self.timing.ongoing(line) {
                if !self.timing.is_accessed(line) {
                    self.stats.late += 1;
                }
                return access.metadata;
            }
        } else if !self.timing.completed(line) {
            return access.metadata;
        }

        self.stats.accesses += 1;
        if !access.cache_hit {
            self.stats.misses += 1;
        }
        if access.cache_hit && access.prefetch_hit {
            self.stats.hits += 1;
        }

        let mut consecutive = false;
        if self.last_basic_block + self.consecutive_count as u64 == line {
            // Same block as the current run head; nothing new to learn.
            return access.metadata;
        } else if self.last_basic_block + self.consecutive_count as u64 + 1 == line {
            self.consecutive_count += 1;
            consecutive = true;
        }

        self.issue_predictions(queue, cycle, line);

        if !consecutive {
            // A new basic block starts here; close out the previous one.
            self.record_basic_block();
            self.consecutive_count = 0;
            self.last_basic_block = line;
            self.basic_block_merge_diff = self.hist.find_bb_merge(line);
        }

        // Record the head of a genuinely new basic block in the history
        // window. A duplicate insert is allowed only when the line missed
        // and its in-flight request was never demand-accessed.
        let mut pos_hist = None;
        if !consecutive && self.basic_block_merge_diff == 0 {
            let already_present = self.hist.find(line).is_some();
            if !already_present || (!access.cache_hit && !self.timing.ongoing_accessed(line)) {
                pos_hist = Some(self.hist.add(line, cycle));
            }
        }

        if !access.cache_hit && !self.timing.ongoing(line) {
            self.timing.add(line, None, cycle);
        }
        self.timing.mark_accessed(line, pos_hist);

        access.metadata
    }

    fn cache_fill(&mut self, _queue: &mut dyn PrefetchQueue, cycle: u64, fill: &FillEvent) -> u32 {
        let line = block_of(fill.addr);
        let evicted_line = block_of(fill.evicted_addr);

        if fill.evicted_addr != 0 {
            let Some((accessed, source)) = self.timing.invalidate_cache(evicted_line) else {
                return fill.metadata;
            };
            if !accessed {
                self.stats.wrong += 1;
            }
            if let Some((set, way)) = source {
                self.table
                    .update_confidence(set as usize, way as usize, evicted_line, accessed);
            }
        }

        let (latency, pos_hist) = self.timing.latency_of(line, cycle);
        self.timing.move_to_cache(line);

        if latency > 0 {
            if let Some(pos) = pos_hist {
                self.discover_entangled(line, pos, latency);
            }
        }

        fill.metadata
    }

    fn cycle_operate(&mut self, _queue: &mut dyn PrefetchQueue, cycle: u64) {
        self.stats.cycles_operated += 1;
        self.stats.cycles_idle += cycle.saturating_sub(self.last_cycle_operate + 1);
        self.last_cycle_operate = cycle;
    }

    fn final_stats(&self) {
        let table = self.table.stats();
        info!(
            cpu = self.cpu,
            accesses = self.stats.accesses,
            misses = self.stats.misses,
            hits = self.stats.hits,
            late = self.stats.late,
            wrong = self.stats.wrong,
            slot_evictions = table.slot_evictions,
            max_bb_size = table.max_bb_size,
            "EPI final stats"
        );
    }
}
