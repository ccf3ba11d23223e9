//! MANA Temporal Instruction Prefetcher.
//!
//! MANA watches the fetch stream as a sequence of spatial regions. New
//! regions are compacted in a small queue (the SRQ) while their footprints
//! fill in; on eviction they are recorded into the successor-linked MANA
//! tables. On a fetch that matches a known region, a stream address buffer
//! replays the recorded sequence by chasing successor pointers, keeping a
//! fixed lookahead of regions prefetched ahead of the stream.
//!
//! Prefetch candidates are staged in a bounded internal queue; each cycle
//! tick drains at most one address into the cache's prefetch queue, popping
//! only when the cache accepts it.

/// MANA tables and the high-order bit-pattern store.
pub mod table;

/// Stream address buffers and the stream tracker.
pub mod stream;

use std::collections::VecDeque;

use tracing::info;

use crate::common::addr::block_align;
use crate::config::ManaConfig;
use crate::driver::{AccessEvent, CachePrefetcher, FillEvent, PrefetchQueue};
use crate::tables::{RegionKind, SpatialRegion};
use stream::StreamTracker;
use table::ManaTables;

/// Aggregate counters reported by `final_stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManaStats {
    /// Observed blocks that hit in a stream address buffer.
    pub stream_hits: u64,
    /// Stream allocations seeded from a MANA-table hit.
    pub head_found: u64,
    /// Observed blocks with neither a stream nor a table match.
    pub head_missing: u64,
    /// Regions recorded into the MANA tables.
    pub records: u64,
    /// Prefetch candidates staged in the internal queue.
    pub enqueued: u64,
    /// Replay bursts cut short by a full internal queue.
    pub queue_full: u64,
}

/// The per-CPU MANA policy object.
#[derive(Debug)]
pub struct ManaPrefetcher {
    cpu: u32,
    tables: ManaTables,
    tracker: StreamTracker,
    srq: VecDeque<SpatialRegion>,
    queue: VecDeque<u64>,
    queue_capacity: usize,
    region_kind: RegionKind,
    last_block: u64,
    stats: ManaStats,
}

impl ManaPrefetcher {
    /// Creates a MANA policy from its configuration.
    pub fn new(config: &ManaConfig) -> Self {
        // The SRQ starts full of throwaway regions; their bases sit inside
        // the first 64 bytes, which `record` refuses.
        let mut srq = VecDeque::with_capacity(config.srq_size);
        for i in 0..config.srq_size {
            srq.push_back(SpatialRegion::with_bits(
                config.region_kind,
                i as u64 + 1,
                0,
            ));
        }
        Self {
            cpu: 0,
            tables: ManaTables::new(config),
            tracker: StreamTracker::new(
                config.stream_count,
                config.tracker_size,
                config.lookahead,
                config.region_kind,
            ),
            srq,
            queue: VecDeque::with_capacity(config.queue_size),
            queue_capacity: config.queue_size,
            region_kind: config.region_kind,
            last_block: 0,
            stats: ManaStats::default(),
        }
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> &ManaStats {
        &self.stats
    }

    /// Number of staged prefetches awaiting issue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Processes one newly observed fetch block.
    fn retire(&mut self, addr: u64) {
        let replay = match self.tracker.lookup(addr) {
            Some(replay) => {
                self.stats.stream_hits += 1;
                Some(replay)
            }
            None => match self.tables.get_ptr(addr) {
                Some(ptr) => {
                    self.stats.head_found += 1;
                    Some(self.tracker.allocate(ptr))
                }
                None => {
                    self.stats.head_missing += 1;
                    None
                }
            },
        };

        if let Some(replay) = replay {
            self.chase(replay.stream, replay.length);
        }

        self.compact(addr);
    }

    /// Chases up to `length` successor regions from a stream's tail,
    /// staging each region's candidates into the internal queue.
    fn chase(&mut self, stream: usize, length: usize) {
        for _ in 0..length {
            let Some(tail) = self.tracker.tail(stream) else {
                break;
            };
            let Some(region) = self.tables.read(tail) else {
                break;
            };

            let mut staged_all = true;
            for candidate in region.candidates() {
                if self.queue.len() >= self.queue_capacity {
                    staged_all = false;
                    break;
                }
                self.queue.push_back(candidate);
                self.stats.enqueued += 1;
            }
            if !staged_all {
                self.stats.queue_full += 1;
                break;
            }

            self.tracker.push_back(stream, region);
            self.tracker.set_tail(stream, self.tables.successor_of(tail));
        }
    }

    /// Folds the observed block into the SRQ, evicting the oldest region
    /// into the MANA tables when nothing covers it.
    fn compact(&mut self, addr: u64) {
        for region in &mut self.srq {
            if region.in_range(addr).is_some() {
                region.observe(addr);
                return;
            }
        }
        if let Some(victim) = self.srq.pop_front() {
            self.tables.record(&victim);
            self.stats.records += 1;
        }
        self.srq.push_back(SpatialRegion::new(self.region_kind, addr));
    }
}

impl CachePrefetcher for ManaPrefetcher {
    fn initialize(&mut self, cpu: u32) {
        self.cpu = cpu;
        info!(cpu, "MANA prefetcher");
    }

    fn cache_operate(
        &mut self,
        _queue: &mut dyn PrefetchQueue,
        _cycle: u64,
        access: &AccessEvent,
    ) -> u32 {
        // Repeated fetches of the same block carry no new information.
        let block = block_align(access.addr);
        if block != self.last_block {
            self.last_block = block;
            self.retire(block);
        }
        access.metadata
    }

    fn cache_fill(&mut self, _queue: &mut dyn PrefetchQueue, _cycle: u64, fill: &FillEvent) -> u32 {
        fill.metadata
    }

    fn cycle_operate(&mut self, queue: &mut dyn PrefetchQueue, _cycle: u64) {
        // One issue slot per cycle; the head stays queued when the cache
        // refuses it.
        if let Some(&addr) = self.queue.front() {
            if queue.prefetch_line(addr, true, 0) {
                let _ = self.queue.pop_front();
            }
        }
    }

    fn final_stats(&self) {
        info!(
            cpu = self.cpu,
            stream_hits = self.stats.stream_hits,
            head_found = self.stats.head_found,
            head_missing = self.stats.head_missing,
            records = self.stats.records,
            enqueued = self.stats.enqueued,
            queue_full = self.stats.queue_full,
            "MANA final stats"
        );
    }
}
