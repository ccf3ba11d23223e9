//! EPI State-Machine Scenarios.
//!
//! Replays literal access traces through the full policy object and checks
//! the issued prefetches: basic-block coverage learned from a sequential
//! stream, and entangled-pair discovery from a latency-sized history walk.

use pretty_assertions::assert_eq;

use prefsim_core::config::EpiConfig;
use prefsim_core::driver::CachePrefetcher;
use prefsim_core::epi::EpiPrefetcher;

use crate::common::{MockQueue, access, fill};

fn epi() -> EpiPrefetcher {
    let mut p = EpiPrefetcher::new(&EpiConfig::default());
    p.initialize(0);
    p
}

// ══════════════════════════════════════════════════════════
// 1. Basic-block learning on a sequential stream
// ══════════════════════════════════════════════════════════

/// Blocks 10..=20 all missing at latency 100: the first pass learns
/// nothing, the block size is recorded when the run ends, and the third
/// replay covers the whole stream from the head block alone.
#[test]
fn sequential_stream_learns_basic_block() {
    let mut p = epi();
    let mut q = MockQueue::new();

    // Pass 1: cold misses, spaced 10 cycles, each filling 100 cycles later.
    let mut cycle = 0;
    for block in 10u64..=20 {
        let _ = p.cache_operate(&mut q, cycle, &access(block << 6, false));
        cycle += 10;
    }
    assert!(q.issued.is_empty(), "nothing is known on the first pass");

    let mut fill_cycle = 100;
    for block in 10u64..=20 {
        let _ = p.cache_fill(&mut q, fill_cycle, &fill(block << 6, 0));
        fill_cycle += 10;
    }

    // Pass 2: hits. Re-reaching block 10 ends the previous run and records
    // its size; no prefetch coverage exists yet at prediction time.
    let mut cycle = 1_000;
    for block in 10u64..=20 {
        let _ = p.cache_operate(&mut q, cycle, &access(block << 6, true));
        cycle += 10;
    }
    assert!(q.issued.is_empty(), "the size is recorded after prediction");

    // Pass 3: the head block now prefetches its entire basic block.
    let _ = p.cache_operate(&mut q, 2_000, &access(10 << 6, true));
    assert_eq!(q.blocks(), (11u64..=20).collect::<Vec<_>>());
}

/// Within one pass, consecutive accesses of a run never re-trigger
/// prediction for the same head.
#[test]
fn repeated_head_access_is_quiet() {
    let mut p = epi();
    let mut q = MockQueue::new();
    let _ = p.cache_operate(&mut q, 0, &access(10 << 6, false));
    // Same block again: same run head, nothing new.
    let _ = p.cache_operate(&mut q, 5, &access(10 << 6, false));
    assert!(q.issued.is_empty());
}

// ══════════════════════════════════════════════════════════
// 2. Entangled-pair discovery
// ══════════════════════════════════════════════════════════

/// Two blocks 200 cycles apart with a 50-cycle miss latency entangle:
/// when B fills, the history walk elects A as the trigger, and the next
/// access to A prefetches B.
#[test]
fn distant_pair_becomes_entangled() {
    let mut p = epi();
    let mut q = MockQueue::new();
    let a = 100u64;
    let b = 900u64;

    let _ = p.cache_operate(&mut q, 0, &access(a << 6, false));
    let _ = p.cache_fill(&mut q, 30, &fill(a << 6, 0));

    let _ = p.cache_operate(&mut q, 200, &access(b << 6, false));
    let _ = p.cache_fill(&mut q, 250, &fill(b << 6, 0));

    assert!(q.issued.is_empty());

    // A's row now carries B; accessing A prefetches it.
    let _ = p.cache_operate(&mut q, 400, &access(a << 6, true));
    assert_eq!(q.blocks(), vec![b]);
}

/// A short miss latency hidden by the immediate predecessor needs no
/// entangling: nothing earlier qualifies and no pair is recorded.
#[test]
fn short_latency_does_not_entangle() {
    let mut p = epi();
    let mut q = MockQueue::new();
    let a = 100u64;
    let b = 900u64;

    let _ = p.cache_operate(&mut q, 0, &access(a << 6, false));
    // B misses only 5 cycles after A was observed; the walk finds no
    // candidate far enough in the past.
    let _ = p.cache_operate(&mut q, 5, &access(b << 6, false));
    let _ = p.cache_fill(&mut q, 30, &fill(a << 6, 0));
    let _ = p.cache_fill(&mut q, 55, &fill(b << 6, 0));

    let _ = p.cache_operate(&mut q, 400, &access(a << 6, true));
    assert!(q.issued.is_empty());
}

// ══════════════════════════════════════════════════════════
// 3. Eviction feedback
// ══════════════════════════════════════════════════════════

/// An entangled prefetch evicted without a demand access counts as wrong
/// and drains the pair's confidence.
#[test]
fn unused_prefetch_loses_confidence() {
    let mut p = epi();
    let mut q = MockQueue::new();
    let a = 100u64;
    let b = 900u64;

    // Entangle A → B as above.
    let _ = p.cache_operate(&mut q, 0, &access(a << 6, false));
    let _ = p.cache_fill(&mut q, 30, &fill(a << 6, 0));
    let _ = p.cache_operate(&mut q, 200, &access(b << 6, false));
    let _ = p.cache_fill(&mut q, 250, &fill(b << 6, 0));

    // B leaves the cache before being re-prefetched.
    let _ = p.cache_fill(&mut q, 300, &fill(0x5000 << 6, b << 6));

    // Accessing A issues the prefetch of B; B fills and is then evicted
    // again without ever being demanded.
    let _ = p.cache_operate(&mut q, 400, &access(a << 6, true));
    assert_eq!(q.blocks(), vec![b]);
    let _ = p.cache_fill(&mut q, 450, &fill(b << 6, 0));
    let _ = p.cache_fill(&mut q, 500, &fill(0x6000 << 6, b << 6));

    assert_eq!(p.stats().wrong, 1);
}
