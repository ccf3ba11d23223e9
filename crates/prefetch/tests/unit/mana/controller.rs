//! MANA Controller Scenarios.
//!
//! Replays access traces through the full policy object: region learning
//! through the SRQ, replay on a table hit, and the one-line-per-cycle
//! drain of the internal queue.

use pretty_assertions::assert_eq;

use prefsim_core::config::ManaConfig;
use prefsim_core::driver::CachePrefetcher;
use prefsim_core::mana::ManaPrefetcher;

use crate::common::{MockQueue, access, init_tracing};

fn mana() -> ManaPrefetcher {
    let mut p = ManaPrefetcher::new(&ManaConfig::default());
    p.initialize(0);
    p
}

/// Observes one block per call (hit/miss is irrelevant to MANA).
fn observe(p: &mut ManaPrefetcher, q: &mut MockQueue, addr: u64) {
    let _ = p.cache_operate(q, 0, &access(addr, true));
}

/// Floods the SRQ with far-apart triggers until its oldest regions are
/// recorded into the tables.
fn flood_srq(p: &mut ManaPrefetcher, q: &mut MockQueue, count: usize) {
    for i in 0..count as u64 {
        observe(p, q, 0x100_0000 + i * 0x1_0000);
    }
}

// ══════════════════════════════════════════════════════════
// 1. Region learning and replay
// ══════════════════════════════════════════════════════════

/// A region observed once (trigger 0x1000, blocks +2, +4, +6), flushed
/// into the tables, replays its full candidate set when the trigger is
/// seen again.
#[test]
fn recorded_region_replays_its_footprint() {
    init_tracing();
    let mut p = mana();
    let mut q = MockQueue::new();

    // First sighting builds the footprint in the SRQ.
    observe(&mut p, &mut q, 0x1000);
    observe(&mut p, &mut q, 0x1080);
    observe(&mut p, &mut q, 0x1100);
    observe(&mut p, &mut q, 0x1180);

    // Push the region out of the SRQ and into the tables.
    flood_srq(&mut p, &mut q, 8);
    assert!(q.issued.is_empty(), "learning issues nothing");

    // Second sighting: the trigger hits the table, a stream is allocated,
    // and the region's candidates are staged.
    observe(&mut p, &mut q, 0x1000);
    assert_eq!(p.pending(), 4);

    // One line drains per cycle, in footprint order.
    for cycle in 0..4 {
        p.cycle_operate(&mut q, cycle);
    }
    assert_eq!(q.addrs(), vec![0x1000, 0x1080, 0x1100, 0x1180]);
    assert_eq!(p.pending(), 0);
}

/// Deduplication: repeated observations of one block reach the policy
/// once.
#[test]
fn repeated_block_is_deduplicated() {
    let mut p = mana();
    let mut q = MockQueue::new();
    observe(&mut p, &mut q, 0x1000);
    observe(&mut p, &mut q, 0x1010); // same block, different byte
    observe(&mut p, &mut q, 0x1000);
    flood_srq(&mut p, &mut q, 8);

    // Had the duplicates registered, the footprint would differ; the
    // recorded region replays the bare trigger only.
    observe(&mut p, &mut q, 0x1000);
    assert_eq!(p.pending(), 1);
}

// ══════════════════════════════════════════════════════════
// 2. Issue pacing
// ══════════════════════════════════════════════════════════

/// A refused issue keeps the head queued; it drains on a later cycle.
#[test]
fn refused_issue_is_retried() {
    let mut p = mana();
    let mut q = MockQueue::with_capacity(0);

    observe(&mut p, &mut q, 0x1000);
    observe(&mut p, &mut q, 0x1080);
    flood_srq(&mut p, &mut q, 8);
    observe(&mut p, &mut q, 0x1000);
    assert_eq!(p.pending(), 2);

    // The cache refuses; nothing is lost.
    p.cycle_operate(&mut q, 0);
    assert_eq!(p.pending(), 2);

    // The cache opens up; exactly one line drains per cycle.
    q.capacity = None;
    p.cycle_operate(&mut q, 1);
    assert_eq!(p.pending(), 1);
    p.cycle_operate(&mut q, 2);
    assert_eq!(q.addrs(), vec![0x1000, 0x1080]);
}

/// The staging queue is bounded; a replay burst larger than the remaining
/// room is cut short.
#[test]
fn staging_queue_is_bounded() {
    let config = ManaConfig {
        queue_size: 2,
        ..ManaConfig::default()
    };
    let mut p = ManaPrefetcher::new(&config);
    let mut q = MockQueue::new();

    observe(&mut p, &mut q, 0x1000);
    observe(&mut p, &mut q, 0x1080);
    observe(&mut p, &mut q, 0x1100);
    observe(&mut p, &mut q, 0x1180);
    flood_srq(&mut p, &mut q, 8);

    // Four candidates exist but only two fit.
    observe(&mut p, &mut q, 0x1000);
    assert_eq!(p.pending(), 2);
    assert_eq!(p.stats().queue_full, 1);
}
