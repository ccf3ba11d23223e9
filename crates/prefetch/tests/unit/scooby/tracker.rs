//! Prefetch Tracker Tests.
//!
//! Verifies the FIFO of in-flight prefetch records: duplicate detection,
//! matching walks, and the eviction pairing that feeds training.

use prefsim_core::scooby::State;
use prefsim_core::scooby::tracker::{DUMMY_ADDR, PrefetchTracker, PtEntry};

fn entry(addr: u64) -> PtEntry {
    PtEntry::new(addr, State::default(), 0)
}

// ══════════════════════════════════════════════════════════
// 1. Tracking and search
// ══════════════════════════════════════════════════════════

/// A tracked address is found; the dummy address can pile up freely.
#[test]
fn tracks_and_finds_addresses() {
    let mut t = PrefetchTracker::new(4);
    t.push(entry(0x40));
    assert!(t.is_tracked(0x40));
    assert!(!t.is_tracked(0x80));

    t.push(entry(DUMMY_ADDR));
    t.push(entry(DUMMY_ADDR));
    assert_eq!(t.len(), 3);
}

/// The matching walk touches only the oldest match unless asked for all.
#[test]
fn matching_walk_scope() {
    let mut t = PrefetchTracker::new(4);
    t.push(entry(0x40));
    t.push(entry(0x40));

    let first_only = t.for_each_matching(0x40, false, |e| {
        e.is_filled = true;
        true
    });
    assert_eq!(first_only, 1);

    let all = t.for_each_matching(0x40, true, |e| {
        e.pf_cache_hit = true;
        true
    });
    assert_eq!(all, 2);
}

/// A callback returning `false` stops the walk even in all-match mode.
#[test]
fn matching_walk_stops_on_false() {
    let mut t = PrefetchTracker::new(4);
    t.push(entry(0x40));
    t.push(entry(0x40));
    let touched = t.for_each_matching(0x40, true, |_| false);
    assert_eq!(touched, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Eviction pairing
// ══════════════════════════════════════════════════════════

/// The oldest record pops first, and consecutive evictions are paired
/// through the last-evicted slot.
#[test]
fn eviction_pairs_consecutive_records() {
    let mut t = PrefetchTracker::new(2);
    t.push(entry(0x40));
    t.push(entry(0x80));
    assert!(t.is_full());

    let first = t.pop_oldest().expect("oldest pops");
    assert_eq!(first.address, 0x40);
    assert!(t.take_last_evicted().is_none());
    t.set_last_evicted(first);

    t.push(entry(0xC0));
    let second = t.pop_oldest().expect("oldest pops");
    assert_eq!(second.address, 0x80);
    let last = t.take_last_evicted().expect("previous eviction stored");
    assert_eq!(last.address, 0x40);
}

/// The newest record stays reachable for the bookkeeping reward paths.
#[test]
fn newest_is_mutable() {
    let mut t = PrefetchTracker::new(4);
    t.push(entry(0x40));
    t.push(entry(DUMMY_ADDR));
    let newest = t.newest_mut().expect("just pushed");
    assert_eq!(newest.address, DUMMY_ADDR);
    newest.has_reward = true;
}
