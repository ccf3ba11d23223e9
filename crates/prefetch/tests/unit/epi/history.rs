//! History Window Tests.
//!
//! Verifies the observed-access ring: recency search, basic-block merge
//! probing, time-diff overflow absorption, and the "best request" walk that
//! discovers entangled pairs.

use prefsim_core::epi::history::{BB_MERGE_SCAN, HIST_ENTRIES, HistoryWindow};

// ══════════════════════════════════════════════════════════
// 1. Insertion and search
// ══════════════════════════════════════════════════════════

/// The most recent occurrence wins when a block was inserted twice.
#[test]
fn find_prefers_newest_duplicate() {
    let mut hist = HistoryWindow::new(0);
    let first = hist.add(0x100, 10);
    let _ = hist.add(0x200, 20);
    let second = hist.add(0x100, 30);
    assert_ne!(first, second);
    assert_eq!(hist.find(0x100), Some(second));
}

/// Entries survive until the ring wraps over them.
#[test]
fn entries_age_out() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0x100, 0);
    for i in 0..HIST_ENTRIES as u64 {
        let _ = hist.add(0x200 + i, 10 + i);
    }
    assert_eq!(hist.find(0x100), None);
}

// ══════════════════════════════════════════════════════════
// 2. Basic-block merge
// ══════════════════════════════════════════════════════════

/// A block inside a recorded basic block reports its gap to the head.
#[test]
fn merge_inside_recorded_block() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0x100, 0);
    hist.set_bb_size(0x100, 5);
    assert_eq!(hist.find_bb_merge(0x103), 3);
    assert_eq!(hist.find_bb_merge(0x105), 5);
}

/// A block past the recorded size does not merge.
#[test]
fn no_merge_past_block_size() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0x100, 0);
    hist.set_bb_size(0x100, 5);
    assert_eq!(hist.find_bb_merge(0x106), 0);
}

/// Only the few newest entries are probed; older heads stop merging.
#[test]
fn merge_scan_is_bounded() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0x100, 0);
    hist.set_bb_size(0x100, 5);
    for i in 0..BB_MERGE_SCAN as u64 {
        let _ = hist.add(0x1000 + i * 0x10, 10 + i);
    }
    assert_eq!(hist.find_bb_merge(0x103), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Best-request walk
// ══════════════════════════════════════════════════════════

/// An earlier block far enough in the past to hide the latency qualifies.
#[test]
fn bere_finds_distant_trigger() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0xA0, 0);
    let pos_b = hist.add(0xB0, 200);
    assert_eq!(hist.bere(0xB0, pos_b, 50, 0), Some(0xA0));
}

/// A candidate closer than the latency does not qualify.
#[test]
fn bere_respects_latency_distance() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0xA0, 0);
    let pos_b = hist.add(0xB0, 200);
    assert_eq!(hist.bere(0xB0, pos_b, 201, 0), None);
}

/// `skip` selects the k-th qualifying candidate walking backwards.
#[test]
fn bere_skips_candidates() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0xA0, 0);
    let _ = hist.add(0xB0, 100);
    let pos_c = hist.add(0xC0, 300);
    assert_eq!(hist.bere(0xC0, pos_c, 50, 0), Some(0xB0));
    assert_eq!(hist.bere(0xC0, pos_c, 50, 1), Some(0xA0));
    assert_eq!(hist.bere(0xC0, pos_c, 50, 2), None);
}

/// The walk aborts when the queried tag reappears: the line was evicted
/// and refetched in between, so no stable pair exists.
#[test]
fn bere_aborts_on_reappearing_tag() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0xA0, 0);
    let _ = hist.add(0xB0, 100);
    let pos = hist.add(0xA0, 200);
    assert_eq!(hist.bere(0xA0, pos, 300, 0), None);
}

/// A stale position (overwritten since the access) yields nothing.
#[test]
fn bere_rejects_stale_position() {
    let mut hist = HistoryWindow::new(0);
    let pos = hist.add(0xA0, 0);
    for i in 0..HIST_ENTRIES as u64 {
        let _ = hist.add(0x200 + i, 10 + i);
    }
    assert_eq!(hist.bere(0xA0, pos, 1, 0), None);
}

// ══════════════════════════════════════════════════════════
// 4. Time-diff overflow
// ══════════════════════════════════════════════════════════

/// An idle gap beyond the 20-bit field is absorbed by filler entries, and
/// the accumulated distance stays available to the walk.
#[test]
fn overflow_gap_absorbed_by_fillers() {
    let mut hist = HistoryWindow::new(0);
    let _ = hist.add(0xA0, 0);
    let pos_b = hist.add(0xB0, (1 << 20) + 10);
    // Both entries are still present and the old one still qualifies.
    assert!(hist.find(0xA0).is_some());
    assert_eq!(hist.bere(0xB0, pos_b, 1 << 19, 0), Some(0xA0));
}
