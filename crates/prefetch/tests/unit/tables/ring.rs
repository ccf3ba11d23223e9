//! Successor Ring Tests.
//!
//! Verifies the circular history used for MANA's pointer chasing: the
//! prediction identity, in-place override, and order-preserving resize.

use prefsim_core::tables::{RowPtr, SuccessorRing, TableId};

fn ptr(set: usize, way: usize) -> RowPtr {
    RowPtr::new(TableId::Single, set, way)
}

// ══════════════════════════════════════════════════════════
// 1. Prediction
// ══════════════════════════════════════════════════════════

/// `predict` returns exactly the cell recorded after the previous
/// occurrence of the last-inserted cell.
#[test]
fn predict_returns_successor_of_previous_occurrence() {
    let mut ring = SuccessorRing::new(4);
    let (a, b, c) = (ptr(1, 0), ptr(2, 0), ptr(3, 0));
    ring.add(a);
    ring.add(b);
    ring.add(c);
    ring.add(a);
    // History: a b c a — the previous `a` was followed by `b`.
    assert_eq!(ring.predict(), Some(b));
}

/// With no earlier occurrence, there is nothing to predict.
#[test]
fn predict_without_repeat() {
    let mut ring = SuccessorRing::new(4);
    ring.add(ptr(1, 0));
    ring.add(ptr(2, 0));
    assert_eq!(ring.predict(), None);
}

/// A single-cell ring always predicts its own lone pointer, which is how
/// the single-successor table chases.
#[test]
fn single_cell_ring_predicts_itself() {
    let mut ring = SuccessorRing::new(1);
    let b = ptr(5, 1);
    ring.add(b);
    assert_eq!(ring.predict(), Some(b));
}

// ══════════════════════════════════════════════════════════
// 2. Override and membership
// ══════════════════════════════════════════════════════════

/// `override_last` rewrites the most recent cell in place.
#[test]
fn override_rewrites_last_cell() {
    let mut ring = SuccessorRing::new(4);
    ring.add(ptr(1, 0));
    ring.add(ptr(2, 0));
    ring.override_last(ptr(9, 9));
    assert!(ring.contains(ptr(9, 9)));
    assert!(!ring.contains(ptr(2, 0)));
    assert!(ring.contains(ptr(1, 0)));
}

/// An empty ring is inactive; any insertion activates it.
#[test]
fn active_tracks_occupancy() {
    let mut ring = SuccessorRing::new(2);
    assert!(!ring.active());
    assert!(ring.is_empty());
    ring.add(ptr(0, 0));
    assert!(ring.active());
}

// ══════════════════════════════════════════════════════════
// 3. Resize
// ══════════════════════════════════════════════════════════

/// Growing a ring preserves its contents and keeps appending after them.
#[test]
fn resize_preserves_insertion_order() {
    let mut ring = SuccessorRing::new(1);
    let (b, c) = (ptr(2, 0), ptr(3, 0));
    ring.add(b);
    ring.resize(4);
    assert_eq!(ring.len(), 4);
    assert!(ring.contains(b));

    ring.add(c);
    assert!(ring.contains(b));
    assert!(ring.contains(c));
}
