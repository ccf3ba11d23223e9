//! Set-Associative Table Tests.
//!
//! Verifies the shared table primitive that every table body in the crate
//! is built on: set/tag derivation, LRU promotion, FIFO rotation, and the
//! predicate-based lookup used by compressed-tag tables.

use prefsim_core::tables::AssocTable;
use prefsim_core::tables::policies::Replacement;

// ══════════════════════════════════════════════════════════
// 1. Indexing
// ══════════════════════════════════════════════════════════

/// The set is the low index bits, the tag the remainder.
#[test]
fn key_split() {
    let table: AssocTable<u32> = AssocTable::new(16, 2, Replacement::Lru);
    let (set, tag) = table.index(0x1234);
    assert_eq!(set, 0x4);
    assert_eq!(tag, 0x123);
}

/// A stored key is found again; a different tag in the same set is not.
#[test]
fn find_distinguishes_tags() {
    let mut table: AssocTable<u32> = AssocTable::new(16, 2, Replacement::Lru);
    let (set, way) = table.insert(0x1234, 7);
    assert_eq!(table.find(0x1234), Some((set, way)));
    assert_eq!(table.find(0x2234), None); // same set, other tag
    assert_eq!(*table.get(set, way), 7);
}

// ══════════════════════════════════════════════════════════
// 2. LRU replacement
// ══════════════════════════════════════════════════════════

/// Filling both ways and touching the older one evicts the other.
#[test]
fn lru_touch_protects_way() {
    let mut table: AssocTable<u32> = AssocTable::new(4, 2, Replacement::Lru);
    let (set, way_a) = table.insert(0x10, 1); // set 0
    let (_, _way_b) = table.insert(0x20, 2); // set 0, other way
    table.touch(set, way_a);

    // `a` is MRU, so the victim must be `b`'s way.
    let (_, way_c) = table.insert(0x30, 3);
    assert!(table.find(0x10).is_some());
    assert!(table.find(0x20).is_none());
    assert_eq!(table.find(0x30), Some((set, way_c)));
}

// ══════════════════════════════════════════════════════════
// 3. FIFO replacement
// ══════════════════════════════════════════════════════════

/// FIFO rotates through the ways regardless of touches.
#[test]
fn fifo_rotates() {
    let mut table: AssocTable<u32> = AssocTable::new(4, 2, Replacement::Fifo);
    let (_, w0) = table.insert(0x10, 1);
    let (_, w1) = table.insert(0x20, 2);
    assert_ne!(w0, w1);

    // The pointer is back at the first-filled way.
    assert_eq!(table.peek_victim(0), w0);
    let (_, w2) = table.insert(0x30, 3);
    assert_eq!(w2, w0);
    assert!(table.find(0x10).is_none());
}

// ══════════════════════════════════════════════════════════
// 4. Predicate lookup and raw writes
// ══════════════════════════════════════════════════════════

/// `find_by` matches on entry contents, ignoring the stored tag.
#[test]
fn find_by_matches_entries() {
    let mut table: AssocTable<u32> = AssocTable::new(4, 2, Replacement::Lru);
    let _ = table.insert(0x10, 41);
    let _ = table.insert(0x20, 42);
    assert_eq!(table.find_by(0, |&v| v == 42), table.find(0x20).map(|(_, w)| w));
    assert_eq!(table.find_by(0, |&v| v == 99), None);
}

/// A raw write places an entry without consulting the policy, and
/// invalidation hides it again.
#[test]
fn write_and_invalidate() {
    let mut table: AssocTable<u32> = AssocTable::new(4, 2, Replacement::Lru);
    table.write(1, 1, 0x7, 13);
    assert!(table.is_valid(1, 1));
    assert_eq!(table.tag_at(1, 1), 0x7);
    assert_eq!(table.iter_set(1).count(), 1);

    table.invalidate(1, 1);
    assert!(!table.is_valid(1, 1));
    assert_eq!(table.iter_set(1).count(), 0);
}
