//! MANA Table Tests.
//!
//! Verifies the HOBPT round trip, region recording with the compressed-tag
//! reconstruction, the first-64-bytes refusal, and the single→multiple
//! migration with its pointer rewrite.

use proptest::prelude::*;

use prefsim_core::config::ManaConfig;
use prefsim_core::mana::table::{Hobpt, ManaTables};
use prefsim_core::tables::{RegionKind, SpatialRegion, TableId};

fn region(base: u64) -> SpatialRegion {
    SpatialRegion::new(RegionKind::Floated, base)
}

fn tables() -> ManaTables {
    ManaTables::new(&ManaConfig::default())
}

// ══════════════════════════════════════════════════════════
// 1. HOBPT
// ══════════════════════════════════════════════════════════

proptest! {
    /// `get ∘ locate` reconstitutes any pattern that is still resident.
    #[test]
    fn hobpt_round_trip(pattern in 0u64..(1 << 40)) {
        let mut hobpt = Hobpt::new(128, 8, true);
        let index = hobpt.locate(pattern);
        prop_assert_eq!(hobpt.get(index), pattern);
    }
}

/// A repeated pattern resolves to the same slot instead of a duplicate.
#[test]
fn hobpt_deduplicates() {
    let mut hobpt = Hobpt::new(128, 8, true);
    let first = hobpt.locate(0x1234);
    let second = hobpt.locate(0x1234);
    assert_eq!(first, second);
}

// ══════════════════════════════════════════════════════════
// 2. Recording and lookup
// ══════════════════════════════════════════════════════════

/// A recorded region is found again and reconstructs its trigger and
/// footprint through the HOBPT.
#[test]
fn record_and_read_back() {
    let mut t = tables();
    let mut r = region(0x40_0000);
    r.observe(0x40_0080);
    t.record(&r);

    let ptr = t.get_ptr(0x40_0000).expect("recorded region must be found");
    assert_eq!(ptr.table, TableId::Single);
    let read = t.read(ptr).expect("row must be readable");
    assert_eq!(read.base, 0x40_0000);
    assert_eq!(read.bits, r.bits);
}

/// Region bases within the first cache block are never recorded.
#[test]
fn first_block_bases_are_refused() {
    let mut t = tables();
    t.record(&region(0x20));
    assert!(t.get_ptr(0x20).is_none());
}

/// An unknown trigger has no row.
#[test]
fn unknown_trigger_misses() {
    let mut t = tables();
    assert!(t.get_ptr(0x123_4000).is_none());
}

// ══════════════════════════════════════════════════════════
// 3. Successor linking and migration
// ══════════════════════════════════════════════════════════

/// Recording A then B links B as A's successor; chasing A predicts B.
#[test]
fn successor_is_linked_and_predicted() {
    let mut t = tables();
    let (a, b) = (0x40_0000u64, 0x80_0000u64);
    t.record(&region(a));
    t.record(&region(b));

    let ptr_a = t.get_ptr(a).expect("A present");
    let ptr_b = t.get_ptr(b).expect("B present");
    assert_eq!(t.successor_of(ptr_a), Some(ptr_b));
}

/// The sequence A→B; A→C migrates A to the multiple table with a 4-deep
/// ring, and B's stored pointer is rewritten to the new location.
#[test]
fn second_successor_migrates_to_multiple_table() {
    let mut t = tables();
    let (a, b, c) = (0x40_0000u64, 0x80_0000u64, 0xC0_0000u64);

    t.record(&region(a)); // A
    t.record(&region(b)); // A → B
    t.record(&region(a)); // B → A (A re-observed)
    t.record(&region(c)); // A → C forces the migration

    let ptr_a = t.get_ptr(a).expect("A still reachable");
    assert_eq!(ptr_a.table, TableId::Multiple);
    assert_eq!(t.ring_depth(ptr_a), 4);

    // B's successor pointer follows A to the multiple table.
    let ptr_b = t.get_ptr(b).expect("B present");
    assert_eq!(ptr_b.table, TableId::Single);
    assert_eq!(t.successor_of(ptr_b), Some(ptr_a));

    // The migrated row still reconstructs A's region.
    let read = t.read(ptr_a).expect("migrated row readable");
    assert_eq!(read.base, a);
}

/// Re-recording a region refreshes its footprint in place.
#[test]
fn rerecord_refreshes_footprint() {
    let mut t = tables();
    let a = 0x40_0000u64;
    t.record(&region(a));

    let mut fuller = region(a);
    fuller.observe(a + 0x40);
    fuller.observe(a + 0x100);
    t.record(&fuller);

    let ptr = t.get_ptr(a).expect("A present");
    let read = t.read(ptr).expect("row readable");
    assert_eq!(read.bits, fuller.bits);
}
