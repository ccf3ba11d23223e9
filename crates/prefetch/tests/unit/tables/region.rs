//! Spatial-Region Tests.
//!
//! Verifies the floated footprint encoding: membership, the implicit
//! trigger bit, index mapping, and candidate extraction.

use pretty_assertions::assert_eq;
use rstest::rstest;

use prefsim_core::tables::{RegionKind, SpatialRegion};

// ══════════════════════════════════════════════════════════
// 1. Membership
// ══════════════════════════════════════════════════════════

/// The floated span covers the trigger through eight blocks ahead.
#[test]
fn floated_range_boundaries() {
    let region = SpatialRegion::new(RegionKind::Floated, 0x1000);
    assert!(region.in_range(0x1000).is_some());
    assert!(region.in_range(0x1000 + 8 * 64).is_some());
    assert!(region.in_range(0x1000 + 9 * 64).is_none());
    assert!(region.in_range(0x1000 - 64).is_none());
}

/// The trigger is implicitly observed; other blocks only once recorded.
#[test]
fn trigger_is_implicit() {
    let mut region = SpatialRegion::new(RegionKind::Floated, 0x1000);
    assert_eq!(region.in_range(0x1000), Some(true));
    assert_eq!(region.in_range(0x1080), Some(false));
    region.observe(0x1080);
    assert_eq!(region.in_range(0x1080), Some(true));
}

// ══════════════════════════════════════════════════════════
// 2. Index mapping
// ══════════════════════════════════════════════════════════

/// Forward blocks map to bits 0.. in distance order; the trigger maps to
/// the implicit position.
#[rstest]
#[case(0x1040, 0, true)]
#[case(0x1080, 1, true)]
#[case(0x1100, 3, true)]
#[case(0x1200, 7, true)]
#[case(0x1000, 0, false)]
fn floated_index_mapping(#[case] addr: u64, #[case] index: u32, #[case] explicit: bool) {
    let region = SpatialRegion::new(RegionKind::Floated, 0x1000);
    assert_eq!(region.index_of(addr), (index, explicit));
}

// ══════════════════════════════════════════════════════════
// 3. Candidates
// ══════════════════════════════════════════════════════════

/// Candidates are the trigger plus every observed forward block.
#[test]
fn candidates_cover_observed_blocks() {
    let mut region = SpatialRegion::new(RegionKind::Floated, 0x1000);
    region.observe(0x1080);
    region.observe(0x1100);
    region.observe(0x1180);
    assert_eq!(region.candidates(), vec![0x1000, 0x1080, 0x1100, 0x1180]);
}

/// An empty footprint still prefetches its trigger.
#[test]
fn empty_footprint_prefetches_trigger() {
    let region = SpatialRegion::new(RegionKind::Floated, 0x4000);
    assert_eq!(region.candidates(), vec![0x4000]);
}

/// Fixed regions key an aligned eight-block window and record the trigger
/// bit explicitly.
#[test]
fn fixed_window_membership() {
    let region = SpatialRegion::new(RegionKind::Fixed, 0x1100);
    // Same aligned 512-byte window.
    assert!(region.in_range(0x1000).is_some());
    assert!(region.in_range(0x11C0).is_some());
    assert!(region.in_range(0x1200).is_none());
    // The constructor set the trigger's own bit.
    assert_eq!(region.in_range(0x1100), Some(true));
    assert_eq!(region.candidates(), vec![0x1100]);
}
