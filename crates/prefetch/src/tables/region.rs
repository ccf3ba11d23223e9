//! Spatial-Region Footprint.
//!
//! A spatial region is a trigger block plus a small bitmap of nearby blocks
//! that were touched while the region was live. Two encodings exist:
//!
//! - **Floated** (default): bits index positions relative to the trigger,
//!   forward first then backward; the trigger itself is implicit and costs
//!   no bit. Needs two comparisons to test membership.
//! - **Fixed**: bits index an address-aligned window of blocks keyed by the
//!   high-order bits; the trigger's own bit is explicit. Needs a single
//!   comparison but covers a slightly worse span.

use serde::Deserialize;

use crate::common::addr::{BLOCK_BYTES, BLOCK_SHIFT};

/// Number of blocks encoded in a footprint bitmap.
pub const REGION_BLOCKS: u32 = 8;

/// Floated regions: blocks tracked ahead of the trigger.
pub const FLOATED_FORWARD: u64 = 8;

/// Floated regions: blocks tracked behind the trigger.
pub const FLOATED_BACKWARD: u64 = 0;

/// Fixed regions: log2 of the aligned window size in blocks.
const FIXED_SHIFT: u32 = 3;

const FIXED_MASK: u64 = (1 << FIXED_SHIFT) - 1;

/// Selects the spatial-region encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RegionKind {
    /// Region floats around its trigger block.
    #[default]
    Floated,
    /// Region is an address-aligned window.
    Fixed,
}

/// A trigger address plus the footprint of blocks observed around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialRegion {
    /// Byte address of the trigger block.
    pub base: u64,
    /// Footprint bitmap over [`REGION_BLOCKS`] positions.
    pub bits: u8,
    /// Encoding of the footprint.
    pub kind: RegionKind,
}

impl SpatialRegion {
    /// Creates an empty region triggered at `base`.
    ///
    /// Fixed regions record their own trigger bit explicitly; floated
    /// regions hold the trigger implicitly.
    pub fn new(kind: RegionKind, base: u64) -> Self {
        let mut region = Self {
            base,
            bits: 0,
            kind,
        };
        if kind == RegionKind::Fixed {
            let (index, explicit) = region.index_of(base);
            debug_assert!(explicit);
            region.bits |= 1 << index;
        }
        region
    }

    /// Reconstitutes a region from a stored footprint.
    pub fn with_bits(kind: RegionKind, base: u64, bits: u8) -> Self {
        Self { base, bits, kind }
    }

    /// Tests whether `addr` falls in the region's covered span.
    ///
    /// Returns `Some(observed)` when it does, where `observed` reports
    /// whether the corresponding footprint bit is already set (the implicit
    /// trigger block always counts as observed). Returns `None` when the
    /// address lies outside the region.
    pub fn in_range(&self, addr: u64) -> Option<bool> {
        match self.kind {
            RegionKind::Floated => {
                let lo = self.base.wrapping_sub(FLOATED_BACKWARD * BLOCK_BYTES);
                let hi = self.base + FLOATED_FORWARD * BLOCK_BYTES;
                if lo <= addr && addr <= hi {
                    let (index, explicit) = self.index_of(addr);
                    Some(if explicit {
                        self.bits & (1 << index) != 0
                    } else {
                        true
                    })
                } else {
                    None
                }
            }
            RegionKind::Fixed => {
                if (addr >> BLOCK_SHIFT) >> FIXED_SHIFT == (self.base >> BLOCK_SHIFT) >> FIXED_SHIFT
                {
                    let (index, _) = self.index_of(addr);
                    Some(self.bits & (1 << index) != 0)
                } else {
                    None
                }
            }
        }
    }

    /// Maps an in-range address to its footprint position.
    ///
    /// Returns `(bit index, explicit)`; `explicit` is false only for the
    /// floated trigger block, which is held implicitly.
    pub fn index_of(&self, addr: u64) -> (u32, bool) {
        match self.kind {
            RegionKind::Floated => {
                let diff = (addr as i64 - self.base as i64) / BLOCK_BYTES as i64;
                debug_assert!(-(FLOATED_BACKWARD as i64) <= diff && diff <= FLOATED_FORWARD as i64);
                if diff < 0 {
                    ((FLOATED_FORWARD as i64 - diff - 1) as u32, true)
                } else if diff > 0 {
                    ((diff - 1) as u32, true)
                } else {
                    (0, false)
                }
            }
            RegionKind::Fixed => (((addr >> BLOCK_SHIFT) & FIXED_MASK) as u32, true),
        }
    }

    /// Records an in-range address in the footprint.
    pub fn observe(&mut self, addr: u64) {
        let (index, explicit) = self.index_of(addr);
        if explicit {
            self.bits |= 1 << index;
        }
    }

    /// Extracts the prefetch candidates: the trigger block plus every block
    /// whose footprint bit is set, as byte addresses.
    pub fn candidates(&self) -> Vec<u64> {
        let mut out = Vec::new();
        match self.kind {
            RegionKind::Floated => {
                out.push(self.base);
                let mut candidate = self.base;
                for i in 0..FLOATED_FORWARD as u32 {
                    candidate += BLOCK_BYTES;
                    if self.bits & (1 << i) != 0 {
                        out.push(candidate);
                    }
                }
                let mut candidate = self.base.wrapping_sub(BLOCK_BYTES);
                for i in 0..FLOATED_BACKWARD as u32 {
                    if self.bits & (1 << (FLOATED_FORWARD as u32 + i)) != 0 {
                        out.push(candidate);
                    }
                    candidate = candidate.wrapping_sub(BLOCK_BYTES);
                }
            }
            RegionKind::Fixed => {
                let mut candidate =
                    (((self.base >> BLOCK_SHIFT) >> FIXED_SHIFT) << FIXED_SHIFT) << BLOCK_SHIFT;
                for i in 0..=FIXED_MASK as u32 {
                    if self.bits & (1 << i) != 0 {
                        out.push(candidate);
                    }
                    candidate += BLOCK_BYTES;
                }
            }
        }
        out
    }
}
