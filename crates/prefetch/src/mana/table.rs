//! MANA Tables and the High-Order Bit-Pattern Table.
//!
//! A MANA row stores a spatial region keyed by its trigger block, but not
//! the trigger's full tag: the high-order bits most triggers share live once
//! in the HOBPT, and each row keeps only a short partial tag plus a pointer
//! into the HOBPT. Lookup reconstructs the tag; if the shared pattern was
//! evicted in the meantime the row simply stops matching, which is the
//! intended approximation.
//!
//! Rows come in two flavors: the *single* table holds rows with one recorded
//! successor, the *multiple* table rows with a four-deep successor ring. A
//! row migrates single → multiple the first time its lone successor would be
//! overwritten by a different one. Both tables, their shared
//! `last_inserted` / `second_last_inserted` bookkeeping, and the HOBPT are
//! owned together by [`ManaTables`], so moving a row rewrites the
//! predecessor's stored pointer rather than aliasing it.

use tracing::debug;

use crate::common::addr::{BLOCK_SHIFT, block_of};
use crate::config::ManaConfig;
use crate::tables::policies::Replacement;
use crate::tables::{AssocTable, RegionKind, RowPtr, SpatialRegion, SuccessorRing, TableId};

/// Pointer into the HOBPT, as `(set, way)`.
pub type HobptIndex = (u32, u32);

/// The high-order bit-pattern store.
///
/// Set-associative over the pattern value itself: the low bits index the
/// set, the remainder is the stored tag. `locate` is find-or-insert; `get`
/// reconstitutes the pattern a row pointer refers to.
pub struct Hobpt {
    table: AssocTable<()>,
    uses_lru: bool,
}

impl Hobpt {
    /// Creates a HOBPT of `sets` × `ways` patterns.
    pub fn new(sets: usize, ways: usize, uses_lru: bool) -> Self {
        Self {
            table: AssocTable::new(
                sets,
                ways,
                if uses_lru {
                    Replacement::Lru
                } else {
                    Replacement::Fifo
                },
            ),
            uses_lru,
        }
    }

    /// Returns the position of `pattern`, inserting it when absent.
    pub fn locate(&mut self, pattern: u64) -> HobptIndex {
        if let Some((set, way)) = self.table.find(pattern) {
            if self.uses_lru {
                self.table.touch(set, way);
            }
            return (set as u32, way as u32);
        }
        let (set, way) = self.table.insert(pattern, ());
        (set as u32, way as u32)
    }

    /// Reconstitutes the pattern stored at `index`.
    ///
    /// If the pattern was since evicted this returns its replacement; rows
    /// still pointing here then reconstruct a different tag and miss.
    pub fn get(&self, index: HobptIndex) -> u64 {
        let (set, way) = (index.0 as usize, index.1 as usize);
        (self.table.tag_at(set, way) << self.table.set_bits()) | set as u64
    }
}

/// One MANA row: compressed tag, footprint, and successor ring.
#[derive(Debug, Clone)]
pub struct ManaEntry {
    partial_tag: u64,
    hobpt: HobptIndex,
    footprint: u8,
    succ: SuccessorRing,
}

impl Default for ManaEntry {
    fn default() -> Self {
        Self {
            partial_tag: 0,
            hobpt: (0, 0),
            footprint: 0,
            succ: SuccessorRing::new(1),
        }
    }
}

/// One of the two MANA table bodies.
pub struct ManaTable {
    body: AssocTable<ManaEntry>,
    ptag_shift: u32,
    ptag_domain: u64,
    ring_size: usize,
}

impl ManaTable {
    fn new(sets: usize, ways: usize, ptag_shift: u32, ring_size: usize) -> Self {
        Self {
            body: AssocTable::new(sets, ways, Replacement::Lru),
            ptag_shift,
            ptag_domain: 1 << ptag_shift,
            ring_size,
        }
    }

    /// Reconstructs the full tag of a row through the HOBPT.
    fn tag_of(&self, entry: &ManaEntry, hobpt: &Hobpt) -> u64 {
        (hobpt.get(entry.hobpt) << self.ptag_shift) + entry.partial_tag
    }

    fn find(&self, block: u64, hobpt: &Hobpt) -> Option<(usize, usize)> {
        let (set, tag) = self.body.index(block);
        self.body
            .find_by(set, |entry| self.tag_of(entry, hobpt) == tag)
            .map(|way| (set, way))
    }
}

/// Both MANA tables, the HOBPT, and the shared insertion bookkeeping.
pub struct ManaTables {
    single: ManaTable,
    multiple: Option<ManaTable>,
    hobpt: Hobpt,
    region_kind: RegionKind,
    last_inserted: Option<RowPtr>,
    second_last_inserted: Option<RowPtr>,
}

impl ManaTables {
    /// Builds the tables from the MANA configuration.
    pub fn new(config: &ManaConfig) -> Self {
        let single_bits = config.single_sets.trailing_zeros();
        let multiple_bits = config.multiple_sets.trailing_zeros();
        // The multiple table's shorter index leaves more tag bits to cover.
        let multiple_shift = single_bits + config.single_ptag_bits - multiple_bits;
        Self {
            single: ManaTable::new(
                config.single_sets,
                config.single_ways,
                config.single_ptag_bits,
                config.single_ring_size,
            ),
            multiple: config.support_multiple.then(|| {
                ManaTable::new(
                    config.multiple_sets,
                    config.multiple_ways,
                    multiple_shift,
                    config.multiple_ring_size,
                )
            }),
            hobpt: Hobpt::new(config.hobpt_sets, config.hobpt_ways, config.hobpt_lru),
            region_kind: config.region_kind,
            last_inserted: None,
            second_last_inserted: None,
        }
    }

    fn table(&self, id: TableId) -> &ManaTable {
        match id {
            TableId::Single => &self.single,
            TableId::Multiple => self.multiple.as_ref().unwrap_or(&self.single),
        }
    }

    fn table_mut(&mut self, id: TableId) -> &mut ManaTable {
        match id {
            TableId::Single => &mut self.single,
            TableId::Multiple => self.multiple.as_mut().unwrap_or(&mut self.single),
        }
    }

    fn ring(&self, ptr: RowPtr) -> &SuccessorRing {
        &self
            .table(ptr.table)
            .body
            .get(ptr.set as usize, ptr.way as usize)
            .succ
    }

    fn ring_mut(&mut self, ptr: RowPtr) -> &mut SuccessorRing {
        &mut self
            .table_mut(ptr.table)
            .body
            .get_mut(ptr.set as usize, ptr.way as usize)
            .succ
    }

    /// Reconstructs the block address a row was keyed by.
    fn block_at(&self, ptr: RowPtr) -> u64 {
        let table = self.table(ptr.table);
        let entry = table.body.get(ptr.set as usize, ptr.way as usize);
        (table.tag_of(entry, &self.hobpt) << table.body.set_bits()) + ptr.set as u64
    }

    /// Records a spatial region evicted from the SRQ.
    ///
    /// The region lands in the multiple table when its trigger already lives
    /// there (checked without promoting), otherwise in the single table.
    /// Region bases within the first 64 bytes are refused.
    pub fn record(&mut self, region: &SpatialRegion) {
        if region.base & !63 == 0 {
            return;
        }
        let block = block_of(region.base);
        let id = match &self.multiple {
            Some(multiple) if multiple.find(block, &self.hobpt).is_some() => TableId::Multiple,
            _ => TableId::Single,
        };
        self.record_into(id, block, region.bits);
    }

    fn record_into(&mut self, id: TableId, block: u64, footprint: u8) {
        let (set, tag) = self.table(id).body.index(block);
        let hit_way = self.table(id).find(block, &self.hobpt).map(|(_, way)| way);

        let way = match hit_way {
            Some(way) => {
                let table = self.table_mut(id);
                table.body.get_mut(set, way).footprint = footprint;
                table.body.touch(set, way);
                way
            }
            None => {
                let ptag_shift = self.table(id).ptag_shift;
                let ptag_domain = self.table(id).ptag_domain;
                let ring_size = self.table(id).ring_size;
                let hobpt = self.hobpt.locate(tag >> ptag_shift);
                let entry = ManaEntry {
                    partial_tag: tag % ptag_domain,
                    hobpt,
                    footprint,
                    succ: SuccessorRing::new(ring_size),
                };
                let (_, way) = self.table_mut(id).body.insert(block, entry);
                way
            }
        };

        self.link_successor(RowPtr::new(id, set, way));
    }

    /// Appends the freshly recorded row to its predecessor's successor ring,
    /// promoting the predecessor to the multiple table when its lone
    /// successor would be overwritten by a different one.
    fn link_successor(&mut self, new_ptr: RowPtr) {
        if let Some(lp) = self.last_inserted {
            if lp.table == TableId::Single && self.multiple.is_some() {
                let ring = self.ring(lp);
                if !ring.contains(new_ptr) && ring.active() {
                    self.promote(lp, new_ptr);
                    return;
                }
            }
            self.ring_mut(lp).add(new_ptr);
        }
        self.second_last_inserted = self.last_inserted;
        self.last_inserted = Some(new_ptr);
    }

    /// Moves a row from the single table to the multiple table.
    ///
    /// The predecessor's stored pointer is rewritten through the ring's
    /// `override`, the row's ring grows to the multiple depth, and the
    /// successor that triggered the migration is appended.
    fn promote(&mut self, lp: RowPtr, nx: RowPtr) {
        debug_assert_eq!(lp.table, TableId::Single);
        let block = self.block_at(lp);
        debug!(block, "promoting row to the multiple table");

        let Some(multiple) = &self.multiple else {
            return;
        };
        // A live duplicate would violate the one-table-per-trigger
        // invariant; the migration is skipped if one somehow exists.
        if multiple.find(block, &self.hobpt).is_some() {
            return;
        }
        let (set, tag) = multiple.body.index(block);
        let ptag_domain = multiple.ptag_domain;
        let ring_size = multiple.ring_size;

        let src = self
            .single
            .body
            .get(lp.set as usize, lp.way as usize)
            .clone();
        let entry = ManaEntry {
            partial_tag: tag % ptag_domain,
            hobpt: src.hobpt,
            footprint: src.footprint,
            succ: src.succ,
        };
        let (set, way) = {
            let Some(multiple) = &mut self.multiple else {
                return;
            };
            debug_assert_eq!(set, multiple.body.index(block).0);
            multiple.body.insert(block, entry)
        };
        self.single
            .body
            .invalidate(lp.set as usize, lp.way as usize);

        let promoted = RowPtr::new(TableId::Multiple, set, way);
        if let Some(sl) = self.second_last_inserted {
            self.ring_mut(sl).override_last(promoted);
        }
        self.ring_mut(promoted).resize(ring_size);
        self.ring_mut(promoted).add(nx);

        self.second_last_inserted = Some(promoted);
        self.last_inserted = Some(nx);
    }

    /// Finds the row keyed by the trigger of `addr`, promoting the hit to
    /// MRU in its own table. The single table wins when both match.
    pub fn get_ptr(&mut self, addr: u64) -> Option<RowPtr> {
        let block = block_of(addr);
        let single_hit = self.single.find(block, &self.hobpt);
        if let Some((set, way)) = single_hit {
            self.single.body.touch(set, way);
        }
        let multiple_hit = match &self.multiple {
            Some(multiple) => multiple.find(block, &self.hobpt),
            None => None,
        };
        if let Some((set, way)) = multiple_hit {
            if let Some(multiple) = &mut self.multiple {
                multiple.body.touch(set, way);
            }
        }
        single_hit
            .map(|(set, way)| RowPtr::new(TableId::Single, set, way))
            .or_else(|| multiple_hit.map(|(set, way)| RowPtr::new(TableId::Multiple, set, way)))
    }

    /// Reads the spatial region a row pointer refers to.
    pub fn read(&self, ptr: RowPtr) -> Option<SpatialRegion> {
        let table = self.table(ptr.table);
        if !table.body.is_valid(ptr.set as usize, ptr.way as usize) {
            return None;
        }
        let entry = table.body.get(ptr.set as usize, ptr.way as usize);
        let base = self.block_at(ptr) << BLOCK_SHIFT;
        Some(SpatialRegion::with_bits(
            self.region_kind,
            base,
            entry.footprint,
        ))
    }

    /// The successor-ring depth of a row (1 in the single table, the
    /// configured depth after migration to the multiple table).
    pub fn ring_depth(&self, ptr: RowPtr) -> usize {
        self.table(ptr.table)
            .body
            .get(ptr.set as usize, ptr.way as usize)
            .succ
            .len()
    }

    /// Predicts the successor row of `ptr` from its ring.
    pub fn successor_of(&self, ptr: RowPtr) -> Option<RowPtr> {
        let table = self.table(ptr.table);
        if !table.body.is_valid(ptr.set as usize, ptr.way as usize) {
            return None;
        }
        table
            .body
            .get(ptr.set as usize, ptr.way as usize)
            .succ
            .predict()
    }
}

impl std::fmt::Debug for ManaTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManaTables")
            .field("last_inserted", &self.last_inserted)
            .finish_non_exhaustive()
    }
}
