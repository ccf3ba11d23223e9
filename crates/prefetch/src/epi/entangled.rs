//! Entangled Table.
//!
//! Maps a triggering block to up to six "entangled" successor blocks whose
//! prefetch at the trigger would hide their miss latency, plus the size of
//! the basic block the trigger opens. Successors within a row share a
//! compression format: the format dictates how many low bits of each
//! successor are stored, the high bits being reconstructed from the trigger
//! itself. A coarser format stores wider successors but admits fewer of
//! them — a row of format `f` holds at most `f` valid successors.
//!
//! Rows live in a set-associative table with FIFO replacement. Before a row
//! is evicted, its contents are relocated into a confidence-free way of the
//! same set when that preserves strictly more information.

use tracing::debug;

use crate::common::bits::{mask, saturating_dec, saturating_inc};
use crate::tables::AssocTable;
use crate::tables::policies::Replacement;

/// Bit widths selectable by the compression format; format `f` stores the
/// low `FORMAT_SHIFTS[f - 1]` bits of each successor.
pub const FORMAT_SHIFTS: [u32; 7] = [58, 28, 18, 13, 10, 8, 6];

/// Number of formats in use (and maximum successors per row).
pub const NUM_FORMATS: u32 = 6;

/// Width of a confidence counter.
const CONF_BITS: u32 = 2;

/// Saturation value of a confidence counter.
pub const CONF_MAX: u8 = (1 << CONF_BITS) - 1;

/// A successor slot is live once its counter reaches this threshold.
pub const CONF_THRESHOLD: u8 = 1;

/// Combined width of the set index and tag derived from the line hash.
const INDEX_TAG_BITS: u32 = 18;

/// Width of a basic-block size field.
const BB_SIZE_BITS: u32 = 6;

/// One row of the entangled table.
#[derive(Clone)]
pub struct EntangledEntry {
    /// Shared compression format of the successor slots, `1..=6`.
    pub format: u8,
    /// Compressed successor addresses.
    pub addrs: [u64; NUM_FORMATS as usize],
    /// Per-slot saturating confidence counters.
    pub confs: [u8; NUM_FORMATS as usize],
    /// Size of the basic block opened by the trigger.
    pub bb_size: u32,
}

impl Default for EntangledEntry {
    fn default() -> Self {
        Self {
            format: 1,
            addrs: [0; NUM_FORMATS as usize],
            confs: [0; NUM_FORMATS as usize],
            bb_size: 0,
        }
    }
}

impl EntangledEntry {
    fn is_confidence_free(&self) -> bool {
        self.confs.iter().all(|&c| c < CONF_THRESHOLD)
    }
}

/// Hash folding a block address into the table's index+tag domain.
#[inline]
fn line_hash(block: u64) -> u64 {
    (block ^ (block >> 2) ^ (block >> 5)) & mask(INDEX_TAG_BITS)
}

/// Returns the most compressed format able to encode `entangled` relative
/// to `line`.
pub fn format_of(line: u64, entangled: u64) -> u8 {
    for f in (1..=NUM_FORMATS).rev() {
        let shift = FORMAT_SHIFTS[(f - 1) as usize];
        if line >> shift == entangled >> shift {
            return f as u8;
        }
    }
    // Block addresses occupy 58 bits, so format 1 always matches.
    debug_assert!(false, "no format encodes this pair");
    1
}

/// Reconstructs a full successor address from its compressed low bits.
#[inline]
pub fn extend_format(line: u64, compressed: u64, format: u8) -> u64 {
    let shift = FORMAT_SHIFTS[(format - 1) as usize];
    ((line >> shift) << shift) | (compressed & mask(shift))
}

/// Compresses a successor address to the low bits the format retains.
#[inline]
pub fn compress_format(entangled: u64, format: u8) -> u64 {
    entangled & mask(FORMAT_SHIFTS[(format - 1) as usize])
}

/// Aggregate statistics of the entangled table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntangledStats {
    /// Successor-slot evictions forced by format narrowing.
    pub slot_evictions: u64,
    /// Inserts per chosen format.
    pub formats: [u64; NUM_FORMATS as usize],
    /// Largest basic-block size ever recorded.
    pub max_bb_size: u32,
}

/// The entangled table body.
pub struct EntangledTable {
    table: AssocTable<EntangledEntry>,
    stats: EntangledStats,
}

impl EntangledTable {
    /// Creates a table of `sets` × `ways` rows with FIFO replacement.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            table: AssocTable::new(sets, ways, Replacement::Fifo),
            stats: EntangledStats::default(),
        }
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> &EntangledStats {
        &self.stats
    }

    fn row_of(&self, line: u64) -> Option<(usize, usize)> {
        self.table.find(line_hash(line))
    }

    /// Relocates the FIFO victim of `set` into a confidence-free way.
    ///
    /// Only performed when the victim carries more information than the
    /// destination: a destination with no basic-block size is preferred, and
    /// a sized destination is only overwritten when the victim itself still
    /// holds live successors.
    fn relocate_victim(&mut self, set: usize) {
        let victim = self.table.peek_victim(set);
        let victim_free = !self.table.is_valid(set, victim)
            || self.table.get(set, victim).is_confidence_free();
        let victim_bb_size = if self.table.is_valid(set, victim) {
            self.table.get(set, victim).bb_size
        } else {
            0
        };
        if victim_free && victim_bb_size == 0 {
            return;
        }

        let ways = self.table.ways();
        let mut free_way = victim;
        let mut free_with_size = false;
        let mut i = (victim + 1) % ways;
        while i != victim {
            let free = !self.table.is_valid(set, i) || self.table.get(set, i).is_confidence_free();
            if free {
                let sized = self.table.is_valid(set, i) && self.table.get(set, i).bb_size != 0;
                if free_way == victim {
                    free_way = i;
                    free_with_size = sized;
                } else if free_with_size && !sized {
                    free_way = i;
                    free_with_size = false;
                    break;
                }
            }
            i = (i + 1) % ways;
        }

        if free_way != victim && (!free_with_size || !victim_free) {
            let tag = self.table.tag_at(set, victim);
            let entry = self.table.get(set, victim).clone();
            debug!(set, from = victim, to = free_way, "relocating entangled row");
            self.table.write(set, free_way, tag, entry);
        }
    }

    fn find_or_alloc(&mut self, line: u64) -> (usize, usize) {
        if let Some(pos) = self.row_of(line) {
            return pos;
        }
        let key = line_hash(line);
        let (set, _) = self.table.index(key);
        self.relocate_victim(set);
        self.table.insert(key, EntangledEntry::default())
    }

    /// Records the entangled pair `line → entangled`.
    pub fn add_entangled(&mut self, line: u64, entangled: u64) {
        let (set, way) = self.find_or_alloc(line);

        // Refresh an already-known successor.
        let format = self.table.get(set, way).format;
        for k in 0..NUM_FORMATS as usize {
            let entry = self.table.get(set, way);
            if entry.confs[k] >= CONF_THRESHOLD
                && extend_format(line, entry.addrs[k], format) == entangled
            {
                self.table.get_mut(set, way).confs[k] = CONF_MAX;
                return;
            }
        }

        let format_new = format_of(line, entangled);
        self.stats.formats[(format_new - 1) as usize] += 1;

        // Narrow the row format far enough to admit the new successor,
        // evicting the lowest-confidence slot while the count exceeds what
        // the format can hold.
        loop {
            let entry = self.table.get(set, way);
            let mut min_format = format_new;
            let mut num_valid: u32 = 1;
            let mut min_conf = CONF_MAX + 1;
            let mut min_pos = 0;
            for k in 0..NUM_FORMATS as usize {
                if entry.confs[k] >= CONF_THRESHOLD {
                    num_valid += 1;
                    let full = extend_format(line, entry.addrs[k], entry.format);
                    min_format = min_format.min(format_of(line, full));
                    if entry.confs[k] < min_conf {
                        min_conf = entry.confs[k];
                        min_pos = k;
                    }
                }
            }
            if num_valid > min_format as u32 {
                self.stats.slot_evictions += 1;
                self.table.get_mut(set, way).confs[min_pos] = 0;
            } else {
                let old_format = entry.format;
                let recompressed: Vec<(usize, u64)> = (0..NUM_FORMATS as usize)
                    .filter(|&k| entry.confs[k] >= CONF_THRESHOLD)
                    .map(|k| {
                        let full = extend_format(line, entry.addrs[k], old_format);
                        (k, compress_format(full, min_format))
                    })
                    .collect();
                let row = self.table.get_mut(set, way);
                for (k, addr) in recompressed {
                    row.addrs[k] = addr;
                }
                row.format = min_format;
                break;
            }
        }

        let row = self.table.get_mut(set, way);
        let format = row.format;
        for k in 0..NUM_FORMATS as usize {
            if row.confs[k] < CONF_THRESHOLD {
                row.addrs[k] = compress_format(entangled, format);
                row.confs[k] = CONF_MAX;
                return;
            }
        }
    }

    /// Whether `line → entangled` would fit without evicting a successor.
    ///
    /// A missing row counts as available only when `insert_not_present` is
    /// set (the caller is willing to allocate).
    pub fn avail(&self, line: u64, entangled: u64, insert_not_present: bool) -> bool {
        let Some((set, way)) = self.row_of(line) else {
            return insert_not_present;
        };
        let entry = self.table.get(set, way);
        for k in 0..NUM_FORMATS as usize {
            if entry.confs[k] >= CONF_THRESHOLD
                && extend_format(line, entry.addrs[k], entry.format) == entangled
            {
                return true;
            }
        }
        let mut min_format = format_of(line, entangled);
        let mut num_valid: u32 = 1;
        for k in 0..NUM_FORMATS as usize {
            if entry.confs[k] >= CONF_THRESHOLD {
                num_valid += 1;
                let full = extend_format(line, entry.addrs[k], entry.format);
                min_format = min_format.min(format_of(line, full));
            }
        }
        num_valid <= min_format as u32
    }

    /// Records the basic-block size of `line`, keeping the maximum seen.
    pub fn add_bb_size(&mut self, line: u64, bb_size: u32) {
        let (set, way) = self.find_or_alloc(line);
        let row = self.table.get_mut(set, way);
        if bb_size > row.bb_size {
            row.bb_size = bb_size & mask(BB_SIZE_BITS) as u32;
        }
        if bb_size > self.stats.max_bb_size {
            self.stats.max_bb_size = bb_size;
        }
    }

    /// Returns the recorded basic-block size of `line`, or 0.
    pub fn bb_size_of(&self, line: u64) -> u32 {
        self.row_of(line)
            .map_or(0, |(set, way)| self.table.get(set, way).bb_size)
    }

    /// Returns the k-th live successor of `line` and its `(set, way)` source.
    pub fn entangled_at(&self, line: u64, k: usize) -> Option<(u64, (usize, usize))> {
        let (set, way) = self.row_of(line)?;
        let entry = self.table.get(set, way);
        (entry.confs[k] >= CONF_THRESHOLD)
            .then(|| (extend_format(line, entry.addrs[k], entry.format), (set, way)))
    }

    /// Returns the confidence counter of the k-th successor slot of `line`.
    pub fn confidence_at(&self, line: u64, k: usize) -> Option<u8> {
        let (set, way) = self.row_of(line)?;
        Some(self.table.get(set, way).confs[k])
    }

    /// Applies eviction feedback to the row at `(set, way)`.
    ///
    /// Every live slot whose compressed low bits match the observed block
    /// gains confidence when the line was demand-accessed and loses it when
    /// the prefetch went unused.
    pub fn update_confidence(&mut self, set: usize, way: usize, observed: u64, accessed: bool) {
        if way >= self.table.ways() || !self.table.is_valid(set, way) {
            return;
        }
        let row = self.table.get_mut(set, way);
        let format = row.format;
        for k in 0..NUM_FORMATS as usize {
            if row.confs[k] >= CONF_THRESHOLD
                && compress_format(row.addrs[k], format) == compress_format(observed, format)
            {
                if accessed {
                    saturating_inc(&mut row.confs[k], CONF_MAX);
                } else {
                    saturating_dec(&mut row.confs[k]);
                }
            }
        }
    }
}

impl std::fmt::Debug for EntangledTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntangledTable")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
