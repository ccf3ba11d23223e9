//! Generic Set-Associative Table.
//!
//! Every table body in the crate (entangled table, HOBPT, MANA rows, shadow
//! cache) is an instance of [`AssocTable`] so that set indexing, tag
//! derivation, and replacement live in exactly one place. The entry type is
//! generic; tables whose effective tag is reconstructed from compressed
//! storage match with [`AssocTable::find_by`] instead of the stored tag.
//!
//! Indexing follows the usual power-of-two scheme: `set = key & set_mask`,
//! `tag = key >> log2(sets)`. Callers that fold or hash their keys do so
//! before presenting them here.

use super::policies::{self, Replacement, ReplacementPolicy};

/// One slot of a set-associative table.
#[derive(Clone, Default)]
struct Slot<E> {
    valid: bool,
    tag: u64,
    entry: E,
}

/// A set-associative table with a pluggable replacement policy.
pub struct AssocTable<E> {
    slots: Vec<Slot<E>>,
    sets: usize,
    ways: usize,
    set_bits: u32,
    policy: Box<dyn ReplacementPolicy>,
}

impl<E: Default + Clone> AssocTable<E> {
    /// Creates a table of `sets` × `ways` slots using the given replacement.
    ///
    /// # Panics
    ///
    /// Panics if `sets` is not a power of two or `ways` is zero; table
    /// geometry is validated by the configuration layer before construction.
    pub fn new(sets: usize, ways: usize, replacement: Replacement) -> Self {
        assert!(sets.is_power_of_two(), "set count must be a power of two");
        assert!(ways > 0, "table must have at least one way");
        Self {
            slots: vec![Slot::default(); sets * ways],
            sets,
            ways,
            set_bits: sets.trailing_zeros(),
            policy: policies::build(replacement, sets, ways),
        }
    }

    /// Number of sets.
    #[inline]
    pub fn sets(&self) -> usize {
        self.sets
    }

    /// Number of ways per set.
    #[inline]
    pub fn ways(&self) -> usize {
        self.ways
    }

    /// Number of index bits (`log2(sets)`).
    #[inline]
    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    /// Splits a key into its `(set, tag)` pair.
    #[inline]
    pub fn index(&self, key: u64) -> (usize, u64) {
        ((key as usize) & (self.sets - 1), key >> self.set_bits)
    }

    #[inline]
    fn slot(&self, set: usize, way: usize) -> &Slot<E> {
        &self.slots[set * self.ways + way]
    }

    #[inline]
    fn slot_mut(&mut self, set: usize, way: usize) -> &mut Slot<E> {
        &mut self.slots[set * self.ways + way]
    }

    /// Finds the way holding `key`, without updating replacement state.
    pub fn find(&self, key: u64) -> Option<(usize, usize)> {
        let (set, tag) = self.index(key);
        (0..self.ways)
            .find(|&way| {
                let slot = self.slot(set, way);
                slot.valid && slot.tag == tag
            })
            .map(|way| (set, way))
    }

    /// Finds a valid way of `set` whose entry satisfies `pred`.
    ///
    /// Used by tables that reconstruct their tags from compressed storage
    /// and therefore cannot match on the stored tag field.
    pub fn find_by(&self, set: usize, mut pred: impl FnMut(&E) -> bool) -> Option<usize> {
        (0..self.ways).find(|&way| {
            let slot = self.slot(set, way);
            slot.valid && pred(&slot.entry)
        })
    }

    /// Promotes a way in the replacement order (MRU under LRU).
    pub fn touch(&mut self, set: usize, way: usize) {
        self.policy.update(set, way);
    }

    /// Returns the way the policy would evict next, without filling it.
    pub fn peek_victim(&mut self, set: usize) -> usize {
        self.policy.victim(set)
    }

    /// Inserts `entry` under `key`, evicting per the replacement policy.
    ///
    /// Returns the `(set, way)` that was filled.
    pub fn insert(&mut self, key: u64, entry: E) -> (usize, usize) {
        let (set, tag) = self.index(key);
        let way = self.policy.victim(set);
        *self.slot_mut(set, way) = Slot {
            valid: true,
            tag,
            entry,
        };
        self.policy.update(set, way);
        (set, way)
    }

    /// Writes a slot directly without consulting the replacement policy.
    ///
    /// Used for caller-directed placement such as relocating an about-to-be
    /// evicted row into a free way of the same set.
    pub fn write(&mut self, set: usize, way: usize, tag: u64, entry: E) {
        *self.slot_mut(set, way) = Slot {
            valid: true,
            tag,
            entry,
        };
    }

    /// Invalidates a slot, resetting its entry.
    pub fn invalidate(&mut self, set: usize, way: usize) {
        *self.slot_mut(set, way) = Slot::default();
    }

    /// Whether a slot currently holds a valid entry.
    #[inline]
    pub fn is_valid(&self, set: usize, way: usize) -> bool {
        self.slot(set, way).valid
    }

    /// The stored tag of a slot (meaningful only while valid).
    #[inline]
    pub fn tag_at(&self, set: usize, way: usize) -> u64 {
        self.slot(set, way).tag
    }

    /// Shared access to a slot's entry.
    #[inline]
    pub fn get(&self, set: usize, way: usize) -> &E {
        &self.slot(set, way).entry
    }

    /// Exclusive access to a slot's entry.
    #[inline]
    pub fn get_mut(&mut self, set: usize, way: usize) -> &mut E {
        &mut self.slot_mut(set, way).entry
    }

    /// Iterates the valid `(way, entry)` pairs of a set.
    pub fn iter_set(&self, set: usize) -> impl Iterator<Item = (usize, &E)> {
        (0..self.ways).filter_map(move |way| {
            let slot = self.slot(set, way);
            slot.valid.then_some((way, &slot.entry))
        })
    }
}

impl<E> std::fmt::Debug for AssocTable<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssocTable")
            .field("sets", &self.sets)
            .field("ways", &self.ways)
            .finish_non_exhaustive()
    }
}
