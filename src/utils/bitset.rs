//! Dense bit set over small integer indices.
//!
//! Every set-valued fact in this crate (reaching definitions, live variables, dominator
//! sets, loop bodies during construction) is keyed by a dense index assigned by the
//! control-flow graph builder, so a word-packed bit vector is the natural representation.
//!
//! Unlike a fixed-size bit vector, [`BitSet`] treats indices beyond its current length as
//! absent rather than as a programming error: `contains` answers `false`, `insert` grows the
//! set, and binary operations accept operands of different lengths. Equality ignores the
//! length and compares only the members, so two sets built against differently sized
//! universes still compare equal when they hold the same indices.
//!
//! # Example
//!
//! ```rust
//! use flowscope::utils::BitSet;
//!
//! let mut defs = BitSet::new(100);
//! defs.insert(3);
//! defs.insert(64);
//!
//! assert!(defs.contains(64));
//! assert!(!defs.contains(1_000));
//! assert_eq!(defs.iter().collect::<Vec<_>>(), vec![3, 64]);
//! ```

use std::fmt;

const WORD_BITS: usize = 64;

/// A growable bit vector with set semantics.
#[derive(Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates an empty set able to hold indices `0..capacity` without growing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        BitSet {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: capacity,
        }
    }

    /// Creates a set containing every index in `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Creates a set of the given capacity holding exactly `indices`.
    #[must_use]
    pub fn from_indices(capacity: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// Number of addressable indices. This is not the number of members; see [`count`](Self::count).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Returns `true` if no index is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index`, growing the set if needed. Returns `true` if it was not present.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.len {
            self.grow(index + 1);
        }
        let (word, mask) = Self::locate(index);
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    /// Removes `index`. Returns `true` if it was present.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        let present = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        present
    }

    /// Returns `true` if `index` is a member. Out-of-range indices are never members.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Number of members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every member, keeping the capacity.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Sets every index in `0..capacity`.
    pub fn fill(&mut self) {
        self.words.iter_mut().for_each(|w| *w = u64::MAX);
        self.trim_tail();
    }

    /// In-place union. Returns `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.len > self.len {
            self.grow(other.len);
        }
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *mine | theirs;
            changed |= merged != *mine;
            *mine = merged;
        }
        changed
    }

    /// In-place intersection. Returns `true` if `self` changed.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (i, mine) in self.words.iter_mut().enumerate() {
            let theirs = other.words.get(i).copied().unwrap_or(0);
            let kept = *mine & theirs;
            changed |= kept != *mine;
            *mine = kept;
        }
        changed
    }

    /// In-place difference (`self - other`). Returns `true` if `self` changed.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let kept = *mine & !theirs;
            changed |= kept != *mine;
            *mine = kept;
        }
        changed
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let theirs = other.words.get(i).copied().unwrap_or(0);
            w & !theirs == 0
        })
    }

    /// Returns `true` if `self` is a subset of `other` and the two differ.
    #[must_use]
    pub fn is_strict_subset(&self, other: &Self) -> bool {
        self.is_subset(other) && self != other
    }

    /// Iterates over the members in ascending order.
    #[must_use]
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn locate(index: usize) -> (usize, u64) {
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    fn grow(&mut self, capacity: usize) {
        self.len = capacity;
        self.words.resize(capacity.div_ceil(WORD_BITS), 0);
    }

    fn trim_tail(&mut self) {
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let longest = self.words.len().max(other.words.len());
        (0..longest).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for BitSet {}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(0, iter)
    }
}

impl<'a> IntoIterator for &'a BitSet {
    type Item = usize;
    type IntoIter = BitSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the members of a [`BitSet`], in ascending order.
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_index += 1;
            self.current = *self.words.get(self.word_index)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.word_index * WORD_BITS + bit)
    }
}
