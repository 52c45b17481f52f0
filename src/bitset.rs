//! Word-packed leaf sets.
//!
//! # Overview
//! A bitset records which leaves of a [`LeafUniverse`](crate::splits::LeafUniverse)
//! belong to one side of a split. Bit `i` stands for the `i`-th leaf name in
//! sorted order.
//!
//! # Example
//! For a universe [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Clade {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Clade {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A set of leaf indices stored in `u64` words.
///
/// All bitsets compared with each other must be created for the same
/// universe, so that they have the same number of words.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates an empty bitset of `words` words.
    ///
    /// # Example
    /// ```
    /// # use rust_tree_reconciliation::bitset::Bitset;
    /// // 100 leaves need 2 words (128 bits)
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Creates an empty bitset large enough for `leaves` leaves.
    pub fn for_leaves(leaves: usize) -> Self {
        Bitset::zeros(leaves.div_ceil(64))
    }

    /// Adds leaf `idx` to the set.
    ///
    /// # Example
    /// ```
    /// # use rust_tree_reconciliation::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.0[idx >> 6] |= 1u64 << (idx & 63);
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|w| w & (1u64 << (idx & 63)) != 0)
    }

    /// Union: `self` becomes `self ∪ other`.
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Intersection: `self` becomes `self ∩ other`.
    #[inline]
    pub fn and_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a &= *b;
        }
    }

    /// Difference `self \ other` as a new bitset.
    ///
    /// # Example
    /// ```
    /// # use rust_tree_reconciliation::bitset::Bitset;
    /// let mut all = Bitset::zeros(1);
    /// (0..4).for_each(|i| all.set(i));
    /// let mut ab = Bitset::zeros(1);
    /// ab.set(0);
    /// ab.set(1);
    /// assert_eq!(all.difference(&ab).0[0], 0b1100);
    /// ```
    pub fn difference(&self, other: &Bitset) -> Bitset {
        Bitset(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| a & !b)
                .collect(),
        )
    }

    /// Whether every leaf of `self` is also in `other`.
    pub fn is_subset(&self, other: &Bitset) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| a & !b == 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Number of leaves in the set.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of the leaves in the set, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, &word)| {
            (0..64).filter(move |bit| word & (1u64 << bit) != 0).map(move |bit| w * 64 + bit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of(bits: &[usize], words: usize) -> Bitset {
        let mut bs = Bitset::zeros(words);
        bits.iter().for_each(|&b| bs.set(b));
        bs
    }

    #[test]
    fn test_set_and_get() {
        let bs = of(&[0, 2], 1);
        assert_eq!(bs.0[0], 0b0101);
        assert!(bs.get(2));
        assert!(!bs.get(1));
        assert!(!bs.get(500));
    }

    #[test]
    fn test_set_operations() {
        let mut ab = of(&[0, 1], 1);
        let bc = of(&[1, 2], 1);
        let all = of(&[0, 1, 2, 3], 1);

        assert!(ab.is_subset(&all));
        assert!(!all.is_subset(&ab));
        assert_eq!(all.difference(&ab), of(&[2, 3], 1));

        let mut union = ab.clone();
        union.or_assign(&bc);
        assert_eq!(union, of(&[0, 1, 2], 1));

        ab.and_assign(&bc);
        assert_eq!(ab, of(&[1], 1));
        ab.and_assign(&of(&[3], 1));
        assert!(ab.is_zero());
    }

    /// A clade is the union of its children's clades.
    ///
    /// ```text
    ///           root
    ///          /    \
    ///        node1   D
    ///        /   \
    ///       A    node2
    ///            /   \
    ///           B     C
    /// ```
    #[test]
    fn test_mini_tree_example() {
        let node2 = of(&[1, 2], 1);
        let mut node1 = of(&[0], 1);
        node1.or_assign(&node2);
        assert_eq!(node1.0[0], 0b0111);
        assert_eq!(node1.count_ones(), 3);
    }

    #[test]
    fn test_large_universe() {
        let bs = of(&[0, 63, 64, 127], 2);
        assert_eq!(bs.count_ones(), 4);
        assert_eq!(bs.0[1], 1u64 | (1u64 << 63));
        assert_eq!(bs.iter_ones().collect::<Vec<_>>(), [0, 63, 64, 127]);
        assert_eq!(Bitset::for_leaves(65).0.len(), 2);
        assert_eq!(Bitset::for_leaves(64).0.len(), 1);
    }
}
