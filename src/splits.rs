//! Bipartitions (splits) of trees over a shared leaf universe.
//!
//! # Overview
//! Removing the branch above an internal node divides the leaves into the
//! clade below the node and everything else. A split is stored as a
//! [`Bitset`] over a [`LeafUniverse`]; the two sides of a split describe the
//! same bipartition.
//!
//! # Why leaf names and not node ids
//! Node ids depend on how a tree was built and differ between trees with the
//! same taxa. Leaf names do not, so the universe sorts names alphabetically
//! and identical taxa always land on the same bit, whatever the leaf order
//! of the individual trees.
//!
//! # Canonical form
//! To compare splits between trees, each split is reduced to the side that
//! does not hold the lowest present leaf: {A,B}|{C,D} is stored as {C,D}
//! from both directions.

use std::collections::{HashMap, HashSet};

use crate::bitset::Bitset;
use crate::error::TreeError;
use crate::node::NodeId;
use crate::tree::Tree;

/// Sorted, deduplicated leaf names, each mapped to a bit position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafUniverse {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl LeafUniverse {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        LeafUniverse { names, index }
    }

    /// Universe of the leaves of `tree`, which must be named and unique.
    pub fn from_tree(tree: &Tree) -> Result<Self, TreeError> {
        check_leaf_names(tree)?;
        Ok(LeafUniverse::new(tree.external_names()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn empty_set(&self) -> Bitset {
        Bitset::for_leaves(self.len())
    }

    /// Bitset of the given names; the flag tells whether all of them were
    /// part of the universe.
    pub fn bitset_of<'a, I>(&self, names: I) -> (Bitset, bool)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bits = self.empty_set();
        let mut all_known = true;
        for name in names {
            match self.index_of(name) {
                Some(i) => bits.set(i),
                None => all_known = false,
            }
        }
        (bits, all_known)
    }
}

/// Leaves must be named, and no name may occur twice.
pub(crate) fn check_leaf_names(tree: &Tree) -> Result<(), TreeError> {
    let mut seen = HashSet::new();
    for name in tree.external_names() {
        if name.is_empty() {
            return Err(TreeError::UnnamedLeaves);
        }
        if !seen.insert(name) {
            return Err(TreeError::DuplicateLeafNames(name.to_string()));
        }
    }
    Ok(())
}

/// For every live node, the universe leaves in its subtree. Leaves outside
/// the universe contribute nothing.
pub(crate) fn clade_bitsets(tree: &Tree, universe: &LeafUniverse) -> Vec<Option<Bitset>> {
    let mut clades: Vec<Option<Bitset>> = vec![None; tree.nodes.len()];
    for node in tree.iter_postorder() {
        let mut bits = universe.empty_set();
        match tree[node].children() {
            [] => {
                if let Some(i) = universe.index_of(&tree[node].name) {
                    bits.set(i);
                }
            }
            children => {
                for &child in children {
                    if let Some(child_bits) = &clades[child] {
                        bits.or_assign(child_bits);
                    }
                }
            }
        }
        clades[node] = Some(bits);
    }
    clades
}

/// The side of the split `below | present \ below` without the lowest
/// present leaf.
pub fn canonical(below: &Bitset, present: &Bitset) -> Bitset {
    match present.iter_ones().next() {
        Some(first) if below.get(first) => present.difference(below),
        _ => below.clone(),
    }
}

/// Splits of a reference tree, one per internal non-root node.
#[derive(Debug, Clone)]
pub struct SplitTable<'u> {
    universe: &'u LeafUniverse,
    // universe leaves that occur in the reference tree
    present: Bitset,
    // (node, universe leaves below it)
    splits: Vec<(NodeId, Bitset)>,
}

impl<'u> SplitTable<'u> {
    pub fn new(reference: &Tree, universe: &'u LeafUniverse) -> Result<Self, TreeError> {
        let root = reference.root()?;
        check_leaf_names(reference)?;
        let mut clades = clade_bitsets(reference, universe);
        let present = clades[root].take().unwrap_or_else(|| universe.empty_set());

        let splits = reference
            .iter_preorder()
            .filter(|&n| n != root && reference[n].is_internal())
            .filter_map(|n| clades[n].take().map(|bits| (n, bits)))
            // a side without any universe leaf does not split anything
            .filter(|(_, bits)| !bits.is_zero() && *bits != present)
            .collect();
        Ok(SplitTable {
            universe,
            present,
            splits,
        })
    }

    pub fn universe(&self) -> &LeafUniverse {
        self.universe
    }

    pub fn present(&self) -> &Bitset {
        &self.present
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Nodes with the leaves below them.
    pub fn splits(&self) -> impl Iterator<Item = (NodeId, &Bitset)> {
        self.splits.iter().map(|(n, bits)| (*n, bits))
    }

    /// First reference node whose split has `names` as one full side.
    ///
    /// The query is restricted to the leaves present in the reference tree.
    /// In strict mode, the query must not name leaves outside the universe
    /// and every universe leaf must occur in the reference tree.
    pub fn matching_node<'a, I>(&self, names: I, strict: bool) -> Option<NodeId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (mut query, all_known) = self.universe.bitset_of(names);
        if strict && (!all_known || self.present.count_ones() != self.universe.len()) {
            return None;
        }
        query.and_assign(&self.present);
        if query.is_zero() {
            return None;
        }
        let other_side = self.present.difference(&query);
        self.splits
            .iter()
            .find(|(_, below)| *below == query || *below == other_side)
            .map(|(n, _)| *n)
    }

    /// Whether `names` is one full side of a reference split.
    pub fn match_leaf_set<'a, I>(&self, names: I, strict: bool) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.matching_node(names, strict).is_some()
    }
}

/// The canonical splits of a whole tree, including the trivial splits of
/// single leaves, for fast membership tests.
#[derive(Debug, Clone)]
pub struct SplitSet {
    present: Bitset,
    splits: HashSet<Bitset>,
}

impl SplitSet {
    pub fn from_tree(tree: &Tree, universe: &LeafUniverse) -> Result<Self, TreeError> {
        let root = tree.root()?;
        let mut clades = clade_bitsets(tree, universe);
        let present = clades[root].take().unwrap_or_else(|| universe.empty_set());
        let splits = tree
            .iter_preorder()
            .filter(|&n| n != root)
            .filter_map(|n| clades[n].as_ref().map(|bits| canonical(bits, &present)))
            .collect();
        Ok(SplitSet { present, splits })
    }

    pub fn present(&self) -> &Bitset {
        &self.present
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Whether the split with `below` on one side is in the set.
    pub fn contains(&self, below: &Bitset) -> bool {
        self.splits.contains(&canonical(below, &self.present))
    }
}
