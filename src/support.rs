//! Clade support from sample trees, and transfer of support between trees.
//!
//! Both operations compare trees through their canonical splits (see
//! [`crate::splits`]), so they only depend on which leaves sit on either side
//! of a branch, never on node ids, names of internal nodes or leaf order.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::annotation::Confidence;
use crate::bitset::Bitset;
use crate::error::TreeError;
use crate::node::NodeId;
use crate::splits::{canonical, clade_bitsets, LeafUniverse, SplitSet};
use crate::tree::Tree;

/// Confidence kind written by [`count_support`].
pub const BOOTSTRAP: &str = "bootstrap";

/// Canonical split of every internal non-root node, in preorder.
fn internal_splits(tree: &Tree, universe: &LeafUniverse) -> Result<Vec<(NodeId, Bitset)>, TreeError> {
    let root = tree.root()?;
    let clades = clade_bitsets(tree, universe);
    let present = clades[root].clone().unwrap_or_else(|| universe.empty_set());
    Ok(tree
        .iter_preorder()
        .filter(|&n| n != root && tree[n].is_internal())
        .filter_map(|n| clades[n].as_ref().map(|bits| (n, canonical(bits, &present))))
        .collect())
}

/// Checks that `tree` has exactly the leaves of `universe`.
fn check_same_leaves(tree: &Tree, universe: &LeafUniverse) -> Result<(), TreeError> {
    if LeafUniverse::from_tree(tree)? != *universe {
        return Err(TreeError::DifferentLeafSets);
    }
    Ok(())
}

/// Counts, for every internal non-root node of `reference`, the sample trees
/// that contain the same split, and stores the count as a `bootstrap`
/// confidence on the node (replacing an earlier one).
///
/// Every sample must have the leaf names of the reference. Samples are
/// summarized in parallel. Returns the counts per node in preorder.
///
/// # Example
/// ```
/// use rust_tree_reconciliation::io::{tree_from_newick, ReadOptions};
/// use rust_tree_reconciliation::support::count_support;
///
/// let options = ReadOptions::default();
/// let mut reference = tree_from_newick("((A,B)ab,(C,D));", &options).unwrap();
/// let samples = vec![
///     tree_from_newick("((B,A),(D,C));", &options).unwrap(),
///     tree_from_newick("((A,C),(B,D));", &options).unwrap(),
/// ];
/// let counts = count_support(&mut reference, &samples).unwrap();
/// let ab = reference.find_by_name("ab").unwrap();
/// assert!(counts.contains(&(ab, 1)));
/// ```
pub fn count_support(reference: &mut Tree, samples: &[Tree]) -> Result<Vec<(NodeId, usize)>, TreeError> {
    let universe = LeafUniverse::from_tree(reference)?;
    let splits = internal_splits(reference, &universe)?;

    let snapshots: Vec<SplitSet> = samples
        .par_iter()
        .map(|sample| {
            check_same_leaves(sample, &universe)?;
            SplitSet::from_tree(sample, &universe)
        })
        .collect::<Result<_, _>>()?;

    let counts: Vec<(NodeId, usize)> = splits
        .par_iter()
        .map(|(node, bits)| (*node, snapshots.iter().filter(|s| s.contains(bits)).count()))
        .collect();
    for &(node, count) in &counts {
        reference[node].set_confidence(Confidence::new(count as f64, BOOTSTRAP));
    }
    debug!(
        splits = counts.len(),
        samples = samples.len(),
        "Counted split support"
    );
    Ok(counts)
}

/// Copies the confidences of every internal non-root node of `source` onto
/// the node of `target` that induces the same split. Confidences of the
/// same kind already on the target node are replaced.
///
/// Returns the number of target nodes that received confidences.
pub fn transfer_support(source: &Tree, target: &mut Tree) -> Result<usize, TreeError> {
    let universe = LeafUniverse::from_tree(source)?;
    check_same_leaves(target, &universe)?;

    let mut by_split: HashMap<Bitset, Vec<Confidence>> = HashMap::new();
    for (node, bits) in internal_splits(source, &universe)? {
        let confidences: Vec<Confidence> = source[node].confidences().cloned().collect();
        if !confidences.is_empty() {
            by_split.entry(bits).or_insert(confidences);
        }
    }

    let mut updated = 0;
    for (node, bits) in internal_splits(target, &universe)? {
        if let Some(confidences) = by_split.get(&bits) {
            for confidence in confidences {
                target[node].set_confidence(confidence.clone());
            }
            updated += 1;
        }
    }
    debug!(updated, "Transferred support");
    Ok(updated)
}
