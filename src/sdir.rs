//! Reconciliation of unrooted gene trees.
//!
//! Every branch of the gene tree is a candidate position for the root. Each
//! candidate is evaluated on its own copy of the gene tree: the copy is rooted
//! on the middle of the branch and reconciled with [`Sdi`]. Candidates are
//! evaluated in parallel and folded into an [`SdirResult`] by an associative,
//! commutative merge, so the outcome does not depend on evaluation order.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::ReconciliationError;
use crate::mutation::RerootTarget;
use crate::node::NodeId;
use crate::sdi::Sdi;
use crate::tree::Tree;

/// What makes a rooting optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criterion {
    /// Fewest duplications
    #[default]
    Duplications,
    /// Lowest mapping cost L
    MappingCost,
}

/// Settings for [`Sdir`].
#[derive(Debug, Clone, PartialEq)]
pub struct SdirOptions {
    pub criterion: Criterion,
    /// Break ties by tree height, then by root height difference
    pub minimize_height: bool,
    /// Also compute mapping costs when the criterion does not need them
    pub compute_mapping_cost: bool,
    /// Evaluate at most this many candidate rootings
    pub max_rootings: Option<usize>,
    /// Keep at most this many optimal reconciled trees
    pub max_trees_to_return: usize,
}

impl Default for SdirOptions {
    fn default() -> Self {
        SdirOptions {
            criterion: Criterion::Duplications,
            minimize_height: false,
            compute_mapping_cost: false,
            max_rootings: None,
            max_trees_to_return: 1,
        }
    }
}

impl SdirOptions {
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_minimize_height(mut self, minimize_height: bool) -> Self {
        self.minimize_height = minimize_height;
        self
    }

    pub fn with_mapping_cost(mut self, compute_mapping_cost: bool) -> Self {
        self.compute_mapping_cost = compute_mapping_cost;
        self
    }

    pub fn with_max_rootings(mut self, max_rootings: Option<usize>) -> Self {
        self.max_rootings = max_rootings;
        self
    }

    pub fn with_max_trees_to_return(mut self, max_trees_to_return: usize) -> Self {
        self.max_trees_to_return = max_trees_to_return;
        self
    }

    fn needs_mapping_cost(&self) -> bool {
        self.compute_mapping_cost || self.criterion == Criterion::MappingCost
    }
}

/// One evaluated rooting.
#[derive(Debug, Clone)]
pub struct Rooting {
    /// Position of the candidate in postorder over the candidate branches
    pub candidate: usize,
    /// Input tree node whose parent branch carries the root
    pub branch: NodeId,
    pub duplications: usize,
    pub mapping_cost: Option<usize>,
    pub height: f64,
    /// Absolute difference between the heights of the two root subtrees,
    /// each measured including its root branch
    pub height_difference: f64,
    /// The rooted, reconciled copy of the gene tree
    pub tree: Tree,
}

/// Summary over all evaluated rootings.
///
/// The minima are taken independently of each other, so they need not be
/// reached by the same rooting.
#[derive(Debug, Clone)]
pub struct SdirResult {
    pub candidate_rootings: usize,
    pub rootings_evaluated: usize,
    /// Fewer than all candidates were evaluated
    pub partial: bool,
    pub min_duplications: Option<usize>,
    pub min_mapping_cost: Option<usize>,
    pub min_height: Option<f64>,
    pub min_height_difference: Option<f64>,
    /// Number of rootings that are optimal under the chosen criterion
    pub optimal_rootings: usize,
    /// Optimal rootings with the lowest candidate positions, at most
    /// `max_trees_to_return` of them
    pub optimal: Vec<Rooting>,
    /// Duplications of each evaluated rooting, by candidate position
    pub duplications_per_rooting: Vec<usize>,
}

/// Unrooted reconciliation driver.
#[derive(Debug, Clone, Default)]
pub struct Sdir {
    options: SdirOptions,
}

impl Sdir {
    pub fn new(options: SdirOptions) -> Self {
        Sdir { options }
    }

    pub fn options(&self) -> &SdirOptions {
        &self.options
    }

    /// Evaluates the candidate rootings of `gene_tree` against the species
    /// tree of `sdi`. The input tree is not modified.
    pub fn infer(&self, gene_tree: &Tree, sdi: &Sdi<'_>) -> Result<SdirResult, ReconciliationError> {
        check_gene_tree(gene_tree)?;
        sdi.link_leaves(gene_tree)?;

        let candidates = candidate_branches(gene_tree)?;
        let candidate_rootings = candidates.len();
        let limit = self
            .options
            .max_rootings
            .map_or(candidate_rootings, |max| max.min(candidate_rootings));
        let partial = limit < candidate_rootings;
        if partial {
            warn!(
                evaluated = limit,
                candidates = candidate_rootings,
                "Rooting cap reached, results cover a subset of rootings"
            );
        }

        let options = &self.options;
        let aggregate = candidates[..limit]
            .par_iter()
            .enumerate()
            .map(|(candidate, &branch)| evaluate(gene_tree, sdi, options, candidate, branch))
            .try_fold(Aggregate::default, |acc, rooting| {
                Ok::<_, ReconciliationError>(acc.merge(Aggregate::single(rooting?, options), options))
            })
            .try_reduce(Aggregate::default, |a, b| Ok(a.merge(b, options)))?;

        let mut duplications = aggregate.duplications;
        duplications.sort_unstable();
        let result = SdirResult {
            candidate_rootings,
            rootings_evaluated: aggregate.evaluated,
            partial,
            min_duplications: aggregate.min_duplications,
            min_mapping_cost: aggregate.min_mapping_cost,
            min_height: aggregate.min_height,
            min_height_difference: aggregate.min_height_difference,
            optimal_rootings: aggregate.optimal_count,
            optimal: aggregate.optimal,
            duplications_per_rooting: duplications.into_iter().map(|(_, d)| d).collect(),
        };
        info!(
            rootings = result.rootings_evaluated,
            min_duplications = ?result.min_duplications,
            optimal = result.optimal_rootings,
            "Unrooted reconciliation done"
        );
        Ok(result)
    }
}

/// Every rooting must come out completely binary: a root with two or three
/// children and bifurcations everywhere else.
fn check_gene_tree(gene_tree: &Tree) -> Result<(), ReconciliationError> {
    let root = gene_tree.root()?;
    let leaves = gene_tree.number_of_external_nodes();
    if leaves < 2 {
        return Err(ReconciliationError::TooFewExternalNodes(leaves));
    }
    let resolvable = gene_tree.iter_preorder().all(|n| {
        let children = gene_tree[n].children().len();
        match n == root {
            true => children == 2 || children == 3,
            false => children == 0 || children == 2,
        }
    });
    if !resolvable {
        return Err(ReconciliationError::NotResolvable);
    }
    Ok(())
}

/// Non-root nodes in postorder; of the two children of a bifurcating root
/// only the first is kept, both name the same branch.
fn candidate_branches(gene_tree: &Tree) -> Result<Vec<NodeId>, ReconciliationError> {
    let root = gene_tree.root()?;
    let root_children = gene_tree[root].children();
    let same_branch = (root_children.len() == 2).then(|| root_children[1]);
    Ok(gene_tree
        .iter_postorder()
        .filter(|&n| n != root && Some(n) != same_branch)
        .collect())
}

fn evaluate(
    gene_tree: &Tree,
    sdi: &Sdi<'_>,
    options: &SdirOptions,
    candidate: usize,
    branch: NodeId,
) -> Result<Rooting, ReconciliationError> {
    let mut tree = gene_tree.copy();
    tree.reroot(RerootTarget::Branch {
        node: branch,
        distance_from_node: None,
    })?;
    let reconciliation = sdi.reconcile(&mut tree)?;
    let mapping_cost = match options.needs_mapping_cost() {
        true => Some(sdi.mapping_cost(&tree, &reconciliation)?),
        false => None,
    };

    let root = tree.root()?;
    let mut sides = [0.0; 2];
    for (side, &child) in sides.iter_mut().zip(tree[root].children()) {
        *side = tree[child].branch_length_or_zero() + tree.subtree_height(child)?;
    }
    let height_difference = (sides[0] - sides[1]).abs();
    debug!(
        candidate,
        branch,
        duplications = reconciliation.duplications,
        "Evaluated rooting"
    );

    Ok(Rooting {
        candidate,
        branch,
        duplications: reconciliation.duplications,
        mapping_cost,
        height: tree.height(),
        height_difference,
        tree,
    })
}

fn min_option<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}

/// What a rooting is ranked by, lower is better.
#[derive(Debug, Clone, Copy)]
struct Key {
    primary: usize,
    height: f64,
    height_difference: f64,
}

impl Key {
    fn of(rooting: &Rooting, options: &SdirOptions) -> Self {
        let primary = match options.criterion {
            Criterion::Duplications => rooting.duplications,
            Criterion::MappingCost => rooting.mapping_cost.unwrap_or(usize::MAX),
        };
        Key {
            primary,
            height: rooting.height,
            height_difference: rooting.height_difference,
        }
    }

    fn compare(&self, other: &Key, options: &SdirOptions) -> Ordering {
        let primary = self.primary.cmp(&other.primary);
        if !options.minimize_height {
            return primary;
        }
        primary
            .then(compare_heights(self.height, other.height))
            .then(compare_heights(self.height_difference, other.height_difference))
    }
}

/// Relative tolerance under which two heights count as equal.
const HEIGHT_TOLERANCE: f64 = 1e-9;

/// Orders heights, treating values that differ only by rounding as equal.
fn compare_heights(a: f64, b: f64) -> Ordering {
    let scale = a.abs().max(b.abs()).max(1.0);
    if (a - b).abs() <= HEIGHT_TOLERANCE * scale {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Partial result over a set of evaluated rootings.
#[derive(Debug, Default)]
struct Aggregate {
    evaluated: usize,
    min_duplications: Option<usize>,
    min_mapping_cost: Option<usize>,
    min_height: Option<f64>,
    min_height_difference: Option<f64>,
    best: Option<Key>,
    optimal_count: usize,
    // sorted by candidate, truncated to max_trees_to_return
    optimal: Vec<Rooting>,
    // (candidate, duplications)
    duplications: Vec<(usize, usize)>,
}

impl Aggregate {
    fn single(rooting: Rooting, options: &SdirOptions) -> Self {
        let mut aggregate = Aggregate {
            evaluated: 1,
            min_duplications: Some(rooting.duplications),
            min_mapping_cost: rooting.mapping_cost,
            min_height: Some(rooting.height),
            min_height_difference: Some(rooting.height_difference),
            best: Some(Key::of(&rooting, options)),
            optimal_count: 1,
            optimal: Vec::new(),
            duplications: vec![(rooting.candidate, rooting.duplications)],
        };
        if options.max_trees_to_return > 0 {
            aggregate.optimal.push(rooting);
        }
        aggregate
    }

    fn merge(mut self, mut other: Aggregate, options: &SdirOptions) -> Self {
        self.evaluated += other.evaluated;
        self.min_duplications = min_option(self.min_duplications, other.min_duplications);
        self.min_mapping_cost = min_option(self.min_mapping_cost, other.min_mapping_cost);
        self.min_height = min_option(self.min_height, other.min_height);
        self.min_height_difference =
            min_option(self.min_height_difference, other.min_height_difference);
        self.duplications.append(&mut other.duplications);

        let order = match (&self.best, &other.best) {
            (Some(a), Some(b)) => a.compare(b, options),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        match order {
            Ordering::Less => {}
            Ordering::Greater => {
                self.best = other.best;
                self.optimal_count = other.optimal_count;
                self.optimal = other.optimal;
            }
            Ordering::Equal => {
                self.optimal_count += other.optimal_count;
                self.optimal.append(&mut other.optimal);
                self.optimal.sort_by_key(|r| r.candidate);
                self.optimal.truncate(options.max_trees_to_return);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{gene_tree, species_tree};

    const SPECIES: &str = "((((A,B)ab,C)abc,D)abcd,(E,F)ef)r;";

    #[test]
    fn test_finds_congruent_rooting() {
        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        let gene = gene_tree("((A,B),C,D);");
        let result = Sdir::default().infer(&gene, &sdi).unwrap();

        assert_eq!(result.candidate_rootings, 5);
        assert_eq!(result.rootings_evaluated, 5);
        assert!(!result.partial);
        assert_eq!(result.duplications_per_rooting, [2, 2, 1, 1, 0]);
        assert_eq!(result.min_duplications, Some(0));
        assert_eq!(result.min_mapping_cost, None);
        assert_eq!(result.optimal_rootings, 1);
        assert_eq!(result.optimal.len(), 1);

        let best = &result.optimal[0];
        assert_eq!(best.candidate, 4);
        assert!(best.tree.is_rooted());
        assert!(best.tree.is_valid());
        let root = best.tree.root().unwrap();
        assert!(best
            .tree
            .children(root)
            .unwrap()
            .iter()
            .any(|&c| best.tree[c].name == "D"));
        // the input tree is left alone
        assert_eq!(gene.children(gene.root().unwrap()).unwrap().len(), 3);
        assert!(gene.iter_preorder().all(|n| gene[n].event().is_none()));
    }

    #[test]
    fn test_mapping_cost_criterion() {
        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        let gene = gene_tree("((A,B),C,D);");
        let options = SdirOptions::default().with_criterion(Criterion::MappingCost);
        let result = Sdir::new(options).infer(&gene, &sdi).unwrap();
        assert_eq!(result.min_mapping_cost, Some(0));
        assert_eq!(result.optimal_rootings, 1);
        assert_eq!(result.optimal[0].mapping_cost, Some(0));
        assert_eq!(result.optimal[0].duplications, 0);
    }

    #[test]
    fn test_ties_and_height() {
        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        // every rooting of three paralogs has two duplications
        let gene = gene_tree("(a1_A:1,a2_A:1,a3_A:4);");

        let options = SdirOptions::default().with_max_trees_to_return(2);
        let result = Sdir::new(options.clone()).infer(&gene, &sdi).unwrap();
        assert_eq!(result.min_duplications, Some(2));
        assert_eq!(result.optimal_rootings, 3);
        let kept: Vec<_> = result.optimal.iter().map(|r| r.candidate).collect();
        assert_eq!(kept, [0, 1]);
        assert_eq!(result.min_height, Some(3.0));
        assert_eq!(result.min_height_difference, Some(1.0));

        let result = Sdir::new(options.with_minimize_height(true))
            .infer(&gene, &sdi)
            .unwrap();
        assert_eq!(result.optimal_rootings, 1);
        assert_eq!(result.optimal[0].candidate, 2);
        assert_eq!(result.optimal[0].height, 3.0);
        assert_eq!(result.optimal[0].height_difference, 1.0);
    }

    fn rooting(candidate: usize, height: f64) -> Rooting {
        Rooting {
            candidate,
            branch: candidate,
            duplications: 1,
            mapping_cost: None,
            height,
            height_difference: 0.0,
            tree: Tree::new(),
        }
    }

    #[test]
    fn test_heights_equal_up_to_rounding_tie() {
        let options = SdirOptions::default()
            .with_minimize_height(true)
            .with_max_trees_to_return(3);
        assert_ne!(0.1 + 0.2, 0.3);
        assert_eq!(compare_heights(0.1 + 0.2, 0.3), Ordering::Equal);
        assert_eq!(compare_heights(0.3, 0.31), Ordering::Less);

        let merged = Aggregate::single(rooting(1, 0.3), &options)
            .merge(Aggregate::single(rooting(0, 0.1 + 0.2), &options), &options)
            .merge(Aggregate::single(rooting(2, 0.31), &options), &options);
        assert_eq!(merged.optimal_count, 2);
        let kept: Vec<_> = merged.optimal.iter().map(|r| r.candidate).collect();
        assert_eq!(kept, [0, 1]);

        // the evaluation order does not matter
        let reversed = Aggregate::single(rooting(2, 0.31), &options)
            .merge(Aggregate::single(rooting(0, 0.1 + 0.2), &options), &options)
            .merge(Aggregate::single(rooting(1, 0.3), &options), &options);
        assert_eq!(reversed.optimal_count, 2);
    }

    #[test]
    fn test_rooting_cap_marks_partial() {
        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        let gene = gene_tree("((A,B),C,D);");
        let options = SdirOptions::default().with_max_rootings(Some(2));
        let result = Sdir::new(options).infer(&gene, &sdi).unwrap();
        assert!(result.partial);
        assert_eq!(result.rootings_evaluated, 2);
        assert_eq!(result.candidate_rootings, 5);
        assert_eq!(result.min_duplications, Some(2));
        assert_eq!(result.optimal_rootings, 2);
    }

    #[test]
    fn test_bifurcating_root_branch_counted_once() {
        let gene = gene_tree("((A,B),(C,D));");
        let candidates = candidate_branches(&gene).unwrap();
        assert_eq!(candidates.len(), 5);

        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        let result = Sdir::default().infer(&gene, &sdi).unwrap();
        assert_eq!(result.rootings_evaluated, 5);
        assert_eq!(result.min_duplications, Some(0));
    }

    #[test]
    fn test_preconditions() {
        let species = species_tree(SPECIES);
        let sdi = Sdi::new(&species).unwrap();
        let sdir = Sdir::default();
        assert_eq!(
            sdir.infer(&gene_tree("A;"), &sdi).unwrap_err(),
            ReconciliationError::TooFewExternalNodes(1)
        );
        assert_eq!(
            sdir.infer(&gene_tree("((A,B,C),D);"), &sdi).unwrap_err(),
            ReconciliationError::NotResolvable
        );
        assert_eq!(
            sdir.infer(&gene_tree("(A,B,C,D);"), &sdi).unwrap_err(),
            ReconciliationError::NotResolvable
        );
        assert_eq!(
            sdir.infer(&gene_tree("((A,B),C,Q);"), &sdi).unwrap_err(),
            ReconciliationError::UnknownSpecies("Q".to_string())
        );
    }
}
