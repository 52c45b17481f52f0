//! Python binding layer for reconciliation and split support.
//!
//! Trees are read from Newick files; species ids of gene tree leaves are the
//! part of the leaf name after the last separator, species tree leaves are
//! named by their species id.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::error::ReconciliationError;
use crate::io::{ReadOptions, SpeciesSource, read_newick_file};
use crate::sdi::Sdi;
use crate::sdir::{Criterion, Sdir, SdirOptions};
use crate::support::count_support;
use crate::tree::Tree;

/// Reconcile rooted gene trees with a species tree.
///
/// Args:
///     species_path: Newick file holding the rooted, binary species tree
///     gene_path: Newick file with one or more rooted, binary gene trees
///     separator: Separator in front of the species id in gene leaf names (default: "_")
///     strip: Remove gene leaves whose species is not in the species tree (default: False)
///
/// Returns:
///     A list with one (duplications, speciations, mapping_cost) tuple per gene tree
///
/// Raises:
///     ValueError: If a file cannot be read or a tree violates a precondition
#[pyfunction]
#[pyo3(signature = (species_path, gene_path, separator='_', strip=false))]
fn reconcile(
    species_path: String,
    gene_path: String,
    separator: char,
    strip: bool,
) -> PyResult<Vec<(usize, usize, usize)>> {
    let (species_tree, gene_trees) = read_inputs(&species_path, &gene_path, separator)?;
    let sdi = Sdi::new(&species_tree)
        .map_err(|e| PyValueError::new_err(format!("Invalid species tree: {}", e)))?;

    gene_trees
        .into_par_iter()
        .enumerate()
        .map(|(idx, mut gene_tree)| {
            if strip {
                sdi.strip_unknown_species(&mut gene_tree);
            }
            let to_py = |e: ReconciliationError| PyValueError::new_err(format!("Gene tree {}: {}", idx, e));
            let reconciliation = sdi.reconcile(&mut gene_tree).map_err(to_py)?;
            let cost = sdi.mapping_cost(&gene_tree, &reconciliation).map_err(to_py)?;
            Ok((reconciliation.duplications, reconciliation.speciations, cost))
        })
        .collect()
}

/// Reconcile unrooted gene trees by trying every rooting.
///
/// Args:
///     species_path: Newick file holding the rooted, binary species tree
///     gene_path: Newick file with one or more gene trees
///     separator: Separator in front of the species id in gene leaf names (default: "_")
///     criterion: "duplications" or "mapping_cost" (default: "duplications")
///     minimize_height: Break ties by tree height (default: False)
///     max_rootings: Evaluate at most this many rootings per tree (default: all)
///
/// Returns:
///     A list with one (min_duplications, optimal_rootings, rootings_evaluated, partial)
///     tuple per gene tree
///
/// Raises:
///     ValueError: If a file cannot be read, the criterion is unknown or a tree violates a precondition
#[pyfunction]
#[pyo3(signature = (species_path, gene_path, separator='_', criterion="duplications", minimize_height=false, max_rootings=None))]
fn reconcile_unrooted(
    species_path: String,
    gene_path: String,
    separator: char,
    criterion: &str,
    minimize_height: bool,
    max_rootings: Option<usize>,
) -> PyResult<Vec<(usize, usize, usize, bool)>> {
    let criterion = match criterion {
        "duplications" => Criterion::Duplications,
        "mapping_cost" => Criterion::MappingCost,
        other => {
            return Err(PyValueError::new_err(format!(
                "Unknown criterion '{}', expected 'duplications' or 'mapping_cost'",
                other
            )));
        }
    };
    let (species_tree, gene_trees) = read_inputs(&species_path, &gene_path, separator)?;
    let sdi = Sdi::new(&species_tree)
        .map_err(|e| PyValueError::new_err(format!("Invalid species tree: {}", e)))?;
    let sdir = Sdir::new(
        SdirOptions::default()
            .with_criterion(criterion)
            .with_minimize_height(minimize_height)
            .with_max_rootings(max_rootings)
            .with_max_trees_to_return(0),
    );

    // rootings of one tree are already evaluated in parallel
    gene_trees
        .iter()
        .enumerate()
        .map(|(idx, gene_tree)| {
            let result = sdir
                .infer(gene_tree, &sdi)
                .map_err(|e| PyValueError::new_err(format!("Gene tree {}: {}", idx, e)))?;
            Ok((
                result.min_duplications.unwrap_or(0),
                result.optimal_rootings,
                result.rootings_evaluated,
                result.partial,
            ))
        })
        .collect()
}

/// Count how many sample trees contain each clade of a reference tree.
///
/// Args:
///     reference_path: Newick file whose first tree is the reference
///     samples_path: Newick file with the sample (e.g. bootstrap) trees
///
/// Returns:
///     A list of (clade_leaf_names, count) tuples, one per internal non-root
///     reference node in preorder
///
/// Raises:
///     ValueError: If a file cannot be read or the trees have different leaf sets
#[pyfunction]
#[pyo3(signature = (reference_path, samples_path))]
fn split_support(reference_path: String, samples_path: String) -> PyResult<Vec<(Vec<String>, usize)>> {
    let options = ReadOptions::default();
    let mut reference = read_trees(&reference_path, &options)?.swap_remove(0);
    let samples = read_trees(&samples_path, &options)?;

    let counts = count_support(&mut reference, &samples)
        .map_err(|e| PyValueError::new_err(format!("Failed to count support: {}", e)))?;
    counts
        .into_iter()
        .map(|(node, count)| {
            let names = reference
                .external_descendants(node)
                .map_err(|e| PyValueError::new_err(e.to_string()))?
                .into_iter()
                .map(|leaf| reference[leaf].name.clone())
                .collect();
            Ok((names, count))
        })
        .collect()
}

fn read_trees(path: &str, options: &ReadOptions) -> PyResult<Vec<Tree>> {
    read_newick_file(path, options)
        .map_err(|e| PyValueError::new_err(format!("Failed to read '{}': {}", path, e)))
}

/// Helper function to read the species tree and the gene trees
fn read_inputs(species_path: &str, gene_path: &str, separator: char) -> PyResult<(Tree, Vec<Tree>)> {
    let species_options = ReadOptions::default().with_species(SpeciesSource::LeafName);
    let mut species_trees = read_trees(species_path, &species_options)?;
    if species_trees.len() > 1 {
        return Err(PyValueError::new_err(format!(
            "Expected one species tree in '{}', found {}",
            species_path,
            species_trees.len()
        )));
    }
    let gene_options = ReadOptions::default().with_species(SpeciesSource::NameSuffix(separator));
    let gene_trees = read_trees(gene_path, &gene_options)?;
    Ok((species_trees.swap_remove(0), gene_trees))
}

/// Python module definition
#[pymodule]
fn rust_tree_reconciliation(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(reconcile, m)?)?;
    m.add_function(wrap_pyfunction!(reconcile_unrooted, m)?)?;
    m.add_function(wrap_pyfunction!(split_support, m)?)?;
    Ok(())
}
