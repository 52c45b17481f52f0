//! Error types for tree construction, mutation, reconciliation and reading.

use std::path::PathBuf;

use thiserror::Error;

use crate::node::NodeId;

/// Errors that can occur when building, querying and mutating a [`Tree`](crate::tree::Tree).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The tree has no nodes and the operation needs at least one
    #[error("This tree is empty.")]
    IsEmpty,
    /// The requested node does not exist in the tree (never existed or was removed)
    #[error("There is no node with index: {0}")]
    NodeNotFound(usize),
    /// A node handle taken from a different tree (or an earlier copy)
    #[error("Node {0} belongs to a different tree.")]
    ForeignNode(usize),
    /// The node has fewer children than the requested child index
    #[error("Node {node} has no child at index {index}")]
    ChildIndexOutOfBounds { node: usize, index: usize },
    /// The node cannot be spliced out, it does not have exactly one child
    #[error("Could not remove node {0}, it does not have exactly one child")]
    NotSingleChild(usize),
    /// A branch length must be non-negative (or unset)
    #[error("Branch lengths must be non-negative, got {0}")]
    NegativeBranchLength(f64),
    /// A reroot point lies outside the branch it was placed on
    #[error("Cannot place a root at distance {distance} on branch of node {node} with length {length}")]
    InvalidBranchPoint {
        node: usize,
        distance: f64,
        length: f64,
    },
    /// The root has no branch above it to place a new root on
    #[error("The root node has no parent branch.")]
    RootHasNoBranch,
    /// The operation requires every internal node to have exactly two children
    #[error("This tree is not completely binary.")]
    NotBinary,
    /// Some leaves have no name but names are needed
    #[error("All leaf nodes must be named.")]
    UnnamedLeaves,
    /// Two leaves share a name where leaf names must be unique
    #[error("Leaf names must be unique, found duplicate: {0}")]
    DuplicateLeafNames(String),
    /// Trees compared on a shared leaf universe have different leaf names
    #[error("The trees have different leaf sets.")]
    DifferentLeafSets,
}

/// Errors that can occur while reconciling a gene tree with a species tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconciliationError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Attempt to infer duplications on an unrooted species tree.")]
    SpeciesTreeNotRooted,
    #[error("Attempt to infer duplications on an unrooted gene tree, use unrooted reconciliation instead.")]
    GeneTreeNotRooted,
    /// A species tree leaf carries no usable taxonomy
    #[error("Species tree node [{0}] has no taxonomic data.")]
    MissingTaxonomy(String),
    /// No taxonomy field is set on every species tree leaf
    #[error("Species tree leaves share no taxonomy field to compare by.")]
    IncomparableTaxonomies,
    /// A gene tree leaf carries no species id in the field the species tree uses
    #[error("Gene tree node [{0}] has no species id.")]
    MissingSpecies(String),
    #[error("Species [{0}] not present in species tree.")]
    UnknownSpecies(String),
    #[error("Species [{0}] is not unique in species tree.")]
    DuplicateSpecies(String),
    #[error("Gene tree needs at least two external nodes, found {0}.")]
    TooFewExternalNodes(usize),
    /// Not every rooting of the gene tree would be completely binary
    #[error("Gene tree is not resolvable into binary rootings.")]
    NotResolvable,
}

/// Errors raised by the parser-facing adapters in [`crate::io`].
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Could not parse tree: {0}")]
    Parse(String),
    #[error("Problem reading or writing file")]
    Io(#[from] std::io::Error),
    #[error("Problem with building the tree.")]
    Tree(#[from] TreeError),
    #[error("No trees found in {0:?}")]
    Empty(PathBuf),
}
