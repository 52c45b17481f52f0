//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`, `node`, `annotation`: arena-backed phylogenetic tree with per-node annotations.
//! - `iter`: preorder, postorder, level-order and external-node traversals.
//! - `mutation`: subtree deletion, node removal, collapsing, rerooting, midpoint rooting.
//! - `lca`: lowest common ancestors by ancestor paths or preorder ids.
//! - `sdi` / `sdir`: gene tree / species tree reconciliation, rooted and unrooted.
//! - `bitset`, `splits`, `support`: leaf bitsets, tree splits, clade support.
//! - `io`: reading Newick through `phylotree` and writing TSV tables.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod annotation;
pub mod bitset;
pub mod error;
pub mod io;
pub mod iter;
pub mod lca;
pub mod mutation;
pub mod node;
pub mod sdi;
pub mod sdir;
pub mod splits;
pub mod support;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

#[cfg(test)]
mod test_util;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use error::{ReadError, ReconciliationError, TreeError};
pub use io::{read_newick_file, tree_from_newick, write_table_tsv, ReadOptions, SpeciesSource};
pub use mutation::RerootTarget;
pub use node::{Node, NodeId, NodeRef};
pub use sdi::{Reconciliation, Sdi};
pub use sdir::{Sdir, SdirOptions, SdirResult};
pub use tree::Tree;
