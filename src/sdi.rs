//! Speciation/duplication inference on rooted trees.
//!
//! Every gene tree leaf is linked to the species tree leaf carrying the same
//! species id. Going up the gene tree in postorder, an internal node is mapped
//! to the lowest common ancestor of its children's targets in the species
//! tree. The node is a duplication when that target coincides with one of its
//! children's targets, and a speciation otherwise.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::annotation::{non_empty, Event, Taxonomy};
use crate::error::{ReconciliationError, TreeError};
use crate::lca::PreorderIndex;
use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// Taxonomy field used as the species id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesField {
    Identifier,
    Code,
    ScientificName,
}

impl SpeciesField {
    /// Candidates in order of preference.
    pub const ALL: [SpeciesField; 3] = [
        SpeciesField::Identifier,
        SpeciesField::Code,
        SpeciesField::ScientificName,
    ];

    pub fn of(self, taxonomy: &Taxonomy) -> Option<&str> {
        match self {
            SpeciesField::Identifier => non_empty(&taxonomy.identifier),
            SpeciesField::Code => non_empty(&taxonomy.code),
            SpeciesField::ScientificName => non_empty(&taxonomy.scientific_name),
        }
    }

    /// Species id of a node, if its taxonomy carries this field.
    pub fn species_of(self, node: &Node) -> Option<&str> {
        node.taxonomy().and_then(|t| self.of(t))
    }
}

/// Outcome of [`Sdi::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub duplications: usize,
    pub speciations: usize,
    // species tree node for each gene tree arena slot
    mapping: Vec<Option<NodeId>>,
}

impl Reconciliation {
    /// Species tree node the gene tree node `gene_node` was mapped to.
    pub fn species_node(&self, gene_node: NodeId) -> Option<NodeId> {
        self.mapping.get(gene_node).copied().flatten()
    }
}

/// A species tree prepared for reconciling gene trees against it.
#[derive(Debug, Clone)]
pub struct Sdi<'s> {
    index: PreorderIndex<'s>,
    field: SpeciesField,
    species: HashMap<String, NodeId>,
    depths: Vec<usize>,
}

impl<'s> Sdi<'s> {
    /// Checks the species tree and picks the taxonomy field to compare by:
    /// the first of identifier, code and scientific name that every species
    /// leaf carries.
    pub fn new(species_tree: &'s Tree) -> Result<Self, ReconciliationError> {
        let root = species_tree.root()?;
        if !species_tree.is_rooted() {
            return Err(ReconciliationError::SpeciesTreeNotRooted);
        }
        if !species_tree.is_completely_binary() {
            return Err(TreeError::NotBinary.into());
        }

        let mut taxonomies = Vec::new();
        for leaf in species_tree.iter_external() {
            match species_tree[leaf].taxonomy().filter(|t| !t.is_empty()) {
                Some(t) => taxonomies.push((leaf, t)),
                None => {
                    return Err(ReconciliationError::MissingTaxonomy(
                        species_tree[leaf].name.clone(),
                    ));
                }
            }
        }
        let field = SpeciesField::ALL
            .into_iter()
            .find(|f| taxonomies.iter().all(|(_, t)| f.of(t).is_some()))
            .ok_or(ReconciliationError::IncomparableTaxonomies)?;

        let mut species = HashMap::with_capacity(taxonomies.len());
        for (leaf, taxonomy) in taxonomies {
            let id = field.of(taxonomy).unwrap_or_default().to_string();
            if species.contains_key(&id) {
                return Err(ReconciliationError::DuplicateSpecies(id));
            }
            species.insert(id, leaf);
        }

        let mut depths = vec![0; species_tree.nodes.len()];
        for node in species_tree.iter_preorder() {
            if let Some(parent) = species_tree[node].parent() {
                depths[node] = depths[parent] + 1;
            }
        }
        debug!(
            ?field,
            species = species.len(),
            root,
            "Prepared species tree"
        );

        Ok(Sdi {
            index: PreorderIndex::new(species_tree),
            field,
            species,
            depths,
        })
    }

    pub fn species_tree(&self) -> &'s Tree {
        self.index.tree()
    }

    pub fn field(&self) -> SpeciesField {
        self.field
    }

    /// Species tree leaf for a species id.
    pub fn species_leaf(&self, species: &str) -> Option<NodeId> {
        self.species.get(species).copied()
    }

    /// Depth of a species tree node (edges from the root).
    pub fn species_depth(&self, node: NodeId) -> Option<usize> {
        self.depths.get(node).copied()
    }

    /// Links every gene tree leaf to its species tree leaf.
    pub(crate) fn link_leaves(&self, gene_tree: &Tree) -> Result<Vec<Option<NodeId>>, ReconciliationError> {
        let mut mapping = vec![None; gene_tree.nodes.len()];
        for leaf in gene_tree.iter_external() {
            let node = &gene_tree[leaf];
            let species = self
                .field
                .species_of(node)
                .ok_or_else(|| ReconciliationError::MissingSpecies(node.name.clone()))?;
            let target = self
                .species_leaf(species)
                .ok_or_else(|| ReconciliationError::UnknownSpecies(species.to_string()))?;
            mapping[leaf] = Some(target);
        }
        Ok(mapping)
    }

    /// Maps every gene tree node onto the species tree and labels internal
    /// nodes as duplications or speciations.
    ///
    /// The gene tree must be rooted and completely binary, and every leaf
    /// must name a species of the species tree. Nothing is written to the
    /// gene tree unless all of that holds.
    pub fn reconcile(&self, gene_tree: &mut Tree) -> Result<Reconciliation, ReconciliationError> {
        gene_tree.root()?;
        if !gene_tree.is_rooted() {
            return Err(ReconciliationError::GeneTreeNotRooted);
        }
        if !gene_tree.is_completely_binary() {
            return Err(TreeError::NotBinary.into());
        }
        let mut mapping = self.link_leaves(gene_tree)?;

        let mut events = Vec::new();
        for node in gene_tree.iter_postorder() {
            let children = gene_tree[node].children();
            if children.is_empty() {
                continue;
            }
            let a = mapping[children[0]].ok_or(TreeError::NodeNotFound(children[0]))?;
            let b = mapping[children[1]].ok_or(TreeError::NodeNotFound(children[1]))?;
            let target = self.index.lca(a, b)?;
            mapping[node] = Some(target);
            events.push((node, target == a || target == b));
        }

        let duplications = events.iter().filter(|(_, dup)| *dup).count();
        let speciations = events.len() - duplications;
        for (node, duplication) in events {
            let event = if duplication {
                Event::single_duplication()
            } else {
                Event::single_speciation()
            };
            gene_tree[node].set_event(event);
        }
        debug!(duplications, speciations, "Reconciled gene tree");

        Ok(Reconciliation {
            duplications,
            speciations,
            mapping,
        })
    }

    /// Mapping cost L of a reconciled gene tree.
    ///
    /// Per internal gene node `g` mapped to `m` with children mapped to `m1`
    /// and `m2`, using species tree depths `d`:
    /// `d(m1) + d(m2) - 2 d(m) - 2` if neither child maps to `m`,
    /// `d(mc) - d(m) + 1` if only the other child `c` does not, and `1` if
    /// both children map to `m`.
    pub fn mapping_cost(
        &self,
        gene_tree: &Tree,
        reconciliation: &Reconciliation,
    ) -> Result<usize, ReconciliationError> {
        let target = |n: NodeId| {
            reconciliation
                .species_node(n)
                .ok_or(ReconciliationError::Tree(TreeError::NodeNotFound(n)))
        };
        let depth = |s: NodeId| self.depths.get(s).copied().unwrap_or(0);

        let mut cost = 0;
        for node in gene_tree.iter_postorder() {
            let children = gene_tree[node].children();
            if children.len() != 2 {
                continue;
            }
            let m = target(node)?;
            let (m1, m2) = (target(children[0])?, target(children[1])?);
            cost += match (m1 == m, m2 == m) {
                (false, false) => depth(m1) + depth(m2) - 2 * depth(m) - 2,
                (true, false) => depth(m2) - depth(m) + 1,
                (false, true) => depth(m1) - depth(m) + 1,
                (true, true) => 1,
            };
        }
        Ok(cost)
    }

    /// Deletes, with distance absorption, every gene tree leaf whose species
    /// is missing or not in the species tree. Returns the removed leaf names.
    pub fn strip_unknown_species(&self, gene_tree: &mut Tree) -> Vec<String> {
        let unknown: Vec<NodeId> = gene_tree
            .iter_external()
            .filter(|&leaf| {
                self.field
                    .species_of(&gene_tree[leaf])
                    .is_none_or(|s| !self.species.contains_key(s))
            })
            .collect();
        let mut removed = Vec::with_capacity(unknown.len());
        for leaf in unknown {
            // a leaf is only gone early if an earlier deletion emptied the tree
            let Ok(name) = gene_tree.get(leaf).map(|n| n.name.clone()) else {
                continue;
            };
            if gene_tree.delete_subtree(leaf, true).is_ok() {
                removed.push(name);
            }
        }
        if !removed.is_empty() {
            warn!(
                count = removed.len(),
                "Removed gene tree leaves without species in species tree"
            );
        }
        removed
    }
}
