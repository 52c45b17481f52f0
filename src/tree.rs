//! Arena-backed phylogenetic tree.
//!
//! # Overview
//! All nodes of a [`Tree`] live in one vector and refer to each other by
//! [`NodeId`]. Structural changes are pure index rewiring, so there are no
//! dangling references to worry about when subtrees are deleted or the tree
//! is rerooted.
//!
//! # Vacant slots
//! Removing a node vacates its slot. Slots are never reused: a [`NodeId`]
//! that referred to a removed node keeps failing with
//! [`TreeError::NodeNotFound`] instead of silently addressing another node.
//!
//! # Copies
//! [`Tree::copy`] keeps the arena layout, so the same [`NodeId`] addresses the
//! corresponding node in the copy, while every node receives a fresh serial.

use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::node::{BranchLength, Node, NodeId, NodeRef};

/// A rooted phylogenetic tree.
///
/// An unrooted tree is still stored with some designated root node; the
/// `rooted` flag says whether the children of that root are meaningful
/// sibling lineages.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) root: Option<NodeId>,
    pub(crate) rooted: bool,
    name: Option<String>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Tree::default()
    }

    /// Creates a tree consisting of `root` only, returning the tree and the root id.
    pub fn with_root(root: Node) -> (Self, NodeId) {
        let mut tree = Tree::new();
        let id = tree.add_root(root);
        (tree, id)
    }

    /// Makes `node` the new root. A previous root becomes its first child.
    pub fn add_root(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        let id = self.push(node);
        if let Some(old_root) = self.root {
            self[old_root].parent = Some(id);
            self[id].children.push(old_root);
        }
        self.root = Some(id);
        id
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// # Example
    /// ```
    /// use rust_tree_reconciliation::{Node, Tree};
    ///
    /// let (mut tree, root) = Tree::with_root(Node::new());
    /// let a = tree.add_child(root, Node::with_name_and_length("A", 0.5).unwrap()).unwrap();
    /// tree.add_child(root, Node::with_name("B")).unwrap();
    ///
    /// assert_eq!(tree.number_of_external_nodes(), 2);
    /// assert_eq!(tree.parent(a).unwrap(), Some(root));
    /// ```
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, TreeError> {
        self.get(parent)?;
        node.parent = Some(parent);
        node.children.clear();
        let id = self.push(node);
        self[parent].children.push(id);
        Ok(id)
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    /// Returns a reference to a live node.
    pub fn get(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(TreeError::NodeNotFound(id))
    }

    /// Returns a mutable reference to a live node.
    ///
    /// Structure (parent, children) is not reachable through this reference;
    /// use the mutation operations for that.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(TreeError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    /// Handle of a live node that remembers which node it was taken from.
    pub fn node_ref(&self, id: NodeId) -> Result<NodeRef, TreeError> {
        Ok(NodeRef {
            id,
            serial: self.get(id)?.serial(),
        })
    }

    /// Arena id of `node`.
    ///
    /// # Errors
    /// [`TreeError::ForeignNode`] if the handle was taken from another tree,
    /// including an earlier copy of this one, and
    /// [`TreeError::NodeNotFound`] if its slot is out of range or vacant.
    pub fn resolve(&self, node: NodeRef) -> Result<NodeId, TreeError> {
        if self.get(node.id)?.serial() != node.serial {
            return Err(TreeError::ForeignNode(node.id));
        }
        Ok(node.id)
    }

    /// Root of the tree.
    ///
    /// # Errors
    /// [`TreeError::IsEmpty`] if the tree has no nodes.
    pub fn root(&self) -> Result<NodeId, TreeError> {
        self.root.ok_or(TreeError::IsEmpty)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    pub fn set_rooted(&mut self, rooted: bool) {
        self.rooted = rooted;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = Some(name.into());
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.get(id)?.children)
    }

    /// The `index`-th child of `id`.
    pub fn child(&self, id: NodeId, index: usize) -> Result<NodeId, TreeError> {
        self.get(id)?
            .children
            .get(index)
            .copied()
            .ok_or(TreeError::ChildIndexOutOfBounds { node: id, index })
    }

    /// Position of `id` in its parent's child list, `None` for the root.
    pub fn child_index(&self, id: NodeId) -> Result<Option<usize>, TreeError> {
        match self.get(id)?.parent {
            None => Ok(None),
            Some(parent) => Ok(self[parent].children.iter().position(|&c| c == id)),
        }
    }

    pub fn is_external(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.get(id)?.is_external())
    }

    pub fn is_root(&self, id: NodeId) -> Result<bool, TreeError> {
        self.get(id)?;
        Ok(self.root == Some(id))
    }

    /// Sets the branch length leading to `id`.
    pub fn set_branch_length(&mut self, id: NodeId, length: BranchLength) -> Result<(), TreeError> {
        self.get_mut(id)?.set_branch_length(length)
    }

    /// Number of nodes reachable from the root.
    pub fn number_of_nodes(&self) -> usize {
        self.iter_preorder().count()
    }

    pub fn number_of_external_nodes(&self) -> usize {
        self.iter_preorder().filter(|&n| self[n].is_external()).count()
    }

    pub fn number_of_internal_nodes(&self) -> usize {
        self.iter_preorder().filter(|&n| self[n].is_internal()).count()
    }

    /// Number of branches between nodes (the root's own branch is not counted).
    pub fn number_of_branches(&self) -> usize {
        self.number_of_nodes().saturating_sub(1)
    }

    /// Whether every internal node has exactly two children.
    pub fn is_completely_binary(&self) -> bool {
        self.iter_preorder()
            .all(|n| self[n].is_external() || self[n].children.len() == 2)
    }

    /// Leaves in left-to-right order.
    pub fn external_nodes(&self) -> Vec<NodeId> {
        self.iter_external().collect()
    }

    /// Names of all leaves in left-to-right order.
    pub fn external_names(&self) -> Vec<&str> {
        self.iter_external().map(|n| self[n].name.as_str()).collect()
    }

    /// Leaves below (or equal to) `id`, left to right.
    pub fn external_descendants(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.get(id)?;
        Ok(self
            .iter_preorder_from(id)
            .filter(|&n| self[n].is_external())
            .collect())
    }

    /// First node in preorder with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter_preorder().find(|&n| self[n].name == name)
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> Result<usize, TreeError> {
        let mut current = self.get(id)?;
        let mut depth = 0;
        while let Some(parent) = current.parent {
            current = &self[parent];
            depth += 1;
        }
        Ok(depth)
    }

    /// Sum of branch lengths on the path from `id` up to the root, including
    /// the root's own branch if it has one. Unset lengths count as zero.
    pub fn distance_to_root(&self, id: NodeId) -> Result<f64, TreeError> {
        let mut current = self.get(id)?;
        let mut distance = current.branch_length_or_zero();
        while let Some(parent) = current.parent {
            current = &self[parent];
            distance += current.branch_length_or_zero();
        }
        Ok(distance)
    }

    /// Largest distance from `id` down to a leaf below it (the branch above `id` excluded).
    pub fn subtree_height(&self, id: NodeId) -> Result<f64, TreeError> {
        self.get(id)?;
        let mut heights = Vec::new();
        let mut max: f64 = 0.0;
        // (node, distance from id)
        heights.push((id, 0.0));
        while let Some((node, dist)) = heights.pop() {
            max = max.max(dist);
            for &child in &self[node].children {
                heights.push((child, dist + self[child].branch_length_or_zero()));
            }
        }
        Ok(max)
    }

    /// Height of the whole tree, 0 for an empty tree.
    pub fn height(&self) -> f64 {
        self.root
            .map(|r| self.subtree_height(r).unwrap_or(0.0))
            .unwrap_or(0.0)
    }

    /// Sets or clears the collapsed flag on every node.
    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        for node in self.nodes.iter_mut().flatten() {
            node.collapsed = collapsed;
        }
    }

    /// Deep copy: identical content and layout, fresh node serials.
    pub fn copy(&self) -> Tree {
        let mut copy = self.clone();
        for node in copy.nodes.iter_mut().flatten() {
            node.refresh_serial();
        }
        copy
    }

    /// Checks the structural invariants: every live node reachable from the root
    /// exactly once, parent and child links consistent, no negative lengths.
    pub fn is_valid(&self) -> bool {
        let Some(root) = self.root else {
            return self.nodes.iter().all(Option::is_none);
        };
        if !self.contains(root) || self[root].parent.is_some() {
            return false;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if seen[id] {
                return false;
            }
            seen[id] = true;
            let node = &self[id];
            if node.branch_length().is_some_and(|l| l < 0.0) {
                return false;
            }
            for &child in &node.children {
                match self.nodes.get(child).and_then(Option::as_ref) {
                    Some(c) if c.parent == Some(id) => stack.push(child),
                    _ => return false,
                }
            }
        }
        // no live node may be unreachable
        self.nodes
            .iter()
            .enumerate()
            .all(|(id, slot)| slot.is_none() || seen[id])
    }

    // ------------------------------------------------------------------------
    // Rewiring helpers for the mutation operations
    // ------------------------------------------------------------------------

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        if let Some(r) = root {
            self[r].parent = None;
        }
        self.root = root;
    }

    /// Vacates the slots of `id` and all its descendants.
    pub(crate) fn vacate_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes[n].take() {
                stack.extend(node.children);
            }
        }
    }

    pub(crate) fn vacate(&mut self, id: NodeId) {
        self.nodes[id] = None;
    }

    /// Removes every node, keeping the rooted flag and name.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Puts `new` into the child slot of `parent` that holds `old`.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let Some(slot) = self[parent].children.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        self[new].parent = Some(parent);
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    /// # Panics
    /// Panics if `id` is out of bounds or vacant; use [`Tree::get`] for a checked lookup.
    fn index(&self, id: NodeId) -> &Self::Output {
        self.nodes[id]
            .as_ref()
            .unwrap_or_else(|| panic!("node {id} has been removed from the tree"))
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.nodes[id]
            .as_mut()
            .unwrap_or_else(|| panic!("node {id} has been removed from the tree"))
    }
}
