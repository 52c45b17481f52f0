//! Lowest common ancestor queries.
//!
//! Two algorithms are offered:
//!
//! * [`lca`] walks parent links and needs no preparation, so it can be used
//!   at any time, including right after a mutation.
//! * [`PreorderIndex`] numbers the nodes in preorder once and then answers
//!   ancestor tests in constant time. The index borrows the tree, so the tree
//!   cannot change underneath it; rebuild it after mutating.

use crate::error::TreeError;
use crate::node::{NodeId, NodeRef};
use crate::tree::Tree;

/// Lowest common ancestor of `a` and `b`, found by lifting the deeper node to
/// the depth of the other and then climbing both in lock step.
pub fn lca(tree: &Tree, a: NodeId, b: NodeId) -> Result<NodeId, TreeError> {
    let (mut a, mut b) = (a, b);
    let (mut depth_a, mut depth_b) = (tree.depth(a)?, tree.depth(b)?);
    while depth_a > depth_b {
        a = parent_of(tree, a)?;
        depth_a -= 1;
    }
    while depth_b > depth_a {
        b = parent_of(tree, b)?;
        depth_b -= 1;
    }
    while a != b {
        a = parent_of(tree, a)?;
        b = parent_of(tree, b)?;
    }
    Ok(a)
}

/// [`lca`] on node handles; nodes of another tree are reported as
/// [`TreeError::ForeignNode`].
pub fn lca_of(tree: &Tree, a: NodeRef, b: NodeRef) -> Result<NodeRef, TreeError> {
    let found = lca(tree, tree.resolve(a)?, tree.resolve(b)?)?;
    tree.node_ref(found)
}

fn parent_of(tree: &Tree, id: NodeId) -> Result<NodeId, TreeError> {
    tree[id].parent().ok_or(TreeError::NodeNotFound(id))
}

/// Preorder numbering of a tree (root first, children left to right).
#[derive(Debug, Clone)]
pub struct PreorderIndex<'a> {
    tree: &'a Tree,
    // preorder id for each arena slot
    ids: Vec<Option<usize>>,
    // arena id for each preorder id
    order: Vec<NodeId>,
    // largest preorder id in the subtree, by preorder id
    last_descendant: Vec<usize>,
}

impl<'a> PreorderIndex<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        let order: Vec<NodeId> = tree.iter_preorder().collect();
        let mut ids = vec![None; order.iter().max().map_or(0, |&m| m + 1)];
        for (pre, &node) in order.iter().enumerate() {
            ids[node] = Some(pre);
        }
        let mut last_descendant: Vec<usize> = (0..order.len()).collect();
        for node in tree.iter_postorder() {
            if let (Some(pre), Some(&last)) = (ids[node], tree[node].children().last()) {
                if let Some(last_pre) = ids[last] {
                    last_descendant[pre] = last_descendant[last_pre];
                }
            }
        }
        PreorderIndex {
            tree,
            ids,
            order,
            last_descendant,
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn preorder_id(&self, node: NodeId) -> Result<usize, TreeError> {
        self.ids
            .get(node)
            .copied()
            .flatten()
            .ok_or(TreeError::NodeNotFound(node))
    }

    /// The node with the given preorder id.
    pub fn node(&self, preorder_id: usize) -> Option<NodeId> {
        self.order.get(preorder_id).copied()
    }

    /// Whether `ancestor` is `node` or lies on the path from `node` to the root.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool, TreeError> {
        let a = self.preorder_id(ancestor)?;
        let n = self.preorder_id(node)?;
        Ok(a <= n && n <= self.last_descendant[a])
    }

    /// Lowest common ancestor: repeatedly replaces whichever node has the
    /// larger preorder id by its parent until both meet.
    pub fn lca(&self, a: NodeId, b: NodeId) -> Result<NodeId, TreeError> {
        let mut a_id = self.preorder_id(a)?;
        let mut b_id = self.preorder_id(b)?;
        while a_id != b_id {
            if a_id > b_id {
                a_id = self.parent_id(a_id)?;
            } else {
                b_id = self.parent_id(b_id)?;
            }
        }
        Ok(self.order[a_id])
    }

    /// [`PreorderIndex::lca`] on node handles; nodes of another tree are
    /// reported as [`TreeError::ForeignNode`].
    pub fn lca_of(&self, a: NodeRef, b: NodeRef) -> Result<NodeRef, TreeError> {
        let found = self.lca(self.tree.resolve(a)?, self.tree.resolve(b)?)?;
        self.tree.node_ref(found)
    }

    fn parent_id(&self, preorder_id: usize) -> Result<usize, TreeError> {
        let node = self.order[preorder_id];
        let parent = parent_of(self.tree, node)?;
        self.preorder_id(parent)
    }
}
