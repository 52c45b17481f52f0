//! Traversal iterators.
//!
//! Every iterator borrows the tree immutably and keeps only an explicit
//! cursor (a stack, a queue or the current leaf), never a precomputed node
//! list. The borrow makes mutation during iteration a compile error.
//!
//! Besides [`Iterator::next`], each iterator offers `has_next` and `reset`,
//! the latter restarting the traversal from its original start node.

use std::collections::VecDeque;

use crate::error::TreeError;
use crate::node::NodeId;
use crate::tree::Tree;

/// Node first, then its children left to right.
#[derive(Debug, Clone)]
pub struct PreorderIter<'a> {
    tree: &'a Tree,
    start: Option<NodeId>,
    stack: Vec<NodeId>,
}

impl<'a> PreorderIter<'a> {
    fn new(tree: &'a Tree, start: Option<NodeId>) -> Self {
        PreorderIter {
            tree,
            start,
            stack: start.into_iter().collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.extend(self.start);
    }
}

impl Iterator for PreorderIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree[node].children().iter().rev().copied());
        Some(node)
    }
}

/// Children left to right, then the node.
#[derive(Debug, Clone)]
pub struct PostorderIter<'a> {
    tree: &'a Tree,
    start: Option<NodeId>,
    // (node, index of the next child to descend into)
    stack: Vec<(NodeId, usize)>,
}

impl<'a> PostorderIter<'a> {
    fn new(tree: &'a Tree, start: Option<NodeId>) -> Self {
        PostorderIter {
            tree,
            start,
            stack: start.map(|s| (s, 0)).into_iter().collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.extend(self.start.map(|s| (s, 0)));
    }
}

impl Iterator for PostorderIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let (node, next_child) = *self.stack.last()?;
            let children = self.tree[node].children();
            if next_child < children.len() {
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                self.stack.push((children[next_child], 0));
            } else {
                self.stack.pop();
                return Some(node);
            }
        }
    }
}

/// Breadth first, root first.
#[derive(Debug, Clone)]
pub struct LevelOrderIter<'a> {
    tree: &'a Tree,
    start: Option<NodeId>,
    queue: VecDeque<NodeId>,
}

impl<'a> LevelOrderIter<'a> {
    fn new(tree: &'a Tree, start: Option<NodeId>) -> Self {
        LevelOrderIter {
            tree,
            start,
            queue: start.into_iter().collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.queue.extend(self.start);
    }
}

impl Iterator for LevelOrderIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queue.extend(self.tree[node].children().iter().copied());
        Some(node)
    }
}

/// Leaf to leaf, left to right.
///
/// The collapse-aware variant reports the topmost collapsed node of every
/// path as if it were a leaf and never enters its subtree, so collapsed
/// nodes nested inside it are not visited either.
#[derive(Debug, Clone)]
pub struct ExternalIter<'a> {
    tree: &'a Tree,
    collapse_aware: bool,
    cursor: Option<NodeId>,
}

impl<'a> ExternalIter<'a> {
    fn new(tree: &'a Tree, collapse_aware: bool) -> Self {
        let mut iter = ExternalIter {
            tree,
            collapse_aware,
            cursor: None,
        };
        iter.reset();
        iter
    }

    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn reset(&mut self) {
        self.cursor = self
            .tree
            .root()
            .ok()
            .map(|root| self.tree.first_external_below(root, self.collapse_aware));
    }
}

impl Iterator for ExternalIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.cursor?;
        self.cursor = self.tree.next_external_after(current, self.collapse_aware);
        Some(current)
    }
}

impl Tree {
    pub fn iter_preorder(&self) -> PreorderIter<'_> {
        PreorderIter::new(self, self.root().ok())
    }

    pub fn iter_postorder(&self) -> PostorderIter<'_> {
        PostorderIter::new(self, self.root().ok())
    }

    pub fn iter_level_order(&self) -> LevelOrderIter<'_> {
        LevelOrderIter::new(self, self.root().ok())
    }

    pub fn iter_external(&self) -> ExternalIter<'_> {
        ExternalIter::new(self, false)
    }

    /// External iteration that treats collapsed nodes as leaves.
    pub fn iter_external_collapse_aware(&self) -> ExternalIter<'_> {
        ExternalIter::new(self, true)
    }

    /// Preorder over the subtree rooted at `id`.
    pub fn subtree_preorder(&self, id: NodeId) -> Result<PreorderIter<'_>, TreeError> {
        self.get(id)?;
        Ok(self.iter_preorder_from(id))
    }

    /// Postorder over the subtree rooted at `id`.
    pub fn subtree_postorder(&self, id: NodeId) -> Result<PostorderIter<'_>, TreeError> {
        self.get(id)?;
        Ok(PostorderIter::new(self, Some(id)))
    }

    pub(crate) fn iter_preorder_from(&self, id: NodeId) -> PreorderIter<'_> {
        PreorderIter::new(self, Some(id))
    }

    /// The leaf following the subtree of `id` in left-to-right order, `None`
    /// after the last leaf.
    pub fn next_external_node(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        self.get(id)?;
        Ok(self.next_external_after(id, false))
    }

    /// Like [`Tree::next_external_node`], but collapsed nodes count as leaves.
    pub fn next_external_node_collapse_aware(
        &self,
        id: NodeId,
    ) -> Result<Option<NodeId>, TreeError> {
        self.get(id)?;
        Ok(self.next_external_after(id, true))
    }

    fn first_external_below(&self, mut id: NodeId, collapse_aware: bool) -> NodeId {
        loop {
            let node = &self[id];
            if node.is_external() || (collapse_aware && node.collapsed) {
                return id;
            }
            id = node.children()[0];
        }
    }

    fn next_external_after(&self, mut id: NodeId, collapse_aware: bool) -> Option<NodeId> {
        // climb until there is a right sibling, then descend along first children
        loop {
            let parent = self[id].parent()?;
            let siblings = self[parent].children();
            let index = siblings.iter().position(|&c| c == id)?;
            if let Some(&sibling) = siblings.get(index + 1) {
                return Some(self.first_external_below(sibling, collapse_aware));
            }
            id = parent;
        }
    }
}
