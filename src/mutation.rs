//! Structural mutation: deletion, splicing, collapsing and rerooting.
//!
//! Every operation checks all of its preconditions before touching the tree
//! and then only rewires indices, so an `Err` always leaves the tree as it
//! was.

use tracing::debug;

use crate::annotation::Annotation;
use crate::error::TreeError;
use crate::lca::lca;
use crate::node::{add_branch_lengths, BranchLength, Node, NodeId};
use crate::tree::Tree;

/// Where to place the root in [`Tree::reroot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RerootTarget {
    /// Make this existing node the root.
    Node(NodeId),
    /// Place a new root on the branch above `node`, `distance_from_node`
    /// away from it (the middle of the branch if `None`).
    Branch {
        node: NodeId,
        distance_from_node: Option<f64>,
    },
}

impl Tree {
    /// Removes `id` and all of its descendants.
    ///
    /// Deleting the root empties the tree. With `absorb_distance`, a parent
    /// left with a single child is spliced out and its branch length added to
    /// that child's, so the root-to-leaf distances of all remaining leaves are
    /// unchanged.
    pub fn delete_subtree(&mut self, id: NodeId, absorb_distance: bool) -> Result<(), TreeError> {
        let Some(parent) = self.get(id)?.parent else {
            debug!("Deleting root, tree is now empty");
            self.clear();
            return Ok(());
        };
        self[parent].children.retain(|&c| c != id);
        self.vacate_subtree(id);
        if absorb_distance && self[parent].children.len() == 1 {
            self.splice_out(parent);
        }
        Ok(())
    }

    /// Removes a node with exactly one child, which takes its place with the
    /// summed branch length.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        if self.get(id)?.children.len() != 1 {
            return Err(TreeError::NotSingleChild(id));
        }
        self.splice_out(id);
        Ok(())
    }

    /// Flattens the subtree below `id`: all of its leaves become direct
    /// children of `id`, in left-to-right order, each with the summed length
    /// of its former path to `id`.
    pub fn collapse_subtree_structure(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.get(id)?;
        let (leaves, inner): (Vec<NodeId>, Vec<NodeId>) = self
            .iter_preorder_from(id)
            .skip(1)
            .partition(|&n| self[n].is_external());
        if inner.is_empty() {
            return Ok(());
        }
        let lengths: Vec<BranchLength> = leaves
            .iter()
            .map(|&leaf| self.path_length(leaf, id))
            .collect();
        for n in inner {
            self.vacate(n);
        }
        for (&leaf, length) in leaves.iter().zip(lengths) {
            self[leaf].parent = Some(id);
            self[leaf].set_branch_length_unchecked(length);
        }
        self[id].children = leaves;
        Ok(())
    }

    /// Reroots the tree and marks it as rooted.
    ///
    /// Branch lengths and confidences stay with the branch they describe.
    /// If the former root is left with a single child it is spliced out.
    ///
    /// # Errors
    /// * [`TreeError::NodeNotFound`] for an unknown target.
    /// * [`TreeError::RootHasNoBranch`] for a branch target at the root.
    /// * [`TreeError::InvalidBranchPoint`] if `distance_from_node` lies
    ///   outside the branch.
    pub fn reroot(&mut self, target: RerootTarget) -> Result<(), TreeError> {
        match target {
            RerootTarget::Node(id) => {
                self.get(id)?;
                if self.root != Some(id) {
                    self.reroot_at_node(id);
                }
            }
            RerootTarget::Branch {
                node,
                distance_from_node,
            } => self.reroot_on_branch(node, distance_from_node)?,
        }
        self.rooted = true;
        Ok(())
    }

    /// Reroots at the midpoint of the longest leaf-to-leaf path.
    ///
    /// Unset branch lengths count as zero. Trees with fewer than two leaves are
    /// left unchanged.
    pub fn midpoint_root(&mut self) -> Result<(), TreeError> {
        let Some(first) = self.iter_external().next() else {
            return Ok(());
        };
        let (b, _) = self.farthest_leaf(first);
        let (c, diameter) = self.farthest_leaf(b);
        if b == c {
            return Ok(());
        }
        let half = diameter / 2.0;
        let top = lca(self, b, c)?;

        let mut on_branch = None;
        for start in [b, c] {
            let mut travelled = 0.0;
            let mut current = start;
            while current != top {
                let length = self[current].branch_length_or_zero();
                if travelled + length >= half {
                    on_branch = Some((current, (half - travelled).clamp(0.0, length)));
                    break;
                }
                travelled += length;
                current = self[current].parent.ok_or(TreeError::RootHasNoBranch)?;
            }
            if on_branch.is_some() {
                break;
            }
        }
        let (node, distance) = on_branch.ok_or(TreeError::RootHasNoBranch)?;
        debug!(diameter, node, distance, "Midpoint rooting");
        self.reroot(RerootTarget::Branch {
            node,
            distance_from_node: Some(distance),
        })
    }

    /// Sum of branch lengths from `from` up to (excluding) its ancestor `to`.
    fn path_length(&self, from: NodeId, to: NodeId) -> BranchLength {
        let mut length = None;
        let mut current = from;
        while current != to {
            length = add_branch_lengths(length, self[current].branch_length());
            match self[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        length
    }

    /// Replaces the single-child node `id` by its child.
    fn splice_out(&mut self, id: NodeId) {
        let child = self[id].children[0];
        let length = add_branch_lengths(self[child].branch_length(), self[id].branch_length());
        match self[id].parent {
            Some(parent) => self.replace_child(parent, id, child),
            None => self.set_root(Some(child)),
        }
        self[child].set_branch_length_unchecked(length);
        self.vacate(id);
    }

    fn reroot_on_branch(&mut self, node: NodeId, distance: Option<f64>) -> Result<(), TreeError> {
        let parent = self.get(node)?.parent.ok_or(TreeError::RootHasNoBranch)?;
        let check = |length: f64| match distance {
            Some(d) if !(0.0..=length).contains(&d) => Err(TreeError::InvalidBranchPoint {
                node,
                distance: d,
                length,
            }),
            Some(d) => Ok(d),
            None => Ok(length / 2.0),
        };

        if self.root == Some(parent) && self[parent].children.len() == 2 {
            // already on a root branch: move the root along node <-> sibling
            let sibling = self[parent]
                .children
                .iter()
                .copied()
                .find(|&c| c != node)
                .ok_or(TreeError::NodeNotFound(node))?;
            let total = add_branch_lengths(self[node].branch_length(), self[sibling].branch_length());
            let d = check(total.unwrap_or(0.0))?;
            if let Some(total) = total {
                self[node].set_branch_length_unchecked(Some(d));
                self[sibling].set_branch_length_unchecked(Some(total - d));
            }
            return Ok(());
        }

        let length = self[node].branch_length();
        let d = check(length.unwrap_or(0.0))?;
        let mut new_root = Node::new();
        new_root.set_branch_length_unchecked(length.map(|l| l - d));
        new_root.put_branch_data(
            self[node]
                .annotations
                .iter()
                .filter(|a| a.is_branch_data())
                .cloned()
                .collect(),
        );
        let new_root = self.push(new_root);
        self.replace_child(parent, node, new_root);
        self[new_root].children.push(node);
        self[node].parent = Some(new_root);
        self[node].set_branch_length_unchecked(length.map(|_| d));
        self.reroot_at_node(new_root);
        Ok(())
    }

    /// Reverses the path from the current root to `target`. `target` must be
    /// a live non-root node.
    fn reroot_at_node(&mut self, target: NodeId) {
        let mut path = vec![target];
        while let Some(parent) = self[*path.last().unwrap_or(&target)].parent {
            path.push(parent);
        }
        path.reverse();
        let old_root = path[0];
        let last = path.len() - 1;
        debug!(old_root, new_root = target, path_len = path.len(), "Rerooting");

        // slot of path[i + 1] among the children of path[i]
        let slots: Vec<usize> = (0..last)
            .map(|i| {
                self[path[i]]
                    .children
                    .iter()
                    .position(|&c| c == path[i + 1])
                    .unwrap_or(0)
            })
            .collect();
        let lengths: Vec<BranchLength> = path.iter().map(|&n| self[n].branch_length()).collect();
        let branch_data: Vec<_> = path
            .iter()
            .map(|&n| self[n].take_branch_data())
            .collect();

        self[old_root].children.remove(slots[0]);
        for i in 1..last {
            self[path[i]].children[slots[i]] = path[i - 1];
        }
        self[target].children.push(path[last - 1]);

        for (i, data) in branch_data.into_iter().enumerate().skip(1) {
            let above = path[i - 1];
            self[above].parent = Some(path[i]);
            self[above].set_branch_length_unchecked(lengths[i]);
            self[above].put_branch_data(data);
        }
        self[target].set_branch_length_unchecked(None);
        self.set_root(Some(target));

        match self[old_root].children.len() {
            // a unary old root is left dangling below its former child
            0 => {
                let below = path[1];
                self[below].children.retain(|&c| c != old_root);
                self.vacate(old_root);
                if below != target && self[below].children.len() == 1 {
                    self.splice_out_keeping_branch_data(below);
                }
            }
            1 => self.splice_out_keeping_branch_data(old_root),
            _ => {}
        }
    }

    /// Splices out the single-child node `id`. The merged branch keeps the
    /// confidences of both halves; the child's own win for a shared kind.
    fn splice_out_keeping_branch_data(&mut self, id: NodeId) {
        let child = self[id].children[0];
        let data: Vec<Annotation> = self[id]
            .take_branch_data()
            .into_iter()
            .filter(|a| match a {
                Annotation::Confidence(c) => self[child].confidence(&c.kind).is_none(),
                _ => true,
            })
            .collect();
        self[child].put_branch_data(data);
        self.splice_out(id);
    }

    /// Leaf farthest from `from` over the undirected tree, with its distance.
    fn farthest_leaf(&self, from: NodeId) -> (NodeId, f64) {
        let mut best = (from, 0.0);
        // (node, came from, distance)
        let mut stack = vec![(from, None, 0.0)];
        while let Some((node, came_from, distance)) = stack.pop() {
            let n = &self[node];
            if n.is_external() && distance > best.1 {
                best = (node, distance);
            }
            if let Some(parent) = n.parent.filter(|&p| Some(p) != came_from) {
                stack.push((parent, Some(node), distance + n.branch_length_or_zero()));
            }
            for &child in n.children.iter().filter(|&&c| Some(c) != came_from) {
                stack.push((child, Some(node), distance + self[child].branch_length_or_zero()));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::annotation::Confidence;

    /// Builds a tree from `(parent index, name, length)` rows; row 0 is the root.
    fn build(rows: &[(usize, &str, Option<f64>)]) -> (Tree, Vec<NodeId>) {
        let mut tree = Tree::new();
        let mut ids = Vec::new();
        for (i, &(parent, name, length)) in rows.iter().enumerate() {
            let mut node = Node::with_name(name);
            node.set_branch_length(length).unwrap();
            let id = if i == 0 {
                tree.add_root(node)
            } else {
                tree.add_child(ids[parent], node).unwrap()
            };
            ids.push(id);
        }
        (tree, ids)
    }

    /// `((A:1,B:2)ab:0.5,C:3)root`
    fn binary() -> (Tree, Vec<NodeId>) {
        build(&[
            (0, "root", None),
            (0, "ab", Some(0.5)),
            (0, "C", Some(3.0)),
            (1, "A", Some(1.0)),
            (1, "B", Some(2.0)),
        ])
    }

    /// `((A:1,B:2)ab:0.5,C:3,D:4)root`
    fn trifurcating() -> (Tree, Vec<NodeId>) {
        build(&[
            (0, "root", None),
            (0, "ab", Some(0.5)),
            (0, "C", Some(3.0)),
            (0, "D", Some(4.0)),
            (1, "A", Some(1.0)),
            (1, "B", Some(2.0)),
        ])
    }

    fn leaf_distance(tree: &Tree, a: NodeId, b: NodeId) -> f64 {
        let top = lca(tree, a, b).unwrap();
        tree.distance_to_root(a).unwrap() + tree.distance_to_root(b).unwrap()
            - 2.0 * tree.distance_to_root(top).unwrap()
    }

    fn pairwise_distances(tree: &Tree) -> Vec<(String, String, f64)> {
        let mut leaves = tree.external_nodes();
        leaves.sort_by(|&a, &b| tree[a].name.cmp(&tree[b].name));
        leaves
            .iter()
            .tuple_combinations()
            .map(|(&a, &b)| {
                (
                    tree[a].name.clone(),
                    tree[b].name.clone(),
                    leaf_distance(tree, a, b),
                )
            })
            .collect()
    }

    fn assert_same_distances(left: &[(String, String, f64)], right: &[(String, String, f64)]) {
        assert_eq!(left.len(), right.len());
        for (l, r) in left.iter().zip(right) {
            assert_eq!((&l.0, &l.1), (&r.0, &r.1));
            assert!((l.2 - r.2).abs() < 1e-9, "{l:?} != {r:?}");
        }
    }

    #[test]
    fn test_delete_subtree_absorbs_distance() {
        let (mut tree, ids) = binary();
        let (root, ab, a, b) = (ids[0], ids[1], ids[3], ids[4]);
        tree.delete_subtree(a, true).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.children(root).unwrap(), &[b, ids[2]]);
        assert_eq!(tree[b].branch_length(), Some(2.5));
        assert_eq!(tree.distance_to_root(b).unwrap(), 2.5);
        assert_eq!(tree.get(a).unwrap_err(), TreeError::NodeNotFound(a));
        assert_eq!(tree.get(ab).unwrap_err(), TreeError::NodeNotFound(ab));
    }

    #[test]
    fn test_delete_subtree_without_absorb_keeps_unary_parent() {
        let (mut tree, ids) = binary();
        tree.delete_subtree(ids[3], false).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.children(ids[1]).unwrap(), &[ids[4]]);
        assert_eq!(tree.number_of_nodes(), 4);
    }

    #[test]
    fn test_delete_subtree_splices_new_root() {
        let (mut tree, ids) = binary();
        tree.delete_subtree(ids[2], true).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.root().unwrap(), ids[1]);
        assert_eq!(tree.distance_to_root(ids[3]).unwrap(), 1.5);
        assert_eq!(tree.distance_to_root(ids[4]).unwrap(), 2.5);
    }

    #[test]
    fn test_delete_root_empties_tree() {
        let (mut tree, ids) = binary();
        tree.delete_subtree(ids[0], true).unwrap();
        assert!(tree.is_empty());
        assert!(tree.is_valid());
        assert_eq!(tree.delete_subtree(ids[0], true), Err(TreeError::NodeNotFound(ids[0])));
    }

    #[test]
    fn test_remove_node() {
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "x", Some(1.0)),
            (0, "C", Some(1.0)),
            (1, "y", Some(0.25)),
            (3, "A", Some(2.0)),
            (3, "B", None),
        ]);
        assert_eq!(tree.remove_node(ids[0]), Err(TreeError::NotSingleChild(ids[0])));
        assert_eq!(tree.remove_node(ids[4]), Err(TreeError::NotSingleChild(ids[4])));
        tree.remove_node(ids[1]).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.children(ids[0]).unwrap(), &[ids[3], ids[2]]);
        assert_eq!(tree[ids[3]].branch_length(), Some(1.25));
        assert_eq!(tree.distance_to_root(ids[4]).unwrap(), 3.25);
    }

    #[test]
    fn test_collapse_subtree_structure() {
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "x", Some(1.0)),
            (0, "E", Some(1.0)),
            (1, "y", Some(0.5)),
            (1, "D", Some(2.0)),
            (3, "A", Some(1.0)),
            (3, "z", None),
            (6, "B", Some(0.25)),
            (6, "C", None),
        ]);
        let x = ids[1];
        tree.collapse_subtree_structure(x).unwrap();
        assert!(tree.is_valid());
        let names: Vec<_> = tree
            .children(x)
            .unwrap()
            .iter()
            .map(|&c| tree[c].name.as_str())
            .collect();
        assert_eq!(names, ["A", "B", "C", "D"]);
        assert_eq!(tree[ids[5]].branch_length(), Some(1.5));
        assert_eq!(tree[ids[7]].branch_length(), Some(0.75));
        assert_eq!(tree[ids[8]].branch_length(), Some(0.5));
        assert_eq!(tree[ids[4]].branch_length(), Some(2.0));
        assert!(!tree.contains(ids[3]));
        assert!(!tree.contains(ids[6]));
        assert_eq!(tree.number_of_external_nodes(), 5);
    }

    #[test]
    fn test_collapse_with_unset_lengths() {
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "x", None),
            (1, "A", None),
            (1, "B", None),
        ]);
        tree.collapse_subtree_structure(ids[0]).unwrap();
        assert_eq!(tree.children(ids[0]).unwrap(), &[ids[2], ids[3]]);
        assert_eq!(tree[ids[2]].branch_length(), None);
    }

    #[test]
    fn test_reroot_at_node_reverses_path() {
        let (mut tree, ids) = trifurcating();
        let before = pairwise_distances(&tree);
        let (root, ab, a, b) = (ids[0], ids[1], ids[4], ids[5]);
        tree.reroot(RerootTarget::Node(ab)).unwrap();
        assert!(tree.is_valid());
        assert!(tree.is_rooted());
        assert_eq!(tree.root().unwrap(), ab);
        assert_eq!(tree.children(ab).unwrap(), &[a, b, root]);
        assert_eq!(tree.children(root).unwrap(), &[ids[2], ids[3]]);
        assert_eq!(tree[root].branch_length(), Some(0.5));
        assert_eq!(tree[ab].branch_length(), None);
        assert_same_distances(&before, &pairwise_distances(&tree));

        // and back again
        tree.reroot(RerootTarget::Node(root)).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.root().unwrap(), root);
        assert_eq!(tree.children(ab).unwrap(), &[a, b]);
        assert_eq!(tree[ab].branch_length(), Some(0.5));
        assert_eq!(tree[root].branch_length(), None);
        assert_same_distances(&before, &pairwise_distances(&tree));
    }

    #[test]
    fn test_reroot_splices_bifurcating_root() {
        let (mut tree, ids) = binary();
        let before = pairwise_distances(&tree);
        let (root, ab, c, a, b) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
        tree.reroot(RerootTarget::Node(a)).unwrap();
        assert!(tree.is_valid());
        assert!(!tree.contains(root));
        assert_eq!(tree.root().unwrap(), a);
        assert_eq!(tree.children(a).unwrap(), &[ab]);
        assert_eq!(tree.children(ab).unwrap(), &[c, b]);
        assert_eq!(tree[c].branch_length(), Some(3.5));
        assert_eq!(tree[ab].branch_length(), Some(1.0));
        assert_same_distances(&before, &pairwise_distances(&tree));
    }

    #[test]
    fn test_reroot_at_root_only_marks_rooted() {
        let (mut tree, ids) = trifurcating();
        tree.set_rooted(false);
        tree.reroot(RerootTarget::Node(ids[0])).unwrap();
        assert!(tree.is_rooted());
        assert_eq!(tree.children(ids[0]).unwrap().len(), 3);
    }

    #[test]
    fn test_reroot_moves_confidences_with_branch() {
        let (mut tree, ids) = trifurcating();
        let (root, ab, a) = (ids[0], ids[1], ids[4]);
        tree.get_mut(ab)
            .unwrap()
            .set_confidence(Confidence::new(95.0, "bootstrap"));
        tree.reroot(RerootTarget::Node(a)).unwrap();
        assert_eq!(tree[root].confidence("bootstrap").unwrap().value, 95.0);
        assert!(tree[ab].confidence("bootstrap").is_none());
        assert_eq!(tree[root].branch_length(), Some(0.5));
    }

    /// `((A:1,B:1)ab:1,(C:1,D:1)cd:1)root`
    fn two_cherries() -> (Tree, Vec<NodeId>) {
        build(&[
            (0, "root", None),
            (0, "ab", Some(1.0)),
            (0, "cd", Some(1.0)),
            (1, "A", Some(1.0)),
            (1, "B", Some(1.0)),
            (2, "C", Some(1.0)),
            (2, "D", Some(1.0)),
        ])
    }

    #[test]
    fn test_reroot_across_bifurcating_root_keeps_confidences() {
        let (mut tree, ids) = two_cherries();
        let (root, ab, cd, c) = (ids[0], ids[1], ids[2], ids[5]);
        tree[cd].set_confidence(Confidence::new(95.0, "bootstrap"));
        let before = pairwise_distances(&tree);

        tree.reroot(RerootTarget::Node(c)).unwrap();
        assert!(tree.is_valid());
        assert!(tree.get(root).is_err());
        // ab now carries the merged root branch
        assert_eq!(tree.parent(ab).unwrap(), Some(cd));
        assert_eq!(tree[ab].branch_length(), Some(2.0));
        assert_eq!(tree[ab].confidence("bootstrap").unwrap().value, 95.0);
        assert_same_distances(&before, &pairwise_distances(&tree));

        // a confidence already on the surviving branch is kept
        let (mut tree, ids) = two_cherries();
        tree[ids[1]].set_confidence(Confidence::new(80.0, "bootstrap"));
        tree[ids[2]].set_confidence(Confidence::new(95.0, "bootstrap"));
        tree[ids[2]].set_confidence(Confidence::new(0.9, "posterior"));
        tree.reroot(RerootTarget::Node(ids[5])).unwrap();
        assert_eq!(tree[ids[1]].confidence("bootstrap").unwrap().value, 80.0);
        assert_eq!(tree[ids[1]].confidence("posterior").unwrap().value, 0.9);
        assert_eq!(tree[ids[1]].confidences().count(), 2);
    }

    #[test]
    fn test_reroot_with_unary_root() {
        // (((A:1,B:2)x:1,C:3)y:1)root
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "y", Some(1.0)),
            (1, "x", Some(1.0)),
            (1, "C", Some(3.0)),
            (2, "A", Some(1.0)),
            (2, "B", Some(2.0)),
        ]);
        let before = pairwise_distances(&tree);
        tree.reroot(RerootTarget::Node(ids[2])).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.root().unwrap(), ids[2]);
        assert!(tree.find_by_name("root").is_none());
        assert!(tree.find_by_name("y").is_none());
        assert_eq!(tree.external_names(), ["A", "B", "C"]);
        assert_eq!(tree[ids[3]].branch_length(), Some(4.0));
        assert_same_distances(&before, &pairwise_distances(&tree));

        // ((A:1,B:2)x:1)root rerooted at A
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "x", Some(1.0)),
            (1, "A", Some(1.0)),
            (1, "B", Some(2.0)),
        ]);
        tree.reroot(RerootTarget::Node(ids[2])).unwrap();
        assert!(tree.is_valid());
        assert!(tree.find_by_name("root").is_none());
        assert_eq!(tree.external_names(), ["B"]);
        assert_eq!(tree.distance_to_root(ids[3]).unwrap(), 3.0);
    }

    #[test]
    fn test_reroot_on_branch_inserts_new_root() {
        let (mut tree, ids) = trifurcating();
        let before = pairwise_distances(&tree);
        let d = ids[3];
        tree.reroot(RerootTarget::Branch {
            node: d,
            distance_from_node: Some(1.0),
        })
        .unwrap();
        assert!(tree.is_valid());
        let root = tree.root().unwrap();
        assert_eq!(tree.children(root).unwrap(), &[d, ids[0]]);
        assert_eq!(tree[d].branch_length(), Some(1.0));
        assert_eq!(tree[ids[0]].branch_length(), Some(3.0));
        assert!(tree[root].name.is_empty());
        assert_same_distances(&before, &pairwise_distances(&tree));
    }

    #[test]
    fn test_reroot_on_root_branch_redistributes() {
        let (mut tree, ids) = binary();
        tree.reroot(RerootTarget::Branch {
            node: ids[2],
            distance_from_node: Some(1.0),
        })
        .unwrap();
        assert_eq!(tree.root().unwrap(), ids[0]);
        assert_eq!(tree[ids[2]].branch_length(), Some(1.0));
        assert_eq!(tree[ids[1]].branch_length(), Some(2.5));

        tree.reroot(RerootTarget::Branch {
            node: ids[1],
            distance_from_node: None,
        })
        .unwrap();
        assert_eq!(tree[ids[1]].branch_length(), Some(1.75));
        assert_eq!(tree[ids[2]].branch_length(), Some(1.75));
    }

    #[test]
    fn test_reroot_rejects_bad_targets() {
        let (mut tree, ids) = binary();
        assert_eq!(
            tree.reroot(RerootTarget::Branch {
                node: ids[3],
                distance_from_node: Some(5.0),
            }),
            Err(TreeError::InvalidBranchPoint {
                node: ids[3],
                distance: 5.0,
                length: 1.0
            })
        );
        assert!(tree
            .reroot(RerootTarget::Branch {
                node: ids[3],
                distance_from_node: Some(-0.1),
            })
            .is_err());
        assert_eq!(
            tree.reroot(RerootTarget::Branch {
                node: ids[0],
                distance_from_node: None,
            }),
            Err(TreeError::RootHasNoBranch)
        );
        assert_eq!(
            tree.reroot(RerootTarget::Node(77)),
            Err(TreeError::NodeNotFound(77))
        );
        // nothing changed
        assert_eq!(tree.root().unwrap(), ids[0]);
        assert_eq!(tree[ids[3]].branch_length(), Some(1.0));
        assert_eq!(tree.number_of_nodes(), 5);
    }

    #[test]
    fn test_midpoint_root() {
        let (mut tree, ids) = build(&[
            (0, "root", None),
            (0, "A", Some(1.0)),
            (0, "B", Some(2.0)),
            (0, "C", Some(7.0)),
        ]);
        let before = pairwise_distances(&tree);
        tree.midpoint_root().unwrap();
        assert!(tree.is_valid());
        assert!(tree.is_rooted());
        let (a, b, c) = (ids[1], ids[2], ids[3]);
        assert!((tree.distance_to_root(b).unwrap() - 4.5).abs() < 1e-9);
        assert!((tree.distance_to_root(c).unwrap() - 4.5).abs() < 1e-9);
        assert!((tree.distance_to_root(a).unwrap() - 3.5).abs() < 1e-9);
        assert!((tree.height() - 4.5).abs() < 1e-9);
        assert_eq!(tree.children(tree.root().unwrap()).unwrap().len(), 2);
        assert_same_distances(&before, &pairwise_distances(&tree));
    }

    #[test]
    fn test_midpoint_root_deep_tree() {
        let (mut tree, _) = build(&[
            (0, "root", None),
            (0, "x", Some(1.0)),
            (0, "D", Some(1.0)),
            (1, "y", Some(1.0)),
            (1, "C", Some(1.0)),
            (3, "A", Some(5.0)),
            (3, "B", Some(1.0)),
        ]);
        let before = pairwise_distances(&tree);
        tree.midpoint_root().unwrap();
        assert!(tree.is_valid());
        // diameter A..D = 8
        let max = tree
            .external_nodes()
            .into_iter()
            .map(|leaf| tree.distance_to_root(leaf).unwrap())
            .fold(0.0, f64::max);
        assert!((max - 4.0).abs() < 1e-9);
        assert_same_distances(&before, &pairwise_distances(&tree));
    }

    #[test]
    fn test_midpoint_root_single_leaf_is_noop() {
        let (mut tree, root) = Tree::with_root(Node::with_name("A"));
        tree.midpoint_root().unwrap();
        assert_eq!(tree.root().unwrap(), root);
        let mut empty = Tree::new();
        empty.midpoint_root().unwrap();
        assert!(empty.is_empty());
    }
}
