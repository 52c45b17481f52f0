//! Tree nodes.
//!
//! A [`Node`] is stored in the arena of its [`Tree`](crate::tree::Tree) and
//! refers to its parent and children by [`NodeId`] only.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::annotation::{Annotation, Confidence, Event, Sequence, Taxonomy};
use crate::error::TreeError;

/// Index of a node in the arena of its tree.
pub type NodeId = usize;

/// A node id together with the serial of the node it was taken from, so
/// that it cannot silently address a node of another tree.
///
/// Obtained from [`Tree::node_ref`](crate::tree::Tree::node_ref) and checked
/// by [`Tree::resolve`](crate::tree::Tree::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) id: NodeId,
    pub(crate) serial: u64,
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

/// Length of the branch leading to a node; `None` means unset.
pub type BranchLength = Option<f64>;

static NODE_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Next process-unique node serial.
pub(crate) fn next_serial() -> u64 {
    NODE_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// Adds two branch lengths, where unset only wins if both are unset.
pub fn add_branch_lengths(a: BranchLength, b: BranchLength) -> BranchLength {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

/// A node of a phylogenetic tree.
#[derive(Debug, Clone)]
pub struct Node {
    serial: u64,
    pub name: String,
    branch_length: BranchLength,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Collapsed nodes are reported as leaves by the collapse-aware external iterator
    pub collapsed: bool,
    pub annotations: Vec<Annotation>,
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

impl Node {
    /// Creates an unnamed node with unset branch length.
    pub fn new() -> Self {
        Node {
            serial: next_serial(),
            name: String::new(),
            branch_length: None,
            parent: None,
            children: Vec::new(),
            collapsed: false,
            annotations: Vec::new(),
        }
    }

    pub fn with_name<S: Into<String>>(name: S) -> Self {
        let mut node = Node::new();
        node.name = name.into();
        node
    }

    /// Creates a named node with the given branch length.
    ///
    /// # Errors
    /// Returns [`TreeError::NegativeBranchLength`] for negative lengths.
    pub fn with_name_and_length<S: Into<String>>(
        name: S,
        branch_length: f64,
    ) -> Result<Self, TreeError> {
        let mut node = Node::with_name(name);
        node.set_branch_length(Some(branch_length))?;
        Ok(node)
    }

    /// Process-unique serial assigned at construction. Identity only, not an ordering key.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn refresh_serial(&mut self) {
        self.serial = next_serial();
    }

    pub fn branch_length(&self) -> BranchLength {
        self.branch_length
    }

    /// Branch length with unset treated as zero.
    pub fn branch_length_or_zero(&self) -> f64 {
        self.branch_length.unwrap_or(0.0)
    }

    pub fn set_branch_length(&mut self, branch_length: BranchLength) -> Result<(), TreeError> {
        if let Some(length) = branch_length {
            if length < 0.0 || length.is_nan() {
                return Err(TreeError::NegativeBranchLength(length));
            }
        }
        self.branch_length = branch_length;
        Ok(())
    }

    /// Sets a length already known to be valid.
    pub(crate) fn set_branch_length_unchecked(&mut self, branch_length: BranchLength) {
        debug_assert!(branch_length.is_none_or(|l| l >= 0.0));
        self.branch_length = branch_length;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_external(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn confidences(&self) -> impl Iterator<Item = &Confidence> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Confidence(c) => Some(c),
            _ => None,
        })
    }

    /// First confidence of the given kind, if any.
    pub fn confidence(&self, kind: &str) -> Option<&Confidence> {
        self.confidences().find(|c| c.kind == kind)
    }

    /// Replaces any confidence of the same kind.
    pub fn set_confidence(&mut self, confidence: Confidence) {
        self.annotations
            .retain(|a| !matches!(a, Annotation::Confidence(c) if c.kind == confidence.kind));
        self.annotations.push(Annotation::Confidence(confidence));
    }

    /// Removes and returns all branch annotations (confidences).
    pub(crate) fn take_branch_data(&mut self) -> Vec<Annotation> {
        let (branch, node): (Vec<_>, Vec<_>) = std::mem::take(&mut self.annotations)
            .into_iter()
            .partition(Annotation::is_branch_data);
        self.annotations = node;
        branch
    }

    pub(crate) fn put_branch_data(&mut self, branch: Vec<Annotation>) {
        self.annotations.extend(branch);
    }

    pub fn taxonomy(&self) -> Option<&Taxonomy> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Taxonomy(t) => Some(t),
            _ => None,
        })
    }

    pub fn add_taxonomy(&mut self, taxonomy: Taxonomy) {
        self.annotations.push(Annotation::Taxonomy(taxonomy));
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Sequence(s) => Some(s),
            _ => None,
        })
    }

    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.annotations.push(Annotation::Sequence(sequence));
    }

    pub fn event(&self) -> Option<&Event> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Event(e) => Some(e),
            _ => None,
        })
    }

    /// Sets the event of this node, replacing a previous one.
    pub fn set_event(&mut self, event: Event) {
        self.annotations.retain(|a| !matches!(a, Annotation::Event(_)));
        self.annotations.push(Annotation::Event(event));
    }

    pub fn is_duplication(&self) -> bool {
        self.event().is_some_and(Event::is_duplication)
    }
}
