//! Compact tree fixtures for unit tests.

use crate::annotation::Taxonomy;
use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// Builds a rooted tree from a minimal Newick subset: nested parentheses,
/// comma-separated children, optional labels and optional `:length`.
pub(crate) fn tree(newick: &str) -> Tree {
    let mut tree = Tree::new();
    let mut chars = newick.trim().trim_end_matches(';').chars().peekable();
    parse_node(&mut tree, None, &mut chars);
    tree.set_rooted(true);
    tree
}

fn parse_node(
    tree: &mut Tree,
    parent: Option<NodeId>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> NodeId {
    let id = match parent {
        None => tree.add_root(Node::new()),
        Some(p) => tree.add_child(p, Node::new()).unwrap(),
    };
    if chars.peek() == Some(&'(') {
        chars.next();
        loop {
            parse_node(tree, Some(id), chars);
            match chars.next() {
                Some(',') => continue,
                Some(')') => break,
                other => panic!("unexpected {other:?} in test newick"),
            }
        }
    }
    let mut label = String::new();
    while let Some(&c) = chars.peek() {
        if matches!(c, ',' | ')' | '(') {
            break;
        }
        label.push(c);
        chars.next();
    }
    let (name, length) = match label.split_once(':') {
        Some((name, length)) => (name, Some(length.parse::<f64>().unwrap())),
        None => (label.as_str(), None),
    };
    let node = tree.get_mut(id).unwrap();
    node.name = name.to_string();
    node.set_branch_length(length).unwrap();
    id
}

/// Same as [`tree`], with every leaf's name copied into its taxonomy code.
pub(crate) fn species_tree(newick: &str) -> Tree {
    let mut tree = tree(newick);
    for leaf in tree.external_nodes() {
        let node = tree.get_mut(leaf).unwrap();
        let code = node.name.clone();
        node.add_taxonomy(Taxonomy::from_code(code));
    }
    tree
}

/// Gene tree whose leaves are named `SPECIES` or `gene_SPECIES`; the part
/// after the last `_` becomes the taxonomy code.
pub(crate) fn gene_tree(newick: &str) -> Tree {
    let mut tree = tree(newick);
    for leaf in tree.external_nodes() {
        let node = tree.get_mut(leaf).unwrap();
        let code = node
            .name
            .rsplit('_')
            .next()
            .unwrap_or_default()
            .to_string();
        node.add_taxonomy(Taxonomy::from_code(code));
    }
    tree
}

pub(crate) fn id(tree: &Tree, name: &str) -> NodeId {
    tree.find_by_name(name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

#[test]
fn test_fixture_parser() {
    let t = tree("((A:1,B:2)ab:0.5,C:3)root;");
    assert_eq!(t.external_names(), ["A", "B", "C"]);
    assert_eq!(t[id(&t, "ab")].branch_length(), Some(0.5));
    assert_eq!(t[t.root().unwrap()].name, "root");
    assert!(t.is_valid());
}
