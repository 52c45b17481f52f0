//! Reading Newick trees through `phylotree` and writing result tables.
//!
//! The core never parses text itself; this module turns parser output into a
//! fully built [`Tree`] and annotates it on the way (species ids taken from
//! leaf names, support values from numeric internal labels).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use phylotree::tree::Tree as PhyloTree;
use tracing::debug;

use crate::annotation::{Confidence, Taxonomy};
use crate::error::ReadError;
use crate::node::{Node, NodeId};
use crate::support::BOOTSTRAP;
use crate::tree::Tree;

/// Where the species id of a leaf comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeciesSource {
    /// Leaves get no taxonomy
    #[default]
    None,
    /// The whole leaf name is the species code (species trees)
    LeafName,
    /// The part of the leaf name after the last separator is the species
    /// code, e.g. `BCL2_HUMAN` with `_`. Names without the separator get
    /// no taxonomy.
    NameSuffix(char),
}

impl SpeciesSource {
    fn species_of(self, name: &str) -> Option<&str> {
        let species = match self {
            SpeciesSource::None => None,
            SpeciesSource::LeafName => Some(name),
            SpeciesSource::NameSuffix(separator) => {
                name.rsplit_once(separator).map(|(_, suffix)| suffix)
            }
        };
        species.filter(|s| !s.is_empty())
    }
}

/// How parsed trees are annotated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadOptions {
    pub species: SpeciesSource,
    /// Read numeric labels of internal nodes as `bootstrap` confidences
    /// instead of names
    pub internal_labels_as_support: bool,
}

impl ReadOptions {
    pub fn with_species(mut self, species: SpeciesSource) -> Self {
        self.species = species;
        self
    }

    pub fn with_support_labels(mut self, internal_labels_as_support: bool) -> Self {
        self.internal_labels_as_support = internal_labels_as_support;
        self
    }
}

/// Parses one Newick tree.
///
/// A tree whose root has at most two children counts as rooted; a
/// trifurcating root marks an unrooted tree.
pub fn tree_from_newick(newick: &str, options: &ReadOptions) -> Result<Tree, ReadError> {
    let parsed =
        PhyloTree::from_newick(newick.trim()).map_err(|e| ReadError::Parse(e.to_string()))?;
    from_phylotree(&parsed, options)
}

/// Converts a tree built by `phylotree`, keeping child order.
pub fn from_phylotree(parsed: &PhyloTree, options: &ReadOptions) -> Result<Tree, ReadError> {
    let source_root = parsed
        .get_root()
        .map_err(|e| ReadError::Parse(e.to_string()))?;

    let mut tree = Tree::new();
    let mut stack = vec![(source_root, None::<NodeId>)];
    while let Some((source_id, parent)) = stack.pop() {
        let source = parsed
            .get(&source_id)
            .map_err(|e| ReadError::Parse(e.to_string()))?;
        let is_leaf = source.children.is_empty();

        let mut node = Node::new();
        node.set_branch_length(source.parent_edge)?;
        let label = source.name.clone().unwrap_or_default();
        match label.parse::<f64>() {
            Ok(value) if !is_leaf && options.internal_labels_as_support => {
                node.set_confidence(Confidence::new(value, BOOTSTRAP));
            }
            _ => node.name = label,
        }
        if is_leaf {
            if let Some(species) = options.species.species_of(&node.name) {
                node.add_taxonomy(Taxonomy::from_code(species));
            }
        }

        let id = match parent {
            None => tree.add_root(node),
            Some(parent) => tree.add_child(parent, node)?,
        };
        // reversed so that the first child is converted first
        for &child in source.children.iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    let root = tree.root()?;
    let rooted = tree[root].children().len() <= 2;
    tree.set_rooted(rooted);
    Ok(tree)
}

/// Splits Newick text into the individual trees, each ending in `;`.
fn newick_statements(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s};"))
}

/// Reads every tree of a Newick file (one or more trees, each terminated by
/// `;`).
///
/// # Errors
/// Fails on the first tree that cannot be parsed, and with
/// [`ReadError::Empty`] when the file holds no tree at all.
pub fn read_newick_file<P: AsRef<Path>>(
    path: P,
    options: &ReadOptions,
) -> Result<Vec<Tree>, ReadError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let trees = newick_statements(&content)
        .map(|newick| tree_from_newick(&newick, options))
        .collect::<Result<Vec<_>, _>>()?;
    if trees.is_empty() {
        return Err(ReadError::Empty(path.to_path_buf()));
    }
    debug!(count = trees.len(), path = %path.display(), "Read trees");
    Ok(trees)
}

/// Write a table with a header row as TSV.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// `-` (stdout) is not supported.
pub fn write_table_tsv<P, S, T>(path: P, header: &[S], rows: &[Vec<T>]) -> io::Result<()>
where
    P: AsRef<Path>,
    S: std::fmt::Display,
    T: std::fmt::Display,
{
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "writing to stdout is not supported by write_table_tsv",
        ));
    }

    let is_gz = p.to_string_lossy().ends_with(".gz");

    let mut out: Box<dyn Write> = if is_gz {
        let f = File::create(p)?;
        let enc = GzEncoder::new(f, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    write_row(&mut out, header)?;
    for row in rows {
        write_row(&mut out, row)?;
    }

    out.flush()?;
    Ok(())
}

fn write_row<W: Write, T: std::fmt::Display>(out: &mut W, cells: &[T]) -> io::Result<()> {
    for (k, cell) in cells.iter().enumerate() {
        if k > 0 {
            write!(out, "\t")?;
        }
        write!(out, "{cell}")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_species_sources() {
        assert_eq!(SpeciesSource::LeafName.species_of("HUMAN"), Some("HUMAN"));
        assert_eq!(
            SpeciesSource::NameSuffix('_').species_of("BCL2_L1_MOUSE"),
            Some("MOUSE")
        );
        assert_eq!(SpeciesSource::NameSuffix('_').species_of("BCL2"), None);
        assert_eq!(SpeciesSource::NameSuffix('_').species_of("BCL2_"), None);
        assert_eq!(SpeciesSource::None.species_of("HUMAN"), None);
    }

    #[test]
    fn test_tree_from_newick() {
        let options = ReadOptions::default()
            .with_species(SpeciesSource::NameSuffix('_'))
            .with_support_labels(true);
        let tree = tree_from_newick("((A_HUMAN:1,B_MOUSE:2)95:0.5,C_RAT:3);", &options).unwrap();
        assert!(tree.is_rooted());
        assert!(tree.is_valid());
        assert_eq!(tree.external_names(), ["A_HUMAN", "B_MOUSE", "C_RAT"]);

        let a = tree.find_by_name("A_HUMAN").unwrap();
        assert_eq!(tree[a].branch_length(), Some(1.0));
        assert_eq!(tree[a].taxonomy().unwrap().code.as_deref(), Some("HUMAN"));

        let ab = tree.parent(a).unwrap().unwrap();
        assert_eq!(tree[ab].name, "");
        assert_eq!(tree[ab].confidence(BOOTSTRAP).unwrap().value, 95.0);
        assert_eq!(tree[ab].branch_length(), Some(0.5));

        let unrooted = tree_from_newick("(A,B,C);", &ReadOptions::default()).unwrap();
        assert!(!unrooted.is_rooted());
        assert!(tree_from_newick("((A,B);", &ReadOptions::default()).is_err());
    }

    #[test]
    fn test_newick_statements() {
        let trees: Vec<String> = newick_statements("(A,B);\n\n((A,B),C);\n").collect();
        assert_eq!(trees, ["(A,B);", "((A,B),C);"]);
        assert_eq!(newick_statements("  \n").count(), 0);
    }

    #[test]
    fn test_write_table_plain_and_gz() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![vec!["a".to_string(), "1".to_string()], vec!["b".to_string(), "2".to_string()]];

        let plain = dir.path().join("table.tsv");
        write_table_tsv(&plain, &["name", "count"], &rows).unwrap();
        assert_eq!(
            fs::read_to_string(&plain).unwrap(),
            "name\tcount\na\t1\nb\t2\n"
        );

        let gz = dir.path().join("table.tsv.gz");
        write_table_tsv(&gz, &["name", "count"], &rows).unwrap();
        let mut text = String::new();
        GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "name\tcount\na\t1\nb\t2\n");

        assert!(write_table_tsv("-", &["x"], &rows).is_err());
    }

    #[test]
    fn test_read_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.nwk");
        assert!(matches!(
            read_newick_file(&missing, &ReadOptions::default()),
            Err(ReadError::Io(_))
        ));

        let empty = dir.path().join("empty.nwk");
        fs::write(&empty, "\n").unwrap();
        assert!(matches!(
            read_newick_file(&empty, &ReadOptions::default()),
            Err(ReadError::Empty(_))
        ));
    }
}
