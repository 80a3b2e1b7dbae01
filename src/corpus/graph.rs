use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One linkable note in the vault.
///
/// `index` is the document's position in the fixed ordering shared by the
/// matrix, the folder squares and the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub index: usize,
    pub path: String,
    pub display_name: String,
}

/// Source of documents and resolved links consumed by the matrix builder.
pub trait LinkGraph {
    fn documents(&self) -> &[Document];

    fn is_linked(&self, from: usize, to: usize) -> bool;

    fn document_count(&self) -> usize {
        self.documents().len()
    }
}

/// Link graph collected from a folder of markdown notes.
///
/// Resolved links are stored as one target set per document, so
/// [`LinkGraph::is_linked`] is O(1) and a full matrix build stays O(N²).
#[derive(Clone, Debug)]
pub struct VaultGraph {
    pub root: PathBuf,
    pub documents: Vec<Document>,
    pub targets: Vec<HashSet<usize>>,
    pub link_count: usize,
}

impl VaultGraph {
    pub fn new(root: PathBuf, documents: Vec<Document>, targets: Vec<HashSet<usize>>) -> Self {
        let link_count = targets.iter().map(HashSet::len).sum();
        Self {
            root,
            documents,
            targets,
            link_count,
        }
    }

    pub fn absolute_path(&self, index: usize) -> Option<PathBuf> {
        self.documents
            .get(index)
            .map(|document| join_vault_path(&self.root, &document.path))
    }

    pub fn incoming_count(&self, index: usize) -> usize {
        self.targets
            .iter()
            .filter(|targets| targets.contains(&index))
            .count()
    }

    pub fn outgoing_count(&self, index: usize) -> usize {
        self.targets.get(index).map_or(0, HashSet::len)
    }
}

impl LinkGraph for VaultGraph {
    fn documents(&self) -> &[Document] {
        &self.documents
    }

    fn is_linked(&self, from: usize, to: usize) -> bool {
        self.targets
            .get(from)
            .is_some_and(|targets| targets.contains(&to))
    }
}

pub fn join_vault_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> VaultGraph {
        let documents = ["a.md", "notes/b.md", "notes/c.md"]
            .iter()
            .enumerate()
            .map(|(index, path)| Document {
                index,
                path: (*path).to_owned(),
                display_name: path.trim_end_matches(".md").rsplit('/').next().unwrap().to_owned(),
            })
            .collect();
        let targets = vec![
            HashSet::from([1, 2]),
            HashSet::from([2]),
            HashSet::new(),
        ];
        VaultGraph::new(PathBuf::from("/vault"), documents, targets)
    }

    #[test]
    fn link_predicate_reads_target_sets() {
        let graph = graph();
        assert!(graph.is_linked(0, 1));
        assert!(graph.is_linked(1, 2));
        assert!(!graph.is_linked(2, 0));
        assert!(!graph.is_linked(7, 0));
        assert_eq!(graph.link_count, 3);
    }

    #[test]
    fn counts_incoming_and_outgoing_links() {
        let graph = graph();
        assert_eq!(graph.outgoing_count(0), 2);
        assert_eq!(graph.incoming_count(2), 2);
        assert_eq!(graph.incoming_count(0), 0);
        assert_eq!(graph.outgoing_count(9), 0);
    }

    #[test]
    fn absolute_path_joins_vault_relative_parts() {
        let graph = graph();
        assert_eq!(
            graph.absolute_path(1),
            Some(PathBuf::from("/vault").join("notes").join("b.md"))
        );
        assert_eq!(graph.absolute_path(3), None);
    }
}
