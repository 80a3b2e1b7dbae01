use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use super::graph::{Document, VaultGraph, join_vault_path};
use super::parse::{LinkRef, extract_links};

/// Enumerates the markdown notes under `root` and resolves their links.
///
/// Notes are ordered by folder components first and file name second, so
/// every folder's notes (and its subfolders' notes) stay contiguous.
pub fn collect_vault(root: &Path) -> Result<VaultGraph> {
    let root = root
        .canonicalize()
        .with_context(|| format!("failed to resolve vault path {}", root.display()))?;
    if !root.is_dir() {
        bail!("vault path {} is not a folder", root.display());
    }

    let mut paths = Vec::new();
    walk_markdown(&root, "", &mut paths)
        .with_context(|| format!("failed to list notes under {}", root.display()))?;
    paths.sort_by(|a, b| order_key(a).cmp(&order_key(b)));

    let documents = paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| Document {
            index,
            display_name: file_stem(&path).to_owned(),
            path,
        })
        .collect::<Vec<_>>();

    let index = LinkIndex::new(&documents);
    let mut targets = Vec::with_capacity(documents.len());
    let mut unresolved = 0usize;

    for document in &documents {
        let absolute = join_vault_path(&root, &document.path);
        let text = match fs::read(&absolute) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(error) => {
                warn!(path = %absolute.display(), %error, "skipping unreadable note");
                targets.push(HashSet::new());
                continue;
            }
        };

        let mut resolved = HashSet::new();
        for link in extract_links(&text) {
            match index.resolve(&link, document) {
                Some(target) => {
                    resolved.insert(target);
                }
                None => unresolved += 1,
            }
        }
        targets.push(resolved);
    }

    let graph = VaultGraph::new(root, documents, targets);
    info!(
        documents = graph.documents.len(),
        links = graph.link_count,
        unresolved,
        "collected vault"
    );
    Ok(graph)
}

fn walk_markdown(folder: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        if file_type.is_dir() {
            if let Err(error) = walk_markdown(&entry.path(), &relative, out) {
                warn!(folder = %relative, %error, "skipping unreadable folder");
            }
        } else if file_type.is_file() && has_markdown_extension(&name) {
            out.push(relative);
        } else if file_type.is_symlink() {
            debug!(path = %relative, "not following symlink");
        }
    }

    Ok(())
}

fn has_markdown_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("md"))
}

fn order_key(path: &str) -> (Vec<&str>, &str) {
    let mut parts = path.split('/').collect::<Vec<_>>();
    let file = parts.pop().unwrap_or(path);
    (parts, file)
}

fn file_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    strip_markdown_extension(file)
}

fn strip_markdown_extension(value: &str) -> &str {
    let len = value.len();
    if len > 3 && value.is_char_boundary(len - 3) && value[len - 3..].eq_ignore_ascii_case(".md") {
        &value[..len - 3]
    } else {
        value
    }
}

fn folder_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(folder, _)| folder)
}

/// Lookup tables keyed by lowercase vault path (without `.md`) and stem.
struct LinkIndex<'a> {
    documents: &'a [Document],
    by_path: HashMap<String, usize>,
    by_stem: HashMap<String, Vec<usize>>,
}

impl<'a> LinkIndex<'a> {
    fn new(documents: &'a [Document]) -> Self {
        let mut by_path = HashMap::with_capacity(documents.len());
        let mut by_stem: HashMap<String, Vec<usize>> = HashMap::new();

        for document in documents {
            by_path.insert(path_key(&document.path), document.index);
            by_stem
                .entry(document.display_name.to_lowercase())
                .or_default()
                .push(document.index);
        }

        Self {
            documents,
            by_path,
            by_stem,
        }
    }

    fn resolve(&self, link: &LinkRef, source: &Document) -> Option<usize> {
        match link {
            LinkRef::Wiki(target) => self.resolve_wiki(target, source),
            LinkRef::Relative(target) => {
                let joined = normalize_relative(folder_of(&source.path), target)?;
                self.by_path.get(&path_key(&joined)).copied()
            }
        }
    }

    fn resolve_wiki(&self, target: &str, source: &Document) -> Option<usize> {
        let key = path_key(target.trim_start_matches('/'));

        if key.contains('/') {
            if let Some(&index) = self.by_path.get(&key) {
                return Some(index);
            }
            let stem = key.rsplit('/').next().unwrap_or(&key);
            let suffix = format!("/{key}");
            return self.by_stem.get(stem).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .find(|&index| path_key(&self.documents[index].path).ends_with(&suffix))
            });
        }

        let candidates = self.by_stem.get(&key)?;
        let source_folder = folder_of(&source.path);
        candidates
            .iter()
            .copied()
            .find(|&index| folder_of(&self.documents[index].path) == source_folder)
            .or_else(|| candidates.first().copied())
    }
}

fn path_key(path: &str) -> String {
    strip_markdown_extension(path).to_lowercase()
}

fn normalize_relative(folder: &str, target: &str) -> Option<String> {
    let mut parts = if target.starts_with('/') {
        Vec::new()
    } else {
        folder
            .split('/')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
    };

    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LinkGraph;

    fn write(root: &Path, relative: &str, text: &str) {
        let path = join_vault_path(root, relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn orders_notes_by_folder_then_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "zeta.md", "");
        write(dir.path(), "alpha.md", "");
        write(dir.path(), "b/one.md", "");
        write(dir.path(), "a/sub/deep.md", "");
        write(dir.path(), "a/top.md", "");
        write(dir.path(), "a/notes.txt", "ignored");
        write(dir.path(), ".obsidian/hidden.md", "");

        let graph = collect_vault(dir.path()).unwrap();
        let paths = graph
            .documents
            .iter()
            .map(|document| document.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec!["alpha.md", "zeta.md", "a/top.md", "a/sub/deep.md", "b/one.md"]
        );
        assert!(graph.documents.iter().enumerate().all(|(i, d)| d.index == i));
        assert_eq!(graph.documents[3].display_name, "deep");
    }

    #[test]
    fn resolves_wikilinks_and_relative_links() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "home.md", "[[Plan]] [[a/sub/deep#x|alias]] [[missing]]");
        write(dir.path(), "a/plan.md", "[up](../home.md) [[plan]]");
        write(dir.path(), "a/sub/deep.md", "[[Plan]]");
        write(dir.path(), "b/plan.md", "");

        let graph = collect_vault(dir.path()).unwrap();
        let position = |path: &str| {
            graph
                .documents
                .iter()
                .position(|document| document.path == path)
                .unwrap()
        };
        let home = position("home.md");
        let a_plan = position("a/plan.md");
        let deep = position("a/sub/deep.md");
        let b_plan = position("b/plan.md");

        assert!(graph.is_linked(home, a_plan));
        assert!(graph.is_linked(home, deep));
        assert!(graph.is_linked(a_plan, home));
        assert!(graph.is_linked(a_plan, a_plan));
        assert!(graph.is_linked(deep, a_plan));
        assert!(!graph.is_linked(home, b_plan));
        assert_eq!(graph.link_count, 5);
    }

    #[test]
    fn empty_vault_has_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let graph = collect_vault(dir.path()).unwrap();
        assert!(graph.documents.is_empty());
        assert_eq!(graph.link_count, 0);
    }

    #[test]
    fn missing_vault_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_vault(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn relative_paths_cannot_escape_the_vault() {
        assert_eq!(normalize_relative("a", "../../x.md"), None);
        assert_eq!(
            normalize_relative("a/b", "./../c.md"),
            Some("a/c.md".to_owned())
        );
    }
}
