/*
 * graph/vault.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Filesystem-backed content graph.
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ContentGraph, DocumentId, is_hidden, link_candidates};

/// A vault directory on disk.
///
/// Document identifiers are paths relative to the vault root. Hidden
/// directories such as `.obsidian`, `.git` and `.trash` are never listed.
#[derive(Debug, Clone)]
pub struct VaultGraph {
    root: PathBuf,
}

impl VaultGraph {
    /// Open a vault rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// The identifier of a file inside the vault, if it is inside.
    pub fn id_for_path(&self, path: &Path) -> Option<DocumentId> {
        let absolute = if path.is_absolute() {
            path.canonicalize().ok()?
        } else {
            self.root.join(path).canonicalize().ok()?
        };
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(DocumentId::new(parts.join("/")))
        }
    }

    /// Absolute path of a document.
    pub fn path_of(&self, id: &DocumentId) -> PathBuf {
        id.as_str()
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ContentGraph for VaultGraph {
    fn resolve_link(&self, reference: &str, base: &DocumentId) -> Option<DocumentId> {
        link_candidates(reference, base)
            .into_iter()
            .find(|candidate| self.contains(candidate))
    }

    fn read_document(&self, id: &DocumentId) -> io::Result<String> {
        fs::read_to_string(self.path_of(id))
    }

    fn list_documents(&self, search_root: Option<&str>) -> Vec<DocumentId> {
        let start = match search_root {
            Some(dir) if !dir.trim().is_empty() => self.path_of(&DocumentId::new(dir.trim())),
            _ => self.root.clone(),
        };

        let mut documents: Vec<DocumentId> = WalkDir::new(&start)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !is_hidden(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable vault entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.id_for_path(entry.path()))
            .collect();
        documents.sort();
        documents
    }

    fn contains(&self, id: &DocumentId) -> bool {
        !id.as_str().is_empty() && self.path_of(id).is_file()
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault() -> (TempDir, VaultGraph) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("notes/sub")).unwrap();
        fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
        fs::write(dir.path().join("index.md"), "# Index").unwrap();
        fs::write(dir.path().join("notes/a.md"), "A").unwrap();
        fs::write(dir.path().join("notes/sub/b.md"), "B").unwrap();
        fs::write(dir.path().join(".obsidian/app.json"), "{}").unwrap();
        let graph = VaultGraph::open(dir.path()).unwrap();
        (dir, graph)
    }

    #[test]
    fn test_list_documents_skips_hidden() {
        let (_dir, graph) = vault();
        let ids: Vec<String> = graph
            .list_documents(None)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["index.md", "notes/a.md", "notes/sub/b.md"]);
    }

    #[test]
    fn test_list_documents_in_search_root() {
        let (_dir, graph) = vault();
        let ids = graph.list_documents(Some("notes/sub"));
        assert_eq!(ids, vec![DocumentId::new("notes/sub/b.md")]);
    }

    #[test]
    fn test_resolve_relative_then_root() {
        let (_dir, graph) = vault();
        let base = DocumentId::new("notes/a.md");
        assert_eq!(
            graph.resolve_link("sub/b", &base),
            Some(DocumentId::new("notes/sub/b.md"))
        );
        assert_eq!(
            graph.resolve_link("index", &base),
            Some(DocumentId::new("index.md"))
        );
        assert_eq!(graph.resolve_link("missing", &base), None);
    }

    #[test]
    fn test_read_document() {
        let (_dir, graph) = vault();
        assert_eq!(
            graph.read_document(&DocumentId::new("notes/a.md")).unwrap(),
            "A"
        );
        assert!(graph.read_document(&DocumentId::new("nope.md")).is_err());
    }

    #[test]
    fn test_id_for_path() {
        let (dir, graph) = vault();
        assert_eq!(
            graph.id_for_path(&dir.path().join("notes/sub/b.md")),
            Some(DocumentId::new("notes/sub/b.md"))
        );
        assert_eq!(graph.id_for_path(Path::new("/definitely/outside.md")), None);
    }
}
