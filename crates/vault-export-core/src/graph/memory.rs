/*
 * graph/memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-memory content graph.
 */

use std::collections::{BTreeMap, HashSet};
use std::io;

use super::{ContentGraph, DocumentId, link_candidates};

/// Documents held in memory.
///
/// Used by embedders that already have note text loaded and by tests, which
/// can also make reads of chosen documents fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    documents: BTreeMap<DocumentId, String>,
    failing: HashSet<DocumentId>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<DocumentId>, text: impl Into<String>) {
        self.documents.insert(id.into(), text.into());
    }

    /// Make every read of `id` fail with an I/O error. The document still
    /// resolves.
    pub fn fail_reads(mut self, id: impl Into<DocumentId>) -> Self {
        self.failing.insert(id.into());
        self
    }
}

impl ContentGraph for MemoryGraph {
    fn resolve_link(&self, reference: &str, base: &DocumentId) -> Option<DocumentId> {
        link_candidates(reference, base)
            .into_iter()
            .find(|candidate| self.contains(candidate))
    }

    fn read_document(&self, id: &DocumentId) -> io::Result<String> {
        if self.failing.contains(id) {
            return Err(io::Error::other(format!("read of {} failed", id)));
        }
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, id.to_string()))
    }

    fn list_documents(&self, search_root: Option<&str>) -> Vec<DocumentId> {
        let prefix = search_root
            .map(|root| root.trim().trim_matches('/'))
            .filter(|root| !root.is_empty())
            .map(|root| format!("{}/", root));
        self.documents
            .keys()
            .filter(|id| match &prefix {
                Some(prefix) => id.as_str().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect()
    }

    fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_graph_reads_and_lists() {
        let graph = MemoryGraph::new()
            .with_document("a.md", "A")
            .with_document("img/b.png", "")
            .with_document("img/c.png", "");
        assert_eq!(graph.read_document(&"a.md".into()).unwrap(), "A");
        assert_eq!(graph.list_documents(Some("img")).len(), 2);
        assert_eq!(graph.list_documents(None).len(), 3);
    }

    #[test]
    fn test_failing_reads() {
        let graph = MemoryGraph::new()
            .with_document("a.md", "A")
            .fail_reads("a.md");
        assert!(graph.contains(&"a.md".into()));
        assert!(graph.read_document(&"a.md".into()).is_err());
    }
}
