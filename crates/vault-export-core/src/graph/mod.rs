/*
 * graph/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Content graph abstraction.
 */

//! The collection of documents a note can link to.
//!
//! The pipeline never touches the filesystem directly when following links.
//! Everything goes through [`ContentGraph`], so a host application can serve
//! documents from its own index and tests can use [`MemoryGraph`].

mod memory;
mod vault;

use std::fmt;
use std::io;
use std::path::Path;

pub use memory::MemoryGraph;
pub use vault::VaultGraph;

/// Extensions read as note text rather than embedded as images.
const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Graph-relative identifier of a stored document.
///
/// Identifiers use forward slashes regardless of platform and never start
/// with `/` or `./`, e.g. `notes/Chapter 1.md`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        let mut trimmed = path.as_str();
        loop {
            if let Some(rest) = trimmed.strip_prefix("./") {
                trimmed = rest;
            } else if let Some(rest) = trimmed.strip_prefix('/') {
                trimmed = rest;
            } else {
                break;
            }
        }
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Extension of the last segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => Some(&name[idx + 1..]),
            _ => None,
        }
    }

    /// Directory part, `""` for documents at the graph root.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Whether the document is read as text (a note) when embedded.
    ///
    /// Extension-less identifiers count as notes.
    pub fn is_text(&self) -> bool {
        match self.extension() {
            None => true,
            Some(ext) => TEXT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known)),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A host-provided collection of documents.
///
/// Implementations must be shareable across threads: sibling embeds may be
/// read concurrently.
pub trait ContentGraph: Send + Sync {
    /// Resolve a link target the way the host's own link index would,
    /// relative to the document containing the link.
    fn resolve_link(&self, reference: &str, base: &DocumentId) -> Option<DocumentId>;

    /// Read a document's full text.
    fn read_document(&self, id: &DocumentId) -> io::Result<String>;

    /// All documents, optionally restricted to a graph-relative directory,
    /// in sorted order.
    fn list_documents(&self, search_root: Option<&str>) -> Vec<DocumentId>;

    /// Whether a document with exactly this identifier exists.
    fn contains(&self, id: &DocumentId) -> bool;

    /// Directory on disk that graph-relative paths are relative to, if any.
    fn root(&self) -> Option<&Path> {
        None
    }
}

/// Candidate identifiers for `reference` as written in `base`.
///
/// Relative to the linking document's directory first, then relative to the
/// graph root; each with and without an implicit `.md`.
pub(crate) fn link_candidates(reference: &str, base: &DocumentId) -> Vec<DocumentId> {
    let reference = reference.trim().replace('\\', "/");
    let mut candidates = Vec::new();
    if reference.is_empty() {
        return candidates;
    }

    let mut bases = Vec::new();
    if !reference.starts_with('/') && !base.parent().is_empty() {
        bases.push(base.parent());
    }
    bases.push("");

    for dir in bases {
        let Some(joined) = join_relative(dir, &reference) else {
            continue;
        };
        let with_md = format!("{}.md", joined);
        for candidate in [joined, with_md] {
            let id = DocumentId::new(candidate);
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        }
    }
    candidates
}

/// Join `reference` onto `dir`, folding `.` and `..` segments.
///
/// Returns `None` when the path would leave the graph root.
pub(crate) fn join_relative(dir: &str, reference: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let leading = if reference.starts_with('/') { "" } else { dir };
    for segment in leading.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Whether `entry` is a hidden file or directory (`.obsidian`, `.git`, ...).
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_normalizes() {
        assert_eq!(DocumentId::new("./notes\\a.md").as_str(), "notes/a.md");
        assert_eq!(DocumentId::new("/a.md").as_str(), "a.md");
    }

    #[test]
    fn test_document_id_parts() {
        let id = DocumentId::new("notes/Chapter 1.md");
        assert_eq!(id.file_name(), "Chapter 1.md");
        assert_eq!(id.stem(), "Chapter 1");
        assert_eq!(id.extension(), Some("md"));
        assert_eq!(id.parent(), "notes");
        assert_eq!(DocumentId::new("top.md").parent(), "");
    }

    #[test]
    fn test_is_text() {
        assert!(DocumentId::new("a.md").is_text());
        assert!(DocumentId::new("a.MARKDOWN").is_text());
        assert!(DocumentId::new("notes/README").is_text());
        assert!(!DocumentId::new("img/plot.png").is_text());
        assert!(!DocumentId::new("paper.pdf").is_text());
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("a/b", "c.md").as_deref(), Some("a/b/c.md"));
        assert_eq!(join_relative("a/b", "../c.md").as_deref(), Some("a/c.md"));
        assert_eq!(join_relative("a", "/c.md").as_deref(), Some("c.md"));
        assert_eq!(join_relative("", "../c.md"), None);
    }

    #[test]
    fn test_link_candidates_order() {
        let base = DocumentId::new("notes/index.md");
        let candidates: Vec<String> = link_candidates("Other", &base)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(
            candidates,
            vec!["notes/Other", "notes/Other.md", "Other", "Other.md"]
        );
    }
}
