/*
 * link.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Link reference parsing and resolution.
 */

//! Link references and their resolution against a [`ContentGraph`].
//!
//! The text inside `[[...]]` has the shape
//!
//! ```text
//! target#Heading|alias
//! target#^block-id|alias
//! target^block-id
//! image.png|300x200
//! ```
//!
//! and is split left to right on `|`, then `#`, then `^`.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::cache::DocumentCache;
use crate::graph::{ContentGraph, DocumentId};

/// `300` or `300x200` used as an alias means an image size in pixels.
static SIZE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:x(\d+))?$").expect("Invalid size alias regex"));

/// Display size requested through a numeric alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: Option<u32>,
}

/// Parsed form of a raw link reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Path-like target, never empty
    pub target: String,
    pub alias: Option<String>,
    pub heading: Option<String>,
    pub block_id: Option<String>,
    pub size: Option<ImageSize>,
}

impl LinkReference {
    /// Parse the inside of `[[...]]`.
    ///
    /// Returns `None` when the target is empty (e.g. `[[#Heading]]`), which
    /// callers treat as "leave the text alone".
    pub fn parse(raw: &str) -> Option<Self> {
        let (head, alias) = match raw.split_once('|') {
            Some((head, alias)) => (head, Some(alias.trim())),
            None => (raw, None),
        };

        let mut size = None;
        let alias = alias.filter(|a| !a.is_empty()).and_then(|a| {
            if let Some(caps) = SIZE_ALIAS.captures(a) {
                let width: Option<u32> = caps[1].parse().ok();
                let height = caps.get(2).and_then(|h| h.as_str().parse().ok());
                if let Some(width) = width {
                    size = Some(ImageSize { width, height });
                    return None;
                }
            }
            Some(a.to_string())
        });

        let mut heading = None;
        let mut block_id = None;
        let target = match head.split_once('#') {
            Some((target, fragment)) => {
                let fragment = fragment.trim();
                if let Some(block) = fragment.strip_prefix('^') {
                    block_id = non_empty(block);
                } else {
                    // Nested headings (`#Parent#Child`) address the innermost one
                    heading = fragment.rsplit('#').next().and_then(non_empty);
                }
                target
            }
            None => head,
        };

        let target = match target.split_once('^') {
            Some((target, block)) if block_id.is_none() => {
                block_id = non_empty(block);
                target
            }
            _ => target,
        };

        let target = target.trim();
        if target.is_empty() {
            return None;
        }

        Some(Self {
            target: target.to_string(),
            alias,
            heading,
            block_id,
            size,
        })
    }

    /// Heading or block id, whichever was requested.
    pub fn section(&self) -> Option<String> {
        match (&self.heading, &self.block_id) {
            (Some(heading), _) => Some(heading.clone()),
            (None, Some(block)) => Some(format!("^{}", block)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for LinkReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)?;
        if let Some(heading) = &self.heading {
            write!(f, "#{}", heading)?;
        }
        if let Some(block) = &self.block_id {
            write!(f, "#^{}", block)?;
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Resolves link references to documents.
///
/// Tries, in order:
/// 1. the graph's own resolver, relative to the linking document,
/// 2. an exact graph-relative path (with or without `.md`),
/// 3. a case-insensitive match on the file name or a trailing part of the
///    path, optionally limited to a search root.
///
/// A miss is `None`, never an error.
#[derive(Clone, Copy)]
pub struct LinkResolver<'g> {
    graph: &'g dyn ContentGraph,
    search_root: Option<&'g str>,
    cache: Option<&'g DocumentCache>,
}

impl<'g> LinkResolver<'g> {
    pub fn new(graph: &'g dyn ContentGraph) -> Self {
        Self {
            graph,
            search_root: None,
            cache: None,
        }
    }

    /// Reuse the document listing held in `cache` for name matching.
    pub fn with_cache(mut self, cache: &'g DocumentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Limit the file-name fallback to a graph-relative directory.
    pub fn with_search_root(mut self, root: Option<&'g str>) -> Self {
        self.search_root = root.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn resolve(&self, reference: &LinkReference, source: &DocumentId) -> Option<DocumentId> {
        let target = reference.target.as_str();

        if let Some(id) = self.graph.resolve_link(target, source) {
            return Some(id);
        }

        let exact = DocumentId::new(target);
        if self.graph.contains(&exact) {
            return Some(exact);
        }
        let exact_md = DocumentId::new(format!("{}.md", exact));
        if self.graph.contains(&exact_md) {
            return Some(exact_md);
        }

        self.match_by_name(target)
    }

    fn match_by_name(&self, target: &str) -> Option<DocumentId> {
        let wanted = DocumentId::new(target).as_str().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let wanted_md = format!("{}.md", wanted);

        let listing: Arc<[DocumentId]> = match self.cache {
            Some(cache) => cache.list_through(self.graph, self.search_root),
            None => self.graph.list_documents(self.search_root).into(),
        };
        let mut matches: Vec<DocumentId> = listing
            .iter()
            .filter(|id| {
                let path = id.as_str().to_lowercase();
                [&wanted, &wanted_md].iter().any(|w| {
                    path == **w
                        || path
                            .strip_suffix(w.as_str())
                            .is_some_and(|rest| rest.ends_with('/'))
                })
            })
            .cloned()
            .collect();

        // Shallowest path wins, then lexical order
        matches.sort_by(|a, b| {
            let depth = |id: &DocumentId| id.as_str().matches('/').count();
            depth(a).cmp(&depth(b)).then_with(|| a.cmp(b))
        });
        matches.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // === parse tests ===

    #[test]
    fn test_parse_plain() {
        let r = LinkReference::parse("Note").unwrap();
        assert_eq!(r.target, "Note");
        assert_eq!(r.alias, None);
        assert_eq!(r.section(), None);
    }

    #[test]
    fn test_parse_heading_and_alias() {
        let r = LinkReference::parse("Note#Results|See results").unwrap();
        assert_eq!(r.target, "Note");
        assert_eq!(r.heading.as_deref(), Some("Results"));
        assert_eq!(r.alias.as_deref(), Some("See results"));
    }

    #[test]
    fn test_parse_block_forms() {
        let r = LinkReference::parse("Note#^abc123").unwrap();
        assert_eq!(r.block_id.as_deref(), Some("abc123"));
        assert_eq!(r.heading, None);

        let r = LinkReference::parse("Note^xyz").unwrap();
        assert_eq!(r.target, "Note");
        assert_eq!(r.block_id.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_parse_nested_heading() {
        let r = LinkReference::parse("Note#Methods#Sampling").unwrap();
        assert_eq!(r.heading.as_deref(), Some("Sampling"));
    }

    #[test]
    fn test_parse_size_alias() {
        let r = LinkReference::parse("plot.png|300").unwrap();
        assert_eq!(r.alias, None);
        assert_eq!(
            r.size,
            Some(ImageSize {
                width: 300,
                height: None
            })
        );

        let r = LinkReference::parse("plot.png|300x200").unwrap();
        assert_eq!(r.size.unwrap().height, Some(200));
    }

    #[test]
    fn test_parse_empty_target() {
        assert_eq!(LinkReference::parse("#Heading"), None);
        assert_eq!(LinkReference::parse("  |alias"), None);
    }

    // === resolve tests ===

    fn graph() -> MemoryGraph {
        MemoryGraph::new()
            .with_document("notes/index.md", "")
            .with_document("notes/Other.md", "")
            .with_document("attachments/Plot.PNG", "")
            .with_document("deep/nested/attachments/plot.png", "")
            .with_document("archive/figs/diagram.svg", "")
    }

    fn resolve(graph: &MemoryGraph, target: &str, root: Option<&str>) -> Option<String> {
        let reference = LinkReference::parse(target).unwrap();
        LinkResolver::new(graph)
            .with_search_root(root)
            .resolve(&reference, &DocumentId::new("notes/index.md"))
            .map(|id| id.to_string())
    }

    #[test]
    fn test_resolve_graph_native() {
        let g = graph();
        assert_eq!(resolve(&g, "Other", None).as_deref(), Some("notes/Other.md"));
    }

    #[test]
    fn test_resolve_exact_absolute() {
        let g = graph();
        assert_eq!(
            resolve(&g, "/archive/figs/diagram.svg", None).as_deref(),
            Some("archive/figs/diagram.svg")
        );
    }

    #[test]
    fn test_resolve_case_insensitive_name() {
        let g = graph();
        // Shallowest match wins
        assert_eq!(
            resolve(&g, "plot.png", None).as_deref(),
            Some("attachments/Plot.PNG")
        );
        assert_eq!(
            resolve(&g, "figs/DIAGRAM.svg", None).as_deref(),
            Some("archive/figs/diagram.svg")
        );
    }

    #[test]
    fn test_resolve_within_search_root() {
        let g = graph();
        assert_eq!(
            resolve(&g, "plot.png", Some("deep")).as_deref(),
            Some("deep/nested/attachments/plot.png")
        );
        assert_eq!(resolve(&g, "diagram.svg", Some("deep")), None);
    }

    #[test]
    fn test_resolve_miss() {
        let g = graph();
        assert_eq!(resolve(&g, "nothing.png", None), None);
    }

    /// Counts how often the document listing is walked.
    struct CountingGraph {
        inner: MemoryGraph,
        listings: AtomicUsize,
    }

    impl ContentGraph for CountingGraph {
        fn resolve_link(&self, link: &str, base: &DocumentId) -> Option<DocumentId> {
            self.inner.resolve_link(link, base)
        }

        fn read_document(&self, id: &DocumentId) -> std::io::Result<String> {
            self.inner.read_document(id)
        }

        fn list_documents(&self, search_root: Option<&str>) -> Vec<DocumentId> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            self.inner.list_documents(search_root)
        }

        fn contains(&self, id: &DocumentId) -> bool {
            self.inner.contains(id)
        }
    }

    #[test]
    fn test_name_matching_lists_once_per_cache() {
        let g = CountingGraph {
            inner: graph(),
            listings: AtomicUsize::new(0),
        };
        let cache = DocumentCache::new();
        let resolver = LinkResolver::new(&g).with_cache(&cache);
        let source = DocumentId::new("index.md");

        for target in ["PLOT.png", "diagram.svg", "nothing.png", "PLOT.png"] {
            let reference = LinkReference::parse(target).unwrap();
            resolver.resolve(&reference, &source);
        }
        assert_eq!(g.listings.load(Ordering::SeqCst), 1);

        // Without a cache every miss walks the graph again
        let uncached = LinkResolver::new(&g);
        let reference = LinkReference::parse("nothing.png").unwrap();
        uncached.resolve(&reference, &source);
        uncached.resolve(&reference, &source);
        assert_eq!(g.listings.load(Ordering::SeqCst), 3);
    }
}
