/*
 * transclusion.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Recursive expansion of note embeds.
 */

//! Recursive expansion of `![[note]]` embeds.
//!
//! Each embed that resolves to a text document is replaced with that
//! document's body (front matter removed), or with one heading section or
//! block when the reference names one. The inserted text is expanded in
//! turn, relative to the document it came from.
//!
//! The set of documents on the current expansion chain is carried down the
//! recursion. An embed of a document already on the chain expands to
//! nothing, which bounds the recursion by the number of documents.
//!
//! An embed at the start of a block-quote line keeps the quote: every line
//! of the inserted text gets the same `> ` prefix.
//!
//! ```text
//! > ![[Quote]]        >  line one
//!                 =>  >  line two
//! ```

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

use crate::cache::DocumentCache;
use crate::error::PipelineWarning;
use crate::graph::{ContentGraph, DocumentId};
use crate::link::{LinkReference, LinkResolver};
use crate::section::{extract_block, extract_heading, find_fences, in_fence, strip_front_matter};

/// `![[reference]]`, with an optional block-quote prefix at line start.
static EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?P<prefix>^[ \t]*(?:>[ \t]*)+)?!\[\[(?P<reference>[^\[\]\n]+)\]\]")
        .expect("Invalid embed regex")
});

/// Result of expanding a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    pub warnings: Vec<PipelineWarning>,
}

/// One embed occurrence, resolved before any replacement happens.
struct EmbedSite {
    range: Range<usize>,
    prefix: String,
    raw: String,
    reference: Option<LinkReference>,
    target: Option<DocumentId>,
}

/// Expands embeds against a [`ContentGraph`].
pub struct TransclusionExpander<'a> {
    graph: &'a dyn ContentGraph,
    cache: &'a DocumentCache,
    resolver: LinkResolver<'a>,
}

impl<'a> TransclusionExpander<'a> {
    pub fn new(graph: &'a dyn ContentGraph, cache: &'a DocumentCache) -> Self {
        Self {
            graph,
            cache,
            resolver: LinkResolver::new(graph).with_cache(cache),
        }
    }

    pub fn with_search_root(mut self, root: Option<&'a str>) -> Self {
        self.resolver = self.resolver.with_search_root(root);
        self
    }

    /// Expand all embeds in `text`, which was read from `source`.
    pub fn expand(&self, text: &str, source: &DocumentId) -> Expansion {
        let visited = HashSet::from([source.clone()]);
        self.expand_with_visited(text, source, &visited)
    }

    /// Expand with an explicit set of documents already being expanded.
    pub fn expand_with_visited(
        &self,
        text: &str,
        source: &DocumentId,
        visited: &HashSet<DocumentId>,
    ) -> Expansion {
        let mut warnings = Vec::new();
        let text = self.expand_text(text, source, visited, &mut warnings);
        Expansion { text, warnings }
    }

    fn expand_text(
        &self,
        text: &str,
        source: &DocumentId,
        visited: &HashSet<DocumentId>,
        warnings: &mut Vec<PipelineWarning>,
    ) -> String {
        let fences = find_fences(text);
        let sites: Vec<EmbedSite> = EMBED
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if in_fence(&fences, whole.start()) {
                    return None;
                }
                let reference = LinkReference::parse(&caps["reference"]);
                let target = reference
                    .as_ref()
                    .and_then(|r| self.resolver.resolve(r, source));
                Some(EmbedSite {
                    range: whole.range(),
                    prefix: caps
                        .name("prefix")
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    raw: whole.as_str().to_string(),
                    reference,
                    target,
                })
            })
            .collect();

        if sites.is_empty() {
            return text.to_string();
        }

        self.prefetch(&sites, visited);

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for site in &sites {
            out.push_str(&text[last..site.range.start]);
            match self.expand_site(site, source, visited, warnings) {
                Some(expanded) => out.push_str(&requote(&expanded, &site.prefix)),
                None => out.push_str(&site.raw),
            }
            last = site.range.end;
        }
        out.push_str(&text[last..]);
        out
    }

    /// Replacement text for one embed, or `None` to keep it verbatim.
    fn expand_site(
        &self,
        site: &EmbedSite,
        source: &DocumentId,
        visited: &HashSet<DocumentId>,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Option<String> {
        let reference = site.reference.as_ref()?;
        let Some(target) = &site.target else {
            tracing::debug!(source = %source, reference = %reference, "Embed target not found");
            warnings.push(PipelineWarning::Unresolved {
                source: source.clone(),
                reference: reference.to_string(),
            });
            return None;
        };
        if !target.is_text() {
            return None;
        }

        if visited.contains(target) {
            tracing::warn!(source = %source, target = %target, "Embed cycle detected, skipping");
            warnings.push(PipelineWarning::Cycle {
                source: source.clone(),
                target: target.clone(),
            });
            return Some(String::new());
        }

        let raw = match self.cache.read_through(self.graph, target) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target = %target, "Failed to read embedded note: {}", e);
                warnings.push(PipelineWarning::ReadFailed {
                    target: target.clone(),
                    message: e.to_string(),
                });
                return None;
            }
        };
        let body = strip_front_matter(&raw);

        let section = match (&reference.heading, &reference.block_id) {
            (Some(heading), _) => extract_heading(body, heading),
            (None, Some(block)) => extract_block(body, block),
            (None, None) => Some(body.trim_end_matches(['\n', '\r']).to_string()),
        };
        let Some(section) = section else {
            let name = reference.section().unwrap_or_default();
            tracing::warn!(target = %target, section = %name, "Embedded section not found");
            warnings.push(PipelineWarning::SectionNotFound {
                target: target.clone(),
                section: name,
            });
            return Some(String::new());
        };

        let mut nested = visited.clone();
        nested.insert(target.clone());
        Some(self.expand_text(&section, target, &nested, warnings))
    }

    /// Read uncached sibling targets concurrently. Results land in the
    /// cache; failures are reported when the embed itself is expanded.
    fn prefetch(&self, sites: &[EmbedSite], visited: &HashSet<DocumentId>) {
        let mut pending: Vec<&DocumentId> = Vec::new();
        for target in sites.iter().filter_map(|s| s.target.as_ref()) {
            if target.is_text()
                && !visited.contains(target)
                && !self.cache.contains(target)
                && !pending.contains(&target)
            {
                pending.push(target);
            }
        }
        if pending.len() < 2 {
            return;
        }

        pending.par_iter().for_each(|id| {
            if let Err(e) = self.cache.read_through(self.graph, id) {
                tracing::debug!(target = %id, "Prefetch failed: {}", e);
            }
        });
    }
}

/// Re-apply a block-quote prefix to every line of `text`.
fn requote(text: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return text.to_string();
    }
    if text.is_empty() {
        return prefix.trim_end().to_string();
    }
    let mut out = String::with_capacity(text.len() + prefix.len());
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}
