/*
 * rewrite.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rewrite embeds and annotated code fences into compiler syntax.
 */

//! Rewrite image embeds and annotated code fences into compiler syntax.
//!
//! A single pass scans the text for three constructs and treats everything
//! else as opaque:
//!
//! - `![[target|alias]]{attrs}` embeds,
//! - `![alt](note.md)` images that point at notes,
//! - fenced code blocks.
//!
//! Matches are classified into [`RewriteMatch`] values and spliced back in
//! source order. Overlapping matches keep the one that starts first, so
//! anything inside a code fence is left alone.
//!
//! Rewritten text may itself contain constructs to rewrite (a note pulled in
//! through image syntax, for one), so [`LinkAndCodeRewriter::rewrite_to_fixpoint`]
//! repeats the pass until the text stops changing, at most
//! [`MAX_REWRITE_PASSES`] times.
//!
//! Nothing here fails. A reference that does not resolve, or an attribute
//! block that cannot be read, leaves the original text in place.

use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use vault_export_config::Profile;

use crate::cache::DocumentCache;
use crate::graph::{ContentGraph, DocumentId};
use crate::link::{LinkReference, LinkResolver};
use crate::section::{Fence, extract_block, extract_heading, find_fences, strip_front_matter};

/// Upper bound on rewrite passes.
pub const MAX_REWRITE_PASSES: usize = 5;

/// `![[reference]]` with an optional `{...}` attribute block.
static EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?P<prefix>^[ \t]*(?:>[ \t]*)+)?!\[\[(?P<reference>[^\[\]\n]+)\]\](?:\{(?P<attrs>[^{}\n]*)\})?",
    )
    .expect("Invalid embed regex")
});

/// `![alt](target)`; only targets that are notes are rewritten.
static NOTE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?P<prefix>^[ \t]*(?:>[ \t]*)+)?!\[(?P<alt>[^\[\]\n]*)\]\((?P<target><[^<>\n]+>|[^()\s]+)\)",
    )
    .expect("Invalid note image regex")
});

static ATTR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)#(?P<label>[^\s}]+)").expect("Invalid label attribute regex")
});

static ATTR_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)\.(?P<class>[A-Za-z0-9_+#-]+)").expect("Invalid class attribute regex")
});

static ATTR_CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)caption\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("Invalid caption attribute regex")
});

static ATTR_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(?P<key>width|height)\s*=\s*(?P<value>"[^"]*"|[^\s"]+)"#)
        .expect("Invalid size attribute regex")
});

/// A construct found by the scanner, with everything needed to replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteMatch {
    /// An embed that resolved to a non-text document.
    EmbedImage {
        /// Block-quote prefix at the start of the line, if any
        prefix: String,
        target: DocumentId,
        label: Option<String>,
        caption: Option<String>,
        width: Option<String>,
        height: Option<String>,
    },
    /// An embed or image reference that resolved to a note.
    EmbedMarkdownDocument {
        prefix: String,
        target: DocumentId,
        /// Alias, caption or alt text, used if the note cannot be inlined
        link_text: Option<String>,
        heading: Option<String>,
        block_id: Option<String>,
    },
    /// A fenced code block with a language or an attribute block.
    FencedCode {
        prefix: String,
        language: Option<String>,
        label: Option<String>,
        caption: Option<String>,
        body: String,
    },
}

/// A located scanner hit.
struct Site {
    range: Range<usize>,
    /// `None` for constructs that only shield their contents (plain fences)
    kind: Option<RewriteMatch>,
}

/// Result of [`LinkAndCodeRewriter::rewrite_to_fixpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Passes applied, including the final unchanged one
    pub passes: usize,
    /// Whether the last pass left the text unchanged
    pub converged: bool,
}

/// Options parsed from a `{...}` attribute block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Attributes {
    label: Option<String>,
    class: Option<String>,
    caption: Option<String>,
    width: Option<String>,
    height: Option<String>,
}

fn parse_attributes(block: &str) -> Attributes {
    let mut attrs = Attributes::default();

    // Quoted captions may contain `#` or `.`; look for ids and classes
    // outside of them only
    let unquoted = ATTR_CAPTION.replace_all(block, " ");
    attrs.label = ATTR_LABEL
        .captures(&unquoted)
        .map(|c| c["label"].to_string());
    attrs.class = ATTR_CLASS
        .captures(&unquoted)
        .map(|c| c["class"].to_string());

    attrs.caption = ATTR_CAPTION.captures(block).and_then(|c| {
        c.name("dq")
            .or_else(|| c.name("sq"))
            .map(|m| m.as_str().to_string())
    });
    for caps in ATTR_SIZE.captures_iter(&unquoted) {
        let value = caps["value"].trim_matches('"').to_string();
        if value.is_empty() {
            continue;
        }
        match &caps["key"] {
            "width" => attrs.width = Some(value),
            _ => attrs.height = Some(value),
        }
    }
    attrs
}

/// Give a label the namespace prefix the cross-reference filter expects.
///
/// `myFig` becomes `fig:myFig`; `fig:myFig` is returned unchanged.
pub fn normalize_label(label: &str, namespace: &str) -> String {
    let label = label.trim().trim_start_matches('#');
    let prefix = format!("{}:", namespace);
    if label.starts_with(&prefix) {
        label.to_string()
    } else {
        format!("{}{}", prefix, label)
    }
}

/// Listings language for a fence language tag.
///
/// Tags without a listings equivalent, and plain-text tags, map to no
/// language.
pub fn listings_language(tag: &str) -> Option<&'static str> {
    let language = match tag.trim().to_ascii_lowercase().as_str() {
        "py" | "python" | "python3" => "Python",
        "js" | "javascript" | "ts" | "typescript" | "jsx" | "tsx" => "JavaScript",
        "c" | "h" => "C",
        "cpp" | "c++" | "cc" | "cxx" | "hpp" => "C++",
        "cs" | "csharp" | "c#" => "[Sharp]C",
        "java" => "Java",
        "r" => "R",
        "rb" | "ruby" => "Ruby",
        "sh" | "bash" | "shell" | "zsh" | "console" => "bash",
        "sql" => "SQL",
        "tex" | "latex" => "TeX",
        "html" | "htm" => "HTML",
        "xml" | "svg" => "XML",
        "matlab" | "octave" => "Matlab",
        "hs" | "haskell" => "Haskell",
        "pl" | "perl" => "Perl",
        "php" => "PHP",
        "lua" => "Lua",
        "f90" | "fortran" => "Fortran",
        "scala" => "Scala",
        "make" | "makefile" => "make",
        _ => return None,
    };
    Some(language)
}

/// Path as written in a link destination; wrapped in `<>` when it needs it.
fn link_destination(target: &DocumentId) -> String {
    let path = target.as_str();
    if path.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
        format!("<{}>", path)
    } else {
        path.to_string()
    }
}

/// Undo the escaping editors apply to link destinations.
fn decode_destination(raw: &str) -> String {
    let raw = raw
        .strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .unwrap_or(raw);
    raw.replace("%20", " ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Rewrites embeds and fences of one note graph under one profile.
pub struct LinkAndCodeRewriter<'a> {
    graph: &'a dyn ContentGraph,
    cache: &'a DocumentCache,
    profile: &'a Profile,
    resolver: LinkResolver<'a>,
    listings: bool,
}

impl<'a> LinkAndCodeRewriter<'a> {
    pub fn new(graph: &'a dyn ContentGraph, cache: &'a DocumentCache, profile: &'a Profile) -> Self {
        let search_root = profile.search_directory.as_deref().and_then(Path::to_str);
        Self {
            graph,
            cache,
            profile,
            resolver: LinkResolver::new(graph)
                .with_cache(cache)
                .with_search_root(search_root),
            listings: true,
        }
    }

    /// Whether annotated fences become listings. Formats that drop raw TeX
    /// keep their fences.
    pub fn with_listings(mut self, listings: bool) -> Self {
        self.listings = listings;
        self
    }

    /// Rewrite until the text stops changing or the pass limit is hit.
    pub fn rewrite_to_fixpoint(&self, text: &str, source: &DocumentId) -> RewriteOutcome {
        let mut current = text.to_string();
        for pass in 1..=MAX_REWRITE_PASSES {
            let next = self.rewrite_once(&current, source);
            let changed = next != current;
            tracing::debug!(source = %source, pass, changed, "Rewrite pass");
            if !changed {
                return RewriteOutcome {
                    text: current,
                    passes: pass,
                    converged: true,
                };
            }
            current = next;
        }
        tracing::warn!(
            source = %source,
            passes = MAX_REWRITE_PASSES,
            "Rewriting did not settle, using the last pass"
        );
        RewriteOutcome {
            text: current,
            passes: MAX_REWRITE_PASSES,
            converged: false,
        }
    }

    /// One rewrite pass over `text`, which lives at `source`.
    pub fn rewrite_once(&self, text: &str, source: &DocumentId) -> String {
        let visited = HashSet::from([source.clone()]);
        self.rewrite_with_visited(text, source, &visited)
    }

    fn rewrite_with_visited(
        &self,
        text: &str,
        source: &DocumentId,
        visited: &HashSet<DocumentId>,
    ) -> String {
        let sites = self.scan(text, source);
        if sites.iter().all(|s| s.kind.is_none()) {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for site in sites {
            out.push_str(&text[last..site.range.start]);
            match &site.kind {
                Some(kind) => out.push_str(&self.render(kind, visited)),
                None => out.push_str(&text[site.range.clone()]),
            }
            last = site.range.end;
        }
        out.push_str(&text[last..]);
        out
    }

    /// Find all constructs, in source order, without overlaps.
    fn scan(&self, text: &str, source: &DocumentId) -> Vec<Site> {
        let mut sites: Vec<Site> = find_fences(text)
            .into_iter()
            .map(|fence| Site {
                range: fence.range.clone(),
                kind: self.classify_fence(fence),
            })
            .collect();

        for caps in EMBED.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let prefix = caps.name("prefix").map(|m| m.as_str()).unwrap_or("");
            let attrs = caps.name("attrs").map(|m| m.as_str());
            if let Some(kind) = self.classify_embed(&caps["reference"], attrs, prefix, source) {
                sites.push(Site {
                    range: whole.range(),
                    kind: Some(kind),
                });
            }
        }

        for caps in NOTE_IMAGE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let prefix = caps.name("prefix").map(|m| m.as_str()).unwrap_or("");
            if let Some(kind) = self.classify_note_image(&caps["target"], &caps["alt"], prefix, source) {
                sites.push(Site {
                    range: whole.range(),
                    kind: Some(kind),
                });
            }
        }

        sites.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| b.range.end.cmp(&a.range.end))
        });
        let mut kept: Vec<Site> = Vec::with_capacity(sites.len());
        for site in sites {
            if kept.last().is_none_or(|prev| site.range.start >= prev.range.end) {
                kept.push(site);
            }
        }
        kept
    }

    fn classify_fence(&self, fence: Fence) -> Option<RewriteMatch> {
        if !self.listings {
            return None;
        }
        let (tag, attr_block) = match fence.info.find('{') {
            Some(open) => {
                let close = fence.info.rfind('}').filter(|&c| c > open);
                (
                    &fence.info[..open],
                    close.map(|close| &fence.info[open + 1..close]),
                )
            }
            None => (fence.info.as_str(), None),
        };
        let tag = tag.split_whitespace().next().map(|t| t.trim_start_matches('.'));
        if tag.is_none() && attr_block.is_none() {
            return None;
        }

        let attrs = attr_block.map(parse_attributes).unwrap_or_default();
        let language = tag
            .or(attrs.class.as_deref())
            .and_then(listings_language)
            .map(str::to_string);

        Some(RewriteMatch::FencedCode {
            prefix: fence.prefix,
            language,
            label: attrs.label,
            caption: attrs.caption,
            body: fence.body,
        })
    }

    fn classify_embed(
        &self,
        raw: &str,
        attr_block: Option<&str>,
        prefix: &str,
        source: &DocumentId,
    ) -> Option<RewriteMatch> {
        let reference = LinkReference::parse(raw)?;
        let Some(target) = self.resolver.resolve(&reference, source) else {
            tracing::debug!(source = %source, reference = %reference, "Embed not resolved, leaving as is");
            return None;
        };
        let attrs = attr_block.map(parse_attributes).unwrap_or_default();

        if target.is_text() {
            return Some(RewriteMatch::EmbedMarkdownDocument {
                prefix: prefix.to_string(),
                target,
                link_text: non_empty(reference.alias.as_deref())
                    .or_else(|| non_empty(attrs.caption.as_deref())),
                heading: reference.heading,
                block_id: reference.block_id,
            });
        }

        let size = reference.size;
        Some(RewriteMatch::EmbedImage {
            prefix: prefix.to_string(),
            target,
            label: non_empty(attrs.label.as_deref()),
            caption: non_empty(attrs.caption.as_deref())
                .or_else(|| non_empty(reference.alias.as_deref())),
            width: attrs
                .width
                .or_else(|| size.map(|s| format!("{}px", s.width))),
            height: attrs
                .height
                .or_else(|| size.and_then(|s| s.height).map(|h| format!("{}px", h))),
        })
    }

    fn classify_note_image(
        &self,
        raw_target: &str,
        alt: &str,
        prefix: &str,
        source: &DocumentId,
    ) -> Option<RewriteMatch> {
        let destination = decode_destination(raw_target);
        if destination.contains("://") {
            return None;
        }
        let reference = LinkReference::parse(&destination)?;
        let is_note_file = DocumentId::new(reference.target.as_str())
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"));
        if !is_note_file {
            return None;
        }
        let target = self.resolver.resolve(&reference, source)?;
        Some(RewriteMatch::EmbedMarkdownDocument {
            prefix: prefix.to_string(),
            target,
            link_text: non_empty(Some(alt)),
            heading: reference.heading,
            block_id: reference.block_id,
        })
    }

    fn render(&self, kind: &RewriteMatch, visited: &HashSet<DocumentId>) -> String {
        match kind {
            RewriteMatch::EmbedImage {
                prefix,
                target,
                label,
                caption,
                width,
                height,
            } => {
                let width = width.clone().or_else(|| self.profile.image_width());
                if !prefix.is_empty() {
                    // Numbered figures cannot float inside a quotation
                    return format!(
                        "{}![]({}){}",
                        prefix,
                        link_destination(target),
                        attribute_block(&[width.map(|w| format!("width={}", w))])
                    );
                }
                image_directive(target, label.as_deref(), caption.as_deref(), width, height.clone())
            }
            RewriteMatch::EmbedMarkdownDocument {
                prefix,
                target,
                link_text,
                heading,
                block_id,
            } => self
                .inline_document(target, heading.as_deref(), block_id.as_deref(), visited)
                .map(|text| requote(&text, prefix))
                .unwrap_or_else(|| {
                    let text = link_text.clone().unwrap_or_else(|| target.stem().to_string());
                    format!("{}[{}]({})", prefix, text, link_destination(target))
                }),
            RewriteMatch::FencedCode {
                prefix,
                language,
                label,
                caption,
                body,
            } => listing_directive(
                prefix,
                language.as_deref(),
                label.as_deref(),
                caption.as_deref(),
                body,
            ),
        }
    }

    /// Rewritten text of a note, or `None` when it cannot be inlined.
    fn inline_document(
        &self,
        target: &DocumentId,
        heading: Option<&str>,
        block_id: Option<&str>,
        visited: &HashSet<DocumentId>,
    ) -> Option<String> {
        if visited.contains(target) {
            tracing::debug!(target = %target, "Note already being inlined, linking instead");
            return None;
        }
        let raw = match self.cache.read_through(self.graph, target) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target = %target, "Failed to read embedded note, linking instead: {}", e);
                return None;
            }
        };
        let body = strip_front_matter(&raw);
        let section = match (heading, block_id) {
            (Some(heading), _) => extract_heading(body, heading)?,
            (None, Some(block)) => extract_block(body, block)?,
            (None, None) => body.trim_end_matches(['\n', '\r']).to_string(),
        };

        let mut nested = visited.clone();
        nested.insert(target.clone());
        Some(self.rewrite_with_visited(&section, target, &nested))
    }
}

/// `{a b c}` for the present entries, or nothing.
fn attribute_block(entries: &[Option<String>]) -> String {
    let present: Vec<&str> = entries.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", present.join(" "))
    }
}

fn image_directive(
    target: &DocumentId,
    label: Option<&str>,
    caption: Option<&str>,
    width: Option<String>,
    height: Option<String>,
) -> String {
    let label = label.map(|l| normalize_label(l, "fig"));
    // Numbered figures need a non-empty caption in the figure syntax
    let caption = match (caption, &label) {
        (Some(caption), _) => caption,
        (None, Some(_)) => " ",
        (None, None) => "",
    };
    let attrs = attribute_block(&[
        label.map(|l| format!("#{}", l)),
        width.map(|w| format!("width={}", w)),
        height.map(|h| format!("height={}", h)),
    ]);
    format!("![{}]({}){}", caption, link_destination(target), attrs)
}

fn listing_directive(
    prefix: &str,
    language: Option<&str>,
    label: Option<&str>,
    caption: Option<&str>,
    body: &str,
) -> String {
    let mut options = Vec::new();
    if let Some(language) = language {
        if language.contains('[') {
            options.push(format!("language={{{}}}", language));
        } else {
            options.push(format!("language={}", language));
        }
    }
    if let Some(label) = label {
        options.push(format!("label={{{}}}", normalize_label(label, "lst")));
    }
    if let Some(caption) = caption {
        options.push(format!("caption={{{}}}", caption));
    }

    let mut out = format!("{}\\begin{{lstlisting}}", prefix);
    if !options.is_empty() {
        out.push('[');
        out.push_str(&options.join(","));
        out.push(']');
    }
    out.push('\n');
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str(prefix);
    out.push_str("\\end{lstlisting}");
    out
}

fn requote(text: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
