/*
 * section.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Front matter, fences, headings and block ids in note text.
 */

//! Line-level structure of note text.
//!
//! Only the handful of constructs the pipeline needs are recognized: YAML
//! front matter, fenced code, ATX headings and trailing `^block-id` markers.
//! Everything else is opaque text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// ATX heading: `## Title`, optional closing hashes.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").expect("Invalid heading regex")
});

/// Opening or closing fence, possibly inside a block quote.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>[ \t]*(?:>[ \t]*)*)(?P<fence>`{3,}|~{3,})(?P<info>[^\n]*)$")
        .expect("Invalid fence regex")
});

/// A fenced code block located in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    /// Bytes from the start of the opening line to the end of the closing
    /// line (excluding its line break)
    pub range: Range<usize>,
    /// Quote/indent prefix of the opening line
    pub prefix: String,
    /// Opening marker, e.g. ```` ``` ````
    pub marker: String,
    /// Info string after the marker, trimmed
    pub info: String,
    /// Lines between the fences, verbatim
    pub body: String,
}

/// Byte ranges of lines, without line terminators.
fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            let end = if idx > start && text.as_bytes()[idx - 1] == b'\r' {
                idx - 1
            } else {
                idx
            };
            spans.push(start..end);
            start = idx + 1;
        }
    }
    if start < text.len() {
        spans.push(start..text.len());
    }
    spans
}

/// All closed fenced code blocks, in order.
///
/// A fence closes on a line with the same quote depth, the same marker
/// character, at least as many markers, and no info string. Unclosed fences
/// are not reported.
pub fn find_fences(text: &str) -> Vec<Fence> {
    let spans = line_spans(text);
    let mut fences = Vec::new();
    let mut i = 0;
    while i < spans.len() {
        let line = &text[spans[i].clone()];
        let Some(open) = FENCE.captures(line) else {
            i += 1;
            continue;
        };
        let prefix = open["prefix"].to_string();
        let marker = open["fence"].to_string();
        let info = open["info"].trim().to_string();
        // Backtick fences cannot carry backticks in their info string
        if marker.starts_with('`') && info.contains('`') {
            i += 1;
            continue;
        }

        let depth = quote_depth(&prefix);
        let close = (i + 1..spans.len()).find(|&j| {
            let candidate = &text[spans[j].clone()];
            FENCE.captures(candidate).is_some_and(|c| {
                let fence = &c["fence"];
                quote_depth(&c["prefix"]) == depth
                    && c["info"].trim().is_empty()
                    && fence.len() >= marker.len()
                    && fence.as_bytes()[0] == marker.as_bytes()[0]
            })
        });

        match close {
            Some(j) => {
                let body = if j > i + 1 {
                    text[spans[i + 1].start..spans[j - 1].end].to_string()
                } else {
                    String::new()
                };
                fences.push(Fence {
                    range: spans[i].start..spans[j].end,
                    prefix,
                    marker,
                    info,
                    body,
                });
                i = j + 1;
            }
            None => i += 1,
        }
    }
    fences
}

fn quote_depth(prefix: &str) -> usize {
    prefix.matches('>').count()
}

/// Whether `offset` falls inside any of `fences`.
pub fn in_fence(fences: &[Fence], offset: usize) -> bool {
    fences.iter().any(|f| f.range.contains(&offset))
}

/// Text after a leading YAML front matter block, or the whole text.
pub fn strip_front_matter(text: &str) -> &str {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return text;
    };
    let offset = text.len() - rest.len();
    for span in line_spans(rest) {
        let line = rest[span.clone()].trim_end();
        if line == "---" || line == "..." {
            let after = offset + span.end;
            let remainder = &text[after..];
            return remainder
                .strip_prefix("\r\n")
                .or_else(|| remainder.strip_prefix('\n'))
                .unwrap_or(remainder);
        }
    }
    text
}

fn normalize_heading(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn heading_at(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING.captures(line)?;
    let depth = caps.get(1)?.as_str().len();
    let title = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((depth, title))
}

/// The lines under `heading`, up to the next heading of equal or shallower
/// depth.
///
/// Matching is case-insensitive and ignores runs of whitespace. Headings in
/// fenced code do not count. Leading and trailing blank lines are dropped.
pub fn extract_heading(text: &str, heading: &str) -> Option<String> {
    let wanted = normalize_heading(heading);
    let fences = find_fences(text);
    let spans = line_spans(text);

    let mut start = None;
    for (idx, span) in spans.iter().enumerate() {
        if in_fence(&fences, span.start) {
            continue;
        }
        let Some((depth, title)) = heading_at(&text[span.clone()]) else {
            continue;
        };
        match start {
            None => {
                if normalize_heading(title) == wanted {
                    start = Some((idx + 1, depth));
                }
            }
            Some((first, level)) => {
                if depth <= level {
                    return Some(join_lines(text, &spans[first..idx]));
                }
            }
        }
    }
    start.map(|(first, _)| join_lines(text, &spans[first..]))
}

fn join_lines(text: &str, spans: &[Range<usize>]) -> String {
    let lines: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// The line carrying ` ^block_id`, with the marker removed.
pub fn extract_block(text: &str, block_id: &str) -> Option<String> {
    let marker = format!("^{}", block_id);
    let fences = find_fences(text);
    line_spans(text)
        .into_iter()
        .filter(|span| !in_fence(&fences, span.start))
        .map(|span| &text[span])
        .find_map(|line| {
            let trimmed = line.trim_end();
            let rest = trimmed.strip_suffix(marker.as_str())?;
            if rest.is_empty() || rest.ends_with(char::is_whitespace) {
                Some(rest.trim_end().to_string())
            } else {
                None
            }
        })
}
