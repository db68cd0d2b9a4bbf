/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Map compiler error lines back to note lines.
 */

//! Map compiler error reports back to note lines.
//!
//! TeX reports the offending input as a line marker followed by the text
//! read so far:
//!
//! ```text
//! ! Undefined control sequence.
//! l.15 \error
//! ```
//!
//! The compiled document starts with the injected preamble, so reported
//! lines are shifted by its line count. Reports that land inside the
//! preamble are dropped since the author cannot act on them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `l.<line> <fragment>`, anywhere in the stream.
static LINE_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bl\.(\d+)[ \t]+([^\r\n]*)").expect("Invalid line report regex")
});

/// A compiler-reported problem in note coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line in the note
    pub line: usize,
    pub message: String,
}

/// Extract diagnostics from compiler stderr, in order of appearance.
pub fn parse_diagnostics(stderr: &str, header_line_count: usize) -> Vec<Diagnostic> {
    LINE_REPORT
        .captures_iter(stderr)
        .filter_map(|caps| {
            let reported: usize = caps[1].parse().ok()?;
            let line = reported.checked_sub(header_line_count)?;
            if line == 0 {
                return None;
            }
            Some(Diagnostic {
                line,
                message: caps[2].trim_end().to_string(),
            })
        })
        .collect()
}

/// Number of lines in `text`; `\r\n`, `\r` and `\n` each end one line.
///
/// A trailing line without a terminator counts; an empty text has none.
pub fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                count += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => count += 1,
            _ => {}
        }
        i += 1;
    }
    if !matches!(bytes.last(), None | Some(b'\n') | Some(b'\r')) {
        count += 1;
    }
    count
}
