/*
 * preamble.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compose the raw header injected ahead of the document body.
 */

//! Compose the raw header injected ahead of the document body.
//!
//! Users often paste a YAML `header-includes` block into the custom header
//! setting. The wrapper lines, comments and list markers are removed so that
//! what remains is plain TeX, then caption name overrides are appended.

use vault_export_config::LabelSettings;

use crate::diagnostics::count_lines;

/// Composed header text and its line count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub text: String,
    /// Lines `text` adds ahead of the body
    pub line_count: usize,
}

/// Build the preamble from the user's header and caption settings.
pub fn compose_preamble(user_header: &str, labels: &LabelSettings) -> Preamble {
    let mut lines = strip_wrappers(user_header);
    lines.extend(label_overrides(labels));

    let mut text = String::new();
    let mut previous_blank = true;
    for line in &lines {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if !blank {
            text.push_str(line);
        }
        text.push('\n');
        previous_blank = blank;
    }
    // A trailing blank line would shift diagnostics for nothing
    while text.ends_with("\n\n") {
        text.pop();
    }

    let line_count = count_lines(&text);
    Preamble { text, line_count }
}

/// Header lines with YAML scaffolding and comments removed, dedented.
fn strip_wrappers(header: &str) -> Vec<String> {
    let kept: Vec<String> = header
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with('#')
                || trimmed.starts_with('%')
                || trimmed == "---"
                || trimmed == "..."
                || is_header_key(trimmed))
        })
        .map(strip_list_marker)
        .collect();

    let indent = kept
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l))
        .reduce(common_prefix)
        .unwrap_or("")
        .to_string();

    kept.iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.strip_prefix(indent.as_str())
                    .unwrap_or(line)
                    .trim_end()
                    .to_string()
            }
        })
        .collect()
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Longest shared prefix, compared by character.
fn common_prefix<'s>(a: &'s str, b: &str) -> &'s str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((idx, _), _)| idx);
    &a[..end]
}

/// `header-includes:`, optionally with a block scalar indicator.
fn is_header_key(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("header-includes:") else {
        return false;
    };
    matches!(rest.trim(), "" | "|" | "|-" | "|+" | ">" | ">-" | ">+")
}

/// `  - \usepackage{x}` becomes `  \usepackage{x}`.
fn strip_list_marker(line: &str) -> String {
    let indent = leading_whitespace(line);
    let rest = &line[indent.len()..];
    if rest == "-" {
        return String::new();
    }
    match rest.strip_prefix("- ") {
        Some(item) => format!("{}{}", indent, item),
        None => line.to_string(),
    }
}

/// Caption name overrides for the configured titles.
fn label_overrides(labels: &LabelSettings) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rename = |command: &str, value: &str| {
        let value = value.trim();
        if !value.is_empty() {
            lines.push(format!("\\renewcommand{{\\{}}}{{{}}}", command, value));
        }
    };
    rename("figurename", &labels.figure_title);
    rename("tablename", &labels.table_title);
    rename("lstlistingname", &labels.listing_title);

    let equation = labels.equation_title.trim();
    if !equation.is_empty() {
        // No standard class defines \equationname
        lines.push(format!(
            "\\providecommand{{\\equationname}}{{}}\\renewcommand{{\\equationname}}{{{}}}",
            equation
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_labels() -> LabelSettings {
        LabelSettings {
            figure_title: String::new(),
            table_title: String::new(),
            listing_title: String::new(),
            equation_title: String::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_strips_yaml_scaffolding() {
        let header = "---\nheader-includes: |\n  # comment\n  \\usepackage{amsmath}\n  % tex comment\n  \\usepackage{booktabs}\n---\n";
        let preamble = compose_preamble(header, &no_labels());
        assert_eq!(
            preamble.text,
            "\\usepackage{amsmath}\n\\usepackage{booktabs}\n"
        );
        assert_eq!(preamble.line_count, 2);
    }

    #[test]
    fn test_strips_list_markers() {
        let header = "header-includes:\n  - \\usepackage{xcolor}\n  - \\definecolor{x}{RGB}{1,2,3}";
        let preamble = compose_preamble(header, &no_labels());
        assert_eq!(
            preamble.text,
            "\\usepackage{xcolor}\n\\definecolor{x}{RGB}{1,2,3}\n"
        );
    }

    #[test]
    fn test_dedent_with_mixed_unicode_whitespace() {
        let preamble = compose_preamble("\u{a0}\\usepackage{a}\n \\usepackage{b}", &no_labels());
        assert_eq!(preamble.text, "\u{a0}\\usepackage{a}\n \\usepackage{b}\n");

        let header = "header-includes:\n  \\usepackage{a}\n\u{3000}\\usepackage{b}";
        let preamble = compose_preamble(header, &no_labels());
        assert_eq!(preamble.text, "  \\usepackage{a}\n\u{3000}\\usepackage{b}\n");
        assert_eq!(preamble.line_count, 2);
    }

    #[test]
    fn test_dedent_shared_unicode_indent() {
        let header = "\u{3000}\u{3000}\\a\n\u{3000}\u{3000}\u{3000}\\b";
        let preamble = compose_preamble(header, &no_labels());
        assert_eq!(preamble.text, "\\a\n\u{3000}\\b\n");
    }

    #[test]
    fn test_collapses_blank_runs() {
        let header = "\\a\n\n\n\n\\b\n\n";
        let preamble = compose_preamble(header, &no_labels());
        assert_eq!(preamble.text, "\\a\n\n\\b\n");
        assert_eq!(preamble.line_count, 3);
    }

    #[test]
    fn test_label_overrides_appended() {
        let preamble = compose_preamble("\\usepackage{x}", &LabelSettings::default());
        let lines: Vec<&str> = preamble.text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "\\usepackage{x}",
                "\\renewcommand{\\figurename}{Figure}",
                "\\renewcommand{\\tablename}{Table}",
                "\\renewcommand{\\lstlistingname}{Listing}",
                "\\providecommand{\\equationname}{}\\renewcommand{\\equationname}{Equation}",
            ]
        );
        assert_eq!(preamble.line_count, 5);
    }

    #[test]
    fn test_empty_header() {
        let preamble = compose_preamble("", &no_labels());
        assert_eq!(preamble.text, "");
        assert_eq!(preamble.line_count, 0);
    }

    #[test]
    fn test_line_count_matches_text() {
        let header = "% only a comment\n\\newcommand{\\R}{\\mathbb{R}}\r\n\r\n\\usepackage{y}";
        let preamble = compose_preamble(header, &LabelSettings::default());
        assert_eq!(preamble.line_count, count_lines(&preamble.text));
        assert_eq!(preamble.line_count, preamble.text.lines().count());
    }
}
