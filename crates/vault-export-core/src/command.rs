/*
 * command.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build the pandoc invocation for a profile and output format.
 */

//! Build the pandoc invocation for a profile and output format.
//!
//! [`build_command`] is a pure function: the same profile, format, paths and
//! extra arguments always give the same [`BuildInvocation`]. The argument
//! order is fixed, since some pandoc filters and options are sensitive to
//! it:
//!
//! 1. input path (omitted when the input is streamed on stdin)
//! 2. `--from` with the reader extensions for the format
//! 3. `--include-in-header` with the composed preamble
//! 4. `--output`
//! 5. format flags: `--pdf-engine`, `--to=latex`, `--to=beamer`
//! 6. filters, in profile order
//! 7. `--listings`
//! 8. `--resource-path`
//! 9. the cross-reference filter, if enabled
//! 10. caption titles and reference prefixes (`-M`)
//! 11. margin, page numbering and image scale variables (`-V`)
//! 12. font size, document class and class options variables
//! 13. `--highlight-style`
//! 14. extra arguments from the profile, then from the caller
//! 15. `--standalone`, if enabled

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use vault_export_config::Profile;

use crate::format::OutputFormat;

/// Reader extensions for PDF output.
const PDF_READER: &str =
    "markdown+raw_tex+tex_math_dollars+implicit_figures+link_attributes+fenced_code_attributes";

/// Highlighting style used for code that is not turned into listings.
const HIGHLIGHT_STYLE: &str = "tango";

/// Only meaningful for Word-processor formats.
const REFERENCE_DOC: &str = "--reference-doc";

/// Files involved in one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Input markdown; `None` when streamed on stdin
    pub input: Option<PathBuf>,
    /// Composed preamble file
    pub preamble: PathBuf,
    /// Output file
    pub output: PathBuf,
    /// Directory relative resources are searched in, when the profile does
    /// not set one. Defaults to the input's directory.
    pub resource_dir: Option<PathBuf>,
}

impl BuildPaths {
    pub fn new(input: impl Into<PathBuf>, preamble: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: Some(input.into()),
            preamble: preamble.into(),
            output: output.into(),
            resource_dir: None,
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    /// Stream the input instead of passing its path.
    pub fn streamed(mut self) -> Self {
        if self.resource_dir.is_none() {
            self.resource_dir = self.input_dir();
        }
        self.input = None;
        self
    }

    fn input_dir(&self) -> Option<PathBuf> {
        self.input
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

/// A fully resolved compiler command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInvocation {
    pub command: String,
    pub args: Vec<String>,
}

impl fmt::Display for BuildInvocation {
    /// Shell-style rendering, for logs and `--dry-run` style output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.command))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ',' | '+' | '%' | '@')
        });
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Build the pandoc invocation. Does no I/O.
pub fn build_command(
    profile: &Profile,
    format: OutputFormat,
    paths: &BuildPaths,
    extra_args: &[String],
) -> BuildInvocation {
    let mut args: Vec<String> = Vec::new();

    if let Some(input) = &paths.input {
        args.push(path_arg(input));
    }

    let reader = match format {
        OutputFormat::Pdf if profile.advanced_commands => format!("{}+latex_macros", PDF_READER),
        OutputFormat::Pdf => PDF_READER.to_string(),
        _ => "markdown".to_string(),
    };
    args.push(format!("--from={}", reader));

    args.push(format!("--include-in-header={}", path_arg(&paths.preamble)));
    args.push("--output".to_string());
    args.push(path_arg(&paths.output));

    match format {
        OutputFormat::Pdf => {
            args.push(format!("--pdf-engine={}", profile.latex_engine));
            if profile.is_slides() {
                args.push("--to=beamer".to_string());
            }
        }
        OutputFormat::Latex => {
            let writer = if profile.is_slides() { "beamer" } else { "latex" };
            args.push(format!("--to={}", writer));
        }
        _ => {}
    }

    for filter in &profile.filters {
        let is_lua = filter
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("lua"));
        let flag = if is_lua { "--lua-filter" } else { "--filter" };
        args.push(format!("{}={}", flag, path_arg(filter)));
    }

    args.push("--listings".to_string());

    let resource_path = profile
        .resource_path
        .clone()
        .or_else(|| paths.resource_dir.clone())
        .or_else(|| paths.input_dir())
        .unwrap_or_else(|| PathBuf::from("."));
    args.push(format!("--resource-path={}", path_arg(&resource_path)));

    if profile.crossref {
        args.push(format!("--filter={}", path_arg(&profile.crossref_filter)));
    }

    let labels = &profile.labels;
    for (key, value) in [
        ("figureTitle", &labels.figure_title),
        ("tableTitle", &labels.table_title),
        ("listingTitle", &labels.listing_title),
        ("equationTitle", &labels.equation_title),
        ("figPrefix", &labels.figure_prefix),
        ("tblPrefix", &labels.table_prefix),
        ("lstPrefix", &labels.listing_prefix),
        ("eqnPrefix", &labels.equation_prefix),
    ] {
        args.push("-M".to_string());
        args.push(format!("{}={}", key, value));
    }

    let mut variable = |value: String| {
        args.push("-V".to_string());
        args.push(value);
    };
    if profile.margins_enabled {
        variable(format!("geometry:margin={}", profile.margin));
    }
    if !profile.page_numbers {
        variable("pagestyle=empty".to_string());
    }
    if profile.scale_images {
        variable(format!("image-scale={}", profile.image_scale));
    }
    if let Some(size) = non_blank(profile.font_size.as_deref()) {
        variable(format!("fontsize={}", size));
    }
    if let Some(class) = non_blank(Some(&profile.document_class)) {
        variable(format!("documentclass={}", class));
    }
    if let Some(options) = non_blank(profile.class_options.as_deref()) {
        variable(format!("classoption={}", options));
    }

    args.push(format!("--highlight-style={}", HIGHLIGHT_STYLE));

    let passthrough = profile.extra_args.iter().chain(extra_args);
    args.extend(filter_passthrough(passthrough, format));

    if profile.standalone {
        args.push("--standalone".to_string());
    }

    BuildInvocation {
        command: profile.pandoc_command(),
        args,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Drop `--reference-doc` (either spelling) for formats that ignore it.
fn filter_passthrough<'a>(
    args: impl Iterator<Item = &'a String>,
    format: OutputFormat,
) -> Vec<String> {
    if format.is_document_archive() {
        return args.cloned().collect();
    }
    let mut kept = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == REFERENCE_DOC {
            skip_value = true;
            continue;
        }
        if arg.starts_with("--reference-doc=") {
            continue;
        }
        kept.push(arg.clone());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> BuildPaths {
        BuildPaths::new("/tmp/run/note.md", "/tmp/run/preamble.tex", "/out/note.pdf")
    }

    fn args_of(profile: &Profile, format: OutputFormat, extra: &[&str]) -> Vec<String> {
        let extra: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
        build_command(profile, format, &paths(), &extra).args
    }

    // === format flags ===

    #[test]
    fn test_pdf_engine_for_pdf_only() {
        let profile = Profile::default();
        let pdf = args_of(&profile, OutputFormat::Pdf, &[]);
        assert!(pdf.contains(&"--pdf-engine=xelatex".to_string()));
        let docx = args_of(&profile, OutputFormat::Docx, &[]);
        assert!(!docx.iter().any(|a| a.starts_with("--pdf-engine")));
    }

    #[test]
    fn test_reader_extensions() {
        let mut profile = Profile::default();
        let pdf = args_of(&profile, OutputFormat::Pdf, &[]);
        assert_eq!(pdf[1], format!("--from={}", PDF_READER));

        profile.advanced_commands = true;
        let pdf = args_of(&profile, OutputFormat::Pdf, &[]);
        assert!(pdf[1].ends_with("+latex_macros"));

        let html = args_of(&profile, OutputFormat::Html, &[]);
        assert_eq!(html[1], "--from=markdown");
    }

    #[test]
    fn test_latex_and_beamer_writers() {
        let mut profile = Profile::default();
        let latex = args_of(&profile, OutputFormat::Latex, &[]);
        assert!(latex.contains(&"--to=latex".to_string()));

        profile.document_class = "Beamer".to_string();
        let latex = args_of(&profile, OutputFormat::Latex, &[]);
        assert!(latex.contains(&"--to=beamer".to_string()));
        assert!(!latex.contains(&"--to=latex".to_string()));

        let pdf = args_of(&profile, OutputFormat::Pdf, &[]);
        assert!(pdf.contains(&"--to=beamer".to_string()));
    }

    // === ordering ===

    #[test]
    fn test_full_default_invocation() {
        let invocation = build_command(&Profile::default(), OutputFormat::Pdf, &paths(), &[]);
        assert_eq!(invocation.command, "pandoc");
        let expected: Vec<String> = [
            "/tmp/run/note.md",
            format!("--from={}", PDF_READER).as_str(),
            "--include-in-header=/tmp/run/preamble.tex",
            "--output",
            "/out/note.pdf",
            "--pdf-engine=xelatex",
            "--listings",
            "--resource-path=/tmp/run",
            "--filter=pandoc-crossref",
            "-M",
            "figureTitle=Figure",
            "-M",
            "tableTitle=Table",
            "-M",
            "listingTitle=Listing",
            "-M",
            "equationTitle=Equation",
            "-M",
            "figPrefix=Fig.",
            "-M",
            "tblPrefix=Tab.",
            "-M",
            "lstPrefix=Lst.",
            "-M",
            "eqnPrefix=Eq.",
            "-V",
            "image-scale=0.8",
            "-V",
            "documentclass=article",
            "--highlight-style=tango",
            "--standalone",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(invocation.args, expected);
    }

    #[test]
    fn test_filters_before_listings() {
        let profile = Profile {
            filters: vec![PathBuf::from("a.lua"), PathBuf::from("/bin/b")],
            ..Default::default()
        };
        let args = args_of(&profile, OutputFormat::Pdf, &[]);
        let lua = args.iter().position(|a| a == "--lua-filter=a.lua").unwrap();
        let json = args.iter().position(|a| a == "--filter=/bin/b").unwrap();
        let listings = args.iter().position(|a| a == "--listings").unwrap();
        assert!(lua < json && json < listings);
    }

    #[test]
    fn test_conditional_variables() {
        let profile = Profile {
            margins_enabled: true,
            margin: "1in".to_string(),
            page_numbers: false,
            scale_images: false,
            font_size: Some("11pt".to_string()),
            class_options: Some("twocolumn".to_string()),
            crossref: false,
            standalone: false,
            ..Default::default()
        };
        let args = args_of(&profile, OutputFormat::Pdf, &[]);
        let tail: Vec<&str> = args
            .iter()
            .skip_while(|a| *a != "eqnPrefix=Eq.")
            .skip(1)
            .map(String::as_str)
            .collect();
        assert_eq!(
            tail,
            vec![
                "-V",
                "geometry:margin=1in",
                "-V",
                "pagestyle=empty",
                "-V",
                "fontsize=11pt",
                "-V",
                "documentclass=article",
                "-V",
                "classoption=twocolumn",
                "--highlight-style=tango",
            ]
        );
        assert!(!args.iter().any(|a| a.starts_with("--filter=")));
    }

    // === paths ===

    #[test]
    fn test_streamed_input_omitted() {
        let paths = paths().streamed();
        let args = build_command(&Profile::default(), OutputFormat::Pdf, &paths, &[]).args;
        assert!(args[0].starts_with("--from="));
        assert!(args.contains(&"--resource-path=/tmp/run".to_string()));
    }

    #[test]
    fn test_profile_resource_path_wins() {
        let profile = Profile {
            resource_path: Some(PathBuf::from("/vault")),
            ..Default::default()
        };
        let paths = paths().with_resource_dir("/elsewhere");
        let args = build_command(&profile, OutputFormat::Pdf, &paths, &[]).args;
        assert!(args.contains(&"--resource-path=/vault".to_string()));
    }

    // === pass-through ===

    #[test]
    fn test_reference_doc_only_for_archives() {
        let extra = ["--reference-doc=ref.docx", "--toc", "--reference-doc", "x.odt"];
        let pdf = args_of(&Profile::default(), OutputFormat::Pdf, &extra);
        assert!(!pdf.iter().any(|a| a.contains("reference-doc") || a == "x.odt"));
        assert!(pdf.contains(&"--toc".to_string()));

        let docx = args_of(&Profile::default(), OutputFormat::Docx, &extra);
        assert!(docx.contains(&"--reference-doc=ref.docx".to_string()));
        assert!(docx.contains(&"x.odt".to_string()));
    }

    #[test]
    fn test_profile_extra_args_precede_caller_args() {
        let profile = Profile {
            extra_args: vec!["--toc".to_string()],
            ..Default::default()
        };
        let args = args_of(&profile, OutputFormat::Html, &["--number-sections"]);
        let n = args.len();
        assert_eq!(args[n - 3], "--toc");
        assert_eq!(args[n - 2], "--number-sections");
        assert_eq!(args[n - 1], "--standalone");
    }

    // === purity ===

    #[test]
    fn test_deterministic_and_input_untouched() {
        let profile = Profile::default();
        let before = profile.clone();
        let extra = vec!["--toc".to_string()];
        let a = build_command(&profile, OutputFormat::Pdf, &paths(), &extra);
        let b = build_command(&profile, OutputFormat::Pdf, &paths(), &extra);
        assert_eq!(a, b);
        assert_eq!(profile, before);
    }

    #[test]
    fn test_display_quotes_arguments() {
        let invocation = BuildInvocation {
            command: "pandoc".to_string(),
            args: vec!["my note.md".to_string(), "--toc".to_string()],
        };
        assert_eq!(invocation.to_string(), "pandoc 'my note.md' --toc");
    }
}
