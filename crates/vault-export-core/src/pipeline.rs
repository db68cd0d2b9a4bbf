/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end conversion of one note.
 */

//! End-to-end conversion of one note.
//!
//! ```text
//! note text
//!   -> TransclusionExpander     embeds inlined, cycles cut
//!   -> LinkAndCodeRewriter      figures and listings, to a fixpoint
//!   -> compose_preamble         header text + line count
//!   -> build_command            pandoc invocation
//!   -> ProcessRunner            compiler run
//!   -> parse_diagnostics        stderr mapped back to note lines
//! ```
//!
//! The preamble and the rewritten markdown are written to a fresh temporary
//! directory owned by the conversion. It is removed when the conversion
//! returns, whether it succeeded or not.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use vault_export_config::Profile;
use vault_export_runtime::{ProcessRunner, RunOptions, RuntimeError};

use crate::cache::DocumentCache;
use crate::command::{BuildInvocation, BuildPaths, build_command};
use crate::diagnostics::{Diagnostic, parse_diagnostics};
use crate::error::{ConvertError, PipelineWarning};
use crate::format::OutputFormat;
use crate::graph::{ContentGraph, DocumentId};
use crate::hooks::{CommandLintFixer, LintFixer};
use crate::preamble::{Preamble, compose_preamble};
use crate::rewrite::LinkAndCodeRewriter;
use crate::transclusion::TransclusionExpander;

const PREAMBLE_FILE: &str = "preamble.tex";

/// Per-conversion settings that are not part of the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Where the compiler writes its output. Relative paths are taken
    /// relative to the current directory.
    pub output: PathBuf,
    /// Arguments appended after the profile's extra arguments
    pub extra_args: Vec<String>,
    /// Feed the markdown on stdin instead of passing its path
    pub stream_input: bool,
    /// Compiler working directory and resource directory. Defaults to the
    /// graph's root directory.
    pub working_dir: Option<PathBuf>,
}

impl ConvertOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            extra_args: Vec::new(),
            stream_input: false,
            working_dir: None,
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn streamed(mut self, stream: bool) -> Self {
        self.stream_input = stream;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// A note after the text stages, ready to hand to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    pub markdown: String,
    pub preamble: Preamble,
    pub warnings: Vec<PipelineWarning>,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub output_path: PathBuf,
    /// Problems the compiler reported without failing
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<PipelineWarning>,
    pub invocation: BuildInvocation,
}

/// Converts notes of one graph.
pub struct Converter<'a> {
    graph: &'a dyn ContentGraph,
    runner: &'a dyn ProcessRunner,
    cache: DocumentCache,
    lint_fixer: Option<&'a dyn LintFixer>,
}

impl<'a> Converter<'a> {
    pub fn new(graph: &'a dyn ContentGraph, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            graph,
            runner,
            cache: DocumentCache::new(),
            lint_fixer: None,
        }
    }

    /// Start from a pre-filled document cache.
    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    /// Use `fixer` instead of the profile's lint command.
    pub fn with_lint_fixer(mut self, fixer: &'a dyn LintFixer) -> Self {
        self.lint_fixer = Some(fixer);
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Run the text stages: expansion, rewriting and preamble composition.
    pub fn prepare(
        &self,
        source: &DocumentId,
        text: &str,
        profile: &Profile,
        format: OutputFormat,
    ) -> PreparedDocument {
        let expansion = TransclusionExpander::new(self.graph, &self.cache).expand(text, source);
        let mut warnings = expansion.warnings;

        let rewritten = LinkAndCodeRewriter::new(self.graph, &self.cache, profile)
            .with_listings(format.keeps_raw_tex())
            .rewrite_to_fixpoint(&expansion.text, source);
        if !rewritten.converged {
            warnings.push(PipelineWarning::RewriteNotConverged {
                passes: rewritten.passes,
            });
        }

        PreparedDocument {
            markdown: rewritten.text,
            preamble: compose_preamble(&profile.custom_header, &profile.labels),
            warnings,
        }
    }

    /// Convert `text`, the content of `source`, to `format`.
    pub fn convert(
        &self,
        source: &DocumentId,
        text: &str,
        profile: &Profile,
        format: OutputFormat,
        options: &ConvertOptions,
    ) -> Result<ConversionOutcome, ConvertError> {
        let prepared = self.prepare(source, text, profile, format);
        let mut warnings = prepared.warnings;

        let workdir = tempfile::Builder::new()
            .prefix("vault-export-")
            .tempdir()
            .map_err(|e| ConvertError::temp_file("creating working directory", e))?;
        let preamble_path = workdir.path().join(PREAMBLE_FILE);
        fs::write(&preamble_path, &prepared.preamble.text)
            .map_err(|e| ConvertError::temp_file("writing preamble", e))?;
        let markdown_path = workdir.path().join(format!("{}.md", Uuid::new_v4()));
        fs::write(&markdown_path, &prepared.markdown)
            .map_err(|e| ConvertError::temp_file("writing intermediate markdown", e))?;

        self.run_lint(profile, &markdown_path, &mut warnings);

        let output_path = if options.output.is_absolute() {
            options.output.clone()
        } else {
            std::env::current_dir()?.join(&options.output)
        };
        let working_dir = options
            .working_dir
            .clone()
            .or_else(|| self.graph.root().map(Path::to_path_buf));

        let mut paths = BuildPaths::new(&markdown_path, &preamble_path, &output_path);
        if let Some(dir) = &working_dir {
            paths = paths.with_resource_dir(dir);
        }
        if options.stream_input {
            paths = paths.streamed();
        }
        let invocation = build_command(profile, format, &paths, &options.extra_args);

        let mut run_options = RunOptions::default();
        if let Some(dir) = &working_dir {
            run_options = run_options.with_cwd(dir);
        }
        if options.stream_input {
            let markdown = fs::read(&markdown_path)
                .map_err(|e| ConvertError::temp_file("reading intermediate markdown", e))?;
            run_options = run_options.with_stdin(markdown);
        }

        tracing::debug!(source = %source, invocation = %invocation, "Running compiler");
        let output = self
            .runner
            .run(&invocation.command, &invocation.args, &run_options)
            .map_err(|e| match e {
                RuntimeError::Io(err) => ConvertError::Io(err),
                other => ConvertError::Launch {
                    command: invocation.command.clone(),
                    source: other,
                },
            })?;

        let stderr = output.stderr_string();
        let diagnostics = parse_diagnostics(&stderr, prepared.preamble.line_count);
        if !output.success() {
            return Err(ConvertError::CompilerFailed {
                command: invocation.command,
                exit_code: output.code,
                stderr,
                diagnostics,
            });
        }

        tracing::info!(source = %source, output = %output_path.display(), "Converted");
        Ok(ConversionOutcome {
            output_path,
            diagnostics,
            warnings,
            invocation,
        })
    }

    fn run_lint(&self, profile: &Profile, path: &Path, warnings: &mut Vec<PipelineWarning>) {
        if !profile.lint_on_export {
            return;
        }
        let configured = profile
            .lint_command
            .as_deref()
            .and_then(|line| CommandLintFixer::from_command_line(self.runner, line));
        let fixer: &dyn LintFixer = match (self.lint_fixer, configured.as_ref()) {
            (Some(fixer), _) => fixer,
            (None, Some(fixer)) => fixer,
            (None, None) => {
                tracing::debug!("Lint on export enabled but no lint command configured");
                return;
            }
        };
        if let Err(e) = fixer.fix(path) {
            tracing::warn!("Lint fix failed, compiling unfixed text: {}", e);
            warnings.push(PipelineWarning::LintFailed {
                message: e.to_string(),
            });
        }
    }
}
