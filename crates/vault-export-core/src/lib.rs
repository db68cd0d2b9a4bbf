/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Conversion pipeline from vault notes to compiler input.
 */

//! Conversion pipeline from vault notes to compiler input.
//!
//! A note goes through these stages, each usable on its own:
//!
//! 1. [`TransclusionExpander`] replaces `![[note]]` embeds with the embedded
//!    note's text (or one of its sections), recursively, stopping at cycles.
//! 2. [`LinkAndCodeRewriter`] turns image embeds into figure syntax and
//!    annotated code fences into listings, repeated until nothing changes.
//! 3. [`compose_preamble`] prepares the raw header injected ahead of the body
//!    and records its line count.
//! 4. [`build_command`] maps a profile and output format to the compiler
//!    invocation. It is pure.
//! 5. [`Converter::convert`] runs the whole chain through a
//!    [`ProcessRunner`](vault_export_runtime::ProcessRunner) and maps compiler
//!    errors back to note lines with [`parse_diagnostics`].
//!
//! Notes are read through the [`ContentGraph`] trait. [`VaultGraph`] serves
//! a vault directory on disk; [`MemoryGraph`] holds documents in memory.

pub mod cache;
pub mod command;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod graph;
pub mod hooks;
pub mod link;
pub mod pipeline;
pub mod preamble;
pub mod rewrite;
pub mod section;
pub mod transclusion;

pub use cache::DocumentCache;
pub use command::{BuildInvocation, BuildPaths, build_command};
pub use diagnostics::{Diagnostic, count_lines, parse_diagnostics};
pub use error::{ConvertError, PipelineWarning};
pub use format::OutputFormat;
pub use graph::{ContentGraph, DocumentId, MemoryGraph, VaultGraph};
pub use hooks::{CommandLintFixer, LintError, LintFixer};
pub use link::{ImageSize, LinkReference, LinkResolver};
pub use pipeline::{ConversionOutcome, ConvertOptions, Converter};
pub use preamble::{Preamble, compose_preamble};
pub use rewrite::{LinkAndCodeRewriter, MAX_REWRITE_PASSES, RewriteMatch, RewriteOutcome};
pub use transclusion::{Expansion, TransclusionExpander};
