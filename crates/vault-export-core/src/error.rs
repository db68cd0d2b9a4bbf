/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error and warning types for the conversion pipeline.
 */

//! Error and warning types for the conversion pipeline.
//!
//! Only two things stop a conversion: the compiler failing (or never
//! starting) and local I/O on the temporary directory. Everything a note
//! graph can throw at the pipeline (dangling links, cycles, unreadable
//! embeds) degrades to a [`PipelineWarning`] and the conversion continues.

use std::fmt;
use std::io;

use thiserror::Error;
use vault_export_runtime::RuntimeError;

use crate::diagnostics::Diagnostic;
use crate::graph::DocumentId;

/// Errors that end a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The compiler ran and exited non-zero.
    #[error("{command} exited with code {exit_code}{}", summarize(.diagnostics))]
    CompilerFailed {
        /// The compiler command
        command: String,
        /// Process exit code
        exit_code: i32,
        /// Full stderr of the compiler
        stderr: String,
        /// Problems located in the note, in stderr order
        diagnostics: Vec<Diagnostic>,
    },

    /// The compiler could not be started (missing binary, permissions).
    #[error("Could not run '{command}': {source}")]
    Launch {
        /// The command that failed to start
        command: String,
        #[source]
        source: RuntimeError,
    },

    /// I/O failure talking to the compiler process.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to create or write temporary files.
    #[error("Temporary file error: {message}")]
    TempFile {
        /// What was being written
        message: String,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub(crate) fn temp_file(message: impl Into<String>, source: io::Error) -> Self {
        Self::TempFile {
            message: message.into(),
            source,
        }
    }

    /// Whether the fix is in the profile (compiler path) rather than the note.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ConvertError::Launch { .. })
    }

    /// Diagnostics attached to a compiler failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ConvertError::CompilerFailed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics.first() {
        Some(first) if diagnostics.len() == 1 => format!(" (line {})", first.line),
        Some(first) => format!(
            " (line {} and {} more)",
            first.line,
            diagnostics.len() - 1
        ),
        None => String::new(),
    }
}

/// A recoverable problem met while preparing a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// A link or embed resolved to no document; the text was left as is.
    Unresolved {
        source: DocumentId,
        reference: String,
    },
    /// An embed would have re-entered a document already being expanded.
    Cycle {
        source: DocumentId,
        target: DocumentId,
    },
    /// The requested heading or block does not exist in the target.
    SectionNotFound {
        target: DocumentId,
        section: String,
    },
    /// The target resolved but could not be read.
    ReadFailed { target: DocumentId, message: String },
    /// Rewriting still changed the text after the pass limit.
    RewriteNotConverged { passes: usize },
    /// The lint-fix hook failed; the unfixed text was compiled.
    LintFailed { message: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::Unresolved { source, reference } => {
                write!(f, "{}: could not resolve '{}'", source, reference)
            }
            PipelineWarning::Cycle { source, target } => {
                write!(f, "{}: embedding '{}' would create a cycle", source, target)
            }
            PipelineWarning::SectionNotFound { target, section } => {
                write!(f, "{}: section '{}' not found", target, section)
            }
            PipelineWarning::ReadFailed { target, message } => {
                write!(f, "{}: could not be read: {}", target, message)
            }
            PipelineWarning::RewriteNotConverged { passes } => {
                write!(f, "rewriting did not settle after {} passes", passes)
            }
            PipelineWarning::LintFailed { message } => write!(f, "lint fix failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_failed_message() {
        let err = ConvertError::CompilerFailed {
            command: "pandoc".to_string(),
            exit_code: 43,
            stderr: String::new(),
            diagnostics: vec![
                Diagnostic {
                    line: 10,
                    message: "\\error".to_string(),
                },
                Diagnostic {
                    line: 12,
                    message: "\\other".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "pandoc exited with code 43 (line 10 and 1 more)"
        );
        assert!(!err.is_launch_failure());
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_launch_is_distinct() {
        let err = ConvertError::Launch {
            command: "pandoc".to_string(),
            source: RuntimeError::NotFound("pandoc".to_string()),
        };
        assert!(err.is_launch_failure());
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_warning_display() {
        let warning = PipelineWarning::Cycle {
            source: DocumentId::new("a.md"),
            target: DocumentId::new("b.md"),
        };
        assert_eq!(
            warning.to_string(),
            "a.md: embedding 'b.md' would create a cycle"
        );
    }
}
