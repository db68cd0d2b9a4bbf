//! Convert command implementation.
//!
//! Runs the full pipeline for one note and reports warnings and compiler
//! diagnostics against the note's own line numbers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use vault_export_core::{ContentGraph, ConvertError, ConvertOptions, Converter};
use vault_export_runtime::NativeRunner;

use super::{OpenNote, PANDOC_ENV, discover_pandoc, load_store, output_path, parse_format, select_profile};

/// Arguments for the convert command
#[derive(Debug)]
pub struct ConvertArgs {
    pub note: PathBuf,
    pub vault: Option<PathBuf>,
    pub to: String,
    pub profile: Option<String>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub stream: bool,
    pub quiet: bool,
    pub pandoc_args: Vec<String>,
}

/// Execute the convert command
pub fn execute(args: ConvertArgs) -> Result<()> {
    let format = parse_format(&args.to)?;
    let note = OpenNote::open(&args.note, args.vault.as_deref())?;
    let store = load_store(args.config.as_deref());
    let mut profile = select_profile(&store, args.profile.as_deref())?;

    let runner = NativeRunner::new();
    discover_pandoc(&mut profile, &runner);

    let text = note
        .graph
        .read_document(&note.id)
        .with_context(|| format!("Failed to read {}", note.path.display()))?;
    let options = ConvertOptions::new(output_path(&note.path, args.output, format))
        .with_extra_args(args.pandoc_args)
        .streamed(args.stream);

    info!(note = %note.id, format = %format, "Converting");
    let result = Converter::new(&note.graph, &runner).convert(&note.id, &text, &profile, format, &options);

    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                warn!("{}", warning);
            }
            for diagnostic in &outcome.diagnostics {
                warn!("{}:{}: {}", note.id, diagnostic.line, diagnostic.message);
            }
            if !args.quiet {
                println!("{}", outcome.output_path.display());
            }
            Ok(())
        }
        Err(ConvertError::CompilerFailed {
            command,
            exit_code,
            stderr,
            diagnostics,
        }) => {
            if diagnostics.is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
            for diagnostic in &diagnostics {
                eprintln!("{}:{}: {}", note.id, diagnostic.line, diagnostic.message);
            }
            anyhow::bail!("{} failed with exit code {}", command, exit_code)
        }
        Err(e) if e.is_launch_failure() => Err(e).context(format!(
            "Check the profile's pandoc path or set {}",
            PANDOC_ENV
        )),
        Err(e) => Err(e).context("Conversion failed"),
    }
}
