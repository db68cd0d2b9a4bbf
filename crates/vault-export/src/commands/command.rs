//! Print the pandoc invocation for a note without running it.

use std::path::PathBuf;

use anyhow::Result;

use vault_export_core::{BuildPaths, build_command};
use vault_export_runtime::NativeRunner;

use super::{discover_pandoc, load_store, output_path, parse_format, select_profile};

/// Arguments for the command command
#[derive(Debug)]
pub struct CommandArgs {
    pub note: PathBuf,
    pub to: String,
    pub profile: Option<String>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub pandoc_args: Vec<String>,
}

/// Execute the command command
pub fn execute(args: CommandArgs) -> Result<()> {
    let format = parse_format(&args.to)?;
    let store = load_store(args.config.as_deref());
    let mut profile = select_profile(&store, args.profile.as_deref())?;
    discover_pandoc(&mut profile, &NativeRunner::new());

    let preamble = std::env::temp_dir().join("vault-export").join("preamble.tex");
    let output = output_path(&args.note, args.output, format);
    let paths = BuildPaths::new(&args.note, preamble, output);
    let invocation = build_command(&profile, format, &paths, &args.pandoc_args);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&invocation)?);
    } else {
        println!("{}", invocation);
    }
    Ok(())
}
