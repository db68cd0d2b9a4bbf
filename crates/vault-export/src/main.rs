//! vault-export CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "vault-export")]
#[command(version)]
#[command(about = "Convert vault notes through pandoc", long_about = None)]
struct Cli {
    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a note to an output document
    Convert {
        /// Note to convert
        note: PathBuf,

        /// Vault root (defaults to the note's directory)
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Output format (pdf, latex, docx, odt, html)
        #[arg(short = 't', long, default_value = "pdf")]
        to: String,

        /// Profile to use instead of the active one
        #[arg(short, long)]
        profile: Option<String>,

        /// Profile settings file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (defaults to the note path with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Feed the document to pandoc on stdin
        #[arg(long)]
        stream: bool,

        /// Additional pandoc command line arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        pandoc_args: Vec<String>,
    },

    /// Print the pandoc command a conversion would run
    Command {
        /// Note to convert
        note: PathBuf,

        /// Output format (pdf, latex, docx, odt, html)
        #[arg(short = 't', long, default_value = "pdf")]
        to: String,

        /// Profile to use instead of the active one
        #[arg(short, long)]
        profile: Option<String>,

        /// Profile settings file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (defaults to the note path with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Additional pandoc command line arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        pandoc_args: Vec<String>,
    },

    /// List or edit export profiles
    Profiles {
        /// Profile settings file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Create a profile with default settings
        #[arg(long, value_name = "NAME")]
        create: Option<String>,

        /// Delete a profile
        #[arg(long, value_name = "NAME")]
        delete: Option<String>,

        /// Make a profile the active one
        #[arg(long, value_name = "NAME")]
        activate: Option<String>,

        /// Print the store as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "vault_export=warn"
    } else {
        "vault_export=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Convert {
            note,
            vault,
            to,
            profile,
            config,
            output,
            stream,
            pandoc_args,
        } => commands::convert::execute(commands::convert::ConvertArgs {
            note,
            vault,
            to,
            profile,
            config,
            output,
            stream,
            quiet: cli.quiet,
            pandoc_args,
        }),
        Commands::Command {
            note,
            to,
            profile,
            config,
            output,
            json,
            pandoc_args,
        } => commands::command::execute(commands::command::CommandArgs {
            note,
            to,
            profile,
            config,
            output,
            json,
            pandoc_args,
        }),
        Commands::Profiles {
            config,
            create,
            delete,
            activate,
            json,
        } => commands::profiles::execute(commands::profiles::ProfilesArgs {
            config,
            create,
            delete,
            activate,
            json,
        }),
    }
}
