//! Command implementations for the vault-export CLI
//!
//! Each command module handles the CLI interface and delegates to
//! vault-export-core for the actual work.

pub mod command;
pub mod convert;
pub mod profiles;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vault_export_config::{Profile, ProfileStore};
use vault_export_core::{DocumentId, OutputFormat, VaultGraph};
use vault_export_runtime::ProcessRunner;

/// Environment variable overriding the pandoc binary.
pub(crate) const PANDOC_ENV: &str = "VAULT_EXPORT_PANDOC";

/// Load the profile store, or the built-in default when no file is given.
pub(crate) fn load_store(config: Option<&Path>) -> ProfileStore {
    match config {
        Some(path) => ProfileStore::load_file(path),
        None => ProfileStore::default(),
    }
}

/// The named profile, or the active one.
pub(crate) fn select_profile(store: &ProfileStore, name: Option<&str>) -> Result<Profile> {
    match name {
        Some(name) => store.get(name).cloned().with_context(|| {
            let known: Vec<&str> = store.names().collect();
            format!("Unknown profile '{}' (available: {})", name, known.join(", "))
        }),
        None => Ok(store.active().clone()),
    }
}

/// Fill in the pandoc path from the environment or PATH when unset.
pub(crate) fn discover_pandoc(profile: &mut Profile, runner: &dyn ProcessRunner) {
    if profile.pandoc_path.is_some() {
        return;
    }
    match runner.find_binary("pandoc", PANDOC_ENV) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Found pandoc");
            profile.pandoc_path = Some(path);
        }
        None => tracing::debug!("pandoc not found on PATH or in {}", PANDOC_ENV),
    }
}

pub(crate) fn parse_format(to: &str) -> Result<OutputFormat> {
    to.parse::<OutputFormat>().map_err(anyhow::Error::msg)
}

/// Output path for a note: explicit, or the note with the format's extension.
pub(crate) fn output_path(note: &Path, output: Option<PathBuf>, format: OutputFormat) -> PathBuf {
    output.unwrap_or_else(|| note.with_extension(format.extension()))
}

/// A note opened inside its vault.
pub(crate) struct OpenNote {
    pub graph: VaultGraph,
    pub id: DocumentId,
    pub path: PathBuf,
}

impl OpenNote {
    pub fn open(note: &Path, vault: Option<&Path>) -> Result<Self> {
        let path = note
            .canonicalize()
            .with_context(|| format!("Note not found: {}", note.display()))?;
        let root = match vault {
            Some(root) => root.to_path_buf(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .context("Note has no parent directory")?,
        };
        let graph = VaultGraph::open(&root)
            .with_context(|| format!("Failed to open vault: {}", root.display()))?;
        let id = graph
            .id_for_path(&path)
            .with_context(|| format!("{} is not inside the vault {}", path.display(), root.display()))?;
        Ok(Self { graph, id, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_profile_defaults_to_active() {
        let store = ProfileStore::default();
        let profile = select_profile(&store, None).unwrap();
        assert_eq!(&profile, store.active());
    }

    #[test]
    fn test_select_unknown_profile_lists_available() {
        let store = ProfileStore::default();
        let err = select_profile(&store, Some("Missing")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Missing"));
        assert!(message.contains("Default"));
    }

    #[test]
    fn test_output_path_uses_format_extension() {
        let note = Path::new("/vault/Thesis.md");
        assert_eq!(
            output_path(note, None, OutputFormat::Latex),
            PathBuf::from("/vault/Thesis.tex")
        );
        assert_eq!(
            output_path(note, Some(PathBuf::from("out.pdf")), OutputFormat::Docx),
            PathBuf::from("out.pdf")
        );
    }

    #[test]
    fn test_parse_format_rejects_unknown() {
        assert_eq!(parse_format("docx").unwrap(), OutputFormat::Docx);
        assert!(parse_format("rtf").is_err());
    }
}
