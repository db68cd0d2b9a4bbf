//! Error types for the profile store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("A profile named '{0}' already exists")]
    DuplicateProfile(String),

    #[error("Cannot delete '{0}': at least one profile must remain")]
    LastProfile(String),

    #[error("Profile names must not be empty")]
    EmptyName,

    #[error("Failed to parse profile store: {0}")]
    Parse(String),

    #[error("Failed to serialize profile store: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProfileStoreError>;
