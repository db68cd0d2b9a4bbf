//! Export profiles for vault-export.
//!
//! A [`Profile`] bundles everything needed to turn a note into a compiler
//! invocation: binary paths, filters, page layout, caption labels and
//! cross-reference prefixes. Profiles live in a [`ProfileStore`], which maps
//! names to profiles and tracks exactly one active profile.
//!
//! # Persistence
//!
//! Stores are read from YAML or JSON. Older settings files used either a
//! single flat profile or an array of named profiles; both shapes are
//! migrated into the name-keyed map on load. Anything unreadable falls back
//! to the built-in default store.
//!
//! # Mutation
//!
//! Settings surfaces never edit a store in place. They describe the change as
//! a [`ProfileEvent`] and call [`apply_event`], which returns the next store:
//!
//! ```
//! use vault_export_config::{apply_event, ProfileEvent, ProfileStore};
//!
//! let store = ProfileStore::default();
//! let store = apply_event(&store, ProfileEvent::create("Thesis")).unwrap();
//! let store = apply_event(&store, ProfileEvent::activate("Thesis")).unwrap();
//! assert_eq!(store.active_name(), "Thesis");
//! ```

pub mod error;
pub mod event;
pub mod profile;
pub mod store;

pub use error::ProfileStoreError;
pub use event::{ProfileEvent, apply_event};
pub use profile::{DEFAULT_PROFILE_NAME, LabelSettings, Profile};
pub use store::ProfileStore;
