/*
 * event.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pure state transitions for the profile store.
 */

//! Profile store reducer.
//!
//! [`apply_event`] takes the current store and a [`ProfileEvent`] and returns
//! the next store. It never mutates its input, so a settings surface can
//! keep the previous state around (for undo or for discarding a dialog) and
//! persist only the result it accepts.

use crate::error::{ProfileStoreError, Result};
use crate::profile::Profile;
use crate::store::ProfileStore;

/// A change requested by a settings surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    /// Add a profile, copying `template` when given and defaults otherwise
    Create {
        name: String,
        template: Option<String>,
    },
    /// Rename a profile in place, keeping its position
    Rename { from: String, to: String },
    /// Remove a profile; refused for the last remaining one
    Delete { name: String },
    /// Make a profile the active one
    Activate { name: String },
    /// Replace a profile's settings
    Update { name: String, profile: Profile },
    /// Restore a profile's settings to the defaults
    Reset { name: String },
}

impl ProfileEvent {
    pub fn create(name: impl Into<String>) -> Self {
        Self::Create {
            name: name.into(),
            template: None,
        }
    }

    pub fn duplicate(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Create {
            name: name.into(),
            template: Some(template.into()),
        }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::Delete { name: name.into() }
    }

    pub fn activate(name: impl Into<String>) -> Self {
        Self::Activate { name: name.into() }
    }

    pub fn update(name: impl Into<String>, profile: Profile) -> Self {
        Self::Update {
            name: name.into(),
            profile,
        }
    }
}

/// Compute the store that results from applying `event` to `state`.
///
/// Invalid events (unknown names, duplicate names, deleting the last
/// profile) return an error and leave `state` untouched.
pub fn apply_event(state: &ProfileStore, event: ProfileEvent) -> Result<ProfileStore> {
    let (mut profiles, mut active) = state.clone().into_parts();

    match event {
        ProfileEvent::Create { name, template } => {
            let name = validate_name(&name)?;
            if profiles.contains_key(&name) {
                return Err(ProfileStoreError::DuplicateProfile(name));
            }
            let profile = match template {
                Some(template) => profiles
                    .get(&template)
                    .cloned()
                    .ok_or(ProfileStoreError::UnknownProfile(template))?,
                None => Profile::default(),
            };
            profiles.insert(name, profile);
        }
        ProfileEvent::Rename { from, to } => {
            let to = validate_name(&to)?;
            if !profiles.contains_key(&from) {
                return Err(ProfileStoreError::UnknownProfile(from));
            }
            if from != to {
                if profiles.contains_key(&to) {
                    return Err(ProfileStoreError::DuplicateProfile(to));
                }
                profiles = profiles
                    .into_iter()
                    .map(|(name, profile)| {
                        if name == from {
                            (to.clone(), profile)
                        } else {
                            (name, profile)
                        }
                    })
                    .collect();
                if active == from {
                    active = to;
                }
            }
        }
        ProfileEvent::Delete { name } => {
            if !profiles.contains_key(&name) {
                return Err(ProfileStoreError::UnknownProfile(name));
            }
            if profiles.len() == 1 {
                return Err(ProfileStoreError::LastProfile(name));
            }
            profiles.shift_remove(&name);
            if active == name {
                if let Some(first) = profiles.keys().next() {
                    active = first.clone();
                }
            }
        }
        ProfileEvent::Activate { name } => {
            if !profiles.contains_key(&name) {
                return Err(ProfileStoreError::UnknownProfile(name));
            }
            active = name;
        }
        ProfileEvent::Update { name, profile } => match profiles.get_mut(&name) {
            Some(slot) => *slot = profile,
            None => return Err(ProfileStoreError::UnknownProfile(name)),
        },
        ProfileEvent::Reset { name } => match profiles.get_mut(&name) {
            Some(slot) => *slot = Profile::default(),
            None => return Err(ProfileStoreError::UnknownProfile(name)),
        },
    }

    Ok(ProfileStore::from_parts_unchecked(profiles, active))
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileStoreError::EmptyName);
    }
    Ok(trimmed.to_string())
}
