/*
 * store.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Name-keyed profile collection with an active profile.
 */

//! Profile store loading, migration and persistence.
//!
//! Three persisted shapes are accepted:
//!
//! ```yaml
//! # current: name-keyed map
//! activeProfile: Thesis
//! profiles:
//!   Thesis: { latexEngine: lualatex }
//!
//! # array of named profiles
//! activeProfile: Thesis
//! profiles:
//!   - { name: Thesis, latexEngine: lualatex }
//!
//! # legacy single profile (flat settings object)
//! latexEngine: lualatex
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{ProfileStoreError, Result};
use crate::profile::{DEFAULT_PROFILE_NAME, Profile};

/// Mapping from profile name to [`Profile`], plus the active profile name.
///
/// Invariants: the map is never empty and `active_profile` is always one of
/// its keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStore {
    active_profile: String,
    profiles: IndexMap<String, Profile>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_NAME, Profile::default())
    }
}

impl ProfileStore {
    /// Create a store holding a single, active profile.
    pub fn new(name: impl Into<String>, profile: Profile) -> Self {
        let name = name.into();
        let mut profiles = IndexMap::new();
        profiles.insert(name.clone(), profile);
        Self {
            active_profile: name,
            profiles,
        }
    }

    /// Build a store from parts, repairing the invariants.
    ///
    /// An empty map receives the default profile; an unknown or missing
    /// active name falls back to the first profile.
    pub fn from_profiles(mut profiles: IndexMap<String, Profile>, active: Option<String>) -> Self {
        if profiles.is_empty() {
            profiles.insert(DEFAULT_PROFILE_NAME.to_string(), Profile::default());
        }
        let active_profile = match active {
            Some(name) if profiles.contains_key(&name) => name,
            _ => profiles
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
        };
        Self {
            active_profile,
            profiles,
        }
    }

    /// The active profile.
    pub fn active(&self) -> &Profile {
        // Invariant: active_profile is always a key of profiles
        &self.profiles[&self.active_profile]
    }

    /// Name of the active profile.
    pub fn active_name(&self) -> &str {
        &self.active_profile
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Whether a profile with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profile names in store order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// `(name, profile)` pairs in store order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub(crate) fn into_parts(self) -> (IndexMap<String, Profile>, String) {
        (self.profiles, self.active_profile)
    }

    pub(crate) fn from_parts_unchecked(
        profiles: IndexMap<String, Profile>,
        active_profile: String,
    ) -> Self {
        debug_assert!(profiles.contains_key(&active_profile));
        Self {
            active_profile,
            profiles,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LOADING
    // ═══════════════════════════════════════════════════════════════════════

    /// Parse a store from YAML or JSON text, migrating older shapes.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| ProfileStoreError::Parse(e.to_string()))?;

        let mut map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(ProfileStoreError::Parse(format!(
                    "expected a mapping at top level, found {}",
                    value_kind(&other)
                )));
            }
        };

        let active = map
            .get("activeProfile")
            .and_then(Value::as_str)
            .map(str::to_string);

        let profiles = match map.remove("profiles") {
            // Legacy flat settings: the whole object is one profile
            None => {
                map.remove("activeProfile");
                let profile = profile_from_value(Value::Mapping(map))?;
                let mut profiles = IndexMap::new();
                profiles.insert(DEFAULT_PROFILE_NAME.to_string(), profile);
                profiles
            }
            Some(Value::Sequence(items)) => migrate_profile_array(items)?,
            Some(Value::Mapping(entries)) => {
                let mut profiles = IndexMap::new();
                for (key, value) in entries {
                    let name = key
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            ProfileStoreError::Parse("profile names must be strings".to_string())
                        })?;
                    profiles.insert(name, profile_from_value(value)?);
                }
                profiles
            }
            Some(other) => {
                return Err(ProfileStoreError::Parse(format!(
                    "'profiles' must be a mapping or a list, found {}",
                    value_kind(&other)
                )));
            }
        };

        Ok(Self::from_profiles(profiles, active))
    }

    /// Parse a store, falling back to the default store on malformed input.
    pub fn load_or_default(text: &str) -> Self {
        match Self::parse(text) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Ignoring malformed profile settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load a store from disk.
    ///
    /// A missing file yields the default store. Unreadable or malformed files
    /// also yield the default store, with a warning.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::load_or_default(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No profile settings found, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read profile settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ProfileStoreError::Serialize(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProfileStoreError::Serialize(e.to_string()))
    }

    /// Write the store to disk, as JSON for `.json` paths and YAML otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let text = if is_json {
            self.to_json_string()?
        } else {
            self.to_yaml_string()?
        };
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn profile_from_value(value: Value) -> Result<Profile> {
    if value.is_null() {
        return Ok(Profile::default());
    }
    serde_yaml::from_value(value).map_err(|e| ProfileStoreError::Parse(e.to_string()))
}

/// Convert `[{name: A, ...}, {name: B, ...}]` into a name-keyed map.
///
/// Unnamed entries are called `Profile N`; repeated names get a numeric
/// suffix so no entry is dropped.
fn migrate_profile_array(items: Vec<Value>) -> Result<IndexMap<String, Profile>> {
    let mut profiles = IndexMap::new();
    for (index, mut item) in items.into_iter().enumerate() {
        let name = match item.as_mapping_mut() {
            Some(map) => map
                .remove("name")
                .and_then(|n| n.as_str().map(|s| s.trim().to_string()))
                .filter(|n| !n.is_empty()),
            None => None,
        }
        .unwrap_or_else(|| format!("Profile {}", index + 1));

        let mut unique = name.clone();
        let mut counter = 2;
        while profiles.contains_key(&unique) {
            unique = format!("{} ({})", name, counter);
            counter += 1;
        }
        profiles.insert(unique, profile_from_value(item)?);
    }
    Ok(profiles)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === parse tests ===

    #[test]
    fn test_parse_current_shape() {
        let store = ProfileStore::parse(
            r#"
activeProfile: Thesis
profiles:
  Default: {}
  Thesis:
    latexEngine: lualatex
    fontSize: 12pt
"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_name(), "Thesis");
        assert_eq!(store.active().latex_engine, "lualatex");
        assert_eq!(store.active().font_size.as_deref(), Some("12pt"));
        assert_eq!(store.get("Default"), Some(&Profile::default()));
    }

    #[test]
    fn test_parse_json_text() {
        let store = ProfileStore::parse(
            r#"{"activeProfile": "A", "profiles": {"A": {"standalone": false}}}"#,
        )
        .unwrap();
        assert!(!store.active().standalone);
    }

    #[test]
    fn test_migrate_legacy_single_profile() {
        let store = ProfileStore::parse(
            r#"{"pandocPath": "/opt/pandoc", "latexEngine": "pdflatex", "crossref": false}"#,
        )
        .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_name(), DEFAULT_PROFILE_NAME);
        let profile = store.active();
        assert_eq!(profile.pandoc_command(), "/opt/pandoc");
        assert_eq!(profile.latex_engine, "pdflatex");
        assert!(!profile.crossref);
    }

    #[test]
    fn test_migrate_profile_array() {
        let store = ProfileStore::parse(
            r#"
activeProfile: Slides
profiles:
  - name: Paper
    latexEngine: pdflatex
  - name: Slides
    documentClass: beamer
  - latexEngine: tectonic
  - name: Paper
"#,
        )
        .unwrap();
        let names: Vec<_> = store.names().collect();
        assert_eq!(names, vec!["Paper", "Slides", "Profile 3", "Paper (2)"]);
        assert_eq!(store.active_name(), "Slides");
        assert!(store.active().is_slides());
        assert_eq!(store.get("Profile 3").unwrap().latex_engine, "tectonic");
    }

    #[test]
    fn test_unknown_active_falls_back_to_first() {
        let store =
            ProfileStore::parse("activeProfile: Gone\nprofiles:\n  A: {}\n  B: {}\n").unwrap();
        assert_eq!(store.active_name(), "A");
    }

    #[test]
    fn test_empty_profiles_gets_default() {
        let store = ProfileStore::parse("profiles: {}\n").unwrap();
        assert_eq!(store.active_name(), DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn test_null_profile_value_is_default() {
        let store = ProfileStore::parse("profiles:\n  Empty:\n").unwrap();
        assert_eq!(store.active(), &Profile::default());
    }

    #[test]
    fn test_empty_text_is_default_store() {
        assert_eq!(ProfileStore::parse("").unwrap(), ProfileStore::default());
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(ProfileStore::parse("profiles: 3").is_err());
        assert!(ProfileStore::parse("[1, 2]").is_err());
        assert!(ProfileStore::parse("latexEngine: [not, a, string]").is_err());
        assert!(ProfileStore::parse("{ unbalanced").is_err());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        assert_eq!(
            ProfileStore::load_or_default("profiles: 3"),
            ProfileStore::default()
        );
    }

    // === persistence tests ===

    #[test]
    fn test_yaml_round_trip() {
        let store = ProfileStore::parse(
            "activeProfile: B\nprofiles:\n  A: {marginsEnabled: true}\n  B: {fontSize: 10pt}\n",
        )
        .unwrap();
        let text = store.to_yaml_string().unwrap();
        assert_eq!(ProfileStore::parse(&text).unwrap(), store);
    }

    #[test]
    fn test_json_round_trip() {
        let store = ProfileStore::parse("profiles:\n  - name: X\n    standalone: false\n").unwrap();
        let text = store.to_json_string().unwrap();
        assert!(text.contains("\"activeProfile\": \"X\""));
        assert_eq!(ProfileStore::parse(&text).unwrap(), store);
    }
}
