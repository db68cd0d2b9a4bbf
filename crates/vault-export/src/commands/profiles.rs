//! List and edit export profiles.
//!
//! Edits go through the profile reducer and are written back to the
//! settings file they were read from.

use std::path::PathBuf;

use anyhow::{Context, Result};

use vault_export_config::{ProfileEvent, ProfileStore, apply_event};

use super::load_store;

/// Arguments for the profiles command
#[derive(Debug)]
pub struct ProfilesArgs {
    pub config: Option<PathBuf>,
    pub create: Option<String>,
    pub delete: Option<String>,
    pub activate: Option<String>,
    pub json: bool,
}

/// Execute the profiles command
pub fn execute(args: ProfilesArgs) -> Result<()> {
    let mut store = load_store(args.config.as_deref());

    let events: Vec<ProfileEvent> = [
        args.create.map(ProfileEvent::create),
        args.delete.map(ProfileEvent::delete),
        args.activate.map(ProfileEvent::activate),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !events.is_empty() {
        let path = args
            .config
            .as_deref()
            .context("Editing profiles requires --config")?;
        for event in events {
            store = apply_event(&store, event)?;
        }
        store
            .save(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }

    if args.json {
        println!("{}", store.to_json_string()?);
    } else {
        print!("{}", render_list(&store));
    }
    Ok(())
}

/// One line per profile, the active one marked with `*`.
fn render_list(store: &ProfileStore) -> String {
    store
        .names()
        .map(|name| {
            let marker = if name == store.active_name() { '*' } else { ' ' };
            format!("{} {}\n", marker, name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_list_marks_active() {
        let store = ProfileStore::default();
        let store = apply_event(&store, ProfileEvent::create("Slides")).unwrap();
        let store = apply_event(&store, ProfileEvent::activate("Slides")).unwrap();
        assert_eq!(render_list(&store), "  Default\n* Slides\n");
    }
}
