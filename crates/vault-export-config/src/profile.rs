/*
 * profile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * A single named export configuration.
 */

//! Profile definition and defaults.
//!
//! Every field carries `#[serde(default)]` semantics through the container
//! attribute, so partially written or older settings files deserialize into
//! a complete profile.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name given to the profile created for a fresh or migrated store.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Caption titles and cross-reference prefixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSettings {
    /// Display name for figures ("Figure 1: ...")
    pub figure_title: String,
    /// Display name for tables
    pub table_title: String,
    /// Display name for code listings
    pub listing_title: String,
    /// Display name for equations
    pub equation_title: String,
    /// Inline reference prefix for figures ("Fig. 1")
    pub figure_prefix: String,
    /// Inline reference prefix for tables
    pub table_prefix: String,
    /// Inline reference prefix for listings
    pub listing_prefix: String,
    /// Inline reference prefix for equations
    pub equation_prefix: String,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            figure_title: "Figure".to_string(),
            table_title: "Table".to_string(),
            listing_title: "Listing".to_string(),
            equation_title: "Equation".to_string(),
            figure_prefix: "Fig.".to_string(),
            table_prefix: "Tab.".to_string(),
            listing_prefix: "Lst.".to_string(),
            equation_prefix: "Eq.".to_string(),
        }
    }
}

/// A named bundle of conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Path to the pandoc binary; `None` means `pandoc` from PATH
    pub pandoc_path: Option<PathBuf>,

    /// PDF engine passed as `--pdf-engine`
    pub latex_engine: String,

    /// Filters applied in order. `.lua` files run as Lua filters,
    /// everything else as JSON filters.
    pub filters: Vec<PathBuf>,

    /// Run the cross-reference filter
    pub crossref: bool,

    /// Cross-reference filter binary
    pub crossref_filter: PathBuf,

    /// Resource search path; defaults to the input's directory
    pub resource_path: Option<PathBuf>,

    /// Vault-relative directory image embeds are resolved in, if any
    pub search_directory: Option<PathBuf>,

    /// Raw header content injected ahead of the document body
    pub custom_header: String,

    /// Caption titles and reference prefixes
    pub labels: LabelSettings,

    /// Apply [`Profile::margin`] through the geometry package
    pub margins_enabled: bool,

    /// Page margin, e.g. `2cm`
    pub margin: String,

    /// Number pages
    pub page_numbers: bool,

    /// Scale embedded images to [`Profile::image_scale`] of the line width
    pub scale_images: bool,

    /// Fraction of the line width images occupy (0, 1]
    pub image_scale: f32,

    /// Base font size, e.g. `11pt`
    pub font_size: Option<String>,

    /// LaTeX document class; `beamer` switches to slide output
    pub document_class: String,

    /// Options for the document class, e.g. `twocolumn`
    pub class_options: Option<String>,

    /// Produce a standalone document
    pub standalone: bool,

    /// Read raw LaTeX macros in the source (`\newcommand` expansion)
    pub advanced_commands: bool,

    /// Additional arguments appended to every invocation
    pub extra_args: Vec<String>,

    /// Run the lint-fix command on the intermediate markdown
    pub lint_on_export: bool,

    /// Lint-fix command; receives the intermediate file path as last argument.
    /// Words are split on whitespace; quote an argument that contains spaces.
    pub lint_command: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            pandoc_path: None,
            latex_engine: "xelatex".to_string(),
            filters: Vec::new(),
            crossref: true,
            crossref_filter: PathBuf::from("pandoc-crossref"),
            resource_path: None,
            search_directory: None,
            custom_header: String::new(),
            labels: LabelSettings::default(),
            margins_enabled: false,
            margin: "2cm".to_string(),
            page_numbers: true,
            scale_images: true,
            image_scale: 0.8,
            font_size: None,
            document_class: "article".to_string(),
            class_options: None,
            standalone: true,
            advanced_commands: false,
            extra_args: Vec::new(),
            lint_on_export: false,
            lint_command: None,
        }
    }
}

impl Profile {
    /// The compiler command name.
    pub fn pandoc_command(&self) -> String {
        self.pandoc_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pandoc".to_string())
    }

    /// Whether the slide document class is selected.
    pub fn is_slides(&self) -> bool {
        self.document_class.trim().eq_ignore_ascii_case("beamer")
    }

    /// Image width as a percentage of the line width, e.g. `80%`.
    ///
    /// Returns `None` when image scaling is switched off.
    pub fn image_width(&self) -> Option<String> {
        if !self.scale_images {
            return None;
        }
        let percent = (self.image_scale.clamp(0.01, 1.0) * 100.0).round() as u32;
        Some(format!("{}%", percent))
    }
}
