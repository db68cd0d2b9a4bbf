/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output format identifiers.
 */

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Output format of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PDF through a LaTeX engine
    Pdf,
    /// LaTeX source
    Latex,
    /// Word document
    Docx,
    /// OpenDocument text
    Odt,
    /// Standalone HTML
    Html,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Pdf,
        OutputFormat::Latex,
        OutputFormat::Docx,
        OutputFormat::Odt,
        OutputFormat::Html,
    ];

    /// Get the format name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Latex => "latex",
            OutputFormat::Docx => "docx",
            OutputFormat::Odt => "odt",
            OutputFormat::Html => "html",
        }
    }

    /// File extension of the output, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Latex => "tex",
            other => other.as_str(),
        }
    }

    /// Word-processor archives, the only formats that take a reference document
    pub fn is_document_archive(&self) -> bool {
        matches!(self, OutputFormat::Docx | OutputFormat::Odt)
    }

    /// Whether raw TeX in the input survives into the output
    pub fn keeps_raw_tex(&self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Latex)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "latex" | "tex" => Ok(OutputFormat::Latex),
            "docx" => Ok(OutputFormat::Docx),
            "odt" => Ok(OutputFormat::Odt),
            "html" => Ok(OutputFormat::Html),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert_eq!("tex".parse::<OutputFormat>(), Ok(OutputFormat::Latex));
        assert!("epub".parse::<OutputFormat>().is_err());
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Latex.extension(), "tex");
        assert_eq!(OutputFormat::Docx.extension(), "docx");
    }

    #[test]
    fn test_archives() {
        assert!(OutputFormat::Docx.is_document_archive());
        assert!(OutputFormat::Odt.is_document_archive());
        assert!(!OutputFormat::Pdf.is_document_archive());
    }
}
