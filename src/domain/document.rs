//! Loaded contract documents.
//!
//! A Document is created by the loader and never mutated afterwards.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Source format of an uploaded contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Txt,
}

impl SourceFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        ext.parse().map_err(|_| {
            AnalysisError::unsupported(
                if ext.is_empty() { "<none>".to_string() } else { ext.clone() },
                format!("cannot infer format from {}", path.display()),
            )
        })
    }

    /// Guess the format from magic bytes. Anything that is neither a PDF
    /// nor a ZIP container is treated as text.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            SourceFormat::Pdf
        } else if bytes.starts_with(b"PK\x03\x04") {
            SourceFormat::Docx
        } else {
            SourceFormat::Txt
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
            SourceFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "docx" => Ok(SourceFormat::Docx),
            "txt" | "text" | "md" => Ok(SourceFormat::Txt),
            other => Err(AnalysisError::unsupported(other, "supported formats are pdf, docx, txt")),
        }
    }
}

/// Dominant writing system of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Latin,
    Devanagari,
    Cyrillic,
    Arabic,
    Cjk,
    Other,
}

/// Detected language of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// ISO 639-1 code, or "und" when undetermined
    pub code: String,
    pub script: Script,
}

impl Language {
    pub fn new(code: impl Into<String>, script: Script) -> Self {
        Self {
            code: code.into(),
            script,
        }
    }

    pub fn undetermined() -> Self {
        Self::new("und", Script::Other)
    }

    pub fn is_undetermined(&self) -> bool {
        self.code == "und"
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.code, self.script)
    }
}

/// An uploaded contract with its extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Original upload bytes
    #[serde(skip)]
    pub raw: Vec<u8>,

    /// "sha256:<hex>" of the raw bytes
    pub fingerprint: String,

    pub format: SourceFormat,

    pub language: Language,

    /// Normalized plain text
    pub text: String,

    /// Jurisdiction tag (e.g. "in", "us", "uk"), if known
    pub jurisdiction: Option<String>,
}

impl Document {
    /// Override the detected jurisdiction
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into().trim().to_ascii_lowercase());
        self
    }

    /// Number of characters in the extracted text
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Lightweight view of a document used in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub fingerprint: String,
    pub format: SourceFormat,
    pub language: Language,
    pub jurisdiction: Option<String>,
    pub char_count: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            fingerprint: doc.fingerprint.clone(),
            format: doc.format,
            language: doc.language.clone(),
            jurisdiction: doc.jurisdiction.clone(),
            char_count: doc.char_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("a/contract.PDF")).unwrap(), SourceFormat::Pdf);
        assert_eq!(SourceFormat::from_path(Path::new("nda.docx")).unwrap(), SourceFormat::Docx);
        assert_eq!(SourceFormat::from_path(Path::new("terms.txt")).unwrap(), SourceFormat::Txt);
        assert!(matches!(
            SourceFormat::from_path(Path::new("scan.jpg")),
            Err(AnalysisError::UnsupportedFormat { .. })
        ));
        assert!(SourceFormat::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_sniff() {
        assert_eq!(SourceFormat::sniff(b"%PDF-1.7\n"), SourceFormat::Pdf);
        assert_eq!(SourceFormat::sniff(b"PK\x03\x04rest"), SourceFormat::Docx);
        assert_eq!(SourceFormat::sniff(b"1. Payment"), SourceFormat::Txt);
    }
}
