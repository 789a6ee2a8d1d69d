//! Document loading: bytes in, immutable Document out.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::core::safety::InputLimits;
use crate::domain::{Document, SourceFormat};
use crate::error::{AnalysisError, Result};

use super::formats::extract_text;
use super::language::detect_language;

/// Extracts text, language and jurisdiction from uploaded contracts
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    limits: InputLimits,
}

impl DocumentLoader {
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    /// Load a document from bytes in a declared format
    pub fn load(&self, bytes: &[u8], format: SourceFormat) -> Result<Document> {
        self.load_from(bytes, format, None)
    }

    /// Load a document, also checking the source path against the denylist
    #[instrument(skip(self, bytes), fields(format = %format, size = bytes.len()))]
    pub fn load_from(&self, bytes: &[u8], format: SourceFormat, source_path: Option<&Path>) -> Result<Document> {
        self.limits.validate_upload(bytes, source_path)?;

        let raw_text = extract_text(bytes, format)?;
        let text = normalize_whitespace(&raw_text);
        if text.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }
        self.limits.validate_text(&text)?;

        let language = detect_language(&text);
        let jurisdiction = detect_jurisdiction(&text);
        let fingerprint = fingerprint(bytes);

        info!(
            %language,
            jurisdiction = jurisdiction.as_deref().unwrap_or("unknown"),
            chars = text.len(),
            "Document loaded"
        );

        Ok(Document {
            raw: bytes.to_vec(),
            fingerprint,
            format,
            language,
            text,
            jurisdiction,
        })
    }
}

/// "sha256:<hex>" of the given bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Normalize line endings and blank runs, trim lines and the whole text
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
        .replace('\u{00A0}', " ");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if out.is_empty() {
            out.push_str(line.trim_start());
        } else {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
            out.push_str(line);
        }
        blank_run = 0;
    }
    out
}

fn governing_law_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)governed by|laws of|courts (?:of|at|in)|jurisdiction of|exclusive jurisdiction")
            .expect("static regex")
    })
}

const JURISDICTIONS: [(&str, &[&str]); 4] = [
    (
        "in",
        &[
            "india", "karnataka", "maharashtra", "delhi", "mumbai", "bangalore", "bengaluru",
            "chennai", "tamil nadu", "hyderabad", "pune", "kolkata",
        ],
    ),
    (
        "us",
        &["united states", "usa", "california", "new york", "delaware", "texas", "washington"],
    ),
    ("uk", &["england", "wales", "united kingdom", "scotland"]),
    ("sg", &["singapore"]),
];

/// Find a jurisdiction tag from governing-law wording
pub fn detect_jurisdiction(text: &str) -> Option<String> {
    for m in governing_law_re().find_iter(text) {
        let window: String = text[m.end()..].chars().take(120).collect::<String>().to_lowercase();
        for (tag, places) in JURISDICTIONS.iter() {
            if places.iter().any(|p| window.contains(p)) {
                debug!(tag, "Jurisdiction detected");
                return Some(tag.to_string());
            }
        }
    }
    None
}
