//! Versioned library of safe clause templates.
//!
//! The built-in library is embedded at compile time; a replacement can be
//! loaded from a YAML file with the same layout. Either way it is loaded once
//! and shared read-only.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ClauseCategory, TemplateEntry};

const BUILTIN_LIBRARY: &str = include_str!("../../templates/clauses.yaml");

/// Clause template library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLibrary {
    /// Library version, reported with redraft output
    pub version: String,

    entries: Vec<TemplateEntry>,
}

impl TemplateLibrary {
    /// Library compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_LIBRARY).context("Built-in template library is invalid")
    }

    /// Load a library from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template library: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to load template library: {}", path.display()))
    }

    /// Parse and validate a library. Entries are kept sorted by id.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut library: TemplateLibrary = serde_yaml::from_str(content).context("Failed to parse template YAML")?;

        let mut seen = HashSet::new();
        for entry in &library.entries {
            if entry.id.trim().is_empty() {
                bail!("Template entry with empty id");
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("Duplicate template id '{}'", entry.id);
            }
            if entry.text.trim().is_empty() {
                bail!("Template '{}' has no text", entry.id);
            }
            if entry.category == ClauseCategory::Unclassified {
                bail!("Template '{}' targets the unclassified category", entry.id);
            }
        }

        for entry in &mut library.entries {
            entry.jurisdiction = entry.jurisdiction.take().map(|j| j.trim().to_lowercase());
        }
        library.entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(library)
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&TemplateEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries for a category, in id order
    pub fn for_category(&self, category: ClauseCategory) -> impl Iterator<Item = &TemplateEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_library_loads() {
        let library = TemplateLibrary::builtin().unwrap();
        assert!(!library.is_empty());
        assert!(library.get("termination-generic").is_some());
        assert_eq!(
            library.get("dispute-resolution-in").unwrap().jurisdiction.as_deref(),
            Some("in")
        );
        // Every redraftable category has at least one entry
        for category in ClauseCategory::ALL.iter().filter(|c| **c != ClauseCategory::Unclassified) {
            assert!(library.for_category(*category).next().is_some(), "no template for {}", category);
        }
    }

    #[test]
    fn test_entries_sorted_by_id() {
        let library = TemplateLibrary::builtin().unwrap();
        let ids: Vec<&str> = library.entries().iter().map(|e| e.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
version: "1"
entries:
  - id: a
    category: payment
    text: Pay on time.
  - id: a
    category: payment
    text: Pay later.
"#;
        let err = TemplateLibrary::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate template id"));
    }

    #[test]
    fn test_load_from_file_normalizes_jurisdiction() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "version: \"custom\"\nentries:\n  - id: pay-sg\n    category: payment\n    jurisdiction: \" SG \"\n    text: Pay in SGD."
        )
        .unwrap();

        let library = TemplateLibrary::load(file.path()).unwrap();
        assert_eq!(library.version, "custom");
        assert_eq!(library.get("pay-sg").unwrap().jurisdiction.as_deref(), Some("sg"));
    }
}
