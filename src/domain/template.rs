//! Template entries, redraft suggestions and extracted contract fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::clause::ClauseCategory;
use super::report::DocumentType;

/// Placeholder value for fields the contract does not state
pub const NOT_SPECIFIED: &str = "Not specified in the provided contract";

/// A canonical safe clause in the template library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub id: String,
    pub category: ClauseCategory,
    /// Jurisdiction tag; `None` applies everywhere
    #[serde(default)]
    pub jurisdiction: Option<String>,
    pub text: String,
}

impl TemplateEntry {
    pub fn is_generic(&self) -> bool {
        self.jurisdiction.is_none()
    }
}

/// Replacement proposed for a risky clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedraftSuggestion {
    pub clause_ordinal: usize,
    pub template_id: String,
    pub category: ClauseCategory,
    pub jurisdiction: Option<String>,
    pub original_text: String,
    pub suggested_text: String,
    /// 0.0-1.0, how closely the template fits the document
    pub confidence: f32,
}

/// A clause that could not be redrafted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedraftFailure {
    pub clause_ordinal: usize,
    pub category: ClauseCategory,
    pub reason: String,
}

/// Redrafts for every risky clause of a report. Failures are listed
/// alongside suggestions rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedraftBatch {
    pub suggestions: Vec<RedraftSuggestion>,
    pub failures: Vec<RedraftFailure>,
}

impl RedraftBatch {
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty() && self.failures.is_empty()
    }
}

/// Structured fields pulled from a contract for template population
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFields {
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl ContractFields {
    /// Field names every agreement template understands
    pub const KEYS: [&'static str; 11] = [
        "contract_type",
        "services",
        "amount",
        "termination_notice",
        "confidentiality",
        "provider",
        "client",
        "start_date",
        "end_date",
        "payment_terms",
        "jurisdiction",
    ];

    /// All known fields set to the not-specified marker
    pub fn unspecified(contract_type: &str) -> Self {
        let mut fields: BTreeMap<String, String> = Self::KEYS
            .iter()
            .map(|k| (k.to_string(), NOT_SPECIFIED.to_string()))
            .collect();
        fields.insert("contract_type".to_string(), contract_type.to_string());
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Whether a field holds a real value
    pub fn is_specified(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| !v.trim().is_empty() && v != NOT_SPECIFIED)
            .unwrap_or(false)
    }
}

/// A clean agreement populated from a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementDraft {
    pub doc_type: DocumentType,
    pub fields: ContractFields,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_fields() {
        let fields = ContractFields::unspecified("NDA");
        assert_eq!(fields.get("contract_type"), Some("NDA"));
        assert_eq!(fields.get("amount"), Some(NOT_SPECIFIED));
        assert!(!fields.is_specified("amount"));
        assert!(fields.is_specified("contract_type"));
    }

    #[test]
    fn test_template_entry_yaml() {
        let yaml = "id: liability-generic\ncategory: liability\ntext: Liability is capped.\n";
        let entry: TemplateEntry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entry.category, ClauseCategory::Liability);
        assert!(entry.is_generic());
    }
}
