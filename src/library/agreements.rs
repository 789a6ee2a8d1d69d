//! Full agreement templates with `[PLACEHOLDER]` fields.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::domain::{ContractFields, DocumentType, NOT_SPECIFIED};
use crate::error::{AnalysisError, Result};

const SERVICE: &str = include_str!("../../templates/agreements/service.txt");
const NDA: &str = include_str!("../../templates/agreements/nda.txt");
const EMPLOYMENT: &str = include_str!("../../templates/agreements/employment.txt");

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([A-Z][A-Z_]*)\]").expect("static regex"))
}

/// A clean agreement for one document type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgreementTemplate {
    pub doc_type: DocumentType,
    body: &'static str,
}

impl AgreementTemplate {
    pub fn for_type(doc_type: DocumentType) -> Self {
        let body = match doc_type {
            DocumentType::Service => SERVICE,
            DocumentType::Nda => NDA,
            DocumentType::Employment => EMPLOYMENT,
        };
        Self { doc_type, body }
    }

    pub fn all() -> [Self; 3] {
        DocumentType::ALL.map(Self::for_type)
    }

    pub fn title(&self) -> &'static str {
        self.doc_type.title()
    }

    /// Unfilled template text
    pub fn body(&self) -> &'static str {
        self.body
    }

    /// Placeholder names used by the template, e.g. `START_DATE`
    pub fn placeholders(&self) -> BTreeSet<&'static str> {
        placeholder_re()
            .captures_iter(self.body)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Fill placeholders from fields (matched by upper-cased key). Anything
    /// left over reads as not specified.
    pub fn populate(&self, fields: &ContractFields) -> String {
        let values: HashMap<String, &str> = fields
            .fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.to_uppercase(), v.as_str()))
            .collect();

        placeholder_re()
            .replace_all(self.body, |caps: &Captures| {
                values.get(&caps[1]).copied().unwrap_or(NOT_SPECIFIED).to_string()
            })
            .into_owned()
    }
}

/// Template a contract may be redrafted into. Only the contract's own type
/// is compatible.
pub fn compatible_template(contract: DocumentType, requested: DocumentType) -> Result<AgreementTemplate> {
    if contract != requested {
        return Err(AnalysisError::IncompatibleTemplate {
            contract,
            template: requested,
        });
    }
    Ok(AgreementTemplate::for_type(requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_uses_known_fields() {
        for template in AgreementTemplate::all() {
            for placeholder in template.placeholders() {
                assert!(
                    ContractFields::KEYS.contains(&placeholder.to_lowercase().as_str()),
                    "{} uses unknown placeholder {}",
                    template.title(),
                    placeholder
                );
            }
        }
    }

    #[test]
    fn test_populate_fills_and_defaults() {
        let mut fields = ContractFields::default();
        fields.set("provider", "Acme Pvt Ltd");
        fields.set("Jurisdiction", "India");
        fields.set("amount", "  ");

        let text = AgreementTemplate::for_type(DocumentType::Service).populate(&fields);
        assert!(text.contains("PROVIDER: Acme Pvt Ltd"));
        assert!(text.contains("governed by the laws of India."));
        assert!(text.contains(&format!("Total Amount: {}", NOT_SPECIFIED)));
        assert!(!placeholder_re().is_match(&text));
    }

    #[test]
    fn test_compatibility() {
        assert!(compatible_template(DocumentType::Nda, DocumentType::Nda).is_ok());
        assert!(matches!(
            compatible_template(DocumentType::Nda, DocumentType::Employment),
            Err(AnalysisError::IncompatibleTemplate { .. })
        ));
    }
}
