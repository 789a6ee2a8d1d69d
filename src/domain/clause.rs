//! Clauses, categories and severities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Topic of a contract clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseCategory {
    Termination,
    Indemnity,
    Liability,
    Payment,
    Confidentiality,
    NonCompete,
    IntellectualProperty,
    DisputeResolution,
    GoverningLaw,
    DataPrivacy,
    Term,
    ScopeOfWork,
    Unclassified,
}

impl ClauseCategory {
    pub const ALL: [ClauseCategory; 13] = [
        ClauseCategory::Termination,
        ClauseCategory::Indemnity,
        ClauseCategory::Liability,
        ClauseCategory::Payment,
        ClauseCategory::Confidentiality,
        ClauseCategory::NonCompete,
        ClauseCategory::IntellectualProperty,
        ClauseCategory::DisputeResolution,
        ClauseCategory::GoverningLaw,
        ClauseCategory::DataPrivacy,
        ClauseCategory::Term,
        ClauseCategory::ScopeOfWork,
        ClauseCategory::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseCategory::Termination => "termination",
            ClauseCategory::Indemnity => "indemnity",
            ClauseCategory::Liability => "liability",
            ClauseCategory::Payment => "payment",
            ClauseCategory::Confidentiality => "confidentiality",
            ClauseCategory::NonCompete => "non_compete",
            ClauseCategory::IntellectualProperty => "intellectual_property",
            ClauseCategory::DisputeResolution => "dispute_resolution",
            ClauseCategory::GoverningLaw => "governing_law",
            ClauseCategory::DataPrivacy => "data_privacy",
            ClauseCategory::Term => "term",
            ClauseCategory::ScopeOfWork => "scope_of_work",
            ClauseCategory::Unclassified => "unclassified",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ClauseCategory::Termination => "Termination",
            ClauseCategory::Indemnity => "Indemnity",
            ClauseCategory::Liability => "Liability",
            ClauseCategory::Payment => "Payment",
            ClauseCategory::Confidentiality => "Confidentiality",
            ClauseCategory::NonCompete => "Non-Compete",
            ClauseCategory::IntellectualProperty => "Intellectual Property",
            ClauseCategory::DisputeResolution => "Dispute Resolution",
            ClauseCategory::GoverningLaw => "Governing Law",
            ClauseCategory::DataPrivacy => "Data Privacy",
            ClauseCategory::Term => "Term",
            ClauseCategory::ScopeOfWork => "Scope of Work",
            ClauseCategory::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for ClauseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised category or severity names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Lowercase, and fold spaces, hyphens and slashes into underscores
fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' || c == '/' { '_' } else { c })
        .collect()
}

impl FromStr for ClauseCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match normalize_label(s).as_str() {
            "termination" | "term_and_termination" | "cancellation" => ClauseCategory::Termination,
            "indemnity" | "indemnification" | "hold_harmless" => ClauseCategory::Indemnity,
            "liability" | "limitation_of_liability" | "liability_cap" => ClauseCategory::Liability,
            "payment" | "payment_terms" | "compensation" | "fees" => ClauseCategory::Payment,
            "confidentiality" | "nda" | "non_disclosure" | "confidential_information" => {
                ClauseCategory::Confidentiality
            }
            "non_compete" | "noncompete" | "non_solicitation" | "restrictive_covenant" => {
                ClauseCategory::NonCompete
            }
            "intellectual_property" | "ip" | "ownership" => ClauseCategory::IntellectualProperty,
            "dispute_resolution" | "arbitration" | "disputes" => ClauseCategory::DisputeResolution,
            "governing_law" | "jurisdiction" | "applicable_law" => ClauseCategory::GoverningLaw,
            "data_privacy" | "privacy" | "data_protection" => ClauseCategory::DataPrivacy,
            "term" | "duration" | "term_and_duration" => ClauseCategory::Term,
            "scope_of_work" | "services" | "scope" | "position" => ClauseCategory::ScopeOfWork,
            "unclassified" | "other" | "general" | "boilerplate" => ClauseCategory::Unclassified,
            _ => {
                return Err(ParseLabelError {
                    kind: "clause category",
                    value: s.to_string(),
                })
            }
        };
        Ok(category)
    }
}

/// Ordinal risk level of a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::None,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "none" | "no_risk" | "negligible" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" | "med" | "moderate" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" | "severe" | "very_high" => Ok(Severity::Critical),
            _ => Err(ParseLabelError {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// Backend verdict for a single clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ClauseCategory,
    pub severity: Severity,
    pub rationale: String,
}

impl Classification {
    pub fn new(category: ClauseCategory, severity: Severity, rationale: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            rationale: rationale.into(),
        }
    }

    /// Default applied when nothing is known about a clause
    pub fn unclassified(rationale: impl Into<String>) -> Self {
        Self::new(ClauseCategory::Unclassified, Severity::Low, rationale)
    }
}

/// A contiguous span of contract text analysed as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Position in the document, starting at 0
    pub ordinal: usize,

    /// Byte range `[start, end)` into the document text, trailing
    /// whitespace included
    pub span: (usize, usize),

    /// Trimmed clause text
    pub text: String,

    pub category: ClauseCategory,

    pub severity: Severity,

    pub rationale: String,

    /// Set when classification failed and the default was applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Clause {
    /// Create an unclassified clause
    pub fn new(ordinal: usize, span: (usize, usize), text: impl Into<String>) -> Self {
        Self {
            ordinal,
            span,
            text: text.into(),
            category: ClauseCategory::Unclassified,
            severity: Severity::Low,
            rationale: String::new(),
            warning: None,
        }
    }

    /// Apply a backend classification
    pub fn classified(mut self, classification: Classification) -> Self {
        self.category = classification.category;
        self.severity = classification.severity;
        self.rationale = classification.rationale;
        self
    }

    /// Mark the clause as failed: unclassified/low plus a warning
    pub fn failed(mut self, warning: impl Into<String>) -> Self {
        let warning = warning.into();
        self.category = ClauseCategory::Unclassified;
        self.severity = Severity::Low;
        self.rationale = "Classification failed; default applied".to_string();
        self.warning = Some(warning);
        self
    }

    /// Short excerpt for display
    pub fn excerpt(&self, max_chars: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        }
    }
}
