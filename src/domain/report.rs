//! Risk reports and analysis runs.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clause::{Clause, ClauseCategory, ParseLabelError};
use super::document::DocumentSummary;
use super::template::RedraftBatch;

/// Which backend produced an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Live,
    Demo,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Live => f.write_str("live"),
            AnalysisMode::Demo => f.write_str("demo"),
        }
    }
}

/// Contract type used for missing-clause comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Service,
    Employment,
    Nda,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [DocumentType::Service, DocumentType::Employment, DocumentType::Nda];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Service => "service",
            DocumentType::Employment => "employment",
            DocumentType::Nda => "nda",
        }
    }

    /// Display name matching the agreement template title
    pub fn title(&self) -> &'static str {
        match self {
            DocumentType::Service => "Service Agreement",
            DocumentType::Employment => "Employment Agreement",
            DocumentType::Nda => "NDA",
        }
    }

    /// Categories a contract of this type is expected to contain
    pub fn expected_categories(&self) -> BTreeSet<ClauseCategory> {
        use ClauseCategory::*;
        let list: &[ClauseCategory] = match self {
            DocumentType::Service => &[
                Payment,
                Termination,
                Liability,
                Confidentiality,
                DisputeResolution,
                GoverningLaw,
            ],
            DocumentType::Employment => &[
                Payment,
                Termination,
                Confidentiality,
                GoverningLaw,
                DisputeResolution,
            ],
            DocumentType::Nda => &[Confidentiality, Term, GoverningLaw, DisputeResolution],
        };
        list.iter().copied().collect()
    }

    /// Categories expected when the contract type is unknown
    pub fn baseline_categories() -> BTreeSet<ClauseCategory> {
        [ClauseCategory::DisputeResolution].into_iter().collect()
    }

    /// Infer the contract type from its wording. Title cues in the opening
    /// lines win over party vocabulary in the body.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        let head: String = lower.chars().take(400).collect();

        let title_cues: [(&str, DocumentType); 7] = [
            ("non-disclosure", DocumentType::Nda),
            ("nondisclosure", DocumentType::Nda),
            ("confidentiality agreement", DocumentType::Nda),
            ("employment", DocumentType::Employment),
            ("offer letter", DocumentType::Employment),
            ("service agreement", DocumentType::Service),
            ("services agreement", DocumentType::Service),
        ];
        for (cue, doc_type) in title_cues {
            if head.contains(cue) {
                return Some(doc_type);
            }
        }

        let body_cues: [(&[&str], DocumentType); 3] = [
            (&["disclosing party", "receiving party"], DocumentType::Nda),
            (&["employee", "employer"], DocumentType::Employment),
            (&["service provider", "the services", "statement of work"], DocumentType::Service),
        ];
        body_cues
            .iter()
            .find(|(cues, _)| cues.iter().any(|c| lower.contains(c)))
            .map(|(_, doc_type)| *doc_type)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for DocumentType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "service" | "service agreement" | "service contract" | "services agreement" => {
                Ok(DocumentType::Service)
            }
            "employment" | "employment agreement" | "employment contract" => Ok(DocumentType::Employment),
            "nda" | "non disclosure agreement" | "non disclosure" | "confidentiality agreement" => {
                Ok(DocumentType::Nda)
            }
            _ => Err(ParseLabelError {
                kind: "document type",
                value: s.to_string(),
            }),
        }
    }
}

/// Three-band reading of the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Scores are safety scores: 100 means no detected risk
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => RiskLevel::Low,
            40..=69 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("Low"),
            RiskLevel::Medium => f.write_str("Medium"),
            RiskLevel::High => f.write_str("High"),
        }
    }
}

/// Document-level findings
///
/// Contains no timestamps or random ids: the same clauses, expectations
/// and mode always produce an equal report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// 0-100, higher is safer
    pub score: u8,

    pub risk_level: RiskLevel,

    /// Sorted by ordinal
    pub clauses: Vec<Clause>,

    /// Expected categories with no matching clause
    pub missing: BTreeSet<ClauseCategory>,

    pub mode: AnalysisMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,

    /// Per-clause classification warnings, in ordinal order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default, skip_serializing_if = "Entities::is_empty")]
    pub entities: Entities,
}

/// Parties, dates and monetary amounts named in a contract, each in order
/// of first mention
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub amounts: Vec<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty() && self.dates.is_empty() && self.amounts.is_empty()
    }
}

impl RiskReport {
    /// Clauses at or above a severity
    pub fn clauses_at_least(&self, severity: super::Severity) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |c| c.severity >= severity)
    }

    pub fn clause(&self, ordinal: usize) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.ordinal == ordinal)
    }
}

/// A single pipeline run over one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub document: DocumentSummary,
    pub report: RiskReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redrafts: Option<RedraftBatch>,
}

impl Analysis {
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}
