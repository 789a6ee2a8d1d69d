//! Document-level risk scoring.
//!
//! penalty = sum of severity weights + missing categories * missing penalty,
//! score = 100 - min(penalty, 100). The fold is a plain sum, so clause order
//! never changes the result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{AnalysisMode, Clause, ClauseCategory, Entities, RiskLevel, RiskReport, Severity};

/// Penalty points per clause severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityWeights {
    #[serde(default)]
    pub none: u32,
    #[serde(default = "default_low")]
    pub low: u32,
    #[serde(default = "default_medium")]
    pub medium: u32,
    #[serde(default = "default_high")]
    pub high: u32,
    #[serde(default = "default_critical")]
    pub critical: u32,
}

fn default_low() -> u32 {
    5
}
fn default_medium() -> u32 {
    15
}
fn default_high() -> u32 {
    30
}
fn default_critical() -> u32 {
    50
}
fn default_missing_penalty() -> u32 {
    10
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            none: 0,
            low: default_low(),
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::None => self.none,
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

/// Rejected scoring configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Severity weights must not decrease: {lower} ({lower_weight}) > {higher} ({higher_weight})")]
pub struct ScoringPolicyError {
    pub lower: Severity,
    pub lower_weight: u32,
    pub higher: Severity,
    pub higher_weight: u32,
}

/// Weights and missing-clause penalty used by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default)]
    pub weights: SeverityWeights,
    #[serde(default = "default_missing_penalty")]
    pub missing_clause_penalty: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            missing_clause_penalty: default_missing_penalty(),
        }
    }
}

impl ScoringPolicy {
    /// A higher severity must never weigh less than a lower one
    pub fn validate(&self) -> Result<(), ScoringPolicyError> {
        for pair in Severity::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let (lower_weight, higher_weight) = (self.weights.weight(lower), self.weights.weight(higher));
            if lower_weight > higher_weight {
                return Err(ScoringPolicyError {
                    lower,
                    lower_weight,
                    higher,
                    higher_weight,
                });
            }
        }
        Ok(())
    }

    /// Score for a set of severities and a missing-category count
    pub fn score<I>(&self, severities: I, missing: usize) -> u8
    where
        I: IntoIterator<Item = Severity>,
    {
        let clause_penalty: u64 = severities
            .into_iter()
            .map(|s| u64::from(self.weights.weight(s)))
            .sum();
        let missing_penalty = missing as u64 * u64::from(self.missing_clause_penalty);
        let penalty = (clause_penalty + missing_penalty).min(100);
        (100 - penalty) as u8
    }
}

/// Combines classified clauses into a RiskReport
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    policy: ScoringPolicy,
}

impl RiskAggregator {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Build the report. Pure and infallible.
    pub fn aggregate(
        &self,
        mut clauses: Vec<Clause>,
        expected: &BTreeSet<ClauseCategory>,
        mode: AnalysisMode,
    ) -> RiskReport {
        clauses.sort_by_key(|c| c.ordinal);

        let observed: BTreeSet<ClauseCategory> = clauses.iter().map(|c| c.category).collect();
        let missing: BTreeSet<ClauseCategory> = expected
            .iter()
            .filter(|c| **c != ClauseCategory::Unclassified && !observed.contains(c))
            .copied()
            .collect();

        let score = self.policy.score(clauses.iter().map(|c| c.severity), missing.len());
        let warnings = clauses
            .iter()
            .filter_map(|c| c.warning.as_ref().map(|w| format!("Clause {}: {}", c.ordinal + 1, w)))
            .collect();

        debug!(score, missing = missing.len(), clauses = clauses.len(), "Aggregated risk");

        RiskReport {
            score,
            risk_level: RiskLevel::from_score(score),
            clauses,
            missing,
            mode,
            document_type: None,
            warnings,
            entities: Entities::default(),
        }
    }
}
