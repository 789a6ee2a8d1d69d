//! Redraft suggestions from the clause template library.
//!
//! Template choice for a clause's category:
//! - document jurisdiction known: exact jurisdiction match (0.9), else a
//!   generic entry (0.75)
//! - jurisdiction unknown: generic entry (0.8), else the first
//!   jurisdiction-specific entry by id (0.6)
//!
//! No candidate means `NoTemplateAvailable`. Clauses are never skipped
//! silently.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::domain::{
    Clause, RedraftBatch, RedraftFailure, RedraftSuggestion, RiskReport, Severity, TemplateEntry,
};
use crate::error::{AnalysisError, Result};
use crate::library::TemplateLibrary;

pub const CONFIDENCE_EXACT_JURISDICTION: f32 = 0.9;
pub const CONFIDENCE_GENERIC: f32 = 0.8;
pub const CONFIDENCE_GENERIC_FALLBACK: f32 = 0.75;
pub const CONFIDENCE_OTHER_JURISDICTION: f32 = 0.6;

/// Maps risky clauses to safer template text
#[derive(Debug, Clone)]
pub struct RedraftEngine {
    library: Arc<TemplateLibrary>,
}

impl RedraftEngine {
    pub fn new(library: Arc<TemplateLibrary>) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    fn select(&self, clause: &Clause, jurisdiction: Option<&str>) -> Option<(&TemplateEntry, f32)> {
        let candidates: Vec<&TemplateEntry> = self.library.for_category(clause.category).collect();
        let generic = candidates.iter().copied().find(|e| e.is_generic());

        match jurisdiction {
            Some(tag) => candidates
                .iter()
                .copied()
                .find(|e| e.jurisdiction.as_deref() == Some(tag))
                .map(|e| (e, CONFIDENCE_EXACT_JURISDICTION))
                .or_else(|| generic.map(|e| (e, CONFIDENCE_GENERIC_FALLBACK))),
            None => generic.map(|e| (e, CONFIDENCE_GENERIC)).or_else(|| {
                candidates
                    .first()
                    .copied()
                    .map(|e| (e, CONFIDENCE_OTHER_JURISDICTION))
            }),
        }
    }

    /// Suggest a replacement for one clause
    pub fn redraft(&self, clause: &Clause, jurisdiction: Option<&str>) -> Result<RedraftSuggestion> {
        let jurisdiction = jurisdiction
            .map(|j| j.trim().to_lowercase())
            .filter(|j| !j.is_empty());

        let (entry, confidence) =
            self.select(clause, jurisdiction.as_deref())
                .ok_or_else(|| AnalysisError::NoTemplateAvailable {
                    category: clause.category,
                    jurisdiction: jurisdiction.clone(),
                })?;

        debug!(
            ordinal = clause.ordinal,
            template = %entry.id,
            confidence,
            "Selected redraft template"
        );

        Ok(RedraftSuggestion {
            clause_ordinal: clause.ordinal,
            template_id: entry.id.clone(),
            category: clause.category,
            jurisdiction: entry.jurisdiction.clone(),
            original_text: clause.text.clone(),
            suggested_text: entry.text.clone(),
            confidence,
        })
    }

    /// Redraft every clause at or above `min_severity`, listing failures
    /// next to suggestions
    #[instrument(skip(self, report), fields(clauses = report.clauses.len()))]
    pub fn redraft_risky(&self, report: &RiskReport, jurisdiction: Option<&str>, min_severity: Severity) -> RedraftBatch {
        let mut batch = RedraftBatch::default();

        for clause in report.clauses_at_least(min_severity) {
            match self.redraft(clause, jurisdiction) {
                Ok(suggestion) => batch.suggestions.push(suggestion),
                Err(e) => batch.failures.push(RedraftFailure {
                    clause_ordinal: clause.ordinal,
                    category: clause.category,
                    reason: e.to_string(),
                }),
            }
        }

        info!(
            suggestions = batch.suggestions.len(),
            failures = batch.failures.len(),
            library_version = %self.library.version,
            "Redraft complete"
        );
        batch
    }
}
