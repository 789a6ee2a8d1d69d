//! Error taxonomy for the analysis pipeline.
//!
//! Input errors (`UnsupportedFormat`, `EmptyDocument`, `InputRejected`) abort
//! the document. Backend errors are either transient (`BackendUnavailable`,
//! `RateLimit`), which the classifier retries, or terminal for the call.
//! `OutOfScope` is a refusal rather than a crash and callers render it as such.

use std::time::Duration;

use thiserror::Error;

use crate::core::safety::SafetyViolation;
use crate::domain::{ClauseCategory, DocumentType};

/// Result alias used across the pipeline
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Pipeline errors
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("Unsupported format ({format}): {reason}")]
    UnsupportedFormat { format: String, reason: String },

    #[error("Document contains no text after whitespace normalization")]
    EmptyDocument,

    #[error("Input rejected: {0}")]
    InputRejected(#[from] SafetyViolation),

    #[error("Analysis backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Analysis backend rate limited{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<Duration> },

    #[error("Analysis backend rejected the request (HTTP {status}): {message}")]
    BackendRejected { status: u16, message: String },

    #[error("Backend returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("The contract does not address this question: {question}")]
    OutOfScope { question: String },

    #[error("No redraft template for category '{category}'{}", jurisdiction_hint(.jurisdiction))]
    NoTemplateAvailable {
        category: ClauseCategory,
        jurisdiction: Option<String>,
    },

    #[error("A {contract} cannot be redrafted into the {template} template")]
    IncompatibleTemplate {
        contract: DocumentType,
        template: DocumentType,
    },
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

fn jurisdiction_hint(jurisdiction: &Option<String>) -> String {
    match jurisdiction {
        Some(j) => format!(" in jurisdiction '{}'", j),
        None => String::new(),
    }
}

impl AnalysisError {
    /// Whether the failed call may succeed if repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalysisError::BackendUnavailable(_) | AnalysisError::RateLimit { .. }
        )
    }

    /// Server-provided backoff hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AnalysisError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub(crate) fn unsupported(format: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::UnsupportedFormat {
            format: format.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AnalysisError::BackendUnavailable("timeout".into()).is_transient());
        assert!(AnalysisError::RateLimit { retry_after: None }.is_transient());
        assert!(!AnalysisError::EmptyDocument.is_transient());
        assert!(!AnalysisError::BackendRejected {
            status: 401,
            message: "invalid api key".into()
        }
        .is_transient());
        assert!(!AnalysisError::OutOfScope {
            question: "weather".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::RateLimit {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.to_string(), "Analysis backend rate limited (retry after 7s)");

        let err = AnalysisError::NoTemplateAvailable {
            category: ClauseCategory::Unclassified,
            jurisdiction: None,
        };
        assert_eq!(err.to_string(), "No redraft template for category 'unclassified'");
    }
}
