//! Concurrent clause classification.
//!
//! Clauses fan out over a `JoinSet`, bounded by a semaphore. Transient
//! backend errors are retried per clause. A clause that still fails is
//! marked unclassified/low with a warning; the document only fails when
//! every clause does.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::adapters::AnalysisBackend;
use crate::domain::{Clause, Language};
use crate::error::{AnalysisError, Result};

use super::retry::{with_retry, RetryPolicy};

/// Default number of in-flight backend calls
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Assigns categories and severities through the analysis backend
#[derive(Clone)]
pub struct ClauseClassifier {
    backend: Arc<dyn AnalysisBackend>,
    retry: RetryPolicy,
    max_concurrency: usize,
}

impl ClauseClassifier {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        &self.backend
    }

    /// Classify all clauses, returning them in ordinal order
    #[instrument(skip_all, fields(clauses = clauses.len(), backend = self.backend.name()))]
    pub async fn classify_all(&self, clauses: Vec<Clause>, language: &Language) -> Result<Vec<Clause>> {
        let total = clauses.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut pending: BTreeMap<usize, Clause> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for clause in clauses {
            pending.insert(clause.ordinal, clause.clone());

            let backend = Arc::clone(&self.backend);
            let retry = self.retry.clone();
            let language = language.clone();
            let permits = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let label = format!("classify clause {}", clause.ordinal);
                let result = with_retry(&retry, &label, || backend.classify(&clause, &language)).await;
                (clause.ordinal, result)
            });
        }

        let mut results: BTreeMap<usize, Result<_>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ordinal, result)) => {
                    results.insert(ordinal, result);
                }
                Err(e) => warn!(error = %e, "Classification task aborted"),
            }
        }

        let mut classified = Vec::with_capacity(total);
        let mut first_error: Option<AnalysisError> = None;
        let mut failures = 0usize;

        for (ordinal, clause) in pending {
            let result = results
                .remove(&ordinal)
                .unwrap_or_else(|| Err(AnalysisError::BackendUnavailable("classification task aborted".into())));

            match result {
                Ok(classification) => classified.push(clause.classified(classification)),
                Err(e) => {
                    warn!(ordinal, error = %e, "Clause classification failed, applying default");
                    failures += 1;
                    let warning = e.to_string();
                    first_error.get_or_insert(e);
                    classified.push(clause.failed(warning));
                }
            }
        }

        if total > 0 && failures == total {
            if let Some(e) = first_error {
                error!(clauses = total, error = %e, "Every clause failed to classify");
                return Err(e);
            }
        }

        info!(clauses = total, failures, "Classification complete");
        Ok(classified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{
        AnalysisMode, Classification, ClauseCategory, ContractFields, Document, DocumentType, Severity, Turn,
    };

    /// Fails clauses containing "boom"; optionally fails every call a few times first
    struct ScriptedBackend {
        transient_failures: AtomicU32,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(transient_failures: u32) -> Self {
            Self {
                transient_failures: AtomicU32::new(transient_failures),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn mode(&self) -> AnalysisMode {
            AnalysisMode::Live
        }

        async fn classify(&self, clause: &Clause, _language: &Language) -> Result<Classification> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(AnalysisError::BackendUnavailable("flaky".into()));
            }
            if clause.text.contains("boom") {
                return Err(AnalysisError::MalformedResponse("not json".into()));
            }
            Ok(Classification::new(ClauseCategory::Payment, Severity::Medium, "scripted"))
        }

        async fn answer(&self, _document: &Document, question: &str, _history: &[Turn]) -> Result<String> {
            Err(AnalysisError::OutOfScope {
                question: question.to_string(),
            })
        }

        async fn extract_fields(&self, _document: &Document, doc_type: DocumentType) -> Result<ContractFields> {
            Ok(ContractFields::unspecified(doc_type.title()))
        }
    }

    fn clauses(texts: &[&str]) -> Vec<Clause> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Clause::new(i, (i * 10, i * 10 + 10), *t))
            .collect()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_clause_is_isolated() {
        let classifier = ClauseClassifier::new(Arc::new(ScriptedBackend::new(0))).with_retry(fast_retry());
        let result = classifier
            .classify_all(clauses(&["pay", "boom", "pay again"]), &Language::undetermined())
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].category, ClauseCategory::Payment);
        assert_eq!(result[1].category, ClauseCategory::Unclassified);
        assert_eq!(result[1].severity, Severity::Low);
        assert!(result[1].warning.is_some());
        assert_eq!(result[2].ordinal, 2);
    }

    #[tokio::test]
    async fn test_all_failures_surface_first_error() {
        let classifier = ClauseClassifier::new(Arc::new(ScriptedBackend::new(0))).with_retry(fast_retry());
        let err = classifier
            .classify_all(clauses(&["boom", "boom too"]), &Language::undetermined())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let classifier = ClauseClassifier::new(Arc::new(ScriptedBackend::new(1)))
            .with_retry(fast_retry())
            .with_max_concurrency(1);
        let result = classifier
            .classify_all(clauses(&["pay"]), &Language::undetermined())
            .await
            .unwrap();
        assert_eq!(result[0].category, ClauseCategory::Payment);
        assert!(result[0].warning.is_none());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let backend = Arc::new(ScriptedBackend::new(0));
        let classifier = ClauseClassifier::new(backend.clone()).with_max_concurrency(2);
        let texts: Vec<String> = (0..8).map(|i| format!("clause {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let result = classifier
            .classify_all(clauses(&refs), &Language::undetermined())
            .await
            .unwrap();

        assert_eq!(result.len(), 8);
        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
        let ordinals: Vec<usize> = result.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let classifier = ClauseClassifier::new(Arc::new(ScriptedBackend::new(0)));
        let result = classifier.classify_all(Vec::new(), &Language::undetermined()).await.unwrap();
        assert!(result.is_empty());
    }
}
