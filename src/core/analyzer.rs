//! Pipeline entry point.
//!
//! DocumentLoader -> ClauseSegmenter -> ClauseClassifier -> RiskAggregator,
//! then optionally RedraftEngine. Entities are extracted alongside. Also
//! serves the chat side path and the agreement drafting path over an
//! already loaded Document.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::AnalysisBackend;
use crate::config::{ExpectedClauses, ResolvedConfig};
use crate::domain::{
    AgreementDraft, Analysis, Document, DocumentSummary, DocumentType, RedraftBatch, RiskReport, Severity,
    SourceFormat, Turn,
};
use crate::error::{AnalysisError, Result};
use crate::ingest::{extract_entities, DocumentLoader};
use crate::library::{compatible_template, TemplateLibrary};

use super::aggregator::RiskAggregator;
use super::classifier::ClauseClassifier;
use super::redraft::RedraftEngine;
use super::retry::{with_retry, RetryPolicy};
use super::segmenter::{ClauseSegmenter, Segments};

/// Per-run choices made by the caller
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Declared contract type; detected from the text when `None`
    pub doc_type: Option<DocumentType>,

    /// Jurisdiction tag for redrafts; the document's detected tag otherwise
    pub jurisdiction: Option<String>,

    /// Redraft clauses at or above this severity
    pub redraft_min_severity: Option<Severity>,
}

/// Runs the analysis pipeline with one backend
#[derive(Clone)]
pub struct Analyzer {
    loader: DocumentLoader,
    segmenter: ClauseSegmenter,
    classifier: ClauseClassifier,
    aggregator: RiskAggregator,
    redrafter: RedraftEngine,
    expected: ExpectedClauses,
    retry: RetryPolicy,
}

impl Analyzer {
    /// Analyzer with default limits, scoring and segmentation
    pub fn new(backend: Arc<dyn AnalysisBackend>, library: Arc<TemplateLibrary>) -> Self {
        Self::from_config(&ResolvedConfig::default(), backend, library)
    }

    pub fn from_config(config: &ResolvedConfig, backend: Arc<dyn AnalysisBackend>, library: Arc<TemplateLibrary>) -> Self {
        Self {
            loader: DocumentLoader::new(config.limits.clone()),
            segmenter: ClauseSegmenter::new(config.min_heading_cues),
            classifier: ClauseClassifier::new(backend)
                .with_retry(config.retry.clone())
                .with_max_concurrency(config.backend.max_concurrency),
            aggregator: RiskAggregator::new(config.scoring.clone()),
            redrafter: RedraftEngine::new(library),
            expected: config.expected_clauses.clone(),
            retry: config.retry.clone(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        self.classifier.backend()
    }

    pub fn redrafter(&self) -> &RedraftEngine {
        &self.redrafter
    }

    /// Load a document, checking the source path against the denylist
    pub fn load(&self, bytes: &[u8], format: SourceFormat, source_path: Option<&Path>) -> Result<Document> {
        self.loader.load_from(bytes, format, source_path)
    }

    pub fn segment<'a>(&self, document: &'a Document) -> Segments<'a> {
        self.segmenter.segment(document)
    }

    /// Full pipeline over a loaded document
    #[instrument(skip(self, document, options), fields(document = %document.fingerprint, backend = self.backend().name()))]
    pub async fn analyze(&self, document: &Document, options: &AnalyzeOptions) -> Result<Analysis> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%id, "Starting analysis");

        let doc_type = options.doc_type.or_else(|| DocumentType::detect(&document.text));
        let jurisdiction = options.jurisdiction.clone().or_else(|| document.jurisdiction.clone());

        let segments = self.segmenter.segment(document);
        info!(strategy = ?segments.strategy(), clauses = segments.len(), "Segmented document");

        let classified = self.classifier.classify_all(segments.collect(), &document.language).await?;

        let expected = self.expected.for_type(doc_type);
        let mut report = self
            .aggregator
            .aggregate(classified, &expected, self.backend().mode());
        report.document_type = doc_type;
        report.entities = extract_entities(&document.text);

        for warning in &report.warnings {
            warn!(%warning, "Clause defaulted");
        }

        let redrafts = options
            .redraft_min_severity
            .map(|min| self.redrafter.redraft_risky(&report, jurisdiction.as_deref(), min));

        let completed_at = Utc::now();
        info!(
            %id,
            score = report.score,
            risk_level = %report.risk_level,
            missing = report.missing.len(),
            duration_ms = (completed_at - started_at).num_milliseconds(),
            "Analysis complete"
        );

        Ok(Analysis {
            id,
            started_at,
            completed_at,
            document: DocumentSummary::from(document),
            report,
            redrafts,
        })
    }

    /// Redraft risky clauses of an existing report
    pub fn redraft(&self, report: &RiskReport, jurisdiction: Option<&str>, min_severity: Severity) -> RedraftBatch {
        self.redrafter.redraft_risky(report, jurisdiction, min_severity)
    }

    /// Answer a question from the document only. `history` holds the
    /// earlier turns of the same conversation, oldest first.
    #[instrument(skip(self, document, question, history), fields(document = %document.fingerprint, turns = history.len()))]
    pub async fn ask(&self, document: &Document, question: &str, history: &[Turn]) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnalysisError::OutOfScope {
                question: String::new(),
            });
        }

        let backend = self.backend();
        with_retry(&self.retry, "answer", || backend.answer(document, question, history)).await
    }

    /// Populate the agreement template matching the contract's type.
    ///
    /// A declared type that contradicts the detected one is rejected; with
    /// neither, the Service template is used.
    #[instrument(skip(self, document), fields(document = %document.fingerprint))]
    pub async fn draft(&self, document: &Document, requested: Option<DocumentType>) -> Result<AgreementDraft> {
        let detected = DocumentType::detect(&document.text);
        let doc_type = match (requested, detected) {
            (Some(requested), Some(detected)) => compatible_template(detected, requested)?.doc_type,
            (Some(requested), None) => requested,
            (None, Some(detected)) => detected,
            (None, None) => {
                info!("Contract type not detected, using the Service Agreement template");
                DocumentType::Service
            }
        };

        let backend = self.backend();
        let fields = with_retry(&self.retry, "extract fields", || backend.extract_fields(document, doc_type)).await?;
        let text = compatible_template(doc_type, doc_type)?.populate(&fields);

        info!(doc_type = %doc_type, "Agreement drafted");
        Ok(AgreementDraft { doc_type, fields, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DemoBackend;
    use crate::domain::{ClauseCategory, NOT_SPECIFIED};

    fn analyzer() -> Analyzer {
        Analyzer::new(
            Arc::new(DemoBackend::new()),
            Arc::new(TemplateLibrary::builtin().unwrap()),
        )
    }

    fn load(analyzer: &Analyzer, text: &str) -> Document {
        analyzer.load(text.as_bytes(), SourceFormat::Txt, None).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_detects_type_and_redrafts() {
        let analyzer = analyzer();
        let doc = load(
            &analyzer,
            "SERVICE AGREEMENT\n\n\
             1. The Provider accepts unlimited liability for all losses.\n\n\
             2. Either party may terminate this Agreement at any time.\n\n\
             3. This Agreement is governed by the laws of India.",
        );
        let options = AnalyzeOptions {
            redraft_min_severity: Some(Severity::High),
            ..Default::default()
        };
        let analysis = analyzer.analyze(&doc, &options).await.unwrap();

        assert_eq!(analysis.report.document_type, Some(DocumentType::Service));
        assert!(analysis.report.missing.contains(&ClauseCategory::Payment));

        let batch = analysis.redrafts.unwrap();
        assert_eq!(batch.suggestions.len(), 2);
        // India detected from the governing law clause
        assert!(batch.suggestions.iter().all(|s| s.jurisdiction.as_deref() == Some("in")));
        assert!(batch.failures.is_empty());
        assert!(analysis.report.entities.parties.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_reports_entities() {
        let analyzer = analyzer();
        let doc = load(
            &analyzer,
            "This Agreement is made on 1st April 2024 between Acme Solutions Pvt. Ltd. and Mr. Ravi Kumar.\n\n\
             The Client shall pay INR 5,00,000 within 30 days.",
        );
        let analysis = analyzer.analyze(&doc, &AnalyzeOptions::default()).await.unwrap();
        let entities = &analysis.report.entities;

        assert_eq!(entities.parties, vec!["Acme Solutions Pvt. Ltd.", "Mr. Ravi Kumar"]);
        assert_eq!(entities.dates, vec!["1st April 2024"]);
        assert_eq!(entities.amounts, vec!["INR 5,00,000"]);
    }

    #[tokio::test]
    async fn test_ask_blank_question_is_out_of_scope() {
        let analyzer = analyzer();
        let doc = load(&analyzer, "Payment is due within 30 days.");
        assert!(matches!(
            analyzer.ask(&doc, "   ", &[]).await,
            Err(AnalysisError::OutOfScope { .. })
        ));
    }

    #[tokio::test]
    async fn test_draft_rejects_mismatched_type() {
        let analyzer = analyzer();
        let doc = load(&analyzer, "NON-DISCLOSURE AGREEMENT\n\nThe Receiving Party shall keep all information confidential.");
        assert!(matches!(
            analyzer.draft(&doc, Some(DocumentType::Employment)).await,
            Err(AnalysisError::IncompatibleTemplate { .. })
        ));

        let draft = analyzer.draft(&doc, None).await.unwrap();
        assert_eq!(draft.doc_type, DocumentType::Nda);
        assert!(draft.text.starts_with("NON-DISCLOSURE AGREEMENT"));
        assert!(draft.text.contains(NOT_SPECIFIED));
    }
}
