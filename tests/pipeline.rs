//! Pipeline Integration Tests
//!
//! End-to-end runs with the demo backend: loading, segmentation,
//! classification, scoring, redrafting, chat and agreement drafting.

use std::sync::Arc;

use clausewise::adapters::{select_backend_with, AnalysisBackend, DemoBackend};
use clausewise::config::BackendSettings;
use clausewise::core::{AnalyzeOptions, Analyzer};
use clausewise::domain::{
    AnalysisMode, Clause, ClauseCategory, Document, DocumentType, Language, Script, Severity, SourceFormat, Turn,
};
use clausewise::error::AnalysisError;
use clausewise::export::{draft_docx, render, ReportFormat};
use clausewise::ingest::DocumentLoader;
use clausewise::library::TemplateLibrary;

fn demo_analyzer() -> Analyzer {
    Analyzer::new(Arc::new(DemoBackend::new()), Arc::new(TemplateLibrary::builtin().unwrap()))
}

fn load(analyzer: &Analyzer, text: &str) -> Document {
    analyzer.load(text.as_bytes(), SourceFormat::Txt, None).unwrap()
}

const SERVICE_CONTRACT: &str = "SERVICE AGREEMENT

1. Services. The Provider shall deliver mobile app development services.

2. Fees. The Client shall pay INR 5,00,000 within 90 days of each invoice.

3. Liability. The Provider accepts unlimited liability for any loss.

4. Termination. The Client may terminate this Agreement at any time without notice.

5. Confidentiality. Each party shall keep the other's information confidential.

6. Governing Law. This Agreement is governed by the laws of India.";

#[tokio::test]
async fn test_two_clause_demo_scenario() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, "1. Payment terms... 2. Termination...");

    let analysis = analyzer.analyze(&doc, &AnalyzeOptions::default()).await.unwrap();
    let report = &analysis.report;

    assert_eq!(report.mode, AnalysisMode::Demo);
    assert_eq!(report.clauses.len(), 2);
    assert_eq!(report.clauses[0].ordinal, 0);
    assert_eq!(report.clauses[1].ordinal, 1);

    assert_eq!(report.clauses[0].category, ClauseCategory::Payment);
    assert_eq!(report.clauses[0].severity, Severity::Low);
    assert_eq!(report.clauses[1].category, ClauseCategory::Termination);
    assert_eq!(report.clauses[1].severity, Severity::Medium);

    // Unknown type: only dispute resolution is expected.
    // 100 - (low 5 + medium 15) - missing 10
    assert_eq!(report.document_type, None);
    assert_eq!(report.missing.iter().copied().collect::<Vec<_>>(), vec![ClauseCategory::DisputeResolution]);
    assert_eq!(report.score, 70);
}

#[tokio::test]
async fn test_analyze_text_with_thin_space() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, "The fee is due\u{2009}monthly. Either party may terminate.");

    let analysis = analyzer.analyze(&doc, &AnalyzeOptions::default()).await.unwrap();
    assert_eq!(analysis.report.clauses.len(), 2);
}

#[tokio::test]
async fn test_declared_nda_flags_missing_confidentiality() {
    let analyzer = demo_analyzer();
    let doc = load(
        &analyzer,
        "1. The term of this Agreement is two years.\n\
         2. This Agreement is governed by the laws of Singapore.\n\
         3. Disputes shall be referred to arbitration in Singapore.",
    );

    let options = AnalyzeOptions {
        doc_type: Some(DocumentType::Nda),
        ..Default::default()
    };
    let analysis = analyzer.analyze(&doc, &options).await.unwrap();

    assert_eq!(analysis.report.document_type, Some(DocumentType::Nda));
    assert!(analysis.report.missing.contains(&ClauseCategory::Confidentiality));
    assert_eq!(analysis.report.missing.len(), 1);
}

#[tokio::test]
async fn test_service_contract_with_redrafts() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);
    assert_eq!(doc.jurisdiction.as_deref(), Some("in"));

    let options = AnalyzeOptions {
        redraft_min_severity: Some(Severity::High),
        ..Default::default()
    };
    let analysis = analyzer.analyze(&doc, &options).await.unwrap();
    let report = &analysis.report;

    assert_eq!(report.document_type, Some(DocumentType::Service));
    assert_eq!(report.clauses.len(), 7);
    assert_eq!(report.clause(3).map(|c| c.severity), Some(Severity::Critical));
    assert_eq!(report.clause(4).map(|c| c.severity), Some(Severity::High));
    assert_eq!(report.clause(2).map(|c| c.severity), Some(Severity::Medium));
    assert!(report.missing.contains(&ClauseCategory::DisputeResolution));

    let batch = analysis.redrafts.as_ref().unwrap();
    let ids: Vec<&str> = batch.suggestions.iter().map(|s| s.template_id.as_str()).collect();
    assert_eq!(ids, vec!["liability-in", "termination-in"]);
    assert!(batch.failures.is_empty());

    let markdown = render(&analysis, ReportFormat::Markdown).unwrap();
    assert!(markdown.contains("## Suggested redrafts"));
}

#[tokio::test]
async fn test_demo_analysis_is_deterministic() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);

    let first = analyzer.analyze(&doc, &AnalyzeOptions::default()).await.unwrap();
    let second = analyzer.analyze(&doc, &AnalyzeOptions::default()).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.report, second.report);
}

#[test]
fn test_demo_classification_is_stable_across_instances() {
    let clause = Clause::new(0, (0, 40), "The Client shall indemnify the Provider.");
    let language = Language::new("en", Script::Latin);

    let a = tokio_test::block_on(DemoBackend::new().classify(&clause, &language)).unwrap();
    let b = tokio_test::block_on(DemoBackend::default().classify(&clause, &language)).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.category, ClauseCategory::Indemnity);
    assert_eq!(a.severity, Severity::High);
}

#[tokio::test]
async fn test_unrelated_question_is_out_of_scope() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);

    let result = analyzer.ask(&doc, "What's the weather?", &[]).await;
    assert!(matches!(result, Err(AnalysisError::OutOfScope { .. })));
}

#[tokio::test]
async fn test_question_answered_from_contract() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);

    let answer = analyzer.ask(&doc, "Can the client terminate the agreement?", &[]).await.unwrap();
    assert!(answer.contains("terminate this Agreement at any time"));
}

#[tokio::test]
async fn test_follow_up_question_in_conversation() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);

    let mut history = Vec::new();
    let question = "Which law governs the agreement?";
    let answer = analyzer.ask(&doc, question, &history).await.unwrap();
    assert!(answer.contains("laws of India"));
    history.push(Turn::user(question));
    history.push(Turn::assistant(answer));

    let follow_up = analyzer.ask(&doc, "Why is that?", &history).await.unwrap();
    assert!(follow_up.contains("laws of India"));

    let result = analyzer.ask(&doc, "Why is that?", &[]).await;
    assert!(matches!(result, Err(AnalysisError::OutOfScope { .. })));
}

#[tokio::test]
async fn test_draft_service_agreement() {
    let analyzer = demo_analyzer();
    let doc = load(&analyzer, SERVICE_CONTRACT);

    let draft = analyzer.draft(&doc, Some(DocumentType::Service)).await.unwrap();
    assert_eq!(draft.doc_type, DocumentType::Service);
    assert!(draft.text.starts_with("SERVICE AGREEMENT"));
    assert!(draft.text.contains("governed by the laws of India"));

    // The Word export carries the same text
    let bytes = draft_docx(&draft).unwrap();
    let reloaded = DocumentLoader::default().load(&bytes, SourceFormat::Docx).unwrap();
    assert!(reloaded.text.starts_with("SERVICE AGREEMENT\n"));
    assert!(reloaded.text.contains("governed by the laws of India"));

    let err = analyzer.draft(&doc, Some(DocumentType::Nda)).await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::IncompatibleTemplate {
            contract: DocumentType::Service,
            template: DocumentType::Nda
        }
    ));
}

#[test]
fn test_backend_selection_without_credentials() {
    let settings = BackendSettings::default();

    let backend = select_backend_with(&settings, false, None);
    assert_eq!(backend.mode(), AnalysisMode::Demo);

    let backend = select_backend_with(&settings, false, Some("your-api-key"));
    assert_eq!(backend.mode(), AnalysisMode::Demo);

    let backend = select_backend_with(&settings, true, Some("gsk_live_looking_key"));
    assert_eq!(backend.mode(), AnalysisMode::Demo);

    let backend = select_backend_with(&settings, false, Some("gsk_live_looking_key"));
    assert_eq!(backend.mode(), AnalysisMode::Live);
}
