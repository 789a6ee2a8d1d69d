//! clausewise - Contract risk analysis pipeline
//!
//! Loads a contract (PDF, DOCX or text), splits it into clauses, classifies
//! each clause by category and severity, and aggregates the results into a
//! risk report with missing-clause detection and optional redrafts.
//!
//! # Architecture
//!
//! The pipeline is a linear cascade:
//! - `DocumentLoader` extracts and normalizes text
//! - `ClauseSegmenter` splits it into ordinal clauses
//! - `ClauseClassifier` classifies clauses concurrently through an
//!   `AnalysisBackend` (live LLM or deterministic demo rules)
//! - `RiskAggregator` scores the document
//! - `RedraftEngine` maps risky clauses to template text
//!
//! Parties, dates and amounts are extracted next to the report. Questions
//! can carry earlier conversation turns, and drafted agreements can be
//! saved as DOCX.
//!
//! The backend is chosen once at startup; the template library is loaded
//! once and passed to the redraft engine explicitly.
//!
//! # Modules
//!
//! - `adapters`: Analysis backends (live, demo)
//! - `core`: Segmentation, classification, scoring, redrafting
//! - `domain`: Data structures (Document, Clause, RiskReport)
//! - `ingest`: Text extraction and language detection
//! - `library`: Clause and agreement templates
//! - `export`: Report rendering
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Analyse a contract with the demo backend
//! clausewise analyze contract.pdf --demo
//!
//! # Ask a question about it
//! clausewise ask contract.pdf "What is the notice period?"
//!
//! # Suggest safer wording for high-risk clauses
//! clausewise redraft contract.pdf --jurisdiction in
//!
//! # Follow-up questions on stdin
//! clausewise chat contract.pdf
//!
//! # Clean agreement as a Word document
//! clausewise draft contract.pdf --docx clean.docx
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod export;
pub mod ingest;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{select_backend, AnalysisBackend, DemoBackend, LiveBackend};
pub use crate::core::{AnalyzeOptions, Analyzer};
pub use domain::{Analysis, Clause, ClauseCategory, Document, Entities, RiskReport, Severity, Turn};
pub use error::{AnalysisError, Result};
pub use library::TemplateLibrary;
