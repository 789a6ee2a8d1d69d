//! Domain types for the contract analysis pipeline.
//!
//! This module contains the core data structures:
//! - Document: uploaded contract and extracted text
//! - Clause: a classified span of that text
//! - RiskReport / Analysis: aggregated findings
//! - TemplateEntry / RedraftSuggestion: redraft library and output
//! - Turn: earlier messages of a conversation about a contract

pub mod chat;
pub mod clause;
pub mod document;
pub mod report;
pub mod template;

// Re-export commonly used types
pub use chat::{Role, Turn};
pub use clause::{Classification, Clause, ClauseCategory, ParseLabelError, Severity};
pub use document::{Document, DocumentSummary, Language, Script, SourceFormat};
pub use report::{Analysis, AnalysisMode, DocumentType, Entities, RiskLevel, RiskReport};
pub use template::{
    AgreementDraft, ContractFields, RedraftBatch, RedraftFailure, RedraftSuggestion, TemplateEntry, NOT_SPECIFIED,
};
