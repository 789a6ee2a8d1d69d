//! Core analysis logic.
//!
//! This module contains:
//! - Segmenter: splits document text into clauses
//! - Classifier: concurrent clause classification through a backend
//! - Aggregator: scoring and missing-clause detection
//! - Redraft: template-based clause replacement
//! - Analyzer: the pipeline tying these together
//! - Safety / Retry: input limits and backoff

pub mod aggregator;
pub mod analyzer;
pub mod classifier;
pub mod redraft;
pub mod retry;
pub mod safety;
pub mod segmenter;

// Re-export commonly used types
pub use aggregator::{RiskAggregator, ScoringPolicy, SeverityWeights};
pub use analyzer::{AnalyzeOptions, Analyzer};
pub use classifier::ClauseClassifier;
pub use redraft::RedraftEngine;
pub use retry::{with_retry, RetryPolicy};
pub use safety::{InputLimits, SafetyViolation};
pub use segmenter::{ClauseSegmenter, SegmentationStrategy, Segments};
