//! Analysis backends.
//!
//! A backend classifies clauses, answers questions about a document and
//! extracts agreement fields. Two implementations exist:
//! - `LiveBackend`: OpenAI-compatible chat completions over HTTP
//! - `DemoBackend`: deterministic keyword rules, no network
//!
//! The backend is chosen once at startup by `select_backend`.

pub mod demo;
pub mod live;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BackendSettings;
use crate::domain::{
    AnalysisMode, Classification, Clause, ContractFields, Document, DocumentType, Language, ParseLabelError, Turn,
};
use crate::error::Result;

pub use demo::DemoBackend;
pub use live::LiveBackend;

/// Capability interface shared by the live and demo backends
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Mode recorded on reports produced with this backend
    fn mode(&self) -> AnalysisMode;

    /// Assign a category and severity to one clause
    async fn classify(&self, clause: &Clause, language: &Language) -> Result<Classification>;

    /// Answer a question strictly from the document text.
    ///
    /// `history` holds the earlier turns of the conversation, oldest first.
    /// Returns `AnalysisError::OutOfScope` when the document does not
    /// address the question.
    async fn answer(&self, document: &Document, question: &str, history: &[Turn]) -> Result<String>;

    /// Pull agreement fields used to populate a full agreement template
    async fn extract_fields(&self, document: &Document, doc_type: DocumentType) -> Result<ContractFields>;
}

/// OpenAI-compatible chat completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Groq,
    #[serde(alias = "open_ai")]
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::OpenAi => "openai",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::OpenAi => "gpt-4o",
        }
    }

    /// Environment variable holding the API key
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "openai" | "open_ai" | "open-ai" => Ok(Provider::OpenAi),
            _ => Err(ParseLabelError {
                kind: "provider",
                value: s.to_string(),
            }),
        }
    }
}

const PLACEHOLDER_KEYS: [&str; 8] = [
    "demo",
    "demo_key",
    "changeme",
    "change-me",
    "your-api-key",
    "your_api_key",
    "xxx",
    "none",
];

/// Whether a credential value looks usable
pub fn is_valid_credential(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed != value || trimmed.chars().any(char::is_whitespace) {
        return false;
    }
    !PLACEHOLDER_KEYS.contains(&trimmed.to_lowercase().as_str())
}

/// Pick the backend once at startup, reading the credential from the
/// environment
pub fn select_backend(settings: &BackendSettings, force_demo: bool) -> Arc<dyn AnalysisBackend> {
    let credential = std::env::var(settings.api_key_env()).ok();
    select_backend_with(settings, force_demo, credential.as_deref())
}

/// Pick the backend given an explicit credential
pub fn select_backend_with(
    settings: &BackendSettings,
    force_demo: bool,
    credential: Option<&str>,
) -> Arc<dyn AnalysisBackend> {
    if force_demo {
        info!("Demo mode requested, using deterministic demo backend");
        return Arc::new(DemoBackend::new());
    }

    if !is_valid_credential(credential) {
        info!(
            env = settings.api_key_env(),
            "No valid API credential, falling back to demo backend"
        );
        return Arc::new(DemoBackend::new());
    }

    let api_key = credential.unwrap_or_default();
    match LiveBackend::from_settings(settings, api_key) {
        Ok(backend) => {
            info!(provider = %settings.provider, model = backend.model(), "Using live backend");
            Arc::new(backend)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build live backend, falling back to demo backend");
            Arc::new(DemoBackend::new())
        }
    }
}
