//! Live backend over an OpenAI-compatible chat completions API.
//!
//! Every request is bounded twice: by the reqwest client timeout and by an
//! outer `tokio::time::timeout`, so a server that accepts the connection and
//! never answers still surfaces as `BackendUnavailable`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::BackendSettings;
use crate::domain::{
    AnalysisMode, Classification, Clause, ClauseCategory, ContractFields, Document, DocumentType, Language,
    Severity, Turn,
};
use crate::error::{AnalysisError, Result};

use super::{AnalysisBackend, Provider};

/// Reply the model gives when the contract does not answer a question
pub const OUT_OF_SCOPE_REPLY: &str = "OUT_OF_SCOPE";

/// Longest document excerpt sent as chat context
const MAX_CONTEXT_CHARS: usize = 48_000;

/// Earlier conversation turns replayed with a question
const MAX_HISTORY_TURNS: usize = 12;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    severity: String,
    #[serde(default)]
    rationale: String,
}

/// Chat-completions backend for OpenAI and Groq
#[derive(Clone)]
pub struct LiveBackend {
    http: Client,
    provider: Provider,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl LiveBackend {
    /// Create a backend with the provider's default endpoint and model
    pub fn new(provider: Provider, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AnalysisError::BackendUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            provider,
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &BackendSettings, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(settings.provider, api_key, settings.timeout())?
            .with_base_url(settings.base_url())
            .with_model(settings.model()))
    }

    /// Point at a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Single system + user exchange
    async fn chat(&self, system: String, user: String, json_mode: bool) -> Result<String> {
        self.complete(vec![ChatMessage::system(system), ChatMessage::user(user)], json_mode)
            .await
    }

    /// Send one chat completion and return the first choice's content
    #[instrument(skip(self, messages), fields(provider = %self.provider, model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: Vec<ChatMessage>, json_mode: bool) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let start = std::time::Instant::now();
        let send = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = match tokio::time::timeout(self.timeout, send).await {
            Err(_) => {
                warn!(timeout = ?self.timeout, "Backend request timed out");
                return Err(AnalysisError::BackendUnavailable(format!(
                    "request timed out after {:?}",
                    self.timeout
                )));
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Backend request failed");
                return Err(AnalysisError::BackendUnavailable(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            warn!(?retry_after, "Backend rate limited");
            return Err(AnalysisError::RateLimit { retry_after });
        }
        if status.is_server_error() {
            warn!(status = %status, "Backend server error");
            return Err(AnalysisError::BackendUnavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::BackendUnavailable(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            warn!(status = %status, "Backend rejected request");
            return Err(AnalysisError::BackendRejected {
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        let raw: ChatResponseRaw = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::MalformedResponse(format!("invalid chat response: {}", e)))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisError::MalformedResponse("response has no message content".into()))?;

        debug!(duration_ms = start.elapsed().as_millis(), "Chat completion");
        Ok(content)
    }
}

/// Seconds from a Retry-After header; HTTP-date values are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Drop a surrounding ```json fence if the model added one
fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

fn parse_classification(reply: &str) -> Result<Classification> {
    let raw: RawClassification = serde_json::from_str(strip_code_fences(reply))
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid classification JSON: {}", e)))?;

    let category: ClauseCategory = raw
        .category
        .parse()
        .map_err(|e| AnalysisError::MalformedResponse(format!("{}", e)))?;
    let severity: Severity = raw
        .severity
        .parse()
        .map_err(|e| AnalysisError::MalformedResponse(format!("{}", e)))?;

    Ok(Classification::new(category, severity, raw.rationale.trim()))
}

fn parse_fields(reply: &str, doc_type: DocumentType) -> Result<ContractFields> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(strip_code_fences(reply))
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid fields JSON: {}", e)))?;

    let mut fields = ContractFields::unspecified(doc_type.title());
    for key in ContractFields::KEYS.iter().filter(|k| **k != "contract_type") {
        let value = match map.get(*key) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::Bool(b)) => b.to_string(),
            _ => continue,
        };
        if !value.is_empty() && !value.eq_ignore_ascii_case("null") {
            fields.set(*key, value);
        }
    }
    Ok(fields)
}

/// Instructions, contract context, recent turns, then the new question
fn answer_messages(document: &Document, question: &str, history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::system(format!(
            "Answer questions using only the contract provided. If the contract does not \
             address the question, reply with exactly {} and nothing else.",
            OUT_OF_SCOPE_REPLY
        )),
        ChatMessage::system(format!("Contract:\n{}", truncate_context(&document.text))),
    ];
    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
    messages.extend(history[skip..].iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(question));
    messages
}

fn truncate_context(text: &str) -> String {
    text.chars().take(MAX_CONTEXT_CHARS).collect()
}

fn category_names() -> String {
    ClauseCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

#[async_trait]
impl AnalysisBackend for LiveBackend {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Live
    }

    async fn classify(&self, clause: &Clause, language: &Language) -> Result<Classification> {
        let system = format!(
            "You review contract clauses for legal risk to the signing party. \
             Reply with a JSON object with keys \"category\" (one of: {}), \
             \"severity\" (one of: none, low, medium, high, critical) and \
             \"rationale\" (one sentence in English).",
            category_names()
        );
        let user = format!("Clause language: {}\n\nClause:\n{}", language, clause.text);

        let reply = self.chat(system, user, true).await?;
        parse_classification(&reply)
    }

    async fn answer(&self, document: &Document, question: &str, history: &[Turn]) -> Result<String> {
        let reply = self.complete(answer_messages(document, question, history), false).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AnalysisError::MalformedResponse("empty answer".into()));
        }

        let bare = reply.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
        if bare.eq_ignore_ascii_case(OUT_OF_SCOPE_REPLY) {
            return Err(AnalysisError::OutOfScope {
                question: question.to_string(),
            });
        }
        Ok(reply.to_string())
    }

    async fn extract_fields(&self, document: &Document, doc_type: DocumentType) -> Result<ContractFields> {
        let keys = ContractFields::KEYS
            .iter()
            .filter(|k| **k != "contract_type")
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let system = format!(
            "Extract details from a {} for drafting a clean agreement. Reply with a JSON \
             object with the keys: {}. Use null for details the contract does not state.",
            doc_type.title(),
            keys
        );
        let user = format!("Contract:\n{}", truncate_context(&document.text));

        match self.chat(system, user, true).await.and_then(|reply| parse_fields(&reply, doc_type)) {
            Ok(fields) => Ok(fields),
            Err(AnalysisError::MalformedResponse(reason)) => {
                warn!(%reason, "Field extraction failed, leaving all fields unspecified");
                Ok(ContractFields::unspecified(doc_type.title()))
            }
            Err(e) => Err(e),
        }
    }
}
