//! Deterministic demo backend.
//!
//! Classification walks an ordered rule table and the first matching rule
//! wins. Every rule carries a fixed rationale, so the same clause text always
//! produces the same classification. Questions are answered by keyword
//! retrieval over the document's clauses.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::core::segmenter::ClauseSegmenter;
use crate::domain::{
    AnalysisMode, Classification, Clause, ClauseCategory, ContractFields, Document, DocumentType, Language,
    Severity, Turn,
};
use crate::domain::chat::last_question;
use crate::error::{AnalysisError, Result};

use super::AnalysisBackend;

/// Rationale used when no rule matches
pub const DEFAULT_RATIONALE: &str = "No known risk pattern matched (demo rules).";

/// Clauses quoted in a demo answer
const MAX_ANSWER_CLAUSES: usize = 2;

struct Rule {
    pattern: &'static str,
    category: ClauseCategory,
    severity: Severity,
    rationale: &'static str,
}

/// Ordered by precedence
const RULES: &[Rule] = &[
    Rule {
        pattern: r"\bunlimited\s+liabilit(?:y|ies)\b|असीमित\s+दायित्व",
        category: ClauseCategory::Liability,
        severity: Severity::Critical,
        rationale: "Exposes a party to unlimited liability.",
    },
    Rule {
        pattern: r"\bindemnif(?:y|ies|ied|ication)\b|\bhold\s+harmless\b|क्षतिपूर्ति",
        category: ClauseCategory::Indemnity,
        severity: Severity::High,
        rationale: "Indemnity obligation shifts third-party losses onto a party.",
    },
    Rule {
        pattern: r"(?s)\bterminat\w*\b.*\b(?:at\s+any\s+time|without\s+cause)\b|\b(?:at\s+any\s+time|without\s+cause)\b.*\bterminat\w*",
        category: ClauseCategory::Termination,
        severity: Severity::High,
        rationale: "Allows termination at any time or without cause.",
    },
    Rule {
        pattern: r"\bterminat\w*|समाप्त",
        category: ClauseCategory::Termination,
        severity: Severity::Medium,
        rationale: "Termination rights should be checked for notice and cure periods.",
    },
    Rule {
        pattern: r"\bnon[-\s]?compet\w*|\bnot\s+(?:to\s+)?compete\b|\bnon[-\s]?solicit\w*",
        category: ClauseCategory::NonCompete,
        severity: Severity::Medium,
        rationale: "Restricts future work or solicitation.",
    },
    Rule {
        pattern: r"(?s)\bliabilit\w*\b.*\b(?:shall\s+not\s+exceed|limited\s+to|capped)\b",
        category: ClauseCategory::Liability,
        severity: Severity::Low,
        rationale: "Liability is capped.",
    },
    Rule {
        pattern: r"\bliabilit\w*|\bliable\b|दायित्व",
        category: ClauseCategory::Liability,
        severity: Severity::Medium,
        rationale: "Liability terms without a clear cap.",
    },
    Rule {
        pattern: r"\bconfidential\w*|\bnon[-\s]?disclosure\b|गोपनीय",
        category: ClauseCategory::Confidentiality,
        severity: Severity::Low,
        rationale: "Standard confidentiality obligation.",
    },
    Rule {
        pattern: r"\bpersonal\s+data\b|\bdata\s+protection\b|\bprivacy\b",
        category: ClauseCategory::DataPrivacy,
        severity: Severity::Medium,
        rationale: "Handles personal data; check protection obligations.",
    },
    Rule {
        pattern: r"\bintellectual\s+property\b|\bwork\s+made\s+for\s+hire\b|\bcopyrights?\b",
        category: ClauseCategory::IntellectualProperty,
        severity: Severity::Low,
        rationale: "Allocates ownership of work product.",
    },
    Rule {
        pattern: r"\barbitrat\w*|\bmediation\b|मध्यस्थता",
        category: ClauseCategory::DisputeResolution,
        severity: Severity::None,
        rationale: "Provides a dispute resolution mechanism.",
    },
    Rule {
        pattern: r"\bgoverned\s+by\s+(?:and\s+construed\s+in\s+accordance\s+with\s+)?the\s+laws?\b",
        category: ClauseCategory::GoverningLaw,
        severity: Severity::None,
        rationale: "States the governing law.",
    },
    Rule {
        pattern: r"(?s)\b(?:pay\w*|invoic\w*|fees?)\b.*\b(?:within|net)\s+(?:6[1-9]|[7-9]\d|[1-9]\d{2,})\s+days\b|\bnet\s+(?:6[1-9]|[7-9]\d|[1-9]\d{2,})\b",
        category: ClauseCategory::Payment,
        severity: Severity::Medium,
        rationale: "Long payment window delays cash flow.",
    },
    Rule {
        pattern: r"\bpayments?\b|\bpayable\b|\binvoic\w*|\bfees?\b|भुगतान",
        category: ClauseCategory::Payment,
        severity: Severity::Low,
        rationale: "Standard payment terms.",
    },
    Rule {
        pattern: r"\bterm\s+of\s+(?:this|the)\s+agreement\b|\bremain\s+in\s+(?:full\s+)?(?:force|effect)\b",
        category: ClauseCategory::Term,
        severity: Severity::None,
        rationale: "Defines the agreement's duration.",
    },
    Rule {
        pattern: r"\bscope\s+of\s+work\b|\bshall\s+(?:provide|deliver|perform)\b|\bdeliverables?\b",
        category: ClauseCategory::ScopeOfWork,
        severity: Severity::None,
        rationale: "Describes the work to be delivered.",
    },
];

fn compiled_rules() -> &'static [(Regex, &'static Rule)] {
    static RULES_RE: OnceLock<Vec<(Regex, &'static Rule)>> = OnceLock::new();
    RULES_RE.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| {
                let re = Regex::new(&format!("(?i){}", rule.pattern)).expect("static regex");
                (re, rule)
            })
            .collect()
    })
}

/// Classify text with the demo rule table
pub fn classify_text(text: &str) -> Classification {
    compiled_rules()
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, rule)| Classification::new(rule.category, rule.severity, rule.rationale))
        .unwrap_or_else(|| Classification::unclassified(DEFAULT_RATIONALE))
}

const QUESTION_STOPWORDS: [&str; 40] = [
    "what", "which", "when", "where", "why", "how", "who", "whom", "whose", "the", "and", "for", "are",
    "was", "were", "does", "did", "this", "that", "there", "their", "with", "from", "about", "into", "any",
    "can", "could", "would", "should", "will", "shall", "have", "has", "had", "you", "your", "contract",
    "agreement", "tell",
];

/// Lowercased content words of length >= 3
fn content_words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !QUESTION_STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Equal words, or long words sharing a five-character stem
fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let shared = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    shared >= 5
}

/// Field heuristics used by `extract_fields`
struct FieldPatterns {
    governing_law: Regex,
    amount: Regex,
    notice: Regex,
    payment: Regex,
    services: Regex,
    confidentiality: Regex,
    provider: Regex,
    client: Regex,
    provider_defined: Regex,
    client_defined: Regex,
    date: Regex,
}

fn field_patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static regex");
        FieldPatterns {
            governing_law: re(r"(?i)laws\s+of\s+(?:the\s+)?((?:state\s+of\s+)?[A-Z][\p{L} ]*?)\s*(?:[.,;\n]|$)"),
            amount: re(r"(?:₹|\bRs\.?|\bINR|\bUSD|\bUS\$|\$|€|\bEUR|£|\bGBP)\s?\d[\d,]*(?:\.\d+)?"),
            notice: re(
                r"(?i)\b(?:\d+|one|two|three|four|six|seven|ten|fifteen|thirty|sixty|ninety)\s*(?:\(\d+\)\s*)?(?:days?|weeks?|months?)['’]?\s+(?:prior\s+)?(?:written\s+)?notice",
            ),
            payment: re(r"(?i)[^.\n]*\b(?:pay(?:ment|able)?s?|invoic\w*)\b[^.\n]*"),
            services: re(r"(?i)[^.\n]*\b(?:shall|will|agrees?\s+to)\s+(?:provide|deliver|perform|render)\b[^.\n]*"),
            confidentiality: re(r"(?i)[^.\n]*\bconfidential\w*[^.\n]*"),
            provider: re(r"(?im)^\s*(?:service\s+)?(?:provider|disclosing\s+party|employer)\s*[:\-]\s*([^\n,]+)"),
            client: re(r"(?im)^\s*(?:client|customer|receiving\s+party|employee)\s*[:\-]\s*([^\n,]+)"),
            provider_defined: re(
                r#"([A-Z][\w&.' ]+?)\s*\(\s*(?:the\s+)?["“]?(?:Service\s+)?(?:Provider|Disclosing\s+Party|Employer)["”]?\s*\)"#,
            ),
            client_defined: re(
                r#"([A-Z][\w&.' ]+?)\s*\(\s*(?:the\s+)?["“]?(?:Client|Customer|Receiving\s+Party|Employee)["”]?\s*\)"#,
            ),
            date: re(concat!(
                r"\b(?:\d{1,2}(?:st|nd|rd|th)?\s+(?:January|February|March|April|May|June|July|August|September|October|November|December),?\s+\d{4}",
                r"|(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}",
                r"|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})\b"
            )),
        }
    })
}

fn first_sentence(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| {
        let sentence = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if sentence.chars().count() > 200 {
            format!("{}...", sentence.chars().take(200).collect::<String>().trim_end())
        } else {
            sentence
        }
    })
}

fn party(labelled: &Regex, defined: &Regex, text: &str) -> Option<String> {
    labelled
        .captures(text)
        .or_else(|| defined.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_start_matches("between ").trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Date in the first line or sentence that mentions one of the cues
fn cued_date(text: &str, cues: &[&str]) -> Option<String> {
    let date = &field_patterns().date;
    text.split(['.', '\n'])
        .filter(|s| {
            let lower = s.to_lowercase();
            cues.iter().any(|c| lower.contains(c))
        })
        .find_map(|s| date.find(s).map(|m| m.as_str().to_string()))
}

/// Regex heuristics over the document text
pub fn extract_fields_from_text(text: &str, doc_type: DocumentType) -> ContractFields {
    let p = field_patterns();
    let mut fields = ContractFields::unspecified(doc_type.title());

    let found = [
        (
            "jurisdiction",
            p.governing_law
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string()),
        ),
        ("amount", p.amount.find(text).map(|m| m.as_str().to_string())),
        ("termination_notice", p.notice.find(text).map(|m| m.as_str().to_string())),
        ("payment_terms", first_sentence(&p.payment, text)),
        ("services", first_sentence(&p.services, text)),
        ("confidentiality", first_sentence(&p.confidentiality, text)),
        ("provider", party(&p.provider, &p.provider_defined, text)),
        ("client", party(&p.client, &p.client_defined, text)),
        (
            "start_date",
            cued_date(text, &["effective", "commence", "start", "dated", "date:"])
                .or_else(|| p.date.find(text).map(|m| m.as_str().to_string())),
        ),
        ("end_date", cued_date(text, &["expire", "end date", "until", "terminate on", "ending"])),
    ];

    for (key, value) in found {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            fields.set(key, value);
        }
    }
    fields
}

/// Network-free backend with fixed rules
#[derive(Debug, Clone, Default)]
pub struct DemoBackend {
    segmenter: ClauseSegmenter,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific segmenter for answer retrieval
    pub fn with_segmenter(segmenter: ClauseSegmenter) -> Self {
        Self { segmenter }
    }

    /// Top clauses by question-word overlap, ties broken by ordinal
    fn retrieve(&self, document: &Document, question: &str) -> Vec<(usize, Clause)> {
        let terms = content_words(question);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, Clause)> = self
            .segmenter
            .segment(document)
            .filter_map(|clause| {
                let words = content_words(&clause.text);
                let hits = terms
                    .iter()
                    .filter(|t| words.iter().any(|w| words_match(t, w)))
                    .count();
                (hits > 0).then_some((hits, clause))
            })
            .collect();

        scored.sort_by(|(ha, ca), (hb, cb)| hb.cmp(ha).then(ca.ordinal.cmp(&cb.ordinal)));
        scored.truncate(MAX_ANSWER_CLAUSES);
        scored
    }
}

#[async_trait]
impl AnalysisBackend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Demo
    }

    async fn classify(&self, clause: &Clause, _language: &Language) -> Result<Classification> {
        let classification = classify_text(&clause.text);
        debug!(
            ordinal = clause.ordinal,
            category = %classification.category,
            severity = %classification.severity,
            "Demo classification"
        );
        Ok(classification)
    }

    async fn answer(&self, document: &Document, question: &str, history: &[Turn]) -> Result<String> {
        // A follow-up with no content words of its own ("Why is that?")
        // is resolved against the previous question
        let query = match last_question(history) {
            Some(previous) if content_words(question).is_empty() => format!("{} {}", previous, question),
            _ => question.to_string(),
        };

        let hits = self.retrieve(document, &query);
        if hits.is_empty() {
            return Err(AnalysisError::OutOfScope {
                question: question.to_string(),
            });
        }

        let quoted = hits
            .iter()
            .map(|(_, clause)| format!("[Clause {}] {}", clause.ordinal + 1, clause.excerpt(600)))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!("Based on the contract:\n\n{}", quoted))
    }

    async fn extract_fields(&self, document: &Document, doc_type: DocumentType) -> Result<ContractFields> {
        Ok(extract_fields_from_text(&document.text, doc_type))
    }
}
