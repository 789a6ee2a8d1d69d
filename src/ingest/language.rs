//! Script-based language detection.
//!
//! Counts alphabetic characters per Unicode block and picks the dominant
//! script. Latin text is narrowed down with a small stop-word vote. This is
//! a heuristic for choosing segmentation rules, not an NLP classifier.

use std::collections::HashMap;

use crate::domain::{Language, Script};

const STOPWORDS: [(&str, &[&str]); 4] = [
    (
        "en",
        &["the", "and", "of", "to", "shall", "this", "by", "with", "agreement", "any"],
    ),
    ("fr", &["le", "les", "et", "des", "du", "est", "une", "pour", "contrat", "dans"]),
    ("de", &["der", "die", "das", "und", "ist", "nicht", "mit", "den", "zu", "vertrag"]),
    ("es", &["el", "los", "las", "y", "del", "por", "una", "con", "contrato", "para"]),
];

/// Classify a single character into a script, if it is a letter
fn script_of(c: char) -> Option<Script> {
    if !c.is_alphabetic() {
        return None;
    }
    let script = match c {
        'a'..='z' | 'A'..='Z' | '\u{00C0}'..='\u{024F}' => Script::Latin,
        '\u{0900}'..='\u{097F}' => Script::Devanagari,
        '\u{0400}'..='\u{04FF}' => Script::Cyrillic,
        '\u{0600}'..='\u{06FF}' => Script::Arabic,
        '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}' | '\u{AC00}'..='\u{D7AF}' => Script::Cjk,
        _ => Script::Other,
    };
    Some(script)
}

/// Dominant script of a text, `None` when it has no letters
pub fn dominant_script(text: &str) -> Option<Script> {
    let mut counts: HashMap<Script, usize> = HashMap::new();
    for script in text.chars().filter_map(script_of) {
        *counts.entry(script).or_default() += 1;
    }

    // Ties resolve by a fixed script order so the result is stable
    let order = [
        Script::Latin,
        Script::Devanagari,
        Script::Cyrillic,
        Script::Arabic,
        Script::Cjk,
        Script::Other,
    ];
    order
        .into_iter()
        .filter_map(|s| counts.get(&s).map(|n| (s, *n)))
        .fold(None, |best: Option<(Script, usize)>, (s, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((s, n)),
        })
        .map(|(s, _)| s)
}

/// Pick a Latin-script language by stop-word frequency
fn latin_language(text: &str) -> Option<&'static str> {
    let mut votes: HashMap<&'static str, usize> = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .take(2000)
    {
        let lower = word.to_lowercase();
        for (code, words) in STOPWORDS.iter() {
            if words.contains(&lower.as_str()) {
                *votes.entry(*code).or_default() += 1;
            }
        }
    }

    STOPWORDS
        .iter()
        .map(|(code, _)| (*code, votes.get(code).copied().unwrap_or(0)))
        .filter(|(_, n)| *n > 0)
        .fold(None, |best: Option<(&'static str, usize)>, (code, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((code, n)),
        })
        .map(|(code, _)| code)
}

/// Detect the language of a document text
pub fn detect_language(text: &str) -> Language {
    let Some(script) = dominant_script(text) else {
        return Language::undetermined();
    };

    let code = match script {
        Script::Latin => latin_language(text).unwrap_or("und"),
        Script::Devanagari => "hi",
        Script::Cyrillic => "ru",
        Script::Arabic => "ar",
        Script::Cjk => {
            if text.chars().any(|c| ('\u{3040}'..='\u{30FF}').contains(&c)) {
                "ja"
            } else if text.chars().any(|c| ('\u{AC00}'..='\u{D7AF}').contains(&c)) {
                "ko"
            } else {
                "zh"
            }
        }
        Script::Other => "und",
    };

    Language::new(code, script)
}
