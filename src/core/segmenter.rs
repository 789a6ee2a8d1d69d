//! Clause segmentation.
//!
//! Splits document text into clause spans with a fixed cascade:
//! 1. numbered/lettered heading cues at line starts, when at least
//!    `min_heading_cues` are present
//! 2. blank-line paragraphs, when that yields more than one block
//! 3. sentence boundaries, with rules chosen by the document's script
//!
//! Every segment starts at a non-whitespace character and runs up to the
//! next segment's start, so spans are contiguous over the trimmed text and
//! no segment is blank.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Clause, Document, Script};
use crate::ingest::language::dominant_script;

/// Default minimum number of heading cues before headings are trusted
pub const DEFAULT_MIN_HEADING_CUES: usize = 3;

/// Which cascade stage produced the segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    Headings,
    Paragraphs,
    Sentences,
}

/// Splits documents into unclassified clauses
#[derive(Debug, Clone)]
pub struct ClauseSegmenter {
    min_heading_cues: usize,
}

impl Default for ClauseSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_HEADING_CUES)
    }
}

impl ClauseSegmenter {
    pub fn new(min_heading_cues: usize) -> Self {
        Self {
            min_heading_cues: min_heading_cues.max(1),
        }
    }

    pub fn min_heading_cues(&self) -> usize {
        self.min_heading_cues
    }

    /// Segment a loaded document using its detected script
    pub fn segment<'a>(&self, document: &'a Document) -> Segments<'a> {
        self.segment_script(&document.text, document.language.script)
    }

    /// Segment arbitrary text, detecting the script from its letters
    pub fn segment_text<'a>(&self, text: &'a str) -> Segments<'a> {
        self.segment_script(text, dominant_script(text).unwrap_or(Script::Other))
    }

    /// Segment text with the sentence rules for `script`
    pub fn segment_script<'a>(&self, text: &'a str, script: Script) -> Segments<'a> {
        let Some((lo, hi)) = trimmed_bounds(text) else {
            return Segments::new(text, SegmentationStrategy::Sentences, Vec::new());
        };

        let headings = heading_cues(text, lo, hi);
        let (strategy, cuts) = if headings.len() >= self.min_heading_cues {
            (SegmentationStrategy::Headings, headings)
        } else {
            let paragraphs = paragraph_cuts(text, lo, hi);
            if !paragraphs.is_empty() {
                (SegmentationStrategy::Paragraphs, paragraphs)
            } else {
                (SegmentationStrategy::Sentences, sentence_cuts(text, lo, hi, SentenceRules::for_script(script)))
            }
        };

        let mut starts = Vec::with_capacity(cuts.len() + 1);
        starts.push(lo);
        starts.extend(cuts.into_iter().filter(|&c| c > lo && c < hi));
        starts.dedup();

        let spans: Vec<(usize, usize)> = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| (start, starts.get(i + 1).copied().unwrap_or(hi)))
            .collect();

        debug!(?strategy, segments = spans.len(), "Segmented text");
        Segments::new(text, strategy, spans)
    }
}

/// Restartable, order-stable sequence of clauses
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    strategy: SegmentationStrategy,
    spans: Vec<(usize, usize)>,
    next: usize,
}

impl<'a> Segments<'a> {
    fn new(text: &'a str, strategy: SegmentationStrategy, spans: Vec<(usize, usize)>) -> Self {
        Self {
            text,
            strategy,
            spans,
            next: 0,
        }
    }

    pub fn strategy(&self) -> SegmentationStrategy {
        self.strategy
    }

    /// Byte spans of all segments
    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }

    /// A fresh iterator over the same segments
    pub fn restart(&self) -> Self {
        Self {
            next: 0,
            ..self.clone()
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = Clause;

    fn next(&mut self) -> Option<Clause> {
        let (start, end) = *self.spans.get(self.next)?;
        let clause = Clause::new(self.next, (start, end), self.text[start..end].trim());
        self.next += 1;
        Some(clause)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.spans.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments<'_> {}

/// Byte offsets of the first and one-past-last non-whitespace characters
fn trimmed_bounds(text: &str) -> Option<(usize, usize)> {
    let lo = text.find(|c: char| !c.is_whitespace())?;
    let hi = text.trim_end().len();
    Some((lo, hi))
}

/// Lines with their byte offsets
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:",
            r"(?i:section|article|clause|schedule|annexure|annex|धारा|अनुच्छेद)\s+[\p{N}IVXLCivxlc]+[A-Za-z]?(?:\.\p{N}+)*",
            r"(?:[.:)](?:\s|$)|\s*$|\s+\P{Ll})",
            r"|\p{N}+(?:\.\p{N}+)+\.?(?:\s|$)",
            r"|\p{N}+[.)](?:\s|$)",
            r"|\((?:\p{N}+|[a-zA-Z]|[ivxIVX]+)\)(?:\s|$)",
            r"|(?:[a-zA-Z]|[ivxIVX]+)[.)](?:\s|$)",
            r")"
        ))
        .expect("static regex")
    })
}

/// Offsets of heading cues at line starts
fn heading_cues(text: &str, lo: usize, hi: usize) -> Vec<usize> {
    lines_with_offsets(text)
        .filter_map(|(start, line)| {
            let indent = line.len() - line.trim_start().len();
            let content = line.trim_start();
            if content.is_empty() || !heading_re().is_match(content) {
                return None;
            }
            Some(start + indent)
        })
        .filter(|&pos| pos >= lo && pos < hi)
        .collect()
}

/// Offsets of paragraph starts that follow a blank line
fn paragraph_cuts(text: &str, lo: usize, hi: usize) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut seen_content = false;
    let mut after_blank = false;

    for (start, line) in lines_with_offsets(text) {
        let content = line.trim_start();
        if content.trim().is_empty() {
            if seen_content {
                after_blank = true;
            }
            continue;
        }
        let pos = start + (line.len() - content.len());
        if after_blank && pos > lo && pos < hi {
            cuts.push(pos);
        }
        seen_content = true;
        after_blank = false;
    }
    cuts
}

const ABBREVIATIONS: [&str; 16] = [
    "mr", "mrs", "ms", "dr", "no", "nos", "inc", "ltd", "pvt", "co", "art", "sec", "vs", "rs", "st", "cl",
];

/// Sentence-boundary heuristics for a script family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SentenceRules {
    /// Cased text: abbreviation list and a capitalized next word
    Latin,
    /// Danda and double danda, plus Latin punctuation
    Devanagari,
    /// Full-width terminators that need no following space
    Cjk,
    /// Punctuation followed by whitespace
    Generic,
}

impl SentenceRules {
    fn for_script(script: Script) -> Self {
        match script {
            Script::Latin => SentenceRules::Latin,
            Script::Devanagari => SentenceRules::Devanagari,
            Script::Cjk => SentenceRules::Cjk,
            Script::Cyrillic | Script::Arabic | Script::Other => SentenceRules::Generic,
        }
    }

    fn is_terminator(self, c: char) -> bool {
        match self {
            SentenceRules::Latin => matches!(c, '.' | '!' | '?'),
            SentenceRules::Devanagari => matches!(c, '।' | '॥' | '.' | '!' | '?'),
            SentenceRules::Cjk => matches!(c, '。' | '！' | '？' | '.' | '!' | '?'),
            SentenceRules::Generic => matches!(c, '.' | '!' | '?' | '؟' | '।' | '॥' | '。' | '！' | '？'),
        }
    }

    /// Whether a terminator followed by whitespace ends the sentence
    fn ends_sentence(self, c: char, token: &str, next: char) -> bool {
        match self {
            SentenceRules::Latin => {
                let token_ok = c != '.' || !is_non_terminal_token(token);
                token_ok && !next.is_lowercase()
            }
            _ => c != '.' || !is_enumerator(token),
        }
    }
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '」' | '』' | '）')
}

fn is_fullwidth_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

/// Numbering such as 1, 1.2 or ३ right before a period
fn is_enumerator(token: &str) -> bool {
    let token = token.trim_start_matches(['(', '[']);
    !token.is_empty() && token.chars().all(|c| c.is_numeric() || c == '.')
}

/// Whether the word ending right before a period is an enumerator or an
/// abbreviation rather than the end of a sentence
fn is_non_terminal_token(token: &str) -> bool {
    let token = token.trim_start_matches(['(', '[', '"', '\'']);
    if token.is_empty() {
        return true;
    }
    // 1 / 1.2 / (a) / iv
    if is_enumerator(token) {
        return true;
    }
    if token.chars().count() == 1 && token.chars().all(char::is_alphabetic) {
        return true;
    }
    if token.len() <= 4 && token.chars().all(|c| matches!(c, 'i' | 'v' | 'x' | 'I' | 'V' | 'X')) {
        return true;
    }
    if token.ends_with(')') {
        return true;
    }
    // e.g / i.e / U.S
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() >= 2 && parts.iter().all(|p| p.chars().count() <= 1) {
        return true;
    }
    ABBREVIATIONS.contains(&token.to_lowercase().as_str())
}

/// Offsets of sentence starts after the first one
fn sentence_cuts(text: &str, lo: usize, hi: usize, rules: SentenceRules) -> Vec<usize> {
    let region = &text[..hi];
    let chars: Vec<(usize, char)> = region.char_indices().filter(|(i, _)| *i >= lo).collect();
    let mut cuts = Vec::new();
    let mut idx = 0;

    while idx < chars.len() {
        let (pos, c) = chars[idx];
        if !rules.is_terminator(c) {
            idx += 1;
            continue;
        }

        // Swallow runs like "...", "?!" and closing quotes/brackets
        let mut j = idx + 1;
        while j < chars.len() && (rules.is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }

        let mut k = j;
        while k < chars.len() && chars[k].1.is_whitespace() {
            k += 1;
        }
        if k >= chars.len() {
            break;
        }

        let boundary = if is_fullwidth_terminator(c) {
            true
        } else if k == j {
            false
        } else {
            // Word before the terminator, back to the previous whitespace char
            let mut w = idx;
            while w > 0 && !chars[w - 1].1.is_whitespace() {
                w -= 1;
            }
            let token = &region[chars[w].0..pos];
            rules.ends_sentence(c, token, chars[k].1)
        };

        if boundary && chars[k].0 > lo {
            cuts.push(chars[k].0);
        }
        idx = k;
    }
    cuts
}
