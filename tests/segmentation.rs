//! Segmentation Integration Tests
//!
//! Properties of the heading / paragraph / sentence cascade.

use clausewise::core::{ClauseSegmenter, SegmentationStrategy};
use clausewise::domain::{Script, SourceFormat};
use clausewise::ingest::DocumentLoader;
use proptest::prelude::*;

#[test]
fn test_structured_contract_uses_headings() {
    let text = "MASTER SERVICES AGREEMENT\n\n\
                1. Services\nThe Provider shall deliver the services.\n\n\
                2. Fees\nThe Client shall pay monthly.\n\n\
                3. Term\nThis Agreement lasts one year.\n\n\
                4. Termination\nEither party may terminate with notice.";
    let doc = DocumentLoader::default().load(text.as_bytes(), SourceFormat::Txt).unwrap();

    let segments = ClauseSegmenter::default().segment(&doc);
    assert_eq!(segments.strategy(), SegmentationStrategy::Headings);

    let clauses: Vec<_> = segments.collect();
    assert_eq!(clauses.len(), 5);
    assert_eq!(clauses[0].text, "MASTER SERVICES AGREEMENT");
    assert!(clauses[2].text.starts_with("2. Fees"));
    assert!(clauses.iter().enumerate().all(|(i, c)| c.ordinal == i));
}

#[test]
fn test_segmentation_is_repeatable() {
    let doc = DocumentLoader::default()
        .load(
            b"The Provider shall deliver the app. The Client shall pay in 30 days. Either party may terminate.",
            SourceFormat::Txt,
        )
        .unwrap();
    let segmenter = ClauseSegmenter::default();

    let first: Vec<_> = segmenter.segment(&doc).collect();
    let second: Vec<_> = segmenter.segment(&doc).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_document_language_drives_sentence_split() {
    let doc = DocumentLoader::default()
        .load(
            "प्रदाता मोबाइल ऐप बनाएगा। ग्राहक तीस दिनों में भुगतान करेगा। कोई भी पक्ष अनुबंध समाप्त कर सकता है।".as_bytes(),
            SourceFormat::Txt,
        )
        .unwrap();
    assert_eq!(doc.language.script, Script::Devanagari);

    let segments = ClauseSegmenter::default().segment(&doc);
    assert_eq!(segments.strategy(), SegmentationStrategy::Sentences);
    let clauses: Vec<_> = segments.collect();
    assert_eq!(clauses.len(), 3);
    assert_eq!(clauses[1].text, "ग्राहक तीस दिनों में भुगतान करेगा।");
}

#[test]
fn test_thin_space_inside_sentence() {
    let doc = DocumentLoader::default()
        .load(
            "The fee is due\u{2009}monthly. Either party may terminate.".as_bytes(),
            SourceFormat::Txt,
        )
        .unwrap();

    let clauses: Vec<_> = ClauseSegmenter::default().segment(&doc).collect();
    assert_eq!(clauses.len(), 2);
    assert_eq!(clauses[0].text, "The fee is due\u{2009}monthly.");
}

fn contract_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[A-Za-z ,]{1,40}",
        Just(". ".to_string()),
        Just("\n".to_string()),
        Just("\n\n".to_string()),
        Just("1. ".to_string()),
        Just("(a) ".to_string()),
        Just("Section 2 ".to_string()),
        Just("। ".to_string()),
        Just("e.g. ".to_string()),
        Just("\u{2009}".to_string()),
        Just("\u{2003}".to_string()),
        Just("\u{3000}".to_string()),
        Just("x.\u{2009}".to_string()),
    ];
    prop::collection::vec(piece, 1..30).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_segmentation_covers_non_blank_text(text in contract_text()) {
        prop_assume!(!text.trim().is_empty());

        let segments = ClauseSegmenter::default().segment_text(&text);
        let spans = segments.spans().to_vec();
        let clauses: Vec<_> = segments.collect();

        // Never empty
        prop_assert!(!clauses.is_empty());

        // Spans are contiguous and cover the trimmed text
        let start = text.len() - text.trim_start().len();
        let end = text.trim_end().len();
        prop_assert_eq!(spans.first().map(|s| s.0), Some(start));
        prop_assert!(spans.last().map(|s| s.1).unwrap_or(0) >= end);
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }

        for (i, clause) in clauses.iter().enumerate() {
            prop_assert_eq!(clause.ordinal, i);
            prop_assert!(!clause.text.trim().is_empty());
            prop_assert_eq!(clause.text.as_str(), text[clause.span.0..clause.span.1].trim());
        }
    }

    #[test]
    fn prop_lower_threshold_never_drops_text(text in contract_text(), cues in 1usize..6) {
        prop_assume!(!text.trim().is_empty());

        let joined: String = ClauseSegmenter::new(cues)
            .segment_text(&text)
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(" ");
        let words = |s: &str| s.split_whitespace().map(str::to_string).collect::<Vec<_>>().join(" ");
        prop_assert_eq!(words(&joined), words(&text));
    }
}
