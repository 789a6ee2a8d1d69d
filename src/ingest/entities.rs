//! Named-entity extraction: parties, dates and monetary amounts.
//!
//! Pattern based. Parties are organisations carrying a legal-form suffix
//! (Pvt. Ltd., LLP, Inc. and the like) and people introduced by an
//! honorific. A value already reported under one kind is not repeated.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::Entities;

/// Capitalized words that open a sentence rather than a company name
const LEADING_NOISE: [&str; 8] = ["The", "This", "That", "Between", "And", "By", "Whereas", "WHEREAS"];

fn organisation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\b(?:[A-Z][\w&'.-]*[ \t]+){1,5}",
            r"(?:Private[ \t]+Limited|Pvt\.?[ \t]+Ltd\.?|Pte\.?[ \t]+Ltd\.?|Limited|Ltd\.?|LLP|LLC|Inc\.?|Corporation|Corp\.?|GmbH)",
        ))
        .expect("static regex")
    })
}

fn person_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:Mr|Mrs|Ms|Dr|Shri|Smt)\.?[ \t]+[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2}").expect("static regex")
    })
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let month = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?";
        Regex::new(&format!(
            r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:of\s+)?{month},?\s+\d{{4}}\b|\b{month}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b|\b\d{{4}}-\d{{2}}-\d{{2}}\b|\b\d{{1,2}}/\d{{1,2}}/\d{{2,4}}\b",
            month = month
        ))
        .expect("static regex")
    })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(?:[₹$£€]|\b(?:rs\.?|inr|usd|us\$|s\$|sgd|gbp|eur))[ \t]?\d[\d,]*(?:\.\d+)?(?:[ \t]?(?:lakhs?|crores?|million|billion|thousand))?\b",
            r"|\b\d[\d,]*(?:\.\d+)?[ \t]?(?:(?:lakhs?|crores?)[ \t]+)?(?:rupees|dollars|pounds|euros)\b",
        ))
        .expect("static regex")
    })
}

/// Strip sentence-opening words from a matched organisation name
fn trim_leading_noise(name: &str) -> &str {
    let mut rest = name;
    while let Some((first, tail)) = rest.split_once(char::is_whitespace) {
        if !LEADING_NOISE.contains(&first) {
            break;
        }
        rest = tail.trim_start();
    }
    rest
}

/// Push each new match in order of position
fn collect(found: Vec<(usize, String)>, seen: &mut HashSet<String>, into: &mut Vec<String>) {
    let mut found = found;
    found.sort_by_key(|(pos, _)| *pos);
    for (_, value) in found {
        if !value.is_empty() && seen.insert(value.clone()) {
            into.push(value);
        }
    }
}

/// Extract entities from contract text
pub fn extract_entities(text: &str) -> Entities {
    let mut entities = Entities::default();
    let mut seen = HashSet::new();

    let mut parties: Vec<(usize, String)> = organisation_re()
        .find_iter(text)
        .map(|m| (m.start(), trim_leading_noise(m.as_str()).to_string()))
        .collect();
    parties.extend(person_re().find_iter(text).map(|m| (m.start(), m.as_str().to_string())));
    collect(parties, &mut seen, &mut entities.parties);

    let dates = date_re()
        .find_iter(text)
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    collect(dates, &mut seen, &mut entities.dates);

    let amounts = amount_re()
        .find_iter(text)
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    collect(amounts, &mut seen, &mut entities.amounts);

    entities
}
