//! Text extraction per source format.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::domain::SourceFormat;
use crate::error::{AnalysisError, Result};

/// Extract plain text from bytes in the given format
pub fn extract_text(bytes: &[u8], format: SourceFormat) -> Result<String> {
    match format {
        SourceFormat::Pdf => extract_pdf(bytes),
        SourceFormat::Docx => extract_docx(bytes),
        SourceFormat::Txt => extract_txt(bytes),
    }
}

/// Decode UTF-8 text, dropping a leading BOM
pub fn extract_txt(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AnalysisError::unsupported("txt", format!("not valid UTF-8: {}", e)))
}

/// Extract text from a PDF via pdf-extract
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    if !bytes.starts_with(b"%PDF") {
        return Err(AnalysisError::unsupported("pdf", "missing %PDF header"));
    }

    // pdf-extract panics on some malformed inputs
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match outcome {
        Ok(Ok(text)) => {
            debug!(chars = text.len(), "Extracted PDF text");
            Ok(text)
        }
        Ok(Err(e)) => {
            let msg = e.to_string();
            let reason = if msg.to_lowercase().contains("encrypt") {
                "PDF is encrypted".to_string()
            } else {
                msg
            };
            Err(AnalysisError::unsupported("pdf", reason))
        }
        Err(_) => Err(AnalysisError::unsupported("pdf", "PDF parser failed on malformed input")),
    }
}

fn docx_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>|<w:cr/>")
            .expect("static regex")
    })
}

fn xml_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);").expect("static regex"))
}

/// Decode the XML entities that appear in WordprocessingML text runs
fn decode_entities(s: &str) -> String {
    xml_entity_re()
        .replace_all(s, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") => u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32),
                _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Convert `word/document.xml` to plain text, one line per paragraph
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    for caps in docx_token_re().captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&decode_entities(run.as_str()));
            continue;
        }
        match &caps[0] {
            "</w:p>" | "<w:br/>" | "<w:cr/>" => out.push('\n'),
            "<w:tab/>" => out.push('\t'),
            _ => {}
        }
    }
    out
}

/// Extract text from a DOCX (ZIP) container
pub fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AnalysisError::unsupported("docx", format!("not a ZIP archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| AnalysisError::unsupported("docx", "word/document.xml not found"))?
        .read_to_string(&mut xml)
        .map_err(|e| AnalysisError::unsupported("docx", format!("unreadable document.xml: {}", e)))?;

    let text = docx_xml_to_text(&xml);
    debug!(chars = text.len(), "Extracted DOCX text");
    Ok(text)
}
