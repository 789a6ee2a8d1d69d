//! Report rendering: plain text, Markdown and JSON, plus DOCX output for
//! drafted agreements.

use std::fmt::{self, Write as _};
use std::io::{Cursor, Write as _};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::{AgreementDraft, Analysis, AnalysisMode, Entities, RedraftBatch, Severity};

/// Characters of clause text shown per row
const EXCERPT_CHARS: usize = 120;

/// Output format for a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

/// Render an analysis in the requested format
pub fn render(analysis: &Analysis, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => render_text(analysis),
        ReportFormat::Markdown => render_markdown(analysis),
        ReportFormat::Json => serde_json::to_string_pretty(analysis).context("Failed to serialize analysis"),
    }
}

pub fn render_text(analysis: &Analysis) -> Result<String> {
    let mut out = String::new();
    write_text(&mut out, analysis).context("Failed to render text report")?;
    Ok(out)
}

pub fn render_markdown(analysis: &Analysis) -> Result<String> {
    let mut out = String::new();
    write_markdown(&mut out, analysis).context("Failed to render Markdown report")?;
    Ok(out)
}

fn mode_note(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Live => "",
        AnalysisMode::Demo => " (demo mode: rule-based, no model calls)",
    }
}

fn doc_type_label(analysis: &Analysis) -> String {
    analysis
        .report
        .document_type
        .map(|t| t.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Entity kinds with their values, skipping empty kinds
fn entity_rows(entities: &Entities) -> impl Iterator<Item = (&'static str, &[String])> {
    [
        ("Parties", entities.parties.as_slice()),
        ("Dates", entities.dates.as_slice()),
        ("Amounts", entities.amounts.as_slice()),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
}

fn write_text(out: &mut String, analysis: &Analysis) -> fmt::Result {
    let report = &analysis.report;

    writeln!(out, "Contract Risk Assessment{}", mode_note(report.mode))?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Contract type: {}", doc_type_label(analysis))?;
    writeln!(out, "Language:      {}", analysis.document.language)?;
    writeln!(
        out,
        "Jurisdiction:  {}",
        analysis.document.jurisdiction.as_deref().unwrap_or("unknown")
    )?;
    writeln!(out, "Risk score:    {}/100 ({} risk)", report.score, report.risk_level)?;

    if !report.entities.is_empty() {
        writeln!(out)?;
        writeln!(out, "Key entities:")?;
        for (kind, values) in entity_rows(&report.entities) {
            writeln!(out, "  {:<8} {}", format!("{}:", kind), values.join("; "))?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Clauses ({}):", report.clauses.len())?;
    for clause in &report.clauses {
        writeln!(
            out,
            "  [{}] {:<22} {:<8} {}",
            clause.ordinal,
            clause.category.label(),
            clause.severity,
            clause.excerpt(EXCERPT_CHARS)
        )?;
        if !clause.rationale.is_empty() {
            writeln!(out, "      {}", clause.rationale)?;
        }
    }

    if !report.missing.is_empty() {
        writeln!(out)?;
        writeln!(out, "Missing clauses:")?;
        for category in &report.missing {
            writeln!(out, "  - {}", category.label())?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in &report.warnings {
            writeln!(out, "  ! {}", warning)?;
        }
    }

    if let Some(batch) = &analysis.redrafts {
        writeln!(out)?;
        write_redrafts_text(out, batch)?;
    }
    Ok(())
}

/// Redraft suggestions as plain text
pub fn write_redrafts_text(out: &mut String, batch: &RedraftBatch) -> fmt::Result {
    if batch.is_empty() {
        return writeln!(out, "No clauses needed redrafting.");
    }

    writeln!(out, "Suggested redrafts:")?;
    for s in &batch.suggestions {
        writeln!(
            out,
            "  Clause {} ({}, template {}, confidence {:.2})",
            s.clause_ordinal,
            s.category.label(),
            s.template_id,
            s.confidence
        )?;
        writeln!(out, "    {}", s.suggested_text.trim())?;
    }
    for f in &batch.failures {
        writeln!(out, "  Clause {} ({}): {}", f.clause_ordinal, f.category.label(), f.reason)?;
    }
    Ok(())
}

fn write_markdown(out: &mut String, analysis: &Analysis) -> fmt::Result {
    let report = &analysis.report;

    writeln!(out, "# Contract Risk Assessment Report")?;
    writeln!(out)?;
    if report.mode == AnalysisMode::Demo {
        writeln!(out, "> Demo mode: rule-based analysis, no model calls.")?;
        writeln!(out)?;
    }
    writeln!(out, "**Contract type:** {}  ", doc_type_label(analysis))?;
    writeln!(out, "**Overall risk score:** {}/100 ({})  ", report.score, report.risk_level)?;
    writeln!(out, "**Analysed:** {}", analysis.completed_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out)?;

    if !report.entities.is_empty() {
        writeln!(out, "## Key entities")?;
        writeln!(out)?;
        for (kind, values) in entity_rows(&report.entities) {
            writeln!(out, "- **{}:** {}", kind, values.join("; "))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Key risks")?;
    writeln!(out)?;
    let key: Vec<_> = report.clauses_at_least(Severity::High).collect();
    if key.is_empty() {
        writeln!(out, "No major risks identified.")?;
    } else {
        for clause in key {
            writeln!(
                out,
                "- **{}** (clause {}, severity: {}): {}",
                clause.category.label(),
                clause.ordinal,
                clause.severity,
                clause.rationale
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Clause analysis")?;
    writeln!(out)?;
    writeln!(out, "| # | Category | Severity | Clause |")?;
    writeln!(out, "|---|----------|----------|--------|")?;
    for clause in &report.clauses {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            clause.ordinal,
            clause.category.label(),
            clause.severity,
            clause.excerpt(EXCERPT_CHARS).replace('|', "\\|")
        )?;
    }

    if !report.missing.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Missing clauses")?;
        writeln!(out)?;
        for category in &report.missing {
            writeln!(out, "- {}", category.label())?;
        }
    }

    if let Some(batch) = analysis.redrafts.as_ref().filter(|b| !b.is_empty()) {
        writeln!(out)?;
        writeln!(out, "## Suggested redrafts")?;
        for s in &batch.suggestions {
            writeln!(out)?;
            writeln!(
                out,
                "### Clause {}: {} ({:.0}% fit)",
                s.clause_ordinal,
                s.category.label(),
                s.confidence * 100.0
            )?;
            writeln!(out)?;
            writeln!(out, "> {}", s.suggested_text.trim().replace('\n', "\n> "))?;
        }
        for f in &batch.failures {
            writeln!(out)?;
            writeln!(out, "- Clause {} not redrafted: {}", f.clause_ordinal, f.reason)?;
        }
    }
    Ok(())
}

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

/// One inch, in twentieths of a point
const MARGIN_TWIPS: u32 = 1440;

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// WordprocessingML body: a centered bold title, then one paragraph per
/// non-blank line
fn document_xml(draft: &AgreementDraft) -> String {
    let mut lines = draft.text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty());
    let title = lines
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| draft.doc_type.title().to_uppercase());

    let mut xml = String::with_capacity(draft.text.len() * 2);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#);
    xml.push_str(&format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_xml(&title)
    ));
    for line in lines {
        xml.push_str(&format!(
            r#"<w:p><w:pPr><w:spacing w:line="276" w:lineRule="auto"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(line)
        ));
    }
    xml.push_str(&format!(
        r#"<w:sectPr><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}"/></w:sectPr>"#,
        m = MARGIN_TWIPS
    ));
    xml.push_str("</w:body></w:document>");
    xml
}

/// Package a drafted agreement as a Word document
pub fn draft_docx(draft: &AgreementDraft) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("word/document.xml", document_xml(draft)),
    ] {
        writer
            .start_file(name, options)
            .with_context(|| format!("Failed to add {} to DOCX", name))?;
        writer
            .write_all(content.as_bytes())
            .with_context(|| format!("Failed to write {}", name))?;
    }

    let cursor = writer.finish().context("Failed to finish DOCX archive")?;
    Ok(cursor.into_inner())
}
