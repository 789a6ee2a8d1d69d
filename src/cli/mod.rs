//! Command-line interface for clausewise.
//!
//! Provides commands for analysing contracts, asking questions about them,
//! redrafting risky clauses, drafting clean agreements and inspecting the
//! template library and configuration.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::adapters::select_backend;
use crate::config::{self, ResolvedConfig};
use crate::core::{AnalyzeOptions, Analyzer};
use crate::domain::{Document, DocumentType, Severity, SourceFormat, Turn};
use crate::error::AnalysisError;
use crate::export::{self, ReportFormat};
use crate::library::{AgreementTemplate, TemplateLibrary};

/// Printed when a question is not answered by the contract
const REFUSAL: &str =
    "I can only answer questions using the uploaded contract, and it does not address this question.";

/// clausewise - Contract risk analysis
#[derive(Parser, Debug)]
#[command(name = "clausewise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads a contract
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Contract file (pdf, docx or txt)
    pub file: PathBuf,

    /// Input format (inferred from the extension if not specified)
    #[arg(short, long)]
    pub format: Option<SourceFormat>,

    /// Use the rule-based demo backend even if an API key is set
    #[arg(long)]
    pub demo: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a contract and print a risk report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Contract type (detected from the text if not specified)
        #[arg(short, long)]
        doc_type: Option<DocumentType>,

        /// Jurisdiction tag for redrafts, e.g. "in", "us", "uk"
        #[arg(short, long)]
        jurisdiction: Option<String>,

        /// Include redraft suggestions for risky clauses
        #[arg(long)]
        redraft: bool,

        /// Lowest severity that gets redrafted
        #[arg(long, default_value = "high")]
        min_severity: Severity,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        output: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Ask a question answered only from the contract
    Ask {
        #[command(flatten)]
        input: InputArgs,

        /// Question about the contract
        question: String,
    },

    /// Interactive conversation about a contract, one question per line
    Chat {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Suggest safer replacements for risky clauses
    Redraft {
        #[command(flatten)]
        input: InputArgs,

        /// Lowest severity that gets redrafted
        #[arg(long, default_value = "high")]
        min_severity: Severity,

        /// Jurisdiction tag (detected from the governing law if not specified)
        #[arg(short, long)]
        jurisdiction: Option<String>,
    },

    /// Populate a clean agreement of the contract's type
    Draft {
        #[command(flatten)]
        input: InputArgs,

        /// Agreement type (detected from the text if not specified)
        #[arg(short, long)]
        doc_type: Option<DocumentType>,

        /// Also write the agreement as a Word document
        #[arg(long)]
        docx: Option<PathBuf>,
    },

    /// List the clause template library
    Templates,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze {
                input,
                doc_type,
                jurisdiction,
                redraft,
                min_severity,
                output,
                save,
            } => {
                let options = AnalyzeOptions {
                    doc_type,
                    jurisdiction,
                    redraft_min_severity: redraft.then_some(min_severity),
                };
                analyze(&input, &options, output, save.as_deref()).await
            }
            Commands::Ask { input, question } => ask(&input, &question).await,
            Commands::Chat { input } => chat(&input).await,
            Commands::Redraft {
                input,
                min_severity,
                jurisdiction,
            } => redraft(&input, min_severity, jurisdiction).await,
            Commands::Draft { input, doc_type, docx } => draft(&input, doc_type, docx.as_deref()).await,
            Commands::Templates => list_templates(),
            Commands::Config => show_config(),
        }
    }
}

/// Load the configured template library, or the built-in one
fn load_library(cfg: &ResolvedConfig) -> Result<TemplateLibrary> {
    match &cfg.templates {
        Some(path) => TemplateLibrary::load(path),
        None => TemplateLibrary::builtin(),
    }
}

/// Build the analyzer with the backend selected for this process
fn build_analyzer(demo: bool) -> Result<Analyzer> {
    let cfg = config::config()?;
    let library = load_library(cfg)?;
    let backend = select_backend(&cfg.backend, demo);
    info!(backend = backend.name(), mode = %backend.mode(), "Backend selected");
    Ok(Analyzer::from_config(cfg, backend, Arc::new(library)))
}

/// Read and load the contract named on the command line
fn load_document(analyzer: &Analyzer, input: &InputArgs) -> Result<Document> {
    let bytes = std::fs::read(&input.file)
        .with_context(|| format!("Failed to read contract: {}", input.file.display()))?;

    let format = match input.format {
        Some(format) => format,
        None if input.file.extension().is_none() => SourceFormat::sniff(&bytes),
        None => SourceFormat::from_path(&input.file)?,
    };

    let document = analyzer
        .load(&bytes, format, Some(&input.file))
        .with_context(|| format!("Failed to load contract: {}", input.file.display()))?;
    Ok(document)
}

/// Analyse a contract and print or save the report
async fn analyze(input: &InputArgs, options: &AnalyzeOptions, output: ReportFormat, save: Option<&Path>) -> Result<()> {
    let analyzer = build_analyzer(input.demo)?;
    let document = load_document(&analyzer, input)?;

    let analysis = analyzer.analyze(&document, options).await?;
    let rendered = export::render(&analysis, output)?;

    match save {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!("[Report written to {}]", path.display());
        }
        None => println!("{}", rendered),
    }

    eprintln!(
        "\n[Analysis {} completed in {}ms: score {}/100]",
        analysis.id,
        analysis.duration_ms(),
        analysis.report.score
    );
    Ok(())
}

/// Answer a question from the contract, refusing anything it does not cover
async fn ask(input: &InputArgs, question: &str) -> Result<()> {
    let analyzer = build_analyzer(input.demo)?;
    let document = load_document(&analyzer, input)?;

    match analyzer.ask(&document, question, &[]).await {
        Ok(answer) => println!("{}", answer),
        Err(AnalysisError::OutOfScope { .. }) => println!("{}", REFUSAL),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Question loop on stdin; earlier turns go along with each question
async fn chat(input: &InputArgs) -> Result<()> {
    let analyzer = build_analyzer(input.demo)?;
    let document = load_document(&analyzer, input)?;
    let mut history: Vec<Turn> = Vec::new();

    eprintln!("Ask about {} (empty line to quit)", input.file.display());
    let mut lines = std::io::stdin().lock().lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next().transpose().context("Failed to read question")? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let reply = match analyzer.ask(&document, question, &history).await {
            Ok(answer) => answer,
            Err(AnalysisError::OutOfScope { .. }) => REFUSAL.to_string(),
            Err(e) => return Err(e.into()),
        };
        println!("{}\n", reply);

        history.push(Turn::user(question));
        history.push(Turn::assistant(reply));
    }

    info!(turns = history.len(), "Chat ended");
    Ok(())
}

/// Analyse, then print redraft suggestions only
async fn redraft(input: &InputArgs, min_severity: Severity, jurisdiction: Option<String>) -> Result<()> {
    let analyzer = build_analyzer(input.demo)?;
    let document = load_document(&analyzer, input)?;

    let options = AnalyzeOptions {
        jurisdiction,
        redraft_min_severity: Some(min_severity),
        ..Default::default()
    };
    let analysis = analyzer.analyze(&document, &options).await?;

    let mut out = String::new();
    if let Some(batch) = &analysis.redrafts {
        export::write_redrafts_text(&mut out, batch)?;
    }
    println!("{}", out.trim_end());
    Ok(())
}

/// Populate and print a clean agreement, optionally saving it as DOCX
async fn draft(input: &InputArgs, doc_type: Option<DocumentType>, docx: Option<&Path>) -> Result<()> {
    let analyzer = build_analyzer(input.demo)?;
    let document = load_document(&analyzer, input)?;

    let draft = analyzer.draft(&document, doc_type).await?;
    println!("{}", draft.text);

    if let Some(path) = docx {
        let bytes = export::draft_docx(&draft)?;
        std::fs::write(path, bytes).with_context(|| format!("Failed to write DOCX: {}", path.display()))?;
        eprintln!("[Agreement written to {}]", path.display());
    }
    eprintln!("\n[Drafted {} from {}]", draft.doc_type, input.file.display());
    Ok(())
}

/// List clause templates and agreement templates
fn list_templates() -> Result<()> {
    let cfg = config::config()?;
    let library = load_library(cfg)?;

    println!("Clause library version {} ({} entries)", library.version, library.len());
    println!();
    println!("{:<32} {:<24} {:<12}", "ID", "CATEGORY", "JURISDICTION");
    println!("{}", "-".repeat(70));
    for entry in library.entries() {
        println!(
            "{:<32} {:<24} {:<12}",
            entry.id,
            entry.category.label(),
            entry.jurisdiction.as_deref().unwrap_or("generic")
        );
    }

    println!();
    println!("Agreement templates:");
    for template in AgreementTemplate::all() {
        let fields: Vec<&str> = template.placeholders().into_iter().collect();
        println!("  {:<22} {}", template.title(), fields.join(", "));
    }

    Ok(())
}

/// Print the resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("clausewise configuration");
    println!("{}", "=".repeat(60));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!(
        "  Templates: {}",
        cfg.templates
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string())
    );
    println!();
    println!("Backend:");
    println!("  Provider:        {}", cfg.backend.provider);
    println!("  Model:           {}", cfg.backend.model());
    println!("  Base URL:        {}", cfg.backend.base_url());
    println!("  API key env:     {}", cfg.backend.api_key_env());
    println!("  Timeout:         {}s", cfg.backend.timeout_seconds);
    println!("  Max concurrency: {}", cfg.backend.max_concurrency);
    println!();
    println!("Scoring:");
    let w = &cfg.scoring.weights;
    println!(
        "  Weights:         none={} low={} medium={} high={} critical={}",
        w.none, w.low, w.medium, w.high, w.critical
    );
    println!("  Missing penalty: {}", cfg.scoring.missing_clause_penalty);
    println!("  Heading cues:    {}", cfg.min_heading_cues);
    println!();
    println!("Expected clauses:");
    for doc_type in DocumentType::ALL {
        let names: Vec<&str> = cfg
            .expected_clauses
            .for_type(Some(doc_type))
            .iter()
            .map(|c| c.as_str())
            .collect();
        println!("  {:<22} {}", doc_type.title(), names.join(", "));
    }
    println!();
    println!("Limits:");
    println!("  Max input size: {} bytes", cfg.limits.max_input_bytes);
    println!("  Max text size:  {} bytes", cfg.limits.max_text_bytes);
    println!("  Denylist:       {}", cfg.limits.denylist_patterns.join(", "));
    println!();
    println!("Retry:");
    println!("  Max attempts:   {}", cfg.retry.max_attempts);
    println!("  Initial delay:  {}ms", cfg.retry.initial_delay_ms);
    println!("  Max delay:      {}ms", cfg.retry.max_delay_ms);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "clausewise",
            "analyze",
            "contract.pdf",
            "--doc-type",
            "nda",
            "--redraft",
            "--min-severity",
            "medium",
            "--output",
            "json",
            "--demo",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                input,
                doc_type,
                redraft,
                min_severity,
                output,
                ..
            } => {
                assert_eq!(input.file, PathBuf::from("contract.pdf"));
                assert!(input.demo);
                assert_eq!(doc_type, Some(DocumentType::Nda));
                assert!(redraft);
                assert_eq!(min_severity, Severity::Medium);
                assert_eq!(output, ReportFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_chat_and_docx_draft() {
        let cli = Cli::try_parse_from(["clausewise", "chat", "msa.docx", "--demo"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { input } if input.demo));

        let cli = Cli::try_parse_from(["clausewise", "draft", "msa.txt", "--docx", "clean.docx"]).unwrap();
        match cli.command {
            Commands::Draft { docx, doc_type, .. } => {
                assert_eq!(docx, Some(PathBuf::from("clean.docx")));
                assert_eq!(doc_type, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_source_format() {
        let cli = Cli::try_parse_from(["clausewise", "ask", "scan", "Who pays?", "--format", "PDF"]).unwrap();
        match cli.command {
            Commands::Ask { input, .. } => assert_eq!(input.format, Some(SourceFormat::Pdf)),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["clausewise", "ask", "scan", "Who pays?", "--format", "rtf"]).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_doc_type() {
        assert!(Cli::try_parse_from(["clausewise", "draft", "lease.txt", "--doc-type", "lease"]).is_err());
    }
}
