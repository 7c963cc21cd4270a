//! # clauseguard CLI entry point
//!
//! Reads an already-extracted UTF-8 contract text file and prints its risk
//! analysis. PDF and image extraction happen upstream.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use clauseguard_core::{
    AnalysisRecord, AnalysisSink, ClauseSegmenter, Document, EntityExtractor, JsonSink,
    LanguageDetector, PatternEntityExtractor, ScriptLanguageDetector,
};
use clauseguard_runtime::{
    Analysis, ContractAnalyzer, LlmUsage, ProviderConfig, ProviderRegistry, RuntimeConfig,
    RuntimeError,
};

/// Red-flagged clauses listed in the text report.
const RED_FLAG_LIMIT: usize = 3;

/// ClauseGuard: clause-level risk analysis for commercial contracts.
#[derive(Parser, Debug)]
#[command(name = "clauseguard", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML or JSON runtime configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analysis: language, entities, clause risks and overall health.
    Analyze {
        /// Contract text file.
        file: PathBuf,

        /// Never call the reasoning backend.
        #[arg(long)]
        offline: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List the clauses that would be scored.
    Clauses { file: PathBuf },

    /// Print extracted parties, dates, amounts and jurisdictions as JSON.
    Entities { file: PathBuf },

    /// Print the detected language code.
    Language { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct ClauseLine<'a> {
    index: usize,
    chars: usize,
    text: &'a str,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            file,
            offline,
            format,
        } => {
            let text = read_text(&file)?;
            let analyzer = build_analyzer(config, offline)?;
            if analyzer.is_offline() {
                tracing::info!("No reasoning backend available, using local heuristics only");
            }

            let analysis = analyzer.analyze(&text).await;
            match format {
                Format::Json => {
                    let record = AnalysisRecord::from_document(
                        &analysis.document,
                        Some(file.display().to_string()),
                    );
                    JsonSink::new(std::io::stdout())
                        .emit(&record)
                        .context("writing analysis")?;
                }
                Format::Text => print_report(&analysis),
            }
        }
        Commands::Clauses { file } => {
            let text = read_text(&file)?;
            let clauses = ClauseSegmenter::new(config.min_clause_chars).segment(&text);
            let lines: Vec<ClauseLine<'_>> = clauses
                .iter()
                .map(|c| ClauseLine {
                    index: c.index,
                    chars: c.text.chars().count(),
                    text: &c.text,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&lines)?);
            if clauses.len() > config.max_clauses {
                eprintln!(
                    "note: only the first {} of {} clauses are scored",
                    config.max_clauses,
                    clauses.len()
                );
            }
        }
        Commands::Entities { file } => {
            let text = read_text(&file)?;
            let entities = PatternEntityExtractor::new().extract(&text);
            println!("{}", serde_json::to_string_pretty(&entities)?);
        }
        Commands::Language { file } => {
            let text = read_text(&file)?;
            let language = ScriptLanguageDetector::with_sample(config.language_sample_chars).detect(&text);
            println!("{} ({})", language, language.display_name());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Build the analyzer, degrading to offline when no provider can be made.
fn build_analyzer(mut config: RuntimeConfig, offline: bool) -> anyhow::Result<ContractAnalyzer> {
    if offline {
        config.provider = None;
    } else if config.provider.is_none() {
        config.provider = default_provider();
    }

    match ContractAnalyzer::builder().config(config.clone()).build() {
        Ok(analyzer) => Ok(analyzer),
        Err(RuntimeError::Provider(e)) => {
            tracing::warn!(error = %e, "Reasoning backend unavailable, continuing offline");
            config.provider = None;
            Ok(ContractAnalyzer::builder().config(config).build()?)
        }
        Err(e) => Err(e.into()),
    }
}

/// The first compiled-in provider usable without explicit settings, e.g.
/// one whose API key is exported.
fn default_provider() -> Option<ProviderConfig> {
    ProviderRegistry::with_defaults()
        .first_usable()
        .map(|(kind, settings)| ProviderConfig {
            provider_type: kind.to_string(),
            settings,
        })
}

fn print_report(analysis: &Analysis) {
    let document: &Document = &analysis.document;

    println!(
        "Language: {} ({})",
        document.language,
        document.language.display_name()
    );

    let entities = &document.entities;
    let joined = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join("; ")
        }
    };
    println!("Parties: {}", joined(&entities.parties));
    println!("Dates: {}", joined(&entities.dates));
    println!("Amounts: {}", joined(&entities.money));
    println!("Jurisdictions: {}", joined(&entities.jurisdictions));
    println!();

    println!("Clauses ({}):", document.clauses.len());
    for clause in &document.clauses {
        let Some(judgment) = &clause.judgment else {
            continue;
        };
        let marker = if judgment.is_high_risk() { "!" } else { " " };
        let provenance = clause
            .provenance
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "{} [{:>2}/10] #{} {} ({})",
            marker, judgment.risk_score, clause.index, clause.text, provenance
        );
        println!("      {}", judgment.explanation);
        println!("      Suggestion: {}", judgment.suggestion);
    }

    let flags = document.red_flags(RED_FLAG_LIMIT);
    if !flags.is_empty() {
        println!();
        println!("Red flags:");
        for clause in flags {
            println!("  - #{} {}", clause.index, clause.text);
        }
    }

    println!();
    println!(
        "Overall health: {}/100 ({})",
        document.assessment.overall_score, document.assessment_provenance
    );
    println!("{}", document.assessment.summary);

    print_usage(&analysis.usage);
}

fn print_usage(usage: &LlmUsage) {
    if usage.llm_calls == 0 {
        return;
    }
    println!();
    println!(
        "Remote calls: {}, tokens: {}, estimated cost: ${:.4}",
        usage.llm_calls, usage.total_tokens, usage.estimated_cost
    );
}
