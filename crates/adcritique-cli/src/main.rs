//! Ad critique engine CLI
//!
//! The `adcritique` command exposes the scoring engine for offline use.
//!
//! ## Commands
//!
//! - `score`: Score, rank and decide on variations with precomputed scorecards
//! - `report`: Render a persisted critique report as markdown
//! - `config`: Print the effective engine configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use adcritique_core::domain::first_duplicate_id;
use adcritique_core::reporting::{load_latest_report, load_report};
use adcritique_core::{
    decide, persist_report, rank, render_report_md, scorer, CritiqueReport, DecisionInput,
    EngineConfig, RefinementDecision, Scorecard, Variation,
};
use adcritique_state::{FsReportStore, ReportKey, RunId};

#[derive(Parser)]
#[command(name = "adcritique")]
#[command(author = "Stevedores Org")]
#[command(version = adcritique_core::VERSION)]
#[command(about = "Multi-dimensional critique scoring for generated ads", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "ADCRITIQUE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score, rank and decide on a batch of precomputed scorecards
    Score {
        /// Input file (JSON) with variations and their scorecards
        #[arg(short, long)]
        input: PathBuf,

        /// Output format for the report
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Persist the report into this store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Render a persisted critique report
    Report {
        /// Store directory the report was written to
        #[arg(long)]
        store: PathBuf,

        /// Run ID
        #[arg(long)]
        run: String,

        /// Attempt number (default: latest)
        #[arg(long)]
        attempt: Option<u32>,

        /// Output format for the report
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

/// One variation with the scorecard its evaluators produced.
#[derive(Debug, Deserialize)]
struct ScoredVariation {
    variation: Variation,
    scorecard: Scorecard,
}

/// Input document for `adcritique score`.
#[derive(Debug, Deserialize)]
struct ScoreInput {
    #[serde(default)]
    run_id: Option<String>,
    /// 1-based attempt this batch belongs to.
    #[serde(default = "default_attempt")]
    attempt: u32,
    #[serde(default)]
    enhancements_used: u32,
    /// Regenerations already spent. Every critique round after the first is
    /// either a regeneration or an enhancement, so when absent this is
    /// `attempt - 1 - enhancements_used`.
    #[serde(default)]
    retry_count: Option<u32>,
    variations: Vec<ScoredVariation>,
}

impl ScoreInput {
    fn retry_count(&self) -> Result<u32> {
        let earlier_rounds = self.attempt - 1;
        match self.retry_count {
            Some(n) if n > earlier_rounds => anyhow::bail!(
                "retry_count {} exceeds the {} critique rounds before attempt {}",
                n,
                earlier_rounds,
                self.attempt
            ),
            Some(n) => Ok(n),
            None => Ok(earlier_rounds.saturating_sub(self.enhancements_used)),
        }
    }
}

fn default_attempt() -> u32 {
    1
}

#[derive(Debug, Serialize)]
struct ScoreOutput {
    report: CritiqueReport,
    decision: Option<RefinementDecision>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    adcritique_core::telemetry::init_tracing(cli.json, level);

    let config = EngineConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load engine configuration")?;

    match cli.command {
        Commands::Score {
            input,
            format,
            store,
        } => {
            let output = cmd_score(&config, &input, store.as_deref()).await?;
            print_score_output(&output, format)
        }
        Commands::Report {
            store,
            run,
            attempt,
            format,
        } => {
            let report = cmd_report(&store, &run, attempt).await?;
            print_report(&report, format)
        }
        Commands::Config => {
            print!("{}", cmd_config(&config)?);
            Ok(())
        }
    }
}

/// Score a batch read from `input`, optionally persisting the report.
async fn cmd_score(
    config: &EngineConfig,
    input: &Path,
    store_dir: Option<&Path>,
) -> Result<ScoreOutput> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read score input: {:?}", input))?;
    let parsed: ScoreInput = serde_json::from_str(&raw)
        .with_context(|| format!("Score input is not valid: {:?}", input))?;
    if parsed.attempt == 0 {
        anyhow::bail!("attempt numbers start at 1");
    }
    if let Some(id) = first_duplicate_id(parsed.variations.iter().map(|sv| &sv.variation.id)) {
        anyhow::bail!("duplicate variation id {} in score input", id);
    }
    let retry_count = parsed.retry_count()?;

    let run_id = parsed.run_id.as_deref().map(RunId::from).unwrap_or_default();
    let results = parsed
        .variations
        .into_iter()
        .map(|sv| scorer::critique(sv.variation, sv.scorecard, &config.scoring))
        .collect();
    let report = CritiqueReport::from_ranked(run_id, parsed.attempt, rank(results));

    let decision = report.best().map(|best| {
        decide(
            best,
            DecisionInput {
                attempt_count: retry_count,
                max_attempts: config.workflow.max_attempts,
                enhancements_used: parsed.enhancements_used,
            },
            &config.refinement,
        )
    });
    info!(
        run_id = %report.run_id,
        total = report.total_variations,
        passed = report.passed_variations,
        action = ?decision.as_ref().map(|d| d.action),
        "batch scored"
    );

    if let Some(dir) = store_dir {
        let store = FsReportStore::new(dir)
            .with_context(|| format!("Failed to open report store at {:?}", dir))?;
        let digest = persist_report(&store, &report)
            .await
            .context("Failed to persist report")?;
        info!(run_id = %report.run_id, digest = %digest.short(), "report persisted");
    }

    Ok(ScoreOutput { report, decision })
}

/// Load a persisted report, the latest attempt unless one is named.
async fn cmd_report(store_dir: &Path, run: &str, attempt: Option<u32>) -> Result<CritiqueReport> {
    let store = FsReportStore::new(store_dir)
        .with_context(|| format!("Failed to open report store at {:?}", store_dir))?;
    let run_id = RunId::from(run);
    match attempt {
        Some(n) => load_report(&store, &ReportKey::new(run_id, n))
            .await
            .with_context(|| format!("Failed to load report for run {} attempt {}", run, n)),
        None => load_latest_report(&store, &run_id)
            .await
            .with_context(|| format!("Failed to load reports for run {}", run))?
            .with_context(|| format!("No reports found for run {}", run)),
    }
}

fn cmd_config(config: &EngineConfig) -> Result<String> {
    config
        .to_toml_string()
        .context("Failed to render configuration")
}

fn render_decision_md(decision: &RefinementDecision) -> String {
    let mut out = format!(
        "## Decision: {}\n{}\n",
        decision.action, decision.rationale
    );
    if let Some(target) = &decision.target {
        out.push_str(&format!("- target: `{}`\n", target));
    }
    if let Some(reason) = &decision.reject_reason {
        out.push_str(&format!("- reject reason: {:?}\n", reason));
    }
    for issue in &decision.issues {
        out.push_str(&format!("- issue: {}\n", issue));
    }
    out
}

fn print_score_output(output: &ScoreOutput, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(output)?);
        }
        OutputFormat::Markdown => {
            print!("{}", render_report_md(&output.report));
            match &output.decision {
                Some(decision) => print!("\n{}", render_decision_md(decision)),
                None => println!("\nNo variations to decide on."),
            }
        }
    }
    Ok(())
}

fn print_report(report: &CritiqueReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Markdown => print!("{}", render_report_md(report)),
    }
    Ok(())
}
