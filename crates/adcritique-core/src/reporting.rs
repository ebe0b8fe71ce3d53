use std::path::Path;

use adcritique_state::{ContentDigest, ReportKey, ReportStore, RunId};
use anyhow::Context;

use crate::domain::{CritiqueReport, Dimension, DimensionOutcome, Result};
use crate::ranker;

/// Persist one critique attempt under (run id, attempt).
pub async fn persist_report(
    store: &dyn ReportStore,
    report: &CritiqueReport,
) -> Result<ContentDigest> {
    let key = ReportKey::new(report.run_id.clone(), report.attempt);
    let body = serde_json::to_value(report)?;
    Ok(store.put_report(&key, body).await?)
}

/// Load a persisted report back into its typed form.
pub async fn load_report(store: &dyn ReportStore, key: &ReportKey) -> Result<CritiqueReport> {
    let stored = store.get_report(key).await?;
    Ok(serde_json::from_value(stored.body)?)
}

/// Most recent report of a run, if any attempt was persisted.
pub async fn load_latest_report(
    store: &dyn ReportStore,
    run_id: &RunId,
) -> Result<Option<CritiqueReport>> {
    match store.latest_report(run_id).await? {
        Some(stored) => Ok(Some(serde_json::from_value(stored.body)?)),
        None => Ok(None),
    }
}

/// Write a report as pretty JSON.
pub fn write_report_json(path: &Path, report: &CritiqueReport) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize critique report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn dimension_cell(outcome: Option<&DimensionOutcome>) -> String {
    match outcome {
        Some(DimensionOutcome::Scored(s)) => format!("{:.2}", s.score),
        Some(DimensionOutcome::Failed { .. }) | None => "n/a".to_string(),
    }
}

/// Render markdown summary of one critique attempt.
pub fn render_report_md(report: &CritiqueReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Critique Report: {} (attempt {})\n\n",
        report.run_id, report.attempt
    ));
    out.push_str(&format!(
        "- generated: {}\n- variations: {}\n- passed: {}\n- failed: {}\n",
        report.generated_at.to_rfc3339(),
        report.total_variations,
        report.passed_variations,
        report.failed_variations
    ));
    match &report.best_variation {
        Some(best) => out.push_str(&format!("- best: `{}`\n\n", best)),
        None => out.push_str("- best: none\n\n"),
    }

    if report.results.is_empty() {
        return out;
    }

    out.push_str("## Ranking\n\n");
    out.push_str("| rank | variation | overall | passed |");
    for d in Dimension::ALL {
        out.push_str(&format!(" {} |", d.label()));
    }
    out.push_str("\n|---|---|---|---|");
    for _ in Dimension::ALL {
        out.push_str("---|");
    }
    out.push('\n');
    for (i, r) in report.results.iter().enumerate() {
        let mut flags = String::new();
        if r.safety_override {
            flags.push_str(" (safety override)");
        }
        if r.low_confidence {
            flags.push_str(" (low confidence)");
        }
        out.push_str(&format!(
            "| {} | `{}` | {:.2}{} | {} |",
            r.rank.unwrap_or(i as u32 + 1),
            r.variation.id,
            r.overall_score,
            flags,
            if r.passed { "yes" } else { "no" }
        ));
        for d in Dimension::ALL {
            out.push_str(&format!(" {} |", dimension_cell(r.scorecard.outcome(d))));
        }
        out.push('\n');
    }
    out.push('\n');

    if let Some(best) = report.best() {
        out.push_str(&format!("## Best: `{}`\n\n", best.variation.id));
        for outcome in best.scorecard.outcomes() {
            match outcome {
                DimensionOutcome::Scored(s) => {
                    out.push_str(&format!(
                        "### {} ({:.2})\n{}\n",
                        s.dimension.label(),
                        s.score,
                        s.feedback
                    ));
                    for issue in &s.issues {
                        out.push_str(&format!("- issue: {}\n", issue));
                    }
                    for suggestion in &s.suggestions {
                        out.push_str(&format!("- suggestion: {}\n", suggestion));
                    }
                    out.push('\n');
                }
                DimensionOutcome::Failed { dimension, reason } => {
                    out.push_str(&format!(
                        "### {} (not scored)\n{}\n\n",
                        dimension.label(),
                        reason
                    ));
                }
            }
        }
    }

    let summary = ranker::summarize(&report.results);
    out.push_str("## Spread\n");
    out.push_str(&format!(
        "- mean: {:.2}\n- min: {:.2}\n- max: {:.2}\n",
        summary.mean_score, summary.min_score, summary.max_score
    ));
    out
}
