//! The three-stage expense analysis: categorize, detect patterns, generate insights.
//!
//! Each stage makes at most one model call. A stage whose call fails, or whose reply cannot be
//! read, falls back to an empty or default section and records a `StageWarning`; the run carries
//! on. The exception is a backend that cannot serve anything (unreachable, or the model is not
//! loaded), which fails the whole run with no partial report.
//!
//! Totals, per-category sums and pattern counts are always computed locally with exact decimal
//! arithmetic. The model only decides which category a label belongs to and writes prose.

mod categorize;
mod extract;
mod insights;
mod patterns;
mod prompts;

use crate::api::Inference;
use crate::model::{Amount, AnalysisReport, ExpenseRecord, Period, Stage, StageWarning};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use tracing::{info, warn};

/// A label must appear at least this many times within one category to become a pattern finding.
pub const PATTERN_THRESHOLD: usize = 3;

/// Runs the pipeline over `records`, which should already be filtered to `period`.
///
/// `now` is the time of the request. It stamps the report and anchors the period description.
///
/// # Errors
/// - `Connectivity` or `ModelUnavailable` if the inference backend cannot serve a request. No
///   report is returned in that case.
pub async fn analyze(
    inference: &mut (dyn Inference + Send),
    period: Period,
    records: &[ExpenseRecord],
    now: NaiveDateTime,
) -> Result<AnalysisReport> {
    if records.is_empty() {
        info!("No {period} expenses to analyze");
        return Ok(AnalysisReport::empty(period, now));
    }
    let today = now.date();
    let mut warnings = Vec::new();

    info!(
        "Stage 1 of 3: categorizing {} expenses with {}",
        records.len(),
        inference.model()
    );
    let categorized = categorize::categorize(inference, records, &mut warnings).await?;

    info!("Stage 2 of 3: looking for recurring purchases");
    let mut findings = patterns::find(records, &categorized.categories);
    patterns::annotate(inference, &mut findings, period, today, &mut warnings).await?;

    info!("Stage 3 of 3: generating insights");
    let total_expenses: Amount = records.iter().map(ExpenseRecord::amount).sum();
    let insights = insights::generate(
        inference,
        insights::Totals {
            period,
            today,
            total: total_expenses,
            transactions: records.len(),
            categories: &categorized.summaries,
            findings: &findings,
        },
        &mut warnings,
    )
    .await?;

    let report = AnalysisReport {
        period,
        total_expenses,
        total_transactions: records.len(),
        categories: categorized.summaries,
        patterns: findings,
        insights,
        analyzed_at: now,
        warnings,
    };
    info!(
        "Analysis complete: {} categories, {} patterns, {} insights{}",
        report.categories.len(),
        report.patterns.len(),
        report.insights.len(),
        if report.is_partial() { " (partial)" } else { "" }
    );
    Ok(report)
}

/// Decides what a failed model call means for the run. Returns the error if the backend is down,
/// otherwise records a warning for `stage` and returns `Ok`.
fn degrade(stage: Stage, error: Error, warnings: &mut Vec<StageWarning>) -> Result<()> {
    if error.is_backend_down() {
        return Err(error.context(format!("The {stage} stage could not reach the model")));
    }
    record_warning(warnings, stage, format!("The model call failed: {error}"));
    Ok(())
}

fn record_warning(warnings: &mut Vec<StageWarning>, stage: Stage, message: impl Into<String>) {
    let message = message.into();
    warn!("The {stage} stage degraded: {message}");
    warnings.push(StageWarning { stage, message });
}
