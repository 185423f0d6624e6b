//! Stage 2: find labels that repeat within a category and ask the model for a short note on each.
//!
//! Counting is done here rather than by the model so that occurrence counts are exact. The model
//! only adds notes.

use super::{degrade, extract, prompts, record_warning, PATTERN_THRESHOLD};
use crate::api::Inference;
use crate::model::{ExpenseRecord, PatternFinding, Period, Stage, StageWarning};
use crate::Result;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Counts each label within its assigned category and keeps those seen at least
/// `PATTERN_THRESHOLD` times, most frequent first.
pub(super) fn find(records: &[ExpenseRecord], categories: &[String]) -> Vec<PatternFinding> {
    let mut counts: BTreeMap<(&str, String), usize> = BTreeMap::new();
    for (record, category) in records.iter().zip(categories) {
        *counts.entry((category.as_str(), record.label())).or_default() += 1;
    }
    let mut findings: Vec<PatternFinding> = counts
        .into_iter()
        .filter(|(_, count)| *count >= PATTERN_THRESHOLD)
        .map(|((category, label), count)| PatternFinding::new(category, label, count))
        .collect();
    // Stable sort, so ties stay in category then label order.
    findings.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
    findings
}

/// Asks the model for a note per finding and attaches the ones it can match.
pub(super) async fn annotate(
    inference: &mut (dyn Inference + Send),
    findings: &mut [PatternFinding],
    period: Period,
    today: NaiveDate,
    warnings: &mut Vec<StageWarning>,
) -> Result<()> {
    if findings.is_empty() {
        return Ok(());
    }
    let prompt = prompts::habits(findings, period, today);
    let reply = match inference.generate(&prompt).await {
        Ok(reply) => reply,
        Err(e) => return degrade(Stage::Patterns, e, warnings),
    };
    let Some(notes) = extract::notes(&reply) else {
        record_warning(
            warnings,
            Stage::Patterns,
            "The model's habit notes could not be read",
        );
        return Ok(());
    };
    for finding in findings.iter_mut() {
        finding.note = note_for(&notes, finding);
    }
    Ok(())
}

/// Finds the note keyed by the finding's bullet, `label (category)`, or by the bare label. A key
/// that only shares a prefix with the label belongs to some other finding.
fn note_for(notes: &HashMap<String, String>, finding: &PatternFinding) -> Option<String> {
    let bullet = format!("{} ({})", finding.label, finding.category);
    if let Some(note) = notes.get(&bullet).or_else(|| notes.get(&finding.label)) {
        return Some(note.clone());
    }
    // Replies sometimes echo the bullet with a different category.
    let echo = format!("{} (", finding.label);
    notes
        .iter()
        .filter(|(key, _)| key.starts_with(&echo))
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, note)| note.clone())
}
