//! The text sent to the model at each stage.

use crate::model::{
    Amount, CategorySummaries, PatternFinding, Period, CATEGORY_VOCABULARY, OTHER,
};
use chrono::NaiveDate;
use std::fmt::Write;

/// Asks for a label to category mapping over the fixed vocabulary.
pub(super) fn categorize(labels: &[String]) -> String {
    let mut prompt = String::from(
        "You are a personal finance assistant. Assign each expense label below to exactly one \
        category from this list:\n",
    );
    let _ = writeln!(prompt, "{}\n", CATEGORY_VOCABULARY.join(", "));
    prompt.push_str("Labels:\n");
    for label in labels {
        let _ = writeln!(prompt, "- {label}");
    }
    let _ = write!(
        prompt,
        "\nReply with JSON only, in this format:\n\
        {{\"assignments\": {{\"<label>\": \"<category>\"}}}}\n\
        Use every label exactly as written. Use \"{OTHER}\" when no category fits.\n"
    );
    prompt
}

/// Asks for one short note per recurring purchase.
pub(super) fn habits(findings: &[PatternFinding], period: Period, today: NaiveDate) -> String {
    let mut prompt = format!(
        "These purchases repeat often in my expenses for {}:\n",
        period.describe(today)
    );
    for f in findings {
        let _ = writeln!(
            prompt,
            "- {} ({}): {} times",
            f.label, f.category, f.occurrence_count
        );
    }
    prompt.push_str(
        "\nFor each purchase write one short sentence about the habit and whether it is worth \
        cutting back.\n\
        Reply with JSON only, in this format:\n\
        {\"notes\": {\"<purchase>\": \"<sentence>\"}}\n",
    );
    prompt
}

/// Asks for ranked observations and recommendations over the aggregated numbers.
pub(super) fn insights(
    period: Period,
    today: NaiveDate,
    total: Amount,
    transactions: usize,
    categories: &CategorySummaries,
    findings: &[PatternFinding],
) -> String {
    let mut prompt = format!(
        "Review my {} spending for {} and suggest improvements.\n\n",
        period.title().to_lowercase(),
        period.describe(today)
    );
    let _ = writeln!(prompt, "Summary:");
    let _ = writeln!(prompt, "- Total expenses: {total}");
    let _ = writeln!(prompt, "- Transactions: {transactions}");
    let _ = writeln!(prompt, "- Categories: {}\n", categories.len());

    let _ = writeln!(prompt, "Category breakdown:");
    let mut ranked: Vec<_> = categories.iter().collect();
    ranked.sort_by(|a, b| b.1.total_amount.cmp(&a.1.total_amount));
    for (name, summary) in ranked {
        let _ = writeln!(
            prompt,
            "- {name}: {} ({} transactions)",
            summary.total_amount, summary.transaction_count
        );
    }

    let _ = writeln!(prompt, "\nRecurring purchases:");
    if findings.is_empty() {
        let _ = writeln!(prompt, "- none");
    }
    for f in findings {
        let _ = writeln!(prompt, "- {}", f.description);
    }

    prompt.push_str(
        "\nReply with JSON only, in this format:\n\
        {\"insights\": [\"<observation>\"], \"recommendations\": [\"<recommendation>\"]}\n\
        Put the most important observation first. The recommendation at each position should \
        address the observation at the same position.\n",
    );
    prompt
}
