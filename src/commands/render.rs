//! Plain-text formatting of command results for the terminal and chat replies.

use crate::api::Stats;
use crate::commands::PeriodSummary;
use crate::model::{Amount, AnalysisReport, CategorySummaries, ExpenseRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt::Write;

/// Renders an AI analysis report.
pub fn render_analysis(report: &AnalysisReport, today: NaiveDate) -> String {
    let when = report.period.describe(today);
    if report.is_empty() {
        return format!("No expenses found for {when}, so there is nothing to analyze.");
    }

    let mut s = format!("{} AI analysis for {when}\n", report.period.title());
    let _ = writeln!(
        s,
        "Total: {} across {} expenses\n",
        report.total_expenses,
        report.total_transactions
    );

    s.push_str("Categories:\n");
    write_categories(&mut s, &report.categories, report.total_expenses);

    s.push_str("\nRecurring purchases:\n");
    if report.patterns.is_empty() {
        s.push_str("- none found\n");
    }
    for finding in &report.patterns {
        let _ = write!(s, "- {}", finding.description);
        match &finding.note {
            Some(note) => {
                let _ = writeln!(s, ". {note}");
            }
            None => s.push('\n'),
        }
    }

    s.push_str("\nInsights:\n");
    if report.insights.is_empty() {
        s.push_str("- no data found\n");
    }
    for (ix, insight) in report.insights.iter().enumerate() {
        let _ = writeln!(s, "{}. {}", ix + 1, insight.text);
        if let Some(recommendation) = &insight.recommendation {
            let _ = writeln!(s, "   Recommendation: {recommendation}");
        }
    }

    if report.is_partial() {
        let stages: Vec<String> = report.warnings.iter().map(|w| w.stage.to_string()).collect();
        let _ = writeln!(
            s,
            "\nSome sections are incomplete because the model's reply could not be used ({}).",
            stages.join(", ")
        );
    }
    let _ = write!(
        s,
        "\nAnalyzed at {}",
        report.analyzed_at.format("%Y-%m-%d %H:%M")
    );
    s
}

/// Renders the simple per-category report.
pub fn render_summary(summary: &PeriodSummary) -> String {
    if summary.transactions == 0 {
        return format!("No expenses found for {}.", summary.description);
    }
    let mut s = format!(
        "{} report for {}\n",
        summary.period.title(),
        summary.description
    );
    let _ = writeln!(
        s,
        "Total: {} across {} expenses\n",
        summary.total, summary.transactions
    );
    s.push_str("By category:\n");
    write_categories(&mut s, &summary.categories, summary.total);
    s.truncate(s.trim_end().len());
    s
}

/// Renders the most recent expenses, oldest first.
pub fn render_recent(records: &[ExpenseRecord], sheet_url: Option<&str>) -> String {
    let mut s = match records.len() {
        0 => "No expenses have been logged this year.\n".to_string(),
        1 => "Your last expense:\n".to_string(),
        n => format!("Your last {n} expenses:\n"),
    };
    for r in records {
        let _ = write!(s, "- {}", r.date().format("%Y-%m-%d"));
        if let Some(time) = r.time() {
            let _ = write!(s, " {}", time.format("%H:%M"));
        }
        let _ = write!(s, "  {}  {}", r.amount(), r.category());
        if let Some(description) = r.description() {
            let _ = write!(s, " ({description})");
        }
        let _ = writeln!(s, "  [total {}]", r.running_total());
    }
    if let Some(url) = sheet_url {
        let _ = writeln!(s, "\nYour sheet: {url}");
    }
    s.truncate(s.trim_end().len());
    s
}

/// Renders web app statistics. String values are shown without quotes.
pub fn render_stats(stats: &Stats) -> String {
    let mut s = stats.message.clone();
    for (key, value) in &stats.values {
        let value = match value {
            serde_json::Value::String(v) => v.clone(),
            other => other.to_string(),
        };
        let _ = write!(s, "\n- {key}: {value}");
    }
    s
}

/// Writes one line per category, largest first, with its share of `total`.
fn write_categories(s: &mut String, categories: &CategorySummaries, total: Amount) {
    let mut ranked: Vec<_> = categories.iter().collect();
    ranked.sort_by(|a, b| b.1.total_amount.cmp(&a.1.total_amount));
    for (name, summary) in ranked {
        let _ = write!(
            s,
            "- {name}: {} ({} {})",
            summary.total_amount,
            summary.transaction_count,
            if summary.transaction_count == 1 {
                "expense"
            } else {
                "expenses"
            }
        );
        if total.is_positive() {
            let share = (summary.total_amount.value() * Decimal::ONE_HUNDRED / total.value())
                .round_dp(1);
            let _ = write!(s, ", {share:.1}%");
        }
        s.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategorySummary, Insight, PatternFinding, Period, Stage, StageWarning};
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn report() -> AnalysisReport {
        let mut report = AnalysisReport::empty(
            Period::Monthly,
            today().and_hms_opt(9, 30, 0).unwrap(),
        );
        report.total_expenses = amt("20");
        report.total_transactions = 5;
        report.categories.insert(
            "coffee".to_string(),
            CategorySummary {
                total_amount: amt("15"),
                transaction_count: 4,
            },
        );
        report.categories.insert(
            "food".to_string(),
            CategorySummary {
                total_amount: amt("5"),
                transaction_count: 1,
            },
        );
        let mut finding = PatternFinding::new("coffee", "matcha", 4);
        finding.note = Some("Consider making it at home.".to_string());
        report.patterns.push(finding);
        report.insights.push(Insight {
            text: "Coffee dominates".to_string(),
            recommendation: Some("Set a coffee budget".to_string()),
        });
        report
    }

    #[test]
    fn test_render_analysis() {
        let text = render_analysis(&report(), today());
        assert!(text.starts_with("Monthly AI analysis for October 2026\n"));
        assert!(text.contains("Total: $20.00 across 5 expenses"));
        assert!(text.contains("- coffee: $15.00 (4 expenses, 75.0%)"));
        assert!(text.contains("- food: $5.00 (1 expense, 25.0%)"));
        assert!(text.contains("- matcha appears 4 times in coffee. Consider making it at home."));
        assert!(text.contains("1. Coffee dominates\n   Recommendation: Set a coffee budget"));
        assert!(!text.contains("incomplete"));
        assert!(text.find("coffee:").unwrap() < text.find("food:").unwrap());
    }

    #[test]
    fn test_render_partial_analysis() {
        let mut report = report();
        report.insights.clear();
        report.warnings.push(StageWarning {
            stage: Stage::Insights,
            message: "unreadable".to_string(),
        });
        let text = render_analysis(&report, today());
        assert!(text.contains("Insights:\n- no data found"));
        assert!(text.contains("incomplete because the model's reply could not be used (insights)"));
    }

    #[test]
    fn test_render_empty_analysis() {
        let empty = AnalysisReport::empty(Period::Annual, today().and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            render_analysis(&empty, today()),
            "No expenses found for 2026, so there is nothing to analyze."
        );
    }

    #[test]
    fn test_render_recent() {
        let records = [ExpenseRecord::new(today(), None, amt("6.6"), "coffee", amt("106.6"))
            .with_description("matcha")];
        let text = render_recent(&records, Some("https://sheet"));
        assert!(text.starts_with("Your last expense:\n"));
        assert!(text.contains("- 2026-10-19  $6.60  coffee (matcha)  [total $106.60]"));
        assert!(text.ends_with("Your sheet: https://sheet"));
    }

    #[test]
    fn test_render_stats() {
        let mut stats = Stats {
            message: "October".to_string(),
            ..Default::default()
        };
        stats.values.insert("count".to_string(), serde_json::json!(7));
        stats.values.insert("top".to_string(), serde_json::json!("coffee"));
        assert_eq!(render_stats(&stats), "October\n- count: 7\n- top: coffee");
    }
}
