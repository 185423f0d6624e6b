//! Read-only views of the ledger that need no model: the running total, web app statistics, recent
//! expenses and the simple per-category reports.

use crate::api::{Ledger, Stats};
use crate::commands::render::{render_recent, render_stats, render_summary};
use crate::commands::Out;
use crate::model::{Amount, CategorySummaries, ExpenseRecord, Period};
use crate::Result;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

/// The number of expenses `recent` shows when no limit is given.
pub const DEFAULT_RECENT: usize = 5;

/// The most expenses `recent` will show.
pub const MAX_RECENT: usize = 20;

/// Totals for a period computed directly from the sheet's categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    /// e.g. `October 2026`
    pub description: String,
    pub total: Amount,
    pub transactions: usize,
    pub categories: CategorySummaries,
}

impl PeriodSummary {
    pub fn from_records(period: Period, today: NaiveDate, records: &[ExpenseRecord]) -> Self {
        let mut categories = CategorySummaries::new();
        for record in records {
            let category = record.category().trim().to_lowercase();
            categories
                .entry(category)
                .or_default()
                .add(record.amount());
        }
        Self {
            period,
            description: period.describe(today),
            total: records.iter().map(ExpenseRecord::amount).sum(),
            transactions: records.len(),
            categories,
        }
    }
}

/// Shows the running total as of the most recent expense this year.
pub async fn total(ledger: &mut (dyn Ledger + Send), today: NaiveDate) -> Result<Out<Amount>> {
    let records = ledger.fetch_expenses(Period::Annual, today).await?;
    Ok(match records.last() {
        Some(last) => Out::new(
            format!("Running total: {}", last.running_total()),
            last.running_total(),
        ),
        None => Out::new(
            format!("No expenses have been logged in {} yet.", today.year()),
            Amount::ZERO,
        ),
    })
}

/// Shows the web app's statistics for `current` (this month) or `annual`. Any other month is
/// answered with a pointer to the sheet, which has the full history.
pub async fn stats(
    ledger: &mut (dyn Ledger + Send),
    month: Option<&str>,
    sheet_url: Option<&str>,
) -> Result<Out<Stats>> {
    let month = month.map(|m| m.trim().to_lowercase()).unwrap_or_default();
    match month.as_str() {
        "current" | "annual" => {
            let stats = ledger.monthly_stats(&month).await?;
            Ok(Out::new(render_stats(&stats), stats))
        }
        other => {
            debug!("No web app statistics for '{other}'");
            let mut message = String::from(
                "Use /stats current for this month or /stats annual for this year.",
            );
            if let Some(url) = sheet_url {
                message.push_str(&format!("\nFull statistics are in your sheet: {url}"));
            }
            Ok(Out::new_message(message))
        }
    }
}

/// Shows the last `limit` expenses of the current year, oldest first. `limit` is clamped to
/// `1..=MAX_RECENT` and defaults to `DEFAULT_RECENT`.
pub async fn recent(
    ledger: &mut (dyn Ledger + Send),
    limit: Option<i64>,
    today: NaiveDate,
    sheet_url: Option<&str>,
) -> Result<Out<Vec<ExpenseRecord>>> {
    let limit = clamp_limit(limit);
    let mut records = ledger.fetch_expenses(Period::Annual, today).await?;
    let skip = records.len().saturating_sub(limit);
    let records = records.split_off(skip);
    Ok(Out::new(render_recent(&records, sheet_url), records))
}

/// Shows the simple, non-AI report for `period`.
pub async fn report(
    ledger: &mut (dyn Ledger + Send),
    period: Period,
    today: NaiveDate,
) -> Result<Out<PeriodSummary>> {
    let records = ledger.fetch_expenses(period, today).await?;
    let summary = PeriodSummary::from_records(period, today, &records);
    Ok(Out::new(render_summary(&summary), summary))
}

fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_RECENT,
        Some(n) => n.clamp(1, MAX_RECENT as i64) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestLedger, TestLedgerState};
    use std::str::FromStr;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn seeded(n: usize) -> TestLedger {
        ledger_on(n, today())
    }

    /// A ledger holding one expense on 2025-12-31 and `n` on `day`, $1 each.
    fn ledger_on(n: usize, day: NaiveDate) -> TestLedger {
        let ledger = TestLedger::new(Uuid::new_v4().to_string());
        let mut records = vec![ExpenseRecord::new(
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            None,
            amt("1"),
            "Food",
            amt("1"),
        )];
        for i in 0..n {
            records.push(ExpenseRecord::new(
                day,
                None,
                amt("1"),
                if i % 2 == 0 { "Food" } else { "coffee" },
                amt(&(i + 2).to_string()),
            ));
        }
        ledger.set_state(TestLedgerState {
            records,
            ..Default::default()
        });
        ledger
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-3)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
        assert_eq!(clamp_limit(Some(500)), 20);
    }

    #[tokio::test]
    async fn test_total() {
        let mut ledger = seeded(3);
        let out = total(&mut ledger, today()).await.unwrap();
        assert_eq!(out.structure(), Some(&amt("4")));
        assert_eq!(out.message(), "Running total: $4.00");

        let mut ledger = seeded(0);
        let out = total(&mut ledger, today()).await.unwrap();
        assert!(out.message().contains("No expenses"));
    }

    #[tokio::test]
    async fn test_recent() {
        let mut ledger = seeded(30);
        let out = recent(&mut ledger, Some(100), today(), None).await.unwrap();
        let records = out.structure().unwrap();
        assert_eq!(records.len(), MAX_RECENT);
        assert_eq!(records.last().unwrap().running_total(), amt("31"));

        let out = recent(&mut ledger, None, today(), Some("https://sheet"))
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().len(), DEFAULT_RECENT);
        assert!(out.message().contains("https://sheet"));
    }

    #[tokio::test]
    async fn test_report() {
        let mut ledger = seeded(3);
        let out = report(&mut ledger, Period::Monthly, today()).await.unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.total, amt("3"));
        assert_eq!(summary.categories["food"].transaction_count, 2);
        assert_eq!(summary.categories["coffee"].transaction_count, 1);

        let out = report(&mut ledger, Period::Annual, today()).await.unwrap();
        assert_eq!(out.structure().unwrap().transactions, 3);
    }

    #[tokio::test]
    async fn test_stats() {
        // The test ledger computes `current` from the real clock.
        let mut ledger = ledger_on(2, crate::api::ledger_now().date());
        let out = stats(&mut ledger, Some("Current"), None).await.unwrap();
        assert_eq!(out.structure().unwrap().values["count"], 2);

        let out = stats(&mut ledger, Some("2026-03"), Some("https://sheet"))
            .await
            .unwrap();
        assert!(out.structure().is_none());
        assert!(out.message().contains("https://sheet"));
    }
}
