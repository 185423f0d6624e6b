//! Implements the `Ledger` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a deployed web app.
//!
//! State lives in a process-wide map keyed by an id (the configured web app URL), so that separate
//! `TestLedger` instances created from the same `Config` see the same rows, the way two requests to
//! the same web app would.

use crate::api::{Ledger, Stats};
use crate::error::{ErrorType, Res};
use crate::model::{
    filter_period, validate_amount, validate_category, Amount, AnalysisLogEntry, ExpenseRecord,
    Period,
};
use crate::{Error, Result};
use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

/// Everything a `TestLedger` holds: the Expenses sheet and the analysis log sheet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestLedgerState {
    pub records: Vec<ExpenseRecord>,
    pub analysis_log: Vec<AnalysisLogEntry>,
    /// When set, every call fails with a `Connectivity` error.
    pub unreachable: bool,
    /// When set, only `log_analysis` fails, with a `Service` error.
    pub fail_analysis_log: bool,
}

/// An implementation of the `Ledger` trait that keeps rows in memory. By default, it is seeded
/// with a few weeks of expenses dated inside the current month.
pub struct TestLedger {
    id: String,
}

impl TestLedger {
    /// Creates a `TestLedger` for `id`, seeding its state the first time `id` is seen.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        states()
            .entry(id.clone())
            .or_insert_with(|| seed_state(super::ledger_now().date()));
        Self { id }
    }

    /// Returns a copy of the current state.
    pub fn get_state(&self) -> TestLedgerState {
        states().get(&self.id).cloned().unwrap_or_default()
    }

    /// Replaces the current state.
    pub fn set_state(&self, state: TestLedgerState) {
        states().insert(self.id.clone(), state);
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TestLedgerState) -> Result<T>) -> Result<T> {
        let mut map = states();
        let state = map.entry(self.id.clone()).or_default();
        if state.unreachable {
            return Err(Error::connectivity(format!(
                "Unable to reach the test ledger '{}'",
                self.id
            )));
        }
        f(state)
    }
}

#[async_trait::async_trait]
impl Ledger for TestLedger {
    async fn log_expense(&mut self, amount: Amount, category: &str) -> Result<Amount> {
        validate_amount(amount)?;
        let category = validate_category(category)?;
        let now = super::ledger_now();
        self.with_state(|state| {
            let previous = state
                .records
                .last()
                .map(|r| r.running_total())
                .unwrap_or_default();
            let running_total = previous + amount;
            state.records.push(ExpenseRecord::new(
                now.date(),
                Some(now.time()),
                amount,
                category,
                running_total,
            ));
            Ok(running_total)
        })
    }

    async fn fetch_expenses(
        &mut self,
        period: Period,
        today: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        self.with_state(|state| Ok(filter_period(state.records.clone(), period, today)))
    }

    async fn log_analysis(&mut self, entry: &AnalysisLogEntry) -> Result<()> {
        self.with_state(|state| {
            if state.fail_analysis_log {
                return Err(Error::new(
                    ErrorType::Service,
                    anyhow::anyhow!("The analysis log sheet is not available"),
                ));
            }
            state.analysis_log.push(entry.clone());
            Ok(())
        })
    }

    async fn monthly_stats(&mut self, month: &str) -> Result<Stats> {
        let period = match month {
            "current" => Period::Monthly,
            "annual" => Period::Annual,
            other => {
                return Err(Error::new(
                    ErrorType::Service,
                    anyhow::anyhow!("Unknown month '{other}'"),
                ))
            }
        };
        let today = super::ledger_now().date();
        self.with_state(|state| {
            let records = filter_period(state.records.clone(), period, today);
            let total: Amount = records.iter().map(|r| r.amount()).sum();
            let mut stats = Stats {
                message: format!("{} statistics from the test ledger", period.title()),
                ..Default::default()
            };
            stats
                .values
                .insert("total".to_string(), serde_json::json!(total.to_f64()));
            stats
                .values
                .insert("count".to_string(), serde_json::json!(records.len()));
            Ok(stats)
        })
    }

    async fn ping(&mut self) -> Result<()> {
        self.with_state(|_| Ok(()))
    }
}

fn states() -> MutexGuard<'static, HashMap<String, TestLedgerState>> {
    static STATES: OnceLock<Mutex<HashMap<String, TestLedgerState>>> = OnceLock::new();
    STATES
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn seed_state(today: NaiveDate) -> TestLedgerState {
    let records = match load_seed(SEED_DATA, today) {
        Ok(records) => records,
        Err(e) => {
            debug!("Unable to load the seed data, starting empty: {e:#}");
            Vec::new()
        }
    };
    TestLedgerState {
        records,
        ..Default::default()
    }
}

/// Parses the seed CSV. Dates are given as days before `today` and clamped to the first of the
/// month so that every seeded row belongs to the current month.
fn load_seed(csv_data: &str, today: NaiveDate) -> Res<Vec<ExpenseRecord>> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut records = Vec::new();
    let mut running_total = Amount::ZERO;
    for result in rdr.records() {
        let row = result?;
        let field = |ix: usize| row.get(ix).unwrap_or_default().trim();
        let days_ago: u64 = field(0).parse().context("Bad days_ago in seed data")?;
        let date = today
            .checked_sub_days(Days::new(days_ago))
            .unwrap_or(today)
            .max(first_of_month);
        let time = NaiveTime::parse_from_str(field(1), "%H:%M:%S").ok();
        let amount = Amount::from_str(field(2)).context("Bad amount in seed data")?;
        running_total += amount;
        records.push(
            ExpenseRecord::new(date, time, amount, field(3), running_total)
                .with_description(field(4)),
        );
    }
    Ok(records)
}

/// Seed expense data.
const SEED_DATA: &str = r##"days_ago,time,amount,category,description
14,08:05:12,5.25,coffee,matcha latte
13,12:40:30,14.85,food,chipotle
12,08:10:45,5.25,coffee,matcha latte
11,18:22:05,52.30,gas,shell
10,16:18:33,63.21,groceries,trader joe's
9,08:02:51,4.75,coffee,
8,20:15:00,15.99,entertainment,netflix
7,08:12:19,5.25,coffee,matcha latte
6,13:05:42,9.75,food,in-n-out
5,17:45:09,89.99,utilities,internet
4,08:07:33,5.25,coffee,matcha latte
3,19:25:33,42.30,food,olive garden
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ledger() -> TestLedger {
        TestLedger::new(Uuid::new_v4().to_string())
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_seed_data_is_in_current_month() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
        let records = load_seed(SEED_DATA, today).unwrap();
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| Period::Monthly.contains(r.date(), today)));
        let matcha = records.iter().filter(|r| r.label() == "matcha latte").count();
        assert_eq!(matcha, 4);
        assert_eq!(records[5].label(), "coffee");
        let total: Amount = records.iter().map(|r| r.amount()).sum();
        assert_eq!(records.last().unwrap().running_total(), total);
    }

    #[tokio::test]
    async fn test_running_total_is_monotonic() {
        let mut ledger = ledger();
        let mut previous = ledger.get_state().records.last().unwrap().running_total();
        for s in ["6.60", "9.70", "0.01", "125"] {
            let total = ledger.log_expense(amt(s), "coffee").await.unwrap();
            assert!(total >= previous);
            assert_eq!(total, previous + amt(s));
            previous = total;
        }
    }

    #[tokio::test]
    async fn test_state_is_shared_by_id() {
        let id = Uuid::new_v4().to_string();
        let mut a = TestLedger::new(id.clone());
        a.set_state(TestLedgerState::default());
        a.log_expense(amt("6.60"), "coffee").await.unwrap();
        let b = TestLedger::new(id);
        assert_eq!(b.get_state().records.len(), 1);
    }

    #[tokio::test]
    async fn test_validation() {
        let mut ledger = ledger();
        let before = ledger.get_state();
        let err = ledger.log_expense(Amount::ZERO, "coffee").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert_eq!(ledger.get_state(), before);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let mut ledger = ledger();
        ledger.set_state(TestLedgerState {
            unreachable: true,
            ..Default::default()
        });
        let err = ledger.ping().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
        let err = ledger
            .fetch_expenses(Period::Annual, crate::api::ledger_now().date())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
    }

    #[tokio::test]
    async fn test_fetch_filters_by_period() {
        let mut ledger = ledger();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let rec = |d: NaiveDate| ExpenseRecord::new(d, None, amt("1"), "food", amt("1"));
        ledger.set_state(TestLedgerState {
            records: vec![
                rec(NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()),
                rec(NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()),
                rec(today),
            ],
            ..Default::default()
        });
        assert_eq!(
            ledger.fetch_expenses(Period::Monthly, today).await.unwrap().len(),
            1
        );
        assert_eq!(
            ledger.fetch_expenses(Period::Annual, today).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_monthly_stats() {
        let mut ledger = ledger();
        ledger.set_state(TestLedgerState::default());
        ledger.log_expense(amt("6.60"), "coffee").await.unwrap();
        let stats = ledger.monthly_stats("current").await.unwrap();
        assert_eq!(stats.values["count"], 1);
        assert!(ledger.monthly_stats("march").await.is_err());
    }
}
