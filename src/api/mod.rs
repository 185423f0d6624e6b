//! The remote services the bot talks to.
//!
//! - `Ledger`: the spreadsheet, reached through a deployed Apps Script web app.
//! - `Inference`: a local model server (Ollama).
//!
//! Each has a live implementation and an in-memory one. Which is used is decided by `Mode`, so that
//! the whole program can be run top-to-bottom without network access.

mod inference_test_client;
mod ollama;
mod webapp;
mod webapp_test_client;

use crate::model::{Amount, AnalysisLogEntry, ExpenseRecord, Period};
use crate::{Config, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use inference_test_client::TestInference;
pub use ollama::OllamaClient;
pub use webapp::WebAppLedger;
pub use webapp_test_client::{TestLedger, TestLedgerState};

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
pub const TEST_MODE_ENV: &str = "EXPENSE_BOT_IN_TEST_MODE";

/// The current time on the web app's clock. The Apps Script stamps each row with a GMT date, so
/// period windows and analysis timestamps are taken in UTC to match it.
pub fn ledger_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Whether to use the real remote services or in-memory stand-ins.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Live,
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Live,
        }
    }
}

/// Statistics returned by the web app's `getMonthlyStats` action. The web app decides which keys
/// are present, so they are kept as loose JSON values.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub message: String,
    pub values: BTreeMap<String, serde_json::Value>,
}

/// The expense spreadsheet.
#[async_trait::async_trait]
pub trait Ledger {
    /// Appends one expense and returns the new running total.
    ///
    /// # Errors
    /// - `Validation` if `amount <= 0` or the category is empty. Nothing is sent in that case.
    /// - `Connectivity` if the endpoint cannot be reached or answers with a non-success status.
    async fn log_expense(&mut self, amount: Amount, category: &str) -> Result<Amount>;

    /// Returns the expenses of the current month or year, as seen from `today`, in sheet order.
    /// Returns an empty `Vec` when nothing matches.
    async fn fetch_expenses(
        &mut self,
        period: Period,
        today: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>>;

    /// Appends one row to the analysis log sheet. Callers treat this as best-effort.
    async fn log_analysis(&mut self, entry: &AnalysisLogEntry) -> Result<()>;

    /// Asks the web app for its statistics for `month` (`current` or `annual`).
    async fn monthly_stats(&mut self, month: &str) -> Result<Stats>;

    /// Checks that the endpoint is reachable.
    async fn ping(&mut self) -> Result<()>;
}

/// A text generation backend.
#[async_trait::async_trait]
pub trait Inference {
    /// Sends `prompt` to the model and returns the generated text.
    ///
    /// # Errors
    /// - `Connectivity` if the server cannot be reached.
    /// - `ModelUnavailable` if the server does not have the configured model.
    /// - `Service` for any other failure.
    async fn generate(&mut self, prompt: &str) -> Result<String>;

    /// Checks that the server is up and has the configured model.
    async fn check_model(&mut self) -> Result<()>;

    /// The model name, for reports and logs.
    fn model(&self) -> &str;
}

/// Creates the `Ledger` for `mode`.
pub fn ledger(config: &Config, mode: Mode) -> Result<Box<dyn Ledger + Send>> {
    Ok(match mode {
        Mode::Live => Box::new(WebAppLedger::new(config)?),
        Mode::Test => Box::new(TestLedger::new(config.webapp_url().as_str())),
    })
}

/// Creates the `Inference` backend for `mode`.
pub fn inference(config: &Config, mode: Mode) -> Result<Box<dyn Inference + Send>> {
    Ok(match mode {
        Mode::Live => Box::new(OllamaClient::new(config)?),
        Mode::Test => Box::new(TestInference::canned(config.model())),
    })
}
