//! Implements the `Ledger` trait by posting JSON actions to a deployed Apps Script web app.
//!
//! Every call is a POST to the same URL with an `action` field naming the operation. The web app
//! answers with `{"success": bool, "message": ..., ...}` and, depending on the action, a
//! `runningTotal`, a `data` array of expense rows, or a `stats` object.

use crate::api::{Ledger, Stats};
use crate::error::{ErrorType, IntoResult};
use crate::model::{
    filter_period, validate_amount, validate_category, Amount, AnalysisLogEntry, ExpenseRecord,
    Period,
};
use crate::{Config, Error, Result};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};
use url::Url;

/// Longest slice of an error body that is copied into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Implements the `Ledger` trait against the Apps Script web app at `Config::webapp_url`.
pub struct WebAppLedger {
    client: reqwest::Client,
    url: Url,
}

impl WebAppLedger {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Unable to build the HTTP client for the web app")
            .pub_result(ErrorType::Config)?;
        Ok(Self {
            client,
            url: config.webapp_url().clone(),
        })
    }

    /// Posts `request` and returns the parsed reply if the web app reported success.
    async fn post(&self, request: &Request<'_>) -> Result<Reply> {
        trace!("web app request: {request:?}");
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .with_context(|| format!("Unable to reach the web app for {}", request.action()))
            .pub_result(ErrorType::Connectivity)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::connectivity(format!(
                "The web app answered {} with HTTP {status}: {}",
                request.action(),
                truncate(&body)
            )));
        }

        let reply: Reply = response
            .json()
            .await
            .with_context(|| format!("The web app sent an unreadable reply to {}", request.action()))
            .pub_result(ErrorType::Service)?;
        trace!("web app reply: {reply:?}");

        if !reply.success {
            return Err(Error::new(
                ErrorType::Service,
                anyhow::anyhow!(
                    "The web app reported an error for {}: {}",
                    request.action(),
                    reply.error_message()
                ),
            ));
        }
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl Ledger for WebAppLedger {
    async fn log_expense(&mut self, amount: Amount, category: &str) -> Result<Amount> {
        validate_amount(amount)?;
        let category = validate_category(category)?;
        let reply = self
            .post(&Request::LogExpense {
                amount,
                category: &category,
            })
            .await?;
        let running_total = reply.running_total.ok_or_else(|| {
            Error::new(
                ErrorType::Service,
                anyhow::anyhow!("The web app did not return a running total"),
            )
        })?;
        debug!("Logged {amount} for {category}, running total {running_total}");
        Ok(running_total)
    }

    async fn fetch_expenses(
        &mut self,
        period: Period,
        today: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        let reply = self.post(&Request::GetExpenseData { period }).await?;
        let rows = reply.data.unwrap_or_default();
        let total_rows = rows.len();
        let records: Vec<ExpenseRecord> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(ix, row)| match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable expense row {ix}: {e}");
                    None
                }
            })
            .collect();

        // The web app filters by period too, but the window is defined relative to `today` here.
        let records = filter_period(records, period, today);
        debug!(
            "Fetched {} {period} expenses ({total_rows} rows returned)",
            records.len()
        );
        Ok(records)
    }

    async fn log_analysis(&mut self, entry: &AnalysisLogEntry) -> Result<()> {
        let reply = self
            .post(&Request::LogAiAnalysis {
                analysis_data: entry,
            })
            .await?;
        debug!(
            "Analysis logged: {}",
            reply.message.as_deref().unwrap_or("no message")
        );
        Ok(())
    }

    async fn monthly_stats(&mut self, month: &str) -> Result<Stats> {
        let reply = self.post(&Request::GetMonthlyStats { month }).await?;
        Ok(Stats {
            message: reply
                .message
                .unwrap_or_else(|| "Statistics retrieved successfully".to_string()),
            values: reply.stats.unwrap_or_default(),
        })
    }

    async fn ping(&mut self) -> Result<()> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .context("Unable to reach the web app")
            .pub_result(ErrorType::Connectivity)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::connectivity(format!(
                "The web app health check answered with HTTP {status}"
            )));
        }
        Ok(())
    }
}

/// The actions understood by the web app.
#[derive(Debug, Serialize)]
#[serde(tag = "action")]
enum Request<'a> {
    #[serde(rename = "logExpense")]
    LogExpense { amount: Amount, category: &'a str },
    #[serde(rename = "logAIAnalysis")]
    LogAiAnalysis {
        #[serde(rename = "analysisData")]
        analysis_data: &'a AnalysisLogEntry,
    },
    #[serde(rename = "getExpenseDataForAnalysis")]
    GetExpenseData { period: Period },
    #[serde(rename = "getMonthlyStats")]
    GetMonthlyStats { month: &'a str },
}

impl Request<'_> {
    fn action(&self) -> &'static str {
        match self {
            Request::LogExpense { .. } => "logExpense",
            Request::LogAiAnalysis { .. } => "logAIAnalysis",
            Request::GetExpenseData { .. } => "getExpenseDataForAnalysis",
            Request::GetMonthlyStats { .. } => "getMonthlyStats",
        }
    }
}

/// The envelope of every web app reply. Only `success` is always present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    running_total: Option<Amount>,
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    stats: Option<BTreeMap<String, serde_json::Value>>,
}

impl Reply {
    fn error_message(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("Unknown error")
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(MAX_ERROR_BODY) {
        Some((ix, _)) => format!("{}...", &s[..ix]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use mockito::Matcher;
    use serde_json::json;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn ledger(url: &str) -> WebAppLedger {
        let config =
            Config::from_parts(PathBuf::from("."), ConfigFile::new(url, "http://127.0.0.1:1"))
                .unwrap();
        WebAppLedger::new(&config).unwrap()
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn test_log_expense() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "action": "logExpense",
                "amount": 6.6,
                "category": "coffee"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "message": "ok", "runningTotal": 106.6}"#)
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let total = ledger.log_expense(amt("6.60"), " coffee ").await.unwrap();
        assert_eq!(total, amt("106.60"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_log_expense_validation_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let mut ledger = ledger(&server.url());
        let err = ledger.log_expense(Amount::ZERO, "coffee").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        let err = ledger.log_expense(amt("-1"), "coffee").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        let err = ledger.log_expense(amt("1"), "  ").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_connectivity() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let err = ledger.log_expense(amt("1"), "food").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_unreachable_is_connectivity() {
        let mut ledger = ledger("http://127.0.0.1:1");
        let err = ledger.log_expense(amt("1"), "food").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
        let err = ledger.ping().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
    }

    #[tokio::test]
    async fn test_success_false_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "Missing amount or category"}"#)
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let err = ledger.log_expense(amt("1"), "food").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Service);
        assert!(err.to_string().contains("Missing amount or category"));
    }

    #[tokio::test]
    async fn test_fetch_expenses_filters_and_skips_bad_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "action": "getExpenseDataForAnalysis",
                "period": "monthly"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "data": [
                        {"date": "2026-10-01", "amount": 6.6, "category": "coffee"},
                        {"date": "2026-09-30", "amount": 3, "category": "coffee"},
                        {"date": "not a date", "amount": 3, "category": "coffee"},
                        {"date": "2026-10-18T12:00:00.000Z", "amount": "9.70", "category": "coffee"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let records = ledger
            .fetch_expenses(Period::Monthly, today())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount(), amt("6.60"));
        assert_eq!(records[1].amount(), amt("9.70"));
    }

    #[tokio::test]
    async fn test_fetch_expenses_without_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"success": true, "message": "No expenses found"}"#)
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let records = ledger.fetch_expenses(Period::Annual, today()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_log_analysis_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "action": "logAIAnalysis",
                "analysisData": {
                    "period": "annual",
                    "total_transactions": 2,
                    "categories_count": 1
                }
            })))
            .with_status(200)
            .with_body(r#"{"success": true, "message": "AI analysis logged"}"#)
            .create_async()
            .await;

        let entry = AnalysisLogEntry {
            date: "2026-10-19".to_string(),
            time: "09:30:00".to_string(),
            period: Period::Annual,
            total_expenses: amt("16.30"),
            total_transactions: 2,
            categories_count: 1,
            insights_count: 0,
            recommendations_count: 0,
            analysis_date: "2026-10-19 09:30:00".to_string(),
        };
        let mut ledger = ledger(&server.url());
        ledger.log_analysis(&entry).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_monthly_stats() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "action": "getMonthlyStats",
                "month": "current"
            })))
            .with_status(200)
            .with_body(
                r#"{"success": true, "message": "October stats", "stats": {"total": 120.5, "count": 7}}"#,
            )
            .create_async()
            .await;

        let mut ledger = ledger(&server.url());
        let stats = ledger.monthly_stats("current").await.unwrap();
        assert_eq!(stats.message, "October stats");
        assert_eq!(stats.values["count"], 7);
    }

    #[tokio::test]
    async fn test_ping() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("Expense bot web app is running")
            .create_async()
            .await;
        let mut ledger = ledger(&server.url());
        ledger.ping().await.unwrap();
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "a".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(&long).len(), MAX_ERROR_BODY + 3);
    }
}
