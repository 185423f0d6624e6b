use crate::model::{Amount, Period};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the Expenses sheet.
///
/// Records are created by the web app when an expense is logged and never change afterwards. The
/// web app serializes spreadsheet dates either as plain `yyyy-MM-dd` strings or as full ISO
/// timestamps, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    #[serde(deserialize_with = "de_date")]
    pub(crate) date: NaiveDate,
    #[serde(default, deserialize_with = "de_time")]
    pub(crate) time: Option<NaiveTime>,
    pub(crate) amount: Amount,
    #[serde(default)]
    pub(crate) category: String,
    /// Some versions of the web app split the free text into a category and a description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "running_total")]
    pub(crate) running_total: Amount,
}

impl ExpenseRecord {
    pub fn new(
        date: NaiveDate,
        time: Option<NaiveTime>,
        amount: Amount,
        category: impl Into<String>,
        running_total: Amount,
    ) -> Self {
        Self {
            date,
            time,
            amount,
            category: category.into(),
            description: None,
            running_total,
        }
    }

    /// Sets the free-text description. Blank descriptions are ignored.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn running_total(&self) -> Amount {
        self.running_total
    }

    /// The free text the user typed for this expense, normalized for grouping: the description when
    /// the sheet has one, otherwise the category, trimmed and lowercased.
    pub fn label(&self) -> String {
        let raw = self
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.category);
        raw.trim().to_lowercase()
    }
}

/// Keeps only the records that fall inside `period` relative to `today`, preserving order.
pub fn filter_period(
    records: impl IntoIterator<Item = ExpenseRecord>,
    period: Period,
    today: NaiveDate,
) -> Vec<ExpenseRecord> {
    records
        .into_iter()
        .filter(|r| period.contains(r.date, today))
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.time()))
}

fn de_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).ok_or_else(|| serde::de::Error::custom(format!("unrecognized date '{s}'")))
}

fn de_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.as_deref().and_then(parse_time))
}
