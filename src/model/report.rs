//! The output types of the analysis pipeline and the record appended to the analysis log sheet.

use crate::model::{Amount, Period};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for a single category.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategorySummary {
    pub total_amount: Amount,
    pub transaction_count: usize,
}

impl CategorySummary {
    pub fn add(&mut self, amount: Amount) {
        self.total_amount += amount;
        self.transaction_count += 1;
    }
}

/// Category name to totals. A `BTreeMap` so that reports list categories in a stable order.
pub type CategorySummaries = BTreeMap<String, CategorySummary>;

/// A label that recurs within a category often enough to be worth pointing out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PatternFinding {
    /// The category the label was found in.
    pub category: String,
    /// The repeated label, e.g. `matcha`.
    pub label: String,
    pub occurrence_count: usize,
    /// Human-readable description, e.g. `matcha appears 20 times in coffee`.
    pub description: String,
    /// A short habit note written by the model, when one could be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PatternFinding {
    pub fn new(category: impl Into<String>, label: impl Into<String>, count: usize) -> Self {
        let category = category.into();
        let label = label.into();
        let description = if label == category {
            format!("{label} appears {count} times")
        } else {
            format!("{label} appears {count} times in {category}")
        };
        Self {
            category,
            label,
            occurrence_count: count,
            description,
            note: None,
        }
    }
}

/// An observation from the final stage, optionally paired with a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Insight {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// The pipeline stage that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Categorize,
    Patterns,
    Insights,
}

serde_plain::derive_display_from_serialize!(Stage);

/// Recorded when a stage could not use the model's output and fell back to a default section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StageWarning {
    pub stage: Stage,
    pub message: String,
}

/// The full result of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisReport {
    pub period: Period,
    pub total_expenses: Amount,
    pub total_transactions: usize,
    pub categories: CategorySummaries,
    pub patterns: Vec<PatternFinding>,
    pub insights: Vec<Insight>,
    pub analyzed_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StageWarning>,
}

impl AnalysisReport {
    /// The explicit "no data" report returned for an empty period.
    pub fn empty(period: Period, analyzed_at: NaiveDateTime) -> Self {
        Self {
            period,
            total_expenses: Amount::ZERO,
            total_transactions: 0,
            categories: CategorySummaries::new(),
            patterns: Vec::new(),
            insights: Vec::new(),
            analyzed_at,
            warnings: Vec::new(),
        }
    }

    /// True when there were no records to analyze.
    pub fn is_empty(&self) -> bool {
        self.total_transactions == 0
    }

    /// True when at least one stage degraded.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn recommendations_count(&self) -> usize {
        self.insights
            .iter()
            .filter(|i| i.recommendation.is_some())
            .count()
    }

    /// Builds the row that is appended to the analysis log sheet.
    pub fn log_entry(&self, now: NaiveDateTime) -> AnalysisLogEntry {
        AnalysisLogEntry {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            period: self.period,
            total_expenses: self.total_expenses,
            total_transactions: self.total_transactions,
            categories_count: self.categories.len(),
            insights_count: self.insights.len(),
            recommendations_count: self.recommendations_count(),
            analysis_date: self.analyzed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// One append-only row of the analysis log sheet. Field names match what the web app expects in
/// `analysisData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisLogEntry {
    pub date: String,
    pub time: String,
    pub period: Period,
    pub total_expenses: Amount,
    pub total_transactions: usize,
    pub categories_count: usize,
    pub insights_count: usize,
    pub recommendations_count: usize,
    pub analysis_date: String,
}
