//! Stage 1: map each record's free-text label onto the category vocabulary and total the buckets.

use super::{degrade, extract, prompts, record_warning};
use crate::api::Inference;
use crate::model::{
    CategorySummaries, ExpenseRecord, Stage, StageWarning, CATEGORY_VOCABULARY, OTHER,
};
use crate::Result;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The outcome of categorization: one category per record, in record order, and the totals.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Categorized {
    pub(super) categories: Vec<String>,
    pub(super) summaries: CategorySummaries,
}

pub(super) async fn categorize(
    inference: &mut (dyn Inference + Send),
    records: &[ExpenseRecord],
    warnings: &mut Vec<StageWarning>,
) -> Result<Categorized> {
    let labels = distinct_labels(records);
    let prompt = prompts::categorize(&labels);

    let assignments = match inference.generate(&prompt).await {
        Ok(reply) => match extract::assignments(&reply) {
            Some(assignments) => assignments,
            None => {
                record_warning(
                    warnings,
                    Stage::Categorize,
                    "The model's categories could not be read, using the original labels",
                );
                HashMap::new()
            }
        },
        Err(e) => {
            degrade(Stage::Categorize, e, warnings)?;
            HashMap::new()
        }
    };

    Ok(bucket(records, &assignments))
}

/// Assigns every record to exactly one category and computes the per-category totals.
pub(super) fn bucket(
    records: &[ExpenseRecord],
    assignments: &HashMap<String, String>,
) -> Categorized {
    let mut categories = Vec::with_capacity(records.len());
    let mut summaries = CategorySummaries::new();
    for record in records {
        let label = record.label();
        let category = resolve(&label, assignments.get(&label).map(String::as_str));
        summaries.entry(category.clone()).or_default().add(record.amount());
        categories.push(category);
    }
    Categorized {
        categories,
        summaries,
    }
}

/// The model's answer when it is a vocabulary word, otherwise the label itself when that is a
/// vocabulary word, otherwise `other`.
fn resolve(label: &str, assigned: Option<&str>) -> String {
    if let Some(category) = assigned.and_then(vocabulary_word) {
        return category.to_string();
    }
    if let Some(assigned) = assigned {
        debug!("Ignoring category '{assigned}' for '{label}', it is not in the vocabulary");
    }
    vocabulary_word(label).unwrap_or(OTHER).to_string()
}

fn vocabulary_word(s: &str) -> Option<&'static str> {
    let s = s.trim().to_lowercase();
    CATEGORY_VOCABULARY.iter().find(|w| **w == s).copied()
}

/// Unique labels in the order they first appear.
fn distinct_labels(records: &[ExpenseRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(ExpenseRecord::label)
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestInference;
    use crate::error::ErrorType;
    use crate::model::Amount;
    use crate::Error;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn rec(amount: &str, category: &str) -> ExpenseRecord {
        ExpenseRecord::new(
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            None,
            Amount::from_str(amount).unwrap(),
            category,
            Amount::ZERO,
        )
    }

    #[test]
    fn test_distinct_labels_keep_first_order() {
        let records = [rec("1", "Coffee"), rec("1", "gas"), rec("1", " coffee ")];
        assert_eq!(distinct_labels(&records), vec!["coffee", "gas"]);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("matcha latte", Some("Coffee")), "coffee");
        assert_eq!(resolve("matcha latte", Some("beverages")), OTHER);
        assert_eq!(resolve("gas", Some("fuel")), "gas");
        assert_eq!(resolve("gas", None), "gas");
        assert_eq!(resolve("netflix", None), OTHER);
    }

    #[test]
    fn test_bucket_sums_exactly() {
        let records = [rec("6.60", "coffee"), rec("9.70", "coffee")];
        let out = bucket(&records, &HashMap::new());
        assert_eq!(out.categories, vec!["coffee", "coffee"]);
        let coffee = &out.summaries["coffee"];
        assert_eq!(coffee.total_amount, Amount::from_str("16.30").unwrap());
        assert_eq!(coffee.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_categorize_uses_model_assignments() {
        let mut model = TestInference::scripted(vec![Ok(
            r#"Sure: {"assignments": {"matcha latte": "coffee", "shell": "gas"}}"#.to_string(),
        )]);
        let records = [
            rec("5.25", "matcha latte"),
            rec("40", "shell"),
            rec("9", "mystery"),
        ];
        let mut warnings = Vec::new();
        let out = categorize(&mut model, &records, &mut warnings).await.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(out.categories, vec!["coffee", "gas", "other"]);
        assert!(model.prompts()[0].contains("- matcha latte\n- shell\n- mystery\n"));
    }

    #[tokio::test]
    async fn test_categorize_malformed_output_degrades() {
        let mut model = TestInference::scripted(vec![Ok("I'm not sure.".to_string())]);
        let records = [rec("5.25", "coffee"), rec("9", "matcha latte")];
        let mut warnings = Vec::new();
        let out = categorize(&mut model, &records, &mut warnings).await.unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stage, Stage::Categorize);
        assert_eq!(out.categories, vec!["coffee", "other"]);
    }

    #[tokio::test]
    async fn test_categorize_service_error_degrades() {
        let mut model = TestInference::scripted(vec![Err(Error::new(
            ErrorType::Service,
            anyhow::anyhow!("bad gateway"),
        ))]);
        let mut warnings = Vec::new();
        let out = categorize(&mut model, &[rec("1", "food")], &mut warnings)
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(out.summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_categorize_backend_down_fails() {
        let mut model = TestInference::failing(ErrorType::Connectivity);
        let mut warnings = Vec::new();
        let err = categorize(&mut model, &[rec("1", "food")], &mut warnings)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
    }
}
