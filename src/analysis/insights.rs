//! Stage 3: turn the aggregated numbers into ranked observations and recommendations.

use super::{degrade, extract, prompts, record_warning};
use crate::api::Inference;
use crate::model::{Amount, CategorySummaries, Insight, PatternFinding, Period, Stage, StageWarning};
use crate::Result;
use chrono::NaiveDate;

/// What the insight stage is asked to summarize.
pub(super) struct Totals<'a> {
    pub(super) period: Period,
    pub(super) today: NaiveDate,
    pub(super) total: Amount,
    pub(super) transactions: usize,
    pub(super) categories: &'a CategorySummaries,
    pub(super) findings: &'a [PatternFinding],
}

pub(super) async fn generate(
    inference: &mut (dyn Inference + Send),
    totals: Totals<'_>,
    warnings: &mut Vec<StageWarning>,
) -> Result<Vec<Insight>> {
    let prompt = prompts::insights(
        totals.period,
        totals.today,
        totals.total,
        totals.transactions,
        totals.categories,
        totals.findings,
    );
    let reply = match inference.generate(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            degrade(Stage::Insights, e, warnings)?;
            return Ok(Vec::new());
        }
    };
    match extract::insights(&reply) {
        Some(insights) => Ok(insights),
        None => {
            record_warning(
                warnings,
                Stage::Insights,
                "The model's insights could not be read",
            );
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestInference;
    use crate::error::ErrorType;

    fn totals(categories: &CategorySummaries) -> Totals<'_> {
        Totals {
            period: Period::Annual,
            today: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            total: Amount::ZERO,
            transactions: 0,
            categories,
            findings: &[],
        }
    }

    #[tokio::test]
    async fn test_generate_well_formed() {
        let categories = CategorySummaries::new();
        let mut model = TestInference::scripted(vec![Ok(r#"```json
{"insights": ["Coffee is your top category"], "recommendations": ["Brew at home"]}
```"#
            .to_string())]);
        let mut warnings = Vec::new();
        let insights = generate(&mut model, totals(&categories), &mut warnings)
            .await
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            insights,
            vec![Insight {
                text: "Coffee is your top category".to_string(),
                recommendation: Some("Brew at home".to_string()),
            }]
        );
        assert!(model.prompts()[0].contains("Review my annual spending for 2026"));
    }

    #[tokio::test]
    async fn test_generate_malformed() {
        let categories = CategorySummaries::new();
        let mut model = TestInference::scripted(vec![Ok("{\"insights\": \"oops\"}".to_string())]);
        let mut warnings = Vec::new();
        let insights = generate(&mut model, totals(&categories), &mut warnings)
            .await
            .unwrap();
        assert!(insights.is_empty());
        assert_eq!(warnings[0].stage, Stage::Insights);
    }

    #[tokio::test]
    async fn test_generate_model_missing_fails() {
        let categories = CategorySummaries::new();
        let mut model = TestInference::failing(ErrorType::ModelUnavailable);
        let mut warnings = Vec::new();
        let err = generate(&mut model, totals(&categories), &mut warnings)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ModelUnavailable);
    }
}
