//! Implements the `Inference` trait without a model server.
//!
//! Like the test ledger, this is compiled into the binary so that `analyze` can be run end-to-end
//! in test mode. The canned replies follow the JSON shape each prompt asks for, so the analysis
//! pipeline sees the same kind of text it would get from a cooperative model.

use crate::api::Inference;
use crate::error::ErrorType;
use crate::model::{CATEGORY_VOCABULARY, OTHER};
use crate::{Error, Result};
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};

/// How a `TestInference` answers.
enum Behavior {
    /// Answer every prompt with a plausible reply built from the prompt itself.
    Canned,
    /// Pop the next reply from the queue. An empty queue is a `Service` error.
    Scripted(VecDeque<Result<String>>),
    /// Fail every call with a clone of this error type.
    Failing(ErrorType),
}

/// An implementation of the `Inference` trait that never leaves the process.
pub struct TestInference {
    model: String,
    behavior: Behavior,
    prompts: Vec<String>,
}

impl TestInference {
    /// Replies to each prompt with well-formed JSON in the shape the prompt requests.
    pub fn canned(model: impl Into<String>) -> Self {
        Self::with_behavior(model, Behavior::Canned)
    }

    /// Replies with `replies` in order, one per call.
    pub fn scripted(replies: Vec<Result<String>>) -> Self {
        Self::with_behavior("scripted", Behavior::Scripted(replies.into()))
    }

    /// Fails every call with an error of `error_type`, e.g. `Connectivity` to simulate a server
    /// that is down.
    pub fn failing(error_type: ErrorType) -> Self {
        Self::with_behavior("failing", Behavior::Failing(error_type))
    }

    fn with_behavior(model: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            model: model.into(),
            behavior,
            prompts: Vec::new(),
        }
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn calls(&self) -> usize {
        self.prompts.len()
    }
}

#[async_trait::async_trait]
impl Inference for TestInference {
    async fn generate(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        match &mut self.behavior {
            Behavior::Canned => Ok(canned_reply(prompt)),
            Behavior::Scripted(replies) => replies.pop_front().unwrap_or_else(|| {
                Err(Error::new(
                    ErrorType::Service,
                    anyhow::anyhow!("The scripted model has no replies left"),
                ))
            }),
            Behavior::Failing(error_type) => Err(failure(*error_type)),
        }
    }

    async fn check_model(&mut self) -> Result<()> {
        match &self.behavior {
            Behavior::Failing(error_type) => Err(failure(*error_type)),
            _ => Ok(()),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn failure(error_type: ErrorType) -> Error {
    Error::new(
        error_type,
        anyhow::anyhow!("The test model failed with {error_type}"),
    )
}

/// Chooses a reply by the JSON key the prompt asks for.
fn canned_reply(prompt: &str) -> String {
    if prompt.contains("\"assignments\"") {
        let assignments: BTreeMap<String, &str> = bullets(prompt)
            .into_iter()
            .map(|label| {
                let category = CATEGORY_VOCABULARY
                    .iter()
                    .find(|word| label.contains(*word))
                    .copied()
                    .unwrap_or(OTHER);
                (label, category)
            })
            .collect();
        json!({ "assignments": assignments }).to_string()
    } else if prompt.contains("\"notes\"") {
        let notes: BTreeMap<String, String> = bullets(prompt)
            .into_iter()
            .filter_map(|line| {
                let (label, _) = line.split_once(" (")?;
                Some((
                    label.to_string(),
                    format!("{label} is a regular purchase, consider setting a weekly limit."),
                ))
            })
            .collect();
        json!({ "notes": notes }).to_string()
    } else {
        json!({
            "insights": [
                "Most of your spending is concentrated in a few categories.",
                "Small repeated purchases add up over the period."
            ],
            "recommendations": [
                "Set a monthly budget for your largest category.",
                "Track repeated small purchases for a week before cutting back."
            ]
        })
        .to_string()
    }
}

/// The text of each `- item` line in the first bulleted block of `prompt`.
fn bullets(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .skip_while(|line| !line.starts_with("- "))
        .take_while(|line| line.starts_with("- "))
        .map(|line| line.trim_start_matches("- ").trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let mut model = TestInference::scripted(vec![
            Ok("one".to_string()),
            Err(Error::connectivity("down")),
        ]);
        assert_eq!(model.generate("a").await.unwrap(), "one");
        let err = model.generate("b").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Connectivity);
        let err = model.generate("c").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Service);
        assert_eq!(model.calls(), 3);
        assert_eq!(model.prompts()[1], "b");
    }

    #[tokio::test]
    async fn test_failing() {
        let mut model = TestInference::failing(ErrorType::ModelUnavailable);
        assert!(model.check_model().await.unwrap_err().is_backend_down());
        assert!(model.generate("x").await.unwrap_err().is_backend_down());
    }

    #[test]
    fn test_canned_assignments() {
        let prompt = "Labels:\n- matcha latte\n- coffee\n- shell gas\n\nReply with {\"assignments\": {}}";
        let reply: serde_json::Value = serde_json::from_str(&canned_reply(prompt)).unwrap();
        assert_eq!(reply["assignments"]["coffee"], "coffee");
        assert_eq!(reply["assignments"]["shell gas"], "gas");
        assert_eq!(reply["assignments"]["matcha latte"], "other");
    }

    #[test]
    fn test_canned_notes() {
        let prompt = "Habits:\n- matcha latte (coffee): 4 times\n\nReply with {\"notes\": {}}";
        let reply: serde_json::Value = serde_json::from_str(&canned_reply(prompt)).unwrap();
        assert!(reply["notes"]["matcha latte"].is_string());
    }
}
