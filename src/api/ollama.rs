//! Implements the `Inference` trait against a local Ollama server.

use crate::api::Inference;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Error, Result};
use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};
use url::Url;

/// Talks to Ollama's `/api/generate` and `/api/tags` endpoints.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: Url,
    model: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.inference_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("Unable to build the HTTP client for the inference server")
            .pub_result(ErrorType::Config)?;
        Ok(Self {
            client,
            base_url: config.ollama_url().clone(),
            model: config.model().to_string(),
            temperature: config.temperature(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Unable to build the {path} URL from {}", self.base_url))
            .pub_result(ErrorType::Config)
    }

    fn model_unavailable(&self, detail: &str) -> Error {
        Error::new(
            ErrorType::ModelUnavailable,
            anyhow::anyhow!(
                "The model '{}' is not available on the inference server ({detail}). Try \
                'ollama pull {}'",
                self.model,
                self.model
            ),
        )
    }
}

#[async_trait::async_trait]
impl Inference for OllamaClient {
    async fn generate(&mut self, prompt: &str) -> Result<String> {
        let url = self.endpoint("api/generate")?;
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.temperature.map(|temperature| Options { temperature }),
        };
        trace!("generate prompt:\n{prompt}");
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Unable to reach the inference server")
            .pub_result(ErrorType::Connectivity)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            if status == StatusCode::NOT_FOUND || detail.contains("not found") {
                return Err(self.model_unavailable(&detail));
            }
            return Err(Error::new(
                ErrorType::Service,
                anyhow::anyhow!("The inference server answered with HTTP {status}: {detail}"),
            ));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .context("The inference server sent an unreadable reply")
            .pub_result(ErrorType::Service)?;
        debug!(
            "Generated {} characters with {} in {:.1?}",
            reply.response.len(),
            self.model,
            start.elapsed()
        );
        trace!("generate response:\n{}", reply.response);
        Ok(reply.response)
    }

    async fn check_model(&mut self) -> Result<()> {
        let url = self.endpoint("api/tags")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Unable to reach the inference server")
            .pub_result(ErrorType::Connectivity)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::connectivity(format!(
                "The inference server answered the model listing with HTTP {status}"
            )));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .context("The inference server sent an unreadable model list")
            .pub_result(ErrorType::Service)?;

        let tagged = format!("{}:", self.model);
        let found = tags
            .models
            .iter()
            .any(|m| m.name == self.model || m.name.starts_with(&tagged));
        if !found {
            let names: Vec<&str> = tags.models.iter().map(|m| m.name.as_str()).collect();
            debug!("Models on the inference server: {names:?}");
            return Err(self.model_unavailable("not in the local model list"));
        }
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Options>,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Ollama reports errors as `{"error": "..."}`. Falls back to the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) => e.error,
        Err(_) => body.trim().to_string(),
    }
}
