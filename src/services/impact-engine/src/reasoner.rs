//! Reasoning service invoker.
//!
//! The reasoning service is an uncontrolled text producer, so this module
//! splits the boundary in two: [`Reasoner`] sends a prompt and returns the
//! raw reply, and [`parse_impact_response`] extracts and validates the
//! structured verdict. Parsing fails closed: a reply with no schema-valid
//! JSON is a `MalformedResponse`, never a defaulted result.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use db_impact_shared::ImpactResult;

use crate::config::ReasonerConfig;
use crate::error::{AppError, Result};

/// Capability interface for the external reasoning service.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn infer(&self, prompt: &str) -> Result<String>;
}

/// HTTP client for an Anthropic-style messages endpoint.
pub struct ReasoningClient {
    http: Client,
    config: ReasonerConfig,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ReasoningClient {
    pub fn new(config: &ReasonerConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.read_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    async fn infer_once(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::PermissionDenied(
                    "No permission to access the reasoning service".to_string(),
                ));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(AppError::RateLimited(
                    "Reasoning service throttled the request".to_string(),
                ));
            }
            status if status.is_server_error() => {
                return Err(AppError::ServiceUnavailable(format!(
                    "Reasoning service returned {}",
                    status
                )));
            }
            status if !status.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::ExternalServiceError(format!(
                    "Reasoning service returned {}: {}",
                    status, body
                )));
            }
            _ => {}
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Invalid reasoner reply envelope: {}", e))
        })?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| {
                AppError::ExternalServiceError("Empty reasoner reply".to_string())
            })
    }
}

#[async_trait]
impl Reasoner for ReasoningClient {
    async fn infer(&self, prompt: &str) -> Result<String> {
        // Fail-fast is the baseline contract; max_retries defaults to 0 and
        // retry is an opt-in extension for transient failures only.
        let mut attempts = 0;
        loop {
            match self.infer_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempts < self.config.max_retries => {
                    attempts += 1;
                    let delay = Duration::from_millis(1000 * (2_u64.pow(attempts - 1)));
                    warn!(
                        "Reasoner request failed (attempt {}/{}), retrying in {:?}: {:?}",
                        attempts,
                        self.config.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extract and validate the structured verdict from the raw reply.
///
/// Tolerates surrounding prose and code-fence markers by taking the
/// substring from the first `{` to the last `}`.
pub fn parse_impact_response(raw: &str) -> Result<ImpactResult> {
    let trimmed = raw.trim();

    let first = trimmed.find('{');
    let last = trimmed.rfind('}');
    let candidate = match (first, last) {
        (Some(first), Some(last)) if first < last => &trimmed[first..=last],
        _ => {
            return Err(AppError::MalformedResponse(
                "No JSON object found in reasoner reply".to_string(),
            ));
        }
    };

    let result: ImpactResult = serde_json::from_str(candidate).map_err(|e| {
        AppError::MalformedResponse(format!("Reply failed schema validation: {}", e))
    })?;

    if !(0.0..=1.0).contains(&result.confidence) {
        return Err(AppError::MalformedResponse(format!(
            "Confidence {} outside [0, 1]",
            result.confidence
        )));
    }

    debug!(
        "Parsed reasoner verdict: severity={}, confidence={:.2}",
        result.business_severity, result.confidence
    );
    Ok(result)
}
