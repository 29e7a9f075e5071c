//! Abstractions for generating summaries with a hosted language model.
//!
//! The refine chain only needs "prompt in, text out", so the provider sits behind the
//! [`SummarizationClient`] trait. The Google Generative Language client issues HTTP requests
//! directly to the REST API.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const TEMPERATURE: f32 = 0.7;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the model endpoint does not exist.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the refine chain.
    pub prompt: String,
}

/// Interface implemented by text generation providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a completion for the prompt using the requested model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the configured summarization client.
pub fn summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    let http = crate::loaders::http_client(config)
        .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
    Ok(Arc::new(GoogleGenerativeClient::new(
        http,
        config.google_api_base_url.clone(),
        config.google_api_key.clone(),
    )))
}

/// Client for the Google Generative Language `generateContent` endpoint.
pub struct GoogleGenerativeClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GoogleGenerativeClient {
    /// Create a client against `base_url` authenticated with `api_key`.
    pub fn new(http: Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl SummarizationClient for GoogleGenerativeClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
            }
        });

        let endpoint = self.endpoint(&request.model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "model endpoint {endpoint} returned 404"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode generateContent response: {error}"
            ))
        })?;

        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            SummarizationClientError::InvalidResponse("response contained no candidates".into())
        })?;
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SummarizationClientError::InvalidResponse(format!(
                "candidate had no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> GoogleGenerativeClient {
        GoogleGenerativeClient::new(
            Client::builder()
                .user_agent("smartgist-test")
                .build()
                .expect("client"),
            server.base_url(),
            "test-key".into(),
        )
    }

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            model: "gemma-3n-e2b-it".into(),
            prompt: "Summarize".into(),
        }
    }

    #[tokio::test]
    async fn google_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemma-3n-e2b-it:generateContent")
                    .query_param("key", "test-key")
                    .body_contains(r#""text":"Summarize""#);
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{ "text": "Summary " }, { "text": "text\n" }]
                        },
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let summary = client(&server)
            .generate_summary(request())
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn google_client_handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemma-3n-e2b-it:generateContent");
                then.status(500).body("boom");
            })
            .await;

        let error = client(&server)
            .generate_summary(request())
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn unknown_model_endpoint_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(404);
            })
            .await;

        let error = client(&server)
            .generate_summary(request())
            .await
            .expect_err("404");
        assert!(matches!(
            error,
            SummarizationClientError::ProviderUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn stalled_provider_hits_configured_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .delay(std::time::Duration::from_secs(3))
                    .json_body(json!({
                        "candidates": [{ "content": { "parts": [{ "text": "late" }] } }]
                    }));
            })
            .await;

        let mut config = Config::with_api_key("test-key");
        config.google_api_base_url = server.base_url();
        config.http_timeout = Some(std::time::Duration::from_secs(1));
        let client = summarization_client(&config).expect("client");

        let error = client
            .generate_summary(request())
            .await
            .expect_err("timed out");
        assert!(matches!(
            error,
            SummarizationClientError::ProviderUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn blocked_candidate_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "candidates": [{ "finishReason": "SAFETY" }]
                }));
            })
            .await;

        let error = client(&server)
            .generate_summary(request())
            .await
            .expect_err("no text");
        assert!(
            matches!(error, SummarizationClientError::InvalidResponse(ref message) if message.contains("SAFETY"))
        );
    }
}
