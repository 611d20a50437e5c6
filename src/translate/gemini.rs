//! Gemini `generateContent` client used for chunk translation.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{GenerationError, TextGenerator};
use crate::config::GeminiConfig;
use crate::retry::RetryPolicy;
use crate::{DubError, Result};

/// Gemini API request
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Gemini API response
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    model: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a client from configuration. The API key must be set.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(DubError::Config(
                "Gemini API key is not set (config gemini.api_key or GEMINI_API_KEY)".to_string(),
            )
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: Self::endpoint(config)?,
            model: config.model.clone(),
            retry: RetryPolicy::new(format!("gemini {}", config.model))
                .with_max_attempts(config.max_attempts),
        })
    }

    /// `{base_url}/models/{model}:generateContent?key={api_key}`
    fn endpoint(config: &GeminiConfig) -> Result<Url> {
        let raw = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| DubError::Config(format!("Invalid Gemini base URL {}: {}", config.base_url, e)))?;
        url.query_pairs_mut().append_pair("key", &config.api_key);
        Ok(url)
    }

    /// One HTTP round trip
    async fn call(&self, request: &GeminiRequest) -> std::result::Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        // The request was delivered, so a broken body is final
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let description = format!("failed to read response body: {}", e.without_url());
                return Err(if status == StatusCode::OK {
                    GenerationError::Parse(description)
                } else {
                    GenerationError::Api {
                        status: status.as_u16(),
                        body: description,
                    }
                });
            }
        };

        if status != StatusCode::OK {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Describe a reqwest failure without the URL, which carries the API key
fn transport_error(e: reqwest::Error) -> GenerationError {
    let timed_out = e.is_timeout();
    let e = e.without_url();
    if timed_out {
        GenerationError::Transport(format!("request timed out: {}", e))
    } else {
        GenerationError::Transport(e.to_string())
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
fn parse_response(body: &str) -> std::result::Result<String, GenerationError> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Parse(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Parse("response contains no candidates".to_string()))?
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
        .ok_or_else(|| GenerationError::Parse("candidate contains no parts".to_string()))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        self.retry
            .run(GenerationError::is_retryable, || self.call(&request))
            .await
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
