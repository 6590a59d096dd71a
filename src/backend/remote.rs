//! Remote generation backend: JSON over HTTP.
//!
//! `POST {endpoint}/generate` with the task content; the service answers with a
//! `{success, artifact_url, thumbnail_url, quality_score, error}` document.
//! A 2xx answer that does not parse is a backend failure, not a transport one,
//! so it never routes to the fallback backend.

use super::{BackendOutput, GenerationBackend};
use crate::error::{ApiError, GenerationError};
use crate::types::{GenerationTask, StyleParameters};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REMOTE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    task_id: &'a str,
    prompt: &'a str,
    negative_prompt: &'a str,
    style: &'a StyleParameters,
}

#[derive(Deserialize)]
struct GenerateResponse {
    success: bool,
    #[serde(default)]
    artifact_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    quality_score: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

// Map reqwest transport errors onto generation error kinds
fn map_http_error(error: reqwest::Error, timeout: Duration) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout(timeout)
    } else if error.is_connect() {
        GenerationError::Transport(format!("Connection error: {}", error))
    } else if let Some(status) = error.status() {
        map_status(status.as_u16(), error.to_string())
    } else {
        GenerationError::Transport(format!("HTTP error: {}", error))
    }
}

fn map_status(status: u16, body: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::AuthFailed(format!("status {}: {}", status, body)),
        400 | 422 => GenerationError::InvalidRequest(format!("status {}: {}", status, body)),
        429 => GenerationError::RateLimited(format!("status {}: {}", status, body)),
        _ => GenerationError::Transport(format!("Request failed with status {}: {}", status, body)),
    }
}

pub struct RemoteBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl RemoteBackend {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(REMOTE_HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for RemoteBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        let body = GenerateRequest {
            task_id: &task.id,
            prompt: &task.prompt,
            negative_prompt: &task.negative_prompt,
            style: &task.style,
        };

        let url = format!("{}/generate", self.endpoint);
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_http_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status, error_text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            GenerationError::Backend(format!("Failed to parse backend response: {}", e))
        })?;

        if !parsed.success {
            return Err(GenerationError::Backend(
                parsed
                    .error
                    .unwrap_or_else(|| "generation failed without a reason".to_string()),
            ));
        }

        Ok(BackendOutput {
            artifact_url: parsed.artifact_url.unwrap_or_default(),
            thumbnail_url: parsed.thumbnail_url,
            quality_score: parsed.quality_score,
        })
    }

    fn name(&self) -> &str {
        "remote"
    }
}
