//! HTTP client for the remote translation/suggestion backend.
//!
//! Speaks two endpoints:
//!
//! - `POST {base}/api/translate` with `{ "message": ... }`, answering
//!   `{ "source_language": ..., "translation": ... }`
//! - `POST {base}/api/suggest` with `{ "original", "suggestion", "context" }`,
//!   answering an opaque JSON acknowledgment
//!
//! Error bodies are logged, never parsed.

use crate::config::AppConfig;
use crate::infrastructure::traits::TranslationBackend;
use crate::{Error, Result};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub source_language: String,
    pub translation: String,
}

/// An approved term forwarded as translation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyTerm {
    pub original: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<VocabularyTerm>>,
}

impl TranslationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            vocabulary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionPayload {
    pub original: String,
    pub suggestion: String,
    pub context: String,
}

pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

#[injectable(TranslationBackend)]
impl HttpBackendClient {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> HttpBackendClient {
        Self::new(&config)
    }
}

impl HttpBackendClient {
    pub fn new(config: &AppConfig) -> HttpBackendClient {
        let client = reqwest::Client::builder()
            .timeout(config.translate_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build configured HTTP client, using defaults: {e}");
                reqwest::Client::new()
            });

        HttpBackendClient {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_owned(),
            max_retries: config.translate_max_retries,
            base_delay: config.retry_base_delay,
        }
    }

    /// POSTs `body` to `path`, retrying transport errors, 429 and 5xx with
    /// exponential backoff. Other non-2xx statuses fail immediately.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * (1 << (attempt - 1).min(5));
                debug!("retrying {url} in {delay:?} (attempt {attempt})");
                tokio::time::sleep(delay).await;
            }

            match self.client.post(&url).json(body).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<R>().await.map_err(|e| {
                            error!("malformed response from {url}: {e}");
                            Error::from(e)
                        });
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    error!("backend error {status} from {url}: {body_text}");
                    last_err = Some(Error::NetworkUnavailable(format!(
                        "backend returned {status}"
                    )));

                    if status.as_u16() != 429 && !status.is_server_error() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("request to {url} failed: {e}");
                    last_err = Some(Error::from(e));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::NetworkUnavailable("backend request failed".to_owned())))
    }
}

#[async_trait]
impl TranslationBackend for HttpBackendClient {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        self.post_json("/api/translate", request).await
    }

    async fn submit_suggestion(&self, payload: &SuggestionPayload) -> Result<serde_json::Value> {
        self.post_json("/api/suggest", payload).await
    }
}
