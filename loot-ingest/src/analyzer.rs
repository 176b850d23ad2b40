//! Extraction service client.
//!
//! Azure Document Intelligence runs analysis as a long-running operation:
//! POST the PDF to the model's `:analyze` endpoint, then poll the URL from the
//! `Operation-Location` header until the status is terminal.

use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::ExtractError;
use crate::retry::RetryPolicy;
use crate::wire::{AnalyzeOperation, AnalyzedDocument};

pub const DEFAULT_API_VERSION: &str = "2024-11-30";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Anything that can turn PDF bytes into an analyzed document.
pub trait DocumentAnalyzer {
    fn analyze(
        &self,
        model_id: &str,
        content: &[u8],
    ) -> impl Future<Output = Result<AnalyzedDocument, ExtractError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub key: String,
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl ServiceConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }

    pub fn analyze_url(&self, model_id: &str) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.endpoint.trim_end_matches('/'),
            model_id,
            self.api_version
        )
    }
}

/// Poll until the operation is terminal. Each fetch is retried on its own, so a
/// transient failure mid-poll never sends the document again.
async fn poll_operation<F, Fut>(
    interval: Duration,
    max_polls: u32,
    retry: &RetryPolicy,
    mut fetch: F,
) -> Result<AnalyzedDocument, ExtractError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AnalyzeOperation, ExtractError>>,
{
    for poll in 1..=max_polls {
        tokio::time::sleep(interval).await;
        let op = retry.run("poll", &mut fetch).await?;
        debug!(poll, status = %op.status, "analyze operation");
        if let Some(done) = op.finished() {
            return done;
        }
    }
    Err(ExtractError::PollTimeout(max_polls))
}

pub struct AzureAnalyzer {
    client: reqwest::Client,
    config: ServiceConfig,
    retry: RetryPolicy,
}

impl AzureAnalyzer {
    pub fn new(config: ServiceConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            retry: RetryPolicy::default(),
        })
    }

    /// Retry policy applied to the submit request and to each poll request.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, ExtractError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ExtractError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Submit the document; returns the operation URL to poll.
    async fn submit(&self, model_id: &str, content: &[u8]) -> Result<String, ExtractError> {
        let resp = self
            .client
            .post(self.config.analyze_url(model_id))
            .header(KEY_HEADER, &self.config.key)
            .header(CONTENT_TYPE, "application/pdf")
            .body(content.to_vec())
            .send()
            .await?;
        let resp = Self::error_for_status(resp).await?;

        resp.headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(ExtractError::MissingOperationLocation)
    }

    async fn fetch_operation(&self, operation_url: &str) -> Result<AnalyzeOperation, ExtractError> {
        let resp = self
            .client
            .get(operation_url)
            .header(KEY_HEADER, &self.config.key)
            .send()
            .await?;
        let resp = Self::error_for_status(resp).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl DocumentAnalyzer for AzureAnalyzer {
    async fn analyze(&self, model_id: &str, content: &[u8]) -> Result<AnalyzedDocument, ExtractError> {
        let operation_url = self
            .retry
            .run("submit", || self.submit(model_id, content))
            .await?;
        poll_operation(self.config.poll_interval, self.config.max_polls, &self.retry, || {
            self.fetch_operation(&operation_url)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn operation(v: serde_json::Value) -> AnalyzeOperation {
        serde_json::from_value(v).unwrap()
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_poll_recovers_from_transient_fetch_error() {
        let counter = AtomicU32::new(0);
        let fetches = &counter;
        let doc = poll_operation(Duration::from_millis(1), 5, &fast_retry(3), || async move {
            match fetches.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(operation(json!({"status": "running"}))),
                1 => Err(ExtractError::Status { status: 503, body: String::new() }),
                _ => Ok(operation(json!({
                    "status": "succeeded",
                    "analyzeResult": {"documents": [{"docType": "bankStatement"}]}
                }))),
            }
        })
        .await
        .unwrap();
        assert_eq!(doc.doc_type, "bankStatement");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_polls() {
        let counter = AtomicU32::new(0);
        let fetches = &counter;
        let out = poll_operation(Duration::from_millis(1), 2, &RetryPolicy::none(), || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(operation(json!({"status": "running"})))
        })
        .await;
        assert!(matches!(out, Err(ExtractError::PollTimeout(2))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_analyze_url() {
        let mut cfg = ServiceConfig::new("https://loot.cognitiveservices.azure.com/", "k");
        assert_eq!(
            cfg.analyze_url("chase-v3"),
            "https://loot.cognitiveservices.azure.com/documentintelligence/documentModels/chase-v3:analyze?api-version=2024-11-30"
        );
        cfg.api_version = "2023-07-31".to_string();
        assert!(cfg.analyze_url("m").ends_with("api-version=2023-07-31"));
    }

    #[test]
    fn test_client_builds() {
        assert!(AzureAnalyzer::new(ServiceConfig::new("https://example.invalid", "k")).is_ok());
    }
}
