//! Collaborator services: risk scoring and output safety.
//!
//! The gateway talks to both through traits so the HTTP transport can be
//! swapped for in-process fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use nopass_firewall::RiskAssessment;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::CollaboratorConfig;
use crate::types::{Metadata, ReviewRequest, RiskRequest, SafetyReview};

/// Path of the risk-scoring endpoint.
pub const RISK_SCORE_PATH: &str = "/v1/risk-score";
/// Path of the output-safety endpoint.
pub const OUTPUT_SAFETY_PATH: &str = "/v1/output-safety";

/// Errors from a collaborator call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Connection, timeout or other transport failure.
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx status.
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    /// Response body did not match the expected shape.
    #[error("failed to decode {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Scores a prompt for risk.
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn score(&self, prompt: &str, metadata: &Metadata) -> Result<RiskAssessment, ClientError>;
}

/// Reviews a draft answer before it is returned.
#[async_trait]
pub trait OutputReviewer: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<SafetyReview, ClientError>;
}

/// JSON-over-HTTP client shared by both collaborators.
#[derive(Debug, Clone)]
struct JsonClient {
    service: &'static str,
    url: String,
    http: reqwest::Client,
}

impl JsonClient {
    fn new(
        service: &'static str,
        base_url: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            service,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            http,
        })
    }

    async fn post<B, R>(&self, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(service = self.service, url = %self.url, "Calling collaborator");
        let response = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                service: self.service,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                service: self.service,
                status: status.as_u16(),
            });
        }

        response.json::<R>().await.map_err(|source| ClientError::Decode {
            service: self.service,
            source,
        })
    }
}

/// HTTP client for the risk service.
#[derive(Debug, Clone)]
pub struct HttpRiskClient {
    inner: JsonClient,
}

impl HttpRiskClient {
    pub fn new(config: &CollaboratorConfig) -> Result<Self, ClientError> {
        Ok(Self {
            inner: JsonClient::new("risk", &config.base_url, RISK_SCORE_PATH, config.timeout())?,
        })
    }

    /// Full endpoint URL.
    pub fn url(&self) -> &str {
        &self.inner.url
    }
}

#[async_trait]
impl RiskScorer for HttpRiskClient {
    async fn score(&self, prompt: &str, metadata: &Metadata) -> Result<RiskAssessment, ClientError> {
        let body = RiskRequest {
            prompt: prompt.to_string(),
            metadata: metadata.clone(),
        };
        self.inner.post(&body).await
    }
}

/// HTTP client for the output-safety service.
#[derive(Debug, Clone)]
pub struct HttpOutputSafetyClient {
    inner: JsonClient,
}

impl HttpOutputSafetyClient {
    pub fn new(config: &CollaboratorConfig) -> Result<Self, ClientError> {
        Ok(Self {
            inner: JsonClient::new(
                "output_safety",
                &config.base_url,
                OUTPUT_SAFETY_PATH,
                config.timeout(),
            )?,
        })
    }

    /// Full endpoint URL.
    pub fn url(&self) -> &str {
        &self.inner.url
    }
}

#[async_trait]
impl OutputReviewer for HttpOutputSafetyClient {
    async fn review(&self, request: &ReviewRequest) -> Result<SafetyReview, ClientError> {
        self.inner.post(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let risk = HttpRiskClient::new(&CollaboratorConfig {
            base_url: "http://risk:8001/".to_string(),
            timeout_ms: 2_000,
        })
        .unwrap();
        assert_eq!(risk.url(), "http://risk:8001/v1/risk-score");

        let review = HttpOutputSafetyClient::new(&CollaboratorConfig {
            base_url: "http://review:8002".to_string(),
            timeout_ms: 3_000,
        })
        .unwrap();
        assert_eq!(review.url(), "http://review:8002/v1/output-safety");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // port 9 (discard) is closed on test hosts
        let risk = HttpRiskClient::new(&CollaboratorConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        let err = risk.score("hello", &Metadata::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { service: "risk", .. }));
    }
}
