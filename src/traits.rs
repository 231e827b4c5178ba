//! Collaborator interfaces consumed by the orchestration core.
//!
//! Session verification and artifact storage are external systems; the
//! core only depends on these traits. `HttpBinaryFetcher` is the default
//! outbound fetch used to materialize URL-shaped artifacts.

use async_trait::async_trait;

use crate::error::GenError;
use crate::types::{ArtifactRecord, CallerId};

/// Verifies a session token and yields the caller identity.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify_session(&self, token: &str) -> Result<CallerId, GenError>;
}

/// Persists one finished artifact record and returns its storage id.
///
/// Invoked at most once per job, on the completed transition only.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist_artifact(&self, record: ArtifactRecord) -> Result<String, GenError>;
}

/// Generic outbound binary fetch.
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, GenError>;
}

/// Reqwest-backed [`BinaryFetcher`].
#[derive(Debug, Clone, Default)]
pub struct HttpBinaryFetcher {
    http: reqwest::Client,
}

impl HttpBinaryFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BinaryFetcher for HttpBinaryFetcher {
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, GenError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenError::ApiError {
                code,
                message: GenError::upstream_message(&body),
                details: None,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
