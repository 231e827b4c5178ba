//! Candidate fan-out engine.
//!
//! Issues one provider call per requested candidate, concurrently, and
//! keeps whichever succeed. Stragglers are never cancelled; failed calls
//! are dropped from the result rather than aborting the run.

use std::sync::Arc;

use futures::future;

use crate::client::ProviderClient;
use crate::error::GenError;
use crate::extract;
use crate::models::{ModelFamily, classify};
use crate::traits::BinaryFetcher;
use crate::types::{Artifact, CandidateSet, GenerationRequest};

pub struct CandidateFanOut {
    client: Arc<ProviderClient>,
    fetcher: Arc<dyn BinaryFetcher>,
}

impl CandidateFanOut {
    pub fn new(client: Arc<ProviderClient>, fetcher: Arc<dyn BinaryFetcher>) -> Self {
        Self { client, fetcher }
    }

    /// Generate up to `candidate_count` image candidates for the request.
    ///
    /// Partial success is success; zero surviving buffers is failure.
    /// Buffers come back in completion order, which is not guaranteed to
    /// match submission order.
    pub async fn generate_candidates(
        &self,
        request: &GenerationRequest,
    ) -> Result<CandidateSet, GenError> {
        request.validate()?;
        let family = classify(&request.model_id);
        if family.is_video() {
            return Err(GenError::InvalidInput(format!(
                "model '{}' produces video, not image candidates",
                request.model_id
            )));
        }

        tracing::debug!(
            model = %request.model_id,
            count = request.candidate_count,
            "launching parallel candidate calls"
        );

        let attempts = (0..request.candidate_count)
            .map(|slot| self.one_candidate(request, family, slot));
        let results = future::join_all(attempts).await;

        let candidates: Vec<Vec<u8>> = results
            .into_iter()
            .filter_map(|result| match result {
                Ok(buffer) => Some(buffer),
                Err(error) => {
                    tracing::warn!(model = %request.model_id, %error, "candidate dropped");
                    None
                }
            })
            .collect();

        if candidates.is_empty() {
            return Err(GenError::ExtractionError(
                "No images generated successfully".to_string(),
            ));
        }
        Ok(CandidateSet { candidates })
    }

    async fn one_candidate(
        &self,
        request: &GenerationRequest,
        family: ModelFamily,
        slot: u32,
    ) -> Result<Vec<u8>, GenError> {
        let artifact = match family {
            ModelFamily::ChatImage => {
                let payload = self.client.submit_synchronous(request).await?;
                let content = extract::chat_message_content(&payload)?;
                extract::extract_chat_artifact(content)?
            }
            ModelFamily::StructuredImage => {
                let payload = self.client.submit_image_generation(request).await?;
                extract::extract_structured_artifacts(&payload)
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        GenError::ExtractionError("No image found in response".to_string())
                    })?
            }
            ModelFamily::SyncVideo | ModelFamily::AsyncVideo => unreachable!(),
        };

        tracing::debug!(slot, "candidate call resolved");
        match artifact {
            Artifact::Bytes(bytes) => Ok(bytes),
            Artifact::Url(url) => self.fetcher.fetch_binary(&url).await,
        }
    }
}
