//! Strategy selection and wiring.
//!
//! The orchestrator owns the provider client and the collaborator
//! handles, and routes each request by model family: image families fan
//! out into candidate sets, video families produce exactly one relay
//! stream (synchronous passthrough or submit-then-poll).

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::Stream;
use uuid::Uuid;

use crate::client::ProviderClient;
use crate::config::ProviderConfig;
use crate::error::GenError;
use crate::extract;
use crate::fanout::CandidateFanOut;
use crate::job::{AsyncJob, JobDriver};
use crate::models::{ModelFamily, classify};
use crate::relay::{self, FrameSink};
use crate::traits::{ArtifactStore, BinaryFetcher, HttpBinaryFetcher};
use crate::types::{ArtifactLocation, ArtifactRecord, CandidateSet, GenerationRequest};

/// Outbound half-duplex stream handed to the serving layer.
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, GenError>> + Send>>;

pub struct Orchestrator {
    client: Arc<ProviderClient>,
    store: Arc<dyn ArtifactStore>,
    fanout: CandidateFanOut,
}

impl Orchestrator {
    pub fn new(config: ProviderConfig, store: Arc<dyn ArtifactStore>) -> Result<Self, GenError> {
        Self::with_fetcher(config, store, Arc::new(HttpBinaryFetcher::new()))
    }

    pub fn with_fetcher(
        config: ProviderConfig,
        store: Arc<dyn ArtifactStore>,
        fetcher: Arc<dyn BinaryFetcher>,
    ) -> Result<Self, GenError> {
        let client = Arc::new(ProviderClient::new(config)?);
        let fanout = CandidateFanOut::new(client.clone(), fetcher);
        Ok(Self {
            client,
            store,
            fanout,
        })
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// Produce a candidate set for an image-family request.
    pub async fn generate_candidates(
        &self,
        request: &GenerationRequest,
    ) -> Result<CandidateSet, GenError> {
        request.validate()?;
        let family = classify(&request.model_id);
        if family.is_video() {
            return Err(GenError::InvalidInput(format!(
                "model '{}' produces video; request a generation stream instead",
                request.model_id
            )));
        }
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, model = %request.model_id, ?family, "dispatching fan-out");
        self.fanout.generate_candidates(request).await
    }

    /// Produce the relay stream for a video-family request.
    pub async fn stream_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RelayStream, GenError> {
        request.validate()?;
        let family = classify(&request.model_id);
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, model = %request.model_id, ?family, "dispatching stream");
        match family {
            ModelFamily::SyncVideo => self.stream_sync(request).await,
            ModelFamily::AsyncVideo => self.stream_async(request).await,
            ModelFamily::ChatImage | ModelFamily::StructuredImage => {
                Err(GenError::InvalidInput(format!(
                    "model '{}' produces image candidates, not a stream",
                    request.model_id
                )))
            }
        }
    }

    /// Passthrough: the caller sees the provider's bytes unmodified while
    /// an identical copy is buffered; extraction and persistence run once
    /// the provider closes the stream.
    async fn stream_sync(&self, request: &GenerationRequest) -> Result<RelayStream, GenError> {
        let upstream = self.client.open_synchronous_stream(request).await?;
        let store = self.store.clone();
        let request = request.clone();
        Ok(Box::pin(relay::tee_stream(
            upstream,
            move |buffered| async move {
                let content = extract::collect_stream_content(&buffered).await;
                match extract::extract_artifact_url(&content) {
                    Some(url) => {
                        let record = ArtifactRecord::new(
                            request.caller_id.clone(),
                            &request.prompt,
                            &request.model_id,
                            ArtifactLocation::Url(url.clone()),
                        );
                        match store.persist_artifact(record).await {
                            Ok(record_id) => {
                                tracing::debug!(%url, %record_id, "stream artifact persisted");
                            }
                            Err(error) => {
                                tracing::error!(%error, "failed to persist artifact record");
                            }
                        }
                    }
                    None => tracing::warn!("no artifact URL found in stream content"),
                }
            },
        )))
    }

    /// Submit-then-poll: the polling task feeds the relay queue and
    /// outlives the outbound connection; dropping the stream never
    /// cancels the job mid-tick.
    async fn stream_async(&self, request: &GenerationRequest) -> Result<RelayStream, GenError> {
        let job_id = self.client.submit_async_job(request).await?;
        tracing::debug!(%job_id, "async job submitted");

        let (sink, rx) = FrameSink::channel();
        let driver = JobDriver::new(self.client.clone(), self.store.clone());
        let job = AsyncJob::new(job_id);
        let request = request.clone();
        tokio::spawn(async move {
            driver.run(job, request, sink).await;
        });
        Ok(Box::pin(relay::frame_stream(rx)))
    }
}
