//! Provider client: request construction, credential attachment, and
//! transport-level error classification.
//!
//! The client holds no mutable state and performs no retries; retry
//! policy belongs to the polling loop that drives it. Any non-success
//! status is surfaced as an API error with the raw body attached, and
//! network failures are surfaced the same way to callers.

use bytes::Bytes;
use futures_util::Stream;
use reqwest::multipart;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::ProviderConfig;
use crate::error::GenError;
use crate::models::{
    AsyncSubmission, async_video_profile, resolve_async_submission, structured_image_profile,
};
use crate::types::GenerationRequest;

/// HTTP client for one provider endpoint.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct ChatCompletionBody {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlRef },
}

#[derive(Serialize)]
struct ImageUrlRef {
    url: String,
}

#[derive(Serialize)]
struct ImageGenerationBody {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    response_format: String,
    watermark: bool,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, GenError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GenError::InternalError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key.expose_secret())
    }

    fn chat_body(&self, request: &GenerationRequest, stream: bool) -> ChatCompletionBody {
        let content = if request.reference_images.is_empty() {
            ChatContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.prompt.clone(),
            }];
            parts.extend(request.reference_images.iter().map(|image| {
                ContentPart::ImageUrl {
                    image_url: ImageUrlRef {
                        url: image.to_data_uri(),
                    },
                }
            }));
            ChatContent::Parts(parts)
        };
        ChatCompletionBody {
            model: request.model_id.clone(),
            stream,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
        }
    }

    /// One non-streaming chat-completions call. Used by the fan-out path
    /// for chat-style image models.
    pub async fn submit_synchronous(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenError> {
        let mut builder = self
            .http
            .post(self.url("/v1/chat/completions"))
            .header("Authorization", self.bearer())
            .json(&self.chat_body(request, false));
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Self::read_json(response).await
    }

    /// One streaming chat-completions call, returning the provider's raw
    /// byte stream for passthrough relaying.
    pub async fn open_synchronous_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + use<>, GenError> {
        let response = self
            .http
            .post(self.url("/v1/chat/completions"))
            .header("Authorization", self.bearer())
            .json(&self.chat_body(request, true))
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(response.bytes_stream())
    }

    /// One image-API call for structured-style models. Always requests a
    /// single image; the fan-out engine owns multiplicity.
    pub async fn submit_image_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenError> {
        let profile = structured_image_profile(&request.model_id);
        let body = ImageGenerationBody {
            model: request.model_id.clone(),
            prompt: request.prompt.clone(),
            n: 1,
            size: profile.size.to_string(),
            response_format: profile.response_format.to_string(),
            watermark: profile.watermark,
        };
        let mut builder = self
            .http
            .post(self.url("/v1/images/generations"))
            .header("Authorization", self.bearer())
            .json(&body);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Self::read_json(response).await
    }

    /// Submit an async video job. Returns the provider-assigned job id.
    pub async fn submit_async_job(&self, request: &GenerationRequest) -> Result<String, GenError> {
        let profile = async_video_profile(&request.model_id).ok_or_else(|| {
            GenError::InvalidInput(format!(
                "model '{}' is not an async video model",
                request.model_id
            ))
        })?;
        let submission = resolve_async_submission(
            profile,
            request.duration_seconds,
            !request.reference_images.is_empty(),
        )?;
        let form = self.submission_form(request, &submission)?;

        // Content-Type is left to reqwest so the multipart boundary is set.
        let response = self
            .http
            .post(self.url("/v1/videos"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        let payload = Self::read_json(response).await?;

        payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GenError::ParseError("async submit response contained no job id".to_string())
            })
    }

    fn submission_form(
        &self,
        request: &GenerationRequest,
        submission: &AsyncSubmission,
    ) -> Result<multipart::Form, GenError> {
        let mut form = multipart::Form::new()
            .text("prompt", request.prompt.clone())
            .text("model", submission.model.clone());
        if let Some(size) = &submission.size {
            form = form.text("size", size.clone());
        }
        if let Some(seconds) = submission.seconds {
            form = form.text("seconds", seconds.to_string());
        }
        if submission.attach_images {
            for (index, image) in request.reference_images.iter().enumerate() {
                let extension = image.mime_type().rsplit('/').next().unwrap_or("jpeg");
                let part = multipart::Part::bytes(image.bytes().to_vec())
                    .file_name(format!("reference-{index}.{extension}"))
                    .mime_str(image.mime_type())
                    .map_err(|e| GenError::InternalError(e.to_string()))?;
                form = form.part("input_reference", part);
            }
        }
        Ok(form)
    }

    /// Poll the status of a submitted job.
    pub async fn poll_job_status(&self, job_id: &str) -> Result<serde_json::Value, GenError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/videos/{job_id}")))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Self::read_json(response).await
    }

    /// Fetch the content descriptor of a job, the fallback when a
    /// completed status payload omits the artifact location.
    pub async fn fetch_job_content(&self, job_id: &str) -> Result<serde_json::Value, GenError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/videos/{job_id}/content")))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Self::read_json(response).await
    }

    /// List the models the provider currently offers.
    pub async fn list_models(&self) -> Result<serde_json::Value, GenError> {
        let response = self
            .http
            .get(self.url("/v1/models"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| GenError::HttpError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn status_error(response: reqwest::Response) -> GenError {
        let code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        GenError::ApiError {
            code,
            message: GenError::upstream_message(&body),
            details: serde_json::from_str(&body).ok(),
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, GenError> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| GenError::ParseError(e.to_string()))
    }
}
