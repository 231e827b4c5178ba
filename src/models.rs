//! Model-family classification and per-family submission profiles.
//!
//! All model routing lives here as one table instead of string-literal
//! branches scattered through the request paths. The profile records the
//! literal identifier actually sent upstream, which parameters the family
//! accepts, and the substitute variant used when reference images are
//! supplied to a model without image-conditioning support. Combinations
//! the table does not allow are rejected before any provider call.

use crate::error::GenError;

/// Protocol shape of a model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Chat-completions models that answer with an image embedded in the
    /// message content (inline base64 or a link).
    ChatImage,
    /// Image-API models that answer with a structured `data[]` array.
    StructuredImage,
    /// Chat-completions models that stream video progress as SSE text.
    SyncVideo,
    /// Task-endpoint models driven by submit-then-poll.
    AsyncVideo,
}

impl ModelFamily {
    pub const fn is_video(self) -> bool {
        matches!(self, Self::SyncVideo | Self::AsyncVideo)
    }
}

/// Classify a model identifier into its protocol family.
///
/// Async task models are matched against the profile table first so that
/// e.g. `sora-2-pro` is not swallowed by the generic sync-video match.
pub fn classify(model_id: &str) -> ModelFamily {
    if async_video_profile(model_id).is_some() {
        return ModelFamily::AsyncVideo;
    }
    if model_id.contains("seedream") || model_id.contains("dall-e") {
        return ModelFamily::StructuredImage;
    }
    if model_id.contains("sora") || model_id.contains("video") {
        return ModelFamily::SyncVideo;
    }
    ModelFamily::ChatImage
}

/// Submission profile for one async video model.
#[derive(Debug, Clone, Copy)]
pub struct AsyncVideoProfile {
    /// Caller-facing model identifier.
    pub model_id: &'static str,
    /// Literal identifier sent to the submit endpoint.
    pub submit_model: &'static str,
    /// Whether the submit form accepts a `seconds` field.
    pub accepts_duration: bool,
    /// Whether the submit form accepts a `size` field.
    pub accepts_size: bool,
    pub default_size: Option<&'static str>,
    pub default_seconds: Option<u32>,
    /// Whether the base model accepts reference-image attachments.
    pub supports_reference_images: bool,
    /// Substitute model used when reference images are supplied and the
    /// base model has no image-conditioning support.
    pub image_variant: Option<&'static str>,
}

static ASYNC_VIDEO_PROFILES: &[AsyncVideoProfile] = &[
    AsyncVideoProfile {
        model_id: "sora-2-pro",
        submit_model: "sora-2-pro",
        accepts_duration: true,
        accepts_size: true,
        default_size: Some("1080x1920"),
        default_seconds: Some(10),
        supports_reference_images: false,
        image_variant: None,
    },
    AsyncVideoProfile {
        model_id: "veo3",
        submit_model: "veo3",
        accepts_duration: false,
        accepts_size: false,
        default_size: None,
        default_seconds: None,
        supports_reference_images: false,
        image_variant: Some("veo3-pro-frames"),
    },
    AsyncVideoProfile {
        model_id: "veo3-fast",
        submit_model: "veo3-fast",
        accepts_duration: false,
        accepts_size: false,
        default_size: None,
        default_seconds: None,
        supports_reference_images: false,
        image_variant: Some("veo3-pro-frames"),
    },
];

pub fn async_video_profile(model_id: &str) -> Option<&'static AsyncVideoProfile> {
    ASYNC_VIDEO_PROFILES
        .iter()
        .find(|profile| profile.model_id == model_id)
}

/// Fully resolved field set for one async submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncSubmission {
    /// Model identifier to put on the wire.
    pub model: String,
    pub size: Option<String>,
    pub seconds: Option<u32>,
    /// Whether reference images are attached to the form.
    pub attach_images: bool,
}

/// Resolve the submit-call fields for a profile, rejecting parameter and
/// model combinations the family does not support.
pub fn resolve_async_submission(
    profile: &AsyncVideoProfile,
    duration_seconds: Option<u32>,
    has_reference_images: bool,
) -> Result<AsyncSubmission, GenError> {
    if duration_seconds.is_some() && !profile.accepts_duration {
        return Err(GenError::InvalidInput(format!(
            "model '{}' does not accept a duration",
            profile.model_id
        )));
    }

    let model = if has_reference_images && !profile.supports_reference_images {
        match profile.image_variant {
            Some(variant) => variant.to_string(),
            None => {
                return Err(GenError::InvalidInput(format!(
                    "model '{}' does not accept reference images",
                    profile.model_id
                )));
            }
        }
    } else {
        profile.submit_model.to_string()
    };

    Ok(AsyncSubmission {
        model,
        size: profile
            .accepts_size
            .then(|| profile.default_size.map(str::to_string))
            .flatten(),
        seconds: if profile.accepts_duration {
            duration_seconds.or(profile.default_seconds)
        } else {
            None
        },
        attach_images: has_reference_images,
    })
}

/// Request profile for one structured-image model.
#[derive(Debug, Clone, Copy)]
pub struct StructuredImageProfile {
    pub size: &'static str,
    pub response_format: &'static str,
    pub watermark: bool,
    /// Whether a single call with a batch-size parameter is trusted to
    /// return that many results. Off for every current model: providers
    /// have been observed to ignore `n`, so each candidate gets its own
    /// call.
    pub native_batch: bool,
}

pub fn structured_image_profile(model_id: &str) -> StructuredImageProfile {
    let size = if model_id.contains("seedream-4") {
        "2048x2048"
    } else {
        "1024x1024"
    };
    StructuredImageProfile {
        size,
        response_format: "b64_json",
        watermark: false,
        native_batch: false,
    }
}
