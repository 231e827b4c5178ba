//! Server adapters for exposing the orchestrator over HTTP.
//!
//! The wire formats live here, framework-free; the Axum integration is
//! behind the `server-adapters` feature.

#[cfg(feature = "server-adapters")]
pub mod axum;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, GenError};

/// Model used when a candidate request names none.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

/// Model used when a video request names none.
pub const DEFAULT_VIDEO_MODEL: &str = "sora_video2";

/// Candidates generated when a request does not ask for a count.
pub const DEFAULT_CANDIDATE_COUNT: u32 = 4;

/// Body of a candidate-generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequestBody {
    pub prompt: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub input_images: Vec<String>,
    pub count: Option<u32>,
}

/// Body of a successful candidate-generation response. Candidates are
/// self-describing inline-data image strings.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponseBody {
    pub success: bool,
    pub candidates: Vec<String>,
    pub message: String,
}

/// Body of a video-generation request. `input_image` is the single-image
/// shorthand; `input_images` carries several.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRequestBody {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub input_image: Option<String>,
    #[serde(default)]
    pub input_images: Vec<String>,
    #[serde(alias = "duration_seconds")]
    pub seconds: Option<u32>,
}

/// Uniform failure body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn from_error(error: &GenError) -> Self {
        Self {
            success: false,
            message: error.user_message(),
        }
    }
}

/// HTTP status for an error: caller mistakes and upstream failures never
/// share a code.
pub fn error_status(error: &GenError) -> u16 {
    match error.category() {
        ErrorCategory::Caller => 400,
        ErrorCategory::Auth => 401,
        _ if error.is_upstream() => 502,
        _ => 500,
    }
}
