//! Axum handlers for the generation endpoints.
//!
//! `POST /api/generate` answers with a JSON candidate set;
//! `POST /api/video/generate` answers with a `text/event-stream` body
//! built from the relay stream. Session verification is delegated to the
//! configured collaborator: required for video, optional for candidate
//! generation.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::error::GenError;
use crate::orchestrator::Orchestrator;
use crate::server_adapters::{
    DEFAULT_CANDIDATE_COUNT, DEFAULT_IMAGE_MODEL, DEFAULT_VIDEO_MODEL, ErrorBody,
    GenerateRequestBody, GenerateResponseBody, VideoRequestBody, error_status,
};
use crate::traits::SessionVerifier;
use crate::types::{CallerId, GenerationRequest, ReferenceImage};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<dyn SessionVerifier>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/video/generate", post(video_handler))
        .with_state(state)
}

fn error_response(error: &GenError) -> Response {
    let status = StatusCode::from_u16(error_status(error))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::from_error(error))).into_response()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == "auth_token" {
                    return Some(value.to_string());
                }
            }
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn optional_caller(state: &AppState, headers: &HeaderMap) -> Result<CallerId, GenError> {
    match session_token(headers) {
        Some(token) => state.sessions.verify_session(&token).await,
        None => Ok(CallerId::anonymous()),
    }
}

async fn required_caller(state: &AppState, headers: &HeaderMap) -> Result<CallerId, GenError> {
    let token = session_token(headers)
        .ok_or_else(|| GenError::AuthError("Unauthorized".to_string()))?;
    state.sessions.verify_session(&token).await
}

fn require_prompt(prompt: Option<String>) -> Result<String, GenError> {
    prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GenError::InvalidInput("Prompt is required".to_string()))
}

async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequestBody>,
) -> Response {
    let caller = match optional_caller(&state, &headers).await {
        Ok(caller) => caller,
        Err(error) => return error_response(&error),
    };
    let prompt = match require_prompt(body.prompt) {
        Ok(prompt) => prompt,
        Err(error) => return error_response(&error),
    };
    let images: Result<Vec<ReferenceImage>, GenError> = body
        .input_images
        .iter()
        .map(|image| ReferenceImage::from_wire(image))
        .collect();
    let images = match images {
        Ok(images) => images,
        Err(error) => return error_response(&error),
    };

    let request = GenerationRequest::builder(
        prompt,
        body.model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
    )
    .reference_images(images)
    .candidate_count(body.count.unwrap_or(DEFAULT_CANDIDATE_COUNT))
    .caller(caller)
    .build();
    let request = match request {
        Ok(request) => request,
        Err(error) => return error_response(&error),
    };

    match state.orchestrator.generate_candidates(&request).await {
        Ok(set) => {
            let message = format!("Generated {} candidates. Please select one to save.", set.len());
            Json(GenerateResponseBody {
                success: true,
                candidates: set.to_data_uris(),
                message,
            })
            .into_response()
        }
        Err(error) => error_response(&error),
    }
}

async fn video_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VideoRequestBody>,
) -> Response {
    let caller = match required_caller(&state, &headers).await {
        Ok(caller) => caller,
        Err(error) => return error_response(&error),
    };
    let prompt = match require_prompt(body.prompt) {
        Ok(prompt) => prompt,
        Err(error) => return error_response(&error),
    };

    let mut builder = GenerationRequest::builder(
        prompt,
        body.model.unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
    )
    .caller(caller);
    let wire_images = body.input_image.iter().chain(body.input_images.iter());
    for image in wire_images {
        let image = match ReferenceImage::from_wire(image) {
            Ok(image) => image,
            Err(error) => return error_response(&error),
        };
        builder = builder.reference_image(image);
    }
    if let Some(seconds) = body.seconds {
        builder = builder.duration_seconds(seconds);
    }
    let request = match builder.build() {
        Ok(request) => request,
        Err(error) => return error_response(&error),
    };

    match state.orchestrator.stream_generation(&request).await {
        Ok(stream) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from_stream(stream))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(error) => error_response(&error),
    }
}
