//! Artifact extraction from provider payloads.
//!
//! Everything here is deterministic: the same input bytes always produce
//! the same result. No state, no randomness, no network. Fetching an
//! extracted URL is the caller's concern.

use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use regex::Regex;

use crate::error::GenError;
use crate::types::Artifact;

fn inline_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"data:image/([A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=]+)").unwrap()
    })
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!?\[[^\]]*\]\((https?://[^\s)]+)\)").unwrap())
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").unwrap())
}

/// Strip punctuation that free text tends to glue onto a bare URL.
///
/// Applied only to bare-token matches; a URL taken out of a markdown
/// wrapper is returned exactly as written.
fn strip_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches([')', ']', '.'])
}

/// Find an artifact URL in free-text message content.
///
/// Markdown-wrapped links win over bare tokens.
pub fn extract_artifact_url(content: &str) -> Option<String> {
    if let Some(captures) = markdown_link_re().captures(content) {
        return Some(captures[1].to_string());
    }
    bare_url_re()
        .find(content)
        .map(|m| strip_trailing_punctuation(m.as_str()).to_string())
}

/// Extract an artifact from chat-style message content.
///
/// Patterns are tried in order, first match wins: inline base64 image,
/// markdown link, bare URL.
pub fn extract_chat_artifact(content: &str) -> Result<Artifact, GenError> {
    if let Some(captures) = inline_image_re().captures(content) {
        let bytes = BASE64
            .decode(&captures[2])
            .map_err(|e| GenError::ParseError(format!("inline image is not valid base64: {e}")))?;
        return Ok(Artifact::Bytes(bytes));
    }
    extract_artifact_url(content)
        .map(Artifact::Url)
        .ok_or_else(|| GenError::ExtractionError("No image found in response".to_string()))
}

/// Pull the message content out of a chat-completion response body.
pub fn chat_message_content(payload: &serde_json::Value) -> Result<&str, GenError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            GenError::ExtractionError("Invalid response format or empty content".to_string())
        })
}

/// Extract artifacts from a structured image-API response (`data[]`).
///
/// Each element yields inline bytes or a URL; unresolved elements are
/// dropped, not failed.
pub fn extract_structured_artifacts(payload: &serde_json::Value) -> Vec<Artifact> {
    let Some(items) = payload.get("data").and_then(|d| d.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            if let Some(encoded) = item.get("b64_json").and_then(|v| v.as_str()) {
                return BASE64.decode(encoded).ok().map(Artifact::Bytes);
            }
            item.get("url")
                .and_then(|v| v.as_str())
                .map(|url| Artifact::Url(url.to_string()))
        })
        .collect()
}

/// Resolve the artifact URL carried by an async job status or content
/// payload. Field names vary across provider revisions; known spots are
/// probed in a fixed order.
pub fn extract_job_artifact_url(payload: &serde_json::Value) -> Option<String> {
    const PROBES: &[&str] = &["/url", "/video_url", "/output/url", "/data/0/url"];
    PROBES
        .iter()
        .find_map(|probe| payload.pointer(probe).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Reassemble the free-text content of a buffered chat SSE stream.
///
/// `data:` events are decoded as chat-completion chunks and their
/// `choices[0].delta.content` fragments concatenated; undecodable lines
/// and the `[DONE]` sentinel are ignored.
pub async fn collect_stream_content(raw: &[u8]) -> String {
    let source = futures_util::stream::once(async {
        Ok::<_, std::convert::Infallible>(Bytes::copy_from_slice(raw))
    });
    let mut events = std::pin::pin!(source.eventsource());
    let mut content = String::new();
    while let Some(event) = events.next().await {
        let Ok(event) = event else { continue };
        if event.data.trim() == "[DONE]" {
            continue;
        }
        let Ok(chunk) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            continue;
        };
        if let Some(delta) = chunk
            .pointer("/choices/0/delta/content")
            .and_then(|v| v.as_str())
        {
            content.push_str(delta);
        }
    }
    content
}
