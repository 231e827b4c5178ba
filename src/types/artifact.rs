//! Artifact and candidate types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};

use crate::error::GenError;
use crate::types::CallerId;

/// The product of one successful provider call: either inline bytes or a
/// location to fetch them from. Exactly one of the two.
#[derive(Clone, PartialEq, Eq)]
pub enum Artifact {
    Bytes(Vec<u8>),
    Url(String),
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// Outcome of a single provider call.
pub type ProviderCallResult = Result<Artifact, GenError>;

/// Where a finished artifact lives.
#[derive(Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Url(String),
    Binary(Vec<u8>),
}

impl std::fmt::Debug for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Binary(bytes) => f.debug_tuple("Binary").field(&bytes.len()).finish(),
        }
    }
}

/// Record handed to the artifact-store collaborator once per completed job.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    pub caller_id: CallerId,
    pub prompt: String,
    pub model_id: String,
    pub location: ArtifactLocation,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(
        caller_id: CallerId,
        prompt: impl Into<String>,
        model_id: impl Into<String>,
        location: ArtifactLocation,
    ) -> Self {
        Self {
            caller_id,
            prompt: prompt.into(),
            model_id: model_id.into(),
            location,
            created_at: Utc::now(),
        }
    }
}

/// The surviving buffers of one fan-out run, in completion order.
///
/// Construction guarantees at least one candidate; zero survivors are
/// reported as an error by the fan-out engine instead.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub candidates: Vec<Vec<u8>>,
}

impl CandidateSet {
    /// Self-describing inline-data strings for the wire response.
    pub fn to_data_uris(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|bytes| {
                let mime = infer::get(bytes)
                    .map(|kind| kind.mime_type())
                    .unwrap_or("image/jpeg");
                format!("data:{};base64,{}", mime, BASE64.encode(bytes))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uris_are_self_describing() {
        let set = CandidateSet {
            candidates: vec![vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46]],
        };
        let uris = set.to_data_uris();
        assert_eq!(uris.len(), 1);
        assert!(uris[0].starts_with("data:image/jpeg;base64,"));
    }
}
