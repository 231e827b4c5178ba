//! Generation request types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::GenError;

/// Maximum number of reference images accepted per request.
pub const MAX_REFERENCE_IMAGES: usize = 3;

/// Opaque, already-verified caller identity.
///
/// Produced by the session-verification collaborator; this crate never
/// inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity used on paths where the serving layer allows
    /// unauthenticated candidate generation.
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One caller-supplied conditioning image, held as raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    bytes: Vec<u8>,
}

impl ReferenceImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Accepts either a full `data:` URI or bare base64, the two shapes
    /// callers send on the wire.
    pub fn from_wire(value: &str) -> Result<Self, GenError> {
        let encoded = match value.split_once(";base64,") {
            Some((header, data)) if header.starts_with("data:") => data,
            _ => value,
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| GenError::InvalidInput(format!("reference image is not valid base64: {e}")))?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type sniffed from the bytes; JPEG when unrecognized.
    pub fn mime_type(&self) -> &'static str {
        infer::get(&self.bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("image/jpeg")
    }

    /// Self-describing inline form used in chat-style payloads.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            BASE64.encode(&self.bytes)
        )
    }
}

impl std::fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type())
            .finish()
    }
}

/// An immutable request for one generation run.
///
/// A request produces either a candidate set (image families) or exactly
/// one async job (task-endpoint video models), never both.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_id: String,
    pub reference_images: Vec<ReferenceImage>,
    pub candidate_count: u32,
    pub duration_seconds: Option<u32>,
    pub caller_id: CallerId,
}

impl GenerationRequest {
    pub fn builder(
        prompt: impl Into<String>,
        model_id: impl Into<String>,
    ) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            prompt: prompt.into(),
            model_id: model_id.into(),
            reference_images: Vec::new(),
            candidate_count: 1,
            duration_seconds: None,
            caller_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.prompt.trim().is_empty() {
            return Err(GenError::InvalidInput("Prompt is required".to_string()));
        }
        if self.candidate_count == 0 {
            return Err(GenError::InvalidInput(
                "candidate_count must be at least 1".to_string(),
            ));
        }
        if self.reference_images.len() > MAX_REFERENCE_IMAGES {
            return Err(GenError::InvalidInput(format!(
                "at most {MAX_REFERENCE_IMAGES} reference images are accepted"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    prompt: String,
    model_id: String,
    reference_images: Vec<ReferenceImage>,
    candidate_count: u32,
    duration_seconds: Option<u32>,
    caller_id: Option<CallerId>,
}

impl GenerationRequestBuilder {
    pub fn reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    pub fn reference_images(mut self, images: Vec<ReferenceImage>) -> Self {
        self.reference_images = images;
        self
    }

    pub fn candidate_count(mut self, count: u32) -> Self {
        self.candidate_count = count;
        self
    }

    pub fn duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn caller(mut self, caller_id: CallerId) -> Self {
        self.caller_id = Some(caller_id);
        self
    }

    pub fn build(self) -> Result<GenerationRequest, GenError> {
        let request = GenerationRequest {
            prompt: self.prompt,
            model_id: self.model_id,
            reference_images: self.reference_images,
            candidate_count: self.candidate_count,
            duration_seconds: self.duration_seconds,
            caller_id: self.caller_id.unwrap_or_else(CallerId::anonymous),
        };
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 px PNG
    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52,
    ];

    #[test]
    fn builder_validates_the_prompt() {
        let err = GenerationRequest::builder("   ", "nano-banana-pro")
            .build()
            .unwrap_err();
        assert!(matches!(err, GenError::InvalidInput(_)));
    }

    #[test]
    fn builder_caps_reference_images() {
        let images = (0..4)
            .map(|_| ReferenceImage::from_bytes(PNG_BYTES.to_vec()))
            .collect();
        let err = GenerationRequest::builder("a cat", "nano-banana-pro")
            .reference_images(images)
            .build()
            .unwrap_err();
        assert!(matches!(err, GenError::InvalidInput(_)));
    }

    #[test]
    fn wire_image_accepts_data_uri_and_bare_base64() {
        let encoded = BASE64.encode(PNG_BYTES);
        let from_uri =
            ReferenceImage::from_wire(&format!("data:image/png;base64,{encoded}")).unwrap();
        let from_bare = ReferenceImage::from_wire(&encoded).unwrap();
        assert_eq!(from_uri.bytes(), PNG_BYTES);
        assert_eq!(from_uri.bytes(), from_bare.bytes());
    }

    #[test]
    fn data_uri_roundtrip_sniffs_png() {
        let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec());
        assert_eq!(image.mime_type(), "image/png");
        assert!(image.to_data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_jpeg() {
        let image = ReferenceImage::from_bytes(vec![0x00, 0x01, 0x02]);
        assert_eq!(image.mime_type(), "image/jpeg");
    }
}
