//! Capability gateway boundary — the async operations AGENTFI delegates to
//! the backing generative-AI service, and the data shapes that cross it.
//!
//! The session core never talks to the network directly; it goes through
//! [`CapabilityGateway`], which [`crate::gemini::GeminiClient`] implements.
//! Tests substitute fakes at the same seam.

use anyhow::Result;
use async_trait::async_trait;

// ── Data shapes ──────────────────────────────────────────────────────

/// Geographic position attached to location-grounded queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A cited source attached to a grounded reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Citation {
    pub title: String,
    pub uri: Option<String>,
}

/// Text plus the sources that grounded it.
#[derive(Clone, Debug, Default)]
pub struct GroundedReply {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Raw image bytes returned by the image capabilities.
#[derive(Clone, Debug)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Output resolution preset for image generation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ImageSize {
    #[default]
    OneK,
    TwoK,
    FourK,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }

    /// Parse a size preset ("1K", "2k", …); `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "1K" => Some(ImageSize::OneK),
            "2K" => Some(ImageSize::TwoK),
            "4K" => Some(ImageSize::FourK),
            _ => None,
        }
    }
}

/// The single buffered image awaiting an edit instruction.
///
/// At most one of these is alive at a time; it is consumed by the first
/// edit that completes successfully and survives failed attempts so the
/// user can retry against the same bytes.
#[derive(Clone, Debug)]
pub struct PendingUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

// ── The gateway ──────────────────────────────────────────────────────

/// One async operation per backend capability.
///
/// Every method takes the API key per call so the session can swap keys at
/// runtime without rebuilding the client.
#[async_trait]
pub trait CapabilityGateway: Send + Sync {
    /// Open-ended chat with a persona system context.
    async fn generate_text(&self, key: &str, prompt: &str, system_context: &str)
    -> Result<String>;

    /// Short low-latency acknowledgement (used for the deploy handshake).
    async fn fast_response(&self, key: &str, prompt: &str) -> Result<String>;

    /// Chat grounded with web-search results.
    async fn generate_with_search(&self, key: &str, query: &str) -> Result<GroundedReply>;

    /// Chat grounded with maps results, optionally biased to a position.
    async fn generate_with_location(
        &self,
        key: &str,
        query: &str,
        position: Option<Coordinates>,
    ) -> Result<GroundedReply>;

    /// Generate an image from a prompt. `Ok(None)` means the model answered
    /// without producing image bytes.
    async fn generate_image(
        &self,
        key: &str,
        prompt: &str,
        size: ImageSize,
    ) -> Result<Option<ImagePayload>>;

    /// Apply an edit instruction to a buffered image.
    async fn edit_image(
        &self,
        key: &str,
        image: &PendingUpload,
        instruction: &str,
    ) -> Result<Option<ImagePayload>>;

    /// Synthesize speech for `text`; returns raw mono 16-bit PCM.
    async fn synthesize_speech(&self, key: &str, text: &str) -> Result<Vec<u8>>;
}
