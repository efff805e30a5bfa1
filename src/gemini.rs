//! Gemini API client — request builders, HTTP plumbing, and tolerant
//! response extraction for every capability the session delegates.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};

use crate::constants::{
    DEFAULT_GEMINI_BASE_URL, FAST_MAX_OUTPUT_TOKENS, FAST_MODEL, IMAGE_EDIT_MODEL, IMAGE_MODEL,
    MAPS_MODEL, REQUEST_TIMEOUT_SECS, SEARCH_MODEL, THINKING_BUDGET, THINKING_MODEL, TTS_MODEL,
    TTS_VOICE,
};
use crate::gateway::{
    CapabilityGateway, Citation, Coordinates, GroundedReply, ImagePayload, ImageSize,
    PendingUpload,
};
use crate::util::env_first;

/// Thin wrapper around the Gemini `generateContent` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    http_client: HttpClient,
}

impl GeminiClient {
    pub fn new() -> Self {
        let base_url = env_first(&["GEMINI_BASE_URL", "AGENTFI_BASE_URL"])
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        GeminiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    /// POST a `generateContent` body to `model` and return the parsed JSON.
    async fn request(&self, key: &str, model: &str, body: Value) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .context("send Gemini request")?;
        let status = response.status();
        let text = response.text().await.context("read Gemini response")?;
        let json: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({"raw": text}));
        if !status.is_success() {
            return Err(anyhow!("Gemini error {status}: {json}"));
        }
        Ok(json)
    }
}

#[async_trait]
impl CapabilityGateway for GeminiClient {
    async fn generate_text(
        &self,
        key: &str,
        prompt: &str,
        system_context: &str,
    ) -> Result<String> {
        let body = text_request(prompt, system_context);
        let response = self.request(key, THINKING_MODEL, body).await?;
        Ok(extract_text(&response))
    }

    async fn fast_response(&self, key: &str, prompt: &str) -> Result<String> {
        let body = fast_request(prompt);
        let response = self.request(key, FAST_MODEL, body).await?;
        Ok(extract_text(&response))
    }

    async fn generate_with_search(&self, key: &str, query: &str) -> Result<GroundedReply> {
        let body = grounded_request(query, "google_search", None);
        let response = self.request(key, SEARCH_MODEL, body).await?;
        Ok(GroundedReply {
            text: extract_text(&response),
            citations: extract_citations(&response),
        })
    }

    async fn generate_with_location(
        &self,
        key: &str,
        query: &str,
        position: Option<Coordinates>,
    ) -> Result<GroundedReply> {
        let body = grounded_request(query, "google_maps", position);
        let response = self.request(key, MAPS_MODEL, body).await?;
        Ok(GroundedReply {
            text: extract_text(&response),
            citations: extract_citations(&response),
        })
    }

    async fn generate_image(
        &self,
        key: &str,
        prompt: &str,
        size: ImageSize,
    ) -> Result<Option<ImagePayload>> {
        let body = image_request(prompt, size);
        let response = self.request(key, IMAGE_MODEL, body).await?;
        Ok(extract_inline_data(&response))
    }

    async fn edit_image(
        &self,
        key: &str,
        image: &PendingUpload,
        instruction: &str,
    ) -> Result<Option<ImagePayload>> {
        let body = edit_request(image, instruction);
        let response = self.request(key, IMAGE_EDIT_MODEL, body).await?;
        Ok(extract_inline_data(&response))
    }

    async fn synthesize_speech(&self, key: &str, text: &str) -> Result<Vec<u8>> {
        let body = speech_request(text);
        let response = self.request(key, TTS_MODEL, body).await?;
        extract_inline_data(&response)
            .map(|payload| payload.data)
            .ok_or_else(|| anyhow!("no audio payload in speech response"))
    }
}

// ── Request builders ─────────────────────────────────────────────────

fn user_contents(text: &str) -> Value {
    json!([{ "role": "user", "parts": [{ "text": text }] }])
}

fn text_request(prompt: &str, system_context: &str) -> Value {
    json!({
        "contents": user_contents(prompt),
        "systemInstruction": { "parts": [{ "text": system_context }] },
        "generationConfig": {
            "thinkingConfig": { "thinkingBudget": THINKING_BUDGET }
        }
    })
}

fn fast_request(prompt: &str) -> Value {
    json!({
        "contents": user_contents(prompt),
        "generationConfig": { "maxOutputTokens": FAST_MAX_OUTPUT_TOKENS }
    })
}

fn grounded_request(query: &str, tool: &str, position: Option<Coordinates>) -> Value {
    let mut tool_entry = serde_json::Map::new();
    tool_entry.insert(tool.to_string(), json!({}));
    let mut body = json!({
        "contents": user_contents(query),
        "tools": [Value::Object(tool_entry)]
    });
    if let Some(pos) = position {
        body["toolConfig"] = json!({
            "retrievalConfig": {
                "latLng": { "latitude": pos.lat, "longitude": pos.lng }
            }
        });
    }
    body
}

fn image_request(prompt: &str, size: ImageSize) -> Value {
    json!({
        "contents": user_contents(prompt),
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": {
                "imageSize": size.as_str(),
                "aspectRatio": "1:1"
            }
        }
    })
}

fn edit_request(image: &PendingUpload, instruction: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": BASE64.encode(&image.data)
                    }
                },
                { "text": instruction }
            ]
        }]
    })
}

fn speech_request(text: &str) -> Value {
    json!({
        "contents": user_contents(text),
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": TTS_VOICE }
                }
            }
        }
    })
}

// ── Response extraction ──────────────────────────────────────────────
//
// All extractors are total: malformed or empty responses yield empty
// strings / vectors / `None`, never a panic.

fn first_candidate_parts(response: &Value) -> Vec<Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Concatenate all text parts of the first candidate.
pub fn extract_text(response: &Value) -> String {
    let mut parts = Vec::new();
    for part in first_candidate_parts(response) {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.trim().is_empty() {
                parts.push(text.to_string());
            }
        }
    }
    parts.join("\n")
}

/// Pull grounding citations (web or maps) off the first candidate.
///
/// Chunks carrying neither a `web` nor a `maps` source are kept as untitled
/// entries so the citation count matches what the backend reported.
pub fn extract_citations(response: &Value) -> Vec<Citation> {
    let chunks = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("groundingMetadata"))
        .and_then(|metadata| metadata.get("groundingChunks"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    chunks
        .iter()
        .map(|chunk| {
            let source = chunk.get("web").or_else(|| chunk.get("maps"));
            let uri = source
                .and_then(|s| s.get("uri"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let title = source
                .and_then(|s| s.get("title"))
                .and_then(Value::as_str)
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .or_else(|| uri.clone())
                .unwrap_or_else(|| "untitled source".to_string());
            Citation { title, uri }
        })
        .collect()
}

/// First inline binary part (image or audio) of the first candidate,
/// decoded from base64.
pub fn extract_inline_data(response: &Value) -> Option<ImagePayload> {
    for part in first_candidate_parts(response) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        let Some(encoded) = inline.get("data").and_then(Value::as_str) else {
            continue;
        };
        if let Ok(data) = BASE64.decode(encoded) {
            return Some(ImagePayload { mime_type, data });
        }
    }
    None
}
