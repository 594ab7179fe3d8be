// src/services/backend.rs
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::ImagePayload;

/// What a backend call is for. Used for logging and by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Analysis,
    Poster,
    AdCopy,
    Variation,
    BackgroundEnhancement,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Analysis => "outfit_analysis",
            Operation::Poster => "poster",
            Operation::AdCopy => "ad_copy",
            Operation::Variation => "variation",
            Operation::BackgroundEnhancement => "background_enhancement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(ImagePayload),
}

/// Asks the backend for a JSON object with exactly one string property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuredField {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub operation: Operation,
    pub model: String,
    pub parts: Vec<Part>,
    pub response_modalities: Vec<Modality>,
    pub structured: Option<StructuredField>,
}

impl ContentRequest {
    pub fn new(operation: Operation, model: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            operation,
            model: model.into(),
            parts,
            response_modalities: Vec::new(),
            structured: None,
        }
    }

    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.response_modalities = modalities.to_vec();
        self
    }

    pub fn with_structured(mut self, field: StructuredField) -> Self {
        self.structured = Some(field);
        self
    }

    /// Concatenated text parts, used by test doubles to route on prompt content.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_wire(&self) -> Value {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::Image(image) => json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.base64
                    }
                }),
            })
            .collect();

        let mut generation_config = serde_json::Map::new();
        if !self.response_modalities.is_empty() {
            generation_config.insert(
                "responseModalities".to_string(),
                Value::Array(
                    self.response_modalities
                        .iter()
                        .map(|m| Value::String(m.as_str().to_string()))
                        .collect(),
                ),
            );
        }
        if let Some(field) = self.structured {
            generation_config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
            generation_config.insert(
                "responseSchema".to_string(),
                json!({
                    "type": "OBJECT",
                    "properties": {
                        field.name: {
                            "type": "STRING",
                            "description": field.description
                        }
                    }
                }),
            );
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": Value::Object(generation_config)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

impl ContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// All text parts of the first candidate, or `None` when there is no text.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// The first inline part whose mime type is an image.
    pub fn first_image(&self) -> Option<ImagePayload> {
        self.first_parts().iter().find_map(|p| {
            p.inline_data
                .as_ref()
                .filter(|d| d.mime_type.starts_with("image/") && !d.data.is_empty())
                .map(|d| ImagePayload {
                    base64: d.data.clone(),
                    mime_type: d.mime_type.clone(),
                })
        })
    }

    /// Completion reason of the first candidate, falling back to a prompt block reason.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .or_else(|| {
                self.prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref())
            })
    }
}

#[cfg(test)]
impl ContentResponse {
    pub(crate) fn from_parts(parts: Vec<ResponsePart>, finish_reason: Option<&str>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content { parts }),
                finish_reason: finish_reason.map(str::to_string),
            }],
            prompt_feedback: None,
        }
    }

    pub(crate) fn from_text(text: &str) -> Self {
        Self::from_parts(
            vec![ResponsePart {
                text: Some(text.to_string()),
                inline_data: None,
            }],
            Some("STOP"),
        )
    }

    pub(crate) fn from_image(image: &ImagePayload) -> Self {
        Self::from_parts(
            vec![ResponsePart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.base64.clone(),
                }),
            }],
            Some("STOP"),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The generative image/text capability the studio depends on.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, BackendError>;
}

/// `generateContent` over HTTP.
pub struct GeminiBackend {
    api_key: String,
    api_base: String,
    client: Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, api_base: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:generateContent", self.api_base, path)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, BackendError> {
        let endpoint = self.endpoint(&request.model);
        debug!("{} -> {}", request.operation, endpoint);

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request.to_wire())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_request_carries_parts_modalities_and_schema() {
        let request = ContentRequest::new(
            Operation::Analysis,
            "gemini-2.5-flash",
            vec![
                Part::Image(ImagePayload {
                    base64: "AAAA".to_string(),
                    mime_type: "image/png".to_string(),
                }),
                Part::Text("describe".to_string()),
            ],
        )
        .with_structured(StructuredField {
            name: "outfit",
            description: "the outfit",
        });

        let wire = request.to_wire();
        let parts = &wire["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], "describe");
        let config = &wire["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["properties"]["outfit"]["type"], "STRING");
        assert!(config.get("responseModalities").is_none());

        let image_request = ContentRequest::new(Operation::Poster, "m", vec![])
            .with_modalities(&[Modality::Image, Modality::Text]);
        let wire = image_request.to_wire();
        assert_eq!(
            wire["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn response_parsing_accepts_both_casings() {
        let camel: ContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(camel.text().as_deref(), Some("here you go"));
        assert_eq!(camel.first_image().unwrap().base64, "QUJD");
        assert_eq!(camel.finish_reason(), Some("STOP"));

        let snake: ContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "inline_data": { "mime_type": "image/jpeg", "data": "REVG" } }
                ]},
                "finish_reason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(snake.first_image().unwrap().mime_type, "image/jpeg");
        assert!(snake.text().is_none());
    }

    #[test]
    fn non_image_inline_parts_are_skipped() {
        let response: ContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "application/pdf", "data": "UERG" } },
                    { "inlineData": { "mimeType": "image/webp", "data": "V0VC" } }
                ]}
            }]
        }))
        .unwrap();
        assert_eq!(response.first_image().unwrap().base64, "V0VC");
    }

    #[test]
    fn prompt_block_reason_is_reported_when_no_candidates() {
        let response: ContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(response.first_image().is_none());
        assert_eq!(response.finish_reason(), Some("SAFETY"));
    }

    #[test]
    fn endpoint_accepts_prefixed_and_bare_model_names() {
        let backend = GeminiBackend::new(
            "k".to_string(),
            "https://example.test/v1beta/",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            backend.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            backend.endpoint("models/x"),
            "https://example.test/v1beta/models/x:generateContent"
        );
    }
}
