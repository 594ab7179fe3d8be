// src/services/test_support.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use crate::models::{ImagePayload, UploadedImage};
use crate::services::backend::{
    BackendError, ContentRequest, ContentResponse, GenerativeBackend, Operation, Part,
};
use crate::services::generation_client::{GenerationClient, ModelSettings};
use crate::services::image_processor::{ImageProcessor, png_bytes};

pub(crate) type Reply = Result<ContentResponse, BackendError>;

type Script = dyn Fn(&ContentRequest) -> Reply + Send + Sync;
type Latency = dyn Fn(&ContentRequest) -> Duration + Send + Sync;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub operation: Operation,
    pub prompt: String,
    pub images: usize,
    pub image_mimes: Vec<String>,
}

/// In-process backend answering from a closure and recording every call.
pub(crate) struct ScriptedBackend {
    script: Box<Script>,
    latency: Box<Latency>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(script: impl Fn(&ContentRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Self::with_latency(script, |_| Duration::ZERO)
    }

    pub fn with_latency(
        script: impl Fn(&ContentRequest) -> Reply + Send + Sync + 'static,
        latency: impl Fn(&ContentRequest) -> Duration + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            latency: Box::new(latency),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn happy() -> Arc<Self> {
        Self::new(happy_reply)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate_content(&self, request: ContentRequest) -> Reply {
        let image_mimes: Vec<String> = request
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Image(image) => Some(image.mime_type.clone()),
                Part::Text(_) => None,
            })
            .collect();
        self.calls.lock().unwrap().push(RecordedCall {
            operation: request.operation,
            prompt: request.prompt_text(),
            images: image_mimes.len(),
            image_mimes,
        });

        let delay = (self.latency)(&request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.script)(&request)
    }
}

pub(crate) const ANALYZED_OUTFIT: &str = "red cotton t-shirt";
pub(crate) const AD_COPY: &str = "+ 1 fresh drop for the weekend ..!!!";

pub(crate) fn poster_image() -> ImagePayload {
    ImagePayload {
        base64: "UE9TVEVS".to_string(),
        mime_type: "image/png".to_string(),
    }
}

/// Distinct, recognisable output per camera angle.
pub(crate) fn variation_image(angle: &str) -> ImagePayload {
    ImagePayload {
        base64: general_purpose::STANDARD.encode(angle),
        mime_type: "image/png".to_string(),
    }
}

/// The camera angle embedded in a variation prompt.
pub(crate) fn angle_of(prompt: &str) -> String {
    prompt
        .split("shoot from this angle: ")
        .nth(1)
        .and_then(|rest| rest.split(".\n").next())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn happy_reply(request: &ContentRequest) -> Reply {
    let response = match request.operation {
        Operation::Analysis => {
            ContentResponse::from_text(&format!("{{\"outfit\": \"{}\"}}", ANALYZED_OUTFIT))
        }
        Operation::BackgroundEnhancement => ContentResponse::from_text(
            "```json\n{\"enhanced_background\": \"sunlit terracotta courtyard\"}\n```",
        ),
        Operation::Poster => ContentResponse::from_image(&poster_image()),
        Operation::AdCopy => ContentResponse::from_text(AD_COPY),
        Operation::Variation => {
            ContentResponse::from_image(&variation_image(&angle_of(&request.prompt_text())))
        }
    };
    Ok(response)
}

pub(crate) fn failure(message: &str) -> Reply {
    Err(BackendError::Status {
        status: 500,
        body: message.to_string(),
    })
}

pub(crate) fn client_with(backend: Arc<ScriptedBackend>) -> GenerationClient {
    GenerationClient::new(
        backend,
        ImageProcessor::new(4096),
        ModelSettings {
            image_model: "image-model".to_string(),
            text_model: "text-model".to_string(),
            caption_language: "Vietnamese".to_string(),
        },
    )
}

pub(crate) fn sample_upload() -> UploadedImage {
    UploadedImage::new(
        "photo.png".to_string(),
        "image/png".to_string(),
        Bytes::from(png_bytes(30, 40, [180, 40, 40])),
        (30, 40),
    )
}
