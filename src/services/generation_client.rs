// src/services/generation_client.rs
use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::errors::StudioError;
use crate::models::{
    AspectRatio, EnhancedBackground, ExtractionTarget, ImagePayload, OutfitDescription,
    UploadedImage,
};
use crate::prompts;
use crate::services::backend::{
    ContentRequest, ContentResponse, GenerativeBackend, Modality, Operation, Part,
    StructuredField,
};
use crate::services::image_processor::ImageProcessor;

const OUTFIT_SCHEMA: StructuredField = StructuredField {
    name: prompts::OUTFIT_FIELD,
    description: "Detailed description of the requested garment(s): top, bottom or the whole outfit.",
};

const BACKGROUND_SCHEMA: StructuredField = StructuredField {
    name: prompts::BACKGROUND_FIELD,
    description: "A more detailed and vivid description of the scene.",
};

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub image_model: String,
    pub text_model: String,
    pub caption_language: String,
}

impl From<&AppConfig> for ModelSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            caption_language: config.caption_language.clone(),
        }
    }
}

/// Typed wrapper over the backend: builds prompts, sends them and turns
/// whatever comes back into a value or a [`StudioError`]. Never retries.
pub struct GenerationClient {
    backend: Arc<dyn GenerativeBackend>,
    processor: ImageProcessor,
    settings: ModelSettings,
}

impl GenerationClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        processor: ImageProcessor,
        settings: ModelSettings,
    ) -> Self {
        Self {
            backend,
            processor,
            settings,
        }
    }

    pub async fn analyze_outfit(
        &self,
        product: &UploadedImage,
        target: ExtractionTarget,
    ) -> Result<String, StudioError> {
        let request = ContentRequest::new(
            Operation::Analysis,
            &self.settings.text_model,
            vec![
                Part::Image(product.payload()),
                Part::Text(prompts::analysis_prompt(target)),
            ],
        )
        .with_structured(OUTFIT_SCHEMA);

        let response = self.backend.generate_content(request).await.map_err(|e| {
            StudioError::Analysis(format!("Could not analyze the product image: {}", e))
        })?;

        let text = response.text().ok_or_else(|| {
            StudioError::Analysis("The AI returned an empty analysis".to_string())
        })?;
        let parsed: OutfitDescription = parse_structured(&text).map_err(|e| {
            StudioError::Analysis(format!("Unparsable analysis response: {}", e))
        })?;

        let outfit = parsed.outfit.trim().to_string();
        if outfit.is_empty() {
            return Err(StudioError::Analysis(
                "The analysis did not describe any outfit".to_string(),
            ));
        }
        debug!("analysis for {} target produced {} chars", target, outfit.len());
        Ok(outfit)
    }

    pub async fn synthesize_poster(
        &self,
        product: &ImagePayload,
    ) -> Result<ImagePayload, StudioError> {
        let request = ContentRequest::new(
            Operation::Poster,
            &self.settings.image_model,
            vec![
                Part::Text(prompts::poster_prompt().to_string()),
                Part::Image(product.clone()),
            ],
        )
        .with_modalities(&[Modality::Image]);

        let response = self
            .backend
            .generate_content(request)
            .await
            .map_err(|e| StudioError::Generation(format!("Poster request failed: {}", e)))?;

        response.first_image().ok_or_else(|| {
            StudioError::Generation("The AI did not return a composite image".to_string())
        })
    }

    pub async fn write_ad_copy(&self, images: &[ImagePayload]) -> Result<String, StudioError> {
        let mut parts = vec![Part::Text(prompts::ad_copy_prompt(
            &self.settings.caption_language,
        ))];
        parts.extend(images.iter().cloned().map(Part::Image));

        let request = ContentRequest::new(Operation::AdCopy, &self.settings.text_model, parts);
        let response = self
            .backend
            .generate_content(request)
            .await
            .map_err(|e| StudioError::Generation(format!("Caption request failed: {}", e)))?;

        response
            .text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| StudioError::Generation("The AI returned an empty caption".to_string()))
    }

    pub async fn synthesize_variation(
        &self,
        model_image: &UploadedImage,
        outfit: &str,
        background: &str,
        aspect_ratio: AspectRatio,
        camera_angle: &str,
    ) -> Result<ImagePayload, StudioError> {
        let preprocessed = self.letterbox(model_image, aspect_ratio).await?;
        let prompt = prompts::variation_prompt(outfit, background, &aspect_ratio, camera_angle);

        let request = ContentRequest::new(
            Operation::Variation,
            &self.settings.image_model,
            vec![Part::Image(preprocessed), Part::Text(prompt)],
        )
        .with_modalities(&[Modality::Image, Modality::Text]);

        let response = self
            .backend
            .generate_content(request)
            .await
            .map_err(|e| StudioError::Generation(format!("Image request failed: {}", e)))?;

        image_or_diagnostic(&response)
    }

    pub async fn enhance_background(&self, background: &str) -> Result<String, StudioError> {
        let request = ContentRequest::new(
            Operation::BackgroundEnhancement,
            &self.settings.text_model,
            vec![Part::Text(prompts::background_enhancement_prompt(background))],
        )
        .with_structured(BACKGROUND_SCHEMA);

        let response = self.backend.generate_content(request).await.map_err(|e| {
            StudioError::Generation(format!("Could not enhance the background: {}", e))
        })?;

        let text = response.text().ok_or_else(|| {
            StudioError::Generation("The AI returned an empty background".to_string())
        })?;
        let parsed: EnhancedBackground = parse_structured(&text).map_err(|e| {
            StudioError::Generation(format!("Unparsable background response: {}", e))
        })?;
        Ok(parsed.enhanced_background.trim().to_string())
    }

    /// Decoding and encoding are CPU bound, so they run off the async worker.
    async fn letterbox(
        &self,
        image: &UploadedImage,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, StudioError> {
        let processor = self.processor.clone();
        let bytes = image.bytes.clone();
        tokio::task::spawn_blocking(move || processor.letterbox(&bytes, aspect_ratio))
            .await
            .map_err(|e| StudioError::Preprocess(format!("Preprocessing task failed: {}", e)))?
    }
}

fn image_or_diagnostic(response: &ContentResponse) -> Result<ImagePayload, StudioError> {
    if let Some(image) = response.first_image() {
        return Ok(image);
    }
    if let Some(text) = response.text() {
        warn!("variation returned text instead of an image");
        return Err(StudioError::Generation(format!(
            "The AI returned a text message instead of an image: \"{}\"",
            text.trim()
        )));
    }
    match response.finish_reason() {
        Some(reason) if reason != "STOP" => Err(StudioError::Generation(format!(
            "Blocked for safety or another reason: {}",
            reason
        ))),
        _ => Err(StudioError::Generation(
            "No image was generated in the response".to_string(),
        )),
    }
}

/// Removes a surrounding ``` or ```json fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(text))
}
