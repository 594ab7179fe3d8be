// src/models.rs
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StudioError;
use crate::presets;

/// Which of the two upload slots an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    Model,
    Product,
}

/// An uploaded photo. Immutable once created; replaced wholesale on re-upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
    pub base64: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedImage {
    pub fn new(filename: String, mime_type: String, bytes: Bytes, dimensions: (u32, u32)) -> Self {
        let base64 = general_purpose::STANDARD.encode(&bytes);
        Self {
            id: Uuid::new_v4(),
            filename,
            mime_type,
            bytes,
            base64,
            width: dimensions.0,
            height: dimensions.1,
            uploaded_at: Utc::now(),
        }
    }

    pub fn payload(&self) -> ImagePayload {
        ImagePayload {
            base64: self.base64.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            id: self.id,
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            width: self.width,
            height: self.height,
            size: self.bytes.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Upload metadata exposed to clients; the bytes are served separately.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Base64 image data plus its mime type, as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub base64: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionTarget {
    #[default]
    Full,
    Top,
    Bottom,
}

impl fmt::Display for ExtractionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionTarget::Full => "full",
            ExtractionTarget::Top => "top",
            ExtractionTarget::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

/// Structured payload of an outfit analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitDescription {
    pub outfit: String,
}

/// Structured payload of a background enhancement call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedBackground {
    pub enhanced_background: String,
}

/// A `w:h` canvas ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    #[cfg(test)]
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::PORTRAIT
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StudioError::Validation(format!("Invalid aspect ratio '{}'", s));
        let (w, h) = s.trim().split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(AspectRatio { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = StudioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(value: AspectRatio) -> Self {
        value.to_string()
    }
}

/// Poster customization; only read by the poster export, never sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSettings {
    pub brand_name: String,
    pub brand_color: String,
    pub brand_font: String,
    pub brand_size: u32,
    pub banner_height: u32,
    pub banner_color: String,
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            brand_name: "Lamie".to_string(),
            brand_color: "#FFFFFF".to_string(),
            brand_font: presets::BRAND_FONTS[0].to_string(),
            brand_size: 48,
            banner_height: 48,
            banner_color: "#3B82F6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub aspect_ratio: AspectRatio,
    pub variation_count: usize,
    pub background: String,
    pub camera_angles: Vec<String>,
    pub brand: BrandSettings,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            variation_count: 9,
            background: String::new(),
            camera_angles: presets::DEFAULT_CAMERA_ANGLES
                .iter()
                .map(|a| a.to_string())
                .collect(),
            brand: BrandSettings::default(),
        }
    }
}

/// Partial update of [`GenerationOptions`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionsUpdate {
    pub aspect_ratio: Option<AspectRatio>,
    pub variation_count: Option<usize>,
    pub background: Option<String>,
    pub camera_angles: Option<Vec<String>>,
    pub brand: Option<BrandSettings>,
}

impl GenerationOptions {
    pub fn apply(&mut self, update: OptionsUpdate) -> Result<(), StudioError> {
        if let Some(ratio) = update.aspect_ratio {
            if !presets::SUPPORTED_ASPECT_RATIOS.contains(&ratio.to_string().as_str()) {
                return Err(StudioError::Validation(format!(
                    "Unsupported aspect ratio {}; expected one of {}",
                    ratio,
                    presets::SUPPORTED_ASPECT_RATIOS.join(", ")
                )));
            }
        }
        if let Some(count) = update.variation_count {
            if !presets::VARIATION_COUNTS.contains(&count) {
                return Err(StudioError::Validation(format!(
                    "Unsupported variation count {}; expected 3, 6 or 9",
                    count
                )));
            }
        }
        if let Some(angles) = &update.camera_angles {
            if angles.iter().any(|a| a.trim().is_empty()) {
                return Err(StudioError::Validation(
                    "Camera angle prompts must not be empty".to_string(),
                ));
            }
        }
        let count = update.variation_count.unwrap_or(self.variation_count);
        let available = update
            .camera_angles
            .as_ref()
            .map_or(self.camera_angles.len(), Vec::len);
        if available < count {
            return Err(StudioError::Validation(format!(
                "{} model images need {} camera angles, only {} given",
                count, count, available
            )));
        }
        if let Some(brand) = &update.brand {
            if !presets::BRAND_FONTS.contains(&brand.brand_font.as_str()) {
                return Err(StudioError::Validation(format!(
                    "Unknown brand font '{}'",
                    brand.brand_font
                )));
            }
        }

        if let Some(ratio) = update.aspect_ratio {
            self.aspect_ratio = ratio;
        }
        if let Some(count) = update.variation_count {
            self.variation_count = count;
        }
        if let Some(background) = update.background {
            self.background = background;
        }
        if let Some(angles) = update.camera_angles {
            self.camera_angles = angles;
        }
        if let Some(brand) = update.brand {
            self.brand = brand;
        }
        Ok(())
    }

    /// Angle prompts actually run: the configured list cut to the variation count.
    pub fn selected_angles(&self) -> Vec<String> {
        self.camera_angles
            .iter()
            .take(self.variation_count)
            .cloned()
            .collect()
    }

    pub fn effective_background(&self) -> String {
        if self.background.trim().is_empty() {
            presets::DEFAULT_BACKGROUND.to_string()
        } else {
            self.background.clone()
        }
    }
}

/// Inputs frozen at the moment generation starts. Later edits to the session
/// never reach a run that is already in flight.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub epoch: u64,
    pub model_image: Arc<UploadedImage>,
    pub product_image: Arc<UploadedImage>,
    pub outfit_description: String,
    pub background: String,
    pub aspect_ratio: AspectRatio,
    pub camera_angles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationImage {
    pub index: usize,
    pub camera_angle: String,
    pub image: ImagePayload,
}

/// Accumulator for one generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationResult {
    pub poster: Option<ImagePayload>,
    pub ad_copy: Option<String>,
    pub variations: Vec<VariationImage>,
    pub errors: Vec<String>,
    pub fatal_error: Option<String>,
    /// Brand overlay settings frozen with the run, for poster export.
    pub brand: Option<BrandSettings>,
    pub progress: String,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Analyzing,
    AnalysisFailed,
    AnalysisReady,
    Generating,
    Completed,
}

/// Read-only view of a session handed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct StudioSnapshot {
    pub session_id: Uuid,
    pub epoch: u64,
    pub stage: Stage,
    pub analyzing: bool,
    pub generating: bool,
    pub model_image: Option<ImageInfo>,
    pub product_image: Option<ImageInfo>,
    pub extraction_target: ExtractionTarget,
    pub outfit_description: String,
    pub outfit_description_stale: bool,
    pub analysis_error: Option<String>,
    pub options: GenerationOptions,
    pub result: GenerationResult,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_parses_and_round_trips_through_serde() {
        let ratio: AspectRatio = "4:5".parse().unwrap();
        assert_eq!(ratio, AspectRatio { width: 4, height: 5 });
        assert_eq!(serde_json::to_string(&ratio).unwrap(), "\"4:5\"");
        let back: AspectRatio = serde_json::from_str("\"16:9\"").unwrap();
        assert_eq!(back.to_string(), "16:9");
    }

    #[test]
    fn aspect_ratio_rejects_garbage() {
        assert!("square".parse::<AspectRatio>().is_err());
        assert!("0:1".parse::<AspectRatio>().is_err());
        assert!("1:".parse::<AspectRatio>().is_err());
        assert!(serde_json::from_str::<AspectRatio>("\"9x16\"").is_err());
    }

    #[test]
    fn selected_angles_truncates_to_count() {
        let mut options = GenerationOptions::default();
        options
            .apply(OptionsUpdate {
                variation_count: Some(3),
                ..Default::default()
            })
            .unwrap();
        let angles = options.selected_angles();
        assert_eq!(angles.len(), 3);
        assert_eq!(angles[0], presets::DEFAULT_CAMERA_ANGLES[0]);
        assert_eq!(angles[2], presets::DEFAULT_CAMERA_ANGLES[2]);
    }

    #[test]
    fn apply_rejects_unsupported_values_without_partial_update() {
        let mut options = GenerationOptions::default();
        let err = options
            .apply(OptionsUpdate {
                background: Some("beach".to_string()),
                variation_count: Some(4),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(options.background, "");
        assert_eq!(options.variation_count, 9);

        let err = options
            .apply(OptionsUpdate {
                aspect_ratio: Some(AspectRatio { width: 3, height: 2 }),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }

    #[test]
    fn angle_list_must_cover_variation_count() {
        let mut options = GenerationOptions::default();
        let err = options
            .apply(OptionsUpdate {
                camera_angles: Some(vec![]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(options.camera_angles.len(), 9);

        let four: Vec<String> = ["a", "b", "c", "d"].iter().map(|a| a.to_string()).collect();
        let err = options
            .apply(OptionsUpdate {
                camera_angles: Some(four.clone()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));

        options
            .apply(OptionsUpdate {
                variation_count: Some(3),
                camera_angles: Some(four),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(options.selected_angles(), vec!["a", "b", "c"]);

        let err = options
            .apply(OptionsUpdate {
                variation_count: Some(6),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(options.variation_count, 3);
    }

    #[test]
    fn empty_background_falls_back_to_default() {
        let mut options = GenerationOptions::default();
        assert_eq!(options.effective_background(), presets::DEFAULT_BACKGROUND);
        options.background = "rooftop at dusk".to_string();
        assert_eq!(options.effective_background(), "rooftop at dusk");
    }

    #[test]
    fn uploaded_image_carries_base64_payload() {
        let image = UploadedImage::new(
            "a.png".to_string(),
            "image/png".to_string(),
            Bytes::from_static(b"abc"),
            (1, 1),
        );
        assert_eq!(image.base64, "YWJj");
        assert_eq!(image.payload().base64, "YWJj");
        assert_eq!(image.payload().mime_type, "image/png");
        assert_eq!(image.info().size, 3);
    }
}
