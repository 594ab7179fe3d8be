// src/services/image_processor.rs
use crate::errors::StudioError;
use crate::models::{AspectRatio, ImagePayload, UploadedImage};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, Rgb, Rgba, RgbaImage};

/// Padding colour the backend is told to replace with the requested scene.
pub const CHROMA_KEY: Rgb<u8> = Rgb([0, 255, 0]);
pub const CHROMA_KEY_HEX: &str = "#00FF00";

const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone)]
pub struct ImageProcessor {
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), StudioError> {
        let img = image::load_from_memory(data)
            .map_err(|e| StudioError::Validation(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        if width > self.max_dimension || height > self.max_dimension {
            return Err(StudioError::Validation(format!(
                "Image dimensions exceed {}x{}",
                self.max_dimension, self.max_dimension
            )));
        }

        Ok((width, height))
    }

    /// Turns raw upload bytes into an [`UploadedImage`], rejecting anything
    /// that is not a decodable image within the size limit.
    pub fn accept_upload(
        &self,
        filename: String,
        content_type: Option<String>,
        data: Bytes,
    ) -> Result<UploadedImage, StudioError> {
        if let Some(ct) = &content_type {
            if !ct.starts_with("image/") && ct != "application/octet-stream" {
                return Err(StudioError::Validation(format!(
                    "File is not an image ({})",
                    ct
                )));
            }
        }

        let format = image::guess_format(&data)
            .map_err(|e| StudioError::Validation(format!("Unrecognised image data: {}", e)))?;
        let dimensions = self.validate_image(&data)?;

        let mime_type = match content_type {
            Some(ct) if ct.starts_with("image/") => ct,
            _ => mime_for(format).to_string(),
        };

        Ok(UploadedImage::new(filename, mime_type, data, dimensions))
    }

    /// Letterboxes `data` onto a canvas of the requested ratio. The source is
    /// centred without scaling and every padding pixel is [`CHROMA_KEY`].
    pub fn letterbox(&self, data: &[u8], ratio: AspectRatio) -> Result<ImagePayload, StudioError> {
        let img = image::load_from_memory(data)
            .map_err(|e| StudioError::Preprocess(format!("Failed to load source image: {}", e)))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(StudioError::Preprocess("Source image is empty".to_string()));
        }
        let (canvas_width, canvas_height) = canvas_dimensions(width, height, ratio);

        // transparent source pixels blend into the key colour
        let [r, g, b] = CHROMA_KEY.0;
        let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([r, g, b, 255]));
        let x = (canvas_width - width) / 2;
        let y = (canvas_height - height) / 2;
        image::imageops::overlay(&mut canvas, &img.to_rgba8(), x as i64, y as i64);
        let canvas = DynamicImage::ImageRgba8(canvas).to_rgb8();

        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
            .encode(canvas.as_raw(), canvas_width, canvas_height, ColorType::Rgb8)
            .map_err(|e| StudioError::Preprocess(format!("Failed to encode canvas: {}", e)))?;

        Ok(ImagePayload {
            base64: general_purpose::STANDARD.encode(&output),
            mime_type: "image/jpeg".to_string(),
        })
    }
}

/// Smallest canvas of the given ratio that contains a `width` x `height`
/// image. Rounds up so the source is never cropped.
pub fn canvas_dimensions(width: u32, height: u32, ratio: AspectRatio) -> (u32, u32) {
    let (rw, rh) = (ratio.width as u64, ratio.height as u64);
    let (w, h) = (width as u64, height as u64);

    // w/h > rw/rh, compared without floats
    if w * rh > h * rw {
        let canvas_height = (w * rh).div_ceil(rw);
        (width, canvas_height as u32)
    } else {
        let canvas_width = (h * rw).div_ceil(rh);
        (canvas_width as u32, height)
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(s: &str) -> AspectRatio {
        s.parse().unwrap()
    }

    fn decode(payload: &ImagePayload) -> image::DynamicImage {
        let bytes = general_purpose::STANDARD.decode(&payload.base64).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn canvas_matches_ratio_and_contains_source() {
        let sizes = [(300, 400), (400, 300), (1000, 1000), (17, 911), (1920, 1080)];
        for r in ["9:16", "1:1", "4:5", "16:9", "3:7"] {
            let r = ratio(r);
            for (w, h) in sizes {
                let (cw, ch) = canvas_dimensions(w, h, r);
                assert!(cw >= w && ch >= h, "{}x{} cropped into {}x{} for {}", w, h, cw, ch, r);
                assert!(cw == w || ch == h, "canvas grew on both axes");
                let got = cw as f64 / ch as f64;
                let tolerance = 1.0 / ch.min(cw) as f64 + 1e-9;
                assert!(
                    (got - r.as_f64()).abs() <= tolerance * r.as_f64().max(1.0),
                    "{}x{} -> {}x{} is not {}",
                    w,
                    h,
                    cw,
                    ch,
                    r
                );
            }
        }
    }

    #[test]
    fn wide_source_grows_height_only() {
        assert_eq!(canvas_dimensions(1600, 900, ratio("1:1")), (1600, 1600));
        assert_eq!(canvas_dimensions(900, 1600, ratio("1:1")), (1600, 1600));
        assert_eq!(canvas_dimensions(900, 1600, ratio("9:16")), (900, 1600));
    }

    #[test]
    fn letterbox_pads_with_chroma_key_and_keeps_source_centred() {
        let processor = ImageProcessor::new(4096);
        let source = png_bytes(40, 20, [200, 30, 30]);

        let payload = processor.letterbox(&source, ratio("1:1")).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");

        let out = decode(&payload).to_rgb8();
        assert_eq!(out.dimensions(), (40, 40));

        // JPEG is lossy, so compare loosely
        let corner = out.get_pixel(1, 1);
        assert!(corner[0] < 40 && corner[1] > 215 && corner[2] < 40, "{:?}", corner);
        let centre = out.get_pixel(20, 20);
        assert!(centre[0] > 160 && centre[1] < 70, "{:?}", centre);
    }

    #[test]
    fn letterbox_keys_out_transparent_source_pixels() {
        let processor = ImageProcessor::new(4096);
        let mut source = RgbaImage::from_pixel(20, 40, Rgba([0, 0, 0, 0]));
        for y in 0..40 {
            for x in 10..20 {
                source.put_pixel(x, y, Rgba([20, 20, 220, 255]));
            }
        }
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(source)
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let payload = processor.letterbox(&png, ratio("1:1")).unwrap();
        let out = decode(&payload).to_rgb8();
        assert_eq!(out.dimensions(), (40, 40));

        let padding = out.get_pixel(2, 20);
        assert!(padding[0] < 40 && padding[1] > 215 && padding[2] < 40, "{:?}", padding);
        // left half of the source is fully transparent
        let transparent = out.get_pixel(13, 20);
        assert!(
            transparent[0] < 40 && transparent[1] > 215 && transparent[2] < 40,
            "{:?}",
            transparent
        );
        let opaque = out.get_pixel(26, 20);
        assert!(opaque[2] > 180 && opaque[1] < 70, "{:?}", opaque);
    }

    #[test]
    fn letterbox_rejects_undecodable_input() {
        let processor = ImageProcessor::new(4096);
        let err = processor.letterbox(b"not an image", ratio("9:16")).unwrap_err();
        assert!(matches!(err, StudioError::Preprocess(_)));
    }

    #[test]
    fn accept_upload_detects_mime_and_dimensions() {
        let processor = ImageProcessor::new(4096);
        let data = Bytes::from(png_bytes(8, 6, [1, 2, 3]));
        let upload = processor
            .accept_upload("a.png".to_string(), Some("application/octet-stream".to_string()), data)
            .unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!((upload.width, upload.height), (8, 6));
    }

    #[test]
    fn accept_upload_rejects_non_images_and_oversize() {
        let processor = ImageProcessor::new(16);
        let err = processor
            .accept_upload(
                "notes.txt".to_string(),
                Some("text/plain".to_string()),
                Bytes::from_static(b"hello"),
            )
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));

        let err = processor
            .accept_upload("big.png".to_string(), None, Bytes::from(png_bytes(32, 8, [0, 0, 0])))
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }
}
