//! Text recognition for pasted images.

use async_trait::async_trait;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::time::Duration;
use tokio::process::Command;

use super::ImagePayload;
use crate::utils::normalize_text;

/// Errors from the OCR collaborator
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// The OCR program could not be started
    #[error("OCR engine '{0}' not found; install it or set ocr.command")]
    EngineUnavailable(String),

    /// Pixel data does not match the image dimensions
    #[error("Invalid image data")]
    InvalidImage,

    /// The engine ran but reported an error
    #[error("OCR failed: {0}")]
    Failed(String),

    /// The engine produced no text
    #[error("No text recognized in image")]
    NoText,

    #[error("Could not encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts text from an image
#[async_trait]
pub trait OcrEngine: Send + Sync + std::fmt::Debug {
    /// Recognize text in `image`, normalized onto one line
    async fn recognize(&self, image: &ImagePayload) -> Result<String, OcrError>;
}

/// Composite the pixels onto a white page and encode them as PNG
pub fn encode_png(image: &ImagePayload) -> Result<Vec<u8>, OcrError> {
    if !image.is_well_formed() {
        return Err(OcrError::InvalidImage);
    }
    let width = u32::try_from(image.width).map_err(|_| OcrError::InvalidImage)?;
    let height = u32::try_from(image.height).map_err(|_| OcrError::InvalidImage)?;
    let pixels =
        RgbaImage::from_raw(width, height, image.rgba.clone()).ok_or(OcrError::InvalidImage)?;

    let mut page = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut page, &pixels, 0, 0);

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(page).to_rgb8())
        .write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

/// OCR through the `tesseract` command-line program
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: Option<String>,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Language pack passed as `-l`
    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &ImagePayload) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut file = tempfile::Builder::new()
            .prefix("bibhunt-ocr-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&png)?;
        file.flush()?;

        let mut command = Command::new(&self.command);
        command.arg(file.path()).arg("stdout").kill_on_drop(true);
        if let Some(ref language) = self.language {
            command.arg("-l").arg(language);
        }

        tracing::debug!(
            "Running {} on {}x{} image",
            self.command,
            image.width,
            image.height
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(OcrError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::EngineUnavailable(self.command.clone()))
            }
            Ok(result) => result?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(normalize_text(&stderr)));
        }

        let text = normalize_text(&String::from_utf8_lossy(&output.stdout));
        if text.is_empty() {
            return Err(OcrError::NoText);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_flattens_onto_white() {
        let image = ImagePayload {
            width: 2,
            height: 1,
            rgba: vec![0, 0, 0, 255, 0, 0, 0, 0],
        };
        let png = encode_png(&image).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_encode_rejects_bad_dimensions() {
        let empty = ImagePayload {
            width: 0,
            height: 1,
            rgba: Vec::new(),
        };
        assert!(matches!(encode_png(&empty), Err(OcrError::InvalidImage)));

        let short = ImagePayload {
            width: 2,
            height: 2,
            rgba: vec![0; 12],
        };
        assert!(matches!(encode_png(&short), Err(OcrError::InvalidImage)));
    }

    #[tokio::test]
    async fn test_missing_engine_reported() {
        let ocr = TesseractOcr::new("bibhunt-test-no-such-ocr-binary");
        let image = ImagePayload {
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        };
        let result = ocr.recognize(&image).await;
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }
}
