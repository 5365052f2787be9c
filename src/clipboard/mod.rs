//! Clipboard access and paste classification.
//!
//! A paste is resolved once into a [`PastePayload`]: text goes straight into
//! the editor, an image is handed to an [`OcrEngine`] first.

mod ocr;

pub use ocr::{encode_png, OcrEngine, OcrError, TesseractOcr};

/// Raw RGBA image taken from the clipboard
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub width: usize,
    pub height: usize,
    /// Row-major RGBA, 4 bytes per pixel
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl ImagePayload {
    /// Whether the pixel buffer matches the stated dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self
                .width
                .checked_mul(self.height)
                .and_then(|px| px.checked_mul(4))
                == Some(self.rgba.len())
    }
}

/// What a paste event carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PastePayload {
    Text(String),
    Image(ImagePayload),
}

impl PastePayload {
    /// Pick the payload from what the clipboard offered.
    ///
    /// An image wins over text; empty text counts as nothing.
    pub fn classify(image: Option<ImagePayload>, text: Option<String>) -> Option<Self> {
        if let Some(image) = image.filter(ImagePayload::is_well_formed) {
            return Some(PastePayload::Image(image));
        }
        text.filter(|t| !t.is_empty()).map(PastePayload::Text)
    }
}

/// Errors from the system clipboard
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// No clipboard could be opened (no display server, sandbox, ...)
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// Clipboard holds neither an image nor text
    #[error("Clipboard is empty")]
    Empty,

    #[error("Clipboard error: {0}")]
    Other(String),
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        match err {
            arboard::Error::ContentNotAvailable => ClipboardError::Empty,
            arboard::Error::ClipboardNotSupported => ClipboardError::Unavailable(err.to_string()),
            other => ClipboardError::Other(other.to_string()),
        }
    }
}

/// System clipboard reader and writer
pub struct ClipboardClassifier {
    clipboard: arboard::Clipboard,
}

impl std::fmt::Debug for ClipboardClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardClassifier").finish_non_exhaustive()
    }
}

impl ClipboardClassifier {
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { clipboard })
    }

    /// Read the clipboard and classify its content
    pub fn read(&mut self) -> Result<PastePayload, ClipboardError> {
        let image = match self.clipboard.get_image() {
            Ok(data) => Some(ImagePayload {
                width: data.width,
                height: data.height,
                rgba: data.bytes.into_owned(),
            }),
            Err(e) => {
                tracing::trace!("No clipboard image: {}", e);
                None
            }
        };
        let text = self.clipboard.get_text().ok();

        PastePayload::classify(image, text).ok_or(ClipboardError::Empty)
    }

    /// Put text on the clipboard
    pub fn copy_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard.set_text(text.to_string())?;
        Ok(())
    }
}
