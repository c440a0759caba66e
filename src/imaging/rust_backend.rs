//! Pure Rust raw-file reader.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode PNG | `image::ImageReader` (format guessed from content) |
//! | Encode PNG | `image::DynamicImage::write_to` with `ImageFormat::Png` |
//! | Read note | `std::fs::read_to_string` |

use super::backend::{BackendError, DiaryBackend};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Reader backed by the `image` crate's pure Rust decoders.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DiaryBackend for RustBackend {
    fn read_image(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to decode {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    fn read_text(&self, path: &Path) -> Result<String, BackendError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to encode PNG: {e}")))?;
    Ok(buffer.into_inner())
}
