//! Raw-file reader trait and shared types.
//!
//! The [`DiaryBackend`] trait is the single seam between the caches and the
//! disk contents of a day directory: decode an hourly drawing, read an hourly
//! note. Directory listings and modification times stay with the caches.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests substitute the
//! [`MockBackend`](tests::MockBackend), which records every read.

use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for raw-file readers.
///
/// Implementations are shared by every day of a diary and called from rayon
/// workers, hence the `Send + Sync` bound.
pub trait DiaryBackend: Send + Sync {
    /// Decode the image at `path`.
    fn read_image(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Read the text note at `path`.
    fn read_text(&self, path: &Path) -> Result<String, BackendError>;
}
