//! Horizontal hour strip: 24 tiles side by side, one per hour of the day.
//!
//! Each present hour's drawing is cropped to the tile aspect ratio around its
//! center and resampled into its segment. Absent hours stay fully transparent.

use super::backend::BackendError;
use super::calculations::{centered_offset, cover_scale, intermediate_dimensions, segment_x};
use super::rust_backend::encode_png;
use crate::naming::HOURS_PER_DAY;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Largest accepted tile side, in pixels.
pub const MAX_TILE_SIDE: u32 = 4096;

/// Fit one drawing into a `tile_width x tile_height` tile.
///
/// The source is placed 1:1 on a black intermediate canvas of the tile's aspect
/// ratio (cropping whatever overflows), then that canvas is resampled with
/// Catmull-Rom to the exact tile size.
pub fn compose_tile(source: &DynamicImage, tile_width: u32, tile_height: u32) -> RgbaImage {
    let source_dims = (source.width().max(1), source.height().max(1));
    let tile = (tile_width, tile_height);
    let scale = cover_scale(source_dims, tile);
    let (inter_w, inter_h) = intermediate_dimensions(tile, scale);

    let mut intermediate = RgbaImage::from_pixel(inter_w, inter_h, OPAQUE_BLACK);
    let (x, y) = centered_offset((inter_w, inter_h), source_dims);
    imageops::overlay(&mut intermediate, &source.to_rgba8(), x, y);

    imageops::resize(&intermediate, tile_width, tile_height, FilterType::CatmullRom)
}

/// The composite canvas for one day.
pub struct StripCanvas {
    canvas: RgbaImage,
    tile_width: u32,
    tile_height: u32,
}

impl StripCanvas {
    /// A fully transparent strip of `24 * tile_width x tile_height`.
    ///
    /// Tile sides are expected to be at most [`MAX_TILE_SIDE`].
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(tile_width * HOURS_PER_DAY, tile_height, TRANSPARENT),
            tile_width,
            tile_height,
        }
    }

    /// Reset an hour's segment to transparent.
    pub fn clear_hour(&mut self, hour: u32) {
        let blank = RgbaImage::from_pixel(self.tile_width, self.tile_height, TRANSPARENT);
        self.place_tile(hour, &blank);
    }

    /// Copy an already composed tile into an hour's segment, replacing it.
    pub fn place_tile(&mut self, hour: u32, tile: &RgbaImage) {
        if hour >= HOURS_PER_DAY {
            return;
        }
        let x = segment_x(hour, self.tile_width);
        imageops::replace(&mut self.canvas, tile, x as i64, 0);
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, BackendError> {
        encode_png(&DynamicImage::ImageRgba8(self.canvas.clone()))
    }

    pub fn save(&self, path: &Path) -> Result<(), BackendError> {
        self.canvas
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                ))
            })
    }
}
