//! Pure calculation functions for strip tile geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! A source drawing is fitted into a tile in two steps: it is first cropped
//! (centered) onto an intermediate canvas with the tile's aspect ratio, then
//! that canvas is resampled to the tile size.

/// Scale factor that makes the source cover the whole tile.
///
/// The larger of the two axis ratios wins, so one axis matches the tile exactly
/// and the other overflows and gets cropped.
///
/// # Examples
/// ```
/// # use rabbit_diary::imaging::calculations::cover_scale;
/// // 192x256 source into a 96x128 tile: exactly half size
/// assert_eq!(cover_scale((192, 256), (96, 128)), 0.5);
///
/// // A wide source is limited by its height
/// assert_eq!(cover_scale((400, 100), (96, 128)), 1.28);
/// ```
pub fn cover_scale(source: (u32, u32), tile: (u32, u32)) -> f64 {
    let (src_w, src_h) = source;
    let (tile_w, tile_h) = tile;
    let scale_x = tile_w as f64 / src_w as f64;
    let scale_y = tile_h as f64 / src_h as f64;
    scale_x.max(scale_y)
}

/// Size of the intermediate canvas: the tile size divided by the scale,
/// truncated, never smaller than 1x1.
pub fn intermediate_dimensions(tile: (u32, u32), scale: f64) -> (u32, u32) {
    let (tile_w, tile_h) = tile;
    let width = (tile_w as f64 / scale) as u32;
    let height = (tile_h as f64 / scale) as u32;
    (width.max(1), height.max(1))
}

/// Offset that centers the source on the intermediate canvas.
///
/// Negative when the source is larger (the overflow is cropped evenly on both
/// sides). Integer division truncates toward zero.
pub fn centered_offset(canvas: (u32, u32), source: (u32, u32)) -> (i64, i64) {
    let x = (canvas.0 as i64 - source.0 as i64) / 2;
    let y = (canvas.1 as i64 - source.1 as i64) / 2;
    (x, y)
}

/// Left edge of the strip segment for an hour.
pub fn segment_x(hour: u32, tile_width: u32) -> u32 {
    hour * tile_width
}
