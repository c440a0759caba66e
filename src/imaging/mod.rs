//! Image handling for the diary, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode drawing** | `image::ImageReader` |
//! | **Read note** | `std::fs::read_to_string` |
//! | **Tile fit** | centered crop + `imageops::resize` (`CatmullRom`) |
//! | **Strip encode** | `image` PNG encoder |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for tile geometry (unit testable)
//! - **Backend**: [`DiaryBackend`] trait + [`RustBackend`]
//! - **Strip**: [`StripCanvas`], the per-day composite thumbnail

pub mod backend;
pub mod calculations;
pub mod rust_backend;
pub mod strip;

pub use backend::{BackendError, DiaryBackend};
pub use rust_backend::{RustBackend, encode_png};
pub use strip::{MAX_TILE_SIDE, StripCanvas, compose_tile};
