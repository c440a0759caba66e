//! # Rabbit Diary
//!
//! A filesystem-backed hourly drawing diary. Each day is a directory holding
//! up to 24 drawings, one per hour, plus optional notes for notable hours.
//! The crate keeps an in-memory cache of the diary, composes a strip
//! thumbnail per day, and renders month-paginated HTML pages from a template,
//! either per request (live) or as a static site.
//!
//! # Architecture: Two-Level Cache
//!
//! ```text
//! DiaryCache  roots/  →  days by date + month index   (rescans directories)
//!   └── DayCache  YYYY-MM-DD/  →  24 hour slots      (rescans files)
//!         ├── drawings: PNG bytes + tile in the strip thumbnail
//!         └── notes: text per hour
//! ```
//!
//! Every level rescans the filesystem lazily, when it is read, and at most once
//! per cooldown period. Nothing watches the filesystem and nothing runs in the
//! background: a read after the cooldown sees new, changed, and deleted files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Day, month, drawing, and note file name conventions |
//! | [`day`] | One day's hour slots, notes, and strip thumbnail |
//! | [`diary`] | All days under the roots, grouped by month |
//! | [`imaging`] | Decoding, PNG encoding, and strip composition |
//! | [`template`] | Where page templates come from |
//! | [`render`] | Month-paginated page rendering shared by both targets |
//! | [`generate`] | Static site generation |
//! | [`config`] | `diary.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//! | [`cooldown`] | Minimum interval between rescans |
//!
//! # Design Decisions
//!
//! ## Pages Are Line-Based
//!
//! The template is plain HTML with `[PLACEHOLDER]` tokens and a
//! `<!--RABBIT DAY-->` marker line. The renderer walks it line by line, so a
//! designer can edit the page without touching Rust and the live page picks
//! up template edits on the next request.
//!
//! ## One Renderer, Two Targets
//!
//! The live page and the static site share [`render::render_lines`]. Only the
//! links differ, which [`render::RenderTarget`] decides: an image endpoint
//! and `?month=` queries live, relative file paths in the static site.

pub mod config;
pub mod cooldown;
pub mod day;
pub mod diary;
pub mod generate;
pub mod imaging;
mod lock;
pub mod naming;
pub mod output;
pub mod render;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
