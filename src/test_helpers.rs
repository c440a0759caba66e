//! Shared test utilities for the rabbit-diary test suite.
//!
//! Builds diary directories on disk and in-memory caches on top of them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! touch_day(tmp.path(), "2022-11-01", &[0, 5, 13]);
//! write_event(tmp.path(), "2022-11-01", 13, "carrots");
//!
//! let diary = mock_diary(&[tmp.path()]);
//! let day = find_day(&diary, "2022-11-01");
//! assert_eq!(day.image_count(), 3);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use image::{Rgb, RgbImage};

use crate::day::{DayCache, DaySettings};
use crate::diary::{DiaryCache, MonthBucket};
use crate::imaging::DiaryBackend;
use crate::imaging::backend::tests::MockBackend;

// =========================================================================
// Fixture setup
// =========================================================================

/// Settings with no cooldowns and tiny tiles, so every call rescans.
pub fn fast_settings() -> DaySettings {
    DaySettings {
        image_cooldown: Duration::ZERO,
        event_cooldown: Duration::ZERO,
        tile_width: 8,
        tile_height: 8,
    }
}

/// Create `<root>/<date>/` with an empty `rabbit-<date>-<h>.png` per hour.
///
/// The files are not valid PNGs; pair with [`MockBackend`] or use them for
/// listing-only checks.
pub fn touch_day(root: &Path, date: &str, hours: &[u32]) -> PathBuf {
    let dir = root.join(date);
    std::fs::create_dir_all(&dir).unwrap();
    for hour in hours {
        std::fs::write(dir.join(format!("rabbit-{date}-{hour}.png")), b"").unwrap();
    }
    dir
}

/// Create `<root>/<date>/` with a real solid-colour PNG per hour.
pub fn paint_day(root: &Path, date: &str, hours: &[u32]) -> PathBuf {
    let dir = root.join(date);
    std::fs::create_dir_all(&dir).unwrap();
    for hour in hours {
        let shade = (hour * 10) as u8;
        write_png(&dir.join(format!("rabbit-{date}-{hour}.png")), 48, 64, [shade, 80, 160]);
    }
    dir
}

pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .unwrap();
}

/// Write `<root>/<date>/event-<date>-<hour>.txt`.
pub fn write_event(root: &Path, date: &str, hour: u32, text: &str) {
    let dir = root.join(date);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("event-{date}-{hour}.txt")), text).unwrap();
}

pub fn set_modified(path: &Path, time: SystemTime) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// =========================================================================
// Cache construction
// =========================================================================

/// A diary over `roots` with a fresh [`MockBackend`] and no cooldowns.
pub fn mock_diary(roots: &[&Path]) -> DiaryCache {
    let backend: Arc<dyn DiaryBackend> = Arc::new(MockBackend::new());
    DiaryCache::new(
        roots.iter().map(|r| r.to_path_buf()).collect(),
        backend,
        fast_settings(),
        Duration::ZERO,
    )
}

/// A day at `<root>/<date>` backed by a fresh [`MockBackend`].
pub fn mock_day(root: &Path, date: &str) -> Arc<DayCache> {
    let backend: Arc<dyn DiaryBackend> = Arc::new(MockBackend::new());
    Arc::new(DayCache::new(date, root.join(date), backend, fast_settings()))
}

/// Month buckets built directly, bypassing a diary refresh.
///
/// `layout` lists `(month, [(date, hours)])` newest first.
pub fn buckets(root: &Path, layout: &[(&str, &[(&str, &[u32])])]) -> Vec<MonthBucket> {
    layout
        .iter()
        .map(|(month, days)| MonthBucket {
            month: month.to_string(),
            days: days
                .iter()
                .map(|(date, hours)| {
                    touch_day(root, date, hours);
                    mock_day(root, date)
                })
                .collect(),
        })
        .collect()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a day by date. Panics if not found.
pub fn find_day(diary: &DiaryCache, date: &str) -> Arc<DayCache> {
    diary.day(date).unwrap_or_else(|| {
        let dates: Vec<String> = diary
            .days_reversed()
            .iter()
            .map(|d| d.date().to_string())
            .collect();
        panic!("day '{date}' not found. Available: {dates:?}")
    })
}

/// Dates of the diary, newest first.
pub fn dates(diary: &DiaryCache) -> Vec<String> {
    diary
        .days_reversed()
        .iter()
        .map(|d| d.date().to_string())
        .collect()
}

/// `(month, [dates])` pairs of the cached month index.
pub fn month_shape(diary: &DiaryCache) -> Vec<(String, Vec<String>)> {
    diary
        .days_by_month_reversed()
        .iter()
        .map(|bucket| {
            (
                bucket.month.clone(),
                bucket.days.iter().map(|d| d.date().to_string()).collect(),
            )
        })
        .collect()
}
