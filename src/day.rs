//! One day of the diary: 24 hourly drawing slots, 24 note slots, and the
//! composite strip thumbnail, all backed by a single day directory.
//!
//! ## Refresh model
//!
//! Nothing is pushed into a [`DayCache`]; every accessor pulls. Reads go
//! through a cooldown gate (one per state): the first caller after the gate
//! opens rescans the directory while holding that state's lock, everyone else
//! gets the cached state immediately.
//!
//! | Accessor | Refreshes | Gate |
//! |---|---|---|
//! | [`image_data`](DayCache::image_data) | images | image cooldown |
//! | [`event`](DayCache::event), [`events`](DayCache::events) | events | event cooldown |
//! | [`thumbnail_data`](DayCache::thumbnail_data), [`event_mask`](DayCache::event_mask) | both | both |
//! | [`image_mask`](DayCache::image_mask), [`image_count`](DayCache::image_count) | nothing, lists the directory now | none |
//!
//! An image rescan keeps a slot whose file modification time is unchanged,
//! decodes new or modified files in parallel, and clears slots whose file is
//! gone. The strip is patched segment by segment and re-encoded afterwards.
//! Notes are read once and kept until their file disappears.

use crate::cooldown::Cooldown;
use crate::imaging::{DiaryBackend, StripCanvas, compose_tile, encode_png};
use crate::lock::mutex_lock;
use crate::naming::{self, HOURS_PER_DAY, HourlyKind, THUMBNAIL_FILE};
use image::RgbaImage;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

const HOURS: usize = HOURS_PER_DAY as usize;

/// Bit `h` is set when hour `h` is present. Hour 0 is the least significant bit.
pub type HourMask = u32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("The hour {0} is outside of the allowed range: 0-23")]
    InvalidHour(u32),
    #[error("There is no day with date '{0}'")]
    NoSuchDay(String),
    #[error("Day '{date}' does not have an hour {hour}")]
    NoSuchHour { date: String, hour: u32 },
}

impl LookupError {
    /// True for the "nothing there" variants, false for a rejected argument.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, LookupError::InvalidHour(_))
    }
}

/// Per-day tuning, shared by every day of a diary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySettings {
    pub image_cooldown: Duration,
    pub event_cooldown: Duration,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for DaySettings {
    fn default() -> Self {
        Self {
            image_cooldown: Duration::from_secs(60),
            event_cooldown: Duration::from_secs(60),
            tile_width: 96,
            tile_height: 128,
        }
    }
}

struct HourImage {
    data: Arc<[u8]>,
    modified: SystemTime,
}

struct ImageState {
    slots: [Option<HourImage>; HOURS],
    mask: HourMask,
    strip: StripCanvas,
    thumbnail: Arc<[u8]>,
    cooldown: Cooldown,
}

struct EventState {
    slots: [Option<Arc<str>>; HOURS],
    mask: HourMask,
    cooldown: Cooldown,
}

/// A matching hourly file found in the day directory.
#[derive(Debug)]
struct HourFile {
    hour: u32,
    name: String,
    path: PathBuf,
}

/// Outcome of looking at one image file during a rescan.
enum HourLoad {
    Unchanged,
    Loaded {
        tile: RgbaImage,
        data: Vec<u8>,
        modified: SystemTime,
    },
    Failed,
}

pub struct DayCache {
    date: String,
    directory: PathBuf,
    backend: Arc<dyn DiaryBackend>,
    settings: DaySettings,
    images: Mutex<ImageState>,
    events: Mutex<EventState>,
}

impl DayCache {
    /// An empty day. Nothing is read until the first accessor call.
    pub fn new(
        date: impl Into<String>,
        directory: impl Into<PathBuf>,
        backend: Arc<dyn DiaryBackend>,
        settings: DaySettings,
    ) -> Self {
        Self {
            date: date.into(),
            directory: directory.into(),
            backend,
            settings,
            images: Mutex::new(ImageState {
                slots: std::array::from_fn(|_| None),
                mask: 0,
                strip: StripCanvas::new(settings.tile_width, settings.tile_height),
                thumbnail: Arc::from(Vec::new()),
                cooldown: Cooldown::new(settings.image_cooldown),
            }),
            events: Mutex::new(EventState {
                slots: std::array::from_fn(|_| None),
                mask: 0,
                cooldown: Cooldown::new(settings.event_cooldown),
            }),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// `YYYY-MM` of this day.
    pub fn month(&self) -> &str {
        naming::month_of(&self.date)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn compare_date(&self, other: &DayCache) -> Ordering {
        self.date.cmp(&other.date)
    }

    pub fn refresh(&self) {
        self.refresh_images();
        self.refresh_events();
    }

    pub fn refresh_images(&self) {
        let mut state = mutex_lock(&self.images, "day.refresh_images");
        self.refresh_images_locked(&mut state);
    }

    pub fn refresh_events(&self) {
        let mut state = mutex_lock(&self.events, "day.refresh_events");
        self.refresh_events_locked(&mut state);
    }

    /// PNG bytes of the drawing for `hour`, if there is one.
    pub fn image_data(&self, hour: u32) -> Result<Option<Arc<[u8]>>, LookupError> {
        let slot = check_hour(hour)?;
        let mut state = mutex_lock(&self.images, "day.image_data");
        self.refresh_images_locked(&mut state);
        Ok(state.slots[slot].as_ref().map(|image| Arc::clone(&image.data)))
    }

    /// Note text for `hour`, if there is one.
    pub fn event(&self, hour: u32) -> Result<Option<Arc<str>>, LookupError> {
        let slot = check_hour(hour)?;
        let mut state = mutex_lock(&self.events, "day.event");
        self.refresh_events_locked(&mut state);
        Ok(state.slots[slot].clone())
    }

    /// All 24 note slots in hour order.
    pub fn events(&self) -> [Option<Arc<str>>; HOURS] {
        let mut state = mutex_lock(&self.events, "day.events");
        self.refresh_events_locked(&mut state);
        state.slots.clone()
    }

    /// Encoded strip thumbnail, after a full refresh.
    pub fn thumbnail_data(&self) -> Arc<[u8]> {
        self.refresh_events();
        let mut state = mutex_lock(&self.images, "day.thumbnail_data");
        self.refresh_images_locked(&mut state);
        Arc::clone(&state.thumbnail)
    }

    /// Cached note presence, after a full refresh.
    pub fn event_mask(&self) -> HourMask {
        self.refresh_images();
        let mut state = mutex_lock(&self.events, "day.event_mask");
        self.refresh_events_locked(&mut state);
        state.mask
    }

    /// Image presence straight from a directory listing, ignoring the cache.
    pub fn image_mask(&self) -> HourMask {
        let files = self.list_hourly(HourlyKind::Image);
        if files.is_empty() {
            debug!(date = %self.date, "No images listed for day");
        }
        files.iter().fold(0, |mask, file| mask | (1 << file.hour))
    }

    pub fn image_count(&self) -> u32 {
        self.image_mask().count_ones()
    }

    /// File name of each hour's drawing, straight from a directory listing.
    pub fn image_file_names(&self) -> [Option<String>; HOURS] {
        let mut names: [Option<String>; HOURS] = std::array::from_fn(|_| None);
        for file in self.list_hourly(HourlyKind::Image) {
            names[file.hour as usize] = Some(file.name);
        }
        names
    }

    /// Write `thumbnail.png` into the day directory unless one already exists.
    ///
    /// Returns whether a file was written. Write failures are logged.
    pub fn create_thumbnail_file(&self) -> bool {
        let path = self.directory.join(THUMBNAIL_FILE);
        if path.is_file() {
            return false;
        }
        self.refresh_events();
        let mut state = mutex_lock(&self.images, "day.create_thumbnail_file");
        self.refresh_images_locked(&mut state);

        info!(path = %path.display(), "Saving thumbnail");
        match state.strip.save(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save thumbnail");
                false
            }
        }
    }

    /// Estimated memory held by this day, in bytes.
    pub fn size(&self) -> u64 {
        let state = mutex_lock(&self.images, "day.size");
        let images: u64 = state
            .slots
            .iter()
            .flatten()
            .map(|image| image.data.len() as u64)
            .sum();
        let strip = self.settings.tile_width as u64 * self.settings.tile_height as u64 * 4 * 2;
        images + strip + 2 * self.date.len() as u64 + 100
    }

    // =========================================================================
    // Rescans
    // =========================================================================

    fn refresh_images_locked(&self, state: &mut ImageState) {
        if !state.cooldown.try_begin() {
            debug!(date = %self.date, "Image cooldown active, using cached hours");
            return;
        }

        let files = self.list_hourly(HourlyKind::Image);
        if files.is_empty() {
            warn!(directory = %self.directory.display(), "Could not fetch any images in day directory");
        }

        let known: Vec<Option<SystemTime>> = state
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|image| image.modified))
            .collect();
        let loads: Vec<(u32, HourLoad)> = files
            .par_iter()
            .map(|file| (file.hour, self.load_hour(file, known[file.hour as usize])))
            .collect();

        let mut present = [false; HOURS];
        let mut reloaded = 0;
        for (hour, load) in loads {
            let slot = hour as usize;
            match load {
                HourLoad::Unchanged => present[slot] = true,
                HourLoad::Loaded {
                    tile,
                    data,
                    modified,
                } => {
                    state.strip.place_tile(hour, &tile);
                    state.slots[slot] = Some(HourImage {
                        data: Arc::from(data),
                        modified,
                    });
                    present[slot] = true;
                    reloaded += 1;
                }
                HourLoad::Failed => {}
            }
        }

        let mut cleared = 0;
        for hour in 0..HOURS_PER_DAY {
            let slot = hour as usize;
            if !present[slot] && state.slots[slot].take().is_some() {
                state.strip.clear_hour(hour);
                cleared += 1;
            }
        }
        state.mask = mask_of(&present);

        match state.strip.encode_png() {
            Ok(bytes) => state.thumbnail = Arc::from(bytes),
            Err(e) => warn!(date = %self.date, error = %e, "Failed to encode day thumbnail"),
        }
        debug!(
            date = %self.date,
            images = state.mask.count_ones(),
            reloaded,
            cleared,
            "Refreshed day images"
        );
    }

    fn load_hour(&self, file: &HourFile, known: Option<SystemTime>) -> HourLoad {
        let modified = match fs::metadata(&file.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "Failed to read image timestamp");
                return HourLoad::Failed;
            }
        };
        if known == Some(modified) {
            return HourLoad::Unchanged;
        }

        let image = match self.backend.read_image(&file.path) {
            Ok(image) => image,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "Failed to read image");
                return HourLoad::Failed;
            }
        };
        let data = match encode_png(&image) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "Failed to re-encode image");
                return HourLoad::Failed;
            }
        };
        let tile = compose_tile(&image, self.settings.tile_width, self.settings.tile_height);
        HourLoad::Loaded {
            tile,
            data,
            modified,
        }
    }

    fn refresh_events_locked(&self, state: &mut EventState) {
        if !state.cooldown.try_begin() {
            debug!(date = %self.date, "Event cooldown active, using cached notes");
            return;
        }

        let files = self.list_hourly(HourlyKind::Event);
        let loaded: Vec<(u32, Option<String>)> = files
            .par_iter()
            .filter(|file| state.slots[file.hour as usize].is_none())
            .map(|file| match self.backend.read_text(&file.path) {
                Ok(text) => (file.hour, Some(text)),
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to read event");
                    (file.hour, None)
                }
            })
            .collect();

        for (hour, text) in loaded {
            if let Some(text) = text {
                state.slots[hour as usize] = Some(Arc::from(text));
            }
        }

        let mut listed = [false; HOURS];
        for file in &files {
            listed[file.hour as usize] = true;
        }
        for (slot, listed) in state.slots.iter_mut().zip(listed) {
            if !listed {
                *slot = None;
            }
        }

        let populated: Vec<bool> = state.slots.iter().map(Option::is_some).collect();
        state.mask = mask_of(&populated);
        debug!(date = %self.date, events = state.mask.count_ones(), "Refreshed day events");
    }

    /// List matching files of one kind, one per hour, sorted by name.
    ///
    /// When two files claim the same hour the first name wins.
    fn list_hourly(&self, kind: HourlyKind) -> Vec<HourFile> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(directory = %self.directory.display(), error = %e, "Failed to list day directory");
                return Vec::new();
            }
        };

        let mut files: Vec<HourFile> = entries
            .filter_map(|e| e.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let parsed = naming::parse_hourly_name(&name, kind)?;
                if parsed.date != self.date {
                    warn!(file = %name, date = %self.date, "Skipping file dated for another day");
                    return None;
                }
                let hour = parsed.hour;
                let path = entry.path();
                path.is_file().then_some(HourFile { hour, name, path })
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let mut seen = [false; HOURS];
        files.retain(|file| {
            let slot = file.hour as usize;
            if seen[slot] {
                warn!(file = %file.name, hour = file.hour, "Ignoring second file for the same hour");
                return false;
            }
            seen[slot] = true;
            true
        });
        files
    }
}

fn check_hour(hour: u32) -> Result<usize, LookupError> {
    if hour >= HOURS_PER_DAY {
        return Err(LookupError::InvalidHour(hour));
    }
    Ok(hour as usize)
}

fn mask_of(present: &[bool]) -> HourMask {
    present
        .iter()
        .enumerate()
        .filter(|(_, present)| **present)
        .fold(0, |mask, (hour, _)| mask | (1 << hour))
}
