//! Filename parsing for the diary directory convention.
//!
//! A diary root contains one directory per calendar day, and each day holds up
//! to 24 hourly drawings plus optional per-hour notes:
//!
//! ```text
//! rabbits/
//! ├── 2022-11-01/
//! │   ├── rabbit-2022-11-01-0.png      # hour 0
//! │   ├── rabbit-2022-11-01-13.png     # hour 13
//! │   ├── event-2022-11-01-13.txt      # note for hour 13
//! │   └── thumbnail.png                # generated strip (static sites only)
//! └── old/                             # archive root, same layout
//!     └── 2021-03-14/
//! ```
//!
//! Every name is validated against its own day: a file whose date token does not
//! match the directory it lives in is ignored, as is any hour outside `0..=23`.

/// Number of hour slots in a day.
pub const HOURS_PER_DAY: u32 = 24;

/// Name of the composite strip written next to the hourly images.
pub const THUMBNAIL_FILE: &str = "thumbnail.png";

/// The two kinds of per-hour files found in a day directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourlyKind {
    /// `<anything>-YYYY-MM-DD-H.png`
    Image,
    /// `event-YYYY-MM-DD-H.txt`
    Event,
}

/// Date and hour tokens extracted from an hourly file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyName<'a> {
    pub date: &'a str,
    pub hour: u32,
}

/// Check for a fixed-width `YYYY-MM-DD` token.
///
/// Only the shape is checked: `2022-13-45` is accepted, matching how day
/// directories are discovered.
pub fn is_date_token(token: &str) -> bool {
    is_digit_pattern(token, &[4, 2, 2])
}

/// Check for a fixed-width `YYYY-MM` token.
pub fn is_month_token(token: &str) -> bool {
    is_digit_pattern(token, &[4, 2])
}

/// A directory name is a day name when it is exactly a date token.
pub fn is_day_name(name: &str) -> bool {
    is_date_token(name)
}

/// Month of a date: everything before the last dash (`2022-11-01` → `2022-11`).
pub fn month_of(date: &str) -> &str {
    date.rfind('-').map(|pos| &date[..pos]).unwrap_or(date)
}

/// Validate a user-supplied month selector.
///
/// Returns the selector when it has the `YYYY-MM` shape and a month number no
/// greater than 12, `None` otherwise. Callers fall back to the default month.
pub fn parse_month_selector(raw: &str) -> Option<&str> {
    if !is_month_token(raw) {
        return None;
    }
    let month: u32 = raw[5..].parse().ok()?;
    (month <= 12).then_some(raw)
}

/// Parse an hourly file name of the given kind.
///
/// - `rabbit-2022-11-01-5.png` → Image, date `2022-11-01`, hour 5
/// - `x-y-2022-11-01-05.png` → Image, hour 5 (any non-empty prefix)
/// - `event-2022-11-01-23.txt` → Event, hour 23
/// - `2022-11-01-5.png` → `None` (image prefix must not be empty)
/// - `rabbit-2022-11-01-123.png` → `None` (hour has at most two digits)
/// - `rabbit-2022-11-01-24.png` → `None` (hour out of range)
pub fn parse_hourly_name(name: &str, kind: HourlyKind) -> Option<HourlyName<'_>> {
    let stem = match kind {
        HourlyKind::Image => name.strip_suffix(".png")?,
        HourlyKind::Event => name.strip_suffix(".txt")?,
    };
    let (head, hour_token) = stem.rsplit_once('-')?;
    if hour_token.is_empty()
        || hour_token.len() > 2
        || !hour_token.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let hour: u32 = hour_token.parse().ok()?;
    if hour >= HOURS_PER_DAY {
        return None;
    }

    let date_start = head.len().checked_sub(10)?;
    let date = head.get(date_start..)?;
    if !is_date_token(date) {
        return None;
    }
    let prefix = &head[..date_start];
    let prefix_ok = match kind {
        HourlyKind::Image => prefix.len() > 1 && prefix.ends_with('-'),
        HourlyKind::Event => prefix == "event-",
    };
    prefix_ok.then_some(HourlyName { date, hour })
}

/// Canonical name of the note file for a day and hour.
pub fn event_file_name(date: &str, hour: u32) -> String {
    format!("event-{date}-{hour}.txt")
}

fn is_digit_pattern(token: &str, groups: &[usize]) -> bool {
    let expected_len = groups.iter().sum::<usize>() + groups.len() - 1;
    if token.len() != expected_len {
        return false;
    }
    let mut parts = token.split('-');
    groups.iter().all(|&len| {
        parts
            .next()
            .is_some_and(|part| part.len() == len && part.bytes().all(|b| b.is_ascii_digit()))
    }) && parts.next().is_none()
}
