//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! ## List
//!
//! ```text
//! 2022-11
//!     2022-11-02  1 image   no events
//!     2022-11-01  3 images  1 event
//! 2022-10
//!     2022-10-31  24 images  2 events
//!
//! 3 days, 28 images
//! ```
//!
//! ## Generate
//!
//! ```text
//! Diary: 3 days, 1 thumbnail created, 2 MB
//! Assets: main.css, scripts/
//! Pages
//!     index.html
//!     2022-11/index.html
//!     2022-10/index.html
//! Generated 2 month pages
//! ```

use crate::diary::MonthBucket;
use crate::generate::{GenerateSummary, INDEX_FILE};
use serde::Serialize;

/// One day as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRow {
    pub date: String,
    pub images: u32,
    pub events: u32,
}

/// Flatten the month index into rows, newest first.
pub fn day_rows(buckets: &[MonthBucket]) -> Vec<DayRow> {
    buckets
        .iter()
        .flat_map(|bucket| &bucket.days)
        .map(|day| DayRow {
            date: day.date().to_string(),
            images: day.image_count(),
            events: day.event_mask().count_ones(),
        })
        .collect()
}

fn plural(n: u32, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn events_label(n: u32) -> String {
    if n == 0 {
        "no events".to_string()
    } else {
        plural(n, "event", "events")
    }
}

/// Format the day listing grouped under month headers.
pub fn format_day_listing(buckets: &[MonthBucket]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut total_days = 0;
    let mut total_images = 0;

    for bucket in buckets {
        lines.push(bucket.month.clone());
        for row in day_rows(std::slice::from_ref(bucket)) {
            lines.push(format!(
                "    {}  {:<9} {}",
                row.date,
                plural(row.images, "image", "images"),
                events_label(row.events)
            ));
            total_days += 1;
            total_images += row.images;
        }
    }

    if total_days == 0 {
        lines.push("No diary days found".to_string());
    } else {
        lines.push(String::new());
        lines.push(format!(
            "{}, {}",
            plural(total_days, "day", "days"),
            plural(total_images, "image", "images")
        ));
    }
    lines
}

pub fn print_day_listing(buckets: &[MonthBucket]) {
    for line in format_day_listing(buckets) {
        println!("{}", line);
    }
}

/// Format the summary of a generator run.
pub fn format_generate_summary(summary: &GenerateSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Diary: {}, {} created, {} MB",
        plural(summary.days as u32, "day", "days"),
        plural(summary.thumbnails_created as u32, "thumbnail", "thumbnails"),
        summary.diary_size / 1024 / 1024
    )];

    if summary.linked_assets.is_empty() {
        lines.push("Assets: none".to_string());
    } else {
        lines.push(format!("Assets: {}", summary.linked_assets.join(", ")));
    }

    lines.push("Pages".to_string());
    lines.push(format!("    {INDEX_FILE}"));
    for month in &summary.months {
        if summary.failed_months.contains(month) {
            lines.push(format!("    {month}/{INDEX_FILE} (failed)"));
        } else {
            lines.push(format!("    {month}/{INDEX_FILE}"));
        }
    }

    let written = summary.months.len() - summary.failed_months.len();
    lines.push(format!(
        "Generated {}",
        plural(written as u32, "month page", "month pages")
    ));
    if !summary.failed_months.is_empty() {
        lines.push(format!(
            "Failed {}: {}",
            plural(summary.failed_months.len() as u32, "month page", "month pages"),
            summary.failed_months.join(", ")
        ));
    }
    lines
}

pub fn print_generate_summary(summary: &GenerateSummary) {
    for line in format_generate_summary(summary) {
        println!("{}", line);
    }
}
