//! Month-paginated page rendering.
//!
//! One template drives both the live page and every page of the static site.
//! The template is processed line by line; the output always has exactly as
//! many lines as the template.
//!
//! ## Template format
//!
//! ```html
//! <h1>[CURRENT_MONTH_NAME] ([CURRENT_RABBITS_COUNT])</h1>
//! <PREVIOUS_RABBITS_TAG href="[PREVIOUS_RABBITS_MONTH]">[PREVIOUS_MONTH_NAME]</PREVIOUS_RABBITS_TAG>
//! <!--RABBIT DAY-->
//! <section><img src="[THUMBNAIL_URL]"><h2>[NAME]</h2>[LINKS]</section>
//! <!--RABBIT DAY-->
//! ```
//!
//! A line ending with the day marker opens a day block; the next such line
//! closes it. Lines inside the block are repeated once per day of the active
//! month, with `[NAME]`, `[THUMBNAIL_URL]` and `[LINKS]` filled in.
//!
//! ## Page placeholders
//!
//! | Token | Value |
//! |---|---|
//! | `[PATH_TO_RABBIT_ROOT]` | relative path to the site root |
//! | `[CURRENT_MONTH_NAME]` | e.g. `November 2022`, or `No rabbits` |
//! | `[NEXT_MONTH_NAME]` | newer neighbour, or `No newer rabbits` |
//! | `[PREVIOUS_MONTH_NAME]` | older neighbour, or `No older rabbits` |
//! | `[CURRENT_RABBITS_COUNT]` | drawings in the active month |
//! | `[NEXT_RABBITS_COUNT]` | drawings in all newer months |
//! | `[PREVIOUS_RABBITS_COUNT]` | drawings in all older months |
//! | `NEXT_RABBITS_TAG`, `PREVIOUS_RABBITS_TAG` | `a` when the count is non-zero, else `span` |
//! | `[NEXT_RABBITS_MONTH]`, `[PREVIOUS_RABBITS_MONTH]` | link to the neighbour month |

use crate::day::DayCache;
use crate::diary::{DiaryCache, MonthBucket};
use crate::naming::{self, HOURS_PER_DAY, THUMBNAIL_FILE};
use crate::template::TemplateSource;
use chrono::Month;
use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

/// Opens and closes a day block.
pub const DAY_MARKER: &str = "<!--RABBIT DAY-->";

/// Directory name under which a static site exposes the diary.
pub const DRAWINGS_DIR: &str = "rabbit-drawings";

/// A template that is missing or cannot be read is reported the same way.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No rabbit HTML file present")]
    TemplateNotFound,
}

/// Where rendered links point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Served per request; drawings come from an image endpoint and months are
    /// selected with a `?month=` query.
    Live { endpoint: String },
    /// A file of the static site, `path_to_root` away from the site root.
    Static { path_to_root: String },
}

impl RenderTarget {
    pub fn live(endpoint: impl Into<String>) -> Self {
        RenderTarget::Live {
            endpoint: endpoint.into(),
        }
    }

    /// Static root page for `None`, a month page one level down otherwise.
    pub fn static_page(month: Option<&str>) -> Self {
        let path_to_root = if month.is_some() { ".." } else { "." };
        RenderTarget::Static {
            path_to_root: path_to_root.to_string(),
        }
    }

    fn path_to_root(&self) -> &str {
        match self {
            RenderTarget::Live { .. } => ".",
            RenderTarget::Static { path_to_root } => path_to_root,
        }
    }

    /// Link to the default (newest) page.
    fn root_link(&self) -> String {
        match self {
            RenderTarget::Live { .. } => String::new(),
            RenderTarget::Static { path_to_root } => path_to_root.clone(),
        }
    }

    fn month_link(&self, month: &str) -> String {
        match self {
            RenderTarget::Live { .. } => format!("?month={month}"),
            RenderTarget::Static { path_to_root } => format!("{path_to_root}/{month}/"),
        }
    }

    fn day_url(&self, date: &str) -> String {
        match self {
            RenderTarget::Live { endpoint } => format!("{endpoint}/{date}"),
            RenderTarget::Static { path_to_root } => {
                format!("{path_to_root}/{DRAWINGS_DIR}/{date}")
            }
        }
    }

    /// The 24 hour cells of one day.
    fn links(&self, day: &DayCache, day_url: &str) -> String {
        match self {
            RenderTarget::Live { .. } => live_links(day.image_mask(), day_url),
            RenderTarget::Static { .. } => static_links(day, day_url),
        }
    }
}

fn live_links(image_mask: u32, day_url: &str) -> String {
    (0..HOURS_PER_DAY)
        .map(|hour| {
            if image_mask & (1 << hour) != 0 {
                format!(r#"<a class="rabbit-link" href="{day_url}/{hour}" target="_blank"></a>"#)
            } else {
                r#"<div class="rabbit-link"></div>"#.to_string()
            }
        })
        .collect()
}

fn static_links(day: &DayCache, day_url: &str) -> String {
    let images = day.image_file_names();
    let events = day.events();
    images
        .iter()
        .zip(events.iter())
        .enumerate()
        .map(|(hour, (image, event))| {
            let mut content = Vec::new();
            if let Some(event) = event {
                let event_url = format!(
                    "{day_url}/{}",
                    naming::event_file_name(day.date(), hour as u32)
                );
                content.push(format!(
                    r#"<a href="{event_url}" class="event-link" title="{}">Note</a>"#,
                    escape_attribute(event)
                ));
            }
            if let Some(file_name) = image {
                let image_link = format!(r#"<a href="{day_url}/{file_name}"></a>"#);
                // Links cannot nest, so the note sits between two image links
                if !content.is_empty() {
                    content.insert(0, image_link.clone());
                }
                content.push(image_link);
            }
            let class = if content.is_empty() {
                r#" class="inactive""#
            } else {
                ""
            };
            format!("<div{class}>{}</div>", content.concat())
        })
        .collect()
}

fn escape_attribute(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `2022-11` → `November 2022`. Unknown month numbers render as `???`.
pub fn month_display_name(month: &str) -> String {
    let (year, number) = month.split_once('-').unwrap_or((month, ""));
    let name = number
        .parse::<u8>()
        .ok()
        .and_then(|n| Month::try_from(n).ok())
        .map(|m| m.name())
        .unwrap_or("???");
    format!("{name} {year}")
}

// ============================================================================
// Month window
// ============================================================================

/// Indices of the active month and its neighbours within the month buckets.
///
/// Buckets are newest first, so "newer" means a smaller index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub current: Option<usize>,
    pub newer: Option<usize>,
    pub older: usize,
}

impl MonthWindow {
    /// Locate the requested month, or the newest month when none is requested.
    ///
    /// A requested month without days still gets neighbours: the closest newer
    /// and older months that do have days.
    pub fn resolve(buckets: &[MonthBucket], requested: Option<&str>) -> Self {
        let current = match requested {
            None => (!buckets.is_empty()).then_some(0),
            Some(month) => buckets.iter().position(|b| b.month == month),
        };
        let newer = match (current, requested) {
            (Some(index), _) => index.checked_sub(1),
            (None, Some(month)) => buckets.iter().rposition(|b| b.month.as_str() > month),
            (None, None) => None,
        };
        let older = match (current, newer) {
            (Some(index), _) => index + 1,
            (None, Some(index)) => index + 1,
            (None, None) => 0,
        };
        Self {
            current,
            newer,
            older,
        }
    }
}

/// Placeholder values for one page, in replacement order.
pub fn page_values(
    buckets: &[MonthBucket],
    window: MonthWindow,
    target: &RenderTarget,
) -> Vec<(&'static str, String)> {
    let month_name = |index: Option<usize>, none: &str| {
        index
            .and_then(|i| buckets.get(i))
            .map(|b| month_display_name(&b.month))
            .unwrap_or_else(|| none.to_string())
    };
    let count = |range: &[MonthBucket]| -> u32 { range.par_iter().map(|b| b.image_count()).sum() };
    let tag = |count: u32| if count == 0 { "span" } else { "a" };

    let older_count = count(buckets.get(window.older..).unwrap_or(&[]));
    let current_count = count(window.current.and_then(|i| buckets.get(i..=i)).unwrap_or(&[]));
    let newer_count = count(window.newer.map(|i| &buckets[..=i]).unwrap_or(&[]));

    let older_link = match buckets.get(window.older) {
        Some(bucket) => target.month_link(&bucket.month),
        None => target.root_link(),
    };
    let newer_link = match window.newer {
        Some(index) if index > 0 => target.month_link(&buckets[index].month),
        _ => target.root_link(),
    };

    vec![
        ("[PATH_TO_RABBIT_ROOT]", target.path_to_root().to_string()),
        ("[NEXT_MONTH_NAME]", month_name(window.newer, "No newer rabbits")),
        ("[CURRENT_MONTH_NAME]", month_name(window.current, "No rabbits")),
        ("[PREVIOUS_MONTH_NAME]", month_name(Some(window.older), "No older rabbits")),
        ("[PREVIOUS_RABBITS_COUNT]", older_count.to_string()),
        ("[CURRENT_RABBITS_COUNT]", current_count.to_string()),
        ("[NEXT_RABBITS_COUNT]", newer_count.to_string()),
        ("PREVIOUS_RABBITS_TAG", tag(older_count).to_string()),
        ("NEXT_RABBITS_TAG", tag(newer_count).to_string()),
        ("[PREVIOUS_RABBITS_MONTH]", older_link),
        ("[NEXT_RABBITS_MONTH]", newer_link),
    ]
}

// ============================================================================
// Line transform
// ============================================================================

enum LineState {
    Literal,
    /// Inside a day block, accumulating its lines.
    Capturing(String),
}

struct Page<'a> {
    values: Vec<(&'static str, String)>,
    days: &'a [std::sync::Arc<DayCache>],
    target: &'a RenderTarget,
}

impl Page<'_> {
    fn substitute(&self, line: &str) -> String {
        self.values
            .iter()
            .fold(line.to_string(), |text, (token, value)| text.replace(token, value))
    }

    fn expand_days(&self, day_template: &str) -> String {
        self.days
            .par_iter()
            .map(|day| self.expand_day(day, day_template))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expand_day(&self, day: &DayCache, day_template: &str) -> String {
        let day_url = self.target.day_url(day.date());
        day_template
            .replace("[NAME]", day.date())
            .replace("[THUMBNAIL_URL]", &format!("{day_url}/{THUMBNAIL_FILE}"))
            .replace("[LINKS]", &self.target.links(day, &day_url))
    }

    fn step(&self, state: LineState, line: &str) -> (LineState, String) {
        let is_marker = line.ends_with(DAY_MARKER);
        match state {
            LineState::Literal if is_marker => (LineState::Capturing(String::new()), String::new()),
            LineState::Literal => (LineState::Literal, self.substitute(line)),
            LineState::Capturing(block) if is_marker => (LineState::Literal, self.expand_days(&block)),
            LineState::Capturing(mut block) => {
                block.push_str(line);
                block.push('\n');
                (LineState::Capturing(block), String::new())
            }
        }
    }
}

/// Render template lines for one month of the given buckets.
///
/// `month` selects the active month; `None` means the newest one.
pub fn render_lines(
    template: &[String],
    buckets: &[MonthBucket],
    month: Option<&str>,
    target: &RenderTarget,
) -> Vec<String> {
    let window = MonthWindow::resolve(buckets, month);
    let page = Page {
        values: page_values(buckets, window, target),
        days: window
            .current
            .map(|i| buckets[i].days.as_slice())
            .unwrap_or(&[]),
        target,
    };

    let mut state = LineState::Literal;
    template
        .iter()
        .map(|line| {
            let (next, output) = page.step(std::mem::replace(&mut state, LineState::Literal), line);
            state = next;
            output
        })
        .collect()
}

/// Render the page for `month` from the diary's month index.
///
/// The diary is refreshed first (subject to its cooldown).
pub fn render_index_page(
    source: &dyn TemplateSource,
    diary: &DiaryCache,
    month: Option<&str>,
    target: &RenderTarget,
) -> Result<Vec<String>, RenderError> {
    let template = match source.read_lines() {
        Ok(Some(template)) => template,
        Ok(None) => return Err(RenderError::TemplateNotFound),
        Err(e) => {
            warn!(error = %e, "Failed to read page template");
            return Err(RenderError::TemplateNotFound);
        }
    };
    diary.refresh();
    let buckets = diary.days_by_month_reversed();
    Ok(render_lines(&template, &buckets, month, target))
}
