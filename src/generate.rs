//! Static site generation.
//!
//! Renders one page per month plus a root page from a single template
//! directory, and links the diary itself into the site so drawings, notes and
//! strip thumbnails are served as plain files.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── index.html                 # Newest month (template rendered, path ".")
//! ├── style.css -> <template>/style.css   # every template child except index.html
//! ├── 2022-12/
//! │   └── index.html             # Month page (path "..")
//! ├── 2022-11/
//! │   └── index.html
//! └── rabbit-drawings -> <diary> # the diary directory itself
//! ```
//!
//! The target directory is deleted and rebuilt on every run. Symbolic links
//! inside it are removed, never followed. Editor backups (`*~`) in the
//! template directory are skipped.
//!
//! Before anything is deleted, every day directory gets its `thumbnail.png`
//! (existing ones are kept), so the links in the rendered pages resolve.

use crate::diary::DiaryCache;
use crate::render::{DRAWINGS_DIR, RenderTarget, render_lines};
use crate::template::{StaticTemplate, TemplateSource};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Template file name, also the name of every rendered page.
pub const INDEX_FILE: &str = "index.html";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Setup(String),
}

/// Validated input and output locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub diary_dir: PathBuf,
    pub template_dir: PathBuf,
    pub target_dir: PathBuf,
}

impl SiteLayout {
    /// Check the three locations and make them absolute.
    pub fn new(diary_dir: &Path, template_dir: &Path, target_dir: &Path) -> Result<Self, GenerateError> {
        let diary_dir = std::path::absolute(diary_dir)?;
        if !diary_dir.is_dir() {
            return Err(GenerateError::Setup(format!(
                "The rabbit diary is not a directory: {}",
                diary_dir.display()
            )));
        }

        let template_dir = std::path::absolute(template_dir)?;
        if !template_dir.is_dir() {
            return Err(GenerateError::Setup(format!(
                "The template source is not a directory: {}",
                template_dir.display()
            )));
        }
        if !template_dir.join(INDEX_FILE).is_file() {
            return Err(GenerateError::Setup(format!(
                "No HTML template file exists here: {}",
                template_dir.join(INDEX_FILE).display()
            )));
        }

        let target_dir = std::path::absolute(target_dir)?;
        if target_dir.is_file() {
            return Err(GenerateError::Setup(format!(
                "The target is a file: {}",
                target_dir.display()
            )));
        }

        Ok(Self {
            diary_dir,
            template_dir,
            target_dir,
        })
    }
}

/// What a generator run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub days: usize,
    pub thumbnails_created: usize,
    pub diary_size: u64,
    pub linked_assets: Vec<String>,
    pub months: Vec<String>,
    pub failed_months: Vec<String>,
}

/// Write `thumbnail.png` into every day directory that lacks one.
///
/// Returns the number of days and the number of thumbnails written.
pub fn materialize_thumbnails(diary: &DiaryCache) -> (usize, usize) {
    let days = diary.days_reversed();
    let created = days
        .par_iter()
        .filter(|day| day.create_thumbnail_file())
        .count();
    (days.len(), created)
}

/// Build the static site for `layout` from `diary`.
///
/// `diary` is expected to be rooted at `layout.diary_dir`.
pub fn generate(diary: &DiaryCache, layout: &SiteLayout) -> Result<GenerateSummary, GenerateError> {
    let (days, thumbnails_created) = materialize_thumbnails(diary);
    if diary.is_empty() {
        warn!(roots = ?diary.roots(), "The diary has no days, pages will be empty");
    }
    let diary_size = diary.size();
    info!(
        size_mb = diary_size / 1024 / 1024,
        days,
        thumbnails_created,
        "Rabbit diary loaded"
    );

    info!(target = %layout.target_dir.display(), "Deleting previous site");
    remove_recursively(&layout.target_dir).map_err(|e| {
        GenerateError::Setup(format!(
            "Failed to delete directory {}: {e}",
            layout.target_dir.display()
        ))
    })?;
    fs::create_dir_all(&layout.target_dir).map_err(|e| {
        GenerateError::Setup(format!(
            "Failed to create directory {}: {e}",
            layout.target_dir.display()
        ))
    })?;

    info!(
        source = %layout.template_dir.display(),
        target = %layout.target_dir.display(),
        "Linking template assets"
    );
    let linked_assets = link_template_children(&layout.template_dir, &layout.target_dir)?;

    let template = StaticTemplate::load(&layout.template_dir.join(INDEX_FILE))?
        .read_lines()?
        .unwrap_or_default();
    let buckets = diary.days_by_month_reversed();
    let months: Vec<String> = buckets.iter().map(|b| b.month.clone()).collect();
    info!(months = %months.join(", "), "Rendering month pages");

    let failed_months: Vec<String> = months
        .par_iter()
        .filter_map(|month| {
            let target = RenderTarget::static_page(Some(month));
            let lines = render_lines(&template, &buckets, Some(month), &target);
            let month_dir = layout.target_dir.join(month);
            match write_month_page(&month_dir, &lines) {
                Ok(()) => None,
                Err(e) => {
                    warn!(month = %month, directory = %month_dir.display(), error = %e, "Failed to create month page");
                    Some(month.clone())
                }
            }
        })
        .collect();

    let root_index = layout.target_dir.join(INDEX_FILE);
    if root_index.exists() {
        fs::remove_file(&root_index).map_err(|e| {
            GenerateError::Setup(format!(
                "Failed to ensure that file {} does not exist before creating it: {e}",
                root_index.display()
            ))
        })?;
    }
    let lines = render_lines(&template, &buckets, None, &RenderTarget::static_page(None));
    write_new_file(&root_index, &lines)?;

    symlink_dir(&layout.diary_dir, &layout.target_dir.join(DRAWINGS_DIR))?;
    info!(target = %layout.target_dir.display(), "Site generated");

    Ok(GenerateSummary {
        days,
        thumbnails_created,
        diary_size,
        linked_assets,
        months,
        failed_months,
    })
}

fn write_month_page(month_dir: &Path, lines: &[String]) -> io::Result<()> {
    fs::create_dir(month_dir)?;
    write_new_file(&month_dir.join(INDEX_FILE), lines)
}

/// Write lines to a file that must not exist yet, each line newline-terminated.
fn write_new_file(path: &Path, lines: &[String]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Link every child of `source` into `target`, except the template and backups.
fn link_template_children(source: &Path, target: &Path) -> io::Result<Vec<String>> {
    let mut linked = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(source)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with('~') || name == INDEX_FILE {
            continue;
        }
        let source_path = entry.path();
        let target_path = target.join(&name);
        if source_path.is_dir() {
            symlink_dir(&source_path, &target_path)?;
        } else {
            symlink_file(&source_path, &target_path)?;
        }
        linked.push(name);
    }
    Ok(linked)
}

/// Delete a path and everything below it. Symlinks are removed, not followed.
fn remove_recursively(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
    }
}

#[cfg(unix)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(unix)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}

#[cfg(windows)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<title>[CURRENT_MONTH_NAME]</title>\n\
                            <!--RABBIT DAY-->\n\
                            <img src=\"[THUMBNAIL_URL]\">\n\
                            <!--RABBIT DAY-->\n\
                            <a href=\"[PREVIOUS_RABBITS_MONTH]\">older</a>";

    struct Fixture {
        _tmp: TempDir,
        diary_dir: PathBuf,
        template_dir: PathBuf,
        target_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let diary_dir = tmp.path().join("diary");
        let template_dir = tmp.path().join("template");
        let target_dir = tmp.path().join("site");
        touch_day(&diary_dir, "2022-12-01", &[1]);
        touch_day(&diary_dir, "2022-11-30", &[2, 3]);
        fs::create_dir_all(&template_dir).unwrap();
        fs::write(template_dir.join(INDEX_FILE), TEMPLATE).unwrap();
        fs::write(template_dir.join("style.css"), "body {}").unwrap();
        fs::write(template_dir.join("style.css~"), "backup").unwrap();
        fs::create_dir(template_dir.join("fonts")).unwrap();
        Fixture {
            _tmp: tmp,
            diary_dir,
            template_dir,
            target_dir,
        }
    }

    fn layout(f: &Fixture) -> SiteLayout {
        SiteLayout::new(&f.diary_dir, &f.template_dir, &f.target_dir).unwrap()
    }

    // =========================================================================
    // Layout validation
    // =========================================================================

    #[test]
    fn layout_accepts_valid_locations() {
        let f = fixture();
        let layout = layout(&f);
        assert!(layout.diary_dir.is_absolute());
        assert_eq!(layout.target_dir, f.target_dir);
    }

    #[test]
    fn layout_rejects_missing_diary() {
        let f = fixture();
        let err = SiteLayout::new(&f.diary_dir.join("nope"), &f.template_dir, &f.target_dir).unwrap_err();
        assert!(matches!(err, GenerateError::Setup(_)));
    }

    #[test]
    fn layout_rejects_template_dir_without_index() {
        let f = fixture();
        fs::remove_file(f.template_dir.join(INDEX_FILE)).unwrap();
        let err = SiteLayout::new(&f.diary_dir, &f.template_dir, &f.target_dir).unwrap_err();
        assert!(err.to_string().contains("No HTML template file"));
    }

    #[test]
    fn layout_rejects_target_file() {
        let f = fixture();
        fs::write(&f.target_dir, "occupied").unwrap();
        let err = SiteLayout::new(&f.diary_dir, &f.template_dir, &f.target_dir).unwrap_err();
        assert!(err.to_string().starts_with("The target is a file"));
    }

    // =========================================================================
    // Generation
    // =========================================================================

    #[test]
    fn generates_month_and_root_pages() {
        let f = fixture();
        let diary = mock_diary(&[f.diary_dir.as_path()]);
        let summary = generate(&diary, &layout(&f)).unwrap();

        assert_eq!(summary.days, 2);
        assert_eq!(summary.thumbnails_created, 2);
        assert_eq!(summary.months, vec!["2022-12", "2022-11"]);
        assert!(summary.failed_months.is_empty());

        let root = fs::read_to_string(f.target_dir.join("index.html")).unwrap();
        assert_eq!(
            root,
            "<title>December 2022</title>\n\
             \n\
             \n\
             <img src=\"./rabbit-drawings/2022-12-01/thumbnail.png\">\n\n\
             <a href=\"./2022-11/\">older</a>\n"
        );

        let november = fs::read_to_string(f.target_dir.join("2022-11/index.html")).unwrap();
        assert!(november.starts_with("<title>November 2022</title>\n"));
        assert!(november.contains("../rabbit-drawings/2022-11-30/thumbnail.png"));
        assert!(november.ends_with("<a href=\"..\">older</a>\n"));
    }

    #[test]
    fn writes_day_thumbnails() {
        let f = fixture();
        let diary = mock_diary(&[f.diary_dir.as_path()]);
        generate(&diary, &layout(&f)).unwrap();

        assert!(f.diary_dir.join("2022-12-01/thumbnail.png").is_file());
        assert!(f.diary_dir.join("2022-11-30/thumbnail.png").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn links_assets_and_diary() {
        let f = fixture();
        let diary = mock_diary(&[f.diary_dir.as_path()]);
        let summary = generate(&diary, &layout(&f)).unwrap();

        assert_eq!(summary.linked_assets, vec!["fonts", "style.css"]);
        let css = f.target_dir.join("style.css");
        assert!(fs::symlink_metadata(&css).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(css).unwrap(), "body {}");
        assert!(!f.target_dir.join("style.css~").exists());
        assert!(f.target_dir.join("fonts").is_dir());

        let drawings = f.target_dir.join(DRAWINGS_DIR);
        assert_eq!(fs::read_link(&drawings).unwrap(), layout(&f).diary_dir);
        assert!(drawings.join("2022-12-01/rabbit-2022-12-01-1.png").is_file());
    }

    #[test]
    fn rerun_replaces_previous_site() {
        let f = fixture();
        let diary = mock_diary(&[f.diary_dir.as_path()]);
        generate(&diary, &layout(&f)).unwrap();
        fs::write(f.target_dir.join("stale.txt"), "old").unwrap();

        fs::remove_dir_all(f.diary_dir.join("2022-12-01")).unwrap();
        let summary = generate(&diary, &layout(&f)).unwrap();

        assert_eq!(summary.months, vec!["2022-11"]);
        assert!(!f.target_dir.join("stale.txt").exists());
        assert!(!f.target_dir.join("2022-12").exists());
        // The diary behind the old link survives the deletion
        assert!(f.diary_dir.join("2022-11-30").is_dir());
    }

    #[test]
    fn empty_diary_renders_root_only() {
        let f = fixture();
        fs::remove_dir_all(&f.diary_dir).unwrap();
        fs::create_dir(&f.diary_dir).unwrap();
        let diary = mock_diary(&[f.diary_dir.as_path()]);

        let summary = generate(&diary, &layout(&f)).unwrap();
        assert!(diary.is_empty());
        assert!(summary.months.is_empty());
        let root = fs::read_to_string(f.target_dir.join("index.html")).unwrap();
        assert!(root.starts_with("<title>No rabbits</title>\n"));
    }

    #[test]
    fn remove_recursively_ignores_missing_path() {
        let tmp = TempDir::new().unwrap();
        remove_recursively(&tmp.path().join("missing")).unwrap();
    }
}
