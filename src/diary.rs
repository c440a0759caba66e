//! The diary: every day directory under an ordered list of roots.
//!
//! Roots are unioned. The live page pairs each active root with its `old`
//! archive; the static generator uses a single root. When the same date exists
//! under two roots the first root listed wins.
//!
//! ## Structure
//!
//! ```text
//! DiaryCache
//! ├── days: DashMap<date, Arc<DayCache>>      lock-free lookups
//! └── by_month: RwLock<Arc<Vec<MonthBucket>>> rebuilt only when the day set changes
//!     ├── MonthBucket { month: "2022-12", days: [2022-12-24, 2022-12-01] }
//!     └── MonthBucket { month: "2022-11", days: [2022-11-30, ...] }
//! ```
//!
//! Both orders are newest first. A refresh is cooldown-gated and serialized;
//! the month index is swapped whole, so readers holding the previous `Arc`
//! keep a consistent snapshot.

use crate::cooldown::Cooldown;
use crate::day::{DayCache, DaySettings, LookupError};
use crate::imaging::DiaryBackend;
use crate::lock::{mutex_lock, rw_read, rw_write};
use crate::naming;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// All days of one month, newest first.
#[derive(Clone)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub days: Vec<Arc<DayCache>>,
}

impl MonthBucket {
    /// Total number of drawings in the month, listed now.
    pub fn image_count(&self) -> u32 {
        self.days.par_iter().map(|day| day.image_count()).sum()
    }
}

pub struct DiaryCache {
    roots: Vec<PathBuf>,
    backend: Arc<dyn DiaryBackend>,
    settings: DaySettings,
    days: DashMap<String, Arc<DayCache>>,
    by_month: RwLock<Arc<Vec<MonthBucket>>>,
    cooldown: Mutex<Cooldown>,
}

impl DiaryCache {
    pub fn new(
        roots: Vec<PathBuf>,
        backend: Arc<dyn DiaryBackend>,
        settings: DaySettings,
        cooldown: Duration,
    ) -> Self {
        Self {
            roots,
            backend,
            settings,
            days: DashMap::new(),
            by_month: RwLock::new(Arc::new(Vec::new())),
            cooldown: Mutex::new(Cooldown::new(cooldown)),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Rescan the roots for day directories.
    ///
    /// Within the cooldown this is a no-op. New days are added, vanished days
    /// evicted, and the month index rebuilt only when something changed.
    pub fn refresh(&self) {
        let mut cooldown = mutex_lock(&self.cooldown, "diary.refresh");
        if !cooldown.try_begin() {
            debug!("Diary cooldown active, using cached days");
            return;
        }

        let mut present = HashSet::new();
        let mut added = 0;
        let mut moved = 0;
        for root in &self.roots {
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Skipping unreadable diary root");
                    continue;
                }
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if !naming::is_day_name(&name) || !path.is_dir() {
                    continue;
                }
                // An earlier root already claimed this date
                if !present.insert(name.clone()) {
                    continue;
                }
                match self.days.entry(name) {
                    Entry::Vacant(slot) => {
                        let day = self.new_day(slot.key(), path);
                        slot.insert(day);
                        added += 1;
                    }
                    Entry::Occupied(mut slot) if slot.get().directory() != path.as_path() => {
                        debug!(
                            date = %slot.key(),
                            from = %slot.get().directory().display(),
                            to = %path.display(),
                            "Diary day moved"
                        );
                        let day = self.new_day(slot.key(), path);
                        slot.insert(day);
                        moved += 1;
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }

        let mut removed = Vec::new();
        self.days.retain(|date, _| {
            let keep = present.contains(date);
            if !keep {
                removed.push(date.clone());
            }
            keep
        });
        if !removed.is_empty() {
            removed.sort();
            warn!(days = ?removed, "Some diary days have been removed");
        }

        if added > 0 || moved > 0 || !removed.is_empty() {
            let index = group_by_month(self.days.iter().map(|entry| Arc::clone(entry.value())));
            info!(
                days = self.days.len(),
                months = index.len(),
                added,
                moved,
                removed = removed.len(),
                "Rebuilt diary month index"
            );
            *rw_write(&self.by_month, "diary.refresh") = Arc::new(index);
        }
    }

    /// Every day, newest first, after a refresh.
    pub fn days_reversed(&self) -> Vec<Arc<DayCache>> {
        self.refresh();
        let mut days: Vec<Arc<DayCache>> = self
            .days
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        days.sort_by(|a, b| b.compare_date(a));
        days
    }

    /// The cached month index, newest month first. Does not refresh.
    pub fn days_by_month_reversed(&self) -> Arc<Vec<MonthBucket>> {
        Arc::clone(&rw_read(&self.by_month, "diary.days_by_month_reversed"))
    }

    /// Look up one day by its `YYYY-MM-DD` name, after a refresh.
    pub fn day(&self, name: &str) -> Option<Arc<DayCache>> {
        self.refresh();
        self.days.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Strip thumbnail of a day.
    pub fn day_thumbnail(&self, name: &str) -> Result<Arc<[u8]>, LookupError> {
        let day = self
            .day(name)
            .ok_or_else(|| LookupError::NoSuchDay(name.to_string()))?;
        Ok(day.thumbnail_data())
    }

    /// Drawing of a day at an hour.
    pub fn day_hour_image(&self, name: &str, hour: u32) -> Result<Arc<[u8]>, LookupError> {
        let day = self
            .day(name)
            .ok_or_else(|| LookupError::NoSuchDay(name.to_string()))?;
        day.image_data(hour)?.ok_or_else(|| LookupError::NoSuchHour {
            date: name.to_string(),
            hour,
        })
    }

    /// Estimated memory held by all cached days, in bytes.
    pub fn size(&self) -> u64 {
        self.days.iter().map(|entry| entry.value().size()).sum()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl DiaryCache {
    fn new_day(&self, date: &str, directory: PathBuf) -> Arc<DayCache> {
        Arc::new(DayCache::new(
            date,
            directory,
            Arc::clone(&self.backend),
            self.settings,
        ))
    }
}

/// Group days by month: months newest first, days newest first within each.
pub(crate) fn group_by_month(days: impl Iterator<Item = Arc<DayCache>>) -> Vec<MonthBucket> {
    let mut months: BTreeMap<String, Vec<Arc<DayCache>>> = BTreeMap::new();
    for day in days {
        months.entry(day.month().to_string()).or_default().push(day);
    }
    months
        .into_iter()
        .rev()
        .map(|(month, mut days)| {
            days.sort_by(|a, b| b.compare_date(a));
            MonthBucket { month, days }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    // =========================================================================
    // Discovery
    // =========================================================================

    #[test]
    fn discovers_day_directories_only() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[1]);
        touch_day(tmp.path(), "2022-11-02", &[]);
        std::fs::create_dir(tmp.path().join("old")).unwrap();
        std::fs::create_dir(tmp.path().join("2022-11")).unwrap();
        std::fs::write(tmp.path().join("2022-11-03"), b"a file, not a day").unwrap();

        let diary = mock_diary(&[tmp.path()]);
        assert_eq!(dates(&diary), vec!["2022-11-02", "2022-11-01"]);
    }

    #[test]
    fn roots_are_unioned() {
        let active = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        touch_day(active.path(), "2022-12-01", &[]);
        touch_day(archive.path(), "2021-01-05", &[]);

        let diary = mock_diary(&[active.path(), archive.path()]);
        assert_eq!(dates(&diary), vec!["2022-12-01", "2021-01-05"]);
    }

    #[test]
    fn first_root_wins_for_duplicate_dates() {
        let active = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        touch_day(active.path(), "2022-12-01", &[1, 2]);
        touch_day(archive.path(), "2022-12-01", &[3]);

        let diary = mock_diary(&[active.path(), archive.path()]);
        let day = find_day(&diary, "2022-12-01");
        assert_eq!(day.directory(), active.path().join("2022-12-01"));
        assert_eq!(day.image_count(), 2);
    }

    #[test]
    fn day_moved_to_archive_follows_its_directory() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("old");
        touch_day(tmp.path(), "2022-11-01", &[1, 2, 3]);
        std::fs::create_dir(&archive).unwrap();
        let diary = mock_diary(&[tmp.path(), archive.as_path()]);
        assert_eq!(find_day(&diary, "2022-11-01").image_count(), 3);

        std::fs::rename(tmp.path().join("2022-11-01"), archive.join("2022-11-01")).unwrap();
        let day = find_day(&diary, "2022-11-01");
        assert_eq!(day.directory(), archive.join("2022-11-01"));
        assert_eq!(day.image_count(), 3);
        assert!(day.image_data(2).unwrap().is_some());

        let index = diary.days_by_month_reversed();
        assert!(Arc::ptr_eq(&index[0].days[0], &day));
    }

    #[test]
    fn archived_copy_does_not_replace_active_day() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("old");
        touch_day(tmp.path(), "2022-11-01", &[1]);
        touch_day(&archive, "2022-11-01", &[1, 2]);
        let diary = mock_diary(&[tmp.path(), archive.as_path()]);

        let first = find_day(&diary, "2022-11-01");
        let second = find_day(&diary, "2022-11-01");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.directory(), tmp.path().join("2022-11-01"));
    }

    #[test]
    fn missing_root_is_skipped() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let missing = tmp.path().join("old");

        let diary = mock_diary(&[tmp.path(), missing.as_path()]);
        assert_eq!(dates(&diary), vec!["2022-11-01"]);
    }

    #[test]
    fn removed_day_is_evicted() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        touch_day(tmp.path(), "2022-11-02", &[]);
        let diary = mock_diary(&[tmp.path()]);
        assert_eq!(diary.days_reversed().len(), 2);

        std::fs::remove_dir_all(tmp.path().join("2022-11-01")).unwrap();
        assert_eq!(dates(&diary), vec!["2022-11-02"]);
        assert!(diary.day("2022-11-01").is_none());
        assert_eq!(month_shape(&diary), vec![("2022-11".to_string(), vec!["2022-11-02".to_string()])]);
    }

    #[test]
    fn days_survive_refresh_as_same_instance() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let diary = mock_diary(&[tmp.path()]);

        let first = find_day(&diary, "2022-11-01");
        let second = find_day(&diary, "2022-11-01");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cooldown_hides_new_days() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let backend: Arc<dyn DiaryBackend> = Arc::new(MockBackend::new());
        let diary = DiaryCache::new(
            vec![tmp.path().to_path_buf()],
            backend,
            fast_settings(),
            Duration::from_secs(5),
        );
        assert_eq!(diary.days_reversed().len(), 1);

        touch_day(tmp.path(), "2022-11-02", &[]);
        assert_eq!(diary.days_reversed().len(), 1);
        assert!(diary.day("2022-11-02").is_none());
    }

    // =========================================================================
    // Month index
    // =========================================================================

    #[test]
    fn month_index_is_newest_first() {
        let tmp = TempDir::new().unwrap();
        for date in ["2022-10-01", "2022-12-24", "2022-11-30", "2022-12-01", "2022-11-02"] {
            touch_day(tmp.path(), date, &[]);
        }
        let diary = mock_diary(&[tmp.path()]);
        diary.refresh();

        let shape = month_shape(&diary);
        let expected: Vec<(String, Vec<String>)> = vec![
            ("2022-12".into(), vec!["2022-12-24".into(), "2022-12-01".into()]),
            ("2022-11".into(), vec!["2022-11-30".into(), "2022-11-02".into()]),
            ("2022-10".into(), vec!["2022-10-01".into()]),
        ];
        assert_eq!(shape, expected);
    }

    #[test]
    fn month_index_does_not_refresh() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let diary = mock_diary(&[tmp.path()]);

        assert!(diary.days_by_month_reversed().is_empty());
        diary.refresh();
        assert_eq!(diary.days_by_month_reversed().len(), 1);
    }

    #[test]
    fn snapshot_is_stable_across_rebuilds() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let diary = mock_diary(&[tmp.path()]);
        diary.refresh();
        let before = diary.days_by_month_reversed();

        touch_day(tmp.path(), "2022-12-01", &[]);
        diary.refresh();

        assert_eq!(before.len(), 1);
        assert_eq!(diary.days_by_month_reversed().len(), 2);
    }

    #[test]
    fn unchanged_day_set_keeps_index() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        let diary = mock_diary(&[tmp.path()]);
        diary.refresh();
        let before = diary.days_by_month_reversed();

        diary.refresh();
        assert!(Arc::ptr_eq(&before, &diary.days_by_month_reversed()));
    }

    #[test]
    fn bucket_image_count() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-10-01", &[1, 2]);
        touch_day(tmp.path(), "2022-10-02", &[1, 2, 3, 4]);
        let diary = mock_diary(&[tmp.path()]);
        diary.refresh();

        assert_eq!(diary.days_by_month_reversed()[0].image_count(), 6);
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    #[test]
    fn day_hour_image_lookups() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[4]);
        let diary = mock_diary(&[tmp.path()]);

        assert!(diary.day_hour_image("2022-11-01", 4).is_ok());

        let no_hour = diary.day_hour_image("2022-11-01", 5).unwrap_err();
        assert_eq!(no_hour.to_string(), "Day '2022-11-01' does not have an hour 5");
        assert!(no_hour.is_not_found());

        let no_day = diary.day_hour_image("2022-11-09", 4).unwrap_err();
        assert_eq!(no_day.to_string(), "There is no day with date '2022-11-09'");

        let bad_hour = diary.day_hour_image("2022-11-01", 24).unwrap_err();
        assert_eq!(bad_hour, LookupError::InvalidHour(24));
        assert!(!bad_hour.is_not_found());
    }

    #[test]
    fn day_thumbnail_lookup() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[4]);
        let diary = mock_diary(&[tmp.path()]);

        let bytes = diary.day_thumbnail("2022-11-01").unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
        assert_eq!(
            diary.day_thumbnail("1999-01-01").unwrap_err(),
            LookupError::NoSuchDay("1999-01-01".to_string())
        );
    }

    #[test]
    fn size_sums_days() {
        let tmp = TempDir::new().unwrap();
        touch_day(tmp.path(), "2022-11-01", &[]);
        touch_day(tmp.path(), "2022-11-02", &[]);
        let diary = mock_diary(&[tmp.path()]);
        let days = diary.days_reversed();

        let expected: u64 = days.iter().map(|d| d.size()).sum();
        assert_eq!(diary.size(), expected);
        assert_eq!(diary.len(), 2);
    }
}
