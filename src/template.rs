//! Page template sources.
//!
//! The renderer only needs the template as a list of lines. A
//! [`FileTemplate`] searches a list of directories for the template file and
//! re-reads it on every call, so edits show up without a restart.
//! [`StaticTemplate`] keeps the lines in memory (tests, the static generator).

use crate::lock::mutex_lock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub trait TemplateSource: Sync {
    /// The template's lines, or `None` when there is no template.
    fn read_lines(&self) -> io::Result<Option<Vec<String>>>;
}

/// Template lines held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplate {
    lines: Vec<String>,
}

impl StaticTemplate {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(split_lines(text))
    }

    /// Read a template file once.
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::from_text(&fs::read_to_string(path)?))
    }
}

impl TemplateSource for StaticTemplate {
    fn read_lines(&self) -> io::Result<Option<Vec<String>>> {
        Ok(Some(self.lines.clone()))
    }
}

/// Template file looked up by name in an ordered list of directories.
///
/// The first directory containing the file wins and is remembered.
pub struct FileTemplate {
    dirs: Vec<PathBuf>,
    file_name: String,
    found: Mutex<Option<PathBuf>>,
}

impl FileTemplate {
    pub fn new(dirs: Vec<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dirs,
            file_name: file_name.into(),
            found: Mutex::new(None),
        }
    }

    /// Path of the template file, searching the directories on first use.
    pub fn locate(&self) -> Option<PathBuf> {
        let mut found = mutex_lock(&self.found, "template.locate");
        if found.is_none() {
            *found = self
                .dirs
                .iter()
                .map(|dir| dir.join(&self.file_name))
                .find(|candidate| candidate.is_file());
            if let Some(path) = found.as_ref() {
                debug!(path = %path.display(), "Located page template");
            }
        }
        found.clone()
    }

    fn forget(&self) {
        *mutex_lock(&self.found, "template.forget") = None;
    }
}

impl TemplateSource for FileTemplate {
    fn read_lines(&self) -> io::Result<Option<Vec<String>>> {
        let Some(path) = self.locate() else {
            return Ok(None);
        };
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(split_lines(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Removed since it was located, search again
                self.forget();
                match self.locate() {
                    Some(path) => Ok(Some(split_lines(&fs::read_to_string(path)?))),
                    None => Ok(None),
                }
            }
            Err(e) => Err(e),
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
