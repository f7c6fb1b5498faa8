//! Shared test utilities for the albummer test suite.
//!
//! Provides throwaway media folders, in-memory catalogs, album writers, and
//! [`MediaReader`] doubles that record or delay reads.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = media_folder(&["a.jpg", "day2/b.png"]);
//! let album = write_album(tmp.path(), "trip.alb", &format!(
//!     ":folder {}\n\na.jpg b.png\n", tmp.path().display()
//! ));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::config::DuplicatePolicy;
use crate::process::MediaReader;
use crate::scan::{MediaCatalog, MediaItem};
use crate::types::MediaKind;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a temp folder holding the given relative paths.
///
/// Each file's content is its own relative path, so encoded payloads are
/// distinguishable.
pub fn media_folder(files: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for rel in files {
        let path = tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, rel.as_bytes()).unwrap();
    }
    tmp
}

/// Write an album document into `dir` and return its path.
pub fn write_album(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// In-memory catalog rooted at `/media`; `.mp4` names are videos.
///
/// Nothing touches the filesystem.
pub fn catalog_of(names: &[&str]) -> MediaCatalog {
    let items = names
        .iter()
        .enumerate()
        .map(|(i, name)| MediaItem {
            path: Path::new("/media").join(name),
            basename: name.to_string(),
            kind: if name.ends_with(".mp4") {
                MediaKind::Video
            } else {
                MediaKind::Image
            },
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(i as u64),
        })
        .collect();
    MediaCatalog::from_items("/media", items, DuplicatePolicy::LastWins).unwrap()
}

// =========================================================================
// Reader doubles
// =========================================================================

/// Records every path read; returns the file name as content.
#[derive(Default)]
pub struct RecordingReader {
    reads: Mutex<Vec<PathBuf>>,
}

impl RecordingReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().unwrap().clone()
    }
}

impl MediaReader for RecordingReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        Ok(file_name_bytes(path))
    }
}

/// Sleeps a per-file delay before answering, to force completion order.
///
/// Records the order in which reads finished.
pub struct DelayedReader {
    delays: HashMap<String, Duration>,
    finished: Mutex<Vec<String>>,
}

impl DelayedReader {
    pub fn new(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(name, ms)| (name.to_string(), Duration::from_millis(*ms)))
                .collect(),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl MediaReader for DelayedReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(delay) = self.delays.get(&name) {
            std::thread::sleep(*delay);
        }
        self.finished.lock().unwrap().push(name);
        Ok(file_name_bytes(path))
    }
}

fn file_name_bytes(path: &Path) -> Vec<u8> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned().into_bytes())
        .unwrap_or_default()
}
