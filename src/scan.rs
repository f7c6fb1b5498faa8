//! Media discovery and the basename-keyed catalog.
//!
//! First stage of every compilation. Walks the folder named by the album's
//! `:folder` directive and records every file whose extension appears in the
//! configured image or video tables:
//!
//! ```text
//! photos/                      # Media root
//! ├── beach.jpg                # Image
//! ├── sunset.PNG               # Image (extensions compare lowercase)
//! ├── notes.txt                # Ignored
//! └── day2/
//!     ├── surf.mp4             # Video
//!     └── beach.jpg            # Same basename as ../beach.jpg
//! ```
//!
//! ## Identity
//!
//! Album documents refer to media by basename only, so the catalog keeps a
//! `basename → item` index next to the ordered item list. Two files sharing a
//! basename collide: under [`DuplicatePolicy::LastWins`] the file discovered
//! last owns the name, under [`DuplicatePolicy::Reject`] discovery fails.
//!
//! ## Order
//!
//! Items are listed in traversal order. Entries are visited sorted by file
//! name inside each directory so "last" in last-wins is stable across runs.
//!
//! ## Failure
//!
//! Only an unreadable root is fatal. Unreadable entries below the root,
//! directories, symlinks to directories, and unsupported extensions are
//! skipped.

use crate::config::{DuplicatePolicy, MediaConfig};
use crate::types::MediaKind;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read media folder {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Duplicate media name {name}: {first} and {second}")]
    DuplicateBasename {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One discovered media file.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Path as found under the catalog root (root-joined).
    pub path: PathBuf,
    /// File name, the identity used by album documents.
    pub basename: String,
    pub kind: MediaKind,
    pub modified: SystemTime,
}

/// Every media file under a root, in traversal order, plus a basename index.
///
/// Built once per compilation and read-only afterwards.
#[derive(Debug, Clone)]
pub struct MediaCatalog {
    root: PathBuf,
    items: Vec<MediaItem>,
    by_name: HashMap<String, usize>,
}

impl MediaCatalog {
    /// Build a catalog from already-classified items.
    ///
    /// The index is derived eagerly; on a basename collision the later item
    /// wins unless `policy` rejects duplicates.
    pub fn from_items(
        root: impl Into<PathBuf>,
        items: Vec<MediaItem>,
        policy: DuplicatePolicy,
    ) -> Result<Self, ScanError> {
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if let Some(prev) = by_name.insert(item.basename.clone(), idx) {
                let first = items[prev].path.clone();
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(ScanError::DuplicateBasename {
                            name: item.basename.clone(),
                            first,
                            second: item.path.clone(),
                        });
                    }
                    DuplicatePolicy::LastWins => {
                        tracing::warn!(
                            name = %item.basename,
                            shadowed = %first.display(),
                            used = %item.path.display(),
                            "duplicate media name, later file wins"
                        );
                    }
                }
            }
        }
        Ok(Self {
            root: root.into(),
            items,
            by_name,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All items in discovery order, duplicates included.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Items that own their basename, in discovery order.
    ///
    /// Same as [`items`](Self::items) unless duplicates were shadowed.
    pub fn resolved(&self) -> impl Iterator<Item = &MediaItem> {
        self.items
            .iter()
            .enumerate()
            .filter(|(idx, item)| self.by_name.get(&item.basename) == Some(idx))
            .map(|(_, item)| item)
    }

    /// Look up an item by basename (case-sensitive).
    pub fn get(&self, basename: &str) -> Option<&MediaItem> {
        self.by_name.get(basename).map(|&idx| &self.items[idx])
    }

    pub fn contains(&self, basename: &str) -> bool {
        self.by_name.contains_key(basename)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Classify a path by its lowercased extension.
pub fn classify(path: &Path, media: &MediaConfig) -> Option<MediaKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    if media.image_extensions.contains(&ext) {
        Some(MediaKind::Image)
    } else if media.video_extensions.contains(&ext) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Walk `root` and build the media catalog.
pub fn scan(
    root: &Path,
    media: &MediaConfig,
    policy: DuplicatePolicy,
) -> Result<MediaCatalog, ScanError> {
    // Probe the root up front: walkdir would otherwise report a missing or
    // unreadable root as just another skippable entry error.
    fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut items = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ScanError::RootUnreadable {
                    path: root.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry in media folder");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        let Some(kind) = classify(entry.path(), media) else {
            continue;
        };
        // Follows symlinks, so a link to a directory is seen as one.
        let metadata = match fs::metadata(entry.path()) {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "skipping media file");
                continue;
            }
        };
        let Some(basename) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping media file with non UTF-8 name");
            continue;
        };

        items.push(MediaItem {
            path: entry.path().to_path_buf(),
            basename: basename.to_string(),
            kind,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    tracing::debug!(root = %root.display(), count = items.len(), "media folder scanned");
    MediaCatalog::from_items(root, items, policy)
}
