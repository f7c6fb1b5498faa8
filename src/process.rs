//! Media encoding.
//!
//! Turns every media file referenced by the album into an embeddable form:
//! the raw bytes, base64-encoded, tagged with a [`MimeKind`].
//!
//! ## Laziness
//!
//! Only basenames that appear on a media row are read. A folder with a
//! hundred photos and an album that shows two of them costs two reads.
//!
//! ## Parallel Encoding
//!
//! Files are read and encoded in parallel using [rayon](https://docs.rs/rayon).
//! [`encode_all`] returns only after every unit has finished, so callers see
//! a complete map and never depend on completion order. Each basename is
//! written by exactly one unit; the map is assembled after the join.
//!
//! ## Degraded Reads
//!
//! A file that cannot be read does not fail the run. It is recorded as an
//! [`EncodeFailure`] and gets an [`EncodedMedia`] with an empty payload, so
//! the renderer still emits a (blank) media tag in its cell.

use crate::scan::{MediaCatalog, MediaItem};
use crate::types::MimeKind;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Source of raw media bytes.
///
/// Production code reads the filesystem ([`FsReader`]); tests substitute
/// readers that count, delay, or fail.
pub trait MediaReader: Sync {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads media straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl MediaReader for FsReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// One media file in embeddable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMedia {
    pub basename: String,
    pub mime: MimeKind,
    /// Base64 (standard alphabet, padded). Empty when the read failed.
    pub payload: String,
}

impl EncodedMedia {
    /// `data:` URI for `src` attributes.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.payload)
    }
}

/// A media file that could not be read.
#[derive(Error, Debug)]
#[error("cannot read {basename} ({path}): {source}")]
pub struct EncodeFailure {
    pub basename: String,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Progress events emitted while encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeEvent {
    Started {
        total: usize,
    },
    Encoded {
        completed: usize,
        total: usize,
        basename: String,
        bytes: usize,
    },
    Failed {
        completed: usize,
        total: usize,
        basename: String,
        reason: String,
    },
}

/// Result of the encoding stage.
#[derive(Debug, Default)]
pub struct EncodedSet {
    /// One entry per encoded basename, including degraded ones.
    pub media: HashMap<String, EncodedMedia>,
    /// Files whose read failed; their entries in `media` are empty.
    pub failures: Vec<EncodeFailure>,
}

impl EncodedSet {
    pub fn get(&self, basename: &str) -> Option<&EncodedMedia> {
        self.media.get(basename)
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }
}

/// Encode every listed basename in parallel and wait for all of them.
///
/// Names missing from the catalog are skipped. `progress`, when given,
/// receives a running completed-of-total count as units finish.
pub fn encode_all(
    basenames: &[String],
    catalog: &MediaCatalog,
    reader: &impl MediaReader,
    progress: Option<&Sender<EncodeEvent>>,
) -> EncodedSet {
    let items: Vec<&MediaItem> = basenames
        .iter()
        .filter_map(|name| {
            let item = catalog.get(name);
            if item.is_none() {
                tracing::warn!(%name, "not in media catalog, nothing to encode");
            }
            item
        })
        .collect();

    let total = items.len();
    emit(progress, EncodeEvent::Started { total });
    let completed = AtomicUsize::new(0);

    let results: Vec<(EncodedMedia, Result<usize, EncodeFailure>)> = items
        .par_iter()
        .map(|item| {
            let (encoded, outcome) = encode_one(item, reader);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            let event = match &outcome {
                Ok(bytes) => EncodeEvent::Encoded {
                    completed: done,
                    total,
                    basename: item.basename.clone(),
                    bytes: *bytes,
                },
                Err(err) => EncodeEvent::Failed {
                    completed: done,
                    total,
                    basename: item.basename.clone(),
                    reason: err.source.to_string(),
                },
            };
            emit(progress, event);
            (encoded, outcome)
        })
        .collect();

    let mut set = EncodedSet {
        media: HashMap::with_capacity(total),
        failures: Vec::new(),
    };
    for (encoded, outcome) in results {
        if let Err(failure) = outcome {
            tracing::warn!(error = %failure, "media degraded to an empty payload");
            set.failures.push(failure);
        }
        set.media.insert(encoded.basename.clone(), encoded);
    }
    set
}

/// Read and encode a single catalog item.
///
/// Always yields an entry; the outcome carries the raw byte count or the
/// read failure.
fn encode_one(
    item: &MediaItem,
    reader: &impl MediaReader,
) -> (EncodedMedia, Result<usize, EncodeFailure>) {
    let mime = MimeKind::for_media(item.kind, &item.path);
    let (payload, outcome) = match reader.read(&item.path) {
        Ok(bytes) => (BASE64_STANDARD.encode(&bytes), Ok(bytes.len())),
        Err(source) => (
            String::new(),
            Err(EncodeFailure {
                basename: item.basename.clone(),
                path: item.path.clone(),
                source,
            }),
        ),
    };
    (
        EncodedMedia {
            basename: item.basename.clone(),
            mime,
            payload,
        },
        outcome,
    )
}

fn emit(progress: Option<&Sender<EncodeEvent>>, event: EncodeEvent) {
    if let Some(tx) = progress {
        // Receiver gone means nobody is watching; encoding carries on.
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DuplicatePolicy, MediaConfig};
    use crate::scan::scan;
    use crate::test_helpers::{RecordingReader, media_folder};
    use std::fs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn catalog_for(root: &Path) -> MediaCatalog {
        scan(root, &MediaConfig::default(), DuplicatePolicy::LastWins).unwrap()
    }

    #[test]
    fn encodes_bytes_as_base64() {
        let tmp = media_folder(&[]);
        fs::write(tmp.path().join("a.png"), b"hello").unwrap();
        let catalog = catalog_for(tmp.path());

        let set = encode_all(&names(&["a.png"]), &catalog, &FsReader, None);

        let a = set.get("a.png").unwrap();
        assert_eq!(a.mime, MimeKind::Png);
        assert_eq!(a.payload, "aGVsbG8=");
        assert_eq!(a.data_uri(), "data:image/png;base64,aGVsbG8=");
        assert!(set.failures.is_empty());
    }

    #[test]
    fn mime_follows_catalog_classification() {
        let tmp = media_folder(&["a.png", "b.jpg", "c.JPEG", "d.mp4"]);
        let catalog = catalog_for(tmp.path());

        let set = encode_all(
            &names(&["a.png", "b.jpg", "c.JPEG", "d.mp4"]),
            &catalog,
            &FsReader,
            None,
        );

        assert_eq!(set.get("a.png").unwrap().mime, MimeKind::Png);
        assert_eq!(set.get("b.jpg").unwrap().mime, MimeKind::Jpeg);
        assert_eq!(set.get("c.JPEG").unwrap().mime, MimeKind::Jpeg);
        assert_eq!(set.get("d.mp4").unwrap().mime, MimeKind::Mp4);
    }

    #[test]
    fn only_referenced_media_is_read() {
        let files: Vec<String> = (0..100).map(|i| format!("img{i:03}.jpg")).collect();
        let file_refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let tmp = media_folder(&file_refs);
        let catalog = catalog_for(tmp.path());
        assert_eq!(catalog.len(), 100);

        let reader = RecordingReader::new();
        let set = encode_all(&names(&["img007.jpg", "img042.jpg"]), &catalog, &reader, None);

        assert_eq!(set.len(), 2);
        let mut reads = reader.reads();
        reads.sort();
        assert_eq!(reads.len(), 2);
        assert!(reads[0].ends_with("img007.jpg"));
        assert!(reads[1].ends_with("img042.jpg"));
    }

    #[test]
    fn each_basename_read_once() {
        let tmp = media_folder(&["a.jpg", "b.jpg"]);
        let catalog = catalog_for(tmp.path());
        let reader = RecordingReader::new();

        encode_all(&names(&["a.jpg", "b.jpg"]), &catalog, &reader, None);

        assert_eq!(reader.reads().len(), 2);
    }

    #[test]
    fn unreadable_file_degrades_to_empty_payload() {
        let tmp = media_folder(&["gone.png", "kept.png"]);
        let catalog = catalog_for(tmp.path());
        fs::remove_file(tmp.path().join("gone.png")).unwrap();

        let set = encode_all(&names(&["gone.png", "kept.png"]), &catalog, &FsReader, None);

        let gone = set.get("gone.png").unwrap();
        assert!(gone.payload.is_empty());
        assert_eq!(gone.mime, MimeKind::Png);
        assert!(!set.get("kept.png").unwrap().payload.is_empty());
        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].basename, "gone.png");
    }

    #[test]
    fn names_outside_catalog_are_skipped() {
        let tmp = media_folder(&["a.jpg"]);
        let catalog = catalog_for(tmp.path());
        let reader = RecordingReader::new();

        let set = encode_all(&names(&["a.jpg", "ghost.jpg"]), &catalog, &reader, None);

        assert_eq!(set.len(), 1);
        assert!(set.get("ghost.jpg").is_none());
        assert_eq!(reader.reads().len(), 1);
    }

    #[test]
    fn progress_counts_every_completion() {
        let tmp = media_folder(&["a.jpg", "b.jpg", "c.mp4"]);
        let catalog = catalog_for(tmp.path());
        fs::remove_file(tmp.path().join("c.mp4")).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        encode_all(&names(&["a.jpg", "b.jpg", "c.mp4"]), &catalog, &FsReader, Some(&tx));
        drop(tx);
        let events: Vec<EncodeEvent> = rx.iter().collect();

        assert_eq!(events[0], EncodeEvent::Started { total: 3 });
        let mut completed: Vec<usize> = events[1..]
            .iter()
            .map(|e| match e {
                EncodeEvent::Encoded { completed, total, .. }
                | EncodeEvent::Failed { completed, total, .. } => {
                    assert_eq!(*total, 3);
                    *completed
                }
                EncodeEvent::Started { .. } => panic!("started twice"),
            })
            .collect();
        completed.sort();
        assert_eq!(completed, vec![1, 2, 3]);

        let failed = events
            .iter()
            .filter(|e| matches!(e, EncodeEvent::Failed { basename, .. } if basename == "c.mp4"))
            .count();
        assert_eq!(failed, 1);
    }

    #[test]
    fn empty_input_encodes_nothing() {
        let tmp = media_folder(&["a.jpg"]);
        let catalog = catalog_for(tmp.path());
        let set = encode_all(&[], &catalog, &FsReader, None);
        assert!(set.is_empty());
    }
}
