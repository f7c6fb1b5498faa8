//! Album compilation.
//!
//! Drives one album file through every stage and writes the result:
//!
//! ```text
//! trip.alb ─┬─ find_folder ─── scan ──── parse ─── encode_all ─── render ─── trip.html
//!           │  (no media I/O)  (catalog)  (blocks)  (parallel,     (document
//!           │                                        joined)        order)
//!           └─ :use style.css ──────────────────────────────────── <style>
//! ```
//!
//! Encoding finishes for every referenced basename before rendering starts,
//! so the output order is the document order no matter which file finished
//! encoding first.
//!
//! ## Failure
//!
//! An unreadable album, a missing `:folder`, an unreadable media folder, or
//! an uncreatable output file abort the run. The HTML is assembled in memory
//! and written in one go, so an aborted run leaves no partial document.
//! Unreadable media files and an unreadable stylesheet only degrade the
//! output.

use crate::config::AlbumConfig;
use crate::document::{self, Document, ParseError};
use crate::process::{EncodeEvent, EncodeFailure, EncodedSet, FsReader, MediaReader, encode_all};
use crate::render::{Markdown, render_document};
use crate::scan::{self, ScanError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Cannot read album file {path}: {source}")]
    ReadAlbum {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to the `:use` stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetStatus {
    None,
    Embedded(PathBuf),
    Unreadable(PathBuf),
}

/// In-memory result of compiling an album document.
#[derive(Debug)]
pub struct Compilation {
    pub html: String,
    pub document: Document,
    pub encoded: EncodedSet,
    pub stylesheet: StylesheetStatus,
}

/// Summary of a finished `generate` run.
#[derive(Debug)]
pub struct GenerateReport {
    pub album: PathBuf,
    pub output: PathBuf,
    pub media_rows: usize,
    pub prose_blocks: usize,
    /// Distinct media files embedded, degraded ones included.
    pub embedded: usize,
    pub failures: Vec<EncodeFailure>,
    pub stylesheet: StylesheetStatus,
}

/// Output path for an album file: last extension replaced by `.html`.
pub fn output_path(album: &Path) -> PathBuf {
    album.with_extension("html")
}

/// Compile `album` and write the HTML next to it.
pub fn generate(
    album: &Path,
    config: &AlbumConfig,
    progress: Option<Sender<EncodeEvent>>,
) -> Result<GenerateReport, GenerateError> {
    generate_with_reader(album, config, &FsReader, progress)
}

/// Compile and write using a specific media reader (allows testing with doubles).
pub fn generate_with_reader(
    album: &Path,
    config: &AlbumConfig,
    reader: &impl MediaReader,
    progress: Option<Sender<EncodeEvent>>,
) -> Result<GenerateReport, GenerateError> {
    let text = fs::read_to_string(album).map_err(|source| GenerateError::ReadAlbum {
        path: album.to_path_buf(),
        source,
    })?;

    let compilation = compile(&text, config, reader, progress.as_ref())?;
    // Closes the progress channel before the write.
    drop(progress);

    let output = output_path(album);
    fs::write(&output, &compilation.html).map_err(|source| GenerateError::Write {
        path: output.clone(),
        source,
    })?;
    tracing::info!(output = %output.display(), bytes = compilation.html.len(), "album written");

    Ok(GenerateReport {
        album: album.to_path_buf(),
        output,
        media_rows: compilation.document.media_row_count(),
        prose_blocks: compilation.document.prose_count(),
        embedded: compilation.encoded.len(),
        failures: compilation.encoded.failures,
        stylesheet: compilation.stylesheet,
    })
}

/// Run every stage on album text, without writing anything.
pub fn compile(
    text: &str,
    config: &AlbumConfig,
    reader: &impl MediaReader,
    progress: Option<&Sender<EncodeEvent>>,
) -> Result<Compilation, GenerateError> {
    let lines = document::split_lines(text);
    let folder = document::find_folder(&lines)?;

    let catalog = scan::scan(&folder, &config.media, config.policy.duplicate_basenames)?;
    let document = document::parse(&lines, &catalog, config.policy.unresolved_tokens)?;

    let referenced = document.referenced_media();
    tracing::info!(
        folder = %folder.display(),
        catalog = catalog.len(),
        referenced = referenced.len(),
        "encoding referenced media"
    );
    let encoded = encode_all(&referenced, &catalog, reader, progress);

    let (css, stylesheet) = match &document.directives.stylesheet {
        None => (None, StylesheetStatus::None),
        Some(path) => match read_stylesheet(path) {
            Some(css) => (Some(css), StylesheetStatus::Embedded(path.clone())),
            None => (None, StylesheetStatus::Unreadable(path.clone())),
        },
    };

    let html = render_document(&document, &encoded, css.as_deref(), &Markdown::default());
    Ok(Compilation {
        html,
        document,
        encoded,
        stylesheet,
    })
}

/// Read a stylesheet's raw contents; unreadable files are skipped.
fn read_stylesheet(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "stylesheet not embedded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnresolvedPolicy;
    use crate::test_helpers::{DelayedReader, RecordingReader, media_folder, write_album};
    use tempfile::TempDir;

    fn album_text(folder: &Path, body: &str) -> String {
        format!(":folder {}\n\n{}", folder.display(), body)
    }

    #[test]
    fn output_path_replaces_last_extension() {
        assert_eq!(output_path(Path::new("trip.alb")), PathBuf::from("trip.html"));
        assert_eq!(
            output_path(Path::new("dir.v2/my.trip.alb")),
            PathBuf::from("dir.v2/my.trip.html")
        );
        assert_eq!(output_path(Path::new("noext")), PathBuf::from("noext.html"));
    }

    #[test]
    fn rows_follow_document_order_not_completion_order() {
        let tmp = media_folder(&["A.jpg", "B.jpg", "C.jpg"]);
        let text = album_text(tmp.path(), "B.jpg\nA.jpg\nC.jpg\n");
        // B finishes last, C first.
        let reader = DelayedReader::new(&[("B.jpg", 150), ("A.jpg", 60), ("C.jpg", 0)]);

        let result = compile(&text, &AlbumConfig::default(), &reader, None).unwrap();

        let b = result.html.find(r#"alt="B.jpg""#).unwrap();
        let a = result.html.find(r#"alt="A.jpg""#).unwrap();
        let c = result.html.find(r#"alt="C.jpg""#).unwrap();
        assert!(b < a && a < c, "rows out of order: {}", result.html);
        assert_eq!(reader.finished().len(), 3);
    }

    #[test]
    fn missing_folder_fails_before_media_io() {
        let reader = RecordingReader::new();
        let result = compile("# Title\n\nimg1.png\n", &AlbumConfig::default(), &reader, None);

        assert!(matches!(
            result,
            Err(GenerateError::Parse(ParseError::MissingFolderDirective))
        ));
        assert!(reader.reads().is_empty());
    }

    #[test]
    fn unreadable_media_folder_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let text = album_text(&tmp.path().join("missing"), "a.jpg\n");
        let result = compile(&text, &AlbumConfig::default(), &FsReader, None);
        assert!(matches!(result, Err(GenerateError::Scan(_))));
    }

    /// Fails reads of one file, as if it vanished after discovery.
    struct VanishingReader(&'static str);

    impl MediaReader for VanishingReader {
        fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
            if path.ends_with(self.0) {
                return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
            }
            FsReader.read(path)
        }
    }

    #[test]
    fn vanished_media_degrades_single_cell() {
        let tmp = media_folder(&["img1.png", "img2.png"]);
        let album = write_album(
            tmp.path(),
            "trip.alb",
            &album_text(tmp.path(), "# Trip\n\nimg1.png img2.png\n\nThe end.\n"),
        );

        let report =
            generate_with_reader(&album, &AlbumConfig::default(), &VanishingReader("img1.png"), None)
                .unwrap();
        let html = fs::read_to_string(&report.output).unwrap();

        assert!(html.contains(r#"<img width="100%" src="data:image/png;base64," alt="img1.png">"#));
        assert!(html.contains(r#"alt="img2.png""#));
        assert!(html.contains("<p>The end.</p>"));
        assert!(html.ends_with("</body></html>"));
        assert_eq!(report.embedded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].basename, "img1.png");
    }

    #[test]
    fn unreferenced_media_never_read() {
        let files: Vec<String> = (0..100).map(|i| format!("p{i}.jpg")).collect();
        let refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let tmp = media_folder(&refs);
        let text = album_text(tmp.path(), "p3.jpg p77.jpg\n");
        let reader = RecordingReader::new();

        let result = compile(&text, &AlbumConfig::default(), &reader, None).unwrap();

        assert_eq!(reader.reads().len(), 2);
        assert_eq!(result.encoded.len(), 2);
    }

    #[test]
    fn media_repeated_across_rows_encoded_once() {
        let tmp = media_folder(&["a.jpg", "b.jpg"]);
        let text = album_text(tmp.path(), "a.jpg b.jpg\ntext\nb.jpg a.jpg\n");
        let reader = RecordingReader::new();

        let result = compile(&text, &AlbumConfig::default(), &reader, None).unwrap();

        assert_eq!(reader.reads().len(), 2);
        assert_eq!(result.html.matches(r#"alt="a.jpg""#).count(), 2);
    }

    #[test]
    fn stylesheet_embedded_from_use_directive() {
        let tmp = media_folder(&["a.jpg"]);
        let css = tmp.path().join("album.css");
        fs::write(&css, "body { margin: 0; }").unwrap();
        let text = format!(
            ":folder {}\n:use {}\n\na.jpg\n",
            tmp.path().display(),
            css.display()
        );

        let result = compile(&text, &AlbumConfig::default(), &FsReader, None).unwrap();

        assert!(
            result
                .html
                .starts_with("<!DOCTYPE html><html><head><style>body { margin: 0; }</style></head><body>")
        );
        assert_eq!(result.stylesheet, StylesheetStatus::Embedded(css));
    }

    #[test]
    fn unreadable_stylesheet_is_omitted() {
        let tmp = media_folder(&["a.jpg"]);
        let text = format!(
            ":folder {}\n:use {}\n\na.jpg\n",
            tmp.path().display(),
            tmp.path().join("nope.css").display()
        );

        let result = compile(&text, &AlbumConfig::default(), &FsReader, None).unwrap();

        assert!(result.html.starts_with("<!DOCTYPE html><html><head></head><body>"));
        assert!(matches!(result.stylesheet, StylesheetStatus::Unreadable(_)));
    }

    #[test]
    fn strict_token_policy_propagates() {
        let tmp = media_folder(&["a.jpg"]);
        let text = album_text(tmp.path(), "a.jpg ghost.jpg\n");
        let mut config = AlbumConfig::default();
        config.policy.unresolved_tokens = UnresolvedPolicy::Reject;

        let result = compile(&text, &config, &FsReader, None);

        assert!(matches!(
            result,
            Err(GenerateError::Parse(ParseError::UnresolvedToken { .. }))
        ));
    }

    #[test]
    fn generate_writes_html_next_to_album() {
        let tmp = media_folder(&["a.jpg", "clip.mp4"]);
        let album = write_album(
            tmp.path(),
            "trip.alb",
            &album_text(tmp.path(), "# Hi\n\na.jpg\n\nclip.mp4\n"),
        );

        let report = generate(&album, &AlbumConfig::default(), None).unwrap();

        assert_eq!(report.output, tmp.path().join("trip.html"));
        assert_eq!(report.media_rows, 2);
        assert_eq!(report.prose_blocks, 1);
        assert_eq!(report.embedded, 2);
        assert!(report.failures.is_empty());
        let html = fs::read_to_string(&report.output).unwrap();
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("data:video/mp4;base64,"));
    }

    #[test]
    fn missing_album_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = generate(&tmp.path().join("nope.alb"), &AlbumConfig::default(), None);
        assert!(matches!(result, Err(GenerateError::ReadAlbum { .. })));
    }

    #[test]
    fn uncreatable_output_is_error() {
        let tmp = media_folder(&["a.jpg"]);
        let album = write_album(tmp.path(), "trip.alb", &album_text(tmp.path(), "a.jpg\n"));
        // A directory where the output file should go.
        fs::create_dir_all(tmp.path().join("trip.html")).unwrap();

        let result = generate(&album, &AlbumConfig::default(), None);
        assert!(matches!(result, Err(GenerateError::Write { .. })));
    }

    #[test]
    fn progress_channel_closes_after_generate() {
        let tmp = media_folder(&["a.jpg"]);
        let album = write_album(tmp.path(), "trip.alb", &album_text(tmp.path(), "a.jpg\n"));
        let (tx, rx) = std::sync::mpsc::channel();

        generate(&album, &AlbumConfig::default(), Some(tx)).unwrap();

        // Iteration ends because the sender was dropped.
        let events: Vec<EncodeEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
    }
}
