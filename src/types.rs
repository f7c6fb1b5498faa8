//! Shared types used across the compilation stages.
//!
//! The catalog classifies files into a [`MediaKind`]; the encoder turns that
//! classification plus the file extension into a [`MimeKind`] that the
//! renderer writes into `data:` URIs.

use std::fmt;
use std::path::Path;

/// Classification of a discovered media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

/// Embeddable format of an encoded media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Png,
    Jpeg,
    Mp4,
}

impl MimeKind {
    /// Pick the embed format for a file of the given kind.
    ///
    /// Images are `png` when the extension is `.png` (any case) and `jpeg`
    /// otherwise; every video is `mp4`.
    pub fn for_media(kind: MediaKind, path: &Path) -> Self {
        match kind {
            MediaKind::Video => MimeKind::Mp4,
            MediaKind::Image => {
                let is_png = path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("png"))
                    .unwrap_or(false);
                if is_png { MimeKind::Png } else { MimeKind::Jpeg }
            }
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            MimeKind::Png => "image/png",
            MimeKind::Jpeg => "image/jpeg",
            MimeKind::Mp4 => "video/mp4",
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, MimeKind::Mp4)
    }
}

impl fmt::Display for MimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}
