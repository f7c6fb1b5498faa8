//! # Albummer
//!
//! Compiles a plain-text album document plus a folder of photos and videos
//! into one self-contained HTML page. Every referenced media file is embedded
//! as a base64 `data:` URI, so the result can be mailed, archived, or opened
//! from anywhere without its source folder.
//!
//! # Album Documents
//!
//! ```text
//! :folder photos/2024-lisbon        ← where media live (required)
//! :use lisbon.css                   ← stylesheet inlined into <head>
//!
//! # Lisbon
//!
//! Three days of hills and tiles.
//!
//! tram.jpg   tiles.jpg   view.jpg   ← media row: one table, 33% per cell
//! river.mp4                         ← media row with a single video
//!
//! The last evening.                 ← prose, rendered as markdown
//! ```
//!
//! A line starts a media row when its first whitespace-separated word names a
//! file in the media folder. Any other non-blank line starts (or continues) a
//! prose block, which runs until the next media line.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      :folder     →  MediaCatalog   (basename → file, kind, mtime)
//! 2. Parse     album text  →  Document       (media rows + prose blocks)
//! 3. Encode    Document    →  EncodedSet     (parallel, referenced files only)
//! 4. Render    Document    →  HTML           (document order, one write)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the media folder into a basename-keyed catalog |
//! | [`document`] | Directives, line classification, and block grouping |
//! | [`process`] | Parallel base64 encoding of referenced media |
//! | [`render`] | HTML for media rows and prose, page assembly with Maud |
//! | [`generate`] | Runs every stage for one album file and writes the page |
//! | [`template`] | Scaffolds a starting album document from a folder |
//! | [`config`] | `albummer.toml` loading, merging, and validation |
//! | [`types`] | Media kinds and MIME types shared between stages |
//! | [`output`] | CLI output formatting for progress and summaries |

pub mod config;
pub mod document;
pub mod generate;
pub mod output;
pub mod process;
pub mod render;
pub mod scan;
pub mod template;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
