//! Album scaffolding.
//!
//! Lays out every media file in a folder as a starting album document:
//!
//! ```text
//! :folder photos
//! :show_filenames
//! :use /opt/albummer/default.css
//!
//! # photos
//!
//! a.jpg   b.jpg   c.jpg
//! d.jpg
//!
//! clip.mp4
//!
//! e.jpg
//! ```
//!
//! Images fill rows of `columns` names separated by three spaces. A video
//! always gets a row of its own. Items are ordered by modification time,
//! with ties kept in discovery order.

use crate::config::{MediaConfig, PolicyConfig, SortOrder, TemplateConfig};
use crate::scan::{self, MediaCatalog, MediaItem, ScanError};
use crate::types::MediaKind;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const COLUMN_SEPARATOR: &str = "   ";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Column count must be at least 1")]
    ZeroColumns,
    #[error("Cannot write template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Layout choices for a scaffolded album.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub columns: usize,
    pub order: SortOrder,
    /// Written verbatim into the `:use` directive.
    pub stylesheet: PathBuf,
}

impl TemplateOptions {
    /// Options from the `[template]` config, with a fallback stylesheet for
    /// when the config names none.
    pub fn from_config(config: &TemplateConfig, default_stylesheet: &Path) -> Self {
        Self {
            columns: config.columns,
            order: config.order,
            stylesheet: config
                .stylesheet
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| default_stylesheet.to_path_buf()),
        }
    }
}

/// Summary of a written template.
#[derive(Debug)]
pub struct TemplateReport {
    pub output: PathBuf,
    pub images: usize,
    pub videos: usize,
}

/// Render the album text for `folder`.
///
/// Shadowed duplicate basenames are left out; they could not be referenced
/// anyway.
pub fn make_template(
    folder: &Path,
    catalog: &MediaCatalog,
    options: &TemplateOptions,
) -> Result<String, TemplateError> {
    if options.columns == 0 {
        return Err(TemplateError::ZeroColumns);
    }

    let items = ordered_items(catalog, options.order);
    let body = layout(&items, options.columns);

    Ok(format!(
        ":folder {}\n:show_filenames\n:use {}\n\n# {}\n\n{}\n",
        folder.display(),
        options.stylesheet.display(),
        folder_title(folder),
        body
    ))
}

/// Scan `folder` and write a scaffolded album to `output`.
pub fn write_template(
    folder: &Path,
    output: &Path,
    media: &MediaConfig,
    policy: &PolicyConfig,
    options: &TemplateOptions,
) -> Result<TemplateReport, TemplateError> {
    let catalog = scan::scan(folder, media, policy.duplicate_basenames)?;
    let text = make_template(folder, &catalog, options)?;

    fs::write(output, text).map_err(|source| TemplateError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let (videos, images): (Vec<&MediaItem>, Vec<&MediaItem>) = catalog
        .resolved()
        .partition(|item| item.kind == MediaKind::Video);
    Ok(TemplateReport {
        output: output.to_path_buf(),
        images: images.len(),
        videos: videos.len(),
    })
}

fn ordered_items(catalog: &MediaCatalog, order: SortOrder) -> Vec<&MediaItem> {
    let mut items: Vec<&MediaItem> = catalog.resolved().collect();
    match order {
        SortOrder::Asc => items.sort_by(|a, b| a.modified.cmp(&b.modified)),
        SortOrder::Desc => items.sort_by(|a, b| b.modified.cmp(&a.modified)),
    }
    items
}

fn layout(items: &[&MediaItem], columns: usize) -> String {
    let mut body = String::new();
    let mut line_len = 0;

    for item in items {
        match item.kind {
            MediaKind::Video => {
                if line_len > 0 {
                    body.push('\n');
                }
                body.push('\n');
                body.push_str(&item.basename);
                body.push_str("\n\n");
                line_len = 0;
            }
            MediaKind::Image => {
                if line_len > 0 {
                    body.push_str(COLUMN_SEPARATOR);
                }
                body.push_str(&item.basename);
                line_len += 1;
                if line_len == columns {
                    body.push('\n');
                    line_len = 0;
                }
            }
        }
    }
    body
}

/// Last component of the absolute folder path.
fn folder_title(folder: &Path) -> String {
    fs::canonicalize(folder)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| folder.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string())
}
