//! Album document parsing.
//!
//! An album document is line-oriented text. Each line is one of:
//!
//! ```text
//! :folder photos/lisbon        # Directive: starts with ':'
//! :use album.css
//!
//! # Day one                    # Prose: anything that is not media
//! We landed *late*.
//!
//! tram.jpg   river.jpg         # Media row: first token is a known file
//! alfama.mp4
//! ```
//!
//! Prose and media are not delimited explicitly. Whether a line is a media
//! row depends on a catalog lookup of its first whitespace-separated token,
//! so parsing needs the [`MediaCatalog`] and therefore needs the folder. The
//! folder is found by a separate pre-pass ([`find_folder`]) that never
//! touches the filesystem.
//!
//! ## Grouping
//!
//! [`Grouper`] is a two-state machine fed one line at a time:
//!
//! - **ScanningMedia** (between blocks): blank lines are skipped, directives
//!   are applied, a media line becomes a [`Block::MediaRow`], any other line
//!   opens a prose block.
//! - **ScanningProse**: every line, blank lines and directive-looking lines
//!   included, is appended to the open block until a media line arrives. That
//!   line closes the block and is then handled in ScanningMedia.
//!
//! End of input closes any open prose block.

use crate::config::UnresolvedPolicy;
use crate::scan::MediaCatalog;
use std::path::PathBuf;
use thiserror::Error;

/// First character of a directive line.
pub const DIRECTIVE_MARKER: char = ':';

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No :folder directive in album file")]
    MissingFolderDirective,
    #[error("Line {line}: {directive} needs a path argument")]
    MissingArgument { line: usize, directive: &'static str },
    #[error("Line {line}: {token} is not a file in the media folder")]
    UnresolvedToken { line: usize, token: String },
}

/// One physical line of the album document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLine<'a> {
    /// 1-based line number.
    pub number: usize,
    pub text: &'a str,
}

impl<'a> DocumentLine<'a> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_directive(&self) -> bool {
        self.text.starts_with(DIRECTIVE_MARKER)
    }

    /// First whitespace-separated token, if any.
    pub fn first_field(&self) -> Option<&'a str> {
        self.text.split_whitespace().next()
    }
}

/// Split raw document text into numbered lines (`\n` or `\r\n`).
pub fn split_lines(text: &str) -> Vec<DocumentLine<'_>> {
    text.lines()
        .enumerate()
        .map(|(idx, text)| DocumentLine {
            number: idx + 1,
            text,
        })
        .collect()
}

/// A parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `:folder <path>`: media root.
    Folder(PathBuf),
    /// `:use <path>`: stylesheet embedded into the output head.
    Use(PathBuf),
    /// `:show_filenames`: accepted, currently has no effect on output.
    ShowFilenames,
    /// Any other `:name`; ignored.
    Unknown(String),
}

impl Directive {
    /// Parse a line that starts with [`DIRECTIVE_MARKER`].
    pub fn parse(line: &DocumentLine<'_>) -> Result<Self, ParseError> {
        let mut fields = line.text.split_whitespace();
        let name = fields.next().unwrap_or_default();
        let arg = fields.next();

        let path_arg = |directive: &'static str| {
            arg.map(PathBuf::from).ok_or(ParseError::MissingArgument {
                line: line.number,
                directive,
            })
        };

        match name {
            ":folder" => path_arg(":folder").map(Directive::Folder),
            ":use" => path_arg(":use").map(Directive::Use),
            ":show_filenames" => Ok(Directive::ShowFilenames),
            other => Ok(Directive::Unknown(other.to_string())),
        }
    }
}

/// Locate the media folder without resolving any media.
///
/// The first `:folder` directive anywhere in the document wins.
pub fn find_folder(lines: &[DocumentLine<'_>]) -> Result<PathBuf, ParseError> {
    for line in lines.iter().filter(|l| l.is_directive()) {
        if let Directive::Folder(path) = Directive::parse(line)? {
            return Ok(path);
        }
    }
    Err(ParseError::MissingFolderDirective)
}

/// A unit of output, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Distinct basenames from one media line, left to right.
    MediaRow(Vec<String>),
    /// Consecutive non-media lines joined with `\n`.
    Prose(String),
}

/// Values set by directives at block boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub stylesheet: Option<PathBuf>,
    pub show_filenames: bool,
}

/// A fully parsed album document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub folder: PathBuf,
    pub directives: Directives,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Every basename used by a media row, each once, in first-use order.
    pub fn referenced_media(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::MediaRow(names) => Some(names),
                Block::Prose(_) => None,
            })
            .flatten()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn media_row_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::MediaRow(_)))
            .count()
    }

    pub fn prose_count(&self) -> usize {
        self.blocks.len() - self.media_row_count()
    }
}

/// Is this line a media row, judged by its first token?
pub fn starts_media_row(line: &DocumentLine<'_>, catalog: &MediaCatalog) -> bool {
    line.first_field()
        .is_some_and(|field| catalog.contains(field))
}

#[derive(Debug)]
enum State {
    ScanningMedia,
    ScanningProse(String),
}

/// Folds classified lines into blocks with one line of lookahead.
pub struct Grouper<'c> {
    catalog: &'c MediaCatalog,
    policy: UnresolvedPolicy,
    state: State,
    blocks: Vec<Block>,
    directives: Directives,
}

impl<'c> Grouper<'c> {
    pub fn new(catalog: &'c MediaCatalog, policy: UnresolvedPolicy) -> Self {
        Self {
            catalog,
            policy,
            state: State::ScanningMedia,
            blocks: Vec::new(),
            directives: Directives::default(),
        }
    }

    /// True while a prose block is open.
    pub fn in_prose(&self) -> bool {
        matches!(self.state, State::ScanningProse(_))
    }

    pub fn feed(&mut self, line: &DocumentLine<'_>) -> Result<(), ParseError> {
        if let State::ScanningProse(text) = &mut self.state {
            if !starts_media_row(line, self.catalog) {
                text.push('\n');
                text.push_str(line.text);
                return Ok(());
            }
            self.close_prose();
        }
        self.feed_between_blocks(line)
    }

    fn feed_between_blocks(&mut self, line: &DocumentLine<'_>) -> Result<(), ParseError> {
        if line.is_blank() {
            return Ok(());
        }
        if line.is_directive() {
            match Directive::parse(line)? {
                Directive::Use(path) => self.directives.stylesheet = Some(path),
                Directive::ShowFilenames => self.directives.show_filenames = true,
                Directive::Folder(_) => {}
                Directive::Unknown(name) => {
                    tracing::debug!(line = line.number, %name, "ignoring unknown directive");
                }
            }
            return Ok(());
        }
        if starts_media_row(line, self.catalog) {
            let row = self.media_row(line)?;
            tracing::debug!(line = line.number, items = row.len(), "media row");
            self.blocks.push(Block::MediaRow(row));
        } else {
            tracing::debug!(line = line.number, "prose block starts");
            self.state = State::ScanningProse(line.text.to_string());
        }
        Ok(())
    }

    fn media_row(&self, line: &DocumentLine<'_>) -> Result<Vec<String>, ParseError> {
        let mut row: Vec<String> = Vec::new();
        for token in line.text.split_whitespace() {
            if !self.catalog.contains(token) {
                match self.policy {
                    UnresolvedPolicy::Reject => {
                        return Err(ParseError::UnresolvedToken {
                            line: line.number,
                            token: token.to_string(),
                        });
                    }
                    UnresolvedPolicy::Drop => {
                        tracing::warn!(line = line.number, %token, "dropping unknown media name from row");
                        continue;
                    }
                }
            }
            if !row.iter().any(|existing| existing == token) {
                row.push(token.to_string());
            }
        }
        Ok(row)
    }

    fn close_prose(&mut self) {
        if let State::ScanningProse(text) = std::mem::replace(&mut self.state, State::ScanningMedia)
        {
            self.blocks.push(Block::Prose(text));
        }
    }

    /// Close any open prose block and return blocks plus directive values.
    pub fn finish(mut self) -> (Vec<Block>, Directives) {
        self.close_prose();
        (self.blocks, self.directives)
    }
}

/// Parse a whole document against a catalog.
pub fn parse(
    lines: &[DocumentLine<'_>],
    catalog: &MediaCatalog,
    policy: UnresolvedPolicy,
) -> Result<Document, ParseError> {
    let folder = find_folder(lines)?;
    let mut grouper = Grouper::new(catalog, policy);
    for line in lines {
        grouper.feed(line)?;
    }
    let (blocks, directives) = grouper.finish();
    Ok(Document {
        folder,
        directives,
        blocks,
    })
}
