//! HTML rendering and document assembly.
//!
//! Rendering is a pure function of the parsed blocks and the finished
//! encoding stage: blocks are walked strictly in document order and every
//! media cell pulls its payload from the [`EncodedSet`]. Nothing here reads
//! files.
//!
//! ## Media Rows
//!
//! A row of *k* items becomes a centered one-row table with *k* cells, each
//! `width:{100/k}%` (integer division, so three items get 33% each):
//!
//! ```html
//! <div align="center"><table><tr>
//!   <td style="width:50%"><img width="100%" src="data:image/jpeg;base64,..." alt="a.jpg"></td>
//!   <td style="width:50%"><video width="100%" controls src="data:video/mp4;base64,..."></video></td>
//! </tr></table></div>
//! ```
//!
//! ## Prose
//!
//! Prose blocks go through a [`ProseRenderer`] and are inserted unmodified.
//! The production renderer is CommonMark via
//! [pulldown-cmark](https://docs.rs/pulldown-cmark).
//!
//! ## Assembly
//!
//! `<!DOCTYPE html><html><head>[<style>…</style>]</head><body>…</body></html>`
//! built with [maud](https://maud.lambda.xyz/). The stylesheet and rendered
//! fragments are inserted pre-escaped.

use crate::document::{Block, Document};
use crate::process::{EncodedMedia, EncodedSet};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};

/// Converts a prose block to an HTML fragment.
pub trait ProseRenderer {
    fn render(&self, text: &str) -> String;
}

/// CommonMark with tables and strikethrough.
#[derive(Debug, Clone, Copy)]
pub struct Markdown {
    options: Options,
}

impl Default for Markdown {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
        }
    }
}

impl ProseRenderer for Markdown {
    fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options);
        let mut body_html = String::new();
        md_html::push_html(&mut body_html, parser);
        body_html
    }
}

/// Width of each cell in a row of `count` items, in whole percent.
pub fn cell_width_percent(count: usize) -> usize {
    100 / count.max(1)
}

/// Renders one media row as a centered single-row table.
///
/// A name without an encoded entry gets an empty cell.
pub fn render_media_row(names: &[String], encoded: &EncodedSet) -> Markup {
    let width = format!("width:{}%", cell_width_percent(names.len()));
    html! {
        div align="center" {
            table {
                tr {
                    @for name in names {
                        td style=(width) {
                            @if let Some(media) = encoded.get(name) {
                                (media_tag(media))
                            }
                        }
                    }
                }
            }
        }
    }
}

/// `<img>` or `<video>` carrying the payload as a `data:` URI.
fn media_tag(media: &EncodedMedia) -> Markup {
    let src = media.data_uri();
    html! {
        @if media.mime.is_video() {
            video width="100%" controls src=(src) {}
        } @else {
            img width="100%" src=(src) alt=(media.basename);
        }
    }
}

/// Renders one block.
pub fn render_block(block: &Block, encoded: &EncodedSet, prose: &impl ProseRenderer) -> Markup {
    match block {
        Block::MediaRow(names) => render_media_row(names, encoded),
        Block::Prose(text) => PreEscaped(prose.render(text)),
    }
}

/// Wraps rendered fragments in the document skeleton.
pub fn assemble(stylesheet: Option<&str>, fragments: &[Markup]) -> String {
    html! {
        (DOCTYPE)
        html {
            head {
                @if let Some(css) = stylesheet {
                    style { (PreEscaped(css)) }
                }
            }
            body {
                @for fragment in fragments {
                    (fragment)
                }
            }
        }
    }
    .into_string()
}

/// Render every block in document order and assemble the page.
///
/// `encoded` must already hold every referenced basename.
pub fn render_document(
    document: &Document,
    encoded: &EncodedSet,
    stylesheet: Option<&str>,
    prose: &impl ProseRenderer,
) -> String {
    let fragments: Vec<Markup> = document
        .blocks
        .iter()
        .map(|block| render_block(block, encoded, prose))
        .collect();
    assemble(stylesheet, &fragments)
}
