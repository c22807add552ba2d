//! Rendering is a pure function of the record and the options; the cover resource has to be
//! uploaded by the caller beforehand.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::library::{BookRecord, CustomColumnEntry, CustomColumnValue};
use crate::settings::Settings;

pub const COVER_FILE: &str = "cover.jpg";
pub const RATING_ASSETS_MARKER: &str =
    r#"<div id="calibre-rating-assets" style="display: none;"></div>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub cover_height: u32,
    pub use_spoilers: bool,
    pub activate_attributes: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RenderOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cover_height: settings.cover_height,
            use_spoilers: settings.use_spoilers,
            activate_attributes: settings.activate_attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

#[must_use]
pub fn cover_path(library_root: &Path, book: &BookRecord) -> PathBuf {
    library_root.join(&book.path).join(COVER_FILE)
}

#[must_use]
pub fn render(
    book: &BookRecord,
    library_root: &Path,
    cover_resource: Option<&str>,
    options: &RenderOptions,
) -> RenderedNote {
    let title = book.note_title();
    let mut body = styles(options.cover_height);

    let rows = metadata_rows(book, library_root);
    if options.activate_attributes && rows.rating_rendered {
        body.push_str(RATING_ASSETS_MARKER);
        body.push_str("\n\n");
    }

    body.push_str(&format!("# {}\n\n", book.title));
    match cover_resource {
        Some(id) => body.push_str(&format!("![{title}](:/{id})\n\n")),
        None => body.push_str("No Cover\n\n"),
    }

    body.push_str("|||\n|-|-|\n");
    for (label, value) in &rows.rows {
        body.push_str(&format!("|{}:|{}|\n", table_cell(label), table_cell(value)));
    }

    if let Some(comments) = &book.comments {
        body.push_str(&section("Comments", comments, options.use_spoilers));
    }
    if let Some(content) = &book.content {
        body.push_str(&section("Content", content, options.use_spoilers));
    }
    for (entry, text) in book.comment_columns() {
        body.push_str(&section(&entry.name, text, options.use_spoilers));
    }

    RenderedNote {
        title,
        body,
        tags: book
            .tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}

fn styles(cover_height: u32) -> String {
    format!(
        "\n<style>\n\timg {{ height: {cover_height}px; }}\n\ttable {{ border-style: hidden; border-collapse: collapse; }}\n\tthead {{ display: none; }}\n\ttd {{ font-size: small; }}\n\ttd:nth-child(odd) {{ font-style: Italic }}\n</style>\n\n"
    )
}

struct MetadataRows {
    rows: Vec<(String, String)>,
    rating_rendered: bool,
}

fn metadata_rows(book: &BookRecord, library_root: &Path) -> MetadataRows {
    let mut rows = vec![
        ("Formats".to_owned(), format_links(book, library_root)),
        ("Authors".to_owned(), book.author_sort.clone()),
    ];
    if !book.series.is_empty() {
        rows.push(("Series".to_owned(), book.series.clone()));
    }
    let mut rating_rendered = false;
    for entry in book.simple_columns() {
        if matches!(entry.value, CustomColumnValue::Rating(Some(_))) {
            rating_rendered = true;
        }
        if let Some(value) = column_cell(entry) {
            rows.push((entry.name.clone(), value));
        }
    }
    MetadataRows {
        rows,
        rating_rendered,
    }
}

fn column_cell(entry: &CustomColumnEntry) -> Option<String> {
    match &entry.value {
        CustomColumnValue::Bool(value) => {
            value.map(|flag| if flag { "Yes" } else { "No" }.to_owned())
        }
        CustomColumnValue::Rating(value) => value.map(rating),
        CustomColumnValue::Text(values) | CustomColumnValue::Other(values) => {
            (!values.is_empty()).then(|| values.join(", "))
        }
        CustomColumnValue::Comments(_) => None,
    }
}

/// Calibre ratings count half stars: 7 renders as three and a half stars out of five.
fn rating(half_stars: u8) -> String {
    let half_stars = half_stars.min(10);
    let full = usize::from(half_stars / 2);
    let half = usize::from(half_stars % 2);
    let empty = 5 - full - half;
    format!(
        r#"<span class="calibre-rating" rating="{half_stars}">{}{}{}</span>"#,
        "★".repeat(full),
        "½".repeat(half),
        "☆".repeat(empty)
    )
}

fn format_links(book: &BookRecord, library_root: &Path) -> String {
    book.formats
        .iter()
        .map(|format| {
            let stem = library_root.join(&book.path).join(&format.file_name_stem);
            let target = format!(
                "{}.{}",
                stem.to_string_lossy().replace('\\', "/"),
                format.format.to_lowercase()
            );
            let target = target
                .trim_start_matches('/')
                .replace(' ', "%20")
                .replace('(', "%28")
                .replace(')', "%29");
            format!("[{}](file:///{target})", format.format)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn table_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn section(label: &str, content: &str, use_spoilers: bool) -> String {
    if use_spoilers {
        format!("\n:[\n{label}\n\n{content}\n\n]:\n")
    } else {
        format!("\n## {label}\n\n{content}\n\n")
    }
}
