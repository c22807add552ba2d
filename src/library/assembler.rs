use std::sync::Arc;

use crate::error::{ImportError, inline_error_marker};
use crate::library::{
    BookRecord, ColumnDatatype, ColumnMeta, CustomColumnEntry, CustomColumnValue, LibrarySource,
};
use crate::markdown::HtmlConverter;
use crate::settings::Settings;
use crate::taxonomy::GenreMap;

pub struct RecordAssembler {
    source: Arc<dyn LibrarySource>,
    converter: Arc<dyn HtmlConverter>,
    genre: ColumnMeta,
    content: Option<ColumnMeta>,
    columns: Vec<ColumnMeta>,
    convert_html: bool,
    shrink_genres: String,
}

impl std::fmt::Debug for RecordAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordAssembler")
            .field("genre", &self.genre.label)
            .field("content", &self.content.as_ref().map(|c| &c.label))
            .field("columns", &self.columns.len())
            .field("convert_html", &self.convert_html)
            .finish()
    }
}

impl RecordAssembler {
    pub async fn prepare(
        source: Arc<dyn LibrarySource>,
        converter: Arc<dyn HtmlConverter>,
        settings: &Settings,
    ) -> crate::Result<Self> {
        let genre = source.column_meta(&settings.genre_field).await?;
        if genre.link_table().is_none() {
            return Err(ImportError::config(format!(
                "genre column '{}' is not a normalized (tag-like) column",
                genre.label
            )));
        }
        let content = match settings.content_field() {
            Some(label) => Some(source.column_meta(label).await?),
            None => None,
        };
        let mut columns = Vec::with_capacity(settings.custom_columns.len());
        for label in &settings.custom_columns {
            columns.push(source.column_meta(label).await?);
        }
        tracing::debug!(
            genre = %genre.label,
            content = ?content.as_ref().map(|c| c.label.as_str()),
            columns = columns.len(),
            "resolved library columns"
        );
        Ok(Self {
            source,
            converter,
            genre,
            content,
            columns,
            convert_html: settings.convert_html,
            shrink_genres: settings.shrink_genres.clone(),
        })
    }

    pub fn source(&self) -> &Arc<dyn LibrarySource> {
        &self.source
    }

    pub async fn genres(&self) -> crate::Result<GenreMap> {
        self.source
            .genre_entries(&self.genre.table(), &self.shrink_genres)
            .await
    }

    /// Fully enriched records of the books attached to `genre_id`, in source order.
    pub async fn books_for_genre(
        &self,
        genre_id: i64,
        title_filter: &str,
    ) -> crate::Result<Vec<BookRecord>> {
        let link_table = self
            .genre
            .link_table()
            .ok_or_else(|| ImportError::config("genre column has no link table"))?;
        let mut books = self
            .source
            .books_for_genre(&link_table, genre_id, title_filter)
            .await?;
        for book in &mut books {
            self.enrich(book).await?;
        }
        Ok(books)
    }

    async fn enrich(&self, book: &mut BookRecord) -> crate::Result<()> {
        let id = book.id;
        book.comments = match self.source.comments(id).await? {
            Some(html) => Some(self.convert("comments", &html)),
            None => None,
        };
        if let Some(content) = &self.content {
            book.content = match self.source.custom_column_value(&content.table(), id).await? {
                Some(html) if !html.trim().is_empty() => Some(self.convert(&content.name, &html)),
                _ => None,
            };
        }
        book.formats = self.source.formats(id).await?;
        book.tags = self.source.tags(id).await?.into_iter().collect();
        book.series = self.source.series(id).await?;

        let mut entries = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let raw = self.source.custom_column_entries(column, id).await?;
            if let Some(value) = self.column_value(column, raw) {
                entries.push(CustomColumnEntry {
                    label: column.label.clone(),
                    name: column.name.clone(),
                    value,
                });
            }
        }
        book.custom_columns = entries;
        Ok(())
    }

    fn convert(&self, field: &str, html: &str) -> String {
        if !self.convert_html {
            return html.to_owned();
        }
        match self.converter.to_markdown(html) {
            Ok(markdown) => markdown,
            Err(err) => {
                tracing::warn!(field, error = %err, "html conversion failed");
                inline_error_marker(&err)
            }
        }
    }

    fn column_value(&self, column: &ColumnMeta, raw: Vec<String>) -> Option<CustomColumnValue> {
        let value = match &column.datatype {
            ColumnDatatype::Bool => match raw.first() {
                None => CustomColumnValue::Bool(None),
                Some(value) => match parse_bool(value) {
                    Ok(flag) => CustomColumnValue::Bool(Some(flag)),
                    Err(err) => parse_failure(column, err),
                },
            },
            ColumnDatatype::Rating => match raw.first() {
                None => CustomColumnValue::Rating(None),
                Some(value) => match parse_rating(value) {
                    Ok(rating) => CustomColumnValue::Rating(Some(rating)),
                    Err(err) => parse_failure(column, err),
                },
            },
            ColumnDatatype::Comments => {
                let html = raw.into_iter().next()?;
                if html.trim().is_empty() {
                    return None;
                }
                CustomColumnValue::Comments(self.convert(&column.name, &html))
            }
            ColumnDatatype::Text => CustomColumnValue::Text(raw),
            ColumnDatatype::Other(_) => CustomColumnValue::Other(raw),
        };
        Some(value)
    }
}

fn parse_failure(column: &ColumnMeta, err: ImportError) -> CustomColumnValue {
    tracing::warn!(column = %column.label, error = %err, "custom column value rendered inline");
    CustomColumnValue::Text(vec![inline_error_marker(&err)])
}

fn parse_bool(raw: &str) -> crate::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ImportError::transform("bool", format!("unexpected value {other:?}"))),
    }
}

fn parse_rating(raw: &str) -> crate::Result<u8> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ImportError::transform("rating", format!("not a number: {raw:?}")))?;
    if !value.is_finite() {
        return Err(ImportError::transform("rating", format!("not a number: {raw:?}")));
    }
    Ok(value.round().clamp(0.0, 10.0) as u8)
}
