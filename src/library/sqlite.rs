use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension as _, params};

use crate::error::ImportError;
use crate::library::{BookFormat, BookRecord, ColumnDatatype, ColumnMeta, LibrarySource};
use crate::taxonomy::GenreMap;

pub struct CalibreDb {
    root: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for CalibreDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibreDb").field("root", &self.root).finish()
    }
}

impl CalibreDb {
    pub const DB_FILE: &'static str = "metadata.db";

    pub fn open(library: impl AsRef<Path>) -> crate::Result<Self> {
        let root = library.as_ref().to_path_buf();
        let db_path = root.join(Self::DB_FILE);
        if !db_path.is_file() {
            return Err(ImportError::config(format!(
                "Calibre Db file not found: {}",
                db_path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::info!(db = %db_path.display(), "opened calibre library");
        Ok(Self {
            root,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn checked_table(table: &str) -> crate::Result<&str> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(table)
    } else {
        Err(ImportError::config(format!("invalid table name: {table:?}")))
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(text) => Some(text),
    }
}

fn format_series_index(index: f64) -> String {
    if index.fract() == 0.0 {
        format!("{index:.0}")
    } else {
        index.to_string()
    }
}

/// Parses the timestamps Calibre writes (`2021-03-04 10:20:30.123456+00:00` and variants) as UTC.
pub fn parse_calibre_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    None
}

fn timestamp_column(book_id: i64, column: &str, raw: Option<String>) -> DateTime<Utc> {
    match raw.as_deref().and_then(parse_calibre_timestamp) {
        Some(parsed) => parsed,
        None => {
            tracing::warn!(book_id, column, raw = ?raw, "unparseable timestamp; using epoch");
            DateTime::<Utc>::default()
        }
    }
}

#[async_trait]
impl LibrarySource for CalibreDb {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn column_meta(&self, label: &str) -> crate::Result<ColumnMeta> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, label, name, datatype, is_multiple, normalized, display
                 FROM custom_columns WHERE label = ?1",
                params![label],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, label, name, datatype, is_multiple, normalized, display)) = row else {
            return Err(ImportError::config(format!(
                "The custom column '{label}' is configured but not present in the Calibre database"
            )));
        };
        let display = match display.as_deref().map(serde_json::from_str) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                tracing::warn!(label = %label, ?err, "ignoring unparseable column display options");
                serde_json::Value::Null
            }
            None => serde_json::Value::Null,
        };
        Ok(ColumnMeta {
            id,
            label,
            name,
            datatype: ColumnDatatype::parse(&datatype),
            is_multiple,
            normalized,
            display,
        })
    }

    async fn custom_columns(&self) -> crate::Result<Vec<ColumnMeta>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, label, name, datatype, is_multiple, normalized FROM custom_columns ORDER BY id",
        )?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnMeta {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    name: row.get(2)?,
                    datatype: ColumnDatatype::parse(&row.get::<_, String>(3)?),
                    is_multiple: row.get(4)?,
                    normalized: row.get(5)?,
                    display: serde_json::Value::Null,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn genre_entries(&self, table: &str, pattern: &str) -> crate::Result<GenreMap> {
        let table = checked_table(table)?;
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, value FROM {table} WHERE value LIKE ?1 ORDER BY value"
        ))?;
        let genres = stmt
            .query_map(params![pattern], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?))
            })?
            .collect::<Result<GenreMap, _>>()?;
        Ok(genres)
    }

    async fn books_for_genre(
        &self,
        link_table: &str,
        genre_id: i64,
        title_pattern: &str,
    ) -> crate::Result<Vec<BookRecord>> {
        let link_table = checked_table(link_table)?;
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT books.id, books.title, books.path, books.has_cover, books.timestamp,
                    books.last_modified, books.author_sort
             FROM books
             INNER JOIN {link_table} AS link ON books.id = link.book
             WHERE link.value = ?1 AND books.title LIKE ?2
             ORDER BY books.sort, books.id"
        ))?;
        let rows = stmt
            .query_map(params![genre_id, title_pattern], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<bool>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let books = rows
            .into_iter()
            .map(
                |(id, title, path, has_cover, timestamp, last_modified, author_sort)| BookRecord {
                    id,
                    title,
                    path,
                    has_cover: has_cover.unwrap_or(false),
                    created_at: timestamp_column(id, "timestamp", timestamp),
                    updated_at: timestamp_column(id, "last_modified", last_modified),
                    author_sort: author_sort.unwrap_or_default(),
                    ..BookRecord::default()
                },
            )
            .collect();
        Ok(books)
    }

    async fn comments(&self, book_id: i64) -> crate::Result<Option<String>> {
        let conn = self.conn();
        let text = conn
            .query_row(
                "SELECT text FROM comments WHERE book = ?1",
                params![book_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(text.flatten())
    }

    async fn custom_column_value(
        &self,
        table: &str,
        book_id: i64,
    ) -> crate::Result<Option<String>> {
        let table = checked_table(table)?;
        let conn = self.conn();
        let value = conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE book = ?1"),
                params![book_id],
                |row| row.get::<_, Value>(0),
            )
            .optional()?;
        Ok(value.and_then(value_to_string))
    }

    async fn formats(&self, book_id: i64) -> crate::Result<Vec<BookFormat>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT format, name FROM data WHERE book = ?1 ORDER BY format")?;
        let formats = stmt
            .query_map(params![book_id], |row| {
                Ok(BookFormat {
                    format: row.get(0)?,
                    file_name_stem: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(formats)
    }

    async fn tags(&self, book_id: i64) -> crate::Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT tags.name FROM tags
             INNER JOIN books_tags_link AS link ON tags.id = link.tag
             WHERE link.book = ?1
             ORDER BY tags.name",
        )?;
        let tags = stmt
            .query_map(params![book_id], |row| row.get::<_, String>(0))?
            .map(|name| name.map(|name| name.to_lowercase()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    async fn series(&self, book_id: i64) -> crate::Result<String> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT series.name, books.series_index FROM books
                 INNER JOIN books_series_link AS link ON books.id = link.book
                 INNER JOIN series ON series.id = link.series
                 WHERE books.id = ?1",
                params![book_id],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<f64>>(1)?)),
            )
            .optional()?;
        match row {
            Some((Some(name), Some(index))) => Ok(format!("{name} : {}", format_series_index(index))),
            _ => Ok(String::new()),
        }
    }

    async fn custom_column_entries(
        &self,
        column: &ColumnMeta,
        book_id: i64,
    ) -> crate::Result<Vec<String>> {
        let table = column.table();
        let table = checked_table(&table)?;
        let sql = match column.link_table() {
            Some(link_table) => format!(
                "SELECT cc.value FROM {table} AS cc
                 INNER JOIN {} AS link ON cc.id = link.value
                 WHERE link.book = ?1
                 ORDER BY cc.value",
                checked_table(&link_table)?
            ),
            None => format!("SELECT value FROM {table} WHERE book = ?1"),
        };
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map(params![book_id], |row| row.get::<_, Value>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values.into_iter().filter_map(value_to_string).collect())
    }
}
