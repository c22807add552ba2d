mod assembler;
mod model;
mod sqlite;

use std::path::Path;

use async_trait::async_trait;

pub use assembler::RecordAssembler;
pub use model::{
    BookFormat, BookRecord, ColumnDatatype, ColumnMeta, CustomColumnEntry, CustomColumnValue,
};
pub use sqlite::{CalibreDb, parse_calibre_timestamp};

use crate::taxonomy::GenreMap;

#[async_trait]
pub trait LibrarySource: Send + Sync {
    fn root(&self) -> &Path;

    async fn column_meta(&self, label: &str) -> crate::Result<ColumnMeta>;

    async fn custom_columns(&self) -> crate::Result<Vec<ColumnMeta>>;

    async fn genre_entries(&self, table: &str, pattern: &str) -> crate::Result<GenreMap>;

    /// Base fields of the books linked to `genre_id`, in title-sort order.
    async fn books_for_genre(
        &self,
        link_table: &str,
        genre_id: i64,
        title_pattern: &str,
    ) -> crate::Result<Vec<BookRecord>>;

    async fn comments(&self, book_id: i64) -> crate::Result<Option<String>>;

    async fn custom_column_value(&self, table: &str, book_id: i64)
    -> crate::Result<Option<String>>;

    async fn formats(&self, book_id: i64) -> crate::Result<Vec<BookFormat>>;

    async fn tags(&self, book_id: i64) -> crate::Result<Vec<String>>;

    async fn series(&self, book_id: i64) -> crate::Result<String>;

    async fn custom_column_entries(
        &self,
        column: &ColumnMeta,
        book_id: i64,
    ) -> crate::Result<Vec<String>>;
}
