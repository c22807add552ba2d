use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookFormat {
    pub format: String,
    pub file_name_stem: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub has_cover: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_sort: String,
    pub formats: Vec<BookFormat>,
    pub tags: BTreeSet<String>,
    /// `"{series} : {index}"`, empty when the book is not part of a series.
    pub series: String,
    pub comments: Option<String>,
    pub content: Option<String>,
    pub custom_columns: Vec<CustomColumnEntry>,
}

impl BookRecord {
    /// Title of the note that represents this book. The id disambiguates equal titles.
    #[must_use]
    pub fn note_title(&self) -> String {
        format!("{} ({})", self.title, self.id)
    }

    pub fn simple_columns(&self) -> impl Iterator<Item = &CustomColumnEntry> {
        self.custom_columns
            .iter()
            .filter(|entry| !matches!(entry.value, CustomColumnValue::Comments(_)))
    }

    pub fn comment_columns(&self) -> impl Iterator<Item = (&CustomColumnEntry, &str)> {
        self.custom_columns
            .iter()
            .filter_map(|entry| match &entry.value {
                CustomColumnValue::Comments(text) => Some((entry, text.as_str())),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColumnDatatype {
    Bool,
    Rating,
    Text,
    Comments,
    Other(String),
}

impl ColumnDatatype {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bool" => Self::Bool,
            "rating" => Self::Rating,
            "text" => Self::Text,
            "comments" => Self::Comments,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Rating => "rating",
            Self::Text => "text",
            Self::Comments => "comments",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub id: i64,
    pub label: String,
    pub name: String,
    pub datatype: ColumnDatatype,
    pub is_multiple: bool,
    pub normalized: bool,
    pub display: serde_json::Value,
}

impl ColumnMeta {
    #[must_use]
    pub fn table(&self) -> String {
        format!("custom_column_{}", self.id)
    }

    #[must_use]
    pub fn link_table(&self) -> Option<String> {
        self.normalized
            .then(|| format!("books_custom_column_{}_link", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CustomColumnValue {
    Bool(Option<bool>),
    /// Calibre stores ratings as half stars, 0..=10.
    Rating(Option<u8>),
    Text(Vec<String>),
    Comments(String),
    Other(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomColumnEntry {
    pub label: String,
    pub name: String,
    pub value: CustomColumnValue,
}
