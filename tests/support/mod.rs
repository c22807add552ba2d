#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use async_trait::async_trait;
use calibre_import::ImportError;
use calibre_import::library::{
    BookFormat, BookRecord, ColumnDatatype, ColumnMeta, LibrarySource,
};
use calibre_import::settings::Settings;
use calibre_import::store::{
    FolderRecord, NoteRecord, NoteStore, NoteTimes, ResourcePayload, TagRecord,
};
use calibre_import::taxonomy::GenreMap;
use chrono::{DateTime, TimeZone as _, Utc};

pub fn settings() -> Settings {
    Settings {
        content_field: String::new(),
        ..Settings::default()
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

// ---------------------------------------------------------------------------------------------
// note store

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub record: NoteRecord,
    pub body: String,
}

#[derive(Debug, Default)]
struct State {
    folders: Vec<FolderRecord>,
    notes: Vec<StoredNote>,
    tags: Vec<TagRecord>,
    /// (tag id, note id)
    assignments: BTreeSet<(String, String)>,
    /// (id, title, size)
    resources: Vec<(String, String, u64)>,
    writes: Vec<String>,
    next_id: u64,
    fail_on: Option<String>,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn record(&mut self, op: String) -> anyhow::Result<()> {
        if let Some(prefix) = &self.fail_on
            && op.starts_with(prefix.as_str())
        {
            anyhow::bail!("injected failure: {op}");
        }
        self.writes.push(op);
        Ok(())
    }

    fn note_title(&self, note_id: &str) -> String {
        self.notes
            .iter()
            .find(|note| note.record.id == note_id)
            .map(|note| note.record.title.clone())
            .unwrap_or_else(|| note_id.to_owned())
    }

    fn tag_title(&self, tag_id: &str) -> String {
        self.tags
            .iter()
            .find(|tag| tag.id == tag_id)
            .map(|tag| tag.title.clone())
            .unwrap_or_else(|| tag_id.to_owned())
    }

    fn folder_path(&self, id: &str) -> String {
        let mut titles = Vec::new();
        let mut current = id.to_owned();
        while let Some(folder) = self.folders.iter().find(|f| f.id == current) {
            titles.push(folder.title.clone());
            current = folder.parent_id.clone();
        }
        titles.reverse();
        titles.join("/")
    }
}

/// Note store kept in memory. Every write is appended to a log (`writes()`).
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

/// Store contents keyed by paths, independent of generated ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub folders: Vec<String>,
    /// (folder path, title, body, tags)
    pub notes: Vec<(String, String, String, Vec<String>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock")
    }

    pub fn add_folder(&self, parent_id: &str, title: &str) -> String {
        let mut state = self.lock();
        let id = state.id("f");
        state.folders.push(FolderRecord {
            id: id.clone(),
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
        });
        id
    }

    pub fn add_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        updated: DateTime<Utc>,
    ) -> String {
        let mut state = self.lock();
        let id = state.id("n");
        state.notes.push(StoredNote {
            record: NoteRecord {
                id: id.clone(),
                parent_id: parent_id.to_owned(),
                title: title.to_owned(),
                user_created_time: updated.timestamp_millis(),
                user_updated_time: updated.timestamp_millis(),
            },
            body: body.to_owned(),
        });
        id
    }

    pub fn tag_note(&self, note_id: &str, title: &str) {
        let mut state = self.lock();
        let existing = state
            .tags
            .iter()
            .find(|tag| tag.title == title)
            .map(|tag| tag.id.clone());
        let tag_id = match existing {
            Some(id) => id,
            None => {
                let id = state.id("t");
                state.tags.push(TagRecord {
                    id: id.clone(),
                    title: title.to_owned(),
                });
                id
            }
        };
        state.assignments.insert((tag_id, note_id.to_owned()));
    }

    /// Makes every write whose log entry starts with `prefix` fail.
    pub fn fail_on(&self, prefix: &str) {
        self.lock().fail_on = Some(prefix.to_owned());
    }

    pub fn clear_failure(&self) {
        self.lock().fail_on = None;
    }

    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    pub fn folder_paths(&self) -> Vec<String> {
        let state = self.lock();
        let mut paths: Vec<String> = state
            .folders
            .iter()
            .map(|folder| state.folder_path(&folder.id))
            .collect();
        paths.sort();
        paths
    }

    pub fn folder_id(&self, path: &str) -> Option<String> {
        let state = self.lock();
        state
            .folders
            .iter()
            .find(|folder| state.folder_path(&folder.id) == path)
            .map(|folder| folder.id.clone())
    }

    pub fn note(&self, title: &str) -> Option<StoredNote> {
        self.lock()
            .notes
            .iter()
            .find(|note| note.record.title == title)
            .cloned()
    }

    pub fn note_count(&self) -> usize {
        self.lock().notes.len()
    }

    /// Folder path of the note titled `title`.
    pub fn note_folder(&self, title: &str) -> Option<String> {
        let state = self.lock();
        let note = state.notes.iter().find(|note| note.record.title == title)?;
        Some(state.folder_path(&note.record.parent_id))
    }

    pub fn note_tag_titles(&self, note_id: &str) -> Vec<String> {
        let state = self.lock();
        let mut titles: Vec<String> = state
            .assignments
            .iter()
            .filter(|(_, note)| note == note_id)
            .map(|(tag, _)| state.tag_title(tag))
            .collect();
        titles.sort();
        titles
    }

    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        let folders = self.folder_paths();
        let state = self.lock();
        let mut notes: Vec<_> = state
            .notes
            .iter()
            .map(|note| {
                let mut tags: Vec<String> = state
                    .assignments
                    .iter()
                    .filter(|(_, id)| *id == note.record.id)
                    .map(|(tag, _)| state.tag_title(tag))
                    .collect();
                tags.sort();
                (
                    state.folder_path(&note.record.parent_id),
                    note.record.title.clone(),
                    note.body.clone(),
                    tags,
                )
            })
            .collect();
        notes.sort();
        Snapshot { folders, notes }
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_folders(&self) -> anyhow::Result<Vec<FolderRecord>> {
        Ok(self.lock().folders.clone())
    }

    async fn list_notes(&self, folder_id: &str) -> anyhow::Result<Vec<NoteRecord>> {
        Ok(self
            .lock()
            .notes
            .iter()
            .filter(|note| note.record.parent_id == folder_id)
            .map(|note| note.record.clone())
            .collect())
    }

    async fn create_folder(&self, parent_id: &str, title: &str) -> anyhow::Result<FolderRecord> {
        let mut state = self.lock();
        let path = state.folder_path(parent_id);
        state.record(format!("create_folder {path}/{title}"))?;
        let folder = FolderRecord {
            id: state.id("f"),
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: NoteTimes,
    ) -> anyhow::Result<NoteRecord> {
        let mut state = self.lock();
        state.record(format!("create_note {title}"))?;
        let record = NoteRecord {
            id: state.id("n"),
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
            user_created_time: times.created.timestamp_millis(),
            user_updated_time: times.updated.timestamp_millis(),
        };
        state.notes.push(StoredNote {
            record: record.clone(),
            body: body.to_owned(),
        });
        Ok(record)
    }

    async fn update_note_body(
        &self,
        note_id: &str,
        body: &str,
        times: NoteTimes,
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        let title = state.note_title(note_id);
        state.record(format!("update_note {title}"))?;
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.record.id == note_id)
            .context("no such note")?;
        note.body = body.to_owned();
        note.record.user_created_time = times.created.timestamp_millis();
        note.record.user_updated_time = times.updated.timestamp_millis();
        Ok(())
    }

    async fn upload_resource_if_absent(
        &self,
        title: &str,
        payload: ResourcePayload<'_>,
    ) -> anyhow::Result<String> {
        let size = match payload {
            ResourcePayload::File(path) => std::fs::metadata(path)?.len(),
            ResourcePayload::Bytes(bytes) => bytes.len() as u64,
        };
        let mut state = self.lock();
        if let Some((id, _, _)) = state
            .resources
            .iter()
            .find(|(_, existing, existing_size)| existing == title && *existing_size == size)
        {
            return Ok(id.clone());
        }
        state.record(format!("upload {title}"))?;
        let id = state.id("r");
        state.resources.push((id.clone(), title.to_owned(), size));
        Ok(id)
    }

    async fn note_tags(&self, note_id: &str) -> anyhow::Result<Vec<TagRecord>> {
        let state = self.lock();
        Ok(state
            .assignments
            .iter()
            .filter(|(_, note)| note == note_id)
            .filter_map(|(tag, _)| state.tags.iter().find(|t| t.id == *tag).cloned())
            .collect())
    }

    async fn create_or_get_tag(&self, title: &str) -> anyhow::Result<TagRecord> {
        let mut state = self.lock();
        if let Some(tag) = state.tags.iter().find(|tag| tag.title == title) {
            return Ok(tag.clone());
        }
        state.record(format!("create_tag {title}"))?;
        let tag = TagRecord {
            id: state.id("t"),
            title: title.to_owned(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn assign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        let op = format!("assign {} {}", state.tag_title(tag_id), state.note_title(note_id));
        state.record(op)?;
        state
            .assignments
            .insert((tag_id.to_owned(), note_id.to_owned()));
        Ok(())
    }

    async fn unassign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        let op = format!("unassign {} {}", state.tag_title(tag_id), state.note_title(note_id));
        state.record(op)?;
        state
            .assignments
            .remove(&(tag_id.to_owned(), note_id.to_owned()));
        Ok(())
    }

    async fn delete_note(&self, note_id: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        let title = state.note_title(note_id);
        state.record(format!("delete_note {title}"))?;
        state.notes.retain(|note| note.record.id != note_id);
        state.assignments.retain(|(_, note)| note != note_id);
        Ok(())
    }

    async fn delete_folder(&self, folder_id: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        let path = state.folder_path(folder_id);
        state.record(format!("delete_folder {path}"))?;
        state.folders.retain(|folder| folder.id != folder_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------------------------
// library

#[derive(Debug, Clone)]
pub struct LibraryBook {
    pub genre_ids: Vec<i64>,
    pub record: BookRecord,
    pub comments: Option<String>,
    /// Raw values by column label.
    pub columns: HashMap<String, Vec<String>>,
}

/// A book titled `title` in genre `genre_id`, written at [`at`]`(id)`.
pub fn book(id: i64, title: &str, genre_id: i64) -> LibraryBook {
    LibraryBook {
        genre_ids: vec![genre_id],
        record: BookRecord {
            id,
            title: title.to_owned(),
            path: format!("Author/{title} ({id})"),
            has_cover: false,
            created_at: at(0),
            updated_at: at(id),
            author_sort: "Author, Some".to_owned(),
            formats: vec![BookFormat {
                format: "EPUB".to_owned(),
                file_name_stem: format!("{title} - Author"),
            }],
            ..BookRecord::default()
        },
        comments: None,
        columns: HashMap::new(),
    }
}

impl LibraryBook {
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.record.tags = tags.iter().map(|tag| (*tag).to_owned()).collect();
        self
    }

    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.record.updated_at = updated;
        self
    }

    pub fn comments(mut self, html: &str) -> Self {
        self.comments = Some(html.to_owned());
        self
    }

    pub fn column(mut self, label: &str, values: &[&str]) -> Self {
        self.columns.insert(
            label.to_owned(),
            values.iter().map(|v| (*v).to_owned()).collect(),
        );
        self
    }

    pub fn cover(mut self) -> Self {
        self.record.has_cover = true;
        self
    }
}

/// Library source kept in memory. The genre column has label `genre`.
#[derive(Debug, Clone)]
pub struct MemoryLibrary {
    root: PathBuf,
    columns: Vec<ColumnMeta>,
    genres: GenreMap,
    books: Vec<LibraryBook>,
}

fn like(pattern: &str, value: &str) -> bool {
    let mut regex = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex::Regex::new(&regex)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

impl MemoryLibrary {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            columns: Vec::new(),
            genres: GenreMap::new(),
            books: Vec::new(),
        }
        .with_column(1, "genre", "Genre", "text", true)
    }

    pub fn with_column(
        mut self,
        id: i64,
        label: &str,
        name: &str,
        datatype: &str,
        normalized: bool,
    ) -> Self {
        self.columns.push(ColumnMeta {
            id,
            label: label.to_owned(),
            name: name.to_owned(),
            datatype: ColumnDatatype::parse(datatype),
            is_multiple: false,
            normalized,
            display: serde_json::Value::Null,
        });
        self
    }

    pub fn genre(mut self, key: &str, id: i64) -> Self {
        self.genres.insert(key.to_owned(), id);
        self
    }

    pub fn book(mut self, book: LibraryBook) -> Self {
        self.books.push(book);
        self
    }

    fn find(&self, book_id: i64) -> Option<&LibraryBook> {
        self.books.iter().find(|book| book.record.id == book_id)
    }
}

#[async_trait]
impl LibrarySource for MemoryLibrary {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn column_meta(&self, label: &str) -> calibre_import::Result<ColumnMeta> {
        self.columns
            .iter()
            .find(|column| column.label == label)
            .cloned()
            .ok_or_else(|| ImportError::config(format!("unknown column '{label}'")))
    }

    async fn custom_columns(&self) -> calibre_import::Result<Vec<ColumnMeta>> {
        Ok(self.columns.clone())
    }

    async fn genre_entries(&self, _table: &str, pattern: &str) -> calibre_import::Result<GenreMap> {
        Ok(self
            .genres
            .iter()
            .filter(|(key, _)| like(pattern, key))
            .map(|(key, id)| (key.clone(), *id))
            .collect())
    }

    async fn books_for_genre(
        &self,
        _link_table: &str,
        genre_id: i64,
        title_pattern: &str,
    ) -> calibre_import::Result<Vec<BookRecord>> {
        Ok(self
            .books
            .iter()
            .filter(|book| book.genre_ids.contains(&genre_id))
            .filter(|book| like(title_pattern, &book.record.title))
            .map(|book| BookRecord {
                formats: Vec::new(),
                tags: BTreeSet::new(),
                series: String::new(),
                ..book.record.clone()
            })
            .collect())
    }

    async fn comments(&self, book_id: i64) -> calibre_import::Result<Option<String>> {
        Ok(self.find(book_id).and_then(|book| book.comments.clone()))
    }

    async fn custom_column_value(
        &self,
        table: &str,
        book_id: i64,
    ) -> calibre_import::Result<Option<String>> {
        let Some(column) = self.columns.iter().find(|column| column.table() == table) else {
            return Ok(None);
        };
        Ok(self
            .find(book_id)
            .and_then(|book| book.columns.get(&column.label))
            .and_then(|values| values.first().cloned()))
    }

    async fn formats(&self, book_id: i64) -> calibre_import::Result<Vec<BookFormat>> {
        Ok(self
            .find(book_id)
            .map(|book| book.record.formats.clone())
            .unwrap_or_default())
    }

    async fn tags(&self, book_id: i64) -> calibre_import::Result<Vec<String>> {
        Ok(self
            .find(book_id)
            .map(|book| book.record.tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn series(&self, book_id: i64) -> calibre_import::Result<String> {
        Ok(self
            .find(book_id)
            .map(|book| book.record.series.clone())
            .unwrap_or_default())
    }

    async fn custom_column_entries(
        &self,
        column: &ColumnMeta,
        book_id: i64,
    ) -> calibre_import::Result<Vec<String>> {
        Ok(self
            .find(book_id)
            .and_then(|book| book.columns.get(&column.label).cloned())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------------------------
// calibre fixture

/// Writes a small Calibre library (metadata.db plus one cover) into `root`.
///
/// Genres (custom column 1, label `genre`): `Fiction.SciFi` (1), `Fiction.Fantasy` (2),
/// `Poetry` (3). Content column `content` (2, comments), `read` (3, bool), `stars` (4, rating).
///
/// | id | title           | genre          | extras                                  |
/// |----|-----------------|----------------|-----------------------------------------|
/// | 1  | Dune            | Fiction.SciFi  | cover, series `Dune : 1`, tags, content |
/// | 2  | Hyperion        | Fiction.SciFi  | rating 7, read                          |
/// | 3  | The Hobbit      | Fiction.Fantasy| comments                                |
/// | 4  | Leaves of Grass | Poetry         |                                         |
pub fn calibre_fixture(root: &Path) -> anyhow::Result<()> {
    let conn = rusqlite::Connection::open(root.join("metadata.db")).context("create metadata.db")?;
    conn.execute_batch(
        r#"
        CREATE TABLE books (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            sort TEXT,
            timestamp TIMESTAMP,
            last_modified TIMESTAMP,
            path TEXT NOT NULL DEFAULT '',
            has_cover BOOL DEFAULT 0,
            author_sort TEXT,
            series_index REAL NOT NULL DEFAULT 1.0
        );
        CREATE TABLE comments (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, text TEXT NOT NULL);
        CREATE TABLE data (
            id INTEGER PRIMARY KEY,
            book INTEGER NOT NULL,
            format TEXT NOT NULL,
            uncompressed_size INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL
        );
        CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE books_tags_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, tag INTEGER NOT NULL);
        CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE books_series_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, series INTEGER NOT NULL);
        CREATE TABLE custom_columns (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            name TEXT NOT NULL,
            datatype TEXT NOT NULL,
            mark_for_delete BOOL DEFAULT 0,
            editable BOOL DEFAULT 1,
            display TEXT DEFAULT '{}' NOT NULL,
            is_multiple BOOL DEFAULT 0,
            normalized BOOL NOT NULL
        );
        CREATE TABLE custom_column_1 (id INTEGER PRIMARY KEY, value TEXT NOT NULL);
        CREATE TABLE books_custom_column_1_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, value INTEGER NOT NULL);
        CREATE TABLE custom_column_2 (id INTEGER PRIMARY KEY, book INTEGER, value TEXT NOT NULL);
        CREATE TABLE custom_column_3 (id INTEGER PRIMARY KEY, book INTEGER, value BOOL NOT NULL);
        CREATE TABLE custom_column_4 (id INTEGER PRIMARY KEY, value INTEGER NOT NULL);
        CREATE TABLE books_custom_column_4_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, value INTEGER NOT NULL);

        INSERT INTO custom_columns (id, label, name, datatype, display, is_multiple, normalized) VALUES
            (1, 'genre', 'Genre', 'text', '{"is_names": false}', 1, 1),
            (2, 'content', 'Content', 'comments', '{"interpret_as": "html"}', 0, 0),
            (3, 'read', 'Read', 'bool', '{}', 0, 0),
            (4, 'stars', 'Stars', 'rating', '{}', 0, 1);

        INSERT INTO books (id, title, sort, timestamp, last_modified, path, has_cover, author_sort, series_index) VALUES
            (1, 'Dune', 'Dune', '2020-01-01 10:00:00+00:00', '2021-03-04 10:20:30.123456+00:00', 'Frank Herbert/Dune (1)', 1, 'Herbert, Frank', 1.0),
            (2, 'Hyperion', 'Hyperion', '2020-01-02 10:00:00+00:00', '2021-03-05 10:20:30+00:00', 'Dan Simmons/Hyperion (2)', 0, 'Simmons, Dan', 1.0),
            (3, 'The Hobbit', 'Hobbit, The', '2020-01-03 10:00:00+00:00', '2021-03-06 10:20:30+00:00', 'J. R. R. Tolkien/The Hobbit (3)', 0, 'Tolkien, J. R. R.', 1.0),
            (4, 'Leaves of Grass', 'Leaves of Grass', '2020-01-04 10:00:00+00:00', '2021-03-07 10:20:30+00:00', 'Walt Whitman/Leaves of Grass (4)', 0, 'Whitman, Walt', 1.0);

        INSERT INTO comments (book, text) VALUES
            (3, '<p>There and <b>back</b> again.</p>');
        INSERT INTO data (book, format, name) VALUES
            (1, 'EPUB', 'Dune - Frank Herbert'),
            (1, 'PDF', 'Dune - Frank Herbert'),
            (2, 'EPUB', 'Hyperion - Dan Simmons');
        INSERT INTO tags (id, name) VALUES (1, 'SciFi'), (2, 'Classic');
        INSERT INTO books_tags_link (book, tag) VALUES (1, 1), (1, 2), (2, 1);
        INSERT INTO series (id, name) VALUES (1, 'Dune');
        INSERT INTO books_series_link (book, series) VALUES (1, 1);

        INSERT INTO custom_column_1 (id, value) VALUES (1, 'Fiction.SciFi'), (2, 'Fiction.Fantasy'), (3, 'Poetry');
        INSERT INTO books_custom_column_1_link (book, value) VALUES (1, 1), (2, 1), (3, 2), (4, 3);
        INSERT INTO custom_column_2 (book, value) VALUES (1, '<p>Book one of the saga.</p>');
        INSERT INTO custom_column_3 (book, value) VALUES (2, 1);
        INSERT INTO custom_column_4 (id, value) VALUES (1, 7);
        INSERT INTO books_custom_column_4_link (book, value) VALUES (2, 1);
        "#,
    )
    .context("populate metadata.db")?;

    let cover_dir = root.join("Frank Herbert").join("Dune (1)");
    std::fs::create_dir_all(&cover_dir)?;
    std::fs::write(cover_dir.join("cover.jpg"), b"fake-jpeg-cover")?;
    Ok(())
}
