mod joplin;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use joplin::JoplinClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    pub title: String,
    /// Epoch milliseconds.
    #[serde(default)]
    pub user_created_time: i64,
    /// Epoch milliseconds.
    #[serde(default)]
    pub user_updated_time: i64,
}

impl NoteRecord {
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.user_updated_time).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteTimes {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub enum ResourcePayload<'a> {
    File(&'a Path),
    Bytes(&'a [u8]),
}

/// CRUD interface of the note store. List calls return complete results (all pages drained).
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_folders(&self) -> anyhow::Result<Vec<FolderRecord>>;

    async fn list_notes(&self, folder_id: &str) -> anyhow::Result<Vec<NoteRecord>>;

    async fn create_folder(&self, parent_id: &str, title: &str) -> anyhow::Result<FolderRecord>;

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: NoteTimes,
    ) -> anyhow::Result<NoteRecord>;

    async fn update_note_body(&self, note_id: &str, body: &str, times: NoteTimes)
    -> anyhow::Result<()>;

    /// Returns the id of a resource titled `title` with the payload's size, uploading it if none.
    async fn upload_resource_if_absent(
        &self,
        title: &str,
        payload: ResourcePayload<'_>,
    ) -> anyhow::Result<String>;

    async fn note_tags(&self, note_id: &str) -> anyhow::Result<Vec<TagRecord>>;

    async fn create_or_get_tag(&self, title: &str) -> anyhow::Result<TagRecord>;

    async fn assign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()>;

    async fn unassign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()>;

    async fn delete_note(&self, note_id: &str) -> anyhow::Result<()>;

    async fn delete_folder(&self, folder_id: &str) -> anyhow::Result<()>;
}
