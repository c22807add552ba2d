use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::settings::JoplinConfig;
use crate::store::{FolderRecord, NoteRecord, NoteStore, NoteTimes, ResourcePayload, TagRecord};

const FOLDER_FIELDS: &str = "id,parent_id,title";
const NOTE_FIELDS: &str = "id,parent_id,title,user_created_time,user_updated_time";
const PAGE_LIMIT: &str = "100";

#[derive(Debug, Clone)]
pub struct JoplinClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ResourceInfo {
    id: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

impl JoplinClient {
    pub fn new(config: &JoplinConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid Joplin url: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("invalid Joplin url: {}", config.base_url);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Joplin url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("token", &self.token);
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> anyhow::Result<String> {
        let response = request.send().await.with_context(|| what.to_owned())?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .with_context(|| format!("read response body: {what}"))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("Joplin API error ({status}) on {what}: {message}");
        }
        Ok(raw)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let what = format!("GET /{}", segments.join("/"));
        let url = self.endpoint(segments, query)?;
        let raw = self.send(self.client.get(url), &what).await?;
        serde_json::from_str(&raw).with_context(|| format!("parse response: {what}"))
    }

    /// Drains every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> anyhow::Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1_u32;
        loop {
            let page_number = page.to_string();
            let mut paged = query.to_vec();
            paged.push(("page", &page_number));
            paged.push(("limit", PAGE_LIMIT));
            let batch: Page<T> = self.get_json(segments, &paged).await?;
            items.extend(batch.items);
            if !batch.has_more {
                return Ok(items);
            }
            page += 1;
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &serde_json::Value,
    ) -> anyhow::Result<T> {
        let what = format!("POST /{}", segments.join("/"));
        let url = self.endpoint(segments, &[])?;
        let raw = self.send(self.client.post(url).json(body), &what).await?;
        serde_json::from_str(&raw).with_context(|| format!("parse response: {what}"))
    }

    async fn delete(&self, segments: &[&str]) -> anyhow::Result<()> {
        let what = format!("DELETE /{}", segments.join("/"));
        let url = self.endpoint(segments, &[])?;
        self.send(self.client.delete(url), &what).await?;
        Ok(())
    }

    async fn search(&self, query: &str, kind: &str) -> anyhow::Result<Vec<SearchHit>> {
        self.get_all(&["search"], &[("query", query), ("type", kind)])
            .await
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.as_str()?.to_owned();
    Some(message)
}

#[async_trait]
impl NoteStore for JoplinClient {
    async fn list_folders(&self) -> anyhow::Result<Vec<FolderRecord>> {
        self.get_all(&["folders"], &[("fields", FOLDER_FIELDS)])
            .await
    }

    async fn list_notes(&self, folder_id: &str) -> anyhow::Result<Vec<NoteRecord>> {
        self.get_all(&["folders", folder_id, "notes"], &[("fields", NOTE_FIELDS)])
            .await
    }

    async fn create_folder(&self, parent_id: &str, title: &str) -> anyhow::Result<FolderRecord> {
        let created: Created = self
            .post_json(
                &["folders"],
                &serde_json::json!({ "title": title, "parent_id": parent_id }),
            )
            .await?;
        Ok(FolderRecord {
            id: created.id,
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
        })
    }

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: NoteTimes,
    ) -> anyhow::Result<NoteRecord> {
        let created_ms = times.created.timestamp_millis();
        let updated_ms = times.updated.timestamp_millis();
        let created: Created = self
            .post_json(
                &["notes"],
                &serde_json::json!({
                    "parent_id": parent_id,
                    "title": title,
                    "body": body,
                    "user_created_time": created_ms,
                    "user_updated_time": updated_ms,
                }),
            )
            .await?;
        Ok(NoteRecord {
            id: created.id,
            parent_id: parent_id.to_owned(),
            title: title.to_owned(),
            user_created_time: created_ms,
            user_updated_time: updated_ms,
        })
    }

    async fn update_note_body(
        &self,
        note_id: &str,
        body: &str,
        times: NoteTimes,
    ) -> anyhow::Result<()> {
        let what = format!("PUT /notes/{note_id}");
        let url = self.endpoint(&["notes", note_id], &[])?;
        let payload = serde_json::json!({
            "body": body,
            "user_created_time": times.created.timestamp_millis(),
            "user_updated_time": times.updated.timestamp_millis(),
        });
        self.send(self.client.put(url).json(&payload), &what).await?;
        Ok(())
    }

    async fn upload_resource_if_absent(
        &self,
        title: &str,
        payload: ResourcePayload<'_>,
    ) -> anyhow::Result<String> {
        let data = match payload {
            ResourcePayload::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("read resource file: {}", path.display()))?,
            ResourcePayload::Bytes(bytes) => bytes.to_vec(),
        };
        let size = data.len() as u64;

        for hit in self.search(title, "resource").await? {
            let info: ResourceInfo = self
                .get_json(&["resources", &hit.id], &[("fields", "id,size")])
                .await?;
            if info.size == size {
                tracing::debug!(resource = %info.id, title, "reusing existing resource");
                return Ok(info.id);
            }
        }

        let file_name = match payload {
            ResourcePayload::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resource".to_owned()),
            ResourcePayload::Bytes(_) => "resource".to_owned(),
        };
        let form = multipart::Form::new()
            .part("data", multipart::Part::bytes(data).file_name(file_name))
            .text("props", serde_json::json!({ "title": title }).to_string());
        let url = self.endpoint(&["resources"], &[])?;
        let raw = self
            .send(self.client.post(url).multipart(form), "POST /resources")
            .await?;
        let created: Created =
            serde_json::from_str(&raw).context("parse response: POST /resources")?;
        tracing::debug!(resource = %created.id, title, size, "uploaded resource");
        Ok(created.id)
    }

    async fn note_tags(&self, note_id: &str) -> anyhow::Result<Vec<TagRecord>> {
        self.get_all(&["notes", note_id, "tags"], &[("fields", "id,title")])
            .await
    }

    async fn create_or_get_tag(&self, title: &str) -> anyhow::Result<TagRecord> {
        let title = title.to_lowercase();
        let existing = self
            .search(&title, "tag")
            .await?
            .into_iter()
            .find(|hit| hit.title.to_lowercase() == title);
        if let Some(hit) = existing {
            return Ok(TagRecord {
                id: hit.id,
                title: hit.title,
            });
        }
        let created: Created = self
            .post_json(&["tags"], &serde_json::json!({ "title": title }))
            .await?;
        Ok(TagRecord {
            id: created.id,
            title,
        })
    }

    async fn assign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()> {
        let _: serde_json::Value = self
            .post_json(
                &["tags", tag_id, "notes"],
                &serde_json::json!({ "id": note_id }),
            )
            .await?;
        Ok(())
    }

    async fn unassign_tag(&self, tag_id: &str, note_id: &str) -> anyhow::Result<()> {
        self.delete(&["tags", tag_id, "notes", note_id]).await
    }

    async fn delete_note(&self, note_id: &str) -> anyhow::Result<()> {
        self.delete(&["notes", note_id]).await
    }

    async fn delete_folder(&self, folder_id: &str) -> anyhow::Result<()> {
        self.delete(&["folders", folder_id]).await
    }
}
