use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Keep the existing note untouched.
    #[default]
    Leave,
    /// Rewrite the note only when the book changed after the note was last written.
    Merge,
    /// Always rewrite the note.
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    #[default]
    Leave,
    Cleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub genre_field: String,
    pub content_field: String,
    pub shrink_genres: String,
    pub filter_titles: String,
    pub custom_columns: Vec<String>,
    pub use_spoilers: bool,
    pub convert_html: bool,
    pub insert_attributes: bool,
    pub activate_attributes: bool,
    pub cover_height: u32,
    pub merge_mode: MergeMode,
    pub cleanup_mode: CleanupMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            genre_field: "genre".to_owned(),
            content_field: "content".to_owned(),
            shrink_genres: "%".to_owned(),
            filter_titles: "%".to_owned(),
            custom_columns: Vec::new(),
            use_spoilers: true,
            convert_html: true,
            insert_attributes: true,
            activate_attributes: true,
            cover_height: 600,
            merge_mode: MergeMode::Leave,
            cleanup_mode: CleanupMode::Leave,
        }
    }
}

impl Settings {
    /// Reads a YAML settings file; fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read settings: {}", path.display()))?;
        Self::parse(&yaml).with_context(|| format!("parse settings: {}", path.display()))
    }

    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(yaml).context("deserialize settings yaml")?;
        Ok(settings)
    }

    #[must_use]
    pub fn content_field(&self) -> Option<&str> {
        let field = self.content_field.trim();
        (!field.is_empty()).then_some(field)
    }
}

#[derive(Debug, Clone)]
pub struct JoplinConfig {
    pub base_url: String,
    pub token: String,
}

impl JoplinConfig {
    pub const DEFAULT_URL: &'static str = "http://127.0.0.1:41184";

    /// Builds the config from explicit values, falling back to `JOPLIN_URL` / `JOPLIN_TOKEN`.
    pub fn resolve(base_url: Option<&str>, token: Option<&str>) -> anyhow::Result<Self> {
        let base_url = match base_url {
            Some(url) => url.to_owned(),
            None => std::env::var("JOPLIN_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()),
        };
        let token = match token {
            Some(token) => token.to_owned(),
            None => std::env::var("JOPLIN_TOKEN")
                .map_err(|_| anyhow::anyhow!("JOPLIN_TOKEN is not set (or pass --token)"))?,
        };
        let token = token.trim().to_owned();
        if token.is_empty() {
            anyhow::bail!("Joplin API token is empty");
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }
}
