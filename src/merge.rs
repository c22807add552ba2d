//! Reconciles the genre walk against the notebook tree of the note store.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ImportError;
use crate::library::{BookRecord, RecordAssembler};
use crate::render::{RenderOptions, RenderedNote, cover_path, render};
use crate::settings::{CleanupMode, MergeMode, Settings};
use crate::store::{NoteStore, NoteTimes, ResourcePayload};
use crate::taxonomy::{GenreVisitor, STRUCTURAL_GENRE_ID};
use crate::tree::{NodeStatus, NoteId, NotebookId, Traversal, Tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub merge_mode: MergeMode,
    pub cleanup_mode: CleanupMode,
    /// SQL LIKE pattern applied to book titles.
    pub title_filter: String,
    pub render: RenderOptions,
}

impl MergeOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            merge_mode: settings.merge_mode,
            cleanup_mode: settings.cleanup_mode,
            title_filter: settings.filter_titles.clone(),
            render: RenderOptions::from_settings(settings),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub notebooks_created: usize,
    pub notebooks_merged: usize,
    pub notebooks_deleted: usize,
    pub notes_created: usize,
    pub notes_merged: usize,
    pub notes_updated: usize,
    pub notes_deleted: usize,
    pub tags_assigned: usize,
    pub tags_unassigned: usize,
}

pub struct MergeEngine {
    tree: Tree,
    store: Arc<dyn NoteStore>,
    assembler: Arc<RecordAssembler>,
    library_root: PathBuf,
    options: MergeOptions,
    selection: NotebookId,
    current: NotebookId,
    next: Option<NotebookId>,
    report: ImportReport,
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("options", &self.options)
            .field("selection", &self.selection)
            .field("current", &self.current)
            .field("next", &self.next)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

/// Note times at the millisecond precision the store keeps.
fn note_times(book: &BookRecord) -> NoteTimes {
    NoteTimes {
        created: store_precision(book.created_at),
        updated: store_precision(book.updated_at),
    }
}

fn store_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time.timestamp_millis()).unwrap_or_default()
}

impl MergeEngine {
    pub fn new(
        tree: Tree,
        store: Arc<dyn NoteStore>,
        assembler: Arc<RecordAssembler>,
        options: MergeOptions,
    ) -> Self {
        let library_root = assembler.source().root().to_path_buf();
        Self {
            tree,
            store,
            assembler,
            library_root,
            options,
            selection: Tree::ROOT,
            current: Tree::ROOT,
            next: None,
            report: ImportReport::default(),
        }
    }

    /// Places the cursor on the selected notebook (`None` = top level) and loads the notes below it.
    pub async fn on_import_start(&mut self, selected: Option<&str>) -> crate::Result<()> {
        let selection = match selected {
            None => Tree::ROOT,
            Some(store_id) => self.tree.lookup(store_id).ok_or_else(|| {
                ImportError::config(format!("target notebook {store_id} does not exist"))
            })?,
        };
        self.tree.load_notes(self.store.as_ref(), selection).await?;
        self.selection = selection;
        self.current = selection;
        self.next = None;
        self.report = ImportReport::default();
        tracing::info!(
            notebook = %self.tree.path(selection),
            merge_mode = ?self.options.merge_mode,
            cleanup_mode = ?self.options.cleanup_mode,
            "import started"
        );
        Ok(())
    }

    pub async fn on_import_stop(&mut self) -> crate::Result<ImportReport> {
        match self.options.cleanup_mode {
            CleanupMode::Cleanup => self.cleanup().await?,
            CleanupMode::Leave => tracing::debug!("cleanup disabled"),
        }
        tracing::info!(report = ?self.report, "import finished");
        Ok(self.report.clone())
    }

    async fn enter_notebook(&mut self, label: &str) -> crate::Result<NotebookId> {
        let parent = self.current;
        if let Some(existing) = self.tree.find_child_notebook(parent, label) {
            if self.tree.notebook(existing).status().is_stale() {
                self.tree.set_notebook_status(existing, NodeStatus::Visited);
            }
            self.report.notebooks_merged += 1;
            tracing::debug!(notebook = %self.tree.path(existing), "merging notebook");
            return Ok(existing);
        }

        let parent_store_id = self.tree.notebook(parent).store_id().to_owned();
        let record = self
            .store
            .create_folder(&parent_store_id, label)
            .await
            .map_err(|err| {
                ImportError::write(
                    format!("create notebook '{label}' in '{}'", self.tree.path(parent)),
                    err,
                )
            })?;
        let created = self.tree.add_notebook(parent, record, NodeStatus::Created)?;
        self.report.notebooks_created += 1;
        tracing::debug!(notebook = %self.tree.path(created), "created notebook");
        Ok(created)
    }

    pub async fn reconcile_note(
        &mut self,
        notebook: NotebookId,
        book: &BookRecord,
    ) -> crate::Result<()> {
        let title = book.note_title();
        let times = note_times(book);

        let Some(note) = self.tree.find_note(notebook, &title) else {
            let rendered = self.render(book).await?;
            let parent_store_id = self.tree.notebook(notebook).store_id().to_owned();
            let record = self
                .store
                .create_note(&parent_store_id, &title, &rendered.body, times)
                .await
                .map_err(|err| ImportError::write(format!("create note '{title}'"), err))?;
            let note = self.tree.add_note(notebook, record, NodeStatus::Created);
            self.tree.set_note_updated(note, times.updated);
            self.tree.set_note_tags(note, Vec::new());
            self.reconcile_tags(note, &title, &rendered.tags).await?;
            self.report.notes_created += 1;
            tracing::debug!(note = %title, "created note");
            return Ok(());
        };

        if self.tree.note(note).status().is_stale() {
            self.tree.set_note_status(note, NodeStatus::Visited);
        }
        self.report.notes_merged += 1;

        let rewrite = match self.options.merge_mode {
            MergeMode::Leave => false,
            MergeMode::Merge => times.updated > self.tree.note(note).updated(),
            MergeMode::Replace => true,
        };
        if !rewrite {
            tracing::debug!(note = %title, mode = ?self.options.merge_mode, "note left unchanged");
            return Ok(());
        }

        let rendered = self.render(book).await?;
        let note_store_id = self.tree.note(note).store_id().to_owned();
        self.store
            .update_note_body(&note_store_id, &rendered.body, times)
            .await
            .map_err(|err| ImportError::write(format!("update note '{title}'"), err))?;
        self.tree.set_note_updated(note, times.updated);
        self.reconcile_tags(note, &title, &rendered.tags).await?;
        self.report.notes_updated += 1;
        tracing::debug!(note = %title, "updated note");
        Ok(())
    }

    async fn reconcile_tags(
        &mut self,
        note: NoteId,
        title: &str,
        wanted: &[String],
    ) -> crate::Result<()> {
        let note_store_id = self.tree.note(note).store_id().to_owned();
        let current = match self.tree.note(note).tags() {
            Some(tags) => tags.to_vec(),
            None => self.store.note_tags(&note_store_id).await.map_err(|err| {
                ImportError::read(format!("list tags of note '{title}'"), err)
            })?,
        };
        let wanted: BTreeSet<String> = wanted.iter().map(|tag| tag.to_lowercase()).collect();

        let mut kept = Vec::with_capacity(wanted.len());
        for tag in current {
            if wanted.contains(&tag.title.to_lowercase()) {
                kept.push(tag);
                continue;
            }
            self.store
                .unassign_tag(&tag.id, &note_store_id)
                .await
                .map_err(|err| {
                    ImportError::write(
                        format!("remove tag '{}' from note '{title}'", tag.title),
                        err,
                    )
                })?;
            self.report.tags_unassigned += 1;
        }

        let present: HashSet<String> = kept.iter().map(|tag| tag.title.to_lowercase()).collect();
        for name in wanted.iter().filter(|name| !present.contains(*name)) {
            let tag = self.store.create_or_get_tag(name).await.map_err(|err| {
                ImportError::write(format!("create tag '{name}' for note '{title}'"), err)
            })?;
            self.store
                .assign_tag(&tag.id, &note_store_id)
                .await
                .map_err(|err| {
                    ImportError::write(format!("add tag '{name}' to note '{title}'"), err)
                })?;
            kept.push(tag);
            self.report.tags_assigned += 1;
        }

        self.tree.set_note_tags(note, kept);
        Ok(())
    }

    async fn render(&self, book: &BookRecord) -> crate::Result<RenderedNote> {
        let cover = if book.has_cover {
            self.upload_cover(book).await?
        } else {
            None
        };
        Ok(render(
            book,
            &self.library_root,
            cover.as_deref(),
            &self.options.render,
        ))
    }

    async fn upload_cover(&self, book: &BookRecord) -> crate::Result<Option<String>> {
        let path = cover_path(&self.library_root, book);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                tracing::warn!(book_id = book.id, path = %path.display(), "cover file missing");
                return Ok(None);
            }
        }
        let title = book.note_title();
        let id = self
            .store
            .upload_resource_if_absent(&title, ResourcePayload::File(&path))
            .await
            .map_err(|err| {
                ImportError::write(format!("upload cover of book {} '{}'", book.id, book.title), err)
            })?;
        Ok(Some(id))
    }

    /// Deletes stale notes below the selection, then every notebook left empty, bottom-up.
    async fn cleanup(&mut self) -> crate::Result<()> {
        let order: Vec<NotebookId> = self.tree.walk(self.selection, Traversal::CLEANUP).collect();
        for notebook in order {
            let notes: Vec<NoteId> = self
                .tree
                .notebook(notebook)
                .notes()
                .iter()
                .rev()
                .copied()
                .collect();
            for note in notes {
                if !self.tree.note(note).status().is_stale() {
                    continue;
                }
                let store_id = self.tree.note(note).store_id().to_owned();
                let title = self.tree.note(note).title().to_owned();
                self.store
                    .delete_note(&store_id)
                    .await
                    .map_err(|err| ImportError::write(format!("delete note '{title}'"), err))?;
                self.tree.detach_note(note);
                self.report.notes_deleted += 1;
                tracing::debug!(note = %title, "deleted stale note");
            }

            if self.tree.notebook(notebook).is_empty() {
                let store_id = self.tree.notebook(notebook).store_id().to_owned();
                let path = self.tree.path(notebook);
                self.store.delete_folder(&store_id).await.map_err(|err| {
                    ImportError::write(format!("delete notebook '{path}'"), err)
                })?;
                self.tree.detach_notebook(notebook)?;
                self.report.notebooks_deleted += 1;
                tracing::debug!(notebook = %path, "deleted empty notebook");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GenreVisitor for MergeEngine {
    async fn on_leaf(&mut self, level: usize, label: &str, source_id: i64) -> crate::Result<()> {
        let notebook = self.enter_notebook(label).await?;
        self.next = Some(notebook);
        if source_id == STRUCTURAL_GENRE_ID {
            return Ok(());
        }

        let books = self
            .assembler
            .books_for_genre(source_id, &self.options.title_filter)
            .await?;
        tracing::debug!(genre = %label, level, books = books.len(), "importing genre");
        for book in &books {
            self.reconcile_note(notebook, book).await?;
        }
        Ok(())
    }

    fn on_level_increase(&mut self) -> crate::Result<()> {
        let next = self
            .next
            .take()
            .ok_or_else(|| ImportError::integrity("descending without a current genre notebook"))?;
        self.current = next;
        Ok(())
    }

    fn on_level_decrease(&mut self) -> crate::Result<()> {
        if self.current == self.selection {
            return Err(ImportError::integrity(
                "genre walk climbed above the selected notebook",
            ));
        }
        let parent = self
            .tree
            .notebook(self.current)
            .parent()
            .ok_or_else(|| ImportError::integrity("genre walk climbed above the top level"))?;
        self.current = parent;
        self.next = None;
        Ok(())
    }
}
