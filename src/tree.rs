//! Nodes live in two arenas owned by [`Tree`]; parents own their children through index lists and
//! children point back with a plain index. Detaching unlinks a node from its parent and from the
//! store-id lookup, the arena slot itself stays allocated.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::ImportError;
use crate::store::{FolderRecord, NoteRecord, NoteStore, TagRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotebookId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeStatus {
    #[default]
    Undefined,
    /// Loaded from the store and not (yet) matched by this pass; stale once the walk is over.
    Present,
    Visited,
    Created,
}

impl NodeStatus {
    #[must_use]
    pub fn is_stale(self) -> bool {
        self == Self::Present
    }
}

#[derive(Debug, Clone)]
pub struct Notebook {
    store_id: String,
    title: String,
    parent: Option<NotebookId>,
    status: NodeStatus,
    notebooks: Vec<NotebookId>,
    notes: Vec<NoteId>,
    notes_loaded: bool,
}

impl Notebook {
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> Option<NotebookId> {
        self.parent
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn notebooks(&self) -> &[NotebookId] {
        &self.notebooks
    }

    pub fn notes(&self) -> &[NoteId] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty() && self.notes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Note {
    store_id: String,
    title: String,
    parent: NotebookId,
    status: NodeStatus,
    updated: DateTime<Utc>,
    tags: Option<Vec<TagRecord>>,
}

impl Note {
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> NotebookId {
        self.parent
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Tags as last read from or written to the store; `None` until fetched.
    pub fn tags(&self) -> Option<&[TagRecord]> {
        self.tags.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    /// Pre-order when true, post-order otherwise.
    pub top_first: bool,
    /// Visit siblings last to first.
    pub reverse: bool,
}

impl Traversal {
    pub const PRE_ORDER: Self = Self {
        top_first: true,
        reverse: false,
    };
    pub const CLEANUP: Self = Self {
        top_first: false,
        reverse: true,
    };
}

#[derive(Debug, Clone)]
pub struct Tree {
    notebooks: Vec<Notebook>,
    notes: Vec<Note>,
    by_store_id: HashMap<String, NotebookId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub const ROOT: NotebookId = NotebookId(0);

    #[must_use]
    pub fn new() -> Self {
        let root = Notebook {
            store_id: String::new(),
            title: String::new(),
            parent: None,
            status: NodeStatus::Undefined,
            notebooks: Vec::new(),
            notes: Vec::new(),
            notes_loaded: true,
        };
        Self {
            notebooks: vec![root],
            notes: Vec::new(),
            by_store_id: HashMap::from([(String::new(), Self::ROOT)]),
        }
    }

    /// Builds the hierarchy from a flat folder list in any order.
    ///
    /// Folders whose parent is not known yet are deferred to the next pass; a pass without progress
    /// leaves only orphans and cycles, which are reported as an integrity error.
    pub fn build_from(folders: impl IntoIterator<Item = FolderRecord>) -> crate::Result<Self> {
        let mut tree = Self::new();
        let mut pending: Vec<FolderRecord> = folders.into_iter().collect();
        {
            let mut seen = HashSet::new();
            for folder in &pending {
                if folder.id.is_empty() {
                    return Err(ImportError::integrity(format!(
                        "notebook '{}' has an empty id",
                        folder.title
                    )));
                }
                if !seen.insert(folder.id.as_str()) {
                    return Err(ImportError::integrity(format!(
                        "notebook id {} appears more than once",
                        folder.id
                    )));
                }
            }
        }

        let mut pass = 0_usize;
        while !pending.is_empty() {
            pass += 1;
            let before = pending.len();
            let mut deferred = Vec::new();
            for folder in pending {
                match tree.lookup(&folder.parent_id) {
                    Some(parent) => {
                        tree.add_notebook(parent, folder, NodeStatus::Present)?;
                    }
                    None => deferred.push(folder),
                }
            }
            if deferred.len() == before {
                let names = deferred
                    .iter()
                    .map(|f| format!("'{}' ({} -> parent {})", f.title, f.id, f.parent_id))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ImportError::integrity(format!(
                    "{} notebook(s) never resolve to a parent: {names}",
                    deferred.len()
                )));
            }
            pending = deferred;
        }
        tracing::debug!(
            notebooks = tree.notebooks.len() - 1,
            passes = pass,
            "built notebook tree"
        );
        Ok(tree)
    }

    pub async fn load(store: &dyn NoteStore) -> crate::Result<Self> {
        let folders = store
            .list_folders()
            .await
            .map_err(|err| ImportError::read("list notebooks", err))?;
        Self::build_from(folders)
    }

    /// Reads the notes of `start` and of every notebook below it. Already loaded notebooks are skipped.
    pub async fn load_notes(&mut self, store: &dyn NoteStore, start: NotebookId) -> crate::Result<()> {
        let mut targets = vec![start];
        targets.extend(self.walk(start, Traversal::PRE_ORDER));
        for id in targets {
            if self.notebooks[id.0].notes_loaded {
                continue;
            }
            let store_id = self.notebooks[id.0].store_id.clone();
            let notes = store.list_notes(&store_id).await.map_err(|err| {
                ImportError::read(format!("list notes of notebook {store_id}"), err)
            })?;
            for note in notes {
                self.add_note(id, note, NodeStatus::Present);
            }
            self.notebooks[id.0].notes_loaded = true;
        }
        Ok(())
    }

    pub fn lookup(&self, store_id: &str) -> Option<NotebookId> {
        self.by_store_id.get(store_id).copied()
    }

    pub fn notebook(&self, id: NotebookId) -> &Notebook {
        &self.notebooks[id.0]
    }

    pub fn note(&self, id: NoteId) -> &Note {
        &self.notes[id.0]
    }

    pub fn find_child_notebook(&self, parent: NotebookId, title: &str) -> Option<NotebookId> {
        self.notebooks[parent.0]
            .notebooks
            .iter()
            .copied()
            .find(|child| self.notebooks[child.0].title == title)
    }

    pub fn find_note(&self, notebook: NotebookId, title: &str) -> Option<NoteId> {
        self.notebooks[notebook.0]
            .notes
            .iter()
            .copied()
            .find(|note| self.notes[note.0].title == title)
    }

    pub fn add_notebook(
        &mut self,
        parent: NotebookId,
        record: FolderRecord,
        status: NodeStatus,
    ) -> crate::Result<NotebookId> {
        if self.by_store_id.contains_key(&record.id) {
            return Err(ImportError::integrity(format!(
                "notebook id {} is already part of the tree",
                record.id
            )));
        }
        let id = NotebookId(self.notebooks.len());
        self.notebooks.push(Notebook {
            store_id: record.id.clone(),
            title: record.title,
            parent: Some(parent),
            status,
            notebooks: Vec::new(),
            notes: Vec::new(),
            // Created notebooks start out empty.
            notes_loaded: status == NodeStatus::Created,
        });
        self.notebooks[parent.0].notebooks.push(id);
        self.by_store_id.insert(record.id, id);
        Ok(id)
    }

    pub fn add_note(&mut self, parent: NotebookId, record: NoteRecord, status: NodeStatus) -> NoteId {
        let id = NoteId(self.notes.len());
        self.notes.push(Note {
            updated: record.updated(),
            store_id: record.id,
            title: record.title,
            parent,
            status,
            tags: None,
        });
        self.notebooks[parent.0].notes.push(id);
        id
    }

    pub fn set_notebook_status(&mut self, id: NotebookId, status: NodeStatus) {
        self.notebooks[id.0].status = status;
    }

    pub fn set_note_status(&mut self, id: NoteId, status: NodeStatus) {
        self.notes[id.0].status = status;
    }

    pub fn set_note_updated(&mut self, id: NoteId, updated: DateTime<Utc>) {
        self.notes[id.0].updated = updated;
    }

    pub fn set_note_tags(&mut self, id: NoteId, tags: Vec<TagRecord>) {
        self.notes[id.0].tags = Some(tags);
    }

    pub fn detach_note(&mut self, id: NoteId) {
        let parent = self.notes[id.0].parent;
        self.notebooks[parent.0].notes.retain(|note| *note != id);
    }

    /// Unlinks a notebook and its whole subtree from the lookup table. The root cannot be detached.
    pub fn detach_notebook(&mut self, id: NotebookId) -> crate::Result<()> {
        let Some(parent) = self.notebooks[id.0].parent else {
            return Err(ImportError::integrity("the root notebook cannot be removed"));
        };
        self.notebooks[parent.0].notebooks.retain(|child| *child != id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let notebook = &self.notebooks[current.0];
            stack.extend(notebook.notebooks.iter().copied());
            let store_id = notebook.store_id.clone();
            self.by_store_id.remove(&store_id);
        }
        Ok(())
    }

    pub fn path(&self, id: NotebookId) -> String {
        let mut titles = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let notebook = &self.notebooks[node.0];
            if notebook.parent.is_some() {
                titles.push(notebook.title.as_str());
            }
            current = notebook.parent;
        }
        titles.reverse();
        titles.join("/")
    }

    /// Depth-first walk over the notebooks below `start` (`start` itself is not yielded).
    pub fn walk(&self, start: NotebookId, traversal: Traversal) -> Walk<'_> {
        let mut walk = Walk {
            tree: self,
            traversal,
            stack: Vec::new(),
        };
        walk.push_children(start);
        walk
    }
}

#[derive(Debug, Clone)]
pub struct Walk<'a> {
    tree: &'a Tree,
    traversal: Traversal,
    stack: Vec<(NotebookId, bool)>,
}

impl Walk<'_> {
    fn push_children(&mut self, parent: NotebookId) {
        let children = &self.tree.notebooks[parent.0].notebooks;
        // The stack pops last-in first, so forward order pushes children reversed.
        if self.traversal.reverse {
            self.stack.extend(children.iter().map(|child| (*child, false)));
        } else {
            self.stack
                .extend(children.iter().rev().map(|child| (*child, false)));
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = NotebookId;

    fn next(&mut self) -> Option<NotebookId> {
        loop {
            let (id, expanded) = self.stack.pop()?;
            if self.traversal.top_first {
                self.push_children(id);
                return Some(id);
            }
            if expanded {
                return Some(id);
            }
            self.stack.push((id, true));
            self.push_children(id);
        }
    }
}
