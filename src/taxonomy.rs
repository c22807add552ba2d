//! Genres are stored flat: `Fiction`, `Fiction.SciFi` and `Fiction.SciFi.Space` may or may not exist
//! as rows independently of each other. The walk reconstructs the implied hierarchy, inserts the
//! missing intermediate levels as structural leaves (id [`STRUCTURAL_GENRE_ID`]) and brackets every
//! change of depth with level events.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

pub const STRUCTURAL_GENRE_ID: i64 = -1;

pub type GenreMap = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreEvent {
    LevelIncrease,
    LevelDecrease,
    Leaf {
        level: usize,
        label: String,
        source_id: i64,
    },
}

/// `on_leaf` names a notebook at the current level; a following `on_level_increase` descends into
/// the notebook named last, `on_level_decrease` climbs back to the parent.
#[async_trait]
pub trait GenreVisitor: Send {
    async fn on_leaf(&mut self, level: usize, label: &str, source_id: i64) -> crate::Result<()>;

    fn on_level_increase(&mut self) -> crate::Result<()>;

    fn on_level_decrease(&mut self) -> crate::Result<()>;
}

/// Keys are visited in segment-wise lexicographic order, which keeps every subtree contiguous even
/// when a sibling label sorts between a parent and its children as a plain string (`"A B"` sorts
/// between `"A"` and `"A.B"`). The sequence always ends at level 1.
#[must_use]
pub fn genre_events(genres: &GenreMap) -> Vec<GenreEvent> {
    let mut entries: Vec<(Vec<&str>, i64)> = Vec::with_capacity(genres.len());
    for (key, id) in genres {
        let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            tracing::warn!(genre = %key, "skipping genre without a name");
            continue;
        }
        if segments.len() != key.split('.').count() {
            tracing::warn!(genre = %key, "ignoring empty genre segments");
        }
        entries.push((segments, *id));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut events = Vec::new();
    let mut emitted: HashSet<Vec<&str>> = HashSet::new();
    let mut level = 1_usize;

    for (segments, source_id) in &entries {
        let terminal = segments.len();
        for (idx, segment) in segments.iter().enumerate() {
            let depth = idx + 1;
            let prefix = &segments[..depth];
            if depth < terminal {
                if emitted.contains(prefix) {
                    continue;
                }
                move_to_level(&mut level, depth, &mut events);
                events.push(GenreEvent::Leaf {
                    level: depth,
                    label: (*segment).to_owned(),
                    source_id: STRUCTURAL_GENRE_ID,
                });
            } else {
                if emitted.contains(prefix) {
                    tracing::warn!(genre = %segments.join("."), source_id, "duplicate genre skipped");
                    continue;
                }
                move_to_level(&mut level, depth, &mut events);
                events.push(GenreEvent::Leaf {
                    level: depth,
                    label: (*segment).to_owned(),
                    source_id: *source_id,
                });
            }
            emitted.insert(prefix.to_vec());
        }
    }
    move_to_level(&mut level, 1, &mut events);

    events
}

fn move_to_level(level: &mut usize, target: usize, events: &mut Vec<GenreEvent>) {
    while *level < target {
        *level += 1;
        events.push(GenreEvent::LevelIncrease);
    }
    while *level > target {
        *level -= 1;
        events.push(GenreEvent::LevelDecrease);
    }
}

pub async fn walk_genres<V>(genres: &GenreMap, visitor: &mut V) -> crate::Result<()>
where
    V: GenreVisitor + ?Sized,
{
    for event in genre_events(genres) {
        tracing::debug!(?event, "genre event");
        match event {
            GenreEvent::LevelIncrease => visitor.on_level_increase()?,
            GenreEvent::LevelDecrease => visitor.on_level_decrease()?,
            GenreEvent::Leaf {
                level,
                label,
                source_id,
            } => visitor.on_leaf(level, &label, source_id).await?,
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct OutlineVisitor {
    lines: Vec<String>,
}

impl OutlineVisitor {
    #[must_use]
    pub fn into_outline(self) -> String {
        let mut outline = self.lines.join("\n");
        if !outline.is_empty() {
            outline.push('\n');
        }
        outline
    }
}

#[async_trait]
impl GenreVisitor for OutlineVisitor {
    async fn on_leaf(&mut self, level: usize, label: &str, source_id: i64) -> crate::Result<()> {
        let indent = "  ".repeat(level.saturating_sub(1));
        if source_id == STRUCTURAL_GENRE_ID {
            self.lines.push(format!("{indent}- {label}"));
        } else {
            self.lines.push(format!("{indent}- {label} (#{source_id})"));
        }
        Ok(())
    }

    fn on_level_increase(&mut self) -> crate::Result<()> {
        Ok(())
    }

    fn on_level_decrease(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
