//! Canonical annotation record store
//!
//! Single-writer, insertion-ordered map from id to [`AnnotationRecord`].
//! Every mutation returns exactly one [`StoreChange`] describing it; callers
//! forward that change to persistence and to subscribers. Operations that
//! change nothing return `None` and must not be announced.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use super::converter::{convert, AnnotationEditor};
use super::types::{AnnotationRecord, Comment, Creator, EditorParams};

/// Kind of store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Init,
    Add,
    Edit,
    Delete,
}

/// A store mutation and the data subscribers need to follow it.
///
/// Serializes as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StoreChange {
    /// Full record list after a bulk load
    Init(Vec<AnnotationRecord>),
    Add(AnnotationRecord),
    Edit(AnnotationRecord),
    /// Last-known snapshot of the removed record
    Delete(AnnotationRecord),
}

impl StoreChange {
    pub fn change_type(&self) -> ChangeType {
        match self {
            StoreChange::Init(_) => ChangeType::Init,
            StoreChange::Add(_) => ChangeType::Add,
            StoreChange::Edit(_) => ChangeType::Edit,
            StoreChange::Delete(_) => ChangeType::Delete,
        }
    }

    /// The single affected record (`None` for `init`)
    pub fn record(&self) -> Option<&AnnotationRecord> {
        match self {
            StoreChange::Init(_) => None,
            StoreChange::Add(record) | StoreChange::Edit(record) | StoreChange::Delete(record) => {
                Some(record)
            }
        }
    }
}

/// Annotation record store
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// Records indexed by id
    records: HashMap<String, AnnotationRecord>,
    /// Ids in insertion order
    order: Vec<String>,
    /// Creator attached to records and comments created in this session
    default_creator: Creator,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl RecordStore {
    pub fn new(default_creator: Creator) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            default_creator,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Replace all state with `records`.
    ///
    /// Entries without an id are skipped; of duplicate ids the first wins.
    pub fn init(&mut self, records: Vec<AnnotationRecord>) -> StoreChange {
        self.records.clear();
        self.order.clear();

        for mut record in records {
            if record.id.trim().is_empty() {
                tracing::debug!("Skipping persisted record without id");
                continue;
            }
            if self.records.contains_key(&record.id) {
                tracing::debug!(id = %record.id, "Skipping duplicate persisted record");
                continue;
            }
            if record.sync_editor_id() {
                tracing::debug!(id = %record.id, "Realigned embedded editor id");
            }
            self.order.push(record.id.clone());
            self.records.insert(record.id.clone(), record);
        }

        StoreChange::Init(self.list())
    }

    /// Create or update the record of `editor`.
    ///
    /// A new id gets a fresh record with an empty thread; a known id only has
    /// its `editorParams` replaced.
    pub fn upsert_from_editor(&mut self, editor: &dyn AnnotationEditor) -> Option<StoreChange> {
        let params = convert(editor)?;
        self.upsert_params(params)
    }

    fn upsert_params(&mut self, mut params: EditorParams) -> Option<StoreChange> {
        if params.id.is_empty() {
            tracing::debug!(name = %params.name(), "Ignoring editor without id");
            return None;
        }

        if let Some(record) = self.records.get_mut(&params.id) {
            let page_index = record.page_index();
            if params.page_index != page_index {
                tracing::debug!(
                    id = %params.id,
                    from = page_index,
                    to = params.page_index,
                    "Keeping original page index of edited record"
                );
                params.page_index = page_index;
            }
            record.editor_params = params;
            return Some(StoreChange::Edit(record.clone()));
        }

        let record = AnnotationRecord::new(params, self.default_creator.clone(), now_millis());
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record.clone());
        Some(StoreChange::Add(record))
    }

    /// Remove the record of `editor`, if present
    pub fn remove_from_editor(&mut self, editor: &dyn AnnotationEditor) -> Option<StoreChange> {
        let params = convert(editor)?;
        self.remove(&params.id)
    }

    fn remove(&mut self, id: &str) -> Option<StoreChange> {
        let Some(record) = self.records.remove(id) else {
            tracing::debug!(id = %id, "Delete for unknown record");
            return None;
        };
        self.order.retain(|existing| existing != id);
        Some(StoreChange::Delete(record))
    }

    /// Append a comment by the default creator to the thread of `id`
    pub fn append_comment(&mut self, id: &str, value: &str) -> Option<StoreChange> {
        if value.trim().is_empty() {
            tracing::debug!(id = %id, "Ignoring empty comment");
            return None;
        }
        let Some(record) = self.records.get_mut(id) else {
            tracing::debug!(id = %id, "Comment for unknown record");
            return None;
        };
        record.comments.push(Comment {
            value: value.to_string(),
            creator: self.default_creator.clone(),
            create_time: now_millis(),
        });
        Some(StoreChange::Edit(record.clone()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: &str) -> Option<&AnnotationRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Owned snapshot of all records in insertion order
    pub fn list(&self) -> Vec<AnnotationRecord> {
        self.iter().cloned().collect()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(Creator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::types::{HighlightFields, NoteFields, VariantParams};
    use crate::headless::HeadlessEditor;

    fn note(id: &str, page_index: u32, content: &str) -> HeadlessEditor {
        HeadlessEditor::new(EditorParams::new(
            id,
            page_index,
            VariantParams::Note(NoteFields {
                content: content.to_string(),
            }),
        ))
    }

    fn highlight(id: &str, page_index: u32, text: &str) -> HeadlessEditor {
        HeadlessEditor::new(EditorParams::new(
            id,
            page_index,
            VariantParams::Highlight(HighlightFields {
                text: text.to_string(),
                ..Default::default()
            }),
        ))
    }

    fn store() -> RecordStore {
        RecordStore::new(Creator::new("tester"))
    }

    #[test]
    fn test_add_then_edit_preserves_thread() {
        let mut store = store();

        let change = store.upsert_from_editor(&note("n1", 0, "first")).unwrap();
        assert_eq!(change.change_type(), ChangeType::Add);
        let added = change.record().unwrap().clone();
        assert_eq!(added.creator.name, "tester");
        assert!(added.create_time > 0);

        store.append_comment("n1", "a reply").unwrap();

        let change = store.upsert_from_editor(&note("n1", 0, "second")).unwrap();
        assert_eq!(change.change_type(), ChangeType::Edit);
        let edited = change.record().unwrap();
        assert_eq!(edited.editor_params.title(), "second");
        assert_eq!(edited.comments.len(), 1);
        assert_eq!(edited.comments[0].value, "a reply");
        assert_eq!(edited.create_time, added.create_time);
        assert_eq!(edited.creator, added.creator);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_edit_keeps_page_index() {
        let mut store = store();
        store.upsert_from_editor(&highlight("h1", 3, "text")).unwrap();

        let change = store.upsert_from_editor(&highlight("h1", 7, "text")).unwrap();
        assert_eq!(change.record().unwrap().page_index(), 3);
        assert_eq!(store.get("h1").unwrap().page_index(), 3);
    }

    #[test]
    fn test_delete_carries_prior_snapshot() {
        let mut store = store();
        store.upsert_from_editor(&highlight("h1", 1, "keep me")).unwrap();
        store.append_comment("h1", "thread").unwrap();

        let change = store.remove_from_editor(&highlight("h1", 1, "")).unwrap();
        assert_eq!(change.change_type(), ChangeType::Delete);
        let snapshot = change.record().unwrap();
        assert_eq!(snapshot.editor_params.title(), "keep me");
        assert_eq!(snapshot.comments.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_dangling_delete_and_comment_are_noops() {
        let mut store = store();
        assert!(store.remove_from_editor(&note("ghost", 0, "")).is_none());
        assert!(store.append_comment("ghost", "hello").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_comment_is_ignored() {
        let mut store = store();
        store.upsert_from_editor(&note("n1", 0, "x")).unwrap();
        assert!(store.append_comment("n1", "   ").is_none());
        assert!(store.get("n1").unwrap().comments.is_empty());
    }

    #[test]
    fn test_editor_without_id_is_ignored() {
        let mut store = store();
        assert!(store.upsert_from_editor(&note("", 0, "x")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let mut store = store();
        for id in ["c", "a", "b"] {
            store.upsert_from_editor(&note(id, 0, id)).unwrap();
        }
        store.upsert_from_editor(&note("a", 0, "edited")).unwrap();
        store.remove_from_editor(&note("c", 0, "")).unwrap();
        store.upsert_from_editor(&note("d", 0, "d")).unwrap();

        let ids: Vec<_> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "b", "d"]);
    }

    #[test]
    fn test_init_skips_malformed_and_duplicates() {
        let mut store = store();
        store.upsert_from_editor(&note("old", 0, "replaced")).unwrap();

        let mut drifted = AnnotationRecord::new(
            note("b", 1, "b").params().clone(),
            Creator::default(),
            5,
        );
        drifted.editor_params.id = "other".to_string();

        let first = AnnotationRecord::new(note("a", 0, "first").params().clone(), Creator::default(), 1);
        let duplicate = AnnotationRecord::new(note("a", 0, "dup").params().clone(), Creator::default(), 2);
        let mut blank = first.clone();
        blank.id = String::new();

        let change = store.init(vec![first, blank, duplicate, drifted]);
        let StoreChange::Init(records) = change else {
            panic!("expected init change");
        };

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].editor_params.title(), "first");
        assert_eq!(records[1].editor_params.id, "b");
        assert!(!store.contains("old"));
    }

    #[test]
    fn test_round_trip_through_list() {
        let mut store = store();
        store.upsert_from_editor(&highlight("h1", 0, "one")).unwrap();
        store.upsert_from_editor(&note("n1", 2, "two")).unwrap();
        store.append_comment("n1", "reply").unwrap();
        store.upsert_from_editor(&highlight("h1", 0, "one, edited")).unwrap();
        store.upsert_from_editor(&note("n2", 4, "gone")).unwrap();
        store.remove_from_editor(&note("n2", 4, "")).unwrap();

        let mut reloaded = RecordStore::default();
        reloaded.init(store.list());
        assert_eq!(reloaded.list(), store.list());
    }

    #[test]
    fn test_change_serialization_shape() {
        let mut store = store();
        let change = store.upsert_from_editor(&note("n1", 0, "hi")).unwrap();
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["type"], "add");
        assert_eq!(value["data"]["id"], "n1");

        let value = serde_json::to_value(store.init(store.list())).unwrap();
        assert_eq!(value["type"], "init");
        assert!(value["data"].is_array());
    }
}
