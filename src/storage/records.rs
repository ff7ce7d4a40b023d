//! Record persistence format
//!
//! One key per document, holding the JSON array of records in store order.

use serde::Deserialize;
use serde_json::Value;

use crate::annotations::{AnnotationRecord, Creator, EditorParams};
use crate::error::Result;

use super::backends::PersistenceAdapter;

/// Key used when no file name can be derived from the document URL
pub const DEFAULT_STORAGE_KEY: &str = "document.pdf";

/// An entry of the persisted array
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedEntry {
    Record(AnnotationRecord),
    /// Bare editor params written by early revisions
    Legacy(EditorParams),
}

impl From<PersistedEntry> for AnnotationRecord {
    fn from(entry: PersistedEntry) -> Self {
        match entry {
            PersistedEntry::Record(record) => record,
            PersistedEntry::Legacy(params) => AnnotationRecord::new(params, Creator::default(), 0),
        }
    }
}

/// Derive the storage key from a document URL or path.
///
/// Uses the percent-decoded `*.pdf` file name, falling back to
/// [`DEFAULT_STORAGE_KEY`].
pub fn storage_key_for(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = without_query.rsplit(['/', '\\']).next().unwrap_or(without_query);
    if is_pdf_name(last_segment) {
        return decode(last_segment);
    }

    url.split(['/', '\\', '?', '#', '&', '='])
        .rev()
        .find(|segment| is_pdf_name(segment))
        .map(decode)
        .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string())
}

fn is_pdf_name(segment: &str) -> bool {
    segment.len() > 4 && segment.to_ascii_lowercase().ends_with(".pdf")
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Load the records stored under `key`.
///
/// A missing, unreadable or unparsable value yields an empty list; entries
/// that are neither records nor legacy params are skipped individually.
pub fn load_records(adapter: &dyn PersistenceAdapter, key: &str) -> Vec<AnnotationRecord> {
    let raw = match adapter.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, kind = e.kind(), "Failed to read annotations, starting empty");
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            tracing::debug!(key = %key, "Persisted annotations are not an array, starting empty");
            return Vec::new();
        }
        Err(e) => {
            tracing::debug!(key = %key, error = %e, "Unparsable persisted annotations, starting empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            match serde_json::from_value::<PersistedEntry>(entry) {
                Ok(entry) => Some(AnnotationRecord::from(entry)),
                Err(_) => {
                    tracing::debug!(key = %key, position, "Skipping malformed persisted record");
                    None
                }
            }
        })
        .collect()
}

/// Serialize `records` under `key`
pub fn save_records(
    adapter: &mut dyn PersistenceAdapter,
    key: &str,
    records: &[AnnotationRecord],
) -> Result<()> {
    let json = serde_json::to_string(records)?;
    adapter.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{NoteFields, RecordStore, VariantParams};
    use crate::storage::MemoryPersistence;
    use serde_json::json;

    #[test]
    fn test_storage_key_for() {
        assert_eq!(storage_key_for("https://host/files/Report.PDF?x=1#page=2"), "Report.PDF");
        assert_eq!(storage_key_for("/docs/annual%20report.pdf"), "annual report.pdf");
        assert_eq!(storage_key_for("C:\\docs\\scan.pdf"), "scan.pdf");
        assert_eq!(storage_key_for("https://host/viewer?file=paper.pdf"), "paper.pdf");
        assert_eq!(storage_key_for("https://host/download/1234"), DEFAULT_STORAGE_KEY);
        assert_eq!(storage_key_for(""), DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_missing_and_garbage_yield_empty() {
        let mut backend = MemoryPersistence::new();
        assert!(load_records(&backend, "doc.pdf").is_empty());

        backend.set("doc.pdf", "not json").unwrap();
        assert!(load_records(&backend, "doc.pdf").is_empty());

        backend.set("doc.pdf", r#"{"id": "a"}"#).unwrap();
        assert!(load_records(&backend, "doc.pdf").is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut backend = MemoryPersistence::new();
        let raw = json!([
            {"id": "a1", "editorParams": {"id": "a1", "pageIndex": 0, "name": "noteEditor", "content": "hi"}},
            {"editorParams": {"id": "x", "pageIndex": 0, "name": "noteEditor"}},
            {"id": "ink", "editorParams": {"id": "ink", "pageIndex": 0, "name": "inkEditor"}},
            42,
            {"id": "h1", "editorParams": {"id": "h1", "pageIndex": 2, "name": "highlightEditor", "text": "t"},
             "comments": [{"value": "c", "creator": {"name": "bo"}, "createTime": 7}],
             "creator": {"name": "bo"}, "createTime": 5}
        ]);
        backend.set("doc.pdf", &raw.to_string()).unwrap();

        let records = load_records(&backend, "doc.pdf");
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a1", "h1"]);
        assert_eq!(records[1].comments[0].creator.name, "bo");
        assert_eq!(records[1].create_time, 5);
    }

    #[test]
    fn test_missing_embedded_id_keeps_record() {
        let mut backend = MemoryPersistence::new();
        let raw = json!([{
            "id": "a1",
            "editorParams": {"pageIndex": 0, "name": "noteEditor", "content": "hi"},
            "comments": [{"value": "keep me", "creator": {"name": "bo"}, "createTime": 3}]
        }]);
        backend.set("doc.pdf", &raw.to_string()).unwrap();

        let records = load_records(&backend, "doc.pdf");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a1");
        assert_eq!(records[0].comments[0].value, "keep me");

        let mut store = RecordStore::new(Creator::default());
        store.init(records);
        assert_eq!(store.get("a1").unwrap().editor_params.id, "a1");
    }

    #[test]
    fn test_non_finite_geometry_survives_reload() {
        let mut backend = MemoryPersistence::new();
        let params = EditorParams::new("n1", 0, VariantParams::Note(NoteFields::default()))
            .with_rect(f64::NAN, 0.5, f64::INFINITY, 0.25);
        let record = AnnotationRecord::new(params, Creator::new("ana"), 1);

        save_records(&mut backend, "doc.pdf", &[record]).unwrap();
        assert!(backend.get("doc.pdf").unwrap().unwrap().contains(r#""x":null"#));

        let records = load_records(&backend, "doc.pdf");
        assert_eq!(records.len(), 1);
        let params = &records[0].editor_params;
        assert_eq!((params.x, params.y, params.width, params.height), (0.0, 0.5, 0.0, 0.25));
    }

    #[test]
    fn test_legacy_params_are_wrapped() {
        let mut backend = MemoryPersistence::new();
        let raw = json!([{"id": "n1", "pageIndex": 3, "name": "noteEditor", "content": "old"}]);
        backend.set("doc.pdf", &raw.to_string()).unwrap();

        let records = load_records(&backend, "doc.pdf");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "n1");
        assert_eq!(records[0].page_index(), 3);
        assert_eq!(records[0].creator, Creator::default());
        assert_eq!(records[0].create_time, 0);
        assert!(records[0].comments.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let mut backend = MemoryPersistence::new();
        let records = vec![
            AnnotationRecord::new(
                EditorParams::new(
                    "b",
                    1,
                    VariantParams::Note(NoteFields {
                        content: "second".to_string(),
                    }),
                ),
                Creator::new("ana"),
                20,
            ),
            AnnotationRecord::new(
                EditorParams::new("a", 0, VariantParams::Note(NoteFields::default())),
                Creator::new("ana"),
                10,
            ),
        ];

        save_records(&mut backend, "doc.pdf", &records).unwrap();
        assert_eq!(load_records(&backend, "doc.pdf"), records);
    }
}
