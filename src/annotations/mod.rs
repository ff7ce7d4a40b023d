//! Annotation module
//!
//! The canonical record model and everything that writes it:
//!
//! - `types`: serializable records (highlights, notes, comment threads)
//! - `ids`: stable / virtual identifier namespaces
//! - `converter`: live editor to serializable params
//! - `store`: the single-writer record store and its change notifications

mod converter;
mod ids;
mod store;
mod types;

pub use converter::{convert, AnnotationEditor, HighlightSource, NoteSource};
pub use ids::{IdAllocator, IdKind, VIRTUAL_ID_PREFIX};
pub use store::{ChangeType, RecordStore, StoreChange};
pub use types::{
    AnnotationRecord, BoxRect, Comment, Creator, EditorMode, EditorParams, HighlightFields,
    HighlightMode, NoteFields, VariantParams, HIGHLIGHT_EDITOR, NOTE_EDITOR,
};
