//! Editor to params conversion
//!
//! The editing layer hands us live editor objects. [`convert`] copies every
//! field it needs by value into an [`EditorParams`], so later mutation of the
//! editor can never reach a stored record.

use super::types::{
    BoxRect, EditorParams, HighlightFields, HighlightMode, NoteFields, VariantParams,
    HIGHLIGHT_EDITOR, NOTE_EDITOR,
};

/// Capability exposed by a live editor of any variant
pub trait AnnotationEditor {
    /// Declared variant name (`highlightEditor`, `noteEditor`, ...)
    fn name(&self) -> &str;

    fn id(&self) -> &str;

    fn page_index(&self) -> u32;

    /// Placement as `(x, y, width, height)`
    fn rect(&self) -> (f64, f64, f64, f64);

    fn is_centered(&self) -> Option<bool> {
        None
    }

    fn as_highlight(&self) -> Option<&dyn HighlightSource> {
        None
    }

    fn as_note(&self) -> Option<&dyn NoteSource> {
        None
    }
}

/// Highlight-specific editor state
pub trait HighlightSource {
    fn text(&self) -> &str;
    fn color(&self) -> &str;
    fn opacity(&self) -> f64;
    fn thickness(&self) -> f64;
    fn mode(&self) -> HighlightMode;
    fn method_of_creation(&self) -> Option<&str>;
    fn boxes(&self) -> &[BoxRect];
}

/// Note-specific editor state
pub trait NoteSource {
    fn content(&self) -> &str;
}

/// Convert a live editor into serializable params.
///
/// Returns `None` for variants this crate does not model, or when an editor
/// claims a known name without exposing the matching capability.
pub fn convert(editor: &dyn AnnotationEditor) -> Option<EditorParams> {
    let variant = match editor.name() {
        HIGHLIGHT_EDITOR => VariantParams::Highlight(from_highlight(editor.as_highlight()?)),
        NOTE_EDITOR => VariantParams::Note(from_note(editor.as_note()?)),
        other => {
            tracing::debug!(name = %other, id = %editor.id(), "Ignoring unrepresentable editor");
            return None;
        }
    };

    let (x, y, width, height) = editor.rect();
    Some(EditorParams {
        id: editor.id().to_string(),
        page_index: editor.page_index(),
        x,
        y,
        width,
        height,
        is_centered: editor.is_centered(),
        variant,
    })
}

fn from_highlight(source: &dyn HighlightSource) -> HighlightFields {
    HighlightFields {
        text: source.text().to_string(),
        color: source.color().to_string(),
        opacity: source.opacity(),
        thickness: source.thickness(),
        mode: source.mode(),
        method_of_creation: source.method_of_creation().map(str::to_string),
        boxes: source.boxes().to_vec(),
    }
}

fn from_note(source: &dyn NoteSource) -> NoteFields {
    NoteFields {
        content: source.content().to_string(),
    }
}

impl HighlightSource for HighlightFields {
    fn text(&self) -> &str {
        &self.text
    }

    fn color(&self) -> &str {
        &self.color
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn thickness(&self) -> f64 {
        self.thickness
    }

    fn mode(&self) -> HighlightMode {
        self.mode
    }

    fn method_of_creation(&self) -> Option<&str> {
        self.method_of_creation.as_deref()
    }

    fn boxes(&self) -> &[BoxRect] {
        &self.boxes
    }
}

impl NoteSource for NoteFields {
    fn content(&self) -> &str {
        &self.content
    }
}
