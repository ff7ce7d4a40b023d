//! Annotation record types
//!
//! An [`AnnotationRecord`] is the serializable, canonical state of one
//! annotation and its comment thread. The record key and the id embedded in
//! its [`EditorParams`] are always the same string.
//!
//! Wire names are camelCase so the persisted blob stays compatible with the
//! editing layer's own serialization (`pageIndex`, `editorParams`, ...).

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::DEFAULT_CREATOR;

/// A complete annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    /// Stable (`<prefix><n>`) or virtual (`virtual-<uuid>`) identifier
    pub id: String,
    /// Flattened editor state
    pub editor_params: EditorParams,
    /// Comment thread, in display order
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Author of the annotation
    #[serde(default)]
    pub creator: Creator,
    /// Creation timestamp (epoch millis)
    #[serde(default)]
    pub create_time: i64,
    /// Suppresses materialization into the editing layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Serializable snapshot of a live editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorParams {
    /// Realigned with the record key on load when missing
    #[serde(default)]
    pub id: String,
    /// 0-based page index; fixed for the lifetime of the record
    pub page_index: u32,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub x: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub width: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_centered: Option<bool>,
    /// Variant payload, discriminated by `name`
    #[serde(flatten)]
    pub variant: VariantParams,
}

/// Variant-specific editor fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum VariantParams {
    #[serde(rename = "highlightEditor")]
    Highlight(HighlightFields),
    #[serde(rename = "noteEditor")]
    Note(NoteFields),
}

/// Text highlight (also underline / strikethrough)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightFields {
    /// Highlighted text snippet
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_highlight_color")]
    pub color: String,
    #[serde(default = "default_opacity", deserialize_with = "nullable_opacity")]
    pub opacity: f64,
    #[serde(default = "default_thickness", deserialize_with = "nullable_thickness")]
    pub thickness: f64,
    #[serde(default)]
    pub mode: HighlightMode,
    /// How the highlight was drawn (e.g. `main_toolbar`, `context_menu`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_of_creation: Option<String>,
    /// Quad boxes covering the highlighted text, in page order
    #[serde(default)]
    pub boxes: Vec<BoxRect>,
}

/// Free-text note
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteFields {
    #[serde(default)]
    pub content: String,
}

/// Display mode of a highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    #[default]
    Highlight,
    Underline,
    Strikethrough,
}

/// Sub-rectangle of a highlight, in page-relative units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxRect {
    #[serde(default, deserialize_with = "nullable_f64")]
    pub x: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub width: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub height: f64,
}

/// One entry of a comment thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub value: String,
    #[serde(default)]
    pub creator: Creator,
    #[serde(default)]
    pub create_time: i64,
}

/// Author of a record or comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
}

/// Active tool of the editing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    None,
    Highlight,
    Note,
}

pub const HIGHLIGHT_EDITOR: &str = "highlightEditor";
pub const NOTE_EDITOR: &str = "noteEditor";

fn default_highlight_color() -> String {
    "#FFFF98".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

fn default_thickness() -> f64 {
    12.0
}

// serde_json writes non-finite floats as `null`; read them back as defaults

fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_opacity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_opacity))
}

fn nullable_thickness<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_thickness))
}

impl Default for HighlightFields {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: default_highlight_color(),
            opacity: default_opacity(),
            thickness: default_thickness(),
            mode: HighlightMode::default(),
            method_of_creation: None,
            boxes: Vec::new(),
        }
    }
}

impl Default for Creator {
    fn default() -> Self {
        Self {
            name: DEFAULT_CREATOR.to_string(),
        }
    }
}

impl Creator {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl VariantParams {
    /// Declared editor name of this variant
    pub fn name(&self) -> &'static str {
        match self {
            VariantParams::Highlight(_) => HIGHLIGHT_EDITOR,
            VariantParams::Note(_) => NOTE_EDITOR,
        }
    }

    /// Tool mode that hosts this variant
    pub fn mode(&self) -> EditorMode {
        match self {
            VariantParams::Highlight(_) => EditorMode::Highlight,
            VariantParams::Note(_) => EditorMode::Note,
        }
    }
}

impl EditorParams {
    /// Create params with zeroed placement
    pub fn new(id: &str, page_index: u32, variant: VariantParams) -> Self {
        Self {
            id: id.to_string(),
            page_index,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            is_centered: None,
            variant,
        }
    }

    /// Set the placement rectangle
    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn name(&self) -> &'static str {
        self.variant.name()
    }

    pub fn mode(&self) -> EditorMode {
        self.variant.mode()
    }

    /// Human-readable title: highlighted text or note content
    pub fn title(&self) -> &str {
        match &self.variant {
            VariantParams::Highlight(fields) => &fields.text,
            VariantParams::Note(fields) => &fields.content,
        }
    }
}

impl AnnotationRecord {
    /// Create a record with an empty comment thread
    pub fn new(editor_params: EditorParams, creator: Creator, create_time: i64) -> Self {
        Self {
            id: editor_params.id.clone(),
            editor_params,
            comments: Vec::new(),
            creator,
            create_time,
            hidden: None,
        }
    }

    pub fn page_index(&self) -> u32 {
        self.editor_params.page_index
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden == Some(true)
    }

    /// Force `editor_params.id` to the record key.
    ///
    /// Returns true if the embedded id had drifted.
    pub fn sync_editor_id(&mut self) -> bool {
        if self.editor_params.id == self.id {
            return false;
        }
        self.editor_params.id = self.id.clone();
        true
    }
}
