//! In-memory editing layer
//!
//! Stands in for the rendering editing layer in the shell and in tests.
//! Editors are plain [`EditorParams`]; user actions (`add_editor`,
//! `edit_editor`, `remove_editor`) fire the registered lifecycle hooks, while
//! materialization requested by the reconciler does not.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::annotations::{
    AnnotationEditor, EditorMode, EditorParams, HighlightSource, NoteSource, VariantParams,
};
use crate::display::{EditorLayer, EditorLifecycle, EditorUiManager};

/// An editor living in a headless layer
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessEditor {
    params: EditorParams,
}

impl HeadlessEditor {
    pub fn new(params: EditorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EditorParams {
        &self.params
    }
}

impl AnnotationEditor for HeadlessEditor {
    fn name(&self) -> &str {
        self.params.name()
    }

    fn id(&self) -> &str {
        &self.params.id
    }

    fn page_index(&self) -> u32 {
        self.params.page_index
    }

    fn rect(&self) -> (f64, f64, f64, f64) {
        let p = &self.params;
        (p.x, p.y, p.width, p.height)
    }

    fn is_centered(&self) -> Option<bool> {
        self.params.is_centered
    }

    fn as_highlight(&self) -> Option<&dyn HighlightSource> {
        match &self.params.variant {
            VariantParams::Highlight(fields) => Some(fields),
            _ => None,
        }
    }

    fn as_note(&self) -> Option<&dyn NoteSource> {
        match &self.params.variant {
            VariantParams::Note(fields) => Some(fields),
            _ => None,
        }
    }
}

/// One mounted page
#[derive(Debug, Clone, Default)]
pub struct HeadlessLayer {
    page_index: u32,
    editors: Vec<HeadlessEditor>,
    materialized: usize,
}

impl HeadlessLayer {
    pub fn new(page_index: u32) -> Self {
        Self {
            page_index,
            ..Default::default()
        }
    }

    pub fn editors(&self) -> &[HeadlessEditor] {
        &self.editors
    }

    pub fn editor(&self, id: &str) -> Option<&HeadlessEditor> {
        self.editors.iter().find(|editor| editor.params.id == id)
    }

    /// Editors constructed from stored params rather than by the user
    pub fn materialized_count(&self) -> usize {
        self.materialized
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.editors.iter().position(|editor| editor.params.id == id)
    }
}

impl EditorLayer for HeadlessLayer {
    fn page_index(&self) -> u32 {
        self.page_index
    }

    fn has_editor(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn materialize(&mut self, params: &EditorParams) -> bool {
        if params.page_index != self.page_index || self.has_editor(&params.id) {
            return false;
        }
        self.editors.push(HeadlessEditor::new(params.clone()));
        self.materialized += 1;
        true
    }
}

/// In-memory [`EditorUiManager`]
pub struct HeadlessUiManager {
    stable_prefix: String,
    next_stable_id: u64,
    layers: BTreeMap<u32, HeadlessLayer>,
    mode: EditorMode,
    mode_history: Vec<EditorMode>,
    hooks: Option<Rc<dyn EditorLifecycle>>,
}

impl HeadlessUiManager {
    pub fn new(stable_prefix: &str) -> Self {
        Self {
            stable_prefix: stable_prefix.to_string(),
            next_stable_id: 0,
            layers: BTreeMap::new(),
            mode: EditorMode::None,
            mode_history: Vec::new(),
            hooks: None,
        }
    }

    /// Mount the layer of `page_index`. Returns false if already mounted.
    pub fn mount_page(&mut self, page_index: u32) -> bool {
        if self.layers.contains_key(&page_index) {
            return false;
        }
        self.layers.insert(page_index, HeadlessLayer::new(page_index));
        true
    }

    pub fn layer(&self, page_index: u32) -> Option<&HeadlessLayer> {
        self.layers.get(&page_index)
    }

    pub fn editor(&self, id: &str) -> Option<&HeadlessEditor> {
        self.layers.values().find_map(|layer| layer.editor(id))
    }

    pub fn editor_count(&self) -> usize {
        self.layers.values().map(|layer| layer.editors.len()).sum()
    }

    pub fn next_stable_id(&self) -> u64 {
        self.next_stable_id
    }

    /// Currently registered lifecycle hooks
    pub fn lifecycle(&self) -> Option<Rc<dyn EditorLifecycle>> {
        self.hooks.clone()
    }

    /// Every mode switch in order
    pub fn mode_history(&self) -> &[EditorMode] {
        &self.mode_history
    }

    /// Issue the next stable id from the session counter
    pub fn issue_stable_id(&mut self) -> String {
        let id = format!("{}{}", self.stable_prefix, self.next_stable_id);
        self.next_stable_id += 1;
        id
    }

    /// Create an editor as the user would.
    ///
    /// An empty `params.id` is replaced with a freshly issued stable id.
    /// Returns the id, or `None` when the page is not mounted or the id is
    /// already taken.
    pub fn add_editor(&mut self, mut params: EditorParams) -> Option<String> {
        if !self.layers.contains_key(&params.page_index) {
            tracing::debug!(page_index = params.page_index, "Cannot add editor to unmounted page");
            return None;
        }
        if params.id.is_empty() {
            params.id = self.issue_stable_id();
        }
        if self.has_editor(&params.id) {
            tracing::debug!(id = %params.id, "Editor id already in use");
            return None;
        }

        let id = params.id.clone();
        let layer = self.layers.get_mut(&params.page_index)?;
        layer.editors.push(HeadlessEditor::new(params));
        if let (Some(hooks), Some(editor)) = (&self.hooks, layer.editors.last()) {
            hooks.on_editor_add_complete(editor);
        }
        Some(id)
    }

    /// Mutate an existing editor as the user would. The id cannot change.
    pub fn edit_editor<F>(&mut self, id: &str, update: F) -> bool
    where
        F: FnOnce(&mut EditorParams),
    {
        let Some(editor) = self
            .layers
            .values_mut()
            .find_map(|layer| layer.editors.iter_mut().find(|e| e.params.id == id))
        else {
            tracing::debug!(id = %id, "Edit for unknown editor");
            return false;
        };

        update(&mut editor.params);
        editor.params.id = id.to_string();

        if let Some(hooks) = &self.hooks {
            hooks.on_editor_edit_complete(&*editor);
        }
        true
    }

    /// Delete an editor as the user would
    pub fn remove_editor(&mut self, id: &str) -> bool {
        let removed = self.layers.values_mut().find_map(|layer| {
            let position = layer.position(id)?;
            Some(layer.editors.remove(position))
        });

        match removed {
            Some(editor) => {
                if let Some(hooks) = &self.hooks {
                    hooks.on_editor_delete_complete(&editor);
                }
                true
            }
            None => {
                tracing::debug!(id = %id, "Delete for unknown editor");
                false
            }
        }
    }
}

impl EditorUiManager for HeadlessUiManager {
    fn register_lifecycle(&mut self, hooks: Option<Rc<dyn EditorLifecycle>>) {
        self.hooks = hooks;
    }

    fn set_next_stable_id(&mut self, next: u64) {
        self.next_stable_id = next;
    }

    fn has_editor(&self, id: &str) -> bool {
        self.layers.values().any(|layer| layer.has_editor(id))
    }

    fn mounted_pages(&self) -> Vec<u32> {
        self.layers.keys().copied().collect()
    }

    fn layer_mut(&mut self, page_index: u32) -> Option<&mut dyn EditorLayer> {
        self.layers
            .get_mut(&page_index)
            .map(|layer| layer as &mut dyn EditorLayer)
    }

    fn mode(&self) -> EditorMode {
        self.mode
    }

    fn update_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
        self.mode_history.push(mode);
    }
}
