//! Editing-layer collaborator interfaces
//!
//! The editing layer owns the concrete editor objects and their rendering.
//! The sync engine only sees it through these traits.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::annotations::{AnnotationEditor, EditorMode, EditorParams};

/// Callbacks the engine registers on the editing layer.
///
/// The editing layer invokes them after it finished creating, editing or
/// deleting an editor. Hooks must not be invoked for editors the layer
/// materialized from params on request of the engine.
pub trait EditorLifecycle {
    fn on_editor_add_complete(&self, editor: &dyn AnnotationEditor);
    fn on_editor_edit_complete(&self, editor: &dyn AnnotationEditor);
    fn on_editor_delete_complete(&self, editor: &dyn AnnotationEditor);
}

/// One mounted page surface
pub trait EditorLayer {
    /// 0-based page index
    fn page_index(&self) -> u32;

    fn has_editor(&self, id: &str) -> bool;

    /// Construct the concrete editor for `params` and attach it.
    ///
    /// Returns false if the layer refused the params.
    fn materialize(&mut self, params: &EditorParams) -> bool;
}

/// Session-wide editing manager
pub trait EditorUiManager {
    /// Install (or with `None`, remove) the lifecycle hooks
    fn register_lifecycle(&mut self, hooks: Option<Rc<dyn EditorLifecycle>>);

    /// Next counter value to use when issuing a stable id
    fn set_next_stable_id(&mut self, next: u64);

    /// Whether an editor with `id` exists on any mounted layer
    fn has_editor(&self, id: &str) -> bool;

    /// 0-based indexes of currently mounted layers, ascending
    fn mounted_pages(&self) -> Vec<u32>;

    fn layer_mut(&mut self, page_index: u32) -> Option<&mut dyn EditorLayer>;

    fn mode(&self) -> EditorMode;

    fn update_mode(&mut self, mode: EditorMode);
}

/// Shared, type-erased handle to the session's [`EditorUiManager`]
#[derive(Clone)]
pub struct UiManagerHandle(Rc<RefCell<dyn EditorUiManager>>);

impl UiManagerHandle {
    pub fn new<M>(manager: Rc<RefCell<M>>) -> Self
    where
        M: EditorUiManager + 'static,
    {
        let manager: Rc<RefCell<dyn EditorUiManager>> = manager;
        Self(manager)
    }

    pub fn borrow(&self) -> Ref<'_, dyn EditorUiManager + 'static> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, dyn EditorUiManager + 'static> {
        self.0.borrow_mut()
    }

    /// Mutable access, or `None` while the manager is already borrowed
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, dyn EditorUiManager + 'static>> {
        self.0.try_borrow_mut().ok()
    }
}

impl fmt::Debug for UiManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UiManagerHandle").finish()
    }
}
