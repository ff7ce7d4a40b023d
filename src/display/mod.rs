//! Display module
//!
//! Collaborator traits for the page editing layer and the reconciler that
//! replays stored records into it.

mod layer;
mod reconciler;

pub use layer::{EditorLayer, EditorLifecycle, EditorUiManager, UiManagerHandle};
pub use reconciler::{DisplayReconciler, DisplayState, SweepOutcome};

pub use crate::annotations::EditorMode;
