//! Host script replay
//!
//! Drives a headless session from a JSON-lines script, one host action per
//! line. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! {"op": "pageCount", "numPages": 3}
//! {"op": "mountPage", "pageNumber": 1}
//! {"op": "add", "editor": {"pageIndex": 0, "name": "noteEditor", "content": "hi"}}
//! {"op": "comment", "id": "pdfjs_internal_editor_0", "value": "reply"}
//! {"op": "edit", "id": "pdfjs_internal_editor_0", "content": "hello"}
//! {"op": "delete", "id": "pdfjs_internal_editor_0"}
//! {"op": "documentLoaded"}
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::annotations::{
    AnnotationRecord, EditorParams, HighlightMode, IdAllocator, VariantParams,
};
use crate::config::Config;
use crate::display::UiManagerHandle;
use crate::error::{AnnotationError, Result};
use crate::events::{BusEvent, EventBus};
use crate::headless::HeadlessUiManager;
use crate::sidebar::SidebarProjection;
use crate::storage::PersistenceAdapter;
use crate::sync::SyncEngine;

/// One host action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptStep {
    #[serde(rename_all = "camelCase")]
    PageCount { num_pages: u32 },
    /// Mount a layer, 1-based like the host's page numbers
    #[serde(rename_all = "camelCase")]
    MountPage { page_number: u32 },
    DocumentLoaded,
    Add { editor: ScriptEditor },
    Edit {
        id: String,
        #[serde(flatten)]
        changes: ScriptEdit,
    },
    Delete { id: String },
    Comment { id: String, value: String },
}

/// Editor created by an `add` step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEditor {
    /// Explicit id; otherwise the editing layer issues a stable one
    #[serde(default)]
    pub id: Option<String>,
    /// Mint a virtual id instead of a stable one
    #[serde(default, rename = "virtual")]
    pub virtual_id: bool,
    pub page_index: u32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(flatten)]
    pub variant: VariantParams,
}

/// Fields an `edit` step may change
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScriptEdit {
    pub text: Option<String>,
    pub color: Option<String>,
    pub mode: Option<HighlightMode>,
    pub content: Option<String>,
}

impl ScriptEditor {
    fn into_params(self) -> EditorParams {
        let id = match (self.id, self.virtual_id) {
            (Some(id), _) => id,
            (None, true) => IdAllocator::new_virtual_id(),
            (None, false) => String::new(),
        };
        EditorParams::new(&id, self.page_index, self.variant)
            .with_rect(self.x, self.y, self.width, self.height)
    }
}

impl ScriptEdit {
    fn apply(&self, params: &mut EditorParams) {
        match &mut params.variant {
            VariantParams::Highlight(fields) => {
                if let Some(text) = &self.text {
                    fields.text = text.clone();
                }
                if let Some(color) = &self.color {
                    fields.color = color.clone();
                }
                if let Some(mode) = self.mode {
                    fields.mode = mode;
                }
            }
            VariantParams::Note(fields) => {
                if let Some(content) = &self.content {
                    fields.content = content.clone();
                }
            }
        }
    }
}

/// Parse a JSON-lines script
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| AnnotationError::Script(format!("line {}: {}", n + 1, e)))
        })
        .collect()
}

/// A headless session: bus, editing layer, engine and sidebar
pub struct ReplaySession {
    bus: EventBus,
    ui: Rc<RefCell<HeadlessUiManager>>,
    engine: SyncEngine,
    sidebar: SidebarProjection,
}

impl ReplaySession {
    /// Wire the components and start the editing session
    pub fn start(config: &Config, persistence: Box<dyn PersistenceAdapter>) -> Self {
        let bus = EventBus::new();
        let engine = SyncEngine::new(&bus, persistence, config);
        let sidebar = SidebarProjection::attach(&bus);
        let ui = Rc::new(RefCell::new(HeadlessUiManager::new(&config.ids.stable_prefix)));

        bus.dispatch(BusEvent::EditorSessionReady {
            ui_manager: UiManagerHandle::new(Rc::clone(&ui)),
        });

        Self {
            bus,
            ui,
            engine,
            sidebar,
        }
    }

    /// Run every step of `script`; returns the number of steps applied
    pub fn run_script(&mut self, script: &str) -> Result<usize> {
        let steps = parse_script(script)?;
        let count = steps.len();
        for (n, step) in steps.into_iter().enumerate() {
            self.apply(step)
                .map_err(|e| AnnotationError::Script(format!("step {}: {}", n + 1, e)))?;
        }
        Ok(count)
    }

    pub fn apply(&mut self, step: ScriptStep) -> Result<()> {
        tracing::debug!(?step, "Replaying step");
        match step {
            ScriptStep::PageCount { num_pages } => {
                self.bus.dispatch(BusEvent::DocumentPageCountKnown { num_pages });
            }
            ScriptStep::MountPage { page_number } => {
                let page_index = page_number
                    .checked_sub(1)
                    .ok_or_else(|| AnnotationError::Script("page numbers start at 1".to_string()))?;
                self.ui.borrow_mut().mount_page(page_index);
                self.bus.dispatch(BusEvent::PageLayerRendered { page_number });
            }
            ScriptStep::DocumentLoaded => {
                self.bus.dispatch(BusEvent::DocumentLoaded);
            }
            ScriptStep::Add { editor } => {
                let page_index = editor.page_index;
                let added = self.ui.borrow_mut().add_editor(editor.into_params());
                if added.is_none() {
                    return Err(AnnotationError::Script(format!(
                        "cannot add editor on page index {}",
                        page_index
                    )));
                }
            }
            ScriptStep::Edit { id, changes } => {
                let edited = self
                    .ui
                    .borrow_mut()
                    .edit_editor(&id, |params| changes.apply(params));
                if !edited {
                    return Err(AnnotationError::Script(format!("no editor '{}'", id)));
                }
            }
            ScriptStep::Delete { id } => {
                if !self.ui.borrow_mut().remove_editor(&id) {
                    return Err(AnnotationError::Script(format!("no editor '{}'", id)));
                }
            }
            ScriptStep::Comment { id, value } => {
                self.bus.dispatch(BusEvent::CommentSubmitted {
                    editor_id: id,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.engine.records()
    }

    pub fn sidebar(&self) -> &SidebarProjection {
        &self.sidebar
    }

    /// Tear the session down and return the final records
    pub fn finish(self) -> Vec<AnnotationRecord> {
        let records = self.engine.records();
        self.sidebar.destroy();
        self.engine.teardown();
        records
    }
}
