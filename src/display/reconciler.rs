//! Display reconciliation
//!
//! Materializes stored records into page layers as those layers mount.
//! Each record is either pending (no editor yet) or shown (an editor exists
//! in a layer); the only transition is pending to shown. Removal follows the
//! store's delete path, never this component.

use std::collections::HashMap;

use crate::annotations::{AnnotationRecord, EditorParams};

use super::layer::EditorUiManager;

/// Display state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Pending,
    Shown,
}

/// Result of sweeping one page
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub page_index: u32,
    /// False when no layer is mounted for the page
    pub layer_mounted: bool,
    /// Params materialized by this sweep, in store order
    pub shown: Vec<EditorParams>,
}

#[derive(Debug, Default)]
pub struct DisplayReconciler {
    states: HashMap<String, DisplayState>,
}

impl DisplayReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &str) -> Option<DisplayState> {
        self.states.get(id).copied()
    }

    /// Number of records known to be waiting for their layer
    pub fn pending_count(&self) -> usize {
        self.states
            .values()
            .filter(|state| **state == DisplayState::Pending)
            .count()
    }

    /// Start tracking freshly loaded records as pending
    pub fn track_loaded(&mut self, records: &[AnnotationRecord]) {
        self.states.clear();
        for record in records.iter().filter(|record| !record.is_hidden()) {
            self.states.insert(record.id.clone(), DisplayState::Pending);
        }
    }

    /// Record an editor the editing layer created itself
    pub fn mark_shown(&mut self, id: &str) {
        self.states.insert(id.to_string(), DisplayState::Shown);
    }

    pub fn forget(&mut self, id: &str) {
        self.states.remove(id);
    }

    /// Materialize the pending records of `page_index`.
    ///
    /// `records` is a snapshot of the store; `still_exists` is consulted right
    /// before each materialization so a record deleted meanwhile is skipped.
    pub fn sweep_page<F>(
        &mut self,
        records: &[AnnotationRecord],
        ui: &mut dyn EditorUiManager,
        page_index: u32,
        still_exists: F,
    ) -> SweepOutcome
    where
        F: Fn(&str) -> bool,
    {
        self.states.retain(|id, _| still_exists(id));

        let previous_mode = ui.mode();
        let candidates = records
            .iter()
            .filter(|record| record.page_index() == page_index && !record.is_hidden());

        let mut outcome = SweepOutcome {
            page_index,
            layer_mounted: ui.layer_mut(page_index).is_some(),
            shown: Vec::new(),
        };

        for record in candidates {
            if ui.has_editor(&record.id) {
                self.states.insert(record.id.clone(), DisplayState::Shown);
                continue;
            }
            if !still_exists(&record.id) {
                tracing::debug!(id = %record.id, page_index, "Skipping record deleted before render");
                continue;
            }

            let Some(layer) = ui.layer_mut(page_index) else {
                tracing::debug!(id = %record.id, page_index, "No layer mounted, record stays pending");
                self.states.insert(record.id.clone(), DisplayState::Pending);
                continue;
            };

            if layer.materialize(&record.editor_params) {
                self.states.insert(record.id.clone(), DisplayState::Shown);
                outcome.shown.push(record.editor_params.clone());
            } else {
                tracing::debug!(id = %record.id, page_index, "Layer refused record");
                self.states.insert(record.id.clone(), DisplayState::Pending);
            }
        }

        // Showing editors must not leave the user's active tool switched
        if let Some(last) = outcome.shown.last() {
            ui.update_mode(last.mode());
            ui.update_mode(previous_mode);
        }

        outcome
    }

    /// Sweep every currently mounted layer, in page order
    pub fn sweep_mounted<F>(
        &mut self,
        records: &[AnnotationRecord],
        ui: &mut dyn EditorUiManager,
        still_exists: F,
    ) -> Vec<SweepOutcome>
    where
        F: Fn(&str) -> bool,
    {
        ui.mounted_pages()
            .into_iter()
            .map(|page_index| self.sweep_page(records, ui, page_index, &still_exists))
            .collect()
    }
}
