//! Synchronization engine
//!
//! The only writer of the record store. Lifecycle hooks from the editing
//! layer and comment submissions mutate the store; every mutation is
//! persisted and then announced on the bus as `record-store-changed`.
//! Page readiness events drive the display reconciler.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::annotations::{
    AnnotationEditor, AnnotationRecord, Creator, IdAllocator, RecordStore, StoreChange,
};
use crate::config::Config;
use crate::display::{
    DisplayReconciler, DisplayState, EditorLifecycle, EditorUiManager, SweepOutcome,
    UiManagerHandle,
};
use crate::events::{BusEvent, EventBus, Subscription, Topic};
use crate::storage::{load_records, save_records, storage_key_for, PersistenceAdapter};

struct EngineInner {
    bus: EventBus,
    storage_key: String,
    store: RefCell<RecordStore>,
    persistence: RefCell<Box<dyn PersistenceAdapter>>,
    allocator: RefCell<IdAllocator>,
    reconciler: RefCell<DisplayReconciler>,
    ui_manager: RefCell<Option<UiManagerHandle>>,
}

/// Annotation synchronization engine for one document
pub struct SyncEngine {
    inner: Rc<EngineInner>,
    subscriptions: Vec<Subscription>,
}

impl SyncEngine {
    /// Create the engine and subscribe it to `bus`.
    ///
    /// Nothing is loaded until `editor-session-ready` arrives.
    pub fn new(bus: &EventBus, persistence: Box<dyn PersistenceAdapter>, config: &Config) -> Self {
        let inner = Rc::new(EngineInner {
            bus: bus.clone(),
            storage_key: storage_key_for(&config.document.url),
            store: RefCell::new(RecordStore::new(Creator::new(&config.author.default_creator))),
            persistence: RefCell::new(persistence),
            allocator: RefCell::new(IdAllocator::new(&config.ids.stable_prefix)),
            reconciler: RefCell::new(DisplayReconciler::new()),
            ui_manager: RefCell::new(None),
        });

        let subscriptions = vec![
            subscribe(bus, Topic::EditorSessionReady, &inner, |engine, event| {
                if let BusEvent::EditorSessionReady { ui_manager } = event {
                    engine.start_session(ui_manager.clone());
                }
            }),
            subscribe(bus, Topic::PageLayerRendered, &inner, |engine, event| {
                if let BusEvent::PageLayerRendered { page_number } = event {
                    match page_number.checked_sub(1) {
                        Some(page_index) => engine.reconcile_page(page_index),
                        None => tracing::debug!("Ignoring layer event for page number 0"),
                    }
                }
            }),
            subscribe(bus, Topic::DocumentLoaded, &inner, |engine, _| {
                engine.reconcile_mounted();
            }),
            subscribe(bus, Topic::CommentSubmitted, &inner, |engine, event| {
                if let BusEvent::CommentSubmitted { editor_id, value } = event {
                    engine.submit_comment(editor_id, value);
                }
            }),
        ];

        tracing::debug!(key = %inner.storage_key, "Annotation engine attached");
        Self {
            inner,
            subscriptions,
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Snapshot of all records in store order
    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.inner.store.borrow().list()
    }

    pub fn record(&self, id: &str) -> Option<AnnotationRecord> {
        self.inner.store.borrow().get(id).cloned()
    }

    pub fn display_state(&self, id: &str) -> Option<DisplayState> {
        self.inner.reconciler.borrow().state(id)
    }

    /// Next stable counter value after every id seen so far
    pub fn next_stable_id(&self) -> u64 {
        self.inner.allocator.borrow().next_stable()
    }

    /// Detach from the bus and from the editing layer
    pub fn teardown(self) {
        let detached = self
            .subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count();

        if let Some(ui) = self.inner.ui_manager.borrow_mut().take() {
            match ui.try_borrow_mut() {
                Some(mut manager) => manager.register_lifecycle(None),
                None => tracing::warn!("Editing layer busy during teardown, hooks left to expire"),
            }
        }

        tracing::info!(key = %self.inner.storage_key, subscriptions = detached, "Annotation session torn down");
    }
}

fn subscribe<F>(bus: &EventBus, topic: Topic, inner: &Rc<EngineInner>, handler: F) -> Subscription
where
    F: Fn(&Rc<EngineInner>, &BusEvent) + 'static,
{
    let engine = Rc::downgrade(inner);
    bus.on(topic, move |event| {
        if let Some(engine) = engine.upgrade() {
            handler(&engine, event);
        }
    })
}

impl EngineInner {
    // ========================================================================
    // Session
    // ========================================================================

    fn start_session(self: &Rc<Self>, ui: UiManagerHandle) {
        let Some(mut manager) = ui.try_borrow_mut() else {
            tracing::warn!("Editing layer busy, session not started");
            return;
        };

        if let Some(previous) = self.ui_manager.replace(Some(ui.clone())) {
            if let Some(mut previous) = previous.try_borrow_mut() {
                previous.register_lifecycle(None);
            }
        }

        let loaded = {
            let persistence = self.persistence.borrow();
            load_records(&**persistence, &self.storage_key)
        };
        let change = self.store.borrow_mut().init(loaded);
        let StoreChange::Init(records) = &change else {
            return;
        };

        self.reconciler.borrow_mut().track_loaded(records);
        let next = self
            .allocator
            .borrow_mut()
            .observe_all(records.iter().map(|record| record.id.as_str()));

        manager.set_next_stable_id(next);
        let hooks: Rc<dyn EditorLifecycle> = Rc::new(LifecycleHooks {
            engine: Rc::downgrade(self),
        });
        manager.register_lifecycle(Some(hooks));
        drop(manager);

        tracing::info!(
            key = %self.storage_key,
            records = records.len(),
            next_stable_id = next,
            "Annotation session started"
        );

        self.bus.dispatch(BusEvent::RecordStoreChanged(change));
        self.reconcile_mounted();
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn handle_add(&self, editor: &dyn AnnotationEditor) {
        let change = self.store.borrow_mut().upsert_from_editor(editor);
        let Some(change) = change else {
            return;
        };

        self.allocator.borrow_mut().observe(editor.id());
        if let Ok(mut reconciler) = self.reconciler.try_borrow_mut() {
            reconciler.mark_shown(editor.id());
        }
        self.commit(change);
    }

    fn handle_edit(&self, editor: &dyn AnnotationEditor) {
        if !self.store.borrow().contains(editor.id()) {
            tracing::debug!(id = %editor.id(), "Edit for unknown record");
            return;
        }
        let change = self.store.borrow_mut().upsert_from_editor(editor);
        if let Some(change) = change {
            self.commit(change);
        }
    }

    fn handle_delete(&self, editor: &dyn AnnotationEditor) {
        let change = self.store.borrow_mut().remove_from_editor(editor);
        let Some(change) = change else {
            return;
        };

        if let Ok(mut reconciler) = self.reconciler.try_borrow_mut() {
            reconciler.forget(editor.id());
        }
        self.commit(change);
    }

    fn submit_comment(&self, editor_id: &str, value: &str) {
        let change = self.store.borrow_mut().append_comment(editor_id, value);
        if let Some(change) = change {
            self.commit(change);
        }
    }

    /// Persist the current state, then announce `change`
    fn commit(&self, change: StoreChange) {
        let records = self.store.borrow().list();
        let saved = {
            let mut persistence = self.persistence.borrow_mut();
            save_records(&mut **persistence, &self.storage_key, &records)
        };
        if let Err(e) = saved {
            tracing::warn!(
                key = %self.storage_key,
                error = %e,
                kind = e.kind(),
                "Failed to persist annotations"
            );
        }

        self.bus.dispatch(BusEvent::RecordStoreChanged(change));
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    fn reconcile_page(&self, page_index: u32) {
        let outcomes = self.sweep(|reconciler, records, manager| {
            vec![reconciler.sweep_page(records, manager, page_index, |id| self.is_live(id))]
        });
        self.announce(outcomes);
    }

    fn reconcile_mounted(&self) {
        let outcomes = self.sweep(|reconciler, records, manager| {
            reconciler.sweep_mounted(records, manager, |id| self.is_live(id))
        });
        self.announce(outcomes);
    }

    fn sweep<F>(&self, run: F) -> Vec<SweepOutcome>
    where
        F: FnOnce(
            &mut DisplayReconciler,
            &[AnnotationRecord],
            &mut dyn EditorUiManager,
        ) -> Vec<SweepOutcome>,
    {
        let Some(ui) = self.ui_manager.borrow().clone() else {
            tracing::debug!("No editing session yet, nothing to reconcile");
            return Vec::new();
        };
        let Some(mut manager) = ui.try_borrow_mut() else {
            tracing::warn!("Editing layer busy, reconciliation skipped");
            return Vec::new();
        };

        let records = self.store.borrow().list();
        let mut reconciler = self.reconciler.borrow_mut();
        run(&mut *reconciler, &records, &mut *manager)
    }

    fn announce(&self, outcomes: Vec<SweepOutcome>) {
        for outcome in outcomes {
            if !outcome.layer_mounted {
                tracing::debug!(page_index = outcome.page_index, "No layer mounted, records stay pending");
                continue;
            }
            if !outcome.shown.is_empty() {
                tracing::debug!(
                    page_index = outcome.page_index,
                    shown = outcome.shown.len(),
                    "Materialized stored annotations"
                );
            }
            self.bus.dispatch(BusEvent::ReconciliationComplete {
                page_index: outcome.page_index,
            });
        }
    }

    fn is_live(&self, id: &str) -> bool {
        self.store.borrow().contains(id)
    }
}

/// Hooks registered on the editing layer; they never keep the engine alive
struct LifecycleHooks {
    engine: Weak<EngineInner>,
}

impl EditorLifecycle for LifecycleHooks {
    fn on_editor_add_complete(&self, editor: &dyn AnnotationEditor) {
        if let Some(engine) = self.engine.upgrade() {
            engine.handle_add(editor);
        }
    }

    fn on_editor_edit_complete(&self, editor: &dyn AnnotationEditor) {
        if let Some(engine) = self.engine.upgrade() {
            engine.handle_edit(editor);
        }
    }

    fn on_editor_delete_complete(&self, editor: &dyn AnnotationEditor) {
        if let Some(engine) = self.engine.upgrade() {
            engine.handle_delete(editor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{
        ChangeType, EditorMode, EditorParams, HighlightFields, NoteFields, VariantParams,
    };
    use crate::config::{StorageBackend, StorageConfig};
    use crate::error::{AnnotationError, Result};
    use crate::headless::{HeadlessEditor, HeadlessUiManager};
    use crate::storage::{FilePersistence, MemoryPersistence};
    use serde_json::json;
    use tempfile::TempDir;

    const PREFIX: &str = "pdfjs_internal_editor_";

    struct Harness {
        bus: EventBus,
        ui: Rc<RefCell<HeadlessUiManager>>,
        engine: SyncEngine,
        changes: Rc<RefCell<Vec<StoreChange>>>,
        reconciled: Rc<RefCell<Vec<u32>>>,
        _subscriptions: Vec<Subscription>,
    }

    impl Harness {
        fn new(persistence: Box<dyn PersistenceAdapter>) -> Self {
            let bus = EventBus::new();
            let engine = SyncEngine::new(&bus, persistence, &test_config());

            let changes = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&changes);
            let on_change = bus.on(Topic::RecordStoreChanged, move |event| {
                if let BusEvent::RecordStoreChanged(change) = event {
                    sink.borrow_mut().push(change.clone());
                }
            });

            let reconciled = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&reconciled);
            let on_reconciled = bus.on(Topic::ReconciliationComplete, move |event| {
                if let BusEvent::ReconciliationComplete { page_index } = event {
                    sink.borrow_mut().push(*page_index);
                }
            });

            Self {
                bus,
                ui: Rc::new(RefCell::new(HeadlessUiManager::new(PREFIX))),
                engine,
                changes,
                reconciled,
                _subscriptions: vec![on_change, on_reconciled],
            }
        }

        fn with_persisted(raw: serde_json::Value) -> Self {
            let mut backend = MemoryPersistence::new();
            backend.set("document.pdf", &raw.to_string()).unwrap();
            Self::new(Box::new(backend))
        }

        fn start(&self) {
            self.bus.dispatch(BusEvent::EditorSessionReady {
                ui_manager: UiManagerHandle::new(Rc::clone(&self.ui)),
            });
        }

        /// Mount a layer and announce it, 1-based like the host does
        fn render_page(&self, page_number: u32) {
            self.ui.borrow_mut().mount_page(page_number - 1);
            self.bus.dispatch(BusEvent::PageLayerRendered { page_number });
        }

        fn change_types(&self) -> Vec<ChangeType> {
            self.changes.borrow().iter().map(StoreChange::change_type).collect()
        }

        fn hooks(&self) -> Rc<dyn EditorLifecycle> {
            self.ui.borrow().lifecycle().unwrap()
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.storage = StorageConfig {
            backend: StorageBackend::Memory,
            dir: "unused".into(),
        };
        config.author.default_creator = "tester".to_string();
        config
    }

    fn note(page_index: u32, content: &str) -> EditorParams {
        EditorParams::new(
            "",
            page_index,
            VariantParams::Note(NoteFields {
                content: content.to_string(),
            }),
        )
    }

    fn highlight(page_index: u32, text: &str) -> EditorParams {
        EditorParams::new(
            "",
            page_index,
            VariantParams::Highlight(HighlightFields {
                text: text.to_string(),
                ..Default::default()
            }),
        )
        .with_rect(0.1, 0.1, 0.5, 0.02)
    }

    fn set_content(params: &mut EditorParams, content: &str) {
        params.variant = VariantParams::Note(NoteFields {
            content: content.to_string(),
        });
    }

    struct InkEditor;

    impl AnnotationEditor for InkEditor {
        fn name(&self) -> &str {
            "inkEditor"
        }

        fn id(&self) -> &str {
            "pdfjs_internal_editor_99"
        }

        fn page_index(&self) -> u32 {
            0
        }

        fn rect(&self) -> (f64, f64, f64, f64) {
            (0.0, 0.0, 1.0, 1.0)
        }
    }

    struct BrokenPersistence;

    impl PersistenceAdapter for BrokenPersistence {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(AnnotationError::Storage("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_init_then_first_page_render() {
        let harness = Harness::with_persisted(json!([
            {"id": "a1", "editorParams": {"id": "a1", "pageIndex": 0, "name": "noteEditor", "content": "hi"}}
        ]));

        harness.start();
        assert_eq!(harness.change_types(), [ChangeType::Init]);
        {
            let changes = harness.changes.borrow();
            let StoreChange::Init(records) = &changes[0] else {
                panic!("expected init");
            };
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, "a1");
        }
        assert_eq!(harness.engine.display_state("a1"), Some(DisplayState::Pending));

        harness.render_page(1);
        let ui = harness.ui.borrow();
        assert_eq!(ui.editor_count(), 1);
        assert_eq!(ui.layer(0).unwrap().materialized_count(), 1);
        assert_eq!(ui.editor("a1").unwrap().params().title(), "hi");
        assert_eq!(*harness.reconciled.borrow(), [0]);
        assert_eq!(harness.engine.display_state("a1"), Some(DisplayState::Shown));
    }

    #[test]
    fn test_add_then_edit_keeps_comments() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.start();
        harness.render_page(1);

        let id = harness.ui.borrow_mut().add_editor(note(0, "draft")).unwrap();
        harness.bus.dispatch(BusEvent::CommentSubmitted {
            editor_id: id.clone(),
            value: "looks good".to_string(),
        });
        harness
            .ui
            .borrow_mut()
            .edit_editor(&id, |params| set_content(params, "final"));

        assert_eq!(
            harness.change_types(),
            [ChangeType::Init, ChangeType::Add, ChangeType::Edit, ChangeType::Edit]
        );
        let changes = harness.changes.borrow();
        let added = changes[1].record().unwrap();
        let edited = changes[3].record().unwrap();
        assert_eq!(added.creator.name, "tester");
        assert_eq!(edited.editor_params.title(), "final");
        assert_eq!(edited.comments.len(), 1);
        assert_eq!(edited.comments[0].value, "looks good");
        assert_eq!(edited.comments[0].creator.name, "tester");
        assert_eq!(edited.create_time, added.create_time);
    }

    #[test]
    fn test_deferred_render() {
        let harness = Harness::with_persisted(json!([
            {"id": "late", "editorParams": {"id": "late", "pageIndex": 5, "name": "highlightEditor", "text": "t"}}
        ]));
        harness.start();
        harness.render_page(1);
        assert_eq!(harness.ui.borrow().editor_count(), 0);

        harness.render_page(6);
        let ui = harness.ui.borrow();
        assert_eq!(ui.editor_count(), 1);
        assert!(ui.layer(5).unwrap().editor("late").is_some());
        assert_eq!(*harness.reconciled.borrow(), [0, 5]);
    }

    #[test]
    fn test_delete_before_render_is_not_resurrected() {
        let harness = Harness::with_persisted(json!([
            {"id": "late", "editorParams": {"id": "late", "pageIndex": 5, "name": "noteEditor", "content": "x"}}
        ]));
        harness.start();

        let ghost = HeadlessEditor::new(harness.engine.record("late").unwrap().editor_params);
        harness.hooks().on_editor_delete_complete(&ghost);
        assert!(harness.engine.records().is_empty());
        assert_eq!(harness.change_types(), [ChangeType::Init, ChangeType::Delete]);
        assert_eq!(harness.changes.borrow()[1].record().unwrap().editor_params.title(), "x");

        harness.render_page(6);
        assert_eq!(harness.ui.borrow().editor_count(), 0);
        assert_eq!(*harness.reconciled.borrow(), [5]);

        // A second delete of the same editor is a dangling reference
        harness.hooks().on_editor_delete_complete(&ghost);
        assert_eq!(harness.changes.borrow().len(), 2);
    }

    #[test]
    fn test_unknown_variant_is_ignored() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.start();

        harness.hooks().on_editor_add_complete(&InkEditor);
        harness.hooks().on_editor_edit_complete(&InkEditor);
        harness.hooks().on_editor_delete_complete(&InkEditor);

        assert!(harness.engine.records().is_empty());
        assert_eq!(harness.change_types(), [ChangeType::Init]);
    }

    #[test]
    fn test_edit_for_unknown_record_is_ignored() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.start();

        let mut params = note(0, "stray");
        params.id = "nobody".to_string();
        harness.hooks().on_editor_edit_complete(&HeadlessEditor::new(params));

        assert!(harness.engine.records().is_empty());
        assert_eq!(harness.change_types(), [ChangeType::Init]);
    }

    #[test]
    fn test_stable_ids_stay_monotonic_across_reload() {
        let dir = TempDir::new().unwrap();

        let first = Harness::new(Box::new(FilePersistence::open(dir.path()).unwrap()));
        first.start();
        first.render_page(1);
        let mut issued = Vec::new();
        for n in 0..3 {
            let id = first.ui.borrow_mut().add_editor(highlight(0, &n.to_string())).unwrap();
            issued.push(id);
        }
        assert_eq!(issued, [
            "pdfjs_internal_editor_0",
            "pdfjs_internal_editor_1",
            "pdfjs_internal_editor_2"
        ]);
        assert!(first.ui.borrow_mut().remove_editor(&issued[1]));
        assert_eq!(first.engine.next_stable_id(), 3);
        first.engine.teardown();

        let second = Harness::new(Box::new(FilePersistence::open(dir.path()).unwrap()));
        second.start();
        assert_eq!(second.engine.records().len(), 2);
        assert_eq!(second.ui.borrow().next_stable_id(), 3);

        second.render_page(1);
        assert_eq!(second.ui.borrow().editor_count(), 2);
        let id = second.ui.borrow_mut().add_editor(highlight(0, "new")).unwrap();
        assert_eq!(id, "pdfjs_internal_editor_3");
        assert_eq!(second.engine.next_stable_id(), 4);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(Box::new(FilePersistence::open(dir.path()).unwrap()));
        harness.start();
        harness.render_page(1);

        let reader = FilePersistence::open(dir.path()).unwrap();
        let persisted = || crate::storage::load_records(&reader, harness.engine.storage_key());

        let id = harness.ui.borrow_mut().add_editor(note(0, "one")).unwrap();
        assert_eq!(persisted().len(), 1);

        harness.bus.dispatch(BusEvent::CommentSubmitted {
            editor_id: id.clone(),
            value: "reply".to_string(),
        });
        assert_eq!(persisted()[0].comments.len(), 1);

        harness.ui.borrow_mut().remove_editor(&id);
        assert!(persisted().is_empty());
    }

    #[test]
    fn test_persistence_failure_does_not_block_mutations() {
        let harness = Harness::new(Box::new(BrokenPersistence));
        harness.start();
        harness.render_page(1);

        let id = harness.ui.borrow_mut().add_editor(note(0, "kept")).unwrap();
        assert!(harness.engine.record(&id).is_some());
        assert_eq!(harness.change_types(), [ChangeType::Init, ChangeType::Add]);
    }

    #[test]
    fn test_empty_and_dangling_comments_are_ignored() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.start();
        harness.render_page(1);
        let id = harness.ui.borrow_mut().add_editor(note(0, "n")).unwrap();

        for (editor_id, value) in [(id.as_str(), "  "), ("ghost", "hello")] {
            harness.bus.dispatch(BusEvent::CommentSubmitted {
                editor_id: editor_id.to_string(),
                value: value.to_string(),
            });
        }
        assert_eq!(harness.change_types(), [ChangeType::Init, ChangeType::Add]);
    }

    #[test]
    fn test_document_loaded_sweeps_mounted_layers() {
        let harness = Harness::with_persisted(json!([
            {"id": "a", "editorParams": {"id": "a", "pageIndex": 0, "name": "noteEditor"}},
            {"id": "b", "editorParams": {"id": "b", "pageIndex": 1, "name": "highlightEditor"}},
            {"id": "c", "editorParams": {"id": "c", "pageIndex": 3, "name": "noteEditor"}}
        ]));
        {
            let mut ui = harness.ui.borrow_mut();
            ui.mount_page(0);
            ui.mount_page(1);
        }

        harness.start();
        assert_eq!(*harness.reconciled.borrow(), [0, 1]);
        assert_eq!(harness.ui.borrow().editor_count(), 2);

        harness.bus.dispatch(BusEvent::DocumentLoaded);
        assert_eq!(*harness.reconciled.borrow(), [0, 1, 0, 1]);
        assert_eq!(harness.ui.borrow().editor_count(), 2);
        assert_eq!(harness.engine.display_state("c"), Some(DisplayState::Pending));
    }

    #[test]
    fn test_render_restores_active_mode() {
        let harness = Harness::with_persisted(json!([
            {"id": "h", "editorParams": {"id": "h", "pageIndex": 0, "name": "highlightEditor"}}
        ]));
        harness.ui.borrow_mut().update_mode(EditorMode::Note);
        harness.start();

        harness.render_page(1);
        let ui = harness.ui.borrow();
        assert_eq!(ui.mode(), EditorMode::Note);
        assert_eq!(
            ui.mode_history(),
            [EditorMode::Note, EditorMode::Highlight, EditorMode::Note]
        );
    }

    #[test]
    fn test_hidden_records_are_not_materialized() {
        let harness = Harness::with_persisted(json!([
            {"id": "h", "hidden": true, "editorParams": {"id": "h", "pageIndex": 0, "name": "noteEditor"}}
        ]));
        harness.start();
        harness.render_page(1);

        assert_eq!(harness.ui.borrow().editor_count(), 0);
        assert_eq!(harness.engine.records().len(), 1);
    }

    #[test]
    fn test_page_number_zero_and_early_events_are_absorbed() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.bus.dispatch(BusEvent::PageLayerRendered { page_number: 1 });
        harness.bus.dispatch(BusEvent::DocumentLoaded);

        harness.start();
        harness.bus.dispatch(BusEvent::PageLayerRendered { page_number: 0 });
        assert!(harness.reconciled.borrow().is_empty());
    }

    #[test]
    fn test_teardown_detaches_everything() {
        let harness = Harness::new(Box::new(MemoryPersistence::new()));
        harness.start();
        harness.render_page(1);
        let Harness {
            bus,
            ui,
            engine,
            changes,
            reconciled,
            _subscriptions,
        } = harness;

        engine.teardown();
        assert!(ui.borrow().lifecycle().is_none());
        assert_eq!(bus.listener_count(Topic::EditorSessionReady), 0);
        assert_eq!(bus.listener_count(Topic::CommentSubmitted), 0);

        ui.borrow_mut().add_editor(note(0, "after")).unwrap();
        ui.borrow_mut().mount_page(1);
        bus.dispatch(BusEvent::PageLayerRendered { page_number: 2 });

        assert_eq!(changes.borrow().len(), 1);
        assert_eq!(*reconciled.borrow(), [0]);
    }
}
