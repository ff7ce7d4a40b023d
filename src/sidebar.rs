//! Comment sidebar projection
//!
//! A read-only view of the record store grouped by page, kept current purely
//! from bus events. Pages are keyed by 1-based page number; a page without
//! cards is hidden.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::annotations::{AnnotationRecord, Comment, Creator, EditorMode, StoreChange};
use crate::events::{BusEvent, EventBus, Subscription, Topic};

/// One annotation as the sidebar lists it
#[derive(Debug, Clone, PartialEq)]
pub struct CommentCard {
    pub id: String,
    pub mode: EditorMode,
    /// Highlighted text or note content
    pub title: String,
    pub creator: Creator,
    pub create_time: i64,
    pub comments: Vec<Comment>,
}

impl CommentCard {
    fn from_record(record: &AnnotationRecord) -> Self {
        Self {
            id: record.id.clone(),
            mode: record.editor_params.mode(),
            title: record.editor_params.title().to_string(),
            creator: record.creator.clone(),
            create_time: record.create_time,
            comments: record.comments.clone(),
        }
    }
}

/// Cards of one page, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidebarPage {
    pub cards: Vec<CommentCard>,
}

impl SidebarPage {
    pub fn is_hidden(&self) -> bool {
        self.cards.is_empty()
    }
}

#[derive(Debug, Default)]
struct SidebarState {
    pages: BTreeMap<u32, SidebarPage>,
    reconciled: BTreeSet<u32>,
    focus_request: Option<String>,
    focused: Option<String>,
}

impl SidebarState {
    fn allocate(&mut self, num_pages: u32) {
        self.pages.retain(|page_number, _| *page_number <= num_pages);
        for page_number in 1..=num_pages {
            self.pages.entry(page_number).or_default();
        }
    }

    fn apply(&mut self, change: &StoreChange) {
        match change {
            StoreChange::Init(records) => {
                for page in self.pages.values_mut() {
                    page.cards.clear();
                }
                for record in records {
                    self.add(record);
                }
            }
            StoreChange::Add(record) => self.add(record),
            StoreChange::Edit(record) => self.edit(record),
            StoreChange::Delete(record) => self.remove(record),
        }
    }

    fn add(&mut self, record: &AnnotationRecord) {
        let Some(page_number) = page_number_of(record) else {
            return;
        };
        let page = self.pages.entry(page_number).or_default();
        let card = CommentCard::from_record(record);
        match page.cards.iter_mut().find(|existing| existing.id == card.id) {
            Some(existing) => *existing = card,
            None => page.cards.push(card),
        }
    }

    fn edit(&mut self, record: &AnnotationRecord) {
        let card = page_number_of(record)
            .and_then(|page_number| self.pages.get_mut(&page_number))
            .and_then(|page| page.cards.iter_mut().find(|card| card.id == record.id));
        match card {
            Some(card) => *card = CommentCard::from_record(record),
            None => tracing::debug!(id = %record.id, "Sidebar has no card to update"),
        }
    }

    fn remove(&mut self, record: &AnnotationRecord) {
        if let Some(page) = page_number_of(record).and_then(|n| self.pages.get_mut(&n)) {
            page.cards.retain(|card| card.id != record.id);
        }
        if self.focused.as_deref() == Some(record.id.as_str()) {
            self.focused = None;
        }
    }

    fn page_of(&self, id: &str) -> Option<u32> {
        self.pages
            .iter()
            .find(|(_, page)| page.cards.iter().any(|card| card.id == id))
            .map(|(page_number, _)| *page_number)
    }

    fn reconciled(&mut self, page_index: u32) {
        self.reconciled.insert(page_index);
        self.resolve_focus();
    }

    /// Focus the requested card once its page is materialized
    fn resolve_focus(&mut self) {
        let Some(id) = self.focus_request.as_deref() else {
            return;
        };
        let ready = self
            .page_of(id)
            .and_then(|page_number| page_number.checked_sub(1))
            .map(|page_index| self.reconciled.contains(&page_index))
            .unwrap_or(false);
        if ready {
            self.focused = self.focus_request.take();
        }
    }
}

/// 1-based page number of `record`, `None` when the index has no successor
fn page_number_of(record: &AnnotationRecord) -> Option<u32> {
    let page_number = record.page_index().checked_add(1);
    if page_number.is_none() {
        tracing::warn!(id = %record.id, page_index = record.page_index(), "Record page out of range, not listed");
    }
    page_number
}

/// Page-grouped comment list driven by the event bus
pub struct SidebarProjection {
    state: Rc<RefCell<SidebarState>>,
    subscriptions: Vec<Subscription>,
}

impl SidebarProjection {
    pub fn attach(bus: &EventBus) -> Self {
        let state = Rc::new(RefCell::new(SidebarState::default()));

        let pages = Rc::clone(&state);
        let on_page_count = bus.on(Topic::DocumentPageCountKnown, move |event| {
            if let BusEvent::DocumentPageCountKnown { num_pages } = event {
                pages.borrow_mut().allocate(*num_pages);
            }
        });

        let cards = Rc::clone(&state);
        let on_change = bus.on(Topic::RecordStoreChanged, move |event| {
            if let BusEvent::RecordStoreChanged(change) = event {
                cards.borrow_mut().apply(change);
            }
        });

        let focus = Rc::clone(&state);
        let on_reconciled = bus.on(Topic::ReconciliationComplete, move |event| {
            if let BusEvent::ReconciliationComplete { page_index } = event {
                focus.borrow_mut().reconciled(*page_index);
            }
        });

        Self {
            state,
            subscriptions: vec![on_page_count, on_change, on_reconciled],
        }
    }

    pub fn page_count(&self) -> usize {
        self.state.borrow().pages.len()
    }

    /// Page by 1-based number
    pub fn page(&self, page_number: u32) -> Option<SidebarPage> {
        self.state.borrow().pages.get(&page_number).cloned()
    }

    /// Page numbers that have at least one card
    pub fn visible_pages(&self) -> Vec<u32> {
        self.state
            .borrow()
            .pages
            .iter()
            .filter(|(_, page)| !page.is_hidden())
            .map(|(page_number, _)| *page_number)
            .collect()
    }

    pub fn card(&self, id: &str) -> Option<CommentCard> {
        self.state
            .borrow()
            .pages
            .values()
            .flat_map(|page| page.cards.iter())
            .find(|card| card.id == id)
            .cloned()
    }

    /// All cards, by page then arrival order
    pub fn cards(&self) -> Vec<CommentCard> {
        self.state
            .borrow()
            .pages
            .values()
            .flat_map(|page| page.cards.iter().cloned())
            .collect()
    }

    /// Ask to bring a card into view; honoured once its page is reconciled
    pub fn request_focus(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        state.focus_request = Some(id.to_string());
        state.resolve_focus();
    }

    pub fn focused(&self) -> Option<String> {
        self.state.borrow().focused.clone()
    }

    /// Stop following the bus
    pub fn destroy(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}
