//! Event bus
//!
//! The only channel between the sync engine and its consumers (editing
//! layer, sidebar, host shell). Delivery is synchronous and in subscription
//! order: `dispatch` returns after every listener of the topic has run.
//! Nested dispatches from inside a listener are delivered depth-first, so
//! listeners observe events in the order they were produced.
//!
//! Every `on` call returns a [`Subscription`] which must be cancelled
//! explicitly with [`Subscription::unsubscribe`]; dropping it leaves the
//! listener attached.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::annotations::StoreChange;
use crate::display::UiManagerHandle;

/// Named event topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    EditorSessionReady,
    PageLayerRendered,
    DocumentLoaded,
    DocumentPageCountKnown,
    CommentSubmitted,
    RecordStoreChanged,
    ReconciliationComplete,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::EditorSessionReady => "editor-session-ready",
            Topic::PageLayerRendered => "page-layer-rendered",
            Topic::DocumentLoaded => "document-loaded",
            Topic::DocumentPageCountKnown => "document-page-count-known",
            Topic::CommentSubmitted => "comment-submitted",
            Topic::RecordStoreChanged => "record-store-changed",
            Topic::ReconciliationComplete => "reconciliation-complete",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event and its payload
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A new editing session started
    EditorSessionReady { ui_manager: UiManagerHandle },
    /// The editing layer of a page is mounted (1-based page number)
    PageLayerRendered { page_number: u32 },
    /// The whole document finished loading
    DocumentLoaded,
    /// Total page count is known
    DocumentPageCountKnown { num_pages: u32 },
    /// A comment was confirmed in the sidebar input
    CommentSubmitted { editor_id: String, value: String },
    /// The record store changed
    RecordStoreChanged(StoreChange),
    /// Pending records of a page have been materialized
    ReconciliationComplete { page_index: u32 },
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::EditorSessionReady { .. } => Topic::EditorSessionReady,
            BusEvent::PageLayerRendered { .. } => Topic::PageLayerRendered,
            BusEvent::DocumentLoaded => Topic::DocumentLoaded,
            BusEvent::DocumentPageCountKnown { .. } => Topic::DocumentPageCountKnown,
            BusEvent::CommentSubmitted { .. } => Topic::CommentSubmitted,
            BusEvent::RecordStoreChanged(_) => Topic::RecordStoreChanged,
            BusEvent::ReconciliationComplete { .. } => Topic::ReconciliationComplete,
        }
    }
}

type Handler = Rc<RefCell<dyn FnMut(&BusEvent)>>;

struct Listener {
    id: u64,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl BusInner {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }
}

/// Publish/subscribe hub with named topics
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `topic`
    pub fn on<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: FnMut(&BusEvent) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            topic,
            handler: Rc::new(RefCell::new(handler)),
        });

        Subscription {
            id,
            topic,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every listener of its topic.
    ///
    /// Returns the number of listeners that ran.
    pub fn dispatch(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        let targets: Vec<(u64, Handler)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.topic == topic)
            .map(|listener| (listener.id, Rc::clone(&listener.handler)))
            .collect();

        let mut delivered = 0;
        for (id, handler) in targets {
            // A listener cancelled by an earlier listener of this dispatch
            if !self.is_attached(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => {
                    (&mut *handler)(&event);
                    delivered += 1;
                }
                Err(_) => {
                    tracing::warn!(topic = %topic, "Skipping re-entrant delivery to a busy listener");
                }
            }
        }
        delivered
    }

    /// Number of listeners currently attached to `topic`
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.topic == topic)
            .count()
    }

    fn is_attached(&self, id: u64) -> bool {
        self.inner
            .borrow()
            .listeners
            .iter()
            .any(|listener| listener.id == id)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.borrow().listeners.len())
            .finish()
    }
}

/// Handle to one attached listener
#[must_use = "a subscription must be kept to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<RefCell<BusInner>>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Whether the listener is still attached to a live bus
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .map(|inner| inner.borrow().listeners.iter().any(|l| l.id == self.id))
            .unwrap_or(false)
    }

    /// Detach the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.borrow_mut().remove(self.id),
            None => false,
        }
    }
}
