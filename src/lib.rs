//! Folio annotations
//!
//! Canonical record store and reconciliation engine for document
//! annotations (highlights, notes and their comment threads).
//!
//! # Modules
//!
//! - `annotations`: record model, id allocation, editor conversion, store
//! - `events`: publish/subscribe bus with cancelable subscriptions
//! - `display`: editing-layer interfaces and the display reconciler
//! - `storage`: persistence backends and the stored JSON format
//! - `sync`: the engine that keeps store, storage and layers consistent
//! - `sidebar`: page-grouped comment list fed from the bus
//! - `headless`: in-memory editing layer
//! - `replay`: JSON-lines host scripts

pub mod annotations;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod headless;
pub mod replay;
pub mod sidebar;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{AnnotationError, Result};
pub use events::{BusEvent, EventBus, Subscription, Topic};
pub use sync::SyncEngine;
