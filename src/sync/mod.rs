//! Sync module
//!
//! Keeps the record store, durable storage and the editing layer consistent:
//!
//! 1. `editor-session-ready` loads the persisted records (`init`), hands the
//!    stable-id counter to the editing layer and registers lifecycle hooks
//! 2. Lifecycle hooks and comment submissions mutate the store; each change
//!    is persisted, then published as `record-store-changed`
//! 3. `page-layer-rendered` / `document-loaded` materialize pending records
//!    and publish `reconciliation-complete` per swept page

mod engine;

pub use engine::SyncEngine;
