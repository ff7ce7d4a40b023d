//! Identifier allocation
//!
//! Two disjoint namespaces share the record keyspace:
//!
//! - stable ids, `<prefix><n>`, issued by the editing layer from a
//!   monotonic counter that this allocator reconstructs and hands back
//! - virtual ids, `virtual-<uuid>`, minted client-side for annotations that
//!   are not yet backed by a stable id
//!
//! The counter only moves forward, so an id is never reassigned to another
//! annotation within a session even after deletion.

use uuid::Uuid;

/// Lexical prefix of every virtual id
pub const VIRTUAL_ID_PREFIX: &str = "virtual-";

/// Namespace an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Virtual,
    Stable(u64),
    /// Neither namespace; kept as-is, never advances the counter
    Foreign,
}

/// Classifies ids and tracks the next stable counter value
#[derive(Debug, Clone)]
pub struct IdAllocator {
    stable_prefix: String,
    next_stable: u64,
}

impl IdAllocator {
    pub fn new(stable_prefix: &str) -> Self {
        Self {
            stable_prefix: stable_prefix.to_string(),
            next_stable: 0,
        }
    }

    pub fn stable_prefix(&self) -> &str {
        &self.stable_prefix
    }

    pub fn is_virtual(id: &str) -> bool {
        id.starts_with(VIRTUAL_ID_PREFIX)
    }

    /// Mint a fresh virtual id (UUID v4, hyphenated hex groups)
    pub fn new_virtual_id() -> String {
        format!("{}{}", VIRTUAL_ID_PREFIX, Uuid::new_v4())
    }

    pub fn classify(&self, id: &str) -> IdKind {
        if Self::is_virtual(id) {
            return IdKind::Virtual;
        }
        match self.parse_stable(id) {
            Some(n) => IdKind::Stable(n),
            None => IdKind::Foreign,
        }
    }

    /// Counter value of a stable id, if `id` is one
    pub fn parse_stable(&self, id: &str) -> Option<u64> {
        let digits = id.strip_prefix(self.stable_prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Format counter value `n` as a stable id
    pub fn stable_id(&self, n: u64) -> String {
        format!("{}{}", self.stable_prefix, n)
    }

    /// Advance the counter past `id` if it is a stable id.
    ///
    /// Returns the counter value after observation.
    pub fn observe(&mut self, id: &str) -> u64 {
        if let Some(n) = self.parse_stable(id) {
            self.next_stable = self.next_stable.max(n.saturating_add(1));
        }
        self.next_stable
    }

    /// Reconstruct the counter from a set of loaded ids (max + 1)
    pub fn observe_all<'a, I>(&mut self, ids: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.observe(id);
        }
        self.next_stable
    }

    /// Next counter value the editing layer should issue
    pub fn next_stable(&self) -> u64 {
        self.next_stable
    }
}
