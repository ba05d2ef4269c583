//! Deduplication Engine
//!
//! Event ids are unique across the whole input, so a single run-scoped set
//! filters repeats for every site at once. The set is owned by the run's
//! [`crate::registry::RunContext`]; nothing here is process-global.
//!
//! The backing set is a [`DashSet`], so the deduplicator can be shared by
//! reference if routing is ever split across threads. The single-threaded
//! driver uses [`MessageDeduplicator::check_and_mark`], which tests and marks
//! in one step.

use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct MessageDeduplicator {
    seen_ids: DashSet<String>,
}

impl MessageDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn mark(&self, id: &str) {
        self.seen_ids.insert(id.to_string());
    }

    /// Marks `id` and returns `true` if it had not been seen before.
    pub fn check_and_mark(&self, id: &str) -> bool {
        if self.seen_ids.contains(id) {
            return false;
        }
        self.seen_ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_ids.is_empty()
    }
}
