//! Unsaved-change detection
//!
//! Holds the persisted form of the tree as it looked at the last load/save
//! and compares structurally against the current tree. Comparing the
//! persisted form (not mutation history) means reverting a field to its
//! baseline value clears the modified state, and transient fields never
//! count as changes.

use serde_json::Value;

use crate::config::persist;
use crate::config::tree::ConfigTree;

#[derive(Debug, Clone)]
pub struct ChangeTracker {
    baseline: Value,
}

impl ChangeTracker {
    pub fn new(tree: &ConfigTree) -> Self {
        Self {
            baseline: persist::document(tree),
        }
    }

    /// Retain the current tree as the new baseline. Called right after every
    /// successful load or save.
    pub fn rebase(&mut self, tree: &ConfigTree) {
        self.baseline = persist::document(tree);
    }

    /// Whether the tree's persisted form differs from the baseline.
    pub fn modified(&self, tree: &ConfigTree) -> bool {
        persist::document(tree) != self.baseline
    }
}
