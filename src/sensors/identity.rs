//! Device identity change detection.
//!
//! Refreshing the accessory information is more disruptive than updating a
//! value, so it only happens when the reported uid differs from the stored one.

/// Outcome of comparing an observed identifier with the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    Unchanged,
    Changed(String),
}

impl ReconcileResult {
    pub fn is_changed(&self) -> bool {
        matches!(self, ReconcileResult::Changed(_))
    }
}

/// Compare the identifier from a message with the currently stored one.
pub fn reconcile(new_id: &str, current_id: &str) -> ReconcileResult {
    if new_id == current_id {
        ReconcileResult::Unchanged
    } else {
        ReconcileResult::Changed(new_id.to_string())
    }
}
