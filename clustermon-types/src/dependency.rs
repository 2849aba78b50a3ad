//! Dependency edges (spec §3, §4.4): a child is reachable for a purpose
//! iff every dependency gating that purpose is satisfied.

use crate::ids::CheckableId;
use crate::notification::StateFilter;

/// Which purpose a dependency gates (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DependencyPurpose {
    CheckExecution,
    Notification,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Dependency {
    pub parent: CheckableId,
    pub child: CheckableId,
    pub state_filter: StateFilter,
    pub period: Option<String>,
    pub disable_checks: bool,
    pub disable_notifications: bool,
}

impl Dependency {
    /// Whether this edge gates the given purpose at all.
    pub fn gates(&self, purpose: DependencyPurpose) -> bool {
        match purpose {
            DependencyPurpose::CheckExecution => self.disable_checks,
            DependencyPurpose::Notification => self.disable_notifications,
        }
    }
}
