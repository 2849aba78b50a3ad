//! This node's view of per-checkable cluster authority (spec §4.6),
//! updated as `AuthorityChanged` events arrive off the bus and consulted
//! by the scheduler (checker authority) and the notify sweep
//! (notification authority).
//!
//! Absent any cluster configuration (or before the first election has
//! run), every checkable defaults to locally owned — a standalone node
//! must behave exactly like `clustermon_scheduler::SoleAuthority`.

use clustermon_scheduler::AuthorityOracle;
use clustermon_types::CheckableId;
use dashmap::DashMap;

pub struct ClusterAuthority {
    checker: DashMap<CheckableId, bool>,
    notifications: DashMap<CheckableId, bool>,
}

impl ClusterAuthority {
    pub fn new() -> Self {
        ClusterAuthority {
            checker: DashMap::new(),
            notifications: DashMap::new(),
        }
    }

    pub fn set_checker(&self, id: CheckableId, holds: bool) {
        self.checker.insert(id, holds);
    }

    pub fn set_notifications(&self, id: CheckableId, holds: bool) {
        self.notifications.insert(id, holds);
    }

    pub fn holds_notification_authority(&self, id: &CheckableId) -> bool {
        self.notifications.get(id).map(|v| *v).unwrap_or(true)
    }
}

impl Default for ClusterAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorityOracle for ClusterAuthority {
    fn holds_checker_authority(&self, id: &CheckableId) -> bool {
        self.checker.get(id).map(|v| *v).unwrap_or(true)
    }
}
