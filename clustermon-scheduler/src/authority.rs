//! The authority seam (spec §4.2, §4.6): the scheduler only ever asks
//! "do I currently own the checker role for this object", never how
//! ownership was decided — that's the cluster layer's job.

use clustermon_types::CheckableId;

pub trait AuthorityOracle: Send + Sync {
    fn holds_checker_authority(&self, id: &CheckableId) -> bool;
}

/// Single-node default: this node owns every object. Used in tests and
/// in a non-clustered daemon configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoleAuthority;

impl AuthorityOracle for SoleAuthority {
    fn holds_checker_authority(&self, _id: &CheckableId) -> bool {
        true
    }
}

/// Lets the scheduler hold a shared oracle (e.g. one also consulted
/// elsewhere for notification authority) instead of owning a private copy.
impl<T: AuthorityOracle + ?Sized> AuthorityOracle for std::sync::Arc<T> {
    fn holds_checker_authority(&self, id: &CheckableId) -> bool {
        (**self).holds_checker_authority(id)
    }
}
