//! The hand-off to the check-execution pool (spec §4.2 step 4): the
//! scheduler never calls a check command directly, it just enqueues.

use clustermon_types::CheckableId;

pub trait Dispatcher: Send + Sync {
    /// Enqueue `id` for execution. Must not block on the check itself
    /// completing; the execution pool reports back via
    /// [`crate::Scheduler::on_execution_complete`].
    fn dispatch(&self, id: CheckableId);
}
