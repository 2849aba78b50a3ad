//! The check scheduler: due-time ordering over Idle/Pending sets,
//! authority-gated dispatch, and clock-step correction (spec §4.2).

pub mod authority;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod scheduler;

pub use authority::{AuthorityOracle, SoleAuthority};
pub use dispatch::Dispatcher;
pub use error::SchedulerError;
pub use index::TimeIndex;
pub use scheduler::Scheduler;
