//! The notification engine (spec §4.5): per-Notification filter
//! evaluation, user/group fan-out over a dedicated execution pool, and a
//! periodic sweep that re-fires reminders for notifications still due.

pub mod dispatch;
pub mod executor;
pub mod filter;
pub mod sweep;

pub use dispatch::send_notifications;
pub use executor::{NotifyExecutor, NotifyJob};
pub use sweep::{spawn as spawn_sweep, SweepHandle};
