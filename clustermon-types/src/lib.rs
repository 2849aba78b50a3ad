//! Typed data model for the clustermon monitoring core.
//!
//! Every entity that crosses a component boundary (scheduler, state
//! machine, notification engine, cluster relay) is a plain tagged struct
//! here, not a dynamic attribute bag. The only place a dynamic bag
//! survives is [`vars::VarsBag`], which backs user-supplied custom
//! variables consumed by macro resolution.

pub mod checkable;
pub mod check_result;
pub mod comment;
pub mod dependency;
pub mod downtime;
pub mod endpoint;
pub mod ids;
pub mod notification;
pub mod time_period;
pub mod user;
pub mod vars;

pub use checkable::{AckKind, Checkable, CheckableKind, HostState, ServiceState, StateType};
pub use check_result::{CheckResult, CheckSource, PerfDataPoint, VarsSnapshot};
pub use comment::{Comment, CommentEntryType};
pub use dependency::{Dependency, DependencyPurpose};
pub use downtime::Downtime;
pub use endpoint::Endpoint;
pub use ids::{CheckableId, NotificationId};
pub use notification::{Notification, NotificationType, StateFilter, TypeFilter};
pub use time_period::{AlwaysInside, TimePeriodRegistry};
pub use user::{User, UserGroup};
pub use vars::{MacroValue, VarsBag};
