//! Object store and event bus (spec §4.1).

pub mod events;
pub mod store;

pub use events::{ClusterFeature, EventBus, RelaySecurity, StoreEvent};
pub use store::{Handle, Store};
