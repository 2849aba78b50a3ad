//! Cluster networking (spec §4.6, §4.7): mTLS peer connections, heartbeat,
//! authority election, message relay and replay-log persistence.

pub mod authority;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod node;
pub mod peer;
pub mod relay;
pub mod replay;
pub mod tls;

pub use error::ClusterError;
pub use heartbeat::{expire_stale, Heartbeat, HEARTBEAT_INTERVAL, STALE_AFTER};
pub use message::{apply, RelayMessage, Security};
pub use node::{ClusterHandle, ClusterNode, Transport};
pub use peer::PeerState;
pub use relay::{recipients, select_spanning_subset, Link};
pub use replay::{LogEntry, ReplayLog, SEGMENT_CAPACITY};
pub use tls::TlsIdentity;
