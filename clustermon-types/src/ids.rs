//! Stable identities used as registry keys across the store, scheduler,
//! and cluster relay.

use std::fmt;

/// Identity of a Checkable: a Host, or a Service scoped to a Host.
///
/// This is the `(type, name)` key the object store indexes by; `type` is
/// folded into the variant rather than carried as a separate string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum CheckableId {
    Host { host: String },
    Service { host: String, service: String },
}

impl CheckableId {
    pub fn host(host: impl Into<String>) -> Self {
        CheckableId::Host { host: host.into() }
    }

    pub fn service(host: impl Into<String>, service: impl Into<String>) -> Self {
        CheckableId::Service {
            host: host.into(),
            service: service.into(),
        }
    }

    pub fn host_name(&self) -> &str {
        match self {
            CheckableId::Host { host } => host,
            CheckableId::Service { host, .. } => host,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            CheckableId::Host { .. } => None,
            CheckableId::Service { service, .. } => Some(service),
        }
    }

    /// The name of the host this checkable belongs to (itself, for a Host).
    pub fn owning_host(&self) -> CheckableId {
        CheckableId::Host {
            host: self.host_name().to_string(),
        }
    }

    /// The `type(o) + "\t" + name(o)` string the authority hash is computed over (§4.6).
    pub fn hash_key(&self) -> String {
        match self {
            CheckableId::Host { host } => format!("Host\t{host}"),
            CheckableId::Service { host, service } => format!("Service\t{host}!{service}"),
        }
    }
}

impl fmt::Display for CheckableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckableId::Host { host } => write!(f, "{host}"),
            CheckableId::Service { host, service } => write!(f, "{host}!{service}"),
        }
    }
}

/// Identity of a Notification object, scoped to its parent Checkable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NotificationId {
    pub checkable: CheckableId,
    pub name: String,
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.checkable, self.name)
    }
}
