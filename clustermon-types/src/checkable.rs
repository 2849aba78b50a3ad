//! The Checkable data model (spec §3): a Host or a Service, polymorphic
//! over variant but represented here as one typed struct carrying a
//! [`CheckableKind`] tag plus a kind-specific current state.

use std::collections::BTreeMap;

use crate::check_result::CheckResult;
use crate::comment::Comment;
use crate::dependency::Dependency;
use crate::downtime::Downtime;
use crate::ids::{CheckableId, NotificationId};
use crate::vars::VarsBag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CheckableKind {
    Host,
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HostState {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

/// The variant-specific current state (spec §3: `current state
/// (variant-specific: Host∈{Up, Down}; Service∈{OK, Warning, Critical, Unknown})`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CurrentState {
    Host(HostState),
    Service(ServiceState),
}

impl CurrentState {
    /// Whether this is the "good" state (OK/Up) for its variant.
    pub fn is_ok(&self) -> bool {
        matches!(self, CurrentState::Host(HostState::Up) | CurrentState::Service(ServiceState::Ok))
    }

    /// The state filter bit for this state (spec §3: Up=16, Down=32,
    /// OK=1, Warning=2, Critical=4, Unknown=8).
    pub fn filter_bit(&self) -> u32 {
        match self {
            CurrentState::Host(HostState::Up) => 16,
            CurrentState::Host(HostState::Down) => 32,
            CurrentState::Service(ServiceState::Ok) => 1,
            CurrentState::Service(ServiceState::Warning) => 2,
            CurrentState::Service(ServiceState::Critical) => 4,
            CurrentState::Service(ServiceState::Unknown) => 8,
        }
    }

    /// Exit-status mapping (spec §4.3): for services 0→OK, 1→Warning,
    /// 2→Critical, others→Unknown; for hosts 0→Up, non-zero→Down.
    pub fn from_exit_status(kind: CheckableKind, exit_status: i32) -> CurrentState {
        match kind {
            CheckableKind::Host => {
                if exit_status == 0 {
                    CurrentState::Host(HostState::Up)
                } else {
                    CurrentState::Host(HostState::Down)
                }
            }
            CheckableKind::Service => CurrentState::Service(match exit_status {
                0 => ServiceState::Ok,
                1 => ServiceState::Warning,
                2 => ServiceState::Critical,
                _ => ServiceState::Unknown,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StateType {
    Soft,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AckKind {
    None,
    Normal,
    Sticky,
}

/// How the check command is invoked (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CommandLine {
    /// Ordered argv; first element is the executable.
    Argv(Vec<String>),
    /// A single string executed via a shell.
    Shell(String),
}

/// Flap-detection window counters (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlapWindow {
    pub positive: f64,
    pub negative: f64,
    pub last_change: f64,
    pub is_flapping: bool,
}

impl Default for FlapWindow {
    fn default() -> Self {
        FlapWindow {
            positive: 0.0,
            negative: 0.0,
            last_change: 0.0,
            is_flapping: false,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Acknowledgement {
    pub kind: AckKind,
    pub author: String,
    pub comment: String,
    /// Zero means "never expires" (spec §9 open question, resolved uniformly).
    pub expiry: f64,
}

impl Default for Acknowledgement {
    fn default() -> Self {
        Acknowledgement {
            kind: AckKind::None,
            author: String::new(),
            comment: String::new(),
            expiry: 0.0,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Checkable {
    pub id: CheckableId,
    pub kind: CheckableKind,

    pub check_command: CommandLine,
    pub check_interval: f64,
    pub retry_interval: f64,
    pub max_check_attempts: u32,
    pub check_period: Option<String>,

    pub current_state: CurrentState,
    pub state_type: StateType,
    pub attempt: u32,
    pub last_hard_state_change: f64,
    pub last_state_change: f64,

    pub last_check_result: Option<CheckResult>,
    pub next_check: f64,
    pub force_next_check: bool,

    pub active_checks_enabled: bool,
    pub passive_checks_enabled: bool,
    pub notifications_enabled: bool,
    pub force_next_notification: bool,

    pub enable_flapping: bool,
    pub flap_threshold: f64,
    pub flapping: FlapWindow,

    pub acknowledgement: Acknowledgement,

    pub downtimes: BTreeMap<String, Downtime>,
    pub comments: BTreeMap<String, Comment>,

    /// Weak back-references; the registry remains authoritative.
    pub notifications: Vec<NotificationId>,
    /// Dependency edges where this Checkable is the child.
    pub dependencies: Vec<Dependency>,

    pub vars: VarsBag,

    /// Cluster authority: which endpoints this checkable's authority may
    /// be elected from (empty = all endpoints eligible).
    pub authorities: Vec<String>,
}

impl Checkable {
    pub fn new_host(host: impl Into<String>, check_command: CommandLine) -> Self {
        let host = host.into();
        Checkable {
            id: CheckableId::host(host),
            kind: CheckableKind::Host,
            check_command,
            check_interval: 60.0,
            retry_interval: 60.0,
            max_check_attempts: 3,
            check_period: None,
            current_state: CurrentState::Host(HostState::Up),
            state_type: StateType::Hard,
            attempt: 1,
            last_hard_state_change: 0.0,
            last_state_change: 0.0,
            last_check_result: None,
            next_check: 0.0,
            force_next_check: false,
            active_checks_enabled: true,
            passive_checks_enabled: true,
            notifications_enabled: true,
            force_next_notification: false,
            enable_flapping: true,
            flap_threshold: 30.0,
            flapping: FlapWindow::default(),
            acknowledgement: Acknowledgement::default(),
            downtimes: BTreeMap::new(),
            comments: BTreeMap::new(),
            notifications: Vec::new(),
            dependencies: Vec::new(),
            vars: VarsBag::new(),
            authorities: Vec::new(),
        }
    }

    pub fn new_service(
        host: impl Into<String>,
        service: impl Into<String>,
        check_command: CommandLine,
    ) -> Self {
        let host = host.into();
        let service = service.into();
        Checkable {
            id: CheckableId::service(host, service),
            kind: CheckableKind::Service,
            check_command,
            check_interval: 60.0,
            retry_interval: 60.0,
            max_check_attempts: 3,
            check_period: None,
            current_state: CurrentState::Service(ServiceState::Ok),
            state_type: StateType::Hard,
            attempt: 1,
            last_hard_state_change: 0.0,
            last_state_change: 0.0,
            last_check_result: None,
            next_check: 0.0,
            force_next_check: false,
            active_checks_enabled: true,
            passive_checks_enabled: true,
            notifications_enabled: true,
            force_next_notification: false,
            enable_flapping: true,
            flap_threshold: 30.0,
            flapping: FlapWindow::default(),
            acknowledgement: Acknowledgement::default(),
            downtimes: BTreeMap::new(),
            comments: BTreeMap::new(),
            notifications: Vec::new(),
            dependencies: Vec::new(),
            vars: VarsBag::new(),
            authorities: Vec::new(),
        }
    }

    /// True iff at least one owned downtime is currently active (spec §3).
    pub fn in_downtime(&self) -> bool {
        self.downtimes.values().any(|d| d.is_active)
    }

    /// True iff an unexpired acknowledgement is set.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self.acknowledgement.kind, AckKind::None)
    }
}
