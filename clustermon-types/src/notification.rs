//! Notification object (spec §3, §4.5) and its filter bitmasks, grounded
//! on `Notification::StaticInitialize` in the original `notification.cpp`.

use crate::ids::CheckableId;

/// Notification type, bit-indexed into [`TypeFilter`] as `1 << index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NotificationType {
    DowntimeStart = 0,
    DowntimeEnd = 1,
    DowntimeRemoved = 2,
    Custom = 3,
    Acknowledgement = 4,
    Problem = 5,
    Recovery = 6,
    FlappingStart = 7,
    FlappingEnd = 8,
}

impl NotificationType {
    pub fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

/// Bitmask of [`crate::checkable::CurrentState::filter_bit`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateFilter(pub u32);

impl StateFilter {
    pub const ALL: StateFilter = StateFilter(0xFFFF_FFFF);

    pub fn matches(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

/// Bitmask of [`NotificationType::bit`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TypeFilter(pub u32);

impl TypeFilter {
    pub const ALL: TypeFilter = TypeFilter(0xFFFF_FFFF);

    pub fn matches(&self, ty: NotificationType) -> bool {
        self.0 & ty.bit() != 0
    }

    /// Only the flapping/custom/ack types (spec §4.4: flapping suppresses
    /// all other notification types).
    pub fn non_suppressible_during_flapping() -> TypeFilter {
        TypeFilter(
            NotificationType::FlappingStart.bit()
                | NotificationType::FlappingEnd.bit()
                | NotificationType::Custom.bit()
                | NotificationType::Acknowledgement.bit(),
        )
    }
}

/// The escalation window, measured from `last_hard_state_change` (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EscalationTimes {
    pub begin: Option<f64>,
    pub end: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Notification {
    pub name: String,
    pub parent: CheckableId,
    pub command: String,
    pub users: Vec<String>,
    pub user_groups: Vec<String>,
    pub period: Option<String>,
    pub state_filter: StateFilter,
    pub type_filter: TypeFilter,
    /// Re-notification interval in seconds; 0 disables periodic reminders.
    pub interval: f64,
    pub times: EscalationTimes,
    pub last_notification: f64,
    pub last_problem_notification: f64,
    pub next_notification: f64,
    pub notification_number: u32,
}

impl Notification {
    pub fn reset_number(&mut self) {
        self.notification_number = 0;
    }

    pub fn advance_number(&mut self) {
        self.notification_number += 1;
    }
}
