//! User / UserGroup (spec §3).

use crate::notification::{StateFilter, TypeFilter};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub name: String,
    pub period: Option<String>,
    pub state_filter: StateFilter,
    pub type_filter: TypeFilter,
    pub enable_notifications: bool,
    /// Contact channels this user can be reached on (e.g. "mail", "sms");
    /// the concrete delivery mechanism lives in the notification command.
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UserGroup {
    pub name: String,
    pub members: Vec<String>,
}
