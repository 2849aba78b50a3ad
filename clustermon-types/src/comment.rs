//! Comment (spec §3): owned exclusively by its Checkable.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CommentEntryType {
    User,
    Downtime,
    Flapping,
    Acknowledgement,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comment {
    pub id: String,
    pub legacy_numeric_id: u64,
    pub author: String,
    pub text: String,
    pub entry_time: f64,
    pub entry_type: CommentEntryType,
    /// 0 means no expiry.
    pub expire_time: f64,
}

impl Comment {
    pub fn is_expired(&self, now: f64) -> bool {
        self.expire_time > 0.0 && now > self.expire_time
    }
}
