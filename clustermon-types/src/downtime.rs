//! Downtime (spec §3): a scheduled suppression window, owned exclusively
//! by its Checkable.

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Downtime {
    pub id: String,
    pub legacy_numeric_id: u64,
    pub author: String,
    pub comment: String,
    pub entry_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub fixed: bool,
    pub duration: f64,
    pub triggered_by_id: Option<String>,
    pub trigger_time: Option<f64>,
    pub is_active: bool,
    pub was_cancelled: bool,
    pub scheduled_by: String,
}

impl Downtime {
    /// Recompute `is_active` given the current time (spec §3):
    /// fixed downtimes are in effect iff `now ∈ [start, end]`; flexible
    /// downtimes are in effect from their trigger time for `duration`
    /// seconds once triggered.
    pub fn recompute_active(&mut self, now: f64) {
        if self.was_cancelled {
            self.is_active = false;
            return;
        }
        self.is_active = if self.fixed {
            now >= self.start_time && now <= self.end_time
        } else {
            match self.trigger_time {
                Some(t) => now >= t && now <= t + self.duration,
                None => false,
            }
        };
    }

    /// Flexible downtimes trigger on the first non-OK check within
    /// `[start, end]` (spec §3). No-op if already triggered, fixed, or
    /// outside the window.
    pub fn try_trigger(&mut self, now: f64) -> bool {
        if self.fixed || self.trigger_time.is_some() {
            return false;
        }
        if now < self.start_time || now > self.end_time {
            return false;
        }
        self.trigger_time = Some(now);
        true
    }

    /// Expired iff now > end (fixed) or end of flex window has passed, or
    /// cancelled — garbage-collected by the 60s sweeper (spec §3).
    pub fn is_expired(&self, now: f64) -> bool {
        if self.was_cancelled {
            return true;
        }
        if self.fixed {
            now > self.end_time
        } else {
            match self.trigger_time {
                Some(t) => now > t + self.duration,
                None => now > self.end_time,
            }
        }
    }
}
