//! Immutable CheckResult record (spec §3).

use crate::checkable::{CurrentState, StateType};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PerfDataPoint {
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub warn: Option<String>,
    pub crit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Identity of whoever produced the result: a local check source name, or
/// a cluster peer identity for replicated passive results.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CheckSource {
    Local(String),
    Peer(String),
}

/// State snapshot recorded before and after processing a CheckResult, used
/// by downstream observers to suppress idempotent re-emission (spec §3, §8).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VarsSnapshot {
    pub state: CurrentState,
    pub state_type: StateType,
    pub attempt: u32,
    pub reachable: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckResult {
    pub schedule_start: f64,
    pub schedule_end: f64,
    pub execution_start: f64,
    pub execution_end: f64,
    pub exit_status: i32,
    pub output: String,
    pub long_output: String,
    pub perfdata: Vec<PerfDataPoint>,
    pub check_source: CheckSource,
    pub active: bool,
    pub vars_before: Option<VarsSnapshot>,
    pub vars_after: Option<VarsSnapshot>,
}

impl CheckResult {
    pub fn latency(&self) -> f64 {
        self.execution_start - self.schedule_start
    }

    pub fn execution_time(&self) -> f64 {
        self.execution_end - self.execution_start
    }

    /// True iff vars_before == vars_after, i.e. processing this result
    /// would be a no-op state-machine transition (spec §8 round-trip).
    pub fn is_idempotent(&self) -> bool {
        match (&self.vars_before, &self.vars_after) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
