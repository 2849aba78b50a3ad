//! Persisted replay log (spec §4.6): every `persistent=true` message is
//! appended to the current segment; a segment rotates past 50 000
//! entries; replay skips entries sourced from the target peer (no echo)
//! and entries privilege-security denies it; log GC unlinks segments
//! older than the minimum `local_log_position` across all peers.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::message::{RelayMessage, Security};

pub const SEGMENT_CAPACITY: usize = 50_000;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub ts: f64,
    pub source: String,
    pub security: Option<Security>,
    pub payload: RelayMessage,
}

#[derive(Default)]
struct Segment {
    entries: Vec<LogEntry>,
}

/// An append-only, segment-rotating replay log guarded by a single mutex
/// (spec §4.6: "appended to the current log segment under a mutex").
pub struct ReplayLog {
    segments: Mutex<VecDeque<Segment>>,
}

impl ReplayLog {
    pub fn new() -> Self {
        ReplayLog {
            segments: Mutex::new(VecDeque::from([Segment::default()])),
        }
    }

    pub fn append(&self, entry: LogEntry) {
        let mut segments = self.segments.lock();
        if segments.back().map_or(true, |s| s.entries.len() >= SEGMENT_CAPACITY) {
            segments.push_back(Segment::default());
        }
        segments.back_mut().expect("segment just ensured present").entries.push(entry);
    }

    /// Rotate eagerly — used when replay begins for a newly connected peer
    /// so the live segment the peer is catching up to doesn't grow further
    /// underneath the replay cursor (spec §4.6).
    pub fn rotate(&self) {
        self.segments.lock().push_back(Segment::default());
    }

    /// Entries with `ts >= from`, excluding ones sourced from `exclude_source`
    /// (no echo) and ones `security` denies `peer_privileges` for.
    pub fn replay_from(&self, from: f64, exclude_source: &str, peer_privileges: impl Fn(&Security) -> bool) -> Vec<LogEntry> {
        self.segments
            .lock()
            .iter()
            .flat_map(|s| s.entries.iter())
            .filter(|e| e.ts >= from)
            .filter(|e| e.source != exclude_source)
            .filter(|e| e.security.as_ref().map_or(true, |sec| peer_privileges(sec)))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.segments.lock().iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unlink (drop in-memory here; a real disk-backed log would remove
    /// the file) any segment whose every entry's ts precedes
    /// `min_local_log_position` across all peers (spec §4.6: "Log GC").
    pub fn gc(&self, min_local_log_position: f64) {
        let mut segments = self.segments.lock();
        while segments.len() > 1 {
            let oldest_is_stale = segments
                .front()
                .map(|s| s.entries.last().map_or(true, |e| e.ts < min_local_log_position))
                .unwrap_or(false);
            if oldest_is_stale {
                segments.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for ReplayLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: f64, source: &str) -> LogEntry {
        LogEntry {
            ts,
            source: source.to_string(),
            security: None,
            payload: RelayMessage::new("SetNextCheck", serde_json::json!({}), ts, source),
        }
    }

    #[test]
    fn replay_excludes_entries_from_the_target_peer() {
        let log = ReplayLog::new();
        log.append(entry(10.0, "node-a"));
        log.append(entry(20.0, "node-b"));

        let replayed = log.replay_from(0.0, "node-b", |_| true);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].source, "node-a");
    }

    #[test]
    fn replay_honours_ts_floor() {
        let log = ReplayLog::new();
        log.append(entry(10.0, "node-a"));
        log.append(entry(20.0, "node-a"));

        let replayed = log.replay_from(15.0, "nobody", |_| true);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].ts, 20.0);
    }

    #[test]
    fn gc_drops_segments_entirely_before_the_floor() {
        let log = ReplayLog::new();
        log.append(entry(10.0, "node-a"));
        log.rotate();
        log.append(entry(100.0, "node-a"));

        log.gc(50.0);
        assert_eq!(log.len(), 1);
        assert_eq!(log.replay_from(0.0, "nobody", |_| true)[0].ts, 100.0);
    }

    #[test]
    fn gc_keeps_last_segment_even_if_stale() {
        let log = ReplayLog::new();
        log.append(entry(10.0, "node-a"));
        log.gc(1000.0);
        assert_eq!(log.len(), 1, "never drop the only (live) segment");
    }
}
