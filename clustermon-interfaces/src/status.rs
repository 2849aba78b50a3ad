//! Program status (spec §3 ambient addition; SPEC_FULL §3): the
//! enabled-flags snapshot and rate counters the IDO heartbeat and the
//! compat status writer both need, plus the compat status file itself
//! (spec §6: "a plain-text status file... atomically via
//! write-to-temp-and-rename").

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use clustermon_store::Store;
use clustermon_types::{Checkable, Endpoint};

/// Process-wide enabled-flags and identity, mutated by the global
/// external-command toggles (spec §4.8) and read by the daemon's
/// scheduling/notification loops.
pub struct ProgramStatus {
    pid: u32,
    program_start: f64,
    active_checks_enabled: AtomicBool,
    notifications_enabled: AtomicBool,
    flap_detection_enabled: AtomicBool,
    event_handlers_enabled: AtomicBool,
    performance_data_enabled: AtomicBool,
    check_count: AtomicI64,
    notification_count: AtomicI64,
}

/// A point-in-time read of [`ProgramStatus`]'s flags.
#[derive(Debug, Clone, Copy)]
pub struct StatusFlags {
    pub pid: u32,
    pub program_start: f64,
    pub active_checks_enabled: bool,
    pub notifications_enabled: bool,
    pub flap_detection_enabled: bool,
    pub event_handlers_enabled: bool,
    pub performance_data_enabled: bool,
    pub check_count: i64,
    pub notification_count: i64,
}

impl ProgramStatus {
    pub fn new() -> Self {
        ProgramStatus {
            pid: std::process::id(),
            program_start: 0.0,
            active_checks_enabled: AtomicBool::new(true),
            notifications_enabled: AtomicBool::new(true),
            flap_detection_enabled: AtomicBool::new(true),
            event_handlers_enabled: AtomicBool::new(true),
            performance_data_enabled: AtomicBool::new(true),
            check_count: AtomicI64::new(0),
            notification_count: AtomicI64::new(0),
        }
    }

    pub fn with_start_time(mut self, program_start: f64) -> Self {
        self.program_start = program_start;
        self
    }

    pub fn set_active_checks_enabled(&self, v: bool) {
        self.active_checks_enabled.store(v, Ordering::SeqCst);
    }
    pub fn set_notifications_enabled(&self, v: bool) {
        self.notifications_enabled.store(v, Ordering::SeqCst);
    }
    pub fn set_flap_detection_enabled(&self, v: bool) {
        self.flap_detection_enabled.store(v, Ordering::SeqCst);
    }
    pub fn set_event_handlers_enabled(&self, v: bool) {
        self.event_handlers_enabled.store(v, Ordering::SeqCst);
    }
    pub fn set_performance_data_enabled(&self, v: bool) {
        self.performance_data_enabled.store(v, Ordering::SeqCst);
    }

    pub fn record_check(&self) {
        self.check_count.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_notification(&self) {
        self.notification_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusFlags {
        StatusFlags {
            pid: self.pid,
            program_start: self.program_start,
            active_checks_enabled: self.active_checks_enabled.load(Ordering::SeqCst),
            notifications_enabled: self.notifications_enabled.load(Ordering::SeqCst),
            flap_detection_enabled: self.flap_detection_enabled.load(Ordering::SeqCst),
            event_handlers_enabled: self.event_handlers_enabled.load(Ordering::SeqCst),
            performance_data_enabled: self.performance_data_enabled.load(Ordering::SeqCst),
            check_count: self.check_count.load(Ordering::Relaxed),
            notification_count: self.notification_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for ProgramStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// The read-only accessors spec.md §6 says the compat status writer
/// enumerates the object store through, kept separate from the Store
/// type itself so a future Livestatus-style consumer can implement it
/// without depending on `clustermon-store`'s internals.
pub trait StatusSnapshotSource {
    fn program_status(&self) -> StatusFlags;
    fn checkables(&self) -> Vec<Checkable>;
    fn endpoints(&self) -> Vec<Endpoint>;
}

pub struct CompatStatusSource<'a> {
    pub store: &'a Store,
    pub status: &'a ProgramStatus,
}

impl StatusSnapshotSource for CompatStatusSource<'_> {
    fn program_status(&self) -> StatusFlags {
        self.status.snapshot()
    }

    fn checkables(&self) -> Vec<Checkable> {
        self.store.all_checkables().iter().map(|h| h.lock().clone()).collect()
    }

    fn endpoints(&self) -> Vec<Endpoint> {
        self.store.all_endpoints().iter().map(|h| h.lock().clone()).collect()
    }
}

/// Render one checkable as the plain-text block format (spec §6).
fn render_checkable(c: &Checkable) -> String {
    let mut out = String::new();
    out.push_str("define checkablestatus {\n");
    out.push_str(&format!("\thost_name={}\n", c.id.host_name()));
    if let Some(service) = c.id.service_name() {
        out.push_str(&format!("\tservice_description={service}\n"));
    }
    out.push_str(&format!("\tcurrent_attempt={}\n", c.attempt));
    out.push_str(&format!("\tmax_check_attempts={}\n", c.max_check_attempts));
    out.push_str(&format!("\tcheck_interval={}\n", c.check_interval));
    out.push_str(&format!("\tnext_check={}\n", c.next_check));
    out.push_str(&format!("\tactive_checks_enabled={}\n", c.active_checks_enabled as u8));
    out.push_str(&format!("\tnotifications_enabled={}\n", c.notifications_enabled as u8));
    out.push_str("}\n");
    out
}

/// Write the compat status file atomically: render into `<path>.tmp` then
/// rename over `path` (spec §6: "atomically via write-to-temp-and-rename").
pub fn write_status_file(path: impl AsRef<Path>, source: &dyn StatusSnapshotSource) -> io::Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");

    let status = source.program_status();
    let mut body = String::new();
    body.push_str("define programstatus {\n");
    body.push_str(&format!("\tpid={}\n", status.pid));
    body.push_str(&format!("\tprogram_start={}\n", status.program_start));
    body.push_str(&format!("\tactive_checks_enabled={}\n", status.active_checks_enabled as u8));
    body.push_str(&format!("\tnotifications_enabled={}\n", status.notifications_enabled as u8));
    body.push_str(&format!("\tcheck_count={}\n", status.check_count));
    body.push_str(&format!("\tnotification_count={}\n", status.notification_count));
    body.push_str("}\n");

    for c in source.checkables() {
        body.push_str(&render_checkable(&c));
    }

    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::CommandLine;

    #[test]
    fn toggling_flags_is_visible_in_the_next_snapshot() {
        let status = ProgramStatus::new();
        assert!(status.snapshot().notifications_enabled);
        status.set_notifications_enabled(false);
        assert!(!status.snapshot().notifications_enabled);
    }

    #[test]
    fn write_status_file_round_trips_to_disk() {
        let store = Store::new();
        store.insert_checkable(Checkable::new_host("web1", CommandLine::Argv(vec!["true".into()])));
        let status = ProgramStatus::new();
        let source = CompatStatusSource { store: &store, status: &status };

        let dir = std::env::temp_dir().join(format!("clustermon-status-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("status.dat");

        write_status_file(&path, &source).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("host_name=web1"));
        assert!(contents.contains("define programstatus"));

        fs::remove_dir_all(&dir).ok();
    }
}
