//! Two small timer-driven background loops: the compat status file
//! writer and the IDO heartbeat (spec §6: "fires every 10s").

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clustermon_interfaces::{write_status_file, CompatStatusSource, IdoHeartbeat, IdoSink, ProgramStatus};
use clustermon_store::Store;

const STATUS_WRITE_INTERVAL: Duration = Duration::from_secs(15);
const IDO_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

pub fn spawn_status_writer(path: PathBuf, store: Arc<Store>, status: Arc<ProgramStatus>, shutdown: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("clustermon-status-writer".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                let source = CompatStatusSource { store: &store, status: &status };
                if let Err(e) = write_status_file(&path, &source) {
                    tracing::warn!(error = %e, "failed to write compat status file");
                }
                std::thread::sleep(STATUS_WRITE_INTERVAL);
            }
        })
        .expect("failed to spawn clustermon-status-writer thread")
}

pub fn spawn_ido_heartbeat(sink: Arc<dyn IdoSink>, status: Arc<ProgramStatus>, shutdown: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("clustermon-ido-heartbeat".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                let flags = status.snapshot();
                sink.heartbeat(IdoHeartbeat {
                    pid: flags.pid,
                    program_start: flags.program_start,
                    active_checks_enabled: flags.active_checks_enabled,
                    notifications_enabled: flags.notifications_enabled,
                    check_count: flags.check_count,
                    notification_count: flags.notification_count,
                });
                std::thread::sleep(IDO_HEARTBEAT_INTERVAL);
            }
        })
        .expect("failed to spawn clustermon-ido-heartbeat thread")
}
