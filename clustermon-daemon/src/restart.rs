//! Managed restart (spec §5: "a replacement process is spawned with the
//! same arguments; if the new process fails to load its configuration
//! the current process continues; if it succeeds the old process exits
//! on its next scheduler tick").
//!
//! The handoff signal is a ready-file: the child touches it the moment
//! its own `load_config` call succeeds, before it does any other setup.
//! The parent polls for it with a bounded deadline rather than blocking
//! forever, so a hung or crashed child can never wedge the parent.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn spawn_replacement() -> std::io::Result<(Child, PathBuf)> {
    let ready_file = std::env::temp_dir().join(format!("clustermond-restart-ready-{}", std::process::id()));
    let _ = std::fs::remove_file(&ready_file);

    let exe = std::env::current_exe()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let child = Command::new(exe).args(&args).arg("--restart-ready-file").arg(&ready_file).spawn()?;
    Ok((child, ready_file))
}

/// Spawn a replacement process and wait (bounded) to see whether it
/// loads successfully. Returns `true` when the caller should hand off
/// (stop the scheduler on its next tick and exit), `false` when the
/// restart attempt failed and the current process should keep running.
pub fn attempt(mut on_poll: impl FnMut()) -> bool {
    let (mut child, ready_file) = match spawn_replacement() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "failed to spawn replacement process; continuing");
            return false;
        }
    };

    let start = Instant::now();
    loop {
        if ready_file.exists() {
            let _ = std::fs::remove_file(&ready_file);
            tracing::info!("replacement process signalled readiness; handing off");
            return true;
        }
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::warn!(?status, "replacement process exited before signalling readiness; continuing");
                return false;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to poll replacement process; continuing");
                return false;
            }
        }
        if start.elapsed() > READY_TIMEOUT {
            tracing::warn!("replacement process did not signal readiness in time; continuing");
            return false;
        }
        on_poll();
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Called by a freshly spawned replacement process once its own
/// configuration has loaded: touches the ready-file the parent is
/// polling for.
pub fn signal_ready(ready_file: &Path) -> std::io::Result<()> {
    std::fs::write(ready_file, b"")
}
