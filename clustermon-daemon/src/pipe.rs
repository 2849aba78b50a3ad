//! Continuously reads the external command pipe (spec §4.8, §6): unlike
//! [`clustermon_interfaces::FileCommandSource`], which ingests one batch
//! file and optionally unlinks it, this is the long-lived named-pipe
//! reader — a FIFO hits EOF once its last writer closes, so the loop
//! reopens it rather than treating EOF as a shutdown signal.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clustermon_interfaces::{parse_line, CommandRegistry, ProgramStatus};
use clustermon_store::Store;

const REOPEN_BACKOFF: Duration = Duration::from_millis(250);

pub fn spawn(path: PathBuf, store: Arc<Store>, status: Arc<ProgramStatus>, registry: Arc<CommandRegistry>, shutdown: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("clustermon-command-pipe".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                let file = match std::fs::File::open(&path) {
                    Ok(f) => f,
                    Err(_) => {
                        std::thread::sleep(REOPEN_BACKOFF);
                        continue;
                    }
                };

                for line in BufReader::new(file).lines() {
                    if shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    let Ok(line) = line else { continue };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_line(&line) {
                        Ok(cmd) => {
                            if let Err(e) = registry.dispatch(&store, &status, &cmd) {
                                tracing::warn!(error = %e, verb = %cmd.verb, "external command rejected");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, %line, "malformed external command line, discarded"),
                    }
                }
                std::thread::sleep(REOPEN_BACKOFF);
            }
        })
        .expect("failed to spawn clustermon-command-pipe thread")
}
