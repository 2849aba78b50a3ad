//! SIGINT/SIGTERM handling.
//!
//! No crate in this pack's grounding corpus touches OS signals — the
//! closest relatives are all async/tokio services that rely on a runtime
//! signal stream, which doesn't fit this binary's plain-thread model.
//! `ctrlc` is the standard, minimal choice for a synchronous signal
//! handler registered once at startup; see DESIGN.md for this grounding
//! exception.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Install a handler for SIGINT/SIGTERM that flips the returned flag.
/// Call sites poll it; nothing here blocks or unwinds out of the signal
/// handler itself (spec §5: "a global shutdown sets a flag").
pub fn install() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_for_handler = flag.clone();
    ctrlc::set_handler(move || {
        flag_for_handler.store(true, Ordering::SeqCst);
    })
    .expect("failed to install SIGINT/SIGTERM handler");
    flag
}
