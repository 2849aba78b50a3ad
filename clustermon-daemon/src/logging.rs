//! Tracing initialisation (grounded on the plain `tracing_subscriber`
//! fmt+EnvFilter pattern the workspace uses elsewhere; the teacher's own
//! `knhk-cli::tracing` additionally wires an OpenTelemetry layer behind
//! an `otel` feature, but that crate isn't part of this workspace's
//! dependency stack, so this stays at the fmt+EnvFilter layer it shares
//! with every other build of tracing-subscriber in the pack).

use tracing_subscriber::EnvFilter;

/// `level` comes from `LoggingSection::level` (e.g. "info", "debug"); an
/// explicit `RUST_LOG` environment variable always takes precedence.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
