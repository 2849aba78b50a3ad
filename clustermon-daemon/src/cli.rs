//! Command-line surface (grounded on `knhk-cli`'s use of plain `clap`
//! derive, without its noun-verb macro framework: this binary has one
//! job, not a noun/verb command tree).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "clustermond", about = "clustermon cluster monitoring daemon")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "/etc/clustermon/clustermon.toml")]
    pub config: PathBuf,

    /// Run in the foreground instead of the background (the default: this
    /// build never daemonizes/forks, so this flag only suppresses the log
    /// line that would otherwise note we're staying attached to the tty).
    #[arg(long)]
    pub foreground: bool,

    /// Internal: present only on the replacement process spawned by a
    /// managed restart (spec §5). The child touches this path once its
    /// configuration has loaded successfully so the parent can decide
    /// whether to hand over or keep running.
    #[arg(long, hide = true)]
    pub restart_ready_file: Option<PathBuf>,
}
