//! Configuration schema (grounded on `knhk-config::schema`'s pattern of
//! one struct per section, each field carrying its own `#[serde(default
//! = "...")]` so a partial TOML document still parses).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClustermonConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub exec: ExecSection,
    #[serde(default)]
    pub notify: NotifySection,
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub interfaces: InterfacesSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl Default for ClustermonConfig {
    fn default() -> Self {
        ClustermonConfig {
            daemon: DaemonSection::default(),
            exec: ExecSection::default(),
            notify: NotifySection::default(),
            cluster: ClusterSection::default(),
            interfaces: InterfacesSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    #[serde(default = "default_pid_file")]
    pub pid_file: String,
}

fn default_state_dir() -> String {
    "/var/lib/clustermon".to_string()
}
fn default_pid_file() -> String {
    "/run/clustermon.pid".to_string()
}

impl Default for DaemonSection {
    fn default() -> Self {
        DaemonSection { state_dir: default_state_dir(), pid_file: default_pid_file() }
    }
}

/// Check-execution worker pool sizing (spec §5: "check-execution I/O
/// threads (≥2)... resize under load... bounded by a configured maximum").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSection {
    #[serde(default = "default_min_workers")]
    pub min_workers: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: f64,
}

fn default_min_workers() -> usize {
    2
}
fn default_max_workers() -> usize {
    16
}
fn default_check_timeout_secs() -> f64 {
    60.0
}

impl Default for ExecSection {
    fn default() -> Self {
        ExecSection {
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            check_timeout_secs: default_check_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySection {
    #[serde(default = "default_notify_workers")]
    pub workers: usize,
}

fn default_notify_workers() -> usize {
    4
}

impl Default for NotifySection {
    fn default() -> Self {
        NotifySection { workers: default_notify_workers() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSection {
    #[serde(default)]
    pub cert_file: String,
    #[serde(default)]
    pub key_file: String,
    #[serde(default)]
    pub ca_file: String,
}

impl Default for TlsSection {
    fn default() -> Self {
        TlsSection { cert_file: String::new(), key_file: String::new(), ca_file: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSection {
    /// Defaults to the empty string; the daemon should treat this as "no
    /// identity configured" and refuse to start cluster networking rather
    /// than silently picking one (spec §4.6: identity == TLS cert CN).
    #[serde(default)]
    pub identity: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default)]
    pub tls: TlsSection,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

fn default_bind_port() -> u16 {
    5665
}

impl Default for ClusterSection {
    fn default() -> Self {
        ClusterSection {
            identity: String::new(),
            bind_port: default_bind_port(),
            tls: TlsSection::default(),
            peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacesSection {
    #[serde(default = "default_command_pipe")]
    pub command_pipe_path: String,
    #[serde(default = "default_status_path")]
    pub status_file_path: String,
    #[serde(default)]
    pub ido_enabled: bool,
}

fn default_command_pipe() -> String {
    "/var/run/clustermon/command.pipe".to_string()
}
fn default_status_path() -> String {
    "/var/cache/clustermon/status.dat".to_string()
}

impl Default for InterfacesSection {
    fn default() -> Self {
        InterfacesSection {
            command_pipe_path: default_command_pipe(),
            status_file_path: default_status_path(),
            ido_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection { level: default_log_level() }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),
    #[error("failed to parse configuration: {0}")]
    ParseError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("I/O error: {0}")]
    IoError(String),
}
