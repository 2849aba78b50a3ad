//! Daemon configuration: TOML file with environment variable overrides
//! (SPEC_FULL §5 ambient addition).

pub mod config;
pub mod schema;

pub use config::{apply_env_overrides, load_config, load_from_file, validate_config};
pub use schema::{ClusterSection, ClustermonConfig, ConfigError, DaemonSection, ExecSection, InterfacesSection, LoggingSection, NotifySection, PeerConfig, TlsSection};
