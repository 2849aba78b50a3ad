//! Configuration loading and environment overrides (grounded on
//! `knhk-config::config`'s `load_config`/`apply_env_overrides`/
//! `validate_config` trio; loading hierarchy here is the same: env > file
//! > defaults).

use std::path::Path;

use crate::schema::{ClusterSection, ClustermonConfig, ConfigError, PeerConfig};

/// Load from `path` if it exists, falling back to defaults, then apply
/// environment overrides and validate.
pub fn load_config(path: impl AsRef<Path>) -> Result<ClustermonConfig, ConfigError> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        load_from_file(path)?
    } else {
        ClustermonConfig::default()
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<ClustermonConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Apply `CLUSTERMON_*` environment overrides. Unlike the teacher's
/// per-connector dynamic-key scan (`KNHK_CONNECTOR_<NAME>_<SETTING>`),
/// cluster peers have no natural per-instance env var shape here, so only
/// the scalar, instance-wide settings are override points; peers remain
/// file-only.
pub fn apply_env_overrides(config: &mut ClustermonConfig) -> Result<(), ConfigError> {
    use std::env;

    if let Ok(v) = env::var("CLUSTERMON_STATE_DIR") {
        config.daemon.state_dir = v;
    }
    if let Ok(v) = env::var("CLUSTERMON_PID_FILE") {
        config.daemon.pid_file = v;
    }
    if let Ok(v) = env::var("CLUSTERMON_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Ok(v) = env::var("CLUSTERMON_CLUSTER_IDENTITY") {
        config.cluster.identity = v;
    }
    if let Ok(v) = env::var("CLUSTERMON_CLUSTER_BIND_PORT") {
        config.cluster.bind_port = v.parse().map_err(|_| ConfigError::ValidationError(format!("invalid CLUSTERMON_CLUSTER_BIND_PORT: {v}")))?;
    }
    if let Ok(v) = env::var("CLUSTERMON_EXEC_MIN_WORKERS") {
        config.exec.min_workers = v.parse().map_err(|_| ConfigError::ValidationError(format!("invalid CLUSTERMON_EXEC_MIN_WORKERS: {v}")))?;
    }
    if let Ok(v) = env::var("CLUSTERMON_EXEC_MAX_WORKERS") {
        config.exec.max_workers = v.parse().map_err(|_| ConfigError::ValidationError(format!("invalid CLUSTERMON_EXEC_MAX_WORKERS: {v}")))?;
    }
    if let Ok(v) = env::var("CLUSTERMON_INTERFACES_COMMAND_PIPE") {
        config.interfaces.command_pipe_path = v;
    }
    if let Ok(v) = env::var("CLUSTERMON_INTERFACES_IDO_ENABLED") {
        config.interfaces.ido_enabled = v == "1" || v.eq_ignore_ascii_case("true");
    }

    Ok(())
}

pub fn validate_config(config: &ClustermonConfig) -> Result<(), ConfigError> {
    if config.exec.min_workers == 0 {
        return Err(ConfigError::ValidationError("exec.min_workers must be >= 1".to_string()));
    }
    if config.exec.max_workers < config.exec.min_workers {
        return Err(ConfigError::ValidationError("exec.max_workers must be >= exec.min_workers".to_string()));
    }
    validate_cluster(&config.cluster)?;
    Ok(())
}

fn validate_cluster(cluster: &ClusterSection) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for peer in &cluster.peers {
        if peer.name.is_empty() {
            return Err(ConfigError::ValidationError("cluster peer name cannot be empty".to_string()));
        }
        if !seen.insert(peer.name.as_str()) {
            return Err(ConfigError::ValidationError(format!("duplicate cluster peer name: {}", peer.name)));
        }
        if !cluster.identity.is_empty() && peer.name == cluster.identity {
            return Err(ConfigError::ValidationError(format!("peer {} duplicates our own identity", peer.name)));
        }
    }
    Ok(())
}

impl PeerConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        PeerConfig { name: name.into(), host: host.into(), port }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config("/nonexistent/path/clustermon.toml").unwrap();
        assert_eq!(config.cluster.bind_port, 5665);
    }

    #[test]
    fn env_override_wins_over_file_default() {
        std::env::set_var("CLUSTERMON_CLUSTER_BIND_PORT", "7777");
        let config = load_config("/nonexistent/path/clustermon.toml").unwrap();
        assert_eq!(config.cluster.bind_port, 7777);
        std::env::remove_var("CLUSTERMON_CLUSTER_BIND_PORT");
    }

    #[test]
    fn parses_a_well_formed_toml_document() {
        let dir = std::env::temp_dir().join(format!("clustermon-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("clustermon.toml");
        std::fs::write(
            &path,
            r#"
            [cluster]
            identity = "node-a"
            bind_port = 5700

            [[cluster.peers]]
            name = "node-b"
            host = "10.0.0.2"
            port = 5665
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cluster.identity, "node-a");
        assert_eq!(config.cluster.peers.len(), 1);
        assert_eq!(config.cluster.peers[0].name, "node-b");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_max_workers_below_min_workers() {
        let mut config = ClustermonConfig::default();
        config.exec.min_workers = 4;
        config.exec.max_workers = 2;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_peer_names() {
        let mut config = ClustermonConfig::default();
        config.cluster.peers = vec![PeerConfig::new("node-b", "h1", 1), PeerConfig::new("node-b", "h2", 2)];
        assert!(validate_config(&config).is_err());
    }
}
