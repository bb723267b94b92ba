//! Audit run configuration.
//!
//! All operation parameters travel in one read-only [`AuditConfig`] value
//! that callers pass by reference into the probe, executor and pool
//! constructors. There is deliberately no ambient/global configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

fn default_ssh_port() -> u16 {
    22
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_command_timeout() -> u64 {
    30
}

fn default_worker_count() -> usize {
    12
}

fn default_credential_sample() -> usize {
    3
}

/// Global parameters for one audit run.
///
/// Deserializable so an outer layer can load it from YAML/JSON; the core
/// never reads configuration files itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// TCP port probed and used for SSH sessions (default: 22).
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Per-probe TCP connect timeout in seconds (default: 2).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Per-command session timeout in seconds (default: 30).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Fixed worker pool size (default: 12).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// How many reachable devices the credential check samples (default: 3).
    #[serde(default = "default_credential_sample")]
    pub credential_sample: usize,

    /// SSH username.
    pub username: String,

    /// SSH password. Wrapped so it never appears in debug output.
    pub password: SecretString,

    /// Optional private key path; takes precedence over the password
    /// when set.
    #[serde(default)]
    pub private_key: Option<PathBuf>,
}

impl AuditConfig {
    /// Create a configuration with default timeouts and pool size.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssh_port: default_ssh_port(),
            probe_timeout_secs: default_probe_timeout(),
            command_timeout_secs: default_command_timeout(),
            worker_count: default_worker_count(),
            credential_sample: default_credential_sample(),
            username: username.into(),
            password: SecretString::from(password.into()),
            private_key: None,
        }
    }

    /// Set the SSH/probe port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    /// Set the probe timeout in seconds.
    pub fn with_probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    /// Set the command timeout in seconds.
    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    /// Set the worker pool size. Clamped to at least one worker.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Command timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::new("auditor", "secret");
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.worker_count, 12);
        assert_eq!(config.credential_sample, 3);
    }

    #[test]
    fn test_worker_count_clamped() {
        let config = AuditConfig::new("auditor", "secret").with_worker_count(0);
        assert_eq!(config.worker_count, 1);
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = AuditConfig::new("auditor", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AuditConfig = serde_json::from_str(
            r#"{"username": "auditor", "password": "secret", "worker_count": 4}"#,
        )
        .unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.ssh_port, 22);
        assert!(config.private_key.is_none());
    }
}
