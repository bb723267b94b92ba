//! SSH connection configuration.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::AuditConfig;
use crate::device::DeviceRecord;

/// SSH connection configuration for one device session.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target management address.
    pub addr: IpAddr,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,
}

impl SshConfig {
    /// Build the per-device session configuration from the audit run
    /// parameters and one device record.
    pub fn for_device(device: &DeviceRecord, config: &AuditConfig) -> Self {
        let auth = match &config.private_key {
            Some(path) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: None,
            },
            None => AuthMethod::Password(config.password.clone()),
        };

        Self {
            addr: device.addr,
            port: config.ssh_port,
            username: config.username.clone(),
            auth,
            timeout: config.command_timeout(),
        }
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}
