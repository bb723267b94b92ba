//! Remote command execution against one device.

use log::debug;

use crate::config::AuditConfig;
use crate::device::DeviceRecord;
use crate::error::{Error, Result, TransportError};
use crate::platform::Dialect;
use crate::pool::Outcome;
use crate::transport::{SshConfig, SshTransport};

/// Runs one show command over one authenticated SSH session.
///
/// The executor opens exactly one session per call and always releases
/// it, error path included. Failures map onto the outcome taxonomy:
/// refused credentials become [`Outcome::AuthFailed`], an exceeded
/// deadline becomes [`Outcome::Timeout`], everything else at the
/// transport level becomes [`Outcome::ProtocolError`]. A session that
/// authenticates but returns no text is `Success("")` — silence is not
/// an authentication failure.
pub struct CommandExecutor {
    command: String,
    config: AuditConfig,
}

impl CommandExecutor {
    /// Create an executor for one command under the given run
    /// parameters.
    pub fn new(command: impl Into<String>, config: &AuditConfig) -> Self {
        Self {
            command: command.into(),
            config: config.clone(),
        }
    }

    /// The command this executor runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Execute the command against one device.
    pub async fn run(&self, device: &DeviceRecord) -> Outcome<String> {
        let ssh = SshConfig::for_device(device, &self.config);
        let dialect = device.os.dialect();

        match self.session(ssh, dialect).await {
            Ok(raw) => {
                debug!("Captured {} bytes from {}", raw.len(), device.id());
                Outcome::Success(raw)
            }
            Err(Error::Transport(TransportError::AuthenticationFailed { .. })) => {
                Outcome::AuthFailed
            }
            Err(Error::Transport(TransportError::Timeout(_))) => Outcome::Timeout,
            Err(e) => Outcome::ProtocolError(e.to_string()),
        }
    }

    /// One full session: connect, prepare, exec, disconnect.
    async fn session(&self, ssh: SshConfig, dialect: &Dialect) -> Result<String> {
        let deadline = self.config.command_timeout();
        let transport = SshTransport::connect(ssh).await?;

        let output = match transport.prepare(dialect, deadline).await {
            Ok(()) => transport.exec(dialect, &self.command, deadline).await,
            Err(e) => Err(e),
        };

        // Best-effort disconnect; the session tears down on drop anyway
        // and the command outcome must not be masked by a close failure.
        if let Err(e) = transport.close().await {
            debug!("Disconnect failed: {}", e);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::OsFamily;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn device(addr: &str) -> DeviceRecord {
        DeviceRecord::new(None, addr.parse().unwrap(), OsFamily::CiscoXe, 2)
    }

    #[tokio::test]
    async fn test_closed_port_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = AuditConfig::new("auditor", "secret")
            .with_port(port)
            .with_command_timeout(2);
        let executor = CommandExecutor::new("show derived-config", &config);

        match executor.run(&device("127.0.0.1")).await {
            Outcome::ProtocolError(_) | Outcome::Timeout => {}
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_ssh_listener_is_bounded() {
        // A listener that accepts but never speaks SSH must fail within
        // the configured deadline, not hang.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        let config = AuditConfig::new("auditor", "secret")
            .with_port(port)
            .with_command_timeout(1);
        let executor = CommandExecutor::new("show privilege", &config);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            executor.run(&device("127.0.0.1")),
        )
        .await
        .expect("executor must respect its deadline");
        assert!(!outcome.is_success());
    }
}
