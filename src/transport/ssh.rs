//! SSH transport implementation using russh.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use russh::client::{self, Handle};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::ChannelMsg;
use secrecy::ExposeSecret;
use tokio::time::{Instant, timeout, timeout_at};

use super::config::{AuthMethod, SshConfig};
use crate::error::{Result, TransportError};
use crate::platform::Dialect;

/// SSH transport wrapping a russh client session.
///
/// Host keys are accepted without verification: audit runs target large
/// fleets of lab and campus devices where no curated known_hosts exists.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let target = SocketAddr::new(config.addr, config.port);

        // Connect to the server
        let mut session = timeout(
            config.timeout,
            client::connect(ssh_config, target, SshHandler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(TransportError::Ssh)?;

        // Authenticate
        Self::authenticate(&mut session, &config).await?;

        debug!("Session established to {}", target);
        Ok(Self { session, config })
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Execute one command on a fresh exec channel and capture its output.
    ///
    /// The whole operation shares one deadline: channel setup, the exec
    /// request and draining the output all count against `deadline`.
    pub async fn exec(
        &self,
        dialect: &Dialect,
        command: &str,
        deadline: Duration,
    ) -> Result<String> {
        let until = Instant::now() + deadline;

        let channel = timeout_at(until, self.session.channel_open_session())
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
            .map_err(TransportError::Ssh)?;

        // Legacy images reject exec requests without a PTY.
        if dialect.needs_pty {
            timeout_at(until, channel.request_pty(false, "vt100", 511, 24, 0, 0, &[]))
                .await
                .map_err(|_| TransportError::Timeout(deadline))?
                .map_err(TransportError::Ssh)?;
        }

        timeout_at(until, channel.exec(true, command))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
            .map_err(TransportError::Ssh)?;

        // Drain data until the server closes the channel.
        let mut channel = channel;
        let mut output: Vec<u8> = Vec::new();
        loop {
            let msg = timeout_at(until, channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(deadline))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => output.extend_from_slice(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => output.extend_from_slice(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                Some(_) => continue,
            }
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Run the dialect's setup commands (paging off), ignoring their
    /// output. Failures here are real session failures and propagate.
    pub async fn prepare(&self, dialect: &Dialect, deadline: Duration) -> Result<()> {
        for cmd in dialect.setup_commands {
            self.exec(dialect, cmd, deadline).await?;
        }
        Ok(())
    }

    /// The address this transport is connected to.
    pub fn peer(&self) -> SocketAddr {
        SocketAddr::new(self.config.addr, self.config.port)
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh. Accepts any host key, see
/// [`SshTransport`] docs.
struct SshHandler;

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}
