//! SSH transport layer.
//!
//! Wraps russh behind a small session API: connect with a bounded
//! timeout, authenticate, exec commands, disconnect.

mod config;
mod ssh;

pub use config::{AuthMethod, SshConfig};
pub use ssh::SshTransport;
