//! # switch-audit
//!
//! Async bulk SSH audit toolkit for Cisco network devices.
//!
//! switch-audit takes a validated device inventory, fans out bounded TCP
//! reachability probes and SSH command executions across a fixed-size
//! worker pool, and folds the per-device results back onto the inventory
//! without data races. Interface configuration is extracted from
//! `show derived-config` output with a delimiter-based scan.
//!
//! ## Design
//!
//! - A generic [`pool::WorkerPool`] executes both probe and command
//!   passes; termination is driven by closing the input channel, so
//!   there is no polling loop to race against.
//! - Every per-device failure is a typed [`pool::Outcome`] variant and
//!   never aborts the batch.
//! - Device records mutate only in the single-threaded aggregation step
//!   after all workers have joined.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use switch_audit::{
//!     AuditConfig, DeviceRecord, InterfaceBlockParser, OsFamily,
//!     audit, pool::LogProgress,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switch_audit::Error> {
//!     let config = AuditConfig::new("auditor", "secret");
//!     let mut devices = vec![DeviceRecord::new(
//!         Some("sw-access-01".to_string()),
//!         "192.168.1.10".parse().unwrap(),
//!         OsFamily::CiscoXe,
//!         2,
//!     )];
//!
//!     let progress = Arc::new(LogProgress::new(10));
//!     audit::check_reachability(&mut devices, &config, progress.clone()).await?;
//!
//!     let parser = InterfaceBlockParser::new();
//!     audit::collect_interfaces(
//!         &mut devices,
//!         "show derived-config | begin interface",
//!         &parser,
//!         &config,
//!         progress,
//!     )
//!     .await?;
//!
//!     for device in &devices {
//!         if let Some(map) = &device.interfaces {
//!             println!("{}: {} interfaces", device.id(), map.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod device;
pub mod error;
pub mod exec;
pub mod parse;
pub mod platform;
pub mod pool;
pub mod probe;
pub mod transport;

// Re-export main types for convenience
pub use audit::{BatchSummary, CredentialCheck};
pub use config::AuditConfig;
pub use device::{DeviceId, DeviceRecord, OsFamily, Reachability};
pub use error::Error;
pub use exec::CommandExecutor;
pub use parse::{InterfaceBlockParser, InterfaceMap};
pub use pool::{Outcome, ProgressSink, WorkResult, WorkUnit, WorkerPool};
pub use probe::ReachabilityProbe;
pub use transport::{AuthMethod, SshConfig};
