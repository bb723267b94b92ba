//! Audit entry points.
//!
//! Two sequential pool passes make up an audit: a reachability sweep
//! over the whole inventory, then command execution against the devices
//! the sweep marked reachable. Running them as separate passes is what
//! guarantees a device is probed strictly before any session is opened
//! to it. Between the passes sits [`verify_credentials`], which catches
//! a misconfigured username or password on a small sample before the
//! toolkit hammers the whole fleet with doomed logins.

mod aggregate;

pub use aggregate::{BatchSummary, apply_interfaces, apply_reachability};

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::LazyLock;

use log::{error, info};
use regex::Regex;

use crate::config::AuditConfig;
use crate::device::{DeviceId, DeviceRecord};
use crate::error::Result;
use crate::exec::CommandExecutor;
use crate::parse::InterfaceBlockParser;
use crate::pool::{Outcome, ProgressSink, WorkUnit, WorkerPool};
use crate::probe::ReachabilityProbe;

/// Expected response to `show privilege` at the enable level.
static PRIV_LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}").expect("static regex"));

/// Command the credential check runs.
const PRIV_CHECK_COMMAND: &str = "show privilege";

/// Probe unit: one TCP connect-test against one device.
struct ProbeUnit {
    id: DeviceId,
    addr: IpAddr,
}

impl WorkUnit for ProbeUnit {
    fn device(&self) -> DeviceId {
        self.id.clone()
    }
}

/// Exec unit: one command session against one device.
struct ExecUnit {
    record: DeviceRecord,
}

impl WorkUnit for ExecUnit {
    fn device(&self) -> DeviceId {
        self.record.id()
    }
}

fn pool_size(config: &AuditConfig, units: usize) -> usize {
    config.worker_count.min(units).max(1)
}

/// Probe every device and set its reachability flag.
///
/// Results are matched by identity and folded back in inventory order;
/// each unreachable device is logged as a warning, never an error — the
/// batch always continues.
pub async fn check_reachability(
    devices: &mut [DeviceRecord],
    config: &AuditConfig,
    progress: Arc<dyn ProgressSink>,
) -> Result<BatchSummary> {
    info!(
        "Starting SSH reachability check on TCP port {} for {} devices",
        config.ssh_port,
        devices.len()
    );

    let probe = ReachabilityProbe::new(config.ssh_port, config.probe_timeout());
    let mut pool = WorkerPool::with_progress(
        pool_size(config, devices.len()),
        progress,
        move |unit: ProbeUnit| async move {
            if probe.probe(unit.addr).await {
                Outcome::Success(())
            } else {
                Outcome::Unreachable
            }
        },
    );

    pool.submit_all(devices.iter().map(|d| ProbeUnit {
        id: d.id(),
        addr: d.addr,
    }));

    let results = pool.run_to_completion().await?;
    let summary = apply_reachability(devices, results);
    info!("Reachability check completed: {}", summary);
    Ok(summary)
}

/// Run `command` against every reachable device and merge the parsed
/// interface blocks onto the records.
///
/// `parser` decides which blocks are kept; failures of any kind are
/// recorded per device and counted in the returned summary.
pub async fn collect_interfaces<F>(
    devices: &mut [DeviceRecord],
    command: &str,
    parser: &InterfaceBlockParser<F>,
    config: &AuditConfig,
    progress: Arc<dyn ProgressSink>,
) -> Result<BatchSummary>
where
    F: Fn(&str) -> bool,
{
    let reachable: Vec<ExecUnit> = devices
        .iter()
        .filter(|d| d.is_reachable())
        .map(|d| ExecUnit { record: d.clone() })
        .collect();

    info!(
        "Executing '{}' on {} reachable devices",
        command,
        reachable.len()
    );

    let executor = Arc::new(CommandExecutor::new(command, config));
    let mut pool = WorkerPool::with_progress(
        pool_size(config, reachable.len()),
        progress,
        move |unit: ExecUnit| {
            let executor = executor.clone();
            async move { executor.run(&unit.record).await }
        },
    );

    pool.submit_all(reachable);

    let results = pool.run_to_completion().await?;
    let summary = apply_interfaces(devices, results, parser);
    info!("Command pass completed: {}", summary);
    Ok(summary)
}

/// Verdict of the batch-level credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// The sampled devices accepted the credentials at privilege 15.
    Valid,
    /// At least one sampled device rejected the credentials or answered
    /// below privilege 15; treat the whole run as misconfigured.
    Misconfigured {
        /// Devices in the sample that failed.
        failed: usize,
        /// Sample size actually tested.
        sampled: usize,
    },
}

/// Check the configured credentials against a small sample of reachable
/// devices before the full command pass.
///
/// A failure here is a batch-level escalation, distinct from per-device
/// failure handling: the operator should fix the configuration and call
/// this again from an explicit, bounded retry loop. The toolkit itself
/// never retries.
pub async fn verify_credentials(
    devices: &[DeviceRecord],
    config: &AuditConfig,
) -> Result<CredentialCheck> {
    let sample: Vec<ExecUnit> = devices
        .iter()
        .filter(|d| d.is_reachable())
        .take(config.credential_sample.max(1))
        .map(|d| ExecUnit { record: d.clone() })
        .collect();

    if sample.is_empty() {
        info!("No reachable devices to sample for the credential check");
        return Ok(CredentialCheck::Valid);
    }

    let sampled = sample.len();
    let executor = Arc::new(CommandExecutor::new(PRIV_CHECK_COMMAND, config));
    let mut pool = WorkerPool::new(sampled, move |unit: ExecUnit| {
        let executor = executor.clone();
        async move { executor.run(&unit.record).await }
    });
    pool.submit_all(sample);

    let mut failed = 0;
    for result in pool.run_to_completion().await? {
        let outcome = normalize_privilege_outcome(result.outcome);
        if !has_enable_privilege(&outcome) {
            failed += 1;
            error!(
                "Credential check failed for {} ({})",
                result.device, outcome
            );
        }
    }

    if failed > 0 {
        error!(
            "Authentication failed for {}/{} sampled devices. Check that user '{}' exists, \
             has privilege 15 and the password is correct, then rerun the check.",
            failed, sampled, config.username
        );
        Ok(CredentialCheck::Misconfigured { failed, sampled })
    } else {
        info!("Credential check passed on {} devices", sampled);
        Ok(CredentialCheck::Valid)
    }
}

/// An authenticated session that returned no text is a distinct failure
/// kind: the login worked but the command produced nothing usable.
fn normalize_privilege_outcome(outcome: Outcome<String>) -> Outcome<String> {
    match outcome {
        Outcome::Success(text) if text.trim().is_empty() => Outcome::NoOutput,
        other => other,
    }
}

/// `show privilege` answers `Current privilege level is 15` for an
/// enable-level login; anything else fails the check.
fn has_enable_privilege(outcome: &Outcome<String>) -> bool {
    match outcome {
        Outcome::Success(text) => PRIV_LEVEL_RE
            .find(text)
            .is_some_and(|m| m.as_str() == "15"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{OsFamily, Reachability};
    use crate::pool::NoopProgress;
    use tokio::net::TcpListener;

    fn device(addr: &str) -> DeviceRecord {
        DeviceRecord::new(None, addr.parse().unwrap(), OsFamily::CiscoXe, 2)
    }

    #[tokio::test]
    async fn test_check_reachability_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = AuditConfig::new("auditor", "secret")
            .with_port(port)
            .with_probe_timeout(2);

        // 127.0.0.1 has a listener, 127.0.0.2 refuses.
        let mut devices = vec![device("127.0.0.1"), device("127.0.0.2")];
        let summary = check_reachability(&mut devices, &config, Arc::new(NoopProgress))
            .await
            .unwrap();

        assert_eq!(devices[0].reachability, Reachability::Reachable);
        assert_eq!(devices[1].reachability, Reachability::Unreachable);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.unreachable, 1);
    }

    #[tokio::test]
    async fn test_verify_credentials_with_no_reachable_devices() {
        let config = AuditConfig::new("auditor", "secret");
        let devices = vec![device("127.0.0.1")];
        // Nothing is reachable, so there is nothing to sample.
        let check = verify_credentials(&devices, &config).await.unwrap();
        assert_eq!(check, CredentialCheck::Valid);
    }

    #[test]
    fn test_privilege_classification() {
        let ok = Outcome::Success("Current privilege level is 15".to_string());
        assert!(has_enable_privilege(&ok));

        let low = Outcome::Success("Current privilege level is 1".to_string());
        assert!(!has_enable_privilege(&low));

        assert!(!has_enable_privilege(&Outcome::<String>::AuthFailed));
        assert!(!has_enable_privilege(&Outcome::<String>::NoOutput));
    }

    #[test]
    fn test_empty_output_normalizes_to_no_output() {
        let normalized = normalize_privilege_outcome(Outcome::Success("  \n".to_string()));
        assert_eq!(normalized, Outcome::NoOutput);

        let kept = normalize_privilege_outcome(Outcome::Success("level 15".to_string()));
        assert!(kept.is_success());
    }

    #[test]
    fn test_pool_size_bounds() {
        let config = AuditConfig::new("auditor", "secret").with_worker_count(12);
        assert_eq!(pool_size(&config, 4), 4);
        assert_eq!(pool_size(&config, 40), 12);
        assert_eq!(pool_size(&config, 0), 1);
    }
}
