//! Folding worker results back onto device records.
//!
//! Aggregation is the only place device records mutate, and it runs
//! single-threaded after every worker has joined, so records need no
//! locking. Results are matched by device identity, never by position —
//! the pool guarantees nothing about ordering.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use log::warn;
use serde::Serialize;

use crate::device::{DeviceRecord, Reachability};
use crate::parse::InterfaceBlockParser;
use crate::pool::{Outcome, WorkResult};

/// Per-batch outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub successes: usize,
    pub unreachable: usize,
    pub auth_failed: usize,
    pub timeouts: usize,
    pub protocol_errors: usize,
    pub no_output: usize,
    pub parse_errors: usize,
}

impl BatchSummary {
    fn tally<T>(&mut self, outcome: &Outcome<T>) {
        match outcome {
            Outcome::Success(_) => self.successes += 1,
            Outcome::Unreachable => self.unreachable += 1,
            Outcome::AuthFailed => self.auth_failed += 1,
            Outcome::Timeout => self.timeouts += 1,
            Outcome::ProtocolError(_) => self.protocol_errors += 1,
            Outcome::NoOutput => self.no_output += 1,
        }
    }

    /// Devices that produced anything other than a success.
    pub fn failures(&self) -> usize {
        self.unreachable
            + self.auth_failed
            + self.timeouts
            + self.protocol_errors
            + self.no_output
            + self.parse_errors
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ok, {} unreachable, {} auth failed, {} timed out, {} protocol errors, {} empty, {} parse errors",
            self.successes,
            self.unreachable,
            self.auth_failed,
            self.timeouts,
            self.protocol_errors,
            self.no_output,
            self.parse_errors,
        )
    }
}

/// Index results by address, last write wins.
///
/// Duplicate addresses in one batch are a caller error; which result
/// survives is nondeterministic and we only promise last-write-wins over
/// the arrival order. Each collision is logged.
fn index_by_addr<T>(results: Vec<WorkResult<T>>) -> HashMap<IpAddr, Outcome<T>> {
    let mut by_addr = HashMap::with_capacity(results.len());
    for result in results {
        if by_addr.insert(result.device.addr, result.outcome).is_some() {
            warn!(
                "Duplicate address {} in batch, keeping the later result",
                result.device.addr
            );
        }
    }
    by_addr
}

/// Fold reachability probe results onto the records, preserving input
/// order. Every record ends up `Reachable` or `Unreachable`; a missing
/// result counts as unreachable.
pub fn apply_reachability(
    records: &mut [DeviceRecord],
    results: Vec<WorkResult<()>>,
) -> BatchSummary {
    let by_addr = index_by_addr(results);
    let mut summary = BatchSummary::default();

    for record in records.iter_mut() {
        match by_addr.get(&record.addr) {
            Some(outcome @ Outcome::Success(())) => {
                record.reachability = Reachability::Reachable;
                summary.tally(outcome);
            }
            Some(outcome) => {
                record.reachability = Reachability::Unreachable;
                summary.tally(outcome);
                warn!("{} is not reachable ({})", record.id(), outcome);
            }
            None => {
                record.reachability = Reachability::Unreachable;
                summary.unreachable += 1;
                warn!("{} produced no probe result", record.id());
            }
        }
    }

    summary
}

/// Fold command execution results onto the reachable records, parsing
/// each captured output into interface blocks. Unreachable records are
/// left untouched.
pub fn apply_interfaces<F>(
    records: &mut [DeviceRecord],
    results: Vec<WorkResult<String>>,
    parser: &InterfaceBlockParser<F>,
) -> BatchSummary
where
    F: Fn(&str) -> bool,
{
    let by_addr = index_by_addr(results);
    let mut summary = BatchSummary::default();

    for record in records.iter_mut().filter(|r| r.is_reachable()) {
        match by_addr.get(&record.addr) {
            Some(Outcome::Success(raw)) => match parser.parse(raw) {
                Ok(map) => {
                    record.interfaces = Some(map);
                    summary.successes += 1;
                }
                Err(e) => {
                    summary.parse_errors += 1;
                    record.error_note = Some(e.to_string());
                    warn!("{}: {}", record.id(), e);
                }
            },
            Some(outcome) => {
                summary.tally(outcome);
                record.error_note = Some(outcome.to_string());
                warn!("{}: command failed ({})", record.id(), outcome);
            }
            None => {
                summary.protocol_errors += 1;
                record.error_note = Some("no result produced".to_string());
                warn!("{} produced no command result", record.id());
            }
        }
    }

    summary
}
