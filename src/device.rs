//! Device inventory records.
//!
//! A [`DeviceRecord`] is created once per validated inventory row and is
//! the unit everything else keys on. Identity fields never change after
//! creation; only the reachability flag and the result payload mutate, and
//! only inside the single-threaded aggregation step — workers never touch
//! a record directly.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::InterfaceMap;

/// Operating system family of a managed device.
///
/// Selects the remote session dialect; the two observed Cisco CLI
/// families use the inventory tags `cisco_ios` and `cisco_xe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    /// Legacy Cisco IOS CLI.
    CiscoIos,
    /// Modern IOS-XE CLI.
    CiscoXe,
}

impl OsFamily {
    /// The inventory tag for this family.
    pub fn tag(&self) -> &'static str {
        match self {
            OsFamily::CiscoIos => "cisco_ios",
            OsFamily::CiscoXe => "cisco_xe",
        }
    }
}

impl FromStr for OsFamily {
    type Err = UnknownOsFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cisco_ios" => Ok(OsFamily::CiscoIos),
            "cisco_xe" => Ok(OsFamily::CiscoXe),
            other => Err(UnknownOsFamily(other.to_string())),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error for an OS tag the toolkit does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown OS family tag '{0}'")]
pub struct UnknownOsFamily(pub String);

/// Reachability state of a device, tri-state so "not probed yet" is
/// distinguishable from "probed and unreachable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// Not probed yet.
    #[default]
    Unknown,
    /// TCP probe failed within the timeout.
    Unreachable,
    /// TCP probe established a connection.
    Reachable,
}

/// Identity key used to match worker results back to records.
///
/// Addresses are unique within one batch; duplicates in the inventory are
/// a caller error and aggregation applies last-write-wins (see
/// [`crate::audit`] docs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId {
    /// Hostname from the inventory, if one was given.
    pub hostname: Option<String>,

    /// Management address.
    pub addr: IpAddr,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hostname {
            Some(name) => write!(f, "{} @ {}", name, self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// One target device plus its accumulated audit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Hostname from the inventory, if one was given.
    pub hostname: Option<String>,

    /// Management address.
    pub addr: IpAddr,

    /// Operating system family tag.
    pub os: OsFamily,

    /// Source line number in the inventory, for diagnostics.
    pub line_number: usize,

    /// Reachability state, set by the reachability aggregation pass.
    pub reachability: Reachability,

    /// Parsed interface configuration, set by the command aggregation pass.
    pub interfaces: Option<InterfaceMap>,

    /// Human-readable note for the failure recorded against this device.
    pub error_note: Option<String>,
}

impl DeviceRecord {
    /// Create a record from one validated inventory entry.
    pub fn new(
        hostname: Option<String>,
        addr: IpAddr,
        os: OsFamily,
        line_number: usize,
    ) -> Self {
        Self {
            hostname,
            addr,
            os,
            line_number,
            reachability: Reachability::Unknown,
            interfaces: None,
            error_note: None,
        }
    }

    /// The identity key for this record.
    pub fn id(&self) -> DeviceId {
        DeviceId {
            hostname: self.hostname.clone(),
            addr: self.addr,
        }
    }

    /// Whether the reachability pass marked this device reachable.
    pub fn is_reachable(&self) -> bool {
        self.reachability == Reachability::Reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DeviceRecord {
        DeviceRecord::new(
            Some("sw-access-01".to_string()),
            "10.0.0.1".parse().unwrap(),
            OsFamily::CiscoXe,
            2,
        )
    }

    #[test]
    fn test_os_family_from_tag() {
        assert_eq!("cisco_ios".parse::<OsFamily>().unwrap(), OsFamily::CiscoIos);
        assert_eq!("cisco_xe".parse::<OsFamily>().unwrap(), OsFamily::CiscoXe);
        assert!("junos".parse::<OsFamily>().is_err());
    }

    #[test]
    fn test_new_record_is_unprobed() {
        let rec = record();
        assert_eq!(rec.reachability, Reachability::Unknown);
        assert!(!rec.is_reachable());
        assert!(rec.interfaces.is_none());
    }

    #[test]
    fn test_device_id_display() {
        let rec = record();
        assert_eq!(rec.id().to_string(), "sw-access-01 @ 10.0.0.1");

        let anon = DeviceRecord::new(None, "10.0.0.2".parse().unwrap(), OsFamily::CiscoIos, 3);
        assert_eq!(anon.id().to_string(), "10.0.0.2");
    }

    #[test]
    fn test_record_serde_round_trip() {
        let rec = record();
        let json = serde_json::to_string(&rec).unwrap();
        let back: DeviceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.addr, rec.addr);
        assert_eq!(back.os, OsFamily::CiscoXe);
        assert_eq!(back.reachability, Reachability::Unknown);
    }
}
