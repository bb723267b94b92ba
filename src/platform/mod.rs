//! Session dialects for the supported device families.
//!
//! The OS-family tag from the inventory selects a [`Dialect`] that is
//! handed straight to the transport layer; the audit core itself never
//! branches on it.

mod cisco;

pub use cisco::{cisco_ios, cisco_xe};

use crate::device::OsFamily;

/// Vendor-specific session parameters for one device family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Dialect name, matching the inventory OS tag.
    pub name: &'static str,

    /// Whether the exec channel needs a PTY. Legacy IOS images reject
    /// plain exec requests without one.
    pub needs_pty: bool,

    /// Commands run after authentication, before the audited command.
    pub setup_commands: &'static [&'static str],
}

impl OsFamily {
    /// The session dialect for this family.
    pub fn dialect(&self) -> &'static Dialect {
        match self {
            OsFamily::CiscoIos => cisco_ios(),
            OsFamily::CiscoXe => cisco_xe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_selection() {
        assert_eq!(OsFamily::CiscoIos.dialect().name, "cisco_ios");
        assert_eq!(OsFamily::CiscoXe.dialect().name, "cisco_xe");
    }
}
