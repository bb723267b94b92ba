//! Cisco dialect definitions.
//!
//! Both families disable terminal paging so long `show` output arrives in
//! one piece instead of behind `--More--` prompts.

use super::Dialect;

static CISCO_IOS: Dialect = Dialect {
    name: "cisco_ios",
    needs_pty: true,
    setup_commands: &["terminal length 0", "terminal width 511"],
};

static CISCO_XE: Dialect = Dialect {
    name: "cisco_xe",
    needs_pty: false,
    setup_commands: &["terminal length 0", "terminal width 511"],
};

/// Legacy Cisco IOS dialect.
pub fn cisco_ios() -> &'static Dialect {
    &CISCO_IOS
}

/// Modern IOS-XE dialect.
pub fn cisco_xe() -> &'static Dialect {
    &CISCO_XE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_disabled_on_both_families() {
        for dialect in [cisco_ios(), cisco_xe()] {
            assert!(dialect.setup_commands.contains(&"terminal length 0"));
        }
    }

    #[test]
    fn test_legacy_ios_needs_pty() {
        assert!(cisco_ios().needs_pty);
        assert!(!cisco_xe().needs_pty);
    }
}
