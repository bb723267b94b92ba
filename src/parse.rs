//! Interface block extraction from `show derived-config` output.
//!
//! Cisco derived config delimits each interface section with an
//! `interface ...` header line and a bare `!` terminator:
//!
//! ```text
//! interface GigabitEthernet1/0/1
//!  description uplink
//!  switchport mode access
//! !
//! ```
//!
//! The scan is a two-state machine: outside a block until a header line,
//! inside until the terminator. Blocks never nest.

use indexmap::IndexMap;

use crate::error::ParseError;

/// Map from full interface header line to its trimmed configuration
/// lines, in the order blocks appear in the output.
pub type InterfaceMap = IndexMap<String, Vec<String>>;

enum ScanState {
    Outside,
    Inside { header: String, lines: Vec<String> },
}

/// Delimiter-based scanner producing an [`InterfaceMap`].
///
/// Which blocks are kept is the caller's decision via a predicate on the
/// header line — e.g. dropping `interface Vlan...` entries — because the
/// filtering intent differs per audit, not per parser.
pub struct InterfaceBlockParser<F = fn(&str) -> bool>
where
    F: Fn(&str) -> bool,
{
    keep: F,
}

impl InterfaceBlockParser {
    /// Parser that keeps every block.
    pub fn new() -> Self {
        Self { keep: |_| true }
    }
}

impl Default for InterfaceBlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> InterfaceBlockParser<F>
where
    F: Fn(&str) -> bool,
{
    /// Parser that keeps only blocks whose header line satisfies `keep`.
    pub fn with_filter(keep: F) -> Self {
        Self { keep }
    }

    /// Scan raw command output into an interface map.
    ///
    /// A block opened by an `interface` header and not closed by a bare
    /// `!` before end of input fails the whole parse; a truncated block
    /// is never returned silently. A second header while a block is
    /// still open is treated the same way, since blocks never nest in
    /// well-formed output.
    pub fn parse(&self, raw: &str) -> Result<InterfaceMap, ParseError> {
        let mut blocks = InterfaceMap::new();
        let mut state = ScanState::Outside;

        for raw_line in raw.lines() {
            let line = raw_line.trim_end_matches('\r');

            state = match state {
                ScanState::Outside => {
                    if is_interface_header(line) {
                        ScanState::Inside {
                            header: line.to_string(),
                            lines: Vec::new(),
                        }
                    } else {
                        ScanState::Outside
                    }
                }
                ScanState::Inside { header, mut lines } => {
                    if line.trim() == "!" {
                        if (self.keep)(&header) {
                            blocks.insert(header, lines);
                        }
                        ScanState::Outside
                    } else if is_interface_header(line) {
                        return Err(ParseError::UnterminatedBlock { interface: header });
                    } else {
                        lines.push(line.trim().to_string());
                        ScanState::Inside { header, lines }
                    }
                }
            };
        }

        if let ScanState::Inside { header, .. } = state {
            return Err(ParseError::UnterminatedBlock { interface: header });
        }

        Ok(blocks)
    }
}

/// Matches `^interface\b` without pulling a regex into the hot path.
fn is_interface_header(line: &str) -> bool {
    match line.strip_prefix("interface") {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}
