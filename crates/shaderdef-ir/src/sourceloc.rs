//! Source positions attached to statements.
//!
//! The front end decides what a position means; the transpiler only carries
//! it into error messages.

use core::fmt;

/// Opaque source location identifier.
///
/// This is an opaque u32 that front ends use to encode the 1-based line of the
/// statement in the host source. The default value `!0` (all-ones) represents
/// an unknown source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc(u32);

impl SourceLoc {
    /// Create a new source location from raw bits.
    pub fn new(bits: u32) -> Self {
        SourceLoc(bits)
    }

    /// Source location for a host line number.
    pub fn line(line: u32) -> Self {
        SourceLoc(line)
    }

    /// Get the raw bits of this source location.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check if this is the default (unknown) source location.
    pub fn is_default(self) -> bool {
        self.0 == !0
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        SourceLoc(!0)
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "unknown location")
        } else {
            write!(f, "line {}", self.0)
        }
    }
}
