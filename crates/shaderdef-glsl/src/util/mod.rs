//! Shared utilities for lowering.

mod const_eval;

pub use const_eval::*;
