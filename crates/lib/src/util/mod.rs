//! Shared utilities.
//!
//! Path helpers used by the consolidation and layout code, plus test helpers.

pub mod paths;

#[cfg(test)]
pub mod testutil;
