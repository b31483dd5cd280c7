//! Tarn Core Types
//!
//! This crate provides the foundational types used throughout the tarn engine:
//! - Identity types (NodeId, VarId)
//! - Value hashing (HashType and the `mix` finalizer)
//! - Domains describing the legal value space of every type
//! - Literals used to seed constants and decision variables
//! - Violation constants and the common error type

mod domain;
mod error;
mod hash;
mod id;
mod literal;

pub use domain::*;
pub use error::*;
pub use hash::*;
pub use id::*;
pub use literal::*;

/// Violation reported by a path that is undefined or otherwise unusable.
///
/// Large enough to dominate any distance metric, small enough that summing
/// billions of them still fits in a `u64`.
pub const LARGE_VIOLATION: u64 = 1 << 31;

/// Clamp a distance so it never exceeds [`LARGE_VIOLATION`].
pub fn saturate(violation: u64) -> u64 {
    violation.min(LARGE_VIOLATION)
}

/// Absolute difference of two integers as a saturated violation.
pub fn distance(a: i64, b: i64) -> u64 {
    saturate((a as i128 - b as i128).unsigned_abs().min(u64::MAX as u128) as u64)
}
