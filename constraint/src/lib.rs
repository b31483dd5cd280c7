//! Tarn Violation Attribution
//!
//! This crate records how much each decision variable contributes to the
//! current violation of a model:
//! - `ViolationContainer`: a tree mirroring the variable container
//!   hierarchy, mapping variable id to accumulated violation
//! - `ViolationContext`: what a parent expression passes down while
//!   explaining its violation
//! - Violation-weighted random variable selection for the search layer

mod context;
mod select;
mod violation;

pub use context::*;
pub use violation::*;
