//! Tarn Expression Graph
//!
//! This crate holds the incremental evaluation engine:
//! - Node arena with generation-checked ids
//! - Views: cached scalar and container state with maintained hashes
//! - Trigger protocol: scoped listeners, lazy sweeping, delayed work
//! - Operator library, recomputed from deltas where the operator allows it
//! - Quantifiers that unroll and roll body copies as their container changes
//! - Defined-variable forwarding, optimisation passes and sanity checks
//!
//! A graph is built once, evaluated once, then switched into triggering mode.
//! From then on only value leaves are mutated, and every cached view is kept
//! consistent by propagating events upwards.

mod builder;
mod config;
mod copy;
mod defined;
mod eval;
mod event;
mod expr;
mod graph;
mod literal;
mod mutate;
mod node;
mod ops;
mod optimise;
mod quantifier;
mod reference;
mod sanity;
mod trigger;
mod view;
mod violations;

pub use config::*;
pub use defined::*;
pub use event::*;
pub use expr::{EqualityKind, Expr, ExprKind, FoldKind, IndexKind, OpKind, SetOpKind, SubsetKind};
pub use graph::*;
pub use node::{Pool, ValueBase};
pub use sanity::SanityError;
pub use trigger::{Role, Scope, Trigger, TriggerRef};
pub use view::*;
