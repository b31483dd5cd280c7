//! Events a view emits to its listeners.

use smallvec::SmallVec;
use tarn_core::{HashType, NodeId};

/// The value a node held before a change.
///
/// Scalars carry their payload so parents can apply exact deltas; containers
/// carry their aggregate hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prior {
    /// Violation of a boolean.
    Bool(u64),
    Int(i64),
    Enum(u32),
    Hash(HashType),
}

impl Prior {
    /// Hash of the prior value, comparable with current member hashes.
    pub fn hash(&self) -> HashType {
        match *self {
            Prior::Bool(violation) => HashType::of_bool(violation == 0),
            Prior::Int(value) => HashType::of_int(value),
            Prior::Enum(value) => HashType::of_enum(value),
            Prior::Hash(hash) => hash,
        }
    }

    /// Prior violation, for boolean members.
    pub fn violation(&self) -> u64 {
        match *self {
            Prior::Bool(violation) => violation,
            // an int prior only reaches boolean consumers through hash-only paths
            Prior::Hash(hash) => (hash != HashType::of_bool(true)) as u64,
            Prior::Int(_) | Prior::Enum(_) => 0,
        }
    }

    /// Prior integer value, for integer members.
    pub fn int(&self) -> i64 {
        match *self {
            Prior::Int(value) => value,
            Prior::Enum(value) => value as i64,
            Prior::Bool(violation) => (violation == 0) as i64,
            Prior::Hash(hash) => hash.as_int(),
        }
    }
}

/// One member moving between partition parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartMove {
    pub member: usize,
    pub from: usize,
    pub to: usize,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Scalar value or violation changed.
    Changed(Prior),
    /// The node now has a value.
    Defined,
    /// The node no longer has a value.
    Undefined,
    /// A member was inserted at `index`.
    Added { index: usize, member: NodeId },
    /// The member previously at `index` was removed.
    ///
    /// Sets and msets move their last member into `index`; sequences shift
    /// later members down. `member` stays readable until delivery ends.
    Removed {
        index: usize,
        member: NodeId,
        hash: HashType,
    },
    /// The member at `index` changed value.
    MemberChanged { index: usize, prior: Prior },
    /// The member at `index` gained a value.
    MemberDefined { index: usize },
    /// The member at `index` lost its value.
    MemberUndefined { index: usize },
    /// Two positions exchanged members.
    Swapped { a: usize, b: usize },
    /// Members moved between partition parts.
    PartsChanged { moves: SmallVec<[PartMove; 2]> },
    /// The value changed in a way only a full recompute can follow.
    Replaced,
}

impl Event {
    /// Index of the single member this event concerns, if it is member level.
    pub fn member_index(&self) -> Option<usize> {
        match self {
            Event::MemberChanged { index, .. }
            | Event::MemberDefined { index }
            | Event::MemberUndefined { index } => Some(*index),
            _ => None,
        }
    }

    /// True for events about a member's value rather than the container's shape.
    pub fn is_member_level(&self) -> bool {
        self.member_index().is_some()
    }

    pub fn is_definedness(&self) -> bool {
        matches!(self, Event::Defined | Event::Undefined)
    }
}
