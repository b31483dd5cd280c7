//! Identity types for tarn entities.
//!
//! Node identifiers are generation-checked arena indices:
//! - `index` addresses a slot in the node arena
//! - `generation` is bumped whenever the slot is released, so a stale id
//!   held by a dead trigger or a rolled-out quantifier instance never
//!   aliases the slot's next occupant

use std::fmt;

/// Unique identifier for an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Create a new NodeId from a slot index and generation.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

/// Dense position of a value inside its enclosing pool or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl VarId {
    /// Create a new VarId from a raw position.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw position.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
