//! Moves: single mutations of a decision variable, each with an inverse.

use std::fmt;
use tarn_core::{EngineError, EngineResult, Kind, Literal, NodeId};
use tarn_graph::Graph;

/// One search move. Targets are decision variables or their member leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    Assign { target: NodeId, value: Literal },
    AddMember { container: NodeId, value: Literal },
    RemoveMember { container: NodeId, index: usize },
    SequenceInsert { sequence: NodeId, index: usize, value: Literal },
    SequenceSwap { sequence: NodeId, a: usize, b: usize },
    FunctionAssign { function: NodeId, slot: usize, value: Literal },
    FunctionUnmap { function: NodeId, slot: usize },
    FunctionSwap { function: NodeId, a: usize, b: usize },
    PartitionMove { partition: NodeId, member: usize, part: usize },
    PartitionSwap { partition: NodeId, a: usize, b: usize },
}

impl Move {
    /// The node the move mutates.
    pub fn target(&self) -> NodeId {
        match self {
            Move::Assign { target, .. } => *target,
            Move::AddMember { container, .. } | Move::RemoveMember { container, .. } => *container,
            Move::SequenceInsert { sequence, .. } | Move::SequenceSwap { sequence, .. } => *sequence,
            Move::FunctionAssign { function, .. }
            | Move::FunctionUnmap { function, .. }
            | Move::FunctionSwap { function, .. } => *function,
            Move::PartitionMove { partition, .. } | Move::PartitionSwap { partition, .. } => {
                *partition
            }
        }
    }

    /// Apply the move and return the move that undoes it.
    pub(crate) fn apply(&self, g: &mut Graph) -> EngineResult<Move> {
        match self {
            Move::Assign { target, value } => {
                let prior = literal(g, *target)?;
                g.assign(*target, value.clone())?;
                Ok(Move::Assign {
                    target: *target,
                    value: prior,
                })
            }
            Move::AddMember { container, value } => {
                let index = g.add_member(*container, value.clone())?;
                Ok(Move::RemoveMember {
                    container: *container,
                    index,
                })
            }
            Move::RemoveMember { container, index } => {
                let member = g.member(*container, *index)?;
                let prior = literal(g, member)?;
                let positional = g.kind(*container) == Kind::Sequence;
                g.remove_member(*container, *index)?;
                Ok(if positional {
                    Move::SequenceInsert {
                        sequence: *container,
                        index: *index,
                        value: prior,
                    }
                } else {
                    Move::AddMember {
                        container: *container,
                        value: prior,
                    }
                })
            }
            Move::SequenceInsert {
                sequence,
                index,
                value,
            } => {
                g.sequence_insert(*sequence, *index, value.clone())?;
                Ok(Move::RemoveMember {
                    container: *sequence,
                    index: *index,
                })
            }
            Move::SequenceSwap { sequence, a, b } => {
                g.sequence_swap(*sequence, *a, *b)?;
                Ok(self.clone())
            }
            Move::FunctionAssign {
                function,
                slot,
                value,
            } => {
                let inverse = restore_image(g, *function, *slot)?;
                g.function_assign(*function, *slot, value.clone())?;
                Ok(inverse)
            }
            Move::FunctionUnmap { function, slot } => {
                let inverse = restore_image(g, *function, *slot)?;
                g.function_unmap(*function, *slot)?;
                Ok(inverse)
            }
            Move::FunctionSwap { function, a, b } => {
                g.function_swap(*function, *a, *b)?;
                Ok(self.clone())
            }
            Move::PartitionMove {
                partition,
                member,
                part,
            } => {
                g.check(*partition)?;
                if g.kind(*partition) != Kind::Partition {
                    return Err(EngineError::kind_mismatch(
                        *partition,
                        Kind::Partition,
                        g.kind(*partition),
                    ));
                }
                let size = g.size(*partition);
                if *member >= size {
                    return Err(EngineError::IndexOutOfRange {
                        node: *partition,
                        index: *member,
                        size,
                    });
                }
                let from = g.partition_view(*partition).part_of(*member);
                g.partition_move(*partition, *member, *part)?;
                Ok(Move::PartitionMove {
                    partition: *partition,
                    member: *member,
                    part: from,
                })
            }
            Move::PartitionSwap { partition, a, b } => {
                g.partition_swap(*partition, *a, *b)?;
                Ok(self.clone())
            }
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Assign { target, value } => write!(f, "{} := {}", target, value),
            Move::AddMember { container, value } => write!(f, "{} += {}", container, value),
            Move::RemoveMember { container, index } => write!(f, "{} -= [{}]", container, index),
            Move::SequenceInsert {
                sequence,
                index,
                value,
            } => write!(f, "{}.insert({}, {})", sequence, index, value),
            Move::SequenceSwap { sequence, a, b } => write!(f, "{}.swap({}, {})", sequence, a, b),
            Move::FunctionAssign {
                function,
                slot,
                value,
            } => write!(f, "{}[{}] := {}", function, slot, value),
            Move::FunctionUnmap { function, slot } => write!(f, "{}.unmap({})", function, slot),
            Move::FunctionSwap { function, a, b } => write!(f, "{}.swap({}, {})", function, a, b),
            Move::PartitionMove {
                partition,
                member,
                part,
            } => write!(f, "{}.move({}, {})", partition, member, part),
            Move::PartitionSwap { partition, a, b } => {
                write!(f, "{}.swap({}, {})", partition, a, b)
            }
        }
    }
}

fn literal(g: &Graph, id: NodeId) -> EngineResult<Literal> {
    g.check(id)?;
    g.literal_of(id).ok_or_else(|| {
        EngineError::invalid_operation(format!("{} does not hold a readable value", id))
    })
}

/// The move that puts back the current image of `slot`.
fn restore_image(g: &Graph, function: NodeId, slot: usize) -> EngineResult<Move> {
    g.check(function)?;
    if g.kind(function) != Kind::Function {
        return Err(EngineError::kind_mismatch(function, Kind::Function, g.kind(function)));
    }
    Ok(match g.function_view(function).image(slot) {
        Some(image) => Move::FunctionAssign {
            function,
            slot,
            value: literal(g, image)?,
        },
        None => Move::FunctionUnmap { function, slot },
    })
}
