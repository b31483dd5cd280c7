//! Common error types for tarn.

use crate::{Kind, NodeId};
use thiserror::Error;

/// Errors raised while building or mutating an expression graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Node id is stale or was never issued.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// An operand or mutation target has the wrong view kind.
    #[error("Kind mismatch on {node}: expected {expected}, got {actual}")]
    KindMismatch {
        node: NodeId,
        expected: Kind,
        actual: Kind,
    },

    /// A value lies outside the domain of the variable receiving it.
    #[error("Value {value} is outside the domain of {node}")]
    NotInDomain { node: NodeId, value: String },

    /// A set already holds a member with the same value.
    #[error("Duplicate member {value} in {node}")]
    DuplicateMember { node: NodeId, value: String },

    /// A container mutation would break the domain's size attribute.
    #[error("Size {size} violates the size bounds of {node}")]
    SizeOutOfBounds { node: NodeId, size: usize },

    /// A member index is past the end of a container.
    #[error("Index {index} out of range for {node} of size {size}")]
    IndexOutOfRange {
        node: NodeId,
        index: usize,
        size: usize,
    },

    /// Only decision variables may be mutated.
    #[error("Node {0} is not a decision variable")]
    NotAVariable(NodeId),

    /// Domain construction failed.
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// An operator/container combination that is not implemented.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The graph is in the wrong phase for the requested operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl EngineError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        EngineError::Unsupported(message.into())
    }

    pub fn invalid_domain(message: impl Into<String>) -> Self {
        EngineError::InvalidDomain(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        EngineError::InvalidOperation(message.into())
    }

    pub fn kind_mismatch(node: NodeId, expected: Kind, actual: Kind) -> Self {
        EngineError::KindMismatch {
            node,
            expected,
            actual,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
