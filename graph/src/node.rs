//! Nodes of the expression graph.

use crate::expr::Expr;
use crate::trigger::{Listeners, TriggerRef};
use crate::view::View;
use smallvec::SmallVec;
use tarn_core::{AnyDomain, NodeId, VarId};

/// Where a value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// Immutable constant.
    Constant,
    /// Top-level decision variable.
    Variable,
    /// Member of an enclosing container node.
    Container(NodeId),
}

/// Back-reference from a value to its enclosing pool or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueBase {
    pub pool: Pool,
    /// Position inside the pool or container.
    pub id: VarId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub evaluated: bool,
    pub constant: bool,
    pub defined: bool,
    pub triggering: bool,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub expr: Expr,
    pub view: View,
    pub flags: Flags,
    /// Triggers other nodes registered on this one.
    pub listeners: Listeners,
    /// Triggers this node registered on others.
    pub subscriptions: SmallVec<[TriggerRef; 2]>,
    /// Domain of a value leaf.
    pub domain: Option<AnyDomain>,
    /// Equality that writes this variable, when forwarding is enabled.
    pub defined_by: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(expr: Expr, view: View) -> Self {
        Self {
            expr,
            view,
            flags: Flags::default(),
            listeners: Listeners::default(),
            subscriptions: SmallVec::new(),
            domain: None,
            defined_by: None,
        }
    }

    pub(crate) fn value_base(&self) -> Option<ValueBase> {
        match &self.expr {
            Expr::Value(base) => Some(*base),
            _ => None,
        }
    }
}
