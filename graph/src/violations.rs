//! Violation attribution.
//!
//! Walks down from a violated constraint and credits each decision variable
//! it reaches with the violation of the nearest violated boolean above it.
//! Members of container variables are credited in child containers, one
//! level per nesting of the value.

use crate::expr::{EqualityKind, Expr, FoldKind, IndexKind, OpKind};
use crate::node::{Pool, ValueBase};
use crate::Graph;
use tarn_constraint::{ViolationContainer, ViolationContext};
use tarn_core::{Kind, NodeId, Reason, VarId};

impl Graph {
    /// Credit the decision variables below `root` with its violation.
    ///
    /// Satisfied and constant constraints contribute nothing.
    pub fn update_var_violations(&self, root: NodeId, container: &mut ViolationContainer) {
        let violation = self.violation(root);
        if violation == 0 || self.is_constant(root) {
            return;
        }
        self.attribute(root, ViolationContext::basic(violation), container);
    }

    /// Context as seen by the operands of `id`: violated booleans restart
    /// from their own violation, everything else passes the parent's through.
    fn restart(&self, id: NodeId, context: ViolationContext) -> ViolationContext {
        if self.kind(id) != Kind::Bool {
            return context;
        }
        match self.violation(id) {
            0 => context,
            violation => ViolationContext::basic(violation),
        }
    }

    fn attribute(&self, id: NodeId, context: ViolationContext, out: &mut ViolationContainer) {
        if context.parent_violation == 0 || self.is_constant(id) {
            return;
        }
        match self.expr(id) {
            Expr::Value(_) => self.attribute_leaf(id, context, out),
            Expr::Undefined => {}
            Expr::Iter(reference) => {
                if let Some(target) = reference.target() {
                    self.attribute(target, context, out);
                }
            }
            Expr::Index(index) => {
                match index.reference.target() {
                    Some(target) => self.attribute(target, context, out),
                    None if index.kind != IndexKind::CatchUndef => {
                        self.attribute(index.container, ViolationContext::basic(context.parent_violation), out)
                    }
                    None => {}
                }
                if let (Some(arg), false) = (index.arg, index.kind == IndexKind::CatchUndef) {
                    self.attribute(arg, ViolationContext::basic(context.parent_violation), out);
                }
            }
            Expr::Op(op) => {
                let context = self.restart(id, context);
                self.attribute_op(&op.kind, &op.operands, context, out);
            }
            Expr::Equality(eq) => {
                let context = self.restart(id, context);
                let violation = context.parent_violation;
                match (eq.kind, self.int_if_defined(eq.left), self.int_if_defined(eq.right)) {
                    (EqualityKind::Int, Some(a), Some(b)) => {
                        let left = context.directed(if a > b { Reason::TooLarge } else { Reason::TooSmall });
                        self.attribute(eq.left, ViolationContext::int(violation, left), out);
                        self.attribute(eq.right, ViolationContext::int(violation, left.flip()), out);
                    }
                    _ => {
                        self.attribute(eq.left, context, out);
                        self.attribute(eq.right, context, out);
                    }
                }
            }
            Expr::Fold(fold) => {
                let context = self.restart(id, context);
                if !self.is_defined(fold.operand) {
                    self.attribute(fold.operand, context, out);
                    return;
                }
                let members = self.members(fold.operand);
                match fold.kind {
                    // each conjunct answers for its own violation
                    FoldKind::And => {
                        for member in members {
                            if self.violation(member) > 0 {
                                self.attribute(member, context, out);
                            }
                        }
                    }
                    FoldKind::AllDiff => {
                        for member in members {
                            if fold.counts.get(&self.hash_of(member)).is_some_and(|c| *c > 1) {
                                self.attribute(member, context, out);
                            }
                        }
                    }
                    FoldKind::Prod => {
                        let context = ViolationContext::basic(context.parent_violation);
                        for member in members {
                            self.attribute(member, context, out);
                        }
                    }
                    FoldKind::Or | FoldKind::Sum | FoldKind::Min | FoldKind::Max => {
                        for member in members {
                            self.attribute(member, context, out);
                        }
                    }
                }
            }
            Expr::Subset(subset) => {
                let context = self.restart(id, context);
                self.attribute(subset.left, context, out);
                self.attribute(subset.right, context, out);
            }
            Expr::SetLit(_) | Expr::Members(_) | Expr::SetOp(_) | Expr::Flatten(_) => {
                for operand in self.expr(id).operands() {
                    self.attribute(operand, context, out);
                }
            }
            Expr::Quantifier(q) => {
                for body in self.node(id).view.members() {
                    self.attribute(body, context, out);
                }
                if !self.is_defined(q.container) {
                    self.attribute(q.container, context, out);
                }
            }
        }
    }

    fn attribute_op(
        &self,
        kind: &OpKind,
        operands: &[NodeId],
        context: ViolationContext,
        out: &mut ViolationContainer,
    ) {
        let violation = context.parent_violation;
        match kind {
            OpKind::Less | OpKind::LessEq => {
                let left = context.directed(Reason::TooLarge);
                self.attribute(operands[0], ViolationContext::int(violation, left), out);
                self.attribute(operands[1], ViolationContext::int(violation, left.flip()), out);
            }
            OpKind::Not => self.attribute(operands[0], context.negated(), out),
            OpKind::InDomain(domain) => {
                let context = match self.int_if_defined(operands[0]) {
                    Some(value) => ViolationContext::int(violation, domain.distance(value).reason),
                    None => ViolationContext::basic(violation),
                };
                self.attribute(operands[0], context, out);
            }
            OpKind::Negate => self.attribute(operands[0], context.flipped(), out),
            OpKind::Minus => {
                self.attribute(operands[0], context, out);
                self.attribute(operands[1], context.flipped(), out);
            }
            OpKind::Abs | OpKind::Mod | OpKind::Div | OpKind::Power => {
                let context = ViolationContext::basic(violation);
                for operand in operands {
                    self.attribute(*operand, context, out);
                }
            }
            _ => {
                for operand in operands {
                    self.attribute(*operand, context, out);
                }
            }
        }
    }

    /// Credit a value leaf: its top-level variable, and its position in every
    /// enclosing container on the way down.
    ///
    /// Integer leaves also record the direction they were asked to move in.
    fn attribute_leaf(&self, leaf: NodeId, context: ViolationContext, out: &mut ViolationContainer) {
        let violation = context.parent_violation;
        let reason = context.reason.filter(|_| self.kind(leaf) == Kind::Int);
        let mut positions: Vec<VarId> = Vec::new();
        let mut current = leaf;
        let top = loop {
            match self.value_base(current) {
                Some(ValueBase {
                    pool: Pool::Variable,
                    id,
                }) => break id,
                Some(ValueBase {
                    pool: Pool::Container(parent),
                    id,
                }) => {
                    positions.push(id);
                    current = parent;
                }
                _ => return,
            }
        };
        out.add_violation(top, violation);
        let mut container = out;
        let mut owner = top;
        for position in positions.into_iter().rev() {
            container = container.child_violations(owner);
            container.add_violation(position, violation);
            owner = position;
        }
        if let Some(reason) = reason {
            container.set_reason(owner, reason);
        }
    }
}
