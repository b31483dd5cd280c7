//! Equality operators and defined-variable forwarding.

use crate::eval::recompute;
use crate::expr::{EqualityKind, Expr};
use crate::view::View;
use crate::Graph;
use tarn_core::{distance, NodeId, LARGE_VIOLATION};
use tracing::debug;

pub(crate) fn compute(g: &Graph, id: NodeId) -> Option<View> {
    let Expr::Equality(eq) = g.expr(id) else {
        unreachable!("equality compute on {}", id);
    };
    if !g.is_defined(eq.left) || !g.is_defined(eq.right) {
        return Some(View::Bool(LARGE_VIOLATION));
    }
    let violation = match eq.kind {
        EqualityKind::Int => distance(g.int(eq.left), g.int(eq.right)),
        EqualityKind::Enum => (g.enum_value(eq.left) != g.enum_value(eq.right)) as u64,
        EqualityKind::Bool => {
            bool_eq_violation(g.violation(eq.left), g.violation(eq.right))
        }
        EqualityKind::Hash => (g.hash_of(eq.left) != g.hash_of(eq.right)) as u64,
    };
    Some(View::Bool(violation))
}

/// Two true or two false sides agree; otherwise the false side's violation.
fn bool_eq_violation(left: u64, right: u64) -> u64 {
    match (left, right) {
        (0, other) | (other, 0) => other,
        _ => 0,
    }
}

/// An operand changed: forward into a defined variable if allowed, then recompute.
pub(crate) fn on_operand_event(g: &mut Graph, id: NodeId, slot: usize) {
    forward_definition(g, id, slot);
    recompute(g, id);
}

/// Write the source side's value into the defined variable, at most once per round.
fn forward_definition(g: &mut Graph, id: NodeId, slot: usize) {
    let round = g.round;
    let Expr::Equality(eq) = g.expr(id) else {
        return;
    };
    let Some((var, source)) = eq.forwarding() else {
        return;
    };
    let source_slot = if source == eq.left { 0 } else { 1 };
    if slot != source_slot || !g.is_defined(source) || !eq.lock.soft_try(round) {
        return;
    }
    let view = g.view(source).clone();
    if *g.view(var) == view {
        return;
    }
    let Some(literal) = g.literal_of(source) else {
        return;
    };
    let in_domain = g
        .node(var)
        .domain
        .as_ref()
        .is_some_and(|domain| domain.contains(&literal));
    if !in_domain {
        return;
    }
    if let Expr::Equality(eq) = g.expr_mut(id) {
        if !eq.lock.try_lock(round) {
            return;
        }
    }
    debug!(equality = %id, var = %var, value = %literal, "forwarding defined variable");
    g.assign_scalar(var, view);
}

/// Push the current source value into every defined variable.
pub(crate) fn sync_definition(g: &mut Graph, id: NodeId) {
    let source_slot = match g.expr(id) {
        Expr::Equality(eq) => match eq.forwarding() {
            Some((_, source)) if source == eq.left => 0,
            Some(_) => 1,
            None => return,
        },
        _ => return,
    };
    forward_definition(g, id, source_slot);
}
