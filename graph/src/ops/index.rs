//! Index operators: `seq[i]`, `tuple[i]`, `f(x)` and the undefinedness catch.
//!
//! An index node is a reference (see [`crate::reference`]). Its target is the
//! member selected by the current operand values. The container is watched
//! with a member scope on the selected position, so changes to other members
//! never reach the index.

use crate::expr::{Expr, IndexKind};
use crate::reference::{bind, retarget};
use crate::trigger::{Role, Scope};
use crate::Graph;
use tarn_core::NodeId;

fn parts(g: &Graph, id: NodeId) -> (IndexKind, NodeId, Option<NodeId>) {
    match g.expr(id) {
        Expr::Index(index) => (index.kind, index.container, index.arg),
        other => unreachable!("index handler on {} node {}", other.name(), id),
    }
}

/// The member the operands currently select, and its position in the container.
pub(crate) fn target(g: &Graph, id: NodeId) -> (Option<NodeId>, Option<usize>) {
    let (kind, container, arg) = parts(g, id);
    if kind == IndexKind::CatchUndef {
        let target = if g.is_defined(container) { Some(container) } else { arg };
        return (target, None);
    }
    if !g.is_defined(container) {
        return (None, None);
    }
    let position = match (kind, arg) {
        (IndexKind::Tuple(position), _) => Some(position),
        (IndexKind::Sequence, Some(arg)) => g.int_if_defined(arg).and_then(|value| {
            let len = g.size(container) as i64;
            (1..=len).contains(&value).then(|| (value - 1) as usize)
        }),
        (IndexKind::Function, Some(arg)) if g.is_defined(arg) => g
            .function_view(container)
            .preimages()
            .slot_of(g.hash_of(arg)),
        _ => None,
    };
    match position {
        Some(position) => (g.view(container).member_at(position), Some(position)),
        None => (None, None),
    }
}

fn container_scope(kind: IndexKind, position: Option<usize>) -> Scope {
    match (kind, position) {
        (IndexKind::CatchUndef, _) | (_, None) => Scope::Outer,
        (_, Some(position)) => Scope::Member(position),
    }
}

/// Re-derive the target; publish the difference when `notify` is set.
pub(crate) fn resolve(g: &mut Graph, id: NodeId, notify: bool) {
    let (kind, container, _) = parts(g, id);
    let (target, position) = target(g, id);
    let moved = match g.expr_mut(id) {
        Expr::Index(index) if index.position != position => {
            index.position = position;
            index.container_trigger.take()
        }
        _ => None,
    };
    if let Some(old) = moved {
        old.deactivate();
        let trigger = g.subscribe(id, container, Role::Operand, 0, container_scope(kind, position));
        if let Expr::Index(index) = g.expr_mut(id) {
            index.container_trigger = trigger;
        }
    }
    retarget(g, id, target, notify);
}

pub(crate) fn refresh(g: &mut Graph, id: NodeId) {
    resolve(g, id, true);
}

/// Subscribe to the operands and bind the current target.
pub(crate) fn start(g: &mut Graph, id: NodeId) {
    let (kind, container, arg) = parts(g, id);
    let position = match g.expr(id) {
        Expr::Index(index) => index.position,
        _ => None,
    };
    let trigger = g.subscribe(id, container, Role::Operand, 0, container_scope(kind, position));
    if let Expr::Index(index) = g.expr_mut(id) {
        index.container_trigger = trigger;
    }
    if let Some(arg) = arg {
        let scope = if kind == IndexKind::CatchUndef { Scope::Outer } else { Scope::All };
        g.subscribe(id, arg, Role::Operand, 1, scope);
    }
    bind(g, id);
}
