//! Evaluation and the triggering lifecycle.
//!
//! `evaluate` fills every cached view bottom-up, once. `start_triggering`
//! subscribes each operator to its operands; `stop_triggering` deactivates
//! those subscriptions again. `release` tears a subtree down and returns its
//! slots to the arena. Shared nodes (constants, variables and iterators) are
//! never descended into by `stop_triggering` or `release`.

use crate::event::{Event, Prior};
use crate::expr::{Expr, ExprKind};
use crate::trigger::{Role, Scope};
use crate::view::View;
use crate::Graph;
use tarn_core::NodeId;
use tracing::{info, warn};

/// Definedness and value of a node before a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub defined: bool,
    pub prior: Prior,
}

impl Graph {
    /// Populate cached state for `root` and everything below it.
    pub fn evaluate(&mut self, root: NodeId) {
        evaluate(self, root);
        info!(root = %root, nodes = self.len(), "evaluated");
    }

    /// Subscribe `root` and its subtree to their operands.
    pub fn start_triggering(&mut self, root: NodeId) {
        start_triggering(self, root);
        info!(root = %root, "started triggering");
    }

    pub fn stop_triggering(&mut self, root: NodeId) {
        stop_triggering(self, root);
    }

    /// Free an owned subtree. Variables, constants and iterators survive.
    pub fn release(&mut self, root: NodeId) {
        release(self, root);
    }

    pub(crate) fn snapshot(&self, id: NodeId) -> Snapshot {
        Snapshot {
            defined: self.is_defined(id),
            prior: self.prior(id),
        }
    }

    /// Emit the events that take listeners from `before` to the current state.
    ///
    /// Definedness transitions are reported instead of a value change.
    pub(crate) fn publish(&mut self, id: NodeId, before: Snapshot) {
        match (before.defined, self.is_defined(id)) {
            (true, false) => self.notify(id, &Event::Undefined),
            (false, true) => self.notify(id, &Event::Defined),
            (true, true) => {
                if self.prior(id) != before.prior {
                    self.notify(id, &Event::Changed(before.prior));
                }
            }
            (false, false) => {}
        }
    }

    /// Store a freshly computed outcome; `None` marks the node undefined.
    pub(crate) fn store(&mut self, id: NodeId, outcome: Option<View>) {
        let node = self.node_mut(id);
        match outcome {
            Some(view) => {
                node.view = view;
                node.flags.defined = true;
            }
            None => node.flags.defined = false,
        }
    }
}

pub(crate) fn evaluate(g: &mut Graph, id: NodeId) {
    if g.is_evaluated(id) {
        return;
    }
    g.node_mut(id).flags.evaluated = true;
    match g.expr(id).kind() {
        ExprKind::Value | ExprKind::Undefined | ExprKind::Iter => {}
        ExprKind::Quantifier => crate::quantifier::evaluate(g, id),
        kind => {
            for operand in g.expr(id).operands() {
                evaluate(g, operand);
            }
            match kind {
                ExprKind::Op => {
                    let outcome = crate::ops::compute(g, id);
                    g.store(id, outcome);
                }
                ExprKind::Equality => {
                    let outcome = crate::ops::equality::compute(g, id);
                    g.store(id, outcome);
                }
                ExprKind::Fold => crate::ops::fold::reset(g, id),
                ExprKind::Subset => crate::ops::subset::reset(g, id),
                ExprKind::Index => crate::ops::index::resolve(g, id, false),
                ExprKind::SetLit => crate::ops::set_lit::rebuild(g, id, false),
                ExprKind::Members => crate::ops::members::rebuild(g, id),
                ExprKind::Flatten => crate::ops::flatten::rebuild(g, id),
                ExprKind::SetOp => {
                    if let Err(error) = crate::ops::set_ops::rebuild(g, id, false) {
                        warn!(node = %id, %error, "set operator left undefined");
                    }
                }
                _ => {}
            }
        }
    }
}

/// Generic adapter: recompute from scratch and publish the difference.
pub(crate) fn recompute(g: &mut Graph, id: NodeId) {
    let before = g.snapshot(id);
    match g.expr(id).kind() {
        ExprKind::Op => {
            let outcome = crate::ops::compute(g, id);
            g.store(id, outcome);
        }
        ExprKind::Equality => {
            let outcome = crate::ops::equality::compute(g, id);
            g.store(id, outcome);
        }
        ExprKind::Fold => crate::ops::fold::reset(g, id),
        ExprKind::Subset => crate::ops::subset::reset(g, id),
        other => unreachable!("recompute on {:?} node {}", other, id),
    }
    g.publish(id, before);
}

pub(crate) fn start_triggering(g: &mut Graph, id: NodeId) {
    if g.is_triggering(id) || g.is_constant(id) {
        return;
    }
    g.node_mut(id).flags.triggering = true;
    let kind = g.expr(id).kind();
    match kind {
        ExprKind::Value | ExprKind::Undefined => {}
        ExprKind::Iter => crate::reference::bind(g, id),
        ExprKind::Quantifier => {
            let container = g.expr(id).operands()[0];
            start_triggering(g, container);
            crate::quantifier::start(g, id);
        }
        _ => {
            let operands = g.expr(id).operands();
            for operand in &operands {
                start_triggering(g, *operand);
            }
            match kind {
                ExprKind::Index => crate::ops::index::start(g, id),
                ExprKind::Members => {
                    for (slot, operand) in operands.iter().enumerate() {
                        g.subscribe(id, *operand, Role::Member, slot, Scope::All);
                    }
                }
                _ => {
                    let scope = g.expr(id).operand_scope();
                    g.subscribe_operands(id, &operands, scope);
                }
            }
        }
    }
}

pub(crate) fn stop_triggering(g: &mut Graph, id: NodeId) {
    if !g.is_triggering(id) {
        return;
    }
    g.node_mut(id).flags.triggering = false;
    g.unsubscribe_all(id);
    match g.expr_mut(id) {
        Expr::Iter(reference) => reference.bound = None,
        Expr::Index(index) => {
            index.reference.bound = None;
            index.container_trigger = None;
        }
        _ => {}
    }
    if g.expr(id).kind() == ExprKind::Quantifier {
        crate::quantifier::stop(g, id);
    }
    for operand in g.expr(id).operands() {
        if g.expr(operand).kind() != ExprKind::Iter {
            stop_triggering(g, operand);
        }
    }
}

pub(crate) fn release(g: &mut Graph, id: NodeId) {
    if !g.contains(id) || g.is_constant(id) {
        return;
    }
    match g.expr(id) {
        // leaves belong to their pool or container, never to a reader
        Expr::Iter(_) | Expr::Value(_) => return,
        _ => {}
    }
    stop_triggering(g, id);
    g.node_mut(id).listeners.deactivate_all();
    match g.expr(id).kind() {
        ExprKind::Quantifier => crate::quantifier::release_parts(g, id),
        ExprKind::SetLit | ExprKind::SetOp => {
            for member in g.own_view_mut(id).members() {
                free_value(g, member);
            }
        }
        _ => {}
    }
    for operand in g.expr(id).operands() {
        release(g, operand);
    }
    g.free(id);
}

/// Free a value leaf and every member leaf below it.
pub(crate) fn free_value(g: &mut Graph, id: NodeId) {
    let Some(node) = g.try_node_mut(id) else {
        return;
    };
    node.listeners.deactivate_all();
    let members = node.view.members();
    for member in members {
        free_value(g, member);
    }
    g.free(id);
}
