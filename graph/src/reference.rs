//! Reference nodes.
//!
//! Iterators and index operators do not hold a value of their own: they
//! point at a target node and every read resolves through them. A reference
//! keeps its own defined flag and a copy of the last scalar value it
//! reported, so that a change arriving by two routes (the target's own event
//! and the enclosing container's member event) is published once.

use crate::event::{Event, Prior};
use crate::expr::Expr;
use crate::trigger::{Role, Scope, TriggerRef};
use crate::Graph;
use tarn_core::NodeId;

#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub(crate) target: Option<NodeId>,
    pub(crate) bound: Option<TriggerRef>,
    pub(crate) last: Option<Prior>,
}

impl Reference {
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }
}

fn reference(g: &Graph, id: NodeId) -> &Reference {
    match g.expr(id) {
        Expr::Iter(reference) => reference,
        Expr::Index(index) => &index.reference,
        other => unreachable!("{} is not a reference node ({})", id, other.name()),
    }
}

fn reference_mut(g: &mut Graph, id: NodeId) -> &mut Reference {
    match g.expr_mut(id) {
        Expr::Iter(reference) => reference,
        Expr::Index(index) => &mut index.reference,
        other => unreachable!("{} is not a reference node ({})", id, other.name()),
    }
}

pub(crate) fn target_of(g: &Graph, id: NodeId) -> Option<NodeId> {
    reference(g, id).target
}

/// Subscribe to the current target, if triggering and not already bound.
pub(crate) fn bind(g: &mut Graph, id: NodeId) {
    let Some(target) = reference(g, id).target else {
        return;
    };
    if reference(g, id).bound.as_ref().is_some_and(|t| t.is_active()) {
        return;
    }
    let trigger = g.subscribe(id, target, Role::Bound, 0, Scope::All);
    reference_mut(g, id).bound = trigger;
}

pub(crate) fn unbind(g: &mut Graph, id: NodeId) {
    if let Some(trigger) = reference_mut(g, id).bound.take() {
        trigger.deactivate();
    }
}

/// Point `id` at `target` and publish whatever changed for its listeners.
pub(crate) fn retarget(g: &mut Graph, id: NodeId, target: Option<NodeId>, notify: bool) {
    let old_target = reference(g, id).target;
    let old_last = reference(g, id).last;
    let was_defined = g.is_defined(id);

    if old_target != target {
        unbind(g, id);
        reference_mut(g, id).target = target;
        if g.is_triggering(id) {
            bind(g, id);
        }
    }
    let defined = target.is_some_and(|t| g.is_defined(t));
    g.set_defined(id, defined);
    let last = match target {
        Some(t) if defined => Some(g.prior(t)),
        _ => None,
    };
    reference_mut(g, id).last = last;

    if !notify {
        return;
    }
    match (was_defined, defined) {
        (true, false) => g.notify(id, &Event::Undefined),
        (false, true) => g.notify(id, &Event::Defined),
        (true, true) if g.kind(id).is_container() => {
            if old_target != target {
                g.notify(id, &Event::Replaced);
            }
        }
        (true, true) => {
            if let (Some(old), Some(new)) = (old_last, last) {
                if old != new {
                    g.notify(id, &Event::Changed(old));
                }
            }
        }
        (false, false) => {}
    }
}

/// Re-derive the target of any reference node and publish the difference.
pub(crate) fn refresh(g: &mut Graph, id: NodeId) {
    match g.expr(id) {
        Expr::Iter(reference) => {
            let target = reference.target;
            retarget(g, id, target, true);
        }
        _ => crate::ops::index::refresh(g, id),
    }
}

/// Handle an event raised by the bound target.
pub(crate) fn forward(g: &mut Graph, id: NodeId, event: &Event) {
    match event {
        Event::Defined | Event::Undefined => refresh(g, id),
        Event::Changed(_) => {
            let Some(target) = target_of(g, id) else {
                return;
            };
            let now = g.prior(target);
            let old = reference(g, id).last;
            reference_mut(g, id).last = Some(now);
            match old {
                Some(old) if old != now => g.notify(id, &Event::Changed(old)),
                Some(_) => {}
                None => refresh(g, id),
            }
        }
        other => {
            if let Some(target) = target_of(g, id) {
                let now = g.prior(target);
                reference_mut(g, id).last = Some(now);
            }
            g.notify(id, other);
        }
    }
}
