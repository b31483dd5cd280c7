//! Quantifiers.
//!
//! A quantifier ranges over the members of a set, multiset or sequence. For
//! each container position it keeps an iterator bound to that member and,
//! when the member passes the guard, one copy of the body template with the
//! template's placeholder replaced by that iterator. The bodies form the
//! quantifier's own sequence view, so a fold on top sees ordinary member
//! events.
//!
//! Positions follow the container:
//! - additions are queued and unrolled once the current notification unwinds
//! - a set or multiset removal moves the last member into the hole, so the
//!   quantifier swaps its last entry in before rolling it
//! - sequence removals and swaps act on the same positions directly
//!
//! Every position records the view index of its body, or nothing when the
//! guard fails. Indexes increase with position.

use crate::copy::deep_copy;
use crate::eval;
use crate::event::Event;
use crate::expr::Expr;
use crate::literal::emptied;
use crate::node::Node;
use crate::reference::{self, Reference};
use crate::trigger::{Delayed, Role, Scope, TriggerRef};
use crate::view::View;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::{Kind, NodeId};
use tracing::debug;

/// Unrolled copy of the condition for one position.
#[derive(Debug, Clone)]
pub(crate) struct Guard {
    pub(crate) node: NodeId,
    pub(crate) holds: bool,
    pub(crate) trigger: Option<TriggerRef>,
}

/// Bookkeeping for one container position.
#[derive(Debug, Clone)]
pub(crate) struct Unrolled {
    pub(crate) iter: NodeId,
    pub(crate) guard: Option<Guard>,
    /// View index of this position's body.
    pub(crate) expr_index: Option<usize>,
}

impl Unrolled {
    fn has_body(&self) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard.holds)
    }
}

#[derive(Debug, Clone)]
pub struct Quantifier {
    pub container: NodeId,
    pub template: NodeId,
    /// Iterator standing for the current member in `template` and `condition`.
    pub placeholder: NodeId,
    pub condition: Option<NodeId>,
    pub(crate) unrolled: Vec<Unrolled>,
    /// Member triggers, by body index.
    pub(crate) body_triggers: Vec<Option<TriggerRef>>,
    pub(crate) container_trigger: Option<TriggerRef>,
    /// Container positions waiting for a delayed unroll.
    pub(crate) pending: Vec<usize>,
    pub(crate) undefined_bodies: usize,
}

impl Quantifier {
    pub(crate) fn new(
        container: NodeId,
        template: NodeId,
        placeholder: NodeId,
        condition: Option<NodeId>,
    ) -> Self {
        Self {
            container,
            template,
            placeholder,
            condition,
            unrolled: Vec::new(),
            body_triggers: Vec::new(),
            container_trigger: None,
            pending: Vec::new(),
            undefined_bodies: 0,
        }
    }

    /// Number of container positions currently unrolled.
    pub fn unrolled_len(&self) -> usize {
        self.unrolled.len()
    }

    /// View index of the body for container position `position`.
    pub fn expr_index(&self, position: usize) -> Option<usize> {
        self.unrolled.get(position).and_then(|u| u.expr_index)
    }

    fn body_index_for(&self, position: usize) -> usize {
        self.unrolled[..position]
            .iter()
            .rev()
            .find_map(|u| u.expr_index)
            .map_or(0, |k| k + 1)
    }

    fn shift_bodies_from(&mut self, position: usize, delta: isize) {
        for entry in self.unrolled.iter_mut().skip(position) {
            if let Some(k) = entry.expr_index.as_mut() {
                *k = k.wrapping_add_signed(delta);
            }
        }
    }

    /// Recompute body indexes for positions `from..=to`.
    fn renumber(&mut self, from: usize, to: usize) {
        let mut next = self.body_index_for(from);
        for entry in &mut self.unrolled[from..=to] {
            entry.expr_index = if entry.has_body() {
                next += 1;
                Some(next - 1)
            } else {
                None
            };
        }
    }

    fn fix_guard_slots(&self, from: usize) {
        for (position, entry) in self.unrolled.iter().enumerate().skip(from) {
            if let Some(trigger) = entry.guard.as_ref().and_then(|g| g.trigger.as_ref()) {
                trigger.set_slot(position);
            }
        }
    }

    fn fix_body_slots(&self, from: usize) {
        for (index, trigger) in self.body_triggers.iter().enumerate().skip(from) {
            if let Some(trigger) = trigger {
                trigger.set_slot(index);
            }
        }
    }
}

fn quantifier(g: &Graph, id: NodeId) -> &Quantifier {
    match g.expr(id) {
        Expr::Quantifier(q) => q,
        other => unreachable!("quantifier handler on {} node {}", other.name(), id),
    }
}

fn quantifier_mut(g: &mut Graph, id: NodeId) -> &mut Quantifier {
    match g.expr_mut(id) {
        Expr::Quantifier(q) => q,
        other => unreachable!("quantifier handler on {} node {}", other.name(), id),
    }
}

impl Graph {
    /// The quantifier stored at `id`, if it is one.
    pub fn quantifier(&self, id: NodeId) -> Option<&Quantifier> {
        match &self.try_node(id)?.expr {
            Expr::Quantifier(q) => Some(q),
            _ => None,
        }
    }
}

// ==================== Iterators and Copies ====================

fn new_iter(g: &mut Graph, id: NodeId) -> NodeId {
    let placeholder = quantifier(g, id).placeholder;
    let view = emptied(&g.node(placeholder).view);
    let iter = g.alloc(Node::new(Expr::Iter(Reference::default()), view));
    g.node_mut(iter).flags.evaluated = true;
    iter
}

fn free_iter(g: &mut Graph, iter: NodeId) {
    if !g.contains(iter) {
        return;
    }
    reference::unbind(g, iter);
    g.unsubscribe_all(iter);
    g.node_mut(iter).listeners.deactivate_all();
    g.free(iter);
}

/// Copy `template` with the placeholder bound to `iter`, evaluated and,
/// when `triggering`, live.
fn instantiate(g: &mut Graph, id: NodeId, template: NodeId, iter: NodeId, triggering: bool) -> NodeId {
    let placeholder = quantifier(g, id).placeholder;
    let map = HashMap::from([(placeholder, iter)]);
    let copy = deep_copy(g, template, &map);
    eval::evaluate(g, copy);
    if triggering {
        eval::start_triggering(g, copy);
    }
    copy
}

// ==================== Bodies ====================

/// Set definedness from the container and the bodies, then tell listeners.
fn settle(g: &mut Graph, id: NodeId, was_defined: bool, notify: bool, event: Event) {
    let q = quantifier(g, id);
    let defined = q.undefined_bodies == 0 && g.is_defined(q.container);
    g.set_defined(id, defined);
    if !notify {
        return;
    }
    match (was_defined, defined) {
        (true, true) => g.notify(id, &event),
        (false, true) => g.notify(id, &Event::Defined),
        (true, false) => g.notify(id, &Event::Undefined),
        (false, false) => {}
    }
}

fn attach(g: &mut Graph, id: NodeId, index: usize, body: NodeId, notify: bool) {
    let was_defined = g.is_defined(id);
    let trigger = if g.is_triggering(id) {
        g.subscribe(id, body, Role::Member, index, Scope::All)
    } else {
        None
    };
    let hash = g.hash_of(body);
    let body_defined = g.is_defined(body);
    if let View::Sequence(view) = g.own_view_mut(id) {
        view.insert(index, body, hash);
    }
    let q = quantifier_mut(g, id);
    q.body_triggers.insert(index, trigger);
    q.fix_body_slots(index + 1);
    if !body_defined {
        q.undefined_bodies += 1;
    }
    settle(g, id, was_defined, notify, Event::Added { index, member: body });
}

/// Take a body out of the view without releasing it.
fn detach(g: &mut Graph, id: NodeId, index: usize, notify: bool) -> NodeId {
    let was_defined = g.is_defined(id);
    let (body, hash) = match g.own_view_mut(id) {
        View::Sequence(view) => view.remove(index),
        other => unreachable!("quantifier {} holds a {} view", id, other.kind()),
    };
    let body_defined = g.is_defined(body);
    let q = quantifier_mut(g, id);
    if let Some(trigger) = q.body_triggers.remove(index) {
        trigger.deactivate();
    }
    q.fix_body_slots(index);
    if !body_defined {
        q.undefined_bodies = q.undefined_bodies.saturating_sub(1);
    }
    settle(
        g,
        id,
        was_defined,
        notify,
        Event::Removed {
            index,
            member: body,
            hash,
        },
    );
    body
}

fn insert_body(g: &mut Graph, id: NodeId, index: usize, iter: NodeId, notify: bool) {
    let template = quantifier(g, id).template;
    let triggering = g.is_triggering(id);
    let body = instantiate(g, id, template, iter, triggering);
    attach(g, id, index, body, notify);
}

fn remove_body(g: &mut Graph, id: NodeId, index: usize, notify: bool) {
    let body = detach(g, id, index, notify);
    eval::release(g, body);
}

// ==================== Positions ====================

fn unroll_at(g: &mut Graph, id: NodeId, position: usize, member: NodeId, notify: bool) {
    let iter = new_iter(g, id);
    reference::retarget(g, iter, Some(member), false);
    let triggering = g.is_triggering(id);
    if triggering {
        eval::start_triggering(g, iter);
    }
    let guard = match quantifier(g, id).condition {
        Some(condition) => {
            let node = instantiate(g, id, condition, iter, triggering);
            let trigger = if triggering {
                g.subscribe(id, node, Role::Condition, position, Scope::All)
            } else {
                None
            };
            Some(Guard {
                node,
                holds: g.violation(node) == 0,
                trigger,
            })
        }
        None => None,
    };

    let q = quantifier_mut(g, id);
    let entry = Unrolled {
        iter,
        guard,
        expr_index: None,
    };
    let has_body = entry.has_body();
    q.unrolled.insert(position, entry);
    q.fix_guard_slots(position + 1);
    if has_body {
        let index = q.body_index_for(position);
        q.unrolled[position].expr_index = Some(index);
        q.shift_bodies_from(position + 1, 1);
        insert_body(g, id, index, iter, notify);
    }
}

fn roll_at(g: &mut Graph, id: NodeId, position: usize, notify: bool) {
    let q = quantifier_mut(g, id);
    let entry = q.unrolled.remove(position);
    q.fix_guard_slots(position);
    if let Some(index) = entry.expr_index {
        q.shift_bodies_from(position, -1);
        remove_body(g, id, index, notify);
    }
    if let Some(guard) = entry.guard {
        if let Some(trigger) = guard.trigger {
            trigger.deactivate();
        }
        eval::release(g, guard.node);
    }
    free_iter(g, entry.iter);
}

/// Exchange the members at positions `a < b`; bodies follow their members.
fn swap_positions(g: &mut Graph, id: NodeId, a: usize, b: usize) {
    let q = quantifier_mut(g, id);
    let (index_a, index_b) = (q.unrolled[a].expr_index, q.unrolled[b].expr_index);
    q.unrolled.swap(a, b);
    q.unrolled[a].expr_index = index_a;
    q.unrolled[b].expr_index = index_b;
    q.fix_guard_slots(a);

    match (index_a, index_b) {
        (Some(x), Some(y)) => {
            if let View::Sequence(view) = g.own_view_mut(id) {
                view.swap(x, y);
            }
            let q = quantifier_mut(g, id);
            q.body_triggers.swap(x, y);
            q.fix_body_slots(x.min(y));
            if g.is_defined(id) {
                g.notify(id, &Event::Swapped { a: x, b: y });
            }
        }
        (None, None) => {}
        (Some(from), None) | (None, Some(from)) => {
            let body = detach(g, id, from, true);
            let q = quantifier_mut(g, id);
            q.renumber(a, b);
            let to = if index_a.is_some() {
                q.unrolled[b].expr_index
            } else {
                q.unrolled[a].expr_index
            };
            match to {
                Some(to) => attach(g, id, to, body, true),
                None => unreachable!("moved body of quantifier {} lost its position", id),
            }
        }
    }
}

/// Roll everything and unroll the container afresh.
fn reroll(g: &mut Graph, id: NodeId) {
    let was_defined = g.is_defined(id);
    quantifier_mut(g, id).pending.clear();
    while let Some(last) = quantifier(g, id).unrolled.len().checked_sub(1) {
        roll_at(g, id, last, false);
    }
    unroll_all(g, id);
    settle(g, id, was_defined, true, Event::Replaced);
}

fn unroll_all(g: &mut Graph, id: NodeId) {
    let container = quantifier(g, id).container;
    if !g.is_defined(container) {
        return;
    }
    let members = g.view(container).members();
    for (position, member) in members.into_iter().enumerate() {
        unroll_at(g, id, position, member, false);
    }
}

/// Unroll container positions queued by additions.
pub(crate) fn unroll_pending(g: &mut Graph, id: NodeId) {
    let pending = std::mem::take(&mut quantifier_mut(g, id).pending);
    let container = quantifier(g, id).container;
    for position in pending {
        let Some(member) = g.view(container).member_at(position) else {
            continue;
        };
        let position = position.min(quantifier(g, id).unrolled.len());
        unroll_at(g, id, position, member, true);
    }
}

// ==================== Lifecycle ====================

pub(crate) fn evaluate(g: &mut Graph, id: NodeId) {
    let container = quantifier(g, id).container;
    eval::evaluate(g, container);
    unroll_all(g, id);
    let q = quantifier(g, id);
    let defined = q.undefined_bodies == 0 && g.is_defined(container);
    debug!(quantifier = %id, positions = q.unrolled.len(), "unrolled quantifier");
    g.set_defined(id, defined);
}

/// Subscribe to the container, the guards and the bodies.
pub(crate) fn start(g: &mut Graph, id: NodeId) {
    let container = quantifier(g, id).container;
    let trigger = g.subscribe(id, container, Role::Container, 0, Scope::Outer);
    quantifier_mut(g, id).container_trigger = trigger;

    let entries: Vec<(NodeId, Option<NodeId>)> = quantifier(g, id)
        .unrolled
        .iter()
        .map(|u| (u.iter, u.guard.as_ref().map(|guard| guard.node)))
        .collect();
    for (position, (iter, guard)) in entries.into_iter().enumerate() {
        eval::start_triggering(g, iter);
        if let Some(node) = guard {
            eval::start_triggering(g, node);
            let trigger = g.subscribe(id, node, Role::Condition, position, Scope::All);
            if let Some(guard) = quantifier_mut(g, id).unrolled[position].guard.as_mut() {
                guard.trigger = trigger;
            }
        }
    }
    for (index, body) in g.node(id).view.members().into_iter().enumerate() {
        eval::start_triggering(g, body);
        let trigger = g.subscribe(id, body, Role::Member, index, Scope::All);
        quantifier_mut(g, id).body_triggers[index] = trigger;
    }
}

/// Drop trigger handles and stop every unrolled part. The handles were
/// already deactivated by the caller.
pub(crate) fn stop(g: &mut Graph, id: NodeId) {
    let q = quantifier_mut(g, id);
    q.container_trigger = None;
    q.body_triggers.iter_mut().for_each(|t| *t = None);
    let mut parts = Vec::new();
    for entry in &mut q.unrolled {
        parts.push(entry.iter);
        if let Some(guard) = entry.guard.as_mut() {
            guard.trigger = None;
            parts.push(guard.node);
        }
    }
    parts.extend(g.node(id).view.members());
    for part in parts {
        eval::stop_triggering(g, part);
    }
}

/// Free bodies, guards, iterators and templates.
pub(crate) fn release_parts(g: &mut Graph, id: NodeId) {
    let bodies = match g.own_view_mut(id) {
        View::Sequence(view) => view.clear(),
        _ => Vec::new(),
    };
    let q = quantifier_mut(g, id);
    let unrolled = std::mem::take(&mut q.unrolled);
    q.body_triggers.clear();
    q.pending.clear();
    q.undefined_bodies = 0;
    let (template, placeholder, condition) = (q.template, q.placeholder, q.condition);

    for body in bodies {
        eval::release(g, body);
    }
    for entry in unrolled {
        if let Some(guard) = entry.guard {
            eval::release(g, guard.node);
        }
        free_iter(g, entry.iter);
    }
    eval::release(g, template);
    if let Some(condition) = condition {
        eval::release(g, condition);
    }
    free_iter(g, placeholder);
}

// ==================== Events ====================

pub(crate) fn on_event(g: &mut Graph, id: NodeId, role: Role, slot: usize, event: &Event) {
    match role {
        Role::Container => on_container_event(g, id, event),
        Role::Condition => on_condition_event(g, id, slot),
        Role::Member => crate::ops::members::on_member_event(g, id, slot, event),
        other => unreachable!("quantifier {} received a {:?} event", id, other),
    }
}

fn on_container_event(g: &mut Graph, id: NodeId, event: &Event) {
    let container = quantifier(g, id).container;
    let ordered = g.kind(container) == Kind::Sequence;
    match event {
        Event::Added { index, .. } => {
            // a sequence insertion shifts queued positions, so settle them first
            if ordered {
                unroll_pending(g, id);
            }
            quantifier_mut(g, id).pending.push(*index);
            g.push_delayed(Delayed::Unroll(id));
        }
        Event::Removed { index, .. } => {
            unroll_pending(g, id);
            let Some(last) = quantifier(g, id).unrolled.len().checked_sub(1) else {
                return;
            };
            if ordered {
                roll_at(g, id, *index, true);
            } else {
                if *index < last {
                    swap_positions(g, id, *index, last);
                }
                roll_at(g, id, last, true);
            }
        }
        Event::Swapped { a, b } => {
            unroll_pending(g, id);
            if a != b {
                swap_positions(g, id, *a.min(b), *a.max(b));
            }
        }
        Event::MemberChanged { .. }
        | Event::MemberDefined { .. }
        | Event::MemberUndefined { .. } => {}
        Event::Changed(_)
        | Event::Defined
        | Event::Undefined
        | Event::PartsChanged { .. }
        | Event::Replaced => {
            reroll(g, id);
            debug!(quantifier = %id, "rerolled quantifier");
        }
    }
}

fn on_condition_event(g: &mut Graph, id: NodeId, position: usize) {
    let Some(entry) = quantifier(g, id).unrolled.get(position) else {
        return;
    };
    let Some(guard) = entry.guard.as_ref() else {
        return;
    };
    let holds = g.violation(guard.node) == 0;
    if holds == guard.holds {
        return;
    }
    let iter = entry.iter;
    let q = quantifier_mut(g, id);
    if let Some(guard) = q.unrolled[position].guard.as_mut() {
        guard.holds = holds;
    }
    if holds {
        let index = q.body_index_for(position);
        q.unrolled[position].expr_index = Some(index);
        q.shift_bodies_from(position + 1, 1);
        insert_body(g, id, index, iter, true);
    } else if let Some(index) = q.unrolled[position].expr_index.take() {
        q.shift_bodies_from(position + 1, -1);
        remove_body(g, id, index, true);
    }
}
