//! Trigger protocol.
//!
//! A parent that depends on a child's view registers a [`Trigger`] on the
//! child. The child keeps the trigger in its listener list; the parent keeps
//! a handle so it can deactivate the trigger later. Deactivated triggers are
//! never erased eagerly: a listener list is swept once its dead fraction
//! passes the configured ratio.
//!
//! Notification is synchronous. Once the outermost notification has reached
//! every live listener, the delayed-trigger stack is drained, unless a drain
//! is already in progress further up the call stack.

use crate::event::Event;
use crate::Graph;
use smallvec::SmallVec;
use std::cell::Cell;
use std::rc::Rc;
use tarn_core::NodeId;
use tracing::debug;

/// Which events a trigger receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every event.
    All,
    /// Structural and whole-value events, no member-level events.
    Outer,
    /// Structural events plus member-level events for one index.
    Member(usize),
}

/// What the child is to the parent that registered the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A fixed operand; `slot` is its position among the parent's operands.
    Operand,
    /// A member the parent forwards; `slot` is the member's position.
    Member,
    /// The container a quantifier ranges over.
    Container,
    /// An unrolled quantifier condition; `slot` is the container position.
    Condition,
    /// The node an iterator is bound to.
    Bound,
}

/// A registered listener.
#[derive(Debug)]
pub struct Trigger {
    parent: NodeId,
    role: Role,
    slot: Cell<usize>,
    scope: Scope,
    active: Cell<bool>,
}

/// Shared handle to a trigger.
pub type TriggerRef = Rc<Trigger>;

impl Trigger {
    pub(crate) fn new(parent: NodeId, role: Role, slot: usize, scope: Scope) -> TriggerRef {
        Rc::new(Self {
            parent,
            role,
            slot: Cell::new(slot),
            scope,
            active: Cell::new(true),
        })
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn slot(&self) -> usize {
        self.slot.get()
    }

    pub(crate) fn set_slot(&self, slot: usize) {
        self.slot.set(slot);
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }

    /// Whether this trigger's scope admits `event`.
    pub fn wants(&self, event: &Event) -> bool {
        match (self.scope, event.member_index()) {
            (Scope::All, _) => true,
            (Scope::Outer, member) => member.is_none(),
            (Scope::Member(_), None) => true,
            (Scope::Member(index), Some(member)) => index == member,
        }
    }
}

/// Listener list of one node.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    triggers: Vec<TriggerRef>,
}

impl Listeners {
    pub(crate) fn push(&mut self, trigger: TriggerRef) {
        self.triggers.push(trigger);
    }

    pub(crate) fn len(&self) -> usize {
        self.triggers.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.triggers.iter().filter(|t| t.is_active()).count()
    }

    /// Live triggers interested in `event`, sweeping dead ones when they
    /// exceed `ratio` of the list.
    pub(crate) fn collect(&mut self, event: &Event, ratio: f64) -> SmallVec<[TriggerRef; 4]> {
        let mut dead = 0usize;
        let mut out = SmallVec::new();
        for trigger in &self.triggers {
            if !trigger.is_active() {
                dead += 1;
            } else if trigger.wants(event) {
                out.push(Rc::clone(trigger));
            }
        }
        if dead > 0 && dead as f64 > ratio * self.triggers.len() as f64 {
            self.sweep();
        }
        out
    }

    pub(crate) fn sweep(&mut self) {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.is_active());
        debug!(removed = before - self.triggers.len(), "swept dead triggers");
    }

    pub(crate) fn deactivate_all(&mut self) {
        for trigger in self.triggers.drain(..) {
            trigger.deactivate();
        }
    }
}

/// Work postponed until the current notification unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delayed {
    /// Unroll container members a quantifier has queued.
    Unroll(NodeId),
}

impl Graph {
    /// Register `parent` as a listener of `child`.
    ///
    /// Constants never change, so nothing is registered on them.
    pub(crate) fn subscribe(
        &mut self,
        parent: NodeId,
        child: NodeId,
        role: Role,
        slot: usize,
        scope: Scope,
    ) -> Option<TriggerRef> {
        if self.node(child).flags.constant {
            return None;
        }
        let trigger = Trigger::new(parent, role, slot, scope);
        self.node_mut(child).listeners.push(Rc::clone(&trigger));
        let ratio = self.config.dead_trigger_ratio;
        let subscriptions = &mut self.node_mut(parent).subscriptions;
        let dead = subscriptions.iter().filter(|t| !t.is_active()).count();
        if dead > 4 && dead as f64 > ratio * subscriptions.len() as f64 {
            subscriptions.retain(|t| t.is_active());
        }
        subscriptions.push(Rc::clone(&trigger));
        Some(trigger)
    }

    /// Subscribe to each fixed operand in order, slot = operand position.
    pub(crate) fn subscribe_operands(&mut self, parent: NodeId, operands: &[NodeId], scope: Scope) {
        for (slot, operand) in operands.iter().enumerate() {
            self.subscribe(parent, *operand, Role::Operand, slot, scope);
        }
    }

    /// Deactivate every trigger `parent` registered.
    pub(crate) fn unsubscribe_all(&mut self, parent: NodeId) {
        if let Some(node) = self.try_node_mut(parent) {
            for trigger in node.subscriptions.drain(..) {
                trigger.deactivate();
            }
        }
    }

    /// Deliver `event` from `child` to its listeners; the outermost delivery
    /// then drains delayed work.
    pub(crate) fn notify(&mut self, child: NodeId, event: &Event) {
        let ratio = self.config.dead_trigger_ratio;
        let targets = match self.try_node_mut(child) {
            Some(node) => node.listeners.collect(event, ratio),
            None => return,
        };
        self.notify_depth += 1;
        for trigger in targets {
            // an earlier delivery may have rolled this listener out
            if trigger.is_active() && self.contains(trigger.parent()) {
                crate::expr::on_event(self, &trigger, event);
            }
        }
        self.notify_depth -= 1;
        if self.notify_depth == 0 && !self.processing_delayed {
            self.drain_delayed();
        }
    }

    pub(crate) fn push_delayed(&mut self, task: Delayed) {
        if !self.delayed.contains(&task) {
            self.delayed.push(task);
        }
    }

    /// Drain the delayed stack, most recent first.
    pub(crate) fn drain_delayed(&mut self) {
        if self.delayed.is_empty() {
            return;
        }
        self.processing_delayed = true;
        let mut drained = 0usize;
        while let Some(task) = self.delayed.pop() {
            drained += 1;
            match task {
                Delayed::Unroll(quantifier) => {
                    if self.contains(quantifier) {
                        crate::quantifier::unroll_pending(self, quantifier);
                    }
                }
            }
        }
        self.processing_delayed = false;
        debug!(drained, "drained delayed triggers");
    }
}
