//! Set-producing operators: intersection, integer and enum ranges, function
//! preimages and defined sets, power sets, partition parties and parts.
//!
//! Intersections and the two function sets follow member-level events with
//! deltas.
//! Other events, and the partition operators, compute the literal members the
//! result should hold and reconcile the cached set with that target, removing
//! and adding only the members that differ.

use crate::event::Event;
use crate::expr::{Expr, SetOpKind};
use crate::node::{Pool, ValueBase};
use crate::view::View;
use crate::Graph;
use std::collections::HashSet;
use tarn_core::{EngineResult, HashType, Literal, NodeId, VarId};
use tracing::{debug, warn};

fn parts(g: &Graph, id: NodeId) -> (SetOpKind, Vec<NodeId>) {
    match g.expr(id) {
        Expr::SetOp(op) => (op.kind, op.operands.to_vec()),
        other => unreachable!("set operator handler on {} node {}", other.name(), id),
    }
}

/// The members the result should hold; `None` when undefined.
pub(crate) fn targets(g: &Graph, id: NodeId) -> Option<Vec<Literal>> {
    let (kind, operands) = parts(g, id);
    if operands.iter().any(|o| !g.is_defined(*o)) {
        return None;
    }
    let literals = match kind {
        SetOpKind::Intersect => {
            let right = g.set_view(operands[1]);
            let mut out = Vec::new();
            for (member, hash) in g
                .set_view(operands[0])
                .members()
                .iter()
                .zip(g.set_view(operands[0]).member_hashes())
            {
                if right.contains(*hash) {
                    out.push(g.literal_of(*member)?);
                }
            }
            out
        }
        SetOpKind::IntRange => {
            let (lower, upper) = (g.int(operands[0]), g.int(operands[1]));
            (lower..=upper).map(Literal::Int).collect()
        }
        SetOpKind::Preimage => {
            let function = g.function_view(operands[0]);
            let hash = g.hash_of(operands[1]);
            let mut out = Vec::new();
            for slot in 0..function.len() {
                if function.image_hash(slot) == Some(hash) {
                    out.push(function.preimages().value_of(slot)?);
                }
            }
            out
        }
        SetOpKind::Party => {
            let partition = g.partition_view(operands[1]);
            let member = partition.index_of(g.hash_of(operands[0]))?;
            partition
                .part_members(partition.part_of(member))
                .into_iter()
                .map(|m| g.literal_of(partition.members()[m]))
                .collect::<Option<Vec<_>>>()?
        }
        SetOpKind::EnumRange => {
            let (lower, upper) = (g.enum_value(operands[0]), g.enum_value(operands[1]));
            (lower..=upper).map(Literal::Enum).collect()
        }
        SetOpKind::FunctionDefined => {
            let function = g.function_view(operands[0]);
            (0..function.len())
                .filter(|slot| function.image(*slot).is_some())
                .map(|slot| function.preimages().value_of(slot))
                .collect::<Option<Vec<_>>>()?
        }
        SetOpKind::PowerSet(max_size) => {
            let members = g
                .set_view(operands[0])
                .members()
                .iter()
                .map(|m| g.literal_of(*m))
                .collect::<Option<Vec<_>>>()?;
            let max_size = max_size.unwrap_or(members.len()).min(members.len());
            if subset_count(members.len(), max_size)? > g.config.power_set_limit {
                debug!(node = %id, size = members.len(), "power set too large to enumerate");
                return None;
            }
            let mut out = Vec::new();
            subsets(&members, max_size, &mut Vec::new(), 0, &mut out);
            out
        }
        SetOpKind::Parts => {
            let partition = g.partition_view(operands[0]);
            partition
                .non_empty_parts()
                .into_iter()
                .map(|part| {
                    partition
                        .part_members(part)
                        .into_iter()
                        .map(|m| g.literal_of(partition.members()[m]))
                        .collect::<Option<Vec<_>>>()
                        .map(Literal::Set)
                })
                .collect::<Option<Vec<_>>>()?
        }
    };
    Some(literals)
}

/// Number of subsets of an `n`-set with at most `k` members; `None` on overflow.
fn subset_count(n: usize, k: usize) -> Option<usize> {
    let mut total: usize = 1;
    let mut choose: usize = 1;
    for i in 1..=k {
        choose = choose.checked_mul(n - i + 1)? / i;
        total = total.checked_add(choose)?;
    }
    Some(total)
}

/// Push every subset of `members[from..]` extending `chosen`, up to `max_size` members.
fn subsets(members: &[Literal], max_size: usize, chosen: &mut Vec<Literal>, from: usize, out: &mut Vec<Literal>) {
    out.push(Literal::set(chosen.clone()));
    if chosen.len() == max_size {
        return;
    }
    for i in from..members.len() {
        chosen.push(members[i].clone());
        subsets(members, max_size, chosen, i + 1, out);
        chosen.pop();
    }
}

fn add_literal(g: &mut Graph, id: NodeId, literal: &Literal, notify: bool) -> EngineResult<()> {
    let base = ValueBase {
        pool: Pool::Container(id),
        id: VarId::new(g.size(id)),
    };
    let leaf = g.alloc_value(literal, base, None)?;
    if notify {
        g.add_member_and_notify(id, leaf);
    } else if let View::Set(view) = g.own_view_mut(id) {
        view.push(leaf, literal.hash());
    }
    Ok(())
}

/// Remove the member hashing to `hash`, if present.
fn remove_hash(g: &mut Graph, id: NodeId, hash: HashType) {
    if let Some(index) = g.set_view(id).index_of(hash) {
        let removed = g.remove_member_and_notify(id, index);
        crate::eval::free_value(g, removed);
    }
}

fn clear(g: &mut Graph, id: NodeId) {
    let members = match g.own_view_mut(id) {
        View::Set(view) => view.clear(),
        _ => Vec::new(),
    };
    for member in members {
        crate::eval::free_value(g, member);
    }
}

/// Drop every member and rebuild from the operands.
///
/// A member that cannot be allocated leaves the result empty and undefined.
pub(crate) fn rebuild(g: &mut Graph, id: NodeId, notify: bool) -> EngineResult<()> {
    let was_defined = g.is_defined(id);
    let old_hash = g.node(id).view.hash();
    clear(g, id);
    let targets = targets(g, id);
    let filled = targets
        .iter()
        .flatten()
        .try_for_each(|literal| add_literal(g, id, literal, false));
    if filled.is_err() {
        clear(g, id);
    }
    let defined = targets.is_some() && filled.is_ok();
    g.set_defined(id, defined);
    if notify {
        match (was_defined, defined) {
            (true, false) => g.notify(id, &Event::Undefined),
            (false, true) => g.notify(id, &Event::Defined),
            (true, true) if g.node(id).view.hash() != old_hash => g.notify(id, &Event::Replaced),
            _ => {}
        }
    }
    filled
}

/// Reconcile the cached members with the operands, touching only the
/// members that differ.
pub(crate) fn resync(g: &mut Graph, id: NodeId) -> EngineResult<()> {
    let targets = targets(g, id);
    let (Some(targets), true) = (&targets, g.is_defined(id)) else {
        if targets.is_some() != g.is_defined(id) {
            return rebuild(g, id, true);
        }
        return Ok(());
    };
    let wanted: HashSet<HashType> = targets.iter().map(Literal::hash).collect();
    for index in (0..g.size(id)).rev() {
        let hash = g.set_view(id).member_hashes()[index];
        if !wanted.contains(&hash) {
            let removed = g.remove_member_and_notify(id, index);
            crate::eval::free_value(g, removed);
        }
    }
    for literal in targets {
        if !g.set_view(id).contains(literal.hash()) {
            add_literal(g, id, literal, true)?;
        }
    }
    Ok(())
}

/// Handle an event from operand `slot`.
pub(crate) fn on_event(g: &mut Graph, id: NodeId, slot: usize, event: &Event) {
    if let Err(error) = apply(g, id, slot, event) {
        warn!(node = %id, %error, "set operator left undefined");
        let was_defined = g.is_defined(id);
        clear(g, id);
        g.set_defined(id, false);
        if was_defined {
            g.notify(id, &Event::Undefined);
        }
    }
}

fn apply(g: &mut Graph, id: NodeId, slot: usize, event: &Event) -> EngineResult<()> {
    let (kind, operands) = parts(g, id);
    if !g.is_defined(id) || operands.iter().any(|o| !g.is_defined(*o)) {
        return resync(g, id);
    }
    match (kind, event) {
        (SetOpKind::Intersect, Event::Added { member, .. }) => {
            intersect_offer(g, id, operands[1 - slot], *member)
        }
        (SetOpKind::Intersect, Event::Removed { hash, .. }) => {
            remove_hash(g, id, *hash);
            Ok(())
        }
        (SetOpKind::Intersect, Event::MemberChanged { index, prior }) => {
            // the old hash has left this side, so it cannot be common any more
            remove_hash(g, id, prior.hash());
            match g.view(operands[slot]).member_at(*index) {
                Some(member) => intersect_offer(g, id, operands[1 - slot], member),
                None => resync(g, id),
            }
        }
        (SetOpKind::Intersect, Event::Swapped { .. }) => Ok(()),
        (
            SetOpKind::Preimage,
            Event::MemberChanged { index, .. }
            | Event::MemberDefined { index }
            | Event::MemberUndefined { index },
        ) if slot == 0 => function_slot(g, id, kind, &operands, *index),
        (SetOpKind::FunctionDefined, Event::MemberChanged { .. }) => Ok(()),
        (SetOpKind::FunctionDefined, Event::MemberDefined { index } | Event::MemberUndefined { index }) => {
            function_slot(g, id, kind, &operands, *index)
        }
        (SetOpKind::Preimage | SetOpKind::FunctionDefined, Event::Swapped { a, b }) if slot == 0 => {
            function_slot(g, id, kind, &operands, *a)?;
            function_slot(g, id, kind, &operands, *b)
        }
        _ => resync(g, id),
    }
}

/// `member` joined one side of an intersection: keep it if `other` has it.
fn intersect_offer(g: &mut Graph, id: NodeId, other: NodeId, member: NodeId) -> EngineResult<()> {
    let hash = g.hash_of(member);
    if !g.set_view(other).contains(hash) || g.set_view(id).contains(hash) {
        return Ok(());
    }
    match g.literal_of(member) {
        Some(literal) => add_literal(g, id, &literal, true),
        None => resync(g, id),
    }
}

/// Image of `slot` changed. Its preimage belongs in a preimage set when the
/// image equals the value, and in a defined set when there is an image.
fn function_slot(g: &mut Graph, id: NodeId, kind: SetOpKind, operands: &[NodeId], slot: usize) -> EngineResult<()> {
    let view = g.function_view(operands[0]);
    let holds = match kind {
        SetOpKind::Preimage => view.image_hash(slot) == Some(g.hash_of(operands[1])),
        _ => view.image(slot).is_some(),
    };
    let Some(preimage) = view.preimages().value_of(slot) else {
        return resync(g, id);
    };
    let present = g.set_view(id).contains(preimage.hash());
    match (holds, present) {
        (true, false) => add_literal(g, id, &preimage, true),
        (false, true) => {
            remove_hash(g, id, preimage.hash());
            Ok(())
        }
        _ => Ok(()),
    }
}
