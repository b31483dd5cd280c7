//! Aggregates over a sequence of members.
//!
//! `And` and `Sum` apply exact deltas. `Or`, `Min` and `Max` improve in place
//! and rescan only when the current extreme is removed or worsened. `Prod`
//! always rescans. `AllDiff` keeps a multiplicity per member hash.
//!
//! Deltas are taken against the contribution each member last reported,
//! never its live value.

use crate::event::{Event, Prior};
use crate::expr::{Expr, FoldKind};
use crate::view::View;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::{HashType, NodeId, LARGE_VIOLATION};

fn parts(g: &Graph, id: NodeId) -> (FoldKind, NodeId) {
    match g.expr(id) {
        Expr::Fold(fold) => (fold.kind, fold.operand),
        other => unreachable!("fold handler on {} node {}", other.name(), id),
    }
}

fn counts_mut(g: &mut Graph, id: NodeId) -> &mut HashMap<HashType, usize> {
    match g.expr_mut(id) {
        Expr::Fold(fold) => &mut fold.counts,
        _ => unreachable!("fold counts on {}", id),
    }
}

fn reported_mut(g: &mut Graph, id: NodeId) -> &mut Vec<Prior> {
    match g.expr_mut(id) {
        Expr::Fold(fold) => &mut fold.reported,
        _ => unreachable!("fold cache on {}", id),
    }
}

/// What `member` contributes to a fold of `kind` right now.
fn contribution(g: &Graph, kind: FoldKind, member: NodeId) -> Prior {
    match kind {
        FoldKind::And | FoldKind::Or => Prior::Bool(g.violation(member)),
        FoldKind::Sum | FoldKind::Prod | FoldKind::Min | FoldKind::Max => Prior::Int(g.int(member)),
        FoldKind::AllDiff => Prior::Hash(g.hash_of(member)),
    }
}

/// The value a full scan of the operand yields.
pub(crate) fn expected(g: &Graph, id: NodeId) -> Option<View> {
    let (kind, operand) = parts(g, id);
    if !g.is_defined(operand) {
        return match kind.result_kind() {
            tarn_core::Kind::Bool => Some(View::Bool(LARGE_VIOLATION)),
            _ => None,
        };
    }
    let members = g.members(operand);
    let view = match kind {
        FoldKind::And => View::Bool(
            members
                .iter()
                .fold(0u64, |acc, m| acc.saturating_add(g.violation(*m))),
        ),
        FoldKind::Or => View::Bool(members.iter().map(|m| g.violation(*m)).min().unwrap_or(1)),
        FoldKind::Sum => View::Int(
            members
                .iter()
                .fold(0i64, |acc, m| acc.wrapping_add(g.int(*m))),
        ),
        FoldKind::Prod => View::Int(
            members
                .iter()
                .fold(1i64, |acc, m| acc.wrapping_mul(g.int(*m))),
        ),
        FoldKind::Min => View::Int(members.iter().map(|m| g.int(*m)).min()?),
        FoldKind::Max => View::Int(members.iter().map(|m| g.int(*m)).max()?),
        FoldKind::AllDiff => {
            let mut counts: HashMap<HashType, u64> = HashMap::new();
            for member in &members {
                *counts.entry(g.hash_of(*member)).or_default() += 1;
            }
            View::Bool(counts.values().map(|c| c - 1).sum())
        }
    };
    Some(view)
}

/// Recompute from scratch, rebuilding the per-member cache and the
/// multiplicities of `AllDiff`.
pub(crate) fn reset(g: &mut Graph, id: NodeId) {
    let (kind, operand) = parts(g, id);
    let members = if g.is_defined(operand) {
        g.members(operand)
    } else {
        Vec::new()
    };
    let reported: Vec<Prior> = members.iter().map(|m| contribution(g, kind, *m)).collect();
    if kind == FoldKind::AllDiff {
        let mut counts = HashMap::new();
        for prior in &reported {
            *counts.entry(prior.hash()).or_insert(0) += 1;
        }
        *counts_mut(g, id) = counts;
    }
    *reported_mut(g, id) = reported;
    let outcome = expected(g, id);
    g.store(id, outcome);
}

/// Cached contributions disagreeing with the members, for the sanity pass.
pub(crate) fn stale_position(g: &Graph, id: NodeId) -> Option<usize> {
    let Expr::Fold(fold) = g.expr(id) else {
        return None;
    };
    if !g.is_defined(fold.operand) || !g.is_defined(id) {
        return None;
    }
    let members = g.members(fold.operand);
    if members.len() != fold.reported.len() {
        return Some(members.len().min(fold.reported.len()));
    }
    members
        .iter()
        .zip(&fold.reported)
        .position(|(m, prior)| contribution(g, fold.kind, *m) != *prior)
}

fn violation(g: &Graph, id: NodeId) -> u64 {
    match &g.node(id).view {
        View::Bool(violation) => *violation,
        _ => unreachable!("fold {} has no violation", id),
    }
}

fn value(g: &Graph, id: NodeId) -> i64 {
    match &g.node(id).view {
        View::Int(value) => *value,
        _ => unreachable!("fold {} has no value", id),
    }
}

fn set_view(g: &mut Graph, id: NodeId, view: View) {
    *g.own_view_mut(id) = view;
}

/// Handle an event from the operand sequence.
pub(crate) fn on_event(g: &mut Graph, id: NodeId, event: &Event) {
    let before = g.snapshot(id);
    let (kind, operand) = parts(g, id);
    if !g.is_defined(operand) || !g.is_defined(id) {
        reset(g, id);
        g.publish(id, before);
        return;
    }
    match event {
        Event::Added { index, member } => added(g, id, kind, operand, *index, *member),
        Event::Removed { index, .. } => removed(g, id, kind, operand, *index),
        Event::MemberChanged { index, .. } => match g.view(operand).member_at(*index) {
            Some(member) => changed(g, id, kind, *index, member),
            None => reset(g, id),
        },
        Event::Swapped { a, b } => {
            let reported = reported_mut(g, id);
            if *a < reported.len() && *b < reported.len() {
                reported.swap(*a, *b);
            } else {
                reset(g, id);
            }
        }
        Event::Changed(_)
        | Event::Defined
        | Event::Undefined
        | Event::MemberDefined { .. }
        | Event::MemberUndefined { .. }
        | Event::PartsChanged { .. }
        | Event::Replaced => reset(g, id),
    }
    g.publish(id, before);
}

fn added(g: &mut Graph, id: NodeId, kind: FoldKind, operand: NodeId, index: usize, member: NodeId) {
    let now = contribution(g, kind, member);
    let reported = reported_mut(g, id);
    if index > reported.len() {
        reset(g, id);
        return;
    }
    reported.insert(index, now);
    let first = g.size(operand) == 1;
    match kind {
        FoldKind::And => {
            let v = violation(g, id).saturating_add(now.violation());
            set_view(g, id, View::Bool(v));
        }
        FoldKind::Or => {
            let m = now.violation();
            let v = if first { m } else { violation(g, id).min(m) };
            set_view(g, id, View::Bool(v));
        }
        FoldKind::Sum => {
            let v = value(g, id).wrapping_add(now.int());
            set_view(g, id, View::Int(v));
        }
        FoldKind::Min | FoldKind::Max => {
            let m = now.int();
            let v = if first {
                m
            } else if kind == FoldKind::Min {
                value(g, id).min(m)
            } else {
                value(g, id).max(m)
            };
            set_view(g, id, View::Int(v));
        }
        FoldKind::Prod => reset(g, id),
        FoldKind::AllDiff => {
            let count = counts_mut(g, id).entry(now.hash()).or_insert(0);
            *count += 1;
            if *count > 1 {
                let v = violation(g, id) + 1;
                set_view(g, id, View::Bool(v));
            }
        }
    }
}

fn removed(g: &mut Graph, id: NodeId, kind: FoldKind, operand: NodeId, index: usize) {
    let reported = reported_mut(g, id);
    if index >= reported.len() {
        reset(g, id);
        return;
    }
    let old = reported.remove(index);
    match kind {
        FoldKind::And => {
            let v = violation(g, id).saturating_sub(old.violation());
            set_view(g, id, View::Bool(v));
        }
        FoldKind::Sum => {
            let v = value(g, id).wrapping_sub(old.int());
            set_view(g, id, View::Int(v));
        }
        FoldKind::Or => {
            if g.size(operand) == 0 || old.violation() == violation(g, id) {
                reset(g, id);
            }
        }
        FoldKind::Min | FoldKind::Max => {
            if g.size(operand) == 0 || old.int() == value(g, id) {
                reset(g, id);
            }
        }
        FoldKind::Prod => reset(g, id),
        FoldKind::AllDiff => {
            if uncount(g, id, old.hash()) {
                let v = violation(g, id).saturating_sub(1);
                set_view(g, id, View::Bool(v));
            }
        }
    }
}

/// Decrement a multiplicity; true when the removed copy was a duplicate.
fn uncount(g: &mut Graph, id: NodeId, hash: HashType) -> bool {
    let counts = counts_mut(g, id);
    match counts.get_mut(&hash) {
        Some(count) if *count > 1 => {
            *count -= 1;
            true
        }
        Some(_) => {
            counts.remove(&hash);
            false
        }
        None => false,
    }
}

fn changed(g: &mut Graph, id: NodeId, kind: FoldKind, index: usize, member: NodeId) {
    let now = contribution(g, kind, member);
    let Some(slot) = reported_mut(g, id).get_mut(index) else {
        reset(g, id);
        return;
    };
    let old = std::mem::replace(slot, now);
    if old == now {
        return;
    }
    match kind {
        FoldKind::And => {
            let v = violation(g, id)
                .saturating_sub(old.violation())
                .saturating_add(now.violation());
            set_view(g, id, View::Bool(v));
        }
        FoldKind::Sum => {
            let v = value(g, id).wrapping_sub(old.int()).wrapping_add(now.int());
            set_view(g, id, View::Int(v));
        }
        FoldKind::Or => {
            let (now, current) = (now.violation(), violation(g, id));
            if now < current {
                set_view(g, id, View::Bool(now));
            } else if old.violation() == current && now > current {
                reset(g, id);
            }
        }
        FoldKind::Min | FoldKind::Max => {
            let (now, current) = (now.int(), value(g, id));
            let improves = if kind == FoldKind::Min { now < current } else { now > current };
            if improves {
                set_view(g, id, View::Int(now));
            } else if old.int() == current && now != current {
                reset(g, id);
            }
        }
        FoldKind::Prod => reset(g, id),
        FoldKind::AllDiff => {
            let mut v = violation(g, id);
            if uncount(g, id, old.hash()) {
                v = v.saturating_sub(1);
            }
            let count = counts_mut(g, id).entry(now.hash()).or_insert(0);
            *count += 1;
            if *count > 1 {
                v += 1;
            }
            set_view(g, id, View::Bool(v));
        }
    }
}
