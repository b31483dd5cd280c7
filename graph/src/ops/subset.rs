//! Inclusion between sets and multisets.
//!
//! `missing` counts left members (with multiplicity) that have no partner on
//! the right: the sum over distinct hashes of `max(0, left - right)`. Every
//! membership event moves one hash by one copy, which changes `missing` by
//! at most one.

use crate::event::Event;
use crate::expr::{Expr, SubsetKind};
use crate::view::View;
use crate::Graph;
use tarn_core::{HashType, NodeId, LARGE_VIOLATION};

fn parts(g: &Graph, id: NodeId) -> (SubsetKind, NodeId, NodeId, u64) {
    match g.expr(id) {
        Expr::Subset(s) => (s.kind, s.left, s.right, s.missing),
        other => unreachable!("subset handler on {} node {}", other.name(), id),
    }
}

fn set_missing(g: &mut Graph, id: NodeId, missing: u64) {
    if let Expr::Subset(s) = g.expr_mut(id) {
        s.missing = missing;
    }
}

/// Copies of `hash` held by a set or multiset view.
fn count(g: &Graph, id: NodeId, hash: HashType) -> u64 {
    match g.view(id) {
        View::Set(view) => view.contains(hash) as u64,
        View::MSet(view) => view.count(hash) as u64,
        other => unreachable!("inclusion test on {} view", other.kind()),
    }
}

fn distinct_hashes(g: &Graph, id: NodeId) -> Vec<HashType> {
    match g.view(id) {
        View::Set(view) => view.member_hashes().to_vec(),
        View::MSet(view) => view.counts().map(|(hash, _)| hash).collect(),
        other => unreachable!("inclusion test on {} view", other.kind()),
    }
}

/// `missing` from a full scan.
pub(crate) fn scan(g: &Graph, left: NodeId, right: NodeId) -> u64 {
    distinct_hashes(g, left)
        .into_iter()
        .map(|hash| count(g, left, hash).saturating_sub(count(g, right, hash)))
        .sum()
}

fn violation(g: &Graph, kind: SubsetKind, left: NodeId, right: NodeId, missing: u64) -> u64 {
    match kind {
        SubsetKind::SubsetEq | SubsetKind::MSetSubsetEq => missing,
        SubsetKind::Subset => {
            let (a, b) = (g.size(left) as u64, g.size(right) as u64);
            missing + (a + 1).saturating_sub(b)
        }
    }
}

/// The violation a full scan yields.
pub(crate) fn expected(g: &Graph, id: NodeId) -> View {
    let (kind, left, right, _) = parts(g, id);
    if !g.is_defined(left) || !g.is_defined(right) {
        return View::Bool(LARGE_VIOLATION);
    }
    View::Bool(violation(g, kind, left, right, scan(g, left, right)))
}

pub(crate) fn reset(g: &mut Graph, id: NodeId) {
    let (_, left, right, _) = parts(g, id);
    let missing = if g.is_defined(left) && g.is_defined(right) {
        scan(g, left, right)
    } else {
        0
    };
    set_missing(g, id, missing);
    let view = expected(g, id);
    g.store(id, Some(view));
}

/// Handle an event from the left (slot 0) or right (slot 1) operand.
pub(crate) fn on_event(g: &mut Graph, id: NodeId, slot: usize, event: &Event) {
    let before = g.snapshot(id);
    let (kind, left, right, missing) = parts(g, id);
    let same = g.resolve(left) == g.resolve(right);
    if same || !g.is_defined(left) || !g.is_defined(right) {
        reset(g, id);
        g.publish(id, before);
        return;
    }
    let on_left = slot == 0;
    let current = |g: &Graph, hash: HashType| (count(g, left, hash), count(g, right, hash));
    let g_ref: &Graph = g;
    let mut missing = missing as i64;
    match event {
        Event::Added { member, .. } => {
            let (l, r) = current(g_ref, g_ref.hash_of(*member));
            if on_left && l > r {
                missing += 1;
            } else if !on_left && l >= r {
                missing -= 1;
            }
        }
        Event::Removed { hash, .. } => {
            let (l, r) = current(g_ref, *hash);
            if on_left && l + 1 > r {
                missing -= 1;
            } else if !on_left && l > r {
                missing += 1;
            }
        }
        Event::MemberChanged { index, prior } => {
            let operand = if on_left { left } else { right };
            let Some(new) = g_ref.view(operand).member_hash(*index) else {
                return;
            };
            let old = prior.hash();
            if old == new {
                return;
            }
            let (l_old, r_old) = current(g_ref, old);
            let (l_new, r_new) = current(g_ref, new);
            if on_left {
                if l_old + 1 > r_old {
                    missing -= 1;
                }
                if l_new > r_new {
                    missing += 1;
                }
            } else {
                if l_old > r_old {
                    missing += 1;
                }
                if l_new >= r_new {
                    missing -= 1;
                }
            }
        }
        Event::Swapped { .. } | Event::PartsChanged { .. } => return,
        Event::Changed(_)
        | Event::Defined
        | Event::Undefined
        | Event::MemberDefined { .. }
        | Event::MemberUndefined { .. }
        | Event::Replaced => {
            reset(g, id);
            g.publish(id, before);
            return;
        }
    }
    let missing = missing.max(0) as u64;
    set_missing(g, id, missing);
    g.store(id, Some(View::Bool(violation(g, kind, left, right, missing))));
    g.publish(id, before);
}
