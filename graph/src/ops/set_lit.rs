//! Set literals: `{a, b, c}` over arbitrary operands.
//!
//! Operands may share a value, so members are synthesized leaves holding one
//! copy per distinct operand hash, and a per-hash operand count decides when
//! a member appears or disappears.

use crate::event::Event;
use crate::expr::Expr;
use crate::node::{Pool, ValueBase};
use crate::view::View;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::{HashType, NodeId, VarId};

fn operands(g: &Graph, id: NodeId) -> Vec<NodeId> {
    match g.expr(id) {
        Expr::SetLit(lit) => lit.operands.clone(),
        other => unreachable!("set literal handler on {} node {}", other.name(), id),
    }
}

fn leaf_base(id: NodeId, index: usize) -> ValueBase {
    ValueBase {
        pool: Pool::Container(id),
        id: VarId::new(index),
    }
}

/// Drop every member and rebuild from the operands.
pub(crate) fn rebuild(g: &mut Graph, id: NodeId, notify: bool) {
    let was_defined = g.is_defined(id);
    let old_hash = g.node(id).view.hash();
    let members = match g.own_view_mut(id) {
        View::Set(view) => view.clear(),
        _ => Vec::new(),
    };
    for member in members {
        crate::eval::free_value(g, member);
    }
    let operands = operands(g, id);
    let defined = operands.iter().all(|o| g.is_defined(*o));
    let mut hashes = Vec::with_capacity(operands.len());
    let mut counts: HashMap<HashType, usize> = HashMap::new();
    if defined {
        for operand in &operands {
            let hash = g.hash_of(*operand);
            hashes.push(hash);
            let count = counts.entry(hash).or_insert(0);
            *count += 1;
            if *count == 1 {
                let index = g.size(id);
                let leaf = g.alloc_copy(*operand, leaf_base(id, index));
                if let View::Set(view) = g.own_view_mut(id) {
                    view.push(leaf, hash);
                }
            }
        }
    }
    if let Expr::SetLit(lit) = g.expr_mut(id) {
        lit.hashes = hashes;
        lit.counts = counts;
    }
    g.set_defined(id, defined);
    if !notify {
        return;
    }
    match (was_defined, defined) {
        (true, false) => g.notify(id, &Event::Undefined),
        (false, true) => g.notify(id, &Event::Defined),
        (true, true) if g.node(id).view.hash() != old_hash => g.notify(id, &Event::Replaced),
        _ => {}
    }
}

/// An operand changed value or definedness.
pub(crate) fn on_event(g: &mut Graph, id: NodeId, slot: usize, event: &Event) {
    let operands = operands(g, id);
    let all_defined = operands.iter().all(|o| g.is_defined(*o));
    if event.is_definedness() || !all_defined || !g.is_defined(id) {
        rebuild(g, id, true);
        return;
    }
    let operand = operands[slot];
    let new = g.hash_of(operand);
    let (old, old_gone, new_fresh) = match g.expr_mut(id) {
        Expr::SetLit(lit) => {
            let old = lit.hashes[slot];
            if old == new {
                return;
            }
            lit.hashes[slot] = new;
            let old_gone = match lit.counts.get_mut(&old) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                _ => {
                    lit.counts.remove(&old);
                    true
                }
            };
            let count = lit.counts.entry(new).or_insert(0);
            *count += 1;
            (old, old_gone, *count == 1)
        }
        _ => return,
    };
    let old_index = g.set_view(id).index_of(old);
    match (old_gone, new_fresh, old_index) {
        (true, true, Some(index)) if !g.kind(operand).is_container() => {
            let leaf = g.set_view(id).members()[index];
            let view = g.view(operand).clone();
            g.assign_scalar(leaf, view);
        }
        (true, true, Some(index)) => {
            let removed = g.remove_member_and_notify(id, index);
            crate::eval::free_value(g, removed);
            add_copy(g, id, operand);
        }
        (true, false, Some(index)) => {
            let removed = g.remove_member_and_notify(id, index);
            crate::eval::free_value(g, removed);
        }
        (false, true, _) => add_copy(g, id, operand),
        _ => {}
    }
}

fn add_copy(g: &mut Graph, id: NodeId, operand: NodeId) {
    let index = g.size(id);
    let leaf = g.alloc_copy(operand, leaf_base(id, index));
    g.add_member_and_notify(id, leaf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::{AnyDomain, Literal};

    // ========== TEST: shared_values_collapse ==========
    #[test]
    fn test_shared_values_collapse() {
        // GIVEN {x, y} with x = y = 3
        let mut g = Graph::default();
        let domain = AnyDomain::int_range(0, 9).unwrap();
        let x = g.variable(domain.clone(), Literal::Int(3)).unwrap();
        let y = g.variable(domain, Literal::Int(3)).unwrap();
        let set = g.set_lit(vec![x, y]).unwrap();
        let size = g.size_of(set).unwrap();
        g.evaluate(size);
        g.start_triggering(size);
        assert_eq!(g.int(size), 1);

        // WHEN x moves away
        g.assign(x, Literal::Int(4)).unwrap();
        assert_eq!(g.int(size), 2);

        // WHEN y follows
        g.assign(y, Literal::Int(4)).unwrap();
        assert_eq!(g.int(size), 1);

        // WHEN x moves to a fresh value, reusing its member
        g.assign(x, Literal::Int(8)).unwrap();
        assert_eq!(g.int(size), 2);
        assert_eq!(
            g.literal_of(set),
            Some(Literal::set(Literal::ints([4, 8])))
        );
        assert!(g.debug_sanity_check(size).is_ok());
    }
}
