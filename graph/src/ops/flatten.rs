//! One level of sequence flattening.
//!
//! The result lists the members of the inner sequences in order. Members are
//! shared with the inner sequences, never owned. A value change that keeps
//! every member in place becomes per-position member events; anything that
//! moves members rebuilds the view and reports a replacement.

use crate::event::{Event, Prior};
use crate::expr::Expr;
use crate::view::{SequenceView, View};
use crate::Graph;
use tarn_core::{HashType, Kind, NodeId};

fn operand(g: &Graph, id: NodeId) -> NodeId {
    match g.expr(id) {
        Expr::Flatten(flatten) => flatten.operand,
        other => unreachable!("flatten handler on {} node {}", other.name(), id),
    }
}

/// Member nodes and hashes the result should hold, in order.
pub(crate) fn flattened(g: &Graph, operand: NodeId) -> Vec<(NodeId, HashType)> {
    g.view(operand)
        .members()
        .into_iter()
        .flat_map(|inner| g.view(inner).members())
        .map(|member| (member, g.hash_of(member)))
        .collect()
}

pub(crate) fn rebuild(g: &mut Graph, id: NodeId) {
    let operand = operand(g, id);
    let defined = g.is_defined(operand);
    let inner = g.node(id).view.inner_kind().unwrap_or(Kind::Int);
    let mut view = SequenceView::new(inner);
    if defined {
        for (member, hash) in flattened(g, operand) {
            view.push(member, hash);
        }
    }
    let node = g.node_mut(id);
    node.view = View::Sequence(view);
    node.flags.defined = defined;
}

pub(crate) fn on_event(g: &mut Graph, id: NodeId) {
    let operand = operand(g, id);
    let was_defined = g.is_defined(id);
    let now_defined = g.is_defined(operand);
    if was_defined && now_defined {
        let target = flattened(g, operand);
        let view = &g.node(id).view;
        let in_place = target.len() == view.len()
            && target
                .iter()
                .enumerate()
                .all(|(index, (member, _))| view.member_at(index) == Some(*member));
        if in_place {
            for (index, (_, hash)) in target.into_iter().enumerate() {
                let old = g.own_view_mut(id).rehash_member(index, hash);
                if old != hash {
                    g.notify(
                        id,
                        &Event::MemberChanged {
                            index,
                            prior: Prior::Hash(old),
                        },
                    );
                }
            }
            return;
        }
    }
    rebuild(g, id);
    match (was_defined, now_defined) {
        (true, false) => g.notify(id, &Event::Undefined),
        (false, true) => g.notify(id, &Event::Defined),
        (true, true) => g.notify(id, &Event::Replaced),
        (false, false) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::{AnyDomain, Literal};

    fn ints(g: &Graph, id: NodeId) -> Vec<i64> {
        g.members(id).into_iter().map(|m| g.int(m)).collect()
    }

    // ========== TEST: flatten_follows_inner_values_and_structure ==========
    #[test]
    fn test_flatten_follows_inner_values_and_structure() {
        // GIVEN flatten([[x, 2], [], [y]]) summed, with x = 1 and y = 3
        let mut g = Graph::default();
        let domain = AnyDomain::int_range(0, 9).unwrap();
        let x = g.variable(domain.clone(), Literal::Int(1)).unwrap();
        let y = g.variable(domain, Literal::Int(3)).unwrap();
        let two = g.constant(Literal::Int(2));
        let first = g.sequence_lit(vec![x, two]).unwrap();
        let empty = g.sequence_lit(Vec::new()).unwrap();
        let last = g.sequence_lit(vec![y]).unwrap();
        let outer = g.sequence_lit(vec![first, empty, last]).unwrap();
        let flat = g.flatten(outer).unwrap();
        let total = g.sum(flat).unwrap();
        g.evaluate(total);
        g.start_triggering(total);
        assert_eq!(ints(&g, flat), vec![1, 2, 3]);
        assert_eq!(g.int(total), 6);

        // WHEN x and y change in place
        g.assign(x, Literal::Int(7)).unwrap();
        g.assign(y, Literal::Int(0)).unwrap();

        // THEN the flattened members and the sum follow
        assert_eq!(ints(&g, flat), vec![7, 2, 0]);
        assert_eq!(g.int(total), 9);
        assert!(g.debug_sanity_check(total).is_ok());
    }

    #[test]
    fn test_flatten_of_sequence_variable_follows_inserts() {
        let mut g = Graph::default();
        let inner = AnyDomain::sequence(
            tarn_core::SizeAttr::NoSize,
            AnyDomain::int_range(0, 9).unwrap(),
            false,
        );
        let a = g
            .variable(inner.clone(), Literal::sequence(Literal::ints([4, 5])))
            .unwrap();
        let b = g.variable(inner, Literal::sequence(Literal::ints([6]))).unwrap();
        let outer = g.sequence_lit(vec![a, b]).unwrap();
        let flat = g.flatten(outer).unwrap();
        let total = g.sum(flat).unwrap();
        g.evaluate(total);
        g.start_triggering(total);
        assert_eq!(g.int(total), 15);

        g.sequence_insert(b, 0, Literal::Int(1)).unwrap();
        assert_eq!(ints(&g, flat), vec![4, 5, 1, 6]);
        assert_eq!(g.int(total), 16);
        assert!(g.debug_sanity_check(total).is_ok());
    }
}
