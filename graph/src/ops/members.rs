//! Container literals whose members are the operand nodes themselves:
//! multiset, sequence, tuple and function literals.
//!
//! The member-event handling here is shared with quantifiers, whose body
//! copies are members in exactly the same way.

use crate::event::{Event, Prior};
use crate::expr::Expr;
use crate::literal::emptied;
use crate::view::View;
use crate::Graph;
use tarn_core::NodeId;

/// Undefined-member counter of a literal or quantifier.
fn undefined_mut(g: &mut Graph, id: NodeId) -> &mut usize {
    match g.expr_mut(id) {
        Expr::Members(lit) => &mut lit.undefined,
        Expr::Quantifier(q) => &mut q.undefined_bodies,
        _ => unreachable!("member handler on {}", id),
    }
}

/// Whether the node could be defined ignoring its members.
fn base_defined(g: &Graph, id: NodeId) -> bool {
    match g.expr(id) {
        Expr::Quantifier(q) => g.is_defined(q.container),
        _ => true,
    }
}

/// Build the view from the current operands.
pub(crate) fn rebuild(g: &mut Graph, id: NodeId) {
    let operands = match g.expr(id) {
        Expr::Members(lit) => lit.operands.clone(),
        other => unreachable!("member literal rebuild on {} node {}", other.name(), id),
    };
    // a function literal keeps its preimages
    let mut view = emptied(&g.node(id).view);
    let mut undefined = 0;
    for (index, operand) in operands.iter().enumerate() {
        let hash = g.hash_of(*operand);
        if !g.is_defined(*operand) {
            undefined += 1;
        }
        match &mut view {
            View::MSet(v) => {
                v.push(*operand, hash);
            }
            View::Sequence(v) => {
                v.push(*operand, hash);
            }
            View::Tuple(v) => v.push(*operand, hash),
            View::Function(v) => v.map(index, *operand, hash),
            _ => {}
        }
    }
    let node = g.node_mut(id);
    node.view = view;
    node.flags.defined = undefined == 0;
    *undefined_mut(g, id) = undefined;
}

/// Refresh the cached hash of member `index`; returns the old hash.
fn rehash(g: &mut Graph, id: NodeId, index: usize) -> Option<tarn_core::HashType> {
    let member = g.node(id).view.member_at(index)?;
    let hash = g.hash_of(member);
    Some(g.own_view_mut(id).rehash_member(index, hash))
}

/// Handle an event raised by the member at view position `index`.
pub(crate) fn on_member_event(g: &mut Graph, id: NodeId, index: usize, event: &Event) {
    match event {
        Event::Defined | Event::Undefined => {
            let was_defined = g.is_defined(id);
            let undefined = undefined_mut(g, id);
            if *event == Event::Defined {
                *undefined = undefined.saturating_sub(1);
            } else {
                *undefined += 1;
            }
            let now_defined = *undefined == 0 && base_defined(g, id);
            rehash(g, id, index);
            g.set_defined(id, now_defined);
            match (was_defined, now_defined) {
                (false, true) => g.notify(id, &Event::Defined),
                (true, false) => g.notify(id, &Event::Undefined),
                (true, true) | (false, false) => {
                    let member_event = if *event == Event::Defined {
                        Event::MemberDefined { index }
                    } else {
                        Event::MemberUndefined { index }
                    };
                    if now_defined {
                        g.notify(id, &member_event);
                    }
                }
            }
        }
        Event::Changed(prior) => {
            rehash(g, id, index);
            if g.is_defined(id) {
                g.notify(
                    id,
                    &Event::MemberChanged {
                        index,
                        prior: *prior,
                    },
                );
            }
        }
        _ => {
            let Some(old) = rehash(g, id, index) else {
                return;
            };
            let changed = g.node(id).view.member_hash(index) != Some(old);
            if changed && g.is_defined(id) {
                g.notify(
                    id,
                    &Event::MemberChanged {
                        index,
                        prior: Prior::Hash(old),
                    },
                );
            }
        }
    }
}
