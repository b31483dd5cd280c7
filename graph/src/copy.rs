//! Deep copies of expression subtrees, used to unroll quantifier bodies.
//!
//! Shared nodes (constants, value leaves and iterators outside the
//! substitution map) are referenced, not copied. Every owned operator is
//! cloned with its incremental state cleared, so the copy must be evaluated
//! before use.

use crate::expr::Expr;
use crate::literal::emptied;
use crate::node::Node;
use crate::quantifier::Quantifier;
use crate::reference::Reference;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::NodeId;

/// Copy the subtree at `id`, replacing every key of `map` by its value.
pub(crate) fn deep_copy(g: &mut Graph, id: NodeId, map: &HashMap<NodeId, NodeId>) -> NodeId {
    if let Some(replacement) = map.get(&id) {
        return *replacement;
    }
    if g.is_constant(id) {
        return id;
    }
    match g.expr(id) {
        Expr::Value(_) | Expr::Undefined | Expr::Iter(_) => id,
        Expr::Quantifier(_) => copy_quantifier(g, id, map),
        _ => copy_operator(g, id, map),
    }
}

fn copy_operator(g: &mut Graph, id: NodeId, map: &HashMap<NodeId, NodeId>) -> NodeId {
    let mut expr = g.expr(id).clone();
    let operands = g.expr(id).operands();
    let mut seen = Vec::with_capacity(operands.len());
    for operand in operands {
        if seen.contains(&operand) {
            continue;
        }
        seen.push(operand);
        let copy = deep_copy(g, operand, map);
        if copy != operand {
            expr.replace_operand(operand, copy);
        }
    }
    clear_state(&mut expr);
    let view = emptied(&g.node(id).view);
    g.alloc(Node::new(expr, view))
}

fn copy_quantifier(g: &mut Graph, id: NodeId, map: &HashMap<NodeId, NodeId>) -> NodeId {
    let (container, template, placeholder, condition) = match g.expr(id) {
        Expr::Quantifier(q) => (q.container, q.template, q.placeholder, q.condition),
        _ => unreachable!("copy_quantifier on {}", id),
    };
    let container = deep_copy(g, container, map);

    let placeholder_view = emptied(&g.node(placeholder).view);
    let fresh = g.alloc(Node::new(Expr::Iter(Reference::default()), placeholder_view));
    g.node_mut(fresh).flags.evaluated = true;

    let mut inner = map.clone();
    inner.insert(placeholder, fresh);
    let template = deep_copy(g, template, &inner);
    let condition = condition.map(|c| deep_copy(g, c, &inner));

    let view = emptied(&g.node(id).view);
    let quantifier = Quantifier::new(container, template, fresh, condition);
    g.alloc(Node::new(Expr::Quantifier(Box::new(quantifier)), view))
}

/// Forget everything an operator learnt while evaluating or triggering.
fn clear_state(expr: &mut Expr) {
    match expr {
        Expr::Equality(eq) => {
            // forwarding never applies below a quantifier
            eq.lock.disable();
            eq.defines = None;
        }
        Expr::Fold(fold) => {
            fold.counts.clear();
            fold.reported.clear();
        }
        Expr::Subset(subset) => subset.missing = 0,
        Expr::Index(index) => {
            index.reference = Reference::default();
            index.position = None;
            index.container_trigger = None;
        }
        Expr::SetLit(lit) => {
            lit.hashes.clear();
            lit.counts.clear();
        }
        Expr::Members(lit) => lit.undefined = 0,
        _ => {}
    }
}
