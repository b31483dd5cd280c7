//! Rewriting passes run once, after building and before evaluation.
//!
//! - Nested conjunction literals are flattened into their parent.
//! - Operators whose operands are all constant become constants themselves.
//! - Top-level equalities that are the only reader of a scalar decision
//!   variable are set up to write that variable (see [`crate::defined`]).

use crate::defined::DefinesLock;
use crate::expr::{Equality, EqualityKind, Expr, ExprKind, FoldKind, Side};
use crate::node::Pool;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::{Kind, NodeId};
use tracing::{debug, info};

impl Graph {
    /// Run the enabled passes on `root`; returns the root to evaluate.
    ///
    /// Does nothing once `root` has been evaluated.
    pub fn optimise(&mut self, root: NodeId) -> NodeId {
        if self.is_evaluated(root) {
            return root;
        }
        let config = self.config.clone();
        if config.flatten_conjunctions {
            flatten(self, root);
        }
        if config.constant_folding {
            let folded = fold_constants(self, root);
            debug!(folded, "marked constant subtrees");
        }
        if config.defined_var_forwarding {
            let enabled = enable_forwarding(self, root);
            info!(enabled, "defined variables");
        }
        root
    }
}

// ==================== Flattening ====================

/// The sequence literal under an unevaluated conjunction.
fn conjunction_literal(g: &Graph, id: NodeId) -> Option<NodeId> {
    let Expr::Fold(fold) = g.expr(id) else {
        return None;
    };
    if fold.kind != FoldKind::And || g.is_evaluated(id) {
        return None;
    }
    match g.expr(fold.operand) {
        Expr::Members(lit) if lit.kind == Kind::Sequence => Some(fold.operand),
        _ => None,
    }
}

fn flatten(g: &mut Graph, id: NodeId) {
    let Some(literal) = conjunction_literal(g, id) else {
        return;
    };
    let operands = g.expr(literal).operands();
    let mut flat = Vec::with_capacity(operands.len());
    let mut changed = false;
    for operand in operands {
        flatten(g, operand);
        match conjunction_literal(g, operand) {
            Some(inner) => {
                flat.extend(g.expr(inner).operands());
                g.free(inner);
                g.free(operand);
                changed = true;
            }
            None => flat.push(operand),
        }
    }
    if changed {
        if let Expr::Members(lit) = g.expr_mut(literal) {
            lit.operands = flat;
        }
    }
}

// ==================== Constant Folding ====================

/// Mark operators over constants as constant, evaluating them on the way.
/// Returns how many nodes were marked.
fn fold_constants(g: &mut Graph, id: NodeId) -> usize {
    if g.is_constant(id) {
        return 0;
    }
    let kind = g.expr(id).kind();
    if matches!(kind, ExprKind::Value | ExprKind::Iter | ExprKind::Quantifier) {
        return 0;
    }
    let operands = g.expr(id).operands();
    let mut folded = 0;
    for operand in &operands {
        folded += fold_constants(g, *operand);
    }
    if !operands.is_empty() && operands.iter().all(|o| g.is_constant(*o)) {
        crate::eval::evaluate(g, id);
        g.node_mut(id).flags.constant = true;
        folded += 1;
    }
    folded
}

// ==================== Defined Variables ====================

/// How many parents read each node below `root`, quantifier templates included.
fn count_readers(g: &Graph, root: NodeId) -> HashMap<NodeId, usize> {
    let mut readers: HashMap<NodeId, usize> = HashMap::new();
    let mut stack = vec![root];
    let mut seen = std::collections::HashSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let mut children: Vec<NodeId> = g.expr(id).operands().into_vec();
        if let Expr::Quantifier(q) = g.expr(id) {
            children.push(q.template);
            children.extend(q.condition);
        }
        for child in children {
            *readers.entry(child).or_default() += 1;
            stack.push(child);
        }
    }
    readers
}

fn is_free_scalar_variable(g: &Graph, id: NodeId, readers: &HashMap<NodeId, usize>) -> bool {
    matches!(g.value_base(id), Some(base) if base.pool == Pool::Variable)
        && !g.kind(id).is_container()
        && g.defined_by(id).is_none()
        && readers.get(&id) == Some(&1)
}

/// Conjuncts of the top-level constraint.
fn top_level_conjuncts(g: &Graph, root: NodeId) -> Vec<NodeId> {
    if let Expr::Fold(fold) = g.expr(root) {
        if fold.kind == FoldKind::And {
            if let Expr::Members(lit) = g.expr(fold.operand) {
                return lit.operands.clone();
            }
        }
    }
    vec![root]
}

fn enable_forwarding(g: &mut Graph, root: NodeId) -> usize {
    let readers = count_readers(g, root);
    let mut enabled = 0;
    for conjunct in top_level_conjuncts(g, root) {
        let (left, right) = match g.expr(conjunct) {
            Expr::Equality(Equality {
                kind: EqualityKind::Int | EqualityKind::Bool | EqualityKind::Enum,
                left,
                right,
                defines: None,
                ..
            }) => (*left, *right),
            _ => continue,
        };
        let (side, var) = if is_free_scalar_variable(g, left, &readers) {
            (Side::Left, left)
        } else if is_free_scalar_variable(g, right, &readers) {
            (Side::Right, right)
        } else {
            continue;
        };
        if let Expr::Equality(eq) = g.expr_mut(conjunct) {
            eq.defines = Some(side);
            eq.lock = DefinesLock::enabled();
        }
        g.node_mut(var).defined_by = Some(conjunct);
        debug!(var = %var, equality = %conjunct, "variable defined by equality");
        enabled += 1;
    }
    enabled
}
