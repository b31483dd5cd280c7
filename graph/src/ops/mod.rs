//! Operator library.
//!
//! Fixed-arity operators (`Op`) are recomputed from scratch here; the other
//! operator families keep incremental state and live in their own modules.

pub(crate) mod equality;
pub(crate) mod flatten;
pub(crate) mod fold;
pub(crate) mod index;
pub(crate) mod members;
pub(crate) mod set_lit;
pub(crate) mod set_ops;
pub(crate) mod subset;

use crate::expr::{Expr, OpKind};
use crate::view::View;
use crate::Graph;
use std::collections::HashMap;
use tarn_core::{distance, saturate, NodeId, LARGE_VIOLATION};

/// Full recomputation of a fixed-arity operator; `None` means undefined.
pub(crate) fn compute(g: &Graph, id: NodeId) -> Option<View> {
    let Expr::Op(op) = g.expr(id) else {
        unreachable!("compute on non-operator {}", id);
    };
    let operands = &op.operands;
    let view = match &op.kind {
        OpKind::Not => View::Bool(match g.view_if_defined(operands[0]) {
            Some(View::Bool(0)) => 1,
            Some(_) => 0,
            None => LARGE_VIOLATION,
        }),
        OpKind::Implies => View::Bool(implies(g, operands[0], operands[1])),
        OpKind::Less => View::Bool(compare(g, operands[0], operands[1], |a, b| {
            if a < b {
                0
            } else {
                saturate(distance(a, b) + 1)
            }
        })),
        OpKind::LessEq => View::Bool(compare(g, operands[0], operands[1], |a, b| {
            if a <= b {
                0
            } else {
                distance(a, b)
            }
        })),
        OpKind::NotEq => View::Bool(
            match (g.is_defined(operands[0]), g.is_defined(operands[1])) {
                (true, true) => (g.hash_of(operands[0]) == g.hash_of(operands[1])) as u64,
                _ => LARGE_VIOLATION,
            },
        ),
        OpKind::InDomain(domain) => View::Bool(match g.int_if_defined(operands[0]) {
            Some(value) => domain.distance(value).violation,
            None => LARGE_VIOLATION,
        }),
        OpKind::In => View::Bool(membership(g, operands[0], operands[1])),
        OpKind::Together => View::Bool(together(g, operands[0], operands[1])),
        OpKind::IsDefined => View::Bool(!g.is_defined(operands[0]) as u64),
        OpKind::Amplify(factor) => {
            View::Bool(saturate(g.violation(operands[0]).saturating_mul(*factor)))
        }
        OpKind::ToInt => View::Int((g.violation_if_defined(operands[0])? == 0) as i64),
        OpKind::Minus => {
            View::Int(g.int_if_defined(operands[0])?.wrapping_sub(g.int_if_defined(operands[1])?))
        }
        OpKind::Negate => View::Int(g.int_if_defined(operands[0])?.wrapping_neg()),
        OpKind::Abs => View::Int(g.int_if_defined(operands[0])?.wrapping_abs()),
        OpKind::Mod => {
            let (a, b) = (g.int_if_defined(operands[0])?, g.int_if_defined(operands[1])?);
            View::Int(a.checked_sub(b.checked_mul(floor_div(a, b)?)?)?)
        }
        OpKind::Div => View::Int(floor_div(
            g.int_if_defined(operands[0])?,
            g.int_if_defined(operands[1])?,
        )?),
        OpKind::Power => {
            let (base, exponent) = (g.int_if_defined(operands[0])?, g.int_if_defined(operands[1])?);
            if exponent < 0 {
                return None;
            }
            View::Int(base.wrapping_pow(u32::try_from(exponent).unwrap_or(u32::MAX)))
        }
        OpKind::SetSize | OpKind::MSetSize | OpKind::SequenceSize | OpKind::PartitionSize => {
            View::Int(g.view_if_defined(operands[0])?.len() as i64)
        }
    };
    Some(view)
}

/// Floor division; `None` on division by zero or overflow.
pub(crate) fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn implies(g: &Graph, premise: NodeId, conclusion: NodeId) -> u64 {
    match g.view_if_defined(premise) {
        None => LARGE_VIOLATION,
        Some(View::Bool(0)) => g.violation(conclusion),
        Some(_) => 0,
    }
}

fn compare(g: &Graph, left: NodeId, right: NodeId, f: impl Fn(i64, i64) -> u64) -> u64 {
    match (g.int_if_defined(left), g.int_if_defined(right)) {
        (Some(a), Some(b)) => f(a, b),
        _ => LARGE_VIOLATION,
    }
}

fn membership(g: &Graph, value: NodeId, container: NodeId) -> u64 {
    if !g.is_defined(value) || !g.is_defined(container) {
        return LARGE_VIOLATION;
    }
    let hash = g.hash_of(value);
    let present = match g.view(container) {
        View::Set(view) => view.contains(hash),
        View::MSet(view) => view.count(hash) > 0,
        other => unreachable!("membership test on {} view", other.kind()),
    };
    !present as u64
}

/// How many members of `set` must move for all of them to share one part.
fn together(g: &Graph, set: NodeId, partition: NodeId) -> u64 {
    if !g.is_defined(set) || !g.is_defined(partition) {
        return LARGE_VIOLATION;
    }
    let set = g.set_view(set);
    if set.is_empty() {
        return 0;
    }
    let partition = g.partition_view(partition);
    let mut per_part: HashMap<usize, u64> = HashMap::new();
    for hash in set.member_hashes() {
        let Some(member) = partition.index_of(*hash) else {
            return LARGE_VIOLATION;
        };
        *per_part.entry(partition.part_of(member)).or_default() += 1;
    }
    let largest = per_part.values().copied().max().unwrap_or(0);
    set.len() as u64 - largest
}
