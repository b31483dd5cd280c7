//! Debug sanity checks.
//!
//! `debug_sanity_check` recomputes every cached view below a root from
//! scratch and compares. It is slow and meant for tests and for the
//! `sanity_check_after_moves` debug switch.

use crate::expr::{Expr, ExprKind};
use crate::quantifier::Quantifier;
use crate::view::View;
use crate::Graph;
use std::collections::HashSet;
use tarn_core::NodeId;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanityError {
    #[error("{node}: cached {what} is {cached} but recomputing gives {expected}")]
    Mismatch {
        node: NodeId,
        what: &'static str,
        cached: String,
        expected: String,
    },

    #[error("{node}: {message}")]
    Structure { node: NodeId, message: String },
}

fn mismatch(node: NodeId, what: &'static str, cached: impl std::fmt::Debug, expected: impl std::fmt::Debug) -> SanityError {
    SanityError::Mismatch {
        node,
        what,
        cached: format!("{:?}", cached),
        expected: format!("{:?}", expected),
    }
}

fn structure(node: NodeId, message: impl Into<String>) -> SanityError {
    SanityError::Structure {
        node,
        message: message.into(),
    }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(node: NodeId, what: &'static str, cached: T, expected: T) -> Result<(), SanityError> {
    if cached == expected {
        Ok(())
    } else {
        Err(mismatch(node, what, cached, expected))
    }
}

impl Graph {
    /// Check every cached view reachable from `root` against a full recomputation.
    pub fn debug_sanity_check(&self, root: NodeId) -> Result<(), SanityError> {
        let mut visited = HashSet::new();
        let result = self.check_node(root, &mut visited);
        if let Err(error) = &result {
            warn!(root = %root, error = %error, "sanity check failed");
        }
        result
    }

    fn check_node(&self, id: NodeId, visited: &mut HashSet<NodeId>) -> Result<(), SanityError> {
        if !visited.insert(id) {
            return Ok(());
        }
        if !self.contains(id) {
            return Err(structure(id, "dangling node id"));
        }
        for operand in self.expr(id).operands() {
            self.check_node(operand, visited)?;
        }
        if self.is_evaluated(id) {
            self.check_cached(id, visited)?;
        }
        Ok(())
    }

    /// The node's own view: what recomputation from its operands gives.
    fn check_cached(&self, id: NodeId, visited: &mut HashSet<NodeId>) -> Result<(), SanityError> {
        let own = &self.node(id).view;
        match self.expr(id) {
            Expr::Value(_) => self.check_container(id, visited)?,
            Expr::Undefined => expect_eq(id, "definedness", self.is_defined(id), false)?,
            Expr::Op(_) => self.check_outcome(id, crate::ops::compute(self, id))?,
            Expr::Equality(_) => self.check_outcome(id, crate::ops::equality::compute(self, id))?,
            Expr::Fold(_) => {
                self.check_outcome(id, crate::ops::fold::expected(self, id))?;
                if let Some(position) = crate::ops::fold::stale_position(self, id) {
                    return Err(structure(id, format!("stale contribution at {position}")));
                }
            }
            Expr::Subset(_) => self.check_outcome(id, Some(crate::ops::subset::expected(self, id)))?,
            Expr::Iter(reference) => {
                let defined = reference.target().is_some_and(|t| self.is_defined(t));
                expect_eq(id, "definedness", self.is_defined(id), defined)?;
            }
            Expr::Index(index) => {
                let (target, _) = crate::ops::index::target(self, id);
                expect_eq(id, "target", index.reference.target(), target)?;
                let defined = target.is_some_and(|t| self.is_defined(t));
                expect_eq(id, "definedness", self.is_defined(id), defined)?;
            }
            Expr::SetLit(lit) => {
                let defined = lit.operands.iter().all(|o| self.is_defined(*o));
                expect_eq(id, "definedness", self.is_defined(id), defined)?;
                if defined {
                    let expected: HashSet<_> = lit.operands.iter().map(|o| self.hash_of(*o)).collect();
                    self.check_member_hashes(id, expected)?;
                }
                self.check_container(id, visited)?;
            }
            Expr::SetOp(_) => {
                let targets = crate::ops::set_ops::targets(self, id);
                expect_eq(id, "definedness", self.is_defined(id), targets.is_some())?;
                if let Some(targets) = targets {
                    let expected: HashSet<_> = targets.iter().map(|l| l.hash()).collect();
                    self.check_member_hashes(id, expected)?;
                }
                self.check_container(id, visited)?;
            }
            Expr::Members(lit) => {
                let operand_hashes: Vec<_> = lit.operands.iter().map(|o| self.hash_of(*o)).collect();
                let cached: Vec<_> = (0..own.len()).filter_map(|i| own.member_hash(i)).collect();
                expect_eq(id, "member hashes", cached, operand_hashes)?;
                let undefined = lit.operands.iter().filter(|o| !self.is_defined(**o)).count();
                expect_eq(id, "undefined members", lit.undefined, undefined)?;
                expect_eq(id, "definedness", self.is_defined(id), undefined == 0)?;
            }
            Expr::Flatten(flatten) => {
                expect_eq(id, "definedness", self.is_defined(id), self.is_defined(flatten.operand))?;
                if self.is_defined(id) {
                    let expected = crate::ops::flatten::flattened(self, flatten.operand);
                    let cached: Vec<_> = (0..own.len())
                        .filter_map(|i| Some((own.member_at(i)?, own.member_hash(i)?)))
                        .collect();
                    expect_eq(id, "members", cached, expected)?;
                }
            }
            Expr::Quantifier(q) => self.check_quantifier(id, q, visited)?,
        }
        Ok(())
    }

    fn check_outcome(&self, id: NodeId, expected: Option<View>) -> Result<(), SanityError> {
        expect_eq(id, "definedness", self.is_defined(id), expected.is_some())?;
        match expected {
            Some(view) => expect_eq(id, "view", &self.node(id).view, &view),
            None => Ok(()),
        }
    }

    fn check_member_hashes(&self, id: NodeId, expected: HashSet<tarn_core::HashType>) -> Result<(), SanityError> {
        let own = &self.node(id).view;
        let cached: HashSet<_> = (0..own.len()).filter_map(|i| own.member_hash(i)).collect();
        if own.len() != expected.len() || cached != expected {
            return Err(mismatch(id, "members", cached, expected));
        }
        Ok(())
    }

    /// Cached member hashes of a container view, and the aggregate hash of a
    /// defined value against its literal.
    fn check_container(&self, id: NodeId, visited: &mut HashSet<NodeId>) -> Result<(), SanityError> {
        let own = &self.node(id).view;
        if !own.kind().is_container() {
            return Ok(());
        }
        let slots = match own {
            View::Function(view) => view.len(),
            _ => own.len(),
        };
        for index in 0..slots {
            let Some(member) = own.member_at(index) else {
                continue;
            };
            if !self.contains(member) {
                return Err(structure(id, format!("member {} at {} was freed", member, index)));
            }
            expect_eq(id, "member hash", own.member_hash(index), Some(self.hash_of(member)))?;
            self.check_node(member, visited)?;
        }
        if self.expr(id).kind() == ExprKind::Value {
            if let Some(literal) = self.literal_of(id) {
                expect_eq(id, "hash", own.hash(), literal.hash())?;
            }
        }
        Ok(())
    }

    fn check_quantifier(&self, id: NodeId, q: &Quantifier, visited: &mut HashSet<NodeId>) -> Result<(), SanityError> {
        if !q.pending.is_empty() {
            return Err(structure(id, "delayed unroll still pending"));
        }
        let container = q.container;
        let container_defined = self.is_defined(container);
        let expected_len = if container_defined { self.size(container) } else { 0 };
        expect_eq(id, "unrolled positions", q.unrolled.len(), expected_len)?;

        let mut next_body = 0;
        for (position, entry) in q.unrolled.iter().enumerate() {
            let member = self.view(container).member_at(position);
            expect_eq(id, "iterator target", self.expr(entry.iter).reference_target(), Some(member))?;
            if let Some(member) = member {
                expect_eq(id, "iterator hash", self.hash_of(entry.iter), self.hash_of(member))?;
            }
            let has_body = match &entry.guard {
                Some(guard) => {
                    self.check_node(guard.node, visited)?;
                    let holds = self.violation(guard.node) == 0;
                    expect_eq(id, "guard", guard.holds, holds)?;
                    holds
                }
                None => true,
            };
            let expected = has_body.then_some(next_body);
            expect_eq(id, "expr index", entry.expr_index, expected)?;
            if has_body {
                next_body += 1;
            }
        }

        let bodies = self.node(id).view.members();
        expect_eq(id, "bodies", bodies.len(), next_body)?;
        expect_eq(id, "body triggers", q.body_triggers.len(), next_body)?;
        let mut undefined = 0;
        for (index, body) in bodies.iter().enumerate() {
            self.check_node(*body, visited)?;
            expect_eq(id, "body hash", self.node(id).view.member_hash(index), Some(self.hash_of(*body)))?;
            if !self.is_defined(*body) {
                undefined += 1;
            }
        }
        expect_eq(id, "undefined bodies", q.undefined_bodies, undefined)?;
        expect_eq(id, "definedness", self.is_defined(id), container_defined && undefined == 0)
    }
}
