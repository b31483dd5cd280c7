//! Expression nodes and event dispatch.
//!
//! Each node holds one [`Expr`]. Operators are grouped by how they follow
//! their operands:
//! - `Op`: fixed operands, recomputed from scratch on any operand event
//! - `Equality`: like `Op`, plus optional defined-variable forwarding
//! - `Fold`: aggregates over a sequence, updated from member deltas
//! - `Subset`: set/mset inclusion, updated from membership deltas
//! - `Index`, `Iter`: references that forward the events of a target node
//! - `SetLit`, `Members`, `SetOp`: container-producing operators
//! - `Flatten`: a sequence of sequences read as one sequence
//! - `Quantifier`: dynamic body copies over a container

use crate::defined::DefinesLock;
use crate::event::{Event, Prior};
use crate::quantifier::Quantifier;
use crate::reference::Reference;
use crate::trigger::{Role, Scope, Trigger, TriggerRef};
use crate::{node::ValueBase, Graph};
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use std::rc::Rc;
use tarn_core::{HashType, IntDomain, Kind, NodeId};

/// Operators recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    Not,
    Implies,
    Less,
    LessEq,
    NotEq,
    InDomain(Rc<IntDomain>),
    /// Membership of a value in a set or mset.
    In,
    /// Whether every member of a set lies in one part of a partition.
    Together,
    IsDefined,
    /// Multiply the violation of a constraint.
    Amplify(u64),
    ToInt,
    Minus,
    Negate,
    Abs,
    Mod,
    Div,
    Power,
    SetSize,
    MSetSize,
    SequenceSize,
    PartitionSize,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Not => "not",
            OpKind::Implies => "implies",
            OpKind::Less => "less",
            OpKind::LessEq => "less_eq",
            OpKind::NotEq => "not_eq",
            OpKind::InDomain(_) => "in_domain",
            OpKind::In => "in",
            OpKind::Together => "together",
            OpKind::IsDefined => "is_defined",
            OpKind::Amplify(_) => "amplify",
            OpKind::ToInt => "to_int",
            OpKind::Minus => "minus",
            OpKind::Negate => "negate",
            OpKind::Abs => "abs",
            OpKind::Mod => "mod",
            OpKind::Div => "div",
            OpKind::Power => "power",
            OpKind::SetSize => "set_size",
            OpKind::MSetSize => "mset_size",
            OpKind::SequenceSize => "sequence_size",
            OpKind::PartitionSize => "partition_size",
        }
    }

    /// Kind of the produced view.
    pub fn result_kind(&self) -> Kind {
        match self {
            OpKind::Not
            | OpKind::Implies
            | OpKind::Less
            | OpKind::LessEq
            | OpKind::NotEq
            | OpKind::InDomain(_)
            | OpKind::In
            | OpKind::Together
            | OpKind::IsDefined
            | OpKind::Amplify(_) => Kind::Bool,
            _ => Kind::Int,
        }
    }

    /// Size operators only care about structure, not member values.
    fn scope(&self) -> Scope {
        match self {
            OpKind::SetSize | OpKind::MSetSize | OpKind::SequenceSize | OpKind::PartitionSize => {
                Scope::Outer
            }
            _ => Scope::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Operator {
    pub kind: OpKind,
    pub operands: SmallVec<[NodeId; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityKind {
    Int,
    Bool,
    Enum,
    /// Whole-value equality of containers, by aggregate hash.
    Hash,
}

/// Which operand an equality writes into when forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Equality {
    pub kind: EqualityKind,
    pub left: NodeId,
    pub right: NodeId,
    pub lock: DefinesLock,
    pub defines: Option<Side>,
}

impl Equality {
    /// (defined variable, source) when forwarding is set up.
    pub(crate) fn forwarding(&self) -> Option<(NodeId, NodeId)> {
        match self.defines? {
            Side::Left => Some((self.left, self.right)),
            Side::Right => Some((self.right, self.left)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldKind {
    And,
    Or,
    Sum,
    Prod,
    Min,
    Max,
    AllDiff,
}

impl FoldKind {
    pub fn result_kind(&self) -> Kind {
        match self {
            FoldKind::And | FoldKind::Or | FoldKind::AllDiff => Kind::Bool,
            _ => Kind::Int,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fold {
    pub kind: FoldKind,
    /// A sequence of members.
    pub operand: NodeId,
    /// Member hash multiplicities, for `AllDiff`.
    pub(crate) counts: HashMap<HashType, usize>,
    /// What each member contributed when it last reported, by position.
    ///
    /// A member can change before the fold hears about it (a guard rolls its
    /// body out first), so removals subtract this rather than the live value.
    pub(crate) reported: Vec<Prior>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetKind {
    SubsetEq,
    Subset,
    MSetSubsetEq,
}

#[derive(Debug, Clone)]
pub struct Subset {
    pub kind: SubsetKind,
    pub left: NodeId,
    pub right: NodeId,
    /// Left members (with multiplicity for msets) missing from the right.
    pub(crate) missing: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// `seq[i]`, one-based.
    Sequence,
    /// `tuple[i]`, zero-based and fixed.
    Tuple(usize),
    /// `f(x)`.
    Function,
    /// The first operand when defined, else the fallback.
    CatchUndef,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub kind: IndexKind,
    /// The indexed container, or the guarded expression for `CatchUndef`.
    pub container: NodeId,
    /// Index, argument or fallback.
    pub arg: Option<NodeId>,
    pub(crate) reference: Reference,
    /// Member position watched on the container.
    pub(crate) position: Option<usize>,
    pub(crate) container_trigger: Option<TriggerRef>,
}

#[derive(Debug, Clone)]
pub struct SetLit {
    pub operands: Vec<NodeId>,
    /// Operand hashes, in operand order.
    pub(crate) hashes: Vec<HashType>,
    /// How many operands share each hash.
    pub(crate) counts: HashMap<HashType, usize>,
}

/// Container literals whose members are the operands themselves.
#[derive(Debug, Clone)]
pub struct MemberLit {
    /// `MSet`, `Sequence` or `Tuple`.
    pub kind: Kind,
    pub operands: Vec<NodeId>,
    pub(crate) undefined: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Intersect,
    /// `{a..b}`.
    IntRange,
    /// Preimages of a value under a function.
    Preimage,
    /// Members sharing a part with a value.
    Party,
    /// The parts of a partition, as a set of sets.
    Parts,
    /// `{a..b}` over enum values.
    EnumRange,
    /// The preimages a function maps.
    FunctionDefined,
    /// Every subset of a set, optionally capped in size.
    PowerSet(Option<usize>),
}

/// Set-producing operators whose members are synthesized leaves.
#[derive(Debug, Clone)]
pub struct SetOp {
    pub kind: SetOpKind,
    pub operands: SmallVec<[NodeId; 2]>,
}

/// The members of the inner sequences of `operand`, in order.
#[derive(Debug, Clone)]
pub struct Flatten {
    pub operand: NodeId,
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// A leaf holding its own view.
    Value(ValueBase),
    /// Always undefined.
    Undefined,
    /// A quantifier iterator bound to one container member.
    Iter(Reference),
    Op(Operator),
    Equality(Equality),
    Fold(Fold),
    Subset(Subset),
    Index(Index),
    SetLit(SetLit),
    Members(MemberLit),
    SetOp(SetOp),
    Flatten(Flatten),
    Quantifier(Box<Quantifier>),
}

/// Discriminant of an [`Expr`], for dispatch without holding a borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    Value,
    Undefined,
    Iter,
    Op,
    Equality,
    Fold,
    Subset,
    Index,
    SetLit,
    Members,
    SetOp,
    Flatten,
    Quantifier,
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Value(_) => ExprKind::Value,
            Expr::Undefined => ExprKind::Undefined,
            Expr::Iter(_) => ExprKind::Iter,
            Expr::Op(_) => ExprKind::Op,
            Expr::Equality(_) => ExprKind::Equality,
            Expr::Fold(_) => ExprKind::Fold,
            Expr::Subset(_) => ExprKind::Subset,
            Expr::Index(_) => ExprKind::Index,
            Expr::SetLit(_) => ExprKind::SetLit,
            Expr::Members(_) => ExprKind::Members,
            Expr::SetOp(_) => ExprKind::SetOp,
            Expr::Flatten(_) => ExprKind::Flatten,
            Expr::Quantifier(_) => ExprKind::Quantifier,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Expr::Value(_) => "value",
            Expr::Undefined => "undefined",
            Expr::Iter(_) => "iter",
            Expr::Op(op) => op.kind.name(),
            Expr::Equality(eq) => match eq.kind {
                EqualityKind::Int => "int_eq",
                EqualityKind::Bool => "bool_eq",
                EqualityKind::Enum => "enum_eq",
                EqualityKind::Hash => "eq",
            },
            Expr::Fold(fold) => match fold.kind {
                FoldKind::And => "and",
                FoldKind::Or => "or",
                FoldKind::Sum => "sum",
                FoldKind::Prod => "prod",
                FoldKind::Min => "min",
                FoldKind::Max => "max",
                FoldKind::AllDiff => "all_diff",
            },
            Expr::Subset(subset) => match subset.kind {
                SubsetKind::SubsetEq => "subset_eq",
                SubsetKind::Subset => "subset",
                SubsetKind::MSetSubsetEq => "mset_subset_eq",
            },
            Expr::Index(index) => match index.kind {
                IndexKind::Sequence => "sequence_index",
                IndexKind::Tuple(_) => "tuple_index",
                IndexKind::Function => "function_image",
                IndexKind::CatchUndef => "catch_undef",
            },
            Expr::SetLit(_) => "set_lit",
            Expr::Members(lit) => match lit.kind {
                Kind::MSet => "mset_lit",
                Kind::Tuple => "tuple_lit",
                Kind::Function => "function_lit",
                _ => "sequence_lit",
            },
            Expr::SetOp(op) => match op.kind {
                SetOpKind::Intersect => "intersect",
                SetOpKind::IntRange => "int_range",
                SetOpKind::Preimage => "function_preimage",
                SetOpKind::Party => "party",
                SetOpKind::Parts => "parts",
                SetOpKind::EnumRange => "enum_range",
                SetOpKind::FunctionDefined => "function_defined",
                SetOpKind::PowerSet(_) => "power_set",
            },
            Expr::Flatten(_) => "flatten",
            Expr::Quantifier(_) => "quantifier",
        }
    }

    /// Target of a reference node: `Some(None)` when it currently points nowhere.
    pub fn reference_target(&self) -> Option<Option<NodeId>> {
        match self {
            Expr::Iter(reference) => Some(reference.target),
            Expr::Index(index) => Some(index.reference.target),
            _ => None,
        }
    }

    /// Operands this node owns or reads, in slot order.
    ///
    /// Quantifiers list only their container; body copies are managed by
    /// the quantifier itself.
    pub fn operands(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            Expr::Value(_) | Expr::Undefined | Expr::Iter(_) => SmallVec::new(),
            Expr::Op(op) => op.operands.iter().copied().collect(),
            Expr::Equality(eq) => smallvec![eq.left, eq.right],
            Expr::Fold(fold) => smallvec![fold.operand],
            Expr::Subset(subset) => smallvec![subset.left, subset.right],
            Expr::Index(index) => {
                let mut out: SmallVec<[NodeId; 4]> = smallvec![index.container];
                out.extend(index.arg);
                out
            }
            Expr::SetLit(lit) => lit.operands.iter().copied().collect(),
            Expr::Members(lit) => lit.operands.iter().copied().collect(),
            Expr::SetOp(op) => op.operands.iter().copied().collect(),
            Expr::Flatten(flatten) => smallvec![flatten.operand],
            Expr::Quantifier(q) => smallvec![q.container],
        }
    }

    /// Replace one operand id, used by rewriting passes before evaluation.
    pub(crate) fn replace_operand(&mut self, old: NodeId, new: NodeId) {
        let swap = |id: &mut NodeId| {
            if *id == old {
                *id = new;
            }
        };
        match self {
            Expr::Value(_) | Expr::Undefined | Expr::Iter(_) => {}
            Expr::Op(op) => op.operands.iter_mut().for_each(swap),
            Expr::Equality(eq) => {
                swap(&mut eq.left);
                swap(&mut eq.right);
            }
            Expr::Fold(fold) => swap(&mut fold.operand),
            Expr::Subset(subset) => {
                swap(&mut subset.left);
                swap(&mut subset.right);
            }
            Expr::Index(index) => {
                swap(&mut index.container);
                index.arg.iter_mut().for_each(swap);
            }
            Expr::SetLit(lit) => lit.operands.iter_mut().for_each(swap),
            Expr::Members(lit) => lit.operands.iter_mut().for_each(swap),
            Expr::SetOp(op) => op.operands.iter_mut().for_each(swap),
            Expr::Flatten(flatten) => swap(&mut flatten.operand),
            Expr::Quantifier(q) => swap(&mut q.container),
        }
    }

    /// Scope used when subscribing to operands.
    pub(crate) fn operand_scope(&self) -> Scope {
        match self {
            Expr::Op(op) => op.kind.scope(),
            _ => Scope::All,
        }
    }
}

// ==================== Event Dispatch ====================

/// Deliver one event to the parent that registered `trigger`.
pub(crate) fn on_event(g: &mut Graph, trigger: &Trigger, event: &Event) {
    let parent = trigger.parent();
    let slot = trigger.slot();
    match (g.expr(parent).kind(), trigger.role()) {
        (ExprKind::Iter, Role::Bound) | (ExprKind::Index, Role::Bound) => {
            crate::reference::forward(g, parent, event)
        }
        (ExprKind::Index, _) => crate::ops::index::refresh(g, parent),
        (ExprKind::Op, _) => crate::eval::recompute(g, parent),
        (ExprKind::Equality, _) => crate::ops::equality::on_operand_event(g, parent, slot),
        (ExprKind::Fold, _) => crate::ops::fold::on_event(g, parent, event),
        (ExprKind::Subset, _) => crate::ops::subset::on_event(g, parent, slot, event),
        (ExprKind::SetLit, _) => crate::ops::set_lit::on_event(g, parent, slot, event),
        (ExprKind::Members, _) => crate::ops::members::on_member_event(g, parent, slot, event),
        (ExprKind::SetOp, _) => crate::ops::set_ops::on_event(g, parent, slot, event),
        (ExprKind::Flatten, _) => crate::ops::flatten::on_event(g, parent),
        (ExprKind::Quantifier, role) => crate::quantifier::on_event(g, parent, role, slot, event),
        (kind, role) => unreachable!("{:?} node {} received a {:?} event", kind, parent, role),
    }
}
