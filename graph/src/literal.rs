//! Value leaves built from literals, and literals read back from views.

use crate::expr::Expr;
use crate::node::{Node, Pool, ValueBase};
use crate::view::{
    Dimension, FunctionView, MSetView, PartitionView, Preimages, SequenceView, SetView,
    TupleView, View,
};
use crate::Graph;
use std::collections::HashMap;
use std::rc::Rc;
use tarn_core::{
    AnyDomain, EngineError, EngineResult, IntDomain, Kind, Literal, NodeId, VarId,
};

/// Preimages for a function literal with no declared domain: `0..n`.
fn default_preimages(size: usize) -> Preimages {
    match IntDomain::range(0, size as i64 - 1) {
        Ok(domain) => Preimages::Dimension(Dimension::Int(Rc::new(domain))),
        Err(_) => Preimages::Explicit {
            values: Vec::new(),
            index: HashMap::new(),
        },
    }
}

/// View of a scalar literal; `None` for containers.
pub(crate) fn scalar_view(literal: &Literal) -> Option<View> {
    match literal {
        Literal::Bool(b) => Some(View::Bool(if *b { 0 } else { 1 })),
        Literal::Int(v) => Some(View::Int(*v)),
        Literal::Enum(v) => Some(View::Enum(*v)),
        _ => None,
    }
}

/// An empty view with the same kind, member kind and preimages as `view`.
/// Scalars are kept as they are.
pub(crate) fn emptied(view: &View) -> View {
    match view {
        View::Bool(_) | View::Int(_) | View::Enum(_) => view.clone(),
        View::Set(v) => View::Set(SetView::new(v.inner())),
        View::MSet(v) => View::MSet(MSetView::new(v.inner())),
        View::Sequence(v) => View::Sequence(SequenceView::new(v.inner())),
        View::Function(v) => View::Function(FunctionView::new(v.inner(), v.preimages().clone())),
        View::Partition(v) => View::Partition(PartitionView::new(v.inner())),
        View::Tuple(_) => View::Tuple(TupleView::new()),
    }
}

fn inner_kind(members: &[Literal], domain: Option<&AnyDomain>) -> Kind {
    domain
        .and_then(AnyDomain::inner)
        .map(AnyDomain::kind)
        .or_else(|| members.first().map(Literal::kind))
        .unwrap_or(Kind::Int)
}

impl Graph {
    fn alloc_leaf(&mut self, view: View, base: ValueBase, constant: bool) -> NodeId {
        let mut node = Node::new(Expr::Value(base), view);
        node.flags.evaluated = true;
        node.flags.defined = true;
        node.flags.constant = constant;
        self.alloc(node)
    }

    /// Allocate a value leaf (and its member leaves) holding `literal`.
    pub(crate) fn alloc_value(
        &mut self,
        literal: &Literal,
        base: ValueBase,
        domain: Option<&AnyDomain>,
    ) -> EngineResult<NodeId> {
        let constant = base.pool == Pool::Constant;
        self.alloc_value_in(literal, base, domain, constant)
    }

    fn alloc_value_in(
        &mut self,
        literal: &Literal,
        base: ValueBase,
        domain: Option<&AnyDomain>,
        constant: bool,
    ) -> EngineResult<NodeId> {
        let view = match literal {
            Literal::Bool(b) => View::Bool(if *b { 0 } else { 1 }),
            Literal::Int(v) => View::Int(*v),
            Literal::Enum(v) => View::Enum(*v),
            Literal::Set(members) => View::Set(SetView::new(inner_kind(members, domain))),
            Literal::MSet(members) => View::MSet(MSetView::new(inner_kind(members, domain))),
            Literal::Sequence(members) => {
                View::Sequence(SequenceView::new(inner_kind(members, domain)))
            }
            Literal::Function(images) => {
                let (inner, preimages) = match domain {
                    Some(AnyDomain::Function(d)) => {
                        let preimages = Preimages::for_domain(&d.from, d.partial).ok_or_else(|| {
                            EngineError::unsupported("function over a non-enumerable domain")
                        })?;
                        (d.to.kind(), preimages)
                    }
                    _ => {
                        let inner = images
                            .iter()
                            .flatten()
                            .next()
                            .map_or(Kind::Int, Literal::kind);
                        (inner, default_preimages(images.len()))
                    }
                };
                if preimages.len() != images.len() {
                    return Err(EngineError::invalid_operation(format!(
                        "function literal has {} images for {} preimages",
                        images.len(),
                        preimages.len()
                    )));
                }
                View::Function(FunctionView::new(inner, preimages))
            }
            Literal::Partition(parts) => {
                let first = parts.iter().flatten().next();
                let inner = domain
                    .and_then(AnyDomain::inner)
                    .map(AnyDomain::kind)
                    .or_else(|| first.map(Literal::kind))
                    .unwrap_or(Kind::Int);
                View::Partition(PartitionView::new(inner))
            }
            Literal::Tuple(_) => View::Tuple(TupleView::new()),
        };
        let id = self.alloc_leaf(view, base, constant);
        if let Some(domain) = domain {
            self.node_mut(id).domain = Some(domain.clone());
        }
        if let Err(error) = self.fill_members(id, literal, domain, constant) {
            crate::eval::free_value(self, id);
            return Err(error);
        }
        Ok(id)
    }

    /// Allocate member leaves for `literal` into the (empty) container `id`.
    pub(crate) fn fill_members(
        &mut self,
        id: NodeId,
        literal: &Literal,
        domain: Option<&AnyDomain>,
        constant: bool,
    ) -> EngineResult<()> {
        let member_base = |index: usize| ValueBase {
            pool: Pool::Container(id),
            id: VarId::new(index),
        };
        let inner = domain.and_then(AnyDomain::inner);
        match literal {
            Literal::Bool(_) | Literal::Int(_) | Literal::Enum(_) => {}
            Literal::Set(members) | Literal::MSet(members) | Literal::Sequence(members) => {
                for (index, member) in members.iter().enumerate() {
                    let hash = member.hash();
                    if let View::Set(view) = &self.node(id).view {
                        if view.contains(hash) {
                            return Err(EngineError::DuplicateMember {
                                node: id,
                                value: member.to_string(),
                            });
                        }
                    }
                    let child = self.alloc_value_in(member, member_base(index), inner, constant)?;
                    match &mut self.node_mut(id).view {
                        View::Set(view) => {
                            view.push(child, hash);
                        }
                        View::MSet(view) => {
                            view.push(child, hash);
                        }
                        View::Sequence(view) => {
                            view.push(child, hash);
                        }
                        _ => unreachable!("member list on a non-list view"),
                    }
                }
            }
            Literal::Function(images) => {
                for (slot, image) in images.iter().enumerate() {
                    if let Some(image) = image {
                        let child = self.alloc_value_in(image, member_base(slot), inner, constant)?;
                        if let View::Function(view) = &mut self.node_mut(id).view {
                            view.map(slot, child, image.hash());
                        }
                    }
                }
            }
            Literal::Partition(parts) => {
                let mut index = 0;
                for (part, members) in parts.iter().enumerate() {
                    for member in members {
                        let hash = member.hash();
                        if let View::Partition(view) = &self.node(id).view {
                            if view.index_of(hash).is_some() {
                                return Err(EngineError::DuplicateMember {
                                    node: id,
                                    value: member.to_string(),
                                });
                            }
                        }
                        let child =
                            self.alloc_value_in(member, member_base(index), inner, constant)?;
                        if let View::Partition(view) = &mut self.node_mut(id).view {
                            view.push(child, hash, part);
                        }
                        index += 1;
                    }
                }
            }
            Literal::Tuple(members) => {
                let inners = match domain {
                    Some(AnyDomain::Tuple(d)) => Some(&d.inners),
                    _ => None,
                };
                for (index, member) in members.iter().enumerate() {
                    let member_domain = inners.and_then(|d| d.get(index));
                    let child =
                        self.alloc_value_in(member, member_base(index), member_domain, constant)?;
                    if let View::Tuple(view) = &mut self.node_mut(id).view {
                        view.push(child, member.hash());
                    }
                }
            }
        }
        Ok(())
    }

    /// Allocate an independent leaf copy of the value `source` currently holds.
    pub(crate) fn alloc_copy(&mut self, source: NodeId, base: ValueBase) -> NodeId {
        let source = self.resolve(source);
        let view = self.node(source).view.clone();
        let id = self.alloc_leaf(emptied(&view), base, false);
        let member_base = |index: usize| ValueBase {
            pool: Pool::Container(id),
            id: VarId::new(index),
        };
        match &view {
            View::Bool(_) | View::Int(_) | View::Enum(_) => {}
            View::Function(source_view) => {
                for (slot, image) in source_view.images().iter().enumerate() {
                    if let Some(image) = image {
                        let child = self.alloc_copy(*image, member_base(slot));
                        let hash = self.hash_of(child);
                        if let View::Function(v) = &mut self.node_mut(id).view {
                            v.map(slot, child, hash);
                        }
                    }
                }
            }
            View::Partition(source_view) => {
                for (index, member) in source_view.members().iter().enumerate() {
                    let child = self.alloc_copy(*member, member_base(index));
                    let hash = self.hash_of(child);
                    let part = source_view.part_of(index);
                    if let View::Partition(v) = &mut self.node_mut(id).view {
                        v.push(child, hash, part);
                    }
                }
            }
            other => {
                for (index, member) in other.members().into_iter().enumerate() {
                    let child = self.alloc_copy(member, member_base(index));
                    let hash = self.hash_of(child);
                    match &mut self.node_mut(id).view {
                        View::Set(v) => {
                            v.push(child, hash);
                        }
                        View::MSet(v) => {
                            v.push(child, hash);
                        }
                        View::Sequence(v) => {
                            v.push(child, hash);
                        }
                        View::Tuple(v) => v.push(child, hash),
                        _ => {}
                    }
                }
            }
        }
        id
    }

    /// The current value of a node as a literal; `None` when undefined.
    pub fn literal_of(&self, id: NodeId) -> Option<Literal> {
        if !self.is_defined(id) {
            return None;
        }
        let literal = match self.view(id) {
            View::Bool(violation) => Literal::Bool(*violation == 0),
            View::Int(value) => Literal::Int(*value),
            View::Enum(value) => Literal::Enum(*value),
            View::Set(view) => Literal::Set(self.literals(view.members())?),
            View::MSet(view) => Literal::MSet(self.literals(view.members())?),
            View::Sequence(view) => Literal::Sequence(self.literals(view.members())?),
            View::Tuple(view) => Literal::Tuple(self.literals(view.members())?),
            View::Function(view) => Literal::Function(
                view.images()
                    .iter()
                    .map(|image| match image {
                        Some(image) => self.literal_of(*image).map(Some),
                        None => Some(None),
                    })
                    .collect::<Option<Vec<_>>>()?,
            ),
            View::Partition(view) => Literal::Partition(
                view.non_empty_parts()
                    .into_iter()
                    .map(|part| {
                        let members: Vec<NodeId> = view
                            .part_members(part)
                            .into_iter()
                            .map(|m| view.members()[m])
                            .collect();
                        self.literals(&members)
                    })
                    .collect::<Option<Vec<_>>>()?,
            ),
        };
        Some(literal)
    }

    fn literals(&self, members: &[NodeId]) -> Option<Vec<Literal>> {
        members.iter().map(|m| self.literal_of(*m)).collect()
    }
}
