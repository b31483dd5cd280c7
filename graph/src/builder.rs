//! Graph construction.
//!
//! Every constructor checks its operands' kinds and returns a fresh,
//! unevaluated node. Operand nodes become owned by the new node, except for
//! constants and decision variables, which may be shared freely.

use crate::expr::{
    Equality, EqualityKind, Expr, Flatten, Fold, FoldKind, Index, IndexKind, MemberLit, OpKind,
    Operator, SetLit, SetOp, SetOpKind, Subset, SubsetKind,
};
use crate::literal::emptied;
use crate::node::{Node, Pool, ValueBase};
use crate::quantifier::Quantifier;
use crate::reference::Reference;
use crate::view::{FunctionView, Preimages, SequenceView, SetView, TupleView, View};
use crate::Graph;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::rc::Rc;
use tarn_core::{
    AnyDomain, EngineError, EngineResult, IntDomain, Kind, Literal, NodeId, VarId,
};
use tracing::{debug, warn};

impl Graph {
    fn add(&mut self, expr: Expr, view: View) -> NodeId {
        self.alloc(Node::new(expr, view))
    }

    fn expect_kinds(&self, operands: &[NodeId], expected: Kind) -> EngineResult<()> {
        for operand in operands {
            self.check(*operand)?;
            self.expect_kind(*operand, expected)?;
        }
        Ok(())
    }

    /// Shared kind of a homogeneous operand list; `fallback` when empty.
    fn common_kind(&self, operands: &[NodeId], fallback: Kind) -> EngineResult<Kind> {
        let Some(first) = operands.first() else {
            return Ok(fallback);
        };
        self.check(*first)?;
        let kind = self.kind(*first);
        self.expect_kinds(operands, kind)?;
        Ok(kind)
    }

    /// Empty view shaped like the members of `container`.
    fn member_view(&self, container: NodeId) -> View {
        let view = self.view(container);
        match view.members().first() {
            Some(member) => emptied(self.view(*member)),
            None => View::empty(view.inner_kind().unwrap_or(Kind::Int), Kind::Int),
        }
    }

    // ==================== Leaves ====================

    /// A constant. A literal that cannot be represented yields an undefined
    /// node of the same kind.
    pub fn constant(&mut self, literal: Literal) -> NodeId {
        let base = ValueBase {
            pool: Pool::Constant,
            id: VarId::new(0),
        };
        match self.alloc_value(&literal, base, None) {
            Ok(id) => id,
            Err(error) => {
                warn!(%literal, %error, "constant is not representable");
                self.undefined(literal.kind())
            }
        }
    }

    /// A constant checked against `domain`.
    pub fn constant_in(&mut self, domain: AnyDomain, literal: Literal) -> EngineResult<NodeId> {
        let base = ValueBase {
            pool: Pool::Constant,
            id: VarId::new(0),
        };
        let id = self.alloc_value(&literal, base, Some(&domain))?;
        if !domain.contains(&literal) {
            crate::eval::free_value(self, id);
            return Err(EngineError::NotInDomain {
                node: id,
                value: literal.to_string(),
            });
        }
        Ok(id)
    }

    /// A node that is never defined.
    pub fn undefined(&mut self, kind: Kind) -> NodeId {
        let id = self.add(Expr::Undefined, View::empty(kind, Kind::Int));
        let flags = &mut self.node_mut(id).flags;
        flags.evaluated = true;
        flags.constant = true;
        id
    }

    /// A decision variable with its domain and initial value.
    pub fn variable(&mut self, domain: AnyDomain, init: Literal) -> EngineResult<NodeId> {
        let base = ValueBase {
            pool: Pool::Variable,
            id: VarId::new(self.variables.len()),
        };
        let id = self.alloc_value(&init, base, Some(&domain))?;
        if !domain.contains(&init) {
            crate::eval::free_value(self, id);
            return Err(EngineError::NotInDomain {
                node: id,
                value: init.to_string(),
            });
        }
        self.variables.push(id);
        debug!(var = %id, kind = %domain.kind(), "declared variable");
        Ok(id)
    }

    /// An unbound iterator of the given member shape.
    pub fn iter(&mut self, kind: Kind, inner: Kind) -> NodeId {
        let id = self.add(Expr::Iter(Reference::default()), View::empty(kind, inner));
        self.node_mut(id).flags.evaluated = true;
        id
    }

    // ==================== Fixed Operators ====================

    fn op(&mut self, kind: OpKind, operands: &[NodeId]) -> NodeId {
        let view = View::empty(kind.result_kind(), Kind::Int);
        self.add(
            Expr::Op(Operator {
                kind,
                operands: operands.iter().copied().collect(),
            }),
            view,
        )
    }

    fn typed_op(&mut self, kind: OpKind, operands: &[NodeId], expected: Kind) -> EngineResult<NodeId> {
        self.expect_kinds(operands, expected)?;
        Ok(self.op(kind, operands))
    }

    pub fn not(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Not, &[operand], Kind::Bool)
    }

    pub fn implies(&mut self, premise: NodeId, conclusion: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Implies, &[premise, conclusion], Kind::Bool)
    }

    pub fn less(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Less, &[left, right], Kind::Int)
    }

    pub fn less_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::LessEq, &[left, right], Kind::Int)
    }

    /// Inequality of any two values of the same kind.
    pub fn not_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.common_kind(&[left, right], Kind::Int)?;
        Ok(self.op(OpKind::NotEq, &[left, right]))
    }

    /// Violated by the distance from `operand` to the nearest value of `domain`.
    pub fn in_domain(&mut self, operand: NodeId, domain: IntDomain) -> EngineResult<NodeId> {
        self.typed_op(OpKind::InDomain(Rc::new(domain)), &[operand], Kind::Int)
    }

    /// `value in container`, for sets and multisets.
    pub fn member_of(&mut self, value: NodeId, container: NodeId) -> EngineResult<NodeId> {
        self.check(value)?;
        self.check(container)?;
        let kind = self.kind(container);
        if !matches!(kind, Kind::Set | Kind::MSet) {
            return Err(EngineError::kind_mismatch(container, Kind::Set, kind));
        }
        self.expect_member_kind(container, self.kind(value))?;
        Ok(self.op(OpKind::In, &[value, container]))
    }

    /// Whether every member of `set` lies in one part of `partition`.
    pub fn together(&mut self, set: NodeId, partition: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[set], Kind::Set)?;
        self.expect_kinds(&[partition], Kind::Partition)?;
        Ok(self.op(OpKind::Together, &[set, partition]))
    }

    /// True while `operand` is defined.
    pub fn definedness(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.check(operand)?;
        Ok(self.op(OpKind::IsDefined, &[operand]))
    }

    /// `operand` with its violation multiplied by `factor`.
    pub fn amplify(&mut self, operand: NodeId, factor: u64) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Amplify(factor), &[operand], Kind::Bool)
    }

    /// 1 when `operand` holds, else 0.
    pub fn to_int(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::ToInt, &[operand], Kind::Bool)
    }

    pub fn minus(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Minus, &[left, right], Kind::Int)
    }

    pub fn negate(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Negate, &[operand], Kind::Int)
    }

    pub fn abs(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Abs, &[operand], Kind::Int)
    }

    /// Floor modulo; undefined for a zero divisor.
    pub fn modulo(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Mod, &[left, right], Kind::Int)
    }

    /// Floor division; undefined for a zero divisor.
    pub fn div(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Div, &[left, right], Kind::Int)
    }

    /// Undefined for negative exponents.
    pub fn power(&mut self, base: NodeId, exponent: NodeId) -> EngineResult<NodeId> {
        self.typed_op(OpKind::Power, &[base, exponent], Kind::Int)
    }

    /// Size of a set, multiset, sequence or partition.
    pub fn size_of(&mut self, container: NodeId) -> EngineResult<NodeId> {
        self.check(container)?;
        let kind = match self.kind(container) {
            Kind::Set => OpKind::SetSize,
            Kind::MSet => OpKind::MSetSize,
            Kind::Sequence => OpKind::SequenceSize,
            Kind::Partition => OpKind::PartitionSize,
            other => return Err(EngineError::kind_mismatch(container, Kind::Set, other)),
        };
        Ok(self.op(kind, &[container]))
    }

    // ==================== Equality ====================

    fn equality(&mut self, kind: EqualityKind, left: NodeId, right: NodeId) -> NodeId {
        self.add(
            Expr::Equality(Equality {
                kind,
                left,
                right,
                lock: Default::default(),
                defines: None,
            }),
            View::Bool(0),
        )
    }

    pub fn int_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[left, right], Kind::Int)?;
        Ok(self.equality(EqualityKind::Int, left, right))
    }

    pub fn bool_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[left, right], Kind::Bool)?;
        Ok(self.equality(EqualityKind::Bool, left, right))
    }

    pub fn enum_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[left, right], Kind::Enum)?;
        Ok(self.equality(EqualityKind::Enum, left, right))
    }

    /// Equality of any two values of the same kind.
    pub fn eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        let kind = match self.common_kind(&[left, right], Kind::Int)? {
            Kind::Int => EqualityKind::Int,
            Kind::Bool => EqualityKind::Bool,
            Kind::Enum => EqualityKind::Enum,
            _ => EqualityKind::Hash,
        };
        Ok(self.equality(kind, left, right))
    }

    // ==================== Folds ====================

    fn fold(&mut self, kind: FoldKind, operand: NodeId, members: Option<Kind>) -> EngineResult<NodeId> {
        self.expect_kinds(&[operand], Kind::Sequence)?;
        if let Some(members) = members {
            self.expect_member_kind(operand, members)?;
        }
        Ok(self.add(
            Expr::Fold(Fold {
                kind,
                operand,
                counts: HashMap::new(),
                reported: Vec::new(),
            }),
            View::empty(kind.result_kind(), Kind::Int),
        ))
    }

    /// Conjunction of a sequence of booleans; violations add up.
    pub fn and(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::And, operand, Some(Kind::Bool))
    }

    /// Disjunction of a sequence of booleans; the smallest violation wins.
    pub fn or(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::Or, operand, Some(Kind::Bool))
    }

    pub fn conjunction(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        self.expect_kinds(&operands, Kind::Bool)?;
        let literal = self.sequence_lit(operands)?;
        self.and(literal)
    }

    pub fn disjunction(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        self.expect_kinds(&operands, Kind::Bool)?;
        let literal = self.sequence_lit(operands)?;
        self.or(literal)
    }

    pub fn sum(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::Sum, operand, Some(Kind::Int))
    }

    pub fn prod(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::Prod, operand, Some(Kind::Int))
    }

    /// Undefined over an empty sequence.
    pub fn min(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::Min, operand, Some(Kind::Int))
    }

    /// Undefined over an empty sequence.
    pub fn max(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::Max, operand, Some(Kind::Int))
    }

    /// Violated by the number of members repeating an earlier value.
    pub fn all_diff(&mut self, operand: NodeId) -> EngineResult<NodeId> {
        self.fold(FoldKind::AllDiff, operand, None)
    }

    // ==================== Inclusion ====================

    fn subset_node(&mut self, kind: SubsetKind, left: NodeId, right: NodeId, expected: Kind) -> EngineResult<NodeId> {
        self.expect_kinds(&[left, right], expected)?;
        Ok(self.add(
            Expr::Subset(Subset {
                kind,
                left,
                right,
                missing: 0,
            }),
            View::Bool(0),
        ))
    }

    pub fn subset_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.subset_node(SubsetKind::SubsetEq, left, right, Kind::Set)
    }

    /// Strict inclusion.
    pub fn subset(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.subset_node(SubsetKind::Subset, left, right, Kind::Set)
    }

    pub fn mset_subset_eq(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.subset_node(SubsetKind::MSetSubsetEq, left, right, Kind::MSet)
    }

    // ==================== References ====================

    fn index(&mut self, kind: IndexKind, container: NodeId, arg: Option<NodeId>, view: View) -> NodeId {
        self.add(
            Expr::Index(Index {
                kind,
                container,
                arg,
                reference: Reference::default(),
                position: None,
                container_trigger: None,
            }),
            view,
        )
    }

    /// `sequence[index]`, one-based.
    pub fn sequence_index(&mut self, sequence: NodeId, index: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[sequence], Kind::Sequence)?;
        self.expect_kinds(&[index], Kind::Int)?;
        let view = self.member_view(sequence);
        Ok(self.index(IndexKind::Sequence, sequence, Some(index), view))
    }

    /// `tuple[position]`, zero-based.
    pub fn tuple_index(&mut self, tuple: NodeId, position: usize) -> EngineResult<NodeId> {
        self.expect_kinds(&[tuple], Kind::Tuple)?;
        let size = self.size(tuple);
        let member = self
            .view(tuple)
            .member_at(position)
            .ok_or(EngineError::IndexOutOfRange {
                node: tuple,
                index: position,
                size,
            })?;
        let view = emptied(self.view(member));
        Ok(self.index(IndexKind::Tuple(position), tuple, None, view))
    }

    /// `function(argument)`; undefined where a partial function is unmapped.
    pub fn function_image(&mut self, function: NodeId, argument: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[function], Kind::Function)?;
        self.check(argument)?;
        let view = match self.function_view(function).images().iter().flatten().next() {
            Some(image) => emptied(self.view(*image)),
            None => View::empty(self.function_view(function).inner(), Kind::Int),
        };
        Ok(self.index(IndexKind::Function, function, Some(argument), view))
    }

    /// `operand` when defined, else `fallback`.
    pub fn catch_undef(&mut self, operand: NodeId, fallback: NodeId) -> EngineResult<NodeId> {
        self.common_kind(&[operand, fallback], Kind::Int)?;
        let view = emptied(self.view(operand));
        Ok(self.index(IndexKind::CatchUndef, operand, Some(fallback), view))
    }

    // ==================== Containers ====================

    /// `{operands}`; operands sharing a value collapse into one member.
    pub fn set_lit(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        let inner = self.common_kind(&operands, Kind::Int)?;
        Ok(self.add(
            Expr::SetLit(SetLit {
                operands,
                hashes: Vec::new(),
                counts: HashMap::new(),
            }),
            View::Set(SetView::new(inner)),
        ))
    }

    /// A member literal over `view`, filled with the operands in order.
    fn members_node(&mut self, kind: Kind, operands: Vec<NodeId>, mut view: View) -> NodeId {
        for (index, operand) in operands.iter().enumerate() {
            let hash = self.hash_of(*operand);
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
        self.add(
            Expr::Members(MemberLit {
                kind,
                operands,
                undefined: 0,
            }),
            view,
        )
    }

    fn member_lit(&mut self, kind: Kind, operands: Vec<NodeId>, fallback: Kind) -> EngineResult<NodeId> {
        let inner = self.common_kind(&operands, fallback)?;
        Ok(self.members_node(kind, operands, View::empty(kind, inner)))
    }

    pub fn mset_lit(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        self.member_lit(Kind::MSet, operands, Kind::Int)
    }

    /// `[operands]`; an empty literal holds booleans.
    pub fn sequence_lit(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        self.member_lit(Kind::Sequence, operands, Kind::Bool)
    }

    /// `(operands)`, members of any kinds.
    pub fn tuple_lit(&mut self, operands: Vec<NodeId>) -> EngineResult<NodeId> {
        for operand in &operands {
            self.check(*operand)?;
        }
        Ok(self.members_node(Kind::Tuple, operands, View::Tuple(TupleView::new())))
    }

    /// The total function mapping the `i`th value of `from` to `images[i]`.
    pub fn function_lit(&mut self, from: &AnyDomain, images: Vec<NodeId>) -> EngineResult<NodeId> {
        let inner = self.common_kind(&images, Kind::Int)?;
        let preimages = Preimages::for_domain(from, false)
            .ok_or_else(|| EngineError::invalid_domain(format!("{} domain cannot index a function", from.kind())))?;
        if preimages.len() != images.len() {
            return Err(EngineError::invalid_operation(format!(
                "function literal needs {} images, got {}",
                preimages.len(),
                images.len()
            )));
        }
        let view = View::Function(FunctionView::new(inner, preimages));
        Ok(self.members_node(Kind::Function, images, view))
    }

    /// The members of the inner sequences of `sequence`, in order.
    pub fn flatten(&mut self, sequence: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[sequence], Kind::Sequence)?;
        let inner = match self.member_view(sequence) {
            View::Sequence(inner) => inner.inner(),
            other => return Err(EngineError::kind_mismatch(sequence, Kind::Sequence, other.kind())),
        };
        Ok(self.add(
            Expr::Flatten(Flatten { operand: sequence }),
            View::Sequence(SequenceView::new(inner)),
        ))
    }

    fn set_op(&mut self, kind: SetOpKind, operands: &[NodeId], inner: Kind) -> NodeId {
        self.add(
            Expr::SetOp(SetOp {
                kind,
                operands: SmallVec::from_slice(operands),
            }),
            View::Set(SetView::new(inner)),
        )
    }

    pub fn intersect(&mut self, left: NodeId, right: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[left, right], Kind::Set)?;
        let inner = self.set_view(left).inner();
        Ok(self.set_op(SetOpKind::Intersect, &[left, right], inner))
    }

    /// `{lower..upper}`, empty when `lower > upper`.
    pub fn int_range(&mut self, lower: NodeId, upper: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[lower, upper], Kind::Int)?;
        Ok(self.set_op(SetOpKind::IntRange, &[lower, upper], Kind::Int))
    }

    /// The preimages that `function` maps to `value`.
    pub fn function_preimage(&mut self, function: NodeId, value: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[function], Kind::Function)?;
        self.check(value)?;
        let inner = self.function_view(function).preimages().kind();
        Ok(self.set_op(SetOpKind::Preimage, &[function, value], inner))
    }

    /// The members sharing a part with `value`.
    pub fn party(&mut self, value: NodeId, partition: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[partition], Kind::Partition)?;
        self.check(value)?;
        let inner = self.partition_view(partition).inner();
        Ok(self.set_op(SetOpKind::Party, &[value, partition], inner))
    }

    /// `{lower..upper}` over enum values, empty when `lower > upper`.
    pub fn enum_range(&mut self, lower: NodeId, upper: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[lower, upper], Kind::Enum)?;
        Ok(self.set_op(SetOpKind::EnumRange, &[lower, upper], Kind::Enum))
    }

    /// The preimages `function` maps to some image.
    pub fn function_defined(&mut self, function: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[function], Kind::Function)?;
        let inner = self.function_view(function).preimages().kind();
        Ok(self.set_op(SetOpKind::FunctionDefined, &[function], inner))
    }

    /// The subsets of `set` with at most `max_size` members, or all of them.
    ///
    /// Undefined while the subset count exceeds the configured power set limit.
    pub fn power_set(&mut self, set: NodeId, max_size: Option<usize>) -> EngineResult<NodeId> {
        self.expect_kinds(&[set], Kind::Set)?;
        Ok(self.set_op(SetOpKind::PowerSet(max_size), &[set], Kind::Set))
    }

    /// The non-empty parts of `partition`, as a set of sets.
    pub fn parts(&mut self, partition: NodeId) -> EngineResult<NodeId> {
        self.expect_kinds(&[partition], Kind::Partition)?;
        Ok(self.set_op(SetOpKind::Parts, &[partition], Kind::Set))
    }

    // ==================== Quantifiers ====================

    fn placeholder_for(&mut self, container: NodeId) -> EngineResult<NodeId> {
        self.check(container)?;
        let kind = self.kind(container);
        if !matches!(kind, Kind::Set | Kind::MSet | Kind::Sequence) {
            return Err(EngineError::kind_mismatch(container, Kind::Set, kind));
        }
        let view = self.member_view(container);
        let id = self.add(Expr::Iter(Reference::default()), view);
        self.node_mut(id).flags.evaluated = true;
        Ok(id)
    }

    fn finish_quantifier(
        &mut self,
        container: NodeId,
        placeholder: NodeId,
        condition: Option<NodeId>,
        template: NodeId,
    ) -> EngineResult<NodeId> {
        self.check(template)?;
        let inner = self.kind(template);
        let quantifier = Quantifier::new(container, template, placeholder, condition);
        Ok(self.add(
            Expr::Quantifier(Box::new(quantifier)),
            View::Sequence(SequenceView::new(inner)),
        ))
    }

    /// What a quantifier over `container` iterates, its placeholder, and the
    /// node its body reads.
    ///
    /// A function is iterated over its defined preimages, and the body reads
    /// `(preimage, image)` pairs. A partition is iterated over its parts.
    fn quantified(&mut self, container: NodeId) -> EngineResult<(NodeId, NodeId, NodeId)> {
        self.check(container)?;
        match self.kind(container) {
            Kind::Function => {}
            Kind::Partition => {
                let parts = self.parts(container)?;
                let placeholder = self.placeholder_for(parts)?;
                return Ok((parts, placeholder, placeholder));
            }
            _ => {
                let placeholder = self.placeholder_for(container)?;
                return Ok((container, placeholder, placeholder));
            }
        }
        let defined = self.function_defined(container)?;
        let placeholder = self.placeholder_for(defined)?;
        let image = self.function_image(container, placeholder)?;
        let pair = self.tuple_lit(vec![placeholder, image])?;
        Ok((defined, placeholder, pair))
    }

    /// The sequence of `body(member)` over the members of `container`.
    ///
    /// `body` receives the iterator standing for the member.
    pub fn quantify<F>(&mut self, container: NodeId, body: F) -> EngineResult<NodeId>
    where
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        let (iterated, placeholder, member) = self.quantified(container)?;
        let template = body(self, member)?;
        self.finish_quantifier(iterated, placeholder, None, template)
    }

    /// The sequence of `body(window)` over the windows of `width` consecutive
    /// members of `sequence` that end at the one-based positions
    /// `lower..=upper`.
    ///
    /// Each window is a tuple; a window reaching outside the sequence is
    /// undefined.
    pub fn quantify_windows<F>(
        &mut self,
        sequence: NodeId,
        lower: NodeId,
        upper: NodeId,
        width: usize,
        body: F,
    ) -> EngineResult<NodeId>
    where
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        self.expect_kinds(&[sequence], Kind::Sequence)?;
        if width == 0 {
            return Err(EngineError::invalid_operation("windows need a positive width"));
        }
        let ends = self.int_range(lower, upper)?;
        let end = self.placeholder_for(ends)?;
        let mut members = Vec::with_capacity(width);
        for back in (0..width).rev() {
            let position = match back {
                0 => end,
                _ => {
                    let offset = self.constant(Literal::Int(back as i64));
                    self.minus(end, offset)?
                }
            };
            members.push(self.sequence_index(sequence, position)?);
        }
        let window = self.tuple_lit(members)?;
        let template = body(self, window)?;
        self.finish_quantifier(ends, end, None, template)
    }

    /// Like [`Self::quantify`], keeping only members for which `condition` holds.
    pub fn quantify_where<C, F>(&mut self, container: NodeId, condition: C, body: F) -> EngineResult<NodeId>
    where
        C: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        let (iterated, placeholder, member) = self.quantified(container)?;
        let condition = condition(self, member)?;
        self.expect_kinds(&[condition], Kind::Bool)?;
        let template = body(self, member)?;
        self.finish_quantifier(iterated, placeholder, Some(condition), template)
    }

    /// `forall member in container: body(member)`.
    pub fn forall<F>(&mut self, container: NodeId, body: F) -> EngineResult<NodeId>
    where
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        let quantifier = self.quantify(container, body)?;
        self.and(quantifier)
    }

    /// `exists member in container: body(member)`.
    pub fn exists<F>(&mut self, container: NodeId, body: F) -> EngineResult<NodeId>
    where
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        let quantifier = self.quantify(container, body)?;
        self.or(quantifier)
    }

    /// `sum member in container: body(member)`.
    pub fn sum_over<F>(&mut self, container: NodeId, body: F) -> EngineResult<NodeId>
    where
        F: FnOnce(&mut Graph, NodeId) -> EngineResult<NodeId>,
    {
        let quantifier = self.quantify(container, body)?;
        self.sum(quantifier)
    }
}
