//! Mutation of value leaves.
//!
//! The `*_and_notify` primitives change a container view and emit the
//! matching event in the same call, then report the new aggregate hash to
//! the enclosing container, if any. Public mutators validate a move against
//! the leaf's domain before anything changes, open a new forwarding round
//! and go through those primitives.

use crate::eval::free_value;
use crate::event::{Event, PartMove, Prior};
use crate::expr::Expr;
use crate::literal::{emptied, scalar_view};
use crate::node::{Pool, ValueBase};
use crate::view::View;
use crate::Graph;
use smallvec::SmallVec;
use std::collections::HashSet;
use tarn_core::{AnyDomain, EngineError, EngineResult, Kind, Literal, NodeId, SizeAttr, VarId};

/// Rules a container domain imposes on membership changes.
struct MemberRules {
    inner: Option<AnyDomain>,
    size: SizeAttr,
    distinct: bool,
}

impl Graph {
    // ==================== Primitives ====================

    /// Enclosing container of a member leaf, and the leaf's position in it.
    fn parent_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        match self.value_base(id)? {
            ValueBase {
                pool: Pool::Container(parent),
                id,
            } => Some((parent, id.raw())),
            _ => None,
        }
    }

    fn set_var_id(&mut self, id: NodeId, index: usize) {
        if let Some(node) = self.try_node_mut(id) {
            if let Expr::Value(base) = &mut node.expr {
                base.id = VarId::new(index);
            }
        }
    }

    /// Renumber member leaves at `positions` after a structural change.
    fn renumber(&mut self, container: NodeId, positions: impl IntoIterator<Item = usize>) {
        for index in positions {
            if let Some(member) = self.node(container).view.member_at(index) {
                self.set_var_id(member, index);
            }
        }
    }

    /// A value leaf changed; tell the enclosing container.
    pub(crate) fn after_value_changed(&mut self, id: NodeId, prior: Prior) {
        if let Some((parent, index)) = self.parent_of(id) {
            if self.contains(parent) {
                self.member_changed_and_notify(parent, index, prior);
            }
        }
    }

    pub(crate) fn member_changed_and_notify(&mut self, container: NodeId, index: usize, prior: Prior) {
        let old = self.node(container).view.hash();
        let Some(member) = self.node(container).view.member_at(index) else {
            return;
        };
        let hash = self.hash_of(member);
        self.own_view_mut(container).rehash_member(index, hash);
        self.notify(container, &Event::MemberChanged { index, prior });
        self.after_value_changed(container, Prior::Hash(old));
    }

    /// Overwrite a scalar leaf and publish the change.
    pub(crate) fn assign_scalar(&mut self, id: NodeId, view: View) {
        let before = self.snapshot(id);
        self.store(id, Some(view));
        self.publish(id, before);
        if self.prior(id) != before.prior {
            self.after_value_changed(id, before.prior);
        }
    }

    /// Append `leaf` to a set, multiset or sequence; returns its index.
    pub(crate) fn add_member_and_notify(&mut self, container: NodeId, leaf: NodeId) -> usize {
        let old = self.node(container).view.hash();
        let hash = self.hash_of(leaf);
        let index = match self.own_view_mut(container) {
            View::Set(view) => view.push(leaf, hash),
            View::MSet(view) => view.push(leaf, hash),
            View::Sequence(view) => view.push(leaf, hash),
            other => unreachable!("append to {} view on {}", other.kind(), container),
        };
        self.set_var_id(leaf, index);
        self.notify(container, &Event::Added { index, member: leaf });
        self.after_value_changed(container, Prior::Hash(old));
        index
    }

    pub(crate) fn insert_member_and_notify(&mut self, sequence: NodeId, index: usize, leaf: NodeId) {
        let old = self.node(sequence).view.hash();
        let hash = self.hash_of(leaf);
        let len = match self.own_view_mut(sequence) {
            View::Sequence(view) => {
                view.insert(index, leaf, hash);
                view.len()
            }
            other => unreachable!("insert into {} view on {}", other.kind(), sequence),
        };
        self.renumber(sequence, index..len);
        self.notify(sequence, &Event::Added { index, member: leaf });
        self.after_value_changed(sequence, Prior::Hash(old));
    }

    /// Remove the member at `index`. The returned leaf is still allocated so
    /// listeners could read it; the caller frees it.
    pub(crate) fn remove_member_and_notify(&mut self, container: NodeId, index: usize) -> NodeId {
        let old = self.node(container).view.hash();
        let (member, hash, shifted) = match self.own_view_mut(container) {
            View::Set(view) => {
                let (member, hash) = view.swap_remove(index);
                (member, hash, index..(index + 1).min(view.len()))
            }
            View::MSet(view) => {
                let (member, hash) = view.swap_remove(index);
                (member, hash, index..(index + 1).min(view.len()))
            }
            View::Sequence(view) => {
                let (member, hash) = view.remove(index);
                (member, hash, index..view.len())
            }
            other => unreachable!("remove from {} view on {}", other.kind(), container),
        };
        self.renumber(container, shifted);
        self.notify(
            container,
            &Event::Removed {
                index,
                member,
                hash,
            },
        );
        self.after_value_changed(container, Prior::Hash(old));
        member
    }

    pub(crate) fn swap_members_and_notify(&mut self, container: NodeId, a: usize, b: usize) {
        let old = self.node(container).view.hash();
        match self.own_view_mut(container) {
            View::Sequence(view) => view.swap(a, b),
            View::Function(view) => view.swap(a, b),
            other => unreachable!("swap in {} view on {}", other.kind(), container),
        }
        self.renumber(container, [a, b]);
        self.notify(container, &Event::Swapped { a, b });
        self.after_value_changed(container, Prior::Hash(old));
    }

    /// Move partition members into new parts: `(member, part)` pairs.
    pub(crate) fn move_parts_and_notify(&mut self, partition: NodeId, moves: &[(usize, usize)]) {
        let old = self.node(partition).view.hash();
        let mut applied: SmallVec<[PartMove; 2]> = SmallVec::new();
        if let View::Partition(view) = self.own_view_mut(partition) {
            for (member, to) in moves {
                let from = view.move_member(*member, *to);
                if from != *to {
                    applied.push(PartMove {
                        member: *member,
                        from,
                        to: *to,
                    });
                }
            }
        }
        if applied.is_empty() {
            return;
        }
        self.notify(partition, &Event::PartsChanged { moves: applied });
        self.after_value_changed(partition, Prior::Hash(old));
    }

    // ==================== Validation ====================

    /// The decision variable a leaf belongs to, following enclosing containers.
    pub fn owning_variable(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.value_base(current)?.pool {
                Pool::Variable => return Some(current),
                Pool::Constant => return None,
                Pool::Container(parent) => current = parent,
            }
        }
    }

    fn expect_mutable(&self, id: NodeId) -> EngineResult<()> {
        self.check(id)?;
        match self.owning_variable(id) {
            Some(_) => Ok(()),
            None => Err(EngineError::NotAVariable(id)),
        }
    }

    fn expect_index(&self, id: NodeId, index: usize, size: usize) -> EngineResult<()> {
        if index < size {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange {
                node: id,
                index,
                size,
            })
        }
    }

    fn member_rules(&self, container: NodeId) -> MemberRules {
        match &self.node(container).domain {
            Some(AnyDomain::Set(d)) => MemberRules {
                inner: Some(d.inner.clone()),
                size: d.size,
                distinct: true,
            },
            Some(AnyDomain::MSet(d)) => MemberRules {
                inner: Some(d.inner.clone()),
                size: d.size,
                distinct: false,
            },
            Some(AnyDomain::Sequence(d)) => MemberRules {
                inner: Some(d.inner.clone()),
                size: d.size,
                distinct: d.injective,
            },
            _ => MemberRules {
                inner: None,
                size: SizeAttr::NoSize,
                distinct: self.kind(container) == Kind::Set,
            },
        }
    }

    /// Whether a member literal may join (or replace member `except` of) a container.
    fn check_member(
        &self,
        container: NodeId,
        rules: &MemberRules,
        literal: &Literal,
        except: Option<usize>,
    ) -> EngineResult<()> {
        if let Some(expected) = self.member_kind(container) {
            if literal.kind() != expected {
                return Err(EngineError::kind_mismatch(container, expected, literal.kind()));
            }
        }
        if rules.inner.as_ref().is_some_and(|d| !d.contains(literal)) {
            return Err(EngineError::NotInDomain {
                node: container,
                value: literal.to_string(),
            });
        }
        if rules.distinct {
            let hash = literal.hash();
            let clash = match &self.node(container).view {
                View::Set(set) => set.index_of(hash).is_some_and(|i| Some(i) != except),
                // injective sequences keep no hash index
                view => (0..view.len()).any(|i| Some(i) != except && view.member_hash(i) == Some(hash)),
            };
            if clash {
                return Err(EngineError::DuplicateMember {
                    node: container,
                    value: literal.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Everything `assign` needs to hold before it touches the graph.
    fn check_value(&self, id: NodeId, literal: &Literal) -> EngineResult<()> {
        if literal.kind() != self.kind(id) {
            return Err(EngineError::kind_mismatch(id, self.kind(id), literal.kind()));
        }
        let in_domain = self
            .node(id)
            .domain
            .as_ref()
            .map_or(true, |d| d.contains(literal));
        if !in_domain {
            return Err(EngineError::NotInDomain {
                node: id,
                value: literal.to_string(),
            });
        }
        let members: Option<Vec<&Literal>> = match literal {
            Literal::Set(members) => Some(members.iter().collect()),
            Literal::Partition(parts) => Some(parts.iter().flatten().collect()),
            _ => None,
        };
        if let Some(members) = members {
            let mut seen = HashSet::new();
            if let Some(duplicate) = members.into_iter().find(|m| !seen.insert(m.hash())) {
                return Err(EngineError::DuplicateMember {
                    node: id,
                    value: duplicate.to_string(),
                });
            }
        }
        if let Some((parent, index)) = self.parent_of(id) {
            match self.kind(parent) {
                Kind::Partition => {
                    return Err(EngineError::unsupported(
                        "partition members change parts through partition_move",
                    ))
                }
                Kind::Set | Kind::MSet | Kind::Sequence => {
                    let rules = self.member_rules(parent);
                    self.check_member(parent, &rules, literal, Some(index))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Write a validated literal into a leaf.
    fn write(&mut self, id: NodeId, literal: &Literal) -> EngineResult<()> {
        if let Some(view) = scalar_view(literal) {
            self.assign_scalar(id, view);
            return Ok(());
        }
        let old = self.node(id).view.hash();
        let domain = self.node(id).domain.clone();
        let empty = emptied(&self.node(id).view);
        let members = std::mem::replace(self.own_view_mut(id), empty).members();
        for member in members {
            free_value(self, member);
        }
        self.fill_members(id, literal, domain.as_ref(), false)?;
        self.notify(id, &Event::Replaced);
        self.after_value_changed(id, Prior::Hash(old));
        Ok(())
    }

    // ==================== Mutators ====================

    /// Overwrite the value of a decision variable or one of its members.
    pub fn assign(&mut self, id: NodeId, literal: Literal) -> EngineResult<()> {
        self.expect_mutable(id)?;
        self.check_value(id, &literal)?;
        self.begin_round();
        self.write(id, &literal)
    }

    /// Member leaf at `index` of a container.
    pub fn member(&self, container: NodeId, index: usize) -> EngineResult<NodeId> {
        self.check(container)?;
        let view = self.view(container);
        view.member_at(index).ok_or(EngineError::IndexOutOfRange {
            node: container,
            index,
            size: view.len(),
        })
    }

    /// Add a member to a set, multiset or (at the end) a sequence.
    pub fn add_member(&mut self, container: NodeId, literal: Literal) -> EngineResult<usize> {
        let len = self.size(container);
        self.insert_checked(container, len, literal, false)
    }

    /// Insert a member into a sequence; later members shift up.
    pub fn sequence_insert(&mut self, sequence: NodeId, index: usize, literal: Literal) -> EngineResult<()> {
        self.expect_kind(sequence, Kind::Sequence)?;
        self.insert_checked(sequence, index, literal, true).map(|_| ())
    }

    fn insert_checked(
        &mut self,
        container: NodeId,
        index: usize,
        literal: Literal,
        positional: bool,
    ) -> EngineResult<usize> {
        self.expect_mutable(container)?;
        let kind = self.kind(container);
        if !matches!(kind, Kind::Set | Kind::MSet | Kind::Sequence) {
            return Err(EngineError::kind_mismatch(container, Kind::Set, kind));
        }
        let len = self.size(container);
        self.expect_index(container, index, len + 1)?;
        let rules = self.member_rules(container);
        if !rules.size.allows(len + 1) {
            return Err(EngineError::SizeOutOfBounds {
                node: container,
                size: len + 1,
            });
        }
        self.check_member(container, &rules, &literal, None)?;
        self.begin_round();
        let base = ValueBase {
            pool: Pool::Container(container),
            id: VarId::new(index),
        };
        let leaf = self.alloc_value(&literal, base, rules.inner.as_ref())?;
        if positional && index < len {
            self.insert_member_and_notify(container, index, leaf);
            Ok(index)
        } else {
            Ok(self.add_member_and_notify(container, leaf))
        }
    }

    /// Remove the member at `index` of a set, multiset or sequence.
    pub fn remove_member(&mut self, container: NodeId, index: usize) -> EngineResult<()> {
        self.expect_mutable(container)?;
        let kind = self.kind(container);
        if !matches!(kind, Kind::Set | Kind::MSet | Kind::Sequence) {
            return Err(EngineError::kind_mismatch(container, Kind::Set, kind));
        }
        let len = self.size(container);
        self.expect_index(container, index, len)?;
        if !self.member_rules(container).size.allows(len - 1) {
            return Err(EngineError::SizeOutOfBounds {
                node: container,
                size: len - 1,
            });
        }
        self.begin_round();
        let leaf = self.remove_member_and_notify(container, index);
        free_value(self, leaf);
        Ok(())
    }

    pub fn sequence_remove(&mut self, sequence: NodeId, index: usize) -> EngineResult<()> {
        self.expect_kind(sequence, Kind::Sequence)?;
        self.remove_member(sequence, index)
    }

    /// Exchange two sequence members.
    pub fn sequence_swap(&mut self, sequence: NodeId, a: usize, b: usize) -> EngineResult<()> {
        self.expect_mutable(sequence)?;
        self.expect_kind(sequence, Kind::Sequence)?;
        let len = self.size(sequence);
        self.expect_index(sequence, a, len)?;
        self.expect_index(sequence, b, len)?;
        if a != b {
            self.begin_round();
            self.swap_members_and_notify(sequence, a, b);
        }
        Ok(())
    }

    /// Set the image of preimage slot `slot`, mapping it if it was unmapped.
    pub fn function_assign(&mut self, function: NodeId, slot: usize, literal: Literal) -> EngineResult<()> {
        self.expect_mutable(function)?;
        self.expect_kind(function, Kind::Function)?;
        self.expect_index(function, slot, self.size(function))?;
        if let Some(image) = self.function_view(function).image(slot) {
            self.check_value(image, &literal)?;
            self.begin_round();
            return self.write(image, &literal);
        }
        let to = match &self.node(function).domain {
            Some(AnyDomain::Function(d)) => Some(d.to.clone()),
            _ => None,
        };
        if to.as_ref().is_some_and(|d| !d.contains(&literal)) {
            return Err(EngineError::NotInDomain {
                node: function,
                value: literal.to_string(),
            });
        }
        let inner = self.function_view(function).inner();
        if literal.kind() != inner {
            return Err(EngineError::kind_mismatch(function, inner, literal.kind()));
        }
        self.begin_round();
        let base = ValueBase {
            pool: Pool::Container(function),
            id: VarId::new(slot),
        };
        let image = self.alloc_value(&literal, base, to.as_ref())?;
        let old = self.node(function).view.hash();
        let hash = self.hash_of(image);
        if let View::Function(view) = self.own_view_mut(function) {
            view.map(slot, image, hash);
        }
        self.notify(function, &Event::MemberDefined { index: slot });
        self.after_value_changed(function, Prior::Hash(old));
        Ok(())
    }

    /// Remove the image of `slot` from a partial function.
    pub fn function_unmap(&mut self, function: NodeId, slot: usize) -> EngineResult<()> {
        self.expect_mutable(function)?;
        self.expect_kind(function, Kind::Function)?;
        self.expect_index(function, slot, self.size(function))?;
        let partial = matches!(&self.node(function).domain, Some(AnyDomain::Function(d)) if d.partial);
        if !partial {
            return Err(EngineError::invalid_operation(format!(
                "{} is a total function",
                function
            )));
        }
        if self.function_view(function).image(slot).is_none() {
            return Ok(());
        }
        self.begin_round();
        let old = self.node(function).view.hash();
        let removed = match self.own_view_mut(function) {
            View::Function(view) => view.unmap(slot),
            _ => None,
        };
        self.notify(function, &Event::MemberUndefined { index: slot });
        self.after_value_changed(function, Prior::Hash(old));
        if let Some((image, _)) = removed {
            free_value(self, image);
        }
        Ok(())
    }

    /// Exchange the images of two preimage slots.
    pub fn function_swap(&mut self, function: NodeId, a: usize, b: usize) -> EngineResult<()> {
        self.expect_mutable(function)?;
        self.expect_kind(function, Kind::Function)?;
        let len = self.size(function);
        self.expect_index(function, a, len)?;
        self.expect_index(function, b, len)?;
        if a != b {
            self.begin_round();
            self.swap_members_and_notify(function, a, b);
        }
        Ok(())
    }

    /// Move one member into another part.
    pub fn partition_move(&mut self, partition: NodeId, member: usize, part: usize) -> EngineResult<()> {
        self.expect_mutable(partition)?;
        self.expect_kind(partition, Kind::Partition)?;
        let len = self.size(partition);
        self.expect_index(partition, member, len)?;
        self.expect_index(partition, part, len)?;
        let view = self.partition_view(partition);
        let from = view.part_of(member);
        if from == part {
            return Ok(());
        }
        let mut sizes: Vec<usize> = (0..len).map(|p| view.part_info(p).size).collect();
        sizes[from] -= 1;
        sizes[part] += 1;
        if let Some(AnyDomain::Partition(d)) = &self.node(partition).domain {
            let non_empty: Vec<usize> = sizes.iter().copied().filter(|s| *s > 0).collect();
            let regular = non_empty.windows(2).all(|w| w[0] == w[1]);
            if !d.number_parts.allows(non_empty.len())
                || !non_empty.iter().all(|s| d.part_size.allows(*s))
                || (d.regular && !regular)
            {
                return Err(EngineError::SizeOutOfBounds {
                    node: partition,
                    size: sizes[part],
                });
            }
        }
        self.begin_round();
        self.move_parts_and_notify(partition, &[(member, part)]);
        Ok(())
    }

    /// Exchange the parts of two members.
    pub fn partition_swap(&mut self, partition: NodeId, a: usize, b: usize) -> EngineResult<()> {
        self.expect_mutable(partition)?;
        self.expect_kind(partition, Kind::Partition)?;
        let len = self.size(partition);
        self.expect_index(partition, a, len)?;
        self.expect_index(partition, b, len)?;
        let view = self.partition_view(partition);
        let (part_a, part_b) = (view.part_of(a), view.part_of(b));
        if part_a != part_b {
            self.begin_round();
            self.move_parts_and_notify(partition, &[(a, part_b), (b, part_a)]);
        }
        Ok(())
    }
}
