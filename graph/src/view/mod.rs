//! Views: the cached, read-only state of a node.
//!
//! Scalars store their payload directly. Container views store member node
//! ids together with per-member hashes, a hash index where membership tests
//! need one, and an aggregate hash maintained on every mutation.

mod function;
mod partition;
mod sequence;
mod set;

pub use function::*;
pub use partition::*;
pub use sequence::*;
pub use set::*;

use tarn_core::{HashType, Kind, NodeId};

/// Cached state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Violation; zero means true.
    Bool(u64),
    Int(i64),
    Enum(u32),
    Set(SetView),
    MSet(MSetView),
    Sequence(SequenceView),
    Function(FunctionView),
    Partition(PartitionView),
    Tuple(TupleView),
}

impl View {
    /// An empty view of the given kind; `inner` is the member kind of containers.
    pub fn empty(kind: Kind, inner: Kind) -> Self {
        match kind {
            Kind::Bool => View::Bool(0),
            Kind::Int => View::Int(0),
            Kind::Enum => View::Enum(0),
            Kind::Set => View::Set(SetView::new(inner)),
            Kind::MSet => View::MSet(MSetView::new(inner)),
            Kind::Sequence => View::Sequence(SequenceView::new(inner)),
            Kind::Function => View::Function(FunctionView::new(inner, Preimages::Dimension(Dimension::Bool))),
            Kind::Partition => View::Partition(PartitionView::new(inner)),
            Kind::Tuple => View::Tuple(TupleView::new()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            View::Bool(_) => Kind::Bool,
            View::Int(_) => Kind::Int,
            View::Enum(_) => Kind::Enum,
            View::Set(_) => Kind::Set,
            View::MSet(_) => Kind::MSet,
            View::Sequence(_) => Kind::Sequence,
            View::Function(_) => Kind::Function,
            View::Partition(_) => Kind::Partition,
            View::Tuple(_) => Kind::Tuple,
        }
    }

    pub fn hash(&self) -> HashType {
        match self {
            View::Bool(violation) => HashType::of_bool(*violation == 0),
            View::Int(value) => HashType::of_int(*value),
            View::Enum(value) => HashType::of_enum(*value),
            View::Set(view) => view.hash_total(),
            View::MSet(view) => view.hash_total(),
            View::Sequence(view) => view.hash_total(),
            View::Function(view) => view.hash_total(),
            View::Partition(view) => view.hash_total(),
            View::Tuple(view) => view.hash_total(),
        }
    }

    /// Members in view order; functions list mapped images only.
    pub fn members(&self) -> Vec<NodeId> {
        match self {
            View::Bool(_) | View::Int(_) | View::Enum(_) => Vec::new(),
            View::Set(view) => view.members().to_vec(),
            View::MSet(view) => view.members().to_vec(),
            View::Sequence(view) => view.members().to_vec(),
            View::Function(view) => view.images().iter().flatten().copied().collect(),
            View::Partition(view) => view.members().to_vec(),
            View::Tuple(view) => view.members().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            View::Bool(_) | View::Int(_) | View::Enum(_) => 0,
            View::Set(view) => view.len(),
            View::MSet(view) => view.len(),
            View::Sequence(view) => view.len(),
            View::Function(view) => view.len(),
            View::Partition(view) => view.len(),
            View::Tuple(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of members, for homogeneous containers.
    pub fn inner_kind(&self) -> Option<Kind> {
        match self {
            View::Set(view) => Some(view.inner()),
            View::MSet(view) => Some(view.inner()),
            View::Sequence(view) => Some(view.inner()),
            View::Function(view) => Some(view.inner()),
            View::Partition(view) => Some(view.inner()),
            _ => None,
        }
    }

    /// Member at `index` in view order, where positions are meaningful.
    pub fn member_at(&self, index: usize) -> Option<NodeId> {
        match self {
            View::Set(view) => view.members().get(index).copied(),
            View::MSet(view) => view.members().get(index).copied(),
            View::Sequence(view) => view.members().get(index).copied(),
            View::Function(view) => view.images().get(index).copied().flatten(),
            View::Partition(view) => view.members().get(index).copied(),
            View::Tuple(view) => view.members().get(index).copied(),
            _ => None,
        }
    }

    /// Cached hash of the member at `index`.
    pub fn member_hash(&self, index: usize) -> Option<HashType> {
        match self {
            View::Set(view) => view.member_hashes().get(index).copied(),
            View::MSet(view) => view.member_hashes().get(index).copied(),
            View::Sequence(view) => view.member_hashes().get(index).copied(),
            View::Function(view) => view.image_hash(index),
            View::Partition(view) => view.member_hashes().get(index).copied(),
            View::Tuple(view) => view.member_hashes().get(index).copied(),
            _ => None,
        }
    }

    /// Replace the cached hash of member `index`; returns the old hash.
    pub(crate) fn rehash_member(&mut self, index: usize, hash: HashType) -> HashType {
        match self {
            View::Set(view) => view.rehash(index, hash),
            View::MSet(view) => view.rehash(index, hash),
            View::Sequence(view) => view.rehash(index, hash),
            View::Function(view) => view.rehash(index, hash),
            View::Partition(view) => view.rehash(index, hash),
            View::Tuple(view) => view.rehash(index, hash),
            other => unreachable!("rehash on scalar {} view", other.kind()),
        }
    }
}
