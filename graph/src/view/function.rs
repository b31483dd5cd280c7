//! Function views.
//!
//! A function stores one image slot per preimage, in the enumeration order
//! of its preimage domain. How a preimage value is turned into a slot index
//! is chosen at construction:
//! - `Dimension`: arithmetic on a dense domain (bools, enums, int ranges)
//! - `Explicit`: a hash index over a listed preimage set, for sparse domains
//!   and partial functions

use std::collections::HashMap;
use std::rc::Rc;
use tarn_core::{positional, AnyDomain, HashType, IntDomain, Kind, Literal, NodeId};

/// Dense preimage domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    Bool,
    Enum(usize),
    Int(Rc<IntDomain>),
}

/// Preimage-to-slot strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preimages {
    Dimension(Dimension),
    Explicit {
        values: Vec<Literal>,
        index: HashMap<HashType, usize>,
    },
}

impl Preimages {
    /// Pick a strategy for a preimage domain.
    ///
    /// Partial functions and multi-range int domains get an explicit list.
    pub fn for_domain(domain: &AnyDomain, partial: bool) -> Option<Self> {
        let dense = match domain {
            AnyDomain::Bool => Some(Dimension::Bool),
            AnyDomain::Enum(d) => Some(Dimension::Enum(d.size())),
            AnyDomain::Int(d) if d.bounds().len() == 1 => Some(Dimension::Int(Rc::clone(d))),
            _ => None,
        };
        match dense {
            Some(dimension) if !partial => Some(Preimages::Dimension(dimension)),
            _ => {
                let values = domain.enumerate()?;
                let index = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v.hash(), i))
                    .collect();
                Some(Preimages::Explicit { values, index })
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Preimages::Dimension(Dimension::Bool) => 2,
            Preimages::Dimension(Dimension::Enum(size)) => *size,
            Preimages::Dimension(Dimension::Int(domain)) => domain.size() as usize,
            Preimages::Explicit { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> Kind {
        match self {
            Preimages::Dimension(Dimension::Bool) => Kind::Bool,
            Preimages::Dimension(Dimension::Enum(_)) => Kind::Enum,
            Preimages::Dimension(Dimension::Int(_)) => Kind::Int,
            Preimages::Explicit { values, .. } => values.first().map_or(Kind::Int, Literal::kind),
        }
    }

    /// Slot of the preimage with this hash.
    pub fn slot_of(&self, hash: HashType) -> Option<usize> {
        match self {
            Preimages::Dimension(Dimension::Bool) => (hash.0 < 2).then_some(hash.0 as usize),
            Preimages::Dimension(Dimension::Enum(size)) => {
                (hash.0 < *size as u64).then_some(hash.0 as usize)
            }
            Preimages::Dimension(Dimension::Int(domain)) => domain.index_of(hash.as_int()),
            Preimages::Explicit { index, .. } => index.get(&hash).copied(),
        }
    }

    /// Preimage value of a slot.
    pub fn value_of(&self, slot: usize) -> Option<Literal> {
        match self {
            Preimages::Dimension(Dimension::Bool) => (slot < 2).then_some(Literal::Bool(slot == 1)),
            Preimages::Dimension(Dimension::Enum(size)) => {
                (slot < *size).then_some(Literal::Enum(slot as u32))
            }
            Preimages::Dimension(Dimension::Int(domain)) => domain.value_at(slot).map(Literal::Int),
            Preimages::Explicit { values, .. } => values.get(slot).cloned(),
        }
    }
}

/// Images indexed by preimage slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionView {
    inner: Kind,
    images: Vec<Option<NodeId>>,
    image_hashes: Vec<HashType>,
    hash_total: HashType,
    preimages: Preimages,
}

impl FunctionView {
    pub fn new(inner: Kind, preimages: Preimages) -> Self {
        let size = preimages.len();
        Self {
            inner,
            images: vec![None; size],
            image_hashes: vec![HashType::ZERO; size],
            hash_total: HashType::ZERO,
            preimages,
        }
    }

    /// Kind of the images.
    pub fn inner(&self) -> Kind {
        self.inner
    }

    pub fn preimages(&self) -> &Preimages {
        &self.preimages
    }

    pub fn images(&self) -> &[Option<NodeId>] {
        &self.images
    }

    pub fn image(&self, slot: usize) -> Option<NodeId> {
        self.images.get(slot).copied().flatten()
    }

    pub fn image_hash(&self, slot: usize) -> Option<HashType> {
        self.image(slot).map(|_| self.image_hashes[slot])
    }

    /// Number of preimage slots.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn hash_total(&self) -> HashType {
        self.hash_total
    }

    pub(crate) fn map(&mut self, slot: usize, image: NodeId, hash: HashType) {
        debug_assert!(self.images[slot].is_none());
        self.images[slot] = Some(image);
        self.image_hashes[slot] = hash;
        self.hash_total += positional(slot, hash);
    }

    pub(crate) fn unmap(&mut self, slot: usize) -> Option<(NodeId, HashType)> {
        let image = self.images[slot].take()?;
        let hash = std::mem::replace(&mut self.image_hashes[slot], HashType::ZERO);
        self.hash_total -= positional(slot, hash);
        Some((image, hash))
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        for slot in [a, b] {
            if self.images[slot].is_some() {
                self.hash_total -= positional(slot, self.image_hashes[slot]);
            }
        }
        self.images.swap(a, b);
        self.image_hashes.swap(a, b);
        for slot in [a, b] {
            if self.images[slot].is_some() {
                self.hash_total += positional(slot, self.image_hashes[slot]);
            }
        }
    }

    pub(crate) fn rehash(&mut self, slot: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.image_hashes[slot], hash);
        self.hash_total -= positional(slot, old);
        self.hash_total += positional(slot, hash);
        old
    }
}
