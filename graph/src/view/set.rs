//! Set and multiset views.

use std::collections::HashMap;
use tarn_core::{mix, HashType, Kind, NodeId};

/// Members with distinct hashes, indexed by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetView {
    inner: Kind,
    members: Vec<NodeId>,
    member_hashes: Vec<HashType>,
    hash_index: HashMap<HashType, usize>,
    hash_total: HashType,
}

impl SetView {
    pub fn new(inner: Kind) -> Self {
        Self {
            inner,
            members: Vec::new(),
            member_hashes: Vec::new(),
            hash_index: HashMap::new(),
            hash_total: HashType::ZERO,
        }
    }

    pub fn inner(&self) -> Kind {
        self.inner
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn member_hashes(&self) -> &[HashType] {
        &self.member_hashes
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sum of mixed member hashes.
    pub fn hash_total(&self) -> HashType {
        self.hash_total
    }

    pub fn contains(&self, hash: HashType) -> bool {
        self.hash_index.contains_key(&hash)
    }

    pub fn index_of(&self, hash: HashType) -> Option<usize> {
        self.hash_index.get(&hash).copied()
    }

    /// Append a member whose hash is not yet present; returns its index.
    pub(crate) fn push(&mut self, member: NodeId, hash: HashType) -> usize {
        debug_assert!(!self.hash_index.contains_key(&hash));
        let index = self.members.len();
        self.members.push(member);
        self.member_hashes.push(hash);
        self.hash_index.insert(hash, index);
        self.hash_total += mix(hash);
        index
    }

    /// Remove the member at `index`, moving the last member into its place.
    pub(crate) fn swap_remove(&mut self, index: usize) -> (NodeId, HashType) {
        let member = self.members.swap_remove(index);
        let hash = self.member_hashes.swap_remove(index);
        self.hash_index.remove(&hash);
        if index < self.members.len() {
            self.hash_index.insert(self.member_hashes[index], index);
        }
        self.hash_total -= mix(hash);
        (member, hash)
    }

    pub(crate) fn rehash(&mut self, index: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.member_hashes[index], hash);
        if self.hash_index.get(&old) == Some(&index) {
            self.hash_index.remove(&old);
        }
        self.hash_index.insert(hash, index);
        self.hash_total -= mix(old);
        self.hash_total += mix(hash);
        old
    }

    pub(crate) fn clear(&mut self) -> Vec<NodeId> {
        self.member_hashes.clear();
        self.hash_index.clear();
        self.hash_total = HashType::ZERO;
        std::mem::take(&mut self.members)
    }
}

/// Members with multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MSetView {
    inner: Kind,
    members: Vec<NodeId>,
    member_hashes: Vec<HashType>,
    counts: HashMap<HashType, usize>,
    hash_total: HashType,
}

impl MSetView {
    pub fn new(inner: Kind) -> Self {
        Self {
            inner,
            members: Vec::new(),
            member_hashes: Vec::new(),
            counts: HashMap::new(),
            hash_total: HashType::ZERO,
        }
    }

    pub fn inner(&self) -> Kind {
        self.inner
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn member_hashes(&self) -> &[HashType] {
        &self.member_hashes
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn hash_total(&self) -> HashType {
        self.hash_total
    }

    /// Multiplicity of a value.
    pub fn count(&self, hash: HashType) -> usize {
        self.counts.get(&hash).copied().unwrap_or(0)
    }

    /// Distinct hashes with their multiplicities.
    pub fn counts(&self) -> impl Iterator<Item = (HashType, usize)> + '_ {
        self.counts.iter().map(|(h, c)| (*h, *c))
    }

    pub(crate) fn push(&mut self, member: NodeId, hash: HashType) -> usize {
        let index = self.members.len();
        self.members.push(member);
        self.member_hashes.push(hash);
        *self.counts.entry(hash).or_insert(0) += 1;
        self.hash_total += mix(hash);
        index
    }

    pub(crate) fn swap_remove(&mut self, index: usize) -> (NodeId, HashType) {
        let member = self.members.swap_remove(index);
        let hash = self.member_hashes.swap_remove(index);
        self.decrement(hash);
        self.hash_total -= mix(hash);
        (member, hash)
    }

    pub(crate) fn rehash(&mut self, index: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.member_hashes[index], hash);
        self.decrement(old);
        *self.counts.entry(hash).or_insert(0) += 1;
        self.hash_total -= mix(old);
        self.hash_total += mix(hash);
        old
    }

    fn decrement(&mut self, hash: HashType) {
        if let Some(count) = self.counts.get_mut(&hash) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&hash);
            }
        }
    }
}
