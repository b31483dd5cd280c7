//! Partition views.
//!
//! A partition places every member of its (enumerable) inner domain in
//! exactly one part. Parts are numbered; there is one part slot per member so
//! that any member can always move to a fresh part. Only non-empty parts are
//! counted and hashed.

use std::collections::HashMap;
use tarn_core::{mix, HashType, Kind, NodeId};

/// Per-part bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartInfo {
    pub size: usize,
    /// Sum of mixed member hashes.
    pub hash: HashType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionView {
    inner: Kind,
    members: Vec<NodeId>,
    member_hashes: Vec<HashType>,
    hash_index: HashMap<HashType, usize>,
    member_part: Vec<usize>,
    parts: Vec<PartInfo>,
    number_parts: usize,
    hash_total: HashType,
}

impl PartitionView {
    pub fn new(inner: Kind) -> Self {
        Self {
            inner,
            members: Vec::new(),
            member_hashes: Vec::new(),
            hash_index: HashMap::new(),
            member_part: Vec::new(),
            parts: Vec::new(),
            number_parts: 0,
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

    pub fn index_of(&self, hash: HashType) -> Option<usize> {
        self.hash_index.get(&hash).copied()
    }

    pub fn part_of(&self, member: usize) -> usize {
        self.member_part[member]
    }

    /// Number of non-empty parts.
    pub fn number_parts(&self) -> usize {
        self.number_parts
    }

    pub fn part_info(&self, part: usize) -> PartInfo {
        self.parts.get(part).copied().unwrap_or_default()
    }

    /// Member indices of one part, in member order.
    pub fn part_members(&self, part: usize) -> Vec<usize> {
        (0..self.members.len())
            .filter(|m| self.member_part[*m] == part)
            .collect()
    }

    /// Indices of non-empty parts.
    pub fn non_empty_parts(&self) -> Vec<usize> {
        (0..self.parts.len())
            .filter(|p| self.parts[*p].size > 0)
            .collect()
    }

    fn detach(&mut self, part: usize) {
        let info = self.parts[part];
        if info.size > 0 {
            self.hash_total -= mix(info.hash);
        }
    }

    fn attach(&mut self, part: usize) {
        let info = self.parts[part];
        if info.size > 0 {
            self.hash_total += mix(info.hash);
        }
    }

    /// Add a member to `part`; used while building.
    pub(crate) fn push(&mut self, member: NodeId, hash: HashType, part: usize) -> usize {
        let index = self.members.len();
        self.members.push(member);
        self.member_hashes.push(hash);
        self.hash_index.insert(hash, index);
        self.member_part.push(part);
        if self.parts.len() < self.members.len() {
            self.parts.resize(self.members.len(), PartInfo::default());
        }
        if part >= self.parts.len() {
            self.parts.resize(part + 1, PartInfo::default());
        }
        self.detach(part);
        if self.parts[part].size == 0 {
            self.number_parts += 1;
        }
        self.parts[part].size += 1;
        self.parts[part].hash += mix(hash);
        self.attach(part);
        index
    }

    /// Move member `index` into part `to`; returns the part it left.
    pub(crate) fn move_member(&mut self, index: usize, to: usize) -> usize {
        let from = self.member_part[index];
        if from == to {
            return from;
        }
        let hash = self.member_hashes[index];
        self.detach(from);
        self.detach(to);
        self.parts[from].size -= 1;
        self.parts[from].hash -= mix(hash);
        if self.parts[from].size == 0 {
            self.number_parts -= 1;
        }
        if self.parts[to].size == 0 {
            self.number_parts += 1;
        }
        self.parts[to].size += 1;
        self.parts[to].hash += mix(hash);
        self.member_part[index] = to;
        self.attach(from);
        self.attach(to);
        from
    }

    /// A part with no members, if any.
    pub fn empty_part(&self) -> Option<usize> {
        self.parts.iter().position(|p| p.size == 0)
    }

    pub(crate) fn rehash(&mut self, index: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.member_hashes[index], hash);
        if self.hash_index.get(&old) == Some(&index) {
            self.hash_index.remove(&old);
        }
        self.hash_index.insert(hash, index);
        let part = self.member_part[index];
        self.detach(part);
        self.parts[part].hash -= mix(old);
        self.parts[part].hash += mix(hash);
        self.attach(part);
        old
    }
}
