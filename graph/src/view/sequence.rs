//! Sequence and tuple views.
//!
//! Both are ordered; their aggregate hash is a sum of positional hashes, so
//! an insertion or removal rehashes every later position.

use tarn_core::{positional, HashType, Kind, NodeId};

/// Ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceView {
    inner: Kind,
    members: Vec<NodeId>,
    member_hashes: Vec<HashType>,
    hash_total: HashType,
}

impl SequenceView {
    pub fn new(inner: Kind) -> Self {
        Self {
            inner,
            members: Vec::new(),
            member_hashes: Vec::new(),
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

    fn unhash_from(&mut self, start: usize) {
        for (i, h) in self.member_hashes.iter().enumerate().skip(start) {
            self.hash_total -= positional(i, *h);
        }
    }

    fn rehash_from(&mut self, start: usize) {
        for (i, h) in self.member_hashes.iter().enumerate().skip(start) {
            self.hash_total += positional(i, *h);
        }
    }

    pub(crate) fn push(&mut self, member: NodeId, hash: HashType) -> usize {
        let index = self.members.len();
        self.insert(index, member, hash);
        index
    }

    pub(crate) fn insert(&mut self, index: usize, member: NodeId, hash: HashType) {
        self.unhash_from(index);
        self.members.insert(index, member);
        self.member_hashes.insert(index, hash);
        self.rehash_from(index);
    }

    pub(crate) fn remove(&mut self, index: usize) -> (NodeId, HashType) {
        self.unhash_from(index);
        let member = self.members.remove(index);
        let hash = self.member_hashes.remove(index);
        self.rehash_from(index);
        (member, hash)
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.hash_total -= positional(a, self.member_hashes[a]);
        self.hash_total -= positional(b, self.member_hashes[b]);
        self.members.swap(a, b);
        self.member_hashes.swap(a, b);
        self.hash_total += positional(a, self.member_hashes[a]);
        self.hash_total += positional(b, self.member_hashes[b]);
    }

    pub(crate) fn rehash(&mut self, index: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.member_hashes[index], hash);
        self.hash_total -= positional(index, old);
        self.hash_total += positional(index, hash);
        old
    }

    pub(crate) fn clear(&mut self) -> Vec<NodeId> {
        self.member_hashes.clear();
        self.hash_total = HashType::ZERO;
        std::mem::take(&mut self.members)
    }
}

/// Fixed-length heterogeneous members.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleView {
    members: Vec<NodeId>,
    member_hashes: Vec<HashType>,
    hash_total: HashType,
}

impl TupleView {
    pub fn new() -> Self {
        Self::default()
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

    pub(crate) fn push(&mut self, member: NodeId, hash: HashType) {
        self.hash_total += positional(self.members.len(), hash);
        self.members.push(member);
        self.member_hashes.push(hash);
    }

    pub(crate) fn rehash(&mut self, index: usize, hash: HashType) -> HashType {
        let old = std::mem::replace(&mut self.member_hashes[index], hash);
        self.hash_total -= positional(index, old);
        self.hash_total += positional(index, hash);
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::Literal;

    fn id(i: u32) -> NodeId {
        NodeId::new(i, 0)
    }

    fn h(v: i64) -> HashType {
        HashType::of_int(v)
    }

    fn literal_hash(values: &[i64]) -> HashType {
        Literal::sequence(Literal::ints(values.iter().copied())).hash()
    }

    // ========== TEST: insert_and_remove_keep_positional_hash ==========
    #[test]
    fn test_insert_and_remove_keep_positional_hash() {
        // GIVEN [1, 3]
        let mut seq = SequenceView::new(Kind::Int);
        seq.push(id(1), h(1));
        seq.push(id(3), h(3));

        // WHEN 2 is inserted in the middle
        seq.insert(1, id(2), h(2));

        // THEN the hash equals that of the literal [1, 2, 3]
        assert_eq!(seq.hash_total(), literal_hash(&[1, 2, 3]));

        // WHEN the head is removed
        seq.remove(0);
        assert_eq!(seq.members(), &[id(2), id(3)]);
        assert_eq!(seq.hash_total(), literal_hash(&[2, 3]));
    }

    #[test]
    fn test_swap_updates_hash() {
        let mut seq = SequenceView::new(Kind::Int);
        seq.push(id(1), h(1));
        seq.push(id(2), h(2));
        seq.swap(0, 1);
        assert_eq!(seq.hash_total(), literal_hash(&[2, 1]));
    }

    #[test]
    fn test_tuple_rehash() {
        let mut tuple = TupleView::new();
        tuple.push(id(0), h(1));
        tuple.push(id(1), h(2));
        tuple.rehash(1, h(5));
        assert_eq!(
            tuple.hash_total(),
            Literal::tuple(Literal::ints([1, 5])).hash()
        );
    }
}
