//! Domains describe the legal value space of each type.
//!
//! Domains are immutable once built and shared by reference (`Rc`) between
//! every expression of the same type.

use crate::{EngineError, EngineResult, Literal};
use std::fmt;
use std::rc::Rc;

/// The kind of a value, one per view variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Enum,
    Set,
    MSet,
    Sequence,
    Function,
    Partition,
    Tuple,
}

impl Kind {
    /// True for the kinds whose values hold members.
    pub fn is_container(&self) -> bool {
        !matches!(self, Kind::Bool | Kind::Int | Kind::Enum)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Enum => "enum",
            Kind::Set => "set",
            Kind::MSet => "mset",
            Kind::Sequence => "sequence",
            Kind::Function => "function",
            Kind::Partition => "partition",
            Kind::Tuple => "tuple",
        };
        f.write_str(name)
    }
}

/// Which side of the domain a value fell off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The value must decrease to satisfy the constraint.
    TooLarge,
    /// The value must increase to satisfy the constraint.
    TooSmall,
}

impl Reason {
    /// The opposite direction, as seen through a negation.
    pub fn flip(self) -> Self {
        match self {
            Reason::TooLarge => Reason::TooSmall,
            Reason::TooSmall => Reason::TooLarge,
        }
    }
}

// ==================== Int ====================

/// Result of locating a value among an int domain's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSearch {
    /// The value lies inside the bound at this index.
    Found(usize),
    /// The value lies in the gap between two adjacent bounds.
    Between { lower: usize, upper: usize },
    /// The value is smaller than every bound.
    BelowAll,
    /// The value is larger than every bound.
    AboveAll,
}

/// Distance from a value to the nearest bound of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundDistance {
    pub violation: u64,
    /// Index of the nearest bound.
    pub bound: usize,
    pub reason: Reason,
}

/// A union of inclusive integer ranges, kept sorted and merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntDomain {
    bounds: Vec<(i64, i64)>,
}

impl IntDomain {
    /// Build a domain from arbitrary bounds; overlapping or adjacent ranges merge.
    pub fn new(bounds: impl IntoIterator<Item = (i64, i64)>) -> EngineResult<Self> {
        let mut raw: Vec<(i64, i64)> = bounds.into_iter().collect();
        if raw.is_empty() {
            return Err(EngineError::invalid_domain("int domain has no bounds"));
        }
        if let Some(&(lower, upper)) = raw.iter().find(|(l, u)| l > u) {
            return Err(EngineError::invalid_domain(format!(
                "int bound {}..{} is empty",
                lower, upper
            )));
        }
        raw.sort_unstable();
        let mut merged: Vec<(i64, i64)> = Vec::with_capacity(raw.len());
        for (lower, upper) in raw {
            match merged.last_mut() {
                Some(last) if lower <= last.1.saturating_add(1) => last.1 = last.1.max(upper),
                _ => merged.push((lower, upper)),
            }
        }
        Ok(Self { bounds: merged })
    }

    /// Single inclusive range.
    pub fn range(lower: i64, upper: i64) -> EngineResult<Self> {
        Self::new([(lower, upper)])
    }

    pub fn bounds(&self) -> &[(i64, i64)] {
        &self.bounds
    }

    pub fn min(&self) -> i64 {
        self.bounds[0].0
    }

    pub fn max(&self) -> i64 {
        self.bounds[self.bounds.len() - 1].1
    }

    /// Number of values in the domain, saturating.
    pub fn size(&self) -> u64 {
        self.bounds.iter().fold(0u64, |acc, (l, u)| {
            acc.saturating_add((*u as i128 - *l as i128 + 1).min(u64::MAX as i128) as u64)
        })
    }

    pub fn contains(&self, value: i64) -> bool {
        matches!(self.find_containing_bound(value), BoundSearch::Found(_))
    }

    /// Binary search for the bound holding `value`.
    pub fn find_containing_bound(&self, value: i64) -> BoundSearch {
        if value < self.min() {
            return BoundSearch::BelowAll;
        }
        if value > self.max() {
            return BoundSearch::AboveAll;
        }
        let upper = self.bounds.partition_point(|(lower, _)| *lower <= value);
        // upper >= 1 because value >= min
        let candidate = upper - 1;
        if value <= self.bounds[candidate].1 {
            BoundSearch::Found(candidate)
        } else {
            BoundSearch::Between {
                lower: candidate,
                upper,
            }
        }
    }

    /// How far `value` is from the domain and which bound is nearest.
    ///
    /// Ties between two gaps resolve towards the upper bound.
    pub fn distance(&self, value: i64) -> BoundDistance {
        match self.find_containing_bound(value) {
            BoundSearch::Found(bound) => BoundDistance {
                violation: 0,
                bound,
                reason: Reason::TooSmall,
            },
            BoundSearch::Between { lower, upper } => {
                let below = crate::distance(value, self.bounds[lower].1);
                let above = crate::distance(self.bounds[upper].0, value);
                if below < above {
                    BoundDistance {
                        violation: below,
                        bound: lower,
                        reason: Reason::TooLarge,
                    }
                } else {
                    BoundDistance {
                        violation: above,
                        bound: upper,
                        reason: Reason::TooSmall,
                    }
                }
            }
            BoundSearch::BelowAll => BoundDistance {
                violation: crate::distance(self.min(), value),
                bound: 0,
                reason: Reason::TooSmall,
            },
            BoundSearch::AboveAll => BoundDistance {
                violation: crate::distance(value, self.max()),
                bound: self.bounds.len() - 1,
                reason: Reason::TooLarge,
            },
        }
    }

    /// Position of `value` when the domain is enumerated in order.
    pub fn index_of(&self, value: i64) -> Option<usize> {
        let BoundSearch::Found(bound) = self.find_containing_bound(value) else {
            return None;
        };
        let before: i128 = self.bounds[..bound]
            .iter()
            .map(|(l, u)| *u as i128 - *l as i128 + 1)
            .sum();
        usize::try_from(before + (value as i128 - self.bounds[bound].0 as i128)).ok()
    }

    /// The value at `index` when the domain is enumerated in order.
    pub fn value_at(&self, index: usize) -> Option<i64> {
        let mut remaining = index as i128;
        for (lower, upper) in &self.bounds {
            let width = *upper as i128 - *lower as i128 + 1;
            if remaining < width {
                return Some((*lower as i128 + remaining) as i64);
            }
            remaining -= width;
        }
        None
    }
}

// ==================== Enum ====================

/// Named enumeration; a value is an index into `names`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDomain {
    pub names: Vec<String>,
}

impl EnumDomain {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, value: u32) -> bool {
        (value as usize) < self.names.len()
    }
}

// ==================== Sizes ====================

/// Cardinality constraint on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAttr {
    NoSize,
    Exact(usize),
    Min(usize),
    Max(usize),
    Range(usize, usize),
}

impl SizeAttr {
    pub fn min_size(&self) -> usize {
        match *self {
            SizeAttr::NoSize | SizeAttr::Max(_) => 0,
            SizeAttr::Exact(n) | SizeAttr::Min(n) | SizeAttr::Range(n, _) => n,
        }
    }

    pub fn max_size(&self) -> usize {
        match *self {
            SizeAttr::NoSize | SizeAttr::Min(_) => usize::MAX,
            SizeAttr::Exact(n) | SizeAttr::Max(n) | SizeAttr::Range(_, n) => n,
        }
    }

    pub fn allows(&self, size: usize) -> bool {
        size >= self.min_size() && size <= self.max_size()
    }
}

// ==================== Containers ====================

#[derive(Debug, Clone)]
pub struct SetDomain {
    pub size: SizeAttr,
    pub inner: AnyDomain,
}

#[derive(Debug, Clone)]
pub struct MSetDomain {
    pub size: SizeAttr,
    pub inner: AnyDomain,
}

#[derive(Debug, Clone)]
pub struct SequenceDomain {
    pub size: SizeAttr,
    pub inner: AnyDomain,
    pub injective: bool,
}

/// Total or partial function over an enumerable domain.
#[derive(Debug, Clone)]
pub struct FunctionDomain {
    pub from: AnyDomain,
    pub to: AnyDomain,
    pub partial: bool,
}

#[derive(Debug, Clone)]
pub struct PartitionDomain {
    pub inner: AnyDomain,
    pub number_parts: SizeAttr,
    pub part_size: SizeAttr,
    pub regular: bool,
}

#[derive(Debug, Clone)]
pub struct TupleDomain {
    pub inners: Vec<AnyDomain>,
}

/// A shared reference to a domain of any kind.
#[derive(Debug, Clone)]
pub enum AnyDomain {
    Bool,
    Int(Rc<IntDomain>),
    Enum(Rc<EnumDomain>),
    Set(Rc<SetDomain>),
    MSet(Rc<MSetDomain>),
    Sequence(Rc<SequenceDomain>),
    Function(Rc<FunctionDomain>),
    Partition(Rc<PartitionDomain>),
    Tuple(Rc<TupleDomain>),
}

impl AnyDomain {
    pub fn int(domain: IntDomain) -> Self {
        AnyDomain::Int(Rc::new(domain))
    }

    pub fn int_range(lower: i64, upper: i64) -> EngineResult<Self> {
        Ok(Self::int(IntDomain::range(lower, upper)?))
    }

    pub fn enumeration(domain: EnumDomain) -> Self {
        AnyDomain::Enum(Rc::new(domain))
    }

    pub fn set(size: SizeAttr, inner: AnyDomain) -> Self {
        AnyDomain::Set(Rc::new(SetDomain { size, inner }))
    }

    pub fn mset(size: SizeAttr, inner: AnyDomain) -> Self {
        AnyDomain::MSet(Rc::new(MSetDomain { size, inner }))
    }

    pub fn sequence(size: SizeAttr, inner: AnyDomain, injective: bool) -> Self {
        AnyDomain::Sequence(Rc::new(SequenceDomain {
            size,
            inner,
            injective,
        }))
    }

    pub fn function(from: AnyDomain, to: AnyDomain, partial: bool) -> EngineResult<Self> {
        if from.enumerate().is_none() {
            return Err(EngineError::unsupported(format!(
                "function from non-enumerable {} domain",
                from.kind()
            )));
        }
        Ok(AnyDomain::Function(Rc::new(FunctionDomain { from, to, partial })))
    }

    pub fn partition(
        inner: AnyDomain,
        number_parts: SizeAttr,
        part_size: SizeAttr,
        regular: bool,
    ) -> EngineResult<Self> {
        if inner.enumerate().is_none() {
            return Err(EngineError::unsupported(format!(
                "partition of non-enumerable {} domain",
                inner.kind()
            )));
        }
        Ok(AnyDomain::Partition(Rc::new(PartitionDomain {
            inner,
            number_parts,
            part_size,
            regular,
        })))
    }

    pub fn tuple(inners: Vec<AnyDomain>) -> Self {
        AnyDomain::Tuple(Rc::new(TupleDomain { inners }))
    }

    pub fn kind(&self) -> Kind {
        match self {
            AnyDomain::Bool => Kind::Bool,
            AnyDomain::Int(_) => Kind::Int,
            AnyDomain::Enum(_) => Kind::Enum,
            AnyDomain::Set(_) => Kind::Set,
            AnyDomain::MSet(_) => Kind::MSet,
            AnyDomain::Sequence(_) => Kind::Sequence,
            AnyDomain::Function(_) => Kind::Function,
            AnyDomain::Partition(_) => Kind::Partition,
            AnyDomain::Tuple(_) => Kind::Tuple,
        }
    }

    /// The domain of members, for single-inner containers.
    pub fn inner(&self) -> Option<&AnyDomain> {
        match self {
            AnyDomain::Set(d) => Some(&d.inner),
            AnyDomain::MSet(d) => Some(&d.inner),
            AnyDomain::Sequence(d) => Some(&d.inner),
            AnyDomain::Function(d) => Some(&d.to),
            AnyDomain::Partition(d) => Some(&d.inner),
            _ => None,
        }
    }

    /// Every value of a scalar domain in order; `None` for containers.
    pub fn enumerate(&self) -> Option<Vec<Literal>> {
        match self {
            AnyDomain::Bool => Some(vec![Literal::Bool(false), Literal::Bool(true)]),
            AnyDomain::Int(d) => {
                let size = usize::try_from(d.size()).ok()?;
                (0..size)
                    .map(|i| d.value_at(i).map(Literal::Int))
                    .collect::<Option<Vec<_>>>()
            }
            AnyDomain::Enum(d) => Some((0..d.size() as u32).map(Literal::Enum).collect()),
            _ => None,
        }
    }

    /// Position of a scalar literal in [`AnyDomain::enumerate`] order.
    pub fn index_of(&self, literal: &Literal) -> Option<usize> {
        match (self, literal) {
            (AnyDomain::Bool, Literal::Bool(b)) => Some(*b as usize),
            (AnyDomain::Int(d), Literal::Int(v)) => d.index_of(*v),
            (AnyDomain::Enum(d), Literal::Enum(v)) if d.contains(*v) => Some(*v as usize),
            _ => None,
        }
    }

    /// Whether a literal is a legal value of this domain.
    pub fn contains(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (AnyDomain::Bool, Literal::Bool(_)) => true,
            (AnyDomain::Int(d), Literal::Int(v)) => d.contains(*v),
            (AnyDomain::Enum(d), Literal::Enum(v)) => d.contains(*v),
            (AnyDomain::Set(d), Literal::Set(members)) => {
                d.size.allows(members.len()) && members.iter().all(|m| d.inner.contains(m))
            }
            (AnyDomain::MSet(d), Literal::MSet(members)) => {
                d.size.allows(members.len()) && members.iter().all(|m| d.inner.contains(m))
            }
            (AnyDomain::Sequence(d), Literal::Sequence(members)) => {
                d.size.allows(members.len()) && members.iter().all(|m| d.inner.contains(m))
            }
            (AnyDomain::Function(d), Literal::Function(images)) => {
                let size = d.from.enumerate().map_or(0, |v| v.len());
                images.len() == size
                    && images.iter().all(|image| match image {
                        Some(image) => d.to.contains(image),
                        None => d.partial,
                    })
            }
            (AnyDomain::Partition(d), Literal::Partition(parts)) => {
                let size = d.inner.enumerate().map_or(0, |v| v.len());
                let members: usize = parts.iter().map(Vec::len).sum();
                members == size
                    && d.number_parts.allows(parts.iter().filter(|p| !p.is_empty()).count())
                    && parts
                        .iter()
                        .filter(|p| !p.is_empty())
                        .all(|p| d.part_size.allows(p.len()))
                    && parts.iter().flatten().all(|m| d.inner.contains(m))
            }
            (AnyDomain::Tuple(d), Literal::Tuple(members)) => {
                d.inners.len() == members.len()
                    && d.inners.iter().zip(members).all(|(d, m)| d.contains(m))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== TEST: bounds_are_sorted_and_merged ==========
    #[test]
    fn test_bounds_are_sorted_and_merged() {
        // GIVEN overlapping, adjacent and unordered bounds
        let domain = IntDomain::new([(7, 9), (1, 3), (2, 4), (5, 5)]).unwrap();

        // THEN they collapse into two ranges
        assert_eq!(domain.bounds(), &[(1, 5), (7, 9)]);
        assert_eq!(domain.size(), 8);
    }

    // ========== TEST: distance_between_bounds ==========
    #[test]
    fn test_distance_between_bounds_prefers_nearer_bound() {
        // GIVEN domain {[1,3],[7,9]}
        let domain = IntDomain::new([(1, 3), (7, 9)]).unwrap();

        // WHEN locating 5
        let d = domain.distance(5);

        // THEN tie resolves to the upper bound, value must grow
        assert_eq!(
            d,
            BoundDistance {
                violation: 2,
                bound: 1,
                reason: Reason::TooSmall
            }
        );

        // AND 4 is nearer the lower bound
        let d = domain.distance(4);
        assert_eq!((d.violation, d.bound, d.reason), (1, 0, Reason::TooLarge));
    }

    #[test]
    fn test_distance_outside_all_bounds() {
        let domain = IntDomain::new([(1, 3), (7, 9)]).unwrap();
        assert_eq!(
            domain.find_containing_bound(-2),
            BoundSearch::BelowAll
        );
        assert_eq!(domain.distance(-2).violation, 3);
        assert_eq!(domain.distance(12).reason, Reason::TooLarge);
        assert_eq!(domain.distance(12).bound, 1);
    }

    #[test]
    fn test_index_of_and_value_at_agree() {
        let domain = IntDomain::new([(1, 2), (10, 11)]).unwrap();
        assert_eq!(domain.index_of(10), Some(2));
        assert_eq!(domain.value_at(3), Some(11));
        assert_eq!(domain.index_of(5), None);
        assert_eq!(domain.value_at(4), None);
    }

    #[test]
    fn test_empty_bound_is_rejected() {
        assert!(IntDomain::new([(3, 1)]).is_err());
    }

    #[test]
    fn test_set_domain_checks_size_and_members() {
        let inner = AnyDomain::int_range(1, 5).unwrap();
        let domain = AnyDomain::set(SizeAttr::Max(2), inner);
        assert!(domain.contains(&Literal::set([Literal::Int(1), Literal::Int(5)])));
        assert!(!domain.contains(&Literal::set([Literal::Int(6)])));
        assert!(!domain.contains(&Literal::set([1, 2, 3].map(Literal::Int))));
    }
}
