//! Value hashing.
//!
//! Every value has a 64-bit hash. Scalars hash to their own payload, so a
//! hash of an integer can be turned back into the integer. Containers hash to
//! a sum of per-member *mixed* hashes, which is order independent and can be
//! maintained incrementally: adding a member adds `mix(h)`, removing it
//! subtracts `mix(h)`.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Hash of a value. Arithmetic wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HashType(pub u64);

impl HashType {
    /// The hash of an empty container.
    pub const ZERO: HashType = HashType(0);

    /// Hash of an integer value.
    pub fn of_int(value: i64) -> Self {
        Self(value as u64)
    }

    /// Hash of a boolean value.
    pub fn of_bool(value: bool) -> Self {
        Self(value as u64)
    }

    /// Hash of an enum value.
    pub fn of_enum(value: u32) -> Self {
        Self(value as u64)
    }

    /// Recover the integer a scalar hash was built from.
    pub fn as_int(&self) -> i64 {
        self.0 as i64
    }

    /// Hash repeated `times` times, as an mset with that multiplicity contributes.
    pub fn times(self, times: usize) -> Self {
        Self(self.0.wrapping_mul(times as u64))
    }
}

impl Add for HashType {
    type Output = HashType;
    fn add(self, other: HashType) -> HashType {
        HashType(self.0.wrapping_add(other.0))
    }
}

impl Sub for HashType {
    type Output = HashType;
    fn sub(self, other: HashType) -> HashType {
        HashType(self.0.wrapping_sub(other.0))
    }
}

impl AddAssign for HashType {
    fn add_assign(&mut self, other: HashType) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl SubAssign for HashType {
    fn sub_assign(&mut self, other: HashType) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Scramble a hash so that sums of mixed hashes rarely collide.
///
/// This is the 64-bit finalizer of MurmurHash3.
pub fn mix(hash: HashType) -> HashType {
    let mut k = hash.0;
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    HashType(k)
}

/// Contribution of the member at `index` to an ordered container's hash.
pub fn positional(index: usize, hash: HashType) -> HashType {
    mix(hash + mix(HashType(index as u64 ^ 0x9e37_79b9_7f4a_7c15)))
}
