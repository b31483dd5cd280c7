//! Literal values.
//!
//! A literal is a plain, owned description of a value. The model builder
//! seeds constants and decision variables from literals, and the engine reads
//! a node back into a literal when it needs an independent copy of a value.

use crate::{mix, positional, HashType, Kind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    /// Index into an enum domain.
    Enum(u32),
    Set(Vec<Literal>),
    MSet(Vec<Literal>),
    Sequence(Vec<Literal>),
    /// One image per preimage, in domain enumeration order; `None` is unmapped.
    Function(Vec<Option<Literal>>),
    /// Members grouped by part.
    Partition(Vec<Vec<Literal>>),
    Tuple(Vec<Literal>),
}

impl Literal {
    pub fn set(members: impl IntoIterator<Item = Literal>) -> Self {
        Literal::Set(members.into_iter().collect())
    }

    pub fn mset(members: impl IntoIterator<Item = Literal>) -> Self {
        Literal::MSet(members.into_iter().collect())
    }

    pub fn sequence(members: impl IntoIterator<Item = Literal>) -> Self {
        Literal::Sequence(members.into_iter().collect())
    }

    pub fn tuple(members: impl IntoIterator<Item = Literal>) -> Self {
        Literal::Tuple(members.into_iter().collect())
    }

    pub fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Literal> {
        values.into_iter().map(Literal::Int).collect()
    }

    pub fn kind(&self) -> Kind {
        match self {
            Literal::Bool(_) => Kind::Bool,
            Literal::Int(_) => Kind::Int,
            Literal::Enum(_) => Kind::Enum,
            Literal::Set(_) => Kind::Set,
            Literal::MSet(_) => Kind::MSet,
            Literal::Sequence(_) => Kind::Sequence,
            Literal::Function(_) => Kind::Function,
            Literal::Partition(_) => Kind::Partition,
            Literal::Tuple(_) => Kind::Tuple,
        }
    }

    /// The hash a view holding this value reports.
    pub fn hash(&self) -> HashType {
        match self {
            Literal::Bool(b) => HashType::of_bool(*b),
            Literal::Int(v) => HashType::of_int(*v),
            Literal::Enum(v) => HashType::of_enum(*v),
            Literal::Set(members) | Literal::MSet(members) => members
                .iter()
                .fold(HashType::ZERO, |acc, m| acc + mix(m.hash())),
            Literal::Sequence(members) | Literal::Tuple(members) => members
                .iter()
                .enumerate()
                .fold(HashType::ZERO, |acc, (i, m)| acc + positional(i, m.hash())),
            Literal::Function(images) => images
                .iter()
                .enumerate()
                .filter_map(|(i, image)| image.as_ref().map(|m| positional(i, m.hash())))
                .fold(HashType::ZERO, |acc, h| acc + h),
            Literal::Partition(parts) => parts
                .iter()
                .filter(|part| !part.is_empty())
                .map(|part| mix(part.iter().fold(HashType::ZERO, |acc, m| acc + mix(m.hash()))))
                .fold(HashType::ZERO, |acc, h| acc + h),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, open: &str, items: &[Literal], close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str(close)
        }
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Enum(v) => write!(f, "#{}", v),
            Literal::Set(m) => list(f, "{", m, "}"),
            Literal::MSet(m) => list(f, "mset(", m, ")"),
            Literal::Sequence(m) => list(f, "sequence(", m, ")"),
            Literal::Tuple(m) => list(f, "(", m, ")"),
            Literal::Function(images) => {
                f.write_str("function(")?;
                for (i, image) in images.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match image {
                        Some(image) => write!(f, "{} --> {}", i, image)?,
                        None => write!(f, "{} --> _", i)?,
                    }
                }
                f.write_str(")")
            }
            Literal::Partition(parts) => {
                f.write_str("partition(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    list(f, "<", part, ">")?;
                }
                f.write_str(")")
            }
        }
    }
}
