//! Sort values
//!
//! The comparable form an [`Extractor`](super::Extractor) produces from a raw
//! item value. Every index orders its entries by `(SortValue, key)`.

use std::cmp::Ordering;

/// Totally ordered value extracted from an item
///
/// Values of different variants order by variant, in declaration order, so
/// `Null` (missing field, unparseable number) sorts before everything else.
#[derive(Debug, Clone)]
pub enum SortValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    /// Ordered by `f64::total_cmp`, with `-0.0` equal to `0.0`
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Compound value, compared component by component
    Tuple(Vec<SortValue>),
    /// Reverses the order of the wrapped value
    Desc(Box<SortValue>),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Null => 0,
            SortValue::Bool(_) => 1,
            SortValue::Int(_) => 2,
            SortValue::Uint(_) => 3,
            SortValue::Float(_) => 4,
            SortValue::Str(_) => 5,
            SortValue::Bytes(_) => 6,
            SortValue::Tuple(_) => 7,
            SortValue::Desc(_) => 8,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Null, SortValue::Null) => Ordering::Equal,
            (SortValue::Bool(a), SortValue::Bool(b)) => a.cmp(b),
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Uint(a), SortValue::Uint(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (SortValue::Str(a), SortValue::Str(b)) => a.cmp(b),
            (SortValue::Bytes(a), SortValue::Bytes(b)) => a.cmp(b),
            (SortValue::Tuple(a), SortValue::Tuple(b)) => a.cmp(b),
            (SortValue::Desc(a), SortValue::Desc(b)) => b.cmp(a),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Str(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        SortValue::Str(value)
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        SortValue::Int(value)
    }
}

impl From<u64> for SortValue {
    fn from(value: u64) -> Self {
        SortValue::Uint(value)
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Float(value)
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        SortValue::Bool(value)
    }
}
