//! Index kinds
//!
//! An index orders items by what its [`Extractor`] makes of their raw value.
//! [`IndexKind`] is the cheap, cloneable handle the store keeps per index.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::{EmberError, Result};

use super::SortValue;

/// Turns a raw item value into its sort value
///
/// Implementations must be deterministic: the entry of an old value is
/// found again by re-extracting it.
pub trait Extractor: Send + Sync + fmt::Debug {
    fn extract(&self, raw: &[u8]) -> SortValue;

    /// Checked once when the index is declared
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Handle to the extractor of one index
#[derive(Clone)]
pub struct IndexKind {
    extractor: Arc<dyn Extractor>,
}

impl IndexKind {
    /// Case-insensitive string order
    pub fn string() -> Self {
        Self::custom(StringKey {
            case_sensitive: false,
        })
    }

    /// Byte-wise string order
    pub fn string_case_sensitive() -> Self {
        Self::custom(StringKey {
            case_sensitive: true,
        })
    }

    /// Raw byte order
    pub fn binary() -> Self {
        Self::custom(BinaryKey)
    }

    /// Value parsed as a signed integer
    pub fn int() -> Self {
        Self::custom(IntKey)
    }

    /// Value parsed as an unsigned integer
    pub fn uint() -> Self {
        Self::custom(UintKey)
    }

    /// Value parsed as a float
    pub fn float() -> Self {
        Self::custom(FloatKey)
    }

    /// Field of a JSON document, addressed by a dot path (`name.last`,
    /// `tags.0`). Strings compare case-insensitively.
    pub fn json(path: &str) -> Self {
        Self::custom(JsonField::new(path, false))
    }

    /// Like [`json`](Self::json), with case-sensitive strings
    pub fn json_case_sensitive(path: &str) -> Self {
        Self::custom(JsonField::new(path, true))
    }

    /// Order by several kinds in turn, the first being most significant
    pub fn compound(parts: Vec<IndexKind>) -> Self {
        Self::custom(Compound { parts })
    }

    /// Reverse this kind's order
    pub fn desc(self) -> Self {
        Self::custom(Descending { inner: self })
    }

    /// Wrap a caller-supplied extractor
    pub fn custom<E: Extractor + 'static>(extractor: E) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }

    pub fn extract(&self, raw: &[u8]) -> SortValue {
        self.extractor.extract(raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.extractor.validate()
    }
}

impl fmt::Debug for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.extractor.fmt(f)
    }
}

// =============================================================================
// Range Bounds
// =============================================================================

/// Bound for index iteration
///
/// `Raw` bytes go through the index's own extractor first, so a partial
/// document such as `{"age":30}` can bound a JSON index on `age`.
#[derive(Debug, Clone)]
pub enum Pivot {
    Raw(Bytes),
    Value(SortValue),
}

impl Pivot {
    /// Resolve to the comparable value under `kind`
    pub fn resolve(&self, kind: &IndexKind) -> SortValue {
        match self {
            Pivot::Raw(raw) => kind.extract(raw),
            Pivot::Value(value) => value.clone(),
        }
    }
}

impl From<&str> for Pivot {
    fn from(raw: &str) -> Self {
        Pivot::Raw(Bytes::copy_from_slice(raw.as_bytes()))
    }
}

impl From<String> for Pivot {
    fn from(raw: String) -> Self {
        Pivot::Raw(Bytes::from(raw))
    }
}

impl From<&[u8]> for Pivot {
    fn from(raw: &[u8]) -> Self {
        Pivot::Raw(Bytes::copy_from_slice(raw))
    }
}

impl From<Vec<u8>> for Pivot {
    fn from(raw: Vec<u8>) -> Self {
        Pivot::Raw(Bytes::from(raw))
    }
}

impl From<Bytes> for Pivot {
    fn from(raw: Bytes) -> Self {
        Pivot::Raw(raw)
    }
}

impl From<SortValue> for Pivot {
    fn from(value: SortValue) -> Self {
        Pivot::Value(value)
    }
}

// =============================================================================
// Built-in Extractors
// =============================================================================

#[derive(Debug)]
struct StringKey {
    case_sensitive: bool,
}

impl Extractor for StringKey {
    fn extract(&self, raw: &[u8]) -> SortValue {
        let text = String::from_utf8_lossy(raw);
        if self.case_sensitive {
            SortValue::Str(text.into_owned())
        } else {
            SortValue::Str(text.to_lowercase())
        }
    }
}

#[derive(Debug)]
struct BinaryKey;

impl Extractor for BinaryKey {
    fn extract(&self, raw: &[u8]) -> SortValue {
        SortValue::Bytes(raw.to_vec())
    }
}

/// Parse a trimmed UTF-8 number; anything else is `None`
fn parse_number<T: std::str::FromStr>(raw: &[u8]) -> Option<T> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

#[derive(Debug)]
struct IntKey;

impl Extractor for IntKey {
    fn extract(&self, raw: &[u8]) -> SortValue {
        parse_number(raw).map_or(SortValue::Null, SortValue::Int)
    }
}

#[derive(Debug)]
struct UintKey;

impl Extractor for UintKey {
    fn extract(&self, raw: &[u8]) -> SortValue {
        parse_number(raw).map_or(SortValue::Null, SortValue::Uint)
    }
}

#[derive(Debug)]
struct FloatKey;

impl Extractor for FloatKey {
    fn extract(&self, raw: &[u8]) -> SortValue {
        parse_number(raw).map_or(SortValue::Null, SortValue::Float)
    }
}

#[derive(Debug)]
struct JsonField {
    path: String,
    segments: Vec<String>,
    case_sensitive: bool,
}

impl JsonField {
    fn new(path: &str, case_sensitive: bool) -> Self {
        Self {
            path: path.to_string(),
            segments: path.split('.').map(str::to_string).collect(),
            case_sensitive,
        }
    }

    fn lookup<'a>(&self, mut node: &'a JsonValue) -> Option<&'a JsonValue> {
        for segment in &self.segments {
            node = match node {
                JsonValue::Object(map) => map.get(segment)?,
                JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl Extractor for JsonField {
    fn extract(&self, raw: &[u8]) -> SortValue {
        let Ok(doc) = serde_json::from_slice::<JsonValue>(raw) else {
            return SortValue::Null;
        };
        match self.lookup(&doc) {
            None | Some(JsonValue::Null) => SortValue::Null,
            Some(JsonValue::Bool(b)) => SortValue::Bool(*b),
            Some(JsonValue::Number(n)) => n.as_f64().map_or(SortValue::Null, SortValue::Float),
            Some(JsonValue::String(s)) if self.case_sensitive => SortValue::Str(s.clone()),
            Some(JsonValue::String(s)) => SortValue::Str(s.to_lowercase()),
            // Nested documents order by their compact text
            Some(other) => SortValue::Str(other.to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.segments.iter().any(String::is_empty) {
            return Err(EmberError::InvalidComparator(format!(
                "malformed JSON path {:?}",
                self.path
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Compound {
    parts: Vec<IndexKind>,
}

impl Extractor for Compound {
    fn extract(&self, raw: &[u8]) -> SortValue {
        SortValue::Tuple(self.parts.iter().map(|part| part.extract(raw)).collect())
    }

    fn validate(&self) -> Result<()> {
        if self.parts.is_empty() {
            return Err(EmberError::InvalidComparator(
                "compound index needs at least one part".to_string(),
            ));
        }
        self.parts.iter().try_for_each(IndexKind::validate)
    }
}

#[derive(Debug)]
struct Descending {
    inner: IndexKind,
}

impl Extractor for Descending {
    fn extract(&self, raw: &[u8]) -> SortValue {
        SortValue::Desc(Box::new(self.inner.extract(raw)))
    }

    fn validate(&self) -> Result<()> {
        self.inner.validate()
    }
}
