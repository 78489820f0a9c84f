//! Tests for index kinds
//!
//! These tests verify:
//! - Each built-in extractor's ordering
//! - JSON path lookup, missing fields and case folding
//! - Compound and descending kinds
//! - Pivot resolution through an index kind

use emberkv::index::{Extractor, IndexKind, Pivot, SortValue};
use emberkv::EmberError;

// =============================================================================
// Scalar Kinds
// =============================================================================

#[test]
fn test_string_is_case_insensitive() {
    let kind = IndexKind::string();
    assert_eq!(kind.extract(b"Alice"), kind.extract(b"alice"));
    assert!(kind.extract(b"Bob") > kind.extract(b"alice"));
}

#[test]
fn test_string_case_sensitive() {
    let kind = IndexKind::string_case_sensitive();
    assert_ne!(kind.extract(b"Alice"), kind.extract(b"alice"));
    assert!(kind.extract(b"Bob") < kind.extract(b"alice"));
}

#[test]
fn test_binary_orders_bytes() {
    let kind = IndexKind::binary();
    assert!(kind.extract(&[0x00, 0xff]) < kind.extract(&[0x01]));
}

#[test]
fn test_int_orders_numerically() {
    let kind = IndexKind::int();
    assert!(kind.extract(b"9") < kind.extract(b"10"));
    assert!(kind.extract(b"-5") < kind.extract(b"0"));
    assert_eq!(kind.extract(b" 42 "), SortValue::Int(42));
}

#[test]
fn test_unparsable_number_sorts_first() {
    let kind = IndexKind::int();
    assert_eq!(kind.extract(b"abc"), SortValue::Null);
    assert!(kind.extract(b"abc") < kind.extract(b"-999"));
    assert_eq!(IndexKind::uint().extract(b"-1"), SortValue::Null);
}

#[test]
fn test_float_orders_numerically() {
    let kind = IndexKind::float();
    assert!(kind.extract(b"2.5") < kind.extract(b"10"));
    assert_eq!(kind.extract(b"-0"), kind.extract(b"0"));
}

// =============================================================================
// JSON Kinds
// =============================================================================

#[test]
fn test_json_numeric_field() {
    let kind = IndexKind::json("age");
    assert!(kind.extract(br#"{"age":10}"#) < kind.extract(br#"{"age":47}"#));
}

#[test]
fn test_json_nested_path_and_array_index() {
    let kind = IndexKind::json("name.last");
    assert_eq!(
        kind.extract(br#"{"name":{"first":"Tom","last":"Johnson"}}"#),
        SortValue::Str("johnson".to_string())
    );

    let kind = IndexKind::json("tags.1");
    assert_eq!(kind.extract(br#"{"tags":["a","b"]}"#), SortValue::Str("b".to_string()));
}

#[test]
fn test_json_missing_field_is_null() {
    let kind = IndexKind::json("age");
    assert_eq!(kind.extract(br#"{"name":"x"}"#), SortValue::Null);
    assert_eq!(kind.extract(b"not json"), SortValue::Null);
    assert!(kind.extract(br#"{}"#) < kind.extract(br#"{"age":-100}"#));
}

#[test]
fn test_json_case_sensitive() {
    let kind = IndexKind::json_case_sensitive("n");
    assert_eq!(kind.extract(br#"{"n":"Ab"}"#), SortValue::Str("Ab".to_string()));
}

#[test]
fn test_json_malformed_path_rejected() {
    assert!(matches!(
        IndexKind::json("a..b").validate(),
        Err(EmberError::InvalidComparator(_))
    ));
    assert!(IndexKind::json("a.b").validate().is_ok());
}

// =============================================================================
// Composite Kinds
// =============================================================================

#[test]
fn test_compound_orders_part_by_part() {
    let kind = IndexKind::compound(vec![IndexKind::json("last"), IndexKind::json("age")]);
    let a = kind.extract(br#"{"last":"smith","age":50}"#);
    let b = kind.extract(br#"{"last":"smith","age":20}"#);
    let c = kind.extract(br#"{"last":"adams","age":90}"#);
    assert!(c < b);
    assert!(b < a);
}

#[test]
fn test_empty_compound_rejected() {
    assert!(IndexKind::compound(Vec::new()).validate().is_err());
}

#[test]
fn test_desc_reverses_order() {
    let kind = IndexKind::int().desc();
    assert!(kind.extract(b"10") < kind.extract(b"9"));
}

#[derive(Debug)]
struct Length;

impl Extractor for Length {
    fn extract(&self, raw: &[u8]) -> SortValue {
        SortValue::Uint(raw.len() as u64)
    }
}

#[test]
fn test_custom_extractor() {
    let kind = IndexKind::custom(Length);
    assert!(kind.extract(b"zz") < kind.extract(b"aaa"));
}

// =============================================================================
// Pivots
// =============================================================================

#[test]
fn test_raw_pivot_goes_through_extractor() {
    let kind = IndexKind::json("age");
    let pivot = Pivot::from(r#"{"age":30}"#);
    assert_eq!(pivot.resolve(&kind), SortValue::Float(30.0));
}

#[test]
fn test_value_pivot_used_as_is() {
    let kind = IndexKind::int();
    let pivot = Pivot::from(SortValue::Int(7));
    assert_eq!(pivot.resolve(&kind), SortValue::Int(7));
}
