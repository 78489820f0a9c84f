//! Tests for IndexSet
//!
//! These tests verify:
//! - Declaring and dropping indexes
//! - Pattern filtering of maintained items
//! - Inclusive bounded walks and their exact reversal
//! - Tie-breaking by key

use emberkv::index::{IndexKind, IndexSet, SortValue};
use emberkv::EmberError;

// =============================================================================
// Helper Functions
// =============================================================================

fn ages() -> IndexSet {
    let mut set = IndexSet::new();
    set.create("age", "user:*", IndexKind::json("age"), std::iter::empty())
        .unwrap();
    let ages = [("user:1", 30), ("user:2", 10), ("user:3", 47), ("user:4", 30), ("user:5", 51)];
    for (key, age) in ages {
        let value = format!(r#"{{"age":{}}}"#, age);
        set.on_insert(key, None, value.as_bytes());
    }
    set
}

fn ascend(set: &IndexSet, low: Option<f64>, high: Option<f64>) -> Vec<String> {
    let low = low.map(SortValue::Float);
    let high = high.map(SortValue::Float);
    let mut keys = Vec::new();
    set.get("age").unwrap().ascend(low.as_ref(), high.as_ref(), |key| {
        keys.push(key.to_string());
        true
    });
    keys
}

fn descend(set: &IndexSet, high: Option<f64>, low: Option<f64>) -> Vec<String> {
    let low = low.map(SortValue::Float);
    let high = high.map(SortValue::Float);
    let mut keys = Vec::new();
    set.get("age").unwrap().descend(high.as_ref(), low.as_ref(), |key| {
        keys.push(key.to_string());
        true
    });
    keys
}

// =============================================================================
// Declaration
// =============================================================================

#[test]
fn test_duplicate_name_rejected() {
    let mut set = ages();
    let result = set.create("age", "*", IndexKind::int(), std::iter::empty());
    assert!(matches!(result, Err(EmberError::DuplicateIndex(name)) if name == "age"));
}

#[test]
fn test_empty_name_reserved() {
    let mut set = IndexSet::new();
    let result = set.create("", "*", IndexKind::int(), std::iter::empty());
    assert!(matches!(result, Err(EmberError::DuplicateIndex(_))));
}

#[test]
fn test_invalid_pattern_rejected() {
    let mut set = IndexSet::new();
    let result = set.create("x", "", IndexKind::int(), std::iter::empty());
    assert!(matches!(result, Err(EmberError::InvalidPattern(_))));
    assert!(set.is_empty());
}

#[test]
fn test_create_fills_from_existing() {
    let mut set = IndexSet::new();
    let existing: Vec<(&str, &[u8])> =
        vec![("a", &b"3"[..]), ("b", &b"1"[..]), ("skip", &b"0"[..])];
    set.create("n", "?", IndexKind::int(), existing).unwrap();
    let keys: Vec<&str> = set.get("n").unwrap().keys().collect();
    assert_eq!(keys, vec!["b", "a"]);
}

#[test]
fn test_drop_unknown_is_not_found() {
    let mut set = ages();
    assert!(set.drop_index("age").is_ok());
    assert!(set.drop_index("age").unwrap_err().is_not_found());
    assert_eq!(set.names().count(), 0);
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn test_non_matching_keys_ignored() {
    let mut set = ages();
    set.on_insert("admin:1", None, br#"{"age":20}"#);
    assert_eq!(set.get("age").unwrap().len(), 5);
}

#[test]
fn test_replace_moves_entry() {
    let mut set = ages();
    set.on_insert("user:2", Some(&br#"{"age":10}"#[..]), br#"{"age":99}"#);
    assert_eq!(ascend(&set, None, None).last().map(String::as_str), Some("user:2"));
    assert_eq!(set.get("age").unwrap().len(), 5);
}

#[test]
fn test_remove_drops_entry() {
    let mut set = ages();
    set.on_remove("user:3", br#"{"age":47}"#);
    assert!(!ascend(&set, None, None).contains(&"user:3".to_string()));
}

// =============================================================================
// Bounded Walks
// =============================================================================

#[test]
fn test_ascend_orders_by_value_then_key() {
    let set = ages();
    assert_eq!(ascend(&set, None, None), vec!["user:2", "user:1", "user:4", "user:3", "user:5"]);
}

#[test]
fn test_bounds_are_inclusive() {
    let set = ages();
    assert_eq!(ascend(&set, Some(30.0), Some(47.0)), vec!["user:1", "user:4", "user:3"]);
}

#[test]
fn test_descend_is_exact_reverse() {
    let set = ages();
    let mut up = ascend(&set, Some(30.0), Some(50.0));
    up.reverse();
    assert_eq!(descend(&set, Some(50.0), Some(30.0)), up);
}

#[test]
fn test_inverted_bounds_yield_nothing() {
    let set = ages();
    assert!(ascend(&set, Some(50.0), Some(30.0)).is_empty());
}

#[test]
fn test_walk_stops_when_visitor_declines() {
    let set = ages();
    let mut seen = 0;
    let completed = set.get("age").unwrap().ascend(None, None, |_| {
        seen += 1;
        false
    });
    assert!(!completed);
    assert_eq!(seen, 1);
}
