//! Tests for key patterns
//!
//! These tests verify:
//! - `*`, `?` and `\` semantics
//! - Rejection of malformed patterns
//! - Literal prefixes used to narrow scans

use emberkv::index::Pattern;
use emberkv::EmberError;

fn matches(pattern: &str, key: &str) -> bool {
    Pattern::new(pattern).unwrap().matches(key)
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn test_star_matches_everything() {
    assert!(matches("*", ""));
    assert!(matches("*", "anything at all"));
    assert!(Pattern::new("*").unwrap().matches_all());
}

#[test]
fn test_star_matches_empty_run() {
    assert!(matches("user:*", "user:"));
    assert!(matches("user:*", "user:123"));
    assert!(!matches("user:*", "user"));
}

#[test]
fn test_question_matches_one_char() {
    assert!(matches("a?c", "abc"));
    assert!(!matches("a?c", "ac"));
    assert!(!matches("a?c", "abbc"));
}

#[test]
fn test_inner_star_backtracks() {
    assert!(matches("user:*:name", "user:1:2:name"));
    assert!(matches("*a*b", "xxaxxb"));
    assert!(!matches("*a*b", "xxbxxa"));
}

#[test]
fn test_escape_makes_wildcards_literal() {
    assert!(matches("a\\*", "a*"));
    assert!(!matches("a\\*", "ab"));
    assert!(matches("what\\?", "what?"));
}

#[test]
fn test_literal_pattern() {
    let pattern = Pattern::new("exact").unwrap();
    assert!(pattern.is_literal());
    assert!(pattern.matches("exact"));
    assert!(!pattern.matches("exact!"));
}

#[test]
fn test_unicode_keys() {
    assert!(matches("caf?", "café"));
    assert!(matches("ключ:*", "ключ:1"));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_empty_pattern_rejected() {
    assert!(matches!(Pattern::new(""), Err(EmberError::InvalidPattern(_))));
}

#[test]
fn test_dangling_escape_rejected() {
    assert!(matches!(Pattern::new("abc\\"), Err(EmberError::InvalidPattern(_))));
}

// =============================================================================
// Prefixes
// =============================================================================

#[test]
fn test_literal_prefix() {
    assert_eq!(Pattern::new("user:*").unwrap().literal_prefix(), "user:");
    assert_eq!(Pattern::new("us?r").unwrap().literal_prefix(), "us");
    assert_eq!(Pattern::new("*x").unwrap().literal_prefix(), "");
    assert_eq!(Pattern::new("plain").unwrap().literal_prefix(), "plain");
}

#[test]
fn test_as_str_round_trips_source() {
    assert_eq!(Pattern::new("a\\*b").unwrap().as_str(), "a\\*b");
    assert_eq!(Pattern::all().as_str(), "*");
}
