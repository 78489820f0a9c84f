//! Tests for transactions
//!
//! These tests verify:
//! - Point reads and writes, with read-your-writes inside a transaction
//! - Commit, explicit rollback and rollback on drop
//! - Read-only transactions reject writes
//! - Index and key-pattern iteration, bounded and in both directions
//! - Lazy expiry of TTL'd items

use std::thread;
use std::time::Duration;

use emberkv::{EmberError, IndexKind, SetOptions, SortValue, Store};

// =============================================================================
// Helper Functions
// =============================================================================

fn people() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.create_index("age", "user:*", IndexKind::json("age")).unwrap();
    store
        .update(|tx| {
            for (id, age) in [(1, 30), (2, 10), (3, 47), (4, 30), (5, 51)] {
                tx.set(&format!("user:{}", id), format!(r#"{{"age":{}}}"#, age), None)?;
            }
            tx.set("config", "not a user", None)?;
            Ok(())
        })
        .unwrap();
    store
}

fn collect<F>(store: &Store, scan: F) -> Vec<String>
where
    F: FnOnce(&emberkv::Tx<'_>, &mut Vec<String>) -> emberkv::Result<()>,
{
    let mut keys = Vec::new();
    store.view(|tx| scan(tx, &mut keys)).unwrap();
    keys
}

// =============================================================================
// Point Operations
// =============================================================================

#[test]
fn test_set_returns_previous() {
    let store = Store::open_in_memory().unwrap();
    store
        .update(|tx| {
            assert_eq!(tx.set("k", "v1", None)?, (None, false));
            let (previous, replaced) = tx.set("k", "v2", None)?;
            assert_eq!(previous.as_deref(), Some(&b"v1"[..]));
            assert!(replaced);
            Ok(())
        })
        .unwrap();
    assert_eq!(store.view(|tx| Ok(tx.len())).unwrap(), 1);
}

#[test]
fn test_read_your_writes() {
    let store = Store::open_in_memory().unwrap();
    store
        .update(|tx| {
            tx.set("k", "v", None)?;
            assert_eq!(tx.get("k")?.as_ref(), b"v");
            tx.delete("k")?;
            assert!(tx.get("k").unwrap_err().is_not_found());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_get_missing_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.view(|tx| tx.get("nope")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_missing_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.update(|tx| tx.delete("nope")).unwrap_err();
    assert!(matches!(err, EmberError::NotFound));
}

#[test]
fn test_delete_all() {
    let store = people();
    store.update(|tx| tx.delete_all()).unwrap();
    assert!(store.view(|tx| Ok(tx.is_empty())).unwrap());
}

#[test]
fn test_read_only_rejects_writes() {
    let store = Store::open_in_memory().unwrap();
    let mut tx = store.begin(false);
    assert!(!tx.is_writable());
    assert!(matches!(tx.set("k", "v", None), Err(EmberError::TransactionConflict(_))));
    assert!(matches!(tx.delete("k"), Err(EmberError::TransactionConflict(_))));
    tx.rollback();
}

#[test]
fn test_concurrent_readers() {
    let store = people();
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let value = store.view(|tx| tx.get("user:3")).unwrap();
                assert_eq!(value.as_ref(), br#"{"age":47}"#);
            });
        }
    });
}

// =============================================================================
// Commit and Rollback
// =============================================================================

#[test]
fn test_rollback_discards_writes() {
    let store = people();
    let mut tx = store.begin(true);
    tx.set("user:9", r#"{"age":99}"#, None).unwrap();
    tx.delete("user:1").unwrap();
    tx.rollback();

    assert!(store.view(|tx| tx.get("user:9")).unwrap_err().is_not_found());
    assert!(store.view(|tx| tx.get("user:1")).is_ok());
    let ages = collect(&store, |tx, keys| {
        tx.ascend("age", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(ages.len(), 5);
}

#[test]
fn test_drop_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    {
        let mut tx = store.begin(true);
        tx.set("k", "v", None).unwrap();
    }
    assert!(store.view(|tx| tx.get("k")).unwrap_err().is_not_found());
}

#[test]
fn test_update_error_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    let result: emberkv::Result<()> = store.update(|tx| {
        tx.set("k", "v", None)?;
        Err(EmberError::Hook("abort".to_string()))
    });
    assert!(result.is_err());
    assert_eq!(store.view(|tx| Ok(tx.len())).unwrap(), 0);
}

#[test]
fn test_rollback_restores_overwritten_value() {
    let store = Store::open_in_memory().unwrap();
    store.update(|tx| tx.set("k", "orig", None)).unwrap();

    let mut tx = store.begin(true);
    tx.set("k", "a", None).unwrap();
    tx.set("k", "b", None).unwrap();
    drop(tx);

    assert_eq!(store.view(|tx| tx.get("k")).unwrap().as_ref(), b"orig");
}

// =============================================================================
// Index Iteration
// =============================================================================

#[test]
fn test_ascend_by_index() {
    let store = people();
    let keys = collect(&store, |tx, keys| {
        tx.ascend("age", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(keys, vec!["user:2", "user:1", "user:4", "user:3", "user:5"]);
}

#[test]
fn test_ascend_range_with_document_bounds() {
    let store = people();
    let keys = collect(&store, |tx, keys| {
        tx.ascend_range("age", r#"{"age":30}"#, r#"{"age":50}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(keys, vec!["user:1", "user:4", "user:3"]);
}

#[test]
fn test_descend_range_is_exact_reverse() {
    let store = people();
    let mut up = collect(&store, |tx, keys| {
        tx.ascend_range("age", SortValue::Float(30.0), SortValue::Float(50.0), |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    let down = collect(&store, |tx, keys| {
        tx.descend_range("age", SortValue::Float(50.0), SortValue::Float(30.0), |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    up.reverse();
    assert_eq!(down, up);
}

#[test]
fn test_one_sided_bounds() {
    let store = people();
    let ge = collect(&store, |tx, keys| {
        tx.ascend_greater_or_equal("age", r#"{"age":47}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(ge, vec!["user:3", "user:5"]);

    let le = collect(&store, |tx, keys| {
        tx.descend_less_or_equal("age", r#"{"age":30}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(le, vec!["user:4", "user:1", "user:2"]);

    let le_up = collect(&store, |tx, keys| {
        tx.ascend_less_or_equal("age", r#"{"age":10}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(le_up, vec!["user:2"]);

    let ge_down = collect(&store, |tx, keys| {
        tx.descend_greater_or_equal("age", r#"{"age":51}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(ge_down, vec!["user:5"]);
}

#[test]
fn test_ascend_and_descend_equal() {
    let store = people();
    let up = collect(&store, |tx, keys| {
        tx.ascend_equal("age", r#"{"age":30}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(up, vec!["user:1", "user:4"]);

    let down = collect(&store, |tx, keys| {
        tx.descend_equal("age", r#"{"age":30}"#, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(down, vec!["user:4", "user:1"]);
}

#[test]
fn test_bounded_with_open_ends() {
    let store = people();
    let all = collect(&store, |tx, keys| {
        tx.ascend_bounded("age", None, None, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(all.len(), 5);

    let mut reversed = collect(&store, |tx, keys| {
        tx.descend_bounded("age", None, None, |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    reversed.reverse();
    assert_eq!(reversed, all);
}

#[test]
fn test_empty_index_name_walks_keys() {
    let store = people();
    let keys = collect(&store, |tx, keys| {
        tx.ascend_range("", "user:2", "user:4", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(keys, vec!["user:2", "user:3", "user:4"]);

    let last = collect(&store, |tx, keys| {
        tx.descend("", |key, _| {
            keys.push(key.to_string());
            false
        })
    });
    assert_eq!(last, vec!["user:5"]);
}

#[test]
fn test_unknown_index_is_not_found() {
    let store = people();
    let err = store.view(|tx| tx.ascend("nope", |_, _| true)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_index_sees_uncommitted_writes() {
    let store = people();
    store
        .update(|tx| {
            tx.set("user:6", r#"{"age":1}"#, None)?;
            let mut first = None;
            tx.ascend("age", |key, _| {
                first = Some(key.to_string());
                false
            })?;
            assert_eq!(first.as_deref(), Some("user:6"));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_overwrite_keeps_single_index_entry() {
    let store = people();
    store.update(|tx| tx.set("user:2", r#"{"age":60}"#, None)).unwrap();
    let keys = collect(&store, |tx, keys| {
        tx.ascend("age", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(keys.iter().filter(|k| *k == "user:2").count(), 1);
    assert_eq!(keys.last().map(String::as_str), Some("user:2"));
}

// =============================================================================
// Key Iteration
// =============================================================================

#[test]
fn test_ascend_and_descend_keys() {
    let store = people();
    let up = collect(&store, |tx, keys| {
        tx.ascend_keys("user:*", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert_eq!(up, vec!["user:1", "user:2", "user:3", "user:4", "user:5"]);

    let down = collect(&store, |tx, keys| {
        tx.descend_keys("user:?", |key, _| {
            keys.push(key.to_string());
            keys.len() < 2
        })
    });
    assert_eq!(down, vec!["user:5", "user:4"]);
}

#[test]
fn test_invalid_key_pattern() {
    let store = people();
    let err = store.view(|tx| tx.ascend_keys("", |_, _| true)).unwrap_err();
    assert!(matches!(err, EmberError::InvalidPattern(_)));
}

// =============================================================================
// TTL Tests
// =============================================================================

#[test]
fn test_ttl_reported() {
    let store = Store::open_in_memory().unwrap();
    store
        .update(|tx| tx.set("t", "v", Some(SetOptions::with_ttl(Duration::from_secs(60)))))
        .unwrap();
    store.update(|tx| tx.set("p", "v", None)).unwrap();

    let ttl = store.view(|tx| tx.ttl("t")).unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(50));
    assert_eq!(store.view(|tx| tx.ttl("p")).unwrap(), None);
}

#[test]
fn test_expired_item_hidden_before_sweep() {
    let store = people();
    store
        .update(|tx| {
            tx.set("user:7", r#"{"age":5}"#, Some(SetOptions::with_ttl(Duration::from_millis(20))))
        })
        .unwrap();
    thread::sleep(Duration::from_millis(40));

    assert!(store.view(|tx| tx.get("user:7")).unwrap_err().is_not_found());
    let keys = collect(&store, |tx, keys| {
        tx.ascend("age", |key, _| {
            keys.push(key.to_string());
            true
        })
    });
    assert!(!keys.contains(&"user:7".to_string()));
}

#[test]
fn test_set_over_expired_counts_as_insert() {
    let store = Store::open_in_memory().unwrap();
    store
        .update(|tx| tx.set("k", "old", Some(SetOptions::with_ttl(Duration::from_millis(10)))))
        .unwrap();
    thread::sleep(Duration::from_millis(30));

    let (previous, replaced) = store.update(|tx| tx.set("k", "new", None)).unwrap();
    assert!(previous.is_none());
    assert!(!replaced);
}
