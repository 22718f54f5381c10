//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check round-trip, overwrite, deletion, persistence and
//! deferred-commit behavior over generated inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

use crate::cache::{CacheHandle, CacheStore};

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.:-]{1,64}".prop_map(|s| s)
}

/// Generates nested JSON values a few levels deep
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Delete { key: String },
    Defer { key: String, value: Value },
    Commit,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Defer { key, value }),
        Just(CacheOp::Commit),
    ]
}

fn open_temp() -> (TempDir, CacheHandle) {
    let dir = TempDir::new().unwrap();
    let cache = CacheHandle::open(dir.path().join("prop.cache")).unwrap();
    (dir, cache)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Storing a value and reading it back returns the exact same value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in value_strategy()) {
        let (_dir, cache) = open_temp();
        cache.set(&key, &value, None).unwrap();

        prop_assert_eq!(cache.get_value(&key).unwrap(), Some(value));
    }

    // A later set under the same key wins.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in value_strategy(),
        second in value_strategy(),
    ) {
        let (_dir, cache) = open_temp();
        cache.set(&key, &first, None).unwrap();
        cache.set(&key, &second, None).unwrap();

        prop_assert_eq!(cache.get_value(&key).unwrap(), Some(second));
        prop_assert_eq!(cache.stats().total_entries, 1);
    }

    // After delete the key is gone and lookups fall back to the default.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in value_strategy()) {
        let (_dir, cache) = open_temp();
        cache.set(&key, &value, None).unwrap();
        cache.delete(&key).unwrap();

        prop_assert!(!cache.has(&key).unwrap());
        prop_assert_eq!(cache.get_or(&key, json!("default")).unwrap(), json!("default"));
    }

    // Persisting twice without a mutation in between writes identical bytes,
    // and a reload reproduces the same store.
    #[test]
    fn prop_persist_idempotent(
        entries in prop::collection::btree_map(valid_key_strategy(), value_strategy(), 0..16)
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idem.cache");

        let mut store = CacheStore::new();
        for (key, value) in &entries {
            store.insert(key.clone(), value.clone());
        }
        store.persist(&path).unwrap();
        let first = fs::read(&path).unwrap();
        store.persist(&path).unwrap();
        let second = fs::read(&path).unwrap();
        prop_assert_eq!(&first, &second);

        let mut reloaded = CacheStore::new();
        reloaded.load(&path).unwrap();
        prop_assert_eq!(reloaded, store);
    }

    // Any interleaving of writes, deletes, deferred writes and commits matches
    // a model map, and reopening the file reproduces the committed state.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        let (dir, cache) = open_temp();
        let mut model: BTreeMap<String, Value> = BTreeMap::new();
        let mut queue: Vec<(String, Value)> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, &value, None).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Delete { key } => {
                    cache.delete(&key).unwrap();
                    model.remove(&key);
                }
                CacheOp::Defer { key, value } => {
                    cache.set_deferred(&key, &value).unwrap();
                    queue.push((key, value));
                }
                CacheOp::Commit => {
                    let committed = cache.commit().unwrap();
                    prop_assert_eq!(committed, queue.len());
                    model.extend(queue.drain(..));
                }
            }
            prop_assert_eq!(cache.pending(), queue.len());
        }

        for (key, value) in &model {
            prop_assert_eq!(cache.get_value(key).unwrap(), Some(value.clone()));
        }
        prop_assert_eq!(cache.stats().total_entries, model.len());

        cache.commit().unwrap();
        model.extend(queue.drain(..));
        cache.close().unwrap();

        let reopened = CacheHandle::open(dir.path().join("prop.cache")).unwrap();
        prop_assert_eq!(reopened.stats().total_entries, model.len());
        for (key, value) in &model {
            prop_assert_eq!(reopened.get_value(key).unwrap(), Some(value.clone()));
        }
    }
}
