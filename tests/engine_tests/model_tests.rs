//! Model-based property tests
//!
//! Random operation sequences are applied to the database and to a
//! `BTreeMap`; every observable read must agree. Small memtables and
//! frequent reopen steps push data through flush, compaction and WAL
//! recovery along the way.

use std::collections::BTreeMap;

use ordkv::{Config, Database, Direction, WriteBatch};
use proptest::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
    Batch(Vec<(Vec<u8>, Option<Vec<u8>>)>),
    Flush,
    Compact,
    Reopen,
}

/// Small alphabet so keys collide often; includes the empty key
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 0..3)
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..24)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (key_strategy(), value_strategy()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key_strategy().prop_map(Op::Delete),
        2 => prop::collection::vec(
            (key_strategy(), prop::option::of(value_strategy())),
            0..6
        )
        .prop_map(Op::Batch),
        1 => Just(Op::Flush),
        1 => Just(Op::Compact),
        1 => Just(Op::Reopen),
    ]
}

fn open(temp: &TempDir) -> Database {
    let config = Config::builder()
        .data_dir(temp.path())
        .memtable_size_limit(64)
        .compaction_trigger(Some(3))
        .cursor_prefetch(2)
        .build();
    Database::open_with_config(config).unwrap()
}

fn scan(db: &Database, direction: Direction) -> Vec<(Vec<u8>, Vec<u8>)> {
    db.iterator(direction)
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_matches_btreemap_model(
        ops in prop::collection::vec(op_strategy(), 1..40),
        lookup_key in key_strategy(),
    ) {
        let temp = TempDir::new().unwrap();
        let mut db = open(&temp);
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    db.put(&k, &v).unwrap();
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    db.delete(&k).unwrap();
                    model.remove(&k);
                }
                Op::Batch(entries) => {
                    let mut batch = WriteBatch::new();
                    for (k, v) in entries {
                        match v {
                            Some(v) => {
                                batch.put(&k, &v);
                                model.insert(k, v);
                            }
                            None => {
                                batch.delete(&k);
                                model.remove(&k);
                            }
                        }
                    }
                    db.write(&batch).unwrap();
                }
                Op::Flush => db.flush().unwrap(),
                Op::Compact => {
                    db.compact().unwrap();
                }
                Op::Reopen => {
                    db.close().unwrap();
                    db = open(&temp);
                }
            }
        }

        let expected: Vec<(Vec<u8>, Vec<u8>)> =
            model.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        prop_assert_eq!(scan(&db, Direction::Forward), expected.clone());

        let mut reversed = expected.clone();
        reversed.reverse();
        prop_assert_eq!(scan(&db, Direction::Reverse), reversed);

        let from_lookup: Vec<Vec<u8>> = db
            .iterate_from(&lookup_key, Direction::Forward)
            .unwrap()
            .map(|e| e.unwrap().0)
            .collect();
        let model_from: Vec<Vec<u8>> = model.range(lookup_key.clone()..).map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(from_lookup, model_from);

        let back_lookup: Vec<Vec<u8>> = db
            .iterate_from(&lookup_key, Direction::Reverse)
            .unwrap()
            .map(|e| e.unwrap().0)
            .collect();
        let model_back: Vec<Vec<u8>> = model.range(..=lookup_key.clone()).rev().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(back_lookup, model_back);

        prop_assert_eq!(db.get(&lookup_key).unwrap(), model.get(&lookup_key).cloned());
    }
}
