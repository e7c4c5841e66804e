//! Store-level semantic properties: get-after-set, kill-then-get,
//! ordering, fast-search soundness, transaction atomicity.

use grove_core::{Path, Subscript, Value};
use grove_engine::{GlobalStore, Transaction};

fn p(elems: &[Subscript]) -> Path {
    Path::new(elems.to_vec())
}

fn int(n: i64) -> Subscript {
    Subscript::Int(n)
}

fn s(text: &str) -> Subscript {
    Subscript::from(text)
}

#[test]
fn get_after_set_returns_the_value() {
    let store = GlobalStore::new(128);
    let cases: Vec<(&str, Path, Value)> = vec![
        ("^A", Path::root(), Value::Int(1)),
        ("^P", p(&[int(1), s("name")]), Value::from("John")),
        ("^P", p(&[int(1), s("age")]), Value::Int(35)),
        ("^F", p(&[s("pi")]), Value::Float(3.25)),
    ];
    for (global, path, value) in &cases {
        store.set(global, path, value.clone()).unwrap();
    }
    for (global, path, value) in &cases {
        assert_eq!(store.get(global, path).unwrap().as_ref(), Some(value));
    }
}

#[test]
fn kill_then_get_is_null_for_node_and_descendants() {
    let store = GlobalStore::new(128);
    store.set("^T", &p(&[int(1)]), Value::Int(1)).unwrap();
    store.set("^T", &p(&[int(1), int(2)]), Value::Int(12)).unwrap();
    store
        .set("^T", &p(&[int(1), int(2), int(3)]), Value::Int(123))
        .unwrap();
    store.set("^T", &p(&[int(9)]), Value::Int(9)).unwrap();

    store.kill("^T", &p(&[int(1)])).unwrap();

    assert_eq!(store.get("^T", &p(&[int(1)])).unwrap(), None);
    assert_eq!(store.get("^T", &p(&[int(1), int(2)])).unwrap(), None);
    assert_eq!(store.get("^T", &p(&[int(1), int(2), int(3)])).unwrap(), None);
    assert_eq!(store.get("^T", &p(&[int(9)])).unwrap(), Some(Value::Int(9)));
}

#[test]
fn killed_global_disappears_from_listing() {
    let store = GlobalStore::new(128);
    store.set("^A", &Path::root(), Value::Int(1)).unwrap();
    store.set("^B", &Path::root(), Value::Int(2)).unwrap();
    store.kill("^A", &Path::root()).unwrap();
    assert_eq!(store.global_names(), vec!["^B"]);

    // removing the last leaf destroys the global too
    store.kill("^B", &Path::root()).unwrap();
    assert!(store.global_names().is_empty());
}

#[test]
fn child_subscripts_follow_numeric_then_string_order() {
    let store = GlobalStore::new(128);
    for sub in [s("beta"), int(10), s("alpha"), int(2), int(1)] {
        store.set("^O", &p(&[sub]), Value::Int(0)).unwrap();
    }
    let children = store.child_subscripts("^O", &Path::root()).unwrap();
    assert_eq!(
        children,
        vec![int(1), int(2), int(10), s("alpha"), s("beta")]
    );
}

#[test]
fn query_depth_and_remainder_paths() {
    let store = GlobalStore::new(128);
    store.set("^Q", &p(&[int(1)]), Value::Int(1)).unwrap();
    store.set("^Q", &p(&[int(1), s("a")]), Value::Int(2)).unwrap();
    store
        .set("^Q", &p(&[int(1), s("a"), s("b")]), Value::Int(3))
        .unwrap();

    let results = store.query("^Q", &p(&[int(1)]), 1).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], (Path::root(), Value::Int(1)));
    assert_eq!(results[1], (p(&[s("a")]), Value::Int(2)));

    let unlimited = store.query("^Q", &p(&[int(1)]), -1).unwrap();
    assert_eq!(unlimited.len(), 3);
}

#[test]
fn fast_search_equals_brute_force() {
    let store = GlobalStore::new(128);
    store.set("^U", &p(&[int(1)]), Value::from("apple")).unwrap();
    store.set("^V", &p(&[s("k")]), Value::from("apple")).unwrap();
    store.set("^V", &p(&[s("m")]), Value::from("plum")).unwrap();
    store.set("^W", &p(&[int(3)]), Value::Int(42)).unwrap();

    let mut hits: Vec<(String, String)> = store
        .fast_search("apple")
        .into_iter()
        .map(|h| (h.global, h.path.key()))
        .collect();
    hits.sort();
    assert_eq!(
        hits,
        vec![
            ("^U".to_string(), "1".to_string()),
            ("^V".to_string(), "k".to_string())
        ]
    );

    // numeric values are found by their textual form
    let numeric = store.fast_search("42");
    assert_eq!(numeric.len(), 1);
    assert_eq!(numeric[0].value, Value::Int(42));
}

#[test]
fn transaction_rollback_restores_begin_state() {
    let store = GlobalStore::new(128);
    store.set("^S", &p(&[int(1)]), Value::Int(1)).unwrap();
    let before = store.export();

    let mut txn = Transaction::begin(&store);
    txn.set("^S", &p(&[int(1)]), Value::Int(99)).unwrap();
    txn.set("^NEW", &Path::root(), Value::Int(5)).unwrap();
    txn.kill("^S", &Path::root()).unwrap();
    drop(txn); // rollback

    assert_eq!(store.export(), before);
}

#[test]
fn transaction_commit_makes_all_writes_visible() {
    let store = GlobalStore::new(128);

    let mut txn = Transaction::begin(&store);
    txn.set("^C", &p(&[int(1)]), Value::from("one")).unwrap();
    txn.set("^C", &p(&[int(2)]), Value::from("two")).unwrap();
    txn.commit(&store);

    assert_eq!(
        store.get("^C", &p(&[int(1)])).unwrap(),
        Some(Value::from("one"))
    );
    assert_eq!(
        store.get("^C", &p(&[int(2)])).unwrap(),
        Some(Value::from("two"))
    );
}

#[test]
fn no_empty_nodes_survive_random_workload() {
    let store = GlobalStore::new(128);
    let paths = [
        p(&[int(1), int(2), int(3)]),
        p(&[int(1), int(2), int(4)]),
        p(&[int(1), s("x")]),
        p(&[s("top")]),
    ];
    for (i, path) in paths.iter().enumerate() {
        store.set("^R", path, Value::Int(i as i64)).unwrap();
    }
    for path in &paths {
        store.kill("^R", path).unwrap();
    }
    // every leaf is gone, so the global itself must be gone
    assert!(store.global_names().is_empty());
}
