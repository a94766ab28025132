//! Concurrency properties of the document store: readers never observe torn
//! mutations and concurrent creates never collide.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use serde_json::{Value, json};

use stash_store::{DocumentStore, Path};

fn path(text: &str) -> Path {
    Path::parse(text).expect("valid path")
}

#[test]
fn concurrent_creates_yield_distinct_keys() {
    let store = Arc::new(DocumentStore::new());
    let (tx, rx) = mpsc::channel();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    tx.send(store.create(json!({"n": 0}))).expect("send key");
                }
            })
        })
        .collect();
    drop(tx);

    let keys: HashSet<String> = rx.into_iter().collect();
    for worker in workers {
        worker.join().expect("worker");
    }
    assert_eq!(keys.len(), 8 * 50, "every create must yield a fresh key");
}

#[test]
fn readers_never_observe_torn_mutations() {
    let store = Arc::new(DocumentStore::new());
    // Two shapes that are each internally consistent; a torn read would mix
    // fields from both.
    let even = json!({"generation": 0, "payload": [0, 0, 0]});
    let odd = json!({"generation": 1, "payload": [1, 1, 1]});
    let key = store.create(even.clone());

    let writer = {
        let store = Arc::clone(&store);
        let key = key.clone();
        let even = even.clone();
        let odd = odd.clone();
        thread::spawn(move || {
            for round in 0..500 {
                let doc = if round % 2 == 0 { odd.clone() } else { even.clone() };
                store.set_root(&key, doc).expect("set root");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.clone();
            let even = even.clone();
            let odd = odd.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let seen = store.get(&key, &Path::root()).expect("get");
                    assert!(
                        seen == even || seen == odd,
                        "torn read observed: {seen}"
                    );
                }
            })
        })
        .collect();

    writer.join().expect("writer");
    for reader in readers {
        reader.join().expect("reader");
    }
}

#[test]
fn subtree_writes_are_atomic_to_readers() {
    let store = Arc::new(DocumentStore::new());
    let key = store.create(json!({"a": {"b": [10, 20, 30]}}));

    let writer = {
        let store = Arc::clone(&store);
        let key = key.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                store.set_path(&key, &path("a.b[0]"), json!(99)).expect("set");
                store.set_path(&key, &path("a.b[0]"), json!(10)).expect("set");
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        let key = key.clone();
        thread::spawn(move || {
            for _ in 0..400 {
                let value = store.get(&key, &path("a.b[0]")).expect("get");
                assert!(
                    value == Value::from(10) || value == Value::from(99),
                    "unexpected intermediate value: {value}"
                );
            }
        })
    };

    writer.join().expect("writer");
    reader.join().expect("reader");
}
