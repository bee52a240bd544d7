//! Concurrent dictionary interning and tree insertion exercised directly
//! through the public API, beyond what `src/dictionary/mod.rs`'s in-module
//! tests already cover for a single shared name.

use std::sync::Arc;
use std::thread;

use schema_rec::dictionary::PropertyDictionary;
use schema_rec::tree::SchemaTree;

mod common {
    pub fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

#[test]
fn concurrent_get_or_create_never_duplicates_a_pid_across_many_names() {
    common::init();
    let dict = Arc::new(PropertyDictionary::new());
    let names: Vec<String> = (0..200).map(|i| format!("property-{}", i % 20)).collect();

    let handles: Vec<_> = names
        .into_iter()
        .map(|name| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || dict.get_or_create(&name, false))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(dict.len(), 20, "only 20 distinct names were ever requested");

    // Every thread requesting the same name must observe the same PID.
    for i in 0..20 {
        let expected = dict.get(&format!("property-{i}")).unwrap();
        let observed: Vec<_> = results
            .iter()
            .enumerate()
            .filter(|(j, _)| j % 20 == i)
            .map(|(_, &pid)| pid)
            .collect();
        assert!(observed.iter().all(|&pid| pid == expected));
    }
}

#[test]
fn concurrent_inserts_accumulate_root_support_exactly() {
    common::init();
    let tree = Arc::new(SchemaTree::new(1, false));
    let pa = tree.dictionary().get_or_create("a", false);
    let pb = tree.dictionary().get_or_create("b", false);

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                tree.dictionary().increment(pa);
                if i % 2 == 0 {
                    tree.dictionary().increment(pb);
                    tree.insert(&[pa, pb]);
                } else {
                    tree.insert(&[pa]);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    tree.finalize_sort_order();
    assert_eq!(tree.support(), 100);
    assert_eq!(tree.dictionary().record(pa).total_count(), 100);
    assert_eq!(tree.dictionary().record(pb).total_count(), 50);
}
