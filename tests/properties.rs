//! # Randomized Store Properties
//!
//! Property tests over arbitrary insert sequences:
//!
//! 1. **Ordering**: a full traversal is strictly ascending with no duplicates
//! 2. **Accumulation**: repeated inserts of a key sum with saturation
//! 3. **Persistence**: close + reopen yields the identical sequence
//! 4. **Growth**: outgrowing the initial capacity keeps every key and a clean tree
//! 5. **Search strategy**: linear and bisecting search build identical pages
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test properties --release
//! ```

use std::collections::BTreeMap;

use proptest::prelude::*;
use sampledb::{Key, SampleDb, SearchStrategy, Value};
use tempfile::tempdir;

fn ops_strategy() -> impl Strategy<Value = Vec<(Key, Value)>> {
    let key = prop_oneof![
        4 => 0u32..512,
        1 => any::<u32>(),
        1 => Just(Key::MAX),
    ];
    let value = prop_oneof![
        8 => 0u32..1000,
        1 => any::<u32>(),
    ];
    prop::collection::vec((key, value), 0..1500)
}

fn model(ops: &[(Key, Value)]) -> Vec<(Key, Value)> {
    let mut expected = BTreeMap::new();
    for &(k, v) in ops {
        let slot = expected.entry(k).or_insert(0u32);
        *slot = slot.saturating_add(v);
    }
    expected.into_iter().collect()
}

fn page_keys(db: &SampleDb) -> Vec<(u32, Vec<(u32, Key, Value)>)> {
    let store = db.store();
    (0..store.used_pages().unwrap())
        .map(|page_no| {
            let page = store.page(page_no).unwrap();
            let items = page
                .items()
                .iter()
                .map(|item| (item.right(), item.key(), item.value()))
                .collect();
            (page.leftmost(), items)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_traversal_matches_model(ops in ops_strategy()) {
        let dir = tempdir().unwrap();
        let mut db = SampleDb::open(dir.path().join("samples.db")).unwrap();

        for &(k, v) in &ops {
            db.insert(k, v).unwrap();
        }

        let entries = db.entries().unwrap();
        prop_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        prop_assert_eq!(entries, model(&ops));
        prop_assert!(db.check().unwrap().is_empty());
    }

    #[test]
    fn prop_split_accumulate_equals_single_insert(key in any::<u32>(), v1 in any::<u32>(), v2 in any::<u32>()) {
        let dir = tempdir().unwrap();
        let mut split = SampleDb::open(dir.path().join("split.db")).unwrap();
        let mut single = SampleDb::open(dir.path().join("single.db")).unwrap();

        split.insert(key, v1).unwrap();
        split.insert(key, v2).unwrap();
        single.insert(key, v1.saturating_add(v2)).unwrap();

        prop_assert_eq!(split.entries().unwrap(), single.entries().unwrap());
    }

    #[test]
    fn prop_reopen_reproduces_sequence(ops in ops_strategy()) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.db");

        let before = {
            let mut db = SampleDb::open(&path).unwrap();
            for &(k, v) in &ops {
                db.insert(k, v).unwrap();
            }
            let entries = db.entries().unwrap();
            db.close().unwrap();
            entries
        };

        let mut db = SampleDb::open(&path).unwrap();
        prop_assert_eq!(db.entries().unwrap(), before);
    }

    #[test]
    fn prop_growth_keeps_every_key(keys in prop::collection::btree_set(any::<u32>(), 200..800)) {
        let dir = tempdir().unwrap();
        let mut db = SampleDb::builder()
            .path(dir.path().join("samples.db"))
            .initial_capacity(1)
            .open()
            .unwrap();

        for &k in &keys {
            db.insert(k, 1).unwrap();
        }

        prop_assert!(db.page_capacity() > 1);
        let entries = db.entries().unwrap();
        prop_assert_eq!(entries.len(), keys.len());
        prop_assert!(entries.iter().map(|&(k, _)| k).eq(keys.iter().copied()));
        prop_assert!(db.check().unwrap().is_empty());
    }

    #[test]
    fn prop_linear_and_bisect_build_identical_pages(ops in ops_strategy()) {
        let dir = tempdir().unwrap();
        let mut linear = SampleDb::builder()
            .path(dir.path().join("linear.db"))
            .search(SearchStrategy::Linear)
            .open()
            .unwrap();
        let mut bisect = SampleDb::builder()
            .path(dir.path().join("bisect.db"))
            .search(SearchStrategy::Bisect)
            .open()
            .unwrap();

        for &(k, v) in &ops {
            let a = linear.insert(k, v).unwrap();
            let b = bisect.insert(k, v).unwrap();
            prop_assert_eq!(a, b);
        }

        prop_assert_eq!(linear.root_page().unwrap(), bisect.root_page().unwrap());
        prop_assert_eq!(page_keys(&linear), page_keys(&bisect));
    }
}
