//! B+-Tree Manager scenario: build an order-4 tree, probe present and
//! absent keys, confirm scan returns entries in ascending order. Also
//! stress-inserts a larger randomly-ordered key set and checks every key
//! is still findable and the scan stays sorted.

mod common;

use dbcore::btree::BTreeIndex;
use dbcore::record::Rid;
use dbcore::types::{PageId, ReplacementPolicy};
use rand::seq::SliceRandom;
use tempfile::tempdir;

#[test]
fn order_four_insert_find_and_scan() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("idx");
    let mut tree = BTreeIndex::create(&path, 4, 8, ReplacementPolicy::Fifo).unwrap();

    for key in [10, 20, 30, 40, 50] {
        tree.insert(key, Rid::new(PageId::new(key as u32), 0)).unwrap();
    }

    assert!(tree.get_num_nodes() >= 2);
    assert_eq!(tree.find(30).unwrap(), Some(Rid::new(PageId::new(30), 0)));
    assert_eq!(tree.find(35).unwrap(), None);

    let scanned: Vec<i32> = tree.scan().unwrap().map(|entry| entry.unwrap().0).collect();
    assert_eq!(scanned, vec![10, 20, 30, 40, 50]);
}

#[test]
fn random_order_insertion_stays_findable_and_sorted() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("idx");
    let mut tree = BTreeIndex::create(&path, 4, 16, ReplacementPolicy::Lru).unwrap();

    let mut keys: Vec<i32> = (0..200).collect();
    keys.shuffle(&mut rand::thread_rng());

    for &key in &keys {
        tree.insert(key, Rid::new(PageId::new(key as u32 + 1), 0)).unwrap();
    }

    for &key in &keys {
        assert_eq!(tree.find(key).unwrap(), Some(Rid::new(PageId::new(key as u32 + 1), 0)));
    }

    let scanned: Vec<i32> = tree.scan().unwrap().map(|entry| entry.unwrap().0).collect();
    let mut expected = keys.clone();
    expected.sort_unstable();
    assert_eq!(scanned, expected);

    // Delete every third key; the rest must remain findable and sorted.
    for &key in keys.iter().step_by(3) {
        assert!(tree.delete(key).unwrap());
    }
    let remaining: Vec<i32> = expected.into_iter().filter(|k| !keys.iter().step_by(3).any(|x| x == k)).collect();
    let scanned_after: Vec<i32> = tree.scan().unwrap().map(|entry| entry.unwrap().0).collect();
    assert_eq!(scanned_after, remaining);
}
