//! Buffer Manager eviction-order scenarios: with three frames, FIFO evicts
//! by insertion order regardless of later pins; LRU evicts by last-use
//! order instead.

mod common;

use dbcore::buffer::BufferPoolManager;
use dbcore::storage::create_page_file;
use dbcore::types::{PageId, ReplacementPolicy};
use tempfile::tempdir;

fn fresh_pool(num_frames: usize, policy: ReplacementPolicy) -> (tempfile::TempDir, BufferPoolManager) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pool.pf");
    create_page_file(&path).unwrap();
    let pool = BufferPoolManager::init(&path, num_frames, policy).unwrap();
    (dir, pool)
}

#[test]
fn fifo_keeps_most_recently_inserted_three_frames() {
    common::init_logging();
    let (_dir, pool) = fresh_pool(3, ReplacementPolicy::Fifo);
    for i in 1..=4u32 {
        pool.pin_page(PageId::new(i)).unwrap();
    }
    // Frames now hold {4, 2, 3}: page 1 was the oldest insertion and is the
    // one FIFO evicted to make room for page 4.
    let before = pool.stats().read_io;
    pool.pin_page(PageId::new(2)).unwrap();
    pool.pin_page(PageId::new(3)).unwrap();
    pool.pin_page(PageId::new(4)).unwrap();
    assert_eq!(pool.stats().read_io, before, "pages 2, 3 and 4 should all still be resident");

    pool.pin_page(PageId::new(1)).unwrap();
    assert_eq!(pool.stats().read_io, before + 1, "page 1 was evicted and must be re-read");
}

#[test]
fn lru_keeps_most_recently_used_three_frames() {
    common::init_logging();
    let (_dir, pool) = fresh_pool(3, ReplacementPolicy::Lru);
    pool.pin_page(PageId::new(1)).unwrap();
    pool.pin_page(PageId::new(2)).unwrap();
    pool.pin_page(PageId::new(3)).unwrap();
    pool.pin_page(PageId::new(1)).unwrap(); // touch 1 again, making 2 the least recently used
    pool.pin_page(PageId::new(4)).unwrap(); // evicts 2, not 1

    // Frames now hold {1, 4, 3}.
    let before = pool.stats().read_io;
    pool.pin_page(PageId::new(1)).unwrap();
    pool.pin_page(PageId::new(3)).unwrap();
    pool.pin_page(PageId::new(4)).unwrap();
    assert_eq!(pool.stats().read_io, before, "pages 1, 3 and 4 should all still be resident");

    pool.pin_page(PageId::new(2)).unwrap();
    assert_eq!(pool.stats().read_io, before + 1, "page 2 was evicted and must be re-read");
}
