//! Storage Manager scenario from the literal testable properties: create a
//! page file, grow it, write into a block, close, reopen, and read the same
//! bytes back.

mod common;

use dbcore::storage::{create_page_file, FileHandle};
use dbcore::types::{PageId, PAGE_SIZE};
use tempfile::tempdir;

#[test]
fn create_grow_write_close_reopen_read() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("t");

    create_page_file(&path).unwrap();
    {
        let mut handle = FileHandle::open(&path).unwrap();
        handle.ensure_capacity(3).unwrap();
        assert!(handle.total_pages() >= 3);

        let mut block = Box::new([0u8; PAGE_SIZE]);
        block[0..3].copy_from_slice(b"abc");
        handle.write_block(PageId::new(2), &block).unwrap();
        handle.close().unwrap();
    }

    let mut handle = FileHandle::open(&path).unwrap();
    let block = handle.read_block(PageId::new(2)).unwrap();
    assert_eq!(&block[0..3], b"abc");
    assert!(block[3..].iter().all(|&b| b == 0));
}
