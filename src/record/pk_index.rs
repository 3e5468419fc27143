//! Flat-hash primary-key index: a sibling `<table>.idx` page file mapping
//! integer PK values to RIDs (`spec.md` §4.3.2).
//!
//! Two source defects are deliberately not reproduced (`spec.md` §9).
//! `spec.md`'s `page = k / slotsPerPage, offset = k mod slotsPerPage`
//! mapping is a bijection for non-negative keys, so no two distinct keys
//! ever address the same slot through the formula itself; the corpus's
//! "silent overwrite" defect instead came from reusing page 0's slot 0 as
//! both a real key's home and the empty-slot sentinel (key 0 was
//! unrepresentable). This rewrite keeps the empty/occupied ambiguity from
//! ever mattering (see `key_sentinel`) and still probes linearly within a
//! page as a defensive measure against any future change to the mapping.
//! `remove` clears the slot instead of leaving a stale entry that would
//! falsely raise `DUPLICATE_KEY` on a later re-insert of the same key.

use crate::buffer::BufferPoolManager;
use crate::error::{Result, StorageError};
use crate::record::record::Rid;
use crate::storage::create_page_file;
use crate::types::{PageId, ReplacementPolicy, PAGE_SIZE};
use std::path::Path;

const SLOT_SIZE: usize = 12;
const HEADER_RESERVE: usize = 5;

fn slots_per_page() -> usize {
    (PAGE_SIZE - HEADER_RESERVE) / SLOT_SIZE
}

pub struct PkIndex {
    pool: BufferPoolManager,
}

impl PkIndex {
    pub fn create(path: impl AsRef<Path>, num_frames: usize, policy: ReplacementPolicy) -> Result<Self> {
        create_page_file(path.as_ref())?;
        Self::open(path, num_frames, policy)
    }

    pub fn open(path: impl AsRef<Path>, num_frames: usize, policy: ReplacementPolicy) -> Result<Self> {
        Ok(Self {
            pool: BufferPoolManager::init(path, num_frames, policy)?,
        })
    }

    pub fn close(self) -> Result<()> {
        self.pool.shutdown()
    }

    fn home(&self, key: i32) -> Result<(PageId, usize)> {
        if key < 0 {
            return Err(StorageError::invalid_attribute("primary key must be non-negative"));
        }
        let key = key as usize;
        let spp = slots_per_page();
        Ok((PageId::new((key / spp) as u32), key % spp))
    }

    fn slot_offset(slot_in_page: usize) -> usize {
        HEADER_RESERVE + SLOT_SIZE * slot_in_page
    }

    fn read_slot(buf: &[u8; PAGE_SIZE], slot_in_page: usize) -> (i32, Rid) {
        let off = Self::slot_offset(slot_in_page);
        let pk = i32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        let page = u32::from_le_bytes(buf[off + 4..off + 8].try_into().unwrap());
        let slot = u32::from_le_bytes(buf[off + 8..off + 12].try_into().unwrap());
        (pk, Rid::new(PageId::new(page), slot))
    }

    fn write_slot(buf: &mut [u8; PAGE_SIZE], slot_in_page: usize, pk: i32, rid: Rid) {
        let off = Self::slot_offset(slot_in_page);
        buf[off..off + 4].copy_from_slice(&pk.to_le_bytes());
        buf[off + 4..off + 8].copy_from_slice(&rid.page.value().to_le_bytes());
        buf[off + 8..off + 12].copy_from_slice(&rid.slot.to_le_bytes());
    }

    /// Returns the RID stored for `key`, or `None` if absent.
    pub fn lookup(&self, key: i32) -> Result<Option<Rid>> {
        let (page, home_slot) = self.home(key)?;
        let guard = self.pool.pin_page(page)?;
        let data = guard.read();
        let spp = slots_per_page();
        for i in 0..spp {
            let slot_in_page = (home_slot + i) % spp;
            let (stored_pk, rid) = Self::read_slot(&data, slot_in_page);
            if stored_pk == 0 {
                return Ok(None);
            }
            if stored_pk == key_sentinel(key) {
                return Ok(Some(rid));
            }
        }
        Ok(None)
    }

    pub fn insert(&self, key: i32, rid: Rid) -> Result<()> {
        let (page, home_slot) = self.home(key)?;
        let guard = self.pool.pin_page(page)?;
        let spp = slots_per_page();
        let mut data = guard.write();
        for i in 0..spp {
            let slot_in_page = (home_slot + i) % spp;
            let (stored_pk, _) = Self::read_slot(&data, slot_in_page);
            if stored_pk == 0 || stored_pk == key_sentinel(key) {
                Self::write_slot(&mut data, slot_in_page, key_sentinel(key), rid);
                return Ok(());
            }
        }
        Err(StorageError::NotEnoughMemory(format!(
            "primary-key index page {page} is full (linear probe exhausted)"
        )))
    }

    /// Clears the slot for `key`, if present. No-op if absent.
    pub fn remove(&self, key: i32) -> Result<()> {
        let (page, home_slot) = self.home(key)?;
        let guard = self.pool.pin_page(page)?;
        let spp = slots_per_page();
        let mut data = guard.write();
        for i in 0..spp {
            let slot_in_page = (home_slot + i) % spp;
            let (stored_pk, _) = Self::read_slot(&data, slot_in_page);
            if stored_pk == 0 {
                return Ok(());
            }
            if stored_pk == key_sentinel(key) {
                Self::write_slot(&mut data, slot_in_page, 0, Rid::new(PageId::new(0), 0));
                return Ok(());
            }
        }
        Ok(())
    }
}

/// The on-disk slot distinguishes "empty" (`0`) from a real key by storing
/// `key + 1`; this lets key `0` itself be indexed, unlike the source's
/// "zero marks empty" rule, which cannot represent PK value 0.
fn key_sentinel(key: i32) -> i32 {
    key + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fresh_index() -> (tempfile::TempDir, PkIndex) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let idx = PkIndex::create(&path, 4, ReplacementPolicy::Fifo).unwrap();
        (dir, idx)
    }

    #[test]
    fn test_insert_and_lookup() {
        let (_dir, idx) = fresh_index();
        idx.insert(5, Rid::new(PageId::new(1), 2)).unwrap();
        assert_eq!(idx.lookup(5).unwrap(), Some(Rid::new(PageId::new(1), 2)));
        assert_eq!(idx.lookup(6).unwrap(), None);
    }

    #[test]
    fn test_key_zero_is_indexable() {
        let (_dir, idx) = fresh_index();
        idx.insert(0, Rid::new(PageId::new(3), 0)).unwrap();
        assert_eq!(idx.lookup(0).unwrap(), Some(Rid::new(PageId::new(3), 0)));
    }

    #[test]
    fn test_remove_clears_slot_allowing_reinsert() {
        let (_dir, idx) = fresh_index();
        idx.insert(9, Rid::new(PageId::new(1), 0)).unwrap();
        idx.remove(9).unwrap();
        assert_eq!(idx.lookup(9).unwrap(), None);
        idx.insert(9, Rid::new(PageId::new(2), 0)).unwrap();
        assert_eq!(idx.lookup(9).unwrap(), Some(Rid::new(PageId::new(2), 0)));
    }

    #[test]
    fn test_multiple_keys_on_the_same_page_stay_distinct() {
        let (_dir, idx) = fresh_index();
        let a = 3i32;
        let b = 4i32;
        idx.insert(a, Rid::new(PageId::new(1), 0)).unwrap();
        idx.insert(b, Rid::new(PageId::new(2), 0)).unwrap();
        assert_eq!(idx.lookup(a).unwrap(), Some(Rid::new(PageId::new(1), 0)));
        assert_eq!(idx.lookup(b).unwrap(), Some(Rid::new(PageId::new(2), 0)));
    }

    #[test]
    fn test_rejects_negative_key() {
        let (_dir, idx) = fresh_index();
        let err = idx.lookup(-1).unwrap_err();
        assert!(matches!(err, StorageError::InvalidAttribute(_)));
    }
}
