use crate::types::{PageId, PAGE_SIZE};
use parking_lot::RwLock;
use std::sync::Arc;

/// A single in-memory buffer frame.
///
/// The page bytes live behind their own `RwLock` so that two outstanding
/// [`super::PageGuard`]s on the same pinned page can read through their
/// aliasing references without re-entering the pool's global lock — the
/// frame-data half of the two-lock model. Everything else (occupancy,
/// dirty flag, fix count, eviction stamps) is plain pool-owned state,
/// mutated only while the pool lock is held.
pub(super) struct Frame {
    pub page: Option<PageId>,
    pub data: Arc<RwLock<Box<[u8; PAGE_SIZE]>>>,
    pub dirty: bool,
    pub fix_count: u32,
    pub inserted_at: u64,
    pub last_used_at: u64,
    pub use_count: u64,
}

impl Frame {
    pub fn empty() -> Self {
        Self {
            page: None,
            data: Arc::new(RwLock::new(Box::new([0u8; PAGE_SIZE]))),
            dirty: false,
            fix_count: 0,
            inserted_at: 0,
            last_used_at: 0,
            use_count: 0,
        }
    }

    pub fn is_evictable(&self) -> bool {
        self.page.is_some() && self.fix_count == 0
    }
}
