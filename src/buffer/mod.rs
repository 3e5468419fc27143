//! Buffer Manager: an in-memory page cache sitting on top of one
//! [`crate::storage::FileHandle`], with selectable FIFO/LRU/LFU eviction.

mod frame;
mod pool;

pub use pool::{BufferPoolManager, PageGuard, PoolStats};
