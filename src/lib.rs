//! # Relational Storage Kernel
//!
//! A small, disk-based storage kernel built from four layers, each one
//! usable on its own and each depending only on the layer below it.
//!
//! ## Architecture
//!
//! - **Storage Manager** (`storage`): fixed-size page file I/O.
//! - **Buffer Manager** (`buffer`): an in-memory pool of pages with
//!   FIFO/LRU/LFU eviction, pinning and dirty tracking.
//! - **Record Manager** (`record`): fixed-schema tuples over slotted pages,
//!   with an optional primary-key hash index and a small predicate
//!   language for scans.
//! - **B+-Tree Manager** (`btree`): an ordered integer-key index over
//!   record ids, for queries the primary-key index can't serve.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbcore::{ReplacementPolicy, record::{Table, Schema}, types::DataType};
//!
//! let schema = Schema::new(
//!     vec!["id".into(), "name".into()],
//!     vec![DataType::Int, DataType::String],
//!     vec![0, 16],
//!     vec![0],
//! )?;
//! let mut table = Table::create("people.tbl", "people", schema, 32, ReplacementPolicy::Lru)?;
//! ```

pub mod btree;
pub mod buffer;
pub mod error;
pub mod record;
pub mod storage;
pub mod types;

pub use btree::BTreeIndex;
pub use buffer::BufferPoolManager;
pub use error::{Result, StorageError};
pub use record::{Expr, PkIndex, Record, Rid, Schema, Table, Value};
pub use storage::FileHandle;
pub use types::{DataType, PageId, ReplacementPolicy, PAGE_SIZE};
