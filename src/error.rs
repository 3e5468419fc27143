//! Error taxonomy shared by the storage manager, buffer manager, record
//! manager and B+-tree layers (`spec.md` §6/§7).

use crate::types::PageId;
use thiserror::Error;

/// Result type alias used uniformly across the crate.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur anywhere in the kernel.
///
/// Every public operation returns one of these (wrapped in `Result`) rather
/// than a bare status code, carrying the context a caller needs without a
/// separate "get last error message" call.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `openPageFile` named a file that does not exist.
    #[error("page file not found: {0}")]
    FileNotFound(String),

    /// A page file handle was used before being initialized, or after close.
    #[error("page file handle not initialized")]
    FileHandleNotInit,

    /// `closePageFile` failed to flush or close the underlying file.
    #[error("failed to close page file: {0}")]
    FileCloseFailed(String),

    /// `destroyPageFile` failed to remove the file from disk.
    #[error("failed to delete page file: {0}")]
    FileDeleteFailed(String),

    /// `readBlock`/`readCurrent` etc. addressed a block beyond `totalPages`.
    #[error("read of non-existing page {0}")]
    ReadNonExistingPage(PageId),

    /// A read completed but transferred fewer than `PAGE_SIZE` bytes.
    #[error("read failed for page {0}")]
    ReadFailed(PageId),

    /// `writeBlock` addressed a block beyond `totalPages`.
    #[error("write of non-existing page {0}")]
    WriteNonExistingPage(PageId),

    /// A write could not be completed.
    #[error("write failed for page {0}")]
    WriteFailed(PageId),

    /// An operation was given a handle/argument it cannot act on.
    #[error("invalid handle or argument: {0}")]
    InvalidHandle(String),

    /// `unpinPage` was called on a page whose fix count was already zero.
    #[error("page {0} is not pinned")]
    PageNotPinned(PageId),

    /// A requested page does not exist in the buffer pool or on disk.
    #[error("page {0} does not exist")]
    PageNotExist(PageId),

    /// `pinPage` could not find a victim frame (all frames pinned).
    #[error("all buffer frames are occupied")]
    AllFramesOccupied,

    /// `shutdownBufferPool` was called while frames were still pinned.
    #[error("buffer pool shutdown failed: {0} frame(s) still pinned")]
    ShutdownFailed(usize),

    /// An allocation could not be satisfied.
    #[error("not enough memory: {0}")]
    NotEnoughMemory(String),

    /// A table name was empty, too long, or otherwise invalid.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    /// A schema was malformed (zero attributes, bad type length, etc).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An attribute name or index did not resolve against the schema.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A table scan was advanced past its last matching tuple.
    #[error("no more tuples")]
    NoMoreTuples,

    /// An insert/update would violate the table's primary-key uniqueness.
    #[error("duplicate key")]
    DuplicateKey,

    /// A B+-tree lookup found no entry for the given key.
    #[error("key not found in index")]
    KeyNotFound,

    /// A B+-tree scan was advanced past its last entry.
    #[error("no more index entries")]
    NoMoreEntries,

    /// A page's header or checksum failed to validate.
    #[error("corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn invalid_handle(msg: impl Into<String>) -> Self {
        Self::InvalidHandle(msg.into())
    }

    pub fn invalid_table_name(msg: impl Into<String>) -> Self {
        Self::InvalidTableName(msg.into())
    }

    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    pub fn invalid_attribute(msg: impl Into<String>) -> Self {
        Self::InvalidAttribute(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }
}
