use crate::error::{Result, StorageError};
use crate::storage::{decode_page_count, encode_page_count};
use crate::types::{PageId, META_FIELD_SIZE, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An open page file.
///
/// Mirrors `original_source`'s `SM_FileHandle`: a cached block count and a
/// "current block" cursor alongside the open file descriptor, so that the
/// `read_next`/`read_previous`/`write_current` family don't need an
/// explicit page argument.
pub struct FileHandle {
    path: PathBuf,
    file: File,
    total_pages: u32,
    cur_page_pos: u32,
}

impl FileHandle {
    /// Opens an existing page file. The file must have been created with
    /// [`super::create_page_file`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StorageError::FileNotFound(format!("{}: {e}", path.display())))?;

        let mut header = [0u8; META_FIELD_SIZE];
        file.read_exact(&mut header)?;
        let total_pages = decode_page_count(&header)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_pages,
            cur_page_pos: 0,
        })
    }

    /// Flushes and closes the underlying file.
    pub fn close(mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| StorageError::FileCloseFailed(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn current_block(&self) -> PageId {
        PageId::new(self.cur_page_pos)
    }

    fn offset_of(&self, page: PageId) -> u64 {
        page.file_offset(PAGE_SIZE, META_FIELD_SIZE)
    }

    fn check_readable(&self, page: PageId) -> Result<()> {
        if page.value() >= self.total_pages {
            return Err(StorageError::ReadNonExistingPage(page));
        }
        Ok(())
    }

    fn read_at(&mut self, page: PageId) -> Result<Box<[u8; PAGE_SIZE]>> {
        self.check_readable(page)?;
        self.file.seek(SeekFrom::Start(self.offset_of(page)))?;
        let mut buf = Box::new([0u8; PAGE_SIZE]);
        self.file
            .read_exact(buf.as_mut())
            .map_err(|_| StorageError::ReadFailed(page))?;
        self.cur_page_pos = page.value();
        Ok(buf)
    }

    fn write_at(&mut self, page: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        if page.value() >= self.total_pages {
            return Err(StorageError::WriteNonExistingPage(page));
        }
        self.file.seek(SeekFrom::Start(self.offset_of(page)))?;
        self.file
            .write_all(data)
            .map_err(|_| StorageError::WriteFailed(page))?;
        self.file.flush()?;
        self.cur_page_pos = page.value();
        Ok(())
    }

    pub fn read_block(&mut self, page: PageId) -> Result<Box<[u8; PAGE_SIZE]>> {
        self.read_at(page)
    }

    pub fn read_first_block(&mut self) -> Result<Box<[u8; PAGE_SIZE]>> {
        self.read_at(PageId::new(0))
    }

    pub fn read_previous_block(&mut self) -> Result<Box<[u8; PAGE_SIZE]>> {
        if self.cur_page_pos == 0 {
            return Err(StorageError::ReadNonExistingPage(PageId::new(0)));
        }
        self.read_at(PageId::new(self.cur_page_pos - 1))
    }

    pub fn read_current_block(&mut self) -> Result<Box<[u8; PAGE_SIZE]>> {
        self.read_at(PageId::new(self.cur_page_pos))
    }

    pub fn read_next_block(&mut self) -> Result<Box<[u8; PAGE_SIZE]>> {
        let next = self.cur_page_pos + 1;
        if next >= self.total_pages {
            return Err(StorageError::ReadNonExistingPage(PageId::new(next)));
        }
        self.read_at(PageId::new(next))
    }

    pub fn read_last_block(&mut self) -> Result<Box<[u8; PAGE_SIZE]>> {
        if self.total_pages == 0 {
            return Err(StorageError::ReadNonExistingPage(PageId::new(0)));
        }
        self.read_at(PageId::new(self.total_pages - 1))
    }

    pub fn write_block(&mut self, page: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        self.write_at(page, data)
    }

    pub fn write_current_block(&mut self, data: &[u8; PAGE_SIZE]) -> Result<()> {
        self.write_at(PageId::new(self.cur_page_pos), data)
    }

    /// Appends a zero-filled block at the end of the file and updates the
    /// header. Equivalent to `original_source`'s `appendEmptyBlock`.
    pub fn append_empty_block(&mut self) -> Result<PageId> {
        let new_page = PageId::new(self.total_pages);
        self.file.seek(SeekFrom::End(0))?;
        self.file
            .write_all(&[0u8; PAGE_SIZE])
            .map_err(|_| StorageError::WriteFailed(new_page))?;
        self.file.flush()?;

        self.total_pages += 1;
        self.cur_page_pos = new_page.value();
        self.write_header()?;

        Ok(new_page)
    }

    /// Grows the file, if necessary, until it has at least `num_pages`
    /// blocks. No-op if the file is already large enough.
    pub fn ensure_capacity(&mut self, num_pages: u32) -> Result<()> {
        if self.total_pages >= num_pages {
            return Ok(());
        }

        let additional = (num_pages - self.total_pages) as usize;
        self.file.seek(SeekFrom::End(0))?;
        let zeros = vec![0u8; PAGE_SIZE * additional];
        self.file.write_all(&zeros)?;
        self.file.flush()?;

        self.total_pages = num_pages;
        self.cur_page_pos = num_pages - 1;
        self.write_header()
    }

    /// Rewrites the `META_FIELD_SIZE`-byte page-count header and fsyncs it,
    /// so a crash immediately after an `append`/`ensure_capacity` call does
    /// not lose the new page count. Grounded on `original_source`'s
    /// `updateMetaData`.
    fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&encode_page_count(self.total_pages))?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}
