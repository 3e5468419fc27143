//! Table storage: maps a schema and a sequence of slotted data pages onto
//! a page file, with an optional sibling primary-key index
//! (`spec.md` §4.3, §6).

use crate::buffer::BufferPoolManager;
use crate::error::{Result, StorageError};
use crate::record::expr::Expr;
use crate::record::pk_index::PkIndex;
use crate::record::record::{Record, Rid};
use crate::record::schema::Schema;
use crate::record::value::Value;
use crate::storage::create_page_file;
use crate::types::{DataType, PageId, ReplacementPolicy, PAGE_SIZE};
use log::debug;
use std::path::{Path, PathBuf};

/// Fields persisted little-endian in block 0, in this order, followed by
/// `tblName` bytes and the serialized schema blob (`spec.md` §6).
struct TableHeader {
    page_count: u32,
    tuple_count: u32,
    record_size: u32,
    phys_record_size: u32,
    slot_capacity_page: u32,
    avail_bytes_last_page: u32,
    free_slot_page: u32,
    free_slot_slot: u32,
    tbl_name: String,
}

impl TableHeader {
    fn write_into(&self, schema_bytes: &[u8], buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let name_bytes = self.tbl_name.as_bytes();
        let fields = [
            self.page_count,
            self.tuple_count,
            self.record_size,
            self.phys_record_size,
            self.slot_capacity_page,
            self.avail_bytes_last_page,
            self.free_slot_page,
            self.free_slot_slot,
            name_bytes.len() as u32,
            schema_bytes.len() as u32,
        ];
        let mut cursor = 0usize;
        for f in fields {
            buf[cursor..cursor + 4].copy_from_slice(&f.to_le_bytes());
            cursor += 4;
        }
        let end = cursor + name_bytes.len();
        if end + schema_bytes.len() > PAGE_SIZE {
            return Err(StorageError::invalid_schema("table name + schema blob does not fit in one page"));
        }
        buf[cursor..end].copy_from_slice(name_bytes);
        cursor = end;
        buf[cursor..cursor + schema_bytes.len()].copy_from_slice(schema_bytes);
        Ok(())
    }

    fn read_from(buf: &[u8; PAGE_SIZE]) -> Result<(Self, Schema)> {
        let mut read_u32 = |off: usize| -> u32 { u32::from_le_bytes(buf[off..off + 4].try_into().unwrap()) };
        let page_count = read_u32(0);
        let tuple_count = read_u32(4);
        let record_size = read_u32(8);
        let phys_record_size = read_u32(12);
        let slot_capacity_page = read_u32(16);
        let avail_bytes_last_page = read_u32(20);
        let free_slot_page = read_u32(24);
        let free_slot_slot = read_u32(28);
        let tbl_name_size = read_u32(32) as usize;
        let schema_size = read_u32(36) as usize;

        let mut cursor = 40usize;
        let tbl_name = String::from_utf8(buf[cursor..cursor + tbl_name_size].to_vec())
            .map_err(|_| StorageError::corruption("table name is not valid UTF-8"))?;
        cursor += tbl_name_size;
        let schema = Schema::deserialize(&buf[cursor..cursor + schema_size])?;

        Ok((
            Self {
                page_count,
                tuple_count,
                record_size,
                phys_record_size,
                slot_capacity_page,
                avail_bytes_last_page,
                free_slot_page,
                free_slot_slot,
                tbl_name,
            },
            schema,
        ))
    }
}

pub struct Table {
    header: TableHeader,
    schema: Schema,
    data_pool: BufferPoolManager,
    pk_index: Option<PkIndex>,
}

fn index_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".idx");
    PathBuf::from(p)
}

impl Table {
    /// Creates a new table page file, writes its header and schema into
    /// block 0, and materializes an empty first data page. If `schema`
    /// declares a single-column primary key, also creates the sibling
    /// `<path>.idx` flat-hash index.
    pub fn create(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        schema: Schema,
        num_frames: usize,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let name = name.into();
        if name.is_empty() {
            return Err(StorageError::invalid_table_name("table name must not be empty"));
        }
        if let Some(pk_idx) = schema.pk_attr() {
            if schema.data_type(pk_idx) != Some(DataType::Int) {
                return Err(StorageError::invalid_schema("primary key attribute must be INT"));
            }
        }

        create_page_file(path)?;
        let data_pool = BufferPoolManager::init(path, num_frames, policy)?;

        let record_size = schema.record_size();
        let phys_record_size = 2 * 4 + 2 + record_size;
        let slot_capacity_page = PAGE_SIZE as u32 / phys_record_size;
        if slot_capacity_page == 0 {
            return Err(StorageError::invalid_schema("record is larger than one page"));
        }
        let avail_bytes_last_page = PAGE_SIZE as u32 % phys_record_size;

        let header = TableHeader {
            page_count: 2,
            tuple_count: 0,
            record_size,
            phys_record_size,
            slot_capacity_page,
            avail_bytes_last_page,
            free_slot_page: 1,
            free_slot_slot: 0,
            tbl_name: name,
        };

        let pk_index = match schema.pk_attr() {
            Some(_) => Some(PkIndex::create(index_path(path), num_frames, policy)?),
            None => None,
        };

        let mut table = Self {
            header,
            schema,
            data_pool,
            pk_index,
        };
        table.write_header()?;
        // Materialize block 1 as an empty data page (deferred append: marked
        // dirty immediately, physically appended at the next flush).
        {
            let guard = table.data_pool.pin_page(PageId::new(1))?;
            guard.write(); // touch to mark dirty; content stays zeroed
        }
        table.data_pool.force_flush_pool()?;
        debug!("created table '{}' with record_size={record_size}", table.header.tbl_name);
        Ok(table)
    }

    /// Opens an existing table, validating that the on-disk schema matches.
    pub fn open(path: impl AsRef<Path>, num_frames: usize, policy: ReplacementPolicy) -> Result<Self> {
        let path = path.as_ref();
        let data_pool = BufferPoolManager::init(path, num_frames, policy)?;
        let (header, schema) = {
            let guard = data_pool.pin_page(PageId::HEADER)?;
            let result = TableHeader::read_from(&guard.read())?;
            result
        };

        let pk_index = if schema.has_pk() {
            Some(PkIndex::open(index_path(path), num_frames, policy)?)
        } else {
            None
        };

        Ok(Self {
            header,
            schema,
            data_pool,
            pk_index,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_tuples(&self) -> u32 {
        self.header.tuple_count
    }

    pub fn record_size(&self) -> u32 {
        self.header.record_size
    }

    fn write_header(&mut self) -> Result<()> {
        let schema_bytes = self.schema.serialize();
        let guard = self.data_pool.pin_page(PageId::HEADER)?;
        let mut buf = guard.write();
        self.header.write_into(&schema_bytes, &mut buf)
    }

    fn write_record(&self, rid: Rid, record: &Record) -> Result<()> {
        let guard = self.data_pool.pin_page(rid.page)?;
        let mut buf = guard.write();
        let offset = rid.slot as usize * self.header.phys_record_size as usize;
        let bytes = record.serialize();
        buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    fn read_record(&self, rid: Rid) -> Result<Record> {
        let guard = self.data_pool.pin_page(rid.page)?;
        let buf = guard.read();
        let offset = rid.slot as usize * self.header.phys_record_size as usize;
        let end = offset + self.header.phys_record_size as usize;
        Record::deserialize(&buf[offset..end], &self.schema)
    }

    fn pk_value(&self, record: &Record) -> Result<Option<i32>> {
        match self.schema.pk_attr() {
            None => Ok(None),
            Some(idx) => match record.get_attr(&self.schema, idx)? {
                Some(Value::Int(k)) => Ok(Some(k)),
                Some(_) => Err(StorageError::invalid_schema("primary key attribute must be INT")),
                None => Err(StorageError::invalid_attribute("primary key attribute must not be NULL")),
            },
        }
    }

    /// Inserts `record`, stamping its RID. Fails with `DuplicateKey` if the
    /// table has a primary key and it's already present.
    pub fn insert(&mut self, mut record: Record) -> Result<Rid> {
        let pk = self.pk_value(&record)?;
        if let (Some(pk_index), Some(key)) = (&self.pk_index, pk) {
            if pk_index.lookup(key)?.is_some() {
                return Err(StorageError::DuplicateKey);
            }
        }

        if self.header.free_slot_slot >= self.header.slot_capacity_page {
            self.header.free_slot_page = self.header.page_count;
            self.header.free_slot_slot = 0;
            self.header.page_count += 1;
        }
        let rid = Rid::new(PageId::new(self.header.free_slot_page), self.header.free_slot_slot);
        self.header.free_slot_slot += 1;

        record.id = rid;
        self.write_record(rid, &record)?;
        if let (Some(pk_index), Some(key)) = (&self.pk_index, pk) {
            pk_index.insert(key, rid)?;
        }
        self.header.tuple_count += 1;
        self.write_header()?;
        Ok(rid)
    }

    /// Tombstones the record at `id` and clears its primary-key entry.
    pub fn delete(&mut self, id: Rid) -> Result<()> {
        let mut record = self.read_record(id)?;
        let pk = self.pk_value(&record)?;
        record.set_tombstone(true);
        self.write_record(id, &record)?;
        if let (Some(pk_index), Some(key)) = (&self.pk_index, pk) {
            pk_index.remove(key)?;
        }
        self.header.tuple_count = self.header.tuple_count.saturating_sub(1);
        self.write_header()
    }

    /// Rewrites the slot at `record.id` in place, after the same
    /// primary-key uniqueness check `insert` performs.
    pub fn update(&mut self, record: &Record) -> Result<()> {
        let pk = self.pk_value(record)?;
        if let (Some(pk_index), Some(key)) = (&self.pk_index, pk) {
            let old_record = self.read_record(record.id)?;
            let old_pk = self.pk_value(&old_record)?;
            match pk_index.lookup(key)? {
                Some(existing) if existing != record.id => return Err(StorageError::DuplicateKey),
                Some(_) => {}
                None => pk_index.insert(key, record.id)?,
            }
            if let Some(old_key) = old_pk {
                if old_key != key {
                    pk_index.remove(old_key)?;
                }
            }
        }
        self.write_record(record.id, record)
    }

    /// Reads the record at `id` without checking the tombstone bit — the
    /// caller is responsible for that, matching `spec.md` §4.3's `Get`.
    pub fn get(&self, id: Rid) -> Result<Record> {
        self.read_record(id)
    }

    fn free_slot_cursor(&self) -> (u32, u32) {
        (self.header.free_slot_page, self.header.free_slot_slot)
    }

    /// Eagerly materializes every live (non-tombstoned, allocated) record
    /// for which `cond` evaluates true, in page/slot order.
    pub fn scan(&self, cond: &Expr) -> Result<Vec<Record>> {
        let mut results = Vec::new();
        let (cursor_page, cursor_slot) = self.free_slot_cursor();

        for page in 1..self.header.page_count {
            for slot in 0..self.header.slot_capacity_page {
                if page > cursor_page || (page == cursor_page && slot >= cursor_slot) {
                    break;
                }
                let rid = Rid::new(PageId::new(page), slot);
                let record = self.read_record(rid)?;
                if record.is_tombstoned() {
                    continue;
                }
                if cond.eval_bool(&self.schema, &record)? {
                    results.push(record);
                }
            }
        }
        Ok(results)
    }

    /// A scan that, for each matching record, calls `f` to mutate it and
    /// then writes the result back via `update`.
    pub fn update_scan(&mut self, cond: &Expr, mut f: impl FnMut(&Schema, &mut Record)) -> Result<()> {
        let matches = self.scan(cond)?;
        for mut record in matches {
            f(&self.schema, &mut record);
            self.update(&record)?;
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.write_header()?;
        self.data_pool.force_flush_pool()?;
        let pk_index = self.pk_index.take();
        self.data_pool.shutdown()?;
        if let Some(pk_index) = pk_index {
            pk_index.close()?;
        }
        Ok(())
    }
}
