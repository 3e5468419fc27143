//! Physical record layout: `{page, slot, nullMap, packed attribute bytes}`
//! (`spec.md` §3/§4.3.1).

use crate::error::{Result, StorageError};
use crate::record::schema::Schema;
use crate::record::value::Value;
use crate::types::{DataType, PageId};

/// Record identifier. Stable across updates; only a `delete` (tombstone)
/// or physical reclamation (not implemented by this kernel) invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page: PageId, slot: u32) -> Self {
        Self { page, slot }
    }
}

/// Bit 15 of `nullMap` is the tombstone; bits 0..15 flag NULL attributes
/// (schemas with 15 or fewer attributes are supported, matching the
/// 16-bit field's reserved top bit).
const TOMBSTONE_BIT: u16 = 1 << 15;

#[derive(Debug, Clone)]
pub struct Record {
    pub id: Rid,
    null_map: u16,
    data: Vec<u8>,
}

impl Record {
    /// A fresh record with every attribute NULL and zeroed bytes.
    pub fn new(schema: &Schema, id: Rid) -> Self {
        Self {
            id,
            null_map: 0,
            data: vec![0u8; schema.record_size() as usize],
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        self.null_map & TOMBSTONE_BIT != 0
    }

    pub fn set_tombstone(&mut self, tombstoned: bool) {
        if tombstoned {
            self.null_map |= TOMBSTONE_BIT;
        } else {
            self.null_map &= !TOMBSTONE_BIT;
        }
    }

    fn is_null(&self, idx: usize) -> bool {
        self.null_map & (1 << idx) != 0
    }

    /// Returns `None` if the attribute is NULL.
    pub fn get_attr(&self, schema: &Schema, idx: usize) -> Result<Option<Value>> {
        if idx >= schema.num_attrs() {
            return Err(StorageError::invalid_attribute(format!("attribute index {idx} out of range")));
        }
        if self.is_null(idx) {
            return Ok(None);
        }
        let offset = schema.attr_offset(idx) as usize;
        let width = schema.width_of(idx) as usize;
        let bytes = &self.data[offset..offset + width];

        let value = match schema.data_type(idx).unwrap() {
            DataType::Int => Value::Int(i32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Float => Value::Float(f32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Bool => Value::Bool(bytes[0] != 0),
            DataType::String => {
                let s = String::from_utf8_lossy(bytes).trim_end_matches(' ').to_string();
                Value::String(s)
            }
        };
        Ok(Some(value))
    }

    pub fn set_attr(&mut self, schema: &Schema, idx: usize, value: Option<&Value>) -> Result<()> {
        if idx >= schema.num_attrs() {
            return Err(StorageError::invalid_attribute(format!("attribute index {idx} out of range")));
        }
        let value = match value {
            None => {
                self.null_map |= 1 << idx;
                return Ok(());
            }
            Some(v) => v,
        };
        self.null_map &= !(1 << idx);

        let offset = schema.attr_offset(idx) as usize;
        let width = schema.width_of(idx) as usize;
        let slot = &mut self.data[offset..offset + width];

        match (schema.data_type(idx).unwrap(), value) {
            (DataType::Int, Value::Int(v)) => slot.copy_from_slice(&v.to_le_bytes()),
            (DataType::Float, Value::Float(v)) => slot.copy_from_slice(&v.to_le_bytes()),
            (DataType::Bool, Value::Bool(v)) => slot[0] = if *v { 1 } else { 0 },
            (DataType::String, Value::String(s)) => {
                let bytes = s.as_bytes();
                if bytes.len() > width {
                    return Err(StorageError::invalid_attribute(format!(
                        "string value longer than typeLength {width}"
                    )));
                }
                slot[..bytes.len()].copy_from_slice(bytes);
                slot[bytes.len()..].fill(b' ');
            }
            (expected, got) => {
                return Err(StorageError::invalid_attribute(format!(
                    "attribute {idx} expects {expected:?}, got {}",
                    got.type_name()
                )))
            }
        }
        Ok(())
    }

    /// `int32 page | int32 slot | int16 nullMap | recordSize bytes`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10 + self.data.len());
        buf.extend_from_slice(&self.id.page.value().to_le_bytes());
        buf.extend_from_slice(&self.id.slot.to_le_bytes());
        buf.extend_from_slice(&self.null_map.to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn deserialize(bytes: &[u8], schema: &Schema) -> Result<Self> {
        if bytes.len() < 10 + schema.record_size() as usize {
            return Err(StorageError::corruption("physical record shorter than physRecordSize"));
        }
        let page = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let slot = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let null_map = u16::from_le_bytes(bytes[8..10].try_into().unwrap());
        let data = bytes[10..10 + schema.record_size() as usize].to_vec();

        Ok(Self {
            id: Rid::new(PageId::new(page), slot),
            null_map,
            data,
        })
    }
}
