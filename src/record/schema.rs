//! Table schema: attribute names/types/widths and the derived byte offsets
//! used by record (de)serialization (`spec.md` §4.3/§4.3.1).

use crate::error::{Result, StorageError};
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    attr_names: Vec<String>,
    data_types: Vec<DataType>,
    type_lengths: Vec<u32>,
    key_attrs: Vec<usize>,
    attr_offsets: Vec<u32>,
}

impl Schema {
    /// Builds a schema, validating shapes and deriving `attr_offsets`.
    ///
    /// `type_lengths` is meaningful only for `DataType::String` attributes;
    /// it's ignored (but still required, for positional alignment with
    /// `data_types`) for fixed-width types.
    pub fn new(
        attr_names: Vec<String>,
        data_types: Vec<DataType>,
        type_lengths: Vec<u32>,
        key_attrs: Vec<usize>,
    ) -> Result<Self> {
        if attr_names.is_empty() {
            return Err(StorageError::invalid_schema("schema must have at least one attribute"));
        }
        if attr_names.len() != data_types.len() || attr_names.len() != type_lengths.len() {
            return Err(StorageError::invalid_schema(
                "attr_names, data_types and type_lengths must have equal length",
            ));
        }
        if key_attrs.len() > 1 {
            return Err(StorageError::invalid_schema(
                "composite primary keys are not supported",
            ));
        }
        for &k in &key_attrs {
            if k >= attr_names.len() {
                return Err(StorageError::invalid_schema("key_attrs index out of range"));
            }
        }
        for (dt, len) in data_types.iter().zip(type_lengths.iter()) {
            if matches!(dt, DataType::String) && *len == 0 {
                return Err(StorageError::invalid_schema("STRING attribute needs a positive typeLength"));
            }
        }

        let mut attr_offsets = Vec::with_capacity(attr_names.len());
        let mut offset = 0u32;
        for (dt, len) in data_types.iter().zip(type_lengths.iter()) {
            attr_offsets.push(offset);
            offset += dt.fixed_width().map(|w| w as u32).unwrap_or(*len);
        }

        Ok(Self {
            attr_names,
            data_types,
            type_lengths,
            key_attrs,
            attr_offsets,
        })
    }

    pub fn num_attrs(&self) -> usize {
        self.attr_names.len()
    }

    pub fn attr_name(&self, idx: usize) -> Option<&str> {
        self.attr_names.get(idx).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attr_names.iter().position(|n| n == name)
    }

    pub fn data_type(&self, idx: usize) -> Option<DataType> {
        self.data_types.get(idx).copied()
    }

    pub fn width_of(&self, idx: usize) -> u32 {
        self.data_types[idx]
            .fixed_width()
            .map(|w| w as u32)
            .unwrap_or(self.type_lengths[idx])
    }

    pub fn attr_offset(&self, idx: usize) -> u32 {
        self.attr_offsets[idx]
    }

    /// Total packed width of one record's attribute bytes, excluding the
    /// `{page, slot, nullMap}` envelope.
    pub fn record_size(&self) -> u32 {
        (0..self.num_attrs()).map(|i| self.width_of(i)).sum()
    }

    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    /// Single-column primary key index, if this schema declares one.
    pub fn pk_attr(&self) -> Option<usize> {
        self.key_attrs.first().copied()
    }

    pub fn has_pk(&self) -> bool {
        !self.key_attrs.is_empty()
    }

    /// Structural equality used by `open_table` to validate an on-disk
    /// schema blob matches the shape it was created with.
    pub fn matches(&self, other: &Schema) -> bool {
        self == other
    }

    /// Serializes the schema to the binary layout `spec.md` §4.3.1
    /// describes for the table header's schema blob:
    /// `int numAttr; for each attr {int dataType; int typeLength; uint nameLen; bytes name}; int keySize; int keyAttrs[keySize]`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.num_attrs() as u32).to_le_bytes());
        for i in 0..self.num_attrs() {
            buf.extend_from_slice(&(self.data_types[i] as u32).to_le_bytes());
            buf.extend_from_slice(&self.type_lengths[i].to_le_bytes());
            let name_bytes = self.attr_names[i].as_bytes();
            buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(name_bytes);
        }
        buf.extend_from_slice(&(self.key_attrs.len() as u32).to_le_bytes());
        for &k in &self.key_attrs {
            buf.extend_from_slice(&(k as u32).to_le_bytes());
        }
        buf
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = 0usize;
        let mut read_u32 = |b: &[u8], c: &mut usize| -> Result<u32> {
            let v = b
                .get(*c..*c + 4)
                .ok_or_else(|| StorageError::corruption("schema blob truncated"))?;
            *c += 4;
            Ok(u32::from_le_bytes(v.try_into().unwrap()))
        };

        let num_attr = read_u32(bytes, &mut cursor)? as usize;
        let mut attr_names = Vec::with_capacity(num_attr);
        let mut data_types = Vec::with_capacity(num_attr);
        let mut type_lengths = Vec::with_capacity(num_attr);

        for _ in 0..num_attr {
            let dt_raw = read_u32(bytes, &mut cursor)?;
            let dt = DataType::from_u32(dt_raw)
                .ok_or_else(|| StorageError::corruption("schema blob has invalid data type"))?;
            let type_len = read_u32(bytes, &mut cursor)?;
            let name_len = read_u32(bytes, &mut cursor)? as usize;
            let name_bytes = bytes
                .get(cursor..cursor + name_len)
                .ok_or_else(|| StorageError::corruption("schema blob truncated in attr name"))?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| StorageError::corruption("schema attribute name is not valid UTF-8"))?;
            cursor += name_len;

            attr_names.push(name);
            data_types.push(dt);
            type_lengths.push(type_len);
        }

        let key_size = read_u32(bytes, &mut cursor)? as usize;
        let mut key_attrs = Vec::with_capacity(key_size);
        for _ in 0..key_size {
            key_attrs.push(read_u32(bytes, &mut cursor)? as usize);
        }

        Schema::new(attr_names, data_types, type_lengths, key_attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![DataType::Int, DataType::String, DataType::Int],
            vec![0, 4, 0],
            vec![0],
        )
        .unwrap()
    }

    #[test]
    fn test_offsets_and_record_size() {
        let schema = sample_schema();
        assert_eq!(schema.attr_offset(0), 0);
        assert_eq!(schema.attr_offset(1), 4);
        assert_eq!(schema.attr_offset(2), 8);
        assert_eq!(schema.record_size(), 12);
    }

    #[test]
    fn test_schema_roundtrip() {
        let schema = sample_schema();
        let bytes = schema.serialize();
        let back = Schema::deserialize(&bytes).unwrap();
        assert!(schema.matches(&back));
    }

    #[test]
    fn test_rejects_composite_pk() {
        let err = Schema::new(
            vec!["a".into(), "b".into()],
            vec![DataType::Int, DataType::Int],
            vec![0, 0],
            vec![0, 1],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidSchema(_)));
    }
}
