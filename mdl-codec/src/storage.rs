//! Storage seam
//!
//! The codec never allocates offsets itself. A [`ModelStorage`] hands out the
//! compressed bytes stored for a path at an offset and persists new bytes,
//! returning where they landed. Missing or unreadable data is "no data", not
//! an error.

use std::io;

use hashbrown::HashMap;

use crate::binary::align_up;
use crate::codec::{self, DecodedModel};
use crate::config::{CodecConfig, DecodeOptions};
use crate::error::Result;
use crate::materials::referenced_material_names;
use crate::model::Model;
use crate::structure::StructuralRecord;

/// Offsets handed out by [`MemoryStorage`] are multiples of this
const OFFSET_ALIGN: usize = 128;

/// Backing store for compressed model containers
pub trait ModelStorage {
    /// Bytes stored for `path` at `offset`, if any
    fn read(&self, path: &str, offset: u64) -> Option<Vec<u8>>;

    /// Persist `bytes` for `path`; returns the new offset
    fn write(&mut self, path: &str, bytes: &[u8]) -> io::Result<u64>;
}

/// Append-only in-memory store. Offset 0 is never handed out.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: HashMap<(String, u64), Vec<u8>>,
    latest: HashMap<String, u64>,
    end: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent offset written for `path`
    pub fn latest(&self, path: &str) -> Option<u64> {
        self.latest.get(path).copied()
    }
}

impl ModelStorage for MemoryStorage {
    fn read(&self, path: &str, offset: u64) -> Option<Vec<u8>> {
        if offset == 0 {
            return None;
        }
        self.blobs.get(&(path.to_string(), offset)).cloned()
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> io::Result<u64> {
        let offset = self.end + OFFSET_ALIGN as u64;
        self.end = offset + align_up(bytes.len(), OFFSET_ALIGN) as u64;
        self.blobs.insert((path.to_string(), offset), bytes.to_vec());
        self.latest.insert(path.to_string(), offset);
        Ok(offset)
    }
}

/// Decode the model stored at `offset`; `None` when absent or corrupt
pub fn load_model(
    storage: &dyn ModelStorage,
    path: &str,
    offset: u64,
    options: &DecodeOptions,
) -> Option<DecodedModel> {
    let bytes = storage.read(path, offset)?;
    match codec::decode(&bytes, options) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(path, offset, %err, "model could not be decoded; treating as absent");
            None
        }
    }
}

/// Material names referenced by the model at `offset`; empty when absent
pub fn referenced_materials(storage: &dyn ModelStorage, path: &str, offset: u64) -> Vec<String> {
    match storage.read(path, offset) {
        Some(bytes) => referenced_material_names(&bytes),
        None => {
            tracing::debug!(path, offset, "no data for model");
            Vec::new()
        }
    }
}

/// Encode and persist; returns the offset the storage assigned
pub fn save_model(
    storage: &mut dyn ModelStorage,
    path: &str,
    model: &Model,
    donor: &StructuralRecord,
    config: &CodecConfig,
) -> Result<u64> {
    let bytes = codec::encode(model, donor, config)?;
    let offset = storage.write(path, &bytes)?;
    tracing::debug!(path, offset, bytes = bytes.len(), "saved model");
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_offsets() {
        let mut storage = MemoryStorage::new();
        let a = storage.write("a.mdl", &[1; 10]).unwrap();
        let b = storage.write("a.mdl", &[2; 200]).unwrap();
        let c = storage.write("b.mdl", &[3; 1]).unwrap();
        assert_eq!(a, 128);
        assert_eq!(b, 384);
        assert_eq!(c, 384 + 256 + 128);
        assert_eq!(storage.latest("a.mdl"), Some(b));
        assert_eq!(storage.read("a.mdl", a), Some(vec![1; 10]));
        assert_eq!(storage.read("b.mdl", a), None);
        assert_eq!(storage.read("a.mdl", 0), None);
    }

    #[test]
    fn test_missing_model_is_no_data() {
        let storage = MemoryStorage::new();
        assert!(load_model(&storage, "x.mdl", 128, &DecodeOptions::default()).is_none());
        assert!(referenced_materials(&storage, "x.mdl", 0).is_empty());
    }

    #[test]
    fn test_corrupt_model_is_no_data() {
        let mut storage = MemoryStorage::new();
        let offset = storage.write("x.mdl", &[0xAB; 300]).unwrap();
        assert!(load_model(&storage, "x.mdl", offset, &DecodeOptions::default()).is_none());
        assert!(referenced_materials(&storage, "x.mdl", offset).is_empty());
    }
}
