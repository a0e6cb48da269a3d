//! Plain model file header (68 bytes)
//!
//! # Layout
//! ```text
//! 0x00: version u32 (low half = format version)
//! 0x04: vertex_info_size u32
//! 0x08: model_data_size u32
//! 0x0C: mesh_count u16
//! 0x0E: material_count u16
//! 0x10: vertex_offsets u32[3]
//! 0x1C: index_offsets u32[3]
//! 0x28: vertex_sizes u32[3]
//! 0x34: index_sizes u32[3]
//! 0x40: lod_count u8
//! 0x41: index_streaming u8
//! 0x42: edge_geometry u8
//! 0x43: padding u8
//! ```

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{MdlError, Result};

use super::LOD_COUNT;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFileHeader {
    pub version: u32,
    pub vertex_info_size: u32,
    pub model_data_size: u32,
    pub mesh_count: u16,
    pub material_count: u16,
    pub vertex_offsets: [u32; LOD_COUNT],
    pub index_offsets: [u32; LOD_COUNT],
    pub vertex_sizes: [u32; LOD_COUNT],
    pub index_sizes: [u32; LOD_COUNT],
    pub lod_count: u8,
    pub index_streaming: u8,
    pub edge_geometry: u8,
}

impl ModelFileHeader {
    pub const SIZE: usize = 68;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut w = BinaryWriter::with_capacity(Self::SIZE);
        w.write_u32(self.version);
        w.write_u32(self.vertex_info_size);
        w.write_u32(self.model_data_size);
        w.write_u16(self.mesh_count);
        w.write_u16(self.material_count);
        for table in [
            &self.vertex_offsets,
            &self.index_offsets,
            &self.vertex_sizes,
            &self.index_sizes,
        ] {
            for &v in table {
                w.write_u32(v);
            }
        }
        w.write_u8(self.lod_count);
        w.write_u8(self.index_streaming);
        w.write_u8(self.edge_geometry);
        w.write_u8(0);

        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(w.as_slice());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(MdlError::Truncated {
                what: "model file header",
                offset: 0,
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }
        let mut r = BinaryReader::new(bytes);
        let mut header = Self {
            version: r.read_u32()?,
            vertex_info_size: r.read_u32()?,
            model_data_size: r.read_u32()?,
            mesh_count: r.read_u16()?,
            material_count: r.read_u16()?,
            ..Default::default()
        };
        for table in [
            &mut header.vertex_offsets,
            &mut header.index_offsets,
            &mut header.vertex_sizes,
            &mut header.index_sizes,
        ] {
            for v in table.iter_mut() {
                *v = r.read_u32()?;
            }
        }
        header.lod_count = r.read_u8()?;
        header.index_streaming = r.read_u8()?;
        header.edge_geometry = r.read_u8()?;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_header_roundtrip() {
        let header = ModelFileHeader {
            version: 0x0100_0005,
            vertex_info_size: 272,
            model_data_size: 1000,
            mesh_count: 2,
            material_count: 1,
            vertex_offsets: [1340, 2000, 2000],
            index_offsets: [1800, 2000, 2000],
            vertex_sizes: [460, 0, 0],
            index_sizes: [200, 0, 0],
            lod_count: 1,
            index_streaming: 1,
            edge_geometry: 0,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 68);
        assert_eq!(&bytes[0x40..0x42], &[1, 1]);
        assert_eq!(ModelFileHeader::from_bytes(&bytes).unwrap(), header);
    }
}
