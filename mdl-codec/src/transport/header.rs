//! Container header
//!
//! # Layout
//! ```text
//! 0x00: header_size u32 (256, grown in 128-byte steps)
//! 0x04: content_type u32 (3 = model)
//! 0x08: uncompressed_size u32 (plain model file size)
//! 0x0C: max_buffer_blocks u32 (body size / 128 + 16)
//! 0x10: buffer_blocks u32 (body size / 128)
//! 0x14: version u16, version_flags u16
//! 0x18: uncompressed_sizes u32[11] (padded to 128)
//! 0x44: compressed_sizes u32[11]
//! 0x70: offsets u32[11] (relative to the end of the header)
//! 0x9C: chunk_starts u16[11]
//! 0xB2: chunk_counts u16[11]
//! 0xC8: mesh_count u16, material_count u16
//! 0xCC: lod_count u8, index_streaming u8, reserved u16
//! 0xD0: chunk_sizes u16[] (padded size of every chunk, body order)
//! var:  zero padding to header_size
//! ```

use crate::binary::{BinaryReader, BinaryWriter, align_up};
use crate::error::{MdlError, Result};

/// Number of region slots in the header tables
pub const REGION_COUNT: usize = 11;
/// Content type tag of a model container
pub const CONTENT_TYPE_MODEL: u32 = 3;
/// Smallest header the format uses
pub const MIN_HEADER_SIZE: usize = 256;
/// Flags half of the version field written alongside the version number
pub const VERSION_FLAGS: u16 = 0x0100;

const FIXED_SIZE: usize = 0xD0;

/// Header of a model container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub header_size: u32,
    pub content_type: u32,
    pub uncompressed_size: u32,
    pub max_buffer_blocks: u32,
    pub buffer_blocks: u32,
    pub version: u16,
    pub version_flags: u16,
    pub uncompressed_sizes: [u32; REGION_COUNT],
    pub compressed_sizes: [u32; REGION_COUNT],
    pub offsets: [u32; REGION_COUNT],
    pub chunk_starts: [u16; REGION_COUNT],
    pub chunk_counts: [u16; REGION_COUNT],
    pub mesh_count: u16,
    pub material_count: u16,
    pub lod_count: u8,
    pub index_streaming: u8,
    pub chunk_sizes: Vec<u16>,
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self {
            header_size: MIN_HEADER_SIZE as u32,
            content_type: CONTENT_TYPE_MODEL,
            uncompressed_size: 0,
            max_buffer_blocks: 0,
            buffer_blocks: 0,
            version: 0,
            version_flags: VERSION_FLAGS,
            uncompressed_sizes: [0; REGION_COUNT],
            compressed_sizes: [0; REGION_COUNT],
            offsets: [0; REGION_COUNT],
            chunk_starts: [0; REGION_COUNT],
            chunk_counts: [0; REGION_COUNT],
            mesh_count: 0,
            material_count: 0,
            lod_count: 1,
            index_streaming: 1,
            chunk_sizes: Vec::new(),
        }
    }
}

impl ContainerHeader {
    /// Header size needed to hold `chunk_count` chunk size entries
    pub fn size_for_chunks(chunk_count: usize) -> usize {
        align_up(FIXED_SIZE + 2 * chunk_count, 128).max(MIN_HEADER_SIZE)
    }

    /// Write header to bytes, padded to `header_size`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BinaryWriter::with_capacity(self.header_size as usize);
        w.write_u32(self.header_size);
        w.write_u32(self.content_type);
        w.write_u32(self.uncompressed_size);
        w.write_u32(self.max_buffer_blocks);
        w.write_u32(self.buffer_blocks);
        w.write_u16(self.version);
        w.write_u16(self.version_flags);
        for v in self.uncompressed_sizes {
            w.write_u32(v);
        }
        for v in self.compressed_sizes {
            w.write_u32(v);
        }
        for v in self.offsets {
            w.write_u32(v);
        }
        for v in self.chunk_starts {
            w.write_u16(v);
        }
        for v in self.chunk_counts {
            w.write_u16(v);
        }
        w.write_u16(self.mesh_count);
        w.write_u16(self.material_count);
        w.write_u8(self.lod_count);
        w.write_u8(self.index_streaming);
        w.write_u16(0);
        for &size in &self.chunk_sizes {
            w.write_u16(size);
        }
        let padding = (self.header_size as usize).saturating_sub(w.len());
        w.write_zeros(padding);
        w.into_inner()
    }

    /// Read header from the start of a container
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_SIZE {
            return Err(MdlError::Truncated {
                what: "container header",
                offset: 0,
                needed: FIXED_SIZE,
                available: bytes.len(),
            });
        }

        let mut r = BinaryReader::new(bytes);
        let mut header = Self {
            header_size: r.read_u32()?,
            content_type: r.read_u32()?,
            uncompressed_size: r.read_u32()?,
            max_buffer_blocks: r.read_u32()?,
            buffer_blocks: r.read_u32()?,
            version: r.read_u16()?,
            version_flags: r.read_u16()?,
            ..Default::default()
        };

        if header.content_type != CONTENT_TYPE_MODEL {
            return Err(MdlError::NotModelContainer(header.content_type));
        }

        for v in header.uncompressed_sizes.iter_mut() {
            *v = r.read_u32()?;
        }
        for v in header.compressed_sizes.iter_mut() {
            *v = r.read_u32()?;
        }
        for v in header.offsets.iter_mut() {
            *v = r.read_u32()?;
        }
        for v in header.chunk_starts.iter_mut() {
            *v = r.read_u16()?;
        }
        for v in header.chunk_counts.iter_mut() {
            *v = r.read_u16()?;
        }
        header.mesh_count = r.read_u16()?;
        header.material_count = r.read_u16()?;
        header.lod_count = r.read_u8()?;
        header.index_streaming = r.read_u8()?;
        let _reserved = r.read_u16()?;

        // Edge slots mirror the index slots' chunk starts and carry no chunks
        let chunk_total = header
            .chunk_starts
            .iter()
            .zip(header.chunk_counts.iter())
            .filter(|&(_, &count)| count > 0)
            .map(|(&start, &count)| start as usize + count as usize)
            .max()
            .unwrap_or(0);

        let table_end = FIXED_SIZE + 2 * chunk_total;
        if table_end > header.header_size as usize || table_end > bytes.len() {
            return Err(MdlError::Corrupt(format!(
                "chunk size table ({} entries) does not fit in a {}-byte header",
                chunk_total, header.header_size
            )));
        }
        header.chunk_sizes = (0..chunk_total)
            .map(|_| r.read_u16())
            .collect::<Result<_>>()?;

        Ok(header)
    }
}
