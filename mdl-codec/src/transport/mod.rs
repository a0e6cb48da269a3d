//! Chunked-compression transport
//!
//! A model container stores eight logical regions (vertex declarations,
//! model data, and a vertex and index buffer per level of detail), each
//! split into independently deflated chunks. Decoding reassembles the plain
//! model file the structural decoder works on; encoding re-chunks regions
//! produced by the structural encoder and writes a fresh header in one
//! forward pass.

mod chunk;
mod file;
mod header;

pub use chunk::{
    CHUNK_ALIGN, CHUNK_HEADER_SIZE, ChunkHeader, MAX_CHUNK_SIZE, STORED_MARKER, compress_chunk,
    compress_region, decompress_chunk,
};
pub use file::ModelFileHeader;
pub use header::{CONTENT_TYPE_MODEL, ContainerHeader, REGION_COUNT, VERSION_FLAGS};

use crate::binary::{BinaryWriter, align_up};
use crate::error::{MdlError, Result};

/// Number of level-of-detail tiers the format always reserves
pub const LOD_COUNT: usize = 3;

/// One logical region of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    VertexInfo,
    ModelData,
    Vertex(usize),
    Edge(usize),
    Index(usize),
}

impl Region {
    /// Regions in the order their chunks appear in the body
    pub const BODY_ORDER: [Region; 8] = [
        Region::VertexInfo,
        Region::ModelData,
        Region::Vertex(0),
        Region::Index(0),
        Region::Vertex(1),
        Region::Index(1),
        Region::Vertex(2),
        Region::Index(2),
    ];

    /// Index of this region in the header's parallel tables
    pub const fn slot(self) -> usize {
        match self {
            Region::VertexInfo => 0,
            Region::ModelData => 1,
            Region::Vertex(lod) => 2 + lod,
            Region::Edge(lod) => 5 + lod,
            Region::Index(lod) => 8 + lod,
        }
    }
}

/// Decompressed regions of one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Regions {
    pub version: u16,
    pub mesh_count: u16,
    pub material_count: u16,
    pub lod_count: u8,
    pub index_streaming: u8,
    pub vertex_info: Vec<u8>,
    pub model_data: Vec<u8>,
    pub vertex_buffers: [Vec<u8>; LOD_COUNT],
    pub index_buffers: [Vec<u8>; LOD_COUNT],
}

impl Regions {
    pub fn region(&self, region: Region) -> &[u8] {
        match region {
            Region::VertexInfo => &self.vertex_info,
            Region::ModelData => &self.model_data,
            Region::Vertex(lod) => &self.vertex_buffers[lod],
            Region::Edge(_) => &[],
            Region::Index(lod) => &self.index_buffers[lod],
        }
    }

    fn region_mut(&mut self, region: Region) -> Option<&mut Vec<u8>> {
        match region {
            Region::VertexInfo => Some(&mut self.vertex_info),
            Region::ModelData => Some(&mut self.model_data),
            Region::Vertex(lod) => Some(&mut self.vertex_buffers[lod]),
            Region::Edge(_) => None,
            Region::Index(lod) => Some(&mut self.index_buffers[lod]),
        }
    }

    /// Size of the plain model file these regions assemble into
    pub fn assembled_len(&self) -> usize {
        ModelFileHeader::SIZE
            + Region::BODY_ORDER
                .iter()
                .map(|&r| self.region(r).len())
                .sum::<usize>()
    }

    /// Build the plain model file: file header, then every region in body order
    pub fn assemble(&self) -> Vec<u8> {
        let mut header = ModelFileHeader {
            version: self.version as u32 | ((VERSION_FLAGS as u32) << 16),
            vertex_info_size: self.vertex_info.len() as u32,
            model_data_size: self.model_data.len() as u32,
            mesh_count: self.mesh_count,
            material_count: self.material_count,
            lod_count: self.lod_count,
            index_streaming: self.index_streaming,
            ..Default::default()
        };

        let mut cursor = ModelFileHeader::SIZE + self.vertex_info.len() + self.model_data.len();
        for lod in 0..LOD_COUNT {
            header.vertex_offsets[lod] = cursor as u32;
            header.vertex_sizes[lod] = self.vertex_buffers[lod].len() as u32;
            cursor += self.vertex_buffers[lod].len();
            header.index_offsets[lod] = cursor as u32;
            header.index_sizes[lod] = self.index_buffers[lod].len() as u32;
            cursor += self.index_buffers[lod].len();
        }

        let mut w = BinaryWriter::with_capacity(cursor);
        w.write_bytes(&header.to_bytes());
        for region in Region::BODY_ORDER {
            w.write_bytes(self.region(region));
        }
        w.into_inner()
    }

    /// Split a plain model file back into regions
    pub fn split(file: &[u8]) -> Result<Self> {
        let header = ModelFileHeader::from_bytes(file)?;
        let slice = |offset: usize, len: usize, what: &'static str| -> Result<Vec<u8>> {
            file.get(offset..offset + len)
                .map(<[u8]>::to_vec)
                .ok_or(MdlError::Truncated {
                    what,
                    offset,
                    needed: len,
                    available: file.len().saturating_sub(offset),
                })
        };

        let vertex_info_start = ModelFileHeader::SIZE;
        let model_data_start = vertex_info_start + header.vertex_info_size as usize;
        let mut regions = Self {
            version: (header.version & 0xFFFF) as u16,
            mesh_count: header.mesh_count,
            material_count: header.material_count,
            lod_count: header.lod_count,
            index_streaming: header.index_streaming,
            vertex_info: slice(
                vertex_info_start,
                header.vertex_info_size as usize,
                "vertex info region",
            )?,
            model_data: slice(
                model_data_start,
                header.model_data_size as usize,
                "model data region",
            )?,
            ..Default::default()
        };
        for lod in 0..LOD_COUNT {
            regions.vertex_buffers[lod] = slice(
                header.vertex_offsets[lod] as usize,
                header.vertex_sizes[lod] as usize,
                "vertex buffer",
            )?;
            regions.index_buffers[lod] = slice(
                header.index_offsets[lod] as usize,
                header.index_sizes[lod] as usize,
                "index buffer",
            )?;
        }
        Ok(regions)
    }
}

/// Decompress every region of a container
pub fn decode(container: &[u8]) -> Result<Regions> {
    let header = ContainerHeader::from_bytes(container)?;
    let body_start = header.header_size as usize;

    let mut regions = Regions {
        version: header.version,
        mesh_count: header.mesh_count,
        material_count: header.material_count,
        lod_count: header.lod_count,
        index_streaming: header.index_streaming,
        ..Default::default()
    };

    for region in Region::BODY_ORDER {
        let slot = region.slot();
        let start = header.chunk_starts[slot] as usize;
        let count = header.chunk_counts[slot] as usize;
        let mut position = body_start + header.offsets[slot] as usize;
        // Sizes in the header are untrusted; the chunks themselves are bounded
        let mut data = Vec::new();

        for index in start..start + count {
            let (payload, framed) = decompress_chunk(container, position)?;
            data.extend_from_slice(&payload);
            let recorded = header.chunk_sizes.get(index).copied().unwrap_or(0) as usize;
            position += if recorded > 0 { recorded } else { framed };
        }

        tracing::debug!(
            "region {:?}: {} chunks, {} bytes",
            region,
            count,
            data.len()
        );
        if let Some(target) = regions.region_mut(region) {
            *target = data;
        }
    }

    Ok(regions)
}

/// Decompress a container, treating any failure as "no data"
pub fn try_decode(container: &[u8]) -> Option<Regions> {
    if container.is_empty() {
        return None;
    }
    match decode(container) {
        Ok(regions) => Some(regions),
        Err(e) => {
            tracing::warn!("treating unreadable container as empty: {}", e);
            None
        }
    }
}

/// Compress regions into a framed container
pub fn encode(regions: &Regions, level: u32) -> Result<Vec<u8>> {
    let mut header = ContainerHeader {
        version: regions.version,
        uncompressed_size: regions.assembled_len() as u32,
        mesh_count: regions.mesh_count,
        material_count: regions.material_count,
        lod_count: regions.lod_count,
        index_streaming: regions.index_streaming,
        ..Default::default()
    };

    let mut body = BinaryWriter::new();
    for region in Region::BODY_ORDER {
        let slot = region.slot();
        let data = regions.region(region);
        let chunks = compress_region(data, level)?;

        header.offsets[slot] = body.len() as u32;
        header.chunk_starts[slot] = header.chunk_sizes.len() as u16;
        header.chunk_counts[slot] = chunks.len() as u16;
        header.uncompressed_sizes[slot] = align_up(data.len(), 128) as u32;

        let before = body.len();
        for chunk in &chunks {
            header.chunk_sizes.push(chunk.len() as u16);
            body.write_bytes(chunk);
        }
        header.compressed_sizes[slot] = (body.len() - before) as u32;
    }

    for lod in 0..LOD_COUNT {
        let index_start = header.chunk_starts[Region::Index(lod).slot()];
        header.chunk_starts[Region::Edge(lod).slot()] = index_start;
    }

    let body = body.into_inner();
    header.header_size = ContainerHeader::size_for_chunks(header.chunk_sizes.len()) as u32;
    header.buffer_blocks = (body.len() / 128) as u32;
    header.max_buffer_blocks = header.buffer_blocks + 16;

    tracing::debug!(
        "encoded container: {} chunks, header {} bytes, body {} bytes",
        header.chunk_sizes.len(),
        header.header_size,
        body.len()
    );

    let mut out = header.to_bytes();
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_regions() -> Regions {
        Regions {
            version: 6,
            mesh_count: 1,
            material_count: 1,
            lod_count: 1,
            index_streaming: 1,
            vertex_info: vec![0xAA; 136],
            model_data: (0..40_000u32).map(|i| (i % 251) as u8).collect(),
            vertex_buffers: [vec![3; 500], Vec::new(), Vec::new()],
            index_buffers: [vec![4; 64], Vec::new(), Vec::new()],
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let regions = sample_regions();
        let bytes = encode(&regions, 6).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, regions);
    }

    #[test]
    fn test_offsets_monotonic_and_sizes_padded() {
        let regions = sample_regions();
        let bytes = encode(&regions, 6).unwrap();
        let header = ContainerHeader::from_bytes(&bytes).unwrap();

        let mut last = 0;
        for region in Region::BODY_ORDER {
            let slot = region.slot();
            assert!(header.offsets[slot] >= last);
            last = header.offsets[slot];
            assert_eq!(header.uncompressed_sizes[slot] % 128, 0);
            assert_eq!(header.compressed_sizes[slot] % 128, 0);
        }

        // 1 + 3 + 1 + 1 chunks for the non-empty regions
        assert_eq!(header.chunk_sizes.len(), 6);
        assert_eq!(header.chunk_counts[Region::ModelData.slot()], 3);
        assert_eq!(header.chunk_starts[Region::Vertex(0).slot()], 4);
        assert_eq!(header.chunk_starts[Region::Index(0).slot()], 5);
        assert_eq!(
            header.chunk_starts[Region::Edge(0).slot()],
            header.chunk_starts[Region::Index(0).slot()]
        );
        assert_eq!(header.uncompressed_size as usize, regions.assembled_len());
    }

    #[test]
    fn test_assemble_split_roundtrip() {
        let regions = sample_regions();
        let file = regions.assemble();
        assert_eq!(file.len(), regions.assembled_len());
        assert_eq!(&file[0..2], &6u16.to_le_bytes());

        let split = Regions::split(&file).unwrap();
        assert_eq!(split, regions);
    }

    #[test]
    fn test_try_decode_garbage_is_none() {
        assert!(try_decode(&[]).is_none());
        assert!(try_decode(&[1, 2, 3]).is_none());

        let mut bytes = encode(&sample_regions(), 6).unwrap();
        let header_size = ContainerHeader::from_bytes(&bytes).unwrap().header_size as usize;
        bytes.truncate(header_size + 8);
        assert!(try_decode(&bytes).is_none());
    }
}
