//! Compressed chunk framing
//!
//! # Layout
//! ```text
//! 0x00: header_size u32 (always 16)
//! 0x04: reserved u32
//! 0x08: compressed_size u32 (32000 = payload stored uncompressed)
//! 0x0C: uncompressed_size u32 (<= 16000)
//! 0x10: payload (raw deflate or stored bytes)
//! var:  zero padding to the next 128-byte boundary
//! ```

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

use crate::binary::{BinaryReader, BinaryWriter, align_up};
use crate::error::{MdlError, Result};

/// Largest uncompressed payload carried by one chunk
pub const MAX_CHUNK_SIZE: usize = 16_000;
/// Size of the per-chunk header
pub const CHUNK_HEADER_SIZE: usize = 16;
/// Chunks (header + payload) are padded to this boundary
pub const CHUNK_ALIGN: usize = 128;
/// `compressed_size` value flagging a stored payload
pub const STORED_MARKER: u32 = 32_000;

/// Per-chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub header_size: u32,
    pub reserved: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = CHUNK_HEADER_SIZE;

    pub fn new(compressed_size: u32, uncompressed_size: u32) -> Self {
        Self {
            header_size: CHUNK_HEADER_SIZE as u32,
            reserved: 0,
            compressed_size,
            uncompressed_size,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.compressed_size == STORED_MARKER
    }

    /// Bytes of payload following the header
    pub fn payload_size(&self) -> usize {
        if self.is_stored() {
            self.uncompressed_size as usize
        } else {
            self.compressed_size as usize
        }
    }

    /// Total framed size including padding
    pub fn padded_size(&self) -> usize {
        align_up(CHUNK_HEADER_SIZE + self.payload_size(), CHUNK_ALIGN)
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.header_size);
        writer.write_u32(self.reserved);
        writer.write_u32(self.compressed_size);
        writer.write_u32(self.uncompressed_size);
    }

    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            header_size: reader.read_u32()?,
            reserved: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
            uncompressed_size: reader.read_u32()?,
        })
    }
}

/// Compress one payload (at most [`MAX_CHUNK_SIZE`] bytes) into a framed, padded chunk.
///
/// Falls back to a stored payload when deflate does not shrink the data.
pub fn compress_chunk(data: &[u8], level: u32) -> Result<Vec<u8>> {
    debug_assert!(data.len() <= MAX_CHUNK_SIZE);

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    let (header, payload) = if compressed.len() < data.len() {
        (
            ChunkHeader::new(compressed.len() as u32, data.len() as u32),
            compressed.as_slice(),
        )
    } else {
        (ChunkHeader::new(STORED_MARKER, data.len() as u32), data)
    };

    let mut writer = BinaryWriter::with_capacity(header.padded_size());
    header.write(&mut writer);
    writer.write_bytes(payload);
    writer.pad_to(CHUNK_ALIGN);
    Ok(writer.into_inner())
}

/// Split a region into [`MAX_CHUNK_SIZE`] pieces and compress each one.
///
/// An empty region yields no chunks.
pub fn compress_region(data: &[u8], level: u32) -> Result<Vec<Vec<u8>>> {
    data.chunks(MAX_CHUNK_SIZE)
        .map(|piece| compress_chunk(piece, level))
        .collect()
}

/// Decode the chunk starting at `offset` in `container`.
///
/// Returns the payload and the chunk's framed size.
pub fn decompress_chunk(container: &[u8], offset: usize) -> Result<(Vec<u8>, usize)> {
    let mut reader = BinaryReader::at(container, offset);
    let header = ChunkHeader::read(&mut reader).map_err(|_| MdlError::CorruptChunk {
        offset,
        reason: "chunk header past end of container".into(),
    })?;

    if header.header_size as usize != CHUNK_HEADER_SIZE {
        return Err(MdlError::CorruptChunk {
            offset,
            reason: format!("unexpected chunk header size {}", header.header_size),
        });
    }
    if header.uncompressed_size == 0 || header.uncompressed_size as usize > MAX_CHUNK_SIZE {
        return Err(MdlError::CorruptChunk {
            offset,
            reason: format!("uncompressed size {} out of range", header.uncompressed_size),
        });
    }

    let payload = reader.read_bytes(header.payload_size(), "chunk payload")?;
    let expected = header.uncompressed_size as usize;

    let data = if header.is_stored() {
        payload
    } else {
        // One byte past `expected` is enough to report an oversized chunk
        let mut decoder = DeflateDecoder::new(payload.as_slice()).take(expected as u64 + 1);
        let mut raw = Vec::with_capacity(expected);
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| MdlError::CorruptChunk {
                offset,
                reason: e.to_string(),
            })?;
        raw
    };

    if data.len() != expected {
        return Err(MdlError::CorruptChunk {
            offset,
            reason: format!("expected {} bytes, inflated {}", expected, data.len()),
        });
    }

    Ok((data, header.padded_size()))
}
