//! Growable binary writer

use byteorder::{ByteOrder, LittleEndian};

/// Writer that appends little-endian fields to an owned buffer
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    /// Write a string followed by a null terminator
    pub fn write_cstr(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    /// Zero-pad until the length is a multiple of `align`
    pub fn pad_to(&mut self, align: usize) {
        let padded = super::align_up(self.buf.len(), align);
        self.buf.resize(padded, 0);
    }

    /// Overwrite a u16 previously written at `pos`
    pub fn patch_u16(&mut self, pos: usize, value: u16) {
        LittleEndian::write_u16(&mut self.buf[pos..pos + 2], value);
    }

    /// Overwrite an i32 previously written at `pos`
    pub fn patch_i32(&mut self, pos: usize, value: i32) {
        LittleEndian::write_i32(&mut self.buf[pos..pos + 4], value);
    }
}
