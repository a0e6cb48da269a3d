//! Slice-backed binary reader

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{MdlError, Result};

/// Reader for little-endian model structures
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        let mut reader = Self::new(data);
        reader.seek(offset);
        reader
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn seek(&mut self, offset: usize) {
        self.cursor.set_position(offset as u64);
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.cursor.get_ref().get(self.position()).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    /// Read `len` raw bytes, naming the block in the error on truncation
    pub fn read_bytes(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>> {
        let offset = self.position();
        if self.remaining() < len {
            return Err(MdlError::Truncated {
                what,
                offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = self.cursor.get_ref()[offset..offset + len].to_vec();
        self.seek(offset + len);
        Ok(bytes)
    }

    /// Read a null-terminated ASCII string
    pub fn read_cstr(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read `count` little-endian i32 values
    pub fn read_i32_vec(&mut self, count: usize) -> Result<Vec<i32>> {
        (0..count).map(|_| self.read_i32()).collect()
    }

    /// Read `count` little-endian i16 values
    pub fn read_i16_vec(&mut self, count: usize) -> Result<Vec<i16>> {
        (0..count).map(|_| self.read_i16()).collect()
    }
}
