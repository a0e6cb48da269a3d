//! Path table
//!
//! # Layout
//! ```text
//! i32 count (number of strings)
//! i32 size  (bytes of string data that follow)
//! NUL-terminated strings: attributes, bones, materials, shapes, extras
//! ```
//!
//! Shape names can also appear in the material slots; they are recognized
//! by their `shp_` prefix.

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::Result;

/// Prefix every shape name carries
pub const SHAPE_PREFIX: &str = "shp_";

/// Zero bytes written after the last string
const TRAILING_PADDING: usize = 2;

/// Interned names of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTable {
    pub attributes: Vec<String>,
    pub bones: Vec<String>,
    pub materials: Vec<String>,
    pub shapes: Vec<String>,
    /// Trailing names of unknown purpose, carried verbatim
    pub extras: Vec<String>,
}

/// Serialized path table plus the offset of every name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathBlock {
    pub bytes: Vec<u8>,
    pub attribute_offsets: Vec<i32>,
    pub bone_offsets: Vec<i32>,
    pub material_offsets: Vec<i32>,
    pub shape_offsets: Vec<i32>,
}

/// Counts stored in the model header that drive path parsing
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCounts {
    pub attributes: usize,
    pub bones: usize,
    pub materials: usize,
    pub shapes: usize,
}

/// Read one name, stopping at a NUL or the end of the block
fn next_name(r: &mut BinaryReader) -> Result<String> {
    let mut bytes = Vec::new();
    while let Some(b) = r.peek_u8() {
        r.read_u8()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl PathTable {
    /// Parse the string data of a path table (without the count/size prefix)
    pub fn parse(strings: &[u8], counts: PathCounts) -> Result<Self> {
        let mut r = BinaryReader::new(strings);
        let mut table = Self::default();

        for _ in 0..counts.attributes {
            table.attributes.push(r.read_cstr()?);
        }
        for _ in 0..counts.bones {
            table.bones.push(r.read_cstr()?);
        }
        for _ in 0..counts.materials {
            let name = r.read_cstr()?;
            if name.starts_with(SHAPE_PREFIX) {
                table.shapes.push(name);
            } else {
                table.materials.push(name);
            }
        }
        for _ in 0..counts.shapes {
            table.shapes.push(r.read_cstr()?);
        }

        if r.remaining() > TRAILING_PADDING {
            while r.remaining() > 0 {
                let name = next_name(&mut r)?;
                if !name.is_empty() {
                    table.extras.push(name);
                }
            }
        }

        Ok(table)
    }

    /// Read a complete path table, prefix included
    pub fn read(r: &mut BinaryReader, counts: PathCounts) -> Result<Self> {
        let _count = r.read_i32()?;
        let size = r.read_i32()?.max(0) as usize;
        let strings = r.read_bytes(size, "path table")?;
        Self::parse(&strings, counts)
    }

    /// Serialize; offsets are relative to the first string
    pub fn build(&self) -> PathBlock {
        let mut strings = BinaryWriter::new();
        let mut count = 0i32;
        let mut put = |names: &[String], strings: &mut BinaryWriter| -> Vec<i32> {
            names
                .iter()
                .map(|name| {
                    let offset = strings.len() as i32;
                    strings.write_cstr(name);
                    count += 1;
                    offset
                })
                .collect()
        };

        let attribute_offsets = put(&self.attributes, &mut strings);
        let bone_offsets = put(&self.bones, &mut strings);
        let material_offsets = put(&self.materials, &mut strings);
        let shape_offsets = put(&self.shapes, &mut strings);
        put(&self.extras, &mut strings);
        strings.write_zeros(TRAILING_PADDING);

        let mut w = BinaryWriter::with_capacity(strings.len() + 8);
        w.write_i32(count);
        w.write_i32(strings.len() as i32);
        w.write_bytes(strings.as_slice());

        PathBlock {
            bytes: w.into_inner(),
            attribute_offsets,
            bone_offsets,
            material_offsets,
            shape_offsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathTable {
        PathTable {
            attributes: vec!["atr_top".into()],
            bones: vec!["j_kosi".into(), "j_sebo_a".into()],
            materials: vec!["/mt_c0101e0001_top_a.mtrl".into()],
            shapes: vec!["shp_wrs".into()],
            extras: vec!["extra_name".into()],
        }
    }

    #[test]
    fn test_build_offsets() {
        let block = sample().build();
        assert_eq!(block.attribute_offsets, vec![0]);
        assert_eq!(block.bone_offsets, vec![8, 15]);
        assert_eq!(&block.bytes[0..4], &6i32.to_le_bytes());
        let size = &block.bytes[4..8];
        assert_eq!(size, &((block.bytes.len() - 8) as i32).to_le_bytes());
        assert_eq!(&block.bytes[block.bytes.len() - 2..], &[0, 0]);
    }

    #[test]
    fn test_read_back() {
        let table = sample();
        let block = table.build();
        let counts = PathCounts {
            attributes: 1,
            bones: 2,
            materials: 1,
            shapes: 1,
        };
        let parsed = PathTable::read(&mut BinaryReader::new(&block.bytes), counts).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_shape_in_material_slot() {
        let mut w = BinaryWriter::new();
        w.write_cstr("/mt_a.mtrl");
        w.write_cstr("shp_null");
        w.write_zeros(2);
        let counts = PathCounts {
            materials: 2,
            ..Default::default()
        };
        let parsed = PathTable::parse(w.as_slice(), counts).unwrap();
        assert_eq!(parsed.materials, vec!["/mt_a.mtrl".to_string()]);
        assert_eq!(parsed.shapes, vec!["shp_null".to_string()]);
        assert!(parsed.extras.is_empty());
    }
}
