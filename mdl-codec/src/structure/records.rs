//! Fixed-size records of the model data region

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::Result;
use crate::transport::LOD_COUNT;

// ============================================================================
// Model header
// ============================================================================

/// Counts and opaque scalars following the path table.
///
/// Fields named `unknown*` have no established meaning and are carried from
/// the donor record when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHeader {
    pub unknown0: i32,
    pub mesh_count: i16,
    pub attribute_count: i16,
    pub mesh_part_count: i16,
    pub material_count: i16,
    pub bone_count: i16,
    pub bone_list_count: i16,
    pub shape_count: i16,
    pub shape_part_count: i16,
    pub shape_data_count: u16,
    pub lod_count: u8,
    pub unknown1: u8,
    /// Size of opaque block 0, in 32-byte units
    pub unknown2: i16,
    pub unknown3: i16,
    pub unknown4: i16,
    pub unknown5: i16,
    pub unknown6: i16,
    pub unknown7: i16,
    /// Bone transform count used when `bone_count` is zero
    pub unknown8: i16,
    /// Size of opaque block 2, in 12-byte units
    pub unknown9: i16,
    /// Number of extra LoD entries
    pub unknown10a: u8,
    pub unknown10b: u8,
    pub unknown11: i16,
    /// Bone set block size in 16-bit words
    pub unknown12: i16,
    pub unknown13: i16,
    pub unknown14: i16,
    pub unknown15: i16,
    pub unknown16: i16,
    pub unknown17: i16,
}

impl ModelHeader {
    pub const SIZE: usize = 56;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            unknown0: r.read_i32()?,
            mesh_count: r.read_i16()?,
            attribute_count: r.read_i16()?,
            mesh_part_count: r.read_i16()?,
            material_count: r.read_i16()?,
            bone_count: r.read_i16()?,
            bone_list_count: r.read_i16()?,
            shape_count: r.read_i16()?,
            shape_part_count: r.read_i16()?,
            shape_data_count: r.read_u16()?,
            lod_count: r.read_u8()?,
            unknown1: r.read_u8()?,
            unknown2: r.read_i16()?,
            unknown3: r.read_i16()?,
            unknown4: r.read_i16()?,
            unknown5: r.read_i16()?,
            unknown6: r.read_i16()?,
            unknown7: r.read_i16()?,
            unknown8: r.read_i16()?,
            unknown9: r.read_i16()?,
            unknown10a: r.read_u8()?,
            unknown10b: r.read_u8()?,
            unknown11: r.read_i16()?,
            unknown12: r.read_i16()?,
            unknown13: r.read_i16()?,
            unknown14: r.read_i16()?,
            unknown15: r.read_i16()?,
            unknown16: r.read_i16()?,
            unknown17: r.read_i16()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.unknown0);
        w.write_i16(self.mesh_count);
        w.write_i16(self.attribute_count);
        w.write_i16(self.mesh_part_count);
        w.write_i16(self.material_count);
        w.write_i16(self.bone_count);
        w.write_i16(self.bone_list_count);
        w.write_i16(self.shape_count);
        w.write_i16(self.shape_part_count);
        w.write_u16(self.shape_data_count);
        w.write_u8(self.lod_count);
        w.write_u8(self.unknown1);
        w.write_i16(self.unknown2);
        w.write_i16(self.unknown3);
        w.write_i16(self.unknown4);
        w.write_i16(self.unknown5);
        w.write_i16(self.unknown6);
        w.write_i16(self.unknown7);
        w.write_i16(self.unknown8);
        w.write_i16(self.unknown9);
        w.write_u8(self.unknown10a);
        w.write_u8(self.unknown10b);
        w.write_i16(self.unknown11);
        w.write_i16(self.unknown12);
        w.write_i16(self.unknown13);
        w.write_i16(self.unknown14);
        w.write_i16(self.unknown15);
        w.write_i16(self.unknown16);
        w.write_i16(self.unknown17);
    }

    /// Number of bone transforms stored at the end of the model data
    pub fn transform_count(&self) -> usize {
        if self.bone_count > 0 {
            self.bone_count as usize
        } else {
            self.unknown8.max(0) as usize
        }
    }
}

// ============================================================================
// Level of detail
// ============================================================================

/// One LoD table entry (60 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOfDetail {
    pub mesh_offset: u16,
    pub mesh_count: i16,
    pub unknown0: i32,
    pub unknown1: i32,
    pub mesh_end: i16,
    pub extra_mesh_count: i16,
    pub mesh_sum: i16,
    pub unknown2: i16,
    pub unknown3: i32,
    pub unknown4: i32,
    pub unknown5: i32,
    pub index_data_start: i32,
    pub unknown6: i32,
    pub unknown7: i32,
    pub vertex_data_size: i32,
    pub index_data_size: i32,
    /// Absolute offset of this LoD's vertex buffer in the plain model file
    pub vertex_data_offset: i32,
    pub index_data_offset: i32,
}

impl LevelOfDetail {
    pub const SIZE: usize = 60;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            mesh_offset: r.read_u16()?,
            mesh_count: r.read_i16()?,
            unknown0: r.read_i32()?,
            unknown1: r.read_i32()?,
            mesh_end: r.read_i16()?,
            extra_mesh_count: r.read_i16()?,
            mesh_sum: r.read_i16()?,
            unknown2: r.read_i16()?,
            unknown3: r.read_i32()?,
            unknown4: r.read_i32()?,
            unknown5: r.read_i32()?,
            index_data_start: r.read_i32()?,
            unknown6: r.read_i32()?,
            unknown7: r.read_i32()?,
            vertex_data_size: r.read_i32()?,
            index_data_size: r.read_i32()?,
            vertex_data_offset: r.read_i32()?,
            index_data_offset: r.read_i32()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_u16(self.mesh_offset);
        w.write_i16(self.mesh_count);
        w.write_i32(self.unknown0);
        w.write_i32(self.unknown1);
        w.write_i16(self.mesh_end);
        w.write_i16(self.extra_mesh_count);
        w.write_i16(self.mesh_sum);
        w.write_i16(self.unknown2);
        w.write_i32(self.unknown3);
        w.write_i32(self.unknown4);
        w.write_i32(self.unknown5);
        w.write_i32(self.index_data_start);
        w.write_i32(self.unknown6);
        w.write_i32(self.unknown7);
        w.write_i32(self.vertex_data_size);
        w.write_i32(self.index_data_size);
        w.write_i32(self.vertex_data_offset);
        w.write_i32(self.index_data_offset);
    }

    /// Meshes this LoD carries, including extra meshes
    pub fn total_meshes(&self) -> usize {
        self.mesh_count.max(0) as usize + self.extra_mesh_count.max(0) as usize
    }
}

// ============================================================================
// Meshes and parts
// ============================================================================

/// Per-mesh descriptor (36 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub vertex_count: i32,
    pub index_count: i32,
    pub material_index: i16,
    pub part_index: i16,
    pub part_count: i16,
    pub bone_set_index: i16,
    /// Start of this mesh's indices in the LoD index buffer, in indices
    pub index_data_offset: i32,
    /// Per-stream byte offsets relative to the LoD vertex buffer
    pub vertex_offsets: [i32; 3],
    pub entry_sizes: [u8; 3],
    pub stream_count: u8,
}

impl MeshInfo {
    pub const SIZE: usize = 36;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            vertex_count: r.read_i32()?,
            index_count: r.read_i32()?,
            material_index: r.read_i16()?,
            part_index: r.read_i16()?,
            part_count: r.read_i16()?,
            bone_set_index: r.read_i16()?,
            index_data_offset: r.read_i32()?,
            vertex_offsets: [r.read_i32()?, r.read_i32()?, r.read_i32()?],
            entry_sizes: [r.read_u8()?, r.read_u8()?, r.read_u8()?],
            stream_count: r.read_u8()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.vertex_count);
        w.write_i32(self.index_count);
        w.write_i16(self.material_index);
        w.write_i16(self.part_index);
        w.write_i16(self.part_count);
        w.write_i16(self.bone_set_index);
        w.write_i32(self.index_data_offset);
        for v in self.vertex_offsets {
            w.write_i32(v);
        }
        for v in self.entry_sizes {
            w.write_u8(v);
        }
        w.write_u8(self.stream_count);
    }
}

/// Contiguous index sub-range of a mesh (16 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshPartInfo {
    /// Start in the LoD index buffer, in indices
    pub index_offset: i32,
    pub index_count: i32,
    pub attribute_bitmask: u32,
    pub bone_start: i16,
    pub bone_count: i16,
}

impl MeshPartInfo {
    pub const SIZE: usize = 16;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            index_offset: r.read_i32()?,
            index_count: r.read_i32()?,
            attribute_bitmask: r.read_u32()?,
            bone_start: r.read_i16()?,
            bone_count: r.read_i16()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.index_offset);
        w.write_i32(self.index_count);
        w.write_u32(self.attribute_bitmask);
        w.write_i16(self.bone_start);
        w.write_i16(self.bone_count);
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Shape header: name offset plus per-LoD part ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeInfo {
    pub name_offset: i32,
    pub part_offsets: [u16; LOD_COUNT],
    pub part_counts: [i16; LOD_COUNT],
}

impl ShapeInfo {
    pub const SIZE: usize = 16;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            name_offset: r.read_i32()?,
            part_offsets: [r.read_u16()?, r.read_u16()?, r.read_u16()?],
            part_counts: [r.read_i16()?, r.read_i16()?, r.read_i16()?],
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.name_offset);
        for v in self.part_offsets {
            w.write_u16(v);
        }
        for v in self.part_counts {
            w.write_i16(v);
        }
    }
}

/// Ties a run of shape entries to the mesh whose index buffer they patch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapePartInfo {
    /// Equals the target mesh's `index_data_offset`
    pub mesh_index_offset: i32,
    pub index_count: i32,
    /// First entry in the shape data list
    pub data_offset: i32,
}

impl ShapePartInfo {
    pub const SIZE: usize = 12;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            mesh_index_offset: r.read_i32()?,
            index_count: r.read_i32()?,
            data_offset: r.read_i32()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.mesh_index_offset);
        w.write_i32(self.index_count);
        w.write_i32(self.data_offset);
    }
}

/// One index replacement: position `base_index` in the mesh's index list
/// points at `shape_vertex` while the shape is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeEntry {
    pub base_index: u16,
    pub shape_vertex: u16,
}

impl ShapeEntry {
    pub const SIZE: usize = 4;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            base_index: r.read_u16()?,
            shape_vertex: r.read_u16()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_u16(self.base_index);
        w.write_u16(self.shape_vertex);
    }
}

// ============================================================================
// Bounds and transforms
// ============================================================================

/// Eight vec4 corners. The first two are the model's min/max; the rest are preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox(pub [Vec4; 8]);

impl BoundingBox {
    pub const SIZE: usize = 128;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        let mut points = [Vec4::ZERO; 8];
        for p in points.iter_mut() {
            *p = read_vec4(r)?;
        }
        Ok(Self(points))
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        for p in &self.0 {
            write_vec4(w, *p);
        }
    }

    pub fn min(&self) -> Vec4 {
        self.0[0]
    }

    pub fn max(&self) -> Vec4 {
        self.0[1]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform(pub [Vec4; 2]);

impl BoneTransform {
    pub const SIZE: usize = 32;

    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        Ok(Self([read_vec4(r)?, read_vec4(r)?]))
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        write_vec4(w, self.0[0]);
        write_vec4(w, self.0[1]);
    }
}

fn read_vec4(r: &mut BinaryReader) -> Result<Vec4> {
    Ok(Vec4::new(
        r.read_f32()?,
        r.read_f32()?,
        r.read_f32()?,
        r.read_f32()?,
    ))
}

fn write_vec4(w: &mut BinaryWriter, v: Vec4) {
    for c in v.to_array() {
        w.write_f32(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T>(value: &T, write: fn(&T, &mut BinaryWriter)) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        write(value, &mut w);
        w.into_inner()
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(
            encoded(&ModelHeader::default(), ModelHeader::write).len(),
            ModelHeader::SIZE
        );
        assert_eq!(
            encoded(&LevelOfDetail::default(), LevelOfDetail::write).len(),
            LevelOfDetail::SIZE
        );
        assert_eq!(
            encoded(&MeshInfo::default(), MeshInfo::write).len(),
            MeshInfo::SIZE
        );
        assert_eq!(
            encoded(&MeshPartInfo::default(), MeshPartInfo::write).len(),
            MeshPartInfo::SIZE
        );
        assert_eq!(
            encoded(&ShapeInfo::default(), ShapeInfo::write).len(),
            ShapeInfo::SIZE
        );
        assert_eq!(
            encoded(&BoundingBox::default(), BoundingBox::write).len(),
            BoundingBox::SIZE
        );
    }

    #[test]
    fn test_mesh_info_roundtrip() {
        let info = MeshInfo {
            vertex_count: 300,
            index_count: 900,
            material_index: 1,
            part_index: 2,
            part_count: 3,
            bone_set_index: 1,
            index_data_offset: 904,
            vertex_offsets: [6000, 7200, 0],
            entry_sizes: [20, 36, 0],
            stream_count: 2,
        };
        let bytes = encoded(&info, MeshInfo::write);
        let parsed = MeshInfo::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_transform_count_fallback() {
        let mut header = ModelHeader {
            unknown8: 4,
            ..Default::default()
        };
        assert_eq!(header.transform_count(), 4);
        header.bone_count = 7;
        assert_eq!(header.transform_count(), 7);
    }
}
