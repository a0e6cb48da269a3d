//! Structural decoder and encoder
//!
//! The model data region is a dense sequence of typed sections whose counts
//! live in the [`ModelHeader`]. Decoding builds a [`StructuralRecord`]; the
//! same record serves as the donor when a geometry model is encoded, so every
//! field without a known meaning survives a rewrite.
//!
//! # Layout
//! ```text
//! path table              (count, size, strings)
//! model header            (56 bytes)
//! opaque block 0          (unknown2 * 32 bytes)
//! LoD table               (3 * 60 bytes)
//! extra LoD table         (unknown10a * 60 bytes, furniture only)
//! mesh infos              (36 bytes each)
//! attribute name offsets  (i32 each)
//! mesh parts              (16 bytes each)
//! opaque block 2          (unknown9 * 12 bytes)
//! material name offsets   (i32 each)
//! bone name offsets       (i32 each)
//! bone sets               (version dependent)
//! shape infos, shape parts, shape entries
//! part bone set           (i32 byte count, i16 entries)
//! padding                 (u8 n, n bytes)
//! bounding box            (8 * vec4)
//! bone transforms         (8 * f32 each)
//! ```

mod bone_sets;
mod encode;
mod paths;
mod records;

pub use bone_sets::{BoneSet, V5_SLOTS, read_bone_sets, write_bone_sets};
pub use encode::{Section, SectionLedger, encode_model};
pub use paths::{PathBlock, PathCounts, PathTable, SHAPE_PREFIX};
pub use records::{
    BoneTransform, BoundingBox, LevelOfDetail, MeshInfo, MeshPartInfo, ModelHeader, ShapeEntry,
    ShapeInfo, ShapePartInfo,
};

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::binary::BinaryReader;
use crate::config::DecodeOptions;
use crate::error::{MdlError, Result};
use crate::transport::{LOD_COUNT, ModelFileHeader};
use crate::vertex::{DECLARATION_SIZE, VertexDataType, VertexDeclaration};

/// Format version, selecting the bone set layout and weight encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MdlVersion {
    V5,
    V6,
}

impl MdlVersion {
    pub fn from_raw(raw: u16) -> Result<Self> {
        match raw {
            5 => Ok(Self::V5),
            6 => Ok(Self::V6),
            other => Err(MdlError::UnsupportedVersion(other)),
        }
    }

    pub const fn to_raw(self) -> u16 {
        match self {
            Self::V5 => 5,
            Self::V6 => 6,
        }
    }

    /// Wire type bone weights are written with
    pub const fn bone_weight_type(self) -> VertexDataType {
        match self {
            Self::V5 => VertexDataType::UByte4n,
            Self::V6 => VertexDataType::UByte4,
        }
    }
}

/// One mesh of one LoD: descriptor, vertex declaration and parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord {
    pub info: MeshInfo,
    pub declaration: VertexDeclaration,
    pub parts: Vec<MeshPartInfo>,
}

/// Parsed vertex info and model data regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralRecord {
    pub version: MdlVersion,
    pub paths: PathTable,
    pub header: ModelHeader,
    pub unknown_block0: Vec<u8>,
    pub lods: [LevelOfDetail; LOD_COUNT],
    pub extra_lods: Vec<LevelOfDetail>,
    /// Meshes per LoD, extra meshes included
    pub meshes: [Vec<MeshRecord>; LOD_COUNT],
    pub attribute_offsets: Vec<i32>,
    pub unknown_block2: Vec<u8>,
    pub material_offsets: Vec<i32>,
    pub bone_offsets: Vec<i32>,
    pub bone_sets: Vec<BoneSet>,
    pub shapes: Vec<ShapeInfo>,
    pub shape_parts: Vec<ShapePartInfo>,
    pub shape_entries: Vec<ShapeEntry>,
    pub part_bone_set: Vec<i16>,
    pub padding: Vec<u8>,
    pub bounding_box: BoundingBox,
    pub bone_transforms: Vec<BoneTransform>,
    /// False for previously modified assets whose higher LoDs still hold
    /// meshes; their shape tables are not trusted
    pub shapes_usable: bool,
}

impl StructuralRecord {
    /// Donor with neutral unknowns, for encoding a model from scratch
    pub fn blank(version: MdlVersion) -> Self {
        let mut bounding_box = BoundingBox::default();
        bounding_box.0[0] = Vec4::new(0.0, 0.0, 0.0, 1.0);
        bounding_box.0[1] = Vec4::new(0.0, 0.0, 0.0, 1.0);
        Self {
            version,
            paths: PathTable::default(),
            header: ModelHeader {
                lod_count: 1,
                ..Default::default()
            },
            unknown_block0: Vec::new(),
            lods: Default::default(),
            extra_lods: Vec::new(),
            meshes: Default::default(),
            attribute_offsets: Vec::new(),
            unknown_block2: Vec::new(),
            material_offsets: Vec::new(),
            bone_offsets: Vec::new(),
            bone_sets: Vec::new(),
            shapes: Vec::new(),
            shape_parts: Vec::new(),
            shape_entries: Vec::new(),
            part_bone_set: Vec::new(),
            padding: Vec::new(),
            bounding_box,
            bone_transforms: Vec::new(),
            shapes_usable: true,
        }
    }

    /// Parse a plain model file (file header, vertex info, model data, buffers)
    pub fn decode(file: &[u8], options: &DecodeOptions) -> Result<Self> {
        let file_header = ModelFileHeader::from_bytes(file)?;
        let version = MdlVersion::from_raw((file_header.version & 0xFFFF) as u16)?;

        let vertex_info_start = ModelFileHeader::SIZE;
        let model_data_start = vertex_info_start + file_header.vertex_info_size as usize;
        let model_data_end = model_data_start + file_header.model_data_size as usize;
        let vertex_info = file
            .get(vertex_info_start..model_data_start)
            .ok_or(MdlError::Truncated {
                what: "vertex info region",
                offset: vertex_info_start,
                needed: file_header.vertex_info_size as usize,
                available: file.len().saturating_sub(vertex_info_start),
            })?;
        let model_data = file
            .get(model_data_start..model_data_end)
            .ok_or(MdlError::Truncated {
                what: "model data region",
                offset: model_data_start,
                needed: file_header.model_data_size as usize,
                available: file.len().saturating_sub(model_data_start),
            })?;

        let mut r = BinaryReader::new(model_data);

        // Path strings are parsed once the header counts are known
        let _path_count = r.read_i32()?;
        let path_size = r.read_i32()?.max(0) as usize;
        let path_strings = r.read_bytes(path_size, "path table")?;

        let header = ModelHeader::read(&mut r)?;
        let paths = PathTable::parse(
            &path_strings,
            PathCounts {
                attributes: header.attribute_count.max(0) as usize,
                bones: header.bone_count.max(0) as usize,
                materials: header.material_count.max(0) as usize,
                shapes: header.shape_count.max(0) as usize,
            },
        )?;

        let unknown_block0 =
            r.read_bytes(header.unknown2.max(0) as usize * 32, "opaque block 0")?;

        let mut shapes_usable = true;
        let mut listed_meshes = 0usize;
        let mut lods: [LevelOfDetail; LOD_COUNT] = Default::default();
        for (i, lod) in lods.iter_mut().enumerate() {
            *lod = LevelOfDetail::read(&mut r)?;
            listed_meshes += lod.mesh_count.max(0) as usize;
            if i == 0 && lod.mesh_count == 0 {
                lod.mesh_count = 1;
            }
            if options.modified && i > 0 && lod.mesh_count > 0 {
                shapes_usable = false;
            }
        }
        if !shapes_usable {
            tracing::warn!("modified model still carries higher LoD meshes; ignoring shape data");
        }

        let mut extra_lods = Vec::new();
        if r.peek_u8() == Some(0) && listed_meshes < header.mesh_count.max(0) as usize {
            for _ in 0..header.unknown10a {
                extra_lods.push(LevelOfDetail::read(&mut r)?);
            }
        }

        // Declarations sit in the vertex info region, one slot per LoD mesh
        let mut meshes: [Vec<MeshRecord>; LOD_COUNT] = Default::default();
        let mut slot_base = 0usize;
        for (lod, records) in lods.iter().zip(meshes.iter_mut()) {
            for j in 0..lod.total_meshes() {
                let start = (slot_base + j) * DECLARATION_SIZE;
                let declaration = match vertex_info.get(start..start + DECLARATION_SIZE) {
                    Some(slot) => VertexDeclaration::from_bytes(slot)?,
                    None => VertexDeclaration::default(),
                };
                records.push(MeshRecord {
                    declaration,
                    ..Default::default()
                });
            }
            slot_base += lod.mesh_count.max(0) as usize;
        }

        let material_total = paths.materials.len();
        for records in meshes.iter_mut() {
            for record in records.iter_mut() {
                record.info = MeshInfo::read(&mut r)?;
                if record.info.material_index < 0
                    || record.info.material_index as usize >= material_total
                {
                    tracing::warn!(
                        material_index = record.info.material_index,
                        "mesh references a missing material; using material 0"
                    );
                    record.info.material_index = 0;
                }
            }
        }

        let attribute_offsets = r.read_i32_vec(header.attribute_count.max(0) as usize)?;

        for records in meshes.iter_mut() {
            for record in records.iter_mut() {
                for _ in 0..record.info.part_count.max(0) {
                    record.parts.push(MeshPartInfo::read(&mut r)?);
                }
            }
        }

        let unknown_block2 =
            r.read_bytes(header.unknown9.max(0) as usize * 12, "opaque block 2")?;
        let material_offsets = r.read_i32_vec(header.material_count.max(0) as usize)?;
        let bone_offsets = r.read_i32_vec(header.bone_count.max(0) as usize)?;
        let bone_sets =
            read_bone_sets(&mut r, version, header.bone_list_count.max(0) as usize)?;

        let shapes = (0..header.shape_count.max(0))
            .map(|_| ShapeInfo::read(&mut r))
            .collect::<Result<Vec<_>>>()?;
        let shape_parts = (0..header.shape_part_count.max(0))
            .map(|_| ShapePartInfo::read(&mut r))
            .collect::<Result<Vec<_>>>()?;
        let shape_entries = (0..header.shape_data_count)
            .map(|_| ShapeEntry::read(&mut r))
            .collect::<Result<Vec<_>>>()?;

        let part_bone_bytes = r.read_i32()?.max(0) as usize;
        let part_bone_set = r.read_i16_vec(part_bone_bytes / 2)?;

        let padding_len = r.read_u8()? as usize;
        let padding = r.read_bytes(padding_len, "padding")?;

        let bounding_box = BoundingBox::read(&mut r)?;
        let bone_transforms = (0..header.transform_count())
            .map(|_| BoneTransform::read(&mut r))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            version = version.to_raw(),
            meshes = header.mesh_count,
            materials = paths.materials.len(),
            bones = paths.bones.len(),
            shapes = paths.shapes.len(),
            "decoded model structure"
        );

        Ok(Self {
            version,
            paths,
            header,
            unknown_block0,
            lods,
            extra_lods,
            meshes,
            attribute_offsets,
            unknown_block2,
            material_offsets,
            bone_offsets,
            bone_sets,
            shapes,
            shape_parts,
            shape_entries,
            part_bone_set,
            padding,
            bounding_box,
            bone_transforms,
            shapes_usable,
        })
    }

    /// Meshes of LoD 0 proper, extra meshes excluded
    pub fn primary_meshes(&self) -> &[MeshRecord] {
        let count = (self.lods[0].mesh_count.max(0) as usize).min(self.meshes[0].len());
        &self.meshes[0][..count]
    }

    /// True when the donor has meshes but none of them carries parts
    pub fn is_partless(&self) -> bool {
        !self.meshes[0].is_empty()
            && self.header.mesh_part_count == 0
            && self.meshes.iter().flatten().all(|m| m.info.part_count == 0)
    }

    /// Shape entries that patch the LoD 0 mesh whose index data starts at
    /// `index_data_offset`, grouped by shape in shape order
    pub fn shape_entries_for(&self, index_data_offset: i32) -> Vec<(usize, &[ShapeEntry])> {
        let mut out = Vec::new();
        if !self.shapes_usable {
            return out;
        }
        for (shape_index, shape) in self.shapes.iter().enumerate() {
            let start = shape.part_offsets[0] as usize;
            let count = shape.part_counts[0].max(0) as usize;
            for part in self.shape_parts.iter().skip(start).take(count) {
                if part.mesh_index_offset != index_data_offset {
                    continue;
                }
                let from = part.data_offset.max(0) as usize;
                let to = from + part.index_count.max(0) as usize;
                match self.shape_entries.get(from..to) {
                    Some(entries) => out.push((shape_index, entries)),
                    None => tracing::warn!(
                        shape = shape_index,
                        "shape part points past the shape entry list; skipping"
                    ),
                }
            }
        }
        out
    }
}
