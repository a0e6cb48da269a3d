//! Structural encoder
//!
//! Rebuilds the vertex info and model data regions plus the LoD 0 buffers from
//! a [`Model`] and a donor [`StructuralRecord`]. Counts, offsets and sizes are
//! recomputed; opaque blocks and `unknown*` scalars are copied from the donor.
//!
//! Every model data section is appended to a [`SectionLedger`] in file order.
//! The LoD table goes in as a placeholder and is filled last, once the ledger
//! knows where the vertex buffer will start.

use crate::binary::BinaryWriter;
use crate::config::CodecConfig;
use crate::error::{MdlError, Result};
use crate::model::{Model, RawShapePart};
use crate::transport::{LOD_COUNT, ModelFileHeader, Regions};
use crate::vertex::{VertexDeclaration, write_vertices};

use super::bone_sets::write_bone_sets;
use super::paths::PathTable;
use super::records::{
    BoneTransform, BoundingBox, LevelOfDetail, MeshInfo, MeshPartInfo, ShapeEntry, ShapeInfo,
    ShapePartInfo,
};
use super::{MdlVersion, StructuralRecord};

/// Indices are padded so every mesh starts on a multiple of this count
const INDEX_ALIGN: usize = 8;

// ============================================================================
// Size ledger
// ============================================================================

/// Named model data sections, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    PathTable,
    Header,
    UnknownBlock0,
    Lods,
    Meshes,
    AttributeOffsets,
    Parts,
    UnknownBlock2,
    MaterialOffsets,
    BoneOffsets,
    BoneSets,
    Shapes,
    PartBoneSet,
    Padding,
    BoundingBox,
    BoneTransforms,
}

/// Ordered list of built sections; the single source of every offset
#[derive(Debug, Clone, Default)]
pub struct SectionLedger {
    sections: Vec<(Section, Vec<u8>)>,
}

impl SectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: Section, bytes: Vec<u8>) {
        self.sections.push((section, bytes));
    }

    /// Offset of a section from the start of the model data region
    pub fn offset_of(&self, section: Section) -> Option<usize> {
        let mut offset = 0;
        for (s, bytes) in &self.sections {
            if *s == section {
                return Some(offset);
            }
            offset += bytes.len();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|(_, b)| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap a section's contents; the size must not change
    pub fn replace(&mut self, section: Section, bytes: Vec<u8>) -> Result<()> {
        let slot = self
            .sections
            .iter_mut()
            .find(|(s, _)| *s == section)
            .ok_or_else(|| MdlError::InvalidModel(format!("section {section:?} not built")))?;
        if slot.1.len() != bytes.len() {
            return Err(MdlError::InvalidModel(format!(
                "section {section:?} changed size from {} to {}",
                slot.1.len(),
                bytes.len()
            )));
        }
        slot.1 = bytes;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for (_, bytes) in self.sections {
            out.extend_from_slice(&bytes);
        }
        out
    }
}

// ============================================================================
// Geometry pass
// ============================================================================

/// Where one mesh landed in the LoD 0 buffers
struct MeshPlacement {
    info: MeshInfo,
    declaration: VertexDeclaration,
}

struct Geometry {
    meshes: Vec<MeshPlacement>,
    vertex_buffer: Vec<u8>,
    index_buffer: Vec<u8>,
}

fn count_i16(value: usize, what: &str) -> Result<i16> {
    i16::try_from(value)
        .map_err(|_| MdlError::InvalidModel(format!("{value} {what} exceed the format limit")))
}

/// Declaration for mesh `index`: the donor's, its first mesh's, or the default
fn donor_declaration(donor: &StructuralRecord, index: usize, version: MdlVersion) -> VertexDeclaration {
    let donor_meshes = donor.primary_meshes();
    donor_meshes
        .get(index)
        .or_else(|| donor_meshes.first())
        .map(|m| m.declaration.clone())
        .filter(|d| !d.elements.is_empty())
        .unwrap_or_else(|| VertexDeclaration::standard(version))
        .upgraded(version)
}

fn lay_out_geometry(
    model: &Model,
    donor: &StructuralRecord,
    version: MdlVersion,
    shapes: &[RawShapePart],
) -> Result<Geometry> {
    let mut vertex_buffer = BinaryWriter::new();
    let mut index_buffer = BinaryWriter::new();
    let mut meshes = Vec::with_capacity(model.meshes.len());

    for (m, mesh) in model.meshes.iter().enumerate() {
        let declaration = donor_declaration(donor, m, version);
        let mut vertices = mesh.vertices();
        if vertices.len() > u16::MAX as usize + 1 {
            return Err(MdlError::InvalidModel(format!(
                "mesh {m} has {} vertices, more than 16-bit indices can address",
                vertices.len()
            )));
        }
        // Shape vertices follow the ordinary ones, in shape order
        for part in shapes.iter().filter(|p| p.mesh == m) {
            vertices.extend_from_slice(&part.vertices);
        }

        let streams = write_vertices(&vertices, &declaration);
        let strides = declaration.strides();
        let mut vertex_offsets = [0i32; 3];
        for (s, stream) in streams.iter().enumerate() {
            if strides[s] > 0 {
                vertex_offsets[s] = vertex_buffer.len() as i32;
                vertex_buffer.write_bytes(stream);
            }
        }

        let index_data_offset = index_buffer.len() / 2;
        let indices = mesh.indices()?;
        for &index in &indices {
            index_buffer.write_u16(index);
        }
        index_buffer.pad_to(INDEX_ALIGN * 2);

        meshes.push(MeshPlacement {
            info: MeshInfo {
                vertex_count: vertices.len() as i32,
                index_count: indices.len() as i32,
                material_index: count_i16(model.material_index(m), "materials")?,
                part_index: 0,
                part_count: 0,
                bone_set_index: count_i16(m, "meshes")?,
                index_data_offset: index_data_offset as i32,
                vertex_offsets,
                entry_sizes: strides,
                stream_count: declaration.stream_count(),
            },
            declaration,
        });
    }

    Ok(Geometry {
        meshes,
        vertex_buffer: vertex_buffer.into_inner(),
        index_buffer: index_buffer.into_inner(),
    })
}

// ============================================================================
// Encoder
// ============================================================================

fn write_records<T>(items: &[T], write: fn(&T, &mut BinaryWriter)) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    for item in items {
        write(item, &mut w);
    }
    w.into_inner()
}

fn write_i32s(values: &[i32]) -> Vec<u8> {
    let mut w = BinaryWriter::with_capacity(values.len() * 4);
    for &v in values {
        w.write_i32(v);
    }
    w.into_inner()
}

/// Encode `model` against `donor` into container regions (LoD 0 only)
pub fn encode_model(
    model: &Model,
    donor: &StructuralRecord,
    config: &CodecConfig,
) -> Result<Regions> {
    let version = config.resolve_version(donor.version)?;
    if model.meshes.is_empty() {
        return Err(MdlError::InvalidModel("model has no meshes".into()));
    }

    let materials = model.materials();
    let bones = model.bones();
    let attributes = model.attributes();
    let (shape_names, raw_shapes) = if config.skip_shapes {
        (Vec::new(), Vec::new())
    } else {
        (model.shape_names(), model.raw_shape_parts()?)
    };
    let partless = donor.is_partless();
    let mesh_count = model.meshes.len();

    let paths = PathTable {
        attributes: attributes.clone(),
        bones: bones.clone(),
        materials: materials.clone(),
        shapes: shape_names.clone(),
        extras: donor.paths.extras.clone(),
    }
    .build();

    let mut geometry = lay_out_geometry(model, donor, version, &raw_shapes)?;

    // Parts and part bone set
    let mut parts = Vec::new();
    let mut part_bone_set: Vec<i16> = Vec::new();
    if !partless {
        for (m, mesh) in model.meshes.iter().enumerate() {
            let placement = &mut geometry.meshes[m];
            placement.info.part_index = count_i16(parts.len(), "parts")?;
            placement.info.part_count = count_i16(mesh.parts.len(), "parts")?;
            let bone_count = count_i16(mesh.bones.len(), "bones")?;

            let mut index_offset = placement.info.index_data_offset;
            for (p, part) in mesh.parts.iter().enumerate() {
                parts.push(MeshPartInfo {
                    index_offset,
                    index_count: part.triangle_indices.len() as i32,
                    attribute_bitmask: model.attribute_bitmask(m, p)?,
                    bone_start: count_i16(part_bone_set.len(), "part bone entries")?,
                    bone_count,
                });
                index_offset += part.triangle_indices.len() as i32;
                part_bone_set.extend(0..bone_count);
            }
        }
    }

    // Bone sets
    let bone_sets: Vec<_> = (0..mesh_count).map(|m| model.bone_set(m)).collect();
    let bone_set_bytes = write_bone_sets(&bone_sets, version);

    // Shapes
    let mut shape_infos = Vec::with_capacity(shape_names.len());
    let mut running_parts = 0usize;
    for (s, &name_offset) in paths.shape_offsets.iter().enumerate() {
        let count = raw_shapes.iter().filter(|p| p.shape == s).count();
        shape_infos.push(ShapeInfo {
            name_offset,
            part_offsets: [running_parts as u16, 0, 0],
            part_counts: [count_i16(count, "shape parts")?, 0, 0],
        });
        running_parts += count;
    }
    let mut shape_parts = Vec::with_capacity(raw_shapes.len());
    let mut shape_entries = Vec::new();
    for raw in &raw_shapes {
        shape_parts.push(ShapePartInfo {
            mesh_index_offset: geometry.meshes[raw.mesh].info.index_data_offset,
            index_count: raw.replacements.len() as i32,
            data_offset: shape_entries.len() as i32,
        });
        for &(base, shape_vertex) in &raw.replacements {
            for value in [base, shape_vertex] {
                if value > u16::MAX as u32 {
                    return Err(MdlError::ShapeIndexOverflow {
                        mesh: raw.mesh,
                        value: value as usize,
                    });
                }
            }
            shape_entries.push(ShapeEntry {
                base_index: base as u16,
                shape_vertex: shape_vertex as u16,
            });
        }
    }
    let shape_data_count = u16::try_from(shape_entries.len()).map_err(|_| {
        MdlError::InvalidModel(format!("{} shape entries exceed the format limit", shape_entries.len()))
    })?;

    // Header
    let mut header = donor.header.clone();
    header.mesh_count = count_i16(mesh_count, "meshes")?;
    header.attribute_count = count_i16(attributes.len(), "attributes")?;
    header.mesh_part_count = count_i16(parts.len(), "parts")?;
    header.material_count = count_i16(materials.len(), "materials")?;
    header.bone_count = count_i16(bones.len(), "bones")?;
    header.bone_list_count = count_i16(mesh_count, "meshes")?;
    header.shape_count = count_i16(shape_names.len(), "shapes")?;
    header.shape_part_count = count_i16(shape_parts.len(), "shape parts")?;
    header.shape_data_count = shape_data_count;
    header.lod_count = 1;
    header.unknown2 = count_i16(donor.unknown_block0.len() / 32, "opaque entries")?;
    header.unknown9 = count_i16(donor.unknown_block2.len() / 12, "opaque entries")?;
    // Extra LoD entries are not carried into a rewritten model
    header.unknown10a = 0;
    header.unknown12 = count_i16(bone_set_bytes.len() / 2, "bone set words")?;

    // Both model boxes come from the vertices; the trailing pairs are the donor's
    let (min, max) = model.bounding_box().unwrap_or_default();
    let mut bounding_box = donor.bounding_box;
    bounding_box.0[0] = min.extend(1.0);
    bounding_box.0[1] = max.extend(1.0);
    bounding_box.0[2] = min.extend(1.0);
    bounding_box.0[3] = max.extend(1.0);

    let transforms = vec![BoneTransform::default(); header.transform_count()];

    let mut padding = BinaryWriter::with_capacity(donor.padding.len() + 1);
    padding.write_u8(donor.padding.len().min(u8::MAX as usize) as u8);
    padding.write_bytes(&donor.padding[..donor.padding.len().min(u8::MAX as usize)]);

    let mut part_bone_bytes = BinaryWriter::with_capacity(part_bone_set.len() * 2 + 4);
    part_bone_bytes.write_i32((part_bone_set.len() * 2) as i32);
    for &entry in &part_bone_set {
        part_bone_bytes.write_i16(entry);
    }

    let mut shape_bytes = BinaryWriter::new();
    shape_bytes.write_bytes(&write_records(&shape_infos, ShapeInfo::write));
    shape_bytes.write_bytes(&write_records(&shape_parts, ShapePartInfo::write));
    shape_bytes.write_bytes(&write_records(&shape_entries, ShapeEntry::write));

    let mesh_infos: Vec<MeshInfo> = geometry.meshes.iter().map(|m| m.info.clone()).collect();

    let mut ledger = SectionLedger::new();
    ledger.push(Section::PathTable, paths.bytes);
    let mut header_bytes = BinaryWriter::new();
    header.write(&mut header_bytes);
    ledger.push(Section::Header, header_bytes.into_inner());
    ledger.push(Section::UnknownBlock0, donor.unknown_block0.clone());
    ledger.push(Section::Lods, vec![0; LevelOfDetail::SIZE * LOD_COUNT]);
    ledger.push(Section::Meshes, write_records(&mesh_infos, MeshInfo::write));
    ledger.push(Section::AttributeOffsets, write_i32s(&paths.attribute_offsets));
    ledger.push(Section::Parts, write_records(&parts, MeshPartInfo::write));
    ledger.push(Section::UnknownBlock2, donor.unknown_block2.clone());
    ledger.push(Section::MaterialOffsets, write_i32s(&paths.material_offsets));
    ledger.push(Section::BoneOffsets, write_i32s(&paths.bone_offsets));
    ledger.push(Section::BoneSets, bone_set_bytes);
    ledger.push(Section::Shapes, shape_bytes.into_inner());
    ledger.push(Section::PartBoneSet, part_bone_bytes.into_inner());
    ledger.push(Section::Padding, padding.into_inner());
    ledger.push(Section::BoundingBox, write_records(&[bounding_box], BoundingBox::write));
    ledger.push(Section::BoneTransforms, write_records(&transforms, BoneTransform::write));

    let vertex_info: Vec<u8> = geometry
        .meshes
        .iter()
        .flat_map(|m| m.declaration.to_bytes())
        .collect();

    // LoD table, now that the buffer start is known
    let vertex_start = (ModelFileHeader::SIZE + vertex_info.len() + ledger.len()) as i32;
    let lods = build_lods(
        donor,
        mesh_count,
        vertex_start,
        geometry.vertex_buffer.len() as i32,
        geometry.index_buffer.len() as i32,
    )?;
    ledger.replace(Section::Lods, write_records(&lods, LevelOfDetail::write))?;

    tracing::debug!(
        version = version.to_raw(),
        meshes = mesh_count,
        parts = parts.len(),
        shapes = shape_names.len(),
        shape_entries = shape_entries.len(),
        model_data = ledger.len(),
        vertex_bytes = geometry.vertex_buffer.len(),
        index_bytes = geometry.index_buffer.len(),
        "encoded model structure"
    );

    Ok(Regions {
        version: version.to_raw(),
        mesh_count: mesh_count as u16,
        material_count: materials.len() as u16,
        lod_count: 1,
        index_streaming: 1,
        vertex_info,
        model_data: ledger.into_bytes(),
        vertex_buffers: [geometry.vertex_buffer, Vec::new(), Vec::new()],
        index_buffers: [geometry.index_buffer, Vec::new(), Vec::new()],
    })
}

/// LoD 0 describes the new buffers; LoD 1 and 2 stay empty, chained after it
fn build_lods(
    donor: &StructuralRecord,
    mesh_count: usize,
    vertex_start: i32,
    vertex_size: i32,
    index_size: i32,
) -> Result<[LevelOfDetail; LOD_COUNT]> {
    let n = count_i16(mesh_count, "meshes")?;
    let mut lods: [LevelOfDetail; LOD_COUNT] = donor.lods.clone();

    let mut vertex_offset = vertex_start;
    let mut previous_sizes = 0;
    for (i, lod) in lods.iter_mut().enumerate() {
        vertex_offset += previous_sizes;
        let (count, vertex_bytes, index_bytes) = if i == 0 {
            (n, vertex_size, index_size)
        } else {
            (0, 0, 0)
        };
        lod.mesh_offset = if i == 0 { 0 } else { n as u16 };
        lod.mesh_count = count;
        lod.mesh_end = n;
        lod.extra_mesh_count = 0;
        lod.mesh_sum = n;
        lod.vertex_data_offset = vertex_offset;
        lod.vertex_data_size = vertex_bytes;
        lod.index_data_offset = vertex_offset + vertex_bytes;
        lod.index_data_start = vertex_offset + vertex_bytes;
        lod.index_data_size = index_bytes;
        previous_sizes = vertex_bytes + index_bytes;
    }
    Ok(lods)
}
