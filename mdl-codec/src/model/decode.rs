//! Structural record + plain model file -> geometry model

use std::ops::Range;

use hashbrown::HashMap;

use crate::binary::BinaryReader;
use crate::error::{MdlError, Result};
use crate::structure::{MeshRecord, StructuralRecord};
use crate::vertex::{StreamLayout, Vertex, read_vertices};

use super::{MeshGroup, Model, Part, ShapeDelta, ShapePart};

/// Read a mesh's u16 index list from the LoD 0 index buffer
fn read_indices(file: &[u8], record: &StructuralRecord, mesh: &MeshRecord) -> Result<Vec<u32>> {
    let start = record.lods[0].index_data_offset.max(0) as usize
        + mesh.info.index_data_offset.max(0) as usize * 2;
    let count = mesh.info.index_count.max(0) as usize;
    if start + count * 2 > file.len() {
        return Err(MdlError::Truncated {
            what: "index buffer",
            offset: start,
            needed: count * 2,
            available: file.len().saturating_sub(start),
        });
    }
    let mut r = BinaryReader::at(file, start);
    (0..count).map(|_| Ok(r.read_u16()? as u32)).collect()
}

/// Part ranges relative to the mesh index list; a mesh without parts is one part
fn part_ranges(mesh: &MeshRecord) -> Vec<(Range<usize>, u32)> {
    let index_count = mesh.info.index_count.max(0) as usize;
    if mesh.parts.is_empty() {
        return vec![(0..index_count, 0)];
    }
    mesh.parts
        .iter()
        .map(|part| {
            let start = (part.index_offset - mesh.info.index_data_offset).max(0) as usize;
            let start = start.min(index_count);
            let end = (start + part.index_count.max(0) as usize).min(index_count);
            (start..end, part.attribute_bitmask)
        })
        .collect()
}

fn bitmask_names(mask: u32, attributes: &[String]) -> Vec<String> {
    attributes
        .iter()
        .enumerate()
        .filter(|(bit, _)| *bit < 32 && mask & (1 << bit) != 0)
        .map(|(_, name)| name.clone())
        .collect()
}

fn decode_mesh(file: &[u8], record: &StructuralRecord, mesh: &MeshRecord) -> Result<MeshGroup> {
    let info = &mesh.info;
    let layout = StreamLayout {
        base: record.lods[0].vertex_data_offset.max(0) as usize,
        offsets: info.vertex_offsets.map(|o| o.max(0) as u32),
        strides: info.entry_sizes,
    };
    let vertices = read_vertices(
        file,
        &layout,
        &mesh.declaration,
        info.vertex_count.max(0) as usize,
    )?;
    let indices = read_indices(file, record, mesh)?;

    let ranges = part_ranges(mesh);
    let mut parts = Vec::with_capacity(ranges.len());
    for (range, mask) in &ranges {
        let slice = &indices[range.clone()];
        let mut used: Vec<u32> = slice.to_vec();
        used.sort_unstable();
        used.dedup();
        let local: HashMap<u32, u32> = used
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i as u32))
            .collect();

        let mut part_vertices = Vec::with_capacity(used.len());
        for &id in &used {
            let vertex = vertices.get(id as usize).ok_or_else(|| {
                MdlError::Corrupt(format!(
                    "index {id} past the {} vertices of its mesh",
                    vertices.len()
                ))
            })?;
            part_vertices.push(*vertex);
        }

        parts.push(Part {
            attributes: bitmask_names(*mask, &record.paths.attributes),
            vertices: part_vertices,
            triangle_indices: slice.iter().map(|id| local[id]).collect(),
            shapes: Vec::new(),
        });
    }

    attach_shapes(record, mesh, &ranges, &vertices, &mut parts);

    let material = record
        .paths
        .materials
        .get(info.material_index.max(0) as usize)
        .cloned()
        .unwrap_or_default();
    let bones = record
        .bone_sets
        .get(info.bone_set_index.max(0) as usize)
        .map(|set| {
            set.indices
                .iter()
                .filter_map(|&i| record.paths.bones.get(i.max(0) as usize).cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(MeshGroup {
        material,
        bones,
        parts,
    })
}

/// Turn the mesh's shape entries into per-part deltas
fn attach_shapes(
    record: &StructuralRecord,
    mesh: &MeshRecord,
    ranges: &[(Range<usize>, u32)],
    vertices: &[Vertex],
    parts: &mut [Part],
) {
    for (shape_index, entries) in record.shape_entries_for(mesh.info.index_data_offset) {
        let Some(name) = record.paths.shapes.get(shape_index) else {
            tracing::warn!(shape = shape_index, "shape has no name; skipping");
            continue;
        };
        for entry in entries {
            let base = entry.base_index as usize;
            let Some(p) = ranges.iter().position(|(range, _)| range.contains(&base)) else {
                tracing::warn!(shape = %name, base, "shape entry outside every part; skipping");
                continue;
            };
            let Some(vertex) = vertices.get(entry.shape_vertex as usize) else {
                tracing::warn!(
                    shape = %name,
                    vertex = entry.shape_vertex,
                    "shape vertex past the mesh vertex buffer; skipping"
                );
                continue;
            };
            let delta = ShapeDelta {
                index: (base - ranges[p].0.start) as u32,
                vertex: *vertex,
            };
            let shapes = &mut parts[p].shapes;
            match shapes.iter_mut().find(|s| s.name == *name) {
                Some(shape) => shape.deltas.push(delta),
                None => shapes.push(ShapePart {
                    name: name.clone(),
                    deltas: vec![delta],
                }),
            }
        }
    }
}

impl Model {
    /// Build the geometry model for LoD 0 from a decoded record and the plain
    /// model file it was parsed from
    pub fn from_record(record: &StructuralRecord, file: &[u8]) -> Result<Self> {
        let meshes = record
            .primary_meshes()
            .iter()
            .map(|mesh| decode_mesh(file, record, mesh))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(meshes = meshes.len(), "decoded geometry model");
        Ok(Self { meshes })
    }
}
