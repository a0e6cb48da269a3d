//! Geometry model
//!
//! Storage-independent mesh representation handed to calling code. Meshes own
//! parts, parts own their vertices and triangle indices. Model-level name
//! lists (materials, bones, attributes, shapes) are derived on demand in first
//! appearance order, so editing a part never leaves a stale table behind.

mod decode;

use glam::Vec3;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{MdlError, Result};
use crate::structure::{BoneSet, SHAPE_PREFIX};
use crate::vertex::Vertex;

/// Most attributes a part bitmask can address
pub const MAX_ATTRIBUTES: usize = 32;

/// Whole model: LoD 0 meshes only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub meshes: Vec<MeshGroup>,
}

/// One renderable mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGroup {
    pub material: String,
    /// Bones this mesh's vertex bone ids index into
    pub bones: Vec<String>,
    pub parts: Vec<Part>,
}

/// Sub-range of a mesh with its own attribute set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub attributes: Vec<String>,
    pub vertices: Vec<Vertex>,
    /// Triangle list, indexing `vertices`
    pub triangle_indices: Vec<u32>,
    pub shapes: Vec<ShapePart>,
}

/// A shape key's contribution to one part
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapePart {
    pub name: String,
    pub deltas: Vec<ShapeDelta>,
}

/// While the shape is active, triangle index position `index` uses `vertex`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeDelta {
    pub index: u32,
    pub vertex: Vertex,
}

/// Encoder-ready shape data for one (shape, mesh) pair
#[derive(Debug, Clone, PartialEq)]
pub struct RawShapePart {
    pub mesh: usize,
    /// Index into [`Model::shape_names`]
    pub shape: usize,
    /// `(mesh index list position, mesh vertex id)` per replaced index
    pub replacements: Vec<(u32, u32)>,
    /// Shape vertices, in the order their ids were assigned
    pub vertices: Vec<Vertex>,
}

/// Push every name not seen before
fn collect_unique<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if seen.insert(name.as_str()) {
            out.push(name.clone());
        }
    }
    out
}

impl MeshGroup {
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.parts.iter().map(|p| p.triangle_indices.len()).sum()
    }

    /// All part vertices, concatenated in part order
    pub fn vertices(&self) -> Vec<Vertex> {
        let mut out = Vec::with_capacity(self.vertex_count());
        for part in &self.parts {
            out.extend_from_slice(&part.vertices);
        }
        out
    }

    /// Triangle indices rebased onto [`MeshGroup::vertices`]
    ///
    /// Every index must address a vertex of its own part, and the rebased
    /// value must fit the 16-bit index buffer.
    pub fn indices(&self) -> Result<Vec<u16>> {
        let mut out = Vec::with_capacity(self.index_count());
        let mut base = 0usize;
        for (p, part) in self.parts.iter().enumerate() {
            let vertex_count = part.vertices.len();
            for &index in &part.triangle_indices {
                let local = index as usize;
                if local >= vertex_count {
                    return Err(MdlError::InvalidModel(format!(
                        "part {p} index {index} is past its {vertex_count} vertices"
                    )));
                }
                let rebased = base
                    .checked_add(local)
                    .and_then(|i| u16::try_from(i).ok())
                    .ok_or_else(|| {
                        MdlError::InvalidModel(format!(
                            "part {p} index {index} does not fit a 16-bit index buffer"
                        ))
                    })?;
                out.push(rebased);
            }
            base += vertex_count;
        }
        Ok(out)
    }

    /// Position of each part's first index in the mesh index list
    pub fn part_index_starts(&self) -> Vec<u32> {
        let mut starts = Vec::with_capacity(self.parts.len());
        let mut running = 0u32;
        for part in &self.parts {
            starts.push(running);
            running += part.triangle_indices.len() as u32;
        }
        starts
    }
}

impl Model {
    pub fn materials(&self) -> Vec<String> {
        collect_unique(self.meshes.iter().map(|m| &m.material))
    }

    pub fn bones(&self) -> Vec<String> {
        collect_unique(self.meshes.iter().flat_map(|m| &m.bones))
    }

    pub fn attributes(&self) -> Vec<String> {
        collect_unique(
            self.meshes
                .iter()
                .flat_map(|m| &m.parts)
                .flat_map(|p| &p.attributes),
        )
    }

    /// Shape names that can be written (prefixed with `shp_`)
    pub fn shape_names(&self) -> Vec<String> {
        collect_unique(
            self.meshes
                .iter()
                .flat_map(|m| &m.parts)
                .flat_map(|p| &p.shapes)
                .filter(|s| s.name.starts_with(SHAPE_PREFIX) && !s.deltas.is_empty())
                .map(|s| &s.name),
        )
    }

    pub fn has_shapes(&self) -> bool {
        !self.shape_names().is_empty()
    }

    /// Index of mesh `mesh`'s material in [`Model::materials`]
    pub fn material_index(&self, mesh: usize) -> usize {
        let Some(group) = self.meshes.get(mesh) else {
            return 0;
        };
        self.materials()
            .iter()
            .position(|m| *m == group.material)
            .unwrap_or(0)
    }

    /// Bit `i` is set when the part uses attribute `i` of [`Model::attributes`]
    pub fn attribute_bitmask(&self, mesh: usize, part: usize) -> Result<u32> {
        let attributes = self.attributes();
        if attributes.len() > MAX_ATTRIBUTES {
            return Err(MdlError::TooManyAttributes(attributes.len()));
        }
        let Some(part) = self.meshes.get(mesh).and_then(|m| m.parts.get(part)) else {
            return Ok(0);
        };
        Ok(part
            .attributes
            .iter()
            .filter_map(|a| attributes.iter().position(|x| x == a))
            .fold(0, |mask, bit| mask | (1u32 << bit)))
    }

    /// Model-level bone indices of mesh `mesh`'s bone list
    pub fn bone_set(&self, mesh: usize) -> BoneSet {
        let bones = self.bones();
        let indices = self
            .meshes
            .get(mesh)
            .map(|m| {
                m.bones
                    .iter()
                    .filter_map(|b| bones.iter().position(|x| x == b))
                    .map(|i| i as i16)
                    .collect()
            })
            .unwrap_or_default();
        BoneSet { indices }
    }

    /// Shape data grouped by shape, then mesh.
    ///
    /// Shape vertex ids start after each mesh's ordinary vertices and keep
    /// counting across shapes, so appending every part's `vertices` in the
    /// returned order reproduces the ids.
    pub fn raw_shape_parts(&self) -> Result<Vec<RawShapePart>> {
        let names = self.shape_names();
        let mut next_vertex: Vec<u32> = self
            .meshes
            .iter()
            .map(|m| m.vertex_count() as u32)
            .collect();
        let mut out = Vec::new();

        for (shape, name) in names.iter().enumerate() {
            for (m, mesh) in self.meshes.iter().enumerate() {
                let starts = mesh.part_index_starts();
                let mut raw = RawShapePart {
                    mesh: m,
                    shape,
                    replacements: Vec::new(),
                    vertices: Vec::new(),
                };
                for (p, part) in mesh.parts.iter().enumerate() {
                    for shape_part in part.shapes.iter().filter(|s| s.name == *name) {
                        for delta in &shape_part.deltas {
                            if delta.index as usize >= part.triangle_indices.len() {
                                return Err(MdlError::InvalidModel(format!(
                                    "shape {name} in mesh {m} part {p} replaces index {} of {}",
                                    delta.index,
                                    part.triangle_indices.len()
                                )));
                            }
                            raw.replacements
                                .push((starts[p] + delta.index, next_vertex[m]));
                            raw.vertices.push(delta.vertex);
                            next_vertex[m] += 1;
                        }
                    }
                }
                if !raw.replacements.is_empty() {
                    out.push(raw);
                }
            }
        }
        Ok(out)
    }

    /// Min/max over every vertex position, shape vertices included
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let positions = self
            .meshes
            .iter()
            .flat_map(|m| &m.parts)
            .flat_map(|p| {
                p.vertices
                    .iter()
                    .map(|v| v.position)
                    .chain(p.shapes.iter().flat_map(|s| s.deltas.iter().map(|d| d.vertex.position)))
            });
        positions.fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((min, max)) => Some((min.min(p), max.max(p))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f32) -> Part {
        Part {
            attributes: Vec::new(),
            vertices: vec![
                Vertex::at(Vec3::new(offset, 0.0, 0.0)),
                Vertex::at(Vec3::new(offset + 1.0, 0.0, 0.0)),
                Vertex::at(Vec3::new(offset, 1.0, 0.0)),
            ],
            triangle_indices: vec![0, 1, 2],
            shapes: Vec::new(),
        }
    }

    fn sample() -> Model {
        let mut first = triangle(0.0);
        first.attributes = vec!["atr_a".into()];
        let mut second = triangle(5.0);
        second.attributes = vec!["atr_b".into(), "atr_a".into()];
        second.shapes.push(ShapePart {
            name: "shp_a".into(),
            deltas: vec![ShapeDelta {
                index: 1,
                vertex: Vertex::at(Vec3::new(6.0, -2.0, 0.0)),
            }],
        });
        Model {
            meshes: vec![
                MeshGroup {
                    material: "/mt_a.mtrl".into(),
                    bones: vec!["j_kosi".into()],
                    parts: vec![first, second],
                },
                MeshGroup {
                    material: "/mt_b.mtrl".into(),
                    bones: vec!["j_sebo".into(), "j_kosi".into()],
                    parts: vec![triangle(-3.0)],
                },
            ],
        }
    }

    #[test]
    fn test_derived_lists() {
        let model = sample();
        assert_eq!(model.materials(), vec!["/mt_a.mtrl", "/mt_b.mtrl"]);
        assert_eq!(model.bones(), vec!["j_kosi", "j_sebo"]);
        assert_eq!(model.attributes(), vec!["atr_a", "atr_b"]);
        assert_eq!(model.shape_names(), vec!["shp_a"]);
        assert_eq!(model.material_index(1), 1);
    }

    #[test]
    fn test_attribute_bitmask() {
        let model = sample();
        assert_eq!(model.attribute_bitmask(0, 0).unwrap(), 0b01);
        assert_eq!(model.attribute_bitmask(0, 1).unwrap(), 0b11);
        assert_eq!(model.attribute_bitmask(1, 0).unwrap(), 0);
    }

    #[test]
    fn test_too_many_attributes() {
        let mut model = sample();
        model.meshes[1].parts[0].attributes = (0..31).map(|i| format!("atr_{i}")).collect();
        assert!(matches!(
            model.attribute_bitmask(0, 0),
            Err(MdlError::TooManyAttributes(33))
        ));
    }

    #[test]
    fn test_bone_set_uses_model_indices() {
        let model = sample();
        assert_eq!(model.bone_set(1).indices, vec![1, 0]);
    }

    #[test]
    fn test_mesh_indices_are_rebased() {
        let model = sample();
        assert_eq!(model.meshes[0].indices().unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(model.meshes[0].part_index_starts(), vec![0, 3]);
    }

    #[test]
    fn test_mesh_indices_stay_inside_their_part() {
        let mut model = sample();
        // Index 3 would land on the next part's first vertex
        model.meshes[0].parts[0].triangle_indices = vec![0, 1, 3];
        assert!(matches!(
            model.meshes[0].indices(),
            Err(MdlError::InvalidModel(_))
        ));

        model.meshes[0].parts[0].triangle_indices = vec![0, 1, 70000];
        assert!(matches!(
            model.meshes[0].indices(),
            Err(MdlError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_raw_shape_parts() {
        let raw = sample().raw_shape_parts().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].mesh, 0);
        // Second part starts at mesh index 3; the shape vertex follows 6 ordinary ones
        assert_eq!(raw[0].replacements, vec![(4, 6)]);
        assert_eq!(raw[0].vertices.len(), 1);
    }

    #[test]
    fn test_shape_delta_out_of_range() {
        let mut model = sample();
        model.meshes[0].parts[1].shapes[0].deltas[0].index = 3;
        assert!(model.raw_shape_parts().is_err());
    }

    #[test]
    fn test_unprefixed_shapes_are_not_written() {
        let mut model = sample();
        model.meshes[0].parts[1].shapes[0].name = "morph".into();
        assert!(!model.has_shapes());
        assert!(model.raw_shape_parts().unwrap().is_empty());
    }

    #[test]
    fn test_bounding_box() {
        let (min, max) = sample().bounding_box().unwrap();
        assert_eq!(min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(max, Vec3::new(6.0, 1.0, 0.0));
        assert!(Model::default().bounding_box().is_none());
    }

    #[test]
    fn test_json_export_shape() {
        let model = sample();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"triangle_indices\":[0,1,2]"));
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
