//! `inspect` report

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use mdl_codec::{DecodeOptions, decode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSummary {
    pub material: String,
    pub parts: usize,
    pub vertices: usize,
    pub indices: usize,
    pub bones: usize,
    pub shapes: Vec<String>,
}

/// Counts and per-mesh details of one model container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub version: u16,
    pub container_bytes: usize,
    pub materials: Vec<String>,
    pub bones: Vec<String>,
    pub attributes: Vec<String>,
    pub shapes: Vec<String>,
    pub extra_paths: Vec<String>,
    pub meshes: Vec<MeshSummary>,
}

pub fn inspect(path: &Path) -> Result<ModelSummary> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read model: {}", path.display()))?;
    let decoded = decode(&bytes, &DecodeOptions::default())
        .with_context(|| format!("Failed to decode model: {}", path.display()))?;

    let meshes = decoded
        .model
        .meshes
        .iter()
        .map(|mesh| {
            let mut shapes: Vec<String> = Vec::new();
            for shape in mesh.parts.iter().flat_map(|p| &p.shapes) {
                if !shapes.contains(&shape.name) {
                    shapes.push(shape.name.clone());
                }
            }
            MeshSummary {
                material: mesh.material.clone(),
                parts: mesh.parts.len(),
                vertices: mesh.vertex_count(),
                indices: mesh.index_count(),
                bones: mesh.bones.len(),
                shapes,
            }
        })
        .collect();

    let paths = &decoded.record.paths;
    Ok(ModelSummary {
        version: decoded.record.version.to_raw(),
        container_bytes: bytes.len(),
        materials: paths.materials.clone(),
        bones: paths.bones.clone(),
        attributes: paths.attributes.clone(),
        shapes: paths.shapes.clone(),
        extra_paths: paths.extras.clone(),
        meshes,
    })
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:    {}", self.version)?;
        writeln!(f, "size:       {} bytes", self.container_bytes)?;
        writeln!(f, "materials:  {}", self.materials.len())?;
        for name in &self.materials {
            writeln!(f, "  {name}")?;
        }
        writeln!(f, "bones:      {}", self.bones.len())?;
        writeln!(f, "attributes: {}", self.attributes.join(", "))?;
        writeln!(f, "shapes:     {}", self.shapes.join(", "))?;
        if !self.extra_paths.is_empty() {
            writeln!(f, "extra:      {}", self.extra_paths.join(", "))?;
        }
        writeln!(f, "meshes:     {}", self.meshes.len())?;
        for (i, mesh) in self.meshes.iter().enumerate() {
            writeln!(
                f,
                "  [{i}] {} parts, {} vertices, {} indices, {} bones, material {}",
                mesh.parts, mesh.vertices, mesh.indices, mesh.bones, mesh.material
            )?;
            if !mesh.shapes.is_empty() {
                writeln!(f, "      shapes: {}", mesh.shapes.join(", "))?;
            }
        }
        Ok(())
    }
}
