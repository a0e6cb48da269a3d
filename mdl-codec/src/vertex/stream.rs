//! Vertex stream read/write
//!
//! A mesh keeps up to three interleaved streams. Element `e` of vertex `i` sits at
//! `base + offsets[e.block] + e.offset + strides[e.block] * i`.

use glam::{Vec2, Vec4};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{MdlError, Result};

use super::encoding::{
    argb_to_rgba, decode_direction, decode_weight, encode_direction, encode_weight,
    read_components, rgba_to_argb, write_components,
};
use super::types::{
    MAX_STREAMS, Vertex, VertexDataType, VertexDeclaration, VertexElement, VertexUsage,
};

/// Where a mesh's streams live inside a vertex buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamLayout {
    /// Start of the LoD's vertex buffer
    pub base: usize,
    /// Per-stream offset of this mesh relative to `base`
    pub offsets: [u32; MAX_STREAMS],
    pub strides: [u8; MAX_STREAMS],
}

/// Which vertex field an element feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Position,
    Normal,
    Binormal,
    Tangent,
    Color,
    Uv,
    SecondUv,
    Weights,
    Indices,
}

/// First element per usage, plus a second UV element when present
fn plan(decl: &VertexDeclaration) -> Vec<(VertexElement, Target)> {
    let mut seen: Vec<VertexUsage> = Vec::new();
    let mut plan = Vec::with_capacity(decl.elements.len());
    for element in &decl.elements {
        if element.block as usize >= MAX_STREAMS {
            continue;
        }
        let repeat = seen.contains(&element.usage);
        let target = match (element.usage, repeat) {
            (VertexUsage::Position, false) => Target::Position,
            (VertexUsage::Normal, false) => Target::Normal,
            (VertexUsage::Binormal, false) => Target::Binormal,
            (VertexUsage::Tangent, false) => Target::Tangent,
            (VertexUsage::Color, false) => Target::Color,
            (VertexUsage::Uv, false) => Target::Uv,
            (VertexUsage::Uv, true) if !plan.iter().any(|(_, t)| *t == Target::SecondUv) => {
                Target::SecondUv
            }
            (VertexUsage::BoneWeight, false) => Target::Weights,
            (VertexUsage::BoneIndex, false) => Target::Indices,
            _ => continue,
        };
        seen.push(element.usage);
        plan.push((*element, target));
    }
    plan
}

fn is_byte_type(data_type: VertexDataType) -> bool {
    matches!(
        data_type,
        VertexDataType::UByte4 | VertexDataType::UByte4n | VertexDataType::WeightBytes4
    )
}

fn raw_bytes(reader: &mut BinaryReader) -> Result<[u8; 4]> {
    Ok([
        reader.read_u8()?,
        reader.read_u8()?,
        reader.read_u8()?,
        reader.read_u8()?,
    ])
}

/// Check that every planned element of the last vertex lies inside `data`.
///
/// Runs before anything is allocated, so a garbage vertex count fails here.
fn check_extent(
    data: &[u8],
    layout: &StreamLayout,
    plan: &[(VertexElement, Target)],
    count: usize,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    if plan.is_empty() {
        return Err(MdlError::Corrupt(format!(
            "{count} vertices declared without any vertex element"
        )));
    }
    for (element, _) in plan {
        let block = element.block as usize;
        let stride = layout.strides[block] as usize;
        let size = element.data_type.size();
        if element.offset as usize + size > stride {
            return Err(MdlError::Corrupt(format!(
                "{:?} element at offset {} overruns a {stride}-byte stride",
                element.usage, element.offset
            )));
        }
        let start = layout.base + layout.offsets[block] as usize + element.offset as usize;
        let end = (count - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(start + size));
        if !matches!(end, Some(end) if end <= data.len()) {
            return Err(MdlError::Truncated {
                what: "vertex stream",
                offset: start,
                needed: count.saturating_mul(stride),
                available: data.len().saturating_sub(start),
            });
        }
    }
    Ok(())
}

/// Decode `count` vertices described by `decl` from `data`
pub fn read_vertices(
    data: &[u8],
    layout: &StreamLayout,
    decl: &VertexDeclaration,
    count: usize,
) -> Result<Vec<Vertex>> {
    let plan = plan(decl);
    check_extent(data, layout, &plan, count)?;
    let mut vertices = Vec::with_capacity(count);

    for i in 0..count {
        let mut vertex = Vertex::default();
        for (element, target) in &plan {
            let block = element.block as usize;
            let pos = layout.base
                + layout.offsets[block] as usize
                + element.offset as usize
                + layout.strides[block] as usize * i;
            let mut reader = BinaryReader::at(data, pos);

            match target {
                Target::Position => {
                    vertex.position = read_components(&mut reader, element.data_type)?.truncate();
                }
                Target::Normal => {
                    vertex.normal = read_components(&mut reader, element.data_type)?.truncate();
                }
                Target::Binormal if is_byte_type(element.data_type) => {
                    let (v, mirrored) = decode_direction(raw_bytes(&mut reader)?);
                    vertex.binormal = v;
                    vertex.handedness = mirrored;
                }
                Target::Binormal => {
                    let v = read_components(&mut reader, element.data_type)?;
                    vertex.binormal = v.truncate();
                    vertex.handedness = v.w < 0.0;
                }
                Target::Tangent if is_byte_type(element.data_type) => {
                    vertex.tangent = decode_direction(raw_bytes(&mut reader)?).0;
                }
                Target::Tangent => {
                    vertex.tangent = read_components(&mut reader, element.data_type)?.truncate();
                }
                Target::Color if is_byte_type(element.data_type) => {
                    vertex.color = argb_to_rgba(raw_bytes(&mut reader)?);
                }
                Target::Color => {
                    let c = read_components(&mut reader, element.data_type)?;
                    let c = (c * 255.0).round().clamp(Vec4::ZERO, Vec4::splat(255.0));
                    vertex.color = c.to_array().map(|x| x as u8);
                }
                Target::Uv => {
                    let uv = read_components(&mut reader, element.data_type)?;
                    vertex.uv0 = Vec2::new(uv.x, uv.y);
                    if element.data_type.components() == 4 {
                        vertex.uv1 = Vec2::new(uv.z, uv.w);
                    }
                }
                Target::SecondUv => {
                    let uv = read_components(&mut reader, element.data_type)?;
                    vertex.uv1 = Vec2::new(uv.x, uv.y);
                }
                Target::Weights if is_byte_type(element.data_type) => {
                    vertex.bone_weights = raw_bytes(&mut reader)?.map(decode_weight);
                }
                Target::Weights => {
                    vertex.bone_weights = read_components(&mut reader, element.data_type)?.to_array();
                }
                Target::Indices if is_byte_type(element.data_type) => {
                    vertex.bone_ids = raw_bytes(&mut reader)?;
                }
                Target::Indices => {
                    let ids = read_components(&mut reader, element.data_type)?;
                    vertex.bone_ids = ids.to_array().map(|x| x.clamp(0.0, 255.0) as u8);
                }
            }
        }
        vertices.push(vertex);
    }

    Ok(vertices)
}

fn encode_element(element: &VertexElement, target: Target, vertex: &Vertex) -> Vec<u8> {
    let mut w = BinaryWriter::with_capacity(element.data_type.size());
    let data_type = element.data_type;
    match target {
        Target::Position => {
            // Half positions carry an unused w of 1
            write_components(&mut w, data_type, vertex.position.extend(1.0));
        }
        Target::Normal => write_components(&mut w, data_type, vertex.normal.extend(0.0)),
        Target::Binormal if is_byte_type(data_type) => {
            w.write_bytes(&encode_direction(vertex.binormal, vertex.handedness));
        }
        Target::Binormal => {
            let sign = if vertex.handedness { -1.0 } else { 1.0 };
            write_components(&mut w, data_type, vertex.binormal.extend(sign));
        }
        // The tangent frame is stored with the opposite handedness flag
        Target::Tangent if is_byte_type(data_type) => {
            w.write_bytes(&encode_direction(vertex.tangent, !vertex.handedness));
        }
        Target::Tangent => write_components(&mut w, data_type, vertex.tangent.extend(0.0)),
        Target::Color if is_byte_type(data_type) => w.write_bytes(&rgba_to_argb(vertex.color)),
        Target::Color => {
            let c = Vec4::from_array(vertex.color.map(|x| x as f32)) / 255.0;
            write_components(&mut w, data_type, c);
        }
        Target::Uv => {
            let uv = Vec4::new(vertex.uv0.x, vertex.uv0.y, vertex.uv1.x, vertex.uv1.y);
            write_components(&mut w, data_type, uv);
        }
        Target::SecondUv => {
            let uv = Vec4::new(vertex.uv1.x, vertex.uv1.y, 0.0, 0.0);
            write_components(&mut w, data_type, uv);
        }
        Target::Weights if is_byte_type(data_type) => {
            w.write_bytes(&vertex.bone_weights.map(encode_weight));
        }
        Target::Weights => {
            write_components(&mut w, data_type, Vec4::from_array(vertex.bone_weights));
        }
        Target::Indices if is_byte_type(data_type) => w.write_bytes(&vertex.bone_ids),
        Target::Indices => {
            let ids = Vec4::from_array(vertex.bone_ids.map(|x| x as f32));
            write_components(&mut w, data_type, ids);
        }
    }
    w.into_inner()
}

/// Encode `vertices` into one buffer per stream using `decl`.
///
/// Each buffer is `vertices.len() * stride` bytes; unused streams stay empty.
pub fn write_vertices(vertices: &[Vertex], decl: &VertexDeclaration) -> [Vec<u8>; MAX_STREAMS] {
    let strides = decl.strides();
    let plan = plan(decl);
    let mut streams: [Vec<u8>; MAX_STREAMS] =
        strides.map(|stride| vec![0u8; stride as usize * vertices.len()]);

    for (i, vertex) in vertices.iter().enumerate() {
        for (element, target) in &plan {
            let Some(stream) = streams.get_mut(element.block as usize) else {
                continue;
            };
            let start = strides[element.block as usize] as usize * i + element.offset as usize;
            let bytes = encode_element(element, *target, vertex);
            if let Some(dst) = stream.get_mut(start..start + bytes.len()) {
                dst.copy_from_slice(&bytes);
            }
        }
    }

    streams
}

/// Bytes one vertex occupies across all streams
pub fn vertex_size(decl: &VertexDeclaration) -> usize {
    decl.strides().iter().map(|&s| s as usize).sum()
}
