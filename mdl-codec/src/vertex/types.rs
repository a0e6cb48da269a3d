//! Vertex declaration types and the normalized vertex

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{MdlError, Result};
use crate::structure::MdlVersion;

/// Bytes reserved for one mesh's declaration in the vertex info region
pub const DECLARATION_SIZE: usize = 136;
/// Bytes per declaration entry
pub const ELEMENT_SIZE: usize = 8;
/// Block id that terminates a declaration
pub const END_OF_DECLARATION: u8 = 0xFF;
/// Number of vertex streams a mesh can reference
pub const MAX_STREAMS: usize = 3;

/// Wire encoding of one vertex channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexDataType {
    Float1,
    Float2,
    Float3,
    Float4,
    UByte4,
    Short2,
    Short4,
    UByte4n,
    Short2n,
    Short4n,
    Half2,
    Half4,
    /// Four weight bytes used by newer bone weight channels
    WeightBytes4,
}

impl VertexDataType {
    pub fn from_u8(code: u8) -> Result<Self> {
        Ok(match code {
            0x0 => Self::Float1,
            0x1 => Self::Float2,
            0x2 => Self::Float3,
            0x3 => Self::Float4,
            0x5 => Self::UByte4,
            0x6 => Self::Short2,
            0x7 => Self::Short4,
            0x8 => Self::UByte4n,
            0x9 => Self::Short2n,
            0xA => Self::Short4n,
            0xD | 0xF => Self::Half2,
            0xE | 0x10 => Self::Half4,
            0x11 => Self::WeightBytes4,
            other => return Err(MdlError::UnknownDataType(other)),
        })
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Float1 => 0x0,
            Self::Float2 => 0x1,
            Self::Float3 => 0x2,
            Self::Float4 => 0x3,
            Self::UByte4 => 0x5,
            Self::Short2 => 0x6,
            Self::Short4 => 0x7,
            Self::UByte4n => 0x8,
            Self::Short2n => 0x9,
            Self::Short4n => 0xA,
            Self::Half2 => 0xF,
            Self::Half4 => 0x10,
            Self::WeightBytes4 => 0x11,
        }
    }

    /// Size in bytes of one value of this type
    pub const fn size(self) -> usize {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::UByte4 | Self::UByte4n | Self::WeightBytes4 => 4,
            Self::Short2 | Self::Short2n => 4,
            Self::Short4 | Self::Short4n => 8,
            Self::Half2 => 4,
            Self::Half4 => 8,
        }
    }

    /// Number of components carried
    pub const fn components(self) -> usize {
        match self {
            Self::Float1 => 1,
            Self::Float2 | Self::Short2 | Self::Short2n | Self::Half2 => 2,
            Self::Float3 => 3,
            _ => 4,
        }
    }
}

/// Semantic of one vertex channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexUsage {
    Position,
    BoneWeight,
    BoneIndex,
    Normal,
    Uv,
    Tangent,
    Binormal,
    Color,
}

impl VertexUsage {
    pub fn from_u8(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Position,
            1 => Self::BoneWeight,
            2 => Self::BoneIndex,
            3 => Self::Normal,
            4 => Self::Uv,
            5 => Self::Tangent,
            6 => Self::Binormal,
            7 => Self::Color,
            other => return Err(MdlError::UnknownUsage(other)),
        })
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Position => 0,
            Self::BoneWeight => 1,
            Self::BoneIndex => 2,
            Self::Normal => 3,
            Self::Uv => 4,
            Self::Tangent => 5,
            Self::Binormal => 6,
            Self::Color => 7,
        }
    }
}

/// One entry of a vertex declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexElement {
    /// Stream the channel lives in
    pub block: u8,
    /// Byte offset inside one vertex of that stream
    pub offset: u8,
    pub data_type: VertexDataType,
    pub usage: VertexUsage,
}

impl VertexElement {
    pub const fn new(block: u8, offset: u8, data_type: VertexDataType, usage: VertexUsage) -> Self {
        Self {
            block,
            offset,
            data_type,
            usage,
        }
    }
}

/// Ordered channel list of one mesh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexDeclaration {
    pub elements: Vec<VertexElement>,
}

impl VertexDeclaration {
    /// Parse a declaration from its 136-byte slot
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(bytes);
        let mut elements = Vec::new();
        while reader.remaining() >= ELEMENT_SIZE {
            let block = reader.read_u8()?;
            if block == END_OF_DECLARATION {
                break;
            }
            let offset = reader.read_u8()?;
            let data_type = VertexDataType::from_u8(reader.read_u8()?)?;
            let usage = VertexUsage::from_u8(reader.read_u8()?)?;
            let _padding = reader.read_u32()?;

            if block as usize >= MAX_STREAMS {
                return Err(MdlError::Corrupt(format!(
                    "vertex element references stream {}",
                    block
                )));
            }
            elements.push(VertexElement::new(block, offset, data_type, usage));
        }
        Ok(Self { elements })
    }

    /// Serialize into a zero-padded 136-byte slot
    pub fn to_bytes(&self) -> [u8; DECLARATION_SIZE] {
        let mut w = BinaryWriter::with_capacity(DECLARATION_SIZE);
        // Leave room for the terminator
        for element in self.elements.iter().take(DECLARATION_SIZE / ELEMENT_SIZE - 1) {
            w.write_u8(element.block);
            w.write_u8(element.offset);
            w.write_u8(element.data_type.to_u8());
            w.write_u8(element.usage.to_u8());
            w.write_u32(0);
        }
        w.write_u8(END_OF_DECLARATION);

        let mut bytes = [0u8; DECLARATION_SIZE];
        bytes[..w.len()].copy_from_slice(w.as_slice());
        bytes
    }

    /// First element with the given usage
    pub fn element(&self, usage: VertexUsage) -> Option<&VertexElement> {
        self.elements.iter().find(|e| e.usage == usage)
    }

    pub fn has(&self, usage: VertexUsage) -> bool {
        self.element(usage).is_some()
    }

    /// Bytes per vertex in each stream
    pub fn strides(&self) -> [u8; MAX_STREAMS] {
        let mut strides = [0u8; MAX_STREAMS];
        for element in &self.elements {
            let end = element.offset as usize + element.data_type.size();
            if let Some(stride) = strides.get_mut(element.block as usize) {
                *stride = (*stride).max(end.min(u8::MAX as usize) as u8);
            }
        }
        strides
    }

    /// Number of streams in use (highest referenced stream + 1)
    pub fn stream_count(&self) -> u8 {
        self.elements
            .iter()
            .map(|e| e.block.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Declaration used when no donor declaration is available
    pub fn standard(version: MdlVersion) -> Self {
        use VertexDataType::*;
        use VertexUsage::*;
        Self {
            elements: vec![
                VertexElement::new(0, 0, Float3, Position),
                VertexElement::new(0, 12, version.bone_weight_type(), BoneWeight),
                VertexElement::new(0, 16, UByte4, BoneIndex),
                VertexElement::new(1, 0, Float3, Normal),
                VertexElement::new(1, 12, UByte4n, Binormal),
                VertexElement::new(1, 16, UByte4n, Color),
                VertexElement::new(1, 20, Float4, Uv),
            ],
        }
    }

    /// Upgrade channel encodings for writing and recompute every element offset.
    ///
    /// Position and normal become Float3, half UVs become float UVs, and bone
    /// weights take the version's weight type. Offsets are re-accumulated per
    /// stream in declaration order.
    pub fn upgraded(&self, version: MdlVersion) -> Self {
        let mut cursors = [0usize; MAX_STREAMS];
        let elements = self
            .elements
            .iter()
            .map(|element| {
                let data_type = match (element.usage, element.data_type) {
                    (VertexUsage::Position | VertexUsage::Normal, _) => VertexDataType::Float3,
                    (VertexUsage::Uv, VertexDataType::Half2) => VertexDataType::Float2,
                    (VertexUsage::Uv, VertexDataType::Half4) => VertexDataType::Float4,
                    (VertexUsage::BoneWeight, _) => version.bone_weight_type(),
                    (_, other) => other,
                };
                let cursor = &mut cursors[(element.block as usize).min(MAX_STREAMS - 1)];
                let offset = (*cursor).min(u8::MAX as usize) as u8;
                *cursor += data_type.size();
                VertexElement::new(element.block, offset, data_type, element.usage)
            })
            .collect();
        Self { elements }
    }
}

/// Normalized vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
    pub tangent: Vec3,
    /// Tangent frame is mirrored (binormal handedness byte 255)
    pub handedness: bool,
    /// RGBA
    pub color: [u8; 4],
    pub uv0: Vec2,
    pub uv1: Vec2,
    pub bone_weights: [f32; 4],
    pub bone_ids: [u8; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            binormal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            handedness: false,
            color: [255; 4],
            uv0: Vec2::ZERO,
            uv1: Vec2::ZERO,
            bone_weights: [0.0; 4],
            bone_ids: [0; 4],
        }
    }
}

impl Vertex {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}
