//! Channel quantizers
//!
//! Converts between in-memory float values and the packed wire encodings a
//! declaration can name.

use glam::{Vec3, Vec4};
use half::f16;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::Result;

use super::types::VertexDataType;

// ============================================================================
// Unit vectors (binormal / tangent bytes)
// ============================================================================

/// Map a component in [-1, 1] to a byte
pub fn encode_unit_byte(value: f32) -> u8 {
    ((value + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
}

/// Map a byte back to [-1, 1]
pub fn decode_unit_byte(byte: u8) -> f32 {
    byte as f32 * 2.0 / 255.0 - 1.0
}

/// Pack a direction and its handedness flag into four bytes.
///
/// Components are clamped to [-1, 1]; a mirrored frame stores 255 in the last byte.
pub fn encode_direction(v: Vec3, mirrored: bool) -> [u8; 4] {
    [
        encode_unit_byte(v.x),
        encode_unit_byte(v.y),
        encode_unit_byte(v.z),
        if mirrored { 255 } else { 0 },
    ]
}

pub fn decode_direction(bytes: [u8; 4]) -> (Vec3, bool) {
    let v = Vec3::new(
        decode_unit_byte(bytes[0]),
        decode_unit_byte(bytes[1]),
        decode_unit_byte(bytes[2]),
    );
    (v, bytes[3] == 255)
}

// ============================================================================
// Bone weights
// ============================================================================

pub fn encode_weight(weight: f32) -> u8 {
    (weight * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn decode_weight(byte: u8) -> f32 {
    byte as f32 / 255.0
}

// ============================================================================
// Colors (wire order A, R, G, B)
// ============================================================================

pub fn argb_to_rgba(argb: [u8; 4]) -> [u8; 4] {
    [argb[1], argb[2], argb[3], argb[0]]
}

pub fn rgba_to_argb(rgba: [u8; 4]) -> [u8; 4] {
    [rgba[3], rgba[0], rgba[1], rgba[2]]
}

// ============================================================================
// Generic components
// ============================================================================

/// Read one value of `data_type` as up to four floats.
///
/// Byte types come back unscaled (0-255) except the normalized ones, which
/// are divided by 255. Missing components are zero.
pub fn read_components(reader: &mut BinaryReader, data_type: VertexDataType) -> Result<Vec4> {
    let mut out = [0.0f32; 4];
    let n = data_type.components();
    match data_type {
        VertexDataType::Float1
        | VertexDataType::Float2
        | VertexDataType::Float3
        | VertexDataType::Float4 => {
            for c in out.iter_mut().take(n) {
                *c = reader.read_f32()?;
            }
        }
        VertexDataType::Half2 | VertexDataType::Half4 => {
            for c in out.iter_mut().take(n) {
                *c = f16::from_bits(reader.read_u16()?).to_f32();
            }
        }
        VertexDataType::Short2 | VertexDataType::Short4 => {
            for c in out.iter_mut().take(n) {
                *c = reader.read_i16()? as f32;
            }
        }
        VertexDataType::Short2n | VertexDataType::Short4n => {
            for c in out.iter_mut().take(n) {
                *c = reader.read_i16()? as f32 / i16::MAX as f32;
            }
        }
        VertexDataType::UByte4 => {
            for c in out.iter_mut() {
                *c = reader.read_u8()? as f32;
            }
        }
        VertexDataType::UByte4n | VertexDataType::WeightBytes4 => {
            for c in out.iter_mut() {
                *c = decode_weight(reader.read_u8()?);
            }
        }
    }
    Ok(Vec4::from_array(out))
}

/// Write up to four floats as one value of `data_type`; the inverse of [`read_components`].
pub fn write_components(writer: &mut BinaryWriter, data_type: VertexDataType, value: Vec4) {
    let values = value.to_array();
    let n = data_type.components();
    match data_type {
        VertexDataType::Float1
        | VertexDataType::Float2
        | VertexDataType::Float3
        | VertexDataType::Float4 => {
            for &c in values.iter().take(n) {
                writer.write_f32(c);
            }
        }
        VertexDataType::Half2 | VertexDataType::Half4 => {
            for &c in values.iter().take(n) {
                writer.write_u16(f16::from_f32(c).to_bits());
            }
        }
        VertexDataType::Short2 | VertexDataType::Short4 => {
            for &c in values.iter().take(n) {
                writer.write_i16(c.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16);
            }
        }
        VertexDataType::Short2n | VertexDataType::Short4n => {
            for &c in values.iter().take(n) {
                writer.write_i16((c.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16);
            }
        }
        VertexDataType::UByte4 => {
            for &c in &values {
                writer.write_u8(c.round().clamp(0.0, 255.0) as u8);
            }
        }
        VertexDataType::UByte4n | VertexDataType::WeightBytes4 => {
            for &c in &values {
                writer.write_u8(encode_weight(c));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_weight_quantization() {
        assert_eq!(decode_weight(255), 1.0);
        assert!((decode_weight(128) - 128.0 / 255.0).abs() < 1e-6);
        assert!((decode_weight(128) - 0.502).abs() < 1e-3);
        assert_eq!(encode_weight(1.0), 255);
        assert_eq!(encode_weight(0.0), 0);
        assert_eq!(encode_weight(0.5), 128);
    }

    #[test]
    fn test_unit_byte_endpoints() {
        assert_eq!(encode_unit_byte(-1.0), 0);
        assert_eq!(encode_unit_byte(1.0), 255);
        assert_eq!(encode_unit_byte(0.0), 128);
        assert_eq!(decode_unit_byte(0), -1.0);
        assert_eq!(decode_unit_byte(255), 1.0);
    }

    #[test]
    fn test_direction_handedness() {
        let bytes = encode_direction(Vec3::new(0.0, 0.0, 2.0), true);
        assert_eq!(bytes, [128, 128, 255, 255]);
        let (v, mirrored) = decode_direction(bytes);
        assert!(mirrored);
        assert!((v.z - 1.0).abs() < 1e-6);

        let bytes = encode_direction(Vec3::X, false);
        assert_eq!(bytes[3], 0);
    }

    #[test]
    fn test_color_order() {
        let rgba = [10, 20, 30, 40];
        let argb = rgba_to_argb(rgba);
        assert_eq!(argb, [40, 10, 20, 30]);
        assert_eq!(argb_to_rgba(argb), rgba);
    }

    #[test]
    fn test_half_components() {
        let mut w = BinaryWriter::new();
        write_components(&mut w, VertexDataType::Half4, Vec4::new(0.5, -2.0, 1.0, 1.0));
        assert_eq!(w.len(), 8);
        let bytes = w.into_inner();
        let mut r = BinaryReader::new(&bytes);
        let v = read_components(&mut r, VertexDataType::Half4).unwrap();
        assert_eq!(v, Vec4::new(0.5, -2.0, 1.0, 1.0));
    }

    #[test]
    fn test_float3_leaves_w_zero() {
        let mut w = BinaryWriter::new();
        write_components(&mut w, VertexDataType::Float3, Vec4::new(1.0, 2.0, 3.0, 9.0));
        assert_eq!(w.len(), 12);
        let bytes = w.into_inner();
        let v = read_components(&mut BinaryReader::new(&bytes), VertexDataType::Float3).unwrap();
        assert_eq!(v, Vec4::new(1.0, 2.0, 3.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_weight_byte_is_stable(byte in any::<u8>()) {
            prop_assert_eq!(encode_weight(decode_weight(byte)), byte);
        }

        #[test]
        fn prop_unit_byte_is_stable(byte in any::<u8>()) {
            prop_assert_eq!(encode_unit_byte(decode_unit_byte(byte)), byte);
        }
    }
}
