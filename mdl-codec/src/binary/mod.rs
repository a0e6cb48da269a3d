//! Little-endian binary reader and writer
//!
//! Every structure in the container and the model file is little-endian.
//! The reader works over an in-memory slice so the decoder can seek freely
//! between the declaration region, the model data and the vertex buffers.

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Round `value` up to the next multiple of `align`
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 128), 0);
        assert_eq!(align_up(1, 128), 128);
        assert_eq!(align_up(128, 128), 128);
        assert_eq!(align_up(129, 128), 256);
        assert_eq!(align_up(6, 8), 8);
    }

    #[test]
    fn test_writer_reader_roundtrip() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0xAB);
        writer.write_i16(-2);
        writer.write_u32(0xDEAD_BEEF);
        writer.write_f32(1.5);
        writer.write_cstr("shp_test");

        let bytes = writer.into_inner();
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_cstr().unwrap(), "shp_test");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let bytes = [1u8, 2, 3];
        let mut reader = BinaryReader::new(&bytes);
        assert!(reader.read_u32().is_err());

        let mut reader = BinaryReader::new(&bytes);
        assert!(reader.read_bytes(4, "test block").is_err());
    }
}
