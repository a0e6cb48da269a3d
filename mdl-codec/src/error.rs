//! Error types for container and model decoding/encoding

use std::io;

/// Errors produced by the model codec
#[derive(Debug, thiserror::Error)]
pub enum MdlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("content type {0} is not a model container")]
    NotModelContainer(u32),

    #[error("unsupported model version {0} (expected 5 or 6)")]
    UnsupportedVersion(u16),

    #[error("truncated {what}: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("corrupt chunk at offset {offset}: {reason}")]
    CorruptChunk { offset: usize, reason: String },

    #[error("corrupt model data: {0}")]
    Corrupt(String),

    #[error("unknown vertex data type 0x{0:02X}")]
    UnknownDataType(u8),

    #[error("unknown vertex usage 0x{0:02X}")]
    UnknownUsage(u8),

    #[error(
        "Mesh Group {mesh} has too many total vertices/triangle indices for shape data ({value} > 65535). \
         Remove some vertices, faces or shapes from this group"
    )]
    ShapeIndexOverflow { mesh: usize, value: usize },

    #[error("model uses {0} attributes, at most 32 fit in a part bitmask")]
    TooManyAttributes(usize),

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Result alias used throughout the codec
pub type Result<T> = std::result::Result<T, MdlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_overflow_names_mesh_group() {
        let err = MdlError::ShapeIndexOverflow {
            mesh: 3,
            value: 70_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("Mesh Group 3"));
        assert!(msg.contains("70000"));
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: MdlError = io_err.into();
        assert!(matches!(err, MdlError::Io(_)));
    }
}
