//! Vertex stream codec
//!
//! Converts between packed per-vertex byte layouts described by a
//! [`VertexDeclaration`] and the normalized [`Vertex`].

mod encoding;
mod stream;
mod types;

pub use encoding::{
    argb_to_rgba, decode_direction, decode_unit_byte, decode_weight, encode_direction,
    encode_unit_byte, encode_weight, rgba_to_argb,
};
pub use stream::{StreamLayout, read_vertices, vertex_size, write_vertices};
pub use types::{
    DECLARATION_SIZE, ELEMENT_SIZE, END_OF_DECLARATION, MAX_STREAMS, Vertex, VertexDataType,
    VertexDeclaration, VertexElement, VertexUsage,
};
