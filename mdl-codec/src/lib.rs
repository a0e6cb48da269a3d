//! mdl-codec: reader and writer for chunk-compressed model containers
//!
//! A container holds a 3D model as eight independently deflated regions:
//! vertex declarations, model data, and a vertex and index buffer for each of
//! three levels of detail. Many fields in the model data have no known meaning
//! and must survive a rewrite, so encoding always works from a donor record
//! decoded from an existing file (or [`StructuralRecord::blank`]).
//!
//! # Modules
//!
//! - [`transport`] - chunk framing, container header, region (re)assembly
//! - [`structure`] - model data decoder and section-ledger encoder
//! - [`vertex`] - vertex declarations and stream packing
//! - [`model`] - editable geometry model
//! - [`materials`] - material names and variant path resolution
//! - [`storage`] - storage seam with "missing means no data" loading
//!
//! # Usage
//!
//! ```ignore
//! use mdl_codec::{CodecConfig, DecodeOptions, decode, encode};
//!
//! let bytes = std::fs::read("c0101e0100_top.mdl")?;
//! let decoded = decode(&bytes, &DecodeOptions::default())?;
//! let mut model = decoded.model;
//! model.meshes[0].material = "/mt_c0101e0100_top_b.mtrl".into();
//! let rewritten = encode(&model, &decoded.record, &CodecConfig::default())?;
//! ```

pub mod binary;
mod codec;
mod config;
mod error;
pub mod materials;
pub mod model;
pub mod storage;
pub mod structure;
pub mod transport;
pub mod vertex;

pub use codec::{DecodedModel, decode, decode_file, encode};
pub use config::{CodecConfig, DecodeOptions};
pub use error::{MdlError, Result};
pub use materials::{
    MaterialVariant, material_path, referenced_material_names, referenced_material_paths,
};
pub use model::{MeshGroup, Model, Part, RawShapePart, ShapeDelta, ShapePart};
pub use storage::{MemoryStorage, ModelStorage, load_model, referenced_materials, save_model};
pub use structure::{MdlVersion, StructuralRecord};
pub use vertex::Vertex;
