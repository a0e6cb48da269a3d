//! Container <-> geometry model

use crate::config::{CodecConfig, DecodeOptions};
use crate::error::Result;
use crate::model::Model;
use crate::structure::{StructuralRecord, encode_model};
use crate::transport;

/// Everything a decode produces
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedModel {
    pub model: Model,
    /// Donor for a later encode
    pub record: StructuralRecord,
    /// Material names, in path table order
    pub materials: Vec<String>,
}

/// Decode a compressed model container
pub fn decode(container: &[u8], options: &DecodeOptions) -> Result<DecodedModel> {
    let regions = transport::decode(container)?;
    decode_file(&regions.assemble(), options)
}

/// Decode an already decompressed model file
pub fn decode_file(file: &[u8], options: &DecodeOptions) -> Result<DecodedModel> {
    let record = StructuralRecord::decode(file, options)?;
    let model = Model::from_record(&record, file)?;
    let materials = record.paths.materials.clone();
    Ok(DecodedModel {
        model,
        record,
        materials,
    })
}

/// Encode `model` into a compressed container, taking unknowns from `donor`
pub fn encode(model: &Model, donor: &StructuralRecord, config: &CodecConfig) -> Result<Vec<u8>> {
    let regions = encode_model(model, donor, config)?;
    transport::encode(&regions, config.level())
}
