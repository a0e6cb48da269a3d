//! Subcommand implementations

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use mdl_codec::{
    CodecConfig, DecodeOptions, MaterialVariant, Model, decode, encode, referenced_material_names,
    referenced_material_paths,
};

/// Load codec settings from a TOML file, or defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    CodecConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read model: {}", path.display()))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

/// Resolved material paths referenced by a model container
pub fn list_materials(
    input: &Path,
    model_path: &str,
    variant: i32,
    declared_variants: &[u16],
    include_skin: bool,
) -> Result<Vec<String>> {
    let bytes = read_file(input)?;
    let names = referenced_material_names(&bytes);
    if names.is_empty() {
        tracing::warn!("No materials found in {}", input.display());
    }
    Ok(referenced_material_paths(
        model_path,
        &names,
        MaterialVariant::from_raw(variant),
        declared_variants,
        include_skin,
    ))
}

/// Decode and re-encode a container against its own structural record
pub fn rewrite(input: &Path, output: &Path, config: &CodecConfig) -> Result<()> {
    let bytes = read_file(input)?;
    let decoded = decode(&bytes, &DecodeOptions::default())
        .with_context(|| format!("Failed to decode model: {}", input.display()))?;
    let out = encode(&decoded.model, &decoded.record, config)
        .with_context(|| format!("Failed to encode model: {}", input.display()))?;
    tracing::info!(
        "Rewrote {} ({} -> {} bytes)",
        input.display(),
        bytes.len(),
        out.len()
    );
    write_file(output, &out)
}

/// Write the geometry model of a container as pretty JSON
pub fn export_json(input: &Path, output: &Path) -> Result<()> {
    let bytes = read_file(input)?;
    let decoded = decode(&bytes, &DecodeOptions::default())
        .with_context(|| format!("Failed to decode model: {}", input.display()))?;
    let json = serde_json::to_string_pretty(&decoded.model)?;
    write_file(output, json.as_bytes())
}

/// Encode a JSON geometry model, taking unknown fields from a donor container
pub fn import_json(json: &Path, donor: &Path, output: &Path, config: &CodecConfig) -> Result<()> {
    let content = fs::read_to_string(json)
        .with_context(|| format!("Failed to read model JSON: {}", json.display()))?;
    let model: Model = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse model JSON: {}", json.display()))?;
    if model.meshes.is_empty() {
        bail!("{} contains no meshes", json.display());
    }

    let donor_bytes = read_file(donor)?;
    let decoded = decode(&donor_bytes, &DecodeOptions::default())
        .with_context(|| format!("Failed to decode donor: {}", donor.display()))?;
    let out = encode(&model, &decoded.record, config)
        .with_context(|| format!("Failed to encode {}", json.display()))?;
    write_file(output, &out)
}
