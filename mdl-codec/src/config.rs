//! Codec configuration (codec.toml)

use serde::{Deserialize, Serialize};

use crate::structure::MdlVersion;

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Deflate level for every chunk (0-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Write this format version instead of the donor's
    #[serde(default)]
    pub target_version: Option<u16>,
    /// Drop all shape keys on encode
    #[serde(default)]
    pub skip_shapes: bool,
}

fn default_compression_level() -> u32 {
    6
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            target_version: None,
            skip_shapes: false,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deflate level clamped to the valid range
    pub fn level(&self) -> u32 {
        self.compression_level.min(9)
    }

    /// Resolve the version to encode, given the donor's version
    pub fn resolve_version(&self, donor: MdlVersion) -> crate::Result<MdlVersion> {
        match self.target_version {
            Some(raw) => MdlVersion::from_raw(raw),
            None => Ok(donor),
        }
    }
}

/// Per-file decode settings supplied by the storage layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// The asset was written by a modding tool before
    #[serde(default)]
    pub modified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CodecConfig::default();
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.target_version, None);
        assert!(!config.skip_shapes);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config = CodecConfig::from_toml_str("").unwrap();
        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
compression_level = 9
skip_shapes = true
"#;
        let config = CodecConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.compression_level, 9);
        assert!(config.skip_shapes);
        assert_eq!(config.target_version, None);
    }

    #[test]
    fn test_config_serialize_roundtrip() {
        let config = CodecConfig {
            compression_level: 1,
            target_version: Some(5),
            skip_shapes: true,
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = CodecConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_level_is_clamped() {
        let config = CodecConfig {
            compression_level: 42,
            ..Default::default()
        };
        assert_eq!(config.level(), 9);
    }

    #[test]
    fn test_resolve_version() {
        let config = CodecConfig::default();
        assert_eq!(config.resolve_version(MdlVersion::V6).unwrap(), MdlVersion::V6);

        let config = CodecConfig {
            target_version: Some(5),
            ..Default::default()
        };
        assert_eq!(config.resolve_version(MdlVersion::V6).unwrap(), MdlVersion::V5);

        let config = CodecConfig {
            target_version: Some(7),
            ..Default::default()
        };
        assert!(config.resolve_version(MdlVersion::V6).is_err());
    }
}
