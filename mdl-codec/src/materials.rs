//! Material references
//!
//! A model names its materials either by full path or by a short `/mt_*.mtrl`
//! name resolved against the model's folder and a material set variant.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::binary::BinaryReader;
use crate::transport;

const MATERIAL_EXTENSION: &str = ".mtrl";

/// Which material set variants to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialVariant {
    /// Every declared variant (wire value -1)
    All,
    Set(u16),
}

impl MaterialVariant {
    pub fn from_raw(raw: i32) -> Self {
        match u16::try_from(raw) {
            Ok(n) => Self::Set(n),
            Err(_) => Self::All,
        }
    }
}

/// Material names in a model container's path table.
///
/// Anything unreadable yields an empty list.
pub fn referenced_material_names(container: &[u8]) -> Vec<String> {
    let Some(regions) = transport::try_decode(container) else {
        return Vec::new();
    };
    scan_material_names(&regions.model_data).unwrap_or_else(|err| {
        tracing::warn!(%err, "unreadable path table; no materials");
        Vec::new()
    })
}

fn scan_material_names(model_data: &[u8]) -> crate::Result<Vec<String>> {
    let mut r = BinaryReader::new(model_data);
    let count = r.read_i32()?.max(0) as usize;
    let size = r.read_i32()?.max(0) as usize;
    let strings = r.read_bytes(size, "path table")?;

    let mut names = Vec::new();
    for raw in strings.split(|&b| b == 0).take(count) {
        let name = String::from_utf8_lossy(raw);
        if name.ends_with(MATERIAL_EXTENSION) {
            names.push(name.into_owned());
        }
    }
    Ok(names)
}

fn variant_segment(variant: u16) -> String {
    format!("v{variant:04}")
}

fn is_variant_segment(segment: &str) -> bool {
    segment.len() == 5
        && segment.starts_with('v')
        && segment[1..].bytes().all(|b| b.is_ascii_digit())
}

/// `c0101` and `b0001` style ids
fn split_body_ids(name: &str) -> Option<(&str, &str)> {
    let ids = name.strip_prefix("/mt_")?;
    let race = ids.get(0..5)?;
    let body = ids.get(5..10)?;
    let numeric = |id: &str, tag: char| {
        id.starts_with(tag) && id[1..].bytes().all(|b| b.is_ascii_digit())
    };
    (numeric(race, 'c') && numeric(body, 'b') && ids[10..].starts_with('_'))
        .then_some((race, body))
}

/// Full path of material `name` in material set `variant`
pub fn material_path(model_path: &str, name: &str, variant: u16) -> String {
    let version = variant_segment(variant);

    if name.starts_with("chara/") {
        return name
            .split('/')
            .map(|segment| {
                if is_variant_segment(segment) {
                    version.as_str()
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");
    }

    let name = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };

    if let Some((race, body)) = split_body_ids(&name) {
        return format!("chara/human/{race}/obj/body/{body}/material/{version}{name}");
    }

    let root = match model_path.find("/model/") {
        Some(end) => &model_path[..end],
        None => model_path.rsplit_once('/').map_or("", |(dir, _)| dir),
    };
    format!("{root}/material/{version}{name}")
}

/// Human body skin materials
fn is_skin_material(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    matches!(
        segments.as_slice(),
        ["chara", "human", race, "obj", "body", body, "material", version, file]
            if race.starts_with('c')
                && body.starts_with('b')
                && is_variant_segment(version)
                && file.ends_with(MATERIAL_EXTENSION)
    )
}

/// Resolve material names to paths for the requested variants.
///
/// `declared_variants` lists the material sets the item uses; variant 0
/// means "no material" and is skipped, and an empty list means set 1.
pub fn referenced_material_paths(
    model_path: &str,
    names: &[String],
    variant: MaterialVariant,
    declared_variants: &[u16],
    include_skin: bool,
) -> Vec<String> {
    let variants: Vec<u16> = match variant {
        MaterialVariant::Set(n) => vec![n],
        MaterialVariant::All if declared_variants.is_empty() => vec![1],
        MaterialVariant::All => declared_variants.to_vec(),
    };

    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for &v in variants.iter().filter(|&&v| v != 0) {
        for name in names {
            let path = material_path(model_path, name, v);
            if !include_skin && is_skin_material(&path) {
                continue;
            }
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "chara/equipment/e0100/model/c0101e0100_top.mdl";

    fn names() -> Vec<String> {
        vec![
            "/mt_c0101e0100_top_a.mtrl".to_string(),
            "/mt_c0101b0001_a.mtrl".to_string(),
        ]
    }

    #[test]
    fn test_relative_material_path() {
        assert_eq!(
            material_path(MODEL, "/mt_c0101e0100_top_a.mtrl", 2),
            "chara/equipment/e0100/material/v0002/mt_c0101e0100_top_a.mtrl"
        );
    }

    #[test]
    fn test_body_material_path() {
        assert_eq!(
            material_path(MODEL, "/mt_c0101b0001_a.mtrl", 1),
            "chara/human/c0101/obj/body/b0001/material/v0001/mt_c0101b0001_a.mtrl"
        );
    }

    #[test]
    fn test_full_path_variant_rewrite() {
        assert_eq!(
            material_path(MODEL, "chara/equipment/e0200/material/v0001/mt_x.mtrl", 3),
            "chara/equipment/e0200/material/v0003/mt_x.mtrl"
        );
    }

    #[test]
    fn test_all_variants_union() {
        let paths = referenced_material_paths(
            MODEL,
            &names()[..1],
            MaterialVariant::All,
            &[0, 1, 2, 1],
            true,
        );
        assert_eq!(
            paths,
            vec![
                "chara/equipment/e0100/material/v0001/mt_c0101e0100_top_a.mtrl",
                "chara/equipment/e0100/material/v0002/mt_c0101e0100_top_a.mtrl",
            ]
        );
    }

    #[test]
    fn test_single_variant() {
        let paths =
            referenced_material_paths(MODEL, &names()[..1], MaterialVariant::Set(2), &[1, 2], true);
        assert_eq!(
            paths,
            vec!["chara/equipment/e0100/material/v0002/mt_c0101e0100_top_a.mtrl"]
        );
    }

    #[test]
    fn test_skin_excluded() {
        let with_skin = referenced_material_paths(MODEL, &names(), MaterialVariant::All, &[], true);
        let without = referenced_material_paths(MODEL, &names(), MaterialVariant::All, &[], false);
        assert_eq!(with_skin.len(), 2);
        assert_eq!(without.len(), 1);
        assert!(without[0].contains("e0100"));
    }

    #[test]
    fn test_wire_variant() {
        assert_eq!(MaterialVariant::from_raw(-1), MaterialVariant::All);
        assert_eq!(MaterialVariant::from_raw(4), MaterialVariant::Set(4));
    }

    #[test]
    fn test_garbage_has_no_materials() {
        assert!(referenced_material_names(&[1, 2, 3]).is_empty());
    }
}
