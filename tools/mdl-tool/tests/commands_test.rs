//! Integration tests for the mdl-tool commands, run against files in a temp dir.

use std::path::{Path, PathBuf};

use glam::Vec3;
use tempfile::tempdir;

use mdl_codec::{
    CodecConfig, DecodeOptions, MdlVersion, MeshGroup, Model, Part, ShapeDelta, ShapePart,
    StructuralRecord, Vertex, decode, encode,
};
use mdl_tool::{export_json, import_json, inspect, list_materials, load_config, rewrite};

fn sample_model() -> Model {
    let vertices = vec![
        Vertex::at(Vec3::new(0.0, 0.0, 0.0)),
        Vertex::at(Vec3::new(1.0, 0.0, 0.0)),
        Vertex::at(Vec3::new(0.0, 1.0, 0.0)),
    ];
    Model {
        meshes: vec![MeshGroup {
            material: "/mt_c0101e0100_top_a.mtrl".into(),
            bones: vec!["j_kosi".into()],
            parts: vec![Part {
                attributes: vec!["atr_top".into()],
                vertices,
                triangle_indices: vec![0, 1, 2],
                shapes: vec![ShapePart {
                    name: "shp_wide".into(),
                    deltas: vec![ShapeDelta {
                        index: 1,
                        vertex: Vertex::at(Vec3::new(2.0, 0.0, 0.0)),
                    }],
                }],
            }],
        }],
    }
}

fn write_sample(dir: &Path) -> PathBuf {
    let path = dir.join("c0101e0100_top.mdl");
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let bytes = encode(&sample_model(), &donor, &CodecConfig::default()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_inspect() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_sample(dir.path());

    let summary = inspect(&path).unwrap();
    assert_eq!(summary.version, 6);
    assert_eq!(summary.materials, vec!["/mt_c0101e0100_top_a.mtrl"]);
    assert_eq!(summary.shapes, vec!["shp_wide"]);
    assert_eq!(summary.meshes.len(), 1);
    assert_eq!(summary.meshes[0].vertices, 3);
    assert_eq!(summary.meshes[0].shapes, vec!["shp_wide"]);

    let text = summary.to_string();
    assert!(text.contains("version:    6"));
    assert!(text.contains("shapes: shp_wide"));
}

#[test]
fn test_list_materials() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_sample(dir.path());

    let paths = list_materials(
        &path,
        "chara/equipment/e0100/model/c0101e0100_top.mdl",
        -1,
        &[1, 3],
        true,
    )
    .unwrap();
    assert_eq!(
        paths,
        vec![
            "chara/equipment/e0100/material/v0001/mt_c0101e0100_top_a.mtrl",
            "chara/equipment/e0100/material/v0003/mt_c0101e0100_top_a.mtrl",
        ]
    );
}

#[test]
fn test_rewrite_to_v5_without_shapes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_sample(dir.path());
    let out = dir.path().join("rewritten.mdl");

    let config = CodecConfig {
        target_version: Some(5),
        skip_shapes: true,
        ..Default::default()
    };
    rewrite(&path, &out, &config).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    let decoded = decode(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.record.version, MdlVersion::V5);
    assert!(decoded.record.paths.shapes.is_empty());
    assert_eq!(decoded.model.meshes[0].parts[0].vertices.len(), 3);
}

#[test]
fn test_export_then_import() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_sample(dir.path());
    let json = dir.path().join("model.json");
    let out = dir.path().join("imported.mdl");

    export_json(&path, &json).unwrap();

    // Edit the exported model: move a vertex and rename the material
    let mut model: Model = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    model.meshes[0].parts[0].vertices[2].position.y = 5.0;
    model.meshes[0].material = "/mt_c0101e0100_top_b.mtrl".into();
    std::fs::write(&json, serde_json::to_string(&model).unwrap()).unwrap();

    import_json(&json, &path, &out, &CodecConfig::default()).unwrap();

    let decoded = decode(&std::fs::read(&out).unwrap(), &DecodeOptions::default()).unwrap();
    let mesh = &decoded.model.meshes[0];
    assert_eq!(mesh.material, "/mt_c0101e0100_top_b.mtrl");
    assert_eq!(mesh.parts[0].vertices[2].position, Vec3::new(0.0, 5.0, 0.0));
    assert_eq!(mesh.parts[0].shapes[0].name, "shp_wide");
}

#[test]
fn test_import_rejects_empty_model() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_sample(dir.path());
    let json = dir.path().join("empty.json");
    std::fs::write(&json, r#"{"meshes": []}"#).unwrap();

    let out = dir.path().join("out.mdl");
    assert!(import_json(&json, &path, &out, &CodecConfig::default()).is_err());
    assert!(!out.exists());
}

#[test]
fn test_load_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("codec.toml");
    std::fs::write(&path, "compression_level = 1\nskip_shapes = true\n").unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.compression_level, 1);
    assert!(config.skip_shapes);
    assert_eq!(load_config(None).unwrap(), CodecConfig::default());
    assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
}

#[test]
fn test_missing_input_names_the_file() {
    let err = inspect(Path::new("/nonexistent/model.mdl")).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/model.mdl"));
}
