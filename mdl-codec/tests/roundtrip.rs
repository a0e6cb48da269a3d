//! End-to-end tests: geometry model -> compressed container -> geometry model.

use glam::{Vec2, Vec3};

use mdl_codec::transport::{ContainerHeader, Region};
use mdl_codec::{
    CodecConfig, DecodeOptions, MdlError, MdlVersion, MemoryStorage, MeshGroup, Model, Part,
    ShapeDelta, ShapePart, StructuralRecord, Vertex, decode, encode, load_model,
    referenced_material_names, referenced_materials, save_model,
};

fn grid_part(origin: Vec3, size: usize, attributes: &[&str]) -> Part {
    let mut vertices = Vec::new();
    for y in 0..=size {
        for x in 0..=size {
            let mut v = Vertex::at(origin + Vec3::new(x as f32, y as f32, 0.0));
            v.normal = Vec3::new(0.0, 0.0, 1.0);
            v.uv0 = Vec2::new(x as f32 / size as f32, y as f32 / size as f32);
            v.uv1 = Vec2::new(0.25, 0.75);
            v.color = [255, 128, 64, 32];
            v.bone_weights = [1.0, 0.0, 0.0, 0.0];
            v.bone_ids = [((x + y) % 2) as u8, 0, 0, 0];
            vertices.push(v);
        }
    }
    let row = (size + 1) as u32;
    let mut triangle_indices = Vec::new();
    for y in 0..size as u32 {
        for x in 0..size as u32 {
            let a = y * row + x;
            triangle_indices.extend_from_slice(&[a, a + 1, a + row, a + 1, a + row + 1, a + row]);
        }
    }
    Part {
        attributes: attributes.iter().map(|a| a.to_string()).collect(),
        vertices,
        triangle_indices,
        shapes: Vec::new(),
    }
}

fn sample_model() -> Model {
    let mut sleeve = grid_part(Vec3::new(4.0, 0.0, 0.0), 2, &["atr_sleeve"]);
    let mut lifted = sleeve.vertices[4];
    lifted.position.z += 0.5;
    sleeve.shapes.push(ShapePart {
        name: "shp_lift".into(),
        deltas: vec![
            ShapeDelta {
                index: 2,
                vertex: lifted,
            },
            ShapeDelta {
                index: 5,
                vertex: lifted,
            },
        ],
    });

    Model {
        meshes: vec![
            MeshGroup {
                material: "/mt_c0101e0100_top_a.mtrl".into(),
                bones: vec!["j_kosi".into(), "j_sebo_a".into()],
                parts: vec![grid_part(Vec3::ZERO, 3, &["atr_body"]), sleeve],
            },
            MeshGroup {
                material: "/mt_c0101b0001_a.mtrl".into(),
                bones: vec!["j_sebo_b".into(), "j_kosi".into()],
                parts: vec![grid_part(Vec3::new(-3.0, -3.0, 1.0), 1, &[])],
            },
        ],
    }
}

fn roundtrip(model: &Model, config: &CodecConfig) -> Model {
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let bytes = encode(model, &donor, config).expect("encode");
    decode(&bytes, &DecodeOptions::default())
        .expect("decode")
        .model
}

#[test]
fn test_geometry_survives_roundtrip() {
    let model = sample_model();
    let decoded = roundtrip(&model, &CodecConfig::default());

    assert_eq!(decoded.meshes.len(), model.meshes.len());
    for (a, b) in model.meshes.iter().zip(&decoded.meshes) {
        assert_eq!(a.material, b.material);
        assert_eq!(a.bones, b.bones);
        assert_eq!(a.parts.len(), b.parts.len());
        for (pa, pb) in a.parts.iter().zip(&b.parts) {
            assert_eq!(pa.attributes, pb.attributes);
            assert_eq!(pa.triangle_indices, pb.triangle_indices);
            assert_eq!(pa.vertices.len(), pb.vertices.len());
            for (va, vb) in pa.vertices.iter().zip(&pb.vertices) {
                assert_eq!(va.position, vb.position);
                assert_eq!(va.normal, vb.normal);
                assert_eq!(va.uv0, vb.uv0);
                assert_eq!(va.uv1, vb.uv1);
                assert_eq!(va.color, vb.color);
                assert_eq!(va.bone_weights, vb.bone_weights);
                assert_eq!(va.bone_ids, vb.bone_ids);
            }
        }
    }
}

#[test]
fn test_shapes_survive_roundtrip() {
    let model = sample_model();
    let decoded = roundtrip(&model, &CodecConfig::default());

    let original = &model.meshes[0].parts[1].shapes;
    let shapes = &decoded.meshes[0].parts[1].shapes;
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].name, "shp_lift");
    assert_eq!(shapes[0].deltas.len(), original[0].deltas.len());
    for (a, b) in original[0].deltas.iter().zip(&shapes[0].deltas) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.vertex.position, b.vertex.position);
    }
    assert!(decoded.meshes[1].parts[0].shapes.is_empty());
}

#[test]
fn test_rewrite_is_stable() {
    let model = sample_model();
    let config = CodecConfig::default();
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let first = encode(&model, &donor, &config).unwrap();

    let decoded = decode(&first, &DecodeOptions::default()).unwrap();
    let second = encode(&decoded.model, &decoded.record, &config).unwrap();
    let again = decode(&second, &DecodeOptions::default()).unwrap();

    assert_eq!(again.model, decoded.model);
    assert_eq!(again.record.header, decoded.record.header);
    assert_eq!(again.materials, decoded.materials);
}

#[test]
fn test_v5_rewrite_keeps_mesh_bones() {
    let model = sample_model();
    let config = CodecConfig::default();
    let donor = StructuralRecord::blank(MdlVersion::V5);
    let first = encode(&model, &donor, &config).unwrap();

    let decoded = decode(&first, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.record.version, MdlVersion::V5);
    for (a, b) in model.meshes.iter().zip(&decoded.model.meshes) {
        assert_eq!(a.bones, b.bones);
    }

    let second = encode(&decoded.model, &decoded.record, &config).unwrap();
    let again = decode(&second, &DecodeOptions::default()).unwrap();
    assert_eq!(again.record.bone_sets, decoded.record.bone_sets);
    assert_eq!(again.model, decoded.model);
}

#[test]
fn test_container_header_invariants() {
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let bytes = encode(&sample_model(), &donor, &CodecConfig::default()).unwrap();
    let header = ContainerHeader::from_bytes(&bytes).unwrap();

    assert_eq!(header.header_size % 128, 0);
    assert_eq!(header.mesh_count, 2);
    assert_eq!(header.material_count, 2);
    assert_eq!(header.lod_count, 1);

    let mut previous = 0;
    for region in Region::BODY_ORDER {
        let slot = region.slot();
        assert_eq!(header.uncompressed_sizes[slot] % 128, 0);
        assert_eq!(header.compressed_sizes[slot] % 128, 0);
        assert!(header.offsets[slot] >= previous);
        previous = header.offsets[slot];
    }
}

#[test]
fn test_referenced_materials() {
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let bytes = encode(&sample_model(), &donor, &CodecConfig::default()).unwrap();
    assert_eq!(
        referenced_material_names(&bytes),
        vec!["/mt_c0101e0100_top_a.mtrl", "/mt_c0101b0001_a.mtrl"]
    );
}

#[test]
fn test_storage_save_and_load() {
    let mut storage = MemoryStorage::new();
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let path = "chara/equipment/e0100/model/c0101e0100_top.mdl";
    let offset = save_model(
        &mut storage,
        path,
        &sample_model(),
        &donor,
        &CodecConfig::default(),
    )
    .unwrap();

    let loaded = load_model(&storage, path, offset, &DecodeOptions::default()).unwrap();
    assert_eq!(loaded.model.meshes.len(), 2);
    assert_eq!(referenced_materials(&storage, path, offset).len(), 2);
    assert!(load_model(&storage, path, 0, &DecodeOptions::default()).is_none());
}

#[test]
fn test_stored_chunks_when_level_zero() {
    let config = CodecConfig {
        compression_level: 0,
        ..Default::default()
    };
    let decoded = roundtrip(&sample_model(), &config);
    assert_eq!(decoded.meshes[0].parts[0].vertices.len(), 16);
}

#[test]
fn test_large_mesh_spans_many_chunks() {
    let model = Model {
        meshes: vec![MeshGroup {
            material: "/mt_a.mtrl".into(),
            bones: vec!["j_kosi".into()],
            parts: vec![grid_part(Vec3::ZERO, 60, &[])],
        }],
    };
    let donor = StructuralRecord::blank(MdlVersion::V6);
    let bytes = encode(&model, &donor, &CodecConfig::default()).unwrap();
    let header = ContainerHeader::from_bytes(&bytes).unwrap();
    assert!(header.chunk_counts[Region::Vertex(0).slot()] > 1);

    let decoded = decode(&bytes, &DecodeOptions::default()).unwrap().model;
    assert_eq!(decoded.meshes[0].parts[0].vertices.len(), 61 * 61);
    assert_eq!(
        decoded.meshes[0].parts[0].triangle_indices,
        model.meshes[0].parts[0].triangle_indices
    );
}

#[test]
fn test_garbage_is_an_error() {
    let err = decode(&[0u8; 64], &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, MdlError::Truncated { .. }));
}
