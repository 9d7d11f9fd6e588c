use super::*;

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// One triangle, one group, no materials, no optional tail.
fn minimal_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"MS3D000000");
    out.extend_from_slice(&4u32.to_le_bytes());

    out.extend_from_slice(&3u16.to_le_bytes());
    for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        out.push(0);
        push_f32s(&mut out, &position);
        out.push(0xFF);
        out.push(0);
    }

    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    for idx in [0u16, 1, 2] {
        out.extend_from_slice(&idx.to_le_bytes());
    }
    for _ in 0..3 {
        push_f32s(&mut out, &[0.0, 0.0, 1.0]);
    }
    push_f32s(&mut out, &[0.0; 6]);
    out.push(0);
    out.push(0);

    out.extend_from_slice(&1u16.to_le_bytes());
    out.push(0);
    let mut name = [0u8; 32];
    name[..7].copy_from_slice(b"default");
    out.extend_from_slice(&name);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(0xFF);

    out.extend_from_slice(&0u16.to_le_bytes());
    push_f32s(&mut out, &[25.0, 0.0]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Offset of the first group's name field in `minimal_bytes`.
const MINIMAL_GROUP_NAME: usize = 14 + 2 + 3 * 15 + 2 + 70 + 2 + 1;

fn sample_model() -> Model {
    let vertices = (0..4)
        .map(|i| Vertex {
            flags: FLAG_SELECTED,
            position: [i as f32, 0.5, -1.0],
            bone_id: 0,
            reference_count: 2,
            ex: Some(VertexEx::V2(VertexEx2 {
                bone_ids: [1, NO_BONE, NO_BONE],
                weights: [60, 40, 0],
                extra: 0xFF00FF00,
            })),
        })
        .collect();
    let triangles = [[0u16, 1, 2], [0, 2, 3]]
        .into_iter()
        .map(|vertex_indices| Triangle {
            vertex_indices,
            vertex_normals: [[0.0, 0.0, 1.0]; 3],
            s: [0.0, 1.0, 0.0],
            t: [0.0, 0.0, 1.0],
            smoothing_group: 1,
            ..Default::default()
        })
        .collect();
    Model {
        vertices,
        triangles,
        groups: vec![Group {
            name: "body".into(),
            triangle_indices: vec![0, 1],
            material_index: 0,
            comment: Some("first line\nsecond line".into()),
            ..Default::default()
        }],
        materials: vec![Material {
            name: "skin".into(),
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.7, 0.6, 1.0],
            shininess: 12.0,
            transparency: 1.0,
            mode: TEXTURE_HAS_ALPHA,
            texture: "textures\\skin.bmp".into(),
            comment: Some("shiny".into()),
            ..Default::default()
        }],
        animation_fps: 30.0,
        current_time: 2.0,
        total_frames: 60,
        joints: vec![
            Joint {
                name: "root".into(),
                rotation_keyframes: vec![RotationKeyframe { time: 1.0, rotation: [0.0; 3] }],
                translation_keyframes: vec![TranslationKeyframe {
                    time: 1.0,
                    position: [0.0, 1.0, 0.0],
                }],
                ex: Some(JointEx { color: [1.0, 0.0, 0.0] }),
                ..Default::default()
            },
            Joint {
                name: "arm".into(),
                parent_name: "root".into(),
                position: [1.0, 0.0, 0.0],
                ex: Some(JointEx { color: [0.0, 1.0, 0.0] }),
                comment: Some("left arm".into()),
                ..Default::default()
            },
        ],
        sub_version_comments: 1,
        comment: Some("exported for testing".into()),
        sub_version_vertex_extra: 2,
        sub_version_joint_extra: 1,
        sub_version_model_extra: 1,
        model_ex: Some(ModelEx {
            joint_size: 2.0,
            transparency_mode: TRANSPARENCY_DEPTH_BUFFERED_WITH_ALPHA_REF,
            alpha_ref: 0.5,
        }),
        ..Default::default()
    }
}

/// `model` as read back from a file that ends after `last_section`.
fn cut_after(model: &Model, last_section: Option<Section>) -> Model {
    let keeps = |section: Section| last_section.map_or(false, |last| section <= last);
    let mut out = model.clone();
    if !keeps(Section::Joints) {
        out.joints.clear();
    }
    if !keeps(Section::Comments) {
        out.sub_version_comments = 0;
        out.comment = None;
        for group in &mut out.groups {
            group.comment = None;
        }
        for material in &mut out.materials {
            material.comment = None;
        }
        for joint in &mut out.joints {
            joint.comment = None;
        }
    }
    if !keeps(Section::VertexExtra) {
        out.sub_version_vertex_extra = 0;
        for vertex in &mut out.vertices {
            vertex.ex = None;
        }
    }
    if !keeps(Section::JointExtra) {
        out.sub_version_joint_extra = 0;
        for joint in &mut out.joints {
            joint.ex = None;
        }
    }
    if !keeps(Section::ModelExtra) {
        out.sub_version_model_extra = 0;
        out.model_ex = None;
    }
    out.last_section = last_section;
    out
}

fn without_tail(model: &Model) -> Model { cut_after(model, None) }

fn bytes_up_to(model: &Model, last_section: Option<Section>) -> Vec<u8> {
    cut_after(model, last_section).to_bytes().unwrap()
}

fn read_diag(bytes: &[u8]) -> (Model, Vec<Advisory>) {
    Model::read_with_diagnostics(&mut std::io::Cursor::new(bytes)).unwrap()
}

#[test]
fn test_minimal_file() {
    let bytes = minimal_bytes();
    let (model, advisories) = read_diag(&bytes);
    assert!(advisories.is_empty());
    assert_eq!(model.vertices.len(), 3);
    assert_eq!(model.triangles.len(), 1);
    assert_eq!(model.groups.len(), 1);
    assert_eq!(model.materials.len(), 0);
    assert_eq!(model.joints.len(), 0);
    assert_eq!(model.groups[0].name, "default");
    assert_eq!(model.groups[0].material_index, NO_MATERIAL);
    assert_eq!(model.triangles[0].vertex_normals, [[0.0, 0.0, 1.0]; 3]);
    assert_eq!(model.vertices[1].position, [1.0, 0.0, 0.0]);
    assert_eq!(model.animation_fps, 25.0);
    assert_eq!(model.last_section, None);
    assert_eq!(
        (
            model.sub_version_comments,
            model.sub_version_vertex_extra,
            model.sub_version_joint_extra,
            model.sub_version_model_extra
        ),
        (0, 0, 0, 0)
    );
    assert_eq!(model.comment, None);
    assert_eq!(model.group_comment_count(), 0);
    assert_eq!(model.model_ex, None);

    assert_eq!(model.to_bytes().unwrap(), bytes);
}

#[test]
fn test_round_trip() {
    let model = sample_model();
    let bytes = model.to_bytes().unwrap();
    let (read, advisories) = read_diag(&bytes);
    assert!(advisories.is_empty(), "{advisories:?}");
    assert_eq!(read, model);
    assert_eq!(read.to_bytes().unwrap(), bytes);
}

#[test]
fn test_vertex_extra_sub_versions() {
    let base = Model { sub_version_vertex_extra: 0, ..sample_model() };
    let base = Model {
        vertices: base.vertices.iter().map(|v| Vertex { ex: None, ..v.clone() }).collect(),
        ..base
    };
    let base_len = base.to_bytes().unwrap().len();
    assert_eq!(Model::from_bytes(&base.to_bytes().unwrap()).unwrap(), base);

    for (sub_version, record_size) in [(1u32, 6usize), (2, 10), (3, 10)] {
        let mut model = base.clone();
        model.sub_version_vertex_extra = sub_version;
        for (i, vertex) in model.vertices.iter_mut().enumerate() {
            let mut ex = VertexEx::for_sub_version(sub_version).unwrap();
            match &mut ex {
                VertexEx::V1(ex) => ex.weights = [i as u8, 0, 0],
                VertexEx::V2(ex) => ex.extra = i as u32,
                VertexEx::V3(ex) => ex.extra = 0xABCD0000 | i as u32,
            }
            vertex.ex = Some(ex);
        }
        let bytes = model.to_bytes().unwrap();
        assert_eq!(bytes.len() - base_len, model.vertices.len() * record_size);
        let read = Model::from_bytes(&bytes).unwrap();
        assert_eq!(read, model);
        for vertex in &read.vertices {
            assert_eq!(vertex.ex.as_ref().map(VertexEx::sub_version), Some(sub_version));
        }
    }
}

#[test]
fn test_truncated_after_prefix() {
    let model = sample_model();
    let full = model.to_bytes().unwrap();
    let prefix_len = bytes_up_to(&model, None).len();
    assert!(prefix_len < full.len());

    let (read, advisories) = read_diag(&full[..prefix_len]);
    assert!(advisories.is_empty());
    assert_eq!(read, without_tail(&model));
}

#[test]
fn test_truncated_at_each_section_boundary() {
    let model = sample_model();
    for section in Section::ALL {
        let bytes = bytes_up_to(&model, Some(section));
        let (read, advisories) = read_diag(&bytes);
        assert!(advisories.is_empty(), "{section}: {advisories:?}");
        assert_eq!(read, cut_after(&model, Some(section)));
        assert_eq!(read.to_bytes().unwrap(), bytes);
        assert_eq!(&model.to_bytes().unwrap()[..bytes.len()], bytes.as_slice());
    }
    let read = Model::from_bytes(&bytes_up_to(&model, Some(Section::Comments))).unwrap();
    assert_eq!(read.joints.len(), 2);
    assert_eq!(read.joints[1].comment.as_deref(), Some("left arm"));
    assert!(read.joints.iter().all(|j| j.ex.is_none()));
    assert!(read.vertices.iter().all(|v| v.ex.is_none()));
}

#[test]
fn test_truncated_inside_joints() {
    let model = sample_model();
    let prefix_len = bytes_up_to(&model, None).len();
    let full = model.to_bytes().unwrap();

    let (read, advisories) = read_diag(&full[..prefix_len + 10]);
    assert_eq!(advisories, vec![Advisory::TruncatedSection { section: Section::Joints }]);
    assert!(read.joints.is_empty());
    assert_eq!(read.last_section, None);
}

#[test]
fn test_truncated_inside_comments_discards_section() {
    let model = sample_model();
    let joints_len = bytes_up_to(&model, Some(Section::Joints)).len();
    let full = model.to_bytes().unwrap();

    let (read, advisories) = read_diag(&full[..joints_len + 12]);
    assert_eq!(advisories, vec![Advisory::TruncatedSection { section: Section::Comments }]);
    assert_eq!(read.last_section, Some(Section::Joints));
    assert_eq!(read.joints.len(), 2);
    assert_eq!(read.groups[0].comment, None);
    assert_eq!(read.joints[1].comment, None);
}

#[test]
fn test_dangling_group_comment() {
    let model = without_tail(&sample_model());
    let group_count = model.groups.len() as u32;
    let mut bytes = bytes_up_to(&model, Some(Section::Joints));

    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    push_str(&mut bytes, "kept");
    bytes.extend_from_slice(&group_count.to_le_bytes());
    push_str(&mut bytes, "dangling");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    push_str(&mut bytes, "material");
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    push_str(&mut bytes, "model");
    for sub_version in [0u32, 0, 0] {
        bytes.extend_from_slice(&sub_version.to_le_bytes());
    }

    let (read, advisories) = read_diag(&bytes);
    assert_eq!(advisories, vec![Advisory::DanglingComment {
        owner: CommentOwner::Group,
        index: group_count,
        count: model.groups.len(),
    }]);
    assert_eq!(read.groups[0].comment.as_deref(), Some("kept"));
    assert_eq!(read.materials[0].comment.as_deref(), Some("material"));
    assert_eq!(read.comment.as_deref(), Some("model"));
    assert_eq!(read.sub_version_comments, 1);
    assert_eq!(read.last_section, Some(Section::ModelExtra));
}

#[test]
fn test_unknown_vertex_extra() {
    let mut model = without_tail(&sample_model());
    model.sub_version_vertex_extra = 7;
    model.sub_version_model_extra = 1;
    model.model_ex = Some(ModelEx::default());
    model.last_section = Some(Section::ModelExtra);

    let (read, advisories) = read_diag(&model.to_bytes().unwrap());
    assert_eq!(advisories, vec![Advisory::UnknownVertexExtra { sub_version: 7 }]);
    assert_eq!(read.sub_version_vertex_extra, 7);
    assert!(read.vertices.iter().all(|v| v.ex.is_none()));
    assert_eq!(read.model_ex, Some(ModelEx::default()));
    assert_eq!(read.last_section, Some(Section::ModelExtra));
}

#[test]
fn test_nonzero_model_comment_flag() {
    let model = sample_model();
    let mut bytes = model.to_bytes().unwrap();
    let comments_end = bytes_up_to(&model, Some(Section::Comments)).len();
    let text_len = "exported for testing".len();
    let flag = comments_end - text_len - 4 - 4;
    assert_eq!(&bytes[flag..flag + 4], &1u32.to_le_bytes());
    bytes[flag..flag + 4].copy_from_slice(&2u32.to_le_bytes());

    let (read, advisories) = read_diag(&bytes);
    assert!(advisories.is_empty(), "{advisories:?}");
    assert_eq!(read.comment.as_deref(), Some("exported for testing"));
    assert!(read.vertices.iter().all(|v| v.ex.is_some()));
    assert_eq!(read.model_ex, model.model_ex);
    assert_eq!(read, model);
}

#[test]
fn test_edits_after_short_read_are_written() {
    let mut model = Model::from_bytes(&minimal_bytes()).unwrap();
    assert_eq!(model.last_section, None);
    model.joints.push(Joint { name: "root".into(), ..Default::default() });
    model.comment = Some("added later".into());

    let read = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(read.joints.len(), 1);
    assert_eq!(read.joints[0].name, "root");
    assert_eq!(read.comment.as_deref(), Some("added later"));
    assert_eq!(read.last_section, Some(Section::Comments));

    model.model_ex = Some(ModelEx::default());
    model.sub_version_model_extra = 1;
    let read = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(read.model_ex, Some(ModelEx::default()));
    assert_eq!(read.last_section, Some(Section::ModelExtra));

    let mut model = Model::from_bytes(&minimal_bytes()).unwrap();
    model.joints.push(Joint { name: "root".into(), ..Default::default() });
    let read = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(read.joints.len(), 1);
    assert_eq!(read.last_section, Some(Section::Joints));
}

#[test]
fn test_empty_comments_are_not_written() {
    let mut model = sample_model();
    model.groups[0].comment = Some(String::new());
    model.comment = Some(String::new());
    assert_eq!(model.group_comment_count(), 0);
    assert!(!model.has_model_comment());

    let read = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(read.groups[0].comment, None);
    assert_eq!(read.comment, None);
    assert_eq!(read.materials[0].comment.as_deref(), Some("shiny"));
    assert_eq!(read.joints[1].comment.as_deref(), Some("left arm"));

    // Nothing left to write past the prefix
    let mut model = Model::from_bytes(&minimal_bytes()).unwrap();
    model.groups[0].comment = Some(String::new());
    assert_eq!(model.to_bytes().unwrap(), minimal_bytes());
}

#[test]
fn test_dangling_material_and_joint_comments() {
    let model = cut_after(&sample_model(), Some(Section::Joints));
    let material_count = model.materials.len() as u32;
    let joint_count = model.joints.len() as u32;
    let mut bytes = bytes_up_to(&model, Some(Section::Joints));

    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&material_count.to_le_bytes());
    push_str(&mut bytes, "dangling material");
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&joint_count.to_le_bytes());
    push_str(&mut bytes, "dangling joint");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    push_str(&mut bytes, "kept");
    bytes.extend_from_slice(&0u32.to_le_bytes());
    for sub_version in [0u32, 0, 0] {
        bytes.extend_from_slice(&sub_version.to_le_bytes());
    }

    let (read, advisories) = read_diag(&bytes);
    assert_eq!(advisories, vec![
        Advisory::DanglingComment {
            owner: CommentOwner::Material,
            index: material_count,
            count: model.materials.len(),
        },
        Advisory::DanglingComment {
            owner: CommentOwner::Joint,
            index: joint_count,
            count: model.joints.len(),
        },
    ]);
    assert_eq!(read.materials[0].comment, None);
    assert_eq!(read.joints[0].comment, None);
    assert_eq!(read.joints[1].comment.as_deref(), Some("kept"));
    assert_eq!(read.last_section, Some(Section::ModelExtra));
}

#[test]
fn test_header_mismatch_is_advisory() {
    let mut bytes = minimal_bytes();
    bytes[10..14].copy_from_slice(&3u32.to_le_bytes());
    let (read, advisories) = read_diag(&bytes);
    assert_eq!(advisories, vec![Advisory::HeaderMismatch { id: MAGIC.into(), version: 3 }]);
    assert_eq!(read.triangles.len(), 1);
}

#[test]
fn test_truncated_prefix_is_fatal() {
    let bytes = minimal_bytes();
    for len in [0, 5, 20, bytes.len() - 1] {
        assert!(matches!(Model::from_bytes(&bytes[..len]), Err(Error::Parse(_))), "{len}");
    }
}

#[test]
fn test_name_garbage_is_normalised() {
    let clean = minimal_bytes();
    let mut dirty = clean.clone();
    dirty[MINIMAL_GROUP_NAME..MINIMAL_GROUP_NAME + 11].copy_from_slice(b"default\0XYZ");

    let model = Model::from_bytes(&dirty).unwrap();
    assert_eq!(model.groups[0].name, "default");
    assert_eq!(model.to_bytes().unwrap(), clean);
}

#[test]
fn test_write_inconsistent_extensions() {
    let mut model = sample_model();
    model.vertices[2].ex = None;
    assert!(matches!(model.to_bytes(), Err(Error::Inconsistent(_))));

    let mut model = sample_model();
    model.vertices[0].ex = Some(VertexEx::V1(VertexEx1::default()));
    assert!(matches!(model.to_bytes(), Err(Error::Inconsistent(_))));

    let mut model = sample_model();
    model.joints[0].ex = None;
    assert!(matches!(model.to_bytes(), Err(Error::Inconsistent(_))));

    let mut model = sample_model();
    model.model_ex = None;
    assert!(matches!(model.to_bytes(), Err(Error::Inconsistent(_))));

    // Sub-version 0 leaves extension records unwritten
    let mut model = sample_model();
    model.sub_version_vertex_extra = 0;
    let read = Model::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert!(read.vertices.iter().all(|v| v.ex.is_none()));
}

#[test]
fn test_write_too_many() {
    let model = Model { vertices: vec![Vertex::default(); 65536], ..Default::default() };
    assert!(matches!(
        model.to_bytes(),
        Err(Error::TooMany { what: "vertices", count: 65536, max: 65535 })
    ));
}

#[test]
fn test_joint_hierarchy() {
    let joint = |name: &str, parent: &str| Joint {
        name: name.into(),
        parent_name: parent.into(),
        ..Default::default()
    };
    let model = Model {
        joints: vec![
            joint("root", ""),
            joint("child", "root"),
            joint("orphan", "missing"),
            joint("early", "late"),
            joint("late", ""),
        ],
        ..Default::default()
    };
    assert_eq!(model.find_joint("late"), Some(4));
    assert_eq!(model.find_joint("nope"), None);
    assert_eq!(model.joint_parent(1), Some(0));
    assert_eq!(model.joint_parent(3), Some(4));
    assert_eq!(model.joint_parent(2), None);
    assert_eq!(model.joint_parent(99), None);
    assert_eq!(model.root_joints().collect::<Vec<_>>(), vec![0, 2, 4]);
}

#[test]
fn test_display() {
    let model = Model::from_bytes(&minimal_bytes()).unwrap();
    let dump = model.to_string();
    assert!(dump.contains("vertices: 3"));
    assert!(dump.contains("[0] 'default': 1 triangles, material -1"));
    assert!(dump.contains("optional data: none"));

    let dump = sample_model().to_string();
    assert!(dump.contains("optional data: up to model extra"));
    assert!(dump.contains("comment: exported for testing"));
}
