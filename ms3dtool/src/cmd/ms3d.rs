use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, DirBuilder},
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use argh::FromArgs;
use binrw::BinWriterExt;
use gltf_json::{self as json, validation::USize64};
use json::validation::Checked::Valid;
use ms3dlib::{
    format::ms3d::{Material, Model, MAX_MATERIAL_SHININESS},
    util::file::{create_file, map_reader},
};
use serde_json::json;

#[derive(FromArgs, PartialEq, Debug)]
/// process MS3D files
#[argh(subcommand, name = "ms3d")]
pub struct Args {
    #[argh(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Info(InfoArgs),
    Check(CheckArgs),
    Rewrite(RewriteArgs),
    Convert(ConvertArgs),
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// prints a summary of an MS3D file
#[argh(subcommand, name = "info")]
pub struct InfoArgs {
    #[argh(positional)]
    /// input MS3D
    input: PathBuf,
    #[argh(switch, short = 'v')]
    /// print every record
    verbose: bool,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// checks an MS3D file against the format limits
#[argh(subcommand, name = "check")]
pub struct CheckArgs {
    #[argh(positional)]
    /// input MS3D
    input: PathBuf,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// reads and writes back an MS3D file
#[argh(subcommand, name = "rewrite")]
pub struct RewriteArgs {
    #[argh(positional)]
    /// input MS3D
    input: PathBuf,
    #[argh(positional)]
    /// output MS3D
    output: PathBuf,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// converts an MS3D to glTF
#[argh(subcommand, name = "convert")]
pub struct ConvertArgs {
    #[argh(positional)]
    /// input MS3D
    input: PathBuf,
    #[argh(positional)]
    /// output directory
    out_dir: PathBuf,
}

pub fn run(args: Args) -> Result<()> {
    match args.command {
        SubCommand::Info(c_args) => info(c_args),
        SubCommand::Check(c_args) => check(c_args),
        SubCommand::Rewrite(c_args) => rewrite(c_args),
        SubCommand::Convert(c_args) => convert(c_args),
    }
}

fn load(path: &Path) -> Result<Model> {
    let mut reader = map_reader(path)?;
    Model::read(&mut reader).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn info(args: InfoArgs) -> Result<()> {
    let model = load(&args.input)?;
    for line in model.to_string().lines() {
        log::info!("{line}");
    }
    if args.verbose {
        for (idx, vertex) in model.vertices.iter().enumerate() {
            log::info!("vertex {idx}: {vertex:?}");
        }
        for (idx, triangle) in model.triangles.iter().enumerate() {
            log::info!("triangle {idx}: {triangle:?}");
        }
        for (idx, group) in model.groups.iter().enumerate() {
            log::info!("group {idx}: {group:?}");
        }
        for (idx, material) in model.materials.iter().enumerate() {
            log::info!("material {idx}: {material:?}");
        }
        for (idx, joint) in model.joints.iter().enumerate() {
            log::info!("joint {idx}: {joint:?}");
        }
    }
    log::info!("{}", model.validate().report);
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let mut reader = map_reader(&args.input)?;
    let (model, advisories) = Model::read_with_diagnostics(&mut reader)
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;
    for advisory in &advisories {
        log::warn!("{advisory}");
    }
    let validation = model.validate();
    log::info!("{}", validation.report);
    ensure!(validation.valid, "'{}' exceeds the MS3D format limits", args.input.display());
    log::info!("{}: OK ({} advisories)", args.input.display(), advisories.len());
    Ok(())
}

fn rewrite(args: RewriteArgs) -> Result<()> {
    let model = load(&args.input)?;
    log::info!("Writing {}", args.output.display());
    let mut writer = create_file(&args.output)?;
    model
        .write(&mut writer)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;
    writer.flush()?;
    Ok(())
}

fn convert(args: ConvertArgs) -> Result<()> {
    let model = load(&args.input)?;
    let (json_root, buf) = build_gltf(&model, "out.bin")?;

    DirBuilder::new().recursive(true).create(&args.out_dir)?;
    fs::write(args.out_dir.join("out.bin"), buf)?;
    let path = args.out_dir.join("out.gltf");
    log::info!("Writing {}", path.display());
    let mut writer = create_file(&path)?;
    json::serialize::to_writer_pretty(&mut writer, &json_root)
        .with_context(|| format!("Failed to serialize '{}'", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Builds a glTF document for `model` along with its single binary buffer.
///
/// Every group becomes one mesh with one un-indexed triangle list
/// primitive, so per-corner normals and UVs are kept as-is.
fn build_gltf(model: &Model, buffer_uri: &str) -> Result<(json::Root, Vec<u8>)> {
    let mut w = Cursor::new(Vec::new());
    let mut json_buffer_views = Vec::new();
    let mut json_accessors = Vec::new();
    let mut json_meshes = Vec::new();

    let mut json_textures = Vec::new();
    let mut json_images = Vec::new();
    let mut texture_map: HashMap<&str, usize> = HashMap::new();
    let mut json_materials = Vec::with_capacity(model.materials.len());
    for mat in &model.materials {
        let base_color_texture = if mat.texture.is_empty() {
            None
        } else {
            let texture_idx = *texture_map.entry(mat.texture.as_str()).or_insert_with(|| {
                let texture_idx = json_textures.len();
                json_images.push(json::Image {
                    buffer_view: None,
                    mime_type: None,
                    name: Some(mat.texture.clone()),
                    uri: Some(mat.texture.replace('\\', "/")),
                    extensions: None,
                    extras: None,
                });
                json_textures.push(json::Texture {
                    name: Some(mat.texture.clone()),
                    sampler: None,
                    source: json::Index::new(texture_idx as u32),
                    extensions: None,
                    extras: None,
                });
                texture_idx
            });
            Some(json::texture::Info {
                index: json::Index::new(texture_idx as u32),
                tex_coord: 0,
                extensions: None,
                extras: None,
            })
        };
        json_materials.push(convert_material(mat, base_color_texture));
    }

    for group in &model.groups {
        if group.triangle_indices.is_empty() {
            log::debug!("Skipping empty group '{}'", group.name);
            continue;
        }
        let material = match group.material_index {
            idx if idx < 0 => None,
            idx if (idx as usize) < model.materials.len() => Some(json::Index::new(idx as u32)),
            idx => bail!("Group '{}' references missing material {idx}", group.name),
        };

        let corner_count = group.triangle_indices.len() * 3;
        let mut positions = Vec::with_capacity(corner_count);
        let mut normals = Vec::with_capacity(corner_count);
        let mut tex_coords = Vec::with_capacity(corner_count);
        for &triangle_idx in &group.triangle_indices {
            let Some(triangle) = model.triangles.get(triangle_idx as usize) else {
                bail!("Group '{}' references missing triangle {triangle_idx}", group.name);
            };
            for corner in 0..3 {
                let vertex_idx = triangle.vertex_indices[corner];
                let Some(vertex) = model.vertices.get(vertex_idx as usize) else {
                    bail!("Triangle {triangle_idx} references missing vertex {vertex_idx}");
                };
                positions.push(vertex.position);
                normals.push(triangle.vertex_normals[corner]);
                tex_coords.push([triangle.s[corner], triangle.t[corner]]);
            }
        }

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for position in &positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }

        let mut attributes = BTreeMap::new();
        let accessor = push_attribute(
            &mut w,
            &mut json_buffer_views,
            &mut json_accessors,
            &positions,
            json::accessor::Type::Vec3,
            Some((min, max)),
            format!("{} positions", group.name),
        )?;
        attributes.insert(Valid(json::mesh::Semantic::Positions), accessor);
        let accessor = push_attribute(
            &mut w,
            &mut json_buffer_views,
            &mut json_accessors,
            &normals,
            json::accessor::Type::Vec3,
            None,
            format!("{} normals", group.name),
        )?;
        attributes.insert(Valid(json::mesh::Semantic::Normals), accessor);
        let accessor = push_attribute(
            &mut w,
            &mut json_buffer_views,
            &mut json_accessors,
            &tex_coords,
            json::accessor::Type::Vec2,
            None,
            format!("{} texcoords", group.name),
        )?;
        attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), accessor);

        json_meshes.push(json::Mesh {
            extensions: None,
            extras: Default::default(),
            name: Some(group.name.clone()),
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: None,
                extras: Default::default(),
                indices: None,
                material,
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            }],
            weights: None,
        });
    }

    let buf = w.into_inner();
    let json_buffers = vec![json::Buffer {
        byte_length: buf.len().into(),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: Some(buffer_uri.to_owned()),
    }];

    let mut json_scene_nodes = Vec::with_capacity(json_meshes.len());
    let mut json_nodes = Vec::with_capacity(json_meshes.len());
    for (idx, mesh) in json_meshes.iter().enumerate() {
        json_nodes.push(json::Node {
            camera: None,
            children: None,
            extensions: None,
            extras: None,
            matrix: None,
            mesh: Some(json::Index::new(idx as u32)),
            name: mesh.name.clone(),
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        });
        json_scene_nodes.push(json::Index::new(idx as u32));
    }

    let json_root = json::Root {
        accessors: json_accessors,
        animations: vec![],
        asset: Default::default(),
        buffers: json_buffers,
        buffer_views: json_buffer_views,
        scene: Some(json::Index::new(0)),
        extensions: None,
        extras: Default::default(),
        extensions_used: vec![],
        extensions_required: vec![],
        cameras: vec![],
        images: json_images,
        materials: json_materials,
        meshes: json_meshes,
        nodes: json_nodes,
        samplers: vec![],
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some("Scene".into()),
            nodes: json_scene_nodes,
        }],
        skins: vec![],
        textures: json_textures,
    };
    Ok((json_root, buf))
}

fn convert_material(
    mat: &Material,
    base_color_texture: Option<json::texture::Info>,
) -> json::Material {
    let [r, g, b, _] = mat.diffuse;
    let alpha = mat.transparency.clamp(0.0, 1.0);
    let shininess = (mat.shininess / MAX_MATERIAL_SHININESS).clamp(0.0, 1.0);
    json::Material {
        alpha_cutoff: None,
        alpha_mode: Valid(if alpha < 1.0 {
            json::material::AlphaMode::Blend
        } else {
            json::material::AlphaMode::Opaque
        }),
        double_sided: false,
        name: Some(mat.name.clone()),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor([r, g, b, alpha]),
            base_color_texture,
            metallic_factor: json::material::StrengthFactor(0.0),
            roughness_factor: json::material::StrengthFactor(1.0 - shininess),
            metallic_roughness_texture: None,
            extensions: None,
            extras: None,
        },
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: json::material::EmissiveFactor([
            mat.emissive[0],
            mat.emissive[1],
            mat.emissive[2],
        ]),
        extensions: None,
        extras: None,
    }
}

/// Appends a tightly packed float attribute to the buffer, with its view
/// and accessor.
fn push_attribute<const N: usize>(
    w: &mut Cursor<Vec<u8>>,
    views: &mut Vec<json::buffer::View>,
    accessors: &mut Vec<json::Accessor>,
    data: &[[f32; N]],
    type_: json::accessor::Type,
    bounds: Option<([f32; N], [f32; N])>,
    name: String,
) -> Result<json::Index<json::Accessor>> {
    let offset = w.position();
    for item in data {
        w.write_le(item)?;
    }
    let view_idx = views.len() as u32;
    views.push(json::buffer::View {
        buffer: json::Index::new(0),
        byte_length: USize64(w.position() - offset),
        byte_offset: Some(USize64(offset)),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name.clone()),
        target: Some(Valid(json::buffer::Target::ArrayBuffer)),
    });
    let accessor_idx = accessors.len() as u32;
    accessors.push(json::Accessor {
        buffer_view: Some(json::Index::new(view_idx)),
        byte_offset: None,
        count: USize64(data.len() as u64),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: None,
        extras: Default::default(),
        type_: Valid(type_),
        min: bounds.map(|(min, _)| json!(min.to_vec())),
        max: bounds.map(|(_, max)| json!(max.to_vec())),
        name: Some(name),
        normalized: false,
        sparse: None,
    });
    Ok(json::Index::new(accessor_idx))
}

#[cfg(test)]
mod tests {
    use ms3dlib::format::ms3d::{Group, Triangle, Vertex};

    use super::*;

    fn triangle_model() -> Model {
        Model {
            vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, -1.0]]
                .into_iter()
                .map(|position| Vertex { position, ..Default::default() })
                .collect(),
            triangles: vec![Triangle {
                vertex_indices: [0, 1, 2],
                vertex_normals: [[0.0, 0.0, 1.0]; 3],
                s: [0.0, 1.0, 0.0],
                t: [0.0, 0.0, 1.0],
                ..Default::default()
            }],
            groups: vec![
                Group { name: "tri".into(), triangle_indices: vec![0], ..Default::default() },
                Group { name: "empty".into(), ..Default::default() },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_build_gltf() {
        let mut model = triangle_model();
        model.materials.push(Material {
            name: "glass".into(),
            diffuse: [0.5, 0.5, 1.0, 1.0],
            emissive: [0.1, 0.0, 0.0, 1.0],
            transparency: 0.5,
            texture: ".\\glass.bmp".into(),
            ..Default::default()
        });
        model.groups[0].material_index = 0;

        let (root, buf) = build_gltf(&model, "out.bin").unwrap();
        assert_eq!(buf.len(), 3 * 12 + 3 * 12 + 3 * 8);
        assert_eq!(root.buffers[0].byte_length.0, buf.len() as u64);
        assert_eq!(root.meshes.len(), 1);
        assert_eq!(root.nodes.len(), 1);
        assert_eq!(root.accessors.len(), 3);
        assert_eq!(root.buffer_views.len(), 3);
        assert_eq!(root.accessors[0].count.0, 3);
        assert_eq!(root.accessors[0].max, Some(json!([1.0, 2.0, 0.0])));
        assert_eq!(root.accessors[0].min, Some(json!([0.0, 0.0, -1.0])));

        let primitive = &root.meshes[0].primitives[0];
        assert!(primitive.indices.is_none());
        assert_eq!(primitive.material.as_ref().map(|m| m.value()), Some(0));

        let material = &root.materials[0];
        assert!(matches!(material.alpha_mode, Valid(json::material::AlphaMode::Blend)));
        assert_eq!(material.pbr_metallic_roughness.base_color_factor.0, [0.5, 0.5, 1.0, 0.5]);
        assert_eq!(material.emissive_factor.0, [0.1, 0.0, 0.0]);
        assert_eq!(root.images[0].uri.as_deref(), Some("./glass.bmp"));
    }

    #[test]
    fn test_build_gltf_rejects_bad_indices() {
        let mut model = triangle_model();
        model.triangles[0].vertex_indices[2] = 3;
        assert!(build_gltf(&model, "out.bin").is_err());

        let mut model = triangle_model();
        model.groups[0].triangle_indices.push(1);
        assert!(build_gltf(&model, "out.bin").is_err());

        let mut model = triangle_model();
        model.groups[0].material_index = 0;
        assert!(build_gltf(&model, "out.bin").is_err());
    }
}
