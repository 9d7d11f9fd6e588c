use std::hash::{Hash, Hasher};

use binrw::binrw;

use crate::format::{
    ms3d::{
        extra::{JointEx, VertexEx},
        FILENAME_LENGTH, FLAG_NONE, ID_LENGTH, MAGIC, NAME_LENGTH, NO_BONE, NO_MATERIAL,
        TEXTURE_NONE, VERSION,
    },
    FixedString,
};

type Id = FixedString<ID_LENGTH>;
type Name = FixedString<NAME_LENGTH>;
type Filename = FixedString<FILENAME_LENGTH>;

#[binrw]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Header {
    #[br(map = Id::into_string)]
    #[bw(map = |s: &String| Id::new(s))]
    pub id: String,
    pub version: u32,
}

impl Default for Header {
    fn default() -> Self { Self { id: MAGIC.to_owned(), version: VERSION } }
}

#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub flags: u8,
    pub position: [f32; 3],
    /// Joint index or [`NO_BONE`].
    pub bone_id: i8,
    pub reference_count: u8,
    /// Bone weights, present when the model's vertex-extra sub-version is non-zero.
    #[brw(ignore)]
    pub ex: Option<VertexEx>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            flags: FLAG_NONE,
            position: [0.0; 3],
            bone_id: NO_BONE,
            reference_count: 0,
            ex: None,
        }
    }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triangle {
    pub flags: u16,
    pub vertex_indices: [u16; 3],
    /// One normal per corner.
    pub vertex_normals: [[f32; 3]; 3],
    pub s: [f32; 3],
    pub t: [f32; 3],
    pub smoothing_group: u8,
    pub group_index: u8,
}

#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub flags: u8,
    #[br(map = Name::into_string)]
    #[bw(map = |s: &String| Name::new(s))]
    pub name: String,
    #[bw(try_calc = triangle_indices.len().try_into())]
    triangle_count: u16,
    #[br(count = triangle_count)]
    pub triangle_indices: Vec<u16>,
    /// Material index or [`NO_MATERIAL`].
    pub material_index: i8,
    #[brw(ignore)]
    pub comment: Option<String>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            flags: FLAG_NONE,
            name: String::new(),
            triangle_indices: vec![],
            material_index: NO_MATERIAL,
            comment: None,
        }
    }
}

#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    #[br(map = Name::into_string)]
    #[bw(map = |s: &String| Name::new(s))]
    pub name: String,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    /// 0.0..=128.0 by convention.
    pub shininess: f32,
    pub transparency: f32,
    pub mode: i8,
    #[br(map = Filename::into_string)]
    #[bw(map = |s: &String| Filename::new(s))]
    pub texture: String,
    #[br(map = Filename::into_string)]
    #[bw(map = |s: &String| Filename::new(s))]
    pub alphamap: String,
    #[brw(ignore)]
    pub comment: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: [0.0; 4],
            diffuse: [0.0; 4],
            specular: [0.0; 4],
            emissive: [0.0; 4],
            shininess: 0.0,
            transparency: 0.0,
            mode: TEXTURE_NONE,
            texture: String::new(),
            alphamap: String::new(),
            comment: None,
        }
    }
}

#[inline]
fn float_bits(v: f32) -> u32 {
    // -0.0 == 0.0, so they must hash the same
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl Hash for Material {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for color in [&self.ambient, &self.diffuse, &self.specular, &self.emissive] {
            for &c in color {
                float_bits(c).hash(state);
            }
        }
        float_bits(self.shininess).hash(state);
        float_bits(self.transparency).hash(state);
        self.mode.hash(state);
        self.texture.hash(state);
        self.alphamap.hash(state);
    }
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RotationKeyframe {
    pub time: f32,
    pub rotation: [f32; 3],
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationKeyframe {
    pub time: f32,
    pub position: [f32; 3],
}

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Joint {
    pub flags: u8,
    #[br(map = Name::into_string)]
    #[bw(map = |s: &String| Name::new(s))]
    pub name: String,
    /// Empty for a root joint.
    #[br(map = Name::into_string)]
    #[bw(map = |s: &String| Name::new(s))]
    pub parent_name: String,
    /// Local Euler rotation.
    pub rotation: [f32; 3],
    pub position: [f32; 3],
    #[bw(try_calc = rotation_keyframes.len().try_into())]
    rotation_keyframe_count: u16,
    #[bw(try_calc = translation_keyframes.len().try_into())]
    translation_keyframe_count: u16,
    #[br(count = rotation_keyframe_count)]
    pub rotation_keyframes: Vec<RotationKeyframe>,
    #[br(count = translation_keyframe_count)]
    pub translation_keyframes: Vec<TranslationKeyframe>,
    #[brw(ignore)]
    pub ex: Option<JointEx>,
    #[brw(ignore)]
    pub comment: Option<String>,
}

impl Joint {
    #[inline]
    pub fn is_root(&self) -> bool { self.parent_name.is_empty() }
}
