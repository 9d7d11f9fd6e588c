//! MilkShape 3D (`.ms3d`) binary model format, version 4.
//!
//! A file is a mandatory prefix (header, vertices, triangles, groups,
//! materials, animation settings) followed by an optional tail whose
//! sections (joints, comments, vertex/joint/model extensions) may stop at
//! any section boundary. All values are little-endian and packed.

pub mod comment;
pub mod error;
pub mod extra;
pub mod model;
pub mod record;
pub mod validate;

#[cfg(test)]
mod tests;

pub use comment::{Comment, CommentEx};
pub use error::{Advisory, CommentOwner, Error};
pub use extra::{JointEx, ModelEx, VertexEx, VertexEx1, VertexEx2, VertexEx3};
pub use model::{Model, Section};
pub use record::{
    Group, Header, Joint, Material, RotationKeyframe, TranslationKeyframe, Triangle, Vertex,
};
pub use validate::Validation;

pub const MAGIC: &str = "MS3D000000";
pub const VERSION: u32 = 4;

pub const MAX_VERTICES: usize = 65534;
pub const MAX_TRIANGLES: usize = 65534;
pub const MAX_GROUPS: usize = 255;
pub const MAX_MATERIALS: usize = 128;
pub const MAX_JOINTS: usize = 128;
pub const MAX_SMOOTHING_GROUP: u8 = 32;
pub const MAX_MATERIAL_SHININESS: f32 = 128.0;

pub const ID_LENGTH: usize = 10;
pub const NAME_LENGTH: usize = 32;
pub const FILENAME_LENGTH: usize = 128;

// Entity flags
pub const FLAG_NONE: u8 = 0;
pub const FLAG_SELECTED: u8 = 1;
pub const FLAG_HIDDEN: u8 = 2;
pub const FLAG_SELECTED2: u8 = 4;
pub const FLAG_DIRTY: u8 = 8;
pub const FLAG_IS_KEY: u8 = 16;
pub const FLAG_NEWLY_CREATED: u8 = 32;
pub const FLAG_MARKED: u8 = 64;

// Material texture mode
pub const TEXTURE_NONE: i8 = 0x00;
pub const TEXTURE_COMBINE_ALPHA: i8 = 0x20;
pub const TEXTURE_HAS_ALPHA: i8 = 0x40;
pub const TEXTURE_SPHERE_MAP: i8 = 0x80u8 as i8;

// Model transparency mode
pub const TRANSPARENCY_SIMPLE: u32 = 0;
pub const TRANSPARENCY_DEPTH_BUFFERED_WITH_ALPHA_REF: u32 = 1;
pub const TRANSPARENCY_DEPTH_SORTED_TRIANGLES: u32 = 2;

pub const NO_BONE: i8 = -1;
pub const NO_MATERIAL: i8 = -1;

pub const DEFAULT_ANIMATION_FPS: f32 = 25.0;
pub const DEFAULT_JOINT_SIZE: f32 = 1.0;
