//! Extension records stored in the optional tail, one shape per sub-version.

use std::io::{Seek, Write};

use binrw::{binrw, BinResult, BinWrite, Endian};

use crate::format::ms3d::{DEFAULT_JOINT_SIZE, NO_BONE, TRANSPARENCY_SIMPLE};

/// Vertex-extra sub-version 1: extra bone ids and weights.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexEx1 {
    pub bone_ids: [i8; 3],
    /// 0..=100
    pub weights: [u8; 3],
}

/// Vertex-extra sub-version 2: adds a free-form `extra` value (e.g. a color).
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexEx2 {
    pub bone_ids: [i8; 3],
    pub weights: [u8; 3],
    pub extra: u32,
}

/// Vertex-extra sub-version 3. Same layout as sub-version 2.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexEx3 {
    pub bone_ids: [i8; 3],
    pub weights: [u8; 3],
    pub extra: u32,
}

impl Default for VertexEx1 {
    fn default() -> Self { Self { bone_ids: [NO_BONE; 3], weights: [0; 3] } }
}

impl Default for VertexEx2 {
    fn default() -> Self { Self { bone_ids: [NO_BONE; 3], weights: [0; 3], extra: 0 } }
}

impl Default for VertexEx3 {
    fn default() -> Self { Self { bone_ids: [NO_BONE; 3], weights: [0; 3], extra: 0 } }
}

/// Per-vertex extension record. The variant matches the model's
/// vertex-extra sub-version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VertexEx {
    V1(VertexEx1),
    V2(VertexEx2),
    V3(VertexEx3),
}

impl VertexEx {
    /// Default record for a sub-version, or `None` if it has no record shape.
    pub fn for_sub_version(sub_version: u32) -> Option<Self> {
        match sub_version {
            1 => Some(Self::V1(VertexEx1::default())),
            2 => Some(Self::V2(VertexEx2::default())),
            3 => Some(Self::V3(VertexEx3::default())),
            _ => None,
        }
    }

    pub fn sub_version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
            Self::V3(_) => 3,
        }
    }

    pub fn bone_ids(&self) -> [i8; 3] {
        match self {
            Self::V1(ex) => ex.bone_ids,
            Self::V2(ex) => ex.bone_ids,
            Self::V3(ex) => ex.bone_ids,
        }
    }

    pub fn weights(&self) -> [u8; 3] {
        match self {
            Self::V1(ex) => ex.weights,
            Self::V2(ex) => ex.weights,
            Self::V3(ex) => ex.weights,
        }
    }

    /// `None` for sub-version 1, which has no extra field.
    pub fn extra(&self) -> Option<u32> {
        match self {
            Self::V1(_) => None,
            Self::V2(ex) => Some(ex.extra),
            Self::V3(ex) => Some(ex.extra),
        }
    }

    /// Weight of `bone_ids[2]`, which is not stored: 100 minus the explicit
    /// weights. Zero when no explicit weight is set.
    pub fn implicit_weight(&self) -> u8 {
        let weights = self.weights();
        if weights == [0; 3] {
            return 0;
        }
        let sum: u32 = weights.iter().map(|&w| w as u32).sum();
        100u32.saturating_sub(sum) as u8
    }

    /// The four (bone, weight) influences of a vertex whose base record
    /// carries `vertex_bone_id`.
    ///
    /// `weights[0]` belongs to the vertex's own bone, `weights[1]` and
    /// `weights[2]` to `bone_ids[0]` and `bone_ids[1]`, and the remainder to
    /// `bone_ids[2]`. With all weights zero the vertex's own bone takes 100.
    pub fn skin_weights(&self, vertex_bone_id: i8) -> [(i8, u8); 4] {
        let ids = self.bone_ids();
        let weights = self.weights();
        if weights == [0; 3] {
            return [(vertex_bone_id, 100), (ids[0], 0), (ids[1], 0), (ids[2], 0)];
        }
        [
            (vertex_bone_id, weights[0]),
            (ids[0], weights[1]),
            (ids[1], weights[2]),
            (ids[2], self.implicit_weight()),
        ]
    }
}

impl BinWrite for VertexEx {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        match self {
            Self::V1(ex) => ex.write_options(writer, endian, args),
            Self::V2(ex) => ex.write_options(writer, endian, args),
            Self::V3(ex) => ex.write_options(writer, endian, args),
        }
    }
}

/// Joint-extra record: editor display color.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointEx {
    pub color: [f32; 3],
}

/// Model-extra record.
#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct ModelEx {
    pub joint_size: f32,
    /// One of the `TRANSPARENCY_*` modes.
    pub transparency_mode: u32,
    pub alpha_ref: f32,
}

impl Default for ModelEx {
    fn default() -> Self {
        Self {
            joint_size: DEFAULT_JOINT_SIZE,
            transparency_mode: TRANSPARENCY_SIMPLE,
            alpha_ref: 0.0,
        }
    }
}
