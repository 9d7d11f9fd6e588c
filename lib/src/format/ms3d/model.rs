use std::{
    fmt::{Display, Formatter},
    io::{Cursor, Read, Seek, Write},
};

use binrw::{BinReaderExt, BinResult, BinWrite, BinWriterExt};

use crate::{
    format::ms3d::{
        comment::{Comment, CommentEx},
        error::{Advisory, CommentOwner, Error, Result},
        extra::{JointEx, ModelEx, VertexEx, VertexEx1, VertexEx2, VertexEx3},
        record::{Group, Header, Joint, Material, Triangle, Vertex},
        DEFAULT_ANIMATION_FPS,
    },
    util::io::{bytes_remaining, has_remaining, read_list, write_list},
};

/// Optional sections following the mandatory prefix, in file order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Section {
    Joints,
    Comments,
    VertexExtra,
    JointExtra,
    ModelExtra,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Joints,
        Section::Comments,
        Section::VertexExtra,
        Section::JointExtra,
        Section::ModelExtra,
    ];
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Section::Joints => "joints",
            Section::Comments => "comments",
            Section::VertexExtra => "vertex extra",
            Section::JointExtra => "joint extra",
            Section::ModelExtra => "model extra",
        })
    }
}

/// An MS3D model.
///
/// Cross references (triangle to vertex, group to triangle, joint to parent,
/// comment to owner) are positional indices or names, never pointers.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub header: Header,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub groups: Vec<Group>,
    pub materials: Vec<Material>,
    pub animation_fps: f32,
    pub current_time: f32,
    pub total_frames: u32,
    pub joints: Vec<Joint>,
    pub sub_version_comments: u32,
    /// Model comment. Group, material and joint comments live on their records.
    pub comment: Option<String>,
    pub sub_version_vertex_extra: u32,
    pub sub_version_joint_extra: u32,
    pub sub_version_model_extra: u32,
    pub model_ex: Option<ModelEx>,
    /// Last optional section present in the file, `None` if it ends after
    /// the mandatory prefix. Writing emits exactly the sections up to and
    /// including this one.
    pub last_section: Option<Section>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            header: Header::default(),
            vertices: vec![],
            triangles: vec![],
            groups: vec![],
            materials: vec![],
            animation_fps: DEFAULT_ANIMATION_FPS,
            current_time: 0.0,
            total_frames: 0,
            joints: vec![],
            sub_version_comments: 0,
            comment: None,
            sub_version_vertex_extra: 0,
            sub_version_joint_extra: 0,
            sub_version_model_extra: 0,
            model_ex: None,
            last_section: Some(Section::ModelExtra),
        }
    }
}

/// A fully read optional section, not yet applied to the model.
enum Staged {
    Joints(Vec<Joint>),
    Comments {
        sub_version: u32,
        groups: Vec<CommentEx>,
        materials: Vec<CommentEx>,
        joints: Vec<CommentEx>,
        model: Option<String>,
    },
    /// `records` is `None` for an unknown sub-version.
    VertexExtra { sub_version: u32, records: Option<Vec<VertexEx>> },
    JointExtra { sub_version: u32, records: Vec<JointEx> },
    ModelExtra { sub_version: u32, record: Option<ModelEx> },
}

impl Model {
    /// Reads a model, logging any advisories.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let (model, advisories) = Self::read_with_diagnostics(reader)?;
        for advisory in &advisories {
            log::warn!("{advisory}");
        }
        Ok(model)
    }

    /// Reads a model and returns it with the advisories found along the way.
    ///
    /// A failure inside the mandatory prefix is fatal. The optional tail is
    /// read section by section; the first section that is missing,
    /// truncated or malformed ends it, and that section and everything after
    /// it keep their defaults.
    pub fn read_with_diagnostics<R: Read + Seek>(reader: &mut R) -> Result<(Self, Vec<Advisory>)> {
        let mut advisories = Vec::new();
        let mut model = Self::read_prefix(reader).map_err(Error::Parse)?;
        if model.header != Header::default() {
            advisories.push(Advisory::HeaderMismatch {
                id: model.header.id.clone(),
                version: model.header.version,
            });
        }

        for section in Section::ALL {
            if !has_remaining(reader)? {
                log::debug!("Optional data ends before {section}");
                break;
            }
            match model.read_section(reader, section) {
                Ok(staged) => {
                    model.apply(staged, &mut advisories);
                    model.last_section = Some(section);
                    log::debug!("Read {section}");
                }
                Err(e) if e.is_eof() => {
                    advisories.push(Advisory::TruncatedSection { section });
                    break;
                }
                Err(e) => {
                    advisories.push(Advisory::MalformedSection { section, message: e.to_string() });
                    break;
                }
            }
        }

        if model.last_section == Some(Section::ModelExtra) {
            let trailing = bytes_remaining(reader)?;
            if trailing > 0 {
                log::debug!("Ignoring {trailing} trailing bytes");
            }
        }
        Ok((model, advisories))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> { Self::read(&mut Cursor::new(data)) }

    fn read_prefix<R: Read + Seek>(reader: &mut R) -> BinResult<Self> {
        let header: Header = reader.read_le()?;
        let vertex_count: u16 = reader.read_le()?;
        let vertices = read_list(reader, vertex_count as usize)?;
        let triangle_count: u16 = reader.read_le()?;
        let triangles = read_list(reader, triangle_count as usize)?;
        let group_count: u16 = reader.read_le()?;
        let groups = read_list(reader, group_count as usize)?;
        let material_count: u16 = reader.read_le()?;
        let materials = read_list(reader, material_count as usize)?;
        let animation_fps: f32 = reader.read_le()?;
        let current_time: f32 = reader.read_le()?;
        let total_frames: u32 = reader.read_le()?;
        log::debug!(
            "Read {vertex_count} vertices, {triangle_count} triangles, {group_count} groups, \
             {material_count} materials"
        );
        Ok(Self {
            header,
            vertices,
            triangles,
            groups,
            materials,
            animation_fps,
            current_time,
            total_frames,
            last_section: None,
            ..Default::default()
        })
    }

    fn read_section<R: Read + Seek>(&self, reader: &mut R, section: Section) -> BinResult<Staged> {
        Ok(match section {
            Section::Joints => {
                let count: u16 = reader.read_le()?;
                Staged::Joints(read_list(reader, count as usize)?)
            }
            Section::Comments => {
                let sub_version: u32 = reader.read_le()?;
                let groups = read_comment_list(reader)?;
                let materials = read_comment_list(reader)?;
                let joints = read_comment_list(reader)?;
                // Any non-zero flag marks a model comment
                let has_model_comment: u32 = reader.read_le()?;
                let model = if has_model_comment != 0 {
                    Some(reader.read_le::<Comment>()?.comment)
                } else {
                    None
                };
                Staged::Comments { sub_version, groups, materials, joints, model }
            }
            Section::VertexExtra => {
                let sub_version: u32 = reader.read_le()?;
                let count = self.vertices.len();
                let records = match sub_version {
                    0 => Some(vec![]),
                    1 => Some(
                        read_list::<VertexEx1, _>(reader, count)?
                            .into_iter()
                            .map(VertexEx::V1)
                            .collect(),
                    ),
                    2 => Some(
                        read_list::<VertexEx2, _>(reader, count)?
                            .into_iter()
                            .map(VertexEx::V2)
                            .collect(),
                    ),
                    3 => Some(
                        read_list::<VertexEx3, _>(reader, count)?
                            .into_iter()
                            .map(VertexEx::V3)
                            .collect(),
                    ),
                    _ => None,
                };
                Staged::VertexExtra { sub_version, records }
            }
            Section::JointExtra => {
                let sub_version: u32 = reader.read_le()?;
                let records =
                    if sub_version > 0 { read_list(reader, self.joints.len())? } else { vec![] };
                Staged::JointExtra { sub_version, records }
            }
            Section::ModelExtra => {
                let sub_version: u32 = reader.read_le()?;
                let record = if sub_version > 0 { Some(reader.read_le()?) } else { None };
                Staged::ModelExtra { sub_version, record }
            }
        })
    }

    fn apply(&mut self, staged: Staged, advisories: &mut Vec<Advisory>) {
        match staged {
            Staged::Joints(joints) => self.joints = joints,
            Staged::Comments { sub_version, groups, materials, joints, model } => {
                self.sub_version_comments = sub_version;
                attach_comments(&mut self.groups, groups, CommentOwner::Group, advisories, |g| {
                    &mut g.comment
                });
                attach_comments(
                    &mut self.materials,
                    materials,
                    CommentOwner::Material,
                    advisories,
                    |m| &mut m.comment,
                );
                attach_comments(&mut self.joints, joints, CommentOwner::Joint, advisories, |j| {
                    &mut j.comment
                });
                self.comment = model;
            }
            Staged::VertexExtra { sub_version, records } => {
                self.sub_version_vertex_extra = sub_version;
                match records {
                    Some(records) => {
                        for (vertex, ex) in self.vertices.iter_mut().zip(records) {
                            vertex.ex = Some(ex);
                        }
                    }
                    None => advisories.push(Advisory::UnknownVertexExtra { sub_version }),
                }
            }
            Staged::JointExtra { sub_version, records } => {
                self.sub_version_joint_extra = sub_version;
                for (joint, ex) in self.joints.iter_mut().zip(records) {
                    joint.ex = Some(ex);
                }
            }
            Staged::ModelExtra { sub_version, record } => {
                self.sub_version_model_extra = sub_version;
                self.model_ex = record;
            }
        }
    }

    /// Writes the mandatory prefix followed by the optional sections up to
    /// [`Model::last_section`], or further if later sections hold data.
    ///
    /// Nothing already written is rolled back if a later section fails.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.write_le(&self.header)?;
        write_counted(writer, "vertices", &self.vertices)?;
        write_counted(writer, "triangles", &self.triangles)?;
        write_counted(writer, "groups", &self.groups)?;
        write_counted(writer, "materials", &self.materials)?;
        writer.write_le(&self.animation_fps)?;
        writer.write_le(&self.current_time)?;
        writer.write_le(&self.total_frames)?;

        let Some(last) = self.last_section.max(self.populated_section()) else { return Ok(()) };
        for section in Section::ALL.into_iter().take_while(|&s| s <= last) {
            self.write_section(writer, section)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Cursor::new(Vec::new());
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn write_section<W: Write + Seek>(&self, writer: &mut W, section: Section) -> Result<()> {
        match section {
            Section::Joints => write_counted(writer, "joints", &self.joints)?,
            Section::Comments => {
                writer.write_le(&self.sub_version_comments)?;
                write_comment_list(writer, self.groups.iter().map(|g| g.comment.as_deref()))?;
                write_comment_list(writer, self.materials.iter().map(|m| m.comment.as_deref()))?;
                write_comment_list(writer, self.joints.iter().map(|j| j.comment.as_deref()))?;
                match self.comment.as_deref() {
                    Some(comment) if !comment.is_empty() => {
                        writer.write_le(&1u32)?;
                        writer.write_le(&Comment { comment: comment.to_owned() })?;
                    }
                    _ => writer.write_le(&0u32)?,
                }
            }
            Section::VertexExtra => {
                let sub_version = self.sub_version_vertex_extra;
                writer.write_le(&sub_version)?;
                if VertexEx::for_sub_version(sub_version).is_none() {
                    if self.vertices.iter().any(|v| v.ex.is_some()) {
                        log::warn!(
                            "Vertex extra sub-version {sub_version} has no record shape, \
                             extension records not written"
                        );
                    }
                    return Ok(());
                }
                for (idx, vertex) in self.vertices.iter().enumerate() {
                    match &vertex.ex {
                        Some(ex) if ex.sub_version() == sub_version => writer.write_le(ex)?,
                        _ => {
                            return Err(Error::Inconsistent(format!(
                                "Vertex {idx} has no sub-version {sub_version} extension record"
                            )))
                        }
                    }
                }
            }
            Section::JointExtra => {
                let sub_version = self.sub_version_joint_extra;
                writer.write_le(&sub_version)?;
                if sub_version > 0 {
                    for (idx, joint) in self.joints.iter().enumerate() {
                        let Some(ex) = &joint.ex else {
                            return Err(Error::Inconsistent(format!(
                                "Joint {idx} has no extension record"
                            )));
                        };
                        writer.write_le(ex)?;
                    }
                }
            }
            Section::ModelExtra => {
                let sub_version = self.sub_version_model_extra;
                writer.write_le(&sub_version)?;
                if sub_version > 0 {
                    let Some(ex) = &self.model_ex else {
                        return Err(Error::Inconsistent(
                            "Model extra sub-version set without a record".into(),
                        ));
                    };
                    writer.write_le(ex)?;
                }
            }
        }
        Ok(())
    }

    /// Last optional section holding data that must be written.
    fn populated_section(&self) -> Option<Section> {
        if self.sub_version_model_extra != 0 || self.model_ex.is_some() {
            Some(Section::ModelExtra)
        } else if self.sub_version_joint_extra != 0 {
            Some(Section::JointExtra)
        } else if self.sub_version_vertex_extra != 0 {
            Some(Section::VertexExtra)
        } else if self.sub_version_comments != 0
            || self.has_model_comment()
            || self.group_comment_count() > 0
            || self.material_comment_count() > 0
            || self.joint_comment_count() > 0
        {
            Some(Section::Comments)
        } else if !self.joints.is_empty() {
            Some(Section::Joints)
        } else {
            None
        }
    }

    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Parent of the joint at `index`, resolved by name.
    pub fn joint_parent(&self, index: usize) -> Option<usize> {
        let joint = self.joints.get(index)?;
        if joint.is_root() {
            return None;
        }
        self.find_joint(&joint.parent_name)
    }

    /// Joints without a resolvable parent. A model may have several.
    pub fn root_joints(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.joints.len()).filter(|&idx| self.joint_parent(idx).is_none())
    }

    /// Empty comments count as absent and are not written.
    pub fn has_model_comment(&self) -> bool { has_text(&self.comment) }

    pub fn group_comment_count(&self) -> usize {
        self.groups.iter().filter(|g| has_text(&g.comment)).count()
    }

    pub fn material_comment_count(&self) -> usize {
        self.materials.iter().filter(|m| has_text(&m.comment)).count()
    }

    pub fn joint_comment_count(&self) -> usize {
        self.joints.iter().filter(|j| has_text(&j.comment)).count()
    }
}

#[inline]
fn has_text(comment: &Option<String>) -> bool {
    comment.as_deref().map_or(false, |c| !c.is_empty())
}

fn read_comment_list<R: Read + Seek>(reader: &mut R) -> BinResult<Vec<CommentEx>> {
    let count: u32 = reader.read_le()?;
    read_list(reader, count as usize)
}

fn write_comment_list<'a, W, I>(writer: &mut W, comments: I) -> BinResult<()>
where
    W: Write + Seek,
    I: Iterator<Item = Option<&'a str>>,
{
    let items: Vec<CommentEx> = comments
        .enumerate()
        .filter_map(|(idx, comment)| match comment {
            Some(c) if !c.is_empty() => {
                Some(CommentEx { index: idx as u32, comment: c.to_owned() })
            }
            _ => None,
        })
        .collect();
    writer.write_le(&(items.len() as u32))?;
    write_list(writer, &items)
}

fn attach_comments<T, F>(
    items: &mut [T],
    comments: Vec<CommentEx>,
    owner: CommentOwner,
    advisories: &mut Vec<Advisory>,
    slot: F,
) where
    F: Fn(&mut T) -> &mut Option<String>,
{
    let count = items.len();
    for CommentEx { index, comment } in comments {
        match items.get_mut(index as usize) {
            Some(item) => *slot(item) = Some(comment),
            None => advisories.push(Advisory::DanglingComment { owner, index, count }),
        }
    }
}

fn write_counted<T, W>(writer: &mut W, what: &'static str, items: &[T]) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
    W: Write + Seek,
{
    let count = u16::try_from(items.len()).map_err(|_| Error::TooMany {
        what,
        count: items.len(),
        max: u16::MAX as usize,
    })?;
    writer.write_le(&count)?;
    write_list(writer, items)?;
    Ok(())
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "header: '{}' version {}", self.header.id, self.header.version)?;
        writeln!(f, "vertices: {}", self.vertices.len())?;
        writeln!(f, "triangles: {}", self.triangles.len())?;
        writeln!(f, "groups: {}", self.groups.len())?;
        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(
                f,
                "  [{idx}] '{}': {} triangles, material {}",
                group.name,
                group.triangle_indices.len(),
                group.material_index
            )?;
        }
        writeln!(f, "materials: {}", self.materials.len())?;
        for (idx, material) in self.materials.iter().enumerate() {
            writeln!(f, "  [{idx}] '{}': texture '{}'", material.name, material.texture)?;
        }
        writeln!(
            f,
            "animation: {} fps, current time {}, {} frames",
            self.animation_fps, self.current_time, self.total_frames
        )?;
        writeln!(f, "joints: {}", self.joints.len())?;
        for (idx, joint) in self.joints.iter().enumerate() {
            writeln!(
                f,
                "  [{idx}] '{}' parent '{}': {} rotation / {} translation keyframes",
                joint.name,
                joint.parent_name,
                joint.rotation_keyframes.len(),
                joint.translation_keyframes.len()
            )?;
        }
        writeln!(
            f,
            "sub-versions: comments {}, vertex extra {}, joint extra {}, model extra {}",
            self.sub_version_comments,
            self.sub_version_vertex_extra,
            self.sub_version_joint_extra,
            self.sub_version_model_extra
        )?;
        match self.last_section {
            Some(section) => writeln!(f, "optional data: up to {section}")?,
            None => writeln!(f, "optional data: none")?,
        }
        if let Some(ex) = &self.model_ex {
            writeln!(
                f,
                "model extra: joint size {}, transparency mode {}, alpha ref {}",
                ex.joint_size, ex.transparency_mode, ex.alpha_ref
            )?;
        }
        if let Some(comment) = &self.comment {
            writeln!(f, "comment: {comment}")?;
        }
        Ok(())
    }
}
