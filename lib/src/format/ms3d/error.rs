use std::fmt::{Display, Formatter};

use crate::format::ms3d::model::Section;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mandatory part of the file could not be read.
    #[error("Not a valid MS3D model: {0}")]
    Parse(#[source] binrw::Error),
    #[error("Failed to write MS3D model: {0}")]
    Write(#[from] binrw::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Too many {what} to encode: {count} (at most {max})")]
    TooMany { what: &'static str, count: usize, max: usize },
    #[error("Inconsistent model: {0}")]
    Inconsistent(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommentOwner {
    Group,
    Material,
    Joint,
}

impl Display for CommentOwner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Group => "group",
            Self::Material => "material",
            Self::Joint => "joint",
        })
    }
}

/// Non-fatal condition found while reading. The model is still usable.
#[derive(Clone, Debug, PartialEq)]
pub enum Advisory {
    /// The header doesn't match `MS3D000000` version 4.
    HeaderMismatch { id: String, version: u32 },
    /// A comment refers past the end of its collection and was dropped.
    DanglingComment { owner: CommentOwner, index: u32, count: usize },
    /// Vertex-extra sub-version without a known record shape; its records were skipped.
    UnknownVertexExtra { sub_version: u32 },
    /// The file ends inside an optional section; the section was discarded.
    TruncatedSection { section: Section },
    /// An optional section could not be decoded; it and everything after it were discarded.
    MalformedSection { section: Section, message: String },
}

impl Display for Advisory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderMismatch { id, version } => {
                write!(f, "Unexpected file header: id '{id}', version {version}")
            }
            Self::DanglingComment { owner, index, count } => {
                write!(f, "Dropped {owner} comment: index {index} out of range ({count} {owner}s)")
            }
            Self::UnknownVertexExtra { sub_version } => {
                write!(f, "Unknown vertex extra sub-version {sub_version}, records skipped")
            }
            Self::TruncatedSection { section } => {
                write!(f, "File ends inside {section}, section discarded")
            }
            Self::MalformedSection { section, message } => {
                write!(f, "Malformed {section}: {message}")
            }
        }
    }
}
