use binrw::binrw;

use crate::format::PrefixedString;

/// Comment attached to the group, material or joint at `index`.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentEx {
    pub index: u32,
    #[br(map = PrefixedString::into_string)]
    #[bw(map = |s: &String| PrefixedString::new(s))]
    pub comment: String,
}

/// Comment for the model as a whole.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comment {
    #[br(map = PrefixedString::into_string)]
    #[bw(map = |s: &String| PrefixedString::new(s))]
    pub comment: String,
}
