use std::fmt::Write;

use crate::format::ms3d::{
    Model, MAX_GROUPS, MAX_JOINTS, MAX_MATERIALS, MAX_TRIANGLES, MAX_VERTICES,
};

/// Result of checking a model against the format's capacity ceilings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub report: String,
}

impl Model {
    /// Compares every collection against its capacity ceiling. Never fails;
    /// over-capacity counts are marked in the report.
    pub fn validate(&self) -> Validation {
        let mut valid = true;
        let mut report = String::from("MS3D statistics:");
        let limited = [
            ("vertices ........", self.vertices.len(), MAX_VERTICES),
            ("triangles .......", self.triangles.len(), MAX_TRIANGLES),
            ("groups ..........", self.groups.len(), MAX_GROUPS),
            ("materials .......", self.materials.len(), MAX_MATERIALS),
            ("joints ..........", self.joints.len(), MAX_JOINTS),
        ];
        for (label, count, max) in limited {
            let _ = write!(report, "\n  number of {label}: {count}");
            if count > max {
                let _ = write!(report, " limit exceeded! (limit is {max})");
                valid = false;
            }
        }
        let comments = [
            ("model comments ..", usize::from(self.has_model_comment())),
            ("group comments ..", self.group_comment_count()),
            ("material comments", self.material_comment_count()),
            ("joint comments ..", self.joint_comment_count()),
        ];
        for (label, count) in comments {
            let _ = write!(report, "\n  number of {label}: {count}");
        }
        Validation { valid, report }
    }

    #[inline]
    pub fn is_valid(&self) -> bool { self.validate().valid }
}
