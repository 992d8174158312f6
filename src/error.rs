use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two rig representations a value or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The exported interchange document.
    Interchange,
    /// The authoring scene graph.
    Scene,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Interchange => "interchange",
            Side::Scene => "scene",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures raised while normalizing one side of a rig into a snapshot.
///
/// Every variant names the side and the entity (path or joint name) that
/// triggered it, so the rendered message is enough to locate the problem.
pub enum RigError {
    /// The stage or scene cannot be opened, or a path does not resolve.
    #[error("[{side}] source unavailable: {entity} ({reason})")]
    SourceUnavailable {
        side: Side,
        entity: String,
        reason: String,
    },

    /// A required attribute could not be read.
    #[error("[{side}] missing attribute '{attribute}' on {entity}")]
    MissingAttribute {
        side: Side,
        entity: String,
        attribute: &'static str,
    },

    /// The requested skeleton root is not a joint.
    #[error("[{side}] root is not a joint: {entity}")]
    NotAJoint { side: Side, entity: String },

    /// Traversal from the root produced no joints.
    #[error("[{side}] no joints found in hierarchy: {entity}")]
    EmptyHierarchy { side: Side, entity: String },

    /// No skin binding drives the geometry.
    #[error("[{side}] no skin binding found for geometry: {entity}")]
    NoSkinBinding { side: Side, entity: String },

    /// Arrays describing one structure disagree in length or range.
    #[error("[{side}] inconsistent data sizes on {entity}: {detail}")]
    InconsistentSize {
        side: Side,
        entity: String,
        detail: String,
    },

    /// A world matrix needed for a relative transform cannot be inverted.
    #[error("[{side}] world matrix is not invertible: {entity}")]
    SingularTransform { side: Side, entity: String },
}

impl RigError {
    /// Side that produced this failure.
    pub fn side(&self) -> Side {
        match self {
            RigError::SourceUnavailable { side, .. }
            | RigError::MissingAttribute { side, .. }
            | RigError::NotAJoint { side, .. }
            | RigError::EmptyHierarchy { side, .. }
            | RigError::NoSkinBinding { side, .. }
            | RigError::InconsistentSize { side, .. }
            | RigError::SingularTransform { side, .. } => *side,
        }
    }
}

pub type RigResult<T> = Result<T, RigError>;
