use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult, Side};

// ─── Numeric defaults ─────────────────────────────────────────────────────────

/// Absolute per-entry tolerance for bind/rest/geometry transforms.
pub const DEFAULT_TRANSFORM_TOLERANCE: f64 = 1e-6;

/// Absolute tolerance for individual skin weights.
pub const DEFAULT_WEIGHT_TOLERANCE: f32 = 1e-5;

/// Weights at or below this value are dropped while normalizing skins.
pub const NEGLIGIBLE_WEIGHT_THRESHOLD: f64 = 1e-4;

/// Positional skin mismatches reported per category before summarizing.
pub const DEFAULT_MAX_REPORTED_MISMATCHES: usize = 5;

/// 4×4 transform in column-vector convention (`world = parent_world * local`).
pub type Mat4 = Matrix4<f64>;

// ─── Snapshots ────────────────────────────────────────────────────────────────

/// Canonical, source-agnostic skeleton description.
///
/// The four per-joint arrays always have the same length; [`SkeletonSnapshot::new`]
/// refuses to build anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonSnapshot {
    root_identifier: String,
    joint_names: Vec<String>,
    joint_parent_indices: Vec<i32>,
    bind_transforms: Vec<Mat4>,
    rest_transforms: Vec<Mat4>,
}

impl SkeletonSnapshot {
    /// Build a snapshot, checking the length and parent-range invariants.
    ///
    /// `side` only feeds the error message.
    pub fn new(
        side: Side,
        root_identifier: impl Into<String>,
        joint_names: Vec<String>,
        joint_parent_indices: Vec<i32>,
        bind_transforms: Vec<Mat4>,
        rest_transforms: Vec<Mat4>,
    ) -> RigResult<Self> {
        let root_identifier = root_identifier.into();
        let joint_count = joint_names.len();

        if joint_count == 0 {
            return Err(RigError::EmptyHierarchy {
                side,
                entity: root_identifier,
            });
        }

        if joint_parent_indices.len() != joint_count
            || bind_transforms.len() != joint_count
            || rest_transforms.len() != joint_count
        {
            return Err(RigError::InconsistentSize {
                side,
                entity: root_identifier,
                detail: format!(
                    "joints={}, parents={}, bindTransforms={}, restTransforms={}",
                    joint_count,
                    joint_parent_indices.len(),
                    bind_transforms.len(),
                    rest_transforms.len()
                ),
            });
        }

        if let Some((joint, parent)) = joint_parent_indices
            .iter()
            .enumerate()
            .find(|(_, parent)| **parent < -1 || **parent >= joint_count as i32)
        {
            return Err(RigError::InconsistentSize {
                side,
                entity: root_identifier,
                detail: format!("joint {} has out-of-range parent index {}", joint, parent),
            });
        }

        Ok(Self {
            root_identifier,
            joint_names,
            joint_parent_indices,
            bind_transforms,
            rest_transforms,
        })
    }

    pub fn root_identifier(&self) -> &str {
        &self.root_identifier
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn joint_parent_indices(&self) -> &[i32] {
        &self.joint_parent_indices
    }

    pub fn bind_transforms(&self) -> &[Mat4] {
        &self.bind_transforms
    }

    pub fn rest_transforms(&self) -> &[Mat4] {
        &self.rest_transforms
    }

    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    /// Name of the first joint, which is the hierarchy root for traversal-built snapshots.
    pub fn root_joint_name(&self) -> &str {
        &self.joint_names[0]
    }
}

/// Canonical skin binding for a single geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinSnapshot {
    skeleton_identifier: String,
    geometry_identifier: String,
    joint_indices: Vec<i32>,
    joint_weights: Vec<f32>,
    geometry_bind_transform: Mat4,
}

impl SkinSnapshot {
    pub fn new(
        side: Side,
        skeleton_identifier: impl Into<String>,
        geometry_identifier: impl Into<String>,
        joint_indices: Vec<i32>,
        joint_weights: Vec<f32>,
        geometry_bind_transform: Mat4,
    ) -> RigResult<Self> {
        let geometry_identifier = geometry_identifier.into();
        if joint_indices.len() != joint_weights.len() {
            return Err(RigError::InconsistentSize {
                side,
                entity: geometry_identifier,
                detail: format!(
                    "jointIndices={}, jointWeights={}",
                    joint_indices.len(),
                    joint_weights.len()
                ),
            });
        }

        Ok(Self {
            skeleton_identifier: skeleton_identifier.into(),
            geometry_identifier,
            joint_indices,
            joint_weights,
            geometry_bind_transform,
        })
    }

    pub fn skeleton_identifier(&self) -> &str {
        &self.skeleton_identifier
    }

    pub fn geometry_identifier(&self) -> &str {
        &self.geometry_identifier
    }

    pub fn joint_indices(&self) -> &[i32] {
        &self.joint_indices
    }

    pub fn joint_weights(&self) -> &[f32] {
        &self.joint_weights
    }

    pub fn geometry_bind_transform(&self) -> &Mat4 {
        &self.geometry_bind_transform
    }

    pub fn influence_count(&self) -> usize {
        self.joint_indices.len()
    }
}

// ─── Issues ───────────────────────────────────────────────────────────────────

/// Fixed mismatch taxonomy produced by detailed validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueKind {
    JointCountMismatch,
    JointNameMismatch,
    ParentIndexMismatch,
    BindTransformMismatch,
    RestTransformMismatch,
    WeightCountMismatch,
    JointIndexMismatch,
    WeightValueMismatch,
    GeomBindTransformMismatch,
}

impl IssueKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::JointCountMismatch => "JOINT_COUNT_MISMATCH",
            IssueKind::JointNameMismatch => "JOINT_NAME_MISMATCH",
            IssueKind::ParentIndexMismatch => "PARENT_INDEX_MISMATCH",
            IssueKind::BindTransformMismatch => "BIND_TRANSFORM_MISMATCH",
            IssueKind::RestTransformMismatch => "REST_TRANSFORM_MISMATCH",
            IssueKind::WeightCountMismatch => "WEIGHT_COUNT_MISMATCH",
            IssueKind::JointIndexMismatch => "JOINT_INDEX_MISMATCH",
            IssueKind::WeightValueMismatch => "WEIGHT_VALUE_MISMATCH",
            IssueKind::GeomBindTransformMismatch => "GEOM_BIND_TRANSFORM_MISMATCH",
        }
    }
}

/// A single mismatch found while comparing two snapshots.
///
/// `index` is the joint or influence position, or `None` for structural and
/// summary issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub description: String,
    pub index: Option<usize>,
}

impl ValidationIssue {
    pub fn structural(kind: IssueKind, description: String) -> Self {
        Self {
            kind,
            description,
            index: None,
        }
    }

    pub fn at(kind: IssueKind, index: usize, description: String) -> Self {
        Self {
            kind,
            description,
            index: Some(index),
        }
    }
}

// ─── Comparison options ───────────────────────────────────────────────────────

/// Quick mode answers pass/fail only; detailed mode itemizes every mismatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Quick,
    #[default]
    Detailed,
}

/// Per-call-site tolerances and caps used by the validators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    pub transform_tolerance: f64,
    pub weight_tolerance: f32,
    pub max_reported_mismatches: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            transform_tolerance: DEFAULT_TRANSFORM_TOLERANCE,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            max_reported_mismatches: DEFAULT_MAX_REPORTED_MISMATCHES,
        }
    }
}
