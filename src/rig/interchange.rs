use std::{fs, path::Path};

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult, Side};
use crate::log_debug;

use super::source::InterchangeStage;
use super::types::Mat4;

/// Four authored rows in row-vector convention (translation in the last row).
pub type AuthoredMatrix = [[f64; 4]; 4];

/// Convert an authored row-vector matrix into the column-vector convention.
pub fn authored_to_matrix(rows: &AuthoredMatrix) -> Mat4 {
    Matrix4::from_fn(|row, column| rows[column][row])
}

/// Inverse of [`authored_to_matrix`].
pub fn matrix_to_authored(matrix: &Mat4) -> AuthoredMatrix {
    let mut rows = [[0.0; 4]; 4];
    for (row, values) in rows.iter_mut().enumerate() {
        for (column, value) in values.iter_mut().enumerate() {
            *value = matrix[(column, row)];
        }
    }
    rows
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonPrim {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_transforms: Option<Vec<AuthoredMatrix>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_transforms: Option<Vec<AuthoredMatrix>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkinBindingPrim {
    pub geometry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_indices: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_weights: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geom_bind_transform: Option<AuthoredMatrix>,
}

/// Rig interchange document: skeleton prims and skin-binding prims.
///
/// Every attribute is optional at parse time so that unauthored attributes
/// surface as `MissingAttribute` during normalization instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeDocument {
    #[serde(skip)]
    locator: String,
    #[serde(default)]
    pub skeletons: Vec<SkeletonPrim>,
    #[serde(default)]
    pub skin_bindings: Vec<SkinBindingPrim>,
}

impl InterchangeDocument {
    pub fn open(path: &Path) -> RigResult<Self> {
        let locator = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|error| RigError::SourceUnavailable {
            side: Side::Interchange,
            entity: locator.clone(),
            reason: error.to_string(),
        })?;
        Self::from_json_str(locator, &content)
    }

    pub fn from_json_str(locator: impl Into<String>, content: &str) -> RigResult<Self> {
        let locator = locator.into();
        let mut document: Self =
            serde_json::from_str(content).map_err(|error| RigError::SourceUnavailable {
                side: Side::Interchange,
                entity: locator.clone(),
                reason: format!("invalid interchange JSON: {}", error),
            })?;
        document.locator = locator;

        log_debug!(
            "Loaded interchange document {} ({} skeletons, {} skin bindings)",
            document.locator,
            document.skeletons.len(),
            document.skin_bindings.len()
        );
        Ok(document)
    }

    fn skeleton(&self, path: &str) -> Option<&SkeletonPrim> {
        self.skeletons.iter().find(|prim| prim.path == path)
    }

    fn skin_binding(&self, geometry: &str) -> Option<&SkinBindingPrim> {
        self.skin_bindings
            .iter()
            .find(|prim| prim.geometry == geometry)
    }
}

fn convert_all(rows: &[AuthoredMatrix]) -> Vec<Mat4> {
    rows.iter().map(authored_to_matrix).collect()
}

impl InterchangeStage for InterchangeDocument {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn skeleton_paths(&self) -> Vec<String> {
        self.skeletons.iter().map(|prim| prim.path.clone()).collect()
    }

    fn has_skeleton(&self, skeleton: &str) -> bool {
        self.skeleton(skeleton).is_some()
    }

    fn joint_names(&self, skeleton: &str) -> Option<Vec<String>> {
        self.skeleton(skeleton)?.joints.clone()
    }

    fn bind_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>> {
        self.skeleton(skeleton)?
            .bind_transforms
            .as_deref()
            .map(convert_all)
    }

    fn rest_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>> {
        self.skeleton(skeleton)?
            .rest_transforms
            .as_deref()
            .map(convert_all)
    }

    fn skin_binding_geometries(&self) -> Vec<String> {
        self.skin_bindings
            .iter()
            .map(|prim| prim.geometry.clone())
            .collect()
    }

    fn has_skin_binding(&self, geometry: &str) -> bool {
        self.skin_binding(geometry).is_some()
    }

    fn binding_skeleton(&self, geometry: &str) -> Option<String> {
        self.skin_binding(geometry)?.skeleton.clone()
    }

    fn binding_joint_indices(&self, geometry: &str) -> Option<Vec<i32>> {
        self.skin_binding(geometry)?.joint_indices.clone()
    }

    fn binding_joint_weights(&self, geometry: &str) -> Option<Vec<f32>> {
        self.skin_binding(geometry)?.joint_weights.clone()
    }

    fn geom_bind_transform(&self, geometry: &str) -> Option<Mat4> {
        self.skin_binding(geometry)?
            .geom_bind_transform
            .as_ref()
            .map(authored_to_matrix)
    }
}
