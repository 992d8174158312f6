use crate::error::{RigError, RigResult, Side};
use crate::log_debug;

use super::path_utils::common_ancestor;
use super::source::{BindingInfo, InterchangeStage, SceneGraph};
use super::types::{Mat4, SkinSnapshot};

// ─── Weight filtering ─────────────────────────────────────────────────────────

/// Keep only influences whose weight exceeds `threshold`, preserving order.
pub(super) fn filter_negligible_weights(
    joint_indices: &[i32],
    joint_weights: &[f32],
    threshold: f64,
) -> (Vec<i32>, Vec<f32>) {
    joint_indices
        .iter()
        .zip(joint_weights)
        .filter(|(_, weight)| f64::from(**weight) > threshold)
        .map(|(index, weight)| (*index, *weight))
        .unzip()
}

// ─── Interchange side ─────────────────────────────────────────────────────────

/// Read a skin-binding prim and apply the same negligible-weight filter as
/// the scene side so both produce comparable sparse arrays.
pub(super) fn skin_from_interchange<S: InterchangeStage + ?Sized>(
    stage: &S,
    geometry: &str,
    negligible_weight: f64,
) -> RigResult<SkinSnapshot> {
    if !stage.has_skin_binding(geometry) {
        return Err(RigError::NoSkinBinding {
            side: Side::Interchange,
            entity: geometry.to_string(),
        });
    }

    let missing = |attribute: &'static str| RigError::MissingAttribute {
        side: Side::Interchange,
        entity: geometry.to_string(),
        attribute,
    };

    let skeleton = stage
        .binding_skeleton(geometry)
        .ok_or_else(|| missing("skeleton"))?;
    let authored_indices = stage
        .binding_joint_indices(geometry)
        .ok_or_else(|| missing("jointIndices"))?;
    let authored_weights = stage
        .binding_joint_weights(geometry)
        .ok_or_else(|| missing("jointWeights"))?;

    if authored_indices.len() != authored_weights.len() {
        return Err(RigError::InconsistentSize {
            side: Side::Interchange,
            entity: geometry.to_string(),
            detail: format!(
                "jointIndices={}, jointWeights={}",
                authored_indices.len(),
                authored_weights.len()
            ),
        });
    }

    let (joint_indices, joint_weights) =
        filter_negligible_weights(&authored_indices, &authored_weights, negligible_weight);
    let geometry_bind_transform = stage
        .geom_bind_transform(geometry)
        .unwrap_or_else(Mat4::identity);

    SkinSnapshot::new(
        Side::Interchange,
        skeleton,
        geometry,
        joint_indices,
        joint_weights,
        geometry_bind_transform,
    )
}

// ─── Scene side ───────────────────────────────────────────────────────────────

/// Build a skin snapshot for a scene geometry.
///
/// The skeleton identifier is the nearest common ancestor of all influence
/// paths. This is a heuristic and can pick an unrelated ancestor when the
/// influences come from disjoint hierarchies.
pub(super) fn skin_from_scene<G: SceneGraph>(
    scene: &G,
    bindings: &[BindingInfo<G::Node, G::Binding>],
    geometry: G::Node,
    negligible_weight: f64,
) -> RigResult<SkinSnapshot> {
    let geometry_path = scene.full_path(geometry);

    let Some(info) = bindings.iter().find(|info| info.outputs.contains(&geometry)) else {
        return Err(RigError::NoSkinBinding {
            side: Side::Scene,
            entity: geometry_path,
        });
    };

    let influence_paths: Vec<String> = info
        .influences
        .iter()
        .map(|joint| scene.full_path(*joint))
        .collect();
    let Some((first, rest)) = influence_paths.split_first() else {
        return Err(RigError::NoSkinBinding {
            side: Side::Scene,
            entity: geometry_path,
        });
    };
    let others: Vec<&str> = rest.iter().map(String::as_str).collect();
    let skeleton_identifier = common_ancestor(first, &others).to_string();

    let geometry_bind_transform = scene
        .prebind_matrix(info.binding, 0)
        .unwrap_or_else(Mat4::identity);

    let mut joint_indices = Vec::<i32>::new();
    let mut joint_weights = Vec::<f32>::new();
    for vertex in 0..scene.vertex_count(geometry) {
        for (influence, weight) in scene.vertex_weights(info.binding, geometry, vertex) {
            if weight > negligible_weight {
                joint_indices.push(influence as i32);
                joint_weights.push(weight as f32);
            }
        }
    }

    log_debug!(
        "Parsed scene skin {} with {} influences (skeleton {})",
        geometry_path,
        joint_indices.len(),
        skeleton_identifier
    );

    SkinSnapshot::new(
        Side::Scene,
        skeleton_identifier,
        geometry_path,
        joint_indices,
        joint_weights,
        geometry_bind_transform,
    )
}
