use std::collections::HashSet;

use crate::error::{RigError, RigResult, Side};
use crate::log_debug;

use super::path_utils::{join_segment, parent_indices_from_paths};
use super::source::{BindingInfo, InterchangeStage, SceneGraph};
use super::types::{Mat4, SkeletonSnapshot};

// ─── Interchange side ─────────────────────────────────────────────────────────

/// Read a skeleton prim as authored and derive parents from its joint paths.
pub(super) fn skeleton_from_interchange<S: InterchangeStage + ?Sized>(
    stage: &S,
    skeleton: &str,
) -> RigResult<SkeletonSnapshot> {
    if !stage.has_skeleton(skeleton) {
        return Err(RigError::SourceUnavailable {
            side: Side::Interchange,
            entity: skeleton.to_string(),
            reason: format!("no skeleton prim in {}", stage.locator()),
        });
    }

    let missing = |attribute: &'static str| RigError::MissingAttribute {
        side: Side::Interchange,
        entity: skeleton.to_string(),
        attribute,
    };

    let joint_names = stage.joint_names(skeleton).ok_or_else(|| missing("joints"))?;
    let joint_parent_indices = parent_indices_from_paths(&joint_names);
    let bind_transforms = stage
        .bind_transforms(skeleton)
        .ok_or_else(|| missing("bindTransforms"))?;
    let rest_transforms = stage
        .rest_transforms(skeleton)
        .ok_or_else(|| missing("restTransforms"))?;

    let snapshot = SkeletonSnapshot::new(
        Side::Interchange,
        skeleton,
        joint_names,
        joint_parent_indices,
        bind_transforms,
        rest_transforms,
    )?;

    log_debug!(
        "Parsed interchange skeleton {} with {} joints",
        skeleton,
        snapshot.joint_count()
    );
    Ok(snapshot)
}

// ─── Scene side ───────────────────────────────────────────────────────────────

/// Depth-first, pre-order walk over joint children starting at `root`.
///
/// Returns `(joint, parent index)` in visitation order. The parent index
/// refers to the position of the immediate parent in the returned list, or −1
/// for the root.
pub(super) fn collect_joint_hierarchy<G: SceneGraph>(
    scene: &G,
    root: G::Node,
) -> Vec<(G::Node, i32)> {
    let mut visited = HashSet::<G::Node>::new();
    let mut ordered = Vec::<(G::Node, i32)>::new();
    let mut stack = vec![(root, -1i32)];

    while let Some((node, parent_index)) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }

        let index = ordered.len() as i32;
        ordered.push((node, parent_index));

        // Reverse push keeps siblings in native order when popped.
        for child in scene.joint_children(node).into_iter().rev() {
            stack.push((child, index));
        }
    }

    ordered
}

/// Build a skeleton snapshot from a scene joint hierarchy.
///
/// Joint names are slash-joined from the root (`root/spine/head`) so they line
/// up with interchange joint paths. Rest transforms are expressed relative to
/// the root's world matrix; bind transforms come from the skin bindings.
pub(super) fn skeleton_from_scene<G: SceneGraph>(
    scene: &G,
    bindings: &[BindingInfo<G::Node, G::Binding>],
    root: G::Node,
) -> RigResult<SkeletonSnapshot> {
    let root_path = scene.full_path(root);
    if !scene.is_joint(root) {
        return Err(RigError::NotAJoint {
            side: Side::Scene,
            entity: root_path,
        });
    }

    let root_world_inverse =
        scene
            .world_matrix(root)
            .try_inverse()
            .ok_or_else(|| RigError::SingularTransform {
                side: Side::Scene,
                entity: root_path.clone(),
            })?;

    let hierarchy = collect_joint_hierarchy(scene, root);
    if hierarchy.is_empty() {
        return Err(RigError::EmptyHierarchy {
            side: Side::Scene,
            entity: root_path,
        });
    }

    let mut joint_names = Vec::<String>::with_capacity(hierarchy.len());
    let mut joint_parent_indices = Vec::<i32>::with_capacity(hierarchy.len());
    let mut bind_transforms = Vec::<Mat4>::with_capacity(hierarchy.len());
    let mut rest_transforms = Vec::<Mat4>::with_capacity(hierarchy.len());

    for (joint, parent_index) in &hierarchy {
        let name = match usize::try_from(*parent_index) {
            Ok(parent) => join_segment(&joint_names[parent], &scene.name(*joint)),
            Err(_) => scene.name(*joint),
        };
        joint_names.push(name);
        joint_parent_indices.push(*parent_index);
        rest_transforms.push(root_world_inverse * scene.world_matrix(*joint));
        bind_transforms.push(bind_matrix_for_joint(scene, bindings, *joint));
    }

    let snapshot = SkeletonSnapshot::new(
        Side::Scene,
        root_path,
        joint_names,
        joint_parent_indices,
        bind_transforms,
        rest_transforms,
    )?;

    log_debug!(
        "Parsed scene skeleton {} with {} joints",
        snapshot.root_identifier(),
        snapshot.joint_count()
    );
    Ok(snapshot)
}

/// Pre-bind matrix stored for `joint` by the first binding that lists it.
///
/// Bindings that list the joint but have no slot or matrix for it are skipped.
/// Returns identity when no binding references the joint.
pub(super) fn bind_matrix_for_joint<G: SceneGraph>(
    scene: &G,
    bindings: &[BindingInfo<G::Node, G::Binding>],
    joint: G::Node,
) -> Mat4 {
    bindings
        .iter()
        .filter(|info| info.influences.contains(&joint))
        .find_map(|info| {
            let slot = scene.influence_slot(info.binding, joint)?;
            scene.prebind_matrix(info.binding, slot)
        })
        .unwrap_or_else(Mat4::identity)
}
