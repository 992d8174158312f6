use std::{cell::OnceCell, fmt::Debug, hash::Hash};

use crate::error::{RigError, RigResult, Side};

use super::skeleton::{skeleton_from_interchange, skeleton_from_scene};
use super::skinning::{skin_from_interchange, skin_from_scene};
use super::types::{Mat4, SkeletonSnapshot, SkinSnapshot};

// ─── Source capability ────────────────────────────────────────────────────────

/// One side of a rig, able to produce normalized snapshots.
///
/// Validators only ever see snapshots, so anything implementing this trait
/// (including in-memory fixtures) can be cross-checked against anything else.
pub trait HierarchySource {
    fn side(&self) -> Side;

    /// File path or other locator the source was opened from.
    fn locator(&self) -> &str;

    /// Identifiers accepted by [`HierarchySource::read_skeleton`].
    fn list_skeletons(&self) -> RigResult<Vec<String>>;

    fn read_skeleton(&self, skeleton: &str) -> RigResult<SkeletonSnapshot>;

    /// Identifiers accepted by [`HierarchySource::read_skin_binding`].
    fn list_skinned_geometries(&self) -> RigResult<Vec<String>>;

    fn read_skin_binding(&self, geometry: &str) -> RigResult<SkinSnapshot>;
}

// ─── External query layers ────────────────────────────────────────────────────

/// Attribute reads against an opened interchange stage.
///
/// Every read may fail independently; `None` means the attribute is not authored.
pub trait InterchangeStage {
    fn locator(&self) -> &str;

    fn skeleton_paths(&self) -> Vec<String>;

    fn has_skeleton(&self, skeleton: &str) -> bool;

    fn joint_names(&self, skeleton: &str) -> Option<Vec<String>>;

    fn bind_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>>;

    fn rest_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>>;

    fn skin_binding_geometries(&self) -> Vec<String>;

    fn has_skin_binding(&self, geometry: &str) -> bool;

    fn binding_skeleton(&self, geometry: &str) -> Option<String>;

    fn binding_joint_indices(&self, geometry: &str) -> Option<Vec<i32>>;

    fn binding_joint_weights(&self, geometry: &str) -> Option<Vec<f32>>;

    fn geom_bind_transform(&self, geometry: &str) -> Option<Mat4>;
}

/// Traversal and attribute queries against a scene graph.
pub trait SceneGraph {
    type Node: Copy + Eq + Hash + Debug;
    type Binding: Copy + Eq + Debug;

    fn locator(&self) -> &str;

    /// Every node in stable enumeration order.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Resolve a full path, falling back to a bare node name.
    fn resolve(&self, path: &str) -> Option<Self::Node>;

    fn is_joint(&self, node: Self::Node) -> bool;

    fn name(&self, node: Self::Node) -> String;

    fn full_path(&self, node: Self::Node) -> String;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn world_matrix(&self, node: Self::Node) -> Mat4;

    fn skin_bindings(&self) -> Vec<Self::Binding>;

    /// Influence joints in the binding's native order.
    fn influences(&self, binding: Self::Binding) -> Vec<Self::Node>;

    fn influence_slot(&self, binding: Self::Binding, joint: Self::Node) -> Option<usize>;

    fn prebind_matrix(&self, binding: Self::Binding, slot: usize) -> Option<Mat4>;

    /// Geometries deformed by the binding.
    fn binding_outputs(&self, binding: Self::Binding) -> Vec<Self::Node>;

    fn vertex_count(&self, geometry: Self::Node) -> usize;

    /// `(influence index, weight)` pairs for one vertex.
    fn vertex_weights(
        &self,
        binding: Self::Binding,
        geometry: Self::Node,
        vertex: usize,
    ) -> Vec<(usize, f64)>;

    /// Child joints only; non-joint children and their subtrees are pruned.
    fn joint_children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|child| self.is_joint(*child))
            .collect()
    }
}

// ─── Interchange adapter ──────────────────────────────────────────────────────

pub struct InterchangeSource<S> {
    stage: S,
    negligible_weight: f64,
}

impl<S: InterchangeStage> InterchangeSource<S> {
    pub fn new(stage: S, negligible_weight: f64) -> Self {
        Self {
            stage,
            negligible_weight,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }
}

impl<S: InterchangeStage> HierarchySource for InterchangeSource<S> {
    fn side(&self) -> Side {
        Side::Interchange
    }

    fn locator(&self) -> &str {
        self.stage.locator()
    }

    fn list_skeletons(&self) -> RigResult<Vec<String>> {
        Ok(self.stage.skeleton_paths())
    }

    fn read_skeleton(&self, skeleton: &str) -> RigResult<SkeletonSnapshot> {
        skeleton_from_interchange(&self.stage, skeleton)
    }

    fn list_skinned_geometries(&self) -> RigResult<Vec<String>> {
        Ok(self.stage.skin_binding_geometries())
    }

    fn read_skin_binding(&self, geometry: &str) -> RigResult<SkinSnapshot> {
        skin_from_interchange(&self.stage, geometry, self.negligible_weight)
    }
}

// ─── Scene adapter ────────────────────────────────────────────────────────────

/// A skin binding with its influence and output lists resolved once.
#[derive(Debug, Clone)]
pub struct BindingInfo<N, B> {
    pub binding: B,
    pub influences: Vec<N>,
    pub outputs: Vec<N>,
}

/// Scene side of a run.
///
/// Skin bindings are enumerated on first use and cached for the lifetime of
/// this value; build a fresh source for every validation run.
pub struct SceneSource<G: SceneGraph> {
    scene: G,
    negligible_weight: f64,
    bindings: OnceCell<Vec<BindingInfo<G::Node, G::Binding>>>,
}

impl<G: SceneGraph> SceneSource<G> {
    pub fn new(scene: G, negligible_weight: f64) -> Self {
        Self {
            scene,
            negligible_weight,
            bindings: OnceCell::new(),
        }
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    pub fn bindings(&self) -> &[BindingInfo<G::Node, G::Binding>] {
        self.bindings.get_or_init(|| {
            self.scene
                .skin_bindings()
                .into_iter()
                .map(|binding| BindingInfo {
                    binding,
                    influences: self.scene.influences(binding),
                    outputs: self.scene.binding_outputs(binding),
                })
                .collect()
        })
    }

    /// Joints whose structural parent is not a joint.
    pub fn skeleton_roots(&self) -> Vec<G::Node> {
        self.scene
            .nodes()
            .into_iter()
            .filter(|node| self.scene.is_joint(*node))
            .filter(|node| {
                self.scene
                    .parent(*node)
                    .map(|parent| !self.scene.is_joint(parent))
                    .unwrap_or(true)
            })
            .collect()
    }
}

impl<G: SceneGraph> HierarchySource for SceneSource<G> {
    fn side(&self) -> Side {
        Side::Scene
    }

    fn locator(&self) -> &str {
        self.scene.locator()
    }

    fn list_skeletons(&self) -> RigResult<Vec<String>> {
        Ok(self
            .skeleton_roots()
            .into_iter()
            .map(|root| self.scene.full_path(root))
            .collect())
    }

    fn read_skeleton(&self, skeleton: &str) -> RigResult<SkeletonSnapshot> {
        let root = self
            .scene
            .resolve(skeleton)
            .ok_or_else(|| RigError::SourceUnavailable {
                side: Side::Scene,
                entity: skeleton.to_string(),
                reason: "skeleton root path does not resolve".to_string(),
            })?;
        skeleton_from_scene(&self.scene, self.bindings(), root)
    }

    fn list_skinned_geometries(&self) -> RigResult<Vec<String>> {
        let mut geometries = Vec::<String>::new();
        for info in self.bindings() {
            for output in &info.outputs {
                let path = self.scene.full_path(*output);
                if !geometries.contains(&path) {
                    geometries.push(path);
                }
            }
        }
        Ok(geometries)
    }

    fn read_skin_binding(&self, geometry: &str) -> RigResult<SkinSnapshot> {
        let node = self
            .scene
            .resolve(geometry)
            .ok_or_else(|| RigError::SourceUnavailable {
                side: Side::Scene,
                entity: geometry.to_string(),
                reason: "geometry path does not resolve".to_string(),
            })?;
        skin_from_scene(&self.scene, self.bindings(), node, self.negligible_weight)
    }
}
