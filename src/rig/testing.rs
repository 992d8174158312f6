//! In-memory scene and stage fixtures shared by the normalizer and run tests.

use std::collections::HashMap;

use nalgebra::Translation3;

use super::path_utils::{SEPARATOR, last_segment};
use super::source::{InterchangeStage, SceneGraph};
use super::types::Mat4;

pub(crate) fn translation(x: f64, y: f64, z: f64) -> Mat4 {
    Translation3::new(x, y, z).to_homogeneous()
}

// ─── Scene fixture ────────────────────────────────────────────────────────────

struct MemoryNode {
    name: String,
    parent: Option<usize>,
    children: Vec<usize>,
    is_joint: bool,
    world: Mat4,
}

struct MemoryBinding {
    influences: Vec<usize>,
    prebind: Vec<Option<Mat4>>,
    outputs: Vec<usize>,
    weights: HashMap<usize, Vec<Vec<(usize, f64)>>>,
}

#[derive(Default)]
pub(crate) struct MemoryScene {
    nodes: Vec<MemoryNode>,
    bindings: Vec<MemoryBinding>,
}

impl MemoryScene {
    /// Append a node; its world matrix is `parent_world * local`.
    pub(crate) fn add_node(
        &mut self,
        name: &str,
        parent: Option<usize>,
        is_joint: bool,
        local: Mat4,
    ) -> usize {
        let index = self.nodes.len();
        let world = match parent {
            Some(parent) => self.nodes[parent].world * local,
            None => local,
        };
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        self.nodes.push(MemoryNode {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            is_joint,
            world,
        });
        index
    }

    pub(crate) fn add_binding(
        &mut self,
        influences: Vec<usize>,
        prebind: Vec<Option<Mat4>>,
        outputs: Vec<usize>,
    ) -> usize {
        self.bindings.push(MemoryBinding {
            influences,
            prebind,
            outputs,
            weights: HashMap::new(),
        });
        self.bindings.len() - 1
    }

    /// Dense per-vertex `(influence, weight)` rows for one output geometry.
    pub(crate) fn set_vertex_weights(
        &mut self,
        binding: usize,
        geometry: usize,
        weights: Vec<Vec<(usize, f64)>>,
    ) {
        self.bindings[binding].weights.insert(geometry, weights);
    }
}

impl SceneGraph for MemoryScene {
    type Node = usize;
    type Binding = usize;

    fn locator(&self) -> &str {
        "memory"
    }

    fn nodes(&self) -> Vec<usize> {
        (0..self.nodes.len()).collect()
    }

    fn resolve(&self, path: &str) -> Option<usize> {
        if path.starts_with(SEPARATOR) {
            return (0..self.nodes.len()).find(|node| self.full_path(*node) == path);
        }
        let name = last_segment(path);
        self.nodes.iter().position(|node| node.name == name)
    }

    fn is_joint(&self, node: usize) -> bool {
        self.nodes[node].is_joint
    }

    fn name(&self, node: usize) -> String {
        self.nodes[node].name.clone()
    }

    fn full_path(&self, node: usize) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(index) = current {
            segments.push(self.nodes[index].name.as_str());
            current = self.nodes[index].parent;
        }
        segments.reverse();
        format!("{}{}", SEPARATOR, segments.join("/"))
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    fn children(&self, node: usize) -> Vec<usize> {
        self.nodes[node].children.clone()
    }

    fn world_matrix(&self, node: usize) -> Mat4 {
        self.nodes[node].world
    }

    fn skin_bindings(&self) -> Vec<usize> {
        (0..self.bindings.len()).collect()
    }

    fn influences(&self, binding: usize) -> Vec<usize> {
        self.bindings[binding].influences.clone()
    }

    fn influence_slot(&self, binding: usize, joint: usize) -> Option<usize> {
        self.bindings[binding]
            .influences
            .iter()
            .position(|influence| *influence == joint)
    }

    fn prebind_matrix(&self, binding: usize, slot: usize) -> Option<Mat4> {
        self.bindings[binding].prebind.get(slot).copied().flatten()
    }

    fn binding_outputs(&self, binding: usize) -> Vec<usize> {
        self.bindings[binding].outputs.clone()
    }

    fn vertex_count(&self, geometry: usize) -> usize {
        self.bindings
            .iter()
            .find_map(|binding| binding.weights.get(&geometry))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn vertex_weights(&self, binding: usize, geometry: usize, vertex: usize) -> Vec<(usize, f64)> {
        self.bindings[binding]
            .weights
            .get(&geometry)
            .and_then(|rows| rows.get(vertex))
            .cloned()
            .unwrap_or_default()
    }
}

// ─── Stage fixture ────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemorySkeleton {
    joints: Option<Vec<String>>,
    bind: Option<Vec<Mat4>>,
    rest: Option<Vec<Mat4>>,
}

#[derive(Default)]
struct MemorySkinBinding {
    skeleton: Option<String>,
    joint_indices: Option<Vec<i32>>,
    joint_weights: Option<Vec<f32>>,
    geom_bind: Option<Mat4>,
}

/// Interchange stage where each attribute can be left unauthored.
#[derive(Default)]
pub(crate) struct MemoryStage {
    skeletons: Vec<(String, MemorySkeleton)>,
    skin_bindings: Vec<(String, MemorySkinBinding)>,
}

impl MemoryStage {
    pub(crate) fn add_skeleton(
        &mut self,
        path: &str,
        joints: Option<Vec<&str>>,
        bind: Option<Vec<Mat4>>,
        rest: Option<Vec<Mat4>>,
    ) {
        self.skeletons.push((
            path.to_string(),
            MemorySkeleton {
                joints: joints.map(|names| names.into_iter().map(str::to_string).collect()),
                bind,
                rest,
            },
        ));
    }

    pub(crate) fn add_skin_binding(
        &mut self,
        geometry: &str,
        skeleton: Option<&str>,
        joint_indices: Option<Vec<i32>>,
        joint_weights: Option<Vec<f32>>,
        geom_bind: Option<Mat4>,
    ) {
        self.skin_bindings.push((
            geometry.to_string(),
            MemorySkinBinding {
                skeleton: skeleton.map(str::to_string),
                joint_indices,
                joint_weights,
                geom_bind,
            },
        ));
    }

    fn skeleton(&self, path: &str) -> Option<&MemorySkeleton> {
        self.skeletons
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, skeleton)| skeleton)
    }

    fn skin_binding(&self, geometry: &str) -> Option<&MemorySkinBinding> {
        self.skin_bindings
            .iter()
            .find(|(candidate, _)| candidate == geometry)
            .map(|(_, binding)| binding)
    }
}

impl InterchangeStage for MemoryStage {
    fn locator(&self) -> &str {
        "memory"
    }

    fn skeleton_paths(&self) -> Vec<String> {
        self.skeletons.iter().map(|(path, _)| path.clone()).collect()
    }

    fn has_skeleton(&self, skeleton: &str) -> bool {
        self.skeleton(skeleton).is_some()
    }

    fn joint_names(&self, skeleton: &str) -> Option<Vec<String>> {
        self.skeleton(skeleton)?.joints.clone()
    }

    fn bind_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>> {
        self.skeleton(skeleton)?.bind.clone()
    }

    fn rest_transforms(&self, skeleton: &str) -> Option<Vec<Mat4>> {
        self.skeleton(skeleton)?.rest.clone()
    }

    fn skin_binding_geometries(&self) -> Vec<String> {
        self.skin_bindings
            .iter()
            .map(|(geometry, _)| geometry.clone())
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
        self.skin_binding(geometry)?.geom_bind
    }
}
