use std::{collections::HashSet, fs, path::Path};

use gltf::{Gltf, binary::Glb, import_buffers};
use serde_json::Value;

use crate::error::{RigError, RigResult, Side};
use crate::log_debug;

use super::gltf_utils::{
    AccessorMeta, PrimitiveSkinBinding, accessor_meta, collect_parent_indices_from_json,
    collect_primitive_skin_bindings, compute_node_world_matrices, node_to_local_matrix,
    read_joint_slot, read_mat4_from_accessor, read_weight,
};
use super::path_utils::SEPARATOR;
use super::source::SceneGraph;
use super::types::Mat4;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const LANES_PER_VERTEX: usize = 4;

/// JOINTS_0/WEIGHTS_0 accessors of one skinned primitive.
type SkinStream = (AccessorMeta, AccessorMeta);

/// glTF scene graph with node paths, world matrices and skins resolved up front.
#[derive(Debug, Clone)]
pub struct GltfScene {
    locator: String,
    json: Value,
    buffers: Vec<Vec<u8>>,
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    worlds: Vec<Mat4>,
    paths: Vec<String>,
    joints: HashSet<usize>,
    streams: Vec<Vec<SkinStream>>,
}

impl GltfScene {
    /// Open a `.glb` container or a `.gltf` JSON file.
    pub fn open(path: &Path) -> RigResult<Self> {
        let locator = path.display().to_string();
        let unavailable = |reason: String| RigError::SourceUnavailable {
            side: Side::Scene,
            entity: locator.clone(),
            reason,
        };

        let bytes = fs::read(path).map_err(|error| unavailable(error.to_string()))?;

        let json: Value = if bytes.starts_with(GLB_MAGIC) {
            let glb = Glb::from_slice(&bytes)
                .map_err(|error| unavailable(format!("not a GLB container: {}", error)))?;
            serde_json::from_slice(glb.json.as_ref())
                .map_err(|error| unavailable(format!("invalid glTF JSON chunk: {}", error)))?
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|error| unavailable(format!("invalid glTF JSON: {}", error)))?
        };

        let Gltf { document, blob } = Gltf::from_slice(&bytes)
            .map_err(|error| unavailable(format!("invalid glTF document: {}", error)))?;
        let buffers = import_buffers(&document, path.parent(), blob)
            .map_err(|error| unavailable(format!("failed to load glTF buffers: {}", error)))?
            .into_iter()
            .map(|data| data.0)
            .collect();

        Ok(Self::from_parts(locator, json, buffers))
    }

    /// Build a scene from an already-parsed glTF document and its buffers, in `buffers` order.
    pub fn from_parts(locator: impl Into<String>, json: Value, buffers: Vec<Vec<u8>>) -> Self {
        let nodes = json
            .get("nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let names: Vec<String> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                node.get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| format!("node{}", index))
            })
            .collect();

        let parents = collect_parent_indices_from_json(&json);
        let mut children = vec![Vec::<usize>::new(); nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            let Some(listed) = node.get("children").and_then(Value::as_array) else {
                continue;
            };
            children[index] = listed
                .iter()
                .filter_map(Value::as_u64)
                .map(|child| child as usize)
                .filter(|child| parents.get(*child).copied().flatten() == Some(index))
                .collect();
        }

        let locals: Vec<Mat4> = nodes.iter().map(node_to_local_matrix).collect();
        let worlds = compute_node_world_matrices(&locals, &parents);
        let paths = (0..nodes.len())
            .map(|index| build_full_path(&names, &parents, index))
            .collect();

        let joints: HashSet<usize> = json
            .get("skins")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|skin| skin.get("joints").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_u64)
            .map(|joint| joint as usize)
            .filter(|joint| *joint < nodes.len())
            .collect();

        let streams = nodes.iter().map(|node| skin_streams(&json, node)).collect();

        let scene = Self {
            locator: locator.into(),
            json,
            buffers,
            names,
            parents,
            children,
            worlds,
            paths,
            joints,
            streams,
        };
        log_debug!(
            "Loaded glTF scene {} ({} nodes, {} joints)",
            scene.locator,
            scene.names.len(),
            scene.joints.len()
        );
        scene
    }

    fn skin(&self, binding: usize) -> Option<&Value> {
        self.json.get("skins")?.as_array()?.get(binding)
    }

    fn node(&self, node: usize) -> Option<&Value> {
        self.json.get("nodes")?.as_array()?.get(node)
    }

    fn node_skin(&self, node: usize) -> Option<usize> {
        self.node(node)?
            .get("skin")
            .and_then(Value::as_u64)
            .map(|skin| skin as usize)
    }

    fn buffer(&self, meta: &AccessorMeta) -> &[u8] {
        self.buffers.get(meta.buffer).map(Vec::as_slice).unwrap_or_default()
    }

    fn streams(&self, geometry: usize) -> &[SkinStream] {
        self.streams.get(geometry).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Accessor metadata for each skinned primitive of the node's mesh.
fn skin_streams(json: &Value, node: &Value) -> Vec<SkinStream> {
    let Some(mesh_index) = node
        .get("mesh")
        .and_then(Value::as_u64)
        .and_then(|mesh| usize::try_from(mesh).ok())
    else {
        return Vec::new();
    };

    collect_primitive_skin_bindings(json, mesh_index)
        .into_iter()
        .filter_map(
            |PrimitiveSkinBinding {
                 joints_accessor,
                 weights_accessor,
             }| {
                Some((
                    accessor_meta(json, joints_accessor)?,
                    accessor_meta(json, weights_accessor)?,
                ))
            },
        )
        .collect()
}

fn build_full_path(names: &[String], parents: &[Option<usize>], node: usize) -> String {
    let mut segments = Vec::<&str>::new();
    let mut current = Some(node);
    while let Some(index) = current {
        if segments.len() > names.len() {
            break;
        }
        segments.push(&names[index]);
        current = parents[index];
    }
    segments.reverse();

    let mut path = String::new();
    for segment in segments {
        path.push(SEPARATOR);
        path.push_str(segment);
    }
    path
}

impl SceneGraph for GltfScene {
    type Node = usize;
    type Binding = usize;

    fn locator(&self) -> &str {
        &self.locator
    }

    fn nodes(&self) -> Vec<usize> {
        (0..self.names.len()).collect()
    }

    fn resolve(&self, path: &str) -> Option<usize> {
        if path.starts_with(SEPARATOR) {
            return self.paths.iter().position(|candidate| candidate == path);
        }
        self.names.iter().position(|name| name == path)
    }

    fn is_joint(&self, node: usize) -> bool {
        self.joints.contains(&node)
    }

    fn name(&self, node: usize) -> String {
        self.names.get(node).cloned().unwrap_or_default()
    }

    fn full_path(&self, node: usize) -> String {
        self.paths.get(node).cloned().unwrap_or_default()
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    fn children(&self, node: usize) -> Vec<usize> {
        self.children.get(node).cloned().unwrap_or_default()
    }

    fn world_matrix(&self, node: usize) -> Mat4 {
        self.worlds.get(node).copied().unwrap_or_else(Mat4::identity)
    }

    fn skin_bindings(&self) -> Vec<usize> {
        let count = self
            .json
            .get("skins")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        (0..count).collect()
    }

    fn influences(&self, binding: usize) -> Vec<usize> {
        self.skin(binding)
            .and_then(|skin| skin.get("joints"))
            .and_then(Value::as_array)
            .map(|joints| {
                joints
                    .iter()
                    .filter_map(Value::as_u64)
                    .map(|joint| joint as usize)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn influence_slot(&self, binding: usize, joint: usize) -> Option<usize> {
        self.influences(binding)
            .iter()
            .position(|influence| *influence == joint)
    }

    fn prebind_matrix(&self, binding: usize, slot: usize) -> Option<Mat4> {
        let accessor_index = self
            .skin(binding)?
            .get("inverseBindMatrices")?
            .as_u64()? as usize;
        let meta = accessor_meta(&self.json, accessor_index)?;
        read_mat4_from_accessor(self.buffer(&meta), &meta, slot)
    }

    fn binding_outputs(&self, binding: usize) -> Vec<usize> {
        (0..self.names.len())
            .filter(|node| {
                self.node(*node)
                    .is_some_and(|value| value.get("mesh").is_some())
                    && self.node_skin(*node) == Some(binding)
            })
            .collect()
    }

    fn vertex_count(&self, geometry: usize) -> usize {
        self.streams(geometry)
            .iter()
            .map(|(joints, weights)| joints.count.min(weights.count))
            .sum()
    }

    fn vertex_weights(&self, binding: usize, geometry: usize, vertex: usize) -> Vec<(usize, f64)> {
        if self.node_skin(geometry) != Some(binding) {
            return Vec::new();
        }

        let mut local_vertex = vertex;
        for (joints, weights) in self.streams(geometry) {
            let count = joints.count.min(weights.count);
            if local_vertex >= count {
                local_vertex -= count;
                continue;
            }

            return (0..LANES_PER_VERTEX)
                .filter_map(|lane| {
                    let slot = read_joint_slot(self.buffer(joints), joints, local_vertex, lane)?;
                    let weight = read_weight(self.buffer(weights), weights, local_vertex, lane)?;
                    Some((usize::from(slot), weight))
                })
                .collect();
        }

        Vec::new()
    }
}
