use nalgebra::{Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde_json::Value;

use super::types::Mat4;

const COMPONENT_UNSIGNED_BYTE: u64 = 5121;
const COMPONENT_UNSIGNED_SHORT: u64 = 5123;
const COMPONENT_FLOAT: u64 = 5126;

// ─── Accessor metadata ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct AccessorMeta {
    pub(super) buffer: usize,
    pub(super) base_offset: usize,
    pub(super) stride: usize,
    pub(super) count: usize,
    pub(super) component_type: u64,
    pub(super) accessor_type: &'static str,
}

/// Indices of the JOINTS_0 and WEIGHTS_0 accessors on one mesh primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PrimitiveSkinBinding {
    pub(super) joints_accessor: usize,
    pub(super) weights_accessor: usize,
}

// ─── Accessor I/O ─────────────────────────────────────────────────────────────

pub(super) fn accessor_meta(json: &Value, accessor_index: usize) -> Option<AccessorMeta> {
    let accessor = json.get("accessors")?.as_array()?.get(accessor_index)?;
    let buffer_view_index = index_field(accessor, "bufferView")?;
    let buffer_view = json.get("bufferViews")?.as_array()?.get(buffer_view_index)?;

    let (accessor_type, element_count) = match accessor.get("type")?.as_str()? {
        "SCALAR" => ("SCALAR", 1),
        "VEC2" => ("VEC2", 2),
        "VEC3" => ("VEC3", 3),
        "VEC4" => ("VEC4", 4),
        "MAT4" => ("MAT4", 16),
        _ => return None,
    };

    let component_type = accessor.get("componentType")?.as_u64()?;
    let component_size = component_size(component_type)?;

    let view_offset = optional_index_field(buffer_view, "byteOffset")?;
    let accessor_offset = optional_index_field(accessor, "byteOffset")?;
    let stride = match buffer_view.get("byteStride") {
        Some(_) => index_field(buffer_view, "byteStride")?,
        None => element_count * component_size,
    };

    Some(AccessorMeta {
        buffer: index_field(buffer_view, "buffer")?,
        base_offset: view_offset.checked_add(accessor_offset)?,
        stride,
        count: index_field(accessor, "count")?,
        component_type,
        accessor_type,
    })
}

fn index_field(value: &Value, key: &str) -> Option<usize> {
    usize::try_from(value.get(key)?.as_u64()?).ok()
}

fn optional_index_field(value: &Value, key: &str) -> Option<usize> {
    match value.get(key) {
        Some(_) => index_field(value, key),
        None => Some(0),
    }
}

fn component_size(component_type: u64) -> Option<usize> {
    match component_type {
        5120 | COMPONENT_UNSIGNED_BYTE => Some(1),
        5122 | COMPONENT_UNSIGNED_SHORT => Some(2),
        5125 | COMPONENT_FLOAT => Some(4),
        _ => None,
    }
}

fn lane_offset(meta: &AccessorMeta, vertex: usize, lane: usize) -> Option<usize> {
    vertex
        .checked_mul(meta.stride)?
        .checked_add(meta.base_offset)?
        .checked_add(lane.checked_mul(component_size(meta.component_type)?)?)
}

fn read_bytes<const N: usize>(bin: &[u8], offset: usize) -> Option<[u8; N]> {
    bin.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

pub(super) fn read_joint_slot(
    bin: &[u8],
    meta: &AccessorMeta,
    vertex: usize,
    lane: usize,
) -> Option<u16> {
    let offset = lane_offset(meta, vertex, lane)?;
    match meta.component_type {
        COMPONENT_UNSIGNED_BYTE => bin.get(offset).copied().map(u16::from),
        COMPONENT_UNSIGNED_SHORT => read_bytes(bin, offset).map(u16::from_le_bytes),
        _ => None,
    }
}

/// Read one weight lane, decoding normalized unsigned integers into `0..=1`.
pub(super) fn read_weight(
    bin: &[u8],
    meta: &AccessorMeta,
    vertex: usize,
    lane: usize,
) -> Option<f64> {
    let offset = lane_offset(meta, vertex, lane)?;
    match meta.component_type {
        COMPONENT_FLOAT => {
            read_bytes(bin, offset).map(|bytes| f64::from(f32::from_le_bytes(bytes)))
        }
        COMPONENT_UNSIGNED_BYTE => bin
            .get(offset)
            .map(|value| f64::from(*value) / f64::from(u8::MAX)),
        COMPONENT_UNSIGNED_SHORT => read_bytes(bin, offset)
            .map(|bytes| f64::from(u16::from_le_bytes(bytes)) / f64::from(u16::MAX)),
        _ => None,
    }
}

/// Read a column-major f32 MAT4 element and widen it.
pub(super) fn read_mat4_from_accessor(
    bin: &[u8],
    meta: &AccessorMeta,
    index: usize,
) -> Option<Mat4> {
    if meta.accessor_type != "MAT4" || meta.component_type != COMPONENT_FLOAT {
        return None;
    }
    if index >= meta.count {
        return None;
    }

    let offset = index.checked_mul(meta.stride)?.checked_add(meta.base_offset)?;
    let mut values = [0.0f64; 16];
    for (i, value) in values.iter_mut().enumerate() {
        let bytes = read_bytes(bin, offset.checked_add(i * 4)?)?;
        *value = f64::from(f32::from_le_bytes(bytes));
    }

    Some(Matrix4::from_column_slice(&values))
}

// ─── Mesh helpers ─────────────────────────────────────────────────────────────

/// JOINTS_0/WEIGHTS_0 pairs of a mesh, in primitive order, with shared pairs listed once.
pub(super) fn collect_primitive_skin_bindings(
    json: &Value,
    mesh_index: usize,
) -> Vec<PrimitiveSkinBinding> {
    let mut bindings = Vec::<PrimitiveSkinBinding>::new();
    let Some(primitives) = json
        .pointer(&format!("/meshes/{}/primitives", mesh_index))
        .and_then(Value::as_array)
    else {
        return bindings;
    };

    for primitive in primitives {
        let Some(attributes) = primitive.get("attributes") else {
            continue;
        };
        let joints = attributes.get("JOINTS_0").and_then(Value::as_u64);
        let weights = attributes.get("WEIGHTS_0").and_then(Value::as_u64);
        if let (Some(joints), Some(weights)) = (joints, weights) {
            let binding = PrimitiveSkinBinding {
                joints_accessor: joints as usize,
                weights_accessor: weights as usize,
            };
            if !bindings.contains(&binding) {
                bindings.push(binding);
            }
        }
    }

    bindings
}

// ─── Node hierarchy helpers ───────────────────────────────────────────────────

/// Parent index per node from the `children` arrays.
pub(super) fn collect_parent_indices_from_json(json: &Value) -> Vec<Option<usize>> {
    let node_count = json
        .get("nodes")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    let mut parents = vec![None; node_count];

    let Some(nodes) = json.get("nodes").and_then(Value::as_array) else {
        return parents;
    };
    for (parent_index, node) in nodes.iter().enumerate() {
        let Some(children) = node.get("children").and_then(Value::as_array) else {
            continue;
        };
        for child in children {
            if let Some(slot) = child
                .as_u64()
                .and_then(|value| parents.get_mut(value as usize))
            {
                *slot = Some(parent_index);
            }
        }
    }

    parents
}

/// Build the local transform of a glTF node from `matrix` or TRS.
pub(super) fn node_to_local_matrix(node: &Value) -> Mat4 {
    if let Some(matrix) = node.get("matrix").and_then(Value::as_array)
        && matrix.len() == 16
    {
        let values: Vec<f64> = matrix
            .iter()
            .map(|value| value.as_f64().unwrap_or(0.0))
            .collect();
        return Matrix4::from_column_slice(&values);
    }

    let vector3 = |key: &str, fallback: f64| {
        node.get(key)
            .and_then(Value::as_array)
            .filter(|values| values.len() == 3)
            .map(|values| {
                Vector3::new(
                    values[0].as_f64().unwrap_or(fallback),
                    values[1].as_f64().unwrap_or(fallback),
                    values[2].as_f64().unwrap_or(fallback),
                )
            })
            .unwrap_or(Vector3::new(fallback, fallback, fallback))
    };

    let rotation = node
        .get("rotation")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 4)
        .map(|values| {
            UnitQuaternion::from_quaternion(Quaternion::new(
                values[3].as_f64().unwrap_or(1.0),
                values[0].as_f64().unwrap_or(0.0),
                values[1].as_f64().unwrap_or(0.0),
                values[2].as_f64().unwrap_or(0.0),
            ))
        })
        .unwrap_or_else(UnitQuaternion::identity);

    let translation_matrix = Translation3::from(vector3("translation", 0.0)).to_homogeneous();
    let rotation_matrix = rotation.to_homogeneous();
    let scale_matrix = Matrix4::new_nonuniform_scaling(&vector3("scale", 1.0));
    translation_matrix * rotation_matrix * scale_matrix
}

/// World matrices from local transforms and parent links.
///
/// Ancestors are resolved first with an explicit stack; a cyclic parent chain
/// is broken at the node that closes the cycle.
pub(super) fn compute_node_world_matrices(
    local_matrices: &[Mat4],
    parents: &[Option<usize>],
) -> Vec<Mat4> {
    let mut worlds = vec![Mat4::identity(); local_matrices.len()];
    let mut resolved = vec![false; local_matrices.len()];

    for start in 0..local_matrices.len() {
        let mut chain = Vec::<usize>::new();
        let mut current = Some(start);
        while let Some(index) = current {
            if resolved[index] || chain.contains(&index) {
                break;
            }
            chain.push(index);
            current = parents.get(index).copied().flatten();
        }

        for index in chain.into_iter().rev() {
            worlds[index] = match parents.get(index).copied().flatten() {
                Some(parent) if resolved[parent] => worlds[parent] * local_matrices[index],
                _ => local_matrices[index],
            };
            resolved[index] = true;
        }
    }

    worlds
}
