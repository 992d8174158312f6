use super::types::Mat4;

/// Entry-wise absolute comparison of two transforms.
///
/// A difference exactly equal to `tolerance` still matches; NaN never does.
pub fn matrices_match(a: &Mat4, b: &Mat4, tolerance: f64) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(lhs, rhs)| (lhs - rhs).abs() <= tolerance)
}

/// Largest absolute entry difference, used in mismatch descriptions.
pub fn max_abs_difference(a: &Mat4, b: &Mat4) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(lhs, rhs)| (lhs - rhs).abs())
        .fold(0.0, f64::max)
}

pub fn weights_match(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}
