//! Snapshot comparison.
//!
//! The quick checks stop at the first disagreement. The detailed checks
//! itemize every difference in a fixed order, so running them twice on the
//! same pair yields the same list. A quick check returns `true` exactly when
//! the matching detailed check returns no issues.

use super::matrix::{matrices_match, max_abs_difference, weights_match};
use super::types::{
    CompareOptions, IssueKind, Mat4, SkeletonSnapshot, SkinSnapshot, ValidationIssue,
};

// ─── Skeleton ─────────────────────────────────────────────────────────────────

pub fn quick_validate_skeleton(
    interchange: &SkeletonSnapshot,
    scene: &SkeletonSnapshot,
    options: &CompareOptions,
) -> bool {
    if interchange.joint_names().len() != scene.joint_names().len()
        || interchange.joint_parent_indices().len() != scene.joint_parent_indices().len()
        || interchange.bind_transforms().len() != scene.bind_transforms().len()
    {
        return false;
    }

    interchange.joint_names() == scene.joint_names()
        && interchange.joint_parent_indices() == scene.joint_parent_indices()
        && transforms_match(
            interchange.bind_transforms(),
            scene.bind_transforms(),
            options.transform_tolerance,
        )
        && transforms_match(
            interchange.rest_transforms(),
            scene.rest_transforms(),
            options.transform_tolerance,
        )
}

pub fn detailed_validate_skeleton(
    interchange: &SkeletonSnapshot,
    scene: &SkeletonSnapshot,
    options: &CompareOptions,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if interchange.joint_count() != scene.joint_count() {
        issues.push(ValidationIssue::structural(
            IssueKind::JointCountMismatch,
            format!(
                "Joint count mismatch: interchange has {}, scene has {}",
                interchange.joint_count(),
                scene.joint_count()
            ),
        ));
        return issues;
    }

    for (index, (expected, actual)) in interchange
        .joint_names()
        .iter()
        .zip(scene.joint_names())
        .enumerate()
    {
        if expected != actual {
            issues.push(ValidationIssue::at(
                IssueKind::JointNameMismatch,
                index,
                format!(
                    "Joint {} name mismatch: interchange='{}', scene='{}'",
                    index, expected, actual
                ),
            ));
        }
    }

    for (index, (expected, actual)) in interchange
        .joint_parent_indices()
        .iter()
        .zip(scene.joint_parent_indices())
        .enumerate()
    {
        if expected != actual {
            issues.push(ValidationIssue::at(
                IssueKind::ParentIndexMismatch,
                index,
                format!(
                    "Joint {} parent index mismatch: interchange={}, scene={}",
                    index, expected, actual
                ),
            ));
        }
    }

    let joint_names = scene.joint_names();
    let transform_kinds = [
        (
            IssueKind::BindTransformMismatch,
            "bind",
            interchange.bind_transforms(),
            scene.bind_transforms(),
        ),
        (
            IssueKind::RestTransformMismatch,
            "rest",
            interchange.rest_transforms(),
            scene.rest_transforms(),
        ),
    ];
    for (kind, label, expected, actual) in transform_kinds {
        for (index, (lhs, rhs)) in expected.iter().zip(actual).enumerate() {
            if !matrices_match(lhs, rhs, options.transform_tolerance) {
                issues.push(ValidationIssue::at(
                    kind,
                    index,
                    format!(
                        "Joint {} ({}) {} transform mismatch (max diff={:e})",
                        index,
                        joint_names[index],
                        label,
                        max_abs_difference(lhs, rhs)
                    ),
                ));
            }
        }
    }

    issues
}

fn transforms_match(expected: &[Mat4], actual: &[Mat4], tolerance: f64) -> bool {
    expected
        .iter()
        .zip(actual)
        .all(|(lhs, rhs)| matrices_match(lhs, rhs, tolerance))
}

// ─── Skin ─────────────────────────────────────────────────────────────────────

pub fn quick_validate_skin(
    interchange: &SkinSnapshot,
    scene: &SkinSnapshot,
    options: &CompareOptions,
) -> bool {
    if interchange.joint_indices().len() != scene.joint_indices().len()
        || interchange.joint_weights().len() != scene.joint_weights().len()
    {
        return false;
    }

    interchange.joint_indices() == scene.joint_indices()
        && interchange
            .joint_weights()
            .iter()
            .zip(scene.joint_weights())
            .all(|(lhs, rhs)| weights_match(*lhs, *rhs, options.weight_tolerance))
        && matrices_match(
            interchange.geometry_bind_transform(),
            scene.geometry_bind_transform(),
            options.transform_tolerance,
        )
}

pub fn detailed_validate_skin(
    interchange: &SkinSnapshot,
    scene: &SkinSnapshot,
    options: &CompareOptions,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let counts = [
        (
            "indices",
            interchange.joint_indices().len(),
            scene.joint_indices().len(),
        ),
        (
            "weights",
            interchange.joint_weights().len(),
            scene.joint_weights().len(),
        ),
    ];
    for (label, expected, actual) in counts {
        if expected != actual {
            issues.push(ValidationIssue::structural(
                IssueKind::WeightCountMismatch,
                format!(
                    "Joint {} count mismatch: interchange has {}, scene has {}",
                    label, expected, actual
                ),
            ));
            return issues;
        }
    }

    let mut index_mismatches = CappedMismatches::new(options.max_reported_mismatches);
    for (position, (expected, actual)) in interchange
        .joint_indices()
        .iter()
        .zip(scene.joint_indices())
        .enumerate()
    {
        if expected != actual {
            index_mismatches.record(|| {
                ValidationIssue::at(
                    IssueKind::JointIndexMismatch,
                    position,
                    format!(
                        "Joint index mismatch at position {}: interchange={}, scene={}",
                        position, expected, actual
                    ),
                )
            });
        }
    }
    index_mismatches.finish(&mut issues, IssueKind::JointIndexMismatch, "joint index");

    let mut weight_mismatches = CappedMismatches::new(options.max_reported_mismatches);
    for (position, (expected, actual)) in interchange
        .joint_weights()
        .iter()
        .zip(scene.joint_weights())
        .enumerate()
    {
        if !weights_match(*expected, *actual, options.weight_tolerance) {
            weight_mismatches.record(|| {
                ValidationIssue::at(
                    IssueKind::WeightValueMismatch,
                    position,
                    format!(
                        "Weight mismatch at position {}: interchange={}, scene={} (diff={})",
                        position,
                        expected,
                        actual,
                        (expected - actual).abs()
                    ),
                )
            });
        }
    }
    weight_mismatches.finish(&mut issues, IssueKind::WeightValueMismatch, "weight");

    if !matrices_match(
        interchange.geometry_bind_transform(),
        scene.geometry_bind_transform(),
        options.transform_tolerance,
    ) {
        issues.push(ValidationIssue::structural(
            IssueKind::GeomBindTransformMismatch,
            format!(
                "Geometry bind transform mismatch (max diff={:e})",
                max_abs_difference(
                    interchange.geometry_bind_transform(),
                    scene.geometry_bind_transform()
                )
            ),
        ));
    }

    issues
}

/// Positional issues up to `cap`, then a single summary for the overflow.
struct CappedMismatches {
    cap: usize,
    total: usize,
    reported: Vec<ValidationIssue>,
}

impl CappedMismatches {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            total: 0,
            reported: Vec::new(),
        }
    }

    fn record(&mut self, issue: impl FnOnce() -> ValidationIssue) {
        self.total += 1;
        if self.total <= self.cap {
            self.reported.push(issue());
        }
    }

    fn finish(self, issues: &mut Vec<ValidationIssue>, kind: IssueKind, label: &str) {
        issues.extend(self.reported);
        if self.total > self.cap {
            issues.push(ValidationIssue::structural(
                kind,
                format!(
                    "... and {} more {} mismatches (showing first {} only)",
                    self.total - self.cap,
                    label,
                    self.cap
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Translation3;

    use super::*;
    use crate::error::Side;
    use crate::rig::types::DEFAULT_TRANSFORM_TOLERANCE;

    fn chain(joint_count: usize) -> SkeletonSnapshot {
        let mut names = Vec::new();
        let mut parents = Vec::new();
        let mut path = String::new();
        for index in 0..joint_count {
            if index == 0 {
                path.push_str("root");
            } else {
                path.push_str(&format!("/j{}", index));
            }
            names.push(path.clone());
            parents.push(index as i32 - 1);
        }
        let rest: Vec<Mat4> = (0..joint_count)
            .map(|index| Translation3::new(0.0, index as f64, 0.0).to_homogeneous())
            .collect();
        let bind: Vec<Mat4> = rest
            .iter()
            .map(|matrix| matrix.try_inverse().unwrap_or_else(Mat4::identity))
            .collect();
        SkeletonSnapshot::new(Side::Interchange, "/Rig/Skel", names, parents, bind, rest)
            .expect("chain")
    }

    fn with_bind(skeleton: &SkeletonSnapshot, index: usize, bind: Mat4) -> SkeletonSnapshot {
        let mut binds = skeleton.bind_transforms().to_vec();
        binds[index] = bind;
        SkeletonSnapshot::new(
            Side::Scene,
            skeleton.root_identifier(),
            skeleton.joint_names().to_vec(),
            skeleton.joint_parent_indices().to_vec(),
            binds,
            skeleton.rest_transforms().to_vec(),
        )
        .expect("skeleton")
    }

    fn skin(indices: Vec<i32>, weights: Vec<f32>) -> SkinSnapshot {
        SkinSnapshot::new(
            Side::Interchange,
            "/Rig/Skel",
            "/Rig/Body",
            indices,
            weights,
            Mat4::identity(),
        )
        .expect("skin")
    }

    fn ten_influences() -> (Vec<i32>, Vec<f32>) {
        let indices = (0..10).map(|index| index % 3).collect();
        let weights = (0..10).map(|index| 0.1 * index as f32).collect();
        (indices, weights)
    }

    #[test]
    fn given_identical_chains_when_validating_then_quick_passes_and_detailed_is_empty() {
        let options = CompareOptions::default();
        let interchange = chain(3);
        let scene = chain(3);

        assert!(quick_validate_skeleton(&interchange, &scene, &options));
        assert!(detailed_validate_skeleton(&interchange, &scene, &options).is_empty());
    }

    #[test]
    fn given_different_joint_counts_when_validating_then_single_count_issue_is_reported() {
        let options = CompareOptions::default();
        let interchange = chain(3);
        let scene = chain(4);

        let issues = detailed_validate_skeleton(&interchange, &scene, &options);

        assert!(!quick_validate_skeleton(&interchange, &scene, &options));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::JointCountMismatch);
        assert_eq!(issues[0].index, None);
        assert!(issues[0].description.contains("interchange has 3"));
        assert!(issues[0].description.contains("scene has 4"));
    }

    #[test]
    fn given_bind_offset_on_last_joint_when_validating_then_one_bind_issue_at_that_index() {
        let options = CompareOptions::default();
        let interchange = chain(3);
        let shifted = interchange.bind_transforms()[2]
            * Translation3::new(0.01, 0.0, 0.0).to_homogeneous();
        let scene = with_bind(&interchange, 2, shifted);

        let issues = detailed_validate_skeleton(&interchange, &scene, &options);

        assert!(!quick_validate_skeleton(&interchange, &scene, &options));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BindTransformMismatch);
        assert_eq!(issues[0].index, Some(2));
    }

    #[test]
    fn given_drift_exactly_at_tolerance_when_validating_then_skeletons_match() {
        let options = CompareOptions::default();
        let interchange = chain(2);
        let mut drifted = interchange.bind_transforms()[0];
        drifted[(0, 1)] = DEFAULT_TRANSFORM_TOLERANCE;
        let scene = with_bind(&interchange, 0, drifted);

        assert!(quick_validate_skeleton(&interchange, &scene, &options));
        assert!(detailed_validate_skeleton(&interchange, &scene, &options).is_empty());
    }

    #[test]
    fn given_renamed_and_reparented_joint_when_validating_then_issues_follow_detection_order() {
        let options = CompareOptions::default();
        let interchange = chain(3);
        let mut names = interchange.joint_names().to_vec();
        names[1] = "root/other".to_string();
        let scene = SkeletonSnapshot::new(
            Side::Scene,
            "/root",
            names,
            vec![-1, 0, 0],
            interchange.bind_transforms().to_vec(),
            interchange.rest_transforms().to_vec(),
        )
        .expect("scene");

        let issues = detailed_validate_skeleton(&interchange, &scene, &options);
        let kinds: Vec<IssueKind> = issues.iter().map(|issue| issue.kind).collect();

        assert_eq!(
            kinds,
            vec![IssueKind::JointNameMismatch, IssueKind::ParentIndexMismatch]
        );
        assert_eq!(issues[0].index, Some(1));
        assert_eq!(issues[1].index, Some(2));
    }

    #[test]
    fn given_mismatching_pair_when_validating_twice_then_issue_lists_are_identical() {
        let options = CompareOptions::default();
        let interchange = chain(3);
        let scene = with_bind(&interchange, 1, Mat4::zeros());

        let first = detailed_validate_skeleton(&interchange, &scene, &options);
        let second = detailed_validate_skeleton(&interchange, &scene, &options);

        assert_eq!(first, second);
    }

    #[test]
    fn given_seven_weights_off_when_validating_skin_then_five_positional_and_one_summary() {
        let options = CompareOptions::default();
        let (indices, weights) = ten_influences();
        let interchange = skin(indices.clone(), weights.clone());
        let mut drifted = weights;
        for weight in drifted.iter_mut().take(7) {
            *weight += 0.05;
        }
        let scene = skin(indices, drifted);

        let issues = detailed_validate_skin(&interchange, &scene, &options);

        assert!(!quick_validate_skin(&interchange, &scene, &options));
        assert_eq!(issues.len(), 6);
        assert!(
            issues[..5]
                .iter()
                .all(|issue| issue.kind == IssueKind::WeightValueMismatch
                    && issue.index.is_some())
        );
        assert_eq!(issues[5].kind, IssueKind::WeightValueMismatch);
        assert_eq!(issues[5].index, None);
        assert!(issues[5].description.contains("and 2 more"));
    }

    #[test]
    fn given_many_index_mismatches_when_validating_skin_then_summary_cites_overflow() {
        let options = CompareOptions::default();
        let weights = vec![0.5_f32; 12];
        let interchange = skin(vec![0; 12], weights.clone());
        let scene = skin(vec![1; 12], weights);

        let issues = detailed_validate_skin(&interchange, &scene, &options);

        assert_eq!(issues.len(), 6);
        assert_eq!(issues[4].index, Some(4));
        assert_eq!(issues[5].kind, IssueKind::JointIndexMismatch);
        assert!(issues[5].description.contains("and 7 more joint index mismatches"));
    }

    #[test]
    fn given_raised_cap_when_validating_skin_then_every_mismatch_is_positional() {
        let options = CompareOptions {
            max_reported_mismatches: 20,
            ..CompareOptions::default()
        };
        let weights = vec![0.5_f32; 12];
        let interchange = skin(vec![0; 12], weights.clone());
        let scene = skin(vec![1; 12], weights);

        let issues = detailed_validate_skin(&interchange, &scene, &options);

        assert_eq!(issues.len(), 12);
        assert!(issues.iter().all(|issue| issue.index.is_some()));
    }

    #[test]
    fn given_different_influence_counts_when_validating_skin_then_single_count_issue() {
        let options = CompareOptions::default();
        let interchange = skin(vec![0, 1], vec![0.5, 0.5]);
        let scene = skin(vec![0], vec![1.0]);

        let issues = detailed_validate_skin(&interchange, &scene, &options);

        assert!(!quick_validate_skin(&interchange, &scene, &options));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::WeightCountMismatch);
    }

    #[test]
    fn given_geometry_bind_offset_when_validating_skin_then_trailing_structural_issue() {
        let options = CompareOptions::default();
        let interchange = skin(vec![0, 1], vec![0.5, 0.5]);
        let scene = SkinSnapshot::new(
            Side::Scene,
            "/root",
            "/Body",
            vec![0, 1],
            vec![0.5, 0.5],
            Translation3::new(0.0, 0.0, 1.0).to_homogeneous(),
        )
        .expect("skin");

        let issues = detailed_validate_skin(&interchange, &scene, &options);

        assert!(!quick_validate_skin(&interchange, &scene, &options));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::GeomBindTransformMismatch);
        assert_eq!(issues[0].index, None);
    }

    #[test]
    fn given_weight_drift_within_tolerance_when_validating_skin_then_quick_and_detailed_agree() {
        let options = CompareOptions::default();
        let interchange = skin(vec![0, 1], vec![0.5, 0.5]);
        let scene = skin(vec![0, 1], vec![0.500_005, 0.499_995]);

        let quick = quick_validate_skin(&interchange, &scene, &options);
        let detailed = detailed_validate_skin(&interchange, &scene, &options);

        assert!(quick);
        assert_eq!(quick, detailed.is_empty());
    }
}
