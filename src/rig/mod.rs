mod gltf_scene;
mod gltf_utils;
mod interchange;
mod matrix;
mod path_utils;
mod report;
mod skeleton;
mod skinning;
mod source;
#[cfg(test)]
mod testing;
mod types;
mod validation;

use anyhow::{Context, Result};

use crate::error::{RigError, Side};
use crate::logging::ResultExt;
use crate::settings::ValidationSettings;
use crate::{log_info, log_warn};

// Re-export public types for callers of this module.
pub use gltf_scene::GltfScene;
pub use interchange::{
    AuthoredMatrix, InterchangeDocument, SkeletonPrim, SkinBindingPrim, authored_to_matrix,
    matrix_to_authored,
};
pub use matrix::{matrices_match, max_abs_difference, weights_match};
pub use report::{
    ItemKind, NormalizationFailure, RigValidationReport, SkeletonComparison, SkinComparison,
    UnpairedItem, render_issue, render_report_markdown, write_report_json, write_report_markdown,
};
pub use source::{
    BindingInfo, HierarchySource, InterchangeSource, InterchangeStage, SceneGraph, SceneSource,
};
pub use types::{
    CompareOptions, DEFAULT_MAX_REPORTED_MISMATCHES, DEFAULT_TRANSFORM_TOLERANCE,
    DEFAULT_WEIGHT_TOLERANCE, IssueKind, Mat4, NEGLIGIBLE_WEIGHT_THRESHOLD, SkeletonSnapshot,
    SkinSnapshot, ValidationIssue, ValidationMode,
};
pub use validation::{
    detailed_validate_skeleton, detailed_validate_skin, quick_validate_skeleton,
    quick_validate_skin,
};

use path_utils::last_segment;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Pair skeletons and skins across both sides and validate every pair.
///
/// Skeletons pair by root joint name and skins by the last segment of the
/// geometry path. An item that fails to normalize is recorded in
/// `failures` and the run moves on; only a failure to enumerate a side
/// aborts the run.
pub fn validate_rig(
    scene: &dyn HierarchySource,
    interchange: &dyn HierarchySource,
    settings: &ValidationSettings,
) -> Result<RigValidationReport> {
    let options = settings.compare_options();
    let mut report =
        RigValidationReport::new(scene.locator(), interchange.locator(), settings.mode);

    log_info!(
        "Validating rig: scene={} interchange={} mode={:?}",
        scene.locator(),
        interchange.locator(),
        settings.mode
    );

    compare_skeletons(scene, interchange, settings.mode, &options, &mut report)?;
    compare_skins(scene, interchange, settings.mode, &options, &mut report)?;

    log_info!(
        "Validation finished: {} skeleton pairs, {} skin pairs, {} issues, {} unpaired, {} failures",
        report.skeletons.len(),
        report.skins.len(),
        report.issue_count(),
        report.unpaired.len(),
        report.failures.len()
    );
    Ok(report)
}

// ─── Pairing ──────────────────────────────────────────────────────────────────

fn compare_skeletons(
    scene: &dyn HierarchySource,
    interchange: &dyn HierarchySource,
    mode: ValidationMode,
    options: &CompareOptions,
    report: &mut RigValidationReport,
) -> Result<()> {
    let scene_ids = scene
        .list_skeletons()
        .with_context(|| format!("failed to list skeletons in {}", scene.locator()))?;
    let interchange_ids = interchange
        .list_skeletons()
        .with_context(|| format!("failed to list skeletons in {}", interchange.locator()))?;

    let mut scene_skeletons: Vec<Option<(String, SkeletonSnapshot)>> = Vec::new();
    for id in scene_ids {
        match scene.read_skeleton(&id).log_error(Some("reading skeleton")) {
            Ok(snapshot) => scene_skeletons.push(Some((id, snapshot))),
            Err(error) => record_failure(report, ItemKind::Skeleton, &id, &error),
        }
    }

    for id in interchange_ids {
        let interchange_skeleton = match interchange
            .read_skeleton(&id)
            .log_error(Some("reading skeleton"))
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                record_failure(report, ItemKind::Skeleton, &id, &error);
                continue;
            }
        };

        let partner = scene_skeletons.iter_mut().find(|candidate| {
            candidate.as_ref().is_some_and(|(_, snapshot)| {
                snapshot.root_joint_name() == interchange_skeleton.root_joint_name()
            })
        });
        let Some((scene_id, scene_skeleton)) = partner.and_then(Option::take) else {
            log_warn!(
                "No scene skeleton with root joint '{}' for {}",
                interchange_skeleton.root_joint_name(),
                id
            );
            report.unpaired.push(UnpairedItem {
                side: Side::Interchange,
                kind: ItemKind::Skeleton,
                identifier: id,
            });
            continue;
        };

        let (passed, issues) = match mode {
            ValidationMode::Quick => (
                quick_validate_skeleton(&interchange_skeleton, &scene_skeleton, options),
                Vec::new(),
            ),
            ValidationMode::Detailed => (
                quick_validate_skeleton(&interchange_skeleton, &scene_skeleton, options),
                detailed_validate_skeleton(&interchange_skeleton, &scene_skeleton, options),
            ),
        };
        log_comparison("Skeleton", &id, &scene_id, passed, &issues);

        report.skeletons.push(SkeletonComparison {
            interchange_skeleton: id,
            scene_skeleton: scene_id,
            joint_count: interchange_skeleton.joint_count(),
            passed,
            issues,
        });
    }

    for (scene_id, _) in scene_skeletons.into_iter().flatten() {
        log_warn!("No interchange skeleton for scene skeleton {}", scene_id);
        report.unpaired.push(UnpairedItem {
            side: Side::Scene,
            kind: ItemKind::Skeleton,
            identifier: scene_id,
        });
    }

    Ok(())
}

fn compare_skins(
    scene: &dyn HierarchySource,
    interchange: &dyn HierarchySource,
    mode: ValidationMode,
    options: &CompareOptions,
    report: &mut RigValidationReport,
) -> Result<()> {
    let mut scene_geometries: Vec<Option<String>> = scene
        .list_skinned_geometries()
        .with_context(|| format!("failed to list skinned geometries in {}", scene.locator()))?
        .into_iter()
        .map(Some)
        .collect();
    let interchange_geometries = interchange
        .list_skinned_geometries()
        .with_context(|| format!("failed to list skin bindings in {}", interchange.locator()))?;

    for geometry in interchange_geometries {
        let partner = scene_geometries.iter_mut().find(|candidate| {
            candidate
                .as_deref()
                .is_some_and(|path| last_segment(path) == last_segment(&geometry))
        });
        let Some(scene_geometry) = partner.and_then(Option::take) else {
            log_warn!("No scene geometry named '{}' for {}", last_segment(&geometry), geometry);
            report.unpaired.push(UnpairedItem {
                side: Side::Interchange,
                kind: ItemKind::Skin,
                identifier: geometry,
            });
            continue;
        };

        let interchange_skin = interchange
            .read_skin_binding(&geometry)
            .log_error(Some("reading skin binding"));
        let scene_skin = scene
            .read_skin_binding(&scene_geometry)
            .log_error(Some("reading skin binding"));
        let (interchange_skin, scene_skin) = match (interchange_skin, scene_skin) {
            (Ok(interchange_skin), Ok(scene_skin)) => (interchange_skin, scene_skin),
            (interchange_skin, scene_skin) => {
                if let Err(error) = interchange_skin {
                    record_failure(report, ItemKind::Skin, &geometry, &error);
                }
                if let Err(error) = scene_skin {
                    record_failure(report, ItemKind::Skin, &scene_geometry, &error);
                }
                continue;
            }
        };

        let (passed, issues) = match mode {
            ValidationMode::Quick => (
                quick_validate_skin(&interchange_skin, &scene_skin, options),
                Vec::new(),
            ),
            ValidationMode::Detailed => (
                quick_validate_skin(&interchange_skin, &scene_skin, options),
                detailed_validate_skin(&interchange_skin, &scene_skin, options),
            ),
        };
        log_comparison("Skin", &geometry, &scene_geometry, passed, &issues);

        report.skins.push(SkinComparison {
            interchange_geometry: geometry,
            scene_geometry,
            influence_count: interchange_skin.influence_count(),
            passed,
            issues,
        });
    }

    for scene_geometry in scene_geometries.into_iter().flatten() {
        log_warn!("No interchange skin binding for scene geometry {}", scene_geometry);
        report.unpaired.push(UnpairedItem {
            side: Side::Scene,
            kind: ItemKind::Skin,
            identifier: scene_geometry,
        });
    }

    Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn record_failure(
    report: &mut RigValidationReport,
    kind: ItemKind,
    identifier: &str,
    error: &RigError,
) {
    report.failures.push(NormalizationFailure {
        side: error.side(),
        kind,
        identifier: identifier.to_string(),
        message: error.to_string(),
    });
}

fn log_comparison(
    label: &str,
    interchange_id: &str,
    scene_id: &str,
    passed: bool,
    issues: &[ValidationIssue],
) {
    if passed {
        log_info!("{} {} matches {}", label, interchange_id, scene_id);
        return;
    }
    log_warn!(
        "{} {} differs from {} ({} issues)",
        label,
        interchange_id,
        scene_id,
        issues.len()
    );
    for issue in issues {
        log_warn!("  {}", render_issue(issue));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::testing::{MemoryScene, MemoryStage, translation};

    fn matching_scene() -> SceneSource<MemoryScene> {
        let mut scene = MemoryScene::default();
        let group = scene.add_node("Armature", None, false, translation(0.0, 0.0, 0.0));
        let root = scene.add_node("root", Some(group), true, translation(0.0, 1.0, 0.0));
        let spine = scene.add_node("spine", Some(root), true, translation(0.0, 0.5, 0.0));
        let head = scene.add_node("head", Some(spine), true, translation(0.0, 0.4, 0.0));
        let body = scene.add_node("Body", None, false, translation(0.0, 0.0, 0.0));

        let binding = scene.add_binding(
            vec![root, spine, head],
            vec![
                Some(translation(0.0, -1.0, 0.0)),
                Some(translation(0.0, -1.5, 0.0)),
                Some(translation(0.0, -1.9, 0.0)),
            ],
            vec![body],
        );
        scene.set_vertex_weights(
            binding,
            body,
            vec![vec![(0, 0.5), (1, 0.5)], vec![(2, 1.0), (0, 0.0)]],
        );

        SceneSource::new(scene, NEGLIGIBLE_WEIGHT_THRESHOLD)
    }

    fn matching_stage(weights: Vec<f32>) -> MemoryStage {
        let mut stage = MemoryStage::default();
        stage.add_skeleton(
            "/Rig/Skel",
            Some(vec!["root", "root/spine", "root/spine/head"]),
            Some(vec![
                translation(0.0, -1.0, 0.0),
                translation(0.0, -1.5, 0.0),
                translation(0.0, -1.9, 0.0),
            ]),
            Some(vec![
                Mat4::identity(),
                translation(0.0, 0.5, 0.0),
                translation(0.0, 0.9, 0.0),
            ]),
        );
        stage.add_skin_binding(
            "/Rig/Body",
            Some("/Rig/Skel"),
            Some(vec![0, 1, 2]),
            Some(weights),
            Some(translation(0.0, -1.0, 0.0)),
        );
        stage
    }

    #[test]
    fn given_matching_rig_when_validating_then_report_is_clean() {
        let scene = matching_scene();
        let interchange = InterchangeSource::new(
            matching_stage(vec![0.5, 0.5, 1.0]),
            NEGLIGIBLE_WEIGHT_THRESHOLD,
        );

        let report = validate_rig(&scene, &interchange, &ValidationSettings::default())
            .expect("validation run");

        assert_eq!(report.skeletons.len(), 1);
        assert_eq!(report.skeletons[0].scene_skeleton, "/Armature/root");
        assert_eq!(report.skins.len(), 1);
        assert_eq!(report.skins[0].scene_geometry, "/Body");
        assert!(report.is_clean(), "{:#?}", report);
    }

    #[test]
    fn given_drifted_weight_and_extra_binding_when_validating_then_both_are_recorded() {
        let scene = matching_scene();
        let mut stage = matching_stage(vec![0.5, 0.4, 1.0]);
        stage.add_skin_binding("/Rig/Hat", Some("/Rig/Skel"), Some(vec![0]), Some(vec![1.0]), None);
        let interchange = InterchangeSource::new(stage, NEGLIGIBLE_WEIGHT_THRESHOLD);

        let report = validate_rig(&scene, &interchange, &ValidationSettings::default())
            .expect("validation run");

        assert!(!report.skins[0].passed);
        assert_eq!(report.skins[0].issues.len(), 1);
        assert_eq!(report.skins[0].issues[0].kind, IssueKind::WeightValueMismatch);
        assert_eq!(report.skins[0].issues[0].index, Some(1));
        assert_eq!(
            report.unpaired,
            vec![UnpairedItem {
                side: Side::Interchange,
                kind: ItemKind::Skin,
                identifier: "/Rig/Hat".to_string(),
            }]
        );
    }

    #[test]
    fn given_quick_mode_when_validating_mismatch_then_verdict_has_no_itemized_issues() {
        let scene = matching_scene();
        let interchange = InterchangeSource::new(
            matching_stage(vec![0.5, 0.4, 1.0]),
            NEGLIGIBLE_WEIGHT_THRESHOLD,
        );
        let settings = ValidationSettings {
            mode: ValidationMode::Quick,
            ..ValidationSettings::default()
        };

        let report = validate_rig(&scene, &interchange, &settings).expect("validation run");

        assert!(report.skeletons[0].passed);
        assert!(!report.skins[0].passed);
        assert!(report.skins[0].issues.is_empty());
    }

    #[test]
    fn given_unreadable_interchange_skeleton_when_validating_then_run_continues() {
        let scene = matching_scene();
        let mut stage = matching_stage(vec![0.5, 0.5, 1.0]);
        stage.add_skeleton("/Rig/Broken", Some(vec!["other"]), None, None);
        let interchange = InterchangeSource::new(stage, NEGLIGIBLE_WEIGHT_THRESHOLD);

        let report = validate_rig(&scene, &interchange, &ValidationSettings::default())
            .expect("validation run");

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].side, Side::Interchange);
        assert_eq!(report.failures[0].identifier, "/Rig/Broken");
        assert_eq!(report.skeletons.len(), 1);
        assert!(report.skeletons[0].passed);
        assert_eq!(report.skins.len(), 1);
    }

    #[test]
    fn given_scene_skeleton_without_partner_when_validating_then_it_is_unpaired() {
        let mut scene = MemoryScene::default();
        scene.add_node("tail", None, true, translation(0.0, 0.0, 0.0));
        let scene = SceneSource::new(scene, NEGLIGIBLE_WEIGHT_THRESHOLD);
        let interchange =
            InterchangeSource::new(MemoryStage::default(), NEGLIGIBLE_WEIGHT_THRESHOLD);

        let report = validate_rig(&scene, &interchange, &ValidationSettings::default())
            .expect("validation run");

        assert!(report.skeletons.is_empty());
        assert_eq!(report.unpaired.len(), 1);
        assert_eq!(report.unpaired[0].side, Side::Scene);
        assert_eq!(report.unpaired[0].identifier, "/tail");
    }
}
