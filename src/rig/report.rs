use std::{fs, path::Path};

use anyhow::{Context, Result};
use jiff::Timestamp;
use serde::Serialize;

use crate::error::Side;

use super::types::{ValidationIssue, ValidationMode};

// ─── Report structs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Skeleton,
    Skin,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkeletonComparison {
    pub interchange_skeleton: String,
    pub scene_skeleton: String,
    pub joint_count: usize,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkinComparison {
    pub interchange_geometry: String,
    pub scene_geometry: String,
    pub influence_count: usize,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Item present on one side only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnpairedItem {
    pub side: Side,
    pub kind: ItemKind,
    pub identifier: String,
}

/// Item whose snapshot could not be built.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NormalizationFailure {
    pub side: Side,
    pub kind: ItemKind,
    pub identifier: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RigValidationReport {
    pub scene: String,
    pub interchange: String,
    pub mode: ValidationMode,
    pub generated_at: Timestamp,
    pub skeletons: Vec<SkeletonComparison>,
    pub skins: Vec<SkinComparison>,
    pub unpaired: Vec<UnpairedItem>,
    pub failures: Vec<NormalizationFailure>,
}

impl RigValidationReport {
    pub fn new(
        scene: impl Into<String>,
        interchange: impl Into<String>,
        mode: ValidationMode,
    ) -> Self {
        Self {
            scene: scene.into(),
            interchange: interchange.into(),
            mode,
            generated_at: Timestamp::now(),
            skeletons: Vec::new(),
            skins: Vec::new(),
            unpaired: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn issue_count(&self) -> usize {
        self.skeletons
            .iter()
            .map(|comparison| comparison.issues.len())
            .chain(self.skins.iter().map(|comparison| comparison.issues.len()))
            .sum()
    }

    /// Every pair passed and nothing was left unpaired or unreadable.
    pub fn is_clean(&self) -> bool {
        self.skeletons.iter().all(|comparison| comparison.passed)
            && self.skins.iter().all(|comparison| comparison.passed)
            && self.unpaired.is_empty()
            && self.failures.is_empty()
    }
}

// ─── Rendering ────────────────────────────────────────────────────────────────

/// One-line form used in logs and the markdown summary: `[CODE] description @index`.
pub fn render_issue(issue: &ValidationIssue) -> String {
    match issue.index {
        Some(index) => format!("[{}] {} @{}", issue.kind.code(), issue.description, index),
        None => format!("[{}] {}", issue.kind.code(), issue.description),
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed { "PASS" } else { "FAIL" }
}

pub fn render_report_markdown(report: &RigValidationReport) -> String {
    let mut content = String::new();
    content.push_str("# rigcheck Validation Report\n\n");
    content.push_str("## Summary\n\n");
    content.push_str(&format!("- Scene: `{}`\n", report.scene));
    content.push_str(&format!("- Interchange: `{}`\n", report.interchange));
    content.push_str(&format!("- Mode: `{:?}`\n", report.mode));
    content.push_str(&format!("- Generated: `{}`\n", report.generated_at));
    content.push_str(&format!(
        "- Skeleton pairs / Skin pairs: `{}` / `{}`\n",
        report.skeletons.len(),
        report.skins.len()
    ));
    content.push_str(&format!("- Issues: `{}`\n", report.issue_count()));
    content.push_str(&format!("- Result: `{}`\n\n", verdict(report.is_clean())));

    content.push_str("## Skeletons\n\n");
    if report.skeletons.is_empty() {
        content.push_str("- None\n");
    }
    for comparison in &report.skeletons {
        content.push_str(&format!(
            "### `{}` ↔ `{}` ({} joints): {}\n\n",
            comparison.interchange_skeleton,
            comparison.scene_skeleton,
            comparison.joint_count,
            verdict(comparison.passed)
        ));
        for issue in &comparison.issues {
            content.push_str(&format!("- {}\n", render_issue(issue)));
        }
        content.push('\n');
    }

    content.push_str("## Skins\n\n");
    if report.skins.is_empty() {
        content.push_str("- None\n");
    }
    for comparison in &report.skins {
        content.push_str(&format!(
            "### `{}` ↔ `{}` ({} influences): {}\n\n",
            comparison.interchange_geometry,
            comparison.scene_geometry,
            comparison.influence_count,
            verdict(comparison.passed)
        ));
        for issue in &comparison.issues {
            content.push_str(&format!("- {}\n", render_issue(issue)));
        }
        content.push('\n');
    }

    if !report.unpaired.is_empty() {
        content.push_str("## Unpaired\n\n");
        for item in &report.unpaired {
            content.push_str(&format!(
                "- [{}] {:?} `{}`\n",
                item.side, item.kind, item.identifier
            ));
        }
        content.push('\n');
    }

    if !report.failures.is_empty() {
        content.push_str("## Failures\n\n");
        for failure in &report.failures {
            content.push_str(&format!(
                "- [{}] {:?} `{}`: {}\n",
                failure.side, failure.kind, failure.identifier, failure.message
            ));
        }
        content.push('\n');
    }

    content
}

// ─── Writers ──────────────────────────────────────────────────────────────────

pub fn write_report_json(path: &Path, report: &RigValidationReport) -> Result<()> {
    let content =
        serde_json::to_string_pretty(report).context("failed to serialize validation report")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write validation report: {}", path.display()))?;
    Ok(())
}

pub fn write_report_markdown(path: &Path, report: &RigValidationReport) -> Result<()> {
    fs::write(path, render_report_markdown(report))
        .with_context(|| format!("failed to write validation summary: {}", path.display()))?;
    Ok(())
}
