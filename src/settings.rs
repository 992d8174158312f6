use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::rig::{
    CompareOptions, DEFAULT_MAX_REPORTED_MISMATCHES, DEFAULT_TRANSFORM_TOLERANCE,
    DEFAULT_WEIGHT_TOLERANCE, NEGLIGIBLE_WEIGHT_THRESHOLD, ValidationMode,
};

/// Tolerances, thresholds and reporting caps for one validation run.
///
/// Missing keys in a settings file fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    pub mode: ValidationMode,
    pub transform_tolerance: f64,
    pub weight_tolerance: f32,
    pub negligible_weight: f64,
    pub max_reported_mismatches: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Detailed,
            transform_tolerance: DEFAULT_TRANSFORM_TOLERANCE,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            negligible_weight: NEGLIGIBLE_WEIGHT_THRESHOLD,
            max_reported_mismatches: DEFAULT_MAX_REPORTED_MISMATCHES,
        }
    }
}

impl ValidationSettings {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            transform_tolerance: self.transform_tolerance,
            weight_tolerance: self.weight_tolerance,
            max_reported_mismatches: self.max_reported_mismatches,
        }
    }
}

/// Save validation settings to a JSON file.
pub fn save_settings(path: &Path, settings: &ValidationSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize validation settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save validation settings: {}", path.display()))?;
    Ok(())
}

/// Load validation settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<ValidationSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load validation settings: {}", path.display()))?;
    let settings: ValidationSettings =
        serde_json::from_str(&content).context("failed to parse validation settings JSON")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn given_default_settings_when_serialize_then_json_uses_snake_case_keys() {
        let json = serde_json::to_string(&ValidationSettings::default()).expect("serialize");

        assert!(json.contains("max_reported_mismatches"));
        assert!(json.contains("\"mode\":\"detailed\""));
    }

    #[test]
    fn given_partial_settings_json_when_parsing_then_missing_keys_use_defaults() {
        let settings: ValidationSettings =
            serde_json::from_str(r#"{ "mode": "quick", "max_reported_mismatches": 10 }"#)
                .expect("parse");

        assert_eq!(settings.mode, ValidationMode::Quick);
        assert_eq!(settings.max_reported_mismatches, 10);
        assert_eq!(settings.transform_tolerance, DEFAULT_TRANSFORM_TOLERANCE);
        assert_eq!(settings.compare_options().max_reported_mismatches, 10);
    }

    #[test]
    fn given_saved_settings_when_loading_then_values_round_trip() {
        let path =
            env::temp_dir().join(format!("rigcheck_settings_test_{}.json", std::process::id()));
        let settings = ValidationSettings {
            transform_tolerance: 1e-4,
            ..ValidationSettings::default()
        };

        save_settings(&path, &settings).expect("save");
        let loaded = load_settings(&path).expect("load");
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, settings);
    }

    #[test]
    fn given_missing_file_when_loading_then_error_names_path() {
        let error = load_settings(Path::new("/nonexistent/rigcheck.json")).expect_err("missing");

        assert!(format!("{:#}", error).contains("/nonexistent/rigcheck.json"));
    }
}
