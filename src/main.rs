use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use rigcheck::rig::{
    GltfScene, InterchangeDocument, InterchangeSource, SceneSource, render_issue,
    write_report_json, write_report_markdown,
};
use rigcheck::{ValidationSettings, load_settings, validate_rig};

/// Exit status when validation ran but the two sides disagree.
const EXIT_MISMATCH: i32 = 3;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_MISMATCH),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(1);
        }
    }
}

fn report_path_for(interchange_path: &Path, extension: &str) -> PathBuf {
    interchange_path.with_extension(extension)
}

fn run() -> anyhow::Result<bool> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 && args.len() != 4 {
        eprintln!("Usage: rigcheck <scene.glb|scene.gltf> <rig.json> [settings.json]");
        process::exit(2);
    }

    let scene_path = PathBuf::from(&args[1]);
    let interchange_path = PathBuf::from(&args[2]);
    let settings = match args.get(3) {
        Some(path) => load_settings(Path::new(path))?,
        None => ValidationSettings::default(),
    };

    let scene = SceneSource::new(GltfScene::open(&scene_path)?, settings.negligible_weight);
    let interchange = InterchangeSource::new(
        InterchangeDocument::open(&interchange_path)?,
        settings.negligible_weight,
    );

    let report = validate_rig(&scene, &interchange, &settings)?;

    for comparison in &report.skeletons {
        println!(
            "Skeleton {} <-> {}: {}",
            comparison.interchange_skeleton,
            comparison.scene_skeleton,
            if comparison.passed { "ok" } else { "MISMATCH" }
        );
        for issue in &comparison.issues {
            println!("  {}", render_issue(issue));
        }
    }
    for comparison in &report.skins {
        println!(
            "Skin {} <-> {}: {}",
            comparison.interchange_geometry,
            comparison.scene_geometry,
            if comparison.passed { "ok" } else { "MISMATCH" }
        );
        for issue in &comparison.issues {
            println!("  {}", render_issue(issue));
        }
    }
    for item in &report.unpaired {
        println!("Unpaired {:?} on {} side: {}", item.kind, item.side, item.identifier);
    }
    for failure in &report.failures {
        println!("Failed {:?} {}: {}", failure.kind, failure.identifier, failure.message);
    }

    let json_path = report_path_for(&interchange_path, "report.json");
    let markdown_path = report_path_for(&interchange_path, "report.md");
    write_report_json(&json_path, &report)?;
    write_report_markdown(&markdown_path, &report)?;
    println!("Report: {} ({})", json_path.display(), markdown_path.display());

    Ok(report.is_clean())
}
