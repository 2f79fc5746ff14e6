use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use crate::FrontendRegistry;
use crate::core::cli::InstrumentArgs;
use crate::core::engine::batch::process_units;
use crate::core::engine::instrument::instrument;
use crate::types::config::config;
use crate::types::{AppError, AppResult, BranchKind, BranchKinds, SourceUnit};

fn resolve_branch_kinds(args: &InstrumentArgs) -> BranchKinds {
    match &args.branch_kinds {
        None => config().branch().kinds(),
        Some(csv) => BranchKinds::new(
            csv.split(',')
                .filter_map(|s| s.trim().parse::<BranchKind>().ok())
                .collect(),
        ),
    }
}

/// Output paths for one instrumented unit, derived from its file stem
fn output_paths(out_dir: &Path, source: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let artifact = if ext.is_empty() {
        out_dir.join(format!("{stem}.instrumented"))
    } else {
        out_dir.join(format!("{stem}.instrumented.{ext}"))
    };
    let map = out_dir.join(format!("{stem}.countermap.json"));
    let model = out_dir.join(format!("{stem}.model.json"));
    (artifact, map, model)
}

pub fn execute_instrument(
    args: InstrumentArgs,
    registry: Arc<FrontendRegistry>,
    running: Arc<AtomicBool>,
) -> AppResult<i32> {
    let kinds = resolve_branch_kinds(&args);
    let concurrency = args.concurrency.unwrap_or_else(|| config().concurrency());
    let out_dir = PathBuf::from(
        args.out_dir
            .as_deref()
            .unwrap_or_else(|| config().out_dir()),
    );
    fs::create_dir_all(&out_dir)?;

    // Explicit file arguments only; the engine never discovers files
    let mut units = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = PathBuf::from(file);
        if !path.is_file() {
            return Err(AppError::Other(format!("not a file: {file}")));
        }
        units.push(SourceUnit::from_file(&path)?);
    }

    info!(
        "Instrumenting {} unit(s) with {} worker(s)",
        units.len(),
        concurrency
    );

    let bar = ProgressBar::new(units.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let summary = process_units(&units, concurrency, &running, Some(&bar), |unit| {
        let model = registry.build(unit, &kinds)?;
        let (artifact, map) = instrument(unit, &model)?;

        let (artifact_path, map_path, model_path) = output_paths(&out_dir, Path::new(&unit.name));
        let write = |path: &Path, contents: &str| {
            fs::write(path, contents).map_err(|e| {
                crate::types::EngineError::instrumentation(
                    &unit.name,
                    format!("cannot write {}: {e}", path.display()),
                )
            })
        };
        write(&artifact_path, &artifact.text)?;
        let map_json = serde_json::to_string_pretty(&map)
            .expect("counter map serializes");
        write(&map_path, &map_json)?;
        let model_json = serde_json::to_string_pretty(&model)
            .expect("model serializes");
        write(&model_path, &model_json)?;

        Ok((unit.name.clone(), map.len()))
    });
    bar.finish_and_clear();

    for (name, counters) in &summary.completed {
        info!("{name}: {counters} counter(s)");
    }
    for failure in &summary.failed {
        error!("{}: {}", failure.unit_name, failure.error);
    }
    info!(
        "Instrumented {} unit(s), {} failed",
        summary.completed.len(),
        summary.failed.len()
    );

    if summary.interrupted {
        Ok(2)
    } else if summary.failed.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}
