use std::fs;

use log::info;

use crate::core::cli::PrintUnitsArgs;
use crate::types::{AppResult, CountableUnit, StructuralModel};

pub fn execute(args: PrintUnitsArgs) -> AppResult<i32> {
    let contents = fs::read_to_string(&args.model)?;
    let model: StructuralModel = serde_json::from_str(&contents)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&model.units)?);
        return Ok(0);
    }

    info!(
        "{}: {} line(s), {} branch(es) across {} decision site(s)",
        model.unit_name,
        model.lines().count(),
        model.branches().count(),
        model.sites.len()
    );
    for unit in &model.units {
        match unit {
            CountableUnit::Line { line, .. } => info!("  line {line}"),
            CountableUnit::Branch {
                site, label, line, ..
            } => info!("  branch site {site} [{label}] at line {line}"),
        }
    }

    Ok(0)
}
