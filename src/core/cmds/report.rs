use std::fs;

use console::style;
use log::info;

use crate::core::cli::ReportArgs;
use crate::core::engine::audit::{audit, echoed_sites};
use crate::core::engine::report::{CoverageReport, report};
use crate::types::config::{ThresholdConfig, config};
use crate::types::{AppResult, CoverageDataset, OutcomeRecord, StructuralModel};

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> AppResult<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

fn print_table(rep: &CoverageReport) {
    println!("{}", style("Coverage").bold());
    for unit in &rep.units {
        println!(
            "  {:<40} lines {:>8} ({}/{})  branches {:>8} ({}/{})",
            unit.unit_name,
            format_ratio(unit.line_ratio),
            unit.line.covered,
            unit.line.total,
            format_ratio(unit.branch_ratio),
            unit.branch.covered,
            unit.branch.total,
        );
        for zero in &unit.zero_hit {
            println!("    {} {}", style("never hit:").dim(), zero);
        }
    }
    println!(
        "  {:<40} lines {:>8} ({}/{})  branches {:>8} ({}/{})",
        style("total").bold(),
        format_ratio(rep.aggregate.line_ratio),
        rep.aggregate.line.covered,
        rep.aggregate.line.total,
        format_ratio(rep.aggregate.branch_ratio),
        rep.aggregate.branch.covered,
        rep.aggregate.branch.total,
    );

    if !rep.unverified.is_empty() {
        println!("{}", style("Unverified outcomes").bold().yellow());
        for outcome in &rep.unverified {
            println!(
                "  {} mutated by {} but never asserted",
                outcome.subject, outcome.test
            );
        }
    }
    if !rep.advisories.is_empty() {
        println!("{}", style("Advisories").bold());
        for advisory in &rep.advisories {
            println!("  {}: {}", advisory.unit, advisory.note);
        }
    }
}

pub fn execute_report(args: ReportArgs) -> AppResult<i32> {
    let dataset: CoverageDataset = read_json(&args.dataset)?;
    let models: Vec<StructuralModel> = args
        .models
        .iter()
        .map(|p| read_json(p))
        .collect::<AppResult<_>>()?;
    let model_refs: Vec<&StructuralModel> = models.iter().collect();

    let mut rep = report(&dataset, &model_refs);

    if config().audit().enabled() {
        if let Some(outcomes_path) = &args.outcomes {
            let records: Vec<OutcomeRecord> = read_json(outcomes_path)?;
            rep.unverified = audit(&records);
        }
        rep.advisories = echoed_sites(&dataset, &model_refs);
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&rep)?),
        _ => print_table(&rep),
    }

    if let Some(out) = &args.out {
        fs::write(out, serde_json::to_string_pretty(&rep)?)?;
        info!("Wrote report to {out}");
    }

    // CLI thresholds replace configured ones field by field
    let configured = config().thresholds();
    let thresholds = ThresholdConfig {
        line: args.threshold_line.or(configured.line),
        branch: args.threshold_branch.or(configured.branch),
    };
    if !rep.meets_thresholds(&thresholds) {
        info!("Coverage below configured thresholds");
        return Ok(1);
    }

    Ok(0)
}
