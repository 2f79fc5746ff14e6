use std::fs;
use std::path::Path;

use log::info;

use crate::Aggregator;
use crate::core::cli::MergeArgs;
use crate::types::{AppError, AppResult, CounterMap, CoverageDataset, ExecutionSnapshot};

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> AppResult<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Snapshot files are named `<stem>.*.json`; match them to the counter map
/// whose unit shares the stem, or fall back when only one map is loaded.
/// A stem claimed by several maps is an error: guessing would sum one
/// unit's hits into another's countable units.
fn map_for_snapshot<'a>(maps: &'a [CounterMap], snapshot_path: &str) -> AppResult<&'a CounterMap> {
    if let [only] = maps {
        return Ok(only);
    }
    let stem = Path::new(snapshot_path)
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .ok_or_else(|| {
            AppError::Other(format!("snapshot path has no file stem: {snapshot_path}"))
        })?;
    let candidates: Vec<&CounterMap> = maps
        .iter()
        .filter(|m| {
            Path::new(&m.unit_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s == stem)
        })
        .collect();
    match candidates.as_slice() {
        [] => Err(AppError::Other(format!(
            "cannot match snapshot {snapshot_path} to a counter map"
        ))),
        [only] => Ok(*only),
        several => Err(AppError::Other(format!(
            "snapshot {snapshot_path} matches several counter maps ({}); \
             rename the units or merge them in separate runs",
            several
                .iter()
                .map(|m| m.unit_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

pub fn execute_merge(args: MergeArgs) -> AppResult<i32> {
    let maps: Vec<CounterMap> = args
        .maps
        .iter()
        .map(|p| read_json(p))
        .collect::<AppResult<_>>()?;

    let mut aggregator = match &args.into {
        Some(path) => Aggregator::resume(read_json::<CoverageDataset>(path)?),
        None => Aggregator::new(),
    };

    // Seed first: units no snapshot mentions must still land at zero
    for map in &maps {
        aggregator.seed(map)?;
    }

    for snapshot_path in &args.snapshots {
        let snapshot: ExecutionSnapshot = read_json(snapshot_path)?;
        let map = map_for_snapshot(&maps, snapshot_path)?;
        aggregator.merge(map, &snapshot)?;
        info!("Merged {snapshot_path} against {}", map.unit_name);
    }

    let dataset = aggregator.finish();
    if let Some(parent) = Path::new(&args.out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&args.out, serde_json::to_string_pretty(&dataset)?)?;
    info!(
        "Wrote dataset with {} countable unit(s) to {}",
        dataset.len(),
        args.out
    );

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentHash, CountableUnit};

    fn map_of(unit_name: &str) -> CounterMap {
        CounterMap {
            unit_name: unit_name.to_string(),
            content_hash: ContentHash::digest(unit_name),
            entries: vec![CountableUnit::line(unit_name, 1)],
        }
    }

    #[test]
    fn unique_stem_matches_its_map() {
        let maps = vec![map_of("a/util.sim"), map_of("a/parse.sim")];
        let map = map_for_snapshot(&maps, "runs/parse.snap.json").unwrap();
        assert_eq!(map.unit_name, "a/parse.sim");
    }

    #[test]
    fn single_map_needs_no_stem_match() {
        let maps = vec![map_of("a/util.sim")];
        let map = map_for_snapshot(&maps, "whatever.json").unwrap();
        assert_eq!(map.unit_name, "a/util.sim");
    }

    #[test]
    fn stem_shared_by_two_units_is_an_error_not_a_guess() {
        let maps = vec![map_of("a/util.sim"), map_of("b/util.sim")];
        let err = map_for_snapshot(&maps, "util.snap.json").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a/util.sim"));
        assert!(message.contains("b/util.sim"));
    }

    #[test]
    fn unmatched_snapshot_is_an_error() {
        let maps = vec![map_of("a/util.sim"), map_of("a/parse.sim")];
        assert!(map_for_snapshot(&maps, "lexer.snap.json").is_err());
    }
}
