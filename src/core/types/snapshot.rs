use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ContentHash, CountableUnit, EngineError};

/// Hit counts from one program run, keyed by counter index.
///
/// Sparse by design: a long-running program may flush any subset of its
/// indices at a time, and repeated snapshots within a run are monotonically
/// non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub counts: BTreeMap<u32, u64>,
}

impl ExecutionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, index: u32) -> u64 {
        self.counts.get(&index).copied().unwrap_or(0)
    }
}

#[derive(Serialize, Deserialize)]
struct DatasetEntry {
    #[serde(flatten)]
    unit: CountableUnit,
    hits: u64,
}

#[derive(Serialize, Deserialize)]
struct DatasetRepr {
    sources: BTreeMap<String, ContentHash>,
    entries: Vec<DatasetEntry>,
}

/// Total hit counts across all merged snapshots, keyed by countable unit.
///
/// Ordered maps throughout, so two datasets built from the same inputs in
/// any merge order serialize to byte-identical documents. `sources` pins
/// the content hash each unit name was measured against; a later input
/// claiming the same name with a different hash is a merge conflict, never
/// a silent mix of incompatible structures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DatasetRepr", into = "DatasetRepr")]
pub struct CoverageDataset {
    hits: BTreeMap<CountableUnit, u64>,
    sources: BTreeMap<String, ContentHash>,
}

impl From<DatasetRepr> for CoverageDataset {
    fn from(repr: DatasetRepr) -> Self {
        let mut hits = BTreeMap::new();
        for entry in repr.entries {
            *hits.entry(entry.unit).or_insert(0) += entry.hits;
        }
        Self {
            hits,
            sources: repr.sources,
        }
    }
}

impl From<CoverageDataset> for DatasetRepr {
    fn from(dataset: CoverageDataset) -> Self {
        Self {
            sources: dataset.sources,
            entries: dataset
                .hits
                .into_iter()
                .map(|(unit, hits)| DatasetEntry { unit, hits })
                .collect(),
        }
    }
}

impl CoverageDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit name and the content hash its counters were built
    /// against. Conflicting hashes for the same name abort the merge.
    pub fn record_source(&mut self, name: &str, hash: ContentHash) -> Result<(), EngineError> {
        match self.sources.get(name) {
            Some(existing) if *existing != hash => Err(EngineError::MergeConflict {
                unit: name.to_string(),
                ours: existing.to_hex(),
                theirs: hash.to_hex(),
            }),
            Some(_) => Ok(()),
            None => {
                self.sources.insert(name.to_string(), hash);
                Ok(())
            }
        }
    }

    /// Ensure a unit is present, defaulting to zero hits. Absence of data
    /// must read as "zero coverage", not "unknown".
    pub fn seed_zero(&mut self, unit: CountableUnit) {
        self.hits.entry(unit).or_insert(0);
    }

    pub fn add(&mut self, unit: CountableUnit, count: u64) {
        *self.hits.entry(unit).or_insert(0) += count;
    }

    pub fn hits(&self, unit: &CountableUnit) -> u64 {
        self.hits.get(unit).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountableUnit, u64)> {
        self.hits.iter().map(|(u, h)| (u, *h))
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn source_hash(&self, name: &str) -> Option<&ContentHash> {
        self.sources.get(name)
    }

    /// Units with zero recorded hits, in deterministic order
    pub fn zero_hit(&self) -> Vec<&CountableUnit> {
        self.hits
            .iter()
            .filter(|(_, h)| **h == 0)
            .map(|(u, _)| u)
            .collect()
    }
}
