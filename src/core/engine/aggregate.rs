use crate::types::{CounterMap, CoverageDataset, EngineError, ExecutionSnapshot, Phase};

/// Merges execution snapshots into a single coverage dataset.
///
/// The aggregator exclusively owns its dataset for the duration of a report
/// generation cycle; snapshots are applied one at a time. Merging sums hit
/// counts keyed by countable-unit identity (not raw index), so snapshots
/// taken against different counter-map versions of the same unchanged
/// source still combine, and merge order never changes the result.
pub struct Aggregator {
    dataset: CoverageDataset,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            dataset: CoverageDataset::new(),
        }
    }

    pub fn resume(dataset: CoverageDataset) -> Self {
        Self { dataset }
    }

    /// Register every unit a counter map knows about with zero hits.
    ///
    /// Units that no snapshot ever mentions must read as "zero coverage",
    /// not "unknown", so seeding happens before any snapshot lands.
    pub fn seed(&mut self, map: &CounterMap) -> Result<(), EngineError> {
        self.dataset
            .record_source(&map.unit_name, map.content_hash)?;
        for unit in &map.entries {
            self.dataset.seed_zero(unit.clone());
        }
        Ok(())
    }

    /// Fold one snapshot in, translating indices through its counter map
    pub fn merge(
        &mut self,
        map: &CounterMap,
        snapshot: &ExecutionSnapshot,
    ) -> Result<(), EngineError> {
        self.dataset
            .record_source(&map.unit_name, map.content_hash)?;
        for (&index, &count) in &snapshot.counts {
            let unit = map.unit_at(index).ok_or(EngineError::CounterDesync {
                unit: map.unit_name.clone(),
                index,
                slots: map.len() as u32,
                phase: Phase::Merge,
            })?;
            self.dataset.add(unit.clone(), count);
        }
        Ok(())
    }

    pub fn dataset(&self) -> &CoverageDataset {
        &self.dataset
    }

    pub fn finish(self) -> CoverageDataset {
        self.dataset
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentHash, CountableUnit};

    fn map_of(name: &str, text: &str, lines: &[u32]) -> CounterMap {
        CounterMap {
            unit_name: name.to_string(),
            content_hash: ContentHash::digest(text),
            entries: lines.iter().map(|&l| CountableUnit::line(name, l)).collect(),
        }
    }

    fn snap(pairs: &[(u32, u64)]) -> ExecutionSnapshot {
        ExecutionSnapshot {
            counts: pairs.iter().copied().collect(),
        }
    }

    #[test]
    fn seeded_units_default_to_zero() {
        let map = map_of("a.sim", "x", &[1, 2, 3]);
        let mut agg = Aggregator::new();
        agg.seed(&map).unwrap();
        agg.merge(&map, &snap(&[(0, 2)])).unwrap();
        let dataset = agg.finish();
        assert_eq!(dataset.hits(&CountableUnit::line("a.sim", 1)), 2);
        assert_eq!(dataset.hits(&CountableUnit::line("a.sim", 3)), 0);
        assert_eq!(dataset.zero_hit().len(), 2);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let map = map_of("a.sim", "x", &[1, 2]);
        let a = snap(&[(0, 1), (1, 4)]);
        let b = snap(&[(0, 2)]);

        let mut left = Aggregator::new();
        left.seed(&map).unwrap();
        left.merge(&map, &a).unwrap();
        left.merge(&map, &b).unwrap();

        let mut right = Aggregator::new();
        right.seed(&map).unwrap();
        right.merge(&map, &b).unwrap();
        right.merge(&map, &a).unwrap();

        assert_eq!(left.finish(), right.finish());
    }

    #[test]
    fn content_hash_conflict_is_fatal() {
        let old = map_of("a.sim", "x", &[1]);
        let new = map_of("a.sim", "y", &[1]);
        let mut agg = Aggregator::new();
        agg.seed(&old).unwrap();
        let err = agg.merge(&new, &snap(&[(0, 1)])).unwrap_err();
        assert!(matches!(err, EngineError::MergeConflict { .. }));
    }

    #[test]
    fn snapshot_index_beyond_map_is_a_desync() {
        let map = map_of("a.sim", "x", &[1]);
        let mut agg = Aggregator::new();
        agg.seed(&map).unwrap();
        let err = agg.merge(&map, &snap(&[(5, 1)])).unwrap_err();
        assert!(matches!(
            err,
            EngineError::CounterDesync {
                index: 5,
                phase: Phase::Merge,
                ..
            }
        ));
    }
}
