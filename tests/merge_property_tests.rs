use proptest::prelude::*;

use reach::Aggregator;
use reach::types::{ContentHash, CounterMap, CountableUnit, ExecutionSnapshot};

const SLOTS: u32 = 6;

fn fixture_map() -> CounterMap {
    let name = "prop.sim";
    CounterMap {
        unit_name: name.to_string(),
        content_hash: ContentHash::digest("fn main() { }"),
        entries: (1..=SLOTS).map(|l| CountableUnit::line(name, l)).collect(),
    }
}

fn snapshot_strategy() -> impl Strategy<Value = ExecutionSnapshot> {
    proptest::collection::btree_map(0..SLOTS, 1u64..1_000, 0..SLOTS as usize)
        .prop_map(|counts| ExecutionSnapshot { counts })
}

fn merged(map: &CounterMap, snaps: &[ExecutionSnapshot]) -> reach::types::CoverageDataset {
    let mut agg = Aggregator::new();
    agg.seed(map).unwrap();
    for snap in snaps {
        agg.merge(map, snap).unwrap();
    }
    agg.finish()
}

proptest! {
    #[test]
    fn merge_order_never_changes_the_dataset(
        snaps in proptest::collection::vec(snapshot_strategy(), 0..6)
    ) {
        let map = fixture_map();
        let forward = merged(&map, &snaps);
        let mut reversed = snaps.clone();
        reversed.reverse();
        let backward = merged(&map, &reversed);
        prop_assert_eq!(&forward, &backward);
    }

    #[test]
    fn equal_datasets_serialize_byte_identically(
        snaps in proptest::collection::vec(snapshot_strategy(), 1..6)
    ) {
        let map = fixture_map();
        let forward = merged(&map, &snaps);
        let mut reversed = snaps.clone();
        reversed.reverse();
        let backward = merged(&map, &reversed);
        prop_assert_eq!(
            serde_json::to_string(&forward).unwrap(),
            serde_json::to_string(&backward).unwrap()
        );
    }

    #[test]
    fn grouping_of_merges_never_changes_the_dataset(
        snaps in proptest::collection::vec(snapshot_strategy(), 2..6),
        split in 1usize..5
    ) {
        let map = fixture_map();
        let split = split.min(snaps.len() - 1);
        let whole = merged(&map, &snaps);

        // merge the two halves into separate datasets, then combine by
        // folding the second into the first
        let first = merged(&map, &snaps[..split]);
        let second = merged(&map, &snaps[split..]);
        let mut agg = Aggregator::resume(first);
        agg.seed(&map).unwrap();
        for (unit, hits) in second.iter() {
            if hits > 0 {
                let mut single = ExecutionSnapshot::default();
                single.counts.insert(map.index_of(unit).unwrap(), hits);
                agg.merge(&map, &single).unwrap();
            }
        }
        prop_assert_eq!(whole, agg.finish());
    }

    #[test]
    fn dataset_json_round_trips_exactly(
        snaps in proptest::collection::vec(snapshot_strategy(), 0..4)
    ) {
        let map = fixture_map();
        let dataset = merged(&map, &snaps);
        let json = serde_json::to_string(&dataset).unwrap();
        let back: reach::types::CoverageDataset = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back, &dataset);
        prop_assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }
}
