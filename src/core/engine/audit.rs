use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    BranchLabel, CountableUnit, CoverageDataset, OutcomeKind, OutcomeRecord, StructuralModel,
    UnverifiedOutcome,
};

/// Advisory that two structurally different decision sites produced the
/// same branch-coverage outcome, hinting that a single assertion may be
/// satisfying both. A hint toward a low-value test, never a proof of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoAdvisory {
    pub unit: String,
    pub first_site: u32,
    pub second_site: u32,
    pub note: String,
}

/// Flag every observable mutation no assertion ever referenced.
///
/// Coverage ratios cannot see this: a test can execute a mutation's line,
/// assert on an unrelated return value, and report 100% coverage while the
/// mutated state goes unverified. The audit is a separate signal surfaced
/// alongside the ratios, never folded into them.
pub fn audit(records: &[OutcomeRecord]) -> Vec<UnverifiedOutcome> {
    let mut unverified: Vec<UnverifiedOutcome> = records
        .iter()
        .filter(|r| r.kind == OutcomeKind::ObservableMutation && !r.asserted)
        .map(|r| UnverifiedOutcome {
            subject: r.subject.clone(),
            test: r.test.clone(),
        })
        .collect();
    unverified.sort();
    unverified.dedup();
    unverified
}

/// Find decision sites within a unit whose per-branch hit counts are
/// identical (and not all zero). Exercised sites that are
/// indistinguishable in the dataset often trace back to one test path
/// driving both. Every pair of sites is considered, not just neighbors.
pub fn echoed_sites(dataset: &CoverageDataset, models: &[&StructuralModel]) -> Vec<EchoAdvisory> {
    let mut advisories = Vec::new();

    for model in models {
        // signature = the site's label -> hit-count map, in label order
        let mut groups: BTreeMap<Vec<(BranchLabel, u64)>, Vec<u32>> = BTreeMap::new();
        for site in &model.sites {
            let mut signature = BTreeMap::new();
            for unit in &model.units {
                if let CountableUnit::Branch {
                    site: owner, label, ..
                } = unit
                {
                    if *owner == site.id {
                        signature.insert(label.clone(), dataset.hits(unit));
                    }
                }
            }
            groups
                .entry(signature.into_iter().collect())
                .or_default()
                .push(site.id);
        }

        for (signature, sites) in groups {
            let exercised = signature.iter().any(|(_, hits)| *hits > 0);
            if !exercised || sites.len() < 2 {
                continue;
            }
            // one advisory per echoing site, anchored to the earliest
            let first = sites[0];
            for &second in &sites[1..] {
                advisories.push(EchoAdvisory {
                    unit: model.unit_name.clone(),
                    first_site: first,
                    second_site: second,
                    note: format!(
                        "decision sites {first} and {second} have identical branch outcomes; \
                         one assertion may be satisfying both"
                    ),
                });
            }
        }
    }

    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchKind, ContentHash, DecisionSite};

    fn record(subject: &str, kind: OutcomeKind, asserted: bool) -> OutcomeRecord {
        OutcomeRecord {
            subject: subject.to_string(),
            test: "test_transfer".to_string(),
            kind,
            asserted,
        }
    }

    #[test]
    fn unasserted_mutation_is_flagged_once() {
        let records = vec![
            record("transfer() return", OutcomeKind::ExplicitReturn, true),
            record("account.balance", OutcomeKind::ObservableMutation, false),
            record("account.balance", OutcomeKind::ObservableMutation, false),
        ];
        let unverified = audit(&records);
        assert_eq!(
            unverified,
            vec![UnverifiedOutcome {
                subject: "account.balance".to_string(),
                test: "test_transfer".to_string(),
            }]
        );
    }

    #[test]
    fn asserted_mutations_and_returns_pass() {
        let records = vec![
            record("log.entries", OutcomeKind::ObservableMutation, true),
            record("f() return", OutcomeKind::ExplicitReturn, false),
        ];
        assert!(audit(&records).is_empty());
    }

    #[test]
    fn identical_exercised_sites_draw_an_advisory() {
        let units = vec![
            CountableUnit::branch("a.sim", 0, BranchLabel::True, 1),
            CountableUnit::branch("a.sim", 0, BranchLabel::False, 1),
            CountableUnit::branch("a.sim", 1, BranchLabel::True, 4),
            CountableUnit::branch("a.sim", 1, BranchLabel::False, 4),
        ];
        let site = |id, line| DecisionSite {
            id,
            kind: BranchKind::If,
            line,
            labels: vec![BranchLabel::True, BranchLabel::False],
        };
        let model = StructuralModel {
            unit_name: "a.sim".to_string(),
            content_hash: ContentHash::digest("a"),
            units: units.clone(),
            sites: vec![site(0, 1), site(1, 4)],
            statements: vec![],
            probes: vec![],
        };

        let mut dataset = CoverageDataset::new();
        dataset.add(units[0].clone(), 3);
        dataset.seed_zero(units[1].clone());
        dataset.add(units[2].clone(), 3);
        dataset.seed_zero(units[3].clone());

        let advisories = echoed_sites(&dataset, &[&model]);
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].first_site, 0);
        assert_eq!(advisories[0].second_site, 1);

        // diverge the second site; the echo disappears
        dataset.add(units[3].clone(), 1);
        assert!(echoed_sites(&dataset, &[&model]).is_empty());
    }

    #[test]
    fn echoes_are_found_across_intervening_sites() {
        let units = vec![
            CountableUnit::branch("a.sim", 0, BranchLabel::True, 1),
            CountableUnit::branch("a.sim", 0, BranchLabel::False, 1),
            CountableUnit::branch("a.sim", 1, BranchLabel::True, 4),
            CountableUnit::branch("a.sim", 1, BranchLabel::False, 4),
            CountableUnit::branch("a.sim", 2, BranchLabel::True, 7),
            CountableUnit::branch("a.sim", 2, BranchLabel::False, 7),
        ];
        let site = |id, line| DecisionSite {
            id,
            kind: BranchKind::If,
            line,
            labels: vec![BranchLabel::True, BranchLabel::False],
        };
        let model = StructuralModel {
            unit_name: "a.sim".to_string(),
            content_hash: ContentHash::digest("a"),
            units: units.clone(),
            sites: vec![site(0, 1), site(1, 4), site(2, 7)],
            statements: vec![],
            probes: vec![],
        };

        // sites 0 and 2 share an outcome; site 1 in between diverges
        let mut dataset = CoverageDataset::new();
        dataset.add(units[0].clone(), 3);
        dataset.seed_zero(units[1].clone());
        dataset.add(units[2].clone(), 1);
        dataset.add(units[3].clone(), 2);
        dataset.add(units[4].clone(), 3);
        dataset.seed_zero(units[5].clone());

        let advisories = echoed_sites(&dataset, &[&model]);
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].first_site, 0);
        assert_eq!(advisories[0].second_site, 2);
    }

    #[test]
    fn all_zero_sites_do_not_echo() {
        let units = vec![
            CountableUnit::branch("a.sim", 0, BranchLabel::True, 1),
            CountableUnit::branch("a.sim", 0, BranchLabel::False, 1),
            CountableUnit::branch("a.sim", 1, BranchLabel::True, 4),
            CountableUnit::branch("a.sim", 1, BranchLabel::False, 4),
        ];
        let site = |id, line| DecisionSite {
            id,
            kind: BranchKind::If,
            line,
            labels: vec![BranchLabel::True, BranchLabel::False],
        };
        let model = StructuralModel {
            unit_name: "a.sim".to_string(),
            content_hash: ContentHash::digest("a"),
            units: units.clone(),
            sites: vec![site(0, 1), site(1, 4)],
            statements: vec![],
            probes: vec![],
        };
        let mut dataset = CoverageDataset::new();
        for u in &units {
            dataset.seed_zero(u.clone());
        }
        assert!(echoed_sites(&dataset, &[&model]).is_empty());
    }
}
