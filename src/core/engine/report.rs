use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::config::ThresholdConfig;
use crate::types::{CountableUnit, CoverageDataset, StructuralModel, UnverifiedOutcome};

use super::audit::EchoAdvisory;

/// Covered/total tally for one kind of countable unit.
///
/// A zero total is "not applicable" and is kept distinct from 0% covered
/// all the way into the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub covered: usize,
    pub total: usize,
}

impl Coverage {
    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.covered as f64 / self.total as f64)
        }
    }

    pub fn is_full(&self) -> bool {
        self.total > 0 && self.covered == self.total
    }

    fn tally(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.covered += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit_name: String,
    pub line: Coverage,
    pub branch: Coverage,
    /// None = not applicable (no countable units of that kind)
    pub line_ratio: Option<f64>,
    pub branch_ratio: Option<f64>,
    pub zero_hit: Vec<CountableUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub line: Coverage,
    pub branch: Coverage,
    pub line_ratio: Option<f64>,
    pub branch_ratio: Option<f64>,
}

/// The machine-readable export: ratios per unit and in aggregate, every
/// zero-hit countable unit, and the audit signals that ratios cannot carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub generated_at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
    pub aggregate: AggregateReport,
    pub unverified: Vec<UnverifiedOutcome>,
    pub advisories: Vec<EchoAdvisory>,
}

impl CoverageReport {
    /// True when no configured minimum ratio is undercut. A "not
    /// applicable" ratio never fails a threshold.
    pub fn meets_thresholds(&self, thresholds: &ThresholdConfig) -> bool {
        let line_ok = match (thresholds.line, self.aggregate.line_ratio) {
            (Some(min), Some(ratio)) => ratio >= min,
            _ => true,
        };
        let branch_ok = match (thresholds.branch, self.aggregate.branch_ratio) {
            (Some(min), Some(ratio)) => ratio >= min,
            _ => true,
        };
        line_ok && branch_ok
    }
}

/// Compute the coverage report for a set of modeled units.
///
/// Ratios come from the models' unit lists, never from the dataset alone:
/// a unit the dataset has no record for counts as uncovered, and a unit
/// that failed upstream simply is not in `models`, so failure and
/// zero-coverage stay distinguishable.
pub fn report(dataset: &CoverageDataset, models: &[&StructuralModel]) -> CoverageReport {
    let mut units = Vec::with_capacity(models.len());
    let mut aggregate_line = Coverage::default();
    let mut aggregate_branch = Coverage::default();

    for model in models {
        let mut line = Coverage::default();
        let mut branch = Coverage::default();
        let mut zero_hit = Vec::new();

        for unit in &model.units {
            let hit = dataset.hits(unit) > 0;
            if unit.is_line() {
                line.tally(hit);
                aggregate_line.tally(hit);
            } else {
                branch.tally(hit);
                aggregate_branch.tally(hit);
            }
            if !hit {
                zero_hit.push(unit.clone());
            }
        }

        units.push(UnitReport {
            unit_name: model.unit_name.clone(),
            line,
            branch,
            line_ratio: line.ratio(),
            branch_ratio: branch.ratio(),
            zero_hit,
        });
    }

    CoverageReport {
        generated_at: Utc::now(),
        units,
        aggregate: AggregateReport {
            line: aggregate_line,
            branch: aggregate_branch,
            line_ratio: aggregate_line.ratio(),
            branch_ratio: aggregate_branch.ratio(),
        },
        unverified: Vec::new(),
        advisories: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchKind, BranchLabel, ContentHash, DecisionSite};

    fn model_with(name: &str, units: Vec<CountableUnit>, sites: Vec<DecisionSite>) -> StructuralModel {
        StructuralModel {
            unit_name: name.to_string(),
            content_hash: ContentHash::digest(name),
            units,
            sites,
            statements: vec![],
            probes: vec![],
        }
    }

    #[test]
    fn one_of_two_branches_hit_is_half() {
        let t = CountableUnit::branch("a.sim", 0, BranchLabel::True, 1);
        let f = CountableUnit::branch("a.sim", 0, BranchLabel::False, 1);
        let model = model_with(
            "a.sim",
            vec![t.clone(), f.clone()],
            vec![DecisionSite {
                id: 0,
                kind: BranchKind::If,
                line: 1,
                labels: vec![BranchLabel::True, BranchLabel::False],
            }],
        );
        let mut dataset = CoverageDataset::new();
        dataset.seed_zero(f.clone());
        dataset.add(t, 1);

        let rep = report(&dataset, &[&model]);
        assert_eq!(rep.aggregate.branch_ratio, Some(0.5));
        assert_eq!(rep.aggregate.line_ratio, None);
        assert_eq!(rep.units[0].zero_hit, vec![f]);
    }

    #[test]
    fn one_of_five_lines_hit_is_a_fifth() {
        let units: Vec<_> = (1..=5).map(|l| CountableUnit::line("a.sim", l)).collect();
        let model = model_with("a.sim", units.clone(), vec![]);
        let mut dataset = CoverageDataset::new();
        for u in &units {
            dataset.seed_zero(u.clone());
        }
        dataset.add(units[0].clone(), 1);

        let rep = report(&dataset, &[&model]);
        assert_eq!(rep.units[0].line_ratio, Some(0.2));
    }

    #[test]
    fn empty_model_reports_not_applicable_not_zero() {
        let model = model_with("empty.sim", vec![], vec![]);
        let rep = report(&CoverageDataset::new(), &[&model]);
        assert_eq!(rep.units[0].line_ratio, None);
        assert_eq!(rep.units[0].branch_ratio, None);
        // and n/a never fails a threshold
        let thresholds = ThresholdConfig {
            line: Some(0.9),
            branch: Some(0.9),
        };
        assert!(rep.meets_thresholds(&thresholds));
    }

    #[test]
    fn full_ratio_requires_every_unit_hit() {
        let units: Vec<_> = (1..=3).map(|l| CountableUnit::line("a.sim", l)).collect();
        let model = model_with("a.sim", units.clone(), vec![]);
        let mut dataset = CoverageDataset::new();
        for u in &units {
            dataset.add(u.clone(), 7);
        }
        let rep = report(&dataset, &[&model]);
        assert_eq!(rep.aggregate.line_ratio, Some(1.0));
        assert!(rep.aggregate.line.is_full());
    }

    #[test]
    fn thresholds_gate_on_aggregate_ratios() {
        let units: Vec<_> = (1..=4).map(|l| CountableUnit::line("a.sim", l)).collect();
        let model = model_with("a.sim", units.clone(), vec![]);
        let mut dataset = CoverageDataset::new();
        for u in &units {
            dataset.seed_zero(u.clone());
        }
        dataset.add(units[0].clone(), 1);
        let rep = report(&dataset, &[&model]);
        assert!(rep.meets_thresholds(&ThresholdConfig {
            line: Some(0.25),
            branch: None,
        }));
        assert!(!rep.meets_thresholds(&ThresholdConfig {
            line: Some(0.5),
            branch: None,
        }));
    }
}
