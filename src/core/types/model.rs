use serde::{Deserialize, Serialize};

use crate::types::{BranchKind, BranchLabel, ContentHash, CountableUnit, EngineError};

/// A control-flow point with mutually exclusive, exhaustive branch outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSite {
    pub id: u32,
    pub kind: BranchKind,
    pub line: u32,
    pub labels: Vec<BranchLabel>,
}

/// One statement's span and the countable units it contributes.
///
/// A statement may contribute no Line (unreachable or non-executable) and
/// zero or more Branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSpan {
    pub line: u32,
    pub start: u32,
    pub end: u32,
    pub contributes: Vec<CountableUnit>,
}

/// A pending text edit that wires one or more countable units to counters.
///
/// `template` may reference the counter indices of `units` as `{0}`, `{1}`,
/// ... in order; the instrumentor substitutes the assigned indices and
/// splices the rendered text over `old_text` at `byte_offset`. Front ends
/// own the probe syntax, the instrumentor owns index assignment and
/// splicing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbePoint {
    pub units: Vec<CountableUnit>,
    pub byte_offset: u32,
    pub old_text: String,
    pub template: String,
}

/// Everything the model builder discovered for one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralModel {
    pub unit_name: String,
    pub content_hash: ContentHash,
    /// All countable units, in source order
    pub units: Vec<CountableUnit>,
    pub sites: Vec<DecisionSite>,
    pub statements: Vec<StatementSpan>,
    pub probes: Vec<ProbePoint>,
}

impl StructuralModel {
    pub fn lines(&self) -> impl Iterator<Item = &CountableUnit> {
        self.units.iter().filter(|u| u.is_line())
    }

    pub fn branches(&self) -> impl Iterator<Item = &CountableUnit> {
        self.units.iter().filter(|u| u.is_branch())
    }

    /// Check the structural invariants the rest of the engine relies on:
    /// every decision site has at least two labels, every branch unit
    /// belongs to exactly one declared site, and probes only reference
    /// units the model contains.
    pub fn validate(&self) -> Result<(), EngineError> {
        for site in &self.sites {
            if site.labels.len() < 2 {
                return Err(EngineError::instrumentation(
                    &self.unit_name,
                    format!(
                        "decision site {} at line {} has {} label(s), need at least 2",
                        site.id,
                        site.line,
                        site.labels.len()
                    ),
                ));
            }
        }
        for unit in &self.units {
            if let CountableUnit::Branch { site, label, .. } = unit {
                let found = self
                    .sites
                    .iter()
                    .find(|s| s.id == *site)
                    .is_some_and(|s| s.labels.contains(label));
                if !found {
                    return Err(EngineError::instrumentation(
                        &self.unit_name,
                        format!("branch {unit} does not belong to a declared decision site"),
                    ));
                }
            }
        }
        for probe in &self.probes {
            for unit in &probe.units {
                if !self.units.contains(unit) {
                    return Err(EngineError::instrumentation(
                        &self.unit_name,
                        format!("probe at byte {} references unknown unit {unit}", probe.byte_offset),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Injective mapping from countable unit to a dense counter index.
///
/// The index of a unit is its position in `entries`; entries are emitted in
/// source order, so instrumenting unchanged source reproduces the identical
/// map. Serialization round-trips exactly (`deserialize(serialize(m)) == m`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterMap {
    pub unit_name: String,
    pub content_hash: ContentHash,
    pub entries: Vec<CountableUnit>,
}

impl CounterMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, unit: &CountableUnit) -> Option<u32> {
        self.entries.iter().position(|u| u == unit).map(|i| i as u32)
    }

    pub fn unit_at(&self, index: u32) -> Option<&CountableUnit> {
        self.entries.get(index as usize)
    }
}

/// Instrumented source text, tagged with the original unit's identity so a
/// later run can be matched back to the counter map it was built with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentedArtifact {
    pub unit_name: String,
    pub content_hash: ContentHash,
    pub text: String,
}
