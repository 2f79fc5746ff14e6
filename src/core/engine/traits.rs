use crate::types::{BranchKinds, EngineError, SourceUnit, StructuralModel};

/// Core trait that source-language front ends must provide.
///
/// The engine treats host-language parsing as an external concern: a front
/// end turns one source unit into a structural model, including the probe
/// points (text edits with index placeholders) that wire countable units to
/// counters. Front ends own probe syntax; index assignment and splicing
/// belong to the instrumentor.
pub trait SourceFrontend: Send + Sync {
    /// Language name (e.g., "Simple")
    fn name(&self) -> &'static str;

    /// File extensions this front end handles (e.g., ["sim"])
    fn extensions(&self) -> &[&'static str];

    /// Build the structural model for one source unit.
    ///
    /// Must be a deterministic pure function of the source text and the
    /// enabled branch kinds. Fails with `MalformedSource` when the unit
    /// cannot be parsed; the failure is scoped to this unit only.
    fn build(
        &self,
        unit: &SourceUnit,
        kinds: &BranchKinds,
    ) -> Result<StructuralModel, EngineError>;
}
