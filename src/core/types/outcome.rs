use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of observable effect a test execution produced
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum OutcomeKind {
    /// A value handed back explicitly (return site)
    ExplicitReturn,
    /// Shared state the execution mutated as a side effect
    ObservableMutation,
}

/// One observable effect recorded during a test execution, and whether any
/// assertion in that execution referenced it.
///
/// These records feed the outcome audit only; they never change coverage
/// ratios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// What was affected, e.g. "account.balance" or "parse() return"
    pub subject: String,
    /// The test execution that produced the effect
    pub test: String,
    pub kind: OutcomeKind,
    pub asserted: bool,
}

/// A mutation that happened during a test but was never asserted on.
///
/// Full line and branch coverage can coexist with any number of these;
/// surfacing them is the engine's refusal to conflate "executed" with
/// "verified".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnverifiedOutcome {
    pub subject: String,
    pub test: String,
}
