//! A source-instrumentation coverage engine.
//!
//! `reach` models a source unit into countable units (executable lines and
//! decision-site branches), splices counter probes into the source without
//! changing its observable behavior, collects hit counts while the
//! instrumented program runs, merges per-run snapshots into a coverage
//! dataset, and reports line/branch ratios alongside outcome-audit warnings.
//!
//! The engine only ever models units it is handed: control flow inside
//! opaque dependencies contributes no countable units, so a call into a
//! library counts as at most one line no matter how much branching hides
//! behind it. That boundary is inherent to source instrumentation and is
//! deliberately not papered over. Likewise, coverage here measures
//! execution reach, not verification: the outcome auditor exists because
//! "executed" is not "asserted".

pub mod core;
pub mod frontends;

// Re-export key items for easy importing in this crate
pub use core::types;

// Re-export key items for easy importing in other crates
pub use core::engine::aggregate::Aggregator;
pub use core::engine::audit;
pub use core::engine::instrument::instrument;
pub use core::engine::tracker::CounterStore;
pub use core::engine::traits::SourceFrontend;
pub use core::main_shared::run_main;
pub use core::registry::FrontendRegistry;
