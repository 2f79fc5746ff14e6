//! Reference front end for a small imperative brace language (`.sim`).
//!
//! Exists so the engine is exercisable end to end without an external
//! toolchain: the parser feeds the model builder, and the evaluator runs
//! original and instrumented programs against a live counter store.

pub mod ast;
mod engine;
pub mod interp;
mod parser;
pub mod syntax;

pub use engine::SimpleFrontend;
pub use interp::{CounterSink, Execution, run};
