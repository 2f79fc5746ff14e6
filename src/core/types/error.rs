use strum::Display;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Top-level error for the driving CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Other(String),
}

/// Which engine phase detected a counter desync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Increment,
    Snapshot,
    Merge,
}

/// Engine error taxonomy.
///
/// `MalformedSource` and `Instrumentation` are scoped to one source unit:
/// the batch collects them and keeps going. `CounterDesync` and
/// `MergeConflict` are fatal to the current operation and carry enough
/// context (unit, index, phase) to diagnose a build/version mismatch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{unit}:{line}: source cannot be parsed: {message}")]
    MalformedSource {
        unit: String,
        line: u32,
        message: String,
    },

    #[error("{unit}: cannot be safely instrumented: {message}")]
    Instrumentation { unit: String, message: String },

    #[error("counter index {index} out of range for {unit} ({slots} slots) during {phase}")]
    CounterDesync {
        unit: String,
        index: u32,
        slots: u32,
        phase: Phase,
    },

    #[error("snapshots disagree on identity of {unit}: content hash {ours} vs {theirs}")]
    MergeConflict {
        unit: String,
        ours: String,
        theirs: String,
    },
}

impl EngineError {
    pub fn malformed(unit: &str, line: u32, message: impl Into<String>) -> Self {
        Self::MalformedSource {
            unit: unit.to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn instrumentation(unit: &str, message: impl Into<String>) -> Self {
        Self::Instrumentation {
            unit: unit.to_string(),
            message: message.into(),
        }
    }

    /// True for errors that fail one unit but never the whole batch
    pub fn is_unit_scoped(&self) -> bool {
        matches!(
            self,
            Self::MalformedSource { .. } | Self::Instrumentation { .. }
        )
    }
}
