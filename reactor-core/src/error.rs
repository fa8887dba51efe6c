//! Crate-wide error type.

use serde::Serialize;
use thiserror::Error;

use crate::reactive::ComputationId;
use crate::schedule::FlushReport;

/// A computation whose body panicked during a flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputationFailure {
    pub id: ComputationId,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("cannot flush while computation {0} is running")]
    FlushWhileRunning(ComputationId),

    #[error("unknown computation: {0}")]
    UnknownComputation(ComputationId),

    #[error("computation {0} is running and cannot be disposed")]
    ComputationRunning(ComputationId),

    #[error("flush aborted: computation {id} panicked: {message} ({} pending computations dropped)", .dropped.len())]
    FlushAborted {
        id: ComputationId,
        message: String,
        dropped: Vec<ComputationId>,
    },

    #[error("{} computations panicked during flush", .failures.len())]
    FlushFailed {
        failures: Vec<ComputationFailure>,
        report: FlushReport,
    },

    #[error("scheduler still busy after {0} ticks")]
    TickLimitExceeded(usize),

    #[error("engine has been dropped")]
    EngineDropped,

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
