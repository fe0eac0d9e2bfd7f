//! Error types for assembly and solving.

use core::fmt;

use thiserror::Error;
use ww_core::{ConnectionId, ProcessId, WwError};
use ww_graph::GraphError;
use ww_loads::{BaseParameter, LoadError};

use crate::expr::RouterIndex;
use crate::system::SystemState;

/// Which of the two linear solves failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    Hydraulics,
    Process,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStage::Hydraulics => f.write_str("hydraulics"),
            SolveStage::Process => f.write_str("process"),
        }
    }
}

/// Errors that can occur while assembling or solving a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Process {process} has an unsupported topology: {what}")]
    Topology { process: ProcessId, what: String },

    #[error("Invalid strategy parameters on process {process}: {what}")]
    InvalidStrategy { process: ProcessId, what: String },

    #[error("No router registered for strategy '{tag}'")]
    UnknownStrategy { tag: String },

    #[error("Influent connection {connection} has no boundary")]
    MissingBoundary { connection: ConnectionId },

    #[error("Connection {connection} is not an influent but was given a boundary")]
    UnexpectedBoundary { connection: ConnectionId },

    #[error("Invalid boundary on connection {connection}: {what}")]
    InvalidBoundary { connection: ConnectionId, what: String },

    #[error("Flow of stream {router} was never defined")]
    UndefinedFlow { router: RouterIndex },

    #[error("{parameter} of stream {router} was never defined")]
    UndefinedParameter {
        router: RouterIndex,
        parameter: BaseParameter,
    },

    #[error("Stream {router} defined twice: {what}")]
    DuplicateDefinition { router: RouterIndex, what: String },

    #[error("Invalid handle: {what}")]
    InvalidHandle { what: String },

    #[error("Operation requires the {expected:?} state, system is {actual:?}")]
    InvalidState {
        expected: SystemState,
        actual: SystemState,
    },

    #[error("{stage} solve failed: {what}")]
    Numerical { stage: SolveStage, what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// Structural or modeling faults a caller fixes by changing the model;
    /// everything else is numerical or API misuse.
    pub fn is_modeling_fault(&self) -> bool {
        matches!(
            self,
            SolverError::Topology { .. }
                | SolverError::InvalidStrategy { .. }
                | SolverError::UnknownStrategy { .. }
                | SolverError::MissingBoundary { .. }
                | SolverError::UnexpectedBoundary { .. }
                | SolverError::InvalidBoundary { .. }
                | SolverError::UndefinedFlow { .. }
                | SolverError::UndefinedParameter { .. }
                | SolverError::DuplicateDefinition { .. }
                | SolverError::Load(_)
        )
    }
}

impl From<SolverError> for WwError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Graph(g) => g.into(),
            SolverError::Load(l) => l.into(),
            err @ (SolverError::InvalidHandle { .. } | SolverError::InvalidState { .. }) => {
                WwError::Invariant {
                    what: err.to_string(),
                }
            }
            err @ SolverError::Numerical { .. } => WwError::Numerical {
                what: err.to_string(),
            },
            other => WwError::InvalidModel {
                what: other.to_string(),
            },
        }
    }
}
